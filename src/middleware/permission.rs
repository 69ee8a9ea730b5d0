use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use serde::Serialize;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    database::Database,
    errors::ApiError,
    models::{Permission, Role, User},
    utils::verify_token,
};

// Authenticated caller, resolved once per request. Capabilities come
// from the enumerated role, not from free-form strings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub is_guest: bool,
}

impl CurrentUser {
    pub fn can(&self, permission: Permission) -> bool {
        self.role.permissions().contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Insufficient permissions".to_string()))
        }
    }

    // Admins may act on anyone; everyone else only on themselves.
    pub fn require_self_or_admin(&self, user_id: Uuid) -> Result<(), ApiError> {
        if self.id == user_id || self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Insufficient permissions".to_string()))
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

pub async fn get_current_user(
    headers: &HeaderMap,
    cookies: &Cookies,
    db: &Database,
) -> Result<CurrentUser, ApiError> {
    // Bearer header first, auth_token cookie as fallback
    let token = bearer_token(headers)
        .or_else(|| cookies.get("auth_token").map(|c| c.value().to_string()))
        .ok_or_else(|| ApiError::unauthorized("No token provided"))?;

    let claims =
        verify_token(&token).map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ApiError::unauthorized("Invalid token subject"))?;

    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE id = $1 AND status = 'active'",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| ApiError::unauthorized("User not found or inactive"))?;

    let role = Role::parse(&user.role)
        .ok_or_else(|| ApiError::unauthorized("Unknown role"))?;

    Ok(CurrentUser {
        id: user.id,
        email: user.email,
        role,
        is_guest: user.is_guest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_role(role: Role) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            role,
            is_guest: false,
        }
    }

    #[test]
    fn merchant_capabilities() {
        let merchant = user_with_role(Role::Merchant);
        assert!(merchant.require(Permission::ProductsManage).is_ok());
        assert!(merchant.require(Permission::PlatformAdmin).is_err());
    }

    #[test]
    fn self_or_admin_gate() {
        let customer = user_with_role(Role::Customer);
        assert!(customer.require_self_or_admin(customer.id).is_ok());
        assert!(customer.require_self_or_admin(Uuid::new_v4()).is_err());

        let admin = user_with_role(Role::Admin);
        assert!(admin.require_self_or_admin(Uuid::new_v4()).is_ok());
    }
}
