use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    database::Database,
    errors::ApiError,
    middleware::get_current_user,
    models::{User, UserProfile},
    response::ApiResponse,
    utils::{create_token, hash_code, verify_code},
};

const OTP_TTL_MINUTES: i64 = 5;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    phone_number: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    verification_id: Uuid,
    code: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestLoginRequest {
    device_id: String,
    device_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    email: Option<String>,
    phone: Option<String>,
    profile: Option<UserProfile>,
}

fn valid_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    (10..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

// Generate a one-time code and store only its hash. The code itself is
// handed to the SMS gateway; in debug builds it is logged instead.
pub async fn send_otp(
    State(db): State<Database>,
    Json(body): Json<SendOtpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !valid_phone(&body.phone_number) {
        return Err(ApiError::validation("Please enter a valid phone number"));
    }

    let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
    let code_hash =
        hash_code(&code).map_err(|_| ApiError::validation("Failed to process OTP"))?;
    let expires_at = Utc::now() + Duration::minutes(OTP_TTL_MINUTES);

    let verification_id: Uuid = sqlx::query_scalar(
        "INSERT INTO otp_verifications (phone, code_hash, expires_at) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&body.phone_number)
    .bind(&code_hash)
    .bind(expires_at)
    .fetch_one(&db)
    .await?;

    if cfg!(debug_assertions) {
        log::info!("OTP for {}: {}", body.phone_number, code);
    }

    Ok(ApiResponse::message(
        "OTP sent successfully",
        json!({ "verificationId": verification_id }),
    ))
}

pub async fn verify_otp(
    State(db): State<Database>,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row: Option<(String, chrono::DateTime<Utc>, String)> = sqlx::query_as(
        "SELECT phone, expires_at, code_hash FROM otp_verifications WHERE id = $1 AND consumed = FALSE",
    )
    .bind(body.verification_id)
    .fetch_optional(&db)
    .await?;

    let (phone, expires_at, code_hash) =
        row.ok_or(ApiError::validation("Invalid or expired OTP"))?;

    if expires_at < Utc::now() || !verify_code(&body.code, &code_hash) {
        return Err(ApiError::validation("Invalid or expired OTP"));
    }

    sqlx::query("UPDATE otp_verifications SET consumed = TRUE WHERE id = $1")
        .bind(body.verification_id)
        .execute(&db)
        .await?;

    // First OTP login creates a customer account for the phone number
    let existing = sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone = $1")
        .bind(&phone)
        .fetch_optional(&db)
        .await?;

    let user = match existing {
        Some(user) => user,
        None => {
            let email = format!("{}@guest.com", phone.replace('+', ""));
            let user = sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (email, phone, role, is_guest)
                VALUES ($1, $2, 'customer', TRUE)
                RETURNING *
                "#,
            )
            .bind(&email)
            .bind(&phone)
            .fetch_one(&db)
            .await?;

            sqlx::query(
                "INSERT INTO customer_profiles (user_id) VALUES ($1) ON CONFLICT DO NOTHING",
            )
            .bind(user.id)
            .execute(&db)
            .await?;

            user
        }
    };

    sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(&db)
        .await?;

    let token = create_token(user.id, &user.role)
        .map_err(|_| ApiError::unauthorized("Authentication failed"))?;

    Ok(ApiResponse::message(
        "OTP verified successfully",
        json!({
            "token": token,
            "user": {
                "id": user.id,
                "role": user.role,
                "isGuest": user.is_guest,
            }
        }),
    ))
}

pub async fn guest_login(
    State(db): State<Database>,
    Json(body): Json<GuestLoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.device_id.trim().is_empty() {
        return Err(ApiError::validation("Device id is required"));
    }

    let guest_id = format!("guest_{}", Uuid::new_v4().simple());
    let device_info = json!({
        "deviceId": body.device_id,
        "deviceType": body.device_type,
        "lastLogin": Utc::now(),
    });

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, role, device_info, is_guest, last_login)
        VALUES ($1, 'customer', $2, TRUE, NOW())
        RETURNING *
        "#,
    )
    .bind(format!("{}@guest.com", guest_id))
    .bind(device_info)
    .fetch_one(&db)
    .await?;

    sqlx::query("INSERT INTO customer_profiles (user_id) VALUES ($1) ON CONFLICT DO NOTHING")
        .bind(user.id)
        .execute(&db)
        .await?;

    Ok(ApiResponse::created(
        "Guest login successful",
        json!({
            "userId": user.id,
            "role": user.role,
            "isGuest": true,
        }),
    ))
}

pub async fn update_user_profile(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require_self_or_admin(user_id)?;

    let profile = body
        .profile
        .map(|p| serde_json::to_value(p).unwrap_or_default());

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET email = COALESCE($1, email),
            phone = COALESCE($2, phone),
            profile = COALESCE($3, profile),
            updated_at = NOW()
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(body.email)
    .bind(body.phone)
    .bind(profile)
    .bind(user_id)
    .fetch_optional(&db)
    .await?
    .ok_or(ApiError::NotFound("User"))?;

    Ok(ApiResponse::message("Profile updated successfully", user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_validation() {
        assert!(valid_phone("+919876543210"));
        assert!(valid_phone("9876543210"));
        assert!(!valid_phone("12345"));
        assert!(!valid_phone("not-a-number"));
        assert!(!valid_phone(""));
    }
}
