use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::utils::geo::GeoPoint;

// Platform roles. Role-specific data lives in a per-role profile table
// keyed by user id, not in the base identity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Merchant,
    Delivery,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Merchant => "merchant",
            Role::Delivery => "delivery",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "customer" => Some(Role::Customer),
            "merchant" => Some(Role::Merchant),
            "delivery" => Some(Role::Delivery),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn permissions(&self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Customer => &[OrdersRead, OrdersWrite, ProfileRead, ProfileWrite],
            Role::Merchant => &[
                OrdersRead,
                OrdersManage,
                StoresManage,
                ProductsManage,
                ProfileRead,
                ProfileWrite,
            ],
            Role::Delivery => &[OrdersRead, DeliveryTasks, ProfileRead, ProfileWrite],
            Role::Admin => &[
                OrdersRead,
                OrdersWrite,
                OrdersManage,
                StoresManage,
                ProductsManage,
                DeliveryTasks,
                ProfileRead,
                ProfileWrite,
                UsersManage,
                PlatformAdmin,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    OrdersRead,
    OrdersWrite,
    // Confirm/prepare/assign orders for one's own stores
    OrdersManage,
    StoresManage,
    ProductsManage,
    DeliveryTasks,
    ProfileRead,
    ProfileWrite,
    UsersManage,
    PlatformAdmin,
}

pub const USER_STATUSES: &[&str] = &["active", "inactive", "suspended"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_id: String,
    pub device_type: String,
    pub last_login: DateTime<Utc>,
}

// Base identity record shared by every role.
#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub profile: Json<UserProfile>,
    pub device_info: Option<Json<DeviceInfo>>,
    pub is_guest: bool,
    pub status: String,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPrefs {
    pub email: bool,
    pub sms: bool,
    pub push: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            email: true,
            sms: true,
            push: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub notifications: NotificationPrefs,
    pub language: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notifications: NotificationPrefs::default(),
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    pub user_id: Uuid,
    pub preferences: Json<Preferences>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SavedAddress {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub is_default: bool,
    pub location: Json<GeoPoint>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub account_holder: String,
    pub account_number: String,
    pub ifsc_code: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MerchantProfile {
    pub user_id: Uuid,
    pub business_name: String,
    pub business_type: String,
    pub gst_number: Option<String>,
    pub bank_details: Option<Json<BankDetails>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const VEHICLE_TYPES: &[&str] = &["bicycle", "motorcycle", "scooter", "car"];

#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryProfile {
    pub user_id: Uuid,
    pub vehicle_type: String,
    pub vehicle_number: String,
    pub current_location: Json<GeoPoint>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trip() {
        for role in [Role::Customer, Role::Merchant, Role::Delivery, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn admin_holds_every_permission() {
        for role in [Role::Customer, Role::Merchant, Role::Delivery] {
            for permission in role.permissions() {
                assert!(
                    Role::Admin.permissions().contains(permission),
                    "admin missing {:?}",
                    permission
                );
            }
        }
    }

    #[test]
    fn customers_cannot_manage_stores() {
        assert!(!Role::Customer
            .permissions()
            .contains(&Permission::StoresManage));
        assert!(Role::Merchant
            .permissions()
            .contains(&Permission::StoresManage));
    }
}
