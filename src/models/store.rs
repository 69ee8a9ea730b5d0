use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, Datelike, Utc, Weekday};

use super::product::RatingSummary;
use crate::utils::geo::GeoPoint;

pub const STORE_TYPES: &[&str] = &["restaurant", "retail", "service", "other"];
pub const STORE_STATUSES: &[&str] = &["active", "inactive", "suspended", "pending"];
pub const DOCUMENT_TYPES: &[&str] = &["license", "tax_certificate", "insurance", "other"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub phone: String,
    pub email: String,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default)]
    pub location: GeoPoint,
}

// Opening window for one weekday, times as "HH:MM" strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessHours {
    pub day: String,
    pub open: String,
    pub close: String,
    #[serde(default)]
    pub is_closed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocument {
    #[serde(rename = "type")]
    pub kind: String,
    pub number: Option<String>,
    pub file_url: Option<String>,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSettings {
    pub accepts_orders: bool,
    pub minimum_order_amount: Decimal,
    // Kilometers
    pub delivery_radius: f64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            accepts_orders: true,
            minimum_order_amount: Decimal::ZERO,
            delivery_radius: 5.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: Uuid,
    #[serde(rename = "owner")]
    pub owner_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub store_type: String,
    pub category: String,
    pub description: Option<String>,
    pub contact_info: Json<ContactInfo>,
    pub address: Json<StoreAddress>,
    pub business_hours: Json<Vec<BusinessHours>>,
    pub rating: Json<RatingSummary>,
    pub status: String,
    pub documents: Json<Vec<StoreDocument>>,
    pub is_verified: bool,
    pub settings: Json<StoreSettings>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

impl Store {
    pub fn full_address(&self) -> String {
        let address = &self.address.0;
        format!(
            "{}, {}, {} {}",
            address.street, address.city, address.state, address.pincode
        )
    }

    // Computed at read time from the weekly hours; nothing is persisted.
    // "HH:MM" strings compare lexicographically.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        let day = weekday_name(now.weekday());
        let time = now.format("%H:%M").to_string();

        match self.business_hours.0.iter().find(|h| h.day == day) {
            Some(hours) if !hours.is_closed => {
                time.as_str() >= hours.open.as_str() && time.as_str() <= hours.close.as_str()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_store(hours: Vec<BusinessHours>) -> Store {
        Store {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Corner Grocery".to_string(),
            store_type: "retail".to_string(),
            category: "grocery".to_string(),
            description: None,
            contact_info: Json(ContactInfo {
                phone: "+919876543210".to_string(),
                email: "shop@example.com".to_string(),
                website: None,
            }),
            address: Json(StoreAddress {
                street: "12 MG Road".to_string(),
                city: "Bengaluru".to_string(),
                state: "Karnataka".to_string(),
                pincode: "560001".to_string(),
                location: GeoPoint::new(77.59, 12.97),
            }),
            business_hours: Json(hours),
            rating: Json(RatingSummary::default()),
            status: "active".to_string(),
            documents: Json(vec![]),
            is_verified: false,
            settings: Json(StoreSettings::default()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn weekday_hours(open: &str, close: &str) -> Vec<BusinessHours> {
        [
            "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
        ]
        .iter()
        .map(|day| BusinessHours {
            day: day.to_string(),
            open: open.to_string(),
            close: close.to_string(),
            is_closed: false,
        })
        .collect()
    }

    #[test]
    fn open_within_hours() {
        let store = sample_store(weekday_hours("09:00", "21:00"));
        let noon = Utc.with_ymd_and_hms(2024, 3, 6, 12, 0, 0).unwrap();
        assert!(store.is_open_at(noon));
    }

    #[test]
    fn closed_outside_hours() {
        let store = sample_store(weekday_hours("09:00", "21:00"));
        let late = Utc.with_ymd_and_hms(2024, 3, 6, 23, 30, 0).unwrap();
        assert!(!store.is_open_at(late));
    }

    #[test]
    fn closed_day_wins_over_hours() {
        let mut hours = weekday_hours("09:00", "21:00");
        for h in hours.iter_mut() {
            if h.day == "wednesday" {
                h.is_closed = true;
            }
        }
        let store = sample_store(hours);
        // 2024-03-06 is a Wednesday
        let noon = Utc.with_ymd_and_hms(2024, 3, 6, 12, 0, 0).unwrap();
        assert!(!store.is_open_at(noon));
    }

    #[test]
    fn missing_day_means_closed() {
        let store = sample_store(vec![]);
        let noon = Utc.with_ymd_and_hms(2024, 3, 6, 12, 0, 0).unwrap();
        assert!(!store.is_open_at(noon));
    }

    #[test]
    fn full_address_concatenation() {
        let store = sample_store(vec![]);
        assert_eq!(store.full_address(), "12 MG Road, Bengaluru, Karnataka 560001");
    }
}
