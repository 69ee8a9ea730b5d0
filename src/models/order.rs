use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};

use crate::utils::geo::GeoPoint;

// An order can be set to any of these at any time; there is no
// transition table. Callers record whatever the acting role decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Assigned,
    Picked,
    InTransit,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Assigned => "assigned",
            OrderStatus::Picked => "picked",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<OrderStatus> {
        match value {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "preparing" => Some(OrderStatus::Preparing),
            "ready" => Some(OrderStatus::Ready),
            "assigned" => Some(OrderStatus::Assigned),
            "picked" => Some(OrderStatus::Picked),
            "in_transit" => Some(OrderStatus::InTransit),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

pub const PAYMENT_STATUSES: &[&str] = &["pending", "completed", "failed", "refunded"];
pub const PAYMENT_METHODS: &[&str] = &["cash", "card", "upi"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    CustomerRequest,
    StoreUnavailable,
    DeliveryUnavailable,
    PaymentFailed,
    Other,
}

impl CancellationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancellationReason::CustomerRequest => "customer_request",
            CancellationReason::StoreUnavailable => "store_unavailable",
            CancellationReason::DeliveryUnavailable => "delivery_unavailable",
            CancellationReason::PaymentFailed => "payment_failed",
            CancellationReason::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemVariant {
    pub name: String,
    pub value: String,
}

// Line item with the price snapshot taken at order time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product: Uuid,
    pub quantity: i32,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<ItemVariant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxLine {
    pub amount: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub kind: String, // percentage | fixed
}

impl Default for Discount {
    fn default() -> Self {
        Self {
            amount: Decimal::ZERO,
            code: None,
            kind: "fixed".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default)]
    pub location: GeoPoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundDetails {
    pub amount: Decimal,
    pub reason: Option<String>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_gateway: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_details: Option<RefundDetails>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNotes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRating {
    pub food: i32,
    pub delivery: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl OrderRating {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=5).contains(&self.food) {
            return Err("Food rating must be between 1 and 5".to_string());
        }
        if !(1..=5).contains(&self.delivery) {
            return Err("Delivery rating must be between 1 and 5".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    #[serde(rename = "customer")]
    pub customer_id: Uuid,
    #[serde(rename = "store")]
    pub store_id: Uuid,
    #[serde(rename = "deliveryPerson")]
    pub delivery_person_id: Option<Uuid>,
    pub items: Json<Vec<OrderItem>>,
    pub status: String,
    pub status_history: Json<Vec<StatusHistoryEntry>>,
    pub subtotal: Decimal,
    pub tax: Json<TaxLine>,
    pub delivery_fee: Decimal,
    pub discount: Json<Discount>,
    pub total_amount: Decimal,
    pub delivery_address: Json<DeliveryAddress>,
    pub payment_status: String,
    pub payment_method: String,
    pub payment_details: Option<Json<PaymentDetails>>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub notes: Option<Json<OrderNotes>>,
    pub rating: Option<Json<OrderRating>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ORD + yymmdd + 4-digit suffix. The caller supplies the suffix so the
// format stays deterministic under test.
pub fn generate_order_number(date: NaiveDate, suffix: u32) -> String {
    format!("ORD{}{:04}", date.format("%y%m%d"), suffix % 10000)
}

// Every new order starts its history with a single pending entry.
pub fn initial_status_history(now: DateTime<Utc>) -> Vec<StatusHistoryEntry> {
    vec![StatusHistoryEntry {
        status: OrderStatus::Pending,
        timestamp: now,
        note: None,
        updated_by: None,
    }]
}

impl Order {
    // Overwrites the status unconditionally and appends one history
    // entry. Submitting the same status twice appends two entries; the
    // log is append-only and never deduplicated.
    pub fn set_status(
        &mut self,
        status: OrderStatus,
        updated_by: Option<Uuid>,
        note: Option<String>,
    ) {
        self.status = status.as_str().to_string();
        self.status_history.0.push(StatusHistoryEntry {
            status,
            timestamp: Utc::now(),
            note,
            updated_by,
        });
    }

    pub fn cancel(
        &mut self,
        reason: CancellationReason,
        updated_by: Option<Uuid>,
        note: Option<String>,
    ) {
        self.cancellation_reason = Some(reason.as_str().to_string());
        self.set_status(OrderStatus::Cancelled, updated_by, note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            order_number: generate_order_number(now.date_naive(), 427),
            customer_id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            delivery_person_id: None,
            items: Json(vec![OrderItem {
                product: Uuid::new_v4(),
                quantity: 2,
                price: Decimal::from(50),
                variant: None,
                notes: None,
            }]),
            status: OrderStatus::Pending.as_str().to_string(),
            status_history: Json(vec![StatusHistoryEntry {
                status: OrderStatus::Pending,
                timestamp: now,
                note: None,
                updated_by: None,
            }]),
            subtotal: Decimal::from(100),
            tax: Json(TaxLine {
                amount: Decimal::from(5),
                rate: Decimal::from(5),
            }),
            delivery_fee: Decimal::from(10),
            discount: Json(Discount::default()),
            total_amount: Decimal::from(115),
            delivery_address: Json(DeliveryAddress {
                street: "4 Brigade Road".to_string(),
                city: "Bengaluru".to_string(),
                state: "Karnataka".to_string(),
                pincode: "560025".to_string(),
                location: GeoPoint::new(77.6, 12.97),
                instructions: None,
            }),
            payment_status: "pending".to_string(),
            payment_method: "upi".to_string(),
            payment_details: None,
            estimated_delivery_time: None,
            actual_delivery_time: None,
            cancellation_reason: None,
            notes: None,
            rating: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn new_orders_start_with_one_pending_entry() {
        let history = initial_status_history(Utc::now());
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, OrderStatus::Pending);
        assert!(history[0].note.is_none());
        assert!(history[0].updated_by.is_none());
    }

    #[test]
    fn order_number_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        assert_eq!(generate_order_number(date, 42), "ORD2403060042");
        assert_eq!(generate_order_number(date, 9999), "ORD2403069999");
        // Suffix wraps into four digits
        assert_eq!(generate_order_number(date, 123456), "ORD2403063456");

        let number = generate_order_number(date, 7);
        assert!(number.starts_with("ORD"));
        assert_eq!(number.len(), 13);
        assert!(number[3..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn set_status_appends_exactly_one_entry() {
        let mut order = sample_order();
        let before = order.status_history.0.len();

        order.set_status(OrderStatus::Confirmed, None, None);

        assert_eq!(order.status, "confirmed");
        assert_eq!(order.status_history.0.len(), before + 1);
        assert_eq!(
            order.status_history.0.last().unwrap().status,
            OrderStatus::Confirmed
        );
    }

    #[test]
    fn repeated_status_is_not_deduplicated() {
        let mut order = sample_order();
        order.set_status(OrderStatus::Confirmed, None, None);
        order.set_status(OrderStatus::Confirmed, None, None);

        let history = &order.status_history.0;
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].status, OrderStatus::Confirmed);
        assert_eq!(history[2].status, OrderStatus::Confirmed);
    }

    #[test]
    fn any_transition_is_accepted() {
        let mut order = sample_order();
        order.set_status(OrderStatus::Delivered, None, None);
        // delivered -> pending is accepted; there is no transition table
        order.set_status(OrderStatus::Pending, None, None);
        assert_eq!(order.status, "pending");
        assert_eq!(order.status_history.0.len(), 3);
    }

    #[test]
    fn cancel_records_reason_and_history() {
        let mut order = sample_order();
        let actor = Uuid::new_v4();
        order.cancel(CancellationReason::CustomerRequest, Some(actor), None);

        assert_eq!(order.status, "cancelled");
        assert_eq!(order.cancellation_reason.as_deref(), Some("customer_request"));
        let last = order.status_history.0.last().unwrap();
        assert_eq!(last.status, OrderStatus::Cancelled);
        assert_eq!(last.updated_by, Some(actor));
    }

    #[test]
    fn monetary_fields_round_trip_through_json() {
        let order = sample_order();
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["subtotal"], serde_json::json!("100"));
        assert_eq!(value["tax"]["amount"], serde_json::json!("5"));
        assert_eq!(value["deliveryFee"], serde_json::json!("10"));
        assert_eq!(value["discount"]["amount"], serde_json::json!("0"));
        assert_eq!(value["totalAmount"], serde_json::json!("115"));

        // Wire names follow the document model
        assert!(value["orderNumber"].is_string());
        assert!(value["statusHistory"].is_array());
        assert_eq!(
            value["deliveryAddress"]["location"]["coordinates"][0],
            serde_json::json!(77.6)
        );
    }

    #[test]
    fn rating_bounds() {
        let rating = OrderRating {
            food: 5,
            delivery: 4,
            comment: None,
        };
        assert!(rating.validate().is_ok());

        let rating = OrderRating {
            food: 0,
            delivery: 4,
            comment: None,
        };
        assert!(rating.validate().is_err());

        let rating = OrderRating {
            food: 3,
            delivery: 6,
            comment: None,
        };
        assert!(rating.validate().is_err());
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Assigned,
            OrderStatus::Picked,
            OrderStatus::InTransit,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("returned"), None);
    }
}
