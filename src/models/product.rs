use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, Utc};

// Rating aggregate carried by products and stores. Recomputation happens
// outside this service; we only store what we are given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average: f64,
    pub count: i64,
}

impl Default for RatingSummary {
    fn default() -> Self {
        Self {
            average: 0.0,
            count: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub url: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantOption {
    pub label: String,
    pub value: String,
    #[serde(default)]
    pub price_adjustment: Decimal,
    #[serde(default)]
    pub stock: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub name: String,
    pub options: Vec<VariantOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxInfo {
    pub rate: Decimal,
    #[serde(rename = "type")]
    pub kind: String, // percentage | fixed
}

impl Default for TaxInfo {
    fn default() -> Self {
        Self {
            rate: Decimal::ZERO,
            kind: "percentage".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[serde(rename = "store")]
    pub store_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    // Percentage, 0-100
    pub discount: Option<Decimal>,
    pub category: String,
    pub subcategory: Option<String>,
    pub images: Json<Vec<ProductImage>>,
    pub stock_quantity: i32,
    pub low_stock_threshold: i32,
    pub track_inventory: bool,
    pub variants: Json<Vec<Variant>>,
    pub attributes: Json<Vec<Attribute>>,
    pub tax: Json<TaxInfo>,
    pub is_available: bool,
    pub is_featured: bool,
    pub rating: Json<RatingSummary>,
    pub tags: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    // Discounted price is derived on read, never stored.
    pub fn discounted_price(&self) -> Decimal {
        match self.discount {
            Some(discount) if discount > Decimal::ZERO => {
                self.price - (self.price * discount / Decimal::from(100))
            }
            _ => self.price,
        }
    }

    pub fn is_in_stock(&self) -> bool {
        if !self.track_inventory {
            return true;
        }
        self.stock_quantity > 0
    }

    pub fn is_low_stock(&self) -> bool {
        if !self.track_inventory {
            return false;
        }
        self.stock_quantity <= self.low_stock_threshold
    }
}

// Wire shape: stock nested, discounted price included.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockInfo {
    pub quantity: i32,
    pub low_stock_threshold: i32,
    pub track_inventory: bool,
    pub low_stock: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: Uuid,
    pub store: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub discounted_price: Decimal,
    pub category: String,
    pub subcategory: Option<String>,
    pub images: Vec<ProductImage>,
    pub stock: StockInfo,
    pub variants: Vec<Variant>,
    pub attributes: Vec<Attribute>,
    pub tax: TaxInfo,
    pub is_available: bool,
    pub is_featured: bool,
    pub rating: RatingSummary,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        let discounted_price = product.discounted_price();
        let low_stock = product.is_low_stock();
        Self {
            id: product.id,
            store: product.store_id,
            name: product.name,
            description: product.description,
            price: product.price,
            original_price: product.original_price,
            discount: product.discount,
            discounted_price,
            category: product.category,
            subcategory: product.subcategory,
            images: product.images.0,
            stock: StockInfo {
                quantity: product.stock_quantity,
                low_stock_threshold: product.low_stock_threshold,
                track_inventory: product.track_inventory,
                low_stock,
            },
            variants: product.variants.0,
            attributes: product.attributes.0,
            tax: product.tax.0,
            is_available: product.is_available,
            is_featured: product.is_featured,
            rating: product.rating.0,
            tags: product.tags.0,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        Product {
            id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            name: "Masala Dosa".to_string(),
            description: "Crisp rice crepe with potato filling".to_string(),
            price: Decimal::from(100),
            original_price: None,
            discount: None,
            category: "south-indian".to_string(),
            subcategory: None,
            images: Json(vec![]),
            stock_quantity: 15,
            low_stock_threshold: 10,
            track_inventory: true,
            variants: Json(vec![]),
            attributes: Json(vec![]),
            tax: Json(TaxInfo::default()),
            is_available: true,
            is_featured: false,
            rating: Json(RatingSummary::default()),
            tags: Json(vec![]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn twenty_percent_off() {
        let mut product = sample_product();
        product.discount = Some(Decimal::from(20));
        assert_eq!(product.discounted_price(), Decimal::from(80));
    }

    #[test]
    fn no_discount_keeps_price() {
        let mut product = sample_product();
        assert_eq!(product.discounted_price(), Decimal::from(100));
        product.discount = Some(Decimal::ZERO);
        assert_eq!(product.discounted_price(), Decimal::from(100));
    }

    #[test]
    fn stock_predicates_honor_tracking() {
        let mut product = sample_product();
        assert!(product.is_in_stock());
        assert!(!product.is_low_stock());

        product.stock_quantity = 0;
        assert!(!product.is_in_stock());
        assert!(product.is_low_stock());

        product.track_inventory = false;
        assert!(product.is_in_stock());
        assert!(!product.is_low_stock());
    }

    #[test]
    fn response_carries_derived_fields() {
        let mut product = sample_product();
        product.discount = Some(Decimal::from(20));
        product.stock_quantity = 3;
        let response = ProductResponse::from(product);
        assert_eq!(response.discounted_price, Decimal::from(80));
        assert!(response.stock.low_stock);
    }
}
