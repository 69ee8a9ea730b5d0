use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::Multipart;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sqlx::types::Json as Jsonb;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    database::Database,
    errors::ApiError,
    middleware::get_current_user,
    models::{
        product::{Attribute, ProductImage, Variant},
        store::{BusinessHours, ContactInfo, StoreAddress},
        BankDetails, MerchantProfile, Order, OrderStatus, Permission, Product,
        ProductResponse, Store, StoreDocument, StoreSettings, TaxInfo, User, UserProfile,
        DOCUMENT_TYPES, STORE_TYPES,
    },
    response::ApiResponse,
    utils::pagination::{PageQuery, Pagination, DEFAULT_PAGE_SIZE},
};

async fn fetch_merchant(db: &Database, merchant_id: Uuid) -> Result<User, ApiError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND role = 'merchant'")
        .bind(merchant_id)
        .fetch_optional(db)
        .await?
        .ok_or(ApiError::NotFound("Merchant"))
}

// A store route under a merchant only resolves if the store belongs to
// that merchant.
async fn fetch_merchant_store(
    db: &Database,
    merchant_id: Uuid,
    store_id: Uuid,
) -> Result<Store, ApiError> {
    sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = $1 AND owner_id = $2")
        .bind(store_id)
        .bind(merchant_id)
        .fetch_optional(db)
        .await?
        .ok_or(ApiError::NotFound("Store"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMerchantRequest {
    email: String,
    phone: Option<String>,
    profile: Option<UserProfile>,
    business_name: String,
    business_type: String,
    gst_number: Option<String>,
    bank_details: Option<BankDetails>,
}

pub async fn create_merchant(
    State(db): State<Database>,
    Json(body): Json<CreateMerchantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.email.trim().is_empty() || !body.email.contains('@') {
        return Err(ApiError::validation("Please enter a valid email"));
    }
    if body.business_name.trim().is_empty() {
        return Err(ApiError::validation("Business name is required"));
    }

    let profile = body.profile.unwrap_or_default();
    let merchant = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, phone, role, profile)
        VALUES ($1, $2, 'merchant', $3)
        RETURNING *
        "#,
    )
    .bind(body.email.trim())
    .bind(body.phone)
    .bind(Jsonb(&profile))
    .fetch_one(&db)
    .await?;

    let business = sqlx::query_as::<_, MerchantProfile>(
        r#"
        INSERT INTO merchant_profiles (user_id, business_name, business_type, gst_number, bank_details)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(merchant.id)
    .bind(body.business_name.trim())
    .bind(&body.business_type)
    .bind(body.gst_number)
    .bind(body.bank_details.map(Jsonb))
    .fetch_one(&db)
    .await?;

    Ok(ApiResponse::created(
        "Merchant created",
        json!({ "merchant": merchant, "business": business }),
    ))
}

pub async fn list_merchants(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::UsersManage)?;

    let merchants = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE role = 'merchant' ORDER BY created_at DESC",
    )
    .fetch_all(&db)
    .await?;

    let ids: Vec<Uuid> = merchants.iter().map(|m| m.id).collect();
    let profiles = sqlx::query_as::<_, MerchantProfile>(
        "SELECT * FROM merchant_profiles WHERE user_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(&db)
    .await?;
    let mut by_user: HashMap<Uuid, MerchantProfile> =
        profiles.into_iter().map(|p| (p.user_id, p)).collect();

    let merchants: Vec<_> = merchants
        .into_iter()
        .map(|merchant| {
            let business = by_user.remove(&merchant.id);
            json!({ "merchant": merchant, "business": business })
        })
        .collect();

    Ok(ApiResponse::ok(json!({ "merchants": merchants })))
}

pub async fn get_merchant(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(merchant_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::ProfileRead)?;
    current_user.require_self_or_admin(merchant_id)?;

    let merchant = fetch_merchant(&db, merchant_id).await?;

    let business = sqlx::query_as::<_, MerchantProfile>(
        "SELECT * FROM merchant_profiles WHERE user_id = $1",
    )
    .bind(merchant_id)
    .fetch_optional(&db)
    .await?;

    let stores = sqlx::query_as::<_, Store>(
        "SELECT * FROM stores WHERE owner_id = $1 ORDER BY created_at",
    )
    .bind(merchant_id)
    .fetch_all(&db)
    .await?;

    Ok(ApiResponse::ok(json!({
        "merchant": merchant,
        "business": business,
        "stores": stores,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMerchantRequest {
    email: Option<String>,
    phone: Option<String>,
    profile: Option<UserProfile>,
    business_name: Option<String>,
    business_type: Option<String>,
    gst_number: Option<String>,
    bank_details: Option<BankDetails>,
}

pub async fn update_merchant(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(merchant_id): Path<Uuid>,
    Json(body): Json<UpdateMerchantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::ProfileWrite)?;
    current_user.require_self_or_admin(merchant_id)?;

    fetch_merchant(&db, merchant_id).await?;

    let merchant = sqlx::query_as::<_, User>(
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
    .bind(body.profile.map(Jsonb))
    .bind(merchant_id)
    .fetch_one(&db)
    .await?;

    let business = sqlx::query_as::<_, MerchantProfile>(
        r#"
        UPDATE merchant_profiles
        SET business_name = COALESCE($1, business_name),
            business_type = COALESCE($2, business_type),
            gst_number = COALESCE($3, gst_number),
            bank_details = COALESCE($4, bank_details),
            updated_at = NOW()
        WHERE user_id = $5
        RETURNING *
        "#,
    )
    .bind(body.business_name)
    .bind(body.business_type)
    .bind(body.gst_number)
    .bind(body.bank_details.map(Jsonb))
    .bind(merchant_id)
    .fetch_optional(&db)
    .await?;

    Ok(ApiResponse::message(
        "Merchant updated",
        json!({ "merchant": merchant, "business": business }),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRequest {
    name: String,
    #[serde(rename = "type")]
    store_type: String,
    category: String,
    description: Option<String>,
    contact_info: ContactInfo,
    address: StoreAddress,
    business_hours: Option<Vec<BusinessHours>>,
    settings: Option<StoreSettings>,
}

impl StoreRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let name = self.name.trim();
        if name.len() < 2 || name.len() > 100 {
            return Err(ApiError::validation(
                "Store name must be between 2 and 100 characters",
            ));
        }
        if !STORE_TYPES.contains(&self.store_type.as_str()) {
            return Err(ApiError::validation("Invalid store type"));
        }
        if self.contact_info.phone.trim().is_empty() {
            return Err(ApiError::validation("Phone number is required"));
        }
        if !self.contact_info.email.contains('@') {
            return Err(ApiError::validation("Please enter a valid email"));
        }
        Ok(())
    }
}

pub async fn create_store(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(merchant_id): Path<Uuid>,
    Json(body): Json<StoreRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::StoresManage)?;
    current_user.require_self_or_admin(merchant_id)?;

    fetch_merchant(&db, merchant_id).await?;
    body.validate()?;

    let store = sqlx::query_as::<_, Store>(
        r#"
        INSERT INTO stores (
            owner_id, name, store_type, category, description,
            contact_info, address, business_hours, settings
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(merchant_id)
    .bind(body.name.trim())
    .bind(&body.store_type)
    .bind(&body.category)
    .bind(body.description)
    .bind(Jsonb(&body.contact_info))
    .bind(Jsonb(&body.address))
    .bind(Jsonb(body.business_hours.unwrap_or_default()))
    .bind(Jsonb(body.settings.unwrap_or_default()))
    .fetch_one(&db)
    .await?;

    Ok(ApiResponse::created("Store created", json!({ "store": store })))
}

pub async fn list_merchant_stores(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(merchant_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::StoresManage)?;
    current_user.require_self_or_admin(merchant_id)?;

    let stores = sqlx::query_as::<_, Store>(
        "SELECT * FROM stores WHERE owner_id = $1 ORDER BY created_at",
    )
    .bind(merchant_id)
    .fetch_all(&db)
    .await?;

    Ok(ApiResponse::ok(json!({ "stores": stores })))
}

pub async fn delete_store(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path((merchant_id, store_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::StoresManage)?;
    current_user.require_self_or_admin(merchant_id)?;

    let store = fetch_merchant_store(&db, merchant_id, store_id).await?;

    // Products go with the store; orders keep their store reference
    sqlx::query("DELETE FROM products WHERE store_id = $1")
        .bind(store.id)
        .execute(&db)
        .await?;
    sqlx::query("DELETE FROM stores WHERE id = $1")
        .bind(store.id)
        .execute(&db)
        .await?;

    Ok(ApiResponse::message("Store deleted successfully", json!({})))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockPatch {
    quantity: Option<i32>,
    low_stock_threshold: Option<i32>,
    track_inventory: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    name: String,
    description: String,
    price: Decimal,
    original_price: Option<Decimal>,
    discount: Option<Decimal>,
    category: String,
    subcategory: Option<String>,
    images: Option<Vec<ProductImage>>,
    stock: Option<StockPatch>,
    variants: Option<Vec<Variant>>,
    attributes: Option<Vec<Attribute>>,
    tax: Option<TaxInfo>,
    is_available: Option<bool>,
    is_featured: Option<bool>,
    tags: Option<Vec<String>>,
}

impl ProductRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let name = self.name.trim();
        if name.len() < 2 || name.len() > 100 {
            return Err(ApiError::validation(
                "Product name must be between 2 and 100 characters",
            ));
        }
        if self.description.trim().is_empty() || self.description.len() > 1000 {
            return Err(ApiError::validation(
                "Product description is required and cannot exceed 1000 characters",
            ));
        }
        if self.price < Decimal::ZERO {
            return Err(ApiError::validation("Price cannot be negative"));
        }
        if let Some(discount) = self.discount {
            if discount < Decimal::ZERO || discount > Decimal::from(100) {
                return Err(ApiError::validation("Discount must be between 0 and 100"));
            }
        }
        if let Some(stock) = &self.stock {
            if stock.quantity.unwrap_or(0) < 0 {
                return Err(ApiError::validation("Stock quantity cannot be negative"));
            }
        }
        if self.category.trim().is_empty() {
            return Err(ApiError::validation("Category is required"));
        }
        Ok(())
    }
}

pub async fn add_product(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path((merchant_id, store_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<ProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::ProductsManage)?;
    current_user.require_self_or_admin(merchant_id)?;

    let store = fetch_merchant_store(&db, merchant_id, store_id).await?;
    body.validate()?;

    let stock = body.stock.unwrap_or(StockPatch {
        quantity: None,
        low_stock_threshold: None,
        track_inventory: None,
    });

    let product = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (
            store_id, name, description, price, original_price, discount,
            category, subcategory, images, stock_quantity, low_stock_threshold,
            track_inventory, variants, attributes, tax, is_available, is_featured, tags
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        RETURNING *
        "#,
    )
    .bind(store.id)
    .bind(body.name.trim())
    .bind(body.description.trim())
    .bind(body.price)
    .bind(body.original_price)
    .bind(body.discount)
    .bind(&body.category)
    .bind(body.subcategory)
    .bind(Jsonb(body.images.unwrap_or_default()))
    .bind(stock.quantity.unwrap_or(0))
    .bind(stock.low_stock_threshold.unwrap_or(10))
    .bind(stock.track_inventory.unwrap_or(true))
    .bind(Jsonb(body.variants.unwrap_or_default()))
    .bind(Jsonb(body.attributes.unwrap_or_default()))
    .bind(Jsonb(body.tax.unwrap_or_default()))
    .bind(body.is_available.unwrap_or(true))
    .bind(body.is_featured.unwrap_or(false))
    .bind(Jsonb(body.tags.unwrap_or_default()))
    .fetch_one(&db)
    .await?;

    Ok(ApiResponse::created(
        "Product created",
        json!({ "product": ProductResponse::from(product) }),
    ))
}

pub async fn list_store_products(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path((merchant_id, store_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::ProductsManage)?;
    current_user.require_self_or_admin(merchant_id)?;

    fetch_merchant_store(&db, merchant_id, store_id).await?;

    let page = query.page();
    let limit = query.limit_or(DEFAULT_PAGE_SIZE);
    let offset = query.offset(limit);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE store_id = $1")
        .bind(store_id)
        .fetch_one(&db)
        .await?;

    let products = sqlx::query_as::<_, Product>(
        r#"
        SELECT * FROM products
        WHERE store_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(store_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&db)
    .await?;

    let products: Vec<ProductResponse> =
        products.into_iter().map(ProductResponse::from).collect();

    Ok(ApiResponse::ok(json!({
        "products": products,
        "pagination": Pagination::new(page, limit, total),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    name: Option<String>,
    description: Option<String>,
    price: Option<Decimal>,
    original_price: Option<Decimal>,
    discount: Option<Decimal>,
    category: Option<String>,
    subcategory: Option<String>,
    images: Option<Vec<ProductImage>>,
    stock: Option<StockPatch>,
    variants: Option<Vec<Variant>>,
    attributes: Option<Vec<Attribute>>,
    tax: Option<TaxInfo>,
    is_available: Option<bool>,
    is_featured: Option<bool>,
    tags: Option<Vec<String>>,
}

pub async fn update_product(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path((merchant_id, store_id, product_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::ProductsManage)?;
    current_user.require_self_or_admin(merchant_id)?;

    fetch_merchant_store(&db, merchant_id, store_id).await?;

    if let Some(price) = body.price {
        if price < Decimal::ZERO {
            return Err(ApiError::validation("Price cannot be negative"));
        }
    }
    if let Some(discount) = body.discount {
        if discount < Decimal::ZERO || discount > Decimal::from(100) {
            return Err(ApiError::validation("Discount must be between 0 and 100"));
        }
    }

    let stock = body.stock.unwrap_or(StockPatch {
        quantity: None,
        low_stock_threshold: None,
        track_inventory: None,
    });

    let product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET name = COALESCE($1, name),
            description = COALESCE($2, description),
            price = COALESCE($3, price),
            original_price = COALESCE($4, original_price),
            discount = COALESCE($5, discount),
            category = COALESCE($6, category),
            subcategory = COALESCE($7, subcategory),
            images = COALESCE($8, images),
            stock_quantity = COALESCE($9, stock_quantity),
            low_stock_threshold = COALESCE($10, low_stock_threshold),
            track_inventory = COALESCE($11, track_inventory),
            variants = COALESCE($12, variants),
            attributes = COALESCE($13, attributes),
            tax = COALESCE($14, tax),
            is_available = COALESCE($15, is_available),
            is_featured = COALESCE($16, is_featured),
            tags = COALESCE($17, tags),
            updated_at = NOW()
        WHERE id = $18 AND store_id = $19
        RETURNING *
        "#,
    )
    .bind(body.name)
    .bind(body.description)
    .bind(body.price)
    .bind(body.original_price)
    .bind(body.discount)
    .bind(body.category)
    .bind(body.subcategory)
    .bind(body.images.map(Jsonb))
    .bind(stock.quantity)
    .bind(stock.low_stock_threshold)
    .bind(stock.track_inventory)
    .bind(body.variants.map(Jsonb))
    .bind(body.attributes.map(Jsonb))
    .bind(body.tax.map(Jsonb))
    .bind(body.is_available)
    .bind(body.is_featured)
    .bind(body.tags.map(Jsonb))
    .bind(product_id)
    .bind(store_id)
    .fetch_optional(&db)
    .await?
    .ok_or(ApiError::NotFound("Product"))?;

    Ok(ApiResponse::message(
        "Product updated",
        json!({ "product": ProductResponse::from(product) }),
    ))
}

pub async fn delete_product(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path((merchant_id, store_id, product_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::ProductsManage)?;
    current_user.require_self_or_admin(merchant_id)?;

    fetch_merchant_store(&db, merchant_id, store_id).await?;

    let deleted = sqlx::query("DELETE FROM products WHERE id = $1 AND store_id = $2")
        .bind(product_id)
        .bind(store_id)
        .execute(&db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("Product"));
    }

    Ok(ApiResponse::message("Product deleted successfully", json!({})))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantOrderFilters {
    page: Option<i64>,
    limit: Option<i64>,
    status: Option<String>,
}

pub async fn merchant_orders(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(merchant_id): Path<Uuid>,
    Query(filters): Query<MerchantOrderFilters>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::OrdersManage)?;
    current_user.require_self_or_admin(merchant_id)?;

    fetch_merchant(&db, merchant_id).await?;

    let page_query = PageQuery {
        page: filters.page,
        limit: filters.limit,
        search: None,
    };
    let page = page_query.page();
    let limit = page_query.limit_or(DEFAULT_PAGE_SIZE);
    let offset = page_query.offset(limit);

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM orders
        WHERE store_id IN (SELECT id FROM stores WHERE owner_id = $1)
          AND ($2::text IS NULL OR status = $2)
        "#,
    )
    .bind(merchant_id)
    .bind(&filters.status)
    .fetch_one(&db)
    .await?;

    let orders = sqlx::query_as::<_, Order>(
        r#"
        SELECT * FROM orders
        WHERE store_id IN (SELECT id FROM stores WHERE owner_id = $1)
          AND ($2::text IS NULL OR status = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(merchant_id)
    .bind(&filters.status)
    .bind(limit)
    .bind(offset)
    .fetch_all(&db)
    .await?;

    Ok(ApiResponse::ok(json!({
        "orders": orders,
        "pagination": Pagination::new(page, limit, total),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantStatusRequest {
    status: String,
    note: Option<String>,
}

pub async fn update_order_status(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path((merchant_id, order_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<MerchantStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::OrdersManage)?;
    current_user.require_self_or_admin(merchant_id)?;

    let status = OrderStatus::parse(&body.status)
        .ok_or(ApiError::validation("Invalid order status"))?;

    let mut order = sqlx::query_as::<_, Order>(
        r#"
        SELECT * FROM orders
        WHERE id = $1 AND store_id IN (SELECT id FROM stores WHERE owner_id = $2)
        "#,
    )
    .bind(order_id)
    .bind(merchant_id)
    .fetch_optional(&db)
    .await?
    .ok_or(ApiError::NotFound("Order"))?;

    order.set_status(status, Some(current_user.id), body.note);

    sqlx::query(
        "UPDATE orders SET status = $1, status_history = $2, updated_at = NOW() WHERE id = $3",
    )
    .bind(&order.status)
    .bind(Jsonb(&order.status_history.0))
    .bind(order.id)
    .execute(&db)
    .await?;

    Ok(ApiResponse::message("Order status updated", json!({ "order": order })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsQuery {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

pub async fn merchant_earnings(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(merchant_id): Path<Uuid>,
    Query(query): Query<EarningsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::OrdersManage)?;
    current_user.require_self_or_admin(merchant_id)?;

    fetch_merchant(&db, merchant_id).await?;

    let (earnings, order_count): (Decimal, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(total_amount), 0), COUNT(*)
        FROM orders
        WHERE status = 'delivered'
          AND store_id IN (SELECT id FROM stores WHERE owner_id = $1)
          AND ($2::date IS NULL OR created_at::date >= $2)
          AND ($3::date IS NULL OR created_at::date <= $3)
        "#,
    )
    .bind(merchant_id)
    .bind(query.start_date)
    .bind(query.end_date)
    .fetch_one(&db)
    .await?;

    Ok(ApiResponse::ok(json!({
        "earnings": earnings,
        "orderCount": order_count,
    })))
}

struct DocumentUpload {
    kind: Option<String>,
    number: Option<String>,
    filename: Option<String>,
    data: axum::body::Bytes,
}

async fn parse_document_multipart(mut multipart: Multipart) -> Result<DocumentUpload, ApiError> {
    let mut upload = DocumentUpload {
        kind: None,
        number: None,
        filename: None,
        data: axum::body::Bytes::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::validation("Malformed multipart body"))?
    {
        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        if name == "file" {
            upload.filename = field.file_name().map(|s| s.to_string());
            upload.data = field
                .bytes()
                .await
                .map_err(|_| ApiError::validation("Malformed multipart body"))?;
        } else {
            let value = String::from_utf8(
                field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::validation("Malformed multipart body"))?
                    .to_vec(),
            )
            .map_err(|_| ApiError::validation("Malformed multipart body"))?;

            match name.as_str() {
                "type" => upload.kind = Some(value),
                "number" => upload.number = Some(value),
                _ => (),
            }
        }
    }

    Ok(upload)
}

async fn save_document(filename: &str, data: &[u8]) -> Result<String, ApiError> {
    let documents_dir = PathBuf::from("uploads/documents");
    if !documents_dir.exists() {
        fs::create_dir_all(&documents_dir)
            .await
            .map_err(|err| {
                log::error!("Failed to create uploads directory: {}", err);
                ApiError::validation("Failed to store document")
            })?;
    }

    let extension = PathBuf::from(filename)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !["pdf", "png", "jpg", "jpeg"].contains(&extension.as_str()) {
        return Err(ApiError::validation(
            "Document must be a PDF, PNG or JPEG file",
        ));
    }

    let file_name = format!("{}.{}", Uuid::new_v4(), extension);
    let file_path = documents_dir.join(&file_name);
    fs::write(&file_path, data).await.map_err(|err| {
        log::error!("Failed to write document: {}", err);
        ApiError::validation("Failed to store document")
    })?;

    Ok(format!("/uploads/documents/{}", file_name))
}

// Verification document upload: the file lands under uploads/, the
// checklist entry is appended to the store record unverified.
pub async fn upload_store_document(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path((merchant_id, store_id)): Path<(Uuid, Uuid)>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::StoresManage)?;
    current_user.require_self_or_admin(merchant_id)?;

    let mut store = fetch_merchant_store(&db, merchant_id, store_id).await?;
    let upload = parse_document_multipart(multipart).await?;

    let kind = upload
        .kind
        .ok_or(ApiError::validation("Document type is required"))?;
    if !DOCUMENT_TYPES.contains(&kind.as_str()) {
        return Err(ApiError::validation("Invalid document type"));
    }
    let filename = upload
        .filename
        .filter(|_| !upload.data.is_empty())
        .ok_or(ApiError::validation("Document file is required"))?;

    let file_url = save_document(&filename, &upload.data).await?;

    let document = StoreDocument {
        kind,
        number: upload.number,
        file_url: Some(file_url),
        verified: false,
    };
    store.documents.0.push(document.clone());

    sqlx::query("UPDATE stores SET documents = $1, updated_at = NOW() WHERE id = $2")
        .bind(Jsonb(&store.documents.0))
        .bind(store.id)
        .execute(&db)
        .await?;

    Ok(ApiResponse::created(
        "Document uploaded",
        json!({ "document": document }),
    ))
}
