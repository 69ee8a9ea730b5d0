use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sqlx::{types::Json as Jsonb, Postgres, QueryBuilder};
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    database::Database,
    errors::ApiError,
    middleware::get_current_user,
    models::{
        order::{generate_order_number, initial_status_history, OrderNotes},
        CancellationReason, DeliveryAddress, Discount, Order, OrderItem, OrderRating,
        OrderStatus, PaymentDetails, Permission, Product, TaxLine, PAYMENT_METHODS,
        PAYMENT_STATUSES,
    },
    response::ApiResponse,
    utils::pagination::{PageQuery, Pagination, DEFAULT_PAGE_SIZE},
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    customer: Uuid,
    store: Uuid,
    items: Vec<OrderItem>,
    subtotal: Decimal,
    tax: TaxLine,
    delivery_fee: Decimal,
    discount: Option<Discount>,
    total_amount: Decimal,
    delivery_address: DeliveryAddress,
    payment_method: String,
    notes: Option<OrderNotes>,
    estimated_delivery_time: Option<chrono::DateTime<Utc>>,
}

impl CreateOrderRequest {
    // Schema-level validation. The total identity (subtotal + tax + fee
    // - discount) is NOT checked; callers supply a consistent total.
    fn validate(&self) -> Result<(), ApiError> {
        if self.items.is_empty() {
            return Err(ApiError::validation("Order must contain at least one item"));
        }
        for item in &self.items {
            if item.quantity < 1 {
                return Err(ApiError::validation("Quantity must be at least 1"));
            }
            if item.price < Decimal::ZERO {
                return Err(ApiError::validation("Item price cannot be negative"));
            }
        }
        if self.subtotal < Decimal::ZERO {
            return Err(ApiError::validation("Subtotal cannot be negative"));
        }
        if self.tax.amount < Decimal::ZERO || self.tax.rate < Decimal::ZERO {
            return Err(ApiError::validation("Tax cannot be negative"));
        }
        if self.delivery_fee < Decimal::ZERO {
            return Err(ApiError::validation("Delivery fee cannot be negative"));
        }
        if let Some(discount) = &self.discount {
            if discount.amount < Decimal::ZERO {
                return Err(ApiError::validation("Discount cannot be negative"));
            }
        }
        if self.total_amount < Decimal::ZERO {
            return Err(ApiError::validation("Total amount cannot be negative"));
        }
        if !PAYMENT_METHODS.contains(&self.payment_method.as_str()) {
            return Err(ApiError::validation("Invalid payment method"));
        }
        let address = &self.delivery_address;
        if address.street.trim().is_empty()
            || address.city.trim().is_empty()
            || address.state.trim().is_empty()
            || address.pincode.trim().is_empty()
        {
            return Err(ApiError::validation("Delivery address is incomplete"));
        }
        Ok(())
    }
}

async fn fetch_order(db: &Database, order_id: Uuid) -> Result<Order, ApiError> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(db)
        .await?
        .ok_or(ApiError::NotFound("Order"))
}

async fn persist_status(db: &Database, order: &Order) -> Result<(), ApiError> {
    sqlx::query(
        r#"
        UPDATE orders
        SET status = $1, status_history = $2, cancellation_reason = $3, updated_at = NOW()
        WHERE id = $4
        "#,
    )
    .bind(&order.status)
    .bind(Jsonb(&order.status_history.0))
    .bind(&order.cancellation_reason)
    .bind(order.id)
    .execute(db)
    .await?;
    Ok(())
}

// Checkout. Stock is decremented with a conditional update per item so
// concurrent orders cannot race past the stock check; order insert and
// stock writes remain independent single-row writes (no cross-entity
// transaction).
pub async fn create_order(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Json(body): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::OrdersWrite)?;

    body.validate()?;

    let store_exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM stores WHERE id = $1")
        .bind(body.store)
        .fetch_optional(&db)
        .await?;
    if store_exists.is_none() {
        return Err(ApiError::NotFound("Store"));
    }

    for item in &body.items {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(item.product)
            .fetch_optional(&db)
            .await?
            .ok_or(ApiError::NotFound("Product"))?;

        if !product.track_inventory {
            continue;
        }

        let updated = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity - $1, updated_at = NOW()
            WHERE id = $2 AND track_inventory AND stock_quantity >= $1
            "#,
        )
        .bind(item.quantity)
        .bind(item.product)
        .execute(&db)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(ApiError::validation(format!(
                "Insufficient stock for product {}",
                product.name
            )));
        }
    }

    let now = Utc::now();
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    let order_number = generate_order_number(now.date_naive(), suffix);
    let history = initial_status_history(now);

    let order = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (
            order_number, customer_id, store_id, items, status, status_history,
            subtotal, tax, delivery_fee, discount, total_amount, delivery_address,
            payment_method, notes, estimated_delivery_time
        )
        VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING *
        "#,
    )
    .bind(&order_number)
    .bind(body.customer)
    .bind(body.store)
    .bind(Jsonb(&body.items))
    .bind(Jsonb(&history))
    .bind(body.subtotal)
    .bind(Jsonb(&body.tax))
    .bind(body.delivery_fee)
    .bind(Jsonb(body.discount.unwrap_or_default()))
    .bind(body.total_amount)
    .bind(Jsonb(&body.delivery_address))
    .bind(&body.payment_method)
    .bind(body.notes.map(Jsonb))
    .bind(body.estimated_delivery_time)
    .fetch_one(&db)
    .await?;

    Ok(ApiResponse::created(
        "Order created successfully",
        json!({ "order": order }),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilters {
    page: Option<i64>,
    limit: Option<i64>,
    status: Option<String>,
    customer: Option<Uuid>,
    store: Option<Uuid>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

impl OrderFilters {
    fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
            search: None,
        }
    }
}

fn apply_order_filters<'a>(
    builder: &mut QueryBuilder<'a, Postgres>,
    filters: &'a OrderFilters,
) {
    let mut separator = " WHERE ";
    if let Some(status) = &filters.status {
        builder.push(separator).push("status = ").push_bind(status);
        separator = " AND ";
    }
    if let Some(customer) = filters.customer {
        builder
            .push(separator)
            .push("customer_id = ")
            .push_bind(customer);
        separator = " AND ";
    }
    if let Some(store) = filters.store {
        builder.push(separator).push("store_id = ").push_bind(store);
        separator = " AND ";
    }
    if let Some(start) = filters.start_date {
        builder
            .push(separator)
            .push("created_at::date >= ")
            .push_bind(start);
        separator = " AND ";
    }
    if let Some(end) = filters.end_date {
        builder
            .push(separator)
            .push("created_at::date <= ")
            .push_bind(end);
    }
}

pub async fn list_orders(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Query(filters): Query<OrderFilters>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::OrdersRead)?;

    let page_query = filters.page_query();
    let page = page_query.page();
    let limit = page_query.limit_or(DEFAULT_PAGE_SIZE);
    let offset = page_query.offset(limit);

    let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM orders");
    apply_order_filters(&mut count_builder, &filters);
    let total: i64 = count_builder.build_query_scalar().fetch_one(&db).await?;

    let mut builder = QueryBuilder::new("SELECT * FROM orders");
    apply_order_filters(&mut builder, &filters);
    builder
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let orders: Vec<Order> = builder.build_query_as().fetch_all(&db).await?;

    Ok(ApiResponse::ok(json!({
        "orders": orders,
        "pagination": Pagination::new(page, limit, total),
    })))
}

pub async fn get_order(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::OrdersRead)?;

    let order = fetch_order(&db, order_id).await?;
    Ok(ApiResponse::ok(json!({ "order": order })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    status: String,
    note: Option<String>,
}

// Any status may replace any other; the history grows by one entry per
// call, duplicates included.
pub async fn update_order_status(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(order_id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::OrdersManage)?;

    let status = OrderStatus::parse(&body.status)
        .ok_or(ApiError::validation("Invalid order status"))?;

    let mut order = fetch_order(&db, order_id).await?;
    order.set_status(status, Some(current_user.id), body.note);
    persist_status(&db, &order).await?;

    Ok(ApiResponse::message("Order status updated", json!({ "order": order })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    reason: CancellationReason,
    note: Option<String>,
}

pub async fn cancel_order(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(order_id): Path<Uuid>,
    Json(body): Json<CancelOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::OrdersWrite)?;

    let mut order = fetch_order(&db, order_id).await?;
    order.cancel(body.reason, Some(current_user.id), body.note);
    persist_status(&db, &order).await?;

    Ok(ApiResponse::message("Order cancelled", json!({ "order": order })))
}

// Ratings are accepted regardless of order status; the delivered-only
// rule lives in the UI layer.
pub async fn rate_order(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(order_id): Path<Uuid>,
    Json(rating): Json<OrderRating>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::OrdersWrite)?;

    rating.validate().map_err(ApiError::Validation)?;

    let order = fetch_order(&db, order_id).await?;
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET rating = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(Jsonb(&rating))
    .bind(order.id)
    .fetch_one(&db)
    .await?;

    Ok(ApiResponse::message("Order rated", json!({ "order": order })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    payment_status: Option<String>,
    payment_details: Option<PaymentDetails>,
}

pub async fn update_payment(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(order_id): Path<Uuid>,
    Json(body): Json<UpdatePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::OrdersManage)?;

    if let Some(status) = &body.payment_status {
        if !PAYMENT_STATUSES.contains(&status.as_str()) {
            return Err(ApiError::validation("Invalid payment status"));
        }
    }

    let order = fetch_order(&db, order_id).await?;
    let order = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders
        SET payment_status = COALESCE($1, payment_status),
            payment_details = COALESCE($2, payment_details),
            updated_at = NOW()
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(body.payment_status)
    .bind(body.payment_details.map(Jsonb))
    .bind(order.id)
    .fetch_one(&db)
    .await?;

    Ok(ApiResponse::message("Payment updated", json!({ "order": order })))
}
