use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sqlx::types::Json as Jsonb;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    database::Database,
    errors::ApiError,
    middleware::get_current_user,
    models::{
        DeliveryProfile, Order, OrderStatus, Permission, User, UserProfile, VEHICLE_TYPES,
    },
    response::ApiResponse,
    utils::geo::GeoPoint,
};

// Statuses a delivery person is allowed to set on a task.
const TASK_STATUSES: &[&str] = &["picked", "in_transit", "delivered"];

async fn fetch_delivery_person(db: &Database, delivery_id: Uuid) -> Result<User, ApiError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND role = 'delivery'")
        .bind(delivery_id)
        .fetch_optional(db)
        .await?
        .ok_or(ApiError::NotFound("Delivery person"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeliveryProfileRequest {
    email: Option<String>,
    phone: Option<String>,
    profile: Option<UserProfile>,
    vehicle_type: Option<String>,
    vehicle_number: Option<String>,
    is_available: Option<bool>,
}

pub async fn update_profile(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(delivery_id): Path<Uuid>,
    Json(body): Json<UpdateDeliveryProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::ProfileWrite)?;
    current_user.require_self_or_admin(delivery_id)?;

    fetch_delivery_person(&db, delivery_id).await?;

    if let Some(vehicle_type) = &body.vehicle_type {
        if !VEHICLE_TYPES.contains(&vehicle_type.as_str()) {
            return Err(ApiError::validation("Invalid vehicle type"));
        }
    }

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
    .bind(body.profile.map(Jsonb))
    .bind(delivery_id)
    .fetch_one(&db)
    .await?;

    let existing = sqlx::query_as::<_, DeliveryProfile>(
        "SELECT * FROM delivery_profiles WHERE user_id = $1",
    )
    .bind(delivery_id)
    .fetch_optional(&db)
    .await?;

    let vehicle = match existing {
        Some(_) => {
            sqlx::query_as::<_, DeliveryProfile>(
                r#"
                UPDATE delivery_profiles
                SET vehicle_type = COALESCE($1, vehicle_type),
                    vehicle_number = COALESCE($2, vehicle_number),
                    is_available = COALESCE($3, is_available),
                    updated_at = NOW()
                WHERE user_id = $4
                RETURNING *
                "#,
            )
            .bind(body.vehicle_type)
            .bind(body.vehicle_number)
            .bind(body.is_available)
            .bind(delivery_id)
            .fetch_one(&db)
            .await?
        }
        None => {
            // First profile write must carry the full vehicle info
            let (vehicle_type, vehicle_number) =
                match (body.vehicle_type, body.vehicle_number) {
                    (Some(t), Some(n)) => (t, n),
                    _ => {
                        return Err(ApiError::validation(
                            "Vehicle type and vehicle number are required",
                        ))
                    }
                };

            sqlx::query_as::<_, DeliveryProfile>(
                r#"
                INSERT INTO delivery_profiles (user_id, vehicle_type, vehicle_number, is_available)
                VALUES ($1, $2, $3, COALESCE($4, TRUE))
                RETURNING *
                "#,
            )
            .bind(delivery_id)
            .bind(vehicle_type)
            .bind(vehicle_number)
            .bind(body.is_available)
            .fetch_one(&db)
            .await?
        }
    };

    Ok(ApiResponse::message(
        "Profile updated successfully",
        json!({ "user": user, "delivery": vehicle }),
    ))
}

pub async fn active_tasks(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(delivery_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::DeliveryTasks)?;
    current_user.require_self_or_admin(delivery_id)?;

    let tasks = sqlx::query_as::<_, Order>(
        r#"
        SELECT * FROM orders
        WHERE delivery_person_id = $1
          AND status IN ('assigned', 'picked', 'in_transit')
        ORDER BY created_at DESC
        "#,
    )
    .bind(delivery_id)
    .fetch_all(&db)
    .await?;

    Ok(ApiResponse::ok(json!({ "tasks": tasks })))
}

pub async fn completed_tasks(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(delivery_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::DeliveryTasks)?;
    current_user.require_self_or_admin(delivery_id)?;

    let tasks = sqlx::query_as::<_, Order>(
        r#"
        SELECT * FROM orders
        WHERE delivery_person_id = $1 AND status = 'delivered'
        ORDER BY created_at DESC
        "#,
    )
    .bind(delivery_id)
    .fetch_all(&db)
    .await?;

    Ok(ApiResponse::ok(json!({ "tasks": tasks })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusRequest {
    status: String,
    note: Option<String>,
}

pub async fn update_task_status(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path((delivery_id, order_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<TaskStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::DeliveryTasks)?;
    current_user.require_self_or_admin(delivery_id)?;

    if !TASK_STATUSES.contains(&body.status.as_str()) {
        return Err(ApiError::validation("Invalid order status"));
    }
    let status = OrderStatus::parse(&body.status)
        .ok_or(ApiError::validation("Invalid order status"))?;

    let mut order = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE id = $1 AND delivery_person_id = $2",
    )
    .bind(order_id)
    .bind(delivery_id)
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

    Ok(ApiResponse::message("Task status updated", json!({ "order": order })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdateRequest {
    latitude: f64,
    longitude: f64,
}

pub async fn update_location(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(delivery_id): Path<Uuid>,
    Json(body): Json<LocationUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::DeliveryTasks)?;
    current_user.require_self_or_admin(delivery_id)?;

    if !(-180.0..=180.0).contains(&body.longitude) || !(-90.0..=90.0).contains(&body.latitude) {
        return Err(ApiError::validation("Invalid coordinates"));
    }

    let profile = sqlx::query_as::<_, DeliveryProfile>(
        r#"
        UPDATE delivery_profiles
        SET current_location = $1, updated_at = NOW()
        WHERE user_id = $2
        RETURNING *
        "#,
    )
    .bind(Jsonb(GeoPoint::new(body.longitude, body.latitude)))
    .bind(delivery_id)
    .fetch_optional(&db)
    .await?
    .ok_or(ApiError::NotFound("Delivery person"))?;

    Ok(ApiResponse::message("Location updated", json!({ "delivery": profile })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsQuery {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

// Earnings are the delivery fees of delivered orders in the window.
pub async fn earnings(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(delivery_id): Path<Uuid>,
    Query(query): Query<EarningsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::DeliveryTasks)?;
    current_user.require_self_or_admin(delivery_id)?;

    fetch_delivery_person(&db, delivery_id).await?;

    let (earnings, order_count): (Decimal, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(delivery_fee), 0), COUNT(*)
        FROM orders
        WHERE delivery_person_id = $1
          AND status = 'delivered'
          AND ($2::date IS NULL OR created_at::date >= $2)
          AND ($3::date IS NULL OR created_at::date <= $3)
        "#,
    )
    .bind(delivery_id)
    .bind(query.start_date)
    .bind(query.end_date)
    .fetch_one(&db)
    .await?;

    Ok(ApiResponse::ok(json!({
        "earnings": earnings,
        "orderCount": order_count,
    })))
}
