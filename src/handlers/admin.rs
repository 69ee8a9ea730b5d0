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
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    database::Database,
    errors::ApiError,
    middleware::get_current_user,
    models::{Order, Permission, Store, User, STORE_STATUSES, USER_STATUSES},
    response::ApiResponse,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

pub async fn platform_stats(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::PlatformAdmin)?;

    let total_users: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM users
        WHERE ($1::date IS NULL OR created_at::date >= $1)
          AND ($2::date IS NULL OR created_at::date <= $2)
        "#,
    )
    .bind(query.start_date)
    .bind(query.end_date)
    .fetch_one(&db)
    .await?;

    let total_stores: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM stores
        WHERE ($1::date IS NULL OR created_at::date >= $1)
          AND ($2::date IS NULL OR created_at::date <= $2)
        "#,
    )
    .bind(query.start_date)
    .bind(query.end_date)
    .fetch_one(&db)
    .await?;

    let (total_orders, total_revenue): (i64, Decimal) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COALESCE(SUM(total_amount), 0)
        FROM orders
        WHERE ($1::date IS NULL OR created_at::date >= $1)
          AND ($2::date IS NULL OR created_at::date <= $2)
        "#,
    )
    .bind(query.start_date)
    .bind(query.end_date)
    .fetch_one(&db)
    .await?;

    Ok(ApiResponse::ok(json!({
        "totalUsers": total_users,
        "totalStores": total_stores,
        "totalOrders": total_orders,
        "totalRevenue": total_revenue,
    })))
}

// Five most recent records of each kind, newest first.
pub async fn recent_activity(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::PlatformAdmin)?;

    let new_users = sqlx::query_as::<_, User>(
        "SELECT * FROM users ORDER BY created_at DESC LIMIT 5",
    )
    .fetch_all(&db)
    .await?;

    let new_stores = sqlx::query_as::<_, Store>(
        "SELECT * FROM stores ORDER BY created_at DESC LIMIT 5",
    )
    .fetch_all(&db)
    .await?;

    let new_orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders ORDER BY created_at DESC LIMIT 5",
    )
    .fetch_all(&db)
    .await?;

    Ok(ApiResponse::ok(json!({
        "newUsers": new_users,
        "newStores": new_stores,
        "newOrders": new_orders,
    })))
}

pub async fn list_users(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::UsersManage)?;

    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
        .fetch_all(&db)
        .await?;

    Ok(ApiResponse::ok(json!({
        "results": users.len(),
        "users": users,
    })))
}

#[derive(Deserialize)]
pub struct StatusRequest {
    status: String,
}

pub async fn update_user_status(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(user_id): Path<Uuid>,
    Json(body): Json<StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::UsersManage)?;

    if !USER_STATUSES.contains(&body.status.as_str()) {
        return Err(ApiError::validation("Invalid status value"));
    }

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(&body.status)
    .bind(user_id)
    .fetch_optional(&db)
    .await?
    .ok_or(ApiError::NotFound("User"))?;

    Ok(ApiResponse::message("User status updated", json!({ "user": user })))
}

pub async fn list_stores(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::PlatformAdmin)?;

    let stores = sqlx::query_as::<_, Store>("SELECT * FROM stores ORDER BY created_at DESC")
        .fetch_all(&db)
        .await?;

    Ok(ApiResponse::ok(json!({
        "results": stores.len(),
        "stores": stores,
    })))
}

pub async fn update_store_status(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(store_id): Path<Uuid>,
    Json(body): Json<StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::PlatformAdmin)?;

    if !STORE_STATUSES.contains(&body.status.as_str()) {
        return Err(ApiError::validation("Invalid status value"));
    }

    let store = sqlx::query_as::<_, Store>(
        "UPDATE stores SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(&body.status)
    .bind(store_id)
    .fetch_optional(&db)
    .await?
    .ok_or(ApiError::NotFound("Store"))?;

    Ok(ApiResponse::message("Store status updated", json!({ "store": store })))
}
