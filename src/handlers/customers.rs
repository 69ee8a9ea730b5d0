use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
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
        CustomerProfile, Order, Permission, Preferences, SavedAddress, User, UserProfile,
    },
    response::ApiResponse,
    utils::geo::GeoPoint,
    utils::pagination::{PageQuery, Pagination, DEFAULT_PAGE_SIZE},
};

async fn fetch_customer(db: &Database, customer_id: Uuid) -> Result<User, ApiError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND role = 'customer'")
        .bind(customer_id)
        .fetch_optional(db)
        .await?
        .ok_or(ApiError::NotFound("Customer"))
}

// List customers with pagination and case-insensitive search over name
// and email.
pub async fn list_customers(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::UsersManage)?;

    let page = query.page();
    let limit = query.limit_or(DEFAULT_PAGE_SIZE);
    let offset = query.offset(limit);
    let pattern = query.search_term().map(|term| format!("%{}%", term));

    let (total, customers): (i64, Vec<User>) = match &pattern {
        Some(pattern) => {
            let total = sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM users
                WHERE role = 'customer'
                  AND (email ILIKE $1
                       OR profile->>'firstName' ILIKE $1
                       OR profile->>'lastName' ILIKE $1)
                "#,
            )
            .bind(pattern)
            .fetch_one(&db)
            .await?;

            let customers = sqlx::query_as::<_, User>(
                r#"
                SELECT * FROM users
                WHERE role = 'customer'
                  AND (email ILIKE $1
                       OR profile->>'firstName' ILIKE $1
                       OR profile->>'lastName' ILIKE $1)
                ORDER BY created_at DESC
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&db)
            .await?;

            (total, customers)
        }
        None => {
            let total =
                sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'customer'")
                    .fetch_one(&db)
                    .await?;

            let customers = sqlx::query_as::<_, User>(
                r#"
                SELECT * FROM users
                WHERE role = 'customer'
                ORDER BY created_at DESC
                LIMIT $1 OFFSET $2
                "#,
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&db)
            .await?;

            (total, customers)
        }
    };

    Ok(ApiResponse::ok(json!({
        "customers": customers,
        "pagination": Pagination::new(page, limit, total),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    email: String,
    phone: Option<String>,
    profile: Option<UserProfile>,
}

pub async fn create_customer(
    State(db): State<Database>,
    Json(body): Json<CreateCustomerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.email.trim().is_empty() || !body.email.contains('@') {
        return Err(ApiError::validation("Please enter a valid email"));
    }

    let profile = body.profile.unwrap_or_default();
    let customer = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, phone, role, profile)
        VALUES ($1, $2, 'customer', $3)
        RETURNING *
        "#,
    )
    .bind(body.email.trim())
    .bind(body.phone)
    .bind(Jsonb(&profile))
    .fetch_one(&db)
    .await?;

    sqlx::query("INSERT INTO customer_profiles (user_id) VALUES ($1) ON CONFLICT DO NOTHING")
        .bind(customer.id)
        .execute(&db)
        .await?;

    Ok(ApiResponse::created(
        "Customer created",
        json!({ "customer": customer }),
    ))
}

pub async fn get_profile(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(customer_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::ProfileRead)?;
    current_user.require_self_or_admin(customer_id)?;

    let customer = fetch_customer(&db, customer_id).await?;

    let profile = sqlx::query_as::<_, CustomerProfile>(
        "SELECT * FROM customer_profiles WHERE user_id = $1",
    )
    .bind(customer_id)
    .fetch_optional(&db)
    .await?;

    let addresses = sqlx::query_as::<_, SavedAddress>(
        "SELECT * FROM customer_addresses WHERE customer_id = $1 ORDER BY created_at",
    )
    .bind(customer_id)
    .fetch_all(&db)
    .await?;

    let favorite_stores: Vec<Uuid> = sqlx::query_scalar(
        "SELECT store_id FROM customer_favorite_stores WHERE customer_id = $1 ORDER BY added_at",
    )
    .bind(customer_id)
    .fetch_all(&db)
    .await?;

    Ok(ApiResponse::ok(json!({
        "customer": customer,
        "preferences": profile.map(|p| p.preferences.0),
        "savedAddresses": addresses,
        "favoriteStores": favorite_stores,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    email: Option<String>,
    phone: Option<String>,
    profile: Option<UserProfile>,
    preferences: Option<Preferences>,
}

pub async fn update_profile(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(customer_id): Path<Uuid>,
    Json(body): Json<UpdateCustomerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::ProfileWrite)?;
    current_user.require_self_or_admin(customer_id)?;

    fetch_customer(&db, customer_id).await?;

    let customer = sqlx::query_as::<_, User>(
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
    .bind(body.profile.map(|p| Jsonb(p)))
    .bind(customer_id)
    .fetch_one(&db)
    .await?;

    if let Some(preferences) = body.preferences {
        sqlx::query(
            r#"
            INSERT INTO customer_profiles (user_id, preferences)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET preferences = EXCLUDED.preferences, updated_at = NOW()
            "#,
        )
        .bind(customer_id)
        .bind(Jsonb(&preferences))
        .execute(&db)
        .await?;
    }

    Ok(ApiResponse::message(
        "Profile updated successfully",
        json!({ "customer": customer }),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFavoriteRequest {
    store_id: Uuid,
}

pub async fn add_favorite_store(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(customer_id): Path<Uuid>,
    Json(body): Json<AddFavoriteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::ProfileWrite)?;
    current_user.require_self_or_admin(customer_id)?;

    fetch_customer(&db, customer_id).await?;

    let store: Option<Uuid> = sqlx::query_scalar("SELECT id FROM stores WHERE id = $1")
        .bind(body.store_id)
        .fetch_optional(&db)
        .await?;
    if store.is_none() {
        return Err(ApiError::NotFound("Store"));
    }

    // Adding twice is a no-op, set semantics
    sqlx::query(
        r#"
        INSERT INTO customer_favorite_stores (customer_id, store_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(customer_id)
    .bind(body.store_id)
    .execute(&db)
    .await?;

    Ok(ApiResponse::message("Favorite store added", json!({})))
}

pub async fn remove_favorite_store(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path((customer_id, store_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::ProfileWrite)?;
    current_user.require_self_or_admin(customer_id)?;

    sqlx::query(
        "DELETE FROM customer_favorite_stores WHERE customer_id = $1 AND store_id = $2",
    )
    .bind(customer_id)
    .bind(store_id)
    .execute(&db)
    .await?;

    Ok(ApiResponse::message("Favorite store removed", json!({})))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAddressRequest {
    street: String,
    city: String,
    state: String,
    pincode: String,
    #[serde(default)]
    is_default: bool,
    location: Option<GeoPoint>,
}

pub async fn add_saved_address(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(customer_id): Path<Uuid>,
    Json(body): Json<AddAddressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::ProfileWrite)?;
    current_user.require_self_or_admin(customer_id)?;

    fetch_customer(&db, customer_id).await?;

    if body.street.trim().is_empty()
        || body.city.trim().is_empty()
        || body.state.trim().is_empty()
    {
        return Err(ApiError::validation("Street, city and state are required"));
    }
    if body.pincode.len() != 6 || !body.pincode.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::validation("Please enter a valid 6-digit pincode"));
    }

    // Only one default address per customer
    if body.is_default {
        sqlx::query("UPDATE customer_addresses SET is_default = FALSE WHERE customer_id = $1")
            .bind(customer_id)
            .execute(&db)
            .await?;
    }

    let address = sqlx::query_as::<_, SavedAddress>(
        r#"
        INSERT INTO customer_addresses (customer_id, street, city, state, pincode, is_default, location)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(customer_id)
    .bind(body.street.trim())
    .bind(body.city.trim())
    .bind(body.state.trim())
    .bind(&body.pincode)
    .bind(body.is_default)
    .bind(Jsonb(body.location.unwrap_or_default()))
    .fetch_one(&db)
    .await?;

    Ok(ApiResponse::created("Address added", json!({ "address": address })))
}

pub async fn remove_saved_address(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path((customer_id, address_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::ProfileWrite)?;
    current_user.require_self_or_admin(customer_id)?;

    sqlx::query("DELETE FROM customer_addresses WHERE id = $1 AND customer_id = $2")
        .bind(address_id)
        .bind(customer_id)
        .execute(&db)
        .await?;

    Ok(ApiResponse::message("Address removed", json!({})))
}

pub async fn customer_orders(
    State(db): State<Database>,
    headers: HeaderMap,
    cookies: Cookies,
    Path(customer_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = get_current_user(&headers, &cookies, &db).await?;
    current_user.require(Permission::OrdersRead)?;
    current_user.require_self_or_admin(customer_id)?;

    fetch_customer(&db, customer_id).await?;

    let page = query.page();
    let limit = query.limit_or(DEFAULT_PAGE_SIZE);
    let offset = query.offset(limit);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_one(&db)
        .await?;

    let orders = sqlx::query_as::<_, Order>(
        r#"
        SELECT * FROM orders
        WHERE customer_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(customer_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&db)
    .await?;

    Ok(ApiResponse::ok(json!({
        "orders": orders,
        "pagination": Pagination::new(page, limit, total),
    })))
}
