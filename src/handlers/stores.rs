use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    database::Database,
    errors::ApiError,
    models::{Product, ProductResponse, Store},
    response::ApiResponse,
    utils::geo,
    utils::pagination::{PageQuery, Pagination, STOREFRONT_PAGE_SIZE},
};

// Public storefront endpoints; no authentication required for browsing.

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreFilters {
    page: Option<i64>,
    limit: Option<i64>,
    search: Option<String>,
    status: Option<String>,
    #[serde(rename = "type")]
    store_type: Option<String>,
    category: Option<String>,
}

fn apply_store_filters<'a>(
    builder: &mut QueryBuilder<'a, Postgres>,
    filters: &'a StoreFilters,
    pattern: &'a Option<String>,
) {
    let mut separator = " WHERE ";
    if let Some(pattern) = pattern {
        builder.push(separator).push("name ILIKE ").push_bind(pattern);
        separator = " AND ";
    }
    if let Some(status) = &filters.status {
        builder.push(separator).push("status = ").push_bind(status);
        separator = " AND ";
    }
    if let Some(store_type) = &filters.store_type {
        builder
            .push(separator)
            .push("store_type = ")
            .push_bind(store_type);
        separator = " AND ";
    }
    if let Some(category) = &filters.category {
        builder
            .push(separator)
            .push("category = ")
            .push_bind(category);
    }
}

pub async fn list_stores(
    State(db): State<Database>,
    Query(filters): Query<StoreFilters>,
) -> Result<impl IntoResponse, ApiError> {
    let page_query = PageQuery {
        page: filters.page,
        limit: filters.limit,
        search: filters.search.clone(),
    };
    let page = page_query.page();
    let limit = page_query.limit_or(STOREFRONT_PAGE_SIZE);
    let offset = page_query.offset(limit);
    let pattern = page_query.search_term().map(|term| format!("%{}%", term));

    let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM stores");
    apply_store_filters(&mut count_builder, &filters, &pattern);
    let total: i64 = count_builder.build_query_scalar().fetch_one(&db).await?;

    let mut builder = QueryBuilder::new("SELECT * FROM stores");
    apply_store_filters(&mut builder, &filters, &pattern);
    builder
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let stores: Vec<Store> = builder.build_query_as().fetch_all(&db).await?;

    Ok(ApiResponse::ok(json!({
        "stores": stores,
        "pagination": Pagination::new(page, limit, total),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    longitude: f64,
    latitude: f64,
    // Meters, like the mobile clients send
    max_distance: Option<f64>,
}

// Proximity lookup: candidate active stores filtered by haversine
// distance against the requested radius, nearest first.
pub async fn nearby_stores(
    State(db): State<Database>,
    Query(query): Query<NearbyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let max_km = query.max_distance.unwrap_or(5000.0) / 1000.0;
    let origin = [query.longitude, query.latitude];

    let stores = sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE status = 'active'")
        .fetch_all(&db)
        .await?;

    let mut nearby: Vec<(f64, Store)> = stores
        .into_iter()
        .filter_map(|store| {
            let distance = geo::distance_km(origin, store.address.0.location.coordinates);
            (distance <= max_km).then_some((distance, store))
        })
        .collect();
    nearby.sort_by(|a, b| a.0.total_cmp(&b.0));

    let stores: Vec<_> = nearby
        .into_iter()
        .map(|(distance, store)| {
            json!({
                "store": store,
                "distanceKm": distance,
            })
        })
        .collect();

    Ok(ApiResponse::ok(json!({ "stores": stores })))
}

pub async fn get_store(
    State(db): State<Database>,
    Path(store_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let store = sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = $1")
        .bind(store_id)
        .fetch_optional(&db)
        .await?
        .ok_or(ApiError::NotFound("Store"))?;

    let is_open = store.is_open_at(Utc::now());
    let full_address = store.full_address();

    Ok(ApiResponse::ok(json!({
        "store": store,
        "isOpen": is_open,
        "fullAddress": full_address,
    })))
}

pub async fn store_products(
    State(db): State<Database>,
    Path(store_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM stores WHERE id = $1")
        .bind(store_id)
        .fetch_optional(&db)
        .await?;
    if exists.is_none() {
        return Err(ApiError::NotFound("Store"));
    }

    let page = query.page();
    let limit = query.limit_or(STOREFRONT_PAGE_SIZE);
    let offset = query.offset(limit);
    let pattern = query.search_term().map(|term| format!("%{}%", term));

    let (total, products): (i64, Vec<Product>) = match &pattern {
        Some(pattern) => {
            let total = sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM products
                WHERE store_id = $1 AND is_available = TRUE
                  AND (name ILIKE $2 OR description ILIKE $2)
                "#,
            )
            .bind(store_id)
            .bind(pattern)
            .fetch_one(&db)
            .await?;

            let products = sqlx::query_as(
                r#"
                SELECT * FROM products
                WHERE store_id = $1 AND is_available = TRUE
                  AND (name ILIKE $2 OR description ILIKE $2)
                ORDER BY name
                LIMIT $3 OFFSET $4
                "#,
            )
            .bind(store_id)
            .bind(pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&db)
            .await?;

            (total, products)
        }
        None => {
            let total = sqlx::query_scalar(
                "SELECT COUNT(*) FROM products WHERE store_id = $1 AND is_available = TRUE",
            )
            .bind(store_id)
            .fetch_one(&db)
            .await?;

            let products = sqlx::query_as(
                r#"
                SELECT * FROM products
                WHERE store_id = $1 AND is_available = TRUE
                ORDER BY name
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(store_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&db)
            .await?;

            (total, products)
        }
    };

    let products: Vec<ProductResponse> = products.into_iter().map(ProductResponse::from).collect();

    Ok(ApiResponse::ok(json!({
        "products": products,
        "pagination": Pagination::new(page, limit, total),
    })))
}
