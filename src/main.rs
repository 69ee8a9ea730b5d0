mod database;
mod errors;
mod handlers;
mod middleware;
mod models;
mod response;
mod utils;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};
use std::env;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use dotenvy::dotenv;

use database::{create_database_pool, Database};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    // Initialize database
    let database_url = env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set");

    let db = create_database_pool(&database_url).await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run database migrations");

    log::info!("Database connection successful");

    // Build the application router
    let app = create_router(db.clone());

    // Get port from environment or use default
    let port = env::var("PORT").unwrap_or_else(|_| "4000".to_string());
    let addr = format!("0.0.0.0:{}", port);

    log::info!("quicklocal server starting on http://{}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    // Drain the pool before the process exits
    db.close().await;
    log::info!("Database connections closed");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn create_router(db: Database) -> Router {
    Router::new()
        // Auth routes (no authentication required)
        .route("/api/auth/otp/send", post(handlers::auth::send_otp))
        .route("/api/auth/otp/verify", post(handlers::auth::verify_otp))
        .route("/api/auth/guest", post(handlers::auth::guest_login))
        .route("/api/auth/users/:id/profile", patch(handlers::auth::update_user_profile))

        // Customer routes
        .route("/api/customers", get(handlers::customers::list_customers))
        .route("/api/customers", post(handlers::customers::create_customer))
        .route("/api/customers/profile/:id", get(handlers::customers::get_profile))
        .route("/api/customers/profile/:id", patch(handlers::customers::update_profile))
        .route("/api/customers/:id/favorites", post(handlers::customers::add_favorite_store))
        .route("/api/customers/:id/favorites/:store_id",
               delete(handlers::customers::remove_favorite_store))
        .route("/api/customers/:id/addresses", post(handlers::customers::add_saved_address))
        .route("/api/customers/:id/addresses/:address_id",
               delete(handlers::customers::remove_saved_address))
        .route("/api/customers/:id/orders", get(handlers::customers::customer_orders))

        // Public storefront routes
        .route("/api/stores", get(handlers::stores::list_stores))
        .route("/api/stores/nearby", get(handlers::stores::nearby_stores))
        .route("/api/stores/:id", get(handlers::stores::get_store))
        .route("/api/stores/:id/products", get(handlers::stores::store_products))

        // Merchant routes
        .route("/api/merchant/merchants", get(handlers::merchants::list_merchants))
        .route("/api/merchant/merchants", post(handlers::merchants::create_merchant))
        .route("/api/merchant/merchants/:id", get(handlers::merchants::get_merchant))
        .route("/api/merchant/merchants/:id", patch(handlers::merchants::update_merchant))
        .route("/api/merchant/merchants/:id/stores", get(handlers::merchants::list_merchant_stores))
        .route("/api/merchant/merchants/:id/stores", post(handlers::merchants::create_store))
        .route("/api/merchant/merchants/:id/stores/:store_id",
               delete(handlers::merchants::delete_store))
        .route("/api/merchant/merchants/:id/stores/:store_id/documents",
               post(handlers::merchants::upload_store_document))
        .route("/api/merchant/merchants/:id/stores/:store_id/products",
               get(handlers::merchants::list_store_products))
        .route("/api/merchant/merchants/:id/stores/:store_id/products",
               post(handlers::merchants::add_product))
        .route("/api/merchant/merchants/:id/stores/:store_id/products/:product_id",
               patch(handlers::merchants::update_product))
        .route("/api/merchant/merchants/:id/stores/:store_id/products/:product_id",
               delete(handlers::merchants::delete_product))
        .route("/api/merchant/merchants/:id/orders", get(handlers::merchants::merchant_orders))
        .route("/api/merchant/merchants/:id/orders/:order_id/status",
               patch(handlers::merchants::update_order_status))
        .route("/api/merchant/merchants/:id/earnings", get(handlers::merchants::merchant_earnings))

        // Order routes
        .route("/api/orders", get(handlers::orders::list_orders))
        .route("/api/orders", post(handlers::orders::create_order))
        .route("/api/orders/:id", get(handlers::orders::get_order))
        .route("/api/orders/:id/status", patch(handlers::orders::update_order_status))
        .route("/api/orders/:id/cancel", post(handlers::orders::cancel_order))
        .route("/api/orders/:id/rate", post(handlers::orders::rate_order))
        .route("/api/orders/:id/payment", patch(handlers::orders::update_payment))

        // Delivery routes
        .route("/api/delivery/:id/profile", patch(handlers::delivery::update_profile))
        .route("/api/delivery/:id/tasks/active", get(handlers::delivery::active_tasks))
        .route("/api/delivery/:id/tasks/completed", get(handlers::delivery::completed_tasks))
        .route("/api/delivery/:id/tasks/:order_id/status",
               patch(handlers::delivery::update_task_status))
        .route("/api/delivery/:id/location", patch(handlers::delivery::update_location))
        .route("/api/delivery/:id/earnings", get(handlers::delivery::earnings))

        // Admin routes
        .route("/api/admin/stats", get(handlers::admin::platform_stats))
        .route("/api/admin/activity", get(handlers::admin::recent_activity))
        .route("/api/admin/users", get(handlers::admin::list_users))
        .route("/api/admin/users/:id/status", patch(handlers::admin::update_user_status))
        .route("/api/admin/stores", get(handlers::admin::list_stores))
        .route("/api/admin/stores/:id/status", patch(handlers::admin::update_store_status))

        // Uploaded store documents
        .nest_service("/uploads", ServeDir::new("uploads"))

        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
        )
        .with_state(db)
}
