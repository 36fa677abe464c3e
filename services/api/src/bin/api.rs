//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{Argon2Hasher, ChromiumPdfAdapter, DbAdapter},
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, signup_handler},
        entries::{
            create_entry_handler, delete_entry_handler, get_entry_handler, list_entries_handler,
            stats_handler, update_entry_handler,
        },
        export::{export_bulk_handler, export_entry_handler},
        require_auth,
        state::AppState,
        ApiDoc,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter
        .run_migrations()
        .await
        .map_err(|e| ApiError::Internal(format!("Migration failure: {e}")))?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let pdf_adapter = Arc::new(ChromiumPdfAdapter::new(
        config.chrome_path.clone(),
        Duration::from_secs(config.render_timeout_secs),
    ));
    let hasher = Arc::new(Argon2Hasher);

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        pdf_renderer: pdf_adapter,
        passcodes: hasher,
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {e}")))?,
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/entries",
            get(list_entries_handler).post(create_entry_handler),
        )
        .route("/entries/stats/summary", get(stats_handler))
        .route("/entries/export-bulk", post(export_bulk_handler))
        .route(
            "/entries/{id}",
            get(get_entry_handler)
                .put(update_entry_handler)
                .delete(delete_entry_handler),
        )
        .route("/entries/{id}/export", get(export_entry_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
