use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use paygate::{
    auth::admin_auth,
    handlers::{
        admin::{get_event_handler, list_events_handler, list_logs_handler},
        payments::create_intent_handler,
        webhook::stripe_webhook_handler,
    },
    state::AppState,
    stripe::{StripeConfig, StripeGateway, StripeHttpClient},
};
use sqlx::sqlite::SqlitePoolOptions;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:paygate.db".to_string());
    let bind_addr =
        std::env::var("PAYGATE_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let admin_api_token = std::env::var("PAYGATE_ADMIN_API_TOKEN").ok();

    let stripe = StripeConfig::from_env()?;

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON;")
        .execute(&pool)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let gateway: Arc<dyn StripeGateway> = Arc::new(StripeHttpClient::new(&stripe));
    let state = AppState {
        pool,
        stripe,
        gateway,
        admin_api_token,
    };

    let admin_router = Router::new()
        .route("/events", get(list_events_handler))
        .route("/events/:event_id", get(get_event_handler))
        .route("/logs", get(list_logs_handler))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth));

    let app = Router::new()
        .route("/payments/intent", post(create_intent_handler))
        .route("/webhooks/stripe", post(stripe_webhook_handler))
        .nest("/admin", admin_router)
        .with_state(state);

    let addr: SocketAddr = bind_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
