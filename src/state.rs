use std::sync::Arc;

use sqlx::SqlitePool;

use crate::stripe::{StripeConfig, StripeGateway};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub stripe: StripeConfig,
    pub gateway: Arc<dyn StripeGateway>,
    pub admin_api_token: Option<String>,
}
