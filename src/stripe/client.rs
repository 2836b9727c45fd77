use async_trait::async_trait;
use serde::Deserialize;

use super::config::StripeConfig;
use super::event::ChargeObject;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Api(String),
    #[error("stripe request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

/// Typed seam over the provider API. The webhook dispute path and the tests
/// substitute their own implementations.
#[async_trait]
pub trait StripeGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        amount: i64,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayError>;

    async fn retrieve_charge(&self, charge_id: &str) -> Result<ChargeObject, GatewayError>;
}

#[derive(Clone)]
pub struct StripeHttpClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeHttpClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: config.secret_key.clone(),
            api_base: config.api_base.clone(),
        }
    }
}

#[async_trait]
impl StripeGateway for StripeHttpClient {
    async fn create_payment_intent(
        &self,
        amount: i64,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&[
                ("amount", amount.to_string()),
                ("currency", currency.to_string()),
                ("automatic_payment_methods[enabled]", "true".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json::<PaymentIntent>().await?)
    }

    async fn retrieve_charge(&self, charge_id: &str) -> Result<ChargeObject, GatewayError> {
        let response = self
            .http
            .get(format!("{}/v1/charges/{charge_id}", self.api_base))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json::<ChargeObject>().await?)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

async fn api_error(response: reqwest::Response) -> GatewayError {
    let status = response.status();
    match response.json::<ApiErrorBody>().await {
        Ok(body) => GatewayError::Api(
            body.error
                .message
                .unwrap_or_else(|| format!("stripe error ({status})")),
        ),
        Err(_) => GatewayError::Api(format!("stripe error ({status})")),
    }
}
