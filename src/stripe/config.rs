#[derive(Debug, thiserror::Error)]
#[error("missing required environment variable: {0}")]
pub struct MissingVar(pub &'static str);

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
    pub signature_tolerance_secs: i64,
}

impl StripeConfig {
    pub fn from_env() -> Result<Self, MissingVar> {
        let secret_key =
            std::env::var("STRIPE_SECRET_KEY").map_err(|_| MissingVar("STRIPE_SECRET_KEY"))?;
        let webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .map_err(|_| MissingVar("STRIPE_WEBHOOK_SECRET"))?;

        let mut config = Self {
            secret_key,
            webhook_secret,
            api_base: "https://api.stripe.com".to_string(),
            signature_tolerance_secs: 300,
        };

        if let Ok(value) = std::env::var("STRIPE_API_BASE")
            && !value.trim().is_empty()
        {
            config.api_base = value.trim_end_matches('/').to_string();
        }
        if let Ok(value) = std::env::var("PAYGATE_SIGNATURE_TOLERANCE_SECS")
            && let Ok(parsed) = value.parse::<i64>()
        {
            config.signature_tolerance_secs = parsed.max(0);
        }

        Ok(config)
    }
}
