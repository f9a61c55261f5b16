use tracing::{info, warn};

pub const PUBLISHABLE_KEY_VAR: &str = "STRIPE_PUBLISHABLE_KEY";

/// Payment-provider initialisation settings. A missing key disables payments
/// instead of failing start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentSettings {
    Enabled { publishable_key: String },
    Disabled,
}

impl PaymentSettings {
    /// Reads the key from the process environment (after loading `.env`).
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!(error = %e, "No .env file loaded");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(PUBLISHABLE_KEY_VAR).filter(|key| !key.trim().is_empty()) {
            Some(key) => {
                info!("Payment provider key configured");
                PaymentSettings::Enabled {
                    publishable_key: key.trim().to_string(),
                }
            }
            None => {
                warn!(var = PUBLISHABLE_KEY_VAR, "Payment provider key missing; payments disabled");
                PaymentSettings::Disabled
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, PaymentSettings::Enabled { .. })
    }
}
