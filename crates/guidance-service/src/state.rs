//! Application state.

use std::sync::Arc;

use guidance_store::Store;

use crate::config::ServiceConfig;
use crate::crypto::PasswordHasher;
use crate::workflows::FanOut;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Credential hasher.
    pub passwords: PasswordHasher,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        if config.payment_key_id.is_none() {
            tracing::warn!("Payment key not configured - /getkey will return 404");
        }

        let passwords = PasswordHasher::new(config.password_hash_cost);

        Self {
            store,
            config,
            passwords,
        }
    }

    /// Fan-out limits for batch workflows.
    #[must_use]
    pub fn fan_out(&self) -> FanOut {
        FanOut::from_config(&self.config)
    }
}
