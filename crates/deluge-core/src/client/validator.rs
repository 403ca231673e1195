use crate::client::connection::{DelugeClient, DEFAULT_TIMEOUT};
use crate::client::error::ClientError;
use crate::config::ClientConfig;

use async_trait::async_trait;
use std::time::Duration;

/// Checks that a candidate config can log in to its endpoint.
///
/// Implementations keep no state between calls: validating the same config
/// twice performs two independent attempts.
#[async_trait]
pub trait ConnectionValidator: Send + Sync + 'static {
    async fn authenticate_and_connect(&self, config: &ClientConfig) -> Result<(), ClientError>;
}

/// Validates against a live Deluge Web UI, one fresh session per call.
#[derive(Clone, Debug)]
pub struct DelugeValidator {
    timeout: Duration,
}

impl DelugeValidator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for DelugeValidator {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl ConnectionValidator for DelugeValidator {
    async fn authenticate_and_connect(&self, config: &ClientConfig) -> Result<(), ClientError> {
        log::info!("Testing connection {:?} at {}", config.nickname(), config.url());
        let client = DelugeClient::with_timeout(config.clone(), self.timeout)?;
        client.authenticate_and_connect().await
    }
}
