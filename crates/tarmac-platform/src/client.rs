//! The platform client.

use reqwest::Client;

use crate::config::PlatformConfig;

/// Client for the Job Platform REST API.
///
/// Holds one HTTP client and the immutable configuration. Each method
/// performs a single request and blocks the calling task until the
/// response arrives; there is no client-side caching and no concurrent
/// submission within one client.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    /// HTTP client for making requests.
    pub(crate) http: Client,
    /// Credentials and endpoints.
    pub(crate) config: PlatformConfig,
}

impl PlatformClient {
    /// Creates a new client from the given configuration.
    #[must_use]
    pub fn new(config: PlatformConfig) -> Self {
        Self { http: Client::new(), config }
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }
}
