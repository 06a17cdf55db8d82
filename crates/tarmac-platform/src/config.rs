//! Platform configuration.
//!
//! Built once at process start and passed by reference into the client;
//! there is no ambient/global configuration state.

use std::path::Path;

use serde::Deserialize;

use crate::error::{PlatformError, Result};

fn default_api_url() -> String {
    "https://api.ngc.nvidia.com".to_string()
}

fn default_auth_url() -> String {
    "https://authn.nvidia.com".to_string()
}

/// Credentials and endpoints for the Job Platform.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// Long-lived API key, exchanged for a short-lived token on every call.
    pub api_key: String,
    /// Organization identifier all requests are scoped to.
    pub org: String,
    /// Optional team inside the organization; widens the token scope and
    /// switches job submission to the team-scoped endpoint.
    #[serde(default)]
    pub team: Option<String>,
    /// Compute environment (ACE) workspaces and jobs are created in.
    pub ace: String,
    /// Base URL of the platform API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Base URL of the auth service.
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
}

impl PlatformConfig {
    /// Load configuration from a TOML file, then apply environment
    /// overrides (`TARMAC_API_KEY`, `TARMAC_ORG`, `TARMAC_TEAM`,
    /// `TARMAC_ACE`).
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)
            .map_err(|e| PlatformError::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from environment variables alone.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("TARMAC_API_KEY")
            .map_err(|_| PlatformError::Config("TARMAC_API_KEY is not set".to_string()))?;
        let org = std::env::var("TARMAC_ORG")
            .map_err(|_| PlatformError::Config("TARMAC_ORG is not set".to_string()))?;
        let ace = std::env::var("TARMAC_ACE")
            .map_err(|_| PlatformError::Config("TARMAC_ACE is not set".to_string()))?;
        let config = Self {
            api_key,
            org,
            team: std::env::var("TARMAC_TEAM").ok(),
            ace,
            api_url: default_api_url(),
            auth_url: default_auth_url(),
        };
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(api_key) = std::env::var("TARMAC_API_KEY") {
            self.api_key = api_key;
        }
        if let Ok(org) = std::env::var("TARMAC_ORG") {
            self.org = org;
        }
        if let Ok(team) = std::env::var("TARMAC_TEAM") {
            self.team = Some(team);
        }
        if let Ok(ace) = std::env::var("TARMAC_ACE") {
            self.ace = ace;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(PlatformError::Config("api_key is required".to_string()));
        }
        if self.org.trim().is_empty() {
            return Err(PlatformError::Config("org is required".to_string()));
        }
        if self.ace.trim().is_empty() {
            return Err(PlatformError::Config("ace is required".to_string()));
        }
        Ok(())
    }
}
