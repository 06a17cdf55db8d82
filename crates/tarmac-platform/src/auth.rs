//! Token exchange against the platform auth service.
//!
//! Every authenticated API call fetches a fresh short-lived token; tokens
//! are never cached or reused across calls, so expiry never has to be
//! tracked (long job waits in particular re-authenticate on every poll).

use base64::{engine::general_purpose, Engine as _};
use reqwest::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use serde::Deserialize;
use tracing::{debug, error};

use crate::client::PlatformClient;
use crate::error::{PlatformError, Result};

/// Builds the authorization scope list for a token request.
///
/// Always contains the org scope; contains the team scope iff a team
/// was supplied.
#[must_use]
pub fn build_scopes(org: &str, team: Option<&str>) -> Vec<String> {
    let mut scopes = vec![format!("group/ngc:{org}")];
    if let Some(team) = team {
        scopes.push(format!("group/ngc:{org}/{team}"));
    }
    scopes
}

impl PlatformClient {
    /// Exchanges the configured API key for a bearer token scoped to the
    /// configured org (no team scope).
    ///
    /// Workspace and status operations use this; job submission widens
    /// the scope to the configured team via [`Self::fetch_token_scoped`].
    pub async fn fetch_token(&self) -> Result<String> {
        self.fetch_token_scoped(None).await
    }

    /// Exchanges the configured API key for a bearer token scoped to the
    /// configured org and, when given, a team.
    pub async fn fetch_token_scoped(&self, team: Option<&str>) -> Result<String> {
        let url = format!("{}/token", self.config.auth_url);
        let scopes = build_scopes(&self.config.org, team);
        debug!(org = %self.config.org, ?scopes, "requesting auth token");

        let credentials =
            general_purpose::STANDARD.encode(format!("$oauthtoken:{}", self.config.api_key));

        let mut query: Vec<(&str, &str)> = vec![("service", "ngc")];
        for scope in &scopes {
            query.push(("scope", scope));
        }

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Basic {credentials}"))
            .header(CONTENT_TYPE, "application/json")
            .header(CACHE_CONTROL, "no-cache")
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, url = %url, "token request rejected");
            return Err(PlatformError::Auth { status: status.as_u16(), url });
        }

        let body: TokenResponse =
            response.json().await.map_err(|e| PlatformError::malformed(url, e))?;
        Ok(body.token)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_list_without_team() {
        let scopes = build_scopes("acme", None);
        assert_eq!(scopes, vec!["group/ngc:acme".to_string()]);
    }

    #[test]
    fn test_scope_list_with_team() {
        let scopes = build_scopes("acme", Some("ml-infra"));
        assert_eq!(
            scopes,
            vec!["group/ngc:acme".to_string(), "group/ngc:acme/ml-infra".to_string()]
        );
    }

    #[test]
    fn test_team_scope_present_iff_team_supplied() {
        for team in [None, Some("ml-infra")] {
            let scopes = build_scopes("acme", team);
            assert!(scopes.contains(&"group/ngc:acme".to_string()));
            assert_eq!(scopes.iter().any(|s| s.contains('/') && s.ends_with("ml-infra")), team.is_some());
        }
    }

    #[test]
    fn test_basic_credentials_encoding() {
        let encoded = general_purpose::STANDARD.encode("$oauthtoken:secret");
        let decoded = general_purpose::STANDARD.decode(&encoded).unwrap();
        assert_eq!(decoded, b"$oauthtoken:secret");
    }

    #[test]
    fn test_token_response_deserialization() {
        let body: TokenResponse = serde_json::from_str(r#"{"token": "abc123"}"#).unwrap();
        assert_eq!(body.token, "abc123");
    }
}
