//! Workspace lookup, creation, and content inspection.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::client::PlatformClient;
use crate::error::{PlatformError, Result};

/// Default cap on the flat file listing.
pub const DEFAULT_PAGE_SIZE: u32 = 800;

/// A persistent storage volume in the target org/ACE.
///
/// Identified by a platform-assigned ID and a human-chosen name. Created
/// once and referenced by ID thereafter; this client never deletes one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    #[serde(rename = "aceName", default)]
    pub ace_name: Option<String>,
}

/// A single entry from a workspace file listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
}

impl PlatformClient {
    /// Creates a workspace with the given name in the configured org/ACE.
    pub async fn create_workspace(&self, name: &str) -> Result<Workspace> {
        let token = self.fetch_token().await?;
        let url = format!("{}/v2/org/{}/workspaces/", self.config.api_url, self.config.org);
        let body = CreateWorkspaceRequest { ace_name: &self.config.ace, name };

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, url = %url, name, "workspace creation rejected");
            return Err(PlatformError::Workspace { status: status.as_u16(), url });
        }

        let body: WorkspaceEnvelope = response
            .json()
            .await
            .map_err(|e| PlatformError::malformed(url, e))?;
        info!(id = %body.workspace.id, name, "created workspace");
        Ok(body.workspace)
    }

    /// Looks up a workspace by name.
    ///
    /// A 404 is a valid "not found" result, not an error; any other
    /// non-200 is a hard failure.
    pub async fn get_workspace(&self, name: &str) -> Result<Option<Workspace>> {
        let token = self.fetch_token().await?;
        let url = format!("{}/v2/org/{}/workspaces/{}", self.config.api_url, self.config.org, name);

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(name, "workspace not found");
            return Ok(None);
        }
        if !status.is_success() {
            error!(status = %status, url = %url, name, "workspace lookup failed");
            return Err(PlatformError::Workspace { status: status.as_u16(), url });
        }

        let body: WorkspaceEnvelope = response
            .json()
            .await
            .map_err(|e| PlatformError::malformed(url, e))?;
        Ok(Some(body.workspace))
    }

    /// Looks up a workspace by name, creating it if it does not exist.
    ///
    /// Idempotent: calling this repeatedly with the same name performs at
    /// most one creation and never produces a duplicate.
    pub async fn ensure_workspace(&self, name: &str) -> Result<Workspace> {
        if let Some(workspace) = self.get_workspace(name).await? {
            debug!(id = %workspace.id, name, "reusing existing workspace");
            return Ok(workspace);
        }
        self.create_workspace(name).await
    }

    /// Lists files in a workspace, flat (non-recursive), capped at
    /// `page_size` entries.
    ///
    /// Entries beyond the cap are invisible: existence checks over large
    /// workspaces can give false negatives.
    pub async fn list_files(&self, workspace_id: &str, page_size: u32) -> Result<Vec<FileEntry>> {
        let token = self.fetch_token().await?;
        let url = format!(
            "{}/v2/org/{}/workspaces/{}/listFiles",
            self.config.api_url, self.config.org, workspace_id
        );

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/json")
            .query(&[("flat-dir", "true"), ("page-size", &page_size.to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, url = %url, workspace_id, "file listing failed");
            return Err(PlatformError::FileListing { status: status.as_u16(), url });
        }

        let body: ListFilesResponse = response
            .json()
            .await
            .map_err(|e| PlatformError::malformed(url, e))?;
        Ok(body.storage_objects)
    }

    /// Returns true iff `filename` appears (exact match) in the workspace
    /// listing. Subject to the [`DEFAULT_PAGE_SIZE`] listing cap.
    pub async fn file_exists(&self, workspace_id: &str, filename: &str) -> Result<bool> {
        let entries = self.list_files(workspace_id, DEFAULT_PAGE_SIZE).await?;
        let found = entries.iter().any(|entry| entry.name == filename);
        if found {
            info!(workspace_id, filename, "file already present in workspace");
        }
        Ok(found)
    }
}

// Wire types.

#[derive(Debug, Serialize)]
struct CreateWorkspaceRequest<'a> {
    #[serde(rename = "aceName")]
    ace_name: &'a str,
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct WorkspaceEnvelope {
    workspace: Workspace,
}

#[derive(Debug, Deserialize)]
struct ListFilesResponse {
    #[serde(rename = "storageObjects", default)]
    storage_objects: Vec<FileEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_wire_shape() {
        let body = CreateWorkspaceRequest { ace_name: "ace-east-1", name: "gpt-workspace" };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["aceName"], "ace-east-1");
        assert_eq!(json["name"], "gpt-workspace");
    }

    #[test]
    fn test_workspace_envelope_deserialization() {
        let body: WorkspaceEnvelope = serde_json::from_str(
            r#"{"workspace": {"id": "ws-123", "name": "gpt-workspace", "aceName": "ace-east-1"}}"#,
        )
        .unwrap();
        assert_eq!(body.workspace.id, "ws-123");
        assert_eq!(body.workspace.ace_name.as_deref(), Some("ace-east-1"));
    }

    #[test]
    fn test_list_files_response_tolerates_missing_array() {
        let body: ListFilesResponse = serde_json::from_str("{}").unwrap();
        assert!(body.storage_objects.is_empty());
    }
}
