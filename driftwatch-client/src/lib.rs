//! Driftwatch HTTP Client
//!
//! A type-safe HTTP client for the remote workspace management API used by
//! the drift detector: paginated workspace listing with server-side tag
//! filters, plan-only run creation, and run lookup.
//!
//! # Example
//!
//! ```no_run
//! use driftwatch_client::WorkspaceApiClient;
//!
//! #[tokio::main]
//! async fn main() -> driftwatch_client::Result<()> {
//!     let client = WorkspaceApiClient::new("https://app.example.com", "token");
//!
//!     let page = client
//!         .list_workspaces("my-org", &["team-a".to_string()], &[], 1)
//!         .await?;
//!     println!("got {} workspaces", page.workspaces.len());
//!     Ok(())
//! }
//! ```

pub mod error;
mod runs;
mod workspaces;

pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the remote workspace management API
///
/// Methods are organized in two groups:
/// - Workspace listing (paginated, tag filtered)
/// - Run lifecycle (create plan-only run, read run, search latest run)
#[derive(Debug, Clone)]
pub struct WorkspaceApiClient {
    /// Base URL of the remote API (e.g., "https://app.example.com")
    base_url: String,
    /// API bearer token
    token: String,
    /// HTTP client instance
    client: Client,
}

impl WorkspaceApiClient {
    /// Create a new API client
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client: Client::new(),
        }
    }

    /// Create a new API client with a custom HTTP client
    ///
    /// This allows configuring timeouts, proxies, TLS settings, etc.
    pub fn with_client(
        base_url: impl Into<String>,
        token: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        }
    }

    /// Get the base URL of the remote API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.get(url).bearer_auth(&self.token)
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.post(url).bearer_auth(&self.token)
    }

    /// Handle an API response and deserialize JSON
    ///
    /// Checks the status code and returns an appropriate error if the request
    /// failed, or deserializes the response body if successful. A 404 maps to
    /// the distinguished `ClientError::NotFound`.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status.as_u16() == 404 {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown resource".to_string());
            return Err(ClientError::NotFound(error_text));
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {e}")))
    }
}
