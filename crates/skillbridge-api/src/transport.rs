// Shared transport configuration for building reqwest::Client instances.
//
// The store and (for auth headers) the realtime clients share timeout and
// header settings through this module, avoiding duplicated builder logic.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("skillbridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(crate::error::Error::Transport)
    }

    /// Build a `reqwest::Client` with additional default headers.
    ///
    /// Used by [`StoreClient`](crate::StoreClient) to inject the `apikey`
    /// and `Authorization` headers on every request.
    pub fn build_client_with_headers(
        &self,
        headers: HeaderMap,
    ) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("skillbridge/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(crate::error::Error::Transport)
    }
}

/// Default header set for API-key authentication.
///
/// The backend expects the key both as `apikey` and as a bearer token.
/// Both values are marked sensitive so they never appear in debug logs.
pub fn api_key_headers(api_key: &SecretString) -> Result<HeaderMap, crate::error::Error> {
    let mut headers = HeaderMap::new();

    let mut key_value = HeaderValue::from_str(api_key.expose_secret()).map_err(|e| {
        crate::error::Error::PermissionDenied {
            message: format!("invalid API key header value: {e}"),
        }
    })?;
    key_value.set_sensitive(true);
    headers.insert("apikey", key_value);

    let mut bearer =
        HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret())).map_err(|e| {
            crate::error::Error::PermissionDenied {
                message: format!("invalid API key header value: {e}"),
            }
        })?;
    bearer.set_sensitive(true);
    headers.insert(reqwest::header::AUTHORIZATION, bearer);

    Ok(headers)
}
