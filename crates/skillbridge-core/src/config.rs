// ── Session configuration ──
//
// Everything the core needs to talk to one backend as one user. The
// config crate produces this from files and environment; tests build
// it directly.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use skillbridge_api::{RealtimeClient, ReconnectConfig, StoreClient, TransportConfig};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::CoreError;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Backend project base URL, e.g. `https://abc.example.co`.
    pub backend_url: String,

    /// Project API key; sent on every request and on the feed URL.
    pub api_key: SecretString,

    /// The signed-in user, used only as an equality predicate.
    pub user_id: String,

    /// Per-request HTTP timeout.
    pub timeout: Duration,

    /// Feed reconnection backoff.
    pub reconnect: ReconnectConfig,
}

impl SessionConfig {
    pub fn new(
        backend_url: impl Into<String>,
        api_key: SecretString,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            backend_url: backend_url.into(),
            api_key,
            user_id: user_id.into(),
            timeout: TransportConfig::default().timeout,
            reconnect: ReconnectConfig::default(),
        }
    }

    pub fn store_client(&self) -> Result<StoreClient, CoreError> {
        let transport = TransportConfig {
            timeout: self.timeout,
        };
        StoreClient::from_api_key(&self.backend_url, &self.api_key, &transport)
            .map_err(|err| CoreError::Config {
                message: format!("invalid backend URL: {err}"),
            })
    }

    pub fn realtime_client(&self, cancel: CancellationToken) -> Result<RealtimeClient, CoreError> {
        Ok(RealtimeClient::connect(
            self.realtime_url()?,
            self.reconnect.clone(),
            cancel,
        ))
    }

    /// Feed endpoint derived from the backend URL: same host, websocket
    /// scheme, the realtime path, and the API key as a query parameter.
    pub fn realtime_url(&self) -> Result<Url, CoreError> {
        let mut url = Url::parse(&self.backend_url).map_err(|err| CoreError::Config {
            message: format!("invalid backend URL: {err}"),
        })?;

        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(CoreError::Config {
                    message: format!("unsupported backend URL scheme: {other}"),
                });
            }
        };
        url.set_scheme(scheme).map_err(|()| CoreError::Config {
            message: "backend URL does not accept a websocket scheme".into(),
        })?;

        url.set_path("/realtime/v1/websocket");
        url.set_query(Some(&format!("apikey={}", self.api_key.expose_secret())));
        Ok(url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(backend_url: &str) -> SessionConfig {
        SessionConfig::new(backend_url, SecretString::from("key-123"), "u-1")
    }

    #[test]
    fn realtime_url_swaps_scheme_and_path() {
        let url = config("https://proj.example.co").realtime_url().unwrap();
        assert_eq!(
            url.as_str(),
            "wss://proj.example.co/realtime/v1/websocket?apikey=key-123"
        );

        let url = config("http://localhost:54321").realtime_url().unwrap();
        assert_eq!(url.scheme(), "ws");
    }

    #[test]
    fn unsupported_scheme_is_a_config_error() {
        let err = config("ftp://proj.example.co").realtime_url().unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
    }
}
