// Hand-crafted async HTTP client for the hosted store's REST interface.
//
// Base path: /rest/v1/
// Auth: apikey + Authorization: Bearer headers
//
// This is a pure translation boundary: requests in, typed rows or a
// classified error out. No retries, no caching, no local state.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::query::{Filter, Query};
use crate::transport::{api_key_headers, TransportConfig};

// ── Error response shape from the store ──────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the store's REST interface.
///
/// Stateless and cheap to clone; one instance is safely shared across
/// every collection in the application.
#[derive(Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    base_url: Url,
}

impl StoreClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// Injects `apikey` and `Authorization` as default headers on every
    /// request.
    pub fn from_api_key(
        base_url: &str,
        api_key: &secrecy::SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let headers = api_key_headers(api_key)?;
        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Build the base URL ending in `/rest/v1/`.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with("/rest/v1") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/rest/v1/"));
        }

        Ok(url)
    }

    /// Join a resource name onto the base URL.
    fn url(&self, resource: &str) -> Result<Url, Error> {
        // base_url always ends with `/rest/v1/`, so joining a bare
        // resource name works.
        self.base_url.join(resource).map_err(Error::from)
    }

    // ── Read ─────────────────────────────────────────────────────────

    /// Fetch all rows of `resource` matching `query`.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &Query,
    ) -> Result<Vec<T>, Error> {
        let url = self.url(resource)?;
        let params = query.to_params();
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(&params).send().await?;
        self.handle_rows(resource, resp).await
    }

    // ── Write ────────────────────────────────────────────────────────

    /// Insert one row and return the stored representation (with its
    /// server-assigned key and timestamps).
    pub async fn insert<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        resource: &str,
        record: &B,
    ) -> Result<T, Error> {
        let url = self.url(resource)?;
        debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .header("Prefer", "return=representation")
            .json(record)
            .send()
            .await?;

        self.handle_single(resource, resp).await
    }

    /// Patch the row with the given key and return the updated row.
    pub async fn update<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        resource: &str,
        key: &str,
        patch: &B,
    ) -> Result<T, Error> {
        let url = self.url(resource)?;
        debug!("PATCH {url} id={key}");

        let resp = self
            .http
            .patch(url)
            .query(&[("id", format!("eq.{key}"))])
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;

        self.handle_single(resource, resp).await
    }

    /// Delete the row with the given key.
    ///
    /// Deleting a row that no longer exists is a success: the store
    /// reports it the same way, and callers treat it as already-done.
    pub async fn delete(&self, resource: &str, key: &str) -> Result<(), Error> {
        let url = self.url(resource)?;
        debug!("DELETE {url} id={key}");

        let resp = self
            .http
            .delete(url)
            .query(&[("id", format!("eq.{key}"))])
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(resource, status, resp).await)
        }
    }

    // ── Convenience ──────────────────────────────────────────────────

    /// Fetch rows matching a bare filter, without ordering or limits.
    pub async fn fetch_filtered<T: DeserializeOwned>(
        &self,
        resource: &str,
        filter: Filter,
    ) -> Result<Vec<T>, Error> {
        self.fetch(resource, &Query::new().filter(filter)).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_rows<T: DeserializeOwned>(
        &self,
        resource: &str,
        resp: reqwest::Response,
    ) -> Result<Vec<T>, Error> {
        let status = resp.status();
        if !status.is_success() {
            return Err(self.parse_error(resource, status, resp).await);
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview = &body[..body.len().min(200)];
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }

    /// Writes answer with a one-element array; unwrap it.
    async fn handle_single<T: DeserializeOwned>(
        &self,
        resource: &str,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let mut rows: Vec<T> = self.handle_rows(resource, resp).await?;
        match rows.len() {
            1 => Ok(rows.remove(0)),
            0 => Err(Error::NotFound {
                resource: resource.to_owned(),
                key: "<filter matched no rows>".to_owned(),
            }),
            n => Err(Error::Deserialization {
                message: format!("expected one row from {resource}, got {n}"),
                body: String::new(),
            }),
        }
    }

    async fn parse_error(
        &self,
        resource: &str,
        status: StatusCode,
        resp: reqwest::Response,
    ) -> Error {
        let raw = resp.text().await.unwrap_or_default();
        let parsed: Option<ErrorResponse> = serde_json::from_str(&raw).ok();
        let message = parsed
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    status.to_string()
                } else {
                    raw.clone()
                }
            });

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Error::PermissionDenied { message }
            }
            StatusCode::NOT_FOUND => Error::NotFound {
                resource: resource.to_owned(),
                key: message,
            },
            StatusCode::CONFLICT => Error::Conflict { message },
            _ => Error::Store {
                message,
                code: parsed.and_then(|e| e.code),
                status: status.as_u16(),
            },
        }
    }
}
