// REST API HTTP client
//
// Wraps `reqwest::Client` with base-URL path joining, bearer token
// injection, and status/body classification. Endpoint groups (auth,
// resources) are implemented as inherent methods in separate files to
// keep this module focused on transport mechanics.

use std::sync::RwLock;

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::FieldErrors;
use crate::transport::TransportConfig;

/// Longest body excerpt carried inside error messages.
const BODY_PREVIEW: usize = 200;

/// Raw HTTP client for the Ecotrash REST API.
///
/// Every path is resolved relative to the base URL (e.g.
/// `http://localhost:8000/api/v1/`). When a bearer token is set it is
/// attached to every request, mirroring the console's request interceptor.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<SecretString>>,
}

impl ApiClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: normalize_base(base_url),
            token: RwLock::new(None),
        }
    }

    /// The underlying HTTP client (for flows that bypass the bearer token).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The API base URL, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Bearer token ─────────────────────────────────────────────────

    /// Install (or clear) the bearer token sent with every request.
    pub fn set_token(&self, token: Option<SecretString>) {
        debug!(present = token.is_some(), "updating bearer token");
        *self.token.write().expect("token lock poisoned") = token;
    }

    /// Whether a bearer token is installed.
    pub fn has_token(&self) -> bool {
        self.token.read().expect("token lock poisoned").is_some()
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let guard = self.token.read().expect("token lock poisoned");
        match guard.as_ref() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Resolve a path relative to the base URL: `{base}{path}`.
    ///
    /// Leading slashes are stripped so `"/core/locations/"` and
    /// `"core/locations/"` resolve identically.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let resp = self.send(Method::GET, path, None::<&()>).await?;
        parse_json(resp).await
    }

    /// Send a request with a JSON body and decode the JSON response.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        let resp = self.send(method, path, Some(body)).await?;
        parse_json(resp).await
    }

    /// Send a DELETE request. Any 2xx counts as success; the body is ignored.
    pub(crate) async fn delete(&self, path: &str) -> Result<(), Error> {
        self.send(Method::DELETE, path, None::<&()>).await?;
        Ok(())
    }

    /// Build, authorize and send a request, returning the response only
    /// when the status is a success.
    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, Error> {
        let url = self.url(path)?;
        debug!("{method} {url}");

        let mut builder = self.apply_auth(self.http.request(method, url));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = builder.send().await.map_err(Error::Transport)?;
        check_status(resp).await
    }
}

/// `Url::join` drops the last segment unless the base ends in `/`.
fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Map non-success statuses onto the error taxonomy.
///
/// - 401 → `Authentication`, 403 → `Forbidden`, 404 → `NotFound`
/// - 400 / 422 with an object body → `Validation` with per-field messages
/// - everything else → `Server`
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let path = resp.url().path().to_owned();
    let body = resp.text().await.unwrap_or_default();
    trace!(%status, body = %preview(&body), "request failed");

    match status {
        StatusCode::UNAUTHORIZED => Err(Error::Authentication {
            message: detail(&body).unwrap_or_else(|| "token expired or invalid".into()),
        }),
        StatusCode::FORBIDDEN => Err(Error::Forbidden {
            message: detail(&body).unwrap_or_else(|| "insufficient permissions".into()),
        }),
        StatusCode::NOT_FOUND => Err(Error::NotFound { path }),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            let parsed = serde_json::from_str(&body)
                .ok()
                .and_then(|value| FieldErrors::from_body(&value));
            match parsed {
                Some(errors) => Err(Error::Validation {
                    status: status.as_u16(),
                    errors,
                }),
                None => Err(Error::Server {
                    status: status.as_u16(),
                    message: preview(&body).to_owned(),
                }),
            }
        }
        _ => Err(Error::Server {
            status: status.as_u16(),
            message: detail(&body).unwrap_or_else(|| preview(&body).to_owned()),
        }),
    }
}

/// Decode a successful response body as JSON.
pub(crate) async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let body = resp.text().await.map_err(Error::Transport)?;
    // 204 / empty bodies decode as JSON `null` so `Option<T>` callers work.
    let text = if body.trim().is_empty() { "null" } else { &body };
    serde_json::from_str(text).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body: body.clone(),
    })
}

/// Extract a `detail` / `message` string from an error body.
fn detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "message"]
        .iter()
        .find_map(|key| value.get(key)?.as_str().map(String::from))
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(BODY_PREVIEW) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = normalize_base(Url::parse("http://localhost:8000/api/v1").unwrap());
        assert_eq!(url.as_str(), "http://localhost:8000/api/v1/");
    }

    #[test]
    fn paths_join_under_base() {
        let client = ApiClient::with_client(
            reqwest::Client::new(),
            Url::parse("http://localhost:8000/api/v1").unwrap(),
        );
        assert_eq!(
            client.url("/core/locations/").unwrap().as_str(),
            "http://localhost:8000/api/v1/core/locations/"
        );
        assert_eq!(
            client.url("management/management/3/").unwrap().as_str(),
            "http://localhost:8000/api/v1/management/management/3/"
        );
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "ñ".repeat(BODY_PREVIEW + 10);
        assert_eq!(preview(&body).chars().count(), BODY_PREVIEW);
    }

    #[test]
    fn detail_reads_detail_then_message() {
        assert_eq!(
            detail(r#"{"detail":"Given token not valid"}"#).as_deref(),
            Some("Given token not valid")
        );
        assert_eq!(detail(r#"{"message":"nope"}"#).as_deref(), Some("nope"));
        assert_eq!(detail("<html>"), None);
    }
}
