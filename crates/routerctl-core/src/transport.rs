//! HTTP transport for the router's web API.
//!
//! A thin wrapper around a cookie-bearing [`reqwest::Client`] bound to one
//! router. The router ties the login to its `SessionID` cookie, so the same
//! client must be used for the whole session. Every request carries the
//! headers held by the transport's [`TokenStore`].

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::{
    error::Error,
    token::{self, TOKEN_HEADER, TokenStore},
};

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Path of the token bootstrap endpoint.
pub const TOKEN_PATH: &str = "/api/webserver/token";

/// A response to a POST request.
#[derive(Debug, Clone)]
pub struct XmlResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response body.
    pub body: String,
    /// Token handed back in the `__requestverificationtoken` header, if any.
    pub token: Option<String>,
}

/// HTTP transport bound to a single router.
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    tokens: TokenStore,
}

impl HttpTransport {
    /// Creates a transport for the router at `host`.
    ///
    /// `host` may include a port (`192.168.1.1:8080`). A full `http://` or
    /// `https://` URL is also accepted.
    pub fn new(host: &str, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url(host),
            tokens: TokenStore::new(),
        })
    }

    /// Returns the base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the token store.
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Returns the token store for modification.
    pub fn tokens_mut(&mut self) -> &mut TokenStore {
        &mut self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a GET request and returns the body.
    ///
    /// The body is returned regardless of the status code; the router
    /// reports most failures in the body.
    pub async fn get(&self, path: &str) -> Result<String, Error> {
        debug!(base_url = %self.base_url, path, "GET");
        let response = self.tokens.apply(self.client.get(self.url(path))).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(path, %status, body_len = body.len(), "GET completed");
        Ok(body)
    }

    /// Sends an XML body with POST.
    pub async fn post_xml(&self, path: &str, body: String) -> Result<XmlResponse, Error> {
        debug!(base_url = %self.base_url, path, "POST");
        let request = self
            .client
            .post(self.url(path))
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded; charset=UTF-8",
            )
            .body(body);
        let response = self.tokens.apply(request).send().await?;

        let status = response.status();
        let token = response
            .headers()
            .get(TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        debug!(
            path,
            %status,
            body_len = body.len(),
            token_refreshed = token.is_some(),
            "POST completed"
        );
        Ok(XmlResponse {
            status,
            body,
            token,
        })
    }

    /// Fetches a fresh token from the bootstrap endpoint and stores it.
    pub async fn refresh_token(&mut self) -> Result<(), Error> {
        let body = self
            .get(TOKEN_PATH)
            .await
            .map_err(|e| Error::TokenUnavailable(e.to_string()))?;
        let token = token::parse_token_document(&body)?;
        self.tokens.set(token);
        Ok(())
    }
}

fn base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}
