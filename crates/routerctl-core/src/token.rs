//! Anti-forgery token handling.
//!
//! The router issues a short-lived token through `/api/webserver/token` and
//! expects it back in the `__requestverificationtoken` header. Tokens are
//! effectively single use, so the session refreshes the store before every
//! state-changing request.

use reqwest::RequestBuilder;
use tracing::debug;
use xmltree::Element;

use crate::{error::Error, xml};

/// Header carrying the anti-forgery token, in both directions.
pub const TOKEN_HEADER: &str = "__requestverificationtoken";

/// Header identifying the client as the web UI.
pub const RESPONSE_SOURCE_HEADER: &str = "_responseSource";

/// Value sent in [`RESPONSE_SOURCE_HEADER`].
pub const RESPONSE_SOURCE_BROWSER: &str = "Browser";

/// Number of leading characters of the bootstrap token that are not part of
/// the usable token.
pub const TOKEN_PREFIX_LEN: usize = 32;

/// Holds the current anti-forgery token and injects it into requests.
#[derive(Default, Clone)]
pub struct TokenStore {
    token: Option<String>,
    browser_source: bool,
}

impl TokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current token, if any.
    pub fn current(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Replaces the current token.
    pub fn set(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// Drops the current token.
    pub fn clear(&mut self) {
        self.token = None;
    }

    /// Starts sending `_responseSource: Browser` on every request.
    pub fn mark_browser_source(&mut self) {
        self.browser_source = true;
    }

    /// Adds the token headers to an outgoing request.
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        let mut request = request;
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token.as_str());
        }
        if self.browser_source {
            request = request.header(RESPONSE_SOURCE_HEADER, RESPONSE_SOURCE_BROWSER);
        }
        request
    }
}

// Implement Debug manually to avoid exposing the token
impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("browser_source", &self.browser_source)
            .finish()
    }
}

/// Extracts the usable token from a `/api/webserver/token` response.
///
/// # Example
///
/// ```
/// use routerctl_core::token::parse_token_document;
///
/// let body = format!("<response><token>{}{}</token></response>", "x".repeat(32), "abc123");
/// assert_eq!(parse_token_document(&body).unwrap(), "abc123");
/// ```
pub fn parse_token_document(body: &str) -> Result<String, Error> {
    let document: Element =
        xml::parse(body).map_err(|e| Error::TokenUnavailable(e.to_string()))?;
    let raw = xml::child_text(&document, "token")
        .ok_or_else(|| Error::TokenUnavailable("response has no token field".into()))?;

    let token = raw
        .get(TOKEN_PREFIX_LEN..)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            Error::TokenUnavailable(format!(
                "token is too short ({} characters, expected more than {})",
                raw.len(),
                TOKEN_PREFIX_LEN
            ))
        })?;

    debug!(token_len = token.len(), "Parsed anti-forgery token");
    Ok(token.to_string())
}
