//! Error types for routerctl-core.
//!
//! Every variant maps to a stable kind code (see [`Error::kind`]) that the
//! CLI uses for its JSON error payloads.

use thiserror::Error;

/// Error type for routerctl-core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The router does not match the product signature of this implementation.
    #[error("router is not compatible with this implementation")]
    Incompatible,

    /// No default route could be read from the operating system.
    #[error("gateway not found, please check your network configuration")]
    GatewayNotFound,

    /// The anti-forgery token could not be retrieved.
    #[error("failed to retrieve the token: {0}")]
    TokenUnavailable(String),

    /// Malformed response, parse failure or network error. Retryable.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The router explicitly refused the login.
    #[error("login rejected: {0}")]
    Rejected(String),

    /// Every login attempt failed with a transient error.
    #[error(
        "failed to log in after {0} consecutive attempts, this is usually caused by multiple logins; please try again later"
    )]
    ManyLoginAttempts(u32),

    /// A control call (restart, etc.) did not report success.
    #[error("control request failed: {0}")]
    ControlFailed(String),

    /// The logout call did not return the OK marker.
    ///
    /// Earlier tooling for this router treated a missing marker on logout as
    /// success, so this is reported separately from [`Error::ControlFailed`].
    #[error("logout was not confirmed by the router: {0}")]
    LogoutUnconfirmed(String),

    /// An authenticated call was attempted before logging in.
    #[error("session is not authenticated")]
    NotAuthenticated,

    /// None of the supported router implementations matched.
    #[error("the current router is not supported")]
    RouterNotSupported,

    /// The router answered with an `<error>` document.
    #[error("router returned error {code}{}", api_suffix(.message))]
    Api {
        /// Numeric error code as sent by the router.
        code: String,
        /// Optional error message.
        message: String,
    },

    /// Two XML documents with different root tags were merged.
    #[error("cannot merge <{left}> with <{right}>")]
    RootMismatch {
        /// Root tag of the first document.
        left: String,
        /// Root tag of the second document.
        right: String,
    },

    /// Failed to decode a router response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

fn api_suffix(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {message}")
    }
}

impl Error {
    /// Stable, machine-readable code for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Incompatible => "INCOMPATIBLE",
            Error::GatewayNotFound => "GATEWAY_ERROR",
            Error::TokenUnavailable(_) => "TOKEN_FAILED",
            Error::Transient(_) => "SOMETHING_WRONG",
            Error::Rejected(_) => "LOGIN_FAILED",
            Error::ManyLoginAttempts(_) => "MANY_LOGIN_ATTEMPTS",
            Error::ControlFailed(_) => "CONTROL_FAILED",
            Error::LogoutUnconfirmed(_) => "LOGOUT_UNCONFIRMED",
            Error::NotAuthenticated => "NOT_AUTHENTICATED",
            Error::RouterNotSupported => "ROUTER_NOT_SUPPORTED",
            Error::Api { .. } => "API_ERROR",
            Error::RootMismatch { .. } => "XML_MISMATCH",
            Error::Parse(_) => "PARSE_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Transient(format!("request timed out: {err}"))
        } else {
            Error::Transient(err.to_string())
        }
    }
}

impl From<xmltree::ParseError> for Error {
    fn from(err: xmltree::ParseError) -> Self {
        Error::Transient(format!("malformed XML: {err}"))
    }
}
