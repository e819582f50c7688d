//! Credentials for the router's web management interface.
//!
//! # Security
//!
//! Passwords are stored using [`SecretString`] from the `secrecy` crate to prevent
//! accidental logging or display. Use [`Credentials::expose_password()`] to access
//! the raw password value when needed for the handshake. Credentials live only in
//! memory and are never written anywhere.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// Default username of the router's administrator account.
pub const DEFAULT_USERNAME: &str = "admin";

/// Credentials for authenticating with a router.
///
/// # Example
///
/// ```
/// use routerctl_core::Credentials;
///
/// let creds = Credentials::new("admin", "password123");
/// assert_eq!(creds.username, "admin");
/// assert_eq!(creds.expose_password(), "password123");
/// ```
#[derive(Clone)]
pub struct Credentials {
    /// The account name, usually `admin`.
    pub username: String,
    /// The account password (protected from accidental logging).
    password: SecretString,
}

impl Credentials {
    /// Creates new credentials with the given username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Exposes the password for authentication purposes.
    ///
    /// Never log or display the returned value.
    pub fn expose_password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl PartialEq for Credentials {
    fn eq(&self, other: &Self) -> bool {
        self.username == other.username
            && self.password.expose_secret() == other.password.expose_secret()
    }
}

impl Eq for Credentials {}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
