//! Router families and connection dispatch.
//!
//! Each supported device family implements [`Router`]. Use [`connect`] to
//! probe the families in turn and get back a logged-in router.
//!
//! - [`FlyboxRouter`]: Flybox 4G boxes speaking the SCRAM login flow

pub mod flybox;

pub use flybox::FlyboxRouter;

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    Credentials,
    crypto::NonceSource,
    error::Error,
    response::{ConnectedDevice, Information, MacFilterTable},
    session::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BACKOFF},
    transport::DEFAULT_TIMEOUT,
};

/// Configuration for connecting to a router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// The router hostname or IP address, optionally with a port.
    pub host: String,
    /// Credentials for the web management interface.
    pub credentials: Option<Credentials>,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Login attempts before giving up on transient failures.
    pub max_attempts: u32,
    /// Source of the client nonce.
    pub nonce: NonceSource,
    /// Base pause between login attempts.
    pub retry_backoff: Duration,
}

impl RouterConfig {
    /// Creates a new router configuration.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            nonce: NonceSource::default(),
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Sets the credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the number of login attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the nonce source.
    ///
    /// Only tests should use [`NonceSource::Fixed`].
    pub fn with_nonce(mut self, nonce: NonceSource) -> Self {
        self.nonce = nonce;
        self
    }

    /// Sets the base pause between login attempts.
    pub fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }
}

/// Connects to the router described by `config` and logs in.
///
/// Every supported family is tried in order. A family whose compatibility
/// probe fails is skipped; any other error ends the search.
///
/// # Example
///
/// ```no_run
/// use routerctl_core::{Credentials, router::{RouterConfig, connect}};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = RouterConfig::new("192.168.8.1")
///         .with_credentials(Credentials::new("admin", "password"));
///
///     let mut router = connect(config).await?;
///     let info = router.information().await?;
///     println!("{} ({})", info.device_name, info.software_version);
///     router.logout().await?;
///     Ok(())
/// }
/// ```
pub async fn connect(config: RouterConfig) -> Result<Box<dyn Router>, Error> {
    match FlyboxRouter::connect(&config).await {
        Ok(router) => return Ok(Box::new(router)),
        Err(Error::Incompatible) => {
            debug!(host = %config.host, "Not a Flybox router");
        }
        Err(e) => return Err(e),
    }

    Err(Error::RouterNotSupported)
}

/// Operations available on a logged-in router.
#[async_trait]
pub trait Router: Send + Sync {
    /// Human-readable name of the router family.
    fn name(&self) -> &'static str;

    /// Returns the router base URL.
    fn base_url(&self) -> &str;

    /// Returns `true` while the session is logged in.
    fn is_authenticated(&self) -> bool;

    /// Logs in, reusing an existing login when the router reports one.
    async fn login(&mut self) -> Result<(), Error>;

    /// Ends the login.
    async fn logout(&mut self) -> Result<(), Error>;

    /// Restarts the router.
    async fn restart(&mut self) -> Result<(), Error>;

    /// Reads device and radio information.
    async fn information(&mut self) -> Result<Information, Error>;

    /// Lists hosts known to the router.
    async fn connected_devices(&mut self) -> Result<Vec<ConnectedDevice>, Error>;

    /// Reads the per-SSID MAC filter tables.
    async fn mac_filters(&mut self) -> Result<Vec<MacFilterTable>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_config_builder() {
        let config = RouterConfig::new("192.168.8.1")
            .with_credentials(Credentials::new("admin", "pw"))
            .with_timeout(Duration::from_secs(3))
            .with_max_attempts(5)
            .with_nonce(NonceSource::Fixed("ab".into()))
            .with_retry_backoff(Duration::ZERO);

        assert_eq!(config.host, "192.168.8.1");
        assert_eq!(config.credentials, Some(Credentials::new("admin", "pw")));
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.nonce, NonceSource::Fixed("ab".into()));
        assert!(config.retry_backoff.is_zero());
    }

    #[test]
    fn test_router_config_defaults() {
        let config = RouterConfig::new("router.lan");
        assert!(config.credentials.is_none());
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.nonce, NonceSource::Random);
    }
}
