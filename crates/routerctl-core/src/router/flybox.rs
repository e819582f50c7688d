//! Flybox 4G routers.
//!
//! These boxes expose a Huawei-style XML API behind a SCRAM login. See
//! [`crate::handshake`] for the login flow and [`crate::session`] for token
//! handling around it.

use async_trait::async_trait;
use tracing::debug;

use crate::{
    error::Error,
    response::{ConnectedDevice, Information, MacFilterTable},
    router::{Router, RouterConfig},
    session::Session,
    transport::HttpTransport,
    xml,
};

/// Device information endpoint.
pub const INFORMATION_PATH: &str = "/api/device/information";

/// Radio signal endpoint.
pub const SIGNAL_PATH: &str = "/api/device/signal";

/// LAN host list endpoint.
pub const HOST_INFO_PATH: &str = "/api/lan/HostInfo";

/// Per-SSID MAC filter endpoint.
pub const MAC_FILTER_PATH: &str = "/api/wlan/multi-macfilter-settings-ex";

/// A Flybox router.
#[derive(Debug)]
pub struct FlyboxRouter {
    session: Session,
    max_attempts: u32,
}

impl FlyboxRouter {
    /// Name reported by [`Router::name`].
    pub const NAME: &'static str = "Flybox";

    /// Creates an anonymous router handle without contacting the device.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` carries no credentials or the
    /// HTTP client cannot be built.
    pub fn new(config: &RouterConfig) -> Result<Self, Error> {
        let credentials = config
            .credentials
            .clone()
            .ok_or_else(|| Error::Config("credentials are required for Flybox routers".into()))?;
        let transport = HttpTransport::new(&config.host, config.timeout)?;
        let session = Session::new(transport, credentials)
            .with_nonce(config.nonce.clone())
            .with_retry_backoff(config.retry_backoff);

        Ok(Self {
            session,
            max_attempts: config.max_attempts,
        })
    }

    /// Creates a router handle and logs in.
    pub async fn connect(config: &RouterConfig) -> Result<Self, Error> {
        let mut router = Self::new(config)?;
        router.login().await?;
        Ok(router)
    }
}

#[async_trait]
impl Router for FlyboxRouter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn base_url(&self) -> &str {
        self.session.transport().base_url()
    }

    fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    async fn login(&mut self) -> Result<(), Error> {
        self.session.login(self.max_attempts).await
    }

    async fn logout(&mut self) -> Result<(), Error> {
        self.session.logout().await
    }

    async fn restart(&mut self) -> Result<(), Error> {
        self.session.restart().await
    }

    async fn information(&mut self) -> Result<Information, Error> {
        let information = self.session.fetch(INFORMATION_PATH).await?;
        let signal = self.session.fetch(SIGNAL_PATH).await?;
        let merged = xml::merge(&information, &signal)?;
        Ok(Information::from_element(&merged))
    }

    async fn connected_devices(&mut self) -> Result<Vec<ConnectedDevice>, Error> {
        let document = self.session.fetch(HOST_INFO_PATH).await?;
        let devices = ConnectedDevice::list_from_element(&document);
        debug!(count = devices.len(), "Decoded host list");
        Ok(devices)
    }

    async fn mac_filters(&mut self) -> Result<Vec<MacFilterTable>, Error> {
        let document = self.session.fetch(MAC_FILTER_PATH).await?;
        Ok(MacFilterTable::list_from_element(&document))
    }
}
