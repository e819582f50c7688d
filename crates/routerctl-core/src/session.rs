//! Authenticated session lifecycle.
//!
//! A [`Session`] owns the transport, the credentials and the authentication
//! state for one router. All methods take `&mut self`, so requests within a
//! session are serialized; the router only tolerates one live login and
//! misbehaves when challenge flows overlap.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{
    Credentials,
    crypto::NonceSource,
    error::Error,
    handshake::{self, AuthOutcome, Handshake},
    transport::HttpTransport,
    xml::{self, OK_MARKER},
};

/// Login state probe endpoint.
pub const STATE_LOGIN_PATH: &str = "/api/user/state-login";

/// Logout endpoint.
pub const LOGOUT_PATH: &str = "/api/user/logout";

/// Device control endpoint.
pub const CONTROL_PATH: &str = "/api/device/control";

/// Marker returned by [`STATE_LOGIN_PATH`] when already logged in.
pub const LOGGED_IN_MARKER: &str = "<State>0</State>";

/// Default number of login attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between login attempts, multiplied by the attempt number.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Upper bound on the pause between login attempts.
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Authentication state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated,
}

/// A login session with one router.
#[derive(Debug)]
pub struct Session {
    transport: HttpTransport,
    credentials: Credentials,
    nonce: NonceSource,
    retry_backoff: Duration,
    state: SessionState,
}

impl Session {
    /// Creates an anonymous session.
    pub fn new(transport: HttpTransport, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
            nonce: NonceSource::default(),
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            state: SessionState::Anonymous,
        }
    }

    /// Sets the nonce source used by the handshake.
    pub fn with_nonce(mut self, nonce: NonceSource) -> Self {
        self.nonce = nonce;
        self
    }

    /// Sets the pause between login attempts. `Duration::ZERO` disables it.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Returns the authentication state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns `true` once [`login`](Self::login) has succeeded.
    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    /// Logs in, retrying transient failures.
    ///
    /// Succeeds without a handshake if the router reports an existing login
    /// and identifies as a Flybox. Each attempt runs a fresh handshake.
    /// `Incompatible` and `Rejected` outcomes end the loop at once.
    ///
    /// # Errors
    ///
    /// - [`Error::Incompatible`] if the router is not a Flybox
    /// - [`Error::Rejected`] if the router refused the credentials
    /// - [`Error::ManyLoginAttempts`] once every attempt failed transiently
    pub async fn login(&mut self, max_attempts: u32) -> Result<(), Error> {
        if self.probe_logged_in().await {
            match handshake::probe(&self.transport).await {
                Ok(true) => {
                    self.resume_login().await;
                    return Ok(());
                }
                Ok(false) => return Err(Error::Incompatible),
                Err(e) => debug!(error = %e, "Compatibility probe failed, running a full login"),
            }
        }

        let max_attempts = max_attempts.max(1);
        for attempt in 1..=max_attempts {
            debug!(attempt, max_attempts, "Starting login handshake");

            let outcome =
                Handshake::new(&mut self.transport, &self.credentials, &self.nonce).run().await;

            match outcome {
                AuthOutcome::Authenticated => {
                    info!(attempt, "Logged in");
                    self.state = SessionState::Authenticated;
                    return Ok(());
                }
                AuthOutcome::Incompatible => return Err(Error::Incompatible),
                AuthOutcome::Rejected(reason) => return Err(Error::Rejected(reason)),
                AuthOutcome::TransientFailure(reason) => {
                    warn!(attempt, max_attempts, %reason, "Login attempt failed");
                    if attempt < max_attempts {
                        self.pause(attempt).await;
                    }
                }
            }
        }

        Err(Error::ManyLoginAttempts(max_attempts))
    }

    async fn resume_login(&mut self) {
        info!(base_url = %self.transport.base_url(), "Router reports an existing login");
        // control calls fetch their own token, so a failure here only affects reads
        if let Err(e) = self.transport.refresh_token().await {
            debug!(error = %e, "Token bootstrap after existing login failed");
        }
        self.transport.tokens_mut().mark_browser_source();
        self.state = SessionState::Authenticated;
    }

    async fn probe_logged_in(&self) -> bool {
        match self.transport.get(STATE_LOGIN_PATH).await {
            Ok(body) => body.contains(LOGGED_IN_MARKER),
            Err(e) => {
                debug!(error = %e, "Login state probe failed");
                false
            }
        }
    }

    async fn pause(&self, attempt: u32) {
        let delay = self.retry_backoff.saturating_mul(attempt).min(MAX_RETRY_BACKOFF);
        if !delay.is_zero() {
            debug!(?delay, "Waiting before next login attempt");
            tokio::time::sleep(delay).await;
        }
    }

    fn require_authenticated(&self) -> Result<(), Error> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(Error::NotAuthenticated)
        }
    }

    /// Sends a state-changing request with a freshly issued token.
    ///
    /// Returns the response body; interpreting it is up to the caller.
    pub async fn control(&mut self, path: &str, fields: &[(&str, &str)]) -> Result<String, Error> {
        self.require_authenticated()?;
        self.transport.refresh_token().await?;

        let body = xml::request_body(fields)?;
        let response = self.transport.post_xml(path, body).await?;
        if let Some(token) = response.token {
            self.transport.tokens_mut().set(token);
        }
        Ok(response.body)
    }

    /// Sends an authenticated GET and parses the response.
    ///
    /// An `<error>` document is returned as [`Error::Api`].
    pub async fn fetch(&self, path: &str) -> Result<xmltree::Element, Error> {
        self.require_authenticated()?;
        let body = self.transport.get(path).await?;
        let document = xml::parse(&body).map_err(|e| Error::Parse(format!("{}: {}", path, e)))?;
        match xml::api_error(&document) {
            Some(err) => Err(err),
            None => Ok(document),
        }
    }

    /// Restarts the router.
    pub async fn restart(&mut self) -> Result<(), Error> {
        let body = self.control(CONTROL_PATH, &[("Control", "1")]).await?;
        if body.contains(OK_MARKER) {
            info!("Router is restarting");
            Ok(())
        } else {
            Err(Error::ControlFailed(body.trim().to_string()))
        }
    }

    /// Ends the login.
    ///
    /// The session becomes anonymous whatever the router answers. A response
    /// without the OK marker is reported as [`Error::LogoutUnconfirmed`].
    pub async fn logout(&mut self) -> Result<(), Error> {
        let result = self.control(LOGOUT_PATH, &[("Logout", "1")]).await;
        self.state = SessionState::Anonymous;
        self.transport.tokens_mut().clear();

        let body = result?;
        if body.contains(OK_MARKER) {
            debug!("Logged out");
            Ok(())
        } else {
            Err(Error::LogoutUnconfirmed(body.trim().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::DEFAULT_TIMEOUT;

    fn session() -> Session {
        let transport = HttpTransport::new("127.0.0.1:9", DEFAULT_TIMEOUT).unwrap();
        Session::new(transport, Credentials::new("admin", "pw"))
    }

    #[test]
    fn test_new_session_is_anonymous() {
        let session = session();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_control_requires_login() {
        let mut session = session();
        assert!(matches!(session.restart().await, Err(Error::NotAuthenticated)));
        assert!(matches!(session.logout().await, Err(Error::NotAuthenticated)));
        assert!(matches!(
            session.fetch("/api/lan/HostInfo").await,
            Err(Error::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_pause_without_backoff_returns_immediately() {
        let session = session().with_retry_backoff(Duration::ZERO);
        let started = std::time::Instant::now();
        session.pause(3).await;
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
