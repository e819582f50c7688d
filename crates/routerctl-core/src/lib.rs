//! Core library for administering Flybox home routers.
//!
//! This crate implements the router's web API login, a SCRAM-SHA256
//! challenge-response exchanged as XML over plain HTTP, and the session and
//! anti-forgery token handling every later API call depends on.
//!
//! # Overview
//!
//! The router keeps the login in a `SessionID` cookie and demands a fresh
//! `__requestverificationtoken` header on state-changing requests. Logging in
//! takes three round trips after a compatibility probe:
//!
//! 1. `GET /api/webserver/token` bootstraps the token
//! 2. `POST /api/user/challenge_login` sends the client nonce and receives the
//!    salt, iteration count and server nonce
//! 3. `POST /api/user/authentication_login` sends the client proof and
//!    receives the server signature
//!
//! # Example
//!
//! ```no_run
//! use routerctl_core::{Credentials, router::{RouterConfig, connect}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), routerctl_core::Error> {
//!     let config = RouterConfig::new("192.168.8.1")
//!         .with_credentials(Credentials::new("admin", "password"));
//!
//!     let mut router = connect(config).await?;
//!     for device in router.connected_devices().await? {
//!         println!("{} {}", device.name, device.ip_address);
//!     }
//!     router.logout().await
//! }
//! ```

pub mod credentials;
pub mod crypto;
pub mod error;
pub mod gateway;
pub mod handshake;
pub mod response;
pub mod router;
pub mod session;
pub mod token;
pub mod transport;
pub mod xml;

pub use credentials::{Credentials, DEFAULT_USERNAME};
pub use crypto::NonceSource;
pub use error::Error;
pub use gateway::default_gateway;
pub use response::{ConnectedDevice, FilteredHost, Information, MacFilterTable};
pub use router::{FlyboxRouter, Router, RouterConfig, connect};
pub use session::{DEFAULT_MAX_ATTEMPTS, Session, SessionState};
pub use transport::DEFAULT_TIMEOUT;

/// The version of the routerctl-core library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
