//! Cryptographic primitives for router authentication.
//!
//! - [`scram`]: SCRAM-SHA256 key chain, proof computation and nonce generation

pub mod scram;

pub use scram::{NonceSource, ScramError};

impl From<ScramError> for crate::Error {
    fn from(err: ScramError) -> Self {
        crate::Error::Transient(err.to_string())
    }
}
