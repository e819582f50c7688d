//! SCRAM-SHA256 primitives used by the Flybox login handshake.
//!
//! The router's web UI performs a variant of SCRAM where every intermediate
//! value travels as a lowercase hex string:
//!
//! ```text
//! salted_password = PBKDF2-HMAC-SHA256(password, salt, iterations, 32)
//! client_key      = HMAC("Client Key", salted_password)
//! stored_key      = SHA256(client_key)
//! signature       = HMAC(auth_message, stored_key)
//! client_proof    = client_key XOR signature
//! ```
//!
//! `HMAC(k, m)` above names the key first. The device pairs the auth message
//! with the stored key in that orientation, which differs from RFC 5802; it is
//! kept as-is because the router rejects anything else.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Length of the PBKDF2 output in bytes.
pub const SALTED_PASSWORD_LEN: usize = 32;

/// Length of a client nonce in characters.
pub const NONCE_LEN: usize = 64;

const CLIENT_KEY_LABEL: &[u8] = b"Client Key";
const SERVER_KEY_LABEL: &[u8] = b"Server Key";
const WORD_LEN: usize = 4;

/// Error type for SCRAM computations.
#[derive(Debug, Error)]
pub enum ScramError {
    /// A hex-encoded input could not be decoded.
    #[error("invalid hex in {field}: {source}")]
    InvalidHex {
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },

    /// The iteration count was zero.
    #[error("iteration count must be positive")]
    InvalidIterations,
}

fn decode(field: &'static str, value: &str) -> Result<Vec<u8>, ScramError> {
    hex::decode(value).map_err(|source| ScramError::InvalidHex { field, source })
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(message);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Derives the salted password with PBKDF2-HMAC-SHA256.
///
/// # Example
///
/// ```
/// use routerctl_core::crypto::scram::salted_password;
///
/// let salted = salted_password("passwd", "73616c74", 1).unwrap();
/// assert_eq!(salted.len(), 64);
/// ```
pub fn salted_password(
    password: &str,
    salt_hex: &str,
    iterations: u32,
) -> Result<String, ScramError> {
    if iterations == 0 {
        return Err(ScramError::InvalidIterations);
    }
    let salt = decode("salt", salt_hex)?;

    let mut out = [0u8; SALTED_PASSWORD_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut out);
    Ok(hex::encode(out))
}

/// Computes the client key from the salted password.
pub fn client_key(salted_password_hex: &str) -> Result<String, ScramError> {
    let salted = decode("salted password", salted_password_hex)?;
    Ok(hex::encode(hmac_sha256(CLIENT_KEY_LABEL, &salted)))
}

/// Computes the stored key, a plain SHA256 digest of the client key.
pub fn stored_key(client_key_hex: &str) -> Result<String, ScramError> {
    let client_key = decode("client key", client_key_hex)?;
    Ok(hex::encode(Sha256::digest(&client_key)))
}

/// Computes the client signature over the auth message and stored key.
pub fn signature(auth_message: &str, stored_key_hex: &str) -> Result<String, ScramError> {
    let stored_key = decode("stored key", stored_key_hex)?;
    Ok(hex::encode(hmac_sha256(auth_message.as_bytes(), &stored_key)))
}

/// Computes the signature the router is expected to return after a
/// successful authentication.
pub fn server_signature(
    salted_password_hex: &str,
    auth_message: &str,
) -> Result<String, ScramError> {
    let salted = decode("salted password", salted_password_hex)?;
    let server_key = hmac_sha256(SERVER_KEY_LABEL, &salted);
    Ok(hex::encode(hmac_sha256(auth_message.as_bytes(), &server_key)))
}

/// XORs two equal-length hex strings word by word.
///
/// Each side is read as 4-byte big-endian signed words, which is how the
/// router's JavaScript client represents digests.
///
/// # Panics
///
/// Panics if the inputs are not valid hex, differ in length, or are not a
/// whole number of words. Both inputs are SHA256 outputs in practice, so
/// any of these is a programming error.
pub fn xor_hex(a_hex: &str, b_hex: &str) -> String {
    let a = hex::decode(a_hex).expect("xor_hex: left operand must be hex");
    let b = hex::decode(b_hex).expect("xor_hex: right operand must be hex");
    assert_eq!(a.len(), b.len(), "xor_hex: operands differ in length");
    assert_eq!(a.len() % WORD_LEN, 0, "xor_hex: operands must be whole words");

    let mut out = Vec::with_capacity(a.len());
    for (x, y) in a.chunks_exact(WORD_LEN).zip(b.chunks_exact(WORD_LEN)) {
        let x = i32::from_be_bytes([x[0], x[1], x[2], x[3]]);
        let y = i32::from_be_bytes([y[0], y[1], y[2], y[3]]);
        out.extend_from_slice(&(x ^ y).to_be_bytes());
    }
    hex::encode(out)
}

/// Builds the auth message from the client and server nonces.
///
/// The router expects the server nonce twice.
pub fn auth_message(first_nonce: &str, server_nonce: &str) -> String {
    format!("{first_nonce},{server_nonce},{server_nonce}")
}

/// Computes the client proof sent in the authentication request.
pub fn client_proof(client_key_hex: &str, signature_hex: &str) -> String {
    xor_hex(client_key_hex, signature_hex)
}

/// Source of client nonces for the login handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NonceSource {
    /// 32 bytes from the thread-local CSPRNG, hex encoded.
    #[default]
    Random,
    /// Always use the given value. Intended for reproducible tests.
    Fixed(String),
}

impl NonceSource {
    /// Produces a nonce for one handshake attempt.
    pub fn generate(&self) -> String {
        match self {
            NonceSource::Random => {
                let mut bytes = [0u8; NONCE_LEN / 2];
                rand::rng().fill_bytes(&mut bytes);
                hex::encode(bytes)
            }
            NonceSource::Fixed(nonce) => nonce.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSWORD: &str = "admin123";
    const SALT: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
    const ITERATIONS: u32 = 100;
    const SERVER_NONCE: &str =
        "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaServerNonceXYZ0123456789abcdef0123";

    fn first_nonce() -> String {
        "a".repeat(NONCE_LEN)
    }

    #[test]
    fn test_salted_password_rfc7914_vector() {
        // PBKDF2-HMAC-SHA256("passwd", "salt", 1), first 32 bytes
        let salted = salted_password("passwd", &hex::encode("salt"), 1).unwrap();
        assert_eq!(
            salted,
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
        );
    }

    #[test]
    fn test_salted_password_is_deterministic() {
        let a = salted_password(PASSWORD, SALT, ITERATIONS).unwrap();
        let b = salted_password(PASSWORD, SALT, ITERATIONS).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_salted_password_rejects_bad_input() {
        assert!(matches!(
            salted_password(PASSWORD, "not hex", ITERATIONS),
            Err(ScramError::InvalidHex { field: "salt", .. })
        ));
        assert!(matches!(
            salted_password(PASSWORD, SALT, 0),
            Err(ScramError::InvalidIterations)
        ));
    }

    #[test]
    fn test_key_chain_golden_vectors() {
        let salted = salted_password(PASSWORD, SALT, ITERATIONS).unwrap();
        assert_eq!(
            salted,
            "950108d861aacb5ea06705dd78cb8377a21e712ba96cb0fe8d3e18514c5755c2"
        );

        let client_key = client_key(&salted).unwrap();
        assert_eq!(
            client_key,
            "930f7030fa9105e2138d6d0f2adf628b50b83dd5e1043f92955908f729eedcff"
        );

        let stored = stored_key(&client_key).unwrap();
        assert_eq!(
            stored,
            "ad190c00c18ff59b4593097ff5fa13b91623da4b912a6c7f0b775f9a2607a294"
        );

        let message = auth_message(&first_nonce(), SERVER_NONCE);
        let signature = signature(&message, &stored).unwrap();
        assert_eq!(
            signature,
            "0335e78d4e5dd50478a0f00bb6883904e4c424c534448db0540e71be69261d50"
        );

        assert_eq!(
            client_proof(&client_key, &signature),
            "903a97bdb4ccd0e66b2d9d049c575b8fb47c1910d540b222c157794940c8c1af"
        );
        assert_eq!(
            server_signature(&salted, &message).unwrap(),
            "411dbfe7497751e5b9d83772c18539864e02d59dbbb2215dc9db9bf508090889"
        );
    }

    #[test]
    fn test_auth_message_repeats_server_nonce() {
        assert_eq!(auth_message("c", "s"), "c,s,s");
    }

    #[test]
    fn test_xor_hex_is_commutative() {
        let a = "930f7030fa9105e2138d6d0f2adf628b50b83dd5e1043f92955908f729eedcff";
        let b = "0335e78d4e5dd50478a0f00bb6883904e4c424c534448db0540e71be69261d50";
        assert_eq!(xor_hex(a, b), xor_hex(b, a));
    }

    #[test]
    fn test_xor_hex_with_itself_is_zero() {
        let a = "ad190c00c18ff59b4593097ff5fa13b91623da4b912a6c7f0b775f9a2607a294";
        assert_eq!(xor_hex(a, a), "0".repeat(64));
    }

    #[test]
    fn test_xor_hex_sign_bit_words() {
        // words with the high bit set must survive the signed round trip
        assert_eq!(
            xor_hex("80000000ffffffff", "7fffffff00000001"),
            "fffffffffffffffe"
        );
    }

    #[test]
    #[should_panic(expected = "differ in length")]
    fn test_xor_hex_length_mismatch_panics() {
        xor_hex("00000000", "0000000000000000");
    }

    #[test]
    fn test_nonce_sources() {
        let fixed = NonceSource::Fixed("a".repeat(NONCE_LEN));
        assert_eq!(fixed.generate(), "a".repeat(NONCE_LEN));

        let random = NonceSource::Random;
        let first = random.generate();
        let second = random.generate();
        assert_eq!(first.len(), NONCE_LEN);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }
}
