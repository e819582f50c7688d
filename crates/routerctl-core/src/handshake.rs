//! SCRAM-like login handshake for Flybox routers.
//!
//! # Protocol Overview
//!
//! 1. **Probe**: GET `/config/global/config.xml`, the body must name the product
//! 2. **Token**: GET `/api/webserver/token` for the first anti-forgery token
//! 3. **Challenge**: POST username and client nonce, the router answers with
//!    salt, iteration count and server nonce plus a fresh token header
//! 4. **Authenticate**: POST the client proof, the router answers with its
//!    server signature
//!
//! The engine never returns an [`Error`]: every outcome, including network
//! and parse failures, is folded into an [`AuthOutcome`] so the session can
//! decide whether to retry.

use tracing::{debug, warn};

use crate::{
    Credentials,
    crypto::{NonceSource, scram},
    error::Error,
    transport::{HttpTransport, XmlResponse},
    xml,
};

/// Compatibility probe endpoint.
pub const CONFIG_PATH: &str = "/config/global/config.xml";

/// Challenge endpoint.
pub const CHALLENGE_PATH: &str = "/api/user/challenge_login";

/// Authentication endpoint.
pub const AUTHENTICATION_PATH: &str = "/api/user/authentication_login";

/// Marker identifying a Flybox in the probe response.
pub const PRODUCT_MARKER: &str = "<title>Flybox</title>";

/// Largest PBKDF2 iteration count accepted from a challenge.
pub const MAX_ITERATIONS: u32 = 100_000;

/// Login mode requested in the challenge; `1` selects SCRAM.
const SCRAM_MODE: &str = "1";

/// Outcome of one handshake attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The session is now authenticated.
    Authenticated,
    /// The router is not a Flybox; no credentials were sent.
    Incompatible,
    /// Network or parse failure; the attempt may be retried.
    TransientFailure(String),
    /// The router refused the login.
    Rejected(String),
}

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Init,
    ChallengeSent,
    Authenticated,
    Failed,
}

/// Values derived during one login attempt.
///
/// A context is built per attempt and never reused, so a retry cannot see
/// the nonce or keys of an earlier attempt.
#[derive(Clone)]
pub struct HandshakeContext {
    /// Client nonce sent with the challenge.
    pub first_nonce: String,
    /// Nonce returned by the router.
    pub server_nonce: String,
    /// Hex salt returned by the router.
    pub salt: String,
    /// PBKDF2 iteration count returned by the router.
    pub iterations: u32,
    salted_password: String,
    /// `first_nonce,server_nonce,server_nonce`.
    pub auth_message: String,
    /// HMAC of the salted password.
    pub client_key: String,
    /// SHA256 of the client key.
    pub stored_key: String,
    /// HMAC pairing the auth message and the stored key.
    pub signature: String,
    /// Client key XOR signature.
    pub client_proof: String,
}

impl HandshakeContext {
    /// Derives the full key chain from a challenge.
    pub fn derive(
        password: &str,
        first_nonce: String,
        challenge: Challenge,
    ) -> Result<Self, Error> {
        let salted_password =
            scram::salted_password(password, &challenge.salt, challenge.iterations)?;
        let client_key = scram::client_key(&salted_password)?;
        let stored_key = scram::stored_key(&client_key)?;
        let auth_message = scram::auth_message(&first_nonce, &challenge.server_nonce);
        let signature = scram::signature(&auth_message, &stored_key)?;
        let client_proof = scram::client_proof(&client_key, &signature);

        Ok(Self {
            first_nonce,
            server_nonce: challenge.server_nonce,
            salt: challenge.salt,
            iterations: challenge.iterations,
            salted_password,
            auth_message,
            client_key,
            stored_key,
            signature,
            client_proof,
        })
    }

    /// Signature the router should return on success.
    pub fn expected_server_signature(&self) -> Result<String, Error> {
        Ok(scram::server_signature(
            &self.salted_password,
            &self.auth_message,
        )?)
    }
}

// Implement Debug manually to avoid exposing key material
impl std::fmt::Debug for HandshakeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeContext")
            .field("first_nonce", &self.first_nonce)
            .field("server_nonce", &self.server_nonce)
            .field("iterations", &self.iterations)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

/// Parameters returned by the challenge endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub server_nonce: String,
    pub salt: String,
    pub iterations: u32,
}

impl Challenge {
    /// Parses a challenge response body.
    pub fn parse(body: &str) -> Result<Self, Error> {
        let document = xml::parse(body)?;
        if let Some(err) = xml::api_error(&document) {
            return Err(Error::Transient(format!("challenge refused: {}", err)));
        }

        let field = |name: &str| {
            xml::child_text(&document, name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| Error::Transient(format!("challenge response missing {}", name)))
        };

        let iterations = field("iterations")?;
        let iterations = iterations
            .parse::<u32>()
            .ok()
            .filter(|n| (1..=MAX_ITERATIONS).contains(n))
            .ok_or_else(|| Error::Transient(format!("invalid iteration count: {}", iterations)))?;

        Ok(Self {
            server_nonce: field("servernonce")?,
            salt: field("salt")?,
            iterations,
        })
    }
}

/// Checks whether the router identifies as a Flybox.
///
/// Sends nothing but an anonymous GET of [`CONFIG_PATH`].
pub async fn probe(transport: &HttpTransport) -> Result<bool, Error> {
    let body = transport.get(CONFIG_PATH).await?;
    let compatible = body.contains(PRODUCT_MARKER);
    if !compatible {
        debug!(base_url = %transport.base_url(), "Product marker not found");
    }
    Ok(compatible)
}

/// Interprets the authentication response.
///
/// A `<serversignature>` element means success, provided its value is empty
/// or matches the signature derived from `context`.
fn authentication_outcome(
    context: &HandshakeContext,
    response: &XmlResponse,
) -> Result<AuthOutcome, Error> {
    let document = xml::parse(&response.body).ok();
    let received = document.as_ref().and_then(|document| {
        document
            .get_child("serversignature")
            .map(|_| xml::child_text_or_default(document, "serversignature"))
    });

    let Some(received) = received else {
        let reason = match document.as_ref().and_then(xml::api_error) {
            Some(err) => err.to_string(),
            None => format!(
                "unexpected authentication response (status {})",
                response.status
            ),
        };
        return Ok(AuthOutcome::Rejected(reason));
    };

    if !received.is_empty() {
        let expected = context.expected_server_signature()?;
        if !received.eq_ignore_ascii_case(&expected) {
            warn!("Server signature does not match the derived value");
            return Ok(AuthOutcome::Rejected("server signature mismatch".into()));
        }
    }

    debug!("Authentication succeeded");
    Ok(AuthOutcome::Authenticated)
}

/// Drives one handshake attempt over a transport.
pub struct Handshake<'a> {
    transport: &'a mut HttpTransport,
    credentials: &'a Credentials,
    nonce: &'a NonceSource,
    state: HandshakeState,
}

impl<'a> Handshake<'a> {
    /// Creates a handshake in the [`HandshakeState::Init`] state.
    pub fn new(
        transport: &'a mut HttpTransport,
        credentials: &'a Credentials,
        nonce: &'a NonceSource,
    ) -> Self {
        Self {
            transport,
            credentials,
            nonce,
            state: HandshakeState::Init,
        }
    }

    /// Runs the handshake to completion.
    pub async fn run(&mut self) -> AuthOutcome {
        let outcome = match self.exchange().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, state = ?self.state, "Handshake failed");
                AuthOutcome::TransientFailure(e.to_string())
            }
        };

        self.state = match outcome {
            AuthOutcome::Authenticated => HandshakeState::Authenticated,
            _ => HandshakeState::Failed,
        };
        outcome
    }

    async fn exchange(&mut self) -> Result<AuthOutcome, Error> {
        if !probe(&*self.transport).await? {
            return Ok(AuthOutcome::Incompatible);
        }

        self.transport.refresh_token().await?;
        self.transport.tokens_mut().mark_browser_source();

        let first_nonce = self.nonce.generate();
        let challenge = self.send_challenge(&first_nonce).await?;
        self.state = HandshakeState::ChallengeSent;

        debug!(
            iterations = challenge.iterations,
            "Challenge received, deriving client proof"
        );
        let context = HandshakeContext::derive(
            self.credentials.expose_password(),
            first_nonce,
            challenge,
        )?;

        self.authenticate(&context).await
    }

    async fn send_challenge(&mut self, first_nonce: &str) -> Result<Challenge, Error> {
        let body = xml::request_body(&[
            ("username", self.credentials.username.as_str()),
            ("firstnonce", first_nonce),
            ("mode", SCRAM_MODE),
        ])?;

        let response = self.transport.post_xml(CHALLENGE_PATH, body).await?;
        self.store_response_token(response.token).await?;

        Challenge::parse(&response.body)
    }

    async fn authenticate(&mut self, context: &HandshakeContext) -> Result<AuthOutcome, Error> {
        let body = xml::request_body(&[
            ("clientproof", context.client_proof.as_str()),
            ("finalnonce", context.server_nonce.as_str()),
        ])?;

        let mut response = self.transport.post_xml(AUTHENTICATION_PATH, body).await?;
        if let Some(token) = response.token.take() {
            self.transport.tokens_mut().set(token);
        }

        authentication_outcome(context, &response)
    }

    /// Stores the token handed back with a response, re-bootstrapping when
    /// the router did not send one.
    async fn store_response_token(&mut self, token: Option<String>) -> Result<(), Error> {
        match token {
            Some(token) => {
                self.transport.tokens_mut().set(token);
                Ok(())
            }
            None => self.transport.refresh_token().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_parse() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<response>
<salt>0123abcd</salt>
<iterations>100</iterations>
<servernonce>abcserver</servernonce>
<modeselected>1</modeselected>
</response>"#;
        let challenge = Challenge::parse(body).unwrap();
        assert_eq!(
            challenge,
            Challenge {
                server_nonce: "abcserver".into(),
                salt: "0123abcd".into(),
                iterations: 100,
            }
        );
    }

    #[test]
    fn test_challenge_missing_salt_is_transient() {
        let body = "<response><iterations>100</iterations><servernonce>n</servernonce></response>";
        assert!(matches!(
            Challenge::parse(body),
            Err(Error::Transient(m)) if m.contains("salt")
        ));
    }

    #[test]
    fn test_challenge_invalid_iterations_is_transient() {
        for iterations in ["abc", "0", "-5", "", "100001", "4000000000"] {
            let body = format!(
                "<response><iterations>{iterations}</iterations><servernonce>n</servernonce><salt>00</salt></response>"
            );
            assert!(matches!(Challenge::parse(&body), Err(Error::Transient(_))));
        }
    }

    #[test]
    fn test_challenge_error_document_is_transient() {
        let body = "<error><code>108007</code><message></message></error>";
        assert!(matches!(Challenge::parse(body), Err(Error::Transient(_))));
    }

    #[test]
    fn test_context_derivation_matches_golden_proof() {
        let context = golden_context();

        assert_eq!(
            context.client_proof,
            "903a97bdb4ccd0e66b2d9d049c575b8fb47c1910d540b222c157794940c8c1af"
        );
        assert_eq!(
            context.expected_server_signature().unwrap(),
            "411dbfe7497751e5b9d83772c18539864e02d59dbbb2215dc9db9bf508090889"
        );
    }

    fn golden_context() -> HandshakeContext {
        let challenge = Challenge {
            server_nonce: format!("{}ServerNonceXYZ0123456789abcdef0123", "a".repeat(64)),
            salt: "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef".into(),
            iterations: 100,
        };
        HandshakeContext::derive("admin123", "a".repeat(64), challenge).unwrap()
    }

    fn response(body: &str) -> XmlResponse {
        XmlResponse {
            status: reqwest::StatusCode::OK,
            body: body.into(),
            token: None,
        }
    }

    #[test]
    fn test_challenge_accepts_iteration_ceiling() {
        let body = format!(
            "<response><iterations>{MAX_ITERATIONS}</iterations><servernonce>n</servernonce><salt>00</salt></response>"
        );
        assert_eq!(Challenge::parse(&body).unwrap().iterations, MAX_ITERATIONS);
    }

    #[test]
    fn test_self_closing_server_signature_is_accepted() {
        let outcome = authentication_outcome(
            &golden_context(),
            &response("<response><serversignature/><rsan>00</rsan></response>"),
        )
        .unwrap();
        assert_eq!(outcome, AuthOutcome::Authenticated);
    }

    #[test]
    fn test_server_signature_compared_case_insensitively() {
        let outcome = authentication_outcome(
            &golden_context(),
            &response(
                "<response><serversignature>411DBFE7497751E5B9D83772C18539864E02D59DBBB2215DC9DB9BF508090889</serversignature></response>",
            ),
        )
        .unwrap();
        assert_eq!(outcome, AuthOutcome::Authenticated);
    }

    #[test]
    fn test_authentication_without_signature_is_rejected() {
        let outcome = authentication_outcome(&golden_context(), &response("<response/>")).unwrap();
        assert!(matches!(outcome, AuthOutcome::Rejected(reason) if reason.contains("200")));

        let outcome = authentication_outcome(
            &golden_context(),
            &response("<error><code>108007</code><message></message></error>"),
        )
        .unwrap();
        assert!(matches!(outcome, AuthOutcome::Rejected(reason) if reason.contains("108007")));
    }

    #[test]
    fn test_context_bad_salt_is_transient() {
        let challenge = Challenge {
            server_nonce: "n".into(),
            salt: "zz".into(),
            iterations: 1,
        };
        assert!(matches!(
            HandshakeContext::derive("pw", "c".into(), challenge),
            Err(Error::Transient(_))
        ));
    }

    #[test]
    fn test_context_debug_redacts_keys() {
        let challenge = Challenge {
            server_nonce: "n".into(),
            salt: "00".into(),
            iterations: 1,
        };
        let context = HandshakeContext::derive("pw", "c".into(), challenge).unwrap();
        let debug = format!("{:?}", context);
        assert!(!debug.contains(&context.client_proof));
        assert!(debug.contains("[REDACTED]"));
    }
}
