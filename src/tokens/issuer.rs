//! Login orchestration and token wire values.
//!
//! A wire value is `"<encoded identity>-<secret>"`. Neither component can contain
//! `-` (base32 and hex alphabets), so a value that does not split into exactly two
//! parts is rejected as invalid.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

use super::{
    challenge::{Challenge, ChallengeRegistry},
    clock::Clock,
    codec::IdentityCodec,
    credentials::CredentialVerifier,
    registry::{Token, TokenRegistry},
    state::TokensConfig,
};

pub const WIRE_SEPARATOR: char = '-';

/// Identity bound to cookies handed out by the secret-only validation endpoint.
pub const UNKNOWN_IDENTITY: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: Token,
    /// Value handed to the client.
    pub wire: String,
}

/// Outcome of the basic-auth login.
#[derive(Debug, Clone)]
pub enum BasicLogin {
    AlreadyAuthenticated,
    Issued(IssuedToken),
}

pub struct TokenIssuer {
    config: TokensConfig,
    codec: IdentityCodec,
    credentials: Arc<dyn CredentialVerifier>,
    challenges: ChallengeRegistry,
    tokens: TokenRegistry,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(
        config: TokensConfig,
        codec: IdentityCodec,
        credentials: Arc<dyn CredentialVerifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            codec,
            credentials,
            challenges: ChallengeRegistry::new(),
            tokens: TokenRegistry::new(),
            clock,
        }
    }

    #[must_use]
    pub fn config(&self) -> &TokensConfig {
        &self.config
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    #[must_use]
    pub fn challenges(&self) -> &ChallengeRegistry {
        &self.challenges
    }

    fn now(&self) -> i64 {
        self.clock.now()
    }

    fn ttl(&self) -> i64 {
        self.config.ttl_seconds()
    }

    /// Assemble the client-held value for `identity` and `secret`.
    #[must_use]
    pub fn wire_value(&self, identity: &str, secret: &str) -> String {
        format!(
            "{}{WIRE_SEPARATOR}{secret}",
            self.codec.encode_identity(identity)
        )
    }

    /// Login with a plain password, or with a challenge digest when `challenge_id`
    /// names a live challenge. A stale or unknown challenge falls back to the plain
    /// password check.
    ///
    /// # Errors
    /// Returns [`AuthError::Unauthorized`] when the credentials do not match.
    #[instrument(skip(self, password), fields(challenge = challenge_id.is_some()))]
    pub async fn login(
        &self,
        login: &str,
        password: &str,
        challenge_id: Option<&str>,
        remote_address: &str,
    ) -> Result<IssuedToken, AuthError> {
        let challenge = match challenge_id {
            Some(id) => self.challenges.lookup(id, self.now(), self.ttl()).await,
            None => None,
        };

        let verified = match &challenge {
            Some(challenge) => {
                self.credentials
                    .verify_challenge_digest(login, password, &challenge.payload)
            }
            None => self.credentials.verify(login, password),
        };

        if !verified {
            debug!("Login failed for {login}");
            return Err(AuthError::Unauthorized);
        }

        Ok(self.issue(login, remote_address).await)
    }

    /// Login from basic-auth credentials unless `presented` is already a valid token.
    ///
    /// # Errors
    /// Returns [`AuthError::Unauthorized`] when credentials are missing or wrong.
    #[instrument(skip(self, presented, credentials))]
    pub async fn login_basic(
        &self,
        presented: Option<&str>,
        credentials: Option<(String, String)>,
        remote_address: &str,
    ) -> Result<BasicLogin, AuthError> {
        if let Some(wire) = presented {
            if self.authenticate(wire).await.is_some() {
                return Ok(BasicLogin::AlreadyAuthenticated);
            }
        }

        let Some((login, password)) = credentials else {
            return Err(AuthError::Unauthorized);
        };

        if !self.credentials.verify(&login, &password) {
            debug!("Basic login failed for {login}");
            return Err(AuthError::Unauthorized);
        }

        Ok(BasicLogin::Issued(self.issue(&login, remote_address).await))
    }

    async fn issue(&self, login: &str, remote_address: &str) -> IssuedToken {
        let token = self.tokens.issue(login, remote_address, self.now()).await;
        let wire = self.wire_value(&token.user, &token.secret);
        IssuedToken { token, wire }
    }

    /// Resolve a wire value to its identity, touching the token.
    /// Malformed, unknown and expired values all yield `None`.
    pub async fn authenticate(&self, wire: &str) -> Option<String> {
        let mut parts = wire.split(WIRE_SEPARATOR);
        let (Some(encoded), Some(secret), None) = (parts.next(), parts.next(), parts.next())
        else {
            debug!("Token is not valid: malformed value");
            return None;
        };

        let identity = match self.codec.decode_identity(encoded) {
            Ok(identity) => identity,
            Err(err) => {
                debug!("Token is not valid: {err}");
                return None;
            }
        };

        if self
            .tokens
            .validate(&identity, secret, self.now(), self.ttl())
            .await
        {
            Some(identity)
        } else {
            debug!("Token is not valid");
            None
        }
    }

    /// Check a bare secret and, if live, return a wire value bound to
    /// [`UNKNOWN_IDENTITY`].
    pub async fn validate_secret(&self, secret: &str) -> Option<String> {
        self.tokens
            .lookup_by_secret(secret, self.now(), self.ttl())
            .await
            .map(|token| self.wire_value(UNKNOWN_IDENTITY, &token.secret))
    }

    pub async fn issue_challenge(&self) -> Challenge {
        self.challenges.issue(self.now()).await
    }

    pub async fn list(&self) -> Vec<Token> {
        self.tokens.list(self.now(), self.ttl()).await
    }

    pub async fn get(&self, id: &str) -> Option<Token> {
        self.tokens.lookup_by_id(id, self.now(), self.ttl()).await
    }

    pub async fn delete(&self, id: &str) -> bool {
        self.tokens.delete(id).await
    }

    /// Sweep both registries, returning `(tokens, challenges)` removed.
    pub async fn sweep(&self) -> (usize, usize) {
        let now = self.now();
        let ttl = self.ttl();
        let tokens = self.tokens.sweep(now, ttl).await;
        let challenges = self.challenges.sweep(now, ttl).await;
        debug!("Swept {tokens} tokens and {challenges} challenges");
        (tokens, challenges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::{
        clock::ManualClock,
        codec::Alphabet,
        credentials::{challenge_digest, MemoryCredentialStore},
    };
    use anyhow::{bail, Result};
    use secrecy::SecretString;

    const START: i64 = 1_700_000_000;

    fn issuer() -> Result<(TokenIssuer, Arc<ManualClock>)> {
        let clock = Arc::new(ManualClock::new(START));
        let credentials =
            MemoryCredentialStore::new().with_user("admin", SecretString::from("pass"));
        let codec = IdentityCodec::new(Alphabet::from_letters("MNBVCXZLKJHGFDSAPOIUYTREWQ")?);
        let issuer = TokenIssuer::new(
            TokensConfig::new().with_ttl_seconds(300),
            codec,
            Arc::new(credentials),
            clock.clone(),
        );
        Ok((issuer, clock))
    }

    #[tokio::test]
    async fn direct_login_then_authenticate() -> Result<()> {
        let (issuer, _clock) = issuer()?;
        let issued = issuer.login("admin", "pass", None, "10.0.0.1:54321").await?;

        assert_eq!(issued.token.address, "10.0.0.1");
        assert!(issued.wire.ends_with(&format!("-{}", issued.token.secret)));
        assert_eq!(issuer.authenticate(&issued.wire).await.as_deref(), Some("admin"));

        let token = issuer.get(&issued.token.id).await;
        assert_eq!(token.map(|t| t.hits), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn direct_login_rejects_bad_password() -> Result<()> {
        let (issuer, _clock) = issuer()?;
        assert_eq!(
            issuer.login("admin", "nope", None, "a:1").await.err(),
            Some(AuthError::Unauthorized)
        );
        assert_eq!(
            issuer.login("ghost", "", None, "a:1").await.err(),
            Some(AuthError::Unauthorized)
        );
        assert!(issuer.tokens().is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn challenge_login() -> Result<()> {
        let (issuer, _clock) = issuer()?;
        let challenge = issuer.issue_challenge().await;
        let digest = challenge_digest("pass", &challenge.payload);

        // The plain password is not accepted once a live challenge is referenced.
        assert!(issuer
            .login("admin", "pass", Some(&challenge.id), "a:1")
            .await
            .is_err());
        assert!(issuer
            .login("admin", "0123456789abcdef0123456789abcdef", Some(&challenge.id), "a:1")
            .await
            .is_err());

        let issued = issuer
            .login("admin", &digest, Some(&challenge.id), "a:1")
            .await?;
        assert_eq!(issued.token.user, "admin");
        Ok(())
    }

    #[tokio::test]
    async fn expired_challenge_is_rejected() -> Result<()> {
        let (issuer, clock) = issuer()?;
        let challenge = issuer.issue_challenge().await;
        let digest = challenge_digest("pass", &challenge.payload);

        clock.advance(301);
        assert!(issuer
            .login("admin", &digest, Some(&challenge.id), "a:1")
            .await
            .is_err());
        assert!(issuer.challenges().is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_challenge_falls_back_to_password() -> Result<()> {
        let (issuer, _clock) = issuer()?;
        let issued = issuer.login("admin", "pass", Some("missing"), "a:1").await?;
        assert_eq!(issued.token.user, "admin");
        Ok(())
    }

    #[tokio::test]
    async fn authenticate_rejects_malformed_values() -> Result<()> {
        let (issuer, _clock) = issuer()?;
        let issued = issuer.login("admin", "pass", None, "a:1").await?;

        assert!(issuer.authenticate("").await.is_none());
        assert!(issuer.authenticate("nodash").await.is_none());
        assert!(issuer
            .authenticate(&format!("{}-extra", issued.wire))
            .await
            .is_none());
        assert!(issuer
            .authenticate(&format!("lower-{}", issued.token.secret))
            .await
            .is_none());
        // Right secret, wrong identity.
        let forged = issuer.wire_value("bob", &issued.token.secret);
        assert!(issuer.authenticate(&forged).await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn authenticate_after_ttl_fails() -> Result<()> {
        let (issuer, clock) = issuer()?;
        let issued = issuer.login("admin", "pass", None, "a:1").await?;

        clock.advance(300);
        assert!(issuer.authenticate(&issued.wire).await.is_some());
        clock.advance(301);
        assert!(issuer.authenticate(&issued.wire).await.is_none());
        assert!(issuer.get(&issued.token.id).await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn basic_login_outcomes() -> Result<()> {
        let (issuer, _clock) = issuer()?;
        let creds = || Some(("admin".to_string(), "pass".to_string()));

        let issued = match issuer.login_basic(None, creds(), "a:1").await? {
            BasicLogin::Issued(issued) => issued,
            BasicLogin::AlreadyAuthenticated => bail!("expected a new token"),
        };

        assert!(matches!(
            issuer.login_basic(Some(&issued.wire), None, "a:1").await?,
            BasicLogin::AlreadyAuthenticated
        ));
        assert!(matches!(
            issuer.login_basic(Some("bogus"), creds(), "a:1").await?,
            BasicLogin::Issued(_)
        ));
        assert_eq!(
            issuer
                .login_basic(None, Some(("admin".into(), "bad".into())), "a:1")
                .await
                .err(),
            Some(AuthError::Unauthorized)
        );
        assert_eq!(
            issuer.login_basic(None, None, "a:1").await.err(),
            Some(AuthError::Unauthorized)
        );
        Ok(())
    }

    #[tokio::test]
    async fn validate_secret_binds_placeholder() -> Result<()> {
        let (issuer, clock) = issuer()?;
        let issued = issuer.login("admin", "pass", None, "a:1").await?;

        let wire = issuer.validate_secret(&issued.token.secret).await;
        assert_eq!(
            wire,
            Some(issuer.wire_value(UNKNOWN_IDENTITY, &issued.token.secret))
        );
        assert!(issuer.validate_secret("unknown").await.is_none());

        clock.advance(301);
        assert!(issuer.validate_secret(&issued.token.secret).await.is_none());
        assert!(issuer.list().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn sweep_covers_both_registries() -> Result<()> {
        let (issuer, clock) = issuer()?;
        issuer.login("admin", "pass", None, "a:1").await?;
        issuer.issue_challenge().await;
        clock.advance(100);
        issuer.login("admin", "pass", None, "a:1").await?;

        clock.advance(250);
        assert_eq!(issuer.sweep().await, (1, 1));
        assert_eq!(issuer.tokens().len().await, 1);
        Ok(())
    }
}
