//! Login/password lookup for the two login modes.

use md5::{Digest, Md5};
use secrecy::{ExposeSecret, SecretString};
use std::{collections::HashMap, fs, io, path::Path};
use thiserror::Error;

/// What the issuer needs from a credential backend.
pub trait CredentialVerifier: Send + Sync {
    /// Direct login: the candidate must equal the stored password.
    fn verify(&self, login: &str, password: &str) -> bool;

    /// Challenge login: the candidate must equal `md5_hex(stored_password + challenge)`.
    fn verify_challenge_digest(&self, login: &str, digest: &str, challenge: &str) -> bool;
}

#[derive(Debug, Error)]
pub enum UsersFileError {
    #[error("failed to read users file: {0}")]
    Io(#[from] io::Error),
    #[error("users file is not a JSON object of login/password strings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read-only store loaded once at startup.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    users: HashMap<String, SecretString>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `{"login": "password"}` JSON document.
    ///
    /// # Errors
    /// Returns an error if the document is not a flat object of strings.
    pub fn from_json(json: &str) -> Result<Self, UsersFileError> {
        let users: HashMap<String, String> = serde_json::from_str(json)?;
        Ok(Self {
            users: users
                .into_iter()
                .map(|(login, password)| (login, SecretString::from(password)))
                .collect(),
        })
    }

    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self, UsersFileError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    #[must_use]
    pub fn with_user(mut self, login: &str, password: SecretString) -> Self {
        self.users.insert(login.to_string(), password);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl CredentialVerifier for MemoryCredentialStore {
    fn verify(&self, login: &str, password: &str) -> bool {
        self.users
            .get(login)
            .is_some_and(|stored| stored.expose_secret() == password)
    }

    fn verify_challenge_digest(&self, login: &str, digest: &str, challenge: &str) -> bool {
        self.users.get(login).is_some_and(|stored| {
            challenge_digest(stored.expose_secret(), challenge) == digest
        })
    }
}

/// Lowercase hex MD5 of `password` followed by `challenge`, as computed by clients.
#[must_use]
pub fn challenge_digest(password: &str, challenge: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(password.as_bytes());
    hasher.update(challenge.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn store() -> MemoryCredentialStore {
        MemoryCredentialStore::new().with_user("admin", SecretString::from("pass"))
    }

    #[test]
    fn verify_exact_match_only() {
        let store = store();
        assert!(store.verify("admin", "pass"));
        assert!(!store.verify("admin", "Pass"));
        assert!(!store.verify("admin", ""));
        assert!(!store.verify("nobody", "pass"));
    }

    #[test]
    fn unknown_login_never_matches_empty_password() {
        let store = store();
        assert!(!store.verify("nobody", ""));
    }

    #[test]
    fn challenge_digest_known_value() {
        // md5("") and md5("abc")
        assert_eq!(challenge_digest("", ""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(challenge_digest("a", "bc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn verify_challenge_digest() {
        let store = store();
        let digest = challenge_digest("pass", "payload");
        assert!(store.verify_challenge_digest("admin", &digest, "payload"));
        assert!(!store.verify_challenge_digest("admin", &digest, "other"));
        assert!(!store.verify_challenge_digest("admin", "pass", "payload"));
    }

    #[test]
    fn unknown_login_rejects_digest_of_challenge_alone() {
        let store = store();
        let digest = challenge_digest("", "payload");
        assert!(!store.verify_challenge_digest("nobody", &digest, "payload"));
    }

    #[test]
    fn from_json_parses_users() -> Result<()> {
        let store = MemoryCredentialStore::from_json(r#"{"alice":"wonder","bob":"builder"}"#)?;
        assert_eq!(store.len(), 2);
        assert!(store.verify("alice", "wonder"));
        assert!(store.verify("bob", "builder"));
        Ok(())
    }

    #[test]
    fn from_json_rejects_nested_values() {
        assert!(matches!(
            MemoryCredentialStore::from_json(r#"{"alice":{"password":"x"}}"#),
            Err(UsersFileError::Parse(_))
        ));
    }

    #[test]
    fn with_user_overrides_file_entry() -> Result<()> {
        let store = MemoryCredentialStore::from_json(r#"{"admin":"old"}"#)?
            .with_user("admin", SecretString::from("new"));
        assert!(store.verify("admin", "new"));
        assert!(!store.verify("admin", "old"));
        Ok(())
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = MemoryCredentialStore::from_json_file(Path::new("/nonexistent/users.json"));
        assert!(matches!(
            result,
            Err(UsersFileError::Io(ref err)) if err.kind() == io::ErrorKind::NotFound
        ));
    }
}
