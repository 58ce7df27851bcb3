//! Service configuration fixed at startup.

use std::path::PathBuf;

pub const DEFAULT_TTL_SECONDS: i64 = 300;
pub const TOKEN_COOKIE_NAME: &str = "Token";
pub const CHALLENGE_COOKIE_NAME: &str = "ChallengeData";
pub const TOKEN_QUERY_PARAM: &str = "token";
// Header names are case-insensitive; clients send `TOKEN`.
pub const TOKEN_HEADER: &str = "token";

#[derive(Clone, Debug)]
pub struct TokensConfig {
    ttl_seconds: i64,
    admin_dir: PathBuf,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TokensConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
            admin_dir: PathBuf::from("."),
        }
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: i64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_admin_dir(mut self, dir: PathBuf) -> Self {
        self.admin_dir = dir;
        self
    }

    /// Lifetime of tokens, challenges and the cookies carrying them.
    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    #[must_use]
    pub fn admin_page(&self) -> PathBuf {
        self.admin_dir.join("admin.html")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let config = TokensConfig::new();
        assert_eq!(config.ttl_seconds(), DEFAULT_TTL_SECONDS);
        assert_eq!(config.admin_page(), PathBuf::from("./admin.html"));

        let config = config
            .with_ttl_seconds(60)
            .with_admin_dir(PathBuf::from("/srv/www"));
        assert_eq!(config.ttl_seconds(), 60);
        assert_eq!(config.admin_page(), PathBuf::from("/srv/www/admin.html"));
    }
}
