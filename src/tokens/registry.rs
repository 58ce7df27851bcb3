//! Live token storage.
//!
//! Every operation takes the registry lock for its whole duration, so callers never
//! observe a half-updated token and concurrent validations of the same token are
//! applied one after the other. Eviction is always done with a single removal or a
//! `retain` pass, never by removing while walking indices forward.

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::clock::is_expired;

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub id: String,
    pub user: String,
    /// The validation secret carried in the wire value.
    #[serde(rename = "token")]
    pub secret: String,
    /// Client address without its port.
    pub address: String,
    pub created: i64,
    pub updated: i64,
    pub hits: i64,
}

#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: Mutex<Vec<Token>>,
}

impl TokenRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for `user` stamped at `now`.
    ///
    /// The id is a random UUID and the secret is `sha256_hex("{id}/{now}")`. Both are
    /// checked against live tokens under the lock before insertion, so neither can
    /// ever be shared by two live tokens.
    pub async fn issue(&self, user: &str, remote_address: &str, now: i64) -> Token {
        let mut tokens = self.tokens.lock().await;

        let (id, secret) = loop {
            let id = Uuid::new_v4().to_string();
            let secret = sha256_hex(&format!("{id}/{now}"));
            if !tokens
                .iter()
                .any(|token| token.id == id || token.secret == secret)
            {
                break (id, secret);
            }
            warn!("Token id collision, regenerating");
        };

        let token = Token {
            id,
            user: user.to_string(),
            secret,
            address: strip_port(remote_address),
            created: now,
            updated: now,
            hits: 0,
        };
        tokens.push(token.clone());

        info!("Create token {} for user {}", token.id, token.user);

        token
    }

    /// Check `(identity, secret)` against live tokens and touch the match.
    ///
    /// An expired match is evicted. Unknown, expired and mismatched pairs all
    /// return `false`.
    pub async fn validate(&self, identity: &str, secret: &str, now: i64, ttl: i64) -> bool {
        let mut tokens = self.tokens.lock().await;
        let Some(index) = tokens
            .iter()
            .position(|token| token.user == identity && token.secret == secret)
        else {
            return false;
        };

        touch_or_evict(&mut tokens, index, now, ttl).is_some()
    }

    /// Fetch a token by id, touching it on success and evicting it if expired.
    pub async fn lookup_by_id(&self, id: &str, now: i64, ttl: i64) -> Option<Token> {
        let mut tokens = self.tokens.lock().await;
        let index = tokens.iter().position(|token| token.id == id)?;

        touch_or_evict(&mut tokens, index, now, ttl)
    }

    /// Fetch a live token by secret alone, evicting it if expired. Does not touch.
    pub async fn lookup_by_secret(&self, secret: &str, now: i64, ttl: i64) -> Option<Token> {
        let mut tokens = self.tokens.lock().await;
        let index = tokens.iter().position(|token| token.secret == secret)?;

        if is_expired(tokens[index].updated, ttl, now) {
            let removed = tokens.remove(index);
            info!("Remove expired token {}", removed.id);
            return None;
        }

        Some(tokens[index].clone())
    }

    /// Live tokens in issuance order. Expired entries are evicted first.
    pub async fn list(&self, now: i64, ttl: i64) -> Vec<Token> {
        let mut tokens = self.tokens.lock().await;
        retain_live(&mut tokens, now, ttl);
        tokens.clone()
    }

    pub async fn delete(&self, id: &str) -> bool {
        let mut tokens = self.tokens.lock().await;
        let Some(index) = tokens.iter().position(|token| token.id == id) else {
            return false;
        };

        let removed = tokens.remove(index);
        info!("Remove token {}", removed.id);
        true
    }

    /// Remove every expired token, returning how many were removed.
    pub async fn sweep(&self, now: i64, ttl: i64) -> usize {
        let mut tokens = self.tokens.lock().await;
        retain_live(&mut tokens, now, ttl)
    }

    pub async fn len(&self) -> usize {
        self.tokens.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.lock().await.is_empty()
    }
}

fn touch_or_evict(tokens: &mut Vec<Token>, index: usize, now: i64, ttl: i64) -> Option<Token> {
    if is_expired(tokens[index].updated, ttl, now) {
        let removed = tokens.remove(index);
        info!("Remove expired token {}", removed.id);
        return None;
    }

    let token = &mut tokens[index];
    token.hits += 1;
    token.updated = now;
    debug!("Token {} validated for user {}", token.id, token.user);

    Some(token.clone())
}

fn retain_live(tokens: &mut Vec<Token>, now: i64, ttl: i64) -> usize {
    let before = tokens.len();
    tokens.retain(|token| {
        let keep = !is_expired(token.updated, ttl, now);
        if !keep {
            info!("Remove expired token {}", token.id);
        }
        keep
    });
    before - tokens.len()
}

/// Strip a trailing `:port` (digits only) from a host or socket address.
#[must_use]
pub fn strip_port(address: &str) -> String {
    Regex::new(r":[0-9]*$").map_or_else(
        |_| address.to_string(),
        |re| re.replace(address, "").into_owned(),
    )
}

pub(crate) fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}
