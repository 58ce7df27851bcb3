//! Challenge payloads for the challenge-response login flow.

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{clock::is_expired, registry::sha256_hex};

const CHALLENGE_ROUNDS: i64 = 16;

#[derive(ToSchema, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Challenge {
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "challengedata")]
    pub payload: String,
    #[serde(skip)]
    pub created: i64,
}

#[derive(Debug, Default)]
pub struct ChallengeRegistry {
    challenges: Mutex<Vec<Challenge>>,
}

impl ChallengeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and store a challenge stamped at `now`.
    pub async fn issue(&self, now: i64) -> Challenge {
        let challenge = Challenge {
            id: Uuid::new_v4().to_string(),
            payload: challenge_payload(now),
            created: now,
        };

        self.challenges.lock().await.push(challenge.clone());
        debug!("Create challenge {}", challenge.id);

        challenge
    }

    /// Return the challenge without consuming or refreshing it.
    /// An expired entry is removed and reported as absent.
    pub async fn lookup(&self, id: &str, now: i64, ttl: i64) -> Option<Challenge> {
        let mut challenges = self.challenges.lock().await;
        let index = challenges.iter().position(|challenge| challenge.id == id)?;

        if is_expired(challenges[index].created, ttl, now) {
            let removed = challenges.remove(index);
            debug!("Remove expired challenge {}", removed.id);
            return None;
        }

        Some(challenges[index].clone())
    }

    /// Drop every expired challenge, returning how many were removed.
    pub async fn sweep(&self, now: i64, ttl: i64) -> usize {
        let mut challenges = self.challenges.lock().await;
        let before = challenges.len();
        challenges.retain(|challenge| {
            let keep = !is_expired(challenge.created, ttl, now);
            if !keep {
                debug!("Remove challenge {}", challenge.id);
            }
            keep
        });
        before - challenges.len()
    }

    pub async fn len(&self) -> usize {
        self.challenges.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.challenges.lock().await.is_empty()
    }
}

/// Concatenated SHA-256 hex digests of `now`, `now + 1`, .. `now + 15`.
fn challenge_payload(now: i64) -> String {
    (0..CHALLENGE_ROUNDS)
        .map(|offset| sha256_hex(&(now + offset).to_string()))
        .collect()
}
