//! # Tokens
//!
//! `tokens` issues short-lived session tokens over HTTP. A caller logs in with a
//! password, with an MD5 digest over a server-issued challenge, or with basic auth,
//! and gets back a token bound to their identity. Tokens and challenges live in memory
//! and expire after a fixed number of seconds without use.
//!
//! The value clients present is `encode(identity) + "-" + secret`, where the identity
//! is obfuscated with an alphabet shuffled at startup. Restarting the process
//! invalidates every token.

pub mod cli;
pub mod tokens;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
