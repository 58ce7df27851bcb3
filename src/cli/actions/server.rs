use crate::tokens::{
    self,
    clock::SystemClock,
    codec::{Alphabet, IdentityCodec},
    credentials::{MemoryCredentialStore, UsersFileError},
    issuer::TokenIssuer,
    state::TokensConfig,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub expire: i64,
    pub login: String,
    pub password: SecretString,
    pub users: PathBuf,
    pub dir: PathBuf,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the users file is malformed or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let store = load_users(&args.users)?.with_user(&args.login, args.password);
    info!("Loaded {} login(s)", store.len());

    let config = TokensConfig::new()
        .with_ttl_seconds(args.expire)
        .with_admin_dir(args.dir);

    let codec = IdentityCodec::new(Alphabet::shuffled(&mut rand::thread_rng()));

    let issuer = TokenIssuer::new(config, codec, Arc::new(store), Arc::new(SystemClock));

    tokens::new(args.port, Arc::new(issuer)).await
}

/// Read the users file. A missing file only means no extra logins.
fn load_users(path: &Path) -> Result<MemoryCredentialStore> {
    match MemoryCredentialStore::from_json_file(path) {
        Ok(store) => Ok(store),
        Err(UsersFileError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
            warn!(
                "Users file {} not found, only the built-in login is accepted",
                path.display()
            );
            Ok(MemoryCredentialStore::new())
        }
        Err(err) => Err(err).with_context(|| format!("Could not load {}", path.display())),
    }
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("expire", format!("{}s", args.expire)),
        ("login", args.login.clone()),
        ("users", args.users.display().to_string()),
        ("dir", args.dir.display().to_string()),
    ];
    log_entries("Startup configuration", &entries);
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!("{}\n\n{title}:", tokens_banner());
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn tokens_banner() -> String {
    let short_hash = short_commit(crate::GIT_COMMIT_HASH);
    format!("T O K E N S - {} - {short_hash}", env!("CARGO_PKG_VERSION"))
}

fn short_commit(hash: &str) -> String {
    hash.trim().chars().take(7).collect()
}
