use crate::cli::actions::{server::Args, Action};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let expire = matches.get_one::<i64>("expire").copied().unwrap_or(300);

    let login = matches
        .get_one::<String>("login")
        .cloned()
        .context("missing required argument: --login")?;
    let password = matches
        .get_one::<String>("password")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --password")?;

    let users = matches
        .get_one::<String>("users")
        .map(PathBuf::from)
        .context("missing required argument: --users")?;
    let dir = matches
        .get_one::<String>("dir")
        .map(PathBuf::from)
        .context("missing required argument: --dir")?;

    Ok(Action::Server(Args {
        port,
        expire,
        login,
        password,
        users,
        dir,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    #[test]
    fn test_handler_builds_server_action() -> Result<()> {
        let matches = commands::new().try_get_matches_from(vec![
            "tokens",
            "--port",
            "9000",
            "--expire",
            "30",
            "--login",
            "root",
            "--password",
            "toor",
            "--users",
            "accounts.json",
            "--dir",
            "www",
        ])?;

        let Action::Server(args) = handler(&matches)?;
        assert_eq!(args.port, 9000);
        assert_eq!(args.expire, 30);
        assert_eq!(args.login, "root");
        assert_eq!(args.password.expose_secret(), "toor");
        assert_eq!(args.users, PathBuf::from("accounts.json"));
        assert_eq!(args.dir, PathBuf::from("www"));
        Ok(())
    }
}
