use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("tokens")
        .about("Short-lived session tokens")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("TOKENS_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("expire")
                .short('e')
                .long("expire")
                .help("Seconds a token or challenge stays valid without use")
                .default_value("300")
                .env("TOKENS_EXPIRE")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new("login")
                .long("login")
                .help("Built-in login, always accepted alongside the users file")
                .default_value("admin")
                .env("TOKENS_LOGIN"),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .help("Password of the built-in login")
                .default_value("pass")
                .env("TOKENS_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new("users")
                .long("users")
                .help("JSON file mapping logins to passwords")
                .default_value("users.json")
                .env("TOKENS_USERS"),
        )
        .arg(
            Arg::new("dir")
                .long("dir")
                .help("Directory holding admin.html")
                .default_value(".")
                .env("TOKENS_DIR"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("TOKENS_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "tokens");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            "Short-lived session tokens"
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars(
            [
                ("TOKENS_PORT", None::<&str>),
                ("TOKENS_EXPIRE", None),
                ("TOKENS_LOGIN", None),
                ("TOKENS_PASSWORD", None),
                ("TOKENS_USERS", None),
                ("TOKENS_DIR", None),
                ("TOKENS_LOG_LEVEL", None),
            ],
            || {
                let matches = new().get_matches_from(vec!["tokens"]);
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(8080));
                assert_eq!(matches.get_one::<i64>("expire").copied(), Some(300));
                assert_eq!(
                    matches.get_one::<String>("login").map(String::as_str),
                    Some("admin")
                );
                assert_eq!(
                    matches.get_one::<String>("password").map(String::as_str),
                    Some("pass")
                );
                assert_eq!(
                    matches.get_one::<String>("users").map(String::as_str),
                    Some("users.json")
                );
                assert_eq!(
                    matches.get_one::<String>("dir").map(String::as_str),
                    Some(".")
                );
                assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(0));
            },
        );
    }

    #[test]
    fn test_check_args() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "tokens",
            "--port",
            "9090",
            "--expire",
            "60",
            "--login",
            "root",
            "--password",
            "secret",
            "--users",
            "/etc/tokens/users.json",
            "--dir",
            "/srv/tokens",
        ]);

        assert_eq!(matches.get_one::<u16>("port").copied(), Some(9090));
        assert_eq!(matches.get_one::<i64>("expire").copied(), Some(60));
        assert_eq!(
            matches.get_one::<String>("login").map(String::as_str),
            Some("root")
        );
        assert_eq!(
            matches.get_one::<String>("password").map(String::as_str),
            Some("secret")
        );
        assert_eq!(
            matches.get_one::<String>("users").map(String::as_str),
            Some("/etc/tokens/users.json")
        );
        assert_eq!(
            matches.get_one::<String>("dir").map(String::as_str),
            Some("/srv/tokens")
        );
    }

    #[test]
    fn test_expire_must_be_positive() {
        for expire in ["0", "-5", "soon"] {
            let result = new().try_get_matches_from(vec!["tokens", "--expire", expire]);
            assert!(result.is_err(), "accepted --expire {expire}");
        }
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("TOKENS_PORT", Some("443")),
                ("TOKENS_EXPIRE", Some("120")),
                ("TOKENS_LOGIN", Some("operator")),
                ("TOKENS_PASSWORD", Some("hunter2")),
                ("TOKENS_USERS", Some("/tmp/users.json")),
                ("TOKENS_DIR", Some("/tmp")),
                ("TOKENS_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["tokens"]);
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(443));
                assert_eq!(matches.get_one::<i64>("expire").copied(), Some(120));
                assert_eq!(
                    matches.get_one::<String>("login").map(String::as_str),
                    Some("operator")
                );
                assert_eq!(
                    matches.get_one::<String>("password").map(String::as_str),
                    Some("hunter2")
                );
                assert_eq!(
                    matches.get_one::<String>("users").map(String::as_str),
                    Some("/tmp/users.json")
                );
                assert_eq!(
                    matches.get_one::<String>("dir").map(String::as_str),
                    Some("/tmp")
                );
                assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(2));
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("TOKENS_LOG_LEVEL", Some(level))], || {
                let command = new();
                let matches = command.get_matches_from(vec!["tokens"]);
                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    Some(index as u8)
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        // loop cover all possible value_parse
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars([("TOKENS_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["tokens".to_string()];

                // Add the appropriate number of "-v" flags based on the index
                if index > 0 {
                    let v = format!("-{}", "v".repeat(index));
                    args.push(v);
                }

                let command = new();

                let matches = command.get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    Some(index as u8)
                );
            });
        }
    }
}
