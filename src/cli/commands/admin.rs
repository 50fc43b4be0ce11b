use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_ADMIN_PASSWORD: &str = "admin-password";
pub const ARG_ADMIN_TOKEN_SALT: &str = "admin-token-salt";

/// Back-office credentials. Both are optional at startup; without them the
/// login endpoint reports a configuration error and nobody is admitted.
#[derive(Debug, Default)]
pub struct Options {
    pub password: Option<SecretString>,
    pub salt: Option<SecretString>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let read_secret = |id: &str| {
            matches
                .get_one::<String>(id)
                .filter(|value| !value.is_empty())
                .map(|value| SecretString::from(value.clone()))
        };

        Self {
            password: read_secret(ARG_ADMIN_PASSWORD),
            salt: read_secret(ARG_ADMIN_TOKEN_SALT),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ADMIN_PASSWORD)
                .long(ARG_ADMIN_PASSWORD)
                .help("Shared password for the admin back office")
                .env("ADMIN_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_ADMIN_TOKEN_SALT)
                .long(ARG_ADMIN_TOKEN_SALT)
                .help("Salt mixed into the admin session token")
                .env("ADMIN_TOKEN_SALT")
                .hide_env_values(true),
        )
}
