//! Maps parsed CLI arguments to the action the binary runs.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_DSN, ARG_PORT, admin, bucket};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .filter(|dsn| !dsn.trim().is_empty())
        .context("missing required argument: --dsn")?;

    let admin_opts = admin::Options::parse(matches);
    let bucket_opts = bucket::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        dsn,
        admin_password: admin_opts.password,
        admin_token_salt: admin_opts.salt,
        bucket: bucket_opts.config,
        upload_max_bytes: bucket_opts.upload_max_bytes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn builds_server_action() -> Result<()> {
        let matches = commands::new().try_get_matches_from(vec![
            "storefront",
            "--port",
            "9090",
            "--dsn",
            "postgres://localhost/storefront",
            "--admin-password",
            "correctpw",
            "--admin-token-salt",
            "pepper",
            "--supabase-bucket",
            "catalog",
        ])?;

        let Action::Server(args) = handler(&matches)?;
        assert_eq!(args.port, 9090);
        assert_eq!(args.dsn, "postgres://localhost/storefront");
        assert!(args.admin_password.is_some());
        assert!(args.admin_token_salt.is_some());
        assert_eq!(args.bucket.bucket(), "catalog");
        Ok(())
    }

    #[test]
    fn blank_dsn_is_rejected() -> Result<()> {
        let matches =
            commands::new().try_get_matches_from(vec!["storefront", "--dsn", "  "])?;
        assert!(handler(&matches).is_err());
        Ok(())
    }
}
