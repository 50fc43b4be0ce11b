use crate::{
    api::{self, AdminGate},
    bucket::{BucketConfig, SupabaseBucket},
    cli::telemetry,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub admin_password: Option<SecretString>,
    pub admin_token_salt: Option<SecretString>,
    pub bucket: BucketConfig,
    pub upload_max_bytes: usize,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the storage client cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let gate = AdminGate::new(args.admin_password, args.admin_token_salt);
    if !gate.is_configured() {
        warn!("ADMIN_PASSWORD or ADMIN_TOKEN_SALT is not set, admin login is disabled");
    }
    if !args.bucket.is_configured() {
        warn!("SUPABASE_URL or SUPABASE_SERVICE_ROLE is not set, image uploads will fail");
    }

    let bucket = SupabaseBucket::new(args.bucket).context("Failed to build storage client")?;

    let result = api::new(
        args.port,
        &args.dsn,
        gate,
        Arc::new(bucket),
        args.upload_max_bytes,
    )
    .await;

    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(&args.dsn)),
        ("admin_password_set", args.admin_password.is_some().to_string()),
        ("admin_token_salt_set", args.admin_token_salt.is_some().to_string()),
        ("storage_configured", args.bucket.is_configured().to_string()),
        ("storage_bucket", args.bucket.bucket().to_string()),
        ("upload_max_bytes", args.upload_max_bytes.to_string()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
