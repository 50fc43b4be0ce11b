use crate::bucket::{BucketConfig, DEFAULT_BUCKET};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SUPABASE_URL: &str = "supabase-url";
pub const ARG_SUPABASE_SERVICE_ROLE: &str = "supabase-service-role";
pub const ARG_SUPABASE_BUCKET: &str = "supabase-bucket";
pub const ARG_UPLOAD_MAX_BYTES: &str = "upload-max-bytes";

pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug)]
pub struct Options {
    pub config: BucketConfig,
    pub upload_max_bytes: usize,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let base_url = matches.get_one::<String>(ARG_SUPABASE_URL).cloned();
        let service_role = matches
            .get_one::<String>(ARG_SUPABASE_SERVICE_ROLE)
            .map(|key| SecretString::from(key.clone()));
        let bucket = matches
            .get_one::<String>(ARG_SUPABASE_BUCKET)
            .cloned()
            .unwrap_or_else(|| DEFAULT_BUCKET.to_string());
        let upload_max_bytes = matches
            .get_one::<usize>(ARG_UPLOAD_MAX_BYTES)
            .copied()
            .unwrap_or(DEFAULT_UPLOAD_MAX_BYTES);

        Self {
            config: BucketConfig::new(base_url, service_role, bucket),
            upload_max_bytes,
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SUPABASE_URL)
                .long(ARG_SUPABASE_URL)
                .help("Object storage base URL, example: https://<project>.supabase.co")
                .env("SUPABASE_URL"),
        )
        .arg(
            Arg::new(ARG_SUPABASE_SERVICE_ROLE)
                .long(ARG_SUPABASE_SERVICE_ROLE)
                .help("Service-role key used to write to the bucket")
                .env("SUPABASE_SERVICE_ROLE")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_SUPABASE_BUCKET)
                .long(ARG_SUPABASE_BUCKET)
                .help("Bucket that receives product images")
                .env("SUPABASE_BUCKET")
                .default_value(DEFAULT_BUCKET),
        )
        .arg(
            Arg::new(ARG_UPLOAD_MAX_BYTES)
                .long(ARG_UPLOAD_MAX_BYTES)
                .help("Maximum request body size in bytes, uploads included")
                .env("STOREFRONT_UPLOAD_MAX_BYTES")
                .default_value("10485760")
                .value_parser(clap::value_parser!(usize)),
        )
}
