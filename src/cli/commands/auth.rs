use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::auth::config::{DEFAULT_ACCESS_TOKEN_TTL_SECONDS, DEFAULT_REFRESH_TOKEN_TTL_SECONDS};

pub const ARG_ACCESS_TOKEN_SECRET: &str = "access-token-secret";
pub const ARG_ACCESS_TOKEN_TTL_SECONDS: &str = "access-token-ttl-seconds";
pub const ARG_REFRESH_TOKEN_TTL_SECONDS: &str = "refresh-token-ttl-seconds";
pub const ARG_TOKEN_ISSUER: &str = "token-issuer";
pub const ARG_PURGE_INTERVAL_SECONDS: &str = "purge-interval-seconds";

#[derive(Debug)]
pub struct Options {
    pub access_token_secret: SecretString,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub token_issuer: Option<String>,
    pub purge_interval_seconds: u64,
}

impl Options {
    /// Parse token arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the signing secret is missing or empty.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let secret = matches
            .get_one::<String>(ARG_ACCESS_TOKEN_SECRET)
            .cloned()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_ACCESS_TOKEN_SECRET}"))?;

        Ok(Self {
            access_token_secret: SecretString::from(secret),
            access_token_ttl_seconds: matches
                .get_one::<i64>(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .copied()
                .unwrap_or(DEFAULT_ACCESS_TOKEN_TTL_SECONDS),
            refresh_token_ttl_seconds: matches
                .get_one::<i64>(ARG_REFRESH_TOKEN_TTL_SECONDS)
                .copied()
                .unwrap_or(DEFAULT_REFRESH_TOKEN_TTL_SECONDS),
            token_issuer: matches
                .get_one::<String>(ARG_TOKEN_ISSUER)
                .cloned()
                .filter(|v| !v.trim().is_empty()),
            purge_interval_seconds: matches
                .get_one::<u64>(ARG_PURGE_INTERVAL_SECONDS)
                .copied()
                .unwrap_or(0),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_SECRET)
                .long(ARG_ACCESS_TOKEN_SECRET)
                .help("HMAC secret used to sign access tokens")
                .env("AUTH_SERVICE_ACCESS_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .long(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .help("Access token lifetime in seconds")
                .env("AUTH_SERVICE_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_TTL_SECONDS)
                .long(ARG_REFRESH_TOKEN_TTL_SECONDS)
                .help("Refresh token lifetime in seconds")
                .env("AUTH_SERVICE_REFRESH_TOKEN_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_TOKEN_ISSUER)
                .long(ARG_TOKEN_ISSUER)
                .help("Value of the `iss` claim; when set, access tokens without it are rejected")
                .env("AUTH_SERVICE_TOKEN_ISSUER"),
        )
        .arg(
            Arg::new(ARG_PURGE_INTERVAL_SECONDS)
                .long(ARG_PURGE_INTERVAL_SECONDS)
                .help("Interval between expired refresh token purges, 0 disables")
                .env("AUTH_SERVICE_PURGE_INTERVAL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64)),
        )
}
