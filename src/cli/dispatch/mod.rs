use crate::cli::{
    actions::{server::Args, Action},
    commands::{auth, directory},
};
use anyhow::{Context, Result};

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth = auth::Options::parse(matches)?;
    let directory = directory::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        access_token_secret: auth.access_token_secret,
        access_token_ttl_seconds: auth.access_token_ttl_seconds,
        refresh_token_ttl_seconds: auth.refresh_token_ttl_seconds,
        token_issuer: auth.token_issuer,
        directory_url: directory.url,
        directory_timeout_seconds: directory.timeout_seconds,
        purge_interval_seconds: auth.purge_interval_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    #[test]
    fn handler_builds_server_action() {
        temp_env::with_vars_unset(
            [
                "AUTH_SERVICE_PORT",
                "AUTH_SERVICE_TOKEN_ISSUER",
                "AUTH_SERVICE_PURGE_INTERVAL_SECONDS",
            ],
            || {
                let matches = commands::new().get_matches_from(vec![
                    "auth-service",
                    "--port",
                    "8443",
                    "--dsn",
                    "memory://",
                    "--access-token-secret",
                    "s3cret",
                    "--access-token-ttl-seconds",
                    "60",
                    "--refresh-token-ttl-seconds",
                    "120",
                    "--directory-url",
                    "http://directory:8080",
                ]);

                let Action::Server(args) = handler(&matches).expect("action");
                assert_eq!(args.port, 8443);
                assert_eq!(args.dsn, "memory://");
                assert_eq!(args.access_token_secret.expose_secret(), "s3cret");
                assert_eq!(args.access_token_ttl_seconds, 60);
                assert_eq!(args.refresh_token_ttl_seconds, 120);
                assert_eq!(args.token_issuer, None);
                assert_eq!(args.directory_url, "http://directory:8080");
                assert_eq!(args.purge_interval_seconds, 3600);
            },
        );
    }

    #[test]
    fn handler_rejects_blank_secret() {
        temp_env::with_vars([("AUTH_SERVICE_ACCESS_TOKEN_SECRET", None::<&str>)], || {
            let matches = commands::new().get_matches_from(vec![
                "auth-service",
                "--dsn",
                "memory://",
                "--access-token-secret",
                "",
                "--directory-url",
                "http://directory:8080",
            ]);

            assert!(handler(&matches).is_err());
        });
    }
}
