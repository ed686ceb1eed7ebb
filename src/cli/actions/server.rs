use crate::{
    api,
    auth::{purge, AuthConfig, AuthService},
    cli::{commands::MEMORY_DSN, telemetry},
    directory::HttpIdentityDirectory,
    store::{MemoryRefreshTokenStore, PgRefreshTokenStore, RefreshTokenStore},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub access_token_secret: SecretString,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub token_issuer: Option<String>,
    pub directory_url: String,
    pub directory_timeout_seconds: u64,
    pub purge_interval_seconds: u64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid, the store cannot be reached
/// or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let config = AuthConfig::new(args.access_token_secret)
        .with_access_token_ttl_seconds(args.access_token_ttl_seconds)
        .with_refresh_token_ttl_seconds(args.refresh_token_ttl_seconds)
        .with_token_issuer(args.token_issuer);
    config.validate().context("Invalid token configuration")?;

    let directory = HttpIdentityDirectory::new(
        &args.directory_url,
        Duration::from_secs(args.directory_timeout_seconds),
    )
    .context("Invalid identity directory configuration")?;

    let store = connect_store(&args.dsn).await?;

    let service = AuthService::new(&config, directory, store.clone())
        .context("Failed to build auth service")?;

    let purge_worker = (args.purge_interval_seconds > 0).then(|| {
        purge::spawn_purge_worker(
            store.clone(),
            Duration::from_secs(args.purge_interval_seconds),
        )
    });

    let app = api::router(Arc::new(service), store);
    let result = api::serve(args.port, app).await;

    if let Some(worker) = purge_worker {
        worker.abort();
    }
    telemetry::shutdown_tracer();

    result
}

/// Open the refresh token store named by `dsn`.
///
/// `memory://` selects the in-process store; anything else is a `PostgreSQL`
/// connection string and the schema is applied before use.
///
/// # Errors
/// Returns an error if the database cannot be reached or migrated.
pub async fn connect_store(dsn: &str) -> Result<Arc<dyn RefreshTokenStore>> {
    if dsn == MEMORY_DSN {
        warn!("Using the in-memory refresh token store, tokens do not survive a restart");
        return Ok(Arc::new(MemoryRefreshTokenStore::new()));
    }

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .context("Failed to connect to database")?;

    let store = PgRefreshTokenStore::new(pool);
    store.migrate().await?;

    Ok(Arc::new(store))
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(&args.dsn)),
        ("access_token_ttl_seconds", args.access_token_ttl_seconds.to_string()),
        ("refresh_token_ttl_seconds", args.refresh_token_ttl_seconds.to_string()),
        (
            "token_issuer",
            args.token_issuer
                .clone()
                .unwrap_or_else(|| "none".to_string()),
        ),
        ("directory_url", args.directory_url.clone()),
        (
            "directory_timeout_seconds",
            args.directory_timeout_seconds.to_string(),
        ),
        ("purge_interval_seconds", args.purge_interval_seconds.to_string()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "auth-service {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_dsn(dsn: &str) -> String {
    if dsn == MEMORY_DSN {
        return dsn.to_string();
    }
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

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    trimmed.chars().take(7).collect()
}
