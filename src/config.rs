use anyhow::Context;
use sqlx::postgres::PgConnectOptions;

const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;

/// Variable name used by older deployments for the intervention webhook.
pub const LEGACY_WEBHOOK_ENV: &str = "N8N_WEBHOOK_URL";

/// The webhook from `--webhook-url`/`INTERVENTION_WEBHOOK_URL`, else `N8N_WEBHOOK_URL`.
pub fn webhook_url(explicit: Option<String>) -> Option<String> {
    webhook_url_from(explicit, |key| std::env::var(key).ok())
}

pub fn webhook_url_from<F>(explicit: Option<String>, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    explicit.or_else(|| lookup(LEGACY_WEBHOOK_ENV))
}

/// Resolve Postgres connection options from the environment.
///
/// `DATABASE_URL` wins when present. Otherwise the discrete `DB_HOST`, `DB_PORT`,
/// `DB_USER`, `DB_PASSWORD` and `DB_NAME` variables are combined; `DB_NAME` is
/// the only one without a default.
pub fn database_options() -> anyhow::Result<PgConnectOptions> {
    database_options_from(|key| std::env::var(key).ok())
}

pub fn database_options_from<F>(lookup: F) -> anyhow::Result<PgConnectOptions>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(url) = lookup("DATABASE_URL") {
        return url
            .parse::<PgConnectOptions>()
            .context("DATABASE_URL is not a valid Postgres connection string");
    }

    let database = lookup("DB_NAME")
        .context("DATABASE_URL or DB_NAME must be set to a production Postgres instance")?;
    let host = lookup("DB_HOST").unwrap_or_else(|| DEFAULT_DB_HOST.to_string());
    let port = match lookup("DB_PORT") {
        Some(port) => port
            .parse::<u16>()
            .with_context(|| format!("DB_PORT is not a valid port: {port}"))?,
        None => DEFAULT_DB_PORT,
    };

    let mut options = PgConnectOptions::new()
        .host(&host)
        .port(port)
        .database(&database);
    if let Some(user) = lookup("DB_USER") {
        options = options.username(&user);
    }
    if let Some(password) = lookup("DB_PASSWORD") {
        options = options.password(&password);
    }

    Ok(options)
}
