use crate::app_config::{AppConfig, Environment};
use crate::scoring::ScoringPolicy;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Resolve the scoring policy named by `SCOUT_SCORING_POLICY_PATH`, or the
/// built-in policy when it is unset.
///
/// # Errors
///
/// Returns `ConfigError` if the policy file cannot be read, parsed, or
/// validated.
pub fn load_scoring_policy(config: &AppConfig) -> Result<ScoringPolicy, ConfigError> {
    match &config.scoring_policy_path {
        Some(path) => ScoringPolicy::load(path),
        None => Ok(ScoringPolicy::default()),
    }
}

fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use std::str::FromStr;

    fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    }

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Empty values count as unset so `.env` templates can leave them blank.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("SCOUT_ENV", "development"));
    let bind_addr: SocketAddr =
        parse_as("SCOUT_BIND_ADDR", &or_default("SCOUT_BIND_ADDR", "0.0.0.0:3000"))?;
    let log_level = or_default("SCOUT_LOG_LEVEL", "info");

    let db_max_connections: u32 = parse_as(
        "SCOUT_DB_MAX_CONNECTIONS",
        &or_default("SCOUT_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections: u32 = parse_as(
        "SCOUT_DB_MIN_CONNECTIONS",
        &or_default("SCOUT_DB_MIN_CONNECTIONS", "1"),
    )?;
    let db_acquire_timeout_secs: u64 = parse_as(
        "SCOUT_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("SCOUT_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    let rye_api_key = optional("RYE_API_KEY");
    let rye_shopper_ip = optional("RYE_SHOPPER_IP");
    let rye_endpoint = or_default("RYE_ENDPOINT", "https://graphql.api.rye.com/v1/query");

    let remote_timeout_secs: u64 = parse_as(
        "SCOUT_REMOTE_TIMEOUT_SECS",
        &or_default("SCOUT_REMOTE_TIMEOUT_SECS", "30"),
    )?;
    let remote_max_retries: u32 = parse_as(
        "SCOUT_REMOTE_MAX_RETRIES",
        &or_default("SCOUT_REMOTE_MAX_RETRIES", "3"),
    )?;
    let remote_backoff_base_ms: u64 = parse_as(
        "SCOUT_REMOTE_BACKOFF_BASE_MS",
        &or_default("SCOUT_REMOTE_BACKOFF_BASE_MS", "500"),
    )?;

    let index_wait_attempts: u32 = parse_as(
        "SCOUT_INDEX_WAIT_ATTEMPTS",
        &or_default("SCOUT_INDEX_WAIT_ATTEMPTS", "5"),
    )?;
    let index_wait_base_ms: u64 = parse_as(
        "SCOUT_INDEX_WAIT_BASE_MS",
        &or_default("SCOUT_INDEX_WAIT_BASE_MS", "1000"),
    )?;
    let index_wait_timeout_secs: u64 = parse_as(
        "SCOUT_INDEX_WAIT_TIMEOUT_SECS",
        &or_default("SCOUT_INDEX_WAIT_TIMEOUT_SECS", "20"),
    )?;

    let import_batch_size: usize = parse_as(
        "SCOUT_IMPORT_BATCH_SIZE",
        &or_default("SCOUT_IMPORT_BATCH_SIZE", "100"),
    )?;
    if import_batch_size == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "SCOUT_IMPORT_BATCH_SIZE".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let import_max_errors: usize = parse_as(
        "SCOUT_IMPORT_MAX_ERRORS",
        &or_default("SCOUT_IMPORT_MAX_ERRORS", "10"),
    )?;

    let scoring_policy_path = optional("SCOUT_SCORING_POLICY_PATH").map(PathBuf::from);

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        rye_api_key,
        rye_shopper_ip,
        rye_endpoint,
        remote_timeout_secs,
        remote_max_retries,
        remote_backoff_base_ms,
        index_wait_attempts,
        index_wait_base_ms,
        index_wait_timeout_secs,
        import_batch_size,
        import_max_errors,
        scoring_policy_path,
    })
}

/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
