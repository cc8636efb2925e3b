use crate::app_config::{AppConfig, Environment};
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

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real process environment so tests can drive it with a
/// plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be at least 1".to_string()));
        }
        Ok(value)
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let database_url = require("DATABASE_URL")?;
    let shopify_store_domain = require("SHOPIFY_STORE_DOMAIN")?;
    let shopify_access_token = require("SHOPIFY_ACCESS_TOKEN")?;
    let shopify_api_version = or_default("SHOPIFY_API_VERSION", "2024-10");

    let env = parse_environment(&or_default("PRICEDROP_ENV", "development"))?;
    let bind_addr = parse_addr("PRICEDROP_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("PRICEDROP_LOG_LEVEL", "info");
    let cron_secret = optional("PRICEDROP_CRON_SECRET");

    let db_max_connections = parse_u32("PRICEDROP_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PRICEDROP_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PRICEDROP_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    if db_min_connections > db_max_connections {
        return Err(invalid(
            "PRICEDROP_DB_MIN_CONNECTIONS",
            format!("{db_min_connections} exceeds PRICEDROP_DB_MAX_CONNECTIONS ({db_max_connections})"),
        ));
    }

    let shopify_timeout_secs = parse_u64("PRICEDROP_SHOPIFY_TIMEOUT_SECS", "30")?;

    let tick_batch_size = i64::try_from(parse_positive("PRICEDROP_TICK_BATCH_SIZE", "20")?)
        .map_err(|e| invalid("PRICEDROP_TICK_BATCH_SIZE", e.to_string()))?;
    let tick_concurrency = parse_positive("PRICEDROP_TICK_CONCURRENCY", "5")?;
    let tick_lock = parse_bool("PRICEDROP_TICK_LOCK", "true")?;
    let tick_cron = optional("PRICEDROP_TICK_CRON");

    // The tick lease pins one pooled connection for the whole tick.
    if tick_lock && db_max_connections < 2 {
        return Err(invalid(
            "PRICEDROP_DB_MAX_CONNECTIONS",
            "must be at least 2 when PRICEDROP_TICK_LOCK is enabled".to_string(),
        ));
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        cron_secret,
        shopify_store_domain,
        shopify_access_token,
        shopify_api_version,
        shopify_timeout_secs,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        tick_batch_size,
        tick_concurrency,
        tick_lock,
        tick_cron,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PRICEDROP_ENV".to_string(),
            reason: format!("expected development, test, or production, got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
