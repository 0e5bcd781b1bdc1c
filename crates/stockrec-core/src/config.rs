use crate::app_config::{AppConfig, Environment, FulfillmentCredentials, MarketplaceCredentials};
use crate::ConfigError;

const DEFAULT_MARKETPLACE_BASE_URL: &str = "https://api.mercadolibre.com";
const DEFAULT_FULFILLMENT_BASE_URL: &str = "https://sellingpartnerapi-na.amazon.com";
const DEFAULT_FULFILLMENT_AUTH_URL: &str = "https://api.amazon.com/auth/o2/token";
const DEFAULT_FULFILLMENT_MARKETPLACE_ID: &str = "A2Q3Y263D00KWC";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is invalid or a credential group is
/// only partially set.
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
/// Returns `ConfigError` if a value is invalid or a credential group is
/// only partially set.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let database_url = lookup("DATABASE_URL")
        .ok()
        .filter(|v| !v.trim().is_empty());
    let env = parse_environment(&or_default("STOCKREC_ENV", "development"))?;
    let log_level = or_default("STOCKREC_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("STOCKREC_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("STOCKREC_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("STOCKREC_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let user_agent = or_default(
        "STOCKREC_USER_AGENT",
        "stockrec/0.1 (inventory-reconciliation)",
    );
    let warehouse_location = or_default("STOCKREC_WAREHOUSE_LOCATION", "Own Warehouse");

    let shipment_concurrency = parse_usize("MARKETPLACE_SHIPMENT_CONCURRENCY", "16")?;
    if shipment_concurrency == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "MARKETPLACE_SHIPMENT_CONCURRENCY".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let marketplace = match credential_group(&lookup, &MARKETPLACE_GROUP)? {
        Some([client_id, client_secret, seller_id]) => Some(MarketplaceCredentials {
            client_id,
            client_secret,
            seller_id,
            base_url: or_default("MARKETPLACE_BASE_URL", DEFAULT_MARKETPLACE_BASE_URL),
            timeout_secs: parse_u64("MARKETPLACE_TIMEOUT_SECS", "60")?,
            shipment_timeout_secs: parse_u64("MARKETPLACE_SHIPMENT_TIMEOUT_SECS", "15")?,
            shipment_concurrency,
            shipment_cache_ttl_secs: parse_u64("MARKETPLACE_SHIPMENT_CACHE_TTL_SECS", "900")?,
            max_rate_limit_wait_secs: parse_u64("MARKETPLACE_MAX_RATE_LIMIT_WAIT_SECS", "60")?,
        }),
        None => None,
    };

    let fulfillment = build_fulfillment(&lookup, parse_u64("FULFILLMENT_TIMEOUT_SECS", "15")?)?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        user_agent,
        warehouse_location,
        marketplace,
        fulfillment,
    })
}

const MARKETPLACE_GROUP: [&str; 3] = [
    "MARKETPLACE_CLIENT_ID",
    "MARKETPLACE_CLIENT_SECRET",
    "MARKETPLACE_SELLER_ID",
];

const FULFILLMENT_GROUP: [&str; 3] = [
    "FULFILLMENT_CLIENT_ID",
    "FULFILLMENT_CLIENT_SECRET",
    "FULFILLMENT_REFRESH_TOKEN",
];

/// Reads a credential group that is all-or-nothing: none set disables the
/// integration, a partial set is a configuration mistake. Blank values
/// count as unset.
fn credential_group<F, const N: usize>(
    lookup: &F,
    group: &[&str; N],
) -> Result<Option<[String; N]>, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let values: [Option<String>; N] =
        (*group).map(|var| lookup(var).ok().filter(|v| !v.trim().is_empty()));

    if values.iter().all(Option::is_none) {
        return Ok(None);
    }
    if let Some(idx) = values.iter().position(Option::is_none) {
        return Err(ConfigError::MissingEnvVar(group[idx].to_string()));
    }

    Ok(Some(values.map(Option::unwrap_or_default)))
}

fn build_fulfillment<F>(
    lookup: &F,
    timeout_secs: u64,
) -> Result<Option<FulfillmentCredentials>, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let Some([client_id, client_secret, refresh_token]) =
        credential_group(lookup, &FULFILLMENT_GROUP)?
    else {
        return Ok(None);
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    Ok(Some(FulfillmentCredentials {
        client_id,
        client_secret,
        refresh_token,
        marketplace_id: or_default(
            "FULFILLMENT_MARKETPLACE_ID",
            DEFAULT_FULFILLMENT_MARKETPLACE_ID,
        ),
        base_url: or_default("FULFILLMENT_BASE_URL", DEFAULT_FULFILLMENT_BASE_URL),
        auth_url: or_default("FULFILLMENT_AUTH_URL", DEFAULT_FULFILLMENT_AUTH_URL),
        timeout_secs,
    }))
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "STOCKREC_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
