use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Credentials and tuning for the marketplace (orders, items, shipments) API.
#[derive(Clone)]
pub struct MarketplaceCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub seller_id: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub shipment_timeout_secs: u64,
    pub shipment_concurrency: usize,
    pub shipment_cache_ttl_secs: u64,
    pub max_rate_limit_wait_secs: u64,
}

impl std::fmt::Debug for MarketplaceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketplaceCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("seller_id", &self.seller_id)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("shipment_timeout_secs", &self.shipment_timeout_secs)
            .field("shipment_concurrency", &self.shipment_concurrency)
            .field("shipment_cache_ttl_secs", &self.shipment_cache_ttl_secs)
            .field("max_rate_limit_wait_secs", &self.max_rate_limit_wait_secs)
            .finish()
    }
}

/// Credentials for the fulfillment inventory API. Optional as a group: the
/// unified stock report simply omits the FBA feed when these are absent.
#[derive(Clone)]
pub struct FulfillmentCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub marketplace_id: String,
    pub base_url: String,
    pub auth_url: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for FulfillmentCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FulfillmentCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("marketplace_id", &self.marketplace_id)
            .field("base_url", &self.base_url)
            .field("auth_url", &self.auth_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Settings for one run. The database and the marketplace are optional;
/// handlers ask for what they need through the `require_*` accessors.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub user_agent: String,
    pub warehouse_location: String,
    pub marketplace: Option<MarketplaceCredentials>,
    pub fulfillment: Option<FulfillmentCredentials>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("warehouse_location", &self.warehouse_location)
            .field("marketplace", &self.marketplace)
            .field("fulfillment", &self.fulfillment)
            .finish()
    }
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `DATABASE_URL` is unset.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when the marketplace
    /// credentials are not configured.
    pub fn require_marketplace(&self) -> Result<&MarketplaceCredentials, ConfigError> {
        self.marketplace
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("MARKETPLACE_CLIENT_ID".to_string()))
    }
}
