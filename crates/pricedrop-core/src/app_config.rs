use std::net::SocketAddr;

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

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Shared secret guarding `/cron` and `/end-all`. May only be absent in development.
    pub cron_secret: Option<String>,
    /// Shop domain, e.g. `example.myshopify.com`.
    pub shopify_store_domain: String,
    pub shopify_access_token: String,
    pub shopify_api_version: String,
    pub shopify_timeout_secs: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Maximum jobs handled per pass in one tick.
    pub tick_batch_size: i64,
    /// Maximum jobs in flight at once within a pass.
    pub tick_concurrency: usize,
    /// Fence overlapping ticks with a Postgres advisory lock.
    pub tick_lock: bool,
    /// Six-field cron expression for the in-process tick; `None` leaves
    /// ticking to an external trigger hitting `/cron`.
    pub tick_cron: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "[redacted]"))
            .field("shopify_store_domain", &self.shopify_store_domain)
            .field("shopify_access_token", &"[redacted]")
            .field("shopify_api_version", &self.shopify_api_version)
            .field("shopify_timeout_secs", &self.shopify_timeout_secs)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("tick_batch_size", &self.tick_batch_size)
            .field("tick_concurrency", &self.tick_concurrency)
            .field("tick_lock", &self.tick_lock)
            .field("tick_cron", &self.tick_cron)
            .finish()
    }
}
