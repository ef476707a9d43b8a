use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide settings, read once at startup.
///
/// Rye credentials are optional here so that catalog-only commands run
/// without them; constructing a marketplace client enforces their presence.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub rye_api_key: Option<String>,
    pub rye_shopper_ip: Option<String>,
    pub rye_endpoint: String,
    pub remote_timeout_secs: u64,
    pub remote_max_retries: u32,
    pub remote_backoff_base_ms: u64,
    pub index_wait_attempts: u32,
    pub index_wait_base_ms: u64,
    pub index_wait_timeout_secs: u64,
    pub import_batch_size: usize,
    pub import_max_errors: usize,
    pub scoring_policy_path: Option<PathBuf>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "rye_api_key",
                &self.rye_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("rye_shopper_ip", &self.rye_shopper_ip)
            .field("rye_endpoint", &self.rye_endpoint)
            .field("remote_timeout_secs", &self.remote_timeout_secs)
            .field("remote_max_retries", &self.remote_max_retries)
            .field("remote_backoff_base_ms", &self.remote_backoff_base_ms)
            .field("index_wait_attempts", &self.index_wait_attempts)
            .field("index_wait_base_ms", &self.index_wait_base_ms)
            .field("index_wait_timeout_secs", &self.index_wait_timeout_secs)
            .field("import_batch_size", &self.import_batch_size)
            .field("import_max_errors", &self.import_max_errors)
            .field("scoring_policy_path", &self.scoring_policy_path)
            .finish()
    }
}
