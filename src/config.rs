use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Upper bound for a single store call before it fails as unavailable.
    pub store_timeout_ms: u64,
    /// Node bits embedded in generated ids.
    pub node_id: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub default_page_limit: u64,
    pub max_page_limit: u64,
    pub max_page: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_limit: 10,
            max_page_limit: 100,
            max_page: 10_000,
        }
    }
}

impl DatabaseConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let query_defaults = QueryConfig::default();
        let config = Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:content_graph.db".to_string()),
                max_connections: env_or("DB_MAX_CONNECTIONS", 8),
                store_timeout_ms: env_or("STORE_TIMEOUT_MS", 2_000),
                node_id: env_or("NODE_ID", 0),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_or("SERVER_PORT", 3000),
            },
            query: QueryConfig {
                default_page_limit: env_or("DEFAULT_PAGE_LIMIT", query_defaults.default_page_limit),
                max_page_limit: env_or("MAX_PAGE_LIMIT", query_defaults.max_page_limit),
                max_page: env_or("MAX_PAGE", query_defaults.max_page),
            },
        };

        if config.query.max_page_limit == 0 || config.query.default_page_limit == 0 {
            anyhow::bail!("page limits must be at least 1");
        }
        if config.database.node_id >= 1024 {
            anyhow::bail!("NODE_ID must be less than 1024");
        }
        Ok(config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
