use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

const DEV_JWT_SECRET: &str = "photo-sharing-dev-secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub security: SecurityConfig,
    pub images: ImageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Node id embedded in generated object ids, below 1024.
    pub node_id: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    pub dir: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.to_string()
        });

        let config = Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:data/photo_sharing.db".to_string()),
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 5),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("SERVER_PORT", 8081),
                node_id: parse_var("NODE_ID", 0),
            },
            cache: CacheConfig {
                capacity: parse_var("CACHE_CAPACITY", 1000),
            },
            security: SecurityConfig {
                jwt_secret,
                token_ttl_secs: parse_var("TOKEN_TTL_SECS", 24 * 3600),
            },
            images: ImageConfig {
                dir: env::var("IMAGES_DIR").unwrap_or_else(|_| "public/images".to_string()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Configuration backed by an in-memory database, for tests and tooling.
    pub fn in_memory(images_dir: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                node_id: 1,
            },
            cache: CacheConfig { capacity: 128 },
            security: SecurityConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                token_ttl_secs: 3600,
            },
            images: ImageConfig {
                dir: images_dir.into(),
            },
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.node_id >= 1024 {
            anyhow::bail!("NODE_ID must be less than 1024, got {}", self.server.node_id);
        }
        if self.cache.capacity == 0 {
            anyhow::bail!("CACHE_CAPACITY must be greater than zero");
        }
        if self.security.jwt_secret.is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_var<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?} ({e}), using default: {default}");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_config_is_valid() {
        let config = Config::in_memory("/tmp/images");
        assert!(config.validate().is_ok());
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.server_address(), "127.0.0.1:0");
    }

    #[test]
    fn test_rejects_out_of_range_node_id() {
        let mut config = Config::in_memory("/tmp/images");
        config.server.node_id = 2048;
        assert!(config.validate().is_err());
    }
}
