//! Process settings read from the environment (after `dotenvy::dotenv()` in the binary).

use crate::error::ConfigError;
use crate::query::PageSettings;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/resource_engine";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown backend '{}' (expected postgres or memory)", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub backend: StoreBackend,
    /// JSON resources file; the built-in weather resource is served when unset.
    pub resources_path: Option<PathBuf>,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub body_limit_bytes: usize,
    pub db_max_connections: u32,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = PageSettings::default();
        let settings = Settings {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            bind_addr: parse_var("BIND_ADDR", get("BIND_ADDR"), DEFAULT_BIND_ADDR.parse().ok())?,
            backend: parse_var("STORE_BACKEND", get("STORE_BACKEND"), Some(StoreBackend::Postgres))?,
            resources_path: get("RESOURCES_PATH").map(PathBuf::from),
            default_page_size: parse_var(
                "DEFAULT_PAGE_SIZE",
                get("DEFAULT_PAGE_SIZE"),
                Some(defaults.default_page_size),
            )?,
            max_page_size: parse_var("MAX_PAGE_SIZE", get("MAX_PAGE_SIZE"), Some(defaults.max_page_size))?,
            body_limit_bytes: parse_var(
                "BODY_LIMIT_BYTES",
                get("BODY_LIMIT_BYTES"),
                Some(DEFAULT_BODY_LIMIT_BYTES),
            )?,
            db_max_connections: parse_var(
                "DB_MAX_CONNECTIONS",
                get("DB_MAX_CONNECTIONS"),
                Some(DEFAULT_DB_MAX_CONNECTIONS),
            )?,
        };
        if settings.default_page_size == 0 || settings.max_page_size == 0 {
            return Err(ConfigError::Env {
                var: "DEFAULT_PAGE_SIZE".into(),
                message: "page sizes must be positive".into(),
            });
        }
        if settings.default_page_size > settings.max_page_size {
            return Err(ConfigError::Env {
                var: "DEFAULT_PAGE_SIZE".into(),
                message: format!("exceeds MAX_PAGE_SIZE ({})", settings.max_page_size),
            });
        }
        Ok(settings)
    }

    pub fn pages(&self) -> PageSettings {
        PageSettings {
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        }
    }
}

fn parse_var<T>(var: &str, raw: Option<String>, default: Option<T>) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Env {
            var: var.to_string(),
            message: e.to_string(),
        }),
        None => default.ok_or_else(|| ConfigError::Env {
            var: var.to_string(),
            message: "not set".into(),
        }),
    }
}
