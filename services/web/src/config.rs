//! Runtime configuration read from the environment
//!
//! Every setting is an environment variable (a `.env` file is honoured in
//! development). Only `DB_DSN` is required.

use anyhow::{Context, Result, bail};
use common::database::DatabaseConfig;
use config::{Config, Environment};
use serde::Deserialize;
use std::{
    net::{SocketAddr, ToSocketAddrs},
    path::{Path, PathBuf},
    time::Duration,
};

fn default_addr() -> String {
    ":4000".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("./ui/static")
}

fn default_session_lifetime_hours() -> u64 {
    12
}

/// Web service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Listen address; a bare ":port" binds every interface
    #[serde(default = "default_addr")]
    pub addr: String,
    /// PostgreSQL connection string
    pub db_dsn: String,
    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,
    /// Directory served under /static/
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// Verbose logging with source locations
    #[serde(default)]
    pub debug: bool,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
    /// Sessions live in Redis when set, in process memory otherwise
    pub redis_url: Option<String>,
    #[serde(default = "default_session_lifetime_hours")]
    pub session_lifetime_hours: u64,
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_source(Environment::default())
    }

    fn from_source(source: Environment) -> Result<Self> {
        let config: AppConfig = Config::builder()
            .add_source(source.try_parsing(true))
            .build()?
            .try_deserialize()
            .context("invalid configuration (is DB_DSN set?)")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.tls_cert_path.is_some() != self.tls_key_path.is_some() {
            bail!("TLS_CERT_PATH and TLS_KEY_PATH must be set together");
        }
        if self.session_lifetime_hours == 0 {
            bail!("SESSION_LIFETIME_HOURS must be greater than zero");
        }
        if self.db_max_connections == 0 {
            bail!("DB_MAX_CONNECTIONS must be greater than zero");
        }
        Ok(())
    }

    /// Resolve `addr` into a socket address
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let addr = if self.addr.starts_with(':') {
            format!("0.0.0.0{}", self.addr)
        } else {
            self.addr.clone()
        };
        addr.to_socket_addrs()
            .with_context(|| format!("invalid listen address {:?}", self.addr))?
            .next()
            .with_context(|| format!("listen address {:?} did not resolve", self.addr))
    }

    /// Certificate and key paths when TLS is enabled
    pub fn tls(&self) -> Option<(&Path, &Path)> {
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }

    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            database_url: self.db_dsn.clone(),
            max_connections: self.db_max_connections,
        }
    }

    pub fn session_lifetime(&self) -> Duration {
        Duration::from_secs(self.session_lifetime_hours * 60 * 60)
    }
}
