use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;

use crate::db::{DbClient, Dialect, PgSqlPool};
use crate::error::{Error, Result};

/// Database settings, loadable from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection before failing the call.
    #[serde(default)]
    pub acquire_timeout_secs: Option<u64>,
}

fn default_max_connections() -> u32 {
    10
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/schema_registry".to_string(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: None,
        }
    }
}

impl DbConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Connects the pool and wires up the engine with the Postgres dialect.
    pub async fn connect(&self) -> Result<DbClient<PgSqlPool>> {
        let mut options = PgPoolOptions::new().max_connections(self.max_connections);
        if let Some(secs) = self.acquire_timeout_secs {
            options = options.acquire_timeout(Duration::from_secs(secs));
        }
        let pool = options.connect(&self.url).await?;
        Ok(DbClient::new(PgSqlPool::new(pool), Dialect::default()))
    }
}
