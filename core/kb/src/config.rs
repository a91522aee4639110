// Path and File Name : /home/diamondeye/rebuild/core/kb/src/config.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Knowledge base connection configuration - explicit value passed into components at construction, with a strict fail-closed environment loader for process entrypoints

use std::path::PathBuf;

use crate::errors::KbError;

/// Connection settings for the knowledge base.
///
/// Components receive this by value at construction; nothing in the core
/// reads connection settings from ambient process state after startup.
#[derive(Debug, Clone)]
pub struct KbConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub pass: String,
    /// Authoritative schema DDL file, applied idempotently at startup when set.
    pub schema_sql_path: Option<PathBuf>,
}

impl KbConfig {
    /// Strict config from environment (FAIL-CLOSED on missing/invalid).
    ///
    /// Intended for job entrypoints only; tests and embedded callers build
    /// the struct directly.
    pub fn from_env_strict() -> Result<Self, KbError> {
        let required = ["DB_HOST", "DB_PORT", "DB_NAME", "DB_USER", "DB_PASS"];
        let mut missing: Vec<&str> = Vec::new();
        for k in required {
            if std::env::var(k).is_err() {
                missing.push(k);
            }
        }
        if !missing.is_empty() {
            return Err(KbError::Connectivity(format!(
                "FAIL-CLOSED: Missing required database environment variables: {}",
                missing.join(", ")
            )));
        }

        let host = std::env::var("DB_HOST")
            .map_err(|e| KbError::Connectivity(format!("DB_HOST read error: {e}")))?;
        let port_str = std::env::var("DB_PORT")
            .map_err(|e| KbError::Connectivity(format!("DB_PORT read error: {e}")))?;
        let port = port_str
            .parse::<u16>()
            .map_err(|e| KbError::Connectivity(format!("Invalid DB_PORT '{port_str}': {e}")))?;
        let name = std::env::var("DB_NAME")
            .map_err(|e| KbError::Connectivity(format!("DB_NAME read error: {e}")))?;
        let user = std::env::var("DB_USER")
            .map_err(|e| KbError::Connectivity(format!("DB_USER read error: {e}")))?;
        let pass = std::env::var("DB_PASS")
            .map_err(|e| KbError::Connectivity(format!("DB_PASS read error: {e}")))?;

        let schema_sql_path = std::env::var("DIAMONDEYE_SCHEMA_SQL_PATH")
            .ok()
            .map(PathBuf::from);

        Ok(Self {
            host,
            port,
            name,
            user,
            pass,
            schema_sql_path,
        })
    }

    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={}",
            self.host, self.port, self.name, self.user, self.pass
        )
    }
}
