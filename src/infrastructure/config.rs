//! Application configuration

use std::env;

use anyhow::{Context, Result};

/// Engine configuration loaded from environment
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Storage backend ("memory" or "sqlite")
    pub storage_backend: String,
    /// SQLite database file path
    pub sqlite_path: String,
    /// SQLite connection pool size
    pub sqlite_max_connections: u32,
}

impl EngineConfig {
    /// Load configuration from environment variables, reading a `.env`
    /// file first when one is present
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            storage_backend: env::var("MENAGERIE_STORAGE_BACKEND")
                .unwrap_or_else(|_| "memory".to_string()),
            sqlite_path: env::var("MENAGERIE_SQLITE_PATH")
                .unwrap_or_else(|_| "data/menagerie.db".to_string()),
            sqlite_max_connections: env::var("MENAGERIE_SQLITE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("MENAGERIE_SQLITE_MAX_CONNECTIONS must be a number")?,
        })
    }

    /// Configuration for an in-memory engine, independent of the environment
    pub fn in_memory() -> Self {
        Self {
            storage_backend: "memory".to_string(),
            sqlite_path: String::new(),
            sqlite_max_connections: 1,
        }
    }
}
