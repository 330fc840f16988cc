//! Infrastructure layer - External adapters and implementations
//!
//! This layer contains:
//! - Persistence: In-memory and SQLite storage backends
//! - Config: Engine configuration from the environment
//! - State: Shared engine state wiring storage into the services

pub mod config;
pub mod persistence;
pub mod state;
