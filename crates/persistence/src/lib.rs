//! Persistence layer for the blog platform backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - PostgreSQL and in-memory implementations of the domain store traits

pub mod db;
pub mod entities;
pub mod memory;
pub mod metrics;
pub mod repositories;

pub use memory::{MemoryPingLogStore, MemorySettingStore};
pub use repositories::{PgPingRepository, PgSettingRepository};
