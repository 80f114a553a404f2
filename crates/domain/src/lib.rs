//! Domain layer for the blog platform backend.
//!
//! This crate contains:
//! - Domain models (Setting, PingRecord) and the typed setting schema
//! - Store traits implemented by the persistence layer
//! - Business logic services

pub mod models;
pub mod services;
pub mod store;
