//! Shared utilities and common types for the blog platform backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Offset pagination helpers and the list response envelope
//! - Token generation and hashing
//! - Common validation logic

pub mod crypto;
pub mod pagination;
pub mod validation;
