//! Application services used by route handlers and background jobs.

pub mod keep_alive;

pub use keep_alive::{KeepAliveMonitor, KeepAliveStatus};
