//! Background job scheduler and job implementations.

mod keep_alive;
mod pool_metrics;
mod scheduler;

pub use keep_alive::KeepAliveJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
