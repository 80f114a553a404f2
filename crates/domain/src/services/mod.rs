//! Domain services for the blog platform.
//!
//! Services contain business logic that operates on domain models.

pub mod settings;

pub use settings::{FieldViolation, SettingsError, SettingsService};
