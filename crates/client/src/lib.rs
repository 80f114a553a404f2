//! Client-side settings façade.
//!
//! [`SettingsContext`] fetches every setting once per session and serves typed
//! reads from memory. Writes go through [`SettingsContext::batch_update`],
//! which persists and then refetches the whole set.

mod context;
mod error;
mod flatten;
mod source;

pub use context::{SettingSubscription, SettingsContext, SettingsMap};
pub use error::ClientError;
pub use flatten::{flatten_settings, unflatten_settings};
pub use source::{HttpSettingsSource, SettingsSource};
