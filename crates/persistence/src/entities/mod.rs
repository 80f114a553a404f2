//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod ping_record;
pub mod setting;

pub use ping_record::{PingRecordEntity, PingStatusDb, PingTypeDb};
pub use setting::SettingEntity;
