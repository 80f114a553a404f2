//! Domain models for the blog platform.

pub mod ping;
pub mod setting;

pub use ping::{NewPingRecord, PingRecord, PingStatus, PingType};
pub use setting::{
    localize, BatchUpdateOutcome, FailedSetting, Setting, SettingEntry, SettingKind,
    SettingSchema, SettingValue, SettingValueError, SettingsQuery,
};
