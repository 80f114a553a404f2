//! Repository implementations for database operations.

pub mod ping_record;
pub mod setting;

pub use ping_record::PgPingRepository;
pub use setting::PgSettingRepository;
