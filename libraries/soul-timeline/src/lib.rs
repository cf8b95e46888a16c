//! Soul Timeline - playlist timeline model
//!
//! Provides the read-only structures the playback layer reasons about:
//! - [`Timeline`] with its [`Window`]s and [`Period`]s
//! - Stable [`Uid`] identity for windows and periods
//! - [`PeriodId`] describing the period or ad being played
//! - [`ShuffleOrder`] over playlist entries

mod error;
mod period_id;
mod shuffle;
mod timeline;
pub mod types;
mod uid;

pub use error::{Result, TimelineError};
pub use period_id::PeriodId;
pub use shuffle::ShuffleOrder;
pub use timeline::{resolve_subsequent_period, AdGroup, Period, Timeline, Window};
pub use types::{MediaItem, MediaMetadata, RepeatMode};
pub use uid::Uid;

/// Convert microseconds to milliseconds, truncating toward zero
pub fn us_to_ms(time_us: i64) -> i64 {
    time_us / 1000
}

/// Convert milliseconds to microseconds, saturating at the `i64` range
pub fn ms_to_us(time_ms: i64) -> i64 {
    time_ms.saturating_mul(1000)
}
