pub mod cache;
pub mod client;
pub mod index;
pub mod traits;

pub use client::JpxClient;
pub use index::{MonthEntry, OiIndexEntry, OiYearEntry, VolumeIndexEntry};
pub use traits::{FileIndexSource, RecordParser};
