//! Collaborator seams for the reconciliation core.
//!
//! The core never touches the network or workbook cell layouts directly:
//! `FileIndexSource` supplies index enumerations and raw file bytes, and
//! `RecordParser` turns those bytes into typed records.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::jpx::index::{OiIndexEntry, OiYearEntry, VolumeIndexEntry};
use crate::models::{
    DailyFuturesOi, DailyOiBalance, OptionParticipantOi, OptionParticipantVolume, ParticipantOi,
    ParticipantVolume,
};

/// Fetch/cache collaborator: enumerates the published file indexes and
/// retrieves raw file content.
///
/// "File not found" surfaces as `Ok(None)` where the endpoint is per-date
/// (the daily OI balance); other failures surface as `Err` and callers in
/// the core absorb them into empty results.
#[async_trait]
pub trait FileIndexSource: Send + Sync {
    /// Available months (YYYYMM) of daily volume indexes.
    async fn volume_months(&self) -> Result<Vec<String>>;

    /// Daily volume file entries for one month, oldest first.
    async fn volume_index(&self, yyyymm: &str) -> Result<Vec<VolumeIndexEntry>>;

    /// Available years of weekly OI indexes.
    async fn oi_years(&self) -> Result<Vec<OiYearEntry>>;

    /// Weekly OI file entries for one year, oldest first.
    async fn oi_index(&self, year: &str) -> Result<Vec<OiIndexEntry>>;

    /// Raw bytes of a daily volume workbook, by index-relative path.
    async fn fetch_volume_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Raw bytes of a weekly OI workbook, by index-relative path.
    async fn fetch_oi_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Raw bytes of the daily OI balance workbook for one trade date, or
    /// None when the exchange has not published it (holiday, lag, 404).
    async fn fetch_daily_oi_file(&self, date: NaiveDate) -> Result<Option<Vec<u8>>>;
}

/// Spreadsheet parsing collaborator: one binary workbook in, flat typed
/// records out. Cell layout is this trait's problem, not the core's.
pub trait RecordParser: Send + Sync {
    fn parse_volume(&self, content: &[u8]) -> Result<Vec<ParticipantVolume>>;

    fn parse_option_volume(&self, content: &[u8]) -> Result<Vec<OptionParticipantVolume>>;

    fn parse_oi(&self, content: &[u8]) -> Result<Vec<ParticipantOi>>;

    fn parse_option_oi(&self, content: &[u8]) -> Result<Vec<OptionParticipantOi>>;

    fn parse_daily_oi(&self, content: &[u8]) -> Result<Vec<DailyOiBalance>>;

    fn parse_daily_futures_oi(&self, content: &[u8]) -> Result<Vec<DailyFuturesOi>>;
}
