//! Analysis session: owns the per-run caches and the date-resolution rules
//! for loading raw records.
//!
//! The central subtlety is the night shift. Day-type session files are filed
//! under the market date they describe. Night-type files for market date D
//! are filed under the NEXT trading date after D, so loading "the volume for
//! D" means reading the day files at D plus the night files at D's successor
//! and re-dating those records back to D before merging.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::calendar::TradingCalendar;
use crate::config::Config;
use crate::error::Result;
use crate::jpx::index::{OiIndexEntry, VolumeIndexEntry};
use crate::jpx::traits::{FileIndexSource, RecordParser};
use crate::merge::{consolidate_oi, merge_volume_records, MergeableVolume};
use crate::models::{
    DailyFuturesOi, DailyOiBalance, OptionParticipantOi, OptionParticipantVolume, ParticipantOi,
    ParticipantVolume, SessionKey, SessionSelector,
};

/// One analysis run's worth of state: fetch/parse collaborators plus caches
/// keyed by file identity. Everything loaded once stays loaded for the
/// session's lifetime; records handed out are copies, caches are never
/// mutated in place.
pub struct AnalysisSession<F, P> {
    source: F,
    parser: P,
    config: Config,
    calendar: RwLock<Option<Arc<TradingCalendar>>>,
    oi_entries: RwLock<Option<Arc<HashMap<NaiveDate, OiIndexEntry>>>>,
    volume_indexes: DashMap<String, Arc<Vec<VolumeIndexEntry>>>,
    volume_files: DashMap<String, Arc<Vec<ParticipantVolume>>>,
    option_volume_files: DashMap<String, Arc<Vec<OptionParticipantVolume>>>,
    oi_files: DashMap<String, Arc<Vec<ParticipantOi>>>,
    option_oi_files: DashMap<String, Arc<Vec<OptionParticipantOi>>>,
    daily_oi: DashMap<NaiveDate, Option<Arc<Vec<DailyOiBalance>>>>,
    daily_futures_oi: DashMap<NaiveDate, Option<Arc<Vec<DailyFuturesOi>>>>,
}

impl<F: FileIndexSource, P: RecordParser> AnalysisSession<F, P> {
    pub fn new(source: F, parser: P, config: Config) -> Self {
        Self {
            source,
            parser,
            config,
            calendar: RwLock::new(None),
            oi_entries: RwLock::new(None),
            volume_indexes: DashMap::new(),
            volume_files: DashMap::new(),
            option_volume_files: DashMap::new(),
            oi_files: DashMap::new(),
            option_oi_files: DashMap::new(),
            daily_oi: DashMap::new(),
            daily_futures_oi: DashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The trading calendar, built on first use and shared thereafter.
    pub async fn calendar(&self) -> Result<Arc<TradingCalendar>> {
        if let Some(cal) = self.calendar.read().await.as_ref() {
            return Ok(Arc::clone(cal));
        }

        let mut slot = self.calendar.write().await;
        // Another task may have filled it while we waited for the lock.
        if let Some(cal) = slot.as_ref() {
            return Ok(Arc::clone(cal));
        }
        let cal = Arc::new(TradingCalendar::load(&self.source).await?);
        *slot = Some(Arc::clone(&cal));
        Ok(cal)
    }

    async fn volume_index_for(&self, yyyymm: &str) -> Result<Arc<Vec<VolumeIndexEntry>>> {
        if let Some(entries) = self.volume_indexes.get(yyyymm) {
            return Ok(Arc::clone(&entries));
        }
        let entries = Arc::new(self.source.volume_index(yyyymm).await?);
        self.volume_indexes
            .insert(yyyymm.to_string(), Arc::clone(&entries));
        Ok(entries)
    }

    /// Index-relative path of the session file filed under `file_date`, or
    /// None when the index has no entry or no file for that key.
    async fn volume_file_path(
        &self,
        file_date: NaiveDate,
        key: SessionKey,
    ) -> Result<Option<String>> {
        let month = file_date.format("%Y%m").to_string();
        let entries = self.volume_index_for(&month).await?;
        Ok(entries
            .iter()
            .find(|e| e.date() == Some(file_date))
            .and_then(|e| e.file_path(key))
            .map(str::to_string))
    }

    /// Raw records of one session file, parsed once and cached by file path.
    /// An absent file is an empty list, not an error.
    async fn load_raw_session<R>(
        &self,
        cache: &DashMap<String, Arc<Vec<R>>>,
        parse: impl Fn(&P, &[u8]) -> Result<Vec<R>>,
        file_date: NaiveDate,
        key: SessionKey,
    ) -> Result<Arc<Vec<R>>> {
        let Some(path) = self.volume_file_path(file_date, key).await? else {
            debug!("No {} file filed under {}", key.as_str(), file_date);
            return Ok(Arc::new(Vec::new()));
        };

        if let Some(records) = cache.get(&path) {
            return Ok(Arc::clone(&records));
        }

        let content = self.source.fetch_volume_file(&path).await?;
        let records = Arc::new(parse(&self.parser, &content)?);
        cache.insert(path, Arc::clone(&records));
        Ok(records)
    }

    /// Volume records for one market date, combining the selected session
    /// files. Day-type keys resolve at `date` itself; night-type keys
    /// resolve at the successor trading date and come back re-dated to
    /// `date`. A session file that fails to load degrades to empty so one
    /// bad file cannot sink the whole date.
    async fn load_for_market_date<R: MergeableVolume>(
        &self,
        cache: &DashMap<String, Arc<Vec<R>>>,
        parse: impl Fn(&P, &[u8]) -> Result<Vec<R>> + Copy,
        date: NaiveDate,
        selector: &SessionSelector,
    ) -> Result<Vec<R>> {
        let mut lists: Vec<Vec<R>> = Vec::new();

        for key in selector.day_keys() {
            match self.load_raw_session(cache, parse, date, key).await {
                Ok(records) => lists.push(records.as_ref().clone()),
                Err(e) => warn!("Failed to load {} for {}: {}", key.as_str(), date, e),
            }
        }

        let night_keys = selector.night_keys();
        if !night_keys.is_empty() {
            let calendar = self.calendar().await?;
            match calendar.next_trading_date(date) {
                Some(file_date) => {
                    for key in night_keys {
                        match self.load_raw_session(cache, parse, file_date, key).await {
                            Ok(records) => lists.push(
                                records.iter().map(|r| r.with_trade_date(date)).collect(),
                            ),
                            Err(e) => {
                                warn!("Failed to load {} for {}: {}", key.as_str(), date, e)
                            }
                        }
                    }
                }
                // Night files for the most recent date are not filed yet.
                None => debug!("No successor trading date for {}; skipping night files", date),
            }
        }

        Ok(merge_volume_records(lists))
    }

    /// Futures participant volume for one market date.
    pub async fn load_volume(
        &self,
        date: NaiveDate,
        selector: &SessionSelector,
    ) -> Result<Vec<ParticipantVolume>> {
        self.load_for_market_date(&self.volume_files, P::parse_volume, date, selector)
            .await
    }

    /// Option participant volume for one market date.
    pub async fn load_option_volume(
        &self,
        date: NaiveDate,
        selector: &SessionSelector,
    ) -> Result<Vec<OptionParticipantVolume>> {
        self.load_for_market_date(
            &self.option_volume_files,
            P::parse_option_volume,
            date,
            selector,
        )
        .await
    }

    /// The weekly OI index entry for `report_date`, from all published years.
    async fn oi_entry(&self, report_date: NaiveDate) -> Result<Option<OiIndexEntry>> {
        if let Some(entries) = self.oi_entries.read().await.as_ref() {
            return Ok(entries.get(&report_date).cloned());
        }

        let mut slot = self.oi_entries.write().await;
        if let Some(entries) = slot.as_ref() {
            return Ok(entries.get(&report_date).cloned());
        }

        let mut by_date = HashMap::new();
        for year in self.source.oi_years().await? {
            match self.source.oi_index(&year.year).await {
                Ok(entries) => {
                    for entry in entries {
                        if let Some(date) = entry.date() {
                            by_date.insert(date, entry);
                        }
                    }
                }
                Err(e) => warn!("Skipping OI index for {}: {}", year.year, e),
            }
        }

        let entries = Arc::new(by_date);
        *slot = Some(Arc::clone(&entries));
        Ok(entries.get(&report_date).cloned())
    }

    async fn load_oi_file<R>(
        &self,
        cache: &DashMap<String, Arc<Vec<R>>>,
        parse: impl Fn(&P, &[u8]) -> Result<Vec<R>>,
        path: &str,
    ) -> Result<Arc<Vec<R>>> {
        if let Some(records) = cache.get(path) {
            return Ok(Arc::clone(&records));
        }
        let content = self.source.fetch_oi_file(path).await?;
        let records = Arc::new(parse(&self.parser, &content)?);
        cache.insert(path.to_string(), Arc::clone(&records));
        Ok(records)
    }

    /// Consolidated futures OI positions for one weekly report date. A date
    /// with no published snapshot is an empty list.
    pub async fn load_oi(&self, report_date: NaiveDate) -> Result<Vec<ParticipantOi>> {
        let Some(entry) = self.oi_entry(report_date).await? else {
            debug!("No weekly OI snapshot for {}", report_date);
            return Ok(Vec::new());
        };
        let Some(path) = entry.index_futures.as_deref().filter(|p| !p.is_empty()) else {
            debug!("No futures OI file for {}", report_date);
            return Ok(Vec::new());
        };

        let records = self
            .load_oi_file(&self.oi_files, P::parse_oi, path)
            .await?;
        Ok(consolidate_oi(records.as_ref().clone()))
    }

    /// Consolidated option OI positions for one weekly report date.
    pub async fn load_option_oi(
        &self,
        report_date: NaiveDate,
    ) -> Result<Vec<OptionParticipantOi>> {
        let Some(entry) = self.oi_entry(report_date).await? else {
            debug!("No weekly OI snapshot for {}", report_date);
            return Ok(Vec::new());
        };
        let Some(path) = entry.index_options.as_deref().filter(|p| !p.is_empty()) else {
            debug!("No option OI file for {}", report_date);
            return Ok(Vec::new());
        };

        let records = self
            .load_oi_file(&self.option_oi_files, P::parse_option_oi, path)
            .await?;
        Ok(consolidate_oi(records.as_ref().clone()))
    }

    /// Aggregate per-strike daily OI balances for one trade date. `None`
    /// means the exchange never published the workbook (holiday,
    /// publication lag); callers that reconstruct missing days key off that
    /// distinction, so "unpublished" is not flattened into an empty list.
    pub async fn load_daily_oi(
        &self,
        date: NaiveDate,
    ) -> Result<Option<Arc<Vec<DailyOiBalance>>>> {
        if let Some(records) = self.daily_oi.get(&date) {
            return Ok(records.value().clone());
        }

        let records = match self.source.fetch_daily_oi_file(date).await? {
            Some(content) => Some(Arc::new(self.parser.parse_daily_oi(&content)?)),
            None => None,
        };
        self.daily_oi.insert(date, records.clone());
        Ok(records)
    }

    /// Aggregate per-product daily futures OI balances for one trade date,
    /// from the same daily balance workbook. `None` when unpublished.
    pub async fn load_daily_futures_oi(
        &self,
        date: NaiveDate,
    ) -> Result<Option<Arc<Vec<DailyFuturesOi>>>> {
        if let Some(records) = self.daily_futures_oi.get(&date) {
            return Ok(records.value().clone());
        }

        let records = match self.source.fetch_daily_oi_file(date).await? {
            Some(content) => Some(Arc::new(self.parser.parse_daily_futures_oi(&content)?)),
            None => None,
        };
        self.daily_futures_oi.insert(date, records.clone());
        Ok(records)
    }
}
