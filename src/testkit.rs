//! In-memory fixtures for exercising the reconciliation core without a
//! network or workbook parser.
//!
//! `FixtureSource` plays the exchange: a registry of index entries and file
//! bytes. `FixtureParser` reads those bytes as JSON instead of spreadsheet
//! cells. Together they drive an `AnalysisSession` end to end in tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::jpx::index::{OiIndexEntry, OiYearEntry, VolumeIndexEntry};
use crate::jpx::traits::{FileIndexSource, RecordParser};
use crate::models::{
    DailyFuturesOi, DailyOiBalance, OptionParticipantOi, OptionParticipantVolume, OptionType,
    ParticipantOi, ParticipantVolume, SessionKey,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct VolumeFixture {
    #[serde(default)]
    futures: Vec<ParticipantVolume>,
    #[serde(default)]
    options: Vec<OptionParticipantVolume>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DailyOiFixture {
    #[serde(default)]
    options: Vec<DailyOiBalance>,
    #[serde(default)]
    futures: Vec<DailyFuturesOi>,
}

/// Scriptable stand-in for the exchange endpoints.
#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    volume_entries: BTreeMap<NaiveDate, VolumeIndexEntry>,
    oi_entries: BTreeMap<NaiveDate, OiIndexEntry>,
    files: HashMap<String, Vec<u8>>,
    daily_oi_files: HashMap<NaiveDate, Vec<u8>>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trading date with no session files, i.e. a day the index
    /// lists but whose files carry nothing of interest.
    pub fn add_trading_day(&mut self, date: NaiveDate) -> &mut Self {
        self.volume_entry(date);
        self
    }

    /// Register one session file for a date, holding futures and/or option
    /// volume records.
    pub fn add_volume_file(
        &mut self,
        date: NaiveDate,
        key: SessionKey,
        futures: Vec<ParticipantVolume>,
        options: Vec<OptionParticipantVolume>,
    ) -> &mut Self {
        let path = format!("/vol/{}_{}.json", date.format("%Y%m%d"), key.as_str());
        let fixture = VolumeFixture { futures, options };
        self.files
            .insert(path.clone(), serde_json::to_vec(&fixture).unwrap());

        let entry = self.volume_entry(date);
        match key {
            SessionKey::WholeDay => entry.whole_day = Some(path),
            SessionKey::WholeDayJNet => entry.whole_day_jnet = Some(path),
            SessionKey::Night => entry.night = Some(path),
            SessionKey::NightJNet => entry.night_jnet = Some(path),
        }
        self
    }

    /// Register the weekly futures OI snapshot for a report date.
    pub fn add_oi_file(&mut self, date: NaiveDate, records: Vec<ParticipantOi>) -> &mut Self {
        let path = format!("/oi/{}_futures.json", date.format("%Y%m%d"));
        self.files
            .insert(path.clone(), serde_json::to_vec(&records).unwrap());
        self.oi_entry(date).index_futures = Some(path);
        self
    }

    /// Register the weekly option OI snapshot for a report date.
    pub fn add_option_oi_file(
        &mut self,
        date: NaiveDate,
        records: Vec<OptionParticipantOi>,
    ) -> &mut Self {
        let path = format!("/oi/{}_options.json", date.format("%Y%m%d"));
        self.files
            .insert(path.clone(), serde_json::to_vec(&records).unwrap());
        self.oi_entry(date).index_options = Some(path);
        self
    }

    /// Register an OI report date with no snapshot files, so the calendar
    /// sees the week boundary but loads come back empty.
    pub fn add_oi_date(&mut self, date: NaiveDate) -> &mut Self {
        self.oi_entry(date);
        self
    }

    /// Register the daily OI balance workbook for a trade date.
    pub fn add_daily_oi(
        &mut self,
        date: NaiveDate,
        options: Vec<DailyOiBalance>,
        futures: Vec<DailyFuturesOi>,
    ) -> &mut Self {
        let fixture = DailyOiFixture { options, futures };
        self.daily_oi_files
            .insert(date, serde_json::to_vec(&fixture).unwrap());
        self
    }

    fn volume_entry(&mut self, date: NaiveDate) -> &mut VolumeIndexEntry {
        self.volume_entries
            .entry(date)
            .or_insert_with(|| VolumeIndexEntry {
                trade_date: date.format("%Y%m%d").to_string(),
                ..Default::default()
            })
    }

    fn oi_entry(&mut self, date: NaiveDate) -> &mut OiIndexEntry {
        self.oi_entries.entry(date).or_insert_with(|| OiIndexEntry {
            trade_date: date.format("%Y%m%d").to_string(),
            ..Default::default()
        })
    }
}

#[async_trait]
impl FileIndexSource for FixtureSource {
    async fn volume_months(&self) -> Result<Vec<String>> {
        let mut months: Vec<String> = self
            .volume_entries
            .keys()
            .map(|d| d.format("%Y%m").to_string())
            .collect();
        months.dedup();
        Ok(months)
    }

    async fn volume_index(&self, yyyymm: &str) -> Result<Vec<VolumeIndexEntry>> {
        Ok(self
            .volume_entries
            .iter()
            .filter(|(d, _)| d.format("%Y%m").to_string() == yyyymm)
            .map(|(_, e)| e.clone())
            .collect())
    }

    async fn oi_years(&self) -> Result<Vec<OiYearEntry>> {
        let mut years: Vec<String> = self
            .oi_entries
            .keys()
            .map(|d| d.format("%Y").to_string())
            .collect();
        years.dedup();
        Ok(years
            .into_iter()
            .map(|year| OiYearEntry {
                json_file: format!("/oi/index_{}.json", year),
                year,
            })
            .collect())
    }

    async fn oi_index(&self, year: &str) -> Result<Vec<OiIndexEntry>> {
        Ok(self
            .oi_entries
            .iter()
            .filter(|(d, _)| d.format("%Y").to_string() == year)
            .map(|(_, e)| e.clone())
            .collect())
    }

    async fn fetch_volume_file(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("No fixture file at {}", path)))
    }

    async fn fetch_oi_file(&self, path: &str) -> Result<Vec<u8>> {
        self.fetch_volume_file(path).await
    }

    async fn fetch_daily_oi_file(&self, date: NaiveDate) -> Result<Option<Vec<u8>>> {
        Ok(self.daily_oi_files.get(&date).cloned())
    }
}

/// JSON-deserializing stand-in for the spreadsheet parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureParser;

impl RecordParser for FixtureParser {
    fn parse_volume(&self, content: &[u8]) -> Result<Vec<ParticipantVolume>> {
        let fixture: VolumeFixture = serde_json::from_slice(content)?;
        Ok(fixture.futures)
    }

    fn parse_option_volume(&self, content: &[u8]) -> Result<Vec<OptionParticipantVolume>> {
        let fixture: VolumeFixture = serde_json::from_slice(content)?;
        Ok(fixture.options)
    }

    fn parse_oi(&self, content: &[u8]) -> Result<Vec<ParticipantOi>> {
        Ok(serde_json::from_slice(content)?)
    }

    fn parse_option_oi(&self, content: &[u8]) -> Result<Vec<OptionParticipantOi>> {
        Ok(serde_json::from_slice(content)?)
    }

    fn parse_daily_oi(&self, content: &[u8]) -> Result<Vec<DailyOiBalance>> {
        let fixture: DailyOiFixture = serde_json::from_slice(content)?;
        Ok(fixture.options)
    }

    fn parse_daily_futures_oi(&self, content: &[u8]) -> Result<Vec<DailyFuturesOi>> {
        let fixture: DailyOiFixture = serde_json::from_slice(content)?;
        Ok(fixture.futures)
    }
}

/// A futures volume record with day-session volume only.
pub fn participant_volume(
    trade_date: NaiveDate,
    product: &str,
    contract_month: &str,
    participant_id: &str,
    volume: f64,
) -> ParticipantVolume {
    ParticipantVolume {
        trade_date,
        product: product.to_string(),
        contract_month: contract_month.to_string(),
        participant_id: participant_id.to_string(),
        participant_name_en: String::new(),
        participant_name_jp: String::new(),
        rank: 0,
        volume,
        volume_day: volume,
        volume_night: 0.0,
    }
}

pub fn participant_oi(
    report_date: NaiveDate,
    product: &str,
    contract_month: &str,
    participant_id: &str,
    long_volume: Option<f64>,
    short_volume: Option<f64>,
) -> ParticipantOi {
    ParticipantOi {
        report_date,
        product: product.to_string(),
        contract_month: contract_month.to_string(),
        participant_id: participant_id.to_string(),
        participant_name_jp: String::new(),
        long_volume,
        short_volume,
    }
}

pub fn option_volume(
    trade_date: NaiveDate,
    option_type: OptionType,
    strike_price: i64,
    contract_month: &str,
    participant_id: &str,
    volume: f64,
) -> OptionParticipantVolume {
    OptionParticipantVolume {
        trade_date,
        option_type,
        strike_price,
        contract_month: contract_month.to_string(),
        participant_id: participant_id.to_string(),
        participant_name_en: String::new(),
        participant_name_jp: String::new(),
        rank: 0,
        volume,
        volume_day: volume,
        volume_night: 0.0,
    }
}

pub fn option_oi(
    report_date: NaiveDate,
    option_type: OptionType,
    strike_price: i64,
    contract_month: &str,
    participant_id: &str,
    long_volume: Option<f64>,
    short_volume: Option<f64>,
) -> OptionParticipantOi {
    OptionParticipantOi {
        report_date,
        option_type,
        strike_price,
        contract_month: contract_month.to_string(),
        participant_id: participant_id.to_string(),
        participant_name_jp: String::new(),
        long_volume,
        short_volume,
    }
}

pub fn daily_futures_oi(
    report_date: NaiveDate,
    product: &str,
    current_oi: i64,
    net_change: i64,
) -> DailyFuturesOi {
    DailyFuturesOi {
        report_date,
        product: product.to_string(),
        current_oi,
        net_change,
        previous_oi: current_oi - net_change,
    }
}

pub fn daily_oi_balance(
    report_date: NaiveDate,
    contract_month: &str,
    option_type: OptionType,
    strike_price: i64,
    current_oi: i64,
    net_change: i64,
    trading_volume: i64,
) -> DailyOiBalance {
    DailyOiBalance {
        report_date,
        contract_month: contract_month.to_string(),
        option_type,
        strike_price,
        trading_volume,
        current_oi,
        net_change,
        previous_oi: current_oi - net_change,
    }
}
