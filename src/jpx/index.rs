//! Serde models for the JPX JSON index endpoints.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::models::SessionKey;

/// Common wrapper: every index endpoint nests its rows under `TableDatas`.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexTable<T> {
    #[serde(rename = "TableDatas", default = "Vec::new")]
    pub rows: Vec<T>,
}

/// One row of the monthly list of volume indexes.
#[derive(Debug, Clone, Deserialize)]
pub struct MonthEntry {
    /// YYYYMM.
    #[serde(rename = "Month")]
    pub month: String,
}

/// One row of a per-month daily volume index: the file paths published for
/// one JPX trade date, one per session key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumeIndexEntry {
    /// YYYYMMDD.
    #[serde(rename = "TradeDate")]
    pub trade_date: String,
    #[serde(rename = "WholeDay")]
    pub whole_day: Option<String>,
    #[serde(rename = "WholeDayJNet")]
    pub whole_day_jnet: Option<String>,
    #[serde(rename = "Night")]
    pub night: Option<String>,
    #[serde(rename = "NightJNet")]
    pub night_jnet: Option<String>,
}

impl VolumeIndexEntry {
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.trade_date, "%Y%m%d").ok()
    }

    pub fn file_path(&self, key: SessionKey) -> Option<&str> {
        let path = match key {
            SessionKey::WholeDay => &self.whole_day,
            SessionKey::WholeDayJNet => &self.whole_day_jnet,
            SessionKey::Night => &self.night,
            SessionKey::NightJNet => &self.night_jnet,
        };
        path.as_deref().filter(|p| !p.is_empty())
    }
}

/// One row of the OI year list.
#[derive(Debug, Clone, Deserialize)]
pub struct OiYearEntry {
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "Jsonfile")]
    pub json_file: String,
}

/// One row of a per-year weekly OI index.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OiIndexEntry {
    /// YYYYMMDD report date.
    #[serde(rename = "TradeDate")]
    pub trade_date: String,
    #[serde(rename = "IndexFutures")]
    pub index_futures: Option<String>,
    #[serde(rename = "IndexOptions")]
    pub index_options: Option<String>,
    #[serde(rename = "SecuritiesOptions")]
    pub securities_options: Option<String>,
}

impl OiIndexEntry {
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.trade_date, "%Y%m%d").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_index_entry_parses_exchange_field_names() {
        let json = r#"{
            "TradeDate": "20260202",
            "WholeDay": "/vol/20260202_whole_day.xlsx",
            "WholeDayJNet": null,
            "Night": "/vol/20260202_night.xlsx"
        }"#;
        let entry: VolumeIndexEntry = serde_json::from_str(json).unwrap();
        assert_eq!(
            entry.date(),
            Some(NaiveDate::from_ymd_opt(2026, 2, 2).unwrap())
        );
        assert_eq!(
            entry.file_path(SessionKey::WholeDay),
            Some("/vol/20260202_whole_day.xlsx")
        );
        assert_eq!(entry.file_path(SessionKey::WholeDayJNet), None);
        assert_eq!(entry.file_path(SessionKey::NightJNet), None);
    }

    #[test]
    fn empty_path_is_treated_as_absent() {
        let entry = VolumeIndexEntry {
            trade_date: "20260202".into(),
            whole_day: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(entry.file_path(SessionKey::WholeDay), None);
    }
}
