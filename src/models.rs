//! Domain records for the reconciliation core.
//!
//! All records are value-like: construction happens at the parser boundary,
//! aggregation never mutates a cached record in place.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Session file key within a single JPX trade date.
///
/// Day-type files are filed under the actual market date. Night-type files
/// for market date D are filed under the NEXT trading date after D, because
/// the night session for D runs into the early hours of the following
/// business day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKey {
    WholeDay,
    WholeDayJNet,
    Night,
    NightJNet,
}

impl SessionKey {
    /// The field name used in the JPX volume index JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKey::WholeDay => "WholeDay",
            SessionKey::WholeDayJNet => "WholeDayJNet",
            SessionKey::Night => "Night",
            SessionKey::NightJNet => "NightJNet",
        }
    }

    /// Night-type keys resolve at the successor trading date.
    pub fn is_night(&self) -> bool {
        matches!(self, SessionKey::Night | SessionKey::NightJNet)
    }
}

/// Day-type session keys, resolved directly at the market date.
pub const DAY_SESSION_KEYS: [SessionKey; 2] = [SessionKey::WholeDay, SessionKey::WholeDayJNet];

/// Night-type session keys, resolved at the successor trading date and
/// re-dated to the market date.
pub const NIGHT_SESSION_KEYS: [SessionKey; 2] = [SessionKey::Night, SessionKey::NightJNet];

/// Which session files to combine when resolving a market date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSelector {
    /// All four session files, with night-shift handling.
    All,
    /// An explicit subset of session keys. Day and night keys may be mixed;
    /// each group resolves along its own path and the results are merged.
    Keys(Vec<SessionKey>),
}

impl SessionSelector {
    pub fn day_keys(&self) -> Vec<SessionKey> {
        match self {
            SessionSelector::All => DAY_SESSION_KEYS.to_vec(),
            SessionSelector::Keys(keys) => {
                keys.iter().copied().filter(|k| !k.is_night()).collect()
            }
        }
    }

    pub fn night_keys(&self) -> Vec<SessionKey> {
        match self {
            SessionSelector::All => NIGHT_SESSION_KEYS.to_vec(),
            SessionSelector::Keys(keys) => keys.iter().copied().filter(|k| k.is_night()).collect(),
        }
    }
}

/// PUT/CALL side of an option record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionType {
    Put,
    Call,
}

impl OptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Put => "PUT",
            OptionType::Call => "CALL",
        }
    }
}

/// Net position change inferred from two OI snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
    Neutral,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
            Direction::Neutral => "NEUTRAL",
        }
    }

    /// Direction of a strictly positive / negative / zero net change.
    pub fn from_net_change(change: f64) -> Self {
        if change > 0.0 {
            Direction::Buy
        } else if change < 0.0 {
            Direction::Sell
        } else {
            Direction::Neutral
        }
    }
}

/// One participant's traded volume for one date/product/contract month.
///
/// A single session file carries either the day or the night sub-total; the
/// other is zero. Overlapping records are summed by the merger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantVolume {
    pub trade_date: NaiveDate,
    /// Product code, e.g. "NK225F", "TOPIXF".
    pub product: String,
    /// Delivery month in YYMM form, e.g. "2603".
    pub contract_month: String,
    pub participant_id: String,
    pub participant_name_en: String,
    pub participant_name_jp: String,
    pub rank: i32,
    /// Combined buy+sell total across sessions.
    pub volume: f64,
    pub volume_day: f64,
    pub volume_night: f64,
}

/// One participant's open interest position from a weekly snapshot.
///
/// The source file lists long-side and short-side participants in separate
/// table halves; a record fresh off the parser carries only one side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantOi {
    pub report_date: NaiveDate,
    pub product: String,
    pub contract_month: String,
    pub participant_id: String,
    pub participant_name_jp: String,
    pub long_volume: Option<f64>,
    pub short_volume: Option<f64>,
}

impl ParticipantOi {
    /// Long minus short, treating an absent side as zero.
    pub fn net(&self) -> f64 {
        self.long_volume.unwrap_or(0.0) - self.short_volume.unwrap_or(0.0)
    }
}

/// One participant's daily option trading volume for one strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionParticipantVolume {
    pub trade_date: NaiveDate,
    pub option_type: OptionType,
    pub strike_price: i64,
    pub contract_month: String,
    pub participant_id: String,
    pub participant_name_en: String,
    pub participant_name_jp: String,
    pub rank: i32,
    pub volume: f64,
    pub volume_day: f64,
    pub volume_night: f64,
}

/// One participant's option open interest position for one strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionParticipantOi {
    pub report_date: NaiveDate,
    pub option_type: OptionType,
    pub strike_price: i64,
    pub contract_month: String,
    pub participant_id: String,
    pub participant_name_jp: String,
    pub long_volume: Option<f64>,
    pub short_volume: Option<f64>,
}

/// Aggregate (all-participant) daily OI balance per option strike, from the
/// daily balance workbook. Independent of the weekly participant-level feed
/// and not assumed consistent with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyOiBalance {
    pub report_date: NaiveDate,
    pub contract_month: String,
    pub option_type: OptionType,
    pub strike_price: i64,
    /// JPX-reported trading volume; can disagree with participant-summed
    /// volume and both are retained.
    pub trading_volume: i64,
    pub current_oi: i64,
    pub net_change: i64,
    pub previous_oi: i64,
}

/// Aggregate daily futures OI balance per product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyFuturesOi {
    pub report_date: NaiveDate,
    pub product: String,
    pub current_oi: i64,
    pub net_change: i64,
    pub previous_oi: i64,
}

/// A contiguous analysis period bounded by two OI report dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekDefinition {
    /// Previous snapshot date.
    pub start_oi_date: NaiveDate,
    /// Current snapshot date; None while the period's snapshot has not yet
    /// been published (the in-progress week).
    pub end_oi_date: Option<NaiveDate>,
    /// Trading dates strictly after `start_oi_date`, up to and including
    /// `end_oi_date` when present.
    pub trading_days: Vec<NaiveDate>,
    pub label: String,
}

impl WeekDefinition {
    pub fn is_in_progress(&self) -> bool {
        self.end_oi_date.is_none()
    }
}

/// Aggregated weekly view for one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyParticipantRow {
    pub participant_id: String,
    pub participant_name: String,
    pub start_oi_long: Option<f64>,
    pub start_oi_short: Option<f64>,
    pub start_oi_net: Option<f64>,
    pub daily_volumes: BTreeMap<NaiveDate, f64>,
    pub end_oi_long: Option<f64>,
    pub end_oi_short: Option<f64>,
    pub end_oi_net: Option<f64>,
    /// Present only when both OI snapshots exist for this participant.
    pub oi_net_change: Option<f64>,
    /// Present under the same condition as `oi_net_change`.
    pub direction: Option<Direction>,
}

impl WeeklyParticipantRow {
    pub fn total_volume(&self) -> f64 {
        self.daily_volumes.values().sum()
    }
}

/// One side (PUT or CALL) of an option strike's weekly view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionSideView {
    pub start_oi_long: Option<f64>,
    pub start_oi_short: Option<f64>,
    pub end_oi_long: Option<f64>,
    pub end_oi_short: Option<f64>,
    /// Participant-filtered volume per trading date; zero days omitted.
    pub daily_volumes: BTreeMap<NaiveDate, f64>,
    pub week_total: Option<f64>,
    /// Per-date (display name, volume) pairs, volume descending.
    pub daily_breakdown: BTreeMap<NaiveDate, Vec<(String, f64)>>,
    /// Aggregate OI level per date, from the daily balance feed.
    pub daily_oi: BTreeMap<NaiveDate, i64>,
    /// Self-reported net change per date, from the daily balance feed.
    pub daily_oi_change: BTreeMap<NaiveDate, i64>,
    /// JPX-reported aggregate trading volume per date. Kept separate from
    /// the participant-summed `daily_volumes`.
    pub daily_reported_volume: BTreeMap<NaiveDate, i64>,
}

/// Aggregated weekly view for one option strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionStrikeRow {
    pub strike_price: i64,
    pub put: OptionSideView,
    pub call: OptionSideView,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_night_split() {
        assert!(!SessionKey::WholeDay.is_night());
        assert!(!SessionKey::WholeDayJNet.is_night());
        assert!(SessionKey::Night.is_night());
        assert!(SessionKey::NightJNet.is_night());
    }

    #[test]
    fn selector_all_partitions_into_both_paths() {
        let sel = SessionSelector::All;
        assert_eq!(sel.day_keys(), DAY_SESSION_KEYS.to_vec());
        assert_eq!(sel.night_keys(), NIGHT_SESSION_KEYS.to_vec());
    }

    #[test]
    fn selector_mixed_keys_split_by_type() {
        let sel = SessionSelector::Keys(vec![SessionKey::WholeDay, SessionKey::Night]);
        assert_eq!(sel.day_keys(), vec![SessionKey::WholeDay]);
        assert_eq!(sel.night_keys(), vec![SessionKey::Night]);
    }

    #[test]
    fn direction_from_net_change() {
        assert_eq!(Direction::from_net_change(30.0), Direction::Buy);
        assert_eq!(Direction::from_net_change(-0.5), Direction::Sell);
        assert_eq!(Direction::from_net_change(0.0), Direction::Neutral);
    }

    #[test]
    fn oi_net_treats_absent_side_as_zero() {
        let oi = ParticipantOi {
            report_date: NaiveDate::from_ymd_opt(2026, 1, 30).unwrap(),
            product: "NK225F".into(),
            contract_month: "2603".into(),
            participant_id: "12345".into(),
            participant_name_jp: String::new(),
            long_volume: Some(100.0),
            short_volume: None,
        };
        assert_eq!(oi.net(), 100.0);
    }
}
