//! Weekly option aggregation: per-strike PUT/CALL views combining weekly OI
//! snapshots, resolved daily volumes, and the independent daily OI balance
//! feed.
//!
//! The daily balance feed is aggregate (all participants) and self-reported;
//! it is reconciled into the same row as the participant-level data without
//! assuming the two agree. Both are retained.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use tracing::warn;

use crate::error::Result;
use crate::jpx::traits::{FileIndexSource, RecordParser};
use crate::merge::MergeableVolume;
use crate::models::{
    DailyOiBalance, OptionSideView, OptionStrikeRow, OptionType, SessionSelector, WeekDefinition,
};
use crate::session::AnalysisSession;

type SideKey = (OptionType, i64);

impl<F: FileIndexSource, P: RecordParser> AnalysisSession<F, P> {
    /// Per-strike weekly option rows for one contract month, strike
    /// descending.
    ///
    /// `participant_filter` restricts both the OI aggregation and the daily
    /// volume aggregation to the given participant ids; `None` means all
    /// participants. An empty filter yields rows with absent participant
    /// data; the aggregate daily balance feed is unaffected by the filter.
    pub async fn load_option_weekly_data(
        &self,
        week: &WeekDefinition,
        contract_month: &str,
        selector: &SessionSelector,
        participant_filter: Option<&HashSet<String>>,
    ) -> Result<Vec<OptionStrikeRow>> {
        let start_oi = self
            .option_oi_by_strike(week.start_oi_date, contract_month, participant_filter)
            .await;
        let end_oi = match week.end_oi_date {
            Some(end_date) => {
                self.option_oi_by_strike(end_date, contract_month, participant_filter)
                    .await
            }
            None => HashMap::new(),
        };

        // Participant-summed volume and ranked per-participant breakdown,
        // per (date, side).
        let mut vol_agg: HashMap<(NaiveDate, SideKey), f64> = HashMap::new();
        let mut breakdown: HashMap<(NaiveDate, SideKey), Vec<(String, f64)>> = HashMap::new();
        for &td in &week.trading_days {
            let records = self.load_option_volume(td, selector).await?;
            for record in records {
                if record.contract_month != contract_month {
                    continue;
                }
                if let Some(filter) = participant_filter {
                    if !filter.contains(&record.participant_id) {
                        continue;
                    }
                }
                let key = (td, (record.option_type, record.strike_price));
                *vol_agg.entry(key).or_insert(0.0) += record.volume;
                breakdown
                    .entry(key)
                    .or_default()
                    .push((record.display_name().to_string(), record.volume));
            }
        }
        for entries in breakdown.values_mut() {
            entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        }

        let daily_balance = self.load_week_daily_balances(week, contract_month).await;

        let mut strikes: HashSet<i64> = HashSet::new();
        strikes.extend(start_oi.keys().map(|&(_, s)| s));
        strikes.extend(end_oi.keys().map(|&(_, s)| s));
        strikes.extend(vol_agg.keys().map(|&(_, (_, s))| s));
        for day in daily_balance.values() {
            strikes.extend(day.keys().map(|&(_, s)| s));
        }

        let mut sorted_strikes: Vec<i64> = strikes.into_iter().collect();
        sorted_strikes.sort_unstable_by(|a, b| b.cmp(a));

        let rows = sorted_strikes
            .into_iter()
            .map(|strike| OptionStrikeRow {
                strike_price: strike,
                put: build_side_view(
                    (OptionType::Put, strike),
                    week,
                    &start_oi,
                    &end_oi,
                    &vol_agg,
                    &mut breakdown,
                    &daily_balance,
                ),
                call: build_side_view(
                    (OptionType::Call, strike),
                    week,
                    &start_oi,
                    &end_oi,
                    &vol_agg,
                    &mut breakdown,
                    &daily_balance,
                ),
            })
            .collect();

        Ok(rows)
    }

    /// All-participant long/short OI sums per (side, strike) for one report
    /// date, optionally restricted to a participant set.
    async fn option_oi_by_strike(
        &self,
        report_date: NaiveDate,
        contract_month: &str,
        participant_filter: Option<&HashSet<String>>,
    ) -> HashMap<SideKey, (f64, f64)> {
        let records = self.load_option_oi(report_date).await.unwrap_or_else(|e| {
            warn!("Failed to load option OI for {}: {}", report_date, e);
            Vec::new()
        });

        let mut agg: HashMap<SideKey, (f64, f64)> = HashMap::new();
        for record in records {
            if record.contract_month != contract_month {
                continue;
            }
            if let Some(filter) = participant_filter {
                if !filter.contains(&record.participant_id) {
                    continue;
                }
            }
            let entry = agg
                .entry((record.option_type, record.strike_price))
                .or_insert((0.0, 0.0));
            entry.0 += record.long_volume.unwrap_or(0.0);
            entry.1 += record.short_volume.unwrap_or(0.0);
        }
        agg
    }

    /// Daily balance records for each trading day of the week, with
    /// previous-day back-fill.
    ///
    /// When a day's balance file was never published, the next day's
    /// self-reported "previous OI" restates that day's closing levels;
    /// synthetic records are derived from it with net_change and
    /// trading_volume at zero. The derivation runs only along consecutive
    /// days inside the week and only for days with no file at all: a
    /// published file that happens not to list a strike is an observation
    /// of absence, not a gap to reconstruct. Deriving only from real
    /// records means a gap of several days cannot chain fabricated zeros.
    async fn load_week_daily_balances(
        &self,
        week: &WeekDefinition,
        contract_month: &str,
    ) -> BTreeMap<NaiveDate, HashMap<SideKey, DailyOiBalance>> {
        let mut real: BTreeMap<NaiveDate, HashMap<SideKey, DailyOiBalance>> = BTreeMap::new();
        for &td in &week.trading_days {
            let records = match self.load_daily_oi(td).await {
                Ok(Some(records)) => records,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Failed to load daily OI balance for {}: {}", td, e);
                    continue;
                }
            };
            let by_key = records
                .iter()
                .filter(|r| r.contract_month == contract_month)
                .map(|r| ((r.option_type, r.strike_price), r.clone()))
                .collect();
            real.insert(td, by_key);
        }

        let mut filled = real.clone();
        for pair in week.trading_days.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if real.contains_key(&prev) {
                continue;
            }
            let Some(next_real) = real.get(&next) else {
                continue;
            };
            let prev_day = filled.entry(prev).or_default();
            for (&key, record) in next_real {
                prev_day.insert(
                    key,
                    DailyOiBalance {
                        report_date: prev,
                        contract_month: record.contract_month.clone(),
                        option_type: record.option_type,
                        strike_price: record.strike_price,
                        trading_volume: 0,
                        current_oi: record.previous_oi,
                        net_change: 0,
                        previous_oi: record.previous_oi,
                    },
                );
            }
        }

        filled
    }
}

fn build_side_view(
    key: SideKey,
    week: &WeekDefinition,
    start_oi: &HashMap<SideKey, (f64, f64)>,
    end_oi: &HashMap<SideKey, (f64, f64)>,
    vol_agg: &HashMap<(NaiveDate, SideKey), f64>,
    breakdown: &mut HashMap<(NaiveDate, SideKey), Vec<(String, f64)>>,
    daily_balance: &BTreeMap<NaiveDate, HashMap<SideKey, DailyOiBalance>>,
) -> OptionSideView {
    let mut view = OptionSideView::default();

    if let Some(&(long, short)) = start_oi.get(&key) {
        view.start_oi_long = Some(long);
        view.start_oi_short = Some(short);
    }
    if let Some(&(long, short)) = end_oi.get(&key) {
        view.end_oi_long = Some(long);
        view.end_oi_short = Some(short);
    }

    let mut total = 0.0;
    for &td in &week.trading_days {
        if let Some(&volume) = vol_agg.get(&(td, key)) {
            if volume > 0.0 {
                view.daily_volumes.insert(td, volume);
                total += volume;
            }
        }
        if let Some(entries) = breakdown.remove(&(td, key)) {
            view.daily_breakdown.insert(td, entries);
        }
        if let Some(record) = daily_balance.get(&td).and_then(|day| day.get(&key)) {
            view.daily_oi.insert(td, record.current_oi);
            view.daily_oi_change.insert(td, record.net_change);
            view.daily_reported_volume.insert(td, record.trading_volume);
        }
    }
    if total > 0.0 {
        view.week_total = Some(total);
    }

    view
}
