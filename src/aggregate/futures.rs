//! Weekly futures aggregation: one row per participant combining the two
//! bounding OI snapshots with the week's resolved daily volumes.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use tracing::warn;

use crate::error::Result;
use crate::jpx::traits::{FileIndexSource, RecordParser};
use crate::merge::MergeableVolume;
use crate::models::{
    DailyFuturesOi, Direction, ParticipantOi, ParticipantVolume, SessionSelector, WeekDefinition,
    WeeklyParticipantRow,
};
use crate::session::AnalysisSession;

impl<F: FileIndexSource, P: RecordParser> AnalysisSession<F, P> {
    /// Weekly participant rows for one week/product/contract month.
    ///
    /// Rows are sorted by total weekly volume descending. A participant
    /// appears when seen in either OI snapshot or any day's volume; nothing
    /// requires presence in all sources. `oi_net_change` and `direction`
    /// are populated only when both OI snapshots carry the participant, so
    /// the in-progress week never fabricates a change from one-sided data.
    pub async fn load_weekly_data(
        &self,
        week: &WeekDefinition,
        product: &str,
        contract_month: &str,
        selector: &SessionSelector,
    ) -> Result<Vec<WeeklyParticipantRow>> {
        let start_oi = self
            .oi_by_participant(week.start_oi_date, product, contract_month)
            .await;
        let end_oi = match week.end_oi_date {
            Some(end_date) => self.oi_by_participant(end_date, product, contract_month).await,
            None => HashMap::new(),
        };

        let mut daily_volumes: BTreeMap<NaiveDate, HashMap<String, ParticipantVolume>> =
            BTreeMap::new();
        for &td in &week.trading_days {
            let records = self.load_volume(td, selector).await?;
            let by_pid = records
                .into_iter()
                .filter(|r| r.product == product && r.contract_month == contract_month)
                .map(|r| (r.participant_id.clone(), r))
                .collect();
            daily_volumes.insert(td, by_pid);
        }

        let mut pids: HashSet<&String> = HashSet::new();
        pids.extend(start_oi.keys());
        pids.extend(end_oi.keys());
        for day in daily_volumes.values() {
            pids.extend(day.keys());
        }
        // Ties in the final volume sort stay in id order run over run.
        let mut pids: Vec<&String> = pids.into_iter().collect();
        pids.sort();

        let names = build_name_lookup(&daily_volumes, &start_oi, &end_oi);

        let mut rows = Vec::with_capacity(pids.len());
        for pid in pids {
            let s_oi = start_oi.get(pid);
            let e_oi = end_oi.get(pid);

            // An absent side of an existing record reads as zero; a fully
            // absent record leaves the whole side None.
            let s_net = s_oi.map(ParticipantOi::net);
            let e_net = e_oi.map(ParticipantOi::net);

            let mut dvols = BTreeMap::new();
            for (&td, day) in &daily_volumes {
                if let Some(pv) = day.get(pid) {
                    dvols.insert(td, pv.volume);
                }
            }

            let oi_net_change = match (s_net, e_net) {
                (Some(s), Some(e)) => Some(e - s),
                _ => None,
            };
            let direction = oi_net_change.map(Direction::from_net_change);

            rows.push(WeeklyParticipantRow {
                participant_id: pid.clone(),
                participant_name: names.get(pid).cloned().unwrap_or_else(|| pid.clone()),
                start_oi_long: s_oi.map(|r| r.long_volume.unwrap_or(0.0)),
                start_oi_short: s_oi.map(|r| r.short_volume.unwrap_or(0.0)),
                start_oi_net: s_net,
                daily_volumes: dvols,
                end_oi_long: e_oi.map(|r| r.long_volume.unwrap_or(0.0)),
                end_oi_short: e_oi.map(|r| r.short_volume.unwrap_or(0.0)),
                end_oi_net: e_net,
                oi_net_change,
                direction,
            });
        }

        rows.sort_by(|a, b| b.total_volume().total_cmp(&a.total_volume()));
        Ok(rows)
    }

    /// Aggregate daily futures OI balance per trading day of a week, for one
    /// product. Days the exchange has not published are simply absent.
    pub async fn load_weekly_futures_oi(
        &self,
        week: &WeekDefinition,
        product: &str,
    ) -> Result<BTreeMap<NaiveDate, DailyFuturesOi>> {
        let mut by_date = BTreeMap::new();
        for &td in &week.trading_days {
            let records = match self.load_daily_futures_oi(td).await {
                Ok(Some(records)) => records,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Failed to load daily futures OI for {}: {}", td, e);
                    continue;
                }
            };
            if let Some(record) = records.iter().find(|r| r.product == product) {
                by_date.insert(td, record.clone());
            }
        }
        Ok(by_date)
    }

    async fn oi_by_participant(
        &self,
        report_date: NaiveDate,
        product: &str,
        contract_month: &str,
    ) -> HashMap<String, ParticipantOi> {
        let records = self.load_oi(report_date).await.unwrap_or_else(|e| {
            warn!("Failed to load OI for {}: {}", report_date, e);
            Vec::new()
        });
        records
            .into_iter()
            .filter(|r| r.product == product && r.contract_month == contract_month)
            .map(|r| (r.participant_id.clone(), r))
            .collect()
    }
}

/// Display-name resolution: Latin-script names from the week's daily volume
/// records win over the OI snapshots' local-script names; among volume
/// records the most recently seen non-empty name wins.
fn build_name_lookup(
    daily_volumes: &BTreeMap<NaiveDate, HashMap<String, ParticipantVolume>>,
    start_oi: &HashMap<String, ParticipantOi>,
    end_oi: &HashMap<String, ParticipantOi>,
) -> HashMap<String, String> {
    let mut lookup = HashMap::new();

    for record in start_oi.values().chain(end_oi.values()) {
        if !record.participant_name_jp.is_empty() {
            lookup.insert(record.participant_id.clone(), record.participant_name_jp.clone());
        }
    }

    for day in daily_volumes.values() {
        for record in day.values() {
            if !record.participant_name_en.is_empty() {
                lookup.insert(record.participant_id.clone(), record.display_name().to_string());
            }
        }
    }

    lookup
}
