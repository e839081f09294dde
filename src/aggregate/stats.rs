//! Trailing per-participant volume statistics.

use std::collections::HashMap;

use crate::constants::TRAILING_STATS_DAYS;
use crate::error::Result;
use crate::jpx::traits::{FileIndexSource, RecordParser};
use crate::models::{SessionSelector, WeekDefinition};
use crate::session::AnalysisSession;

/// Trailing-window daily volume statistics for one participant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailingStats {
    pub average: f64,
    pub max: f64,
}

impl<F: FileIndexSource, P: RecordParser> AnalysisSession<F, P> {
    /// Average and maximum daily volume per participant over the trailing
    /// window of trading dates ending at (and including) the week's last
    /// trading day.
    ///
    /// The average divides by the window length, so days a participant did
    /// not trade count as zero volume rather than being dropped from the
    /// denominator. A week with no trading days yields an empty map.
    pub async fn trailing_stats(
        &self,
        week: &WeekDefinition,
        product: &str,
        contract_month: &str,
        selector: &SessionSelector,
    ) -> Result<HashMap<String, TrailingStats>> {
        let Some(&last_day) = week.trading_days.last() else {
            return Ok(HashMap::new());
        };

        let calendar = self.calendar().await?;
        let window: Vec<_> = calendar
            .trading_dates()
            .iter()
            .copied()
            .filter(|&d| d <= last_day)
            .collect();
        let window = &window[window.len().saturating_sub(TRAILING_STATS_DAYS)..];
        if window.is_empty() {
            return Ok(HashMap::new());
        }

        let mut volumes: HashMap<String, Vec<f64>> = HashMap::new();
        for &td in window {
            let records = self.load_volume(td, selector).await?;
            for record in records {
                if record.product == product && record.contract_month == contract_month {
                    volumes
                        .entry(record.participant_id)
                        .or_default()
                        .push(record.volume);
                }
            }
        }

        let window_len = window.len() as f64;
        let stats = volumes
            .into_iter()
            .map(|(pid, vols)| {
                let sum: f64 = vols.iter().sum();
                let max = vols.iter().copied().fold(0.0f64, f64::max);
                (
                    pid,
                    TrailingStats {
                        average: sum / window_len,
                        max,
                    },
                )
            })
            .collect();

        Ok(stats)
    }
}
