//! Week-bounded aggregation over the session's loaded records.

pub mod futures;
pub mod options;
pub mod stats;

use tracing::warn;

use crate::error::Result;
use crate::jpx::traits::{FileIndexSource, RecordParser};
use crate::models::WeekDefinition;
use crate::session::AnalysisSession;

impl<F: FileIndexSource, P: RecordParser> AnalysisSession<F, P> {
    /// Analysis weeks, most recent first, capped by the configured maximum.
    pub async fn available_weeks(&self) -> Result<Vec<WeekDefinition>> {
        let calendar = self.calendar().await?;
        Ok(calendar.weeks(self.config().max_weeks))
    }

    /// Contract months (YYMM, ascending) with OI positions in a week for one
    /// product. The end snapshot is authoritative when published; the start
    /// snapshot stands in for the in-progress week.
    pub async fn available_contract_months(
        &self,
        week: &WeekDefinition,
        product: &str,
    ) -> Result<Vec<String>> {
        let mut records = Vec::new();
        if let Some(end_date) = week.end_oi_date {
            records = self.load_oi(end_date).await.unwrap_or_else(|e| {
                warn!("Failed to load OI for {}: {}", end_date, e);
                Vec::new()
            });
        }
        if records.is_empty() {
            records = self.load_oi(week.start_oi_date).await.unwrap_or_else(|e| {
                warn!("Failed to load OI for {}: {}", week.start_oi_date, e);
                Vec::new()
            });
        }

        let mut months: Vec<String> = records
            .into_iter()
            .filter(|r| r.product == product)
            .map(|r| r.contract_month)
            .collect();
        months.sort();
        months.dedup();
        Ok(months)
    }

    /// Contract months with option OI positions in a week.
    pub async fn available_option_contract_months(
        &self,
        week: &WeekDefinition,
    ) -> Result<Vec<String>> {
        let mut records = Vec::new();
        if let Some(end_date) = week.end_oi_date {
            records = self.load_option_oi(end_date).await.unwrap_or_else(|e| {
                warn!("Failed to load option OI for {}: {}", end_date, e);
                Vec::new()
            });
        }
        if records.is_empty() {
            records = self
                .load_option_oi(week.start_oi_date)
                .await
                .unwrap_or_else(|e| {
                    warn!("Failed to load option OI for {}: {}", week.start_oi_date, e);
                    Vec::new()
                });
        }

        let mut months: Vec<String> = records.into_iter().map(|r| r.contract_month).collect();
        months.sort();
        months.dedup();
        Ok(months)
    }
}
