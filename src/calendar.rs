//! Trading calendar index: the globally sorted trading dates and OI report
//! dates, with successor/predecessor lookups and week construction.
//!
//! Built once per analysis session from the exchange's month/year indexes.
//! A month whose index fails to load is skipped; a partial calendar beats a
//! hard failure, and silently missing days read the same as holidays.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::warn;

use crate::error::Result;
use crate::jpx::traits::FileIndexSource;
use crate::models::WeekDefinition;

#[derive(Debug, Clone)]
pub struct TradingCalendar {
    trading_dates: Vec<NaiveDate>,
    oi_dates: Vec<NaiveDate>,
    next_trading: HashMap<NaiveDate, NaiveDate>,
}

impl TradingCalendar {
    /// Build the calendar from the published indexes.
    pub async fn load<S: FileIndexSource + ?Sized>(source: &S) -> Result<Self> {
        let mut trading_dates = Vec::new();
        for month in source.volume_months().await? {
            match source.volume_index(&month).await {
                Ok(entries) => trading_dates.extend(entries.iter().filter_map(|e| e.date())),
                Err(e) => warn!("Skipping volume index for {}: {}", month, e),
            }
        }

        let mut oi_dates = Vec::new();
        for year in source.oi_years().await? {
            match source.oi_index(&year.year).await {
                Ok(entries) => oi_dates.extend(entries.iter().filter_map(|e| e.date())),
                Err(e) => warn!("Skipping OI index for {}: {}", year.year, e),
            }
        }

        Ok(Self::from_dates(trading_dates, oi_dates))
    }

    /// Build from raw date lists; sorts and deduplicates.
    pub fn from_dates(mut trading_dates: Vec<NaiveDate>, mut oi_dates: Vec<NaiveDate>) -> Self {
        trading_dates.sort();
        trading_dates.dedup();
        oi_dates.sort();
        oi_dates.dedup();

        let mut next_trading = HashMap::with_capacity(trading_dates.len());
        for pair in trading_dates.windows(2) {
            next_trading.insert(pair[0], pair[1]);
        }

        Self {
            trading_dates,
            oi_dates,
            next_trading,
        }
    }

    pub fn trading_dates(&self) -> &[NaiveDate] {
        &self.trading_dates
    }

    pub fn oi_dates(&self) -> &[NaiveDate] {
        &self.oi_dates
    }

    /// The next known trading date after `date`, if one has been observed.
    pub fn next_trading_date(&self, date: NaiveDate) -> Option<NaiveDate> {
        self.next_trading.get(&date).copied()
    }

    /// The trading date immediately before `date`. Linear scan; the calendar
    /// is a few hundred entries built once per session.
    pub fn prev_trading_date(&self, date: NaiveDate) -> Option<NaiveDate> {
        let idx = self.trading_dates.iter().position(|&d| d == date)?;
        if idx > 0 {
            Some(self.trading_dates[idx - 1])
        } else {
            None
        }
    }

    /// Analysis weeks, most recent first, capped at `max_weeks`.
    ///
    /// A week is the period between two consecutive OI report dates, holding
    /// the trading dates strictly after the start and up to and including
    /// the end. When trading data exists after the latest OI date, an
    /// in-progress week with `end_oi_date = None` comes first.
    pub fn weeks(&self, max_weeks: usize) -> Vec<WeekDefinition> {
        let mut weeks = Vec::new();

        if let Some(&latest_oi) = self.oi_dates.last() {
            let future_days: Vec<NaiveDate> = self
                .trading_dates
                .iter()
                .copied()
                .filter(|&d| d > latest_oi)
                .collect();
            if !future_days.is_empty() {
                weeks.push(WeekDefinition {
                    start_oi_date: latest_oi,
                    end_oi_date: None,
                    trading_days: future_days,
                    label: format!("{} - (in progress)", latest_oi.format("%m/%d")),
                });
            }
        }

        for pair in self.oi_dates.windows(2).rev() {
            if weeks.len() >= max_weeks {
                break;
            }
            let (start, end) = (pair[0], pair[1]);
            let trading_days: Vec<NaiveDate> = self
                .trading_dates
                .iter()
                .copied()
                .filter(|&d| d > start && d <= end)
                .collect();

            weeks.push(WeekDefinition {
                start_oi_date: start,
                end_oi_date: Some(end),
                trading_days,
                label: format!("{} - {}", start.format("%m/%d"), end.format("%m/%d")),
            });
        }

        weeks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_calendar() -> TradingCalendar {
        // Two full weeks of trading days plus two days past the last OI date.
        TradingCalendar::from_dates(
            vec![
                date(2026, 1, 26),
                date(2026, 1, 27),
                date(2026, 1, 28),
                date(2026, 1, 29),
                date(2026, 1, 30),
                date(2026, 2, 2),
                date(2026, 2, 3),
                date(2026, 2, 4),
                date(2026, 2, 5),
                date(2026, 2, 6),
                date(2026, 2, 9),
                date(2026, 2, 10),
            ],
            vec![date(2026, 1, 23), date(2026, 1, 30), date(2026, 2, 6)],
        )
    }

    #[test]
    fn sorts_and_dedups_input_dates() {
        let cal = TradingCalendar::from_dates(
            vec![date(2026, 2, 3), date(2026, 2, 2), date(2026, 2, 3)],
            vec![],
        );
        assert_eq!(cal.trading_dates(), &[date(2026, 2, 2), date(2026, 2, 3)]);
    }

    #[test]
    fn successor_skips_weekends() {
        let cal = sample_calendar();
        assert_eq!(cal.next_trading_date(date(2026, 1, 30)), Some(date(2026, 2, 2)));
        // Most recent observed date has no successor yet.
        assert_eq!(cal.next_trading_date(date(2026, 2, 10)), None);
    }

    #[test]
    fn predecessor_by_scan() {
        let cal = sample_calendar();
        assert_eq!(cal.prev_trading_date(date(2026, 2, 2)), Some(date(2026, 1, 30)));
        assert_eq!(cal.prev_trading_date(date(2026, 1, 26)), None);
        // Unknown date has no predecessor.
        assert_eq!(cal.prev_trading_date(date(2026, 2, 1)), None);
    }

    #[test]
    fn weeks_are_bounded_by_oi_dates() {
        let cal = sample_calendar();
        let weeks = cal.weeks(10);
        assert_eq!(weeks.len(), 3);

        // Most recent first: the in-progress week.
        assert!(weeks[0].is_in_progress());
        assert_eq!(weeks[0].start_oi_date, date(2026, 2, 6));
        assert_eq!(weeks[0].trading_days, vec![date(2026, 2, 9), date(2026, 2, 10)]);

        // Closed weeks hold (start, end] trading days.
        assert_eq!(weeks[1].start_oi_date, date(2026, 1, 30));
        assert_eq!(weeks[1].end_oi_date, Some(date(2026, 2, 6)));
        assert_eq!(
            weeks[1].trading_days,
            vec![
                date(2026, 2, 2),
                date(2026, 2, 3),
                date(2026, 2, 4),
                date(2026, 2, 5),
                date(2026, 2, 6),
            ]
        );

        assert_eq!(weeks[2].start_oi_date, date(2026, 1, 23));
        assert_eq!(weeks[2].end_oi_date, Some(date(2026, 1, 30)));
    }

    #[test]
    fn week_cap_is_respected() {
        let cal = sample_calendar();
        assert_eq!(cal.weeks(1).len(), 1);
    }

    #[test]
    fn no_in_progress_week_without_newer_trading_days() {
        let cal = TradingCalendar::from_dates(
            vec![date(2026, 2, 2), date(2026, 2, 3)],
            vec![date(2026, 1, 30), date(2026, 2, 6)],
        );
        let weeks = cal.weeks(10);
        assert_eq!(weeks.len(), 1);
        assert!(!weeks[0].is_in_progress());
    }
}
