//! Record merging and open-interest consolidation.
//!
//! Numeric sub-fields are always summed across inputs, never replaced:
//! last-writer-wins would silently drop volume when the same entity appears
//! in more than one session file. Display names follow a first-non-empty
//! rule so name provenance stays stable across repeated runs.

use std::collections::HashMap;
use std::hash::Hash;

use chrono::NaiveDate;

use crate::models::{OptionParticipantOi, OptionParticipantVolume, OptionType, ParticipantOi, ParticipantVolume};

/// A daily volume record that can be combined with same-key records and
/// re-dated during the night shift.
pub trait MergeableVolume: Clone {
    type Key: Eq + Hash;

    fn merge_key(&self) -> Self::Key;

    /// Sum numeric sub-fields into `self`; fill display names that are still
    /// empty (an already-populated name is never overwritten).
    fn absorb(&mut self, other: &Self);

    /// A copy of this record keyed at `date`. The night shift re-dates
    /// freshly built copies, never records held by a cache.
    fn with_trade_date(&self, date: NaiveDate) -> Self;

    fn display_name(&self) -> &str;

    fn participant_id(&self) -> &str;

    fn volume(&self) -> f64;
}

fn fill_name(target: &mut String, source: &str) {
    if target.is_empty() && !source.is_empty() {
        *target = source.to_string();
    }
}

fn pick_display_name<'a>(name_en: &'a str, name_jp: &'a str, participant_id: &'a str) -> &'a str {
    if !name_en.is_empty() {
        name_en
    } else if !name_jp.is_empty() {
        name_jp
    } else {
        participant_id
    }
}

impl MergeableVolume for ParticipantVolume {
    type Key = (NaiveDate, String, String, String);

    fn merge_key(&self) -> Self::Key {
        (
            self.trade_date,
            self.product.clone(),
            self.contract_month.clone(),
            self.participant_id.clone(),
        )
    }

    fn absorb(&mut self, other: &Self) {
        self.volume += other.volume;
        self.volume_day += other.volume_day;
        self.volume_night += other.volume_night;
        fill_name(&mut self.participant_name_en, &other.participant_name_en);
        fill_name(&mut self.participant_name_jp, &other.participant_name_jp);
    }

    fn with_trade_date(&self, date: NaiveDate) -> Self {
        Self {
            trade_date: date,
            ..self.clone()
        }
    }

    fn display_name(&self) -> &str {
        pick_display_name(
            &self.participant_name_en,
            &self.participant_name_jp,
            &self.participant_id,
        )
    }

    fn participant_id(&self) -> &str {
        &self.participant_id
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

impl MergeableVolume for OptionParticipantVolume {
    type Key = (NaiveDate, OptionType, i64, String, String);

    fn merge_key(&self) -> Self::Key {
        (
            self.trade_date,
            self.option_type,
            self.strike_price,
            self.contract_month.clone(),
            self.participant_id.clone(),
        )
    }

    fn absorb(&mut self, other: &Self) {
        self.volume += other.volume;
        self.volume_day += other.volume_day;
        self.volume_night += other.volume_night;
        fill_name(&mut self.participant_name_en, &other.participant_name_en);
        fill_name(&mut self.participant_name_jp, &other.participant_name_jp);
    }

    fn with_trade_date(&self, date: NaiveDate) -> Self {
        Self {
            trade_date: date,
            ..self.clone()
        }
    }

    fn display_name(&self) -> &str {
        pick_display_name(
            &self.participant_name_en,
            &self.participant_name_jp,
            &self.participant_id,
        )
    }

    fn participant_id(&self) -> &str {
        &self.participant_id
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

/// Merge one or more record lists into one record per distinct entity key.
///
/// Output order is first-seen order, so merging is deterministic for a given
/// input sequence and totals are independent of list order.
pub fn merge_volume_records<R: MergeableVolume>(lists: Vec<Vec<R>>) -> Vec<R> {
    let mut merged: Vec<R> = Vec::new();
    let mut index: HashMap<R::Key, usize> = HashMap::new();

    for records in lists {
        for record in records {
            let key = record.merge_key();
            match index.get(&key) {
                Some(&slot) => merged[slot].absorb(&record),
                None => {
                    index.insert(key, merged.len());
                    merged.push(record);
                }
            }
        }
    }

    merged
}

/// An open-interest record whose long and short halves arrive as separate
/// partial rows sharing a key.
pub trait MergeableOi: Clone {
    type Key: Eq + Hash;

    fn consolidation_key(&self) -> Self::Key;
    fn long_volume(&self) -> Option<f64>;
    fn short_volume(&self) -> Option<f64>;
    fn set_long_volume(&mut self, volume: f64);
    fn set_short_volume(&mut self, volume: f64);
}

impl MergeableOi for ParticipantOi {
    type Key = (String, String, String);

    fn consolidation_key(&self) -> Self::Key {
        (
            self.product.clone(),
            self.contract_month.clone(),
            self.participant_id.clone(),
        )
    }

    fn long_volume(&self) -> Option<f64> {
        self.long_volume
    }

    fn short_volume(&self) -> Option<f64> {
        self.short_volume
    }

    fn set_long_volume(&mut self, volume: f64) {
        self.long_volume = Some(volume);
    }

    fn set_short_volume(&mut self, volume: f64) {
        self.short_volume = Some(volume);
    }
}

impl MergeableOi for OptionParticipantOi {
    type Key = (String, OptionType, i64, String);

    fn consolidation_key(&self) -> Self::Key {
        (
            self.contract_month.clone(),
            self.option_type,
            self.strike_price,
            self.participant_id.clone(),
        )
    }

    fn long_volume(&self) -> Option<f64> {
        self.long_volume
    }

    fn short_volume(&self) -> Option<f64> {
        self.short_volume
    }

    fn set_long_volume(&mut self, volume: f64) {
        self.long_volume = Some(volume);
    }

    fn set_short_volume(&mut self, volume: f64) {
        self.short_volume = Some(volume);
    }
}

/// Merge long-only and short-only partial records sharing a key into one
/// record carrying both sides. A side never observed stays absent (not
/// zero). Two partials with the same side populated should not occur in
/// well-formed input; the later one wins without further validation.
pub fn consolidate_oi<R: MergeableOi>(records: Vec<R>) -> Vec<R> {
    let mut merged: Vec<R> = Vec::new();
    let mut index: HashMap<R::Key, usize> = HashMap::new();

    for record in records {
        let key = record.consolidation_key();
        match index.get(&key) {
            Some(&slot) => {
                if let Some(long) = record.long_volume() {
                    merged[slot].set_long_volume(long);
                }
                if let Some(short) = record.short_volume() {
                    merged[slot].set_short_volume(short);
                }
            }
            None => {
                index.insert(key, merged.len());
                merged.push(record);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn volume(pid: &str, vol: f64, day: f64, night: f64) -> ParticipantVolume {
        ParticipantVolume {
            trade_date: date(2026, 2, 2),
            product: "NK225F".into(),
            contract_month: "2603".into(),
            participant_id: pid.into(),
            participant_name_en: String::new(),
            participant_name_jp: String::new(),
            rank: 0,
            volume: vol,
            volume_day: day,
            volume_night: night,
        }
    }

    fn oi(pid: &str, long: Option<f64>, short: Option<f64>) -> ParticipantOi {
        ParticipantOi {
            report_date: date(2026, 1, 30),
            product: "NK225F".into(),
            contract_month: "2603".into(),
            participant_id: pid.into(),
            participant_name_jp: String::new(),
            long_volume: long,
            short_volume: short,
        }
    }

    #[test]
    fn merge_sums_same_key_records() {
        let merged = merge_volume_records(vec![
            vec![volume("11111", 10.0, 10.0, 0.0)],
            vec![volume("11111", 5.0, 0.0, 5.0)],
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].volume, 15.0);
        assert_eq!(merged[0].volume_day, 10.0);
        assert_eq!(merged[0].volume_night, 5.0);
    }

    #[test]
    fn merge_is_commutative_on_totals() {
        let a = vec![volume("11111", 10.0, 10.0, 0.0), volume("22222", 3.0, 3.0, 0.0)];
        let b = vec![volume("11111", 7.0, 0.0, 7.0)];

        let ab = merge_volume_records(vec![a.clone(), b.clone()]);
        let ba = merge_volume_records(vec![b, a]);

        let total = |rows: &[ParticipantVolume], pid: &str| -> f64 {
            rows.iter()
                .filter(|r| r.participant_id == pid)
                .map(|r| r.volume)
                .sum()
        };
        assert_eq!(total(&ab, "11111"), total(&ba, "11111"));
        assert_eq!(total(&ab, "11111"), 17.0);
        assert_eq!(total(&ab, "22222"), total(&ba, "22222"));
    }

    #[test]
    fn merge_keeps_first_non_empty_name() {
        let mut first = volume("11111", 1.0, 1.0, 0.0);
        first.participant_name_en = "ABC Securities".into();
        let mut second = volume("11111", 2.0, 2.0, 0.0);
        second.participant_name_en = "ABC SEC CO".into();
        second.participant_name_jp = "ABC証券".into();

        let merged = merge_volume_records(vec![vec![first], vec![second]]);
        assert_eq!(merged[0].participant_name_en, "ABC Securities");
        assert_eq!(merged[0].participant_name_jp, "ABC証券");
    }

    #[test]
    fn consolidation_joins_complementary_halves() {
        let merged = consolidate_oi(vec![
            oi("11111", Some(100.0), None),
            oi("11111", None, Some(40.0)),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].long_volume, Some(100.0));
        assert_eq!(merged[0].short_volume, Some(40.0));
    }

    #[test]
    fn consolidation_leaves_missing_side_absent() {
        let merged = consolidate_oi(vec![oi("11111", Some(100.0), None)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].long_volume, Some(100.0));
        assert_eq!(merged[0].short_volume, None);
    }

    #[test]
    fn display_name_prefers_english_then_japanese() {
        let mut v = volume("11111", 1.0, 1.0, 0.0);
        assert_eq!(v.display_name(), "11111");
        v.participant_name_jp = "ABC証券".into();
        assert_eq!(v.display_name(), "ABC証券");
        v.participant_name_en = "ABC Securities".into();
        assert_eq!(v.display_name(), "ABC Securities");
    }
}
