//! End-to-end option reconciliation over fixture data: strike aggregation,
//! participant filtering, breakdown retention, and daily balance back-fill.

use std::collections::HashSet;

use chrono::NaiveDate;
use teguchi::models::{OptionType, SessionKey, SessionSelector};
use teguchi::testkit::{
    daily_oi_balance, option_oi, option_volume, FixtureParser, FixtureSource,
};
use teguchi::{AnalysisSession, Config};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn session(source: FixtureSource) -> AnalysisSession<FixtureSource, FixtureParser> {
    AnalysisSession::new(source, FixtureParser, Config::default())
}

/// Two participants trade the same strike; the row carries their summed
/// volume per side and the ranked per-participant breakdown.
#[tokio::test]
async fn strikes_aggregate_across_participants() {
    let td = date(2026, 2, 2);
    let mut source = FixtureSource::new();
    source
        .add_oi_file(date(2026, 1, 30), vec![])
        .add_option_oi_file(
            date(2026, 1, 30),
            vec![
                option_oi(date(2026, 1, 30), OptionType::Put, 39000, "2602", "11111", Some(500.0), None),
                option_oi(date(2026, 1, 30), OptionType::Put, 39000, "2602", "11111", None, Some(200.0)),
            ],
        )
        .add_volume_file(
            td,
            SessionKey::WholeDay,
            vec![],
            vec![
                option_volume(td, OptionType::Put, 39000, "2602", "11111", 30.0),
                option_volume(td, OptionType::Put, 39000, "2602", "22222", 70.0),
                option_volume(td, OptionType::Call, 40000, "2602", "11111", 25.0),
            ],
        );

    let session = session(source);
    let weeks = session.available_weeks().await.unwrap();
    let week = &weeks[0];
    assert!(week.is_in_progress());

    let rows = session
        .load_option_weekly_data(week, "2602", &SessionSelector::All, None)
        .await
        .unwrap();

    // Strike descending: 40000 above 39000.
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].strike_price, 40000);
    assert_eq!(rows[1].strike_price, 39000);

    let put = &rows[1].put;
    assert_eq!(put.start_oi_long, Some(500.0));
    assert_eq!(put.start_oi_short, Some(200.0));
    assert_eq!(put.end_oi_long, None);
    assert_eq!(put.daily_volumes.get(&td), Some(&100.0));
    assert_eq!(put.week_total, Some(100.0));

    // Breakdown ranked by volume descending; names fall back to ids.
    let breakdown = &put.daily_breakdown[&td];
    assert_eq!(breakdown[0], ("22222".to_string(), 70.0));
    assert_eq!(breakdown[1], ("11111".to_string(), 30.0));

    let call = &rows[0].call;
    assert_eq!(call.week_total, Some(25.0));
    assert_eq!(rows[0].put.week_total, None);
}

/// A participant filter restricts both the OI sums and the volume sums. An
/// empty filter leaves participant data absent without failing.
#[tokio::test]
async fn participant_filter_restricts_oi_and_volume() {
    let td = date(2026, 2, 2);
    let mut source = FixtureSource::new();
    source
        .add_option_oi_file(
            date(2026, 1, 30),
            vec![
                option_oi(date(2026, 1, 30), OptionType::Call, 40000, "2602", "11111", Some(300.0), None),
                option_oi(date(2026, 1, 30), OptionType::Call, 40000, "2602", "22222", Some(100.0), None),
            ],
        )
        .add_volume_file(
            td,
            SessionKey::WholeDay,
            vec![],
            vec![
                option_volume(td, OptionType::Call, 40000, "2602", "11111", 10.0),
                option_volume(td, OptionType::Call, 40000, "2602", "22222", 40.0),
            ],
        );

    let session = session(source);
    let week = &session.available_weeks().await.unwrap()[0];

    let only_first: HashSet<String> = ["11111".to_string()].into();
    let rows = session
        .load_option_weekly_data(week, "2602", &SessionSelector::All, Some(&only_first))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].call.start_oi_long, Some(300.0));
    assert_eq!(rows[0].call.week_total, Some(10.0));

    let nobody: HashSet<String> = HashSet::new();
    let rows = session
        .load_option_weekly_data(week, "2602", &SessionSelector::All, Some(&nobody))
        .await
        .unwrap();
    assert!(rows.is_empty());
}

/// The daily balance feed fills the row's per-day aggregate columns, and a
/// missing day is reconstructed from the next day's restated previous OI.
#[tokio::test]
async fn daily_balance_backfills_missing_previous_day() {
    let monday = date(2026, 2, 2);
    let tuesday = date(2026, 2, 3);

    let mut source = FixtureSource::new();
    source
        .add_oi_date(date(2026, 1, 30))
        .add_trading_day(monday)
        .add_trading_day(tuesday)
        // No balance file on Monday; Tuesday restates Monday's close as
        // previous_oi = 1200 - 150 = 1050.
        .add_daily_oi(
            tuesday,
            vec![daily_oi_balance(tuesday, "2602", OptionType::Put, 39000, 1200, 150, 80)],
            vec![],
        );

    let session = session(source);
    let week = &session.available_weeks().await.unwrap()[0];
    assert_eq!(week.trading_days, vec![monday, tuesday]);

    let rows = session
        .load_option_weekly_data(week, "2602", &SessionSelector::All, None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    let put = &rows[0].put;
    assert_eq!(put.daily_oi.get(&tuesday), Some(&1200));
    assert_eq!(put.daily_oi_change.get(&tuesday), Some(&150));
    assert_eq!(put.daily_reported_volume.get(&tuesday), Some(&80));

    // The synthetic Monday record carries the restated level with zero
    // change and volume.
    assert_eq!(put.daily_oi.get(&monday), Some(&1050));
    assert_eq!(put.daily_oi_change.get(&monday), Some(&0));
    assert_eq!(put.daily_reported_volume.get(&monday), Some(&0));
}

/// A published file that does not list a strike is an observation, not a
/// gap: only a day with no workbook at all gets reconstructed.
#[tokio::test]
async fn backfill_skips_days_whose_file_was_published() {
    let monday = date(2026, 2, 2);
    let tuesday = date(2026, 2, 3);

    let mut source = FixtureSource::new();
    source
        .add_oi_date(date(2026, 1, 30))
        .add_trading_day(monday)
        .add_trading_day(tuesday)
        // Monday's workbook exists but carries only the 40000 strike.
        .add_daily_oi(
            monday,
            vec![daily_oi_balance(monday, "2602", OptionType::Call, 40000, 600, 20, 15)],
            vec![],
        )
        .add_daily_oi(
            tuesday,
            vec![
                daily_oi_balance(tuesday, "2602", OptionType::Call, 40000, 620, 20, 10),
                daily_oi_balance(tuesday, "2602", OptionType::Put, 39000, 1200, 150, 80),
            ],
            vec![],
        );

    let session = session(source);
    let week = &session.available_weeks().await.unwrap()[0];

    let rows = session
        .load_option_weekly_data(week, "2602", &SessionSelector::All, None)
        .await
        .unwrap();

    let put = &rows.iter().find(|r| r.strike_price == 39000).unwrap().put;
    assert_eq!(put.daily_oi.get(&tuesday), Some(&1200));
    // No synthetic Monday entry: the strike was genuinely absent that day.
    assert_eq!(put.daily_oi.get(&monday), None);
    assert_eq!(put.daily_oi_change.get(&monday), None);
}

/// A directly-observed day is never replaced by a derived one, even when
/// the next day's restatement disagrees with it.
#[tokio::test]
async fn backfill_never_overwrites_an_observed_record() {
    let monday = date(2026, 2, 2);
    let tuesday = date(2026, 2, 3);

    let mut source = FixtureSource::new();
    source
        .add_oi_date(date(2026, 1, 30))
        .add_trading_day(monday)
        .add_trading_day(tuesday)
        .add_daily_oi(
            monday,
            vec![daily_oi_balance(monday, "2602", OptionType::Put, 39000, 990, 10, 40)],
            vec![],
        )
        .add_daily_oi(
            tuesday,
            vec![daily_oi_balance(tuesday, "2602", OptionType::Put, 39000, 1200, 150, 80)],
            vec![],
        );

    let session = session(source);
    let week = &session.available_weeks().await.unwrap()[0];

    let rows = session
        .load_option_weekly_data(week, "2602", &SessionSelector::All, None)
        .await
        .unwrap();

    let put = &rows[0].put;
    assert_eq!(put.daily_oi.get(&monday), Some(&990));
    assert_eq!(put.daily_oi_change.get(&monday), Some(&10));
    assert_eq!(put.daily_reported_volume.get(&monday), Some(&40));
}

/// The JPX-reported aggregate volume and the participant-summed volume are
/// both kept; they legitimately disagree.
#[tokio::test]
async fn reported_and_summed_volumes_are_kept_separately() {
    let td = date(2026, 2, 2);
    let mut source = FixtureSource::new();
    source
        .add_oi_date(date(2026, 1, 30))
        .add_volume_file(
            td,
            SessionKey::WholeDay,
            vec![],
            vec![option_volume(td, OptionType::Call, 40000, "2602", "11111", 55.0)],
        )
        .add_daily_oi(
            td,
            vec![daily_oi_balance(td, "2602", OptionType::Call, 40000, 2000, -25, 90)],
            vec![],
        );

    let session = session(source);
    let week = &session.available_weeks().await.unwrap()[0];

    let rows = session
        .load_option_weekly_data(week, "2602", &SessionSelector::All, None)
        .await
        .unwrap();

    let call = &rows[0].call;
    assert_eq!(call.daily_volumes.get(&td), Some(&55.0));
    assert_eq!(call.daily_reported_volume.get(&td), Some(&90));
    assert_eq!(call.daily_oi_change.get(&td), Some(&-25));
}

/// Contract months come from the option OI snapshots bounding the week.
#[tokio::test]
async fn option_contract_months_enumerate_from_snapshots() {
    let mut source = FixtureSource::new();
    source
        .add_option_oi_file(
            date(2026, 1, 30),
            vec![
                option_oi(date(2026, 1, 30), OptionType::Put, 39000, "2602", "11111", Some(10.0), None),
                option_oi(date(2026, 1, 30), OptionType::Call, 40000, "2603", "11111", Some(10.0), None),
            ],
        )
        .add_trading_day(date(2026, 2, 2));

    let session = session(source);
    let week = &session.available_weeks().await.unwrap()[0];

    let months = session.available_option_contract_months(week).await.unwrap();
    assert_eq!(months, vec!["2602".to_string(), "2603".to_string()]);
}
