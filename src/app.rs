use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::jpx::client::JpxClient;

/// Build the trading calendar from the live indexes and report the
/// available analysis weeks.
pub async fn run(config: Config) -> Result<()> {
    info!("JPX participant flow reconciliation");
    info!("================================");
    info!("Cache dir: {}", config.cache_dir.display());
    info!("Target products: {:?}", config.target_products);

    let client = JpxClient::new(&config)?;
    let calendar = crate::calendar::TradingCalendar::load(&client).await?;

    info!(
        "Calendar: {} trading dates, {} OI report dates",
        calendar.trading_dates().len(),
        calendar.oi_dates().len()
    );

    for week in calendar.weeks(config.max_weeks) {
        info!(
            "Week {}: {} trading days{}",
            week.label,
            week.trading_days.len(),
            if week.is_in_progress() { " (awaiting OI snapshot)" } else { "" }
        );
    }

    Ok(())
}
