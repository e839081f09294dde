//! JPX endpoint paths and reconciliation defaults.

/// Base URL for all JPX automation endpoints.
pub const JPX_BASE_URL: &str = "https://www.jpx.co.jp";

/// Monthly list of available daily-volume index files.
pub const VOLUME_MONTHLY_LIST_PATH: &str =
    "/automation/markets/derivatives/participant-volume/json/participant-volume_monthlylist.json";

/// Per-month daily-volume index. `{yyyymm}` is substituted.
pub const VOLUME_INDEX_PATH_TEMPLATE: &str =
    "/automation/markets/derivatives/participant-volume/json/participant_volume_{yyyymm}.json";

/// Year list of weekly open-interest index files.
pub const OI_YEAR_LIST_PATH: &str =
    "/automation/markets/derivatives/open-interest/json/open_interest_yearlist.json";

/// Daily aggregate OI balance workbook. `{yyyymmdd}` is substituted.
/// English version for stable parsing.
pub const DAILY_OI_URL_TEMPLATE: &str =
    "https://www.jpx.co.jp/markets/derivatives/trading-volume/tvdivq00000014nn-att/{yyyymmdd}open_interest.xlsx";

// Cache subdirectories, one per file family.
pub const CACHE_INDEX_SUBDIR: &str = "index";
pub const CACHE_VOLUME_SUBDIR: &str = "volume";
pub const CACHE_OI_SUBDIR: &str = "oi";
pub const CACHE_DAILY_OI_SUBDIR: &str = "daily_oi";

/// JSON indexes are republished intraday; keep them fresh.
pub const INDEX_CACHE_MAX_AGE_HOURS: f64 = 1.0;
/// Published workbooks are immutable once up; a week of freshness is plenty.
pub const EXCEL_CACHE_MAX_AGE_HOURS: f64 = 168.0;

/// Trailing window length for per-participant volume statistics.
pub const TRAILING_STATS_DAYS: usize = 20;

/// Default cap on the number of analysis weeks enumerated.
pub const DEFAULT_MAX_WEEKS: usize = 26;

/// Futures products tracked by default.
pub const DEFAULT_TARGET_PRODUCTS: [&str; 2] = ["NK225F", "TOPIXF"];
