use std::path::PathBuf;

use crate::constants::{DEFAULT_MAX_WEEKS, DEFAULT_TARGET_PRODUCTS, JPX_BASE_URL};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for the local file cache.
    pub cache_dir: PathBuf,
    /// Base URL for JPX endpoints (overridable for mirrors/tests).
    pub base_url: String,
    /// Futures products to analyze.
    pub target_products: Vec<String>,
    /// Cap on the number of weeks enumerated for analysis.
    pub max_weeks: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let cache_dir = std::env::var("TEGUCHI_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("cache"));

        let base_url =
            std::env::var("TEGUCHI_BASE_URL").unwrap_or_else(|_| JPX_BASE_URL.to_string());

        let target_products = match std::env::var("TEGUCHI_PRODUCTS") {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => DEFAULT_TARGET_PRODUCTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        let max_weeks = match std::env::var("TEGUCHI_MAX_WEEKS") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("TEGUCHI_MAX_WEEKS is not a number: {}", raw)))?,
            Err(_) => DEFAULT_MAX_WEEKS,
        };

        Ok(Config {
            cache_dir,
            base_url,
            target_products,
            max_weeks,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            base_url: JPX_BASE_URL.to_string(),
            target_products: DEFAULT_TARGET_PRODUCTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_weeks: DEFAULT_MAX_WEEKS,
        }
    }
}
