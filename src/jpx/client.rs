//! HTTPS client for the JPX index and workbook endpoints.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::constants::{
    CACHE_DAILY_OI_SUBDIR, CACHE_INDEX_SUBDIR, CACHE_OI_SUBDIR, CACHE_VOLUME_SUBDIR,
    DAILY_OI_URL_TEMPLATE, EXCEL_CACHE_MAX_AGE_HOURS, INDEX_CACHE_MAX_AGE_HOURS,
    OI_YEAR_LIST_PATH, VOLUME_INDEX_PATH_TEMPLATE, VOLUME_MONTHLY_LIST_PATH,
};
use crate::error::{Error, Result};
use crate::jpx::cache::FileCache;
use crate::jpx::index::{IndexTable, MonthEntry, OiIndexEntry, OiYearEntry, VolumeIndexEntry};
use crate::jpx::traits::FileIndexSource;

pub struct JpxClient {
    http: HttpClient,
    base_url: String,
    cache: FileCache,
}

impl JpxClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        // A bad override fails loudly here, not as a 404 storm later.
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)?;

        Ok(Self {
            http,
            base_url,
            cache: FileCache::new(&config.cache_dir),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(Error::Http(format!("HTTP {} for {}", resp.status(), url)));
        }
        Ok(resp.bytes().await?.to_vec())
    }

    /// Fetch a JSON index with freshness caching.
    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        if let Some(cached) = self
            .cache
            .get(CACHE_INDEX_SUBDIR, url, INDEX_CACHE_MAX_AGE_HOURS)
            .await
        {
            if let Ok(parsed) = serde_json::from_slice(&cached) {
                return Ok(parsed);
            }
            debug!("Discarding unparseable cached index for {}", url);
        }

        let content = self.download(url).await?;
        let parsed = serde_json::from_slice(&content)?;
        self.cache.put(CACHE_INDEX_SUBDIR, url, &content).await?;
        Ok(parsed)
    }

    /// Fetch a workbook with freshness caching.
    async fn fetch_excel(&self, subdir: &str, url: &str) -> Result<Vec<u8>> {
        if let Some(cached) = self.cache.get(subdir, url, EXCEL_CACHE_MAX_AGE_HOURS).await {
            return Ok(cached);
        }
        let content = self.download(url).await?;
        self.cache.put(subdir, url, &content).await?;
        Ok(content)
    }
}

#[async_trait]
impl FileIndexSource for JpxClient {
    async fn volume_months(&self) -> Result<Vec<String>> {
        let table: IndexTable<MonthEntry> =
            self.fetch_json(&self.url(VOLUME_MONTHLY_LIST_PATH)).await?;
        Ok(table.rows.into_iter().map(|e| e.month).collect())
    }

    async fn volume_index(&self, yyyymm: &str) -> Result<Vec<VolumeIndexEntry>> {
        let path = VOLUME_INDEX_PATH_TEMPLATE.replace("{yyyymm}", yyyymm);
        let table: IndexTable<VolumeIndexEntry> = self.fetch_json(&self.url(&path)).await?;
        // Published newest first; callers want chronological order.
        let mut rows = table.rows;
        rows.reverse();
        Ok(rows)
    }

    async fn oi_years(&self) -> Result<Vec<OiYearEntry>> {
        let table: IndexTable<OiYearEntry> = self.fetch_json(&self.url(OI_YEAR_LIST_PATH)).await?;
        Ok(table.rows)
    }

    async fn oi_index(&self, year: &str) -> Result<Vec<OiIndexEntry>> {
        let years = self.oi_years().await?;
        let entry = years
            .iter()
            .find(|y| y.year == year)
            .ok_or_else(|| Error::NotFound(format!("No OI index for year {}", year)))?;

        let table: IndexTable<OiIndexEntry> =
            self.fetch_json(&self.url(&entry.json_file)).await?;
        let mut rows = table.rows;
        rows.reverse();
        Ok(rows)
    }

    async fn fetch_volume_file(&self, path: &str) -> Result<Vec<u8>> {
        self.fetch_excel(CACHE_VOLUME_SUBDIR, &self.url(path)).await
    }

    async fn fetch_oi_file(&self, path: &str) -> Result<Vec<u8>> {
        self.fetch_excel(CACHE_OI_SUBDIR, &self.url(path)).await
    }

    async fn fetch_daily_oi_file(&self, date: NaiveDate) -> Result<Option<Vec<u8>>> {
        let url = DAILY_OI_URL_TEMPLATE.replace("{yyyymmdd}", &date.format("%Y%m%d").to_string());

        if let Some(cached) = self
            .cache
            .get(CACHE_DAILY_OI_SUBDIR, &url, EXCEL_CACHE_MAX_AGE_HOURS)
            .await
        {
            return Ok(Some(cached));
        }

        let resp = self.http.get(&url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("Daily OI file not published for {}", date);
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Error::Http(format!("HTTP {} for {}", resp.status(), url)));
        }

        let content = resp.bytes().await?.to_vec();
        self.cache.put(CACHE_DAILY_OI_SUBDIR, &url, &content).await?;
        Ok(Some(content))
    }
}
