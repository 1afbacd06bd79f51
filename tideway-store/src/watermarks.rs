//! Coverage watermarks for time-range listings.
//!
//! Two strings per index bracket the widest interval the cache is known
//! to cover. Seeders extend them; the gap computation reads them to
//! decide what still needs backfilling.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tideway_core::{TidewayResult, TimeError, DEFAULT_INDEX_TTL};

use crate::backend::StoreBackend;
use crate::key::KeyFormat;

pub const MOST_RECENT_SUFFIX: &str = ":mostrecenttime";
pub const MOST_EARLIEST_SUFFIX: &str = ":mostearliesttime";

/// The (earliest, latest) coverage bounds of a time-range index.
pub struct CoverageWatermarks<B> {
    backend: Arc<B>,
    index_format: KeyFormat,
    ttl: Duration,
}

impl<B> Clone for CoverageWatermarks<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            index_format: self.index_format.clone(),
            ttl: self.ttl,
        }
    }
}

impl<B: StoreBackend> CoverageWatermarks<B> {
    pub fn new(backend: Arc<B>, index_format: impl Into<KeyFormat>) -> Self {
        Self {
            backend,
            index_format: index_format.into(),
            ttl: DEFAULT_INDEX_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn key(&self, params: &[&str], suffix: &str) -> String {
        let mut key = self.index_format.render(params);
        key.push_str(suffix);
        key
    }

    async fn read(&self, key: &str) -> TidewayResult<Option<DateTime<Utc>>> {
        let Some(raw) = self.backend.get(key).await? else {
            return Ok(None);
        };
        let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|_| TimeError::Parse {
            value: raw.clone(),
        })?;
        Ok(Some(parsed.with_timezone(&Utc)))
    }

    async fn write(&self, key: &str, t: DateTime<Utc>) -> TidewayResult<()> {
        let value = t.to_rfc3339_opts(SecondsFormat::Nanos, true);
        self.backend.set(key, &value, self.ttl).await?;
        Ok(())
    }

    /// Latest instant the cache is known to cover.
    pub async fn latest(&self, params: &[&str]) -> TidewayResult<Option<DateTime<Utc>>> {
        self.read(&self.key(params, MOST_RECENT_SUFFIX)).await
    }

    /// Earliest instant the cache is known to cover.
    pub async fn earliest(&self, params: &[&str]) -> TidewayResult<Option<DateTime<Utc>>> {
        self.read(&self.key(params, MOST_EARLIEST_SUFFIX)).await
    }

    pub async fn set_latest(&self, params: &[&str], t: DateTime<Utc>) -> TidewayResult<()> {
        self.write(&self.key(params, MOST_RECENT_SUFFIX), t).await
    }

    pub async fn set_earliest(&self, params: &[&str], t: DateTime<Utc>) -> TidewayResult<()> {
        self.write(&self.key(params, MOST_EARLIEST_SUFFIX), t).await
    }

    /// Drop both watermarks.
    pub async fn clear(&self, params: &[&str]) -> TidewayResult<()> {
        self.backend
            .del(&self.key(params, MOST_RECENT_SUFFIX))
            .await?;
        self.backend
            .del(&self.key(params, MOST_EARLIEST_SUFFIX))
            .await?;
        Ok(())
    }
}
