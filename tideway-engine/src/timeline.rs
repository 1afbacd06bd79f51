//! Time-ordered listing: whole-range and interval fetches with coverage
//! watermarks.
//!
//! Where the paginator serves a cursor-chased window, the timeline serves
//! arbitrary time intervals. Two watermarks bracket the interval the
//! cache is known to cover; the gap computation tells a seeder exactly
//! what still needs backfilling.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tideway_core::{
    CacheItem, Direction, ScoreSource, TidewayResult, DEFAULT_INDEX_TTL, DEFAULT_ITEM_TTL,
};
use tideway_store::{
    CoverageWatermarks, ItemStore, KeyFormat, Marker, PageMarkers, SortedIndex, StoreBackend,
};

use crate::page::Mode;

/// An interval of time the cache does not cover yet.
pub type GapInterval = (DateTime<Utc>, DateTime<Utc>);

/// Time-ordered listing engine over one parameterized collection family.
pub struct Timeline<T, B> {
    items: ItemStore<T, B>,
    index: SortedIndex<B>,
    markers: PageMarkers<B>,
    watermarks: CoverageWatermarks<B>,
    direction: Direction,
    score: ScoreSource<T>,
}

impl<T: CacheItem, B: StoreBackend> Clone for Timeline<T, B> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            index: self.index.clone(),
            markers: self.markers.clone(),
            watermarks: self.watermarks.clone(),
            direction: self.direction,
            score: self.score.clone(),
        }
    }
}

impl<T, B> Timeline<T, B>
where
    T: CacheItem,
    B: StoreBackend,
{
    /// Build a timeline over `backend`. Scores default to creation time
    /// regardless of direction.
    pub fn new(
        backend: Arc<B>,
        item_format: impl Into<KeyFormat>,
        index_format: impl Into<KeyFormat>,
        direction: Direction,
    ) -> Self {
        let index_format = index_format.into();
        Self {
            items: ItemStore::new(Arc::clone(&backend), item_format).with_ttl(DEFAULT_ITEM_TTL),
            index: SortedIndex::new(Arc::clone(&backend), index_format.clone())
                .with_ttl(DEFAULT_INDEX_TTL),
            markers: PageMarkers::new(Arc::clone(&backend), index_format.clone())
                .with_ttl(DEFAULT_INDEX_TTL),
            watermarks: CoverageWatermarks::new(backend, index_format).with_ttl(DEFAULT_INDEX_TTL),
            direction,
            score: ScoreSource::ByCreatedAt,
        }
    }

    /// Override the score source.
    pub fn with_score_source(mut self, score: ScoreSource<T>) -> Self {
        self.score = score;
        self
    }

    /// Override the item-record TTL.
    pub fn with_item_ttl(mut self, ttl: Duration) -> Self {
        self.items = self.items.with_ttl(ttl);
        self
    }

    /// Override the index/marker/watermark TTL.
    pub fn with_index_ttl(mut self, ttl: Duration) -> Self {
        self.index = self.index.with_ttl(ttl);
        self.markers = self.markers.with_ttl(ttl);
        self.watermarks = self.watermarks.with_ttl(ttl);
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn items(&self) -> &ItemStore<T, B> {
        &self.items
    }

    pub fn index(&self) -> &SortedIndex<B> {
        &self.index
    }

    pub fn markers(&self) -> &PageMarkers<B> {
        &self.markers
    }

    pub fn watermarks(&self) -> &CoverageWatermarks<B> {
        &self.watermarks
    }

    /// Extract the configured score for an item.
    pub fn score_of(&self, item: &T) -> TidewayResult<f64> {
        Ok(self.score.extract(item)?)
    }

    /// Admit an item into the listing index.
    ///
    /// Same bootstrap protection as pagination, without page-boundary
    /// markers: only a standing `blankpage` assertion is cleared on live
    /// insertion.
    pub async fn ingest(&self, item: &T, params: &[&str], mode: Mode) -> TidewayResult<()> {
        let score = self.score.extract(item)?;
        if mode == Mode::Seed {
            return self.index.add(params, score, item.rand_id()).await;
        }

        if self.markers.is_set(params, Marker::BlankPage).await? {
            self.markers.clear(params, Marker::BlankPage).await?;
        }

        if self.index.cardinality(params).await? == 0 {
            tracing::debug!(
                rid = item.rand_id(),
                "live ingest skipped: index is unseeded"
            );
            return Ok(());
        }

        self.index.add(params, score, item.rand_id()).await
    }

    /// Remove an item from the listing index.
    pub async fn remove_item(&self, item: &T, params: &[&str]) -> TidewayResult<()> {
        self.index.remove(params, item.rand_id()).await
    }

    /// The entire collection in direction order, stale members skipped.
    pub async fn fetch_all(&self, params: &[&str]) -> TidewayResult<Vec<T>> {
        let rids = self
            .index
            .range_by_rank(params, 0, -1, self.direction)
            .await?;
        self.load(&rids).await
    }

    /// Members whose score instant lies within `[lower, upper]`, in
    /// direction order, stale members skipped.
    pub async fn fetch_by_time_range(
        &self,
        params: &[&str],
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
    ) -> TidewayResult<Vec<T>> {
        let rids = self
            .index
            .range_by_score(
                params,
                lower.timestamp_millis() as f64,
                upper.timestamp_millis() as f64,
                self.direction,
            )
            .await?;
        self.load(&rids).await
    }

    async fn load(&self, rids: &[String]) -> TidewayResult<Vec<T>> {
        let mut items = Vec::with_capacity(rids.len());
        for rid in rids {
            if let Some(item) = self.items.get(rid).await? {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Which intervals of `[lower, upper]` the cache cannot serve yet.
    ///
    /// Computed against the stored coverage watermarks: an empty cache
    /// yields the whole query; a query overhanging one edge yields the
    /// overhang; a query overhanging both edges yields both; a fully
    /// covered query yields nothing.
    pub async fn require_seeding_time_range(
        &self,
        params: &[&str],
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
    ) -> TidewayResult<Vec<GapInterval>> {
        let earliest = self.watermarks.earliest(params).await?;
        let latest = self.watermarks.latest(params).await?;

        let (Some(covered_lo), Some(covered_hi)) = (earliest, latest) else {
            return Ok(vec![(lower, upper)]);
        };

        let mut gaps = Vec::new();
        let upper_inside = upper >= covered_lo && upper <= covered_hi;
        let lower_inside = lower >= covered_lo && lower <= covered_hi;

        if upper_inside && lower < covered_lo {
            gaps.push((lower, covered_lo));
        } else if lower_inside && upper > covered_hi {
            gaps.push((covered_hi, upper));
        } else if lower < covered_lo && upper > covered_hi {
            gaps.push((lower, covered_lo));
            gaps.push((covered_hi, upper));
        }
        Ok(gaps)
    }
}
