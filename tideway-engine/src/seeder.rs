//! Seeders: warming the cache from a system-of-record.
//!
//! A seeder enumerates the source in the same direction as the engine and
//! feeds what it finds through the seed-mode admission path, then records
//! what it learned about the collection's edges as boundary markers or
//! coverage watermarks. Partial seeds that abort leave a consistent but
//! under-filled index and set no marker, so the next seeding check fires
//! again.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tideway_core::{CacheItem, Direction, ScoreSource, SeedError, TidewayResult, TimeError};
use tideway_store::{Marker, StoreBackend};

use crate::page::Mode;
use crate::paginate::Paginator;
use crate::timeline::{GapInterval, Timeline};

/// A system-of-record the seeders can enumerate.
///
/// Any store supporting ordered scans with strict `>` / `<` on the sort
/// field and a filter predicate can implement this; the associated
/// `Filter` type carries the domain query.
#[async_trait]
pub trait RecordSource<T: CacheItem>: Send + Sync {
    /// Domain filter narrowing which records belong to a collection.
    type Filter: Send + Sync;

    /// Look up a single record by rid.
    async fn find_by_rid(&self, rid: &str) -> Result<Option<T>, SeedError>;

    /// Up to `limit` records matching `filter`, ordered by the sort field
    /// under `direction`, strictly beyond `anchor`'s sort value when an
    /// anchor is given.
    async fn scan(
        &self,
        filter: &Self::Filter,
        anchor: Option<&T>,
        direction: Direction,
        limit: u64,
    ) -> Result<Vec<T>, SeedError>;

    /// Records whose sort instant lies within `[lower, upper]`, ordered
    /// under `direction`.
    async fn scan_time_range(
        &self,
        filter: &Self::Filter,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
        direction: Direction,
    ) -> Result<Vec<T>, SeedError>;
}

// ============================================================================
// PAGINATION SEEDER
// ============================================================================

/// Seeder for [`Paginator`] collections.
pub struct PageSeeder<T, B, S> {
    source: S,
    paginator: Paginator<T, B>,
}

impl<T, B, S> PageSeeder<T, B, S>
where
    T: CacheItem,
    B: StoreBackend,
    S: RecordSource<T>,
{
    pub fn new(source: S, paginator: Paginator<T, B>) -> Self {
        Self { source, paginator }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    async fn find_reference(&self, rid: &str) -> TidewayResult<T> {
        self.source
            .find_by_rid(rid)
            .await?
            .ok_or_else(|| SeedError::ReferenceNotFound {
                rid: rid.to_string(),
            }.into())
    }

    /// Fetch one record from the source and store it, without touching
    /// any index.
    pub async fn seed_one(&self, rid: &str) -> TidewayResult<T> {
        let item = self.find_reference(rid).await?;
        self.paginator.items().set(&item).await?;
        Ok(item)
    }

    /// Refill (part of) the current page.
    ///
    /// `subtraction` is how many items the caller already holds from the
    /// page; `valid_last_rid` anchors the scan strictly beyond that
    /// record's sort value. Without an anchor the leading page is seeded.
    /// Terminal markers record what the yield count proved: an empty
    /// leading seed sets `blankpage`, an under-filled leading seed sets
    /// `firstpage`, and an anchored seed that ran dry sets `lastpage`.
    ///
    /// Returns the number of records yielded by the source.
    pub async fn seed_partial(
        &self,
        subtraction: u64,
        valid_last_rid: Option<&str>,
        filter: &S::Filter,
        params: &[&str],
    ) -> TidewayResult<u64> {
        let per_page = self.paginator.config().items_per_page;
        let direction = self.paginator.config().direction;

        let anchor = match valid_last_rid {
            None | Some("") => None,
            Some(rid) => Some(self.find_reference(rid).await?),
        };
        let first_page = anchor.is_none();
        let limit = if !first_page && subtraction > 0 {
            per_page.saturating_sub(subtraction)
        } else {
            per_page
        };

        let yielded = self
            .source
            .scan(filter, anchor.as_ref(), direction, limit)
            .await?;
        let count = yielded.len() as u64;

        for item in &yielded {
            self.paginator.items().set(item).await?;
            self.paginator.add_item(item, params, Mode::Seed).await?;
        }

        let markers = self.paginator.markers();
        if first_page && count == 0 {
            markers.set(params, Marker::BlankPage).await?;
        } else if first_page && count < per_page {
            markers.set(params, Marker::FirstPage).await?;
        } else if !first_page && subtraction + count < per_page {
            markers.set(params, Marker::LastPage).await?;
        }

        tracing::debug!(count, first_page, "partial seed finished");
        Ok(count)
    }

    /// Seed the entire collection, unbounded.
    pub async fn seed_all(&self, filter: &S::Filter, params: &[&str]) -> TidewayResult<u64> {
        let direction = self.paginator.config().direction;
        let yielded = self.source.scan(filter, None, direction, u64::MAX).await?;
        for item in &yielded {
            self.paginator.items().set(item).await?;
            self.paginator.add_item(item, params, Mode::Seed).await?;
        }
        Ok(yielded.len() as u64)
    }
}

// ============================================================================
// TIMELINE SEEDER
// ============================================================================

/// Seeder for [`Timeline`] collections.
pub struct TimelineSeeder<T, B, S> {
    source: S,
    timeline: Timeline<T, B>,
}

impl<T, B, S> TimelineSeeder<T, B, S>
where
    T: CacheItem,
    B: StoreBackend,
    S: RecordSource<T>,
{
    pub fn new(source: S, timeline: Timeline<T, B>) -> Self {
        Self { source, timeline }
    }

    /// Seed the entire collection, unbounded.
    pub async fn seed_all(&self, filter: &S::Filter, params: &[&str]) -> TidewayResult<u64> {
        let yielded = self
            .source
            .scan(filter, None, self.timeline.direction(), u64::MAX)
            .await?;
        for item in &yielded {
            self.timeline.items().set(item).await?;
            self.timeline.ingest(item, params, Mode::Seed).await?;
        }
        Ok(yielded.len() as u64)
    }

    /// Backfill the given gap intervals, extending the coverage
    /// watermarks to the widest interval actually fetched. Watermarks are
    /// written only when the fetched records widen them.
    pub async fn seed_time_ranges(
        &self,
        filter: &S::Filter,
        params: &[&str],
        ranges: &[GapInterval],
    ) -> TidewayResult<u64> {
        let cached_earliest = self.timeline.watermarks().earliest(params).await?;
        let cached_latest = self.timeline.watermarks().latest(params).await?;

        let mut fetched_earliest: Option<DateTime<Utc>> = None;
        let mut fetched_latest: Option<DateTime<Utc>> = None;
        let mut total = 0u64;

        for (lower, upper) in ranges {
            let yielded = self
                .source
                .scan_time_range(filter, *lower, *upper, self.timeline.direction())
                .await?;

            for item in &yielded {
                let instant = self.sort_instant(item)?;
                if fetched_earliest.is_none_or(|t| instant < t) {
                    fetched_earliest = Some(instant);
                }
                if fetched_latest.is_none_or(|t| instant > t) {
                    fetched_latest = Some(instant);
                }

                self.timeline.items().set(item).await?;
                self.timeline.ingest(item, params, Mode::Seed).await?;
                total += 1;
            }
        }

        if let Some(t) = fetched_earliest {
            if cached_earliest.is_none_or(|c| t < c) {
                self.timeline.watermarks().set_earliest(params, t).await?;
            }
        }
        if let Some(t) = fetched_latest {
            if cached_latest.is_none_or(|c| t > c) {
                self.timeline.watermarks().set_latest(params, t).await?;
            }
        }

        tracing::debug!(total, ranges = ranges.len(), "time-range seed finished");
        Ok(total)
    }

    fn sort_instant(&self, item: &T) -> TidewayResult<DateTime<Utc>> {
        let millis = self.timeline.score_of(item)?;
        DateTime::from_timestamp_millis(millis as i64).ok_or_else(|| {
            TimeError::Parse {
                value: millis.to_string(),
            }
            .into()
        })
    }
}

// ============================================================================
// IN-MEMORY SOURCE
// ============================================================================

/// Process-local [`RecordSource`] backed by a vector, used by tests and
/// examples as the reference system-of-record.
pub struct InMemorySource<T> {
    records: RwLock<Vec<T>>,
    score: ScoreSource<T>,
}

impl<T: CacheItem> InMemorySource<T> {
    pub fn new(score: ScoreSource<T>) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            score,
        }
    }

    pub fn insert(&self, item: T) {
        self.records.write().unwrap().push(item);
    }

    fn scored(&self, direction: Direction) -> Result<Vec<(f64, T)>, SeedError> {
        let records = self.records.read().unwrap();
        let mut scored = Vec::with_capacity(records.len());
        for item in records.iter() {
            let score = self.score.extract(item).map_err(|e| SeedError::Source {
                reason: e.to_string(),
            })?;
            scored.push((score, item.clone()));
        }
        scored.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.rand_id().cmp(b.1.rand_id()))
        });
        if direction.is_descending() {
            scored.reverse();
        }
        Ok(scored)
    }
}

#[async_trait]
impl<T: CacheItem> RecordSource<T> for InMemorySource<T> {
    type Filter = ();

    async fn find_by_rid(&self, rid: &str) -> Result<Option<T>, SeedError> {
        Ok(self
            .records
            .read()
            .unwrap()
            .iter()
            .find(|item| item.rand_id() == rid)
            .cloned())
    }

    async fn scan(
        &self,
        _filter: &Self::Filter,
        anchor: Option<&T>,
        direction: Direction,
        limit: u64,
    ) -> Result<Vec<T>, SeedError> {
        let anchor_score = match anchor {
            None => None,
            Some(reference) => {
                Some(self.score.extract(reference).map_err(|e| SeedError::Source {
                    reason: e.to_string(),
                })?)
            }
        };

        let beyond = |score: f64| match (anchor_score, direction) {
            (None, _) => true,
            (Some(a), Direction::Descending) => score < a,
            (Some(a), Direction::Ascending) => score > a,
        };

        Ok(self
            .scored(direction)?
            .into_iter()
            .filter(|(score, _)| beyond(*score))
            .take(limit.min(usize::MAX as u64) as usize)
            .map(|(_, item)| item)
            .collect())
    }

    async fn scan_time_range(
        &self,
        _filter: &Self::Filter,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
        direction: Direction,
    ) -> Result<Vec<T>, SeedError> {
        let lo = lower.timestamp_millis() as f64;
        let hi = upper.timestamp_millis() as f64;
        Ok(self
            .scored(direction)?
            .into_iter()
            .filter(|(score, _)| *score >= lo && *score <= hi)
            .map(|(_, item)| item)
            .collect())
    }
}
