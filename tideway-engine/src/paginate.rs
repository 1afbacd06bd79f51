//! Cursor-chase pagination over a cached window.
//!
//! The paginator maintains a bounded window of the leading page(s) of a
//! collection. It is not a full mirror: it holds what it was last seeded
//! with, admits live writes only when the admission contract permits, and
//! tolerates item records that expired ahead of their index entries.

use std::sync::Arc;

use tideway_core::{CacheItem, Direction, EngineConfig, ScoreSource, TidewayResult};
use tideway_store::{ItemStore, KeyFormat, Marker, PageMarkers, SortedIndex, StoreBackend};

use crate::page::{Mode, Page, PagePosition};

/// Pagination engine over one parameterized collection family.
pub struct Paginator<T, B> {
    items: ItemStore<T, B>,
    index: SortedIndex<B>,
    markers: PageMarkers<B>,
    config: EngineConfig,
    score: ScoreSource<T>,
}

impl<T: CacheItem, B: StoreBackend> Clone for Paginator<T, B> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            index: self.index.clone(),
            markers: self.markers.clone(),
            config: self.config.clone(),
            score: self.score.clone(),
        }
    }
}

impl<T, B> Paginator<T, B>
where
    T: CacheItem,
    B: StoreBackend,
{
    /// Build a paginator over `backend`.
    ///
    /// `item_format` is substituted with an item's rid; `index_format`
    /// with the collection parameter tuple. Scores default to the
    /// direction's clue field (creation time when descending, update time
    /// when ascending).
    pub fn new(
        backend: Arc<B>,
        item_format: impl Into<KeyFormat>,
        index_format: impl Into<KeyFormat>,
        config: EngineConfig,
    ) -> Self {
        let index_format = index_format.into();
        Self {
            items: ItemStore::new(Arc::clone(&backend), item_format).with_ttl(config.item_ttl),
            index: SortedIndex::new(Arc::clone(&backend), index_format.clone())
                .with_ttl(config.index_ttl),
            markers: PageMarkers::new(backend, index_format).with_ttl(config.index_ttl),
            score: ScoreSource::default_for(config.direction),
            config,
        }
    }

    /// Override the score source.
    pub fn with_score_source(mut self, score: ScoreSource<T>) -> Self {
        self.score = score;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The item store this paginator reads through.
    pub fn items(&self) -> &ItemStore<T, B> {
        &self.items
    }

    /// The boundary markers for this collection family.
    pub fn markers(&self) -> &PageMarkers<B> {
        &self.markers
    }

    /// The underlying sorted index.
    pub fn index(&self) -> &SortedIndex<B> {
        &self.index
    }

    /// Admit an item into a collection's index.
    ///
    /// Seed mode inserts unconditionally; it is how loaders backfill.
    /// Live mode applies the admission contract: a standing `blankpage`
    /// assertion is cleared, an unseeded index refuses to bootstrap from
    /// a single write, and items falling beyond the window's far edge are
    /// dropped rather than fabricating a boundary.
    pub async fn add_item(&self, item: &T, params: &[&str], mode: Mode) -> TidewayResult<()> {
        let score = self.score.extract(item)?;
        match mode {
            Mode::Seed => self.index.add(params, score, item.rand_id()).await,
            Mode::Live => self.admit_live(item, params, score).await,
        }
    }

    async fn admit_live(&self, item: &T, params: &[&str], score: f64) -> TidewayResult<()> {
        // New content invalidates a standing "source is empty" assertion.
        if self.markers.is_set(params, Marker::BlankPage).await? {
            self.markers.clear(params, Marker::BlankPage).await?;
        }

        let total = self.index.cardinality(params).await?;
        if total == 0 {
            // A lone write must not masquerade as the entire collection.
            tracing::debug!(
                rid = item.rand_id(),
                "live insert skipped: index is unseeded"
            );
            return Ok(());
        }

        let beyond_window = match self.config.direction {
            Direction::Descending => score < self.index.lowest(params).await?,
            Direction::Ascending => score > self.index.highest(params).await?,
        };
        if beyond_window {
            tracing::debug!(
                rid = item.rand_id(),
                score,
                "live insert dropped: falls beyond the cached window"
            );
            return Ok(());
        }

        if total == self.config.items_per_page
            && self.markers.is_set(params, Marker::FirstPage).await?
        {
            // The window is about to grow beyond the leading page.
            self.markers.clear(params, Marker::FirstPage).await?;
        }

        self.index.add(params, score, item.rand_id()).await
    }

    /// Remove an item from a collection's index.
    ///
    /// Edge markers cannot outlive their members: when the index empties,
    /// `firstpage` and `lastpage` are cleared.
    pub async fn remove_item(&self, item: &T, params: &[&str]) -> TidewayResult<()> {
        self.index.remove(params, item.rand_id()).await?;

        if self.index.cardinality(params).await? == 0 {
            if self.markers.is_set(params, Marker::FirstPage).await? {
                self.markers.clear(params, Marker::FirstPage).await?;
            }
            if self.markers.is_set(params, Marker::LastPage).await? {
                self.markers.clear(params, Marker::LastPage).await?;
            }
        }
        Ok(())
    }

    /// Fetch one page, anchored by a chain of previously returned rids.
    ///
    /// The chain is walked newest to oldest; the first rid whose item
    /// record and index rank both still exist anchors the window at
    /// `rank + 1`. A fully stale chain falls through to the leading page.
    /// Members whose item record has expired are skipped silently.
    pub async fn fetch(&self, params: &[&str], last_rids: &[String]) -> TidewayResult<Page<T>> {
        let per_page = self.config.items_per_page as i64;
        let mut start: i64 = 0;
        let mut stop: i64 = per_page - 1;
        let mut last_rid = String::new();

        for rid in last_rids.iter().rev() {
            if self.items.get(rid).await?.is_none() {
                continue;
            }
            let Some(rank) = self.index.rank(params, rid, self.config.direction).await? else {
                continue;
            };
            last_rid = rid.clone();
            start = rank as i64 + 1;
            stop = start + per_page - 1;
            break;
        }

        let rids = self
            .index
            .range_by_rank(params, start, stop, self.config.direction)
            .await?;

        let mut items = Vec::with_capacity(rids.len());
        for rid in &rids {
            match self.items.get(rid).await? {
                Some(item) => {
                    last_rid = rid.clone();
                    items.push(item);
                }
                // Stale member: the record expired ahead of its index entry.
                None => continue,
            }
        }

        let position = if start == 0 {
            PagePosition::FirstPage
        } else if (rids.len() as u64) < self.config.items_per_page {
            PagePosition::LastPage
        } else {
            PagePosition::MiddlePage
        };

        Ok(Page {
            items,
            last_rid,
            position,
        })
    }

    /// Whether a seeder should run: no boundary marker is set and the
    /// source reports fewer items than one page.
    pub async fn requires_seeding(
        &self,
        params: &[&str],
        total_on_source: u64,
    ) -> TidewayResult<bool> {
        if self.markers.is_set(params, Marker::FirstPage).await?
            || self.markers.is_set(params, Marker::LastPage).await?
            || self.markers.is_set(params, Marker::BlankPage).await?
        {
            return Ok(false);
        }
        Ok(total_on_source < self.config.items_per_page)
    }

    /// Drop the index and all three markers, keeping item records (they
    /// stay reachable by rid until their own TTL expires).
    pub async fn remove_pagination(&self, params: &[&str]) -> TidewayResult<()> {
        self.markers.clear_all(params).await?;
        self.index.purge(params).await
    }

    /// Drop the index, the markers, and every item record reachable
    /// through the index.
    pub async fn purge_pagination(&self, params: &[&str]) -> TidewayResult<()> {
        let rids = self
            .index
            .range_by_rank(params, 0, -1, self.config.direction)
            .await?;
        for rid in &rids {
            self.items.del_by_rid(rid).await?;
        }
        self.remove_pagination(params).await
    }
}
