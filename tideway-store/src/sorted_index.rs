//! Per-collection sorted index over the store's sorted-set primitives.

use std::sync::Arc;
use std::time::Duration;

use tideway_core::{Direction, StoreError, TidewayResult, DEFAULT_INDEX_TTL};

use crate::backend::StoreBackend;
use crate::key::KeyFormat;

/// Thin wrapper on the store's sorted sets, keyed by a parameterized
/// format. Members are item rids; scores are monotone doubles.
///
/// Every successful operation extends the index TTL, so an index in
/// active use never expires while idle ones fall away.
pub struct SortedIndex<B> {
    backend: Arc<B>,
    key_format: KeyFormat,
    ttl: Duration,
}

impl<B> Clone for SortedIndex<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            key_format: self.key_format.clone(),
            ttl: self.ttl,
        }
    }
}

impl<B: StoreBackend> SortedIndex<B> {
    pub fn new(backend: Arc<B>, key_format: impl Into<KeyFormat>) -> Self {
        Self {
            backend,
            key_format: key_format.into(),
            ttl: DEFAULT_INDEX_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The index key for a parameter tuple.
    pub fn key(&self, params: &[&str]) -> String {
        self.key_format.render(params)
    }

    /// TTL applied to the index and everything co-located with it.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn touch(&self, key: &str) -> TidewayResult<()> {
        self.backend.expire(key, self.ttl).await?;
        Ok(())
    }

    /// Insert or rescore a member.
    pub async fn add(&self, params: &[&str], score: f64, rid: &str) -> TidewayResult<()> {
        let key = self.key(params);
        self.backend.zadd(&key, rid, score).await?;
        self.touch(&key).await
    }

    /// Remove a member.
    pub async fn remove(&self, params: &[&str], rid: &str) -> TidewayResult<()> {
        let key = self.key(params);
        self.backend.zrem(&key, rid).await?;
        self.touch(&key).await
    }

    /// Number of members. Store errors propagate; an unreachable index is
    /// not an empty one.
    pub async fn cardinality(&self, params: &[&str]) -> TidewayResult<u64> {
        let key = self.key(params);
        let total = self.backend.zcard(&key).await?;
        self.touch(&key).await?;
        Ok(total)
    }

    /// Lowest score in the set. Fails with `EmptySet` when empty.
    pub async fn lowest(&self, params: &[&str]) -> TidewayResult<f64> {
        self.score_at(params, 0).await
    }

    /// Highest score in the set. Fails with `EmptySet` when empty.
    pub async fn highest(&self, params: &[&str]) -> TidewayResult<f64> {
        self.score_at(params, -1).await
    }

    async fn score_at(&self, params: &[&str], rank: i64) -> TidewayResult<f64> {
        let key = self.key(params);
        let score = self.backend.zscore_by_rank(&key, rank).await?;
        self.touch(&key).await?;
        score.ok_or_else(|| StoreError::EmptySet.into())
    }

    /// Rank of a member under the configured direction, or `None` when
    /// absent.
    pub async fn rank(
        &self,
        params: &[&str],
        rid: &str,
        direction: Direction,
    ) -> TidewayResult<Option<u64>> {
        let key = self.key(params);
        let rank = self
            .backend
            .zrank(&key, rid, direction.is_descending())
            .await?;
        self.touch(&key).await?;
        Ok(rank)
    }

    /// Members between the inclusive ranks `start` and `stop`, ordered by
    /// direction.
    pub async fn range_by_rank(
        &self,
        params: &[&str],
        start: i64,
        stop: i64,
        direction: Direction,
    ) -> TidewayResult<Vec<String>> {
        let key = self.key(params);
        let rids = self
            .backend
            .zrange(&key, start, stop, direction.is_descending())
            .await?;
        self.touch(&key).await?;
        Ok(rids)
    }

    /// Members whose score lies within `[lo, hi]`, ordered by direction.
    pub async fn range_by_score(
        &self,
        params: &[&str],
        lo: f64,
        hi: f64,
        direction: Direction,
    ) -> TidewayResult<Vec<String>> {
        let key = self.key(params);
        let rids = self
            .backend
            .zrange_by_score(&key, lo, hi, direction.is_descending())
            .await?;
        self.touch(&key).await?;
        Ok(rids)
    }

    /// Drop the index key entirely.
    pub async fn purge(&self, params: &[&str]) -> TidewayResult<()> {
        self.backend.del(&self.key(params)).await?;
        Ok(())
    }
}
