//! Store backend trait: the Redis-compatible primitive seam.

use std::time::Duration;

use async_trait::async_trait;
use tideway_core::StoreError;

/// Result type for raw backend operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// The primitive operations the engines need from a Redis-compatible
/// key-value / sorted-set store.
///
/// Implementations must be thread-safe; engine instances hold no mutable
/// state of their own and interact only through the backend.
///
/// # Ordering
///
/// Sorted-set members are ordered by score; ties break lexicographically
/// by member, matching sorted-set semantics.
///
/// # Errors
///
/// Absent keys and members are `Ok(None)` / `Ok(false)` where the return
/// type allows it; `StoreError::NotFound` is reserved for operations that
/// require the key to exist. Transport and server failures surface as
/// `StoreError::Backend`.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    // ========================================================================
    // STRINGS
    // ========================================================================

    /// Get a string value, or `None` when the key is absent.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Set a string value with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Delete a key of any kind. Deleting an absent key is not an error.
    async fn del(&self, key: &str) -> StoreResult<()>;

    /// Reset a key's TTL. Returns `false` when the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    // ========================================================================
    // SORTED SETS
    // ========================================================================

    /// Add a member with a score, updating the score if the member exists.
    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()>;

    /// Remove a member. Removing an absent member is not an error.
    async fn zrem(&self, key: &str, member: &str) -> StoreResult<()>;

    /// Number of members; `0` for an absent key.
    async fn zcard(&self, key: &str) -> StoreResult<u64>;

    /// Score of the member at `rank` in ascending order. Negative ranks
    /// count from the tail (`-1` is the highest score). `None` when the
    /// rank is out of range.
    async fn zscore_by_rank(&self, key: &str, rank: i64) -> StoreResult<Option<f64>>;

    /// Rank of a member in ascending order (descending when `reversed`),
    /// or `None` when the member is absent.
    async fn zrank(&self, key: &str, member: &str, reversed: bool) -> StoreResult<Option<u64>>;

    /// Members between the inclusive ranks `start` and `stop` in ascending
    /// order (descending when `reversed`). Negative ranks count from the
    /// tail.
    async fn zrange(
        &self,
        key: &str,
        start: i64,
        stop: i64,
        reversed: bool,
    ) -> StoreResult<Vec<String>>;

    /// Members whose score lies in `[lo, hi]`, in ascending score order
    /// (descending when `reversed`).
    async fn zrange_by_score(
        &self,
        key: &str,
        lo: f64,
        hi: f64,
        reversed: bool,
    ) -> StoreResult<Vec<String>>;

    // ========================================================================
    // LISTS
    // ========================================================================

    /// Push a value onto the head of a list.
    async fn lpush(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Pop a value from the tail of a list, or `None` when empty.
    async fn rpop(&self, key: &str) -> StoreResult<Option<String>>;
}
