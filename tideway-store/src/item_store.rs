//! Item records: one serialized body per rid, with a refreshed TTL.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tideway_core::{CacheItem, StoreError, TidewayResult, DEFAULT_ITEM_TTL};

use crate::backend::StoreBackend;
use crate::key::KeyFormat;

/// Typed access to item records.
///
/// Each item lives under its own key (the format is substituted with the
/// item's rid) and carries its own TTL, independent of any index that
/// references it. Reads refresh the TTL, so hot items stay cached even
/// when their index is evicted.
pub struct ItemStore<T, B> {
    backend: Arc<B>,
    key_format: KeyFormat,
    ttl: Duration,
    _item: PhantomData<fn() -> T>,
}

impl<T, B> Clone for ItemStore<T, B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            key_format: self.key_format.clone(),
            ttl: self.ttl,
            _item: PhantomData,
        }
    }
}

impl<T, B> ItemStore<T, B>
where
    T: CacheItem,
    B: StoreBackend,
{
    pub fn new(backend: Arc<B>, key_format: impl Into<KeyFormat>) -> Self {
        Self {
            backend,
            key_format: key_format.into(),
            ttl: DEFAULT_ITEM_TTL,
            _item: PhantomData,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The store key for a rid.
    pub fn key(&self, rid: &str) -> String {
        self.key_format.render(&[rid])
    }

    /// Fetch an item by rid, or `None` when the record is absent.
    ///
    /// The serialized string times are re-parsed into the native instants,
    /// and the record's TTL is reset. A failed TTL refresh surfaces as an
    /// error even though the read itself succeeded, so the caller knows
    /// the retention contract is at risk.
    pub async fn get(&self, rid: &str) -> TidewayResult<Option<T>> {
        let key = self.key(rid);
        let Some(raw) = self.backend.get(&key).await? else {
            return Ok(None);
        };

        let mut item: T = serde_json::from_str(&raw).map_err(|e| StoreError::Serialization {
            reason: e.to_string(),
        })?;
        item.rehydrate_times()?;

        self.backend.expire(&key, self.ttl).await?;
        Ok(Some(item))
    }

    /// Write an item's serialized body under its rid.
    pub async fn set(&self, item: &T) -> TidewayResult<()> {
        let mut item = item.clone();
        item.refresh_time_strings();

        let body = serde_json::to_string(&item).map_err(|e| StoreError::Serialization {
            reason: e.to_string(),
        })?;
        self.backend
            .set(&self.key(item.rand_id()), &body, self.ttl)
            .await?;
        Ok(())
    }

    /// Delete an item's record.
    pub async fn del(&self, item: &T) -> TidewayResult<()> {
        self.del_by_rid(item.rand_id()).await
    }

    /// Delete a record by rid, without needing the item.
    pub async fn del_by_rid(&self, rid: &str) -> TidewayResult<()> {
        self.backend.del(&self.key(rid)).await?;
        Ok(())
    }
}
