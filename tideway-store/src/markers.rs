//! Boundary markers co-located with an index key.
//!
//! Three independent flags describe what the cached window knows about
//! the collection's edges. `firstpage` and `lastpage` never coexist
//! unless the whole collection fits in one page; `blankpage` asserts the
//! source itself was empty at last seed.

use std::sync::Arc;
use std::time::Duration;

use tideway_core::{TidewayResult, DEFAULT_INDEX_TTL};

use crate::backend::StoreBackend;
use crate::key::KeyFormat;

pub const FIRST_PAGE_SUFFIX: &str = ":firstpage";
pub const LAST_PAGE_SUFFIX: &str = ":lastpage";
pub const BLANK_PAGE_SUFFIX: &str = ":blankpage";

const MARKER_VALUE: &str = "1";

/// One of the three per-collection boundary flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// The cache holds the leading page; nothing lies beyond it in the
    /// leading direction.
    FirstPage,
    /// The cache holds the trailing page; nothing lies beyond it in the
    /// trailing direction.
    LastPage,
    /// The source yielded zero items for this collection at last seed.
    BlankPage,
}

impl Marker {
    fn suffix(self) -> &'static str {
        match self {
            Self::FirstPage => FIRST_PAGE_SUFFIX,
            Self::LastPage => LAST_PAGE_SUFFIX,
            Self::BlankPage => BLANK_PAGE_SUFFIX,
        }
    }
}

/// Flag storage for a parameterized index key.
pub struct PageMarkers<B> {
    backend: Arc<B>,
    index_format: KeyFormat,
    ttl: Duration,
}

impl<B> Clone for PageMarkers<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            index_format: self.index_format.clone(),
            ttl: self.ttl,
        }
    }
}

impl<B: StoreBackend> PageMarkers<B> {
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

    fn key(&self, params: &[&str], marker: Marker) -> String {
        let mut key = self.index_format.render(params);
        key.push_str(marker.suffix());
        key
    }

    /// Whether a marker is currently set.
    pub async fn is_set(&self, params: &[&str], marker: Marker) -> TidewayResult<bool> {
        let value = self.backend.get(&self.key(params, marker)).await?;
        Ok(value.as_deref() == Some(MARKER_VALUE))
    }

    /// Set a marker, resetting its TTL.
    pub async fn set(&self, params: &[&str], marker: Marker) -> TidewayResult<()> {
        self.backend
            .set(&self.key(params, marker), MARKER_VALUE, self.ttl)
            .await?;
        Ok(())
    }

    /// Clear a marker. Clearing an unset marker is a no-op.
    pub async fn clear(&self, params: &[&str], marker: Marker) -> TidewayResult<()> {
        self.backend.del(&self.key(params, marker)).await?;
        Ok(())
    }

    /// Clear all three markers.
    pub async fn clear_all(&self, params: &[&str]) -> TidewayResult<()> {
        self.clear(params, Marker::FirstPage).await?;
        self.clear(params, Marker::LastPage).await?;
        self.clear(params, Marker::BlankPage).await?;
        Ok(())
    }
}
