//! Tideway Store - Store Abstraction and Typed Wrappers
//!
//! Defines the Redis-compatible primitive seam ([`StoreBackend`]), an
//! in-memory reference backend, and the typed wrappers the engines
//! compose: item store, sorted index, boundary markers, and coverage
//! watermarks.
//!
//! The concrete network client is deliberately not bound here; anything
//! exposing string GET/SET/DEL/EXPIRE, sorted-set ZADD/ZREM/ZCARD/ZRANGE
//! family and list LPUSH/RPOP can implement [`StoreBackend`].

mod backend;
mod item_store;
mod key;
mod markers;
mod memory;
mod sorted_index;
mod watermarks;

pub use backend::{StoreBackend, StoreResult};
pub use item_store::ItemStore;
pub use key::KeyFormat;
pub use markers::{Marker, PageMarkers, BLANK_PAGE_SUFFIX, FIRST_PAGE_SUFFIX, LAST_PAGE_SUFFIX};
pub use memory::MemoryStore;
pub use sorted_index::SortedIndex;
pub use watermarks::{CoverageWatermarks, MOST_EARLIEST_SUFFIX, MOST_RECENT_SUFFIX};
