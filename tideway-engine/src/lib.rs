//! Tideway Engine - Pagination and Time-Ordered Listing
//!
//! Orchestrates the store wrappers into two read engines plus the loader
//! contract that keeps them warm:
//!
//! - [`Paginator`]: a cursor-chase paginator over a bounded cached window,
//!   with admission rules, boundary-marker maintenance, and a partial
//!   refill seed mode.
//! - [`Timeline`]: whole-range and time-interval listing with coverage
//!   watermarks driving interval-gap seeding decisions.
//! - [`PageSeeder`] / [`TimelineSeeder`]: loaders over any
//!   [`RecordSource`] system-of-record.
//! - [`EventQueue`]: a paced single-consumer list worker.
//!
//! Engines hold no mutable state beyond their configuration; all shared
//! state lives in the store, so independent engine instances pointed at
//! the same key space coordinate purely through it.

mod page;
mod paginate;
mod queue;
mod seeder;
mod timeline;

pub use page::{Mode, Page, PagePosition};
pub use paginate::Paginator;
pub use queue::{EventQueue, QueueProcessor};
pub use seeder::{InMemorySource, PageSeeder, RecordSource, TimelineSeeder};
pub use timeline::{GapInterval, Timeline};
