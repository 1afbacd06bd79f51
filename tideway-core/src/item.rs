//! Item blueprint and the base fields shared by every cached record.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::rand_id;
use crate::time::{format_item_time, parse_item_time};
use crate::TimeError;

fn unix_epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

/// Base fields carried by every cached item.
///
/// Applications flatten this into their own item structs:
///
/// ```ignore
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Post {
///     #[serde(flatten)]
///     base: ItemBase,
///     title: String,
/// }
/// ```
///
/// The native instants are not serialized; the string forms (`createdat`,
/// `updatedat`) travel through the store and are re-parsed on read, so the
/// wire format is independent of the store's value encoding. Additional
/// application fields pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemBase {
    /// Globally unique id.
    pub uuid: String,
    /// Opaque 16-char alphanumeric identifier, stable across mutations.
    pub randid: String,
    #[serde(skip, default = "unix_epoch")]
    pub created_at: DateTime<Utc>,
    #[serde(skip, default = "unix_epoch")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "createdat")]
    pub created_at_string: String,
    #[serde(rename = "updatedat")]
    pub updated_at_string: String,
}

impl ItemBase {
    /// Stamp a fresh identity: new uuid, new rid, both instants set to now.
    pub fn new() -> Self {
        let now = Utc::now();
        let formatted = format_item_time(now);
        Self {
            uuid: Uuid::new_v4().to_string(),
            randid: rand_id(),
            created_at: now,
            updated_at: now,
            created_at_string: formatted.clone(),
            updated_at_string: formatted,
        }
    }

    /// Bump the update instant to now, keeping the string form in sync.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.updated_at_string = format_item_time(self.updated_at);
    }
}

impl Default for ItemBase {
    fn default() -> Self {
        Self::new()
    }
}

/// Blueprint for cacheable, paginatable records.
///
/// Implementations expose their embedded [`ItemBase`]; everything else
/// has a default in terms of it. The serde bounds mirror what the store
/// needs to round-trip an item through its serialized body.
pub trait CacheItem: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn base(&self) -> &ItemBase;
    fn base_mut(&mut self) -> &mut ItemBase;

    fn uuid(&self) -> &str {
        &self.base().uuid
    }

    fn rand_id(&self) -> &str {
        &self.base().randid
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.base().created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.base().updated_at
    }

    /// Copy the native instants into their serialized string forms.
    ///
    /// Called by the item store before every write.
    fn refresh_time_strings(&mut self) {
        let base = self.base_mut();
        base.created_at_string = format_item_time(base.created_at);
        base.updated_at_string = format_item_time(base.updated_at);
    }

    /// Re-parse the serialized string forms into the native instants.
    ///
    /// Called by the item store after every read.
    fn rehydrate_times(&mut self) -> Result<(), TimeError> {
        let created = parse_item_time(&self.base().created_at_string)?;
        let updated = parse_item_time(&self.base().updated_at_string)?;
        let base = self.base_mut();
        base.created_at = created;
        base.updated_at = updated;
        Ok(())
    }
}

impl CacheItem for ItemBase {
    fn base(&self) -> &ItemBase {
        self
    }

    fn base_mut(&mut self) -> &mut ItemBase {
        self
    }
}
