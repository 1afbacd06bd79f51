//! In-memory reference backend.
//!
//! Implements [`StoreBackend`] over process-local maps with lazy TTL
//! eviction, mirroring the store semantics the engines rely on: score
//! order with lexicographic tie-break, absent-key tolerance, and empty
//! collections disappearing on their last removal.
//!
//! Besides backing tests across the workspace, the store exposes a few
//! affordances real backends do not need: TTL inspection, forced expiry,
//! and failure injection for exercising error propagation.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tideway_core::StoreError;

use crate::backend::{StoreBackend, StoreResult};

#[derive(Debug, Clone)]
enum ValueKind {
    Str(String),
    Zset(HashMap<String, f64>),
    List(VecDeque<String>),
}

impl ValueKind {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Zset(_) => "zset",
            Self::List(_) => "list",
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: ValueKind,
    expires_at: Option<Instant>,
    ttl: Option<Duration>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Instant::now())
    }
}

/// Process-local [`StoreBackend`] implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    fail_all: AtomicBool,
    fail_expire: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The TTL most recently applied to a key, if any.
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.entries.read().unwrap().get(key).and_then(|e| e.ttl)
    }

    /// Drop a key as if its TTL had fired.
    pub fn force_expire(&self, key: &str) {
        self.entries.write().unwrap().remove(key);
    }

    /// Make every operation fail with a backend error.
    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::Relaxed);
    }

    /// Make only `expire` fail, for exercising TTL-refresh propagation.
    pub fn set_fail_expire(&self, fail: bool) {
        self.fail_expire.store(fail, Ordering::Relaxed);
    }

    /// Whether a live (unexpired) entry exists for `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap()
            .get(key)
            .is_some_and(|e| !e.is_expired())
    }

    fn check_fail(&self) -> StoreResult<()> {
        if self.fail_all.load(Ordering::Relaxed) {
            return Err(StoreError::Backend {
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

fn wrong_type(found: &ValueKind) -> StoreError {
    StoreError::Backend {
        reason: format!("operation against a key holding a {}", found.type_name()),
    }
}

/// Fetch a live entry, removing it first if its TTL has fired.
fn live_entry<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
    if entries.get(key).is_some_and(Entry::is_expired) {
        entries.remove(key);
        return None;
    }
    entries.get_mut(key)
}

/// Members ordered by score, ties broken lexicographically by member.
fn sorted_members(zset: &HashMap<String, f64>) -> Vec<(String, f64)> {
    let mut members: Vec<(String, f64)> = zset.iter().map(|(m, s)| (m.clone(), *s)).collect();
    members.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    members
}

/// Resolve inclusive, possibly-negative rank bounds against a length.
fn normalize_range(len: i64, start: i64, stop: i64) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let mut start = if start < 0 { len + start } else { start };
    let mut stop = if stop < 0 { len + stop } else { stop };
    if start < 0 {
        start = 0;
    }
    if stop >= len {
        stop = len - 1;
    }
    if start >= len || stop < 0 || start > stop {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.check_fail()?;
        let mut entries = self.entries.write().unwrap();
        match live_entry(&mut entries, key) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                ValueKind::Str(value) => Ok(Some(value.clone())),
                other => Err(wrong_type(other)),
            },
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.check_fail()?;
        let mut entries = self.entries.write().unwrap();
        entries.insert(
            key.to_string(),
            Entry {
                value: ValueKind::Str(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
                ttl: Some(ttl),
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        self.check_fail()?;
        self.entries.write().unwrap().remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.check_fail()?;
        if self.fail_expire.load(Ordering::Relaxed) {
            return Err(StoreError::Backend {
                reason: "injected expire failure".to_string(),
            });
        }
        let mut entries = self.entries.write().unwrap();
        match live_entry(&mut entries, key) {
            None => Ok(false),
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                entry.ttl = Some(ttl);
                Ok(true)
            }
        }
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        self.check_fail()?;
        let mut entries = self.entries.write().unwrap();
        if live_entry(&mut entries, key).is_none() {
            entries.insert(
                key.to_string(),
                Entry {
                    value: ValueKind::Zset(HashMap::new()),
                    expires_at: None,
                    ttl: None,
                },
            );
        }
        match &mut entries.get_mut(key).unwrap().value {
            ValueKind::Zset(zset) => {
                zset.insert(member.to_string(), score);
                Ok(())
            }
            other => Err(wrong_type(other)),
        }
    }

    async fn zrem(&self, key: &str, member: &str) -> StoreResult<()> {
        self.check_fail()?;
        let mut entries = self.entries.write().unwrap();
        let emptied = match live_entry(&mut entries, key) {
            None => false,
            Some(entry) => match &mut entry.value {
                ValueKind::Zset(zset) => {
                    zset.remove(member);
                    zset.is_empty()
                }
                other => return Err(wrong_type(other)),
            },
        };
        // An empty sorted set does not exist.
        if emptied {
            entries.remove(key);
        }
        Ok(())
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        self.check_fail()?;
        let mut entries = self.entries.write().unwrap();
        match live_entry(&mut entries, key) {
            None => Ok(0),
            Some(entry) => match &entry.value {
                ValueKind::Zset(zset) => Ok(zset.len() as u64),
                other => Err(wrong_type(other)),
            },
        }
    }

    async fn zscore_by_rank(&self, key: &str, rank: i64) -> StoreResult<Option<f64>> {
        self.check_fail()?;
        let mut entries = self.entries.write().unwrap();
        let members = match live_entry(&mut entries, key) {
            None => return Ok(None),
            Some(entry) => match &entry.value {
                ValueKind::Zset(zset) => sorted_members(zset),
                other => return Err(wrong_type(other)),
            },
        };
        let len = members.len() as i64;
        let rank = if rank < 0 { len + rank } else { rank };
        if rank < 0 || rank >= len {
            return Ok(None);
        }
        Ok(Some(members[rank as usize].1))
    }

    async fn zrank(&self, key: &str, member: &str, reversed: bool) -> StoreResult<Option<u64>> {
        self.check_fail()?;
        let mut entries = self.entries.write().unwrap();
        let members = match live_entry(&mut entries, key) {
            None => return Ok(None),
            Some(entry) => match &entry.value {
                ValueKind::Zset(zset) => sorted_members(zset),
                other => return Err(wrong_type(other)),
            },
        };
        let position = members.iter().position(|(m, _)| m == member);
        Ok(position.map(|p| {
            if reversed {
                (members.len() - 1 - p) as u64
            } else {
                p as u64
            }
        }))
    }

    async fn zrange(
        &self,
        key: &str,
        start: i64,
        stop: i64,
        reversed: bool,
    ) -> StoreResult<Vec<String>> {
        self.check_fail()?;
        let mut entries = self.entries.write().unwrap();
        let mut members = match live_entry(&mut entries, key) {
            None => return Ok(Vec::new()),
            Some(entry) => match &entry.value {
                ValueKind::Zset(zset) => sorted_members(zset),
                other => return Err(wrong_type(other)),
            },
        };
        if reversed {
            members.reverse();
        }
        match normalize_range(members.len() as i64, start, stop) {
            None => Ok(Vec::new()),
            Some((start, stop)) => Ok(members[start..=stop]
                .iter()
                .map(|(m, _)| m.clone())
                .collect()),
        }
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        lo: f64,
        hi: f64,
        reversed: bool,
    ) -> StoreResult<Vec<String>> {
        self.check_fail()?;
        let mut entries = self.entries.write().unwrap();
        let members = match live_entry(&mut entries, key) {
            None => return Ok(Vec::new()),
            Some(entry) => match &entry.value {
                ValueKind::Zset(zset) => sorted_members(zset),
                other => return Err(wrong_type(other)),
            },
        };
        let mut selected: Vec<String> = members
            .into_iter()
            .filter(|(_, score)| *score >= lo && *score <= hi)
            .map(|(m, _)| m)
            .collect();
        if reversed {
            selected.reverse();
        }
        Ok(selected)
    }

    async fn lpush(&self, key: &str, value: &str) -> StoreResult<()> {
        self.check_fail()?;
        let mut entries = self.entries.write().unwrap();
        if live_entry(&mut entries, key).is_none() {
            entries.insert(
                key.to_string(),
                Entry {
                    value: ValueKind::List(VecDeque::new()),
                    expires_at: None,
                    ttl: None,
                },
            );
        }
        match &mut entries.get_mut(key).unwrap().value {
            ValueKind::List(list) => {
                list.push_front(value.to_string());
                Ok(())
            }
            other => Err(wrong_type(other)),
        }
    }

    async fn rpop(&self, key: &str) -> StoreResult<Option<String>> {
        self.check_fail()?;
        let mut entries = self.entries.write().unwrap();
        let (popped, emptied) = match live_entry(&mut entries, key) {
            None => (None, false),
            Some(entry) => match &mut entry.value {
                ValueKind::List(list) => {
                    let popped = list.pop_back();
                    (popped, list.is_empty())
                }
                other => return Err(wrong_type(other)),
            },
        };
        if emptied {
            entries.remove(key);
        }
        Ok(popped)
    }
}
