//! Best-effort lookup cache for named property resolution.
//!
//! Maps `(descriptor, name)` to the record found by the last scan, or to
//! "known absent" for negative lookups, so repeated misses are O(1) too.
//! The cache is an accelerator, never a source of truth: the heap trusts a
//! hit, treats a miss as "scan the list", and invalidates the entry at every
//! structural mutation site (property insertion and removal). Skipping an
//! invalidation is a correctness bug, not a slowdown, because a stale
//! positive entry would resurrect a deleted record.
//!
//! Named records carry an `lcached` bit mirroring whether the cache holds a
//! positive entry for them, letting release paths skip cache work for
//! records that were never memoized.

use rustc_hash::FxHashMap;

use crate::property::PropertyId;
use crate::strings::StringId;
use crate::value::ObjectId;

/// Answer from [`LookupCache::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    /// The cache has a memoized answer: the record, or `None` for a
    /// memoized negative lookup.
    Hit(Option<PropertyId>),
    /// Nothing memoized; the caller must scan.
    Miss,
}

/// The lookup accelerator.
#[derive(Default)]
pub struct LookupCache {
    entries: FxHashMap<(ObjectId, StringId), Option<PropertyId>>,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consult the cache.
    pub fn lookup(&self, object: ObjectId, name: StringId) -> CacheLookup {
        match self.entries.get(&(object, name)) {
            Some(&memoized) => CacheLookup::Hit(memoized),
            None => CacheLookup::Miss,
        }
    }

    /// Memoize a completed scan, including a negative result.
    pub fn insert(&mut self, object: ObjectId, name: StringId, record: Option<PropertyId>) {
        self.entries.insert((object, name), record);
    }

    /// Drop the entry for `(object, name)`. Returns whether one existed.
    pub fn invalidate(&mut self, object: ObjectId, name: StringId) -> bool {
        self.entries.remove(&(object, name)).is_some()
    }

    /// Drop every entry for a descriptor. Used when the descriptor itself
    /// is being torn down.
    pub fn invalidate_object(&mut self, object: ObjectId) {
        self.entries.retain(|(obj, _), _| *obj != object);
    }

    /// Number of memoized entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
