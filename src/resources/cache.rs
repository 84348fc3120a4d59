// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Name-keyed, reference-counted object cache.

use crate::error::{ProtocolViolation, ViolationPolicy};
use crate::resources::handle::{FreeOutcome, Release, Shared};
use crate::resources::{ResRef, ResourceKind};
use ahash::AHashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cache statistics
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Lookups answered by a cached "known missing" entry
    pub negative_hits: u64,
    pub loads: u64,
    /// Entries whose refcount reached zero
    pub releases: u64,
    pub teardowns: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f32 {
        let total = self.hits + self.negative_hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits + self.negative_hits) as f32 / total as f32
        }
    }
}

/// Entry in the object cache
enum Entry<T> {
    Live {
        object: Arc<T>,
        refcount: u32,
        serial: u64,
    },
    /// Resolved once and found missing; never re-resolved until teardown
    Absent,
}

/// Outcome of dropping one holder, before the release policy is applied
pub(crate) enum Decrement<T> {
    Held(u32),
    Zero(Arc<T>),
    /// Holder belonged to an entry already torn down
    Inert,
}

/// Lock-protected state shared between a cache and its handles
pub(crate) struct EntryTable<T> {
    kind: ResourceKind,
    entries: AHashMap<ResRef, Entry<T>>,
    next_serial: u64,
    /// Serials below this were issued before the last `remove_all`
    teardown_serial: u64,
    policy: ViolationPolicy,
    stats: CacheStats,
}

impl<T> EntryTable<T> {
    pub(crate) fn policy(&self) -> ViolationPolicy {
        self.policy
    }

    pub(crate) fn holders(&self, key: &ResRef, serial: u64) -> u32 {
        match self.entries.get(key) {
            Some(Entry::Live {
                refcount,
                serial: current,
                ..
            }) if *current == serial => *refcount,
            _ => 0,
        }
    }

    /// Register one more holder of the entry `serial` was issued from.
    ///
    /// `Ok(false)` when the entry went away with a teardown; a holder of an
    /// entry released any other way is stale.
    pub(crate) fn add_holder(&mut self, key: &ResRef, serial: u64) -> Result<bool, ProtocolViolation> {
        match self.entries.get_mut(key) {
            Some(Entry::Live {
                refcount,
                serial: current,
                ..
            }) if *current == serial => {
                *refcount += 1;
                Ok(true)
            }
            _ if serial < self.teardown_serial => Ok(false),
            _ => Err(ProtocolViolation::StaleHandle {
                kind: self.kind,
                name: *key,
            }),
        }
    }

    pub(crate) fn release_serial(
        &mut self,
        key: &ResRef,
        serial: u64,
    ) -> Result<Decrement<T>, ProtocolViolation> {
        let current = matches!(
            self.entries.get(key),
            Some(Entry::Live { serial: issued, .. }) if *issued == serial
        );
        match current {
            true => self.decrement(key),
            false if serial < self.teardown_serial => {
                tracing::trace!(kind = %self.kind, name = %key, "handle released after teardown");
                Ok(Decrement::Inert)
            }
            false => Err(ProtocolViolation::StaleHandle {
                kind: self.kind,
                name: *key,
            }),
        }
    }

    fn decrement(&mut self, key: &ResRef) -> Result<Decrement<T>, ProtocolViolation> {
        let underflow = ProtocolViolation::Underflow {
            kind: self.kind,
            name: *key,
        };
        let Some(Entry::Live { refcount, .. }) = self.entries.get_mut(key) else {
            return Err(underflow);
        };
        if *refcount == 0 {
            return Err(underflow);
        }
        *refcount -= 1;
        if *refcount > 0 {
            return Ok(Decrement::Held(*refcount));
        }

        self.stats.releases += 1;
        tracing::debug!(kind = %self.kind, name = %key, "last holder released");
        match self.entries.remove(key) {
            Some(Entry::Live { object, .. }) => Ok(Decrement::Zero(object)),
            _ => Err(underflow),
        }
    }

    fn issue(&mut self, key: ResRef, object: Arc<T>) -> u64 {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.entries.insert(
            key,
            Entry::Live {
                object,
                refcount: 1,
                serial,
            },
        );
        serial
    }
}

/// Result of a cache lookup
#[derive(Debug)]
pub enum Lookup<T> {
    /// Live entry; the returned handle is a new holder
    Hit(Shared<T>),
    /// Negative entry
    KnownAbsent,
    /// Nothing cached under the name
    Miss,
}

impl<T> Lookup<T> {
    pub fn into_option(self) -> Option<Shared<T>> {
        match self {
            Lookup::Hit(handle) => Some(handle),
            Lookup::KnownAbsent | Lookup::Miss => None,
        }
    }
}

/// Refcount as observed from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefCount {
    /// No entry for the name
    Untracked,
    /// Negative entry
    Absent,
    Held(u32),
}

/// Reference-counted cache for one resource kind.
///
/// Creation is the caller's job: `get` only ever answers from what is
/// already cached, and `set_at` inserts a freshly decoded object with one
/// holder. Entries disappear the moment their last holder is released.
pub struct ObjectCache<T> {
    kind: ResourceKind,
    table: Arc<Mutex<EntryTable<T>>>,
}

impl<T> ObjectCache<T> {
    pub fn new(kind: ResourceKind, policy: ViolationPolicy) -> Self {
        Self {
            kind,
            table: Arc::new(Mutex::new(EntryTable {
                kind,
                entries: AHashMap::new(),
                next_serial: 0,
                teardown_serial: 0,
                policy,
                stats: CacheStats::default(),
            })),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Look a name up, registering a new holder on a hit
    pub fn get(&self, key: &ResRef) -> Lookup<T> {
        let mut guard = self.table.lock();
        let table = &mut *guard;
        let hit = match table.entries.get_mut(key) {
            Some(Entry::Live {
                object,
                refcount,
                serial,
            }) => {
                *refcount += 1;
                Some((*serial, Arc::clone(object), *refcount))
            }
            Some(Entry::Absent) => {
                table.stats.negative_hits += 1;
                return Lookup::KnownAbsent;
            }
            None => None,
        };
        match hit {
            Some((serial, object, refcount)) => {
                table.stats.hits += 1;
                tracing::trace!(kind = %self.kind, name = %key, refcount, "cache hit");
                Lookup::Hit(Shared::new(*key, serial, object, Arc::downgrade(&self.table)))
            }
            None => {
                table.stats.misses += 1;
                Lookup::Miss
            }
        }
    }

    /// Insert a freshly built object with a single holder.
    ///
    /// A negative entry may be replaced; a live one may not.
    pub fn set_at(&self, key: &ResRef, object: T) -> Result<Shared<T>, ProtocolViolation> {
        let mut table = self.table.lock();
        if let Some(Entry::Live { .. }) = table.entries.get(key) {
            return Err(ProtocolViolation::DuplicateEntry {
                kind: self.kind,
                name: *key,
            });
        }
        let object = Arc::new(object);
        let serial = table.issue(*key, Arc::clone(&object));
        table.stats.loads += 1;
        tracing::debug!(kind = %self.kind, name = %key, "cached");
        Ok(Shared::new(*key, serial, object, Arc::downgrade(&self.table)))
    }

    /// Record that the name resolved to nothing
    pub fn set_absent(&self, key: &ResRef) -> Result<(), ProtocolViolation> {
        let mut table = self.table.lock();
        if let Some(Entry::Live { .. }) = table.entries.get(key) {
            return Err(ProtocolViolation::DuplicateEntry {
                kind: self.kind,
                name: *key,
            });
        }
        table.entries.insert(*key, Entry::Absent);
        tracing::debug!(kind = %self.kind, name = %key, "cached as missing");
        Ok(())
    }

    pub fn ref_count(&self, key: &ResRef) -> RefCount {
        match self.table.lock().entries.get(key) {
            Some(Entry::Live { refcount, .. }) => RefCount::Held(*refcount),
            Some(Entry::Absent) => RefCount::Absent,
            None => RefCount::Untracked,
        }
    }

    /// Release one holder given by name and object.
    ///
    /// This is the path for holders detached with [`Shared::into_raw`]. The
    /// object must be the one cached under `key`; anything else, including a
    /// release past zero, is a protocol violation.
    pub fn dec_ref(
        &self,
        key: &ResRef,
        object: &Arc<T>,
        release: Release,
    ) -> Result<FreeOutcome<T>, ProtocolViolation> {
        let step = {
            let mut table = self.table.lock();
            let foreign = matches!(
                table.entries.get(key),
                Some(Entry::Live { object: cached, .. }) if !Arc::ptr_eq(cached, object)
            );
            if foreign {
                return Err(ProtocolViolation::Mismatch {
                    kind: self.kind,
                    name: *key,
                });
            }
            table.decrement(key)?
        };
        Ok(step.finish(release))
    }

    /// Drop every entry regardless of holders. Outstanding handles go inert.
    pub fn remove_all(&self) -> usize {
        let drained: Vec<Entry<T>> = {
            let mut table = self.table.lock();
            table.teardown_serial = table.next_serial;
            table.stats.teardowns += 1;
            table.entries.drain().map(|(_, entry)| entry).collect()
        };
        let count = drained.len();
        tracing::debug!(kind = %self.kind, count, "cache cleared");
        count
    }

    pub fn contains(&self, key: &ResRef) -> bool {
        matches!(self.table.lock().entries.get(key), Some(Entry::Live { .. }))
    }

    /// Number of entries, negative ones included
    pub fn len(&self) -> usize {
        self.table.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.table.lock().stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> ObjectCache<String> {
        ObjectCache::new(ResourceKind::Spell, ViolationPolicy::Report)
    }

    fn name(s: &str) -> ResRef {
        ResRef::new(s)
    }

    #[test]
    fn test_get_does_not_create() {
        let cache = cache();
        assert!(matches!(cache.get(&name("SPWI101")), Lookup::Miss));
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_hits_share_identity_and_count_holders() {
        let cache = cache();
        let first = cache.set_at(&name("SPWI101"), "missile".to_string()).unwrap();
        let second = cache.get(&name("spwi101")).into_option().unwrap();
        let third = cache.get(&name("SpWi101")).into_option().unwrap();

        assert!(Shared::ptr_eq(&first, &second));
        assert!(Shared::ptr_eq(&first, &third));
        assert_eq!(cache.ref_count(&name("SPWI101")), RefCount::Held(3));

        drop(third);
        drop(second);
        assert_eq!(cache.ref_count(&name("SPWI101")), RefCount::Held(1));
        drop(first);
        assert_eq!(cache.ref_count(&name("SPWI101")), RefCount::Untracked);
        assert_eq!(cache.stats().releases, 1);
    }

    #[test]
    fn test_dec_ref_underflow_is_reported() {
        let cache = cache();
        let (key, object) = cache.set_at(&name("SPPR101"), "bless".to_string()).unwrap().into_raw();

        assert!(matches!(
            cache.dec_ref(&key, &object, Release::Free),
            Ok(FreeOutcome::Released)
        ));
        assert_eq!(
            cache.dec_ref(&key, &object, Release::Free).unwrap_err(),
            ProtocolViolation::Underflow {
                kind: ResourceKind::Spell,
                name: key
            }
        );
    }

    #[test]
    fn test_dec_ref_rejects_foreign_object() {
        let cache = cache();
        let _held = cache.set_at(&name("SPPR101"), "bless".to_string()).unwrap();
        let impostor = Arc::new("bless".to_string());

        assert!(matches!(
            cache.dec_ref(&name("SPPR101"), &impostor, Release::Free),
            Err(ProtocolViolation::Mismatch { .. })
        ));
        assert_eq!(cache.ref_count(&name("SPPR101")), RefCount::Held(1));
    }

    #[test]
    fn test_duplicate_insert_is_violation() {
        let cache = cache();
        let _held = cache.set_at(&name("SPPR101"), "bless".to_string()).unwrap();
        assert!(matches!(
            cache.set_at(&name("sppr101"), "again".to_string()),
            Err(ProtocolViolation::DuplicateEntry { .. })
        ));
        assert!(cache.set_absent(&name("SPPR101")).is_err());
    }

    #[test]
    fn test_negative_entry() {
        let cache = cache();
        cache.set_absent(&name("NOPE")).unwrap();

        assert!(matches!(cache.get(&name("nope")), Lookup::KnownAbsent));
        assert_eq!(cache.ref_count(&name("NOPE")), RefCount::Absent);
        assert!(!cache.contains(&name("NOPE")));
        assert_eq!(cache.stats().negative_hits, 1);

        // A negative entry may later be filled in
        let filled = cache.set_at(&name("NOPE"), "found".to_string()).unwrap();
        assert_eq!(filled.ref_count(), 1);
    }

    #[test]
    fn test_stale_handle_after_raw_release() {
        let cache = cache();
        let handle = cache.set_at(&name("SPPR101"), "bless".to_string()).unwrap();
        let object = Arc::clone(handle.object());

        // Someone releases the only count through the raw path while the handle lives
        cache.dec_ref(&name("SPPR101"), &object, Release::Free).unwrap();
        assert!(matches!(
            handle.release(Release::Free),
            Err(ProtocolViolation::StaleHandle { .. })
        ));
    }

    #[test]
    fn test_clone_of_stale_handle_reports_too() {
        let cache = cache();
        let handle = cache.set_at(&name("SPPR101"), "bless".to_string()).unwrap();
        let object = Arc::clone(handle.object());
        cache.dec_ref(&name("SPPR101"), &object, Release::Free).unwrap();

        let cloned = handle.clone();
        assert_eq!(cloned.ref_count(), 0);
        assert!(matches!(
            cloned.release(Release::Free),
            Err(ProtocolViolation::StaleHandle { kind: ResourceKind::Spell, .. })
        ));
        assert!(matches!(
            handle.release(Release::Free),
            Err(ProtocolViolation::StaleHandle { .. })
        ));
        assert_eq!(cache.ref_count(&name("SPPR101")), RefCount::Untracked);
    }

    #[test]
    fn test_remove_all() {
        let cache = cache();
        let _a = cache.set_at(&name("A"), "a".to_string()).unwrap();
        let _b = cache.set_at(&name("B"), "b".to_string()).unwrap();
        cache.set_absent(&name("C")).unwrap();

        assert_eq!(cache.remove_all(), 3);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().teardowns, 1);
    }
}
