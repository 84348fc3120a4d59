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

//! Shared-ownership handles to cached resources.

use crate::error::ProtocolViolation;
use crate::resources::cache::{Decrement, EntryTable};
use crate::resources::ResRef;
use parking_lot::Mutex;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

/// What to do with the object when the last holder lets go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Release {
    /// Drop the object with the entry
    #[default]
    Free,
    /// Hand the object to the releasing caller instead
    Keep,
}

impl From<bool> for Release {
    fn from(free: bool) -> Self {
        if free {
            Release::Free
        } else {
            Release::Keep
        }
    }
}

/// Result of releasing one holder
#[derive(Debug)]
pub enum FreeOutcome<T> {
    /// Other holders remain
    Held(u32),
    /// Last holder gone, object dropped
    Released,
    /// Last holder gone, object now exclusively owned by the caller
    Transferred(Arc<T>),
}

impl<T> FreeOutcome<T> {
    /// Holders left after the release
    pub fn remaining(&self) -> u32 {
        match self {
            FreeOutcome::Held(remaining) => *remaining,
            FreeOutcome::Released | FreeOutcome::Transferred(_) => 0,
        }
    }

    pub fn is_last(&self) -> bool {
        self.remaining() == 0
    }
}

impl<T> Decrement<T> {
    pub(crate) fn finish(self, release: Release) -> FreeOutcome<T> {
        match self {
            Decrement::Held(remaining) => FreeOutcome::Held(remaining),
            Decrement::Zero(object) => match release {
                Release::Free => {
                    drop(object);
                    FreeOutcome::Released
                }
                Release::Keep => FreeOutcome::Transferred(object),
            },
            Decrement::Inert => FreeOutcome::Released,
        }
    }
}

/// One logical holder of a cached object.
///
/// Cloning registers another holder and dropping releases one, so a
/// get/drop pair always leaves the refcount where it was. The handle carries
/// its key and the serial of the entry it was issued from; a release can
/// therefore never name the wrong key or hit a later entry reusing the name.
pub struct Shared<T> {
    key: ResRef,
    serial: u64,
    object: Arc<T>,
    table: Option<Weak<Mutex<EntryTable<T>>>>,
}

impl<T> Shared<T> {
    pub(crate) fn new(key: ResRef, serial: u64, object: Arc<T>, table: Weak<Mutex<EntryTable<T>>>) -> Self {
        Self {
            key,
            serial,
            object,
            table: Some(table),
        }
    }

    /// Name the object is cached under
    pub fn name(&self) -> &ResRef {
        &self.key
    }

    pub fn object(&self) -> &Arc<T> {
        &self.object
    }

    /// Current number of holders, 0 once the handle no longer tracks an entry
    pub fn ref_count(&self) -> u32 {
        self.table
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|table| table.lock().holders(&self.key, self.serial))
            .unwrap_or(0)
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.object, &b.object)
    }

    /// Release this holder explicitly.
    ///
    /// With `Release::Keep` the last holder receives the object instead of it
    /// being dropped.
    pub fn release(mut self, release: Release) -> Result<FreeOutcome<T>, ProtocolViolation> {
        let Some(table) = self.table.take().and_then(|weak| weak.upgrade()) else {
            return Ok(FreeOutcome::Released);
        };
        let step = table.lock().release_serial(&self.key, self.serial);
        step.map(|step| step.finish(release))
    }

    /// Stop tracking this holder without releasing it.
    ///
    /// The count stays raised until the pair is handed back through
    /// `ObjectCache::dec_ref`.
    pub fn into_raw(mut self) -> (ResRef, Arc<T>) {
        self.table = None;
        (self.key, Arc::clone(&self.object))
    }
}

impl<T> Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.object
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        let linked = match self.table.as_ref().and_then(Weak::upgrade) {
            None => false,
            Some(table) => {
                let (step, policy) = {
                    let mut table = table.lock();
                    (table.add_holder(&self.key, self.serial), table.policy())
                };
                match step {
                    Ok(tracked) => tracked,
                    Err(violation) => {
                        drop(policy.escalate(violation));
                        // Stays linked so releasing the clone reports as well
                        true
                    }
                }
            }
        };
        Self {
            key: self.key,
            serial: self.serial,
            object: Arc::clone(&self.object),
            table: if linked { self.table.clone() } else { None },
        }
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        let Some(table) = self.table.take().and_then(|weak| weak.upgrade()) else {
            return;
        };
        let (step, policy) = {
            let mut table = table.lock();
            (table.release_serial(&self.key, self.serial), table.policy())
        };
        // The object, if this was the last holder, is dropped here, outside the lock
        match step {
            Ok(step) => drop(step.finish(Release::Free)),
            Err(violation) => drop(policy.escalate(violation)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("key", &self.key)
            .field("serial", &self.serial)
            .field("object", &self.object)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViolationPolicy;
    use crate::resources::{ObjectCache, ResourceKind};

    fn cache() -> ObjectCache<String> {
        ObjectCache::new(ResourceKind::Item, ViolationPolicy::Report)
    }

    #[test]
    fn test_clone_and_drop_are_balanced() {
        let cache = cache();
        let first = cache.set_at(&ResRef::new("SWRD01"), "sword".to_string()).unwrap();
        assert_eq!(first.ref_count(), 1);

        let second = first.clone();
        assert_eq!(first.ref_count(), 2);
        assert!(Shared::ptr_eq(&first, &second));

        drop(second);
        assert_eq!(first.ref_count(), 1);
        drop(first);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_keep_transfers_ownership() {
        let cache = cache();
        let handle = cache.set_at(&ResRef::new("BOOK01"), "tome".to_string()).unwrap();

        match handle.release(Release::Keep).unwrap() {
            FreeOutcome::Transferred(object) => {
                assert_eq!(object.as_str(), "tome");
                assert_eq!(Arc::strong_count(&object), 1);
            }
            other => panic!("expected transfer, got {other:?}"),
        }
        assert!(cache.is_empty());
    }

    #[test]
    fn test_handle_outliving_teardown_is_inert() {
        let cache = cache();
        let handle = cache.set_at(&ResRef::new("RING01"), "ring".to_string()).unwrap();
        assert_eq!(cache.remove_all(), 1);

        assert_eq!(handle.ref_count(), 0);
        let cloned = handle.clone();
        assert!(matches!(handle.release(Release::Free), Ok(FreeOutcome::Released)));
        drop(cloned);

        // A fresh entry under the same name is unaffected by the old handles
        let fresh = cache.set_at(&ResRef::new("RING01"), "ring".to_string()).unwrap();
        assert_eq!(fresh.ref_count(), 1);
    }

    #[test]
    fn test_release_bool_conversion() {
        assert_eq!(Release::from(true), Release::Free);
        assert_eq!(Release::from(false), Release::Keep);
    }
}
