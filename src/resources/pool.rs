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

//! Slot-addressed table cache.
//!
//! Callers hold slot indices rather than names so hot loops can skip the
//! name scan after the first load.

use crate::resources::ResRef;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

/// Index of a table slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(usize);

impl TableId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Which slots a release applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotTarget {
    One(TableId),
    /// Release every slot and forget them (teardown)
    All,
}

impl From<TableId> for SlotTarget {
    fn from(id: TableId) -> Self {
        SlotTarget::One(id)
    }
}

struct TableSlot<T> {
    key: ResRef,
    /// One count per load call
    refcount: u32,
    table: Option<Arc<T>>,
}

/// Table cache with slot reuse.
///
/// A slot whose refcount drops to zero loses its table but keeps its place;
/// the lowest such slot is filled by the next new load before the sequence
/// grows.
pub struct TableCache<T> {
    slots: Vec<TableSlot<T>>,
    reusable: BinaryHeap<Reverse<usize>>,
}

impl<T> TableCache<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            reusable: BinaryHeap::new(),
        }
    }

    /// Index of the live slot holding `key`; dead slots are invisible
    pub fn index_of(&self, key: &ResRef) -> Option<TableId> {
        self.slots
            .iter()
            .position(|slot| slot.refcount > 0 && slot.key == *key)
            .map(TableId)
    }

    /// Count another load of an already live table
    pub fn acquire(&mut self, key: &ResRef) -> Option<TableId> {
        let id = self.index_of(key)?;
        self.slots[id.0].refcount += 1;
        Some(id)
    }

    /// Place a freshly decoded table with one load counted
    pub fn insert(&mut self, key: ResRef, table: T) -> TableId {
        let slot = TableSlot {
            key,
            refcount: 1,
            table: Some(Arc::new(table)),
        };
        match self.reusable.pop() {
            Some(Reverse(index)) => {
                self.slots[index] = slot;
                TableId(index)
            }
            None => {
                self.slots.push(slot);
                TableId(self.slots.len() - 1)
            }
        }
    }

    pub fn get(&self, id: TableId) -> Option<Arc<T>> {
        self.slots
            .get(id.0)
            .filter(|slot| slot.refcount > 0)
            .and_then(|slot| slot.table.clone())
    }

    /// Name last stored in the slot, live or not
    pub fn key_at(&self, id: TableId) -> Option<&ResRef> {
        self.slots.get(id.0).map(|slot| &slot.key)
    }

    pub fn ref_count(&self, id: TableId) -> u32 {
        self.slots.get(id.0).map_or(0, |slot| slot.refcount)
    }

    /// Release one load of a slot, or everything.
    ///
    /// Fails for an out-of-range or already dead slot.
    pub fn release(&mut self, target: impl Into<SlotTarget>) -> bool {
        let id = match target.into() {
            SlotTarget::All => {
                self.slots.clear();
                self.reusable.clear();
                return true;
            }
            SlotTarget::One(id) => id,
        };
        let Some(slot) = self.slots.get_mut(id.0) else {
            return false;
        };
        if slot.refcount == 0 {
            return false;
        }
        slot.refcount -= 1;
        if slot.refcount == 0 {
            slot.table = None;
            self.reusable.push(Reverse(id.0));
        }
        true
    }

    /// Slots in the sequence, dead ones included
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.slots.len() - self.reusable.len()
    }
}

impl<T> Default for TableCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
