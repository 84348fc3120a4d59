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

//! Store for derived factory objects (sprite and animation sources).
//!
//! Factories are never refcounted: once built they live as long as the store.

use crate::resources::{ResRef, ResourceKind};
use ahash::AHashMap;
use slotmap::{new_key_type, SlotMap};
use std::any::Any;
use std::sync::Arc;

new_key_type! {
    /// Identity of a built factory object.
    pub struct FactoryId;
}

/// Append-only factory store
#[derive(Default)]
pub struct FactoryCache {
    objects: SlotMap<FactoryId, Arc<dyn Any + Send + Sync>>,
    by_name: AHashMap<(ResRef, ResourceKind), FactoryId>,
}

impl FactoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self, name: &ResRef, kind: ResourceKind) -> Option<FactoryId> {
        self.by_name.get(&(*name, kind)).copied()
    }

    /// Typed access; `None` for an unknown id or a different object type
    pub fn get_factory_object<T: Any + Send + Sync>(&self, id: FactoryId) -> Option<Arc<T>> {
        let object = self.objects.get(id)?;
        Arc::clone(object).downcast::<T>().ok()
    }

    /// Add a built factory. The caller checks `is_loaded` first.
    pub fn add_factory_object<T: Any + Send + Sync>(
        &mut self,
        name: ResRef,
        kind: ResourceKind,
        object: Arc<T>,
    ) -> FactoryId {
        let object: Arc<dyn Any + Send + Sync> = object;
        let id = self.objects.insert(object);
        self.by_name.insert((name, kind), id);
        tracing::debug!(%name, %kind, "factory object built");
        id
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
