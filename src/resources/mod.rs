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

pub mod asset_types;
pub mod cache;
pub mod decoder;
pub mod factory;
pub mod handle;
pub mod kind;
pub mod loader;
pub mod manager;
pub mod pool;
pub mod resource;
pub mod resref;

pub use asset_types::{Color, Palette, PaletteRef, PALETTE_SIZE};
pub use cache::{CacheStats, Lookup, ObjectCache, RefCount};
pub use decoder::{DecodeContext, Decoder, DecoderRegistry};
pub use factory::{FactoryCache, FactoryId};
pub use handle::{FreeOutcome, Release, Shared};
pub use kind::ResourceKind;
pub use loader::{DataStream, DirectoryResolver, MemoryResolver, Resolver};
pub use manager::{CreatureSource, ManagerStats, ResourceManager};
pub use pool::{SlotTarget, TableCache, TableId};
pub use resource::{AnimationSource, Catalog, Creature, GameState, JoinFlags, ScriptedAnimation, Stance};
pub use resref::{ResRef, RESREF_LEN};
