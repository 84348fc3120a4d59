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

//! Central resource manager.
//!
//! Every `get_*` answers `None` for anything recoverable (missing resource,
//! unsupported kind, bad data) and has a `try_*` twin that says why.
//! Releases go through `free_*`; protocol violations there escalate according
//! to the configured [`ViolationPolicy`](crate::ViolationPolicy).

use crate::config::ManagerConfig;
use crate::error::{CacheError, ProtocolViolation, Result};
use crate::resources::{
    AnimationSource, Catalog, Creature, DataStream, DecodeContext, DecoderRegistry, FactoryCache,
    FreeOutcome, GameState, JoinFlags, Lookup, ObjectCache, Palette, PaletteRef, Release, ResRef,
    ResourceKind, Resolver, ScriptedAnimation, Shared, SlotTarget, Stance, TableCache, TableId,
};
use crate::resources::cache::CacheStats;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[cfg(feature = "profiling")]
use tracing::info_span;

/// Where `load_creature` reads the creature from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatureSource {
    /// Through the resolver
    Resource,
    /// Exported character file under the characters directory
    Character,
}

/// Snapshot of all caches
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagerStats {
    pub items: CacheStats,
    pub spells: CacheStats,
    pub effects: CacheStats,
    pub palettes: CacheStats,
    pub live_tables: usize,
    pub table_slots: usize,
    pub factories: usize,
}

impl ManagerStats {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CacheError::IoError(e.to_string()))
    }
}

/// Resource manager for one game session.
///
/// Owned by the session and passed to whatever needs resources; dropping it
/// (or calling [`shutdown`](Self::shutdown)) releases everything it cached.
pub struct ResourceManager<C: Catalog> {
    config: ManagerConfig,
    resolver: Box<dyn Resolver>,
    decoders: DecoderRegistry,
    items: ObjectCache<C::Item>,
    spells: ObjectCache<C::Spell>,
    effects: ObjectCache<C::Effect>,
    palettes: ObjectCache<Palette>,
    tables: TableCache<C::Table>,
    factories: FactoryCache,
}

impl<C: Catalog> ResourceManager<C> {
    pub fn new(resolver: impl Resolver + 'static, decoders: DecoderRegistry, config: ManagerConfig) -> Self {
        let policy = config.violation_policy;
        Self {
            config,
            resolver: Box::new(resolver),
            decoders,
            items: ObjectCache::new(ResourceKind::Item, policy),
            spells: ObjectCache::new(ResourceKind::Spell, policy),
            effects: ObjectCache::new(ResourceKind::Effect, policy),
            palettes: ObjectCache::new(ResourceKind::Palette, policy),
            tables: TableCache::new(),
            factories: FactoryCache::new(),
        }
    }

    /// Manager resolving from the configured search paths
    pub fn from_config(config: ManagerConfig, decoders: DecoderRegistry) -> Self {
        let resolver = config.directory_resolver();
        Self::new(resolver, decoders, config)
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn resolver(&self) -> &dyn Resolver {
        self.resolver.as_ref()
    }

    pub fn decoders_mut(&mut self) -> &mut DecoderRegistry {
        &mut self.decoders
    }

    pub fn items(&self) -> &ObjectCache<C::Item> {
        &self.items
    }

    pub fn spells(&self) -> &ObjectCache<C::Spell> {
        &self.spells
    }

    pub fn effects(&self) -> &ObjectCache<C::Effect> {
        &self.effects
    }

    pub fn palettes(&self) -> &ObjectCache<Palette> {
        &self.palettes
    }

    pub fn tables(&self) -> &TableCache<C::Table> {
        &self.tables
    }

    pub fn factories(&self) -> &FactoryCache {
        &self.factories
    }

    fn violation(&self, violation: ProtocolViolation) -> CacheError {
        self.config.violation_policy.escalate(violation)
    }

    fn open(&self, name: &ResRef, kind: ResourceKind) -> Result<DataStream> {
        self.resolver
            .open(name, kind)
            .ok_or(CacheError::NotFound { name: *name, kind })
    }

    /// Turn a load failure into the `None` the public getters return
    fn recover<T>(result: Result<T>, silent: bool) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(CacheError::NotFound { name, kind }) => {
                if !silent {
                    tracing::debug!(%name, %kind, "resource not found");
                }
                None
            }
            // Already logged when it was escalated
            Err(CacheError::ProtocolViolation(_)) => None,
            Err(err) => {
                tracing::warn!(error = %err, "resource unavailable");
                None
            }
        }
    }

    /// Cached lookup, decoding and inserting on a miss
    fn fetch<T: Send + Sync + 'static>(
        &self,
        cache: &ObjectCache<T>,
        name: &str,
        silent: bool,
    ) -> Result<Shared<T>> {
        let key = ResRef::new(name);
        let kind = cache.kind();

        #[cfg(feature = "profiling")]
        let _span = info_span!("fetch", %kind, name = %key).entered();

        match cache.get(&key) {
            Lookup::Hit(handle) => return Ok(handle),
            Lookup::KnownAbsent => return Err(CacheError::NotFound { name: key, kind }),
            Lookup::Miss => {}
        }
        let stream = self.open(&key, kind)?;
        let context = DecodeContext {
            silent,
            ..DecodeContext::new(&key)
        };
        let object = self.decoders.decode::<T>(kind, stream, &context)?;
        cache.set_at(&key, object).map_err(|v| self.violation(v))
    }

    pub fn try_get_item(&self, name: &str) -> Result<Shared<C::Item>> {
        self.fetch(&self.items, name, false)
    }

    pub fn get_item(&self, name: &str) -> Option<Shared<C::Item>> {
        Self::recover(self.try_get_item(name), false)
    }

    /// Release one item holder; `Release::Keep` hands the last copy back
    pub fn free_item(&self, item: Shared<C::Item>, release: Release) -> Result<FreeOutcome<C::Item>> {
        item.release(release).map_err(|v| self.violation(v))
    }

    /// Release by name and object, for holders detached with `Shared::into_raw`
    pub fn free_item_raw(
        &self,
        name: &str,
        item: &Arc<C::Item>,
        release: Release,
    ) -> Result<FreeOutcome<C::Item>> {
        self.items
            .dec_ref(&ResRef::new(name), item, release)
            .map_err(|v| self.violation(v))
    }

    pub fn try_get_spell(&self, name: &str, silent: bool) -> Result<Shared<C::Spell>> {
        self.fetch(&self.spells, name, silent)
    }

    pub fn get_spell(&self, name: &str, silent: bool) -> Option<Shared<C::Spell>> {
        Self::recover(self.try_get_spell(name, silent), silent)
    }

    pub fn free_spell(&self, spell: Shared<C::Spell>, release: Release) -> Result<FreeOutcome<C::Spell>> {
        spell.release(release).map_err(|v| self.violation(v))
    }

    pub fn free_spell_raw(
        &self,
        name: &str,
        spell: &Arc<C::Spell>,
        release: Release,
    ) -> Result<FreeOutcome<C::Spell>> {
        self.spells
            .dec_ref(&ResRef::new(name), spell, release)
            .map_err(|v| self.violation(v))
    }

    pub fn try_get_effect(&self, name: &str) -> Result<Shared<C::Effect>> {
        self.fetch(&self.effects, name, false)
    }

    pub fn get_effect(&self, name: &str) -> Option<Shared<C::Effect>> {
        Self::recover(self.try_get_effect(name), false)
    }

    pub fn free_effect(&self, effect: Shared<C::Effect>, release: Release) -> Result<FreeOutcome<C::Effect>> {
        effect.release(release).map_err(|v| self.violation(v))
    }

    pub fn free_effect_raw(
        &self,
        name: &str,
        effect: &Arc<C::Effect>,
        release: Release,
    ) -> Result<FreeOutcome<C::Effect>> {
        self.effects
            .dec_ref(&ResRef::new(name), effect, release)
            .map_err(|v| self.violation(v))
    }

    /// Palette from the image of the same name.
    ///
    /// Misses are cached: a name that failed to resolve once is never
    /// resolved again until the caches are cleared.
    pub fn try_get_palette(&self, name: &str) -> Result<Shared<Palette>> {
        let key = ResRef::new(name);
        let kind = ResourceKind::Image;
        match self.palettes.get(&key) {
            Lookup::Hit(handle) => return Ok(handle),
            Lookup::KnownAbsent => return Err(CacheError::NotFound { name: key, kind }),
            Lookup::Miss => {}
        }
        let Some(stream) = self.resolver.open(&key, kind) else {
            self.palettes.set_absent(&key).map_err(|v| self.violation(v))?;
            return Err(CacheError::NotFound { name: key, kind });
        };
        let palette = self
            .decoders
            .decode::<Palette>(kind, stream, &DecodeContext::new(&key))?;
        self.palettes
            .set_at(&key, palette.into_named())
            .map_err(|v| self.violation(v))
    }

    pub fn get_palette(&self, name: &str) -> Option<Shared<Palette>> {
        Self::recover(self.try_get_palette(name), false)
    }

    /// Release a palette.
    ///
    /// Named palettes must be released with their name, caller-built ones
    /// without; crossing the two is a protocol violation.
    pub fn free_palette(&self, palette: PaletteRef, name: Option<&str>) -> Result<FreeOutcome<Palette>> {
        let name = name.map(ResRef::new).filter(|name| !name.is_empty());
        let named = palette.palette().is_named();
        match (name, palette) {
            (None, _) if named => Err(self.violation(ProtocolViolation::NamedPaletteWithoutName)),
            (None, _) => Ok(FreeOutcome::Released),
            (Some(name), _) if !named => {
                Err(self.violation(ProtocolViolation::UnnamedPaletteWithName { name }))
            }
            (Some(name), PaletteRef::Cached(handle)) => {
                if *handle.name() != name {
                    let violation = ProtocolViolation::Mismatch {
                        kind: ResourceKind::Palette,
                        name,
                    };
                    // The handle itself is still valid; let it go normally
                    drop(handle);
                    return Err(self.violation(violation));
                }
                handle.release(Release::Free).map_err(|v| self.violation(v))
            }
            (Some(name), PaletteRef::Owned(palette)) => self
                .palettes
                .dec_ref(&name, &palette, Release::Free)
                .map_err(|v| self.violation(v)),
        }
    }

    /// Fresh, uncached creature. Every call decodes a new instance.
    pub fn try_get_creature(&self, name: &str, party_slot: u32) -> Result<C::Creature> {
        let key = ResRef::new(name);
        let stream = self.open(&key, ResourceKind::Creature)?;
        let context = DecodeContext {
            party_slot,
            ..DecodeContext::new(&key)
        };
        self.decoders
            .decode::<C::Creature>(ResourceKind::Creature, stream, &context)
    }

    pub fn get_creature(&self, name: &str, party_slot: u32) -> Option<C::Creature> {
        Self::recover(self.try_get_creature(name, party_slot), false)
    }

    /// Character files are named as given, not cut down to a resource name
    fn load_character(&self, name: &str, party_slot: u32) -> Result<C::Creature> {
        let key = ResRef::new(name);
        let path = self.config.character_path(name);
        let stream = DataStream::from_file(&path, key, ResourceKind::Character)?;
        let context = DecodeContext {
            party_slot,
            ..DecodeContext::new(&key)
        };
        self.decoders
            .decode::<C::Creature>(ResourceKind::Creature, stream, &context)
    }

    /// Load a creature and hand it to the game.
    ///
    /// The creature is placed in the current area, set awake (or twitching if
    /// loaded dead) and faced south. A non-zero party slot joins the party,
    /// slot 0 adds it as an NPC. Returns the game's status code.
    pub fn load_creature<G>(
        &self,
        name: &str,
        party_slot: u32,
        source: CreatureSource,
        game: &mut G,
    ) -> Result<i32>
    where
        G: GameState<Actor = C::Creature>,
    {
        let mut actor = match source {
            CreatureSource::Resource => self.try_get_creature(name, party_slot)?,
            CreatureSource::Character => self.load_character(name, party_slot)?,
        };

        actor.set_area(game.current_area());
        let stance = if actor.is_dead() {
            Stance::Twitch
        } else {
            Stance::Awake
        };
        actor.set_stance(stance);
        actor.set_orientation(0, false);

        if party_slot != 0 {
            Ok(game.join_party(actor, JoinFlags::JOIN | JoinFlags::INIT_POS))
        } else {
            Ok(game.add_npc(actor))
        }
    }

    /// Load a table, or count another load of a live one
    pub fn try_load_table(&mut self, name: &str) -> Result<TableId> {
        let key = ResRef::new(name);

        #[cfg(feature = "profiling")]
        let _span = info_span!("load_table", name = %key).entered();

        if let Some(id) = self.tables.acquire(&key) {
            return Ok(id);
        }
        let stream = self.open(&key, ResourceKind::Table)?;
        let table = self
            .decoders
            .decode::<C::Table>(ResourceKind::Table, stream, &DecodeContext::new(&key))?;
        let id = self.tables.insert(key, table);
        tracing::debug!(name = %key, slot = id.index(), "table loaded");
        Ok(id)
    }

    pub fn load_table(&mut self, name: &str) -> Option<TableId> {
        Self::recover(self.try_load_table(name), false)
    }

    pub fn table_index(&self, name: &str) -> Option<TableId> {
        self.tables.index_of(&ResRef::new(name))
    }

    pub fn get_table(&self, id: TableId) -> Option<Arc<C::Table>> {
        self.tables.get(id)
    }

    /// Release one load of a table, or all tables with `SlotTarget::All`
    pub fn del_table(&mut self, target: impl Into<SlotTarget>) -> bool {
        self.tables.release(target)
    }

    /// Factory lookup-or-build, keyed by name and kind
    fn factory_resource<T: Send + Sync + 'static>(
        &mut self,
        name: &str,
        kind: ResourceKind,
        silent: bool,
    ) -> Result<Arc<T>> {
        let key = ResRef::new(name);
        if let Some(id) = self.factories.is_loaded(&key, kind) {
            return self
                .factories
                .get_factory_object::<T>(id)
                .ok_or(CacheError::UnsupportedKind(kind));
        }
        if key.is_empty() {
            return Err(CacheError::NotFound { name: key, kind });
        }

        #[cfg(feature = "profiling")]
        let _span = info_span!("build_factory", %kind, name = %key).entered();

        let stream = self.open(&key, kind)?;
        let context = DecodeContext {
            silent,
            ..DecodeContext::new(&key)
        };
        let object = Arc::new(self.decoders.decode::<T>(kind, stream, &context)?);
        self.factories.add_factory_object(key, kind, Arc::clone(&object));
        Ok(object)
    }

    pub fn try_get_animation_factory(&mut self, name: &str) -> Result<Arc<C::Animation>> {
        self.factory_resource(name, ResourceKind::Animation, false)
    }

    pub fn get_animation_factory(&mut self, name: &str) -> Option<Arc<C::Animation>> {
        Self::recover(self.try_get_animation_factory(name), false)
    }

    pub fn try_get_image_factory(&mut self, name: &str) -> Result<Arc<C::Image>> {
        self.factory_resource(name, ResourceKind::Image, false)
    }

    pub fn get_image_factory(&mut self, name: &str) -> Option<Arc<C::Image>> {
        Self::recover(self.try_get_image_factory(name), false)
    }

    /// Single frame of an animation. Builds (and keeps) the whole factory,
    /// so only worth it when one frame is all that is needed.
    pub fn get_bam_sprite(
        &mut self,
        name: &str,
        cycle: Option<u8>,
        frame: u16,
    ) -> Option<<C::Animation as AnimationSource>::Sprite> {
        self.get_animation_factory(name)?.frame(cycle, frame)
    }

    /// Scripted animation by name.
    ///
    /// A dedicated scripted-animation resource wins; otherwise the clip is
    /// built from the animation factory of the same name.
    pub fn try_get_scripted_animation(
        &mut self,
        name: &str,
        double_size: bool,
    ) -> Result<C::ScriptedAnimation> {
        let key = ResRef::new(name);
        let mut clip = if self.resolver.exists(&key, ResourceKind::ScriptedAnimation) {
            let stream = self.open(&key, ResourceKind::ScriptedAnimation)?;
            self.decoders.decode::<C::ScriptedAnimation>(
                ResourceKind::ScriptedAnimation,
                stream,
                &DecodeContext::new(&key),
            )?
        } else {
            let factory = self.try_get_animation_factory(name)?;
            factory.clip(double_size).ok_or_else(|| CacheError::DecodeFailure {
                name: key,
                kind: ResourceKind::Animation,
                reason: "animation yields no clip".to_string(),
            })?
        };
        clip.set_resource_name(key);
        Ok(clip)
    }

    pub fn get_scripted_animation(&mut self, name: &str, double_size: bool) -> Option<C::ScriptedAnimation> {
        Self::recover(self.try_get_scripted_animation(name, double_size), false)
    }

    /// Drop every cached item, spell, effect and palette regardless of holders.
    ///
    /// Only safe once nothing else still uses them; outstanding handles go
    /// inert.
    pub fn clear_caches(&self) {
        let released = self.items.remove_all()
            + self.spells.remove_all()
            + self.effects.remove_all()
            + self.palettes.remove_all();
        tracing::debug!(released, "resource caches cleared");
    }

    /// Session teardown: caches and tables. Factories stay.
    pub fn shutdown(&mut self) {
        self.clear_caches();
        self.tables.release(SlotTarget::All);
    }

    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            items: self.items.stats(),
            spells: self.spells.stats(),
            effects: self.effects.stats(),
            palettes: self.palettes.stats(),
            live_tables: self.tables.live_count(),
            table_slots: self.tables.len(),
            factories: self.factories.len(),
        }
    }
}
