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

//! Domain types the resource layer hands out but does not define.

use crate::resources::ResRef;
use bitflags::bitflags;

/// Concrete domain types of one game
pub trait Catalog: 'static {
    type Item: Send + Sync + 'static;
    type Spell: Send + Sync + 'static;
    type Effect: Send + Sync + 'static;
    type Table: Send + Sync + 'static;
    type Creature: Creature + 'static;
    /// Multi-frame sprite source built from an animation stream
    type Animation: AnimationSource<Clip = Self::ScriptedAnimation> + Send + Sync + 'static;
    /// Image source built from an image stream
    type Image: Send + Sync + 'static;
    type ScriptedAnimation: ScriptedAnimation + 'static;
}

/// Animation stance set after a creature is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stance {
    Awake,
    /// Corpse twitch, used for creatures loaded dead
    Twitch,
}

/// Creature capabilities touched by post-load normalization
pub trait Creature {
    fn set_area(&mut self, area: ResRef);
    fn is_dead(&self) -> bool;
    fn set_stance(&mut self, stance: Stance);
    fn set_orientation(&mut self, orientation: u8, slow: bool);
}

/// Source of individual frames and clips
pub trait AnimationSource {
    type Sprite;
    type Clip;

    /// One frame; `cycle = None` addresses frames without going through a cycle
    fn frame(&self, cycle: Option<u8>, frame: u16) -> Option<Self::Sprite>;

    /// Build a playable clip from this source
    fn clip(&self, double_size: bool) -> Option<Self::Clip>;
}

pub trait ScriptedAnimation {
    /// Record the resource the animation was built from
    fn set_resource_name(&mut self, name: ResRef);
}

bitflags! {
    /// How a creature joins the party
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct JoinFlags: u32 {
        const JOIN = 1 << 0;
        /// Place at the party's initial position
        const INIT_POS = 1 << 1;
    }
}

/// Game-state collaborator for the creature load path
pub trait GameState {
    type Actor;

    fn current_area(&self) -> ResRef;

    /// Status code from the game
    fn join_party(&mut self, actor: Self::Actor, flags: JoinFlags) -> i32;

    fn add_npc(&mut self, actor: Self::Actor) -> i32;
}
