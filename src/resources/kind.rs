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

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource category; selects the decoder and the cache a name lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Creature,
    /// Exported player character (save-file creature)
    Character,
    Item,
    Spell,
    Effect,
    Table,
    Image,
    Animation,
    ScriptedAnimation,
    /// Palette cache; palettes are read from image streams
    Palette,
}

impl ResourceKind {
    /// File extension used by directory resolvers
    pub fn extension(self) -> &'static str {
        match self {
            ResourceKind::Creature => "cre",
            ResourceKind::Character => "chr",
            ResourceKind::Item => "itm",
            ResourceKind::Spell => "spl",
            ResourceKind::Effect => "eff",
            ResourceKind::Table => "2da",
            ResourceKind::Image => "bmp",
            ResourceKind::Animation => "bam",
            ResourceKind::ScriptedAnimation => "vvc",
            ResourceKind::Palette => "bmp",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceKind::Creature => "Creature",
            ResourceKind::Character => "Character",
            ResourceKind::Item => "Item",
            ResourceKind::Spell => "Spell",
            ResourceKind::Effect => "Effect",
            ResourceKind::Table => "Table",
            ResourceKind::Image => "Image",
            ResourceKind::Animation => "Animation",
            ResourceKind::ScriptedAnimation => "ScriptedAnimation",
            ResourceKind::Palette => "Palette",
        };
        f.write_str(label)
    }
}
