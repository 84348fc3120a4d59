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

use crate::resources::Shared;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Number of entries in a palette
pub const PALETTE_SIZE: usize = 256;

/// RGBA color
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// 256-entry palette
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: [Color; PALETTE_SIZE],
    named: bool,
}

impl Palette {
    /// Caller-owned palette; missing entries stay black
    pub fn new(colors: &[Color]) -> Self {
        let mut palette = [Color::default(); PALETTE_SIZE];
        for (dst, src) in palette.iter_mut().zip(colors) {
            *dst = *src;
        }
        Self {
            colors: palette,
            named: false,
        }
    }

    /// Mark as cache-owned, released only by name
    pub(crate) fn into_named(mut self) -> Self {
        self.named = true;
        self
    }

    /// Whether the palette came out of the named palette cache
    pub fn is_named(&self) -> bool {
        self.named
    }

    pub fn colors(&self) -> &[Color; PALETTE_SIZE] {
        &self.colors
    }

    pub fn color(&self, index: u8) -> Color {
        self.colors[index as usize]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(&[])
    }
}

/// A palette as held by a caller.
///
/// Whether it must be released by name is decided by the palette's own
/// `named` flag, not by the variant: a cached palette detached from its
/// handle is still named.
#[derive(Debug, Clone)]
pub enum PaletteRef {
    /// Handle from the palette cache
    Cached(Shared<Palette>),
    Owned(Arc<Palette>),
}

impl PaletteRef {
    pub fn palette(&self) -> &Palette {
        match self {
            PaletteRef::Cached(handle) => &**handle,
            PaletteRef::Owned(palette) => &**palette,
        }
    }
}

impl From<Shared<Palette>> for PaletteRef {
    fn from(handle: Shared<Palette>) -> Self {
        PaletteRef::Cached(handle)
    }
}

impl From<Palette> for PaletteRef {
    fn from(palette: Palette) -> Self {
        PaletteRef::Owned(Arc::new(palette))
    }
}
