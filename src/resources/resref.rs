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

//! Fixed-width, case-insensitive resource names.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Maximum number of bytes in a resource name
pub const RESREF_LEN: usize = 8;

/// Resource identifier.
///
/// Stored lowercased and zero-padded, so equality and hashing are
/// case-insensitive without comparing strings on every lookup.
/// Names longer than [`RESREF_LEN`] bytes are truncated.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ResRef {
    bytes: [u8; RESREF_LEN],
}

impl ResRef {
    /// Create a name, truncating and lowercasing
    pub fn new(name: &str) -> Self {
        Self::from_bytes(name.as_bytes())
    }

    /// Create a name from raw bytes; stops at the first NUL
    pub fn from_bytes(raw: &[u8]) -> Self {
        let mut bytes = [0u8; RESREF_LEN];
        for (dst, src) in bytes
            .iter_mut()
            .zip(raw.iter().take_while(|b| **b != 0))
        {
            *dst = src.to_ascii_lowercase();
        }
        Self { bytes }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes[0] == 0
    }

    pub fn len(&self) -> usize {
        self.bytes.iter().position(|b| *b == 0).unwrap_or(RESREF_LEN)
    }

    /// Normalized bytes without padding
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len()]
    }

    /// Normalized name, lossy if truncation split a multi-byte character
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }
}

impl fmt::Display for ResRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl fmt::Debug for ResRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResRef({:?})", self.as_str())
    }
}

impl From<&str> for ResRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl FromStr for ResRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl Serialize for ResRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::new(&name))
    }
}
