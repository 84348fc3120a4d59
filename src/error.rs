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

//! Error types

use crate::resources::{ResRef, ResourceKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource layer error type
#[derive(Debug, Clone)]
pub enum CacheError {
    /// Resolver has no stream for the identifier
    NotFound { name: ResRef, kind: ResourceKind },

    /// Decoder rejected the stream
    DecodeFailure {
        name: ResRef,
        kind: ResourceKind,
        reason: String,
    },

    /// No decoder registered for the kind
    UnsupportedKind(ResourceKind),

    /// Shared-ownership protocol broken (only surfaces under `ViolationPolicy::Report`)
    ProtocolViolation(ProtocolViolation),

    /// IO error (file operations, etc.)
    IoError(String),

    /// Configuration could not be read or parsed
    ConfigError(String),
}

/// Breaches of the refcount protocol.
///
/// These are never recovered from in production: a violation means some other
/// holder may already reference a released object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// Release would take the refcount below zero
    Underflow { kind: ResourceKind, name: ResRef },
    /// Release names a key whose cached object is not the one handed in
    Mismatch { kind: ResourceKind, name: ResRef },
    /// Insert over a key that already has a live entry
    DuplicateEntry { kind: ResourceKind, name: ResRef },
    /// Cache-owned palette released without its name
    NamedPaletteWithoutName,
    /// Caller-owned palette released through the named path
    UnnamedPaletteWithName { name: ResRef },
    /// Handle outlived its entry without a teardown in between
    StaleHandle { kind: ResourceKind, name: ResRef },
}

impl ProtocolViolation {
    /// Key the violation was raised for, if any
    pub fn name(&self) -> Option<&ResRef> {
        match self {
            ProtocolViolation::Underflow { name, .. }
            | ProtocolViolation::Mismatch { name, .. }
            | ProtocolViolation::DuplicateEntry { name, .. }
            | ProtocolViolation::UnnamedPaletteWithName { name }
            | ProtocolViolation::StaleHandle { name, .. } => Some(name),
            ProtocolViolation::NamedPaletteWithoutName => None,
        }
    }
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolViolation::Underflow { kind, name } => write!(
                f,
                "Corrupted {kind} cache encountered (reference count went below zero), name is: {name}"
            ),
            ProtocolViolation::Mismatch { kind, name } => {
                write!(f, "{kind} released under {name} is not the cached object")
            }
            ProtocolViolation::DuplicateEntry { kind, name } => {
                write!(f, "{kind} cache already holds a live entry for {name}")
            }
            ProtocolViolation::NamedPaletteWithoutName => {
                write!(f, "Palette is supposed to be named, but got no name")
            }
            ProtocolViolation::UnnamedPaletteWithName { name } => {
                write!(f, "Unnamed palette, it should be {name}")
            }
            ProtocolViolation::StaleHandle { kind, name } => {
                write!(f, "{kind} handle for {name} outlived its cache entry")
            }
        }
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::NotFound { name, kind } => write!(f, "Resource not found: {name}.{}", kind.extension()),
            CacheError::DecodeFailure { name, kind, reason } => {
                write!(f, "Failed to decode {name}.{}: {reason}", kind.extension())
            }
            CacheError::UnsupportedKind(kind) => write!(f, "{} files are not supported", kind.extension()),
            CacheError::ProtocolViolation(violation) => write!(f, "Protocol violation: {violation}"),
            CacheError::IoError(msg) => write!(f, "IO error: {msg}"),
            CacheError::ConfigError(msg) => write!(f, "Config error: {msg}"),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::IoError(err.to_string())
    }
}

impl From<ProtocolViolation> for CacheError {
    fn from(violation: ProtocolViolation) -> Self {
        CacheError::ProtocolViolation(violation)
    }
}

/// What happens when the refcount protocol is broken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationPolicy {
    /// Log and abort the process
    #[default]
    Abort,
    /// Panic with the violation text
    Panic,
    /// Hand the violation back as `CacheError::ProtocolViolation`
    Report,
}

impl ViolationPolicy {
    /// Escalate a violation. Returns only under `Report`.
    pub fn escalate(self, violation: ProtocolViolation) -> CacheError {
        tracing::error!(%violation, "resource cache protocol violation");
        match self {
            ViolationPolicy::Abort => std::process::abort(),
            ViolationPolicy::Panic => panic!("{violation}"),
            ViolationPolicy::Report => CacheError::ProtocolViolation(violation),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CacheError>;
