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

//! Resource resolution: turning a (name, kind) pair into a byte stream.

use crate::error::{CacheError, Result};
use crate::resources::{ResRef, ResourceKind};
use ahash::AHashMap;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Owned byte source for one resource
pub struct DataStream {
    name: ResRef,
    kind: ResourceKind,
    reader: Box<dyn Read + Send>,
}

impl DataStream {
    pub fn new(name: ResRef, kind: ResourceKind, reader: Box<dyn Read + Send>) -> Self {
        Self { name, kind, reader }
    }

    pub fn from_bytes(name: ResRef, kind: ResourceKind, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(name, kind, Box::new(Cursor::new(bytes.into())))
    }

    /// Open a file outside the resolver search paths (save files, exports)
    pub fn from_file(path: &Path, name: ResRef, kind: ResourceKind) -> Result<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CacheError::NotFound { name, kind },
            _ => CacheError::IoError(format!("Failed to open {}: {e}", path.display())),
        })?;
        Ok(Self::new(name, kind, Box::new(BufReader::new(file))))
    }

    pub fn name(&self) -> &ResRef {
        &self.name
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Drain the remaining bytes
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.reader.read_to_end(&mut data)?;
        Ok(data)
    }
}

impl Read for DataStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl std::fmt::Debug for DataStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStream")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Content store lookup
pub trait Resolver: Send + Sync {
    /// Fresh stream for the resource, `None` if the store has no such resource
    fn open(&self, name: &ResRef, kind: ResourceKind) -> Option<DataStream>;

    /// Existence check without opening
    fn exists(&self, name: &ResRef, kind: ResourceKind) -> bool;
}

/// Resolver over loose files in a list of directories.
///
/// Roots are searched in order; the first `<name>.<ext>` hit wins.
pub struct DirectoryResolver {
    roots: Vec<PathBuf>,
}

impl DirectoryResolver {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn file_name(name: &ResRef, kind: ResourceKind) -> String {
        format!("{name}.{}", kind.extension())
    }

    fn locate(&self, name: &ResRef, kind: ResourceKind) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }
        let file_name = Self::file_name(name, kind);
        self.roots
            .iter()
            .map(|root| root.join(&file_name))
            .find(|path| path.is_file())
    }
}

impl Resolver for DirectoryResolver {
    fn open(&self, name: &ResRef, kind: ResourceKind) -> Option<DataStream> {
        let path = self.locate(name, kind)?;
        match DataStream::from_file(&path, *name, kind) {
            Ok(stream) => Some(stream),
            Err(e) => {
                tracing::warn!(%name, ?kind, error = %e, "resource located but could not be opened");
                None
            }
        }
    }

    fn exists(&self, name: &ResRef, kind: ResourceKind) -> bool {
        self.locate(name, kind).is_some()
    }
}

/// In-memory content store.
///
/// Counts every `open` per key, which makes it the resolver of choice when a
/// caller needs to prove something was (or was not) resolved again.
#[derive(Default)]
pub struct MemoryResolver {
    entries: AHashMap<(ResRef, ResourceKind), Arc<[u8]>>,
    opens: Mutex<AHashMap<(ResRef, ResourceKind), usize>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, kind: ResourceKind, bytes: impl Into<Vec<u8>>) {
        let bytes: Vec<u8> = bytes.into();
        self.entries.insert((ResRef::new(name), kind), bytes.into());
    }

    pub fn with(mut self, name: &str, kind: ResourceKind, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, kind, bytes);
        self
    }

    /// Number of `open` calls made for the key, hits and misses alike
    pub fn open_count(&self, name: &str, kind: ResourceKind) -> usize {
        self.opens
            .lock()
            .get(&(ResRef::new(name), kind))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_opens(&self) -> usize {
        self.opens.lock().values().sum()
    }
}

impl Resolver for MemoryResolver {
    fn open(&self, name: &ResRef, kind: ResourceKind) -> Option<DataStream> {
        *self.opens.lock().entry((*name, kind)).or_insert(0) += 1;
        let bytes = self.entries.get(&(*name, kind))?;
        Some(DataStream::from_bytes(*name, kind, bytes.to_vec()))
    }

    fn exists(&self, name: &ResRef, kind: ResourceKind) -> bool {
        self.entries.contains_key(&(*name, kind))
    }
}

impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    fn open(&self, name: &ResRef, kind: ResourceKind) -> Option<DataStream> {
        (**self).open(name, kind)
    }

    fn exists(&self, name: &ResRef, kind: ResourceKind) -> bool {
        (**self).exists(name, kind)
    }
}
