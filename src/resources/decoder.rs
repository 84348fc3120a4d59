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

//! Format decoders and the per-kind registry that hands them out.

use crate::error::{CacheError, Result};
use crate::resources::{DataStream, ResRef, ResourceKind};
use ahash::AHashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Context provided to decoders
#[derive(Clone, Copy, Debug)]
pub struct DecodeContext<'a> {
    /// Name the resource was requested under (decoders stamp it as the source)
    pub name: &'a ResRef,
    /// Party slot for creature decoders, 0 otherwise
    pub party_slot: u32,
    /// Suppress decoder diagnostics
    pub silent: bool,
}

impl<'a> DecodeContext<'a> {
    pub fn new(name: &'a ResRef) -> Self {
        Self {
            name,
            party_slot: 0,
            silent: false,
        }
    }
}

/// One-shot decoder for a single resource format.
///
/// A decoder takes ownership of the stream in `open` and drops it if the
/// header is rejected, so a failed open never leaks the stream to the caller.
pub trait Decoder: Send {
    type Output;

    /// Validate the header and keep the stream
    fn open(&mut self, stream: DataStream) -> Result<()>;

    /// Produce the domain object from the opened stream
    fn decode(&mut self, context: &DecodeContext<'_>) -> Result<Self::Output>;
}

type DecoderFactory<T> = Arc<dyn Fn() -> Box<dyn Decoder<Output = T>> + Send + Sync>;

/// Registry of decoder factories keyed by stream kind and output type.
///
/// The same stream kind may feed several outputs (an image stream yields both
/// palettes and image factories), so the output type is part of the key.
#[derive(Default)]
pub struct DecoderRegistry {
    factories: AHashMap<(ResourceKind, TypeId), Box<dyn Any + Send + Sync>>,
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoder factory for `kind` producing `T`
    pub fn register<T, F>(&mut self, kind: ResourceKind, factory: F)
    where
        T: 'static,
        F: Fn() -> Box<dyn Decoder<Output = T>> + Send + Sync + 'static,
    {
        let factory: DecoderFactory<T> = Arc::new(factory);
        self.factories
            .insert((kind, TypeId::of::<T>()), Box::new(factory));
    }

    pub fn supports<T: 'static>(&self, kind: ResourceKind) -> bool {
        self.factories.contains_key(&(kind, TypeId::of::<T>()))
    }

    /// Fresh decoder instance; dropping it releases it
    pub fn obtain<T: 'static>(&self, kind: ResourceKind) -> Result<Box<dyn Decoder<Output = T>>> {
        self.factories
            .get(&(kind, TypeId::of::<T>()))
            .and_then(|factory| factory.downcast_ref::<DecoderFactory<T>>())
            .map(|factory| factory())
            .ok_or(CacheError::UnsupportedKind(kind))
    }

    /// Open `stream` with a fresh decoder for `kind` and decode it.
    ///
    /// `kind` picks the decoder and may differ from the stream's own kind
    /// (exported characters go through the creature decoder).
    pub fn decode<T: 'static>(
        &self,
        kind: ResourceKind,
        stream: DataStream,
        context: &DecodeContext<'_>,
    ) -> Result<T> {
        let mut decoder = self.obtain::<T>(kind)?;
        decoder.open(stream)?;
        decoder.decode(context)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Utf8Decoder {
        data: Option<Vec<u8>>,
        kind: ResourceKind,
        name: ResRef,
    }

    impl Decoder for Utf8Decoder {
        type Output = String;

        fn open(&mut self, mut stream: DataStream) -> Result<()> {
            self.kind = stream.kind();
            self.name = *stream.name();
            self.data = Some(stream.read_all()?);
            Ok(())
        }

        fn decode(&mut self, _context: &DecodeContext<'_>) -> Result<String> {
            let data = self.data.take().unwrap_or_default();
            String::from_utf8(data).map_err(|e| CacheError::DecodeFailure {
                name: self.name,
                kind: self.kind,
                reason: e.to_string(),
            })
        }
    }

    fn utf8_decoder() -> Box<dyn Decoder<Output = String>> {
        Box::new(Utf8Decoder {
            data: None,
            kind: ResourceKind::Table,
            name: ResRef::default(),
        })
    }

    #[test]
    fn test_registry_decodes_registered_kind() {
        let mut registry = DecoderRegistry::new();
        registry.register(ResourceKind::Table, utf8_decoder);
        assert!(registry.supports::<String>(ResourceKind::Table));

        let name = ResRef::new("XPLEVEL");
        let stream = DataStream::from_bytes(name, ResourceKind::Table, b"2DA V1.0".to_vec());
        let text: String = registry
            .decode(ResourceKind::Table, stream, &DecodeContext::new(&name))
            .unwrap();
        assert_eq!(text, "2DA V1.0");
    }

    #[test]
    fn test_unregistered_kind_is_unsupported() {
        let mut registry = DecoderRegistry::new();
        registry.register(ResourceKind::Table, utf8_decoder);

        assert!(matches!(
            registry.obtain::<String>(ResourceKind::Spell),
            Err(CacheError::UnsupportedKind(ResourceKind::Spell))
        ));
        // Same kind, different output type
        assert!(registry.obtain::<Vec<u8>>(ResourceKind::Table).is_err());
    }

    #[test]
    fn test_decode_failure_propagates() {
        let mut registry = DecoderRegistry::new();
        registry.register(ResourceKind::Table, utf8_decoder);

        let name = ResRef::new("BROKEN");
        let stream = DataStream::from_bytes(name, ResourceKind::Table, vec![0xff, 0xfe]);
        let err = registry
            .decode::<String>(ResourceKind::Table, stream, &DecodeContext::new(&name))
            .unwrap_err();
        assert!(matches!(err, CacheError::DecodeFailure { .. }));
    }
}
