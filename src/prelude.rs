//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use gamedata::prelude::*;
//! ```

pub use crate::config::ManagerConfig;
pub use crate::error::{CacheError, ProtocolViolation, Result, ViolationPolicy};
pub use crate::resources::{
    AnimationSource, Catalog, Creature, CreatureSource, DataStream, DecodeContext, Decoder,
    DecoderRegistry, FreeOutcome, GameState, JoinFlags, Palette, PaletteRef, Release, ResRef,
    ResourceKind, ResourceManager, Resolver, ScriptedAnimation, Shared, Stance, TableId,
};
