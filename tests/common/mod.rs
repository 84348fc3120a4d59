#![allow(dead_code)]

use gamedata::prelude::*;
use gamedata::{Color, MemoryResolver};
use std::sync::Arc;

/// Text-based stand-ins for the real game formats
pub struct TestCatalog;

impl Catalog for TestCatalog {
    type Item = TestItem;
    type Spell = TestSpell;
    type Effect = TestEffect;
    type Table = TestTable;
    type Creature = TestCreature;
    type Animation = TestAnimation;
    type Image = TestImage;
    type ScriptedAnimation = TestClip;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestItem {
    pub source: ResRef,
    pub label: String,
}

#[derive(Debug, PartialEq)]
pub struct TestSpell {
    pub source: ResRef,
    pub level: u8,
}

#[derive(Debug, PartialEq)]
pub struct TestEffect {
    pub opcode: u32,
}

#[derive(Debug, PartialEq)]
pub struct TestTable {
    pub rows: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestCreature {
    pub source: ResRef,
    pub dead: bool,
    pub party_slot: u32,
    pub area: Option<ResRef>,
    pub stance: Option<Stance>,
    pub orientation: Option<u8>,
}

impl Creature for TestCreature {
    fn set_area(&mut self, area: ResRef) {
        self.area = Some(area);
    }

    fn is_dead(&self) -> bool {
        self.dead
    }

    fn set_stance(&mut self, stance: Stance) {
        self.stance = Some(stance);
    }

    fn set_orientation(&mut self, orientation: u8, _slow: bool) {
        self.orientation = Some(orientation);
    }
}

#[derive(Debug)]
pub struct TestAnimation {
    pub source: ResRef,
    pub frames: u16,
}

#[derive(Debug, PartialEq)]
pub struct TestSprite {
    pub cycle: Option<u8>,
    pub frame: u16,
}

impl AnimationSource for TestAnimation {
    type Sprite = TestSprite;
    type Clip = TestClip;

    fn frame(&self, cycle: Option<u8>, frame: u16) -> Option<TestSprite> {
        (frame < self.frames).then_some(TestSprite { cycle, frame })
    }

    fn clip(&self, double_size: bool) -> Option<TestClip> {
        (self.frames > 0).then_some(TestClip {
            origin: ClipOrigin::Factory {
                frames: self.frames,
                double_size,
            },
            name: None,
        })
    }
}

#[derive(Debug)]
pub struct TestImage {
    pub source: ResRef,
    pub pixels: usize,
}

#[derive(Debug, PartialEq)]
pub enum ClipOrigin {
    Vvc,
    Factory { frames: u16, double_size: bool },
}

#[derive(Debug, PartialEq)]
pub struct TestClip {
    pub origin: ClipOrigin,
    pub name: Option<ResRef>,
}

impl ScriptedAnimation for TestClip {
    fn set_resource_name(&mut self, name: ResRef) {
        self.name = Some(name);
    }
}

type Parse<T> = fn(&DecodeContext<'_>, &str) -> Option<T>;

/// Decoder for `<HEADER> <body>` text resources
struct TextDecoder<T> {
    header: &'static str,
    parse: Parse<T>,
    kind: ResourceKind,
    body: Option<String>,
}

impl<T: Send + 'static> Decoder for TextDecoder<T> {
    type Output = T;

    fn open(&mut self, mut stream: DataStream) -> Result<()> {
        let name = *stream.name();
        self.kind = stream.kind();
        let text = String::from_utf8(stream.read_all()?).map_err(|e| CacheError::DecodeFailure {
            name,
            kind: self.kind,
            reason: e.to_string(),
        })?;
        let Some(body) = text.strip_prefix(self.header) else {
            return Err(CacheError::DecodeFailure {
                name,
                kind: self.kind,
                reason: format!("missing {} header", self.header),
            });
        };
        self.body = Some(body.trim().to_string());
        Ok(())
    }

    fn decode(&mut self, context: &DecodeContext<'_>) -> Result<T> {
        let failure = |reason: &str| CacheError::DecodeFailure {
            name: *context.name,
            kind: self.kind,
            reason: reason.to_string(),
        };
        let body = self.body.take().ok_or_else(|| failure("decoder not opened"))?;
        (self.parse)(context, &body).ok_or_else(|| failure("malformed body"))
    }
}

fn text<T: Send + 'static>(
    header: &'static str,
    parse: Parse<T>,
) -> impl Fn() -> Box<dyn Decoder<Output = T>> + Send + Sync + 'static {
    move || -> Box<dyn Decoder<Output = T>> {
        Box::new(TextDecoder {
            header,
            parse,
            kind: ResourceKind::Item,
            body: None,
        })
    }
}

fn parse_colors(body: &str) -> Option<Vec<Color>> {
    body.split(';')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| {
            let channels: Vec<u8> = entry
                .split_whitespace()
                .map(|c| c.parse().ok())
                .collect::<Option<_>>()?;
            match channels[..] {
                [r, g, b] => Some(Color::new(r, g, b, 255)),
                _ => None,
            }
        })
        .collect()
}

/// Registry with a decoder for every kind the test catalog uses
pub fn decoders() -> DecoderRegistry {
    let mut registry = DecoderRegistry::new();
    registry.register(
        ResourceKind::Item,
        text::<TestItem>("ITM", |ctx, body| {
            Some(TestItem {
                source: *ctx.name,
                label: body.to_string(),
            })
        }),
    );
    registry.register(
        ResourceKind::Spell,
        text::<TestSpell>("SPL", |ctx, body| {
            Some(TestSpell {
                source: *ctx.name,
                level: body.parse().ok()?,
            })
        }),
    );
    registry.register(
        ResourceKind::Effect,
        text::<TestEffect>("EFF", |_, body| {
            Some(TestEffect {
                opcode: body.parse().ok()?,
            })
        }),
    );
    registry.register(
        ResourceKind::Table,
        text::<TestTable>("2DA", |_, body| {
            Some(TestTable {
                rows: body.lines().map(str::to_string).collect(),
            })
        }),
    );
    registry.register(
        ResourceKind::Image,
        text::<Palette>("BMP", |_, body| Some(Palette::new(&parse_colors(body)?))),
    );
    registry.register(
        ResourceKind::Image,
        text::<TestImage>("BMP", |ctx, body| {
            Some(TestImage {
                source: *ctx.name,
                pixels: parse_colors(body)?.len(),
            })
        }),
    );
    registry.register(
        ResourceKind::Creature,
        text::<TestCreature>("CRE", |ctx, body| {
            let dead = match body {
                "dead" => true,
                "alive" => false,
                _ => return None,
            };
            Some(TestCreature {
                source: *ctx.name,
                dead,
                party_slot: ctx.party_slot,
                area: None,
                stance: None,
                orientation: None,
            })
        }),
    );
    registry.register(
        ResourceKind::Animation,
        text::<TestAnimation>("BAM", |ctx, body| {
            Some(TestAnimation {
                source: *ctx.name,
                frames: body.parse().ok()?,
            })
        }),
    );
    registry.register(
        ResourceKind::ScriptedAnimation,
        text::<TestClip>("VVC", |_, _| {
            Some(TestClip {
                origin: ClipOrigin::Vvc,
                name: None,
            })
        }),
    );
    registry
}

/// Content store shared by the integration tests
pub fn resolver() -> MemoryResolver {
    MemoryResolver::new()
        .with("SWRD01", ResourceKind::Item, "ITM Long Sword")
        .with("BADITM", ResourceKind::Item, "XXX not an item")
        .with("SPWI101", ResourceKind::Spell, "SPL 1")
        .with("BLESSED", ResourceKind::Effect, "EFF 42")
        .with("MPAL", ResourceKind::Image, "BMP 255 0 0;0 255 0")
        .with("XPLEVEL", ResourceKind::Table, "2DA\n1 2 3\n4 5 6")
        .with("SKILLS", ResourceKind::Table, "2DA\nstealth")
        .with("CLASSES", ResourceKind::Table, "2DA\nmage")
        .with("IMOEN", ResourceKind::Creature, "CRE alive")
        .with("CORPSE", ResourceKind::Creature, "CRE dead")
        .with("SPFIREB", ResourceKind::Animation, "BAM 4")
        .with("SPHEAL", ResourceKind::Animation, "BAM 2")
        .with("SPHEAL", ResourceKind::ScriptedAnimation, "VVC")
}

pub fn config() -> ManagerConfig {
    ManagerConfig::default().with_violation_policy(ViolationPolicy::Report)
}

/// Manager over the shared store; the resolver stays inspectable
pub fn manager() -> (ResourceManager<TestCatalog>, Arc<MemoryResolver>) {
    let resolver = Arc::new(resolver());
    let manager = ResourceManager::new(Arc::clone(&resolver), decoders(), config());
    (manager, resolver)
}

/// Minimal game state recording what the loader handed over
pub struct TestGame {
    pub area: ResRef,
    pub party: Vec<(TestCreature, JoinFlags)>,
    pub npcs: Vec<TestCreature>,
}

impl TestGame {
    pub fn new(area: &str) -> Self {
        Self {
            area: ResRef::new(area),
            party: Vec::new(),
            npcs: Vec::new(),
        }
    }
}

impl GameState for TestGame {
    type Actor = TestCreature;

    fn current_area(&self) -> ResRef {
        self.area
    }

    fn join_party(&mut self, actor: TestCreature, flags: JoinFlags) -> i32 {
        self.party.push((actor, flags));
        self.party.len() as i32 - 1
    }

    fn add_npc(&mut self, actor: TestCreature) -> i32 {
        self.npcs.push(actor);
        self.npcs.len() as i32 - 1
    }
}
