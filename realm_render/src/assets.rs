//! Sprite atlas loading and frame lookup.
//!
//! The atlas is a JSON file listing the texture images it uses and one entry
//! per sprite key. Entries may apply to every nation and/or player color; those
//! are expanded when the file is loaded, so each lookup is a single hash access.
//!
//! ```json
//! {
//!   "textures": [{ "name": "houses", "path": "houses.png" }],
//!   "terrain_texture": "terrain",
//!   "road_texture": "roads",
//!   "entries": [{
//!     "key": { "kind": "house", "house": "woodcutter", "nation": "romans", "stage": "ready" },
//!     "all_nations": true,
//!     "texture": "houses",
//!     "frames": [{ "x": 0, "y": 0, "width": 64, "height": 48, "offset_x": 32, "offset_y": 40 }],
//!     "shadows": [],
//!     "animation": "repeat"
//!   }]
//! }
//! ```

use crate::animation::AnimationType;
use crate::error::RenderError;
use image::RgbaImage;
use realm_data::{
    ActionKind, AnimalKind, AvailableConstruction, CropGrowth, CropType, DecorationKind,
    Direction, HouseState, HouseType, Material, Nation, PlayerColor, ShipStage, SignKind,
    SignSize, StoneType, TreeSize, TreeType, WorkerType,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Index of a texture image in the atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// A sprite: a source rectangle in a texture plus the anchor offset.
///
/// The anchor (`offset_x`, `offset_y`) is the pixel inside the source
/// rectangle that sits on the entity's screen position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteFrame {
    pub source_x: u32,
    pub source_y: u32,
    pub width: u32,
    pub height: u32,
    pub offset_x: i32,
    pub offset_y: i32,
    pub texture: TextureHandle,
}

impl SpriteFrame {
    /// Keeps only the bottom `percent` of the sprite, anchored where it was.
    pub fn crop_from_bottom(self, percent: u8) -> SpriteFrame {
        let percent = u32::from(percent.min(100));
        let visible = (self.height * percent).div_ceil(100);
        let hidden = self.height - visible;
        SpriteFrame {
            source_y: self.source_y + hidden,
            height: visible,
            offset_y: self.offset_y - hidden as i32,
            ..self
        }
    }
}

/// Construction stage of a house as far as its sprite is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HouseStage {
    Planned,
    UnderConstruction,
    Ready,
    Burning,
    Destroyed,
}

impl From<HouseState> for HouseStage {
    fn from(state: HouseState) -> Self {
        match state {
            HouseState::Planned => HouseStage::Planned,
            HouseState::UnderConstruction => HouseStage::UnderConstruction,
            HouseState::Ready | HouseState::Occupied => HouseStage::Ready,
            HouseState::Burning => HouseStage::Burning,
            HouseState::Destroyed => HouseStage::Destroyed,
        }
    }
}

/// Identifies one animation strip in the atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpriteKey {
    House {
        house: HouseType,
        nation: Nation,
        stage: HouseStage,
    },
    Tree {
        tree: TreeType,
        size: TreeSize,
    },
    FallingTree {
        tree: TreeType,
    },
    Crop {
        crop: CropType,
        growth: CropGrowth,
    },
    Sign {
        sign: SignKind,
        size: SignSize,
    },
    Stone {
        stone: StoneType,
        amount: u8,
    },
    Animal {
        animal: AnimalKind,
        direction: Direction,
    },
    Ship {
        stage: ShipStage,
        direction: Direction,
    },
    Worker {
        worker: WorkerType,
        nation: Nation,
        color: PlayerColor,
        direction: Direction,
    },
    WorkerAction {
        worker: WorkerType,
        nation: Nation,
        color: PlayerColor,
        action: ActionKind,
        direction: Direction,
    },
    Flag {
        nation: Nation,
        color: PlayerColor,
    },
    Cargo {
        material: Material,
    },
    Decoration {
        decoration: DecorationKind,
    },
    BorderMarker {
        nation: Nation,
        color: PlayerColor,
    },
    Selection,
    HoverPoint,
    RoadPreview,
    Availability {
        available: AvailableConstruction,
    },
}

impl SpriteKey {
    /// Copy of the key for another nation, if the key has a nation.
    pub fn with_nation(self, nation: Nation) -> Option<SpriteKey> {
        let mut key = self;
        match &mut key {
            SpriteKey::House { nation: n, .. }
            | SpriteKey::Worker { nation: n, .. }
            | SpriteKey::WorkerAction { nation: n, .. }
            | SpriteKey::Flag { nation: n, .. }
            | SpriteKey::BorderMarker { nation: n, .. } => *n = nation,
            _ => return None,
        }
        Some(key)
    }

    /// Copy of the key for another player color, if the key has a color.
    pub fn with_color(self, color: PlayerColor) -> Option<SpriteKey> {
        let mut key = self;
        match &mut key {
            SpriteKey::Worker { color: c, .. }
            | SpriteKey::WorkerAction { color: c, .. }
            | SpriteKey::Flag { color: c, .. }
            | SpriteKey::BorderMarker { color: c, .. } => *c = color,
            _ => return None,
        }
        Some(key)
    }
}

/// One frame as written in the atlas file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub offset_x: i32,
    #[serde(default)]
    pub offset_y: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasEntry {
    pub key: SpriteKey,
    #[serde(default)]
    pub all_nations: bool,
    #[serde(default)]
    pub all_colors: bool,
    pub texture: String,
    pub frames: Vec<FrameRecord>,
    #[serde(default)]
    pub shadows: Vec<FrameRecord>,
    #[serde(default)]
    pub animation: AnimationType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureRecord {
    pub name: String,
    pub path: PathBuf,
}

/// On-disk atlas layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasFile {
    pub textures: Vec<TextureRecord>,
    pub terrain_texture: String,
    pub road_texture: String,
    #[serde(default)]
    pub entries: Vec<AtlasEntry>,
}

/// Frames and shadow frames of one sprite key.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStrip {
    pub frames: Vec<SpriteFrame>,
    pub shadows: Vec<SpriteFrame>,
    pub animation: AnimationType,
}

/// A frame picked for a given animation index, with its shadow if the strip has one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSprite {
    pub sprite: SpriteFrame,
    pub shadow: Option<SpriteFrame>,
}

impl FrameStrip {
    /// Picks the frame for `index` under the strip's animation type.
    ///
    /// Shadows follow the same policy against their own length. Returns
    /// `None` once a `SingleThenStop` animation has finished.
    pub fn resolve(&self, index: u32) -> Option<ResolvedSprite> {
        let frame = self.animation.frame_index(index, self.frames.len())?;
        let shadow = self
            .animation
            .frame_index(index, self.shadows.len())
            .map(|i| self.shadows[i]);
        Some(ResolvedSprite {
            sprite: self.frames[frame],
            shadow,
        })
    }
}

/// Source of frame strips for the draw-list collector.
pub trait FrameResolver {
    fn strip(&self, key: &SpriteKey) -> Option<&FrameStrip>;
}

/// Decoded texture image belonging to an atlas.
#[derive(Debug, Clone)]
pub struct AtlasImage {
    pub handle: TextureHandle,
    pub name: String,
    pub image: RgbaImage,
}

/// Normalized sprite atlas: every key maps straight to its strip.
#[derive(Debug, Clone)]
pub struct SpriteAtlas {
    strips: HashMap<SpriteKey, FrameStrip>,
    texture_names: Vec<String>,
    terrain: TextureHandle,
    roads: TextureHandle,
}

impl FrameResolver for SpriteAtlas {
    fn strip(&self, key: &SpriteKey) -> Option<&FrameStrip> {
        self.strips.get(key)
    }
}

impl SpriteAtlas {
    /// Reads an atlas file and decodes every texture it references.
    ///
    /// Texture paths are relative to the atlas file.
    pub fn load(path: &Path) -> Result<(SpriteAtlas, Vec<AtlasImage>), RenderError> {
        let json = std::fs::read_to_string(path)?;
        let file: AtlasFile = serde_json::from_str(&json)?;
        let base = path.parent().unwrap_or(Path::new("."));

        let mut images = Vec::with_capacity(file.textures.len());
        for (i, texture) in file.textures.iter().enumerate() {
            let image_path = base.join(&texture.path);
            let image = image::open(&image_path)?.to_rgba8();
            log::debug!(
                "Loaded texture '{}' from {:?} ({}x{})",
                texture.name,
                image_path,
                image.width(),
                image.height()
            );
            images.push(AtlasImage {
                handle: TextureHandle(i as u32),
                name: texture.name.clone(),
                image,
            });
        }

        let atlas = SpriteAtlas::from_file(file)?;
        log::info!(
            "Loaded sprite atlas {:?}: {} keys, {} textures",
            path,
            atlas.len(),
            images.len()
        );
        Ok((atlas, images))
    }

    /// Builds the lookup table. Entries without wildcards take precedence over
    /// expanded wildcard entries, wherever they appear in the file.
    pub fn from_file(file: AtlasFile) -> Result<SpriteAtlas, RenderError> {
        let texture_names: Vec<String> = file.textures.iter().map(|t| t.name.clone()).collect();
        let handle_of = |name: &str| -> Result<TextureHandle, RenderError> {
            texture_names
                .iter()
                .position(|n| n == name)
                .map(|i| TextureHandle(i as u32))
                .ok_or_else(|| RenderError::InvalidAtlas(format!("unknown texture '{}'", name)))
        };

        let terrain = handle_of(&file.terrain_texture)?;
        let roads = handle_of(&file.road_texture)?;

        let mut strips = HashMap::new();
        let mut expanded = Vec::new();

        for entry in &file.entries {
            if entry.frames.is_empty() {
                return Err(RenderError::InvalidAtlas(format!(
                    "entry {:?} has no frames",
                    entry.key
                )));
            }
            let texture = handle_of(&entry.texture)?;
            let to_frame = |r: &FrameRecord| SpriteFrame {
                source_x: r.x,
                source_y: r.y,
                width: r.width,
                height: r.height,
                offset_x: r.offset_x,
                offset_y: r.offset_y,
                texture,
            };
            let strip = FrameStrip {
                frames: entry.frames.iter().map(to_frame).collect(),
                shadows: entry.shadows.iter().map(to_frame).collect(),
                animation: entry.animation,
            };

            if !entry.all_nations && !entry.all_colors {
                if strips.insert(entry.key, strip).is_some() {
                    log::warn!("Atlas key {:?} listed twice, keeping the last", entry.key);
                }
                continue;
            }

            for key in expand_key(entry)? {
                expanded.push((key, strip.clone()));
            }
        }

        for (key, strip) in expanded {
            strips.entry(key).or_insert(strip);
        }

        Ok(SpriteAtlas {
            strips,
            texture_names,
            terrain,
            roads,
        })
    }

    pub fn len(&self) -> usize {
        self.strips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strips.is_empty()
    }

    pub fn texture_names(&self) -> &[String] {
        &self.texture_names
    }

    pub fn terrain_texture(&self) -> TextureHandle {
        self.terrain
    }

    pub fn road_texture(&self) -> TextureHandle {
        self.roads
    }
}

fn expand_key(entry: &AtlasEntry) -> Result<Vec<SpriteKey>, RenderError> {
    let mut keys = vec![entry.key];

    if entry.all_nations {
        keys = keys
            .into_iter()
            .flat_map(|key| Nation::ALL.map(|n| key.with_nation(n)))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                RenderError::InvalidAtlas(format!("{:?} has no nation to expand", entry.key))
            })?;
    }
    if entry.all_colors {
        keys = keys
            .into_iter()
            .flat_map(|key| PlayerColor::ALL.map(|c| key.with_color(c)))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                RenderError::InvalidAtlas(format!("{:?} has no color to expand", entry.key))
            })?;
    }

    Ok(keys)
}
