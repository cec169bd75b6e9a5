//! Test support: fixture worlds and atlases, a recording backend, and a
//! headless GPU for offscreen rendering tests.

use crate::animation::AnimationType;
use crate::assets::{
    AtlasEntry, AtlasFile, FrameRecord, HouseStage, SpriteAtlas, SpriteFrame, SpriteKey,
    TextureHandle, TextureRecord,
};
use crate::camera::CameraUniform;
use crate::compositor::{
    ImageDraw, ImageLayer, Layer, MeshData, MeshLayer, RenderBackend, TitleDraw,
};
use crate::error::RenderError;
use realm_data::{
    HouseType, Nation, Point, TerrainAtPoint, TreeSize, TreeType, Vegetation, WorldView,
};
use std::collections::HashMap;

fn meadow(height: f32) -> TerrainAtPoint {
    TerrainAtPoint {
        height,
        below: Vegetation::Meadow1,
        down_right: Vegetation::Meadow1,
    }
}

/// Every lattice point with `0 <= x < width`, `0 <= y < height`, flat meadow
/// at height 10. Nothing is discovered.
pub fn flat_world(width: i32, height: i32) -> WorldView {
    let mut world = WorldView::default();
    for y in 0..height {
        for x in 0..width {
            let point = Point::new(x, y);
            if point.is_on_grid() {
                world.terrain.insert(point, meadow(10.0));
            }
        }
    }
    world
}

/// Like [`flat_world`] with a deterministic bumpy height pattern.
pub fn hilly_world(width: i32, height: i32) -> WorldView {
    let mut world = flat_world(width, height);
    for (point, terrain) in world.terrain.iter_mut() {
        terrain.height = 10.0 + ((point.x * 7 + point.y * 13) % 9) as f32;
    }
    world
}

/// The smallest map with two tiles: `(1,1)` above `(0,0)`, `(2,0)`, `(3,1)`.
/// Flat, fully discovered.
pub fn two_tile_world() -> WorldView {
    let mut world = WorldView::default();
    for (x, y) in [(1, 1), (0, 0), (2, 0), (3, 1)] {
        world.terrain.insert(Point::new(x, y), meadow(10.0));
    }
    world.discover_all();
    world
}

/// A 32×40 sprite anchored near its bottom center, in texture 0.
pub fn frame(source_x: u32, source_y: u32) -> SpriteFrame {
    SpriteFrame {
        source_x,
        source_y,
        width: 32,
        height: 40,
        offset_x: 16,
        offset_y: 36,
        texture: TextureHandle(0),
    }
}

fn record(x: u32) -> FrameRecord {
    FrameRecord {
        x,
        y: 0,
        width: 32,
        height: 40,
        offset_x: 16,
        offset_y: 36,
    }
}

/// Atlas file with a handful of entries: a ready woodcutter for every nation
/// (with shadow), a full-grown pine and the hover markers.
pub fn fixture_atlas_file() -> AtlasFile {
    let entry = |key, frames: Vec<FrameRecord>, shadows: Vec<FrameRecord>, all_nations| AtlasEntry {
        key,
        all_nations,
        all_colors: false,
        texture: "sprites".into(),
        frames,
        shadows,
        animation: AnimationType::Repeat,
    };

    AtlasFile {
        textures: vec![
            TextureRecord {
                name: "sprites".into(),
                path: "sprites.png".into(),
            },
            TextureRecord {
                name: "terrain".into(),
                path: "terrain.png".into(),
            },
            TextureRecord {
                name: "roads".into(),
                path: "roads.png".into(),
            },
        ],
        terrain_texture: "terrain".into(),
        road_texture: "roads".into(),
        entries: vec![
            entry(
                SpriteKey::House {
                    house: HouseType::Woodcutter,
                    nation: Nation::Romans,
                    stage: HouseStage::Ready,
                },
                vec![record(0)],
                vec![record(32)],
                true,
            ),
            entry(
                SpriteKey::Tree {
                    tree: TreeType::Pine,
                    size: TreeSize::FullGrown,
                },
                (0..4).map(|i| record(64 + i * 32)).collect(),
                vec![record(192)],
                false,
            ),
            entry(SpriteKey::Selection, vec![record(224)], Vec::new(), false),
            entry(SpriteKey::HoverPoint, vec![record(256)], Vec::new(), false),
        ],
    }
}

pub fn fixture_atlas() -> SpriteAtlas {
    SpriteAtlas::from_file(fixture_atlas_file()).expect("fixture atlas is valid")
}

/// One call made to a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Begin,
    Upload { layer: MeshLayer, vertices: usize },
    DrawMesh(MeshLayer),
    DrawImages { layer: ImageLayer, items: Vec<ImageDraw> },
    DrawTitles(Vec<TitleDraw>),
    End,
    Release,
}

/// Backend that records every call instead of drawing.
///
/// Can be told to fail one layer with a missing-resource error, either when
/// drawing it or when uploading its mesh.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<BackendCall>,
    pub uploaded: HashMap<MeshLayer, usize>,
    fail: Option<Layer>,
    /// Set after construction to make later uploads of this layer fail.
    pub fail_upload: Option<MeshLayer>,
}

impl RecordingBackend {
    pub fn failing(layer: Layer) -> Self {
        Self {
            fail: Some(layer),
            ..Default::default()
        }
    }

    fn check(&self, layer: Layer) -> Result<(), RenderError> {
        if self.fail == Some(layer) {
            return Err(RenderError::missing(format!("{:?} disabled in test", layer)));
        }
        Ok(())
    }

    /// Items passed to `draw_images` for a layer, across all frames.
    pub fn images(&self, layer: ImageLayer) -> Vec<ImageDraw> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::DrawImages { layer: l, items } if *l == layer => Some(items.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn titles(&self) -> Vec<TitleDraw> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::DrawTitles(titles) => Some(titles.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl RenderBackend for RecordingBackend {
    fn begin_frame(&mut self, _camera: &CameraUniform) -> Result<(), RenderError> {
        self.calls.push(BackendCall::Begin);
        Ok(())
    }

    fn upload_mesh(&mut self, mesh: MeshData<'_>) -> Result<(), RenderError> {
        let layer = mesh.layer();
        if self.fail_upload == Some(layer) {
            return Err(RenderError::missing(format!("{:?} upload disabled in test", layer)));
        }
        self.uploaded.insert(layer, mesh.vertex_count());
        self.calls.push(BackendCall::Upload {
            layer,
            vertices: mesh.vertex_count(),
        });
        Ok(())
    }

    fn draw_mesh(&mut self, layer: MeshLayer) -> Result<(), RenderError> {
        self.check(layer.into())?;
        self.calls.push(BackendCall::DrawMesh(layer));
        Ok(())
    }

    fn draw_images(&mut self, layer: ImageLayer, items: &[ImageDraw]) -> Result<(), RenderError> {
        self.check(layer.into())?;
        self.calls.push(BackendCall::DrawImages {
            layer,
            items: items.to_vec(),
        });
        Ok(())
    }

    fn draw_titles(&mut self, titles: &[TitleDraw]) -> Result<(), RenderError> {
        self.check(Layer::HouseTitles)?;
        self.calls.push(BackendCall::DrawTitles(titles.to_vec()));
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        self.calls.push(BackendCall::End);
        Ok(())
    }

    fn release(&mut self) {
        self.uploaded.clear();
        self.calls.push(BackendCall::Release);
    }
}

/// Headless GPU context for rendering tests.
///
/// Creates a wgpu device without a display surface, suitable for
/// offscreen rendering in CI environments.
pub struct HeadlessGpu {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub format: wgpu::TextureFormat,
}

impl HeadlessGpu {
    /// Returns None if no suitable GPU adapter is found (CI waiver).
    pub async fn new() -> Option<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::VULKAN | wgpu::Backends::GL,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Headless Test Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                },
                None,
            )
            .await
            .ok()?;

        Some(Self {
            device,
            queue,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
        })
    }
}
