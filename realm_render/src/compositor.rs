//! Frame compositing: issues the layers of one frame to a backend in order.
//!
//! Layer order, back to front:
//! terrain → decorations → roads → shadows → objects → hover → house titles → fog.
//!
//! A layer that fails in the backend is skipped for this frame only; the
//! layers after it are still drawn.

use crate::assets::SpriteFrame;
use crate::camera::CameraUniform;
use crate::coords::{ViewTransform, game_to_screen};
use crate::diagnostics::Diagnostics;
use crate::draw_list::{DrawItem, DrawLists};
use crate::error::RenderError;
use crate::fog::FogMesh;
use crate::road_mesh::RoadMesh;
use crate::terrain_mesh::TerrainMesh;
use glam::Vec2;
use realm_data::{Point, WorldView};

/// Screen pixels between a house's anchor and the top of its title.
pub const TITLE_OFFSET: f32 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    Terrain,
    Decorations,
    Roads,
    Shadows,
    Objects,
    Hover,
    HouseTitles,
    FogOfWar,
}

impl Layer {
    pub const ORDER: [Layer; 8] = [
        Layer::Terrain,
        Layer::Decorations,
        Layer::Roads,
        Layer::Shadows,
        Layer::Objects,
        Layer::Hover,
        Layer::HouseTitles,
        Layer::FogOfWar,
    ];
}

/// Layers backed by an uploaded mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshLayer {
    Terrain,
    Roads,
    FogOfWar,
}

/// Layers drawn as lists of sprites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayer {
    Decorations,
    Shadows,
    Objects,
    Hover,
}

impl From<MeshLayer> for Layer {
    fn from(layer: MeshLayer) -> Self {
        match layer {
            MeshLayer::Terrain => Layer::Terrain,
            MeshLayer::Roads => Layer::Roads,
            MeshLayer::FogOfWar => Layer::FogOfWar,
        }
    }
}

impl From<ImageLayer> for Layer {
    fn from(layer: ImageLayer) -> Self {
        match layer {
            ImageLayer::Decorations => Layer::Decorations,
            ImageLayer::Shadows => Layer::Shadows,
            ImageLayer::Objects => Layer::Objects,
            ImageLayer::Hover => Layer::Hover,
        }
    }
}

/// Mesh handed to the backend for upload.
#[derive(Debug, Clone, Copy)]
pub enum MeshData<'a> {
    Terrain(&'a TerrainMesh),
    Roads(&'a RoadMesh),
    Fog(&'a FogMesh),
}

impl MeshData<'_> {
    pub fn layer(&self) -> MeshLayer {
        match self {
            MeshData::Terrain(_) => MeshLayer::Terrain,
            MeshData::Roads(_) => MeshLayer::Roads,
            MeshData::Fog(_) => MeshLayer::FogOfWar,
        }
    }

    pub fn vertex_count(&self) -> usize {
        match self {
            MeshData::Terrain(mesh) => mesh.vertex_count(),
            MeshData::Roads(mesh) => mesh.vertex_count(),
            MeshData::Fog(mesh) => mesh.vertex_count(),
        }
    }
}

/// A sprite with its height already resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageDraw {
    pub frame: SpriteFrame,
    pub game_point: Vec2,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleDraw {
    pub text: String,
    /// Top-center of the text, in screen pixels.
    pub screen_position: Vec2,
}

/// What the compositor needs from a GPU (or a test double).
pub trait RenderBackend {
    fn begin_frame(&mut self, camera: &CameraUniform) -> Result<(), RenderError>;
    /// Replaces the GPU copy of a mesh.
    fn upload_mesh(&mut self, mesh: MeshData<'_>) -> Result<(), RenderError>;
    fn draw_mesh(&mut self, layer: MeshLayer) -> Result<(), RenderError>;
    fn draw_images(&mut self, layer: ImageLayer, items: &[ImageDraw]) -> Result<(), RenderError>;
    fn draw_titles(&mut self, titles: &[TitleDraw]) -> Result<(), RenderError>;
    fn end_frame(&mut self) -> Result<(), RenderError>;
    /// Frees meshes and textures. The backend is unusable afterwards.
    fn release(&mut self);
}

/// Vertex counts of meshes built so far; `None` means never built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuiltMeshes {
    pub terrain: Option<usize>,
    pub roads: Option<usize>,
    pub fog: Option<usize>,
}

pub struct FrameInputs<'a> {
    pub world: &'a WorldView,
    pub lists: &'a DrawLists,
    pub view: &'a ViewTransform,
    pub camera: &'a CameraUniform,
    pub meshes: BuiltMeshes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerReport {
    pub layer: Layer,
    /// Vertices for mesh layers, items for the others.
    pub count: usize,
}

/// Outcome of one composed frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub issued: Vec<LayerReport>,
    pub skipped: Vec<(Layer, String)>,
}

impl FrameReport {
    pub fn layers(&self) -> Vec<Layer> {
        self.issued.iter().map(|r| r.layer).collect()
    }

    pub fn count(&self, layer: Layer) -> Option<usize> {
        self.issued.iter().find(|r| r.layer == layer).map(|r| r.count)
    }
}

/// Height to draw an item at: its own, or the terrain under it.
pub fn resolve_height(world: &WorldView, item: &DrawItem) -> f32 {
    item.height.unwrap_or_else(|| {
        world.height_at(Point::nearest(item.game_point.x, item.game_point.y))
    })
}

struct Frame<'b, B: RenderBackend + ?Sized> {
    backend: &'b mut B,
    diagnostics: &'b mut Diagnostics,
    report: FrameReport,
}

impl<B: RenderBackend + ?Sized> Frame<'_, B> {
    fn record(&mut self, layer: Layer, count: usize, result: Result<(), RenderError>) {
        match result {
            Ok(()) => self.report.issued.push(LayerReport { layer, count }),
            Err(e) => {
                let reason = e.to_string();
                self.diagnostics.layer_skipped(layer, &reason);
                self.report.skipped.push((layer, reason));
            }
        }
    }

    fn mesh(&mut self, layer: MeshLayer, built: Option<usize>) {
        if let Some(count) = built {
            let result = self.backend.draw_mesh(layer);
            self.record(layer.into(), count, result);
        }
    }

    fn images(&mut self, layer: ImageLayer, world: &WorldView, items: &[DrawItem]) {
        if items.is_empty() {
            return;
        }
        let draws: Vec<ImageDraw> = items
            .iter()
            .map(|item| ImageDraw {
                frame: item.sprite,
                game_point: item.game_point,
                height: resolve_height(world, item),
            })
            .collect();
        let result = self.backend.draw_images(layer, &draws);
        self.record(layer.into(), draws.len(), result);
    }
}

/// Draws one frame. Only `begin_frame` and `end_frame` errors abort it.
pub fn compose_frame<B: RenderBackend + ?Sized>(
    inputs: &FrameInputs<'_>,
    backend: &mut B,
    diagnostics: &mut Diagnostics,
) -> Result<FrameReport, RenderError> {
    backend.begin_frame(inputs.camera)?;

    let mut frame = Frame {
        backend: &mut *backend,
        diagnostics,
        report: FrameReport::default(),
    };
    let world = inputs.world;
    let lists = inputs.lists;

    frame.mesh(MeshLayer::Terrain, inputs.meshes.terrain);
    frame.images(ImageLayer::Decorations, world, &lists.decorations);
    frame.mesh(MeshLayer::Roads, inputs.meshes.roads);
    frame.images(ImageLayer::Shadows, world, &lists.shadows);
    frame.images(ImageLayer::Objects, world, &lists.objects);
    frame.images(ImageLayer::Hover, world, &lists.hover);

    if !lists.house_titles.is_empty() {
        let titles: Vec<TitleDraw> = lists
            .house_titles
            .iter()
            .map(|title| {
                let height = world.height_at(Point::nearest(title.game_point.x, title.game_point.y));
                let anchor = game_to_screen(title.game_point, height, inputs.view);
                TitleDraw {
                    text: title.text.clone(),
                    screen_position: anchor + Vec2::new(0.0, TITLE_OFFSET),
                }
            })
            .collect();
        let result = frame.backend.draw_titles(&titles);
        frame.record(Layer::HouseTitles, titles.len(), result);
    }

    frame.mesh(MeshLayer::FogOfWar, inputs.meshes.fog);

    let report = frame.report;
    backend.end_frame()?;

    log::trace!("Frame composed: {:?}", report.layers());
    Ok(report)
}
