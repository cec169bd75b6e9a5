//! Render context: all renderer state for one canvas, passed explicitly.
//!
//! The state monitor's events arrive as `on_*` calls and rebuild meshes
//! synchronously; `render_frame` runs the collector and compositor.

use crate::animation::AnimationClock;
use crate::assets::SpriteAtlas;
use crate::camera::Camera;
use crate::compositor::{
    BuiltMeshes, FrameInputs, FrameReport, MeshData, RenderBackend, compose_frame,
};
use crate::config::RenderConfig;
use crate::coords::{pick_point, visible_game_rect};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::draw_list::{CollectContext, UiState, collect};
use crate::error::RenderError;
use crate::fog::{FogMesh, FogOfWar};
use crate::normals::NormalField;
use crate::road_mesh::RoadMesh;
use crate::terrain_mesh::TerrainMesh;
use glam::Vec2;
use realm_data::{Point, WorldView};
use std::time::Duration;

pub struct RenderContext {
    config: RenderConfig,
    atlas: SpriteAtlas,
    camera: Camera,
    clock: AnimationClock,
    normals: NormalField,
    terrain: TerrainMesh,
    roads: RoadMesh,
    fog: FogOfWar,
    built: BuiltMeshes,
    diagnostics: Diagnostics,
    ui: UiState,
}

impl RenderContext {
    pub fn new(config: RenderConfig, atlas: SpriteAtlas, viewport: Vec2) -> Result<Self, RenderError> {
        config.validate()?;
        let camera = Camera::new(&config, viewport.x, viewport.y);
        let clock = AnimationClock::new(config.animation_period());
        let ui = UiState {
            show_available_construction: config.show_available_construction,
            ..Default::default()
        };

        Ok(Self {
            config,
            atlas,
            camera,
            clock,
            normals: NormalField::default(),
            terrain: TerrainMesh::default(),
            roads: RoadMesh::default(),
            fog: FogOfWar::default(),
            built: BuiltMeshes::default(),
            diagnostics: Diagnostics::new(),
            ui,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn atlas(&self) -> &SpriteAtlas {
        &self.atlas
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut UiState {
        &mut self.ui
    }

    pub fn animation_index(&self) -> u32 {
        self.clock.index()
    }

    pub fn built_meshes(&self) -> BuiltMeshes {
        self.built
    }

    pub fn normals(&self) -> &NormalField {
        &self.normals
    }

    pub fn terrain_mesh(&self) -> &TerrainMesh {
        &self.terrain
    }

    pub fn road_mesh(&self) -> &RoadMesh {
        &self.roads
    }

    pub fn fog_mesh(&self) -> &FogMesh {
        self.fog.mesh()
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.camera.resize(width, height);
    }

    /// First full snapshot. Builds every mesh the world has data for; the road
    /// mesh is left unbuilt until there is a road.
    pub fn on_monitoring_started<B: RenderBackend + ?Sized>(
        &mut self,
        world: &WorldView,
        backend: &mut B,
    ) -> Result<(), RenderError> {
        log::info!(
            "Monitoring started: {} points, {} discovered",
            world.terrain.len(),
            world.discovered_points.len()
        );
        self.rebuild_discovery(world, backend)?;
        if !world.roads.is_empty() {
            self.rebuild_roads(world, backend)?;
        }
        Ok(())
    }

    /// Rebuilds normals, terrain and fog. Roads read the normals, so a built
    /// road mesh is rebuilt too.
    pub fn on_discovered_points<B: RenderBackend + ?Sized>(
        &mut self,
        world: &WorldView,
        backend: &mut B,
    ) -> Result<(), RenderError> {
        self.rebuild_discovery(world, backend)?;
        if self.built.roads.is_some() || !world.roads.is_empty() {
            self.rebuild_roads(world, backend)?;
        }
        Ok(())
    }

    pub fn on_roads_changed<B: RenderBackend + ?Sized>(
        &mut self,
        world: &WorldView,
        backend: &mut B,
    ) -> Result<(), RenderError> {
        self.rebuild_roads(world, backend)
    }

    fn rebuild_discovery<B: RenderBackend + ?Sized>(
        &mut self,
        world: &WorldView,
        backend: &mut B,
    ) -> Result<(), RenderError> {
        self.normals = NormalField::build(world);
        self.terrain = TerrainMesh::build(world, &self.normals);
        self.fog.rebuild(world);

        // Each count follows its own upload, so a failure leaves `built`
        // matching what the backend holds
        backend.upload_mesh(MeshData::Terrain(&self.terrain))?;
        self.built.terrain = Some(self.terrain.vertex_count());
        backend.upload_mesh(MeshData::Fog(self.fog.mesh()))?;
        self.built.fog = Some(self.fog.mesh().vertex_count());

        log::info!(
            "Rebuilt terrain: {} vertices ({} transition), fog: {} vertices",
            self.terrain.vertex_count(),
            self.terrain.transition_vertex_count(),
            self.fog.mesh().vertex_count()
        );
        Ok(())
    }

    fn rebuild_roads<B: RenderBackend + ?Sized>(
        &mut self,
        world: &WorldView,
        backend: &mut B,
    ) -> Result<(), RenderError> {
        self.roads = RoadMesh::build(world, &self.normals);
        backend.upload_mesh(MeshData::Roads(&self.roads))?;
        self.built.roads = Some(self.roads.vertex_count());

        log::info!(
            "Rebuilt roads: {} segments, {} junctions, {} vertices",
            self.roads.segments,
            self.roads.junctions,
            self.roads.vertex_count()
        );
        Ok(())
    }

    /// Advances the animation clock by `elapsed` and draws one frame.
    pub fn render_frame<B: RenderBackend + ?Sized>(
        &mut self,
        world: &WorldView,
        backend: &mut B,
        elapsed: Duration,
    ) -> Result<FrameReport, RenderError> {
        self.clock.advance(elapsed);

        let view = self.camera.transform();
        let ctx = CollectContext {
            world,
            atlas: &self.atlas,
            visible: visible_game_rect(&view),
            animation_index: self.clock.index(),
            ui: &self.ui,
            margins: self.config.margins,
            show_house_titles: self.config.show_house_titles,
        };
        let lists = collect(&ctx, &mut self.diagnostics);

        let camera = self.camera.to_uniform(self.config.light_direction);
        let inputs = FrameInputs {
            world,
            lists: &lists,
            view: &view,
            camera: &camera,
            meshes: self.built,
        };
        compose_frame(&inputs, backend, &mut self.diagnostics)
    }

    /// Grid point under a screen position, if it is on the map.
    pub fn pick_point(&self, world: &WorldView, screen: Vec2) -> Option<Point> {
        pick_point(screen, &self.camera.transform(), world)
    }

    pub fn drain_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.drain()
    }

    /// Releases every GPU resource held for this context. Meshes count as
    /// unbuilt afterwards, so frames issue no mesh layers.
    pub fn teardown<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        log::info!("Tearing down render context");
        backend.release();
        self.built = BuiltMeshes::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::{Layer, MeshLayer};
    use crate::testing::{
        BackendCall, RecordingBackend, fixture_atlas, flat_world, two_tile_world,
    };
    use realm_data::{Road, RoadKind, Tile};

    fn context() -> RenderContext {
        RenderContext::new(
            RenderConfig::default(),
            fixture_atlas(),
            Vec2::new(800.0, 600.0),
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = RenderConfig {
            height_adjust: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            RenderContext::new(config, fixture_atlas(), Vec2::new(10.0, 10.0)),
            Err(RenderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_monitoring_started_builds_terrain_and_fog() {
        let world = two_tile_world();
        let mut ctx = context();
        let mut backend = RecordingBackend::default();

        ctx.on_monitoring_started(&world, &mut backend).unwrap();

        assert_eq!(
            ctx.built_meshes(),
            BuiltMeshes {
                terrain: Some(6),
                roads: None,
                fog: Some(0),
            }
        );
        assert_eq!(backend.uploaded.get(&MeshLayer::Terrain), Some(&6));
        assert_eq!(backend.uploaded.get(&MeshLayer::FogOfWar), Some(&0));
        assert!(!backend.uploaded.contains_key(&MeshLayer::Roads));
        assert_eq!(ctx.normals().len(), 4);
    }

    #[test]
    fn test_road_event_builds_road_layer() {
        let mut world = flat_world(8, 6);
        world.discover_all();
        let mut ctx = context();
        let mut backend = RecordingBackend::default();
        ctx.on_monitoring_started(&world, &mut backend).unwrap();

        world.roads.push(Road {
            id: 1,
            points: vec![Point::new(2, 2), Point::new(4, 2)],
            kind: RoadKind::Normal,
        });
        ctx.on_roads_changed(&world, &mut backend).unwrap();
        assert_eq!(ctx.road_mesh().segments, 1);
        assert_eq!(ctx.built_meshes().roads, Some(6));

        let report = ctx
            .render_frame(&world, &mut backend, Duration::ZERO)
            .unwrap();
        assert!(report.layers().contains(&Layer::Roads));
    }

    #[test]
    fn test_discovery_shrinks_fog() {
        let mut world = flat_world(8, 6);
        world.discovered_points.insert(Point::new(2, 2));
        world.mark_tile_discovered(Tile::below(Point::new(2, 2)));
        let mut ctx = context();
        let mut backend = RecordingBackend::default();

        ctx.on_monitoring_started(&world, &mut backend).unwrap();
        let partial = ctx.fog_mesh().vertex_count();
        assert!(partial > 0);

        world.discover_all();
        ctx.on_discovered_points(&world, &mut backend).unwrap();
        assert!(ctx.fog_mesh().vertex_count() < partial);
        assert!(ctx.terrain_mesh().vertex_count() > 3);
    }

    #[test]
    fn test_failed_fog_upload_keeps_built_counts_in_step() {
        let mut world = flat_world(8, 6);
        world.discovered_points.insert(Point::new(2, 2));
        world.mark_tile_discovered(Tile::below(Point::new(2, 2)));
        let mut ctx = context();
        let mut backend = RecordingBackend::default();
        ctx.on_monitoring_started(&world, &mut backend).unwrap();
        let old_fog = ctx.built_meshes().fog;

        world.discover_all();
        backend.fail_upload = Some(MeshLayer::FogOfWar);
        assert!(ctx.on_discovered_points(&world, &mut backend).is_err());

        let terrain = ctx.terrain_mesh().vertex_count();
        assert!(terrain > 3);
        assert_eq!(ctx.built_meshes().terrain, Some(terrain));
        assert_eq!(backend.uploaded.get(&MeshLayer::Terrain), Some(&terrain));
        assert_eq!(ctx.built_meshes().fog, old_fog);
        assert_eq!(
            backend.uploaded.get(&MeshLayer::FogOfWar).copied(),
            old_fog
        );
    }

    #[test]
    fn test_render_frame_advances_clock() {
        let world = two_tile_world();
        let mut ctx = context();
        let mut backend = RecordingBackend::default();
        ctx.on_monitoring_started(&world, &mut backend).unwrap();

        ctx.render_frame(&world, &mut backend, Duration::from_millis(250))
            .unwrap();
        assert_eq!(ctx.animation_index(), 2);
        ctx.render_frame(&world, &mut backend, Duration::from_millis(50))
            .unwrap();
        assert_eq!(ctx.animation_index(), 3);
    }

    #[test]
    fn test_frame_before_monitoring_issues_nothing() {
        let world = two_tile_world();
        let mut ctx = context();
        let mut backend = RecordingBackend::default();
        let report = ctx
            .render_frame(&world, &mut backend, Duration::ZERO)
            .unwrap();
        assert!(report.issued.is_empty());
        assert_eq!(backend.calls, vec![BackendCall::Begin, BackendCall::End]);
    }

    #[test]
    fn test_pick_point_round_trip() {
        let world = flat_world(10, 10);
        let mut ctx = context();
        ctx.camera_mut().center_on(Point::new(4, 4));
        let screen = crate::coords::game_to_screen(
            Vec2::new(4.0, 4.0),
            10.0,
            &ctx.camera().transform(),
        );
        assert_eq!(ctx.pick_point(&world, screen), Some(Point::new(4, 4)));
        assert_eq!(ctx.pick_point(&world, Vec2::new(-5000.0, -5000.0)), None);
    }

    #[test]
    fn test_teardown_releases_backend() {
        let world = two_tile_world();
        let mut ctx = context();
        let mut backend = RecordingBackend::default();
        ctx.on_monitoring_started(&world, &mut backend).unwrap();
        ctx.teardown(&mut backend);
        assert!(backend.uploaded.is_empty());
        assert_eq!(ctx.built_meshes(), BuiltMeshes::default());
        assert_eq!(backend.calls.last(), Some(&BackendCall::Release));
    }
}
