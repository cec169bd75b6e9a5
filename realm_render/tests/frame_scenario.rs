//! Whole-pipeline scenarios against the recording backend: world snapshot in,
//! ordered backend calls out.

use glam::Vec2;
use realm_data::{House, HouseState, HouseType, Nation, Point, Tree, TreeSize, TreeType};
use realm_render::RenderContext;
use realm_render::compositor::{ImageLayer, Layer, MeshLayer};
use realm_render::config::RenderConfig;
use realm_render::coords::visible_game_rect;
use realm_render::testing::{BackendCall, RecordingBackend, fixture_atlas, two_tile_world};
use std::time::Duration;

fn woodcutter(id: u32, point: Point) -> House {
    House {
        id,
        point,
        house_type: HouseType::Woodcutter,
        nation: Nation::Romans,
        state: HouseState::Ready,
        construction_progress: 0,
    }
}

fn context(config: RenderConfig) -> RenderContext {
    RenderContext::new(config, fixture_atlas(), Vec2::new(800.0, 600.0)).unwrap()
}

#[test]
fn test_single_house_frame() {
    let mut world = two_tile_world();
    world.houses.push(woodcutter(1, Point::new(1, 1)));

    let mut ctx = context(RenderConfig::default());
    let mut backend = RecordingBackend::default();

    let rect = visible_game_rect(&ctx.camera().transform());
    assert!(rect.contains(Point::new(0, 0), 0.0));
    assert!(rect.contains(Point::new(3, 1), 0.0));

    ctx.on_monitoring_started(&world, &mut backend).unwrap();
    backend.clear();
    let report = ctx
        .render_frame(&world, &mut backend, Duration::ZERO)
        .unwrap();

    assert_eq!(
        report.layers(),
        vec![Layer::Terrain, Layer::Shadows, Layer::Objects, Layer::FogOfWar]
    );
    assert_eq!(report.count(Layer::Terrain), Some(6));
    assert_eq!(report.count(Layer::Shadows), Some(1));
    assert_eq!(report.count(Layer::Objects), Some(1));
    assert_eq!(report.count(Layer::FogOfWar), Some(0));
    assert!(report.skipped.is_empty());

    assert_eq!(backend.calls.first(), Some(&BackendCall::Begin));
    assert_eq!(backend.calls.last(), Some(&BackendCall::End));
    assert_eq!(backend.calls[1], BackendCall::DrawMesh(MeshLayer::Terrain));

    let objects = backend.images(ImageLayer::Objects);
    assert_eq!(objects[0].game_point, Vec2::new(1.0, 1.0));
    assert_eq!(objects[0].height, 10.0);
}

#[test]
fn test_titles_follow_config() {
    let mut world = two_tile_world();
    world.houses.push(woodcutter(1, Point::new(1, 1)));

    let config = RenderConfig {
        show_house_titles: true,
        ..Default::default()
    };
    let mut ctx = context(config);
    let mut backend = RecordingBackend::default();
    ctx.on_monitoring_started(&world, &mut backend).unwrap();

    let report = ctx
        .render_frame(&world, &mut backend, Duration::ZERO)
        .unwrap();
    assert!(report.layers().contains(&Layer::HouseTitles));
    let titles = backend.titles();
    assert_eq!(titles.len(), 1);
    assert_eq!(titles[0].text, "Woodcutter");
}

#[test]
fn test_objects_sorted_back_to_front() {
    let mut world = two_tile_world();
    world.houses.push(woodcutter(1, Point::new(0, 0)));
    world.houses.push(woodcutter(2, Point::new(1, 1)));
    world.trees.push(Tree {
        point: Point::new(2, 0),
        tree_type: TreeType::Pine,
        size: TreeSize::FullGrown,
    });

    let mut ctx = context(RenderConfig::default());
    let mut backend = RecordingBackend::default();
    ctx.on_monitoring_started(&world, &mut backend).unwrap();
    ctx.render_frame(&world, &mut backend, Duration::ZERO)
        .unwrap();

    let points: Vec<Vec2> = backend
        .images(ImageLayer::Objects)
        .iter()
        .map(|draw| draw.game_point)
        .collect();
    assert_eq!(
        points,
        vec![
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0)
        ]
    );
}

#[test]
fn test_failing_layer_does_not_abort_frame() {
    let mut world = two_tile_world();
    world.houses.push(woodcutter(1, Point::new(1, 1)));

    let mut ctx = context(RenderConfig::default());
    let mut backend = RecordingBackend::failing(Layer::Shadows);
    ctx.on_monitoring_started(&world, &mut backend).unwrap();

    let report = ctx
        .render_frame(&world, &mut backend, Duration::ZERO)
        .unwrap();
    assert_eq!(
        report.layers(),
        vec![Layer::Terrain, Layer::Objects, Layer::FogOfWar]
    );
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(ctx.drain_diagnostics().len(), 1);
}

#[test]
fn test_frame_after_teardown_draws_no_meshes() {
    let world = two_tile_world();
    let mut ctx = context(RenderConfig::default());
    let mut backend = RecordingBackend::default();
    ctx.on_monitoring_started(&world, &mut backend).unwrap();
    ctx.teardown(&mut backend);

    backend.clear();
    let report = ctx
        .render_frame(&world, &mut backend, Duration::ZERO)
        .unwrap();
    assert!(report.issued.is_empty());
    assert_eq!(backend.calls, vec![BackendCall::Begin, BackendCall::End]);
}
