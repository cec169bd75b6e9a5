//! Per-frame collection of sprite draw items.
//!
//! Walks every entity category in the world snapshot, culls against the
//! visible rectangle, resolves sprite keys through the atlas and sorts the
//! object list back to front.

use crate::assets::{FrameResolver, HouseStage, SpriteFrame, SpriteKey};
use crate::config::CullingMargins;
use crate::coords::GameRect;
use crate::diagnostics::Diagnostics;
use glam::Vec2;
use realm_data::{HouseState, Point, Position, TreeSize, WorldView};

/// Most cargo units shown stacked at one flag.
pub const MAX_FLAG_CARGO: usize = 9;
const CARGO_PER_ZONE: usize = 3;
/// Where each zone of stacked cargo sits relative to the flag.
const CARGO_ZONES: [Vec2; 3] = [
    Vec2::new(-0.3, -0.1),
    Vec2::new(0.0, -0.2),
    Vec2::new(0.3, -0.1),
];
/// Height added per unit within a zone.
const CARGO_STACK_HEIGHT: f32 = 1.5;

/// One sprite to draw at a game position.
///
/// With no explicit `height` the compositor uses the terrain height at the
/// nearest grid point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub sprite: SpriteFrame,
    pub game_point: Vec2,
    pub height: Option<f32>,
}

/// Text label drawn under a house.
#[derive(Debug, Clone, PartialEq)]
pub struct HouseTitle {
    pub text: String,
    pub game_point: Vec2,
}

/// Everything the compositor draws this frame, one list per image layer.
#[derive(Debug, Clone, Default)]
pub struct DrawLists {
    pub decorations: Vec<DrawItem>,
    pub shadows: Vec<DrawItem>,
    /// Sorted back to front.
    pub objects: Vec<DrawItem>,
    pub hover: Vec<DrawItem>,
    pub house_titles: Vec<HouseTitle>,
}

/// Interaction state owned by the host UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiState {
    pub selected: Option<Point>,
    pub hover: Option<Point>,
    /// Points of a road currently being placed.
    pub new_road: Vec<Point>,
    pub show_available_construction: bool,
}

/// Borrowed inputs for one collection pass.
pub struct CollectContext<'a> {
    pub world: &'a WorldView,
    pub atlas: &'a dyn FrameResolver,
    pub visible: GameRect,
    pub animation_index: u32,
    pub ui: &'a UiState,
    pub margins: CullingMargins,
    pub show_house_titles: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Decorations,
    Objects,
    Hover,
}

struct Collector<'c, 'a> {
    ctx: &'c CollectContext<'a>,
    diagnostics: &'c mut Diagnostics,
    lists: DrawLists,
}

/// Builds this frame's draw lists.
pub fn collect(ctx: &CollectContext<'_>, diagnostics: &mut Diagnostics) -> DrawLists {
    let mut collector = Collector {
        ctx,
        diagnostics,
        lists: DrawLists::default(),
    };

    collector.houses();
    collector.trees();
    collector.ground_objects();
    collector.moving_units();
    collector.workers();
    collector.flags();
    collector.borders();
    collector.decorations();
    collector.available_construction();
    collector.hover_layer();

    let mut lists = collector.lists;
    sort_back_to_front(&mut lists.objects);
    sort_back_to_front(&mut lists.shadows);

    log::trace!(
        "Draw lists: {} decorations, {} shadows, {} objects, {} hover, {} titles",
        lists.decorations.len(),
        lists.shadows.len(),
        lists.objects.len(),
        lists.hover.len(),
        lists.house_titles.len()
    );
    lists
}

/// Higher game y is further away, so it is drawn first. Ties go left to right.
pub fn sort_back_to_front(items: &mut [DrawItem]) {
    items.sort_by(|a, b| {
        b.game_point
            .y
            .total_cmp(&a.game_point.y)
            .then(a.game_point.x.total_cmp(&b.game_point.x))
    });
}

fn grid_vec(point: Point) -> Vec2 {
    Vec2::new(point.x as f32, point.y as f32)
}

/// Interpolated position and height of a unit, and whether it is walking.
fn unit_placement(world: &WorldView, position: &Position) -> (Vec2, Option<f32>, bool) {
    match position {
        Position::At { point, .. } => (grid_vec(*point), None, false),
        Position::Moving(movement) => {
            let t = movement.fraction();
            let from = grid_vec(movement.previous);
            let to = grid_vec(movement.next);
            let h0 = world.height_at(movement.previous);
            let h1 = world.height_at(movement.next);
            (from + (to - from) * t, Some(h0 + (h1 - h0) * t), true)
        }
    }
}

fn facing(position: &Position) -> realm_data::Direction {
    match position {
        Position::At { direction, .. } => *direction,
        Position::Moving(m) => m.direction(),
    }
}

impl Collector<'_, '_> {
    fn visible(&self, point: Point, margin: f32) -> bool {
        self.ctx.visible.contains(point, margin)
    }

    /// Looks up a key and returns the frame (and shadow) for `index`.
    ///
    /// Missing keys are reported once. A finished `SingleThenStop` strip
    /// yields `None` without a report.
    fn resolve(&mut self, key: SpriteKey, index: u32) -> Option<(SpriteFrame, Option<SpriteFrame>)> {
        let Some(strip) = self.ctx.atlas.strip(&key) else {
            self.diagnostics.missing_sprite(key);
            return None;
        };
        strip.resolve(index).map(|r| (r.sprite, r.shadow))
    }

    fn push(&mut self, target: Target, sprite: SpriteFrame, game_point: Vec2, height: Option<f32>) {
        let item = DrawItem {
            sprite,
            game_point,
            height,
        };
        match target {
            Target::Decorations => self.lists.decorations.push(item),
            Target::Objects => self.lists.objects.push(item),
            Target::Hover => self.lists.hover.push(item),
        }
    }

    /// Resolves and pushes a sprite with its shadow, if any.
    fn draw(&mut self, key: SpriteKey, index: u32, game_point: Vec2, height: Option<f32>) {
        if let Some((sprite, shadow)) = self.resolve(key, index) {
            self.push(Target::Objects, sprite, game_point, height);
            if let Some(shadow) = shadow {
                self.lists.shadows.push(DrawItem {
                    sprite: shadow,
                    game_point,
                    height,
                });
            }
        }
    }

    fn houses(&mut self) {
        let world = self.ctx.world;
        let margin = self.ctx.margins.houses;

        for house in &world.houses {
            if !self.visible(house.point, margin) {
                continue;
            }
            let stage = HouseStage::from(house.state);
            let key = SpriteKey::House {
                house: house.house_type,
                nation: house.nation,
                stage,
            };
            let index = if house.state == HouseState::Burning {
                self.ctx.animation_index
            } else {
                0
            };
            let Some((mut sprite, mut shadow)) = self.resolve(key, index) else {
                continue;
            };

            if stage == HouseStage::UnderConstruction {
                sprite = sprite.crop_from_bottom(house.construction_progress);
                shadow = shadow.map(|s| s.crop_from_bottom(house.construction_progress));
            }

            let game_point = grid_vec(house.point);
            self.push(Target::Objects, sprite, game_point, None);
            if let Some(shadow) = shadow {
                self.lists.shadows.push(DrawItem {
                    sprite: shadow,
                    game_point,
                    height: None,
                });
            }

            if self.ctx.show_house_titles {
                self.lists.house_titles.push(HouseTitle {
                    text: house.house_type.title().to_string(),
                    game_point,
                });
            }
        }
    }

    fn trees(&mut self) {
        let world = self.ctx.world;
        let margin = self.ctx.margins.trees;

        for tree in &world.trees {
            if !self.visible(tree.point, margin) {
                continue;
            }
            let key = SpriteKey::Tree {
                tree: tree.tree_type,
                size: tree.size,
            };
            let index = if tree.size == TreeSize::FullGrown {
                self.ctx.animation_index
            } else {
                0
            };
            self.draw(key, index, grid_vec(tree.point), None);
        }

        for falling in &world.falling_trees {
            if !self.visible(falling.point, margin) {
                continue;
            }
            let key = SpriteKey::FallingTree {
                tree: falling.tree_type,
            };
            let index = self.ctx.animation_index.saturating_sub(falling.started_at);
            self.draw(key, index, grid_vec(falling.point), None);
        }
    }

    fn ground_objects(&mut self) {
        let world = self.ctx.world;
        let margins = self.ctx.margins;

        for crop in &world.crops {
            if self.visible(crop.point, margins.default) {
                let key = SpriteKey::Crop {
                    crop: crop.crop_type,
                    growth: crop.growth,
                };
                self.draw(key, 0, grid_vec(crop.point), None);
            }
        }

        for sign in &world.signs {
            if self.visible(sign.point, margins.default) {
                let key = SpriteKey::Sign {
                    sign: sign.sign,
                    size: sign.size,
                };
                self.draw(key, 0, grid_vec(sign.point), None);
            }
        }

        for stone in &world.stones {
            if self.visible(stone.point, margins.stones) {
                let key = SpriteKey::Stone {
                    stone: stone.stone_type,
                    amount: stone.amount,
                };
                self.draw(key, 0, grid_vec(stone.point), None);
            }
        }
    }

    fn moving_units(&mut self) {
        let world = self.ctx.world;
        let margin = self.ctx.margins.default;

        for animal in &world.animals {
            if !self.visible(animal.position.anchor(), margin) {
                continue;
            }
            let (game_point, height, moving) = unit_placement(world, &animal.position);
            let key = SpriteKey::Animal {
                animal: animal.animal,
                direction: facing(&animal.position),
            };
            let index = if moving { self.ctx.animation_index } else { 0 };
            self.draw(key, index, game_point, height);
        }

        for ship in &world.ships {
            if !self.visible(ship.position.anchor(), margin) {
                continue;
            }
            let (game_point, height, moving) = unit_placement(world, &ship.position);
            let key = SpriteKey::Ship {
                stage: ship.stage,
                direction: facing(&ship.position),
            };
            let index = if moving { self.ctx.animation_index } else { 0 };
            self.draw(key, index, game_point, height);
        }
    }

    fn workers(&mut self) {
        let world = self.ctx.world;
        let margin = self.ctx.margins.default;

        for worker in &world.workers {
            if !self.visible(worker.position.anchor(), margin) {
                continue;
            }
            let (game_point, height, moving) = unit_placement(world, &worker.position);
            let direction = facing(&worker.position);

            if let Some(activity) = worker.action {
                let key = SpriteKey::WorkerAction {
                    worker: worker.worker_type,
                    nation: worker.nation,
                    color: worker.color,
                    action: activity.action,
                    direction,
                };
                let index = self.ctx.animation_index.saturating_sub(activity.started_at);
                // A finished one-shot action draws nothing at all
                self.draw(key, index, game_point, height);
                continue;
            }

            let key = SpriteKey::Worker {
                worker: worker.worker_type,
                nation: worker.nation,
                color: worker.color,
                direction,
            };
            let index = if moving { self.ctx.animation_index } else { 0 };
            self.draw(key, index, game_point, height);

            if let Some(material) = worker.cargo
                && let Some((sprite, _)) = self.resolve(SpriteKey::Cargo { material }, 0)
            {
                self.push(Target::Objects, sprite, game_point, height);
            }
        }
    }

    fn flags(&mut self) {
        let world = self.ctx.world;
        let margin = self.ctx.margins.default;

        for flag in &world.flags {
            if !self.visible(flag.point, margin) {
                continue;
            }
            let base = grid_vec(flag.point);
            let key = SpriteKey::Flag {
                nation: flag.nation,
                color: flag.color,
            };
            self.draw(key, self.ctx.animation_index, base, None);

            let flag_height = world.height_at(flag.point);
            for (i, material) in flag.stacked_cargo.iter().take(MAX_FLAG_CARGO).enumerate() {
                let Some((sprite, _)) = self.resolve(SpriteKey::Cargo { material: *material }, 0)
                else {
                    continue;
                };
                let zone = CARGO_ZONES[i / CARGO_PER_ZONE];
                let slot = (i % CARGO_PER_ZONE) as f32;
                self.push(
                    Target::Objects,
                    sprite,
                    base + zone,
                    Some(flag_height + slot * CARGO_STACK_HEIGHT),
                );
            }
        }
    }

    fn borders(&mut self) {
        let world = self.ctx.world;
        let margin = self.ctx.margins.default;

        for segment in &world.border {
            let key = SpriteKey::BorderMarker {
                nation: segment.nation,
                color: segment.color,
            };
            for &point in &segment.points {
                if self.visible(point, margin) {
                    self.draw(key, 0, grid_vec(point), None);
                }
            }
        }
    }

    fn decorations(&mut self) {
        let world = self.ctx.world;
        let margin = self.ctx.margins.default;

        for (&point, &decoration) in &world.decorations {
            if !self.visible(point, margin) {
                continue;
            }
            if let Some((sprite, _)) = self.resolve(SpriteKey::Decoration { decoration }, 0) {
                self.push(Target::Decorations, sprite, grid_vec(point), None);
            }
        }
    }

    fn available_construction(&mut self) {
        let world = self.ctx.world;
        let margin = self.ctx.margins.default;
        let hover = self.ctx.ui.hover;

        for (&point, available) in &world.available_construction {
            let Some(&best) = available.iter().max() else {
                continue;
            };
            let is_hover = hover == Some(point);
            if !is_hover && !(self.ctx.ui.show_available_construction && self.visible(point, margin)) {
                continue;
            }
            let Some((sprite, _)) = self.resolve(SpriteKey::Availability { available: best }, 0)
            else {
                continue;
            };
            let target = if is_hover { Target::Hover } else { Target::Objects };
            self.push(target, sprite, grid_vec(point), None);
        }
    }

    fn hover_layer(&mut self) {
        let ui = self.ctx.ui;

        if let Some(point) = ui.selected
            && let Some((sprite, _)) = self.resolve(SpriteKey::Selection, 0)
        {
            self.push(Target::Hover, sprite, grid_vec(point), None);
        }

        if let Some(point) = ui.hover
            && let Some((sprite, _)) = self.resolve(SpriteKey::HoverPoint, 0)
        {
            self.push(Target::Hover, sprite, grid_vec(point), None);
        }

        for &point in &ui.new_road {
            if let Some((sprite, _)) = self.resolve(SpriteKey::RoadPreview, 0) {
                self.push(Target::Hover, sprite, grid_vec(point), None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimationType;
    use crate::assets::FrameStrip;
    use crate::diagnostics::Diagnostic;
    use crate::testing::{flat_world, frame};
    use realm_data::{
        ActionKind, AnimalKind, Movement, AvailableConstruction, DecorationKind, FallingTree, Flag,
        House, HouseType, Material, Nation, PlayerColor, Ship, ShipStage, Stone, StoneType, Tree,
        TreeType, Worker, WorkerActivity, WorkerType,
    };
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapResolver(HashMap<SpriteKey, FrameStrip>);

    impl FrameResolver for MapResolver {
        fn strip(&self, key: &SpriteKey) -> Option<&FrameStrip> {
            self.0.get(key)
        }
    }

    impl MapResolver {
        fn with(mut self, key: SpriteKey, frames: usize, shadow: bool, animation: AnimationType) -> Self {
            let strip = FrameStrip {
                frames: (0..frames as u32).map(|i| frame(i * 10, 0)).collect(),
                shadows: if shadow { vec![frame(500, 0)] } else { Vec::new() },
                animation,
            };
            self.0.insert(key, strip);
            self
        }
    }

    fn everything_visible() -> GameRect {
        GameRect {
            min: Vec2::splat(-100.0),
            max: Vec2::splat(100.0),
        }
    }

    fn run(world: &WorldView, atlas: &MapResolver, ui: &UiState, index: u32) -> (DrawLists, Diagnostics) {
        let ctx = CollectContext {
            world,
            atlas,
            visible: everything_visible(),
            animation_index: index,
            ui,
            margins: CullingMargins::default(),
            show_house_titles: true,
        };
        let mut diagnostics = Diagnostics::new();
        let lists = collect(&ctx, &mut diagnostics);
        (lists, diagnostics)
    }

    fn house_key(stage: HouseStage) -> SpriteKey {
        SpriteKey::House {
            house: HouseType::Woodcutter,
            nation: Nation::Romans,
            stage,
        }
    }

    fn house(x: i32, y: i32, state: HouseState) -> House {
        House {
            id: 1,
            point: Point::new(x, y),
            house_type: HouseType::Woodcutter,
            nation: Nation::Romans,
            state,
            construction_progress: 50,
        }
    }

    fn worker_at(point: Point) -> Worker {
        Worker {
            id: 7,
            worker_type: WorkerType::Woodcutter,
            nation: Nation::Romans,
            color: PlayerColor::Blue,
            position: Position::At {
                point,
                direction: realm_data::Direction::East,
            },
            action: None,
            cargo: None,
        }
    }

    #[test]
    fn test_objects_sorted_back_to_front() {
        let mut items: Vec<DrawItem> = [(3.0, 3.0), (1.0, 5.0), (5.0, 3.0), (2.0, 3.0)]
            .iter()
            .map(|&(x, y)| DrawItem {
                sprite: frame(0, 0),
                game_point: Vec2::new(x, y),
                height: None,
            })
            .collect();
        sort_back_to_front(&mut items);

        let order: Vec<(f32, f32)> = items
            .iter()
            .map(|i| (i.game_point.x, i.game_point.y))
            .collect();
        assert_eq!(order, vec![(1.0, 5.0), (2.0, 3.0), (3.0, 3.0), (5.0, 3.0)]);
    }

    #[test]
    fn test_ready_house_with_shadow_and_title() {
        let mut world = flat_world(6, 6);
        world.houses.push(house(3, 3, HouseState::Occupied));
        let atlas = MapResolver::default().with(house_key(HouseStage::Ready), 1, true, AnimationType::Repeat);

        let (lists, diagnostics) = run(&world, &atlas, &UiState::default(), 0);
        assert_eq!(lists.objects.len(), 1);
        assert_eq!(lists.shadows.len(), 1);
        assert_eq!(lists.house_titles[0].text, "Woodcutter");
        assert!(diagnostics.pending().is_empty());
    }

    #[test]
    fn test_under_construction_house_is_cropped() {
        let mut world = flat_world(6, 6);
        world.houses.push(house(3, 3, HouseState::UnderConstruction));
        let atlas = MapResolver::default().with(
            house_key(HouseStage::UnderConstruction),
            1,
            false,
            AnimationType::Repeat,
        );

        let (lists, _) = run(&world, &atlas, &UiState::default(), 0);
        let full = frame(0, 0);
        assert_eq!(lists.objects[0].sprite.height, full.height / 2);
    }

    #[test]
    fn test_missing_sprite_skipped_and_reported_once() {
        let mut world = flat_world(6, 6);
        world.houses.push(house(1, 1, HouseState::Ready));
        world.houses.push(house(3, 3, HouseState::Ready));
        let atlas = MapResolver::default();

        let (lists, mut diagnostics) = run(&world, &atlas, &UiState::default(), 0);
        assert!(lists.objects.is_empty());
        assert_eq!(
            diagnostics.drain(),
            vec![Diagnostic::MissingSprite(house_key(HouseStage::Ready))]
        );
    }

    #[test]
    fn test_culling_uses_margin() {
        let mut world = flat_world(6, 6);
        world.trees.push(Tree {
            point: Point::new(20, 20),
            tree_type: TreeType::Pine,
            size: TreeSize::FullGrown,
        });
        let key = SpriteKey::Tree {
            tree: TreeType::Pine,
            size: TreeSize::FullGrown,
        };
        let atlas = MapResolver::default().with(key, 4, false, AnimationType::Repeat);
        let ui = UiState::default();
        let ctx = |max: f32| CollectContext {
            world: &world,
            atlas: &atlas,
            visible: GameRect {
                min: Vec2::ZERO,
                max: Vec2::splat(max),
            },
            animation_index: 6,
            ui: &ui,
            margins: CullingMargins::default(),
            show_house_titles: false,
        };

        let mut diagnostics = Diagnostics::new();
        assert!(collect(&ctx(17.0), &mut diagnostics).objects.is_empty());
        let lists = collect(&ctx(18.5), &mut diagnostics);
        assert_eq!(lists.objects.len(), 1);
        // Full-grown trees sway with the global counter
        assert_eq!(lists.objects[0].sprite.source_x, 20);
    }

    #[test]
    fn test_stones_cull_tighter_than_houses() {
        let mut world = flat_world(16, 16);
        world.houses.push(house(12, 4, HouseState::Ready));
        for point in [Point::new(12, 10), Point::new(11, 9)] {
            world.stones.push(Stone {
                point,
                stone_type: StoneType::Stone1,
                amount: 3,
            });
        }
        let stone_key = SpriteKey::Stone {
            stone: StoneType::Stone1,
            amount: 3,
        };
        let atlas = MapResolver::default()
            .with(house_key(HouseStage::Ready), 1, false, AnimationType::Repeat)
            .with(stone_key, 1, false, AnimationType::Repeat);
        let ui = UiState::default();
        let ctx = CollectContext {
            world: &world,
            atlas: &atlas,
            visible: GameRect {
                min: Vec2::ZERO,
                max: Vec2::splat(10.0),
            },
            animation_index: 0,
            ui: &ui,
            margins: CullingMargins::default(),
            show_house_titles: false,
        };

        let lists = collect(&ctx, &mut Diagnostics::new());
        let mut points: Vec<Vec2> = lists.objects.iter().map(|i| i.game_point).collect();
        points.sort_by(|a, b| a.x.total_cmp(&b.x));
        // Two past the edge keeps the house but not the stone
        assert_eq!(points, vec![Vec2::new(11.0, 9.0), Vec2::new(12.0, 4.0)]);
    }

    #[test]
    fn test_falling_tree_freezes_on_last_frame() {
        let mut world = flat_world(6, 6);
        world.falling_trees.push(FallingTree {
            point: Point::new(2, 2),
            tree_type: TreeType::Pine,
            started_at: 10,
        });
        let key = SpriteKey::FallingTree { tree: TreeType::Pine };
        let atlas = MapResolver::default().with(key, 4, true, AnimationType::SingleThenFreeze);
        let ui = UiState::default();

        let (lists, _) = run(&world, &atlas, &ui, 12);
        assert_eq!(lists.objects[0].sprite.source_x, 20);

        // Counter values before the start clamp to the first frame
        let (lists, _) = run(&world, &atlas, &ui, 4);
        assert_eq!(lists.objects[0].sprite.source_x, 0);

        let (lists, diagnostics) = run(&world, &atlas, &ui, 40);
        assert_eq!(lists.objects.len(), 1);
        assert_eq!(lists.objects[0].sprite.source_x, 30);
        assert_eq!(lists.shadows.len(), 1);
        assert!(diagnostics.pending().is_empty());
    }

    #[test]
    fn test_stopped_falling_tree_draws_nothing() {
        let mut world = flat_world(6, 6);
        world.falling_trees.push(FallingTree {
            point: Point::new(2, 2),
            tree_type: TreeType::Pine,
            started_at: 10,
        });
        let key = SpriteKey::FallingTree { tree: TreeType::Pine };
        let atlas = MapResolver::default().with(key, 4, false, AnimationType::SingleThenStop);
        let ui = UiState::default();

        let (lists, _) = run(&world, &atlas, &ui, 13);
        assert_eq!(lists.objects[0].sprite.source_x, 30);

        let (lists, diagnostics) = run(&world, &atlas, &ui, 14);
        assert!(lists.objects.is_empty());
        assert!(lists.shadows.is_empty());
        assert!(diagnostics.pending().is_empty());
    }

    #[test]
    fn test_moving_ship_is_interpolated_and_faces_travel() {
        let mut world = flat_world(6, 6);
        world.terrain.get_mut(&Point::new(3, 3)).unwrap().height = 30.0;
        world.ships.push(Ship {
            id: 4,
            stage: ShipStage::Ready,
            position: Position::Moving(Movement {
                previous: Point::new(2, 2),
                next: Point::new(3, 3),
                percentage_traveled: 50,
            }),
        });
        let key = SpriteKey::Ship {
            stage: ShipStage::Ready,
            direction: realm_data::Direction::NorthEast,
        };
        let atlas = MapResolver::default().with(key, 2, false, AnimationType::Repeat);

        let (lists, diagnostics) = run(&world, &atlas, &UiState::default(), 5);
        assert!(diagnostics.pending().is_empty());
        let item = lists.objects[0];
        assert_eq!(item.game_point, Vec2::new(2.5, 2.5));
        assert_eq!(item.height, Some(20.0));
        assert_eq!(item.sprite.source_x, 10);
    }

    #[test]
    fn test_finished_single_shot_action_draws_nothing() {
        let mut world = flat_world(6, 6);
        let mut worker = worker_at(Point::new(2, 2));
        worker.action = Some(WorkerActivity {
            action: ActionKind::CuttingTree,
            started_at: 10,
        });
        world.workers.push(worker);
        let key = SpriteKey::WorkerAction {
            worker: WorkerType::Woodcutter,
            nation: Nation::Romans,
            color: PlayerColor::Blue,
            action: ActionKind::CuttingTree,
            direction: realm_data::Direction::East,
        };
        let atlas = MapResolver::default().with(key, 4, false, AnimationType::SingleThenStop);
        let ui = UiState::default();

        let (lists, _) = run(&world, &atlas, &ui, 12);
        assert_eq!(lists.objects[0].sprite.source_x, 20);

        let (lists, diagnostics) = run(&world, &atlas, &ui, 14);
        assert!(lists.objects.is_empty());
        assert!(diagnostics.pending().is_empty());
    }

    #[test]
    fn test_moving_animal_is_interpolated() {
        let mut world = flat_world(6, 6);
        world.terrain.get_mut(&Point::new(4, 2)).unwrap().height = 20.0;
        world.animals.push(realm_data::Animal {
            id: 1,
            animal: AnimalKind::Deer,
            position: Position::Moving(Movement {
                previous: Point::new(2, 2),
                next: Point::new(4, 2),
                percentage_traveled: 25,
            }),
        });
        let key = SpriteKey::Animal {
            animal: AnimalKind::Deer,
            direction: realm_data::Direction::East,
        };
        let atlas = MapResolver::default().with(key, 2, false, AnimationType::Repeat);

        let (lists, _) = run(&world, &atlas, &UiState::default(), 3);
        let item = lists.objects[0];
        assert_eq!(item.game_point, Vec2::new(2.5, 2.0));
        assert_eq!(item.height, Some(12.5));
        assert_eq!(item.sprite.source_x, 10);
    }

    #[test]
    fn test_worker_cargo_drawn_after_worker() {
        let mut world = flat_world(6, 6);
        let mut worker = worker_at(Point::new(2, 2));
        worker.cargo = Some(Material::Wood);
        world.workers.push(worker);
        let walk = SpriteKey::Worker {
            worker: WorkerType::Woodcutter,
            nation: Nation::Romans,
            color: PlayerColor::Blue,
            direction: realm_data::Direction::East,
        };
        let atlas = MapResolver::default()
            .with(walk, 1, false, AnimationType::Repeat)
            .with(SpriteKey::Cargo { material: Material::Wood }, 1, false, AnimationType::Repeat);

        let (lists, _) = run(&world, &atlas, &UiState::default(), 0);
        assert_eq!(lists.objects.len(), 2);
    }

    #[test]
    fn test_flag_cargo_capped_in_three_zones() {
        let mut world = flat_world(6, 6);
        world.flags.push(Flag {
            id: 1,
            point: Point::new(2, 2),
            nation: Nation::Romans,
            color: PlayerColor::Blue,
            stacked_cargo: vec![Material::Plank; 12],
        });
        let atlas = MapResolver::default()
            .with(
                SpriteKey::Flag {
                    nation: Nation::Romans,
                    color: PlayerColor::Blue,
                },
                1,
                false,
                AnimationType::Repeat,
            )
            .with(SpriteKey::Cargo { material: Material::Plank }, 1, false, AnimationType::Repeat);

        let (lists, _) = run(&world, &atlas, &UiState::default(), 0);
        let cargo: Vec<&DrawItem> = lists.objects.iter().filter(|i| i.height.is_some()).collect();
        assert_eq!(cargo.len(), MAX_FLAG_CARGO);

        let mut heights: Vec<f32> = cargo.iter().filter_map(|i| i.height).collect();
        heights.sort_by(f32::total_cmp);
        heights.dedup();
        assert_eq!(heights, vec![10.0, 11.5, 13.0]);
    }

    #[test]
    fn test_hover_layer_and_availability() {
        let mut world = flat_world(6, 6);
        world.available_construction.insert(
            Point::new(2, 2),
            vec![AvailableConstruction::Flag, AvailableConstruction::Large],
        );
        world.available_construction.insert(
            Point::new(4, 4),
            vec![AvailableConstruction::Small],
        );
        world.decorations.insert(Point::new(1, 1), DecorationKind::Bush);

        let atlas = MapResolver::default()
            .with(SpriteKey::Selection, 1, false, AnimationType::Repeat)
            .with(SpriteKey::HoverPoint, 1, false, AnimationType::Repeat)
            .with(SpriteKey::RoadPreview, 1, false, AnimationType::Repeat)
            .with(
                SpriteKey::Availability {
                    available: AvailableConstruction::Large,
                },
                1,
                false,
                AnimationType::Repeat,
            )
            .with(
                SpriteKey::Availability {
                    available: AvailableConstruction::Small,
                },
                1,
                false,
                AnimationType::Repeat,
            )
            .with(
                SpriteKey::Decoration {
                    decoration: DecorationKind::Bush,
                },
                1,
                false,
                AnimationType::Repeat,
            );

        let mut ui = UiState {
            selected: Some(Point::new(3, 3)),
            hover: Some(Point::new(2, 2)),
            new_road: vec![Point::new(0, 0), Point::new(2, 0)],
            show_available_construction: false,
        };

        let (lists, _) = run(&world, &atlas, &ui, 0);
        // Availability icon at hover, selection, hover marker, two preview points
        assert_eq!(lists.hover.len(), 5);
        assert!(lists.objects.is_empty());
        assert_eq!(lists.decorations.len(), 1);

        ui.show_available_construction = true;
        let (lists, _) = run(&world, &atlas, &ui, 0);
        assert_eq!(lists.objects.len(), 1);
        assert_eq!(lists.objects[0].game_point, Vec2::new(4.0, 4.0));
    }
}
