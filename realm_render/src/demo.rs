//! Seeded demo map for the viewer when no map file is given.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use realm_data::{
    Animal, AnimalKind, Direction, Flag, House, HouseState, HouseType, Material, Nation,
    PlayerColor, Point, Position, Road, RoadKind, Stone, StoneType, TerrainAtPoint, Tile, Tree,
    TreeSize, TreeType, Vegetation, WorldView,
};

/// Grid points along x (every other column is on the lattice).
pub const DEMO_WIDTH: i32 = 60;
pub const DEMO_HEIGHT: i32 = 40;
/// Game units around the village that start discovered.
const DISCOVERED_RADIUS: f32 = 14.0;

pub fn village_center() -> Point {
    Point::new(DEMO_WIDTH / 2, DEMO_HEIGHT / 2)
}

/// Builds a hilly map with a small village in the middle. The same seed
/// always gives the same world.
pub fn generate_world(seed: u64) -> WorldView {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut world = WorldView::default();

    let phase_x = rng.gen_range(0.0..std::f32::consts::TAU);
    let phase_y = rng.gen_range(0.0..std::f32::consts::TAU);
    let center = village_center();

    for y in 0..DEMO_HEIGHT {
        for x in 0..DEMO_WIDTH {
            let point = Point::new(x, y);
            if !point.is_on_grid() {
                continue;
            }
            let wave = (x as f32 * 0.21 + phase_x).sin() + (y as f32 * 0.27 + phase_y).cos();
            let distance = distance(point, center);
            // Flatten the village area
            let flatten = (distance / DISCOVERED_RADIUS).min(1.0);
            let height = 10.0 + wave * 3.0 * flatten + rng.gen_range(-0.3..0.3);

            world.terrain.insert(
                point,
                TerrainAtPoint {
                    height,
                    below: vegetation_for(height, &mut rng),
                    down_right: vegetation_for(height, &mut rng),
                },
            );
        }
    }

    for point in world.sorted_points() {
        if distance(point, center) <= DISCOVERED_RADIUS {
            world.discovered_points.insert(point);
        }
    }
    let discovered: Vec<Point> = world.discovered_points.iter().copied().collect();
    for point in discovered {
        for tile in [Tile::below(point), Tile::down_right(point)] {
            if world.tile_exists(tile)
                && tile
                    .vertices()
                    .iter()
                    .all(|v| world.discovered_points.contains(v))
            {
                world.mark_tile_discovered(tile);
            }
        }
    }

    place_village(&mut world, &mut rng);
    place_nature(&mut world, &mut rng);

    log::info!(
        "Generated demo map (seed {}): {} points, {} houses, {} trees",
        seed,
        world.terrain.len(),
        world.houses.len(),
        world.trees.len()
    );
    world
}

fn distance(a: Point, b: Point) -> f32 {
    let dx = (a.x - b.x) as f32;
    let dy = (a.y - b.y) as f32;
    (dx * dx + dy * dy).sqrt()
}

fn vegetation_for(height: f32, rng: &mut StdRng) -> Vegetation {
    match height {
        h if h < 7.5 => Vegetation::Water,
        h if h < 8.3 => Vegetation::Savannah,
        h if h < 11.5 => {
            if rng.gen_bool(0.1) {
                Vegetation::FlowerMeadow
            } else {
                Vegetation::Meadow1
            }
        }
        h if h < 12.5 => Vegetation::Mountain1,
        _ => Vegetation::Snow,
    }
}

fn place_village(world: &mut WorldView, rng: &mut StdRng) {
    let center = village_center();
    let houses = [
        (Point::new(center.x - 6, center.y + 2), HouseType::Woodcutter),
        (Point::new(center.x + 4, center.y + 2), HouseType::Sawmill),
        (Point::new(center.x - 4, center.y - 4), HouseType::Quarry),
        (Point::new(center.x + 6, center.y - 4), HouseType::Well),
    ];

    for (id, (point, house_type)) in houses.into_iter().enumerate() {
        let state = if rng.gen_bool(0.25) {
            HouseState::UnderConstruction
        } else {
            HouseState::Ready
        };
        world.houses.push(House {
            id: id as u32 + 1,
            point,
            house_type,
            nation: Nation::Romans,
            state,
            construction_progress: rng.gen_range(10..90),
        });

        // Flag sits down-right of its house
        let flag = point.down_right();
        world.flags.push(Flag {
            id: id as u32 + 1,
            point: flag,
            nation: Nation::Romans,
            color: PlayerColor::Blue,
            stacked_cargo: (0..rng.gen_range(0..5)).map(|_| Material::Wood).collect(),
        });
        world.roads.push(Road {
            id: id as u32 + 1,
            points: straight_road(flag, center),
            kind: if id == 0 {
                RoadKind::Main
            } else {
                RoadKind::Normal
            },
        });
    }

    world.flags.push(Flag {
        id: 100,
        point: center,
        nation: Nation::Romans,
        color: PlayerColor::Blue,
        stacked_cargo: Vec::new(),
    });
}

/// Lattice walk from `from` to `to`: diagonal steps until the rows match,
/// then horizontal ones.
fn straight_road(from: Point, to: Point) -> Vec<Point> {
    let mut points = vec![from];
    let mut current = from;
    while current != to {
        current = if current.y < to.y {
            if current.x < to.x {
                current.up_right()
            } else {
                current.up_left()
            }
        } else if current.y > to.y {
            if current.x < to.x {
                current.down_right()
            } else {
                current.down_left()
            }
        } else if current.x < to.x {
            current.right()
        } else {
            current.left()
        };
        points.push(current);
    }
    points
}

fn place_nature(world: &mut WorldView, rng: &mut StdRng) {
    let center = village_center();
    let occupied: Vec<Point> = world
        .houses
        .iter()
        .map(|h| h.point)
        .chain(world.flags.iter().map(|f| f.point))
        .chain(world.roads.iter().flat_map(|r| r.points.iter().copied()))
        .collect();

    for point in world.sorted_points() {
        if occupied.contains(&point) || distance(point, center) < 4.0 {
            continue;
        }
        let on_land = world
            .terrain_at(point)
            .is_some_and(|t| t.below != Vegetation::Water && t.below != Vegetation::Snow);
        if !on_land {
            continue;
        }

        if rng.gen_bool(0.12) {
            let tree_type = if rng.gen_bool(0.5) {
                TreeType::Pine
            } else {
                TreeType::Birch
            };
            world.trees.push(Tree {
                point,
                tree_type,
                size: TreeSize::FullGrown,
            });
        } else if rng.gen_bool(0.02) {
            world.stones.push(Stone {
                point,
                stone_type: StoneType::Stone1,
                amount: rng.gen_range(1..=6),
            });
        }
    }

    for id in 0..3 {
        let point = Point::new(center.x + 8 + id * 2, center.y + 6);
        world.animals.push(Animal {
            id: id as u32 + 1,
            animal: AnimalKind::Rabbit,
            position: Position::At {
                point,
                direction: Direction::West,
            },
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_world() {
        let a = generate_world(7);
        let b = generate_world(7);
        assert_eq!(a.terrain.len(), b.terrain.len());
        assert_eq!(a.trees, b.trees);
        assert_eq!(a.houses, b.houses);
        for point in a.sorted_points() {
            assert_eq!(a.height_at(point), b.height_at(point));
        }
    }

    #[test]
    fn test_village_is_discovered_and_connected() {
        let world = generate_world(1);
        assert!(world.discovered_points.contains(&village_center()));
        assert!(!world.discovered_below.is_empty());
        assert_eq!(world.houses.len(), 4);

        let flags = world.flag_points();
        for road in &world.roads {
            assert!(flags.contains(&road.points[0]));
            assert_eq!(road.points.last(), Some(&village_center()));
            for pair in road.points.windows(2) {
                assert!(pair[0].neighbors().contains(&pair[1]));
            }
        }
    }

    #[test]
    fn test_every_point_is_on_grid() {
        let world = generate_world(3);
        assert!(world.terrain.keys().all(|p| p.is_on_grid()));
    }
}
