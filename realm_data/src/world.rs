//! Snapshot of the game-state monitor as seen by the renderer.

use crate::entities::{
    Animal, AvailableConstruction, BorderSegment, Crop, DecorationKind, FallingTree, Flag, House,
    Road, Ship, Sign, Stone, Tree, Worker,
};
use crate::point::Point;
use crate::terrain::{TerrainAtPoint, Tile, TileOrientation, Vegetation};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Read-only world state consumed by the mesh builders and draw-list collector.
///
/// Entity collections are unordered; nothing downstream depends on their order.
#[derive(Debug, Clone, Default)]
pub struct WorldView {
    pub terrain: HashMap<Point, TerrainAtPoint>,

    pub discovered_points: HashSet<Point>,
    /// Apexes whose `Below` tile has been discovered.
    pub discovered_below: HashSet<Point>,
    /// Apexes whose `DownRight` tile has been discovered.
    pub discovered_down_right: HashSet<Point>,

    pub houses: Vec<House>,
    pub trees: Vec<Tree>,
    pub falling_trees: Vec<FallingTree>,
    pub crops: Vec<Crop>,
    pub signs: Vec<Sign>,
    pub stones: Vec<Stone>,
    pub animals: Vec<Animal>,
    pub ships: Vec<Ship>,
    pub workers: Vec<Worker>,
    pub flags: Vec<Flag>,
    pub roads: Vec<Road>,
    pub decorations: BTreeMap<Point, DecorationKind>,
    pub border: Vec<BorderSegment>,
    pub available_construction: BTreeMap<Point, Vec<AvailableConstruction>>,
}

impl WorldView {
    /// Terrain height at a point. Points off the map report height 0.
    pub fn height_at(&self, point: Point) -> f32 {
        self.terrain.get(&point).map(|t| t.height).unwrap_or(0.0)
    }

    pub fn terrain_at(&self, point: Point) -> Option<&TerrainAtPoint> {
        self.terrain.get(&point)
    }

    /// Whether the point has terrain and non-negative coordinates.
    pub fn is_on_map(&self, point: Point) -> bool {
        point.x >= 0 && point.y >= 0 && self.terrain.contains_key(&point)
    }

    /// A tile exists when all three of its corners are on the map.
    pub fn tile_exists(&self, tile: Tile) -> bool {
        tile.vertices().iter().all(|p| self.is_on_map(*p))
    }

    pub fn is_tile_discovered(&self, tile: Tile) -> bool {
        match tile.orientation {
            TileOrientation::Below => self.discovered_below.contains(&tile.apex),
            TileOrientation::DownRight => self.discovered_down_right.contains(&tile.apex),
        }
    }

    /// Vegetation of a tile, if its apex has terrain.
    pub fn vegetation(&self, tile: Tile) -> Option<Vegetation> {
        self.terrain.get(&tile.apex).map(|t| tile.vegetation(t))
    }

    /// Discovered tiles in a stable order: all `Below` tiles sorted by apex,
    /// then all `DownRight` tiles sorted by apex. Tiles that do not exist on
    /// the map are dropped.
    pub fn discovered_tiles(&self) -> Vec<Tile> {
        let mut below: Vec<Point> = self.discovered_below.iter().copied().collect();
        let mut down_right: Vec<Point> = self.discovered_down_right.iter().copied().collect();
        below.sort_unstable();
        down_right.sort_unstable();

        below
            .into_iter()
            .map(Tile::below)
            .chain(down_right.into_iter().map(Tile::down_right))
            .filter(|tile| self.tile_exists(*tile))
            .collect()
    }

    /// Every point with terrain, sorted.
    pub fn sorted_points(&self) -> Vec<Point> {
        let mut points: Vec<Point> = self.terrain.keys().copied().collect();
        points.sort_unstable();
        points
    }

    /// Marks every on-map point and both of its tiles as discovered.
    pub fn discover_all(&mut self) {
        let points = self.sorted_points();
        for point in points {
            self.discovered_points.insert(point);
            for tile in [Tile::below(point), Tile::down_right(point)] {
                if self.tile_exists(tile) {
                    self.mark_tile_discovered(tile);
                }
            }
        }
    }

    pub fn mark_tile_discovered(&mut self, tile: Tile) {
        match tile.orientation {
            TileOrientation::Below => self.discovered_below.insert(tile.apex),
            TileOrientation::DownRight => self.discovered_down_right.insert(tile.apex),
        };
    }

    /// Points where a flag stands.
    pub fn flag_points(&self) -> HashSet<Point> {
        self.flags.iter().map(|f| f.point).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_world(points: &[(i32, i32)]) -> WorldView {
        let mut world = WorldView::default();
        for &(x, y) in points {
            world.terrain.insert(
                Point::new(x, y),
                TerrainAtPoint {
                    height: 10.0,
                    below: Vegetation::Meadow1,
                    down_right: Vegetation::Meadow1,
                },
            );
        }
        world
    }

    #[test]
    fn test_tile_exists_requires_all_corners() {
        let world = flat_world(&[(1, 1), (0, 0), (2, 0), (3, 1)]);
        assert!(world.tile_exists(Tile::below(Point::new(1, 1))));
        assert!(world.tile_exists(Tile::down_right(Point::new(1, 1))));
        assert!(!world.tile_exists(Tile::below(Point::new(3, 1))));
        assert!(!world.tile_exists(Tile::below(Point::new(0, 0))));
    }

    #[test]
    fn test_discover_all_marks_existing_tiles_only() {
        let mut world = flat_world(&[(1, 1), (0, 0), (2, 0), (3, 1)]);
        world.discover_all();
        assert_eq!(world.discovered_points.len(), 4);
        assert_eq!(
            world.discovered_tiles(),
            vec![Tile::below(Point::new(1, 1)), Tile::down_right(Point::new(1, 1))]
        );
    }

    #[test]
    fn test_height_off_map_is_zero() {
        let world = flat_world(&[(0, 0)]);
        assert_eq!(world.height_at(Point::new(0, 0)), 10.0);
        assert_eq!(world.height_at(Point::new(40, 40)), 0.0);
    }
}
