//! JSON map files: terrain points plus optional entities and discovery.
//!
//! Format:
//! ```json
//! {
//!   "points": [{ "x": 1, "y": 1, "height": 10, "below": "meadow1", "down_right": "water" }],
//!   "discovered": [{ "x": 1, "y": 1 }],
//!   "discover_all": false,
//!   "houses": [...], "roads": [...], "decorations": [{ "point": {...}, "decoration": "bush" }]
//! }
//! ```

use crate::entities::{
    Animal, AvailableConstruction, BorderSegment, Crop, DecorationKind, FallingTree, Flag, House,
    Road, Ship, Sign, Stone, Tree, Worker,
};
use crate::point::Point;
use crate::terrain::{TerrainAtPoint, Tile, Vegetation};
use crate::world::WorldView;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorldLoadError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Map file not found: {0}")]
    NotFound(PathBuf),
    #[error("Invalid map: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointRecord {
    pub x: i32,
    pub y: i32,
    pub height: f32,
    pub below: Vegetation,
    pub down_right: Vegetation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecorationRecord {
    pub point: Point,
    pub decoration: DecorationKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub point: Point,
    pub available: Vec<AvailableConstruction>,
}

/// On-disk map layout. Every entity list is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapFile {
    pub points: Vec<PointRecord>,
    pub discovered: Vec<Point>,
    pub discover_all: bool,
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
    pub decorations: Vec<DecorationRecord>,
    pub border: Vec<BorderSegment>,
    pub available_construction: Vec<AvailabilityRecord>,
}

impl MapFile {
    /// Converts the file layout into a world snapshot.
    ///
    /// Explicitly discovered points also discover the tiles whose three corners
    /// are all discovered.
    pub fn into_world(self) -> Result<WorldView, WorldLoadError> {
        let mut world = WorldView::default();

        for record in &self.points {
            let point = Point::new(record.x, record.y);
            if !point.is_on_grid() {
                return Err(WorldLoadError::Invalid(format!(
                    "point {} is off the grid lattice",
                    point
                )));
            }
            let previous = world.terrain.insert(
                point,
                TerrainAtPoint {
                    height: record.height,
                    below: record.below,
                    down_right: record.down_right,
                },
            );
            if previous.is_some() {
                return Err(WorldLoadError::Invalid(format!(
                    "point {} is listed twice",
                    point
                )));
            }
        }

        for road in &self.roads {
            if road.points.len() < 2 {
                return Err(WorldLoadError::Invalid(format!(
                    "road {} has fewer than two points",
                    road.id
                )));
            }
        }

        if self.discover_all {
            world.discover_all();
        } else {
            world.discovered_points.extend(
                self.discovered
                    .iter()
                    .copied()
                    .filter(|p| world.terrain.contains_key(p)),
            );
            let discovered = world.discovered_points.clone();
            for &point in &discovered {
                for tile in [Tile::below(point), Tile::down_right(point)] {
                    let all_seen = tile.vertices().iter().all(|v| discovered.contains(v));
                    if all_seen && world.tile_exists(tile) {
                        world.mark_tile_discovered(tile);
                    }
                }
            }
        }

        world.houses = self.houses;
        world.trees = self.trees;
        world.falling_trees = self.falling_trees;
        world.crops = self.crops;
        world.signs = self.signs;
        world.stones = self.stones;
        world.animals = self.animals;
        world.ships = self.ships;
        world.workers = self.workers;
        world.flags = self.flags;
        world.roads = self.roads;
        world.border = self.border;
        world.decorations = self
            .decorations
            .into_iter()
            .map(|d| (d.point, d.decoration))
            .collect();
        world.available_construction = self
            .available_construction
            .into_iter()
            .map(|a| (a.point, a.available))
            .collect();

        log::debug!(
            "Map converted: {} points, {} discovered, {} houses, {} roads",
            world.terrain.len(),
            world.discovered_points.len(),
            world.houses.len(),
            world.roads.len()
        );

        Ok(world)
    }
}

impl WorldView {
    /// Loads a world snapshot from a JSON map file.
    pub fn load(path: &Path) -> Result<WorldView, WorldLoadError> {
        if !path.exists() {
            return Err(WorldLoadError::NotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path)?;
        let file: MapFile = serde_json::from_str(&json)?;
        let world = file.into_world()?;
        log::info!(
            "Loaded map {:?} ({} points)",
            path,
            world.terrain.len()
        );
        Ok(world)
    }
}
