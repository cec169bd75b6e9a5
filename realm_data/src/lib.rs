//! World model for the realm renderer.
//!
//! This crate holds everything the renderer reads but never owns:
//! - Grid points and neighbourhoods (`point`)
//! - Terrain and vegetation (`terrain`)
//! - Entity records reported by the game-state monitor (`entities`)
//! - The per-frame world snapshot (`world`) and its JSON loader (`map_file`)

pub mod entities;
pub mod map_file;
pub mod point;
pub mod terrain;
pub mod world;

pub use entities::*;
pub use map_file::{MapFile, WorldLoadError};
pub use point::{Direction, Point};
pub use terrain::{TerrainAtPoint, Tile, TileOrientation, Vegetation, VegetationGroup};
pub use world::WorldView;
