//! Terrain records: vegetation, per-point terrain and triangular tiles.

use crate::point::Point;
use serde::{Deserialize, Serialize};

/// Vegetation covering one triangular tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vegetation {
    Savannah,
    Mountain1,
    Snow,
    Swamp,
    Desert1,
    Water,
    BuildableWater,
    Desert2,
    Meadow1,
    Meadow2,
    Meadow3,
    Mountain2,
    Mountain3,
    Mountain4,
    Steppe,
    FlowerMeadow,
    Lava1,
    Magenta,
    MountainMeadow,
    DeepWater,
    Lava2,
    Lava3,
    Lava4,
    BuildableMountain,
}

/// Broad family a vegetation belongs to. Transitions only happen between groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VegetationGroup {
    Water,
    Meadow,
    Mountain,
    Desert,
    Savannah,
    Steppe,
    Swamp,
    Snow,
    Lava,
    Magenta,
}

impl Vegetation {
    pub const ALL: [Vegetation; 24] = [
        Vegetation::Savannah,
        Vegetation::Mountain1,
        Vegetation::Snow,
        Vegetation::Swamp,
        Vegetation::Desert1,
        Vegetation::Water,
        Vegetation::BuildableWater,
        Vegetation::Desert2,
        Vegetation::Meadow1,
        Vegetation::Meadow2,
        Vegetation::Meadow3,
        Vegetation::Mountain2,
        Vegetation::Mountain3,
        Vegetation::Mountain4,
        Vegetation::Steppe,
        Vegetation::FlowerMeadow,
        Vegetation::Lava1,
        Vegetation::Magenta,
        Vegetation::MountainMeadow,
        Vegetation::DeepWater,
        Vegetation::Lava2,
        Vegetation::Lava3,
        Vegetation::Lava4,
        Vegetation::BuildableMountain,
    ];

    /// Stable index used for texture atlas placement.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn group(self) -> VegetationGroup {
        use Vegetation::*;
        match self {
            Water | BuildableWater | DeepWater => VegetationGroup::Water,
            Meadow1 | Meadow2 | Meadow3 | FlowerMeadow | MountainMeadow => VegetationGroup::Meadow,
            Mountain1 | Mountain2 | Mountain3 | Mountain4 | BuildableMountain => {
                VegetationGroup::Mountain
            }
            Desert1 | Desert2 => VegetationGroup::Desert,
            Savannah => VegetationGroup::Savannah,
            Steppe => VegetationGroup::Steppe,
            Swamp => VegetationGroup::Swamp,
            Snow => VegetationGroup::Snow,
            Lava1 | Lava2 | Lava3 | Lava4 => VegetationGroup::Lava,
            Magenta => VegetationGroup::Magenta,
        }
    }
}

/// Terrain stored per grid point: its height plus the vegetation of the two
/// triangles hanging off it (below and down-right).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainAtPoint {
    pub height: f32,
    pub below: Vegetation,
    pub down_right: Vegetation,
}

/// Which of the two triangles anchored at a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TileOrientation {
    /// `apex, down_left(apex), down_right(apex)`
    Below,
    /// `apex, down_right(apex), right(apex)`
    DownRight,
}

/// A triangular terrain face identified by its upper-left apex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tile {
    pub apex: Point,
    pub orientation: TileOrientation,
}

impl Tile {
    pub const fn below(apex: Point) -> Self {
        Self {
            apex,
            orientation: TileOrientation::Below,
        }
    }

    pub const fn down_right(apex: Point) -> Self {
        Self {
            apex,
            orientation: TileOrientation::DownRight,
        }
    }

    /// Triangle corners in winding order. The cross product of
    /// `(v1 - v0) x (v2 - v0)` points up on flat ground for both orientations.
    pub const fn vertices(self) -> [Point; 3] {
        let p = self.apex;
        match self.orientation {
            TileOrientation::Below => [p, p.down_left(), p.down_right()],
            TileOrientation::DownRight => [p, p.down_right(), p.right()],
        }
    }

    /// Vegetation of this tile as recorded at its apex.
    pub fn vegetation(self, terrain: &TerrainAtPoint) -> Vegetation {
        match self.orientation {
            TileOrientation::Below => terrain.below,
            TileOrientation::DownRight => terrain.down_right,
        }
    }
}
