//! Terrain texture atlas layout and the vegetation overlap rule.
//!
//! The terrain atlas is an 8×8 grid of cells. Vegetation `i` has its base
//! cell at column `i % 8`, row `i / 8`; its transition cell sits at the same
//! column, four rows further down.

use glam::Vec2;
use realm_data::{TileOrientation, Vegetation, VegetationGroup};

pub const ATLAS_CELLS: u32 = 8;
pub const TRANSITION_ROW_OFFSET: u32 = 4;

const CELL: f32 = 1.0 / ATLAS_CELLS as f32;

/// Upper-left UV corner of a vegetation's base cell.
fn base_cell(vegetation: Vegetation) -> Vec2 {
    let i = vegetation.index() as u32;
    Vec2::new((i % ATLAS_CELLS) as f32, (i / ATLAS_CELLS) as f32) * CELL
}

fn transition_cell(vegetation: Vegetation) -> Vec2 {
    base_cell(vegetation) + Vec2::new(0.0, TRANSITION_ROW_OFFSET as f32 * CELL)
}

/// UVs for the three vertices of a base tile, in tile vertex order.
pub fn tile_uvs(vegetation: Vegetation, orientation: TileOrientation) -> [Vec2; 3] {
    let c = base_cell(vegetation);
    match orientation {
        // apex on top, two corners along the bottom edge
        TileOrientation::Below => [
            c + Vec2::new(CELL / 2.0, 0.0),
            c + Vec2::new(0.0, CELL),
            c + Vec2::new(CELL, CELL),
        ],
        // two corners along the top edge, point at the bottom
        TileOrientation::DownRight => [
            c,
            c + Vec2::new(CELL / 2.0, CELL),
            c + Vec2::new(CELL, 0.0),
        ],
    }
}

/// UVs for a transition triangle: both shared-edge endpoints, then the tip.
pub fn transition_uvs(vegetation: Vegetation) -> [Vec2; 3] {
    let c = transition_cell(vegetation);
    [
        c,
        c + Vec2::new(CELL, 0.0),
        c + Vec2::new(CELL / 2.0, CELL),
    ]
}

/// Drawing priority of a vegetation group. Higher ranks bleed over lower ones.
pub fn group_rank(group: VegetationGroup) -> u8 {
    match group {
        VegetationGroup::Meadow => 6,
        VegetationGroup::Savannah | VegetationGroup::Steppe => 5,
        VegetationGroup::Swamp | VegetationGroup::Desert => 4,
        VegetationGroup::Mountain => 3,
        VegetationGroup::Snow | VegetationGroup::Lava => 2,
        VegetationGroup::Water => 1,
        VegetationGroup::Magenta => 0,
    }
}

/// Whether `over` draws a transition onto a neighbouring tile of `under`.
pub fn overlaps(over: Vegetation, under: Vegetation) -> bool {
    let (a, b) = (over.group(), under.group());
    a != b && group_rank(a) > group_rank(b)
}
