//! Per-point lighting normals.
//!
//! Every discovered point gets the normalized sum of the face normals of the
//! (up to six) triangles that touch it. Only discovered triangles contribute,
//! so points on the edge of discovery are lit by fewer faces and undiscovered
//! terrain never changes the lighting.

use glam::Vec3;
use realm_data::{Point, Tile, WorldView};
use std::collections::HashMap;

/// Normal of a flat tile, and the fallback for points with no neighbours.
pub const UP: Vec3 = Vec3::Z;

/// Per-point normals, rebuilt wholesale on each discovery update.
#[derive(Debug, Clone, Default)]
pub struct NormalField {
    normals: HashMap<Point, Vec3>,
}

impl NormalField {
    pub fn build(world: &WorldView) -> Self {
        let mut normals = HashMap::with_capacity(world.discovered_points.len());

        for &point in &world.discovered_points {
            let sum: Vec3 = adjacent_tiles(point)
                .into_iter()
                .filter(|tile| world.tile_exists(*tile) && world.is_tile_discovered(*tile))
                .map(|tile| triangle_normal(world, tile))
                .sum();

            normals.insert(point, sum.try_normalize().unwrap_or(UP));
        }

        log::debug!("Normal field rebuilt for {} points", normals.len());
        Self { normals }
    }

    /// Normal at a point, or straight up when the point has none.
    pub fn get(&self, point: Point) -> Vec3 {
        self.normals.get(&point).copied().unwrap_or(UP)
    }

    pub fn len(&self) -> usize {
        self.normals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normals.is_empty()
    }
}

/// The six triangles sharing a corner at `point`.
fn adjacent_tiles(point: Point) -> [Tile; 6] {
    [
        Tile::below(point.up_left()),
        Tile::down_right(point.up_left()),
        Tile::below(point.up_right()),
        Tile::down_right(point),
        Tile::below(point),
        Tile::down_right(point.left()),
    ]
}

/// 3-D position of a grid point: `(x, y, height)`.
pub fn position(world: &WorldView, point: Point) -> Vec3 {
    Vec3::new(point.x as f32, point.y as f32, world.height_at(point))
}

/// Unnormalized face normal `(v1 - v0) x (v2 - v0)` in tile winding order.
pub fn triangle_normal(world: &WorldView, tile: Tile) -> Vec3 {
    let [a, b, c] = tile.vertices().map(|p| position(world, p));
    (b - a).cross(c - a)
}
