//! Terrain mesh generation.
//!
//! One textured triangle per discovered tile, followed by transition
//! triangles where a tile's vegetation bleeds into a lower-ranked neighbour.
//! Base triangles are drawn opaque; transitions are alpha-blended on top.

use crate::mesh::MeshBuffer;
use crate::normals::{NormalField, position};
use crate::terrain_textures::{overlaps, tile_uvs, transition_uvs};
use glam::Vec3;
use realm_data::{Point, Tile, TileOrientation, WorldView};

/// How far a transition reaches into the neighbour across a horizontal edge.
pub const HORIZONTAL_TRANSITION_REACH: f32 = 0.7;
/// Reach across the diagonal edges.
pub const DIAGONAL_TRANSITION_REACH: f32 = 0.4;

/// Terrain geometry: base tiles first, transitions after `base_vertex_count`.
#[derive(Debug, Clone, Default)]
pub struct TerrainMesh {
    pub buffer: MeshBuffer,
    pub base_vertex_count: usize,
}

impl TerrainMesh {
    pub fn vertex_count(&self) -> usize {
        self.buffer.vertex_count()
    }

    pub fn transition_vertex_count(&self) -> usize {
        self.vertex_count() - self.base_vertex_count
    }

    pub fn build(world: &WorldView, normals: &NormalField) -> Self {
        let tiles = world.discovered_tiles();
        let mut buffer = MeshBuffer::default();

        for &tile in &tiles {
            let Some(vegetation) = world.vegetation(tile) else {
                continue;
            };
            let uvs = tile_uvs(vegetation, tile.orientation);
            for (vertex, uv) in tile.vertices().into_iter().zip(uvs) {
                buffer.push_vertex(position(world, vertex), normals.get(vertex), uv);
            }
        }

        let base_vertex_count = buffer.vertex_count();

        let mut transitions = 0usize;
        for &tile in &tiles {
            let Some(vegetation) = world.vegetation(tile) else {
                continue;
            };
            for edge in shared_edges(tile) {
                if !world.tile_exists(edge.neighbour) || !world.is_tile_discovered(edge.neighbour) {
                    continue;
                }
                let Some(other) = world.vegetation(edge.neighbour) else {
                    continue;
                };
                if !overlaps(vegetation, other) {
                    continue;
                }
                push_transition(&mut buffer, world, normals, &edge, transition_uvs(vegetation));
                transitions += 1;
            }
        }

        log::debug!(
            "Terrain mesh: {} tiles, {} transitions, {} vertices",
            tiles.len(),
            transitions,
            buffer.vertex_count()
        );

        Self {
            buffer,
            base_vertex_count,
        }
    }
}

/// An edge a tile shares with one neighbouring tile.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SharedEdge {
    neighbour: Tile,
    a: Point,
    b: Point,
    /// Corner of the neighbour opposite the shared edge.
    far: Point,
    reach: f32,
}

fn shared_edges(tile: Tile) -> [SharedEdge; 3] {
    let p = tile.apex;
    match tile.orientation {
        TileOrientation::Below => [
            SharedEdge {
                neighbour: Tile::down_right(p.down_left()),
                a: p.down_left(),
                b: p.down_right(),
                far: p.down_left().down_right(),
                reach: HORIZONTAL_TRANSITION_REACH,
            },
            SharedEdge {
                neighbour: Tile::down_right(p),
                a: p,
                b: p.down_right(),
                far: p.right(),
                reach: DIAGONAL_TRANSITION_REACH,
            },
            SharedEdge {
                neighbour: Tile::down_right(p.left()),
                a: p.down_left(),
                b: p,
                far: p.left(),
                reach: DIAGONAL_TRANSITION_REACH,
            },
        ],
        TileOrientation::DownRight => [
            SharedEdge {
                neighbour: Tile::below(p.up_right()),
                a: p,
                b: p.right(),
                far: p.up_right(),
                reach: HORIZONTAL_TRANSITION_REACH,
            },
            SharedEdge {
                neighbour: Tile::below(p),
                a: p,
                b: p.down_right(),
                far: p.down_left(),
                reach: DIAGONAL_TRANSITION_REACH,
            },
            SharedEdge {
                neighbour: Tile::below(p.right()),
                a: p.down_right(),
                b: p.right(),
                far: p.right().down_right(),
                reach: DIAGONAL_TRANSITION_REACH,
            },
        ],
    }
}

fn push_transition(
    buffer: &mut MeshBuffer,
    world: &WorldView,
    normals: &NormalField,
    edge: &SharedEdge,
    uvs: [glam::Vec2; 3],
) {
    let (pa, pb, pf) = (
        position(world, edge.a),
        position(world, edge.b),
        position(world, edge.far),
    );
    let (na, nb, nf) = (normals.get(edge.a), normals.get(edge.b), normals.get(edge.far));

    let mid = (pa + pb) / 2.0;
    let tip = mid + edge.reach * (pf - mid);

    let mid_normal = (na + nb) / 2.0;
    let tip_normal = (mid_normal + edge.reach * (nf - mid_normal))
        .try_normalize()
        .unwrap_or(Vec3::Z);

    buffer.push_vertex(pa, na, uvs[0]);
    buffer.push_vertex(pb, nb, uvs[1]);
    buffer.push_vertex(tip, tip_normal, uvs[2]);
}
