//! Fog-of-war mesh generation.
//!
//! Discovered tiles along the edge of discovery get a soft gradient (dark at
//! the edge, clear inside); tiles that were never discovered are covered by a
//! fully dark triangle. The fog pass multiplies the scene by the intensity.

use crate::normals::position;
use crate::mesh::FogVertex;
use realm_data::{Point, Tile, WorldView};
use std::collections::HashSet;

/// Flat fog geometry: 3 floats of position and one intensity per vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FogMesh {
    pub coordinates: Vec<f32>,
    pub intensities: Vec<f32>,
}

impl FogMesh {
    pub fn vertex_count(&self) -> usize {
        self.intensities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intensities.is_empty()
    }

    fn clear(&mut self) {
        self.coordinates.clear();
        self.intensities.clear();
    }

    fn push_triangle(&mut self, world: &WorldView, tile: Tile, intensity: impl Fn(Point) -> f32) {
        for vertex in tile.vertices() {
            self.coordinates
                .extend_from_slice(&position(world, vertex).to_array());
            self.intensities.push(intensity(vertex));
        }
    }

    pub fn to_vertices(&self) -> Vec<FogVertex> {
        self.coordinates
            .chunks_exact(3)
            .zip(&self.intensities)
            .map(|(c, &intensity)| FogVertex {
                position: [c[0], c[1], c[2]],
                intensity,
            })
            .collect()
    }
}

/// Fog builder state. Remembers every tile it has seen discovered, so tiles
/// never go dark again once revealed.
#[derive(Debug, Clone, Default)]
pub struct FogOfWar {
    seen: HashSet<Tile>,
    mesh: FogMesh,
}

impl FogOfWar {
    pub fn mesh(&self) -> &FogMesh {
        &self.mesh
    }

    pub fn seen_tiles(&self) -> usize {
        self.seen.len()
    }

    /// Regenerates the fog mesh from the current discovery state.
    pub fn rebuild(&mut self, world: &WorldView) -> &FogMesh {
        self.mesh.clear();

        let mut edge_tiles = 0usize;
        for tile in world.discovered_tiles() {
            self.seen.insert(tile);

            let vertices = tile.vertices();
            if !vertices.iter().any(|v| is_discovery_edge(world, *v)) {
                continue;
            }
            self.mesh.push_triangle(world, tile, |v| {
                if is_discovery_edge(world, v) { 0.0 } else { 1.0 }
            });
            edge_tiles += 1;
        }

        let mut hidden_tiles = 0usize;
        for point in world.sorted_points() {
            for tile in [Tile::below(point), Tile::down_right(point)] {
                if self.seen.contains(&tile) || !world.tile_exists(tile) {
                    continue;
                }
                self.mesh.push_triangle(world, tile, |_| 0.0);
                hidden_tiles += 1;
            }
        }

        log::debug!(
            "Fog mesh: {} edge tiles, {} hidden tiles, {} vertices",
            edge_tiles,
            hidden_tiles,
            self.mesh.vertex_count()
        );
        &self.mesh
    }
}

/// A point is on the edge of discovery when its on-map neighbours are a mix
/// of discovered and undiscovered points.
pub fn is_discovery_edge(world: &WorldView, point: Point) -> bool {
    let mut discovered = false;
    let mut undiscovered = false;

    for neighbour in point.neighbors() {
        if !world.is_on_map(neighbour) {
            continue;
        }
        if world.discovered_points.contains(&neighbour) {
            discovered = true;
        } else {
            undiscovered = true;
        }
    }

    discovered && undiscovered
}
