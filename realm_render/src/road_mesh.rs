//! Road mesh generation.
//!
//! Each road segment becomes a thin quad (two triangles) lying on the terrain,
//! and every flag at the end of a road gets a small square junction patch.
//!
//! The road texture is split into four horizontal bands, top to bottom:
//! normal road, main road, normal junction, main junction.

use crate::mesh::MeshBuffer;
use crate::normals::{NormalField, position};
use glam::{Vec2, Vec3};
use realm_data::{Point, RoadKind, WorldView};
use std::collections::BTreeMap;

/// Half-width of a horizontal segment.
pub const HORIZONTAL_HALF_WIDTH: f32 = 0.15;
/// Corner offset along each axis for diagonal segments.
pub const DIAGONAL_OFFSET: f32 = 0.1;
pub const JUNCTION_HALF_SIZE: f32 = 0.25;

const BANDS: f32 = 4.0;

/// Texture band of a piece of road geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadPiece {
    Segment(RoadKind),
    Junction(RoadKind),
}

impl RoadPiece {
    fn band(self) -> u32 {
        match self {
            RoadPiece::Segment(RoadKind::Normal) => 0,
            RoadPiece::Segment(RoadKind::Main) => 1,
            RoadPiece::Junction(RoadKind::Normal) => 2,
            RoadPiece::Junction(RoadKind::Main) => 3,
        }
    }

    /// Twelve UV values for the two triangles of a quad, in emission order
    /// (top-left, bottom-left, top-right), (bottom-left, bottom-right, top-right).
    pub fn uvs(self) -> [f32; 12] {
        let top = self.band() as f32 / BANDS;
        let bottom = (self.band() + 1) as f32 / BANDS;
        [
            0.0, top, //
            0.0, bottom, //
            1.0, top, //
            0.0, bottom, //
            1.0, bottom, //
            1.0, top,
        ]
    }
}

/// Slope class of a segment, judged from its left end to its right end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentSlope {
    Horizontal,
    UpRight,
    DownRight,
}

impl SegmentSlope {
    pub fn classify(left: Point, right: Point) -> Self {
        match left.y.cmp(&right.y) {
            std::cmp::Ordering::Equal => SegmentSlope::Horizontal,
            std::cmp::Ordering::Less => SegmentSlope::UpRight,
            std::cmp::Ordering::Greater => SegmentSlope::DownRight,
        }
    }

    /// Offsets from each endpoint to the top and bottom corners of the quad.
    pub fn corner_offsets(self) -> (Vec2, Vec2) {
        match self {
            SegmentSlope::Horizontal => (
                Vec2::new(0.0, HORIZONTAL_HALF_WIDTH),
                Vec2::new(0.0, -HORIZONTAL_HALF_WIDTH),
            ),
            SegmentSlope::UpRight => (
                Vec2::new(-DIAGONAL_OFFSET, DIAGONAL_OFFSET),
                Vec2::new(DIAGONAL_OFFSET, -DIAGONAL_OFFSET),
            ),
            SegmentSlope::DownRight => (
                Vec2::new(DIAGONAL_OFFSET, DIAGONAL_OFFSET),
                Vec2::new(-DIAGONAL_OFFSET, -DIAGONAL_OFFSET),
            ),
        }
    }
}

/// Road geometry plus what went into it.
#[derive(Debug, Clone, Default)]
pub struct RoadMesh {
    pub buffer: MeshBuffer,
    pub segments: usize,
    pub junctions: usize,
}

impl RoadMesh {
    pub fn vertex_count(&self) -> usize {
        self.buffer.vertex_count()
    }

    pub fn build(world: &WorldView, normals: &NormalField) -> Self {
        let mut roads: Vec<_> = world.roads.iter().collect();
        roads.sort_by_key(|road| road.id);

        let mut mesh = RoadMesh::default();

        for road in &roads {
            for pair in road.points.windows(2) {
                let (left, right) = if pair[0].x <= pair[1].x {
                    (pair[0], pair[1])
                } else {
                    (pair[1], pair[0])
                };
                let (top, bottom) = SegmentSlope::classify(left, right).corner_offsets();
                let corners = [
                    Corner::offset(world, normals, left, top),
                    Corner::offset(world, normals, left, bottom),
                    Corner::offset(world, normals, right, top),
                    Corner::offset(world, normals, right, bottom),
                ];
                push_quad(&mut mesh.buffer, corners, RoadPiece::Segment(road.kind));
                mesh.segments += 1;
            }
        }

        // Flag points at either end of a road, main if any main road ends there
        let flags = world.flag_points();
        let mut junctions: BTreeMap<Point, RoadKind> = BTreeMap::new();
        for road in &roads {
            let ends = [road.points.first(), road.points.last()];
            for end in ends.into_iter().flatten() {
                if !flags.contains(end) {
                    continue;
                }
                let kind = junctions.entry(*end).or_insert(RoadKind::Normal);
                if road.kind == RoadKind::Main {
                    *kind = RoadKind::Main;
                }
            }
        }

        for (point, kind) in junctions {
            let h = JUNCTION_HALF_SIZE;
            let corners = [
                Corner::offset(world, normals, point, Vec2::new(-h, h)),
                Corner::offset(world, normals, point, Vec2::new(-h, -h)),
                Corner::offset(world, normals, point, Vec2::new(h, h)),
                Corner::offset(world, normals, point, Vec2::new(h, -h)),
            ];
            push_quad(&mut mesh.buffer, corners, RoadPiece::Junction(kind));
            mesh.junctions += 1;
        }

        log::debug!(
            "Road mesh: {} segments, {} junctions",
            mesh.segments,
            mesh.junctions
        );
        mesh
    }
}

#[derive(Debug, Clone, Copy)]
struct Corner {
    position: Vec3,
    normal: Vec3,
}

impl Corner {
    /// A quad corner displaced in the ground plane from a grid point; it keeps
    /// the point's height and normal.
    fn offset(world: &WorldView, normals: &NormalField, point: Point, delta: Vec2) -> Self {
        Self {
            position: position(world, point) + delta.extend(0.0),
            normal: normals.get(point),
        }
    }
}

/// Emits `[top_left, bottom_left, top_right, bottom_right]` as two triangles.
fn push_quad(buffer: &mut MeshBuffer, corners: [Corner; 4], piece: RoadPiece) {
    let [tl, bl, tr, br] = corners;
    let uvs = piece.uvs();
    for (i, corner) in [tl, bl, tr, bl, br, tr].into_iter().enumerate() {
        let uv = Vec2::new(uvs[i * 2], uvs[i * 2 + 1]);
        buffer.push_vertex(corner.position, corner.normal, uv);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::flat_world;
    use realm_data::{Flag, Nation, PlayerColor, Road};

    fn road(id: u32, points: &[(i32, i32)], kind: RoadKind) -> Road {
        Road {
            id,
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            kind,
        }
    }

    fn flag(id: u32, x: i32, y: i32) -> Flag {
        Flag {
            id,
            point: Point::new(x, y),
            nation: Nation::Romans,
            color: PlayerColor::Blue,
            stacked_cargo: Vec::new(),
        }
    }

    fn mesh_for(world: &WorldView) -> RoadMesh {
        RoadMesh::build(world, &NormalField::build(world))
    }

    #[test]
    fn test_horizontal_segment_corners() {
        let mut world = flat_world(8, 8);
        world.roads.push(road(1, &[(2, 2), (4, 2)], RoadKind::Normal));
        let mesh = mesh_for(&world);

        assert_eq!(mesh.vertex_count(), 6);
        let expected = [
            (0, Vec3::new(2.0, 2.15, 10.0)), // top-left
            (1, Vec3::new(2.0, 1.85, 10.0)), // bottom-left
            (2, Vec3::new(4.0, 2.15, 10.0)), // top-right
            (4, Vec3::new(4.0, 1.85, 10.0)), // bottom-right
        ];
        for (vertex, corner) in expected {
            assert!((mesh.buffer.position(vertex) - corner).length() < 1e-6);
        }
    }

    #[test]
    fn test_diagonal_segment_corners() {
        let mut world = flat_world(8, 8);
        // Listed right-to-left on purpose: left/right are picked by x
        world.roads.push(road(1, &[(3, 3), (2, 2)], RoadKind::Normal));
        world.roads.push(road(2, &[(2, 4), (3, 3)], RoadKind::Normal));
        let mesh = mesh_for(&world);

        assert_eq!(mesh.segments, 2);
        // Road 1 climbs to the right
        let tl = mesh.buffer.position(0);
        let bl = mesh.buffer.position(1);
        assert!((tl - Vec3::new(1.9, 2.1, 10.0)).length() < 1e-6);
        assert!((bl - Vec3::new(2.1, 1.9, 10.0)).length() < 1e-6);
        // Road 2 falls to the right
        let tl = mesh.buffer.position(6);
        let bl = mesh.buffer.position(7);
        assert!((tl - Vec3::new(2.1, 4.1, 10.0)).length() < 1e-6);
        assert!((bl - Vec3::new(1.9, 3.9, 10.0)).length() < 1e-6);
    }

    #[test]
    fn test_main_road_uses_its_band() {
        let mut world = flat_world(8, 8);
        world.roads.push(road(1, &[(2, 2), (4, 2)], RoadKind::Main));
        let mesh = mesh_for(&world);

        assert_eq!(
            &mesh.buffer.texture_mapping[..12],
            &RoadPiece::Segment(RoadKind::Main).uvs()
        );
        assert_eq!(mesh.buffer.uv(0).y, 0.25);
    }

    #[test]
    fn test_junctions_only_at_flagged_road_ends() {
        let mut world = flat_world(10, 8);
        world
            .roads
            .push(road(1, &[(2, 2), (4, 2), (6, 2)], RoadKind::Normal));
        world.roads.push(road(2, &[(6, 2), (7, 3)], RoadKind::Main));
        // Flag at a road end, a shared end and a mid-road point
        world.flags.push(flag(1, 2, 2));
        world.flags.push(flag(2, 6, 2));
        world.flags.push(flag(3, 4, 2));
        let mesh = mesh_for(&world);

        assert_eq!(mesh.segments, 3);
        assert_eq!(mesh.junctions, 2);
        assert_eq!(mesh.vertex_count(), 6 * 5);

        // Junctions follow segments in point order: (2,2) normal, then (6,2) main
        let first_junction = 6 * 3;
        assert_eq!(
            mesh.buffer.texture_mapping[first_junction * 2..first_junction * 2 + 12],
            RoadPiece::Junction(RoadKind::Normal).uvs()
        );
        let second = first_junction + 6;
        assert_eq!(
            mesh.buffer.texture_mapping[second * 2..second * 2 + 12],
            RoadPiece::Junction(RoadKind::Main).uvs()
        );
        assert_eq!(
            mesh.buffer.position(second),
            Vec3::new(5.75, 2.25, 10.0)
        );
    }

    #[test]
    fn test_roads_without_flags_have_no_junctions() {
        let mut world = flat_world(8, 8);
        world.roads.push(road(1, &[(2, 2), (4, 2)], RoadKind::Normal));
        assert_eq!(mesh_for(&world).junctions, 0);
    }
}
