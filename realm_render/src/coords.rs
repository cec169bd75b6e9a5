//! Game space ↔ screen space conversion.
//!
//! Game space has y pointing up; screen space is pixels with y pointing down.
//! Terrain height shifts a point along game y before projection, which gives
//! the map a cheap pseudo-3D parallax: high ground appears further away.

use glam::Vec2;
use realm_data::{Point, WorldView};

/// Parameters of the game → screen mapping for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    /// Screen-space translation in pixels.
    pub pan: Vec2,
    /// Pixels per game unit.
    pub scale: f32,
    /// Viewport size in pixels (width, height).
    pub viewport: Vec2,
    pub height_adjust: f32,
    pub standard_height: f32,
}

/// Projects a game position at the given terrain height to screen pixels.
pub fn game_to_screen(game: Vec2, height: f32, view: &ViewTransform) -> Vec2 {
    let adjusted_y = game.y + (height - view.standard_height) / view.height_adjust;

    Vec2::new(
        game.x * view.scale + view.pan.x,
        view.viewport.y - adjusted_y * view.scale - view.pan.y,
    )
}

/// Inverse of [`game_to_screen`], ignoring height.
///
/// The parallax shift is not undone here, so picking near tall terrain is off
/// by up to `(height - standard) / height_adjust` rows. Callers that need the
/// correction apply it themselves (see [`pick_point`]).
pub fn screen_to_game(screen: Vec2, view: &ViewTransform) -> Vec2 {
    Vec2::new(
        (screen.x - view.pan.x) / view.scale,
        (view.viewport.y - screen.y - view.pan.y) / view.scale,
    )
}

/// Game-space bounding rectangle of the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl GameRect {
    /// Whether a point lies inside the rectangle grown by `margin` on every side.
    pub fn contains(&self, point: Point, margin: f32) -> bool {
        let x = point.x as f32;
        let y = point.y as f32;
        x >= self.min.x - margin
            && x <= self.max.x + margin
            && y >= self.min.y - margin
            && y <= self.max.y + margin
    }
}

/// Maps the four viewport corners to game space and takes their bounds.
pub fn visible_game_rect(view: &ViewTransform) -> GameRect {
    let corners = [
        Vec2::ZERO,
        Vec2::new(view.viewport.x, 0.0),
        Vec2::new(0.0, view.viewport.y),
        view.viewport,
    ]
    .map(|corner| screen_to_game(corner, view));

    let min = corners.iter().copied().fold(Vec2::splat(f32::MAX), Vec2::min);
    let max = corners.iter().copied().fold(Vec2::splat(f32::MIN), Vec2::max);

    GameRect { min, max }
}

/// Finds the grid point under a screen position.
///
/// Snaps the height-free inverse to the lattice, then re-snaps once after
/// undoing the parallax shift of the first candidate's height. Returns `None`
/// when the result is off the map.
pub fn pick_point(screen: Vec2, view: &ViewTransform, world: &WorldView) -> Option<Point> {
    let game = screen_to_game(screen, view);
    let candidate = Point::nearest(game.x, game.y);

    let shift = (world.height_at(candidate) - view.standard_height) / view.height_adjust;
    let corrected = Point::nearest(game.x, game.y - shift);

    if world.is_on_map(corrected) {
        Some(corrected)
    } else if world.is_on_map(candidate) {
        Some(candidate)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use realm_data::{TerrainAtPoint, Vegetation};

    fn view() -> ViewTransform {
        ViewTransform {
            pan: Vec2::new(120.0, -40.0),
            scale: 35.0,
            viewport: Vec2::new(800.0, 600.0),
            height_adjust: 10.0,
            standard_height: 10.0,
        }
    }

    #[test]
    fn test_y_axis_is_flipped() {
        let v = view();
        let low = game_to_screen(Vec2::new(0.0, 0.0), 10.0, &v);
        let high = game_to_screen(Vec2::new(0.0, 4.0), 10.0, &v);
        assert!(high.y < low.y, "larger game y should be higher on screen");
        assert_eq!(low.y, 600.0 + 40.0);
    }

    #[test]
    fn test_taller_terrain_shifts_away() {
        let v = view();
        let standard = game_to_screen(Vec2::new(2.0, 2.0), 10.0, &v);
        let tall = game_to_screen(Vec2::new(2.0, 2.0), 20.0, &v);
        assert_eq!(standard.x, tall.x);
        // +10 height / adjust 10 = one game row further up
        assert!((standard.y - tall.y - v.scale).abs() < 1e-3);
    }

    #[test]
    fn test_visible_rect_covers_viewport() {
        let v = view();
        let rect = visible_game_rect(&v);
        let center = screen_to_game(v.viewport / 2.0, &v);
        assert!(rect.min.x < center.x && center.x < rect.max.x);
        assert!(rect.min.y < center.y && center.y < rect.max.y);
        assert!(rect.contains(Point::new(rect.max.x as i32 + 1, center.y as i32), 2.0));
        assert!(!rect.contains(Point::new(rect.max.x as i32 + 5, center.y as i32), 2.0));
    }

    #[test]
    fn test_pick_point_corrects_for_height() {
        let mut world = WorldView::default();
        for y in 0..8 {
            for x in 0..8 {
                if (x + y) % 2 == 0 {
                    world.terrain.insert(
                        Point::new(x, y),
                        TerrainAtPoint {
                            height: 10.0,
                            below: Vegetation::Meadow1,
                            down_right: Vegetation::Meadow1,
                        },
                    );
                }
            }
        }
        let v = view();
        let target = Point::new(4, 4);
        let screen = game_to_screen(Vec2::new(4.0, 4.0), 10.0, &v);
        assert_eq!(pick_point(screen, &v, &world), Some(target));

        // Raise the ground: the point is drawn one row higher, picking follows it
        world.terrain.get_mut(&target).unwrap().height = 20.0;
        world.terrain.get_mut(&Point::new(3, 5)).unwrap().height = 20.0;
        world.terrain.get_mut(&Point::new(5, 5)).unwrap().height = 20.0;
        let raised = game_to_screen(Vec2::new(4.0, 4.0), 20.0, &v);
        assert_eq!(pick_point(raised, &v, &world), Some(target));

        assert_eq!(pick_point(Vec2::new(-5000.0, 0.0), &v, &world), None);
    }

    proptest! {
        #[test]
        fn prop_round_trip_at_standard_height(
            x in -500.0f32..500.0,
            y in -500.0f32..500.0,
            scale in 5.0f32..150.0,
            pan_x in -2000.0f32..2000.0,
            pan_y in -2000.0f32..2000.0,
        ) {
            let v = ViewTransform {
                pan: Vec2::new(pan_x, pan_y),
                scale,
                viewport: Vec2::new(1280.0, 720.0),
                height_adjust: 10.0,
                standard_height: 10.0,
            };
            let p = Vec2::new(x, y);
            let back = screen_to_game(game_to_screen(p, v.standard_height, &v), &v);
            prop_assert!((back - p).abs().max_element() < 1e-2);
        }
    }
}
