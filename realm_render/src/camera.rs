//! Camera system for pan/zoom over the game map.
//!
//! Operates in screen pixels: `pan` is the translation applied after scaling
//! game coordinates, `scale` is pixels per game unit.

use crate::config::RenderConfig;
use crate::coords::{ViewTransform, game_to_screen, screen_to_game};
use glam::Vec2;
use realm_data::Point;

/// Camera state for viewing the map.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Screen-space translation in pixels.
    pub pan: Vec2,
    /// Pixels per game unit.
    pub scale: f32,
    /// Viewport size in pixels.
    pub viewport: Vec2,
    min_scale: f32,
    max_scale: f32,
    height_adjust: f32,
    standard_height: f32,
    default_scale: f32,
}

impl Camera {
    /// Creates a camera at the configured initial zoom with no pan.
    pub fn new(config: &RenderConfig, viewport_width: f32, viewport_height: f32) -> Self {
        Self {
            pan: Vec2::ZERO,
            scale: config.initial_scale,
            viewport: Vec2::new(viewport_width, viewport_height),
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            height_adjust: config.height_adjust,
            standard_height: config.standard_height,
            default_scale: config.default_scale,
        }
    }

    /// Parameters for the coordinate transform this frame.
    pub fn transform(&self) -> ViewTransform {
        ViewTransform {
            pan: self.pan,
            scale: self.scale,
            viewport: self.viewport,
            height_adjust: self.height_adjust,
            standard_height: self.standard_height,
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport = Vec2::new(width, height);
    }

    /// Pans by a screen pixel delta (positive dy drags the map down).
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan.x += dx;
        // Screen y is subtracted in the projection
        self.pan.y -= dy;
    }

    /// Zooms towards a screen pixel pivot, keeping the game point under it fixed.
    pub fn zoom_at(&mut self, factor: f32, pivot: Vec2) {
        if self.viewport.x == 0.0 || self.viewport.y == 0.0 {
            return;
        }

        // Game position under cursor before zoom
        let anchor = screen_to_game(pivot, &self.transform());

        self.scale = (self.scale * factor).clamp(self.min_scale, self.max_scale);

        self.pan.x = pivot.x - anchor.x * self.scale;
        self.pan.y = self.viewport.y - pivot.y - anchor.y * self.scale;
    }

    /// Centers the view on a game point at standard height.
    pub fn center_on(&mut self, point: Point) {
        let current = game_to_screen(
            Vec2::new(point.x as f32, point.y as f32),
            self.standard_height,
            &self.transform(),
        );
        let delta = self.viewport / 2.0 - current;
        self.pan_by(delta.x, delta.y);
    }

    /// Generates uniform data for the shaders.
    pub fn to_uniform(&self, light_direction: [f32; 3]) -> CameraUniform {
        let light = glam::Vec3::from(light_direction).normalize_or(glam::Vec3::Z);

        CameraUniform {
            pan: self.pan.to_array(),
            screen_size: self.viewport.to_array(),
            scale: self.scale,
            height_adjust: self.height_adjust,
            standard_height: self.standard_height,
            sprite_scale: self.scale / self.default_scale,
            light_direction: [light.x, light.y, light.z, 0.0],
        }
    }
}

/// Uniform data shared by every pipeline.
///
/// Layout: 12 × f32 = 48 bytes (16-byte aligned for wgpu).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub pan: [f32; 2],
    pub screen_size: [f32; 2],
    pub scale: f32,
    pub height_adjust: f32,
    pub standard_height: f32,
    /// `scale / default_scale`: sprites are pixel-exact when this is 1.0.
    pub sprite_scale: f32,
    pub light_direction: [f32; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self {
            pan: [0.0, 0.0],
            screen_size: [1.0, 1.0],
            scale: 1.0,
            height_adjust: 1.0,
            standard_height: 0.0,
            sprite_scale: 1.0,
            light_direction: [0.0, 0.0, 1.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_uniform_size() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 48);
        assert_eq!(std::mem::size_of::<CameraUniform>() % 16, 0);
    }

    #[test]
    fn test_zoom_keeps_pivot_fixed() {
        let config = RenderConfig::default();
        let mut camera = Camera::new(&config, 800.0, 600.0);
        camera.pan_by(37.0, -12.0);

        let pivot = Vec2::new(310.0, 220.0);
        let before = screen_to_game(pivot, &camera.transform());
        camera.zoom_at(1.5, pivot);
        let after = screen_to_game(pivot, &camera.transform());

        assert!((before - after).length() < 1e-3);
        assert!((camera.scale - config.initial_scale * 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_zoom_clamps() {
        let config = RenderConfig::default();
        let mut camera = Camera::new(&config, 800.0, 600.0);
        camera.zoom_at(1000.0, Vec2::new(400.0, 300.0));
        assert_eq!(camera.scale, config.max_scale);
        camera.zoom_at(0.0001, Vec2::new(400.0, 300.0));
        assert_eq!(camera.scale, config.min_scale);
    }

    #[test]
    fn test_center_on_point() {
        let config = RenderConfig::default();
        let mut camera = Camera::new(&config, 800.0, 600.0);
        camera.center_on(Point::new(20, 10));
        let center = screen_to_game(Vec2::new(400.0, 300.0), &camera.transform());
        assert!((center - Vec2::new(20.0, 10.0)).length() < 1e-3);
    }

    #[test]
    fn test_sprite_scale_is_one_at_default_zoom() {
        let config = RenderConfig::default();
        let camera = Camera::new(&config, 800.0, 600.0);
        let uniform = camera.to_uniform(config.light_direction);
        assert_eq!(uniform.sprite_scale, 1.0);
        let light = glam::Vec3::from_slice(&uniform.light_direction[..3]);
        assert!((light.length() - 1.0).abs() < 1e-5);
    }
}
