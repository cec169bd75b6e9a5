//! Realm rendering core.
//!
//! This crate turns a `realm_data::WorldView` into draw calls:
//! - Coordinate transform and camera (`coords`, `camera`)
//! - Per-discovery meshes: normals, terrain, roads, fog (`normals`,
//!   `terrain_mesh`, `road_mesh`, `fog`)
//! - Per-frame sprite collection and layer compositing (`draw_list`,
//!   `compositor`)
//! - The wgpu backend and house titles (`render`, `text`)
//! - The state bundle tying it together (`context`)

pub mod animation;
pub mod assets;
pub mod camera;
pub mod compositor;
pub mod config;
pub mod context;
pub mod coords;
pub mod demo;
pub mod diagnostics;
pub mod draw_list;
pub mod error;
pub mod fog;
pub mod mesh;
pub mod normals;
pub mod render;
pub mod road_mesh;
pub mod terrain_mesh;
pub mod terrain_textures;
pub mod testing;
pub mod text;

pub use context::RenderContext;
pub use error::RenderError;
