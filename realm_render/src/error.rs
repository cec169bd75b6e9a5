//! Error type shared by the asset loader, config loader and GPU backend.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid atlas: {0}")]
    InvalidAtlas(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Invalid font: {0}")]
    InvalidFont(String),
    /// A GPU-side resource needed for a layer is not available (yet).
    #[error("GPU resource missing: {0}")]
    MissingGpuResource(String),
    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("Window error: {0}")]
    Window(String),
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error(transparent)]
    World(#[from] realm_data::WorldLoadError),
}

impl RenderError {
    pub fn missing(what: impl Into<String>) -> Self {
        RenderError::MissingGpuResource(what.into())
    }
}
