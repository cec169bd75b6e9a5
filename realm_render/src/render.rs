//! wgpu implementation of [`RenderBackend`].
//!
//! Draw calls made during a frame are queued and encoded in `end_frame`,
//! inside a single scene pass followed by the title overlay pass.

use crate::assets::{AtlasImage, TextureHandle};
use crate::camera::CameraUniform;
use crate::compositor::{ImageDraw, ImageLayer, MeshData, MeshLayer, RenderBackend, TitleDraw};
use crate::error::RenderError;
use crate::mesh::{FogVertex, MeshVertex};
use crate::text::{GlyphAtlas, TITLE_COLOR, TextQuad, TitleRenderer};
use glam::Vec2;
use image::RgbaImage;
use std::collections::HashMap;
use std::ops::Range;
use wgpu::util::DeviceExt;

/// Clear color behind the map.
const BACKGROUND: wgpu::Color = wgpu::Color::BLACK;

/// Sprite instances the instance buffer starts with; it grows on demand.
const INITIAL_SPRITE_CAPACITY: usize = 4096;

/// Abstraction over render output destination.
///
/// Used by test harnesses to render to offscreen textures for verification.
pub trait RenderTarget {
    /// Get a texture view to render into and the current dimensions.
    fn get_view(&mut self) -> Result<(wgpu::TextureView, u32, u32), RenderError>;

    /// Present the frame (no-op for offscreen targets).
    fn present(&mut self);

    fn format(&self) -> wgpu::TextureFormat;
}

/// Window surface.
pub struct SurfaceTarget {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    frame: Option<wgpu::SurfaceTexture>,
}

impl SurfaceTarget {
    pub fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> Self {
        let caps = surface.get_capabilities(adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .unwrap_or(wgpu::TextureFormat::Bgra8UnormSrgb);
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(device, &config);

        Self {
            surface,
            config,
            frame: None,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(device, &self.config);
        }
    }

    pub fn reconfigure(&self, device: &wgpu::Device) {
        self.surface.configure(device, &self.config);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }
}

impl RenderTarget for SurfaceTarget {
    fn get_view(&mut self) -> Result<(wgpu::TextureView, u32, u32), RenderError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.frame = Some(frame);
        Ok((view, self.config.width, self.config.height))
    }

    fn present(&mut self) {
        if let Some(frame) = self.frame.take() {
            frame.present();
        }
    }

    fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }
}

/// Texture target that can be read back, for tests and screenshots.
pub struct OffscreenTarget {
    texture: wgpu::Texture,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
}

impl OffscreenTarget {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        Self {
            texture,
            width,
            height,
            format,
        }
    }

    /// Copies the target back to the CPU.
    pub fn read_pixels(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<RgbaImage, RenderError> {
        let unpadded = 4 * self.width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Offscreen Readback"),
            size: (padded * self.height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(Some(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| RenderError::missing("readback callback dropped"))?
            .map_err(|e| RenderError::missing(format!("readback mapping failed: {}", e)))?;

        let mut pixels = Vec::with_capacity((unpadded * self.height) as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        buffer.unmap();

        RgbaImage::from_raw(self.width, self.height, pixels)
            .ok_or_else(|| RenderError::missing("readback size mismatch"))
    }
}

impl RenderTarget for OffscreenTarget {
    fn get_view(&mut self) -> Result<(wgpu::TextureView, u32, u32), RenderError> {
        let view = self
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Ok((view, self.width, self.height))
    }

    fn present(&mut self) {}

    fn format(&self) -> wgpu::TextureFormat {
        self.format
    }
}

/// Per-sprite instance data. The quad itself is built in `vs_sprite`.
///
/// Layout: 9 × f32 = 36 bytes
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpriteInstance {
    pub game_point: [f32; 2],
    pub height: f32,
    /// Anchor inside the sprite, in source pixels.
    pub offset: [f32; 2],
    pub source_origin: [f32; 2],
    pub source_size: [f32; 2],
}

impl SpriteInstance {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
            0 => Float32x2,
            1 => Float32,
            2 => Float32x2,
            3 => Float32x2,
            4 => Float32x2
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBUTES,
        }
    }
}

impl From<&ImageDraw> for SpriteInstance {
    fn from(draw: &ImageDraw) -> Self {
        let frame = draw.frame;
        Self {
            game_point: draw.game_point.to_array(),
            height: draw.height,
            offset: [frame.offset_x as f32, frame.offset_y as f32],
            source_origin: [frame.source_x as f32, frame.source_y as f32],
            source_size: [frame.width as f32, frame.height as f32],
        }
    }
}

/// Splits consecutive items into runs sharing a texture, numbering instances
/// from `first`. Order is preserved.
pub fn batch_by_texture(items: &[ImageDraw], first: u32) -> Vec<(TextureHandle, Range<u32>)> {
    let mut batches = Vec::new();
    let mut start = first;
    for run in items.chunk_by(|a, b| a.frame.texture == b.frame.texture) {
        let end = start + run.len() as u32;
        batches.push((run[0].frame.texture, start..end));
        start = end;
    }
    batches
}

/// Darkens the destination by the source alpha: `dst * (1 - src.a)`.
const DARKEN: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Zero,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Zero,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

struct Pipelines {
    terrain: wgpu::RenderPipeline,
    transitions: wgpu::RenderPipeline,
    roads: wgpu::RenderPipeline,
    fog: wgpu::RenderPipeline,
    sprites: wgpu::RenderPipeline,
    shadows: wgpu::RenderPipeline,
}

struct PipelineBuilder<'a> {
    device: &'a wgpu::Device,
    shader: &'a wgpu::ShaderModule,
    format: wgpu::TextureFormat,
}

impl PipelineBuilder<'_> {
    fn build(
        &self,
        label: &str,
        layout: &wgpu::PipelineLayout,
        entry_points: (&str, &str),
        buffer: wgpu::VertexBufferLayout<'static>,
        blend: wgpu::BlendState,
    ) -> wgpu::RenderPipeline {
        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: self.shader,
                    entry_point: entry_points.0,
                    buffers: &[buffer],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: self.shader,
                    entry_point: entry_points.1,
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.format,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                // Layer order alone decides visibility
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            })
    }
}

struct GpuTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

struct GpuMesh {
    /// `None` for an empty mesh; wgpu has no empty buffer slices.
    buffer: Option<wgpu::Buffer>,
    vertex_count: u32,
    /// Opaque vertices at the front of the buffer; the rest are blended.
    opaque_count: u32,
}

enum DrawOp {
    Mesh(MeshLayer),
    Sprites {
        shadow: bool,
        texture: TextureHandle,
        instances: Range<u32>,
    },
}

#[derive(Default)]
struct FrameQueue {
    ops: Vec<DrawOp>,
    sprites: Vec<SpriteInstance>,
    titles: Vec<TextQuad>,
}

/// GPU backend for one render target.
pub struct WgpuBackend<T: RenderTarget> {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target: T,
    pipelines: Pipelines,
    camera: CameraUniform,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    textures: HashMap<TextureHandle, GpuTexture>,
    terrain_texture: TextureHandle,
    road_texture: TextureHandle,
    meshes: HashMap<MeshLayer, GpuMesh>,
    sprite_buffer: wgpu::Buffer,
    sprite_capacity: usize,
    titles: Option<TitleRenderer>,
    frame: FrameQueue,
    released: bool,
}

impl<T: RenderTarget> WgpuBackend<T> {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        target: T,
        images: &[AtlasImage],
        terrain_texture: TextureHandle,
        road_texture: TextureHandle,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let camera = CameraUniform::default();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::bytes_of(&camera),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        // Vertex stage reads the texture size for sprite UVs
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let textured_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Textured Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let fog_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Fog Pipeline Layout"),
            bind_group_layouts: &[&camera_layout],
            push_constant_ranges: &[],
        });

        let builder = PipelineBuilder {
            device: &device,
            shader: &shader,
            format: target.format(),
        };
        let alpha = wgpu::BlendState::ALPHA_BLENDING;
        let pipelines = Pipelines {
            terrain: builder.build(
                "Terrain Pipeline",
                &textured_layout,
                ("vs_mesh", "fs_mesh"),
                MeshVertex::desc(),
                wgpu::BlendState::REPLACE,
            ),
            transitions: builder.build(
                "Terrain Transition Pipeline",
                &textured_layout,
                ("vs_mesh", "fs_mesh"),
                MeshVertex::desc(),
                alpha,
            ),
            roads: builder.build(
                "Road Pipeline",
                &textured_layout,
                ("vs_mesh", "fs_mesh"),
                MeshVertex::desc(),
                alpha,
            ),
            fog: builder.build(
                "Fog Pipeline",
                &fog_layout,
                ("vs_fog", "fs_fog"),
                FogVertex::desc(),
                DARKEN,
            ),
            sprites: builder.build(
                "Sprite Pipeline",
                &textured_layout,
                ("vs_sprite", "fs_sprite"),
                SpriteInstance::desc(),
                alpha,
            ),
            shadows: builder.build(
                "Shadow Pipeline",
                &textured_layout,
                ("vs_sprite", "fs_shadow"),
                SpriteInstance::desc(),
                DARKEN,
            ),
        };

        // Pixel art: no filtering
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Atlas Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let sprite_buffer = create_sprite_buffer(&device, INITIAL_SPRITE_CAPACITY);

        let mut backend = Self {
            device,
            queue,
            target,
            pipelines,
            camera,
            camera_buffer,
            camera_bind_group,
            texture_layout,
            sampler,
            textures: HashMap::new(),
            terrain_texture,
            road_texture,
            meshes: HashMap::new(),
            sprite_buffer,
            sprite_capacity: INITIAL_SPRITE_CAPACITY,
            titles: None,
            frame: FrameQueue::default(),
            released: false,
        };
        for image in images {
            backend.upload_texture(image);
        }
        log::info!("GPU backend ready with {} textures", backend.textures.len());
        backend
    }

    /// Enables the house title overlay.
    pub fn with_titles(mut self, glyphs: GlyphAtlas) -> Self {
        self.titles = Some(TitleRenderer::new(
            &self.device,
            &self.queue,
            self.target.format(),
            glyphs,
        ));
        self
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    fn upload_texture(&mut self, image: &AtlasImage) {
        let size = wgpu::Extent3d {
            width: image.image.width(),
            height: image.image.height(),
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&image.name),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.image.as_raw(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.width),
                rows_per_image: Some(size.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&image.name),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        log::debug!(
            "Uploaded texture '{}' ({}x{})",
            image.name,
            size.width,
            size.height
        );
        self.textures.insert(
            image.handle,
            GpuTexture {
                _texture: texture,
                bind_group,
            },
        );
    }

    fn check_live(&self) -> Result<(), RenderError> {
        if self.released {
            return Err(RenderError::missing("backend released"));
        }
        Ok(())
    }

    fn texture(&self, handle: TextureHandle) -> Result<&GpuTexture, RenderError> {
        self.textures
            .get(&handle)
            .ok_or_else(|| RenderError::missing(format!("texture {:?}", handle)))
    }

    fn mesh_texture(&self, layer: MeshLayer) -> Option<TextureHandle> {
        match layer {
            MeshLayer::Terrain => Some(self.terrain_texture),
            MeshLayer::Roads => Some(self.road_texture),
            MeshLayer::FogOfWar => None,
        }
    }

    fn ensure_sprite_capacity(&mut self, needed: usize) {
        if needed <= self.sprite_capacity {
            return;
        }
        let capacity = needed.next_power_of_two();
        log::debug!("Growing sprite buffer to {} instances", capacity);
        self.sprite_buffer = create_sprite_buffer(&self.device, capacity);
        self.sprite_capacity = capacity;
    }

    fn encode<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, op: &DrawOp) {
        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        match op {
            DrawOp::Mesh(layer) => {
                let Some(mesh) = self.meshes.get(layer) else {
                    return;
                };
                let Some(buffer) = &mesh.buffer else {
                    return;
                };
                if let Some(handle) = self.mesh_texture(*layer) {
                    let Some(texture) = self.textures.get(&handle) else {
                        return;
                    };
                    pass.set_bind_group(1, &texture.bind_group, &[]);
                }
                pass.set_vertex_buffer(0, buffer.slice(..));
                match layer {
                    MeshLayer::Terrain => {
                        pass.set_pipeline(&self.pipelines.terrain);
                        pass.draw(0..mesh.opaque_count, 0..1);
                        if mesh.vertex_count > mesh.opaque_count {
                            pass.set_pipeline(&self.pipelines.transitions);
                            pass.draw(mesh.opaque_count..mesh.vertex_count, 0..1);
                        }
                    }
                    MeshLayer::Roads => {
                        pass.set_pipeline(&self.pipelines.roads);
                        pass.draw(0..mesh.vertex_count, 0..1);
                    }
                    MeshLayer::FogOfWar => {
                        pass.set_pipeline(&self.pipelines.fog);
                        pass.draw(0..mesh.vertex_count, 0..1);
                    }
                }
            }
            DrawOp::Sprites {
                shadow,
                texture,
                instances,
            } => {
                let Some(texture) = self.textures.get(texture) else {
                    return;
                };
                let pipeline = if *shadow {
                    &self.pipelines.shadows
                } else {
                    &self.pipelines.sprites
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(1, &texture.bind_group, &[]);
                pass.set_vertex_buffer(0, self.sprite_buffer.slice(..));
                pass.draw(0..6, instances.clone());
            }
        }
    }
}

impl WgpuBackend<SurfaceTarget> {
    pub fn resize(&mut self, width: u32, height: u32) {
        self.target.resize(&self.device, width, height);
    }

    pub fn reconfigure(&self) {
        self.target.reconfigure(&self.device);
    }
}

impl WgpuBackend<OffscreenTarget> {
    pub fn read_pixels(&self) -> Result<RgbaImage, RenderError> {
        self.target.read_pixels(&self.device, &self.queue)
    }
}

fn create_sprite_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Instance Buffer"),
        size: (capacity * std::mem::size_of::<SpriteInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn vertex_buffer<V: bytemuck::Pod>(
    device: &wgpu::Device,
    label: &str,
    vertices: &[V],
) -> Option<wgpu::Buffer> {
    if vertices.is_empty() {
        return None;
    }
    Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(vertices),
        usage: wgpu::BufferUsages::VERTEX,
    }))
}

impl<T: RenderTarget> RenderBackend for WgpuBackend<T> {
    fn begin_frame(&mut self, camera: &CameraUniform) -> Result<(), RenderError> {
        self.check_live()?;
        self.camera = *camera;
        self.frame = FrameQueue::default();
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(camera));
        Ok(())
    }

    fn upload_mesh(&mut self, mesh: MeshData<'_>) -> Result<(), RenderError> {
        self.check_live()?;
        let layer = mesh.layer();
        let gpu = match mesh {
            MeshData::Terrain(terrain) => {
                let vertices = terrain.buffer.to_vertices();
                GpuMesh {
                    buffer: vertex_buffer(&self.device, "Terrain Vertex Buffer", &vertices),
                    vertex_count: vertices.len() as u32,
                    opaque_count: terrain.base_vertex_count as u32,
                }
            }
            MeshData::Roads(roads) => {
                let vertices = roads.buffer.to_vertices();
                GpuMesh {
                    buffer: vertex_buffer(&self.device, "Road Vertex Buffer", &vertices),
                    vertex_count: vertices.len() as u32,
                    opaque_count: 0,
                }
            }
            MeshData::Fog(fog) => {
                let vertices = fog.to_vertices();
                GpuMesh {
                    buffer: vertex_buffer(&self.device, "Fog Vertex Buffer", &vertices),
                    vertex_count: vertices.len() as u32,
                    opaque_count: 0,
                }
            }
        };
        log::debug!("Uploaded {:?} mesh: {} vertices", layer, gpu.vertex_count);
        self.meshes.insert(layer, gpu);
        Ok(())
    }

    fn draw_mesh(&mut self, layer: MeshLayer) -> Result<(), RenderError> {
        self.check_live()?;
        let mesh = self
            .meshes
            .get(&layer)
            .ok_or_else(|| RenderError::missing(format!("{:?} mesh not uploaded", layer)))?;
        if let Some(handle) = self.mesh_texture(layer) {
            self.texture(handle)?;
        }
        if mesh.vertex_count > 0 {
            self.frame.ops.push(DrawOp::Mesh(layer));
        }
        Ok(())
    }

    fn draw_images(&mut self, layer: ImageLayer, items: &[ImageDraw]) -> Result<(), RenderError> {
        self.check_live()?;
        for item in items {
            self.texture(item.frame.texture)?;
        }

        let shadow = layer == ImageLayer::Shadows;
        let first = self.frame.sprites.len() as u32;
        for (texture, instances) in batch_by_texture(items, first) {
            self.frame.ops.push(DrawOp::Sprites {
                shadow,
                texture,
                instances,
            });
        }
        self.frame
            .sprites
            .extend(items.iter().map(SpriteInstance::from));
        Ok(())
    }

    fn draw_titles(&mut self, titles: &[TitleDraw]) -> Result<(), RenderError> {
        self.check_live()?;
        let renderer = self
            .titles
            .as_ref()
            .ok_or_else(|| RenderError::missing("title glyph atlas not loaded"))?;
        let screen = Vec2::from_array(self.camera.screen_size);
        for title in titles {
            self.frame.titles.extend(renderer.atlas().layout_centered(
                &title.text,
                title.screen_position,
                TITLE_COLOR,
                screen,
            ));
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        self.check_live()?;
        let (view, _, _) = self.target.get_view()?;

        self.ensure_sprite_capacity(self.frame.sprites.len());
        if !self.frame.sprites.is_empty() {
            self.queue.write_buffer(
                &self.sprite_buffer,
                0,
                bytemuck::cast_slice(&self.frame.sprites),
            );
        }
        let title_count = match &self.titles {
            Some(renderer) => renderer.prepare(&self.queue, &self.frame.titles),
            None => 0,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(BACKGROUND),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            for op in &self.frame.ops {
                self.encode(&mut pass, op);
            }
        }

        if let Some(renderer) = &self.titles
            && title_count > 0
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Title Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            renderer.draw(&mut pass, title_count);
        }

        self.queue.submit(Some(encoder.finish()));
        self.target.present();
        log::trace!(
            "Submitted frame: {} ops, {} sprites, {} glyphs",
            self.frame.ops.len(),
            self.frame.sprites.len(),
            title_count
        );
        Ok(())
    }

    fn release(&mut self) {
        let meshes = self.meshes.len();
        let textures = self.textures.len();
        self.meshes.clear();
        self.textures.clear();
        self.titles = None;
        self.frame = FrameQueue::default();
        self.released = true;
        log::info!(
            "Released GPU resources: {} meshes, {} textures",
            meshes,
            textures
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::{BuiltMeshes, FrameInputs, compose_frame};
    use crate::coords::ViewTransform;
    use crate::diagnostics::Diagnostics;
    use crate::draw_list::DrawLists;
    use crate::normals::NormalField;
    use crate::terrain_mesh::TerrainMesh;
    use crate::testing::{HeadlessGpu, frame, two_tile_world};
    use image::Rgba;

    fn draw(texture: u32) -> ImageDraw {
        let mut sprite = frame(0, 0);
        sprite.texture = TextureHandle(texture);
        ImageDraw {
            frame: sprite,
            game_point: Vec2::new(1.0, 1.0),
            height: 10.0,
        }
    }

    #[test]
    fn test_sprite_instance_layout() {
        assert_eq!(std::mem::size_of::<SpriteInstance>(), 36);
        let desc = SpriteInstance::desc();
        assert_eq!(desc.array_stride, 36);
        assert_eq!(desc.step_mode, wgpu::VertexStepMode::Instance);
        let offsets: Vec<u64> = desc.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 12, 20, 28]);
    }

    #[test]
    fn test_sprite_instance_from_draw() {
        let instance = SpriteInstance::from(&draw(0));
        assert_eq!(instance.game_point, [1.0, 1.0]);
        assert_eq!(instance.height, 10.0);
        assert_eq!(instance.offset, [16.0, 36.0]);
        assert_eq!(instance.source_size, [32.0, 40.0]);
    }

    #[test]
    fn test_batches_preserve_order() {
        let items = [draw(0), draw(0), draw(1), draw(0)];
        let batches = batch_by_texture(&items, 5);
        assert_eq!(
            batches,
            vec![
                (TextureHandle(0), 5..7),
                (TextureHandle(1), 7..8),
                (TextureHandle(0), 8..9),
            ]
        );
        assert!(batch_by_texture(&[], 0).is_empty());
    }

    fn solid(handle: u32, name: &str, color: [u8; 4]) -> AtlasImage {
        AtlasImage {
            handle: TextureHandle(handle),
            name: name.into(),
            image: RgbaImage::from_pixel(64, 64, Rgba(color)),
        }
    }

    #[test]
    fn test_offscreen_terrain_frame() {
        let Some(gpu) = pollster::block_on(HeadlessGpu::new()) else {
            eprintln!("Skipping: no GPU adapter available");
            return;
        };
        let target = OffscreenTarget::new(&gpu.device, 64, 64);
        let images = [
            solid(0, "sprites", [255, 0, 0, 255]),
            solid(1, "terrain", [0, 200, 0, 255]),
            solid(2, "roads", [90, 60, 30, 255]),
        ];
        let mut backend = WgpuBackend::new(
            gpu.device,
            gpu.queue,
            target,
            &images,
            TextureHandle(1),
            TextureHandle(2),
        );

        // Drawing before upload is a missing resource
        assert!(matches!(
            backend.draw_mesh(MeshLayer::Terrain),
            Err(RenderError::MissingGpuResource(_))
        ));

        let world = two_tile_world();
        let normals = NormalField::build(&world);
        let terrain = TerrainMesh::build(&world, &normals);
        backend.upload_mesh(MeshData::Terrain(&terrain)).unwrap();

        let camera = CameraUniform {
            pan: [8.0, 16.0],
            screen_size: [64.0, 64.0],
            scale: 16.0,
            height_adjust: 10.0,
            standard_height: 10.0,
            sprite_scale: 1.0,
            light_direction: [0.0, 0.0, -1.0, 0.0],
        };
        let view = ViewTransform {
            pan: Vec2::new(8.0, 16.0),
            scale: 16.0,
            viewport: Vec2::new(64.0, 64.0),
            height_adjust: 10.0,
            standard_height: 10.0,
        };
        let lists = DrawLists::default();
        let inputs = FrameInputs {
            world: &world,
            lists: &lists,
            view: &view,
            camera: &camera,
            meshes: BuiltMeshes {
                terrain: Some(terrain.vertex_count()),
                ..Default::default()
            },
        };
        let mut diagnostics = Diagnostics::new();
        compose_frame(&inputs, &mut backend, &mut diagnostics).unwrap();

        let pixels = backend.read_pixels().unwrap();
        // Inside the lower tile
        let inside = pixels.get_pixel(24, 42);
        assert!(inside[1] > 100, "expected terrain, got {:?}", inside);
        // Off the map stays background
        let outside = pixels.get_pixel(2, 2);
        assert_eq!(outside[1], 0);

        backend.release();
        assert!(backend.begin_frame(&camera).is_err());
    }
}
