//! House title rendering using ab_glyph for font rasterization.
//!
//! Glyphs are rasterized once into an atlas image on the CPU; the GPU side
//! only uploads that image and draws instanced quads.

use crate::error::RenderError;
use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use glam::Vec2;
use image::{Rgba, RgbaImage};
use std::collections::HashMap;

/// Font size titles are rasterized at.
const TITLE_FONT_SIZE: f32 = 16.0;

/// Side of the square glyph image.
const ATLAS_SIZE: u32 = 512;

/// Glyph quads the instance buffer holds; extra quads are dropped.
const MAX_TEXT_QUADS: usize = 2048;

pub const TITLE_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Pixels left empty around each glyph so sampling never bleeds.
const GLYPH_PADDING: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphInfo {
    /// `[u0, v0, u1, v1]` inside the glyph image.
    pub uv: [f32; 4],
    /// Bitmap width and height; zero for blank glyphs.
    pub size: [f32; 2],
    pub advance: f32,
    /// Bitmap top relative to the baseline (negative above it).
    pub bearing_y: f32,
    pub bearing_x: f32,
}

impl GlyphInfo {
    fn blank(advance: f32) -> Self {
        Self {
            uv: [0.0; 4],
            size: [0.0; 2],
            advance,
            bearing_y: 0.0,
            bearing_x: 0.0,
        }
    }

    fn is_blank(&self) -> bool {
        self.size[0] <= 0.0 || self.size[1] <= 0.0
    }
}

/// Places rectangles left to right in rows ("shelves"), opening a new shelf
/// when the current one is full.
struct ShelfPacker {
    size: u32,
    x: u32,
    shelf_top: u32,
    shelf_height: u32,
}

impl ShelfPacker {
    fn new(size: u32) -> Self {
        Self {
            size,
            x: GLYPH_PADDING,
            shelf_top: GLYPH_PADDING,
            shelf_height: 0,
        }
    }

    /// Top-left corner for a `width` × `height` rectangle, or `None` when the
    /// image is full.
    fn place(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        if self.x + width + GLYPH_PADDING > self.size {
            self.x = GLYPH_PADDING;
            self.shelf_top += self.shelf_height + GLYPH_PADDING;
            self.shelf_height = 0;
        }
        if self.shelf_top + height + GLYPH_PADDING > self.size {
            return None;
        }
        let corner = (self.x, self.shelf_top);
        self.x += width + GLYPH_PADDING;
        self.shelf_height = self.shelf_height.max(height);
        Some(corner)
    }
}

/// Title glyphs (printable ASCII) rasterized into one white-on-transparent
/// image.
#[derive(Debug, Clone)]
pub struct GlyphAtlas {
    glyphs: HashMap<char, GlyphInfo>,
    pub image: RgbaImage,
    pub ascent: f32,
}

impl GlyphAtlas {
    pub fn from_font(font_data: &[u8]) -> Result<Self, RenderError> {
        let font =
            FontRef::try_from_slice(font_data).map_err(|e| RenderError::InvalidFont(e.to_string()))?;
        let scale = PxScale::from(TITLE_FONT_SIZE);
        let metrics = font.as_scaled(scale);

        let mut image = RgbaImage::new(ATLAS_SIZE, ATLAS_SIZE);
        let mut packer = ShelfPacker::new(ATLAS_SIZE);
        let mut glyphs = HashMap::new();
        let texel = 1.0 / ATLAS_SIZE as f32;

        for c in (b' '..=b'~').map(char::from) {
            let id = font.glyph_id(c);
            let advance = metrics.h_advance(id);
            let Some(outline) = font.outline_glyph(id.with_scale(scale)) else {
                glyphs.insert(c, GlyphInfo::blank(advance));
                continue;
            };

            let bounds = outline.px_bounds();
            let (w, h) = (bounds.width().ceil() as u32, bounds.height().ceil() as u32);
            let Some((left, top)) = packer.place(w, h) else {
                log::warn!("No room left for title glyph {:?}", c);
                continue;
            };

            outline.draw(|x, y, coverage| {
                let (px, py) = (left + x, top + y);
                if px < ATLAS_SIZE && py < ATLAS_SIZE {
                    let alpha = (coverage.clamp(0.0, 1.0) * 255.0) as u8;
                    image.put_pixel(px, py, Rgba([255, 255, 255, alpha]));
                }
            });

            glyphs.insert(
                c,
                GlyphInfo {
                    uv: [
                        left as f32 * texel,
                        top as f32 * texel,
                        (left + w) as f32 * texel,
                        (top + h) as f32 * texel,
                    ],
                    size: [w as f32, h as f32],
                    advance,
                    bearing_y: bounds.min.y,
                    bearing_x: bounds.min.x,
                },
            );
        }

        log::info!("Rasterized {} title glyphs", glyphs.len());
        Ok(Self {
            glyphs,
            image,
            ascent: metrics.ascent(),
        })
    }

    /// Atlas built from known glyph metrics, without a font file.
    pub fn from_glyphs(glyphs: HashMap<char, GlyphInfo>, ascent: f32) -> Self {
        Self {
            glyphs,
            image: RgbaImage::new(1, 1),
            ascent,
        }
    }

    pub fn get(&self, c: char) -> Option<&GlyphInfo> {
        self.glyphs.get(&c)
    }

    /// Width of a string in pixels. Unknown characters count as zero.
    pub fn measure_width(&self, text: &str) -> f32 {
        text.chars().filter_map(|c| self.get(c)).map(|g| g.advance).sum()
    }

    /// Lays out one line whose top edge is centered on `top_center` (pixels,
    /// y down) and converts it to clip-space quads.
    pub fn layout_centered(
        &self,
        text: &str,
        top_center: Vec2,
        color: [f32; 4],
        screen_size: Vec2,
    ) -> Vec<TextQuad> {
        let mut pen = top_center.x - self.measure_width(text) / 2.0;
        let baseline = top_center.y + self.ascent;
        let to_clip = Vec2::new(2.0, -2.0) / screen_size;

        let mut quads = Vec::with_capacity(text.len());
        for glyph in text.chars().filter_map(|c| self.get(c)) {
            if !glyph.is_blank() {
                let corner = Vec2::new(pen + glyph.bearing_x, baseline + glyph.bearing_y);
                let clip = corner * to_clip + Vec2::new(-1.0, 1.0);
                quads.push(TextQuad {
                    pos: clip.to_array(),
                    size: [glyph.size[0] * to_clip.x, glyph.size[1] * -to_clip.y],
                    uv_min: [glyph.uv[0], glyph.uv[1]],
                    uv_max: [glyph.uv[2], glyph.uv[3]],
                    color,
                });
            }
            pen += glyph.advance;
        }
        quads
    }
}

/// One glyph quad in clip space, drawn as an instance of `vs_text`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TextQuad {
    /// Top-left corner in clip space.
    pub pos: [f32; 2],
    /// Size in clip space.
    pub size: [f32; 2],
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
    pub color: [f32; 4],
}

impl TextQuad {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
            0 => Float32x2,
            1 => Float32x2,
            2 => Float32x2,
            3 => Float32x2,
            4 => Float32x4
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TextQuad>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBUTES,
        }
    }
}

/// GPU side of the title overlay.
pub struct TitleRenderer {
    atlas: GlyphAtlas,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    _texture: wgpu::Texture,
}

impl TitleRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target_format: wgpu::TextureFormat,
        atlas: GlyphAtlas,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: atlas.image.width(),
            height: atlas.image.height(),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Title Glyph Atlas"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            atlas.image.as_raw(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.width),
                rows_per_image: Some(size.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Text Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("text_shader.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Text Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
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

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Text Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Text Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Text Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_text",
                buffers: &[TextQuad::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_text",
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Text Instance Buffer"),
            size: (MAX_TEXT_QUADS * std::mem::size_of::<TextQuad>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            atlas,
            pipeline,
            bind_group,
            instance_buffer,
            _texture: texture,
        }
    }

    pub fn atlas(&self) -> &GlyphAtlas {
        &self.atlas
    }

    /// Uploads quads for this frame; returns how many will be drawn.
    pub fn prepare(&self, queue: &wgpu::Queue, quads: &[TextQuad]) -> u32 {
        let count = quads.len().min(MAX_TEXT_QUADS);
        if count < quads.len() {
            log::warn!("Dropping {} title glyphs over the per-frame limit", quads.len() - count);
        }
        if count > 0 {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&quads[..count]));
        }
        count as u32
    }

    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, count: u32) {
        if count == 0 {
            return;
        }
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
        render_pass.draw(0..6, 0..count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(advance: f32) -> GlyphInfo {
        GlyphInfo {
            uv: [0.0, 0.0, 0.1, 0.1],
            size: [8.0, 10.0],
            advance,
            bearing_y: -10.0,
            bearing_x: 0.0,
        }
    }

    fn atlas() -> GlyphAtlas {
        let mut glyphs = HashMap::new();
        glyphs.insert('A', glyph(10.0));
        glyphs.insert('B', glyph(10.0));
        glyphs.insert(' ', GlyphInfo::blank(5.0));
        GlyphAtlas::from_glyphs(glyphs, 12.0)
    }

    #[test]
    fn test_text_quad_layout() {
        assert_eq!(std::mem::size_of::<TextQuad>(), 48);
        let desc = TextQuad::desc();
        assert_eq!(desc.step_mode, wgpu::VertexStepMode::Instance);
        assert_eq!(desc.attributes.len(), 5);
        assert_eq!(desc.attributes[4].offset, 32);
    }

    #[test]
    fn test_measure_width_skips_unknown() {
        let atlas = atlas();
        assert_eq!(atlas.measure_width("A B"), 25.0);
        assert_eq!(atlas.measure_width("A\u{e9}"), 10.0);
    }

    #[test]
    fn test_layout_is_centered() {
        let atlas = atlas();
        let screen = Vec2::new(200.0, 100.0);
        let quads = atlas.layout_centered("AB", Vec2::new(100.0, 50.0), TITLE_COLOR, screen);
        assert_eq!(quads.len(), 2);

        // 20 px wide line centered at x=100 starts at x=90
        let first_px = (quads[0].pos[0] + 1.0) / 2.0 * screen.x;
        assert!((first_px - 90.0).abs() < 1e-4);
        // Top of glyph = top + ascent + bearing = 50 + 12 - 10
        let top_px = (1.0 - quads[0].pos[1]) / 2.0 * screen.y;
        assert!((top_px - 52.0).abs() < 1e-4);
        assert!((quads[0].size[0] - 0.08).abs() < 1e-6);
    }

    #[test]
    fn test_blank_glyphs_advance_without_quads() {
        let atlas = atlas();
        let quads = atlas.layout_centered(" A", Vec2::ZERO, TITLE_COLOR, Vec2::new(100.0, 100.0));
        assert_eq!(quads.len(), 1);
    }

    #[test]
    fn test_packer_opens_new_shelf_and_fills_up() {
        let mut packer = ShelfPacker::new(32);
        assert_eq!(packer.place(10, 8), Some((1, 1)));
        assert_eq!(packer.place(10, 4), Some((12, 1)));
        // 23 + 10 + 1 > 32: next shelf starts below the tallest glyph
        assert_eq!(packer.place(10, 6), Some((1, 10)));
        assert_eq!(packer.place(10, 30), None);
    }

    #[test]
    fn test_invalid_font_is_an_error() {
        assert!(matches!(
            GlyphAtlas::from_font(b"not a font"),
            Err(RenderError::InvalidFont(_))
        ));
    }
}
