//! Realm viewer: opens a window onto a map file (or a seeded demo map).
//!
//! Controls: drag to pan, wheel to zoom, click to select, `D` to discover
//! the whole map, `A` to toggle available-construction markers, `Esc` to quit.

use clap::Parser;
use glam::Vec2;
use realm_data::WorldView;
use realm_render::assets::SpriteAtlas;
use realm_render::config::RenderConfig;
use realm_render::demo;
use realm_render::fog::FogOfWar;
use realm_render::normals::NormalField;
use realm_render::render::{SurfaceTarget, WgpuBackend};
use realm_render::road_mesh::RoadMesh;
use realm_render::terrain_mesh::TerrainMesh;
use realm_render::text::GlyphAtlas;
use realm_render::{RenderContext, RenderError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowBuilder},
};

/// Cursor travel (pixels) below which a press-release counts as a click.
const CLICK_SLOP: f32 = 4.0;
/// Zoom factor per wheel line.
const ZOOM_STEP: f32 = 1.1;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Sprite atlas JSON; texture paths inside are relative to it
    #[arg(long)]
    atlas: Option<PathBuf>,

    /// Map JSON. Without it a demo map is generated
    #[arg(long)]
    map: Option<PathBuf>,

    /// Renderer config JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// TrueType/OpenType font for house titles
    #[arg(long)]
    font: Option<PathBuf>,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Seed for the demo map
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Build the meshes, print statistics and exit without opening a window
    #[arg(long)]
    check: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), RenderError> {
    let config = match &args.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    let world = match &args.map {
        Some(path) => WorldView::load(path)?,
        None => demo::generate_world(args.seed),
    };

    if args.check {
        let atlas = args.atlas.as_deref().map(SpriteAtlas::load).transpose()?;
        print_stats(&world, atlas.as_ref().map(|(atlas, images)| (atlas, images.len())));
        return Ok(());
    }

    let atlas_path = args
        .atlas
        .ok_or_else(|| RenderError::InvalidAtlas("--atlas is required to open a window".into()))?;
    let (atlas, images) = SpriteAtlas::load(&atlas_path)?;
    let font = args.font.as_deref().map(std::fs::read).transpose()?;

    let event_loop = EventLoop::new().map_err(|e| RenderError::Window(e.to_string()))?;
    let window = WindowBuilder::new()
        .with_title("Realm Viewer")
        .with_inner_size(PhysicalSize::new(args.width, args.height))
        .build(&event_loop)
        .map_err(|e| RenderError::Window(e.to_string()))?;
    log::info!("Created window: {}x{}", args.width, args.height);

    let setup = ViewerSetup {
        config,
        atlas,
        images,
        font,
    };
    let mut app = pollster::block_on(App::new(Arc::new(window), world, setup))?;

    event_loop
        .run(move |event, control_flow| match event {
            Event::WindowEvent {
                ref event,
                window_id,
            } if window_id == app.window.id() => match event {
                WindowEvent::CloseRequested => {
                    app.shutdown();
                    control_flow.exit();
                }
                WindowEvent::Resized(size) => app.resize(*size),
                WindowEvent::RedrawRequested => match app.render() {
                    Ok(()) => {}
                    Err(RenderError::Surface(wgpu::SurfaceError::Lost)) => {
                        app.resize(app.window.inner_size())
                    }
                    Err(RenderError::Surface(wgpu::SurfaceError::Outdated)) => {
                        app.backend.reconfigure()
                    }
                    Err(RenderError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                        app.shutdown();
                        control_flow.exit();
                    }
                    Err(e) => log::warn!("Render error: {:?}", e),
                },
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            physical_key: PhysicalKey::Code(key),
                            state: ElementState::Pressed,
                            ..
                        },
                    ..
                } => {
                    if app.handle_key(*key) {
                        app.shutdown();
                        control_flow.exit();
                    }
                }
                WindowEvent::MouseWheel { delta, .. } => app.handle_scroll(*delta),
                WindowEvent::MouseInput { button, state, .. } => {
                    app.handle_mouse_button(*button, *state)
                }
                WindowEvent::CursorMoved { position, .. } => {
                    app.handle_cursor_move(Vec2::new(position.x as f32, position.y as f32))
                }
                _ => {}
            },
            Event::AboutToWait => app.window.request_redraw(),
            _ => {}
        })
        .map_err(|e| RenderError::Window(e.to_string()))
}

/// Headless summary of what the map produces.
fn print_stats(world: &WorldView, atlas: Option<(&SpriteAtlas, usize)>) {
    let normals = NormalField::build(world);
    let terrain = TerrainMesh::build(world, &normals);
    let roads = RoadMesh::build(world, &normals);
    let mut fog = FogOfWar::default();
    fog.rebuild(world);

    println!(
        "map: {} points, {} discovered tiles",
        world.terrain.len(),
        world.discovered_tiles().len()
    );
    println!("normals: {}", normals.len());
    println!(
        "terrain: {} vertices ({} transition)",
        terrain.vertex_count(),
        terrain.transition_vertex_count()
    );
    println!(
        "roads: {} segments, {} junctions, {} vertices",
        roads.segments,
        roads.junctions,
        roads.vertex_count()
    );
    println!("fog: {} vertices", fog.mesh().vertex_count());
    if let Some((atlas, textures)) = atlas {
        println!("atlas: {} keys, {} textures", atlas.len(), textures);
    }
}

struct ViewerSetup {
    config: RenderConfig,
    atlas: SpriteAtlas,
    images: Vec<realm_render::assets::AtlasImage>,
    font: Option<Vec<u8>>,
}

struct App {
    window: Arc<Window>,
    backend: WgpuBackend<SurfaceTarget>,
    context: RenderContext,
    world: WorldView,
    last_frame: Instant,
    cursor: Vec2,
    /// Where the left button went down, while it is held.
    press: Option<Vec2>,
}

impl App {
    async fn new(
        window: Arc<Window>,
        world: WorldView,
        setup: ViewerSetup,
    ) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| RenderError::Window(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("realm_view device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        let target = SurfaceTarget::new(surface, &adapter, &device, size.width, size.height);
        let mut backend = WgpuBackend::new(
            device,
            queue,
            target,
            &setup.images,
            setup.atlas.terrain_texture(),
            setup.atlas.road_texture(),
        );
        if let Some(font) = &setup.font {
            match GlyphAtlas::from_font(font) {
                Ok(glyphs) => backend = backend.with_titles(glyphs),
                Err(e) => log::warn!("House titles disabled: {}", e),
            }
        }

        let viewport = Vec2::new(size.width as f32, size.height as f32);
        let mut context = RenderContext::new(setup.config, setup.atlas, viewport)?;
        let points = world.sorted_points();
        if let Some(middle) = points.get(points.len() / 2) {
            context.camera_mut().center_on(*middle);
        }
        context.on_monitoring_started(&world, &mut backend)?;

        Ok(Self {
            window,
            backend,
            context,
            world,
            last_frame: Instant::now(),
            cursor: Vec2::ZERO,
            press: None,
        })
    }

    fn render(&mut self) -> Result<(), RenderError> {
        let now = Instant::now();
        let elapsed = now - self.last_frame;
        self.last_frame = now;

        self.context
            .render_frame(&self.world, &mut self.backend, elapsed)?;
        // Each was logged when first recorded; the viewer has no other display
        let drained = self.context.drain_diagnostics();
        if !drained.is_empty() {
            log::debug!("{} new render diagnostics this frame", drained.len());
        }
        Ok(())
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.backend.resize(size.width, size.height);
        self.context
            .resize(size.width as f32, size.height as f32);
    }

    /// Returns true if the viewer should exit.
    fn handle_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Escape => return true,
            KeyCode::KeyD => {
                self.world.discover_all();
                if let Err(e) = self
                    .context
                    .on_discovered_points(&self.world, &mut self.backend)
                {
                    log::warn!("Discovery rebuild failed: {}", e);
                }
            }
            KeyCode::KeyA => {
                let ui = self.context.ui_mut();
                ui.show_available_construction = !ui.show_available_construction;
                log::info!(
                    "Available construction markers: {}",
                    ui.show_available_construction
                );
            }
            _ => {}
        }
        false
    }

    fn handle_scroll(&mut self, delta: MouseScrollDelta) {
        let lines = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
        };
        self.context
            .camera_mut()
            .zoom_at(ZOOM_STEP.powf(lines), self.cursor);
    }

    fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        match state {
            ElementState::Pressed => self.press = Some(self.cursor),
            ElementState::Released => {
                if let Some(origin) = self.press.take()
                    && origin.distance(self.cursor) < CLICK_SLOP
                {
                    let picked = self.context.pick_point(&self.world, self.cursor);
                    log::info!("Selected {:?}", picked);
                    self.context.ui_mut().selected = picked;
                }
            }
        }
    }

    fn handle_cursor_move(&mut self, position: Vec2) {
        let delta = position - self.cursor;
        self.cursor = position;

        if self.press.is_some() {
            self.context.camera_mut().pan_by(delta.x, delta.y);
        } else {
            let hover = self.context.pick_point(&self.world, position);
            self.context.ui_mut().hover = hover;
        }
    }

    fn shutdown(&mut self) {
        self.context.teardown(&mut self.backend);
    }
}
