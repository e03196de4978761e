//! Apple Dash -- main loop and application entry point.
//!
//! winit drives the event loop via `ApplicationHandler`. A `RedrawRequested`
//! that arrives once the tick budget is spent is one tick:
//!
//!   1. `begin_tick()` -- stamp the tick and update frame statistics
//!   2. snapshot input, run exactly one `Session::tick`
//!   3. rebuild the sprite mesh from the settled state
//!   4. draw sprites, composite the egui overlay, apply overlay button presses
//!
//! Earlier redraws (expose, resize) skip steps 1-2 and only re-render.
//! `about_to_wait` parks the loop until the next tick deadline. A slow tick is
//! never caught up.
//!
//! All content (config, level, asset manifest) is loaded before the window
//! opens. Missing files fall back to built-in defaults; malformed ones abort.

mod actor;
mod assets;
mod background;
mod collectible;
mod config;
mod draw;
mod highscore;
mod music;
#[cfg(test)]
mod replay;
mod session;
mod tile_grid;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use wgpu::util::DeviceExt;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use assets::{load_manifest_from_path, AssetManifest, AssetStore, TextureHandle, TextureKey};
use background::Parallax;
use config::{load_config_from_path, GameConfig, MAX_VOLUME};
use dash_core::input::{InputState, Key};
use dash_core::time::TimeState;
use dash_platform::window::PlatformConfig;
use dash_render::{GpuContext, ScreenCamera, SpritePipeline, SpriteVertex, Texture};
use dash_ui::{DebugStats, GameOverlay, HudState, Screen, UiAction};
use draw::{build_mesh, build_scene, DrawCall};
use highscore::{high_score_path, load_high_score, save_high_score};
use music::MusicPlayer;
use session::{MenuAction, Phase, Session, SessionEvent};
use tile_grid::{load_level_from_path, TileGrid};

const CONFIG_PATH: &str = "assets/config/game.json";
const ASSET_ROOT: &str = ".";
/// Sky blue (135, 206, 235).
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.529,
    g: 0.808,
    b: 0.922,
    a: 1.0,
};

struct GpuSpriteTexture {
    /// Owns the GPU texture the bind group samples.
    _texture: Texture,
    bind_group: wgpu::BindGroup,
}

/// Everything read from disk before the window exists.
struct GameSetup {
    config: GameConfig,
    grid: TileGrid,
    manifest: AssetManifest,
    high_score_path: PathBuf,
    high_score: u32,
    rng: Pcg32,
}

fn load_setup() -> Result<GameSetup, String> {
    let config_path = Path::new(CONFIG_PATH);
    let config = if config_path.exists() {
        load_config_from_path(config_path)?
    } else {
        log::info!("No config at {}, using defaults", config_path.display());
        GameConfig::default()
    };

    let level_path = Path::new(&config.level_path);
    let grid = if level_path.exists() {
        load_level_from_path(level_path, config.tiles)?
    } else {
        log::warn!(
            "No level at {}, using the built-in layout",
            level_path.display()
        );
        TileGrid::builtin(config.tiles)
    };
    log::info!(
        "Level '{}': {}x{} tiles, {} solid",
        grid.level_id,
        grid.cols(),
        grid.rows(),
        grid.solid_count()
    );

    let manifest_path = Path::new(&config.manifest_path);
    let manifest = if manifest_path.exists() {
        load_manifest_from_path(manifest_path)?
    } else {
        log::info!(
            "No asset manifest at {}, using the stock layout",
            manifest_path.display()
        );
        AssetManifest::default()
    };

    let high_score_path = high_score_path(&config.high_score_file);
    let high_score = load_high_score(&high_score_path);

    let seed: u64 = rand::random();
    log::info!("Apple placement seed: {seed}");

    Ok(GameSetup {
        config,
        grid,
        manifest,
        high_score_path,
        high_score,
        rng: Pcg32::seed_from_u64(seed),
    })
}

/// All mutable runtime state. Constructed in `ApplicationHandler::resumed`
/// once the window and GPU surface are available.
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    time: TimeState,
    input: InputState,
    sprite_pipeline: SpritePipeline,
    overlay: GameOverlay,
    textures: AssetStore<GpuSpriteTexture>,

    session: Session,
    music: MusicPlayer,
    parallax: Parallax,
    logical_size: (f32, f32),
    show_boxes: bool,
    high_score_path: PathBuf,

    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    mesh_vertex_capacity: usize,
    mesh_index_capacity: usize,
    camera_bind_group: wgpu::BindGroup,
    draw_calls: Vec<DrawCall>,
    sprite_count: usize,
}

impl EngineState {
    fn new(window: Arc<Window>, setup: GameSetup) -> Result<Self, String> {
        let gpu = GpuContext::new(window.clone(), setup.config.vsync)?;
        let sprite_pipeline = SpritePipeline::new(&gpu.device, gpu.surface_format);
        let overlay = GameOverlay::new(&gpu.device, gpu.surface_format, &window);

        let mut textures = AssetStore::new();
        textures.load_manifest(&setup.manifest, Path::new(ASSET_ROOT), |path| {
            load_sprite_texture(&gpu, &sprite_pipeline, path)
        });
        let white = Texture::from_rgba8(&gpu.device, &gpu.queue, &[255; 4], 1, 1, "white");
        let white = upload_sprite_texture(&gpu, &sprite_pipeline, white);
        textures.insert(TextureKey::White, white, (1, 1));

        let parallax = Parallax::new(&setup.manifest.background, |index| {
            textures
                .handle(TextureKey::Background(index))
                .and_then(|handle| textures.size(handle))
        });

        let config = &setup.config;
        let camera = ScreenCamera::new(config.window_width, config.window_height);
        let camera_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::cast_slice(&[camera.build_uniform()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group =
            sprite_pipeline.create_camera_bind_group(&gpu.device, &camera_buffer);
        let vertex_buffer = create_vertex_buffer(&gpu.device, 1);
        let index_buffer = create_index_buffer(&gpu.device, 1);

        let time = TimeState::new(config.tick_rate_hz);
        let session = Session::new(
            config,
            setup.grid,
            setup.high_score,
            setup.rng,
            time.now_ms(),
        );
        let music = MusicPlayer::start(
            &Path::new(ASSET_ROOT).join(&setup.manifest.music),
            session.volume(),
        );

        let mut state = Self {
            window,
            gpu,
            time,
            input: InputState::new(),
            sprite_pipeline,
            overlay,
            textures,
            session,
            music,
            parallax,
            logical_size: config.world_size(),
            show_boxes: false,
            high_score_path: setup.high_score_path,
            vertex_buffer,
            index_buffer,
            mesh_vertex_capacity: 1,
            mesh_index_capacity: 1,
            camera_bind_group,
            draw_calls: Vec::new(),
            sprite_count: 0,
        };
        state.rebuild_scene_mesh();
        Ok(state)
    }

    fn tick(&mut self) {
        self.time.begin_tick();

        if self.input.is_just_pressed(Key::DebugPanel) {
            self.overlay.toggle_debug();
        }
        if self.input.is_just_pressed(Key::DebugBoxes) {
            self.show_boxes = !self.show_boxes;
            log::info!(
                "Bounding boxes: {}",
                if self.show_boxes { "ON" } else { "OFF" }
            );
        }

        let snapshot = self.input.snapshot();
        self.session.tick(&snapshot, self.time.now_ms());
        self.handle_session_events();
        if self.session.phase() == Phase::Playing {
            self.parallax.advance();
        }
        self.input.end_tick();
    }

    fn handle_session_events(&mut self) {
        for event in self.session.drain_events() {
            self.music.handle(&event);
            match event {
                SessionEvent::MusicPaused
                | SessionEvent::MusicResumed
                | SessionEvent::VolumeChanged(_) => {}
                SessionEvent::Collected { score } => log::debug!("Apple collected, score {score}"),
                SessionEvent::CollectibleRespawned => log::debug!("Apple respawned"),
                SessionEvent::PitFall => log::debug!("Player fell into a pit"),
                SessionEvent::GameOver { score } => {
                    log::info!(
                        "Game over: score {score}, high score {}",
                        self.session.high_score()
                    );
                }
            }
        }
    }

    fn apply_ui_action(&mut self, action: UiAction) {
        let action = match action {
            UiAction::Play => MenuAction::Play,
            UiAction::OpenSettings => MenuAction::OpenSettings,
            UiAction::Back => MenuAction::Back,
            UiAction::VolumeUp => MenuAction::VolumeUp,
            UiAction::VolumeDown => MenuAction::VolumeDown,
            UiAction::Restart => MenuAction::Restart,
            UiAction::Resume => MenuAction::Resume,
        };
        if self.session.handle_action(action, self.time.now_ms()) {
            self.handle_session_events();
        }
    }

    fn hud_state(&self) -> HudState {
        let screen = match self.session.phase() {
            Phase::Menu => Screen::Menu,
            Phase::Settings => Screen::Settings,
            Phase::Playing => Screen::Playing,
            Phase::Paused => Screen::Paused,
            Phase::GameOver => Screen::GameOver,
        };
        HudState {
            screen,
            score: self.session.score(),
            high_score: self.session.high_score(),
            time_left_ms: self.session.time_left_ms(),
            volume: self.session.volume(),
            max_volume: MAX_VOLUME,
        }
    }

    fn debug_stats(&self) -> DebugStats {
        let actor = &self.session.actor;
        let apple = &self.session.collectible;
        DebugStats {
            level_id: self.session.grid.level_id.clone(),
            sprite_count: self.sprite_count as u32,
            draw_calls: self.draw_calls.len() as u32,
            actor_position: (actor.x, actor.y),
            actor_velocity: (actor.vel_x, actor.vel_y),
            grounded: actor.grounded,
            animation_label: format!("{} #{}", actor.anim.tag, actor.anim.frame_index),
            collectible_position: (apple.x, apple.y),
            collectible_frame: apple.frame_index(),
            texture_count: self.textures.texture_count() as u32,
            show_boxes: self.show_boxes,
        }
    }

    fn rebuild_scene_mesh(&mut self) {
        let cmds = build_scene(
            &self.session,
            &self.parallax,
            &self.textures,
            self.logical_size,
            self.show_boxes,
        );
        let mesh = build_mesh(&cmds, &self.textures);
        self.ensure_mesh_capacity(mesh.vertices.len(), mesh.indices.len());
        self.sprite_count = mesh.sprite_count();

        if !mesh.vertices.is_empty() {
            self.gpu.queue.write_buffer(
                &self.vertex_buffer,
                0,
                bytemuck::cast_slice(&mesh.vertices),
            );
        }
        if !mesh.indices.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&mesh.indices));
        }
        self.draw_calls = mesh.draw_calls;
    }

    fn ensure_mesh_capacity(&mut self, vertex_count: usize, index_count: usize) {
        let needed_vertices = vertex_count.max(1);
        if needed_vertices > self.mesh_vertex_capacity {
            self.mesh_vertex_capacity = needed_vertices.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&self.gpu.device, self.mesh_vertex_capacity);
        }

        let needed_indices = index_count.max(1);
        if needed_indices > self.mesh_index_capacity {
            self.mesh_index_capacity = needed_indices.next_power_of_two();
            self.index_buffer = create_index_buffer(&self.gpu.device, self.mesh_index_capacity);
        }
    }

    fn render(&mut self) {
        let Some((output, view)) = self.gpu.begin_frame() else {
            return;
        };

        let hud = self.hud_state();
        let stats = self.overlay.debug_visible.then(|| self.debug_stats());
        let (egui_primitives, egui_textures_delta, ui_actions) =
            self.overlay
                .prepare(&self.window, &self.time, &hud, stats);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.size.0, self.gpu.size.1],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut last_bound: Option<TextureHandle> = None;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });

            render_pass.set_pipeline(&self.sprite_pipeline.render_pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

            for draw in &self.draw_calls {
                let Some(stored) = self.textures.get(draw.texture) else {
                    continue;
                };
                if last_bound != Some(draw.texture) {
                    render_pass.set_bind_group(1, &stored.texture.bind_group, &[]);
                    last_bound = Some(draw.texture);
                }
                render_pass.draw_indexed(
                    draw.index_start..(draw.index_start + draw.index_count),
                    0,
                    0..1,
                );
            }
        }

        self.overlay.upload(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &egui_primitives,
            &egui_textures_delta,
            &screen_descriptor,
        );

        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();

            self.overlay
                .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
        }

        self.overlay.cleanup(&egui_textures_delta);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        // Button presses land after the frame so the next tick sees them.
        for action in ui_actions {
            self.apply_ui_action(action);
        }
    }

    fn save_high_score(&self) {
        if let Err(e) = save_high_score(&self.high_score_path, self.session.high_score()) {
            log::error!("High score not saved: {e}");
        }
    }
}

struct App {
    platform: PlatformConfig,
    setup: Option<GameSetup>,
    state: Option<EngineState>,
}

impl App {
    fn new(setup: GameSetup) -> Self {
        let platform = PlatformConfig {
            width: setup.config.window_width,
            height: setup.config.window_height,
            ..PlatformConfig::default()
        };
        Self {
            platform,
            setup: Some(setup),
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(setup) = self.setup.take() else {
            return;
        };
        let started = dash_platform::window::create_window(event_loop, &self.platform)
            .and_then(|window| EngineState::new(window, setup));
        match started {
            Ok(state) => self.state = Some(state),
            Err(e) => {
                log::error!("Startup failed: {e}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = &self.state else {
            return;
        };
        if state.time.remaining_budget().is_some() {
            event_loop.set_control_flow(ControlFlow::WaitUntil(state.time.next_tick_deadline()));
        } else {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        let egui_consumed = state.overlay.handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                state
                    .gpu
                    .resize(physical_size.width, physical_size.height);
            }

            WindowEvent::Focused(false) => state.input.release_all(),

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(game_key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.key_down(game_key),
                            ElementState::Released => state.input.key_up(game_key),
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
                    return;
                }
                if state.time.tick_due() {
                    state.tick();
                }
                state.rebuild_scene_mesh();
                state.render();
            }

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.save_high_score();
        }
    }
}

fn load_sprite_texture(
    gpu: &GpuContext,
    pipeline: &SpritePipeline,
    path: &Path,
) -> Result<(GpuSpriteTexture, (u32, u32)), String> {
    let bytes = fs::read(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let texture = Texture::from_bytes(&gpu.device, &gpu.queue, &bytes, &path.to_string_lossy())?;
    let size = texture.size;
    log::debug!("Loaded {} ({}x{})", path.display(), size.0, size.1);
    Ok((upload_sprite_texture(gpu, pipeline, texture), size))
}

fn upload_sprite_texture(
    gpu: &GpuContext,
    pipeline: &SpritePipeline,
    texture: Texture,
) -> GpuSpriteTexture {
    let bind_group = pipeline.create_texture_bind_group(&gpu.device, &texture);
    GpuSpriteTexture {
        _texture: texture,
        bind_group,
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<SpriteVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowLeft | KeyCode::KeyA => Some(Key::Left),
        KeyCode::ArrowRight | KeyCode::KeyD => Some(Key::Right),
        KeyCode::Space | KeyCode::KeyW | KeyCode::ArrowUp => Some(Key::Jump),
        KeyCode::Escape | KeyCode::KeyP => Some(Key::Pause),
        KeyCode::F3 => Some(Key::DebugPanel),
        KeyCode::F4 => Some(Key::DebugBoxes),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Apple Dash starting...");

    let setup = match load_setup() {
        Ok(setup) => setup,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {e}");
            std::process::exit(1);
        }
    };

    let mut app = App::new(setup);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {e}");
        std::process::exit(1);
    }
}
