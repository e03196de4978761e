//! Game overlay rendered via egui on top of the sprite pass.
//!
//! Integration pattern: egui requires a three-phase render split because
//! `egui_wgpu::Renderer::render()` needs a `RenderPass<'static>`, while
//! `begin_render_pass` borrows the encoder. The phases are:
//!
//!   1. `prepare()` -- run egui UI logic, produce tessellated primitives
//!   2. `upload()`  -- upload textures and update GPU buffers (borrows encoder mutably)
//!   3. `paint()`   -- render into a new render pass with `forget_lifetime()`
//!   4. `cleanup()` -- free textures egui no longer references
//!
//! Every screen draws through here: HUD text, the menu and settings panels,
//! the pause and game-over dialogs, and the F3 debug window. Buttons never
//! mutate game state directly; clicks come back as `UiAction`s.

use dash_core::time::TimeState;
use winit::window::Window;

const HUD_TEXT_SIZE: f32 = 26.0;
const BANNER_TEXT_SIZE: f32 = 48.0;

/// Which panel the overlay shows this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Settings,
    Playing,
    Paused,
    GameOver,
}

/// Read-only view of the session for one frame of UI.
#[derive(Debug, Clone)]
pub struct HudState {
    pub screen: Screen,
    pub score: u32,
    pub high_score: u32,
    /// Milliseconds until the collectible times out, when a timer is running.
    pub time_left_ms: Option<u64>,
    pub volume: u8,
    pub max_volume: u8,
}

/// Extra lines for the F3 debug window.
#[derive(Debug, Clone, Default)]
pub struct DebugStats {
    pub level_id: String,
    pub sprite_count: u32,
    pub draw_calls: u32,
    pub actor_position: (f32, f32),
    pub actor_velocity: (f32, f32),
    pub grounded: bool,
    pub animation_label: String,
    pub collectible_position: (f32, f32),
    pub collectible_frame: u32,
    pub texture_count: u32,
    pub show_boxes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    Play,
    OpenSettings,
    Back,
    VolumeUp,
    VolumeDown,
    Restart,
    Resume,
}

pub struct GameOverlay {
    pub egui_ctx: egui::Context,
    pub egui_winit_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,
    pub debug_visible: bool,
}

impl GameOverlay {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        window: &Window,
    ) -> Self {
        let egui_ctx = egui::Context::default();
        let egui_winit_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            window,
            None,
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            egui_ctx,
            egui_winit_state,
            egui_renderer,
            debug_visible: false,
        }
    }

    pub fn handle_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        let response = self.egui_winit_state.on_window_event(window, event);
        response.consumed
    }

    pub fn toggle_debug(&mut self) {
        self.debug_visible = !self.debug_visible;
        log::info!(
            "Debug panel: {}",
            if self.debug_visible { "ON" } else { "OFF" }
        );
    }

    pub fn prepare(
        &mut self,
        window: &Window,
        time: &TimeState,
        hud: &HudState,
        stats: Option<DebugStats>,
    ) -> (
        Vec<egui::ClippedPrimitive>,
        egui::TexturesDelta,
        Vec<UiAction>,
    ) {
        let mut actions = Vec::new();
        let raw_input = self.egui_winit_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            match hud.screen {
                Screen::Menu => menu_panel(ctx, &mut actions),
                Screen::Settings => settings_panel(ctx, hud, &mut actions),
                Screen::Playing => score_panel(ctx, hud),
                Screen::Paused => {
                    score_panel(ctx, hud);
                    dialog(ctx, "Paused", "Resume", UiAction::Resume, &mut actions);
                }
                Screen::GameOver => {
                    score_panel(ctx, hud);
                    dialog(ctx, "You Lost", "Restart", UiAction::Restart, &mut actions);
                }
            }

            if self.debug_visible {
                debug_window(ctx, time, stats.as_ref());
            }
        });

        self.egui_winit_state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        (primitives, full_output.textures_delta, actions)
    }

    /// Upload textures and update buffers. Call before creating the egui render pass.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitives: &[egui::ClippedPrimitive],
        textures_delta: &egui::TexturesDelta,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, primitives, screen_descriptor);
    }

    /// Render into an existing render pass. Call after `upload()`.
    pub fn paint(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        primitives: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.egui_renderer
            .render(render_pass, primitives, screen_descriptor);
    }

    /// Free textures that egui no longer needs. Call after rendering.
    pub fn cleanup(&mut self, textures_delta: &egui::TexturesDelta) {
        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

/// "Time Left: 3.2s" with one decimal, truncated toward zero.
pub fn format_time_left(ms: u64) -> String {
    format!("Time Left: {}.{}s", ms / 1000, (ms % 1000) / 100)
}

/// The countdown only shows during play, never under the pause or game-over
/// dialogs.
fn visible_time_left(hud: &HudState) -> Option<u64> {
    match hud.screen {
        Screen::Playing => hud.time_left_ms,
        _ => None,
    }
}

fn hud_text(text: impl Into<String>) -> egui::RichText {
    egui::RichText::new(text)
        .size(HUD_TEXT_SIZE)
        .color(egui::Color32::WHITE)
        .strong()
}

fn score_panel(ctx: &egui::Context, hud: &HudState) {
    egui::Area::new(egui::Id::new("hud_scores"))
        .anchor(egui::Align2::LEFT_TOP, [16.0, 16.0])
        .interactable(false)
        .show(ctx, |ui| {
            ui.label(hud_text(format!("Score: {}", hud.score)));
            ui.label(hud_text(format!("High Score: {}", hud.high_score)));
            if let Some(ms) = visible_time_left(hud) {
                ui.label(hud_text(format_time_left(ms)));
            }
        });
}

fn centered_window(title: &str) -> egui::Window<'static> {
    egui::Window::new(title)
        .title_bar(false)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
}

fn menu_panel(ctx: &egui::Context, actions: &mut Vec<UiAction>) {
    centered_window("menu").show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.label(egui::RichText::new("Apple Dash").size(BANNER_TEXT_SIZE));
            ui.add_space(12.0);
            if ui.button(hud_text("Play")).clicked() {
                actions.push(UiAction::Play);
            }
            if ui.button(hud_text("Settings")).clicked() {
                actions.push(UiAction::OpenSettings);
            }
        });
    });
}

fn settings_panel(ctx: &egui::Context, hud: &HudState, actions: &mut Vec<UiAction>) {
    centered_window("settings").show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.label(egui::RichText::new("Settings").size(BANNER_TEXT_SIZE));
            ui.add_space(12.0);
            ui.horizontal(|ui| {
                if ui.button(hud_text("-")).clicked() {
                    actions.push(UiAction::VolumeDown);
                }
                ui.label(hud_text(format!("Volume: {}/{}", hud.volume, hud.max_volume)));
                if ui.button(hud_text("+")).clicked() {
                    actions.push(UiAction::VolumeUp);
                }
            });
            ui.add_space(12.0);
            if ui.button(hud_text("Back")).clicked() {
                actions.push(UiAction::Back);
            }
        });
    });
}

fn dialog(
    ctx: &egui::Context,
    banner: &str,
    button: &str,
    action: UiAction,
    actions: &mut Vec<UiAction>,
) {
    centered_window(banner).show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.label(egui::RichText::new(banner).size(BANNER_TEXT_SIZE));
            ui.add_space(12.0);
            if ui.button(hud_text(button)).clicked() {
                actions.push(action);
            }
        });
    });
}

fn debug_window(ctx: &egui::Context, time: &TimeState, stats: Option<&DebugStats>) {
    egui::Window::new("Debug")
        .default_pos([10.0, 200.0])
        .show(ctx, |ui| {
            ui.label(format!("FPS: {:.1}", time.smoothed_fps));
            ui.label(format!("Frame time: {:.2} ms", time.smoothed_frame_time_ms));
            ui.label(format!("Ticks: {}", time.tick_count));
            let Some(stats) = stats else {
                return;
            };
            ui.separator();
            ui.label(format!("Level: {}", stats.level_id));
            ui.label(format!("Draw calls: {}", stats.draw_calls));
            ui.label(format!(
                "Sprites: {}  Textures: {}",
                stats.sprite_count, stats.texture_count
            ));
            ui.separator();
            ui.label(format!(
                "Actor: ({:.1}, {:.1}) vel ({:.2}, {:.2})",
                stats.actor_position.0,
                stats.actor_position.1,
                stats.actor_velocity.0,
                stats.actor_velocity.1
            ));
            ui.label(format!(
                "Grounded: {}  Anim: {}",
                stats.grounded, stats.animation_label
            ));
            ui.label(format!(
                "Apple: ({:.0}, {:.0})  frame {}",
                stats.collectible_position.0,
                stats.collectible_position.1,
                stats.collectible_frame
            ));
            ui.label(format!(
                "Collision boxes (F4): {}",
                if stats.show_boxes { "ON" } else { "OFF" }
            ));
        });
}
