//! Developer panel drawn with egui over the sprite scene.
//!
//! `egui_wgpu::Renderer::render()` wants a `RenderPass<'static>` while
//! `begin_render_pass` borrows the encoder, so rendering is split into phases:
//!
//!   1. `prepare()` runs the UI, tessellates it and queues texture changes
//!   2. `upload()` pushes queued egui textures and buffers (borrows the encoder)
//!   3. `paint()` draws into a pass detached with `forget_lifetime()`
//!   4. `cleanup()` frees textures egui dropped
//!
//! `render()` runs phases 2 to 4 in order. Texture changes stay queued until a
//! `render()` consumes them: egui sends each one only once. Window events
//! always reach egui so the panel can capture the pointer while it is shown.

use k9_core::{Color, Flip, Rect, FONT_POINT_SIZES};
use winit::window::Window;

/// Music request raised by the audio section, applied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioCommand {
    Play { id: String, fade_in_ms: u32 },
    Pause,
    Resume,
    Stop,
    Restart,
    Rewind,
    FadeOut { ms: u32 },
    SetVolume(u32),
    SetPosition(f64),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelActions {
    pub background_changed: bool,
    pub rerender_text: bool,
    pub audio: Vec<AudioCommand>,
}

impl PanelActions {
    pub fn is_empty(&self) -> bool {
        !self.background_changed && !self.rerender_text && self.audio.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MusicStatus {
    pub available: bool,
    pub playing: bool,
    pub paused: bool,
    pub fading_in: bool,
    pub fading_out: bool,
}

impl MusicStatus {
    pub fn label(&self) -> &'static str {
        if !self.available {
            "Unavailable"
        } else if self.fading_in {
            "Fading in"
        } else if self.fading_out {
            "Fading out"
        } else if self.paused {
            "Paused"
        } else if self.playing {
            "Playing"
        } else {
            "Stopped"
        }
    }
}

/// Values the panel edits. Owned by the caller and kept across frames.
#[derive(Debug, Clone)]
pub struct PanelState {
    pub background: [f32; 4],
    pub dest: Rect,
    pub tint: Color,
    pub flip: Flip,
    pub use_source: bool,
    pub source: Rect,
    pub text: String,
    pub text_color: Color,
    pub point_size: u32,
    pub selected_track: usize,
    pub fade_ms: u32,
    pub volume: u32,
    pub seek_seconds: f32,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            background: [0.1, 0.1, 0.12, 1.0],
            dest: Rect::new(100, 100, 256, 256),
            tint: Color::WHITE,
            flip: Flip::None,
            use_source: false,
            source: Rect::new(0, 0, 64, 64),
            text: String::new(),
            text_color: Color::WHITE,
            point_size: 30,
            selected_track: 0,
            fade_ms: 1000,
            volume: 64,
            seek_seconds: 0.0,
        }
    }
}

impl PanelState {
    /// Keep the rects inside the slider ranges for the current screen and
    /// texture sizes.
    pub fn clamp_to(&mut self, screen: (u32, u32), texture: (u32, u32)) {
        let (sw, sh) = (screen.0.max(1) as i32, screen.1.max(1) as i32);
        self.dest.x = self.dest.x.clamp(-sw, sw);
        self.dest.y = self.dest.y.clamp(-sh, sh);
        self.dest.w = self.dest.w.clamp(0, sw * 2);
        self.dest.h = self.dest.h.clamp(0, sh * 2);

        let (tw, th) = (texture.0 as i32, texture.1 as i32);
        self.source.x = self.source.x.clamp(0, tw);
        self.source.y = self.source.y.clamp(0, th);
        self.source.w = self.source.w.clamp(0, tw - self.source.x);
        self.source.h = self.source.h.clamp(0, th - self.source.y);
    }
}

/// Read-only numbers shown by the panel.
#[derive(Debug, Clone, Default)]
pub struct PanelStatus {
    pub fps: f32,
    pub frame_time_ms: f32,
    pub frame_count: u64,
    pub draw_calls: u32,
    pub quads: u32,
    pub screen: (u32, u32),
    pub texture_size: (u32, u32),
    pub track_ids: Vec<String>,
    pub music: MusicStatus,
    pub max_volume: u32,
}

/// egui texture uploads and frees not yet applied to the GPU.
#[derive(Default)]
pub struct PendingTextures {
    delta: egui::TexturesDelta,
}

impl PendingTextures {
    /// Queue a newer delta behind the ones already pending.
    pub fn push(&mut self, delta: egui::TexturesDelta) {
        self.delta.append(delta);
    }

    pub fn take(&mut self) -> egui::TexturesDelta {
        std::mem::take(&mut self.delta)
    }

    pub fn is_empty(&self) -> bool {
        self.delta.is_empty()
    }
}

pub struct DevPanel {
    pub egui_ctx: egui::Context,
    pub egui_winit_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,
    pub visible: bool,
    pending_textures: PendingTextures,
}

impl DevPanel {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat, window: &Window) -> Self {
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
            visible: true,
            pending_textures: PendingTextures::default(),
        }
    }

    /// Returns true when egui consumed the event.
    pub fn handle_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        self.egui_winit_state.on_window_event(window, event).consumed
    }

    /// Whether egui wants keyboard input, e.g. while the text field has focus.
    pub fn wants_keyboard(&self) -> bool {
        self.egui_ctx.wants_keyboard_input()
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::info!("Dev panel: {}", if self.visible { "ON" } else { "OFF" });
    }

    /// Run the UI for one frame. Call it only once the frame has a surface
    /// to draw into, then pass the primitives to [`Self::render`].
    pub fn prepare(
        &mut self,
        window: &Window,
        state: &mut PanelState,
        status: &PanelStatus,
    ) -> (Vec<egui::ClippedPrimitive>, PanelActions) {
        let mut actions = PanelActions::default();
        let visible = self.visible;
        let raw_input = self.egui_winit_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            if visible {
                actions = draw_panel(ctx, state, status);
            }
        });

        self.egui_winit_state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        self.pending_textures.push(full_output.textures_delta);
        (primitives, actions)
    }

    /// Upload, paint on top of `view` and free stale textures.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size_in_pixels: [u32; 2],
        primitives: &[egui::ClippedPrimitive],
    ) {
        let textures_delta = self.pending_textures.take();
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels,
            pixels_per_point: self.egui_ctx.pixels_per_point(),
        };
        self.upload(device, queue, encoder, primitives, &textures_delta, &screen_descriptor);
        {
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Dev Panel Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
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
            self.paint(&mut render_pass, primitives, &screen_descriptor);
        }
        self.cleanup(&textures_delta);
    }

    fn upload(
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

    fn paint(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        primitives: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.egui_renderer
            .render(render_pass, primitives, screen_descriptor);
    }

    fn cleanup(&mut self, textures_delta: &egui::TexturesDelta) {
        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

/// Build the panel window for one frame and report what the user changed.
pub fn draw_panel(ctx: &egui::Context, state: &mut PanelState, status: &PanelStatus) -> PanelActions {
    let mut actions = PanelActions::default();
    state.clamp_to(status.screen, status.texture_size);

    egui::Window::new("K9 Demo")
        .default_pos([10.0, 10.0])
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Background");
                if ui
                    .color_edit_button_rgba_unmultiplied(&mut state.background)
                    .changed()
                {
                    actions.background_changed = true;
                }
            });

            ui.separator();
            sprite_section(ui, state, status);

            ui.separator();
            if text_section(ui, state) {
                actions.rerender_text = true;
            }

            ui.separator();
            audio_section(ui, state, status, &mut actions.audio);

            ui.separator();
            ui.label(format!("FPS: {:.1}", status.fps));
            ui.label(format!("Frame time: {:.2} ms", status.frame_time_ms));
            ui.label(format!("Frame: {}", status.frame_count));
            ui.label(format!("Draw calls: {}", status.draw_calls));
            ui.label(format!("Quads: {}", status.quads));
        });

    actions
}

fn sprite_section(ui: &mut egui::Ui, state: &mut PanelState, status: &PanelStatus) {
    let (sw, sh) = (status.screen.0.max(1) as i32, status.screen.1.max(1) as i32);
    ui.label("Sprite");
    ui.add(egui::Slider::new(&mut state.dest.x, -sw..=sw).text("x"));
    ui.add(egui::Slider::new(&mut state.dest.y, -sh..=sh).text("y"));
    ui.add(egui::Slider::new(&mut state.dest.w, 0..=sw * 2).text("width"));
    ui.add(egui::Slider::new(&mut state.dest.h, 0..=sh * 2).text("height"));

    ui.horizontal(|ui| {
        ui.label("Tint");
        let mut tint = state.tint.to_normalized();
        if ui.color_edit_button_rgba_unmultiplied(&mut tint).changed() {
            state.tint = Color::from_normalized(tint);
        }
    });

    egui::ComboBox::from_label("Flip")
        .selected_text(state.flip.label())
        .show_ui(ui, |ui| {
            for &flip in Flip::ALL {
                ui.selectable_value(&mut state.flip, flip, flip.label());
            }
        });

    let (tw, th) = (status.texture_size.0 as i32, status.texture_size.1 as i32);
    ui.checkbox(&mut state.use_source, "Draw source region");
    ui.add_enabled_ui(state.use_source, |ui| {
        ui.add(egui::Slider::new(&mut state.source.x, 0..=tw).text("src x"));
        ui.add(egui::Slider::new(&mut state.source.y, 0..=th).text("src y"));
        ui.add(egui::Slider::new(&mut state.source.w, 0..=(tw - state.source.x)).text("src width"));
        ui.add(egui::Slider::new(&mut state.source.h, 0..=(th - state.source.y)).text("src height"));
    });
}

/// Returns true when the text needs rendering again.
fn text_section(ui: &mut egui::Ui, state: &mut PanelState) -> bool {
    let mut changed = false;
    ui.label("Text");
    changed |= ui.text_edit_singleline(&mut state.text).changed();

    ui.horizontal(|ui| {
        ui.label("Color");
        let mut color = state.text_color.to_normalized();
        if ui.color_edit_button_rgba_unmultiplied(&mut color).changed() {
            state.text_color = Color::from_normalized(color);
            changed = true;
        }
    });

    let before = state.point_size;
    egui::ComboBox::from_label("Point size")
        .selected_text(state.point_size.to_string())
        .show_ui(ui, |ui| {
            for &size in FONT_POINT_SIZES {
                ui.selectable_value(&mut state.point_size, size, size.to_string());
            }
        });
    changed | (state.point_size != before)
}

fn audio_section(
    ui: &mut egui::Ui,
    state: &mut PanelState,
    status: &PanelStatus,
    commands: &mut Vec<AudioCommand>,
) {
    ui.label(format!("Music: {}", status.music.label()));
    if status.track_ids.is_empty() {
        ui.label("No tracks loaded");
        return;
    }
    state.selected_track = state.selected_track.min(status.track_ids.len() - 1);

    ui.add_enabled_ui(status.music.available, |ui| {
        egui::ComboBox::from_label("Track")
            .selected_text(status.track_ids[state.selected_track].as_str())
            .show_ui(ui, |ui| {
                for (index, id) in status.track_ids.iter().enumerate() {
                    ui.selectable_value(&mut state.selected_track, index, id.as_str());
                }
            });
        ui.add(egui::Slider::new(&mut state.fade_ms, 0..=5000).text("fade ms"));

        ui.horizontal(|ui| {
            if ui.button("Play").clicked() {
                commands.push(AudioCommand::Play {
                    id: status.track_ids[state.selected_track].clone(),
                    fade_in_ms: state.fade_ms,
                });
            }
            if ui.button("Pause").clicked() {
                commands.push(AudioCommand::Pause);
            }
            if ui.button("Resume").clicked() {
                commands.push(AudioCommand::Resume);
            }
            if ui.button("Stop").clicked() {
                commands.push(AudioCommand::Stop);
            }
        });
        ui.horizontal(|ui| {
            if ui.button("Restart").clicked() {
                commands.push(AudioCommand::Restart);
            }
            if ui.button("Rewind").clicked() {
                commands.push(AudioCommand::Rewind);
            }
            if ui.button("Fade out").clicked() {
                commands.push(AudioCommand::FadeOut { ms: state.fade_ms });
            }
        });

        if ui
            .add(egui::Slider::new(&mut state.volume, 0..=status.max_volume).text("volume"))
            .changed()
        {
            commands.push(AudioCommand::SetVolume(state.volume));
        }

        ui.horizontal(|ui| {
            ui.add(egui::Slider::new(&mut state.seek_seconds, 0.0..=600.0).text("seconds"));
            if ui.button("Seek").clicked() {
                commands.push(AudioCommand::SetPosition(state.seek_seconds as f64));
            }
        });
    });
}
