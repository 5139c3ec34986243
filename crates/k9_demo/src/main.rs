//! K9 sprite demo: one textured sprite, a line of text, music, and an egui
//! panel to poke at all of them.
//!
//! winit drives the loop through `ApplicationHandler` with `ControlFlow::Poll`.
//! Each `RedrawRequested` runs one variable-step frame:
//!
//!   1. tick the clock and advance music fades
//!   2. run the panel UI and apply what the user changed
//!   3. record the sprite, region and text draws
//!   4. present, compositing the panel on top of the sprites

use std::sync::Arc;

use anyhow::Context as _;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use k9_audio::{MusicLibrary, MusicPlayer, PlayCount};
use k9_core::{AppConfig, Color, Flip, FrameClock, Rect};
use k9_devtools::{AudioCommand, DevPanel, MusicStatus, PanelActions, PanelState, PanelStatus};
use k9_platform::window::PlatformConfig;
use k9_render::texture::checkerboard;
use k9_render::{Font, Renderer2D, RendererConfig, Texture};

/// Gap between the full sprite and its source-region copy, and the text margin.
const LAYOUT_MARGIN: i32 = 16;

// Fields drop top to bottom: the reverse of the order `new` creates them.
struct DemoState {
    panel_state: PanelState,
    clock: FrameClock,
    music: MusicPlayer,
    text_texture: Option<Texture>,
    font: Option<Font>,
    sprite: Texture,
    panel: DevPanel,
    renderer: Renderer2D,
    window: Arc<Window>,
}

impl DemoState {
    fn new(window: Arc<Window>, config: &AppConfig) -> anyhow::Result<Self> {
        let mut renderer = Renderer2D::new(
            window.clone(),
            &RendererConfig {
                vsync: config.window.vsync,
                shader_path: config.assets.shader.clone(),
            },
        )
        .context("failed to initialise the renderer")?;

        let panel = DevPanel::new(renderer.device(), renderer.surface_format(), &window);

        let sprite = match renderer.load_texture(&config.assets.sprite_texture) {
            Ok(texture) => texture,
            Err(err) => {
                log::warn!("{err}; drawing a checkerboard instead");
                renderer.texture_from_image(&checkerboard(256, 32), "checkerboard")
            }
        };

        let font = match Font::load(&config.assets.font) {
            Ok(font) => Some(font),
            Err(err) => {
                log::warn!("{err}; text rendering is disabled");
                None
            }
        };

        let library = match MusicLibrary::load(&config.assets.music_manifest) {
            Ok(library) => library,
            Err(err) => {
                log::warn!("{err}; music is disabled");
                MusicLibrary::empty()
            }
        };
        let mut music = MusicPlayer::new(library, config.audio.initial_volume);
        if let Some(id) = &config.audio.autoplay {
            if let Err(err) = music.play(id, PlayCount::Forever, 0) {
                log::warn!("Autoplay of '{id}' failed: {err}");
            }
        }

        let panel_state = PanelState {
            dest: Rect::new(0, 0, 200, 200),
            flip: Flip::Vertical,
            source: Rect::new(0, 0, (sprite.width / 2) as i32, (sprite.height / 2) as i32),
            text: config.text.content.clone(),
            point_size: config.text.point_size,
            volume: music.volume(),
            ..Default::default()
        };
        renderer.set_background_color(panel_state.background);

        let mut state = Self {
            panel_state,
            clock: FrameClock::new(),
            music,
            text_texture: None,
            font,
            sprite,
            panel,
            renderer,
            window,
        };
        state.rerender_text();
        Ok(state)
    }

    fn rerender_text(&mut self) {
        self.text_texture = None;
        let Some(font) = &self.font else {
            return;
        };
        if self.panel_state.text.is_empty() {
            return;
        }
        match self.renderer.render_text(
            font,
            &self.panel_state.text,
            self.panel_state.text_color,
            self.panel_state.point_size,
        ) {
            Ok(texture) => self.text_texture = Some(texture),
            Err(err) => log::warn!("Text render failed: {err}"),
        }
    }

    fn panel_status(&self) -> PanelStatus {
        let stats = self.renderer.stats();
        PanelStatus {
            fps: self.clock.smoothed_fps as f32,
            frame_time_ms: self.clock.smoothed_frame_time_ms as f32,
            frame_count: self.clock.frame_count,
            draw_calls: stats.draw_calls,
            quads: stats.quads,
            screen: self.renderer.surface_size(),
            texture_size: self.sprite.size(),
            track_ids: self.music.track_ids(),
            music: MusicStatus {
                available: self.music.is_available(),
                playing: self.music.is_playing(),
                paused: self.music.is_paused(),
                fading_in: self.music.is_fading_in(),
                fading_out: self.music.is_fading_out(),
            },
            max_volume: self.music.max_volume(),
        }
    }

    fn apply_actions(&mut self, actions: PanelActions) {
        if actions.background_changed {
            self.renderer
                .set_background_color(self.panel_state.background);
        }
        if actions.rerender_text {
            self.rerender_text();
        }
        for command in actions.audio {
            apply_audio_command(&mut self.music, command);
        }
    }

    fn draw_scene(&mut self) {
        let state = &self.panel_state;
        self.renderer
            .draw_texture(&self.sprite, state.dest, state.tint, state.flip);

        if state.use_source {
            self.renderer.draw_texture_region(
                &self.sprite,
                state.source,
                region_dest(state.dest, state.source),
                state.tint,
                state.flip,
            );
        }

        if let Some(text) = &self.text_texture {
            let (_, screen_h) = self.renderer.surface_size();
            self.renderer.draw_texture(
                text,
                text_dest(screen_h, text.size()),
                Color::WHITE,
                Flip::None,
            );
        }
    }

    fn redraw(&mut self) {
        let (w, h) = self.renderer.surface_size();
        if w == 0 || h == 0 {
            return;
        }

        self.clock.begin_frame();
        self.music.update(self.clock.dt() as f32);

        // No surface texture, no UI pass either.
        if !self.renderer.begin_frame() {
            return;
        }

        let status = self.panel_status();
        let (primitives, actions) = self
            .panel
            .prepare(&self.window, &mut self.panel_state, &status);
        self.apply_actions(actions);
        self.draw_scene();

        let panel = &mut self.panel;
        self.renderer.end_frame(|target| {
            panel.render(
                target.device,
                target.queue,
                target.encoder,
                target.view,
                target.size_in_pixels,
                &primitives,
            );
        });
    }
}

fn apply_audio_command(music: &mut MusicPlayer, command: AudioCommand) {
    let result = match command {
        AudioCommand::Play { id, fade_in_ms } => music.play(&id, PlayCount::Forever, fade_in_ms),
        AudioCommand::Pause => {
            music.pause();
            Ok(())
        }
        AudioCommand::Resume => {
            music.resume();
            Ok(())
        }
        AudioCommand::Stop => {
            music.stop();
            Ok(())
        }
        AudioCommand::Restart => music.restart(),
        AudioCommand::Rewind => music.rewind(),
        AudioCommand::FadeOut { ms } => {
            if !music.fade_out(ms) {
                log::debug!("Fade out requested with no music playing");
            }
            Ok(())
        }
        AudioCommand::SetVolume(volume) => {
            music.set_volume(volume);
            Ok(())
        }
        AudioCommand::SetPosition(seconds) => music.set_position(seconds),
    };
    if let Err(err) = result {
        log::error!("Music: {err}");
    }
}

/// The region copy sits right of the full sprite at its native texel size.
fn region_dest(dest: Rect, source: Rect) -> Rect {
    Rect::new(dest.right() + LAYOUT_MARGIN, dest.y, source.w, source.h)
}

/// Text is pinned to the bottom-left corner.
fn text_dest(screen_height: u32, (w, h): (u32, u32)) -> Rect {
    Rect::new(
        LAYOUT_MARGIN,
        screen_height as i32 - h as i32 - LAYOUT_MARGIN,
        w as i32,
        h as i32,
    )
}

struct App {
    config: AppConfig,
    state: Option<DemoState>,
}

impl App {
    fn new(config: AppConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let platform = PlatformConfig {
            title: self.config.window.title.clone(),
            width: self.config.window.width,
            height: self.config.window.height,
            resizable: true,
        };
        let window = match k9_platform::window::create_window(event_loop, &platform) {
            Ok(window) => window,
            Err(err) => {
                log::error!("Failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };
        log::info!("Window created: {}x{}", platform.width, platform.height);

        match DemoState::new(window, &self.config) {
            Ok(state) => self.state = Some(state),
            Err(err) => {
                log::error!("{err:#}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
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

        let egui_consumed = state.panel.handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.renderer.resize(w, h);
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Escape) => {
                        log::info!("Escape pressed, exiting.");
                        event_loop.exit();
                    }
                    PhysicalKey::Code(KeyCode::F1) => state.panel.toggle(),
                    _ => {}
                }
            }

            WindowEvent::RedrawRequested => state.redraw(),

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = self.state.take() {
            log::info!("Shutting down after {} frames", state.clock.frame_count);
        }
    }
}

fn main() -> anyhow::Result<()> {
    let config_path = AppConfig::resolve_path(std::env::args().nth(1));
    let loaded = AppConfig::load_or_default(&config_path);
    let filter = loaded
        .as_ref()
        .map(|config| config.log_filter.clone())
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let config = loaded
        .with_context(|| format!("failed to load config {}", config_path.display()))?;

    log::info!("K9 sprite demo starting...");

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app).context("event loop error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_copy_sits_right_of_sprite() {
        let dest = Rect::new(10, 20, 200, 200);
        let source = Rect::new(32, 32, 64, 48);
        assert_eq!(region_dest(dest, source), Rect::new(226, 20, 64, 48));
    }

    #[test]
    fn text_is_pinned_bottom_left() {
        assert_eq!(text_dest(720, (300, 40)), Rect::new(16, 664, 300, 40));
    }

    #[test]
    fn audio_commands_on_headless_player_do_not_panic() {
        let mut music = MusicPlayer::headless(MusicLibrary::empty(), 64);
        apply_audio_command(&mut music, AudioCommand::SetVolume(100));
        assert_eq!(music.volume(), 100);
        apply_audio_command(&mut music, AudioCommand::SetVolume(500));
        assert_eq!(music.volume(), 100);
        apply_audio_command(
            &mut music,
            AudioCommand::Play {
                id: "missing".to_string(),
                fade_in_ms: 0,
            },
        );
        apply_audio_command(&mut music, AudioCommand::FadeOut { ms: 500 });
        apply_audio_command(&mut music, AudioCommand::SetPosition(3.0));
        assert!(!music.is_playing());
    }
}
