//! Window shell around a frame-driven experience.
//!
//! The window carries no renderer: it owns the cursor grab, feeds input and
//! mirrors the experience status into the title bar.

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{CursorGrabMode, Window, WindowId};

use crate::input::InputState;
use crate::session::GameSession;
use crate::showcase::Showcase;

/// Anything the window loop can drive one frame at a time.
pub trait Experience {
    fn input_mut(&mut self) -> &mut InputState;
    fn frame(&mut self, dt: f32);
    fn title(&self) -> String;
    /// Whether the cursor should be grabbed and hidden right now.
    fn wants_cursor(&self) -> bool;
}

impl Experience for GameSession {
    fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    fn frame(&mut self, dt: f32) {
        GameSession::frame(self, dt);
    }

    fn title(&self) -> String {
        self.status_line()
    }

    fn wants_cursor(&self) -> bool {
        self.menu.app.cursor_captured
    }
}

impl Experience for Showcase {
    fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    fn frame(&mut self, dt: f32) {
        Showcase::frame(self, dt);
    }

    fn title(&self) -> String {
        self.status_line()
    }

    fn wants_cursor(&self) -> bool {
        false
    }
}

/// Main engine struct implementing winit's ApplicationHandler.
pub struct Engine<E: Experience> {
    pub experience: E,
    window: Option<Arc<Window>>,
    cursor_grabbed: bool,
    last_frame_time: Option<instant::Instant>,
    delta_time: f32,
    title: String,
}

impl<E: Experience> Engine<E> {
    pub fn new(experience: E) -> Self {
        Self {
            experience,
            window: None,
            cursor_grabbed: false,
            last_frame_time: None,
            delta_time: 1.0 / 60.0,
            title: String::new(),
        }
    }

    fn sync_cursor(&mut self) {
        let wanted = self.experience.wants_cursor();
        if wanted == self.cursor_grabbed {
            return;
        }
        let Some(window) = &self.window else {
            return;
        };
        if wanted {
            tracing::info!("Capturing cursor");
            if let Err(e) = window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
            {
                tracing::warn!("Cursor grab failed: {}", e);
            }
            window.set_cursor_visible(false);
        } else {
            tracing::info!("Releasing cursor");
            let _ = window.set_cursor_grab(CursorGrabMode::None);
            window.set_cursor_visible(true);
        }
        self.cursor_grabbed = wanted;
    }

    fn sync_title(&mut self) {
        let title = self.experience.title();
        if title != self.title {
            if let Some(window) = &self.window {
                window.set_title(&title);
            }
            self.title = title;
        }
    }
}

impl<E: Experience> ApplicationHandler for Engine<E> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(self.experience.title())
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        match event_loop.create_window(window_attrs) {
            Ok(window) => {
                tracing::info!("Window created");
                self.window = Some(Arc::new(window));
            }
            Err(e) => {
                tracing::error!("Failed to create window: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        self.experience.input_mut().handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let now = instant::Instant::now();
                if let Some(last) = self.last_frame_time {
                    self.delta_time = now.duration_since(last).as_secs_f32().min(0.1);
                }
                self.last_frame_time = Some(now);

                self.experience.frame(self.delta_time);
                self.sync_cursor();
                self.sync_title();

                self.experience.input_mut().begin_frame();
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        self.experience.input_mut().handle_device_event(&event);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Open a window and drive `experience` until it closes.
pub fn run_windowed<E: Experience>(experience: E) -> Result<E, String> {
    let event_loop = EventLoop::new().map_err(|e| format!("Failed to create event loop: {}", e))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut engine = Engine::new(experience);
    event_loop
        .run_app(&mut engine)
        .map_err(|e| format!("Event loop error: {}", e))?;
    Ok(engine.experience)
}

/// Drive `experience` for a fixed number of frames at a fixed step.
pub fn run_headless<E: Experience>(experience: &mut E, frames: u32, dt: f32) {
    for _ in 0..frames {
        experience.input_mut().begin_frame();
        experience.frame(dt);
    }
    tracing::info!("Headless run finished after {} frames", frames);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::LoadMode;
    use crate::project_config::FolioConfig;

    #[test]
    fn test_headless_showcase_spins() {
        let root = std::env::temp_dir().join("folio_engine_no_assets");
        let mut showcase = Showcase::new(&root, LoadMode::Inline);
        run_headless(&mut showcase, 100, 1.0 / 60.0);
        assert_eq!(showcase.frame_count, 100);
        assert!((showcase.tori[0].rotation.x - 1.0).abs() < 1e-3);
        assert!(!showcase.wants_cursor());
    }

    #[test]
    fn test_headless_session_stays_in_menu() {
        let root = std::env::temp_dir().join("folio_engine_no_assets");
        let mut session = GameSession::headless(&root, FolioConfig::default(), false);
        run_headless(&mut session, 10, 1.0 / 60.0);
        assert_eq!(session.frame_count, 10);
        assert_eq!(session.elapsed, 0.0);
        assert!(!session.wants_cursor());
        assert!(session.title().contains("[menu]"));
    }
}
