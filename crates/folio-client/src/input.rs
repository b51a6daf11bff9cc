use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use winit::event::{DeviceEvent, ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Walkthrough actions mapped from physical inputs via input/bindings.yaml.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputBindings {
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub actions: HashMap<String, Vec<InputTrigger>>,
}

/// One physical trigger, written `{ key: W }` or `{ mouse: Left }`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputTrigger {
    Key(String),
    Mouse(String),
}

impl Default for InputBindings {
    fn default() -> Self {
        let key = |name: &str| vec![InputTrigger::Key(name.into())];
        let mut actions = HashMap::new();
        actions.insert("move_forward".into(), key("W"));
        actions.insert("move_backward".into(), key("S"));
        actions.insert("move_left".into(), key("A"));
        actions.insert("move_right".into(), key("D"));
        actions.insert("jump".into(), key("Space"));
        actions.insert("reset_position".into(), key("R"));
        actions.insert("pause".into(), key("Escape"));
        actions.insert("fire".into(), vec![InputTrigger::Mouse("Left".into())]);
        Self { actions }
    }
}

const BINDINGS_FILE: &str = "input/bindings.yaml";

/// Bindings from the project's `input/bindings.yaml`. A missing file means
/// the defaults; an unreadable one is logged and also means the defaults.
pub fn load_bindings(project_root: &Path) -> InputBindings {
    let path = project_root.join(BINDINGS_FILE);
    if !path.exists() {
        tracing::info!("No {}, using default bindings", BINDINGS_FILE);
        return InputBindings::default();
    }
    let parsed = std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|contents| serde_yaml::from_str(&contents).map_err(|e| e.to_string()));
    match parsed {
        Ok(bindings) => {
            tracing::info!("Input bindings from {}", path.display());
            bindings
        }
        Err(e) => {
            tracing::warn!("Ignoring {}: {}", path.display(), e);
            InputBindings::default()
        }
    }
}

/// Key names accepted in bindings and scripts.
pub fn key_name_to_code(name: &str) -> Option<KeyCode> {
    let code = match name {
        "A" => KeyCode::KeyA,
        "C" => KeyCode::KeyC,
        "D" => KeyCode::KeyD,
        "E" => KeyCode::KeyE,
        "I" => KeyCode::KeyI,
        "M" => KeyCode::KeyM,
        "P" => KeyCode::KeyP,
        "Q" => KeyCode::KeyQ,
        "R" => KeyCode::KeyR,
        "S" => KeyCode::KeyS,
        "W" => KeyCode::KeyW,
        "Space" => KeyCode::Space,
        "ShiftLeft" => KeyCode::ShiftLeft,
        "Escape" => KeyCode::Escape,
        "Enter" => KeyCode::Enter,
        "ArrowUp" => KeyCode::ArrowUp,
        "ArrowDown" => KeyCode::ArrowDown,
        "ArrowLeft" => KeyCode::ArrowLeft,
        "ArrowRight" => KeyCode::ArrowRight,
        _ => return None,
    };
    Some(code)
}

fn mouse_name_to_button(name: &str) -> Option<MouseButton> {
    match name {
        "Left" => Some(MouseButton::Left),
        "Right" => Some(MouseButton::Right),
        "Middle" => Some(MouseButton::Middle),
        _ => None,
    }
}

/// Held and fresh state for one kind of button, plus queued synthetic edges.
#[derive(Debug)]
struct Buttons<B> {
    held: HashSet<B>,
    fresh: HashSet<B>,
    queued_down: HashSet<B>,
    queued_up: HashSet<B>,
}

impl<B> Default for Buttons<B> {
    fn default() -> Self {
        Self {
            held: HashSet::new(),
            fresh: HashSet::new(),
            queued_down: HashSet::new(),
            queued_up: HashSet::new(),
        }
    }
}

impl<B: Copy + Eq + Hash> Buttons<B> {
    fn down(&mut self, b: B) {
        if self.held.insert(b) {
            self.fresh.insert(b);
        }
    }

    fn up(&mut self, b: B) {
        self.held.remove(&b);
    }

    /// A release still pending lands first, so the press is a new edge.
    fn queue_down(&mut self, b: B) {
        if self.queued_up.remove(&b) {
            self.up(b);
        }
        self.queued_down.insert(b);
    }

    fn queue_up(&mut self, b: B) {
        self.queued_up.insert(b);
        self.queued_down.remove(&b);
    }

    /// Forget last frame's edges, then apply the queue.
    fn roll(&mut self) {
        self.fresh.clear();
        let down: Vec<B> = self.queued_down.drain().collect();
        for b in down {
            self.down(b);
        }
        let up: Vec<B> = self.queued_up.drain().collect();
        for b in up {
            self.up(b);
        }
    }

    fn release_all(&mut self) {
        self.held.clear();
    }
}

/// Keyboard and mouse state for the current frame.
///
/// Window events land between frames; `begin_frame` runs after each frame,
/// so a press is visible as "just pressed" for exactly one frame.
#[derive(Debug)]
pub struct InputState {
    bindings: InputBindings,
    keys: Buttons<KeyCode>,
    mouse: Buttons<MouseButton>,
    /// Raw motion since the last `begin_frame`.
    motion: Vec2,
}

impl InputState {
    pub fn new(bindings: InputBindings) -> Self {
        Self {
            bindings,
            keys: Buttons::default(),
            mouse: Buttons::default(),
            motion: Vec2::ZERO,
        }
    }

    pub fn begin_frame(&mut self) {
        self.keys.roll();
        self.mouse.roll();
        self.motion = Vec2::ZERO;
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                match event.state {
                    ElementState::Pressed => self.keys.down(code),
                    ElementState::Released => self.keys.up(code),
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => self.mouse.down(*button),
                ElementState::Released => self.mouse.up(*button),
            },
            // Releases that happen while unfocused never arrive.
            WindowEvent::Focused(false) => {
                self.keys.release_all();
                self.mouse.release_all();
            }
            _ => {}
        }
    }

    /// Raw mouse motion. Only meaningful while the cursor is grabbed.
    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.motion += Vec2::new(*dx as f32, *dy as f32);
        }
    }

    fn triggered(&self, action: &str, fresh_only: bool) -> bool {
        let Some(triggers) = self.bindings.actions.get(action) else {
            return false;
        };
        let (keys, mouse) = if fresh_only {
            (&self.keys.fresh, &self.mouse.fresh)
        } else {
            (&self.keys.held, &self.mouse.held)
        };
        triggers.iter().any(|trigger| match trigger {
            InputTrigger::Key(name) => key_name_to_code(name).is_some_and(|c| keys.contains(&c)),
            InputTrigger::Mouse(name) => {
                mouse_name_to_button(name).is_some_and(|b| mouse.contains(&b))
            }
        })
    }

    /// Any trigger of `action` is down.
    pub fn pressed(&self, action: &str) -> bool {
        self.triggered(action, false)
    }

    /// Any trigger of `action` went down this frame.
    pub fn just_pressed(&self, action: &str) -> bool {
        self.triggered(action, true)
    }

    /// Movement axis from the four directional actions, normalized.
    /// `y` is forward, `x` is right.
    pub fn move_axis(&self) -> Vec2 {
        let axis = |neg: &str, pos: &str| {
            (self.pressed(pos) as i32 - self.pressed(neg) as i32) as f32
        };
        Vec2::new(
            axis("move_left", "move_right"),
            axis("move_backward", "move_forward"),
        )
        .normalize_or_zero()
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.motion
    }

    /// A raw key went down this frame, whatever it is bound to.
    pub fn just_pressed_key(&self, code: KeyCode) -> bool {
        self.keys.fresh.contains(&code)
    }

    /// Queue a key press for the next `begin_frame`. Unknown names are ignored.
    pub fn inject_key_press(&mut self, key_name: &str) {
        if let Some(code) = key_name_to_code(key_name) {
            self.keys.queue_down(code);
        }
    }

    pub fn inject_key_release(&mut self, key_name: &str) {
        if let Some(code) = key_name_to_code(key_name) {
            self.keys.queue_up(code);
        }
    }

    pub fn inject_mouse_press(&mut self, button: MouseButton) {
        self.mouse.queue_down(button);
    }

    pub fn inject_mouse_release(&mut self, button: MouseButton) {
        self.mouse.queue_up(button);
    }

    /// Motion for the current frame; cleared by the next `begin_frame`.
    pub fn inject_mouse_motion(&mut self, dx: f32, dy: f32) {
        self.motion += Vec2::new(dx, dy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let bindings = InputBindings::default();
        assert!(bindings.actions.contains_key("move_forward"));
        assert!(bindings.actions.contains_key("reset_position"));
        assert_eq!(
            bindings.actions["fire"],
            vec![InputTrigger::Mouse("Left".into())]
        );
    }

    #[test]
    fn test_bindings_yaml() {
        let yaml = "actions:\n  fire:\n    - mouse: Left\n    - key: E\n  jump:\n    - key: Space\n";
        let bindings: InputBindings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            bindings.actions["fire"],
            vec![
                InputTrigger::Mouse("Left".into()),
                InputTrigger::Key("E".into())
            ]
        );

        let mut state = InputState::new(bindings);
        state.inject_key_press("E");
        state.begin_frame();
        assert!(state.just_pressed("fire"));
    }

    #[test]
    fn test_demo_bindings_load() {
        let demo = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demo");
        let bindings = load_bindings(&demo);
        let forward = &bindings.actions["move_forward"];
        assert!(forward.contains(&InputTrigger::Key("W".into())));
        assert!(forward.contains(&InputTrigger::Key("ArrowUp".into())));
        assert_eq!(
            bindings.actions["fire"],
            vec![InputTrigger::Mouse("Left".into())]
        );

        let mut state = InputState::new(bindings);
        state.inject_key_press("ArrowUp");
        state.begin_frame();
        assert_eq!(state.move_axis(), Vec2::Y);
    }

    #[test]
    fn test_bindings_serialize_as_maps() {
        let yaml = serde_yaml::to_string(&InputBindings::default()).unwrap();
        assert!(yaml.contains("mouse: Left"));
        let back: InputBindings = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.actions["jump"], vec![InputTrigger::Key("Space".into())]);
    }

    #[test]
    fn test_key_name_mapping() {
        assert_eq!(key_name_to_code("W"), Some(KeyCode::KeyW));
        assert_eq!(key_name_to_code("Escape"), Some(KeyCode::Escape));
        assert_eq!(key_name_to_code("Invalid"), None);
    }

    #[test]
    fn test_injected_press_is_just_pressed_for_one_frame() {
        let mut state = InputState::new(InputBindings::default());
        state.inject_key_press("R");
        state.begin_frame();
        assert!(state.just_pressed("reset_position"));
        assert!(state.pressed("reset_position"));

        state.begin_frame();
        assert!(!state.just_pressed("reset_position"));
        assert!(state.pressed("reset_position"));

        state.inject_key_release("R");
        state.begin_frame();
        assert!(!state.pressed("reset_position"));
    }

    #[test]
    fn test_mouse_fire() {
        let mut state = InputState::new(InputBindings::default());
        state.inject_mouse_press(MouseButton::Left);
        state.begin_frame();
        assert!(state.just_pressed("fire"));
    }

    #[test]
    fn test_release_then_press_is_a_new_edge() {
        let mut state = InputState::new(InputBindings::default());
        state.inject_mouse_press(MouseButton::Left);
        state.begin_frame();
        assert!(state.just_pressed("fire"));

        // Release and press again before the next frame.
        state.inject_mouse_release(MouseButton::Left);
        state.inject_mouse_press(MouseButton::Left);
        state.begin_frame();
        assert!(state.just_pressed("fire"));
        assert!(state.pressed("fire"));
    }

    #[test]
    fn test_move_axis_normalized() {
        let mut state = InputState::new(InputBindings::default());
        state.inject_key_press("W");
        state.inject_key_press("D");
        state.begin_frame();

        let axis = state.move_axis();
        assert!(axis.y > 0.0);
        assert!(axis.x > 0.0);
        assert!((axis.length() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_blur_releases_held_keys() {
        let mut state = InputState::new(InputBindings::default());
        state.inject_key_press("W");
        state.begin_frame();
        assert_eq!(state.move_axis(), Vec2::Y);

        state.handle_window_event(&WindowEvent::Focused(false));
        assert_eq!(state.move_axis(), Vec2::ZERO);
    }

    #[test]
    fn test_motion_cleared_each_frame() {
        let mut state = InputState::new(InputBindings::default());
        state.inject_mouse_motion(10.0, -4.0);
        assert_eq!(state.mouse_delta(), Vec2::new(10.0, -4.0));
        state.begin_frame();
        assert_eq!(state.mouse_delta(), Vec2::ZERO);
    }
}
