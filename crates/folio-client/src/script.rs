//! Headless scripted runs for automated walkthrough checks.
//!
//! A script is a YAML file of named runs. Each run gets a fresh session,
//! injects input step by step, advances game time and checks expectations.
//! No GPU or window required.

use std::path::Path;

use glam::Vec3;
use serde::Deserialize;
use winit::event::MouseButton;

use crate::menu::MenuAction;
use crate::project_config::FolioConfig;
use crate::session::GameSession;

const FRAME_DT: f32 = 1.0 / 60.0;

#[derive(Debug, Deserialize)]
pub struct ScriptFile {
    pub runs: Vec<ScriptedRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedRun {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One scripted step. Input is applied on the first of `frames` frames.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Step {
    /// Key names to press and hold.
    #[serde(default)]
    pub hold: Vec<String>,
    #[serde(default)]
    pub release: Vec<String>,
    /// Pull the trigger once.
    #[serde(default)]
    pub fire: bool,
    /// Mouse motion in pixels.
    #[serde(default)]
    pub look: Option<[f32; 2]>,
    /// Menu action by name, e.g. `play`, `pause`, `close_popup`.
    #[serde(default)]
    pub action: Option<String>,
    /// Move the player before the frames run.
    #[serde(default)]
    pub teleport: Option<[f32; 3]>,
    #[serde(default = "default_frames")]
    pub frames: u32,
    #[serde(default)]
    pub expect: Option<Expectation>,
}

fn default_frames() -> u32 {
    1
}

/// Checked after the step's frames ran. Every present field must hold.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Expectation {
    /// Dotted event type that must appear in the log.
    #[serde(default)]
    pub event: Option<String>,
    /// Exact number of `event` occurrences. At least one when absent.
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub state: Option<String>,
    /// Name of the open popup.
    #[serde(default)]
    pub popup: Option<String>,
    #[serde(default)]
    pub live_targets: Option<usize>,
    #[serde(default)]
    pub near: Option<[f32; 3]>,
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,
}

fn default_tolerance() -> f32 {
    0.5
}

/// Result of a single scripted run.
#[derive(Debug)]
pub struct RunResult {
    pub name: String,
    pub passed: bool,
    pub error: Option<String>,
    pub game_time: f32,
    pub frames: u64,
}

#[derive(Debug)]
pub enum ScriptError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptError::Io(e) => write!(f, "IO error reading script: {}", e),
            ScriptError::Parse(e) => write!(f, "Failed to parse script: {}", e),
        }
    }
}

pub fn parse_script(contents: &str) -> Result<ScriptFile, ScriptError> {
    serde_yaml::from_str(contents).map_err(ScriptError::Parse)
}

pub fn load_script(path: &Path) -> Result<ScriptFile, ScriptError> {
    let contents = std::fs::read_to_string(path).map_err(ScriptError::Io)?;
    parse_script(&contents)
}

pub fn parse_action(name: &str) -> Option<MenuAction> {
    let action = match name {
        "play" => MenuAction::Play,
        "pause" => MenuAction::Pause,
        "resume" => MenuAction::Resume,
        "menu" => MenuAction::ReturnToMenu,
        "instructions" => MenuAction::ShowInstructions,
        "credits" => MenuAction::ShowCredits,
        "dismiss" => MenuAction::DismissDialog,
        "close_popup" => MenuAction::ClosePopup,
        _ => return None,
    };
    Some(action)
}

/// Drives one session through a run.
pub struct ScriptRunner {
    pub session: GameSession,
}

impl ScriptRunner {
    pub fn new(session: GameSession) -> Self {
        Self { session }
    }

    /// Advance one frame the way the window loop does: per-frame input is
    /// rebuilt first, queued motion lands in the same frame.
    fn step_frame(&mut self, look: Option<[f32; 2]>) {
        self.session.input.begin_frame();
        if let Some([dx, dy]) = look {
            self.session.input.inject_mouse_motion(dx, dy);
        }
        self.session.frame(FRAME_DT);
    }

    pub fn apply(&mut self, step: &Step) -> Result<(), String> {
        for key in &step.hold {
            self.session.input.inject_key_press(key);
        }
        for key in &step.release {
            self.session.input.inject_key_release(key);
        }
        if step.fire {
            self.session.input.inject_mouse_press(MouseButton::Left);
        }
        if let Some(name) = &step.action {
            let action = parse_action(name).ok_or_else(|| format!("Unknown action '{}'", name))?;
            self.session.apply_menu(action);
        }
        if let Some(position) = step.teleport {
            self.session.player.position = Vec3::from(position);
            self.session.player.vertical_velocity = 0.0;
        }

        for frame in 0..step.frames.max(1) {
            let look = if frame == 0 { step.look } else { None };
            self.step_frame(look);
            if frame == 0 && step.fire {
                self.session.input.inject_mouse_release(MouseButton::Left);
            }
        }

        match &step.expect {
            Some(expect) => self.check(expect),
            None => Ok(()),
        }
    }

    pub fn check(&self, expect: &Expectation) -> Result<(), String> {
        let session = &self.session;
        if let Some(event) = &expect.event {
            let seen = session.events.count(|e| e.event_type() == event.as_str());
            match expect.count {
                Some(count) if seen != count => {
                    return Err(format!("expected {} x {}, saw {}", count, event, seen));
                }
                None if seen == 0 => return Err(format!("expected event {}", event)),
                _ => {}
            }
        }
        if let Some(state) = &expect.state {
            let actual = session.menu.state.as_str();
            if actual != state {
                return Err(format!("expected state {}, got {}", state, actual));
            }
        }
        if let Some(popup) = &expect.popup {
            let actual = session.menu.popup.as_ref().map(|p| p.name.as_str());
            if actual != Some(popup.as_str()) {
                return Err(format!("expected popup {}, got {:?}", popup, actual));
            }
        }
        if let Some(live) = expect.live_targets {
            let actual = session.entities.live_count();
            if actual != live {
                return Err(format!("expected {} live targets, got {}", live, actual));
            }
        }
        if let Some(near) = expect.near {
            let distance = session.player.position.distance(Vec3::from(near));
            if distance > expect.tolerance {
                return Err(format!(
                    "player at {} is {:.2} away from {:?}",
                    session.player.position, distance, near
                ));
            }
        }
        Ok(())
    }

    pub fn run(&mut self, run: &ScriptedRun) -> RunResult {
        let mut error = None;
        for (i, step) in run.steps.iter().enumerate() {
            if let Err(e) = self.apply(step) {
                error = Some(format!("step {}: {}", i + 1, e));
                break;
            }
        }
        RunResult {
            name: run.name.clone(),
            passed: error.is_none(),
            error,
            game_time: self.session.elapsed,
            frames: self.session.frame_count,
        }
    }
}

/// Run every scripted run in a file, each in a fresh headless session.
pub fn run_script_file(
    project_root: &Path,
    config: &FolioConfig,
    script_path: &Path,
) -> Result<Vec<RunResult>, ScriptError> {
    let script = load_script(script_path)?;
    println!("Running {} scripted runs...", script.runs.len());

    let mut results = Vec::new();
    for run in &script.runs {
        let session = GameSession::headless(project_root, config.clone(), false);
        let mut runner = ScriptRunner::new(session);
        let result = runner.run(run);
        let status = if result.passed { "OK" } else { "FAIL" };
        println!(
            "  {} {} ({:.1}s game time, {} frames)",
            status, result.name, result.game_time, result.frames
        );
        if let Some(ref err) = result.error {
            println!("    Error: {}", err);
        }
        results.push(result);
    }
    Ok(results)
}
