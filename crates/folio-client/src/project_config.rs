//! folio.yaml project configuration parsing.
//!
//! Every section has defaults, so a project without a `folio.yaml` runs the
//! stock walkthrough with its built-in asset paths and targets.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::projects::ProjectDef;

pub const CONFIG_FILE: &str = "folio.yaml";

#[derive(Debug, Clone, Deserialize)]
pub struct FolioConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub assets: AssetPaths,
    #[serde(default = "default_targets")]
    pub targets: Vec<TargetDef>,
    /// Popup content per target name. Empty means the built-in catalog.
    #[serde(default)]
    pub projects: Vec<ProjectDef>,
    #[serde(default)]
    pub player: PlayerTuning,
    #[serde(default)]
    pub save: SaveConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub events: EventsConfig,
    /// Seed for the idle-animation RNG. Random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
            assets: AssetPaths::default(),
            targets: default_targets(),
            projects: Vec::new(),
            player: PlayerTuning::default(),
            save: SaveConfig::default(),
            audio: AudioConfig::default(),
            events: EventsConfig::default(),
            seed: None,
        }
    }
}

fn default_name() -> String {
    "portafolio".to_string()
}

fn default_version() -> String {
    "0.1.0".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetPaths {
    #[serde(default = "default_world_model")]
    pub world: String,
    #[serde(default = "default_weapon_model")]
    pub weapon: String,
    #[serde(default = "default_target_model")]
    pub target: String,
    #[serde(default = "default_decor")]
    pub decor: Vec<DecorDef>,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            world: default_world_model(),
            weapon: default_weapon_model(),
            target: default_target_model(),
            decor: default_decor(),
        }
    }
}

fn default_world_model() -> String {
    "models/assets/mapacity1.glb".to_string()
}

fn default_weapon_model() -> String {
    "models/weapon.glb".to_string()
}

fn default_target_model() -> String {
    "models/assets/pj1.glb".to_string()
}

/// A textured panel placed in the world for decoration.
#[derive(Debug, Clone, Deserialize)]
pub struct DecorDef {
    pub image: String,
    pub position: [f32; 3],
    #[serde(default = "default_decor_size")]
    pub size: [f32; 2],
}

fn default_decor_size() -> [f32; 2] {
    [5.0, 3.0]
}

fn default_decor() -> Vec<DecorDef> {
    vec![
        DecorDef {
            image: "models/textures/2.png".to_string(),
            position: [-1.0, -1.0, -4.0],
            size: default_decor_size(),
        },
        DecorDef {
            image: "models/textures/dumie.png".to_string(),
            position: [4.0, -1.0, -2.0],
            size: default_decor_size(),
        },
    ]
}

/// One shootable target in the declared spawn list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TargetDef {
    pub name: String,
    pub position: [f32; 3],
    #[serde(default = "default_scale")]
    pub scale: f32,
}

fn default_scale() -> f32 {
    1.0
}

pub fn default_targets() -> Vec<TargetDef> {
    let def = |name: &str, position: [f32; 3]| TargetDef {
        name: name.to_string(),
        position,
        scale: 1.0,
    };
    vec![
        def("proyecto de modelado 3d", [22.0, -5.5, 0.0]),
        def("skills: ", [9.0, -5.5, -19.0]),
        def("HOJA DE VIDA", [11.0, -5.5, -43.0]),
        def("MERITOS", [25.0, -5.5, -37.0]),
        def("proyecto audiovisual", [19.0, -3.0, -12.0]),
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerTuning {
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    #[serde(default = "default_jump_force")]
    pub jump_force: f32,
    #[serde(default = "default_height")]
    pub height: f32,
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default = "default_sensitivity")]
    pub mouse_sensitivity: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            gravity: default_gravity(),
            jump_force: default_jump_force(),
            height: default_height(),
            radius: default_radius(),
            mouse_sensitivity: default_sensitivity(),
        }
    }
}

fn default_speed() -> f32 {
    6.0
}

fn default_gravity() -> f32 {
    -20.0
}

fn default_jump_force() -> f32 {
    8.0
}

fn default_height() -> f32 {
    0.8
}

fn default_radius() -> f32 {
    0.5
}

fn default_sensitivity() -> f32 {
    0.002
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveConfig {
    /// Key-value store file, relative to the project root.
    #[serde(default = "default_save_file")]
    pub file: String,
    #[serde(default = "default_autosave")]
    pub autosave_secs: f32,
    #[serde(default = "default_watchdog")]
    pub watchdog_secs: f32,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            file: default_save_file(),
            autosave_secs: default_autosave(),
            watchdog_secs: default_watchdog(),
        }
    }
}

fn default_save_file() -> String {
    "save.json".to_string()
}

fn default_autosave() -> f32 {
    10.0
}

fn default_watchdog() -> f32 {
    2.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_music")]
    pub music: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            music: default_music(),
            volume: default_volume(),
        }
    }
}

fn default_music() -> String {
    "src/audio/music.mp3".to_string()
}

fn default_volume() -> f32 {
    0.3
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    /// JSON-lines event log, relative to the project root.
    #[serde(default)]
    pub log_file: Option<String>,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
            log_file: None,
        }
    }
}

fn default_log_capacity() -> usize {
    1000
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error reading {}: {}", CONFIG_FILE, e),
            ConfigError::Parse(e) => write!(f, "Failed to parse {}: {}", CONFIG_FILE, e),
        }
    }
}

/// Walk up from `start_dir` looking for `folio.yaml`.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = start_dir.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Load and parse a `folio.yaml` file.
pub fn load_config(path: &Path) -> Result<FolioConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<FolioConfig, ConfigError> {
    if contents.trim().is_empty() {
        return Ok(FolioConfig::default());
    }
    serde_yaml::from_str(contents).map_err(ConfigError::Parse)
}

/// Resolve the project root and its configuration.
///
/// Looks for `folio.yaml` in `project_dir` and its parents; without one the
/// directory itself is the root and every setting takes its default.
pub fn resolve_project(project_dir: &Path) -> Result<(PathBuf, FolioConfig), ConfigError> {
    match find_config(project_dir) {
        Some(config_path) => {
            let root = config_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| project_dir.to_path_buf());
            let config = load_config(&config_path)?;
            tracing::info!("Loaded project: {} v{}", config.name, config.version);
            Ok((root, config))
        }
        None => {
            tracing::info!(
                "No {} found under {}, using defaults",
                CONFIG_FILE,
                project_dir.display()
            );
            Ok((project_dir.to_path_buf(), FolioConfig::default()))
        }
    }
}
