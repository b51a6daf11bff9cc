//! Standalone material showcase: three spinning tori under an orbit camera.

use std::path::Path;

use glam::{Vec2, Vec3};

use crate::assets::{AssetError, AssetLoader, LoadMode, LoadedAsset};
use crate::input::{InputBindings, InputState};

/// Radians added to each axis of a loaded torus every frame.
pub const SPIN_PER_FRAME: f32 = 0.01;

const ORBIT_SENSITIVITY: f32 = 0.005;
const ZOOM_SPEED: f32 = 20.0;
const MIN_DISTANCE: f32 = 5.0;
const MAX_DISTANCE: f32 = 200.0;

/// Ring radius, tube radius, radial and tubular segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorusGeometry {
    pub radius: f32,
    pub tube: f32,
    pub radial_segments: u32,
    pub tubular_segments: u32,
}

impl Default for TorusGeometry {
    fn default() -> Self {
        Self {
            radius: 10.0,
            tube: 3.0,
            radial_segments: 16,
            tubular_segments: 100,
        }
    }
}

impl TorusGeometry {
    pub fn vertex_count(&self) -> u32 {
        (self.radial_segments + 1) * (self.tubular_segments + 1)
    }

    pub fn triangle_count(&self) -> u32 {
        self.radial_segments * self.tubular_segments * 2
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TorusMaterial {
    Flat { color: u32 },
    Bump { map: String, color: u32, bump_scale: f32 },
    Textured { map: String },
}

impl TorusMaterial {
    /// Image this material needs before the torus can be shown.
    pub fn image(&self) -> Option<&str> {
        match self {
            Self::Flat { .. } => None,
            Self::Bump { map, .. } | Self::Textured { map } => Some(map.as_str()),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Flat { .. } => "flat",
            Self::Bump { .. } => "bump",
            Self::Textured { .. } => "textured",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Torus {
    pub material: TorusMaterial,
    pub position: Vec3,
    /// Euler rotation around x and y.
    pub rotation: Vec2,
    /// In the scene. Image-backed tori join once their image loads.
    pub visible: bool,
    pub texture_size: Option<(u32, u32)>,
}

impl Torus {
    fn new(material: TorusMaterial, x: f32) -> Self {
        let visible = material.image().is_none();
        Self {
            material,
            position: Vec3::new(x, 0.0, 0.0),
            rotation: Vec2::ZERO,
            visible,
            texture_size: None,
        }
    }
}

/// The three tori of the showcase, left to right.
pub fn default_tori() -> Vec<Torus> {
    vec![
        Torus::new(TorusMaterial::Flat { color: 0xffff00 }, -30.0),
        Torus::new(
            TorusMaterial::Bump {
                map: "assets/images/grave.jpeg".to_string(),
                color: 0xaaaaaa,
                bump_scale: 0.5,
            },
            0.0,
        ),
        Torus::new(
            TorusMaterial::Textured {
                map: "assets/images/wood.jpeg".to_string(),
            },
            30.0,
        ),
    ]
}

/// Camera circling a fixed point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl OrbitCamera {
    pub fn looking_at(eye: Vec3, target: Vec3) -> Self {
        let offset = eye - target;
        let distance = offset.length().max(MIN_DISTANCE);
        Self {
            target,
            distance,
            yaw: offset.x.atan2(offset.z),
            pitch: (offset.y / distance).clamp(-1.0, 1.0).asin(),
        }
    }

    pub fn position(&self) -> Vec3 {
        let horizontal = self.distance * self.pitch.cos();
        self.target
            + Vec3::new(
                horizontal * self.yaw.sin(),
                self.distance * self.pitch.sin(),
                horizontal * self.yaw.cos(),
            )
    }

    pub fn orbit(&mut self, delta: Vec2) {
        self.yaw -= delta.x * ORBIT_SENSITIVITY;
        let limit = std::f32::consts::FRAC_PI_2 - 0.01;
        self.pitch = (self.pitch + delta.y * ORBIT_SENSITIVITY).clamp(-limit, limit);
    }

    /// Positive moves closer.
    pub fn zoom(&mut self, amount: f32) {
        self.distance = (self.distance - amount).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }
}

pub struct Showcase {
    pub tori: Vec<Torus>,
    pub geometry: TorusGeometry,
    pub camera: OrbitCamera,
    pub input: InputState,
    pub frame_count: u64,
    loader: AssetLoader<usize>,
}

impl Showcase {
    pub fn new(project_root: &Path, load_mode: LoadMode) -> Self {
        let tori = default_tori();
        let mut loader = AssetLoader::new(project_root, load_mode);
        for (index, torus) in tori.iter().enumerate() {
            if let Some(image) = torus.material.image() {
                loader.request_image(index, image);
            }
        }
        Self {
            tori,
            geometry: TorusGeometry::default(),
            camera: OrbitCamera::looking_at(Vec3::new(0.0, 20.0, 50.0), Vec3::ZERO),
            input: InputState::new(InputBindings::default()),
            frame_count: 0,
            loader,
        }
    }

    fn on_image(&mut self, index: usize, result: Result<LoadedAsset, AssetError>) {
        let Some(torus) = self.tori.get_mut(index) else {
            return;
        };
        match result {
            Ok(LoadedAsset::Image { width, height }) => {
                tracing::info!(
                    "Torus {} ready ({}, {}x{})",
                    index,
                    torus.material.label(),
                    width,
                    height
                );
                torus.texture_size = Some((width, height));
                torus.visible = true;
            }
            Ok(LoadedAsset::Model(_)) => tracing::warn!("Torus {} texture is not an image", index),
            Err(e) => tracing::warn!("Torus {} texture failed: {}", index, e),
        }
    }

    /// Drag with the fire button to orbit, forward/backward to zoom.
    pub fn frame(&mut self, dt: f32) {
        for (index, result) in self.loader.poll() {
            self.on_image(index, result);
        }

        if self.input.pressed("fire") {
            self.camera.orbit(self.input.mouse_delta());
        }
        let zoom = self.input.move_axis().y;
        if zoom != 0.0 {
            self.camera.zoom(zoom * ZOOM_SPEED * dt);
        }

        for torus in self.tori.iter_mut().filter(|t| t.visible) {
            torus.rotation += Vec2::splat(SPIN_PER_FRAME);
        }
        self.frame_count += 1;
    }

    pub fn visible_count(&self) -> usize {
        self.tori.iter().filter(|t| t.visible).count()
    }

    pub fn status_line(&self) -> String {
        let eye = self.camera.position();
        format!(
            "showcase: {}/{} tori | camera {:.1} {:.1} {:.1}",
            self.visible_count(),
            self.tori.len(),
            eye.x,
            eye.y,
            eye.z
        )
    }

    /// One line per torus for headless runs.
    pub fn summary(&self) -> Vec<String> {
        self.tori
            .iter()
            .map(|t| {
                format!(
                    "{:>8} at x={:>5.1} {} rotation ({:.2}, {:.2})",
                    t.material.label(),
                    t.position.x,
                    if t.visible { "shown " } else { "hidden" },
                    t.rotation.x,
                    t.rotation.y
                )
            })
            .collect()
    }
}
