use glam::{Quat, Vec3};

/// Transform component. Present on every target container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

/// Convert a 0xRRGGBB literal to linear-ish float RGB.
pub fn rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

/// Display name of a target. Also the key into the project catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetName(pub String);

/// Integer hit points with one-shot death and unlock latches.
#[derive(Debug, Clone, PartialEq)]
pub struct Health {
    pub current: i32,
    pub dead: bool,
    pub unlocked: bool,
}

impl Health {
    pub fn new(max: i32) -> Self {
        Self {
            current: max,
            dead: false,
            unlocked: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.dead && self.current > 0
    }

    /// Health as shown to the player, never below zero.
    pub fn display(&self) -> i32 {
        self.current.max(0)
    }

    /// Subtract `amount`. Returns true when this hit is the one that kills.
    /// Hits on an already dead target are ignored.
    pub fn apply_damage(&mut self, amount: i32) -> bool {
        if self.dead {
            return false;
        }
        self.current -= amount;
        if self.current <= 0 {
            self.dead = true;
            return true;
        }
        false
    }

    /// Latch the unlock flag. True exactly once, after health reached zero.
    pub fn take_unlock(&mut self) -> bool {
        if self.current > 0 || self.unlocked {
            return false;
        }
        self.unlocked = true;
        self.dead = true;
        true
    }
}

/// Sinusoidal idle bob applied to a container every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatBob {
    pub phase: f32,
    pub speed: f32,
}

/// Per-frame vertical step of the bob, in world units.
pub const BOB_AMPLITUDE: f32 = 0.002;

impl FloatBob {
    pub fn step(&self, elapsed_secs: f32) -> f32 {
        (self.phase + elapsed_secs * self.speed).sin() * BOB_AMPLITUDE
    }
}

/// Runtime state of one material slot on a target's visual model.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialState {
    /// Snapshot taken at spawn, used to undo hit flashes.
    pub base_color: [f32; 3],
    pub color: [f32; 3],
    pub opacity: f32,
}

impl MaterialState {
    pub fn new(color: [f32; 3]) -> Self {
        Self {
            base_color: color,
            color,
            opacity: 1.0,
        }
    }
}

/// Where a visual model came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    Gltf { path: String },
    FallbackBox,
}

/// Visual model of a target: one entry per material slot.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualModel {
    pub source: ModelSource,
    pub materials: Vec<MaterialState>,
}

impl VisualModel {
    pub fn fallback_box(color: [f32; 3]) -> Self {
        Self {
            source: ModelSource::FallbackBox,
            materials: vec![MaterialState::new(color)],
        }
    }

    pub fn flash(&mut self, color: [f32; 3]) {
        for mat in &mut self.materials {
            mat.color = color;
        }
    }

    pub fn restore_colors(&mut self) {
        for mat in &mut self.materials {
            mat.color = mat.base_color;
        }
    }

    /// Lower every material's opacity by `amount`, clamping at zero.
    pub fn fade(&mut self, amount: f32) {
        for mat in &mut self.materials {
            mat.opacity = (mat.opacity - amount).max(0.0);
        }
    }

    /// Highest opacity across all slots. A model without materials counts as gone.
    pub fn opacity(&self) -> f32 {
        self.materials
            .iter()
            .map(|m| m.opacity)
            .fold(0.0, f32::max)
    }

    pub fn is_fully_transparent(&self) -> bool {
        self.materials.iter().all(|m| m.opacity <= 0.0)
    }
}

/// Floating text label that turns to face the camera.
#[derive(Debug, Clone, PartialEq)]
pub struct Billboard {
    pub text: String,
    /// Offset from the container origin.
    pub offset: Vec3,
    pub yaw: f32,
    pub opacity: f32,
}

impl Billboard {
    pub fn new(text: &str, offset: Vec3) -> Self {
        Self {
            text: text.to_string(),
            offset,
            yaw: 0.0,
            opacity: 1.0,
        }
    }

    /// Turn around the vertical axis so the label's front faces `camera`.
    pub fn face(&mut self, label_world: Vec3, camera: Vec3) {
        let to_camera = camera - label_world;
        if to_camera.x.abs() > f32::EPSILON || to_camera.z.abs() > f32::EPSILON {
            self.yaw = to_camera.x.atan2(to_camera.z);
        }
    }
}
