//! First-person player: movement, gravity, ground snapping and the
//! safe-spawn logic around saved positions.

use glam::{Mat4, Quat, Vec2, Vec3};

use crate::physics::CollisionWorld;
use crate::project_config::PlayerTuning;
use crate::storage::SavedPosition;

/// Below this height the watchdog puts the player back on safe ground.
pub const FALLOUT_Y: f32 = -20.0;
/// Positions are only persisted while strictly inside this band.
pub const SAVE_MIN_Y: f32 = -10.0;
pub const SAVE_MAX_Y: f32 = 100.0;
/// The safety probe looks this far down...
pub const SAFETY_PROBE_REACH: f32 = 10.0;
/// ...and accepts ground no further than this.
pub const SAFE_GROUND_DISTANCE: f32 = 5.0;
/// Extra reach of the per-frame ground probe beyond standing height.
pub const GROUND_SNAP_MARGIN: f32 = 0.1;

/// How a saved position was applied at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RestoreOutcome {
    /// Nothing stored. The player keeps the current spawn.
    NoSave,
    /// The stored pose passed the safety check and was applied as-is.
    Restored(Vec3),
    /// The stored position was unsafe; a candidate spawn was used instead.
    Substituted(Vec3),
}

pub struct PlayerController {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub vertical_velocity: f32,
    pub grounded: bool,
    tuning: PlayerTuning,
}

impl PlayerController {
    pub fn new(tuning: PlayerTuning) -> Self {
        let position = Vec3::new(0.0, tuning.height, 5.0);
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            vertical_velocity: 0.0,
            grounded: false,
            tuning,
        }
    }

    /// Hardcoded spawn used when no candidate has ground under it.
    pub fn default_spawn(&self) -> Vec3 {
        Vec3::new(0.0, self.tuning.height, 5.0)
    }

    /// Candidate spawns in the order they are tried, after the current one.
    pub fn spawn_candidates(&self) -> [Vec3; 5] {
        let h = self.tuning.height;
        [
            Vec3::new(0.0, h, 5.0),
            Vec3::new(5.0, h, 5.0),
            Vec3::new(-5.0, h, 5.0),
            Vec3::new(0.0, h, 10.0),
            Vec3::new(0.0, h, 0.0),
        ]
    }

    /// Apply raw mouse motion. Callers only feed motion while the cursor is captured.
    pub fn look(&mut self, mouse_delta: Vec2) {
        let s = self.tuning.mouse_sensitivity;
        self.yaw -= mouse_delta.x * s;
        self.pitch = (self.pitch - mouse_delta.y * s)
            .clamp(-std::f32::consts::FRAC_PI_2, std::f32::consts::FRAC_PI_2);
    }

    /// Start a jump if standing on ground.
    pub fn jump(&mut self) -> bool {
        if !self.grounded {
            return false;
        }
        self.vertical_velocity = self.tuning.jump_force;
        self.grounded = false;
        true
    }

    /// One frame of movement. `move_axis.y` is forward, `move_axis.x` is right.
    pub fn update(&mut self, dt: f32, move_axis: Vec2, collision: &CollisionWorld) {
        self.vertical_velocity += self.tuning.gravity * dt;

        let local = Vec3::new(move_axis.x, 0.0, -move_axis.y).normalize_or_zero();
        let step = Quat::from_rotation_y(self.yaw) * local * self.tuning.speed * dt;
        if step != Vec3::ZERO && !self.is_blocked(self.position + step, collision) {
            self.position += step;
        }

        self.position.y += self.vertical_velocity * dt;
        self.check_ground(collision);
    }

    /// Probe forward, back, left and right of `future`, relative to yaw.
    fn is_blocked(&self, future: Vec3, collision: &CollisionWorld) -> bool {
        let yaw = Quat::from_rotation_y(self.yaw);
        let radius = self.tuning.radius;
        [Vec3::NEG_Z, Vec3::Z, Vec3::NEG_X, Vec3::X]
            .into_iter()
            .any(|dir| {
                collision
                    .raycast_surfaces(future, yaw * dir, radius)
                    .is_some_and(|hit| hit.distance < radius)
            })
    }

    fn check_ground(&mut self, collision: &CollisionWorld) {
        let reach = self.tuning.height + GROUND_SNAP_MARGIN;
        match collision.raycast_surfaces(self.position, Vec3::NEG_Y, reach) {
            Some(hit) if hit.distance <= reach => {
                self.grounded = true;
                self.vertical_velocity = 0.0;
                self.position.y = hit.point.y + self.tuning.height;
            }
            _ => self.grounded = false,
        }
    }

    /// Ground within [`SAFE_GROUND_DISTANCE`] straight below `position`.
    pub fn is_position_safe(collision: &CollisionWorld, position: Vec3) -> bool {
        collision
            .raycast_surfaces(position, Vec3::NEG_Y, SAFETY_PROBE_REACH)
            .is_some_and(|hit| hit.distance <= SAFE_GROUND_DISTANCE)
    }

    /// First safe position among `current` and the fixed candidates,
    /// else the default spawn.
    pub fn find_safe_position(&self, collision: &CollisionWorld, current: Vec3) -> Vec3 {
        let found = std::iter::once(current)
            .chain(self.spawn_candidates())
            .find(|&pos| Self::is_position_safe(collision, pos));
        match found {
            Some(pos) => {
                tracing::info!("Safe position found: {}", pos);
                pos
            }
            None => {
                tracing::warn!("No safe position found, using default spawn");
                self.default_spawn()
            }
        }
    }

    /// Put the player back on safe ground with a neutral view.
    pub fn reset(&mut self, collision: &CollisionWorld) -> Vec3 {
        let safe = self.find_safe_position(collision, self.default_spawn());
        self.position = safe;
        self.yaw = 0.0;
        self.pitch = 0.0;
        self.vertical_velocity = 0.0;
        tracing::info!("Player reset to {}", safe);
        safe
    }

    /// Apply a stored pose, re-validating it against the current world.
    pub fn restore(&mut self, saved: Option<SavedPosition>, collision: &CollisionWorld) -> RestoreOutcome {
        let Some(saved) = saved else {
            return RestoreOutcome::NoSave;
        };
        let stored = Vec3::new(saved.x, saved.y, saved.z);
        self.vertical_velocity = 0.0;
        if Self::is_position_safe(collision, stored) {
            self.position = stored;
            self.yaw = saved.rotation_y;
            self.pitch = saved
                .pitch
                .clamp(-std::f32::consts::FRAC_PI_2, std::f32::consts::FRAC_PI_2);
            tracing::info!("Restored saved position {}", stored);
            RestoreOutcome::Restored(stored)
        } else {
            tracing::warn!("Saved position {} is not safe, looking for another", stored);
            let safe = self.find_safe_position(collision, stored);
            self.position = safe;
            self.yaw = 0.0;
            self.pitch = 0.0;
            RestoreOutcome::Substituted(safe)
        }
    }

    pub fn is_fallen(&self) -> bool {
        self.position.y < FALLOUT_Y
    }

    /// Whether the current position is plausible enough to persist.
    pub fn is_saveable(&self) -> bool {
        self.position.y > SAVE_MIN_Y && self.position.y < SAVE_MAX_Y
    }

    pub fn snapshot(&self) -> SavedPosition {
        SavedPosition {
            x: self.position.x,
            y: self.position.y,
            z: self.position.z,
            rotation_y: self.yaw,
            pitch: self.pitch,
        }
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch)
    }

    /// Camera position: the eye sits one standing height above the body.
    pub fn eye_position(&self) -> Vec3 {
        self.position + Vec3::new(0.0, self.tuning.height, 0.0)
    }

    /// Camera look direction.
    pub fn forward(&self) -> Vec3 {
        self.orientation() * Vec3::NEG_Z
    }

    /// Camera-to-world matrix.
    pub fn camera_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation(), self.eye_position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_at(y: f32) -> CollisionWorld {
        let mut cw = CollisionWorld::new();
        cw.add_surface_box(Vec3::new(0.0, y - 0.5, 0.0), Vec3::new(100.0, 0.5, 100.0));
        cw.refresh();
        cw
    }

    fn player() -> PlayerController {
        PlayerController::new(PlayerTuning::default())
    }

    #[test]
    fn test_lands_and_snaps_to_standing_height() {
        let cw = floor_at(0.0);
        let mut p = player();
        p.position = Vec3::new(0.0, 3.0, 0.0);
        for _ in 0..120 {
            p.update(1.0 / 60.0, Vec2::ZERO, &cw);
        }
        assert!(p.grounded);
        assert!((p.position.y - 0.8).abs() < 1e-3);
        assert_eq!(p.vertical_velocity, 0.0);
    }

    #[test]
    fn test_no_world_means_falling() {
        let cw = CollisionWorld::new();
        let mut p = player();
        p.update(0.1, Vec2::ZERO, &cw);
        assert!(!p.grounded);
        assert!(p.position.y < 0.8);
    }

    #[test]
    fn test_forward_follows_yaw() {
        let cw = floor_at(0.0);
        let mut p = player();
        p.position = Vec3::new(0.0, 0.8, 0.0);
        p.update(0.5, Vec2::new(0.0, 1.0), &cw);
        assert!((p.position.z + 3.0).abs() < 1e-3);

        p.position = Vec3::new(0.0, 0.8, 0.0);
        p.yaw = std::f32::consts::FRAC_PI_2;
        p.update(0.5, Vec2::new(0.0, 1.0), &cw);
        assert!((p.position.x + 3.0).abs() < 1e-3);
        assert!(p.position.z.abs() < 1e-3);
    }

    #[test]
    fn test_wall_rejects_whole_move() {
        let mut cw = floor_at(0.0);
        cw.add_surface_box(Vec3::new(0.0, 1.0, -0.8), Vec3::new(5.0, 2.0, 0.1));
        cw.refresh();
        let mut p = player();
        p.position = Vec3::new(0.0, 0.8, 0.0);
        p.update(0.05, Vec2::new(0.0, 1.0), &cw);
        assert_eq!(p.position.z, 0.0);
    }

    #[test]
    fn test_pitch_clamped() {
        let mut p = player();
        p.look(Vec2::new(100.0, -5000.0));
        assert!((p.yaw + 0.2).abs() < 1e-6);
        assert_eq!(p.pitch, std::f32::consts::FRAC_PI_2);
        p.look(Vec2::new(0.0, 10000.0));
        assert_eq!(p.pitch, -std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn test_jump_only_when_grounded() {
        let mut p = player();
        assert!(!p.jump());
        p.grounded = true;
        assert!(p.jump());
        assert_eq!(p.vertical_velocity, 8.0);
        assert!(!p.grounded);
    }

    #[test]
    fn test_safety_distance_threshold() {
        let cw = floor_at(0.0);
        assert!(PlayerController::is_position_safe(&cw, Vec3::new(0.0, 4.9, 0.0)));
        assert!(!PlayerController::is_position_safe(&cw, Vec3::new(0.0, 7.0, 0.0)));
        assert!(!PlayerController::is_position_safe(&cw, Vec3::new(0.0, -50.0, 0.0)));
    }

    #[test]
    fn test_fallback_order() {
        // Ground only under (-5, _, 5): the third candidate.
        let mut cw = CollisionWorld::new();
        cw.add_surface_box(Vec3::new(-5.0, -0.5, 5.0), Vec3::new(1.0, 0.5, 1.0));
        cw.refresh();
        let p = player();
        let safe = p.find_safe_position(&cw, Vec3::new(40.0, 0.8, 40.0));
        assert_eq!(safe, Vec3::new(-5.0, 0.8, 5.0));
    }

    #[test]
    fn test_default_spawn_when_nothing_safe() {
        let cw = CollisionWorld::new();
        let p = player();
        assert_eq!(
            p.find_safe_position(&cw, Vec3::new(1.0, 2.0, 3.0)),
            Vec3::new(0.0, 0.8, 5.0)
        );
    }

    #[test]
    fn test_fallen_save_never_restored() {
        let cw = floor_at(0.0);
        let mut p = player();
        let saved = SavedPosition {
            x: 0.0,
            y: -50.0,
            z: 0.0,
            rotation_y: 1.0,
            pitch: 0.3,
        };
        let outcome = p.restore(Some(saved), &cw);
        assert_eq!(outcome, RestoreOutcome::Substituted(Vec3::new(0.0, 0.8, 5.0)));
        assert_ne!(p.position.y, -50.0);
        assert_eq!(p.yaw, 0.0);
        assert_eq!(p.pitch, 0.0);
    }

    #[test]
    fn test_safe_save_restored_with_view() {
        let cw = floor_at(0.0);
        let mut p = player();
        let saved = SavedPosition {
            x: 3.0,
            y: 0.8,
            z: -2.0,
            rotation_y: 1.0,
            pitch: 0.3,
        };
        assert_eq!(
            p.restore(Some(saved), &cw),
            RestoreOutcome::Restored(Vec3::new(3.0, 0.8, -2.0))
        );
        assert_eq!(p.yaw, 1.0);
        assert_eq!(p.pitch, 0.3);
        assert_eq!(p.restore(None, &cw), RestoreOutcome::NoSave);

        let tilted = SavedPosition {
            x: 0.0,
            y: 0.8,
            z: 0.0,
            rotation_y: 0.0,
            pitch: 10.0,
        };
        p.restore(Some(tilted), &cw);
        assert_eq!(p.pitch, std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn test_saveable_band() {
        let mut p = player();
        p.position.y = -10.0;
        assert!(!p.is_saveable());
        p.position.y = -9.9;
        assert!(p.is_saveable());
        p.position.y = 100.0;
        assert!(!p.is_saveable());
    }

    #[test]
    fn test_camera_forward() {
        let mut p = player();
        assert!((p.forward() - Vec3::NEG_Z).length() < 1e-6);
        p.pitch = std::f32::consts::FRAC_PI_2;
        assert!((p.forward() - Vec3::Y).length() < 1e-5);
    }
}
