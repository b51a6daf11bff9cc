//! The weapon and the shot: one ray, one nearest live target, one hit.

use glam::{Mat4, Quat, Vec3};

use folio_core::components::{rgb, Health, TargetName, VisualModel};
use folio_core::events::{EventBus, GameEvent};

use crate::assets::{AssetError, ModelData};
use crate::entities::EntityManager;
use crate::physics::CollisionWorld;
use crate::tasks::{GameTask, Scheduler};

pub const DAMAGE: i32 = 20;
pub const SHOT_RANGE: f32 = 1000.0;
pub const TRACER_LENGTH: f32 = 100.0;
pub const HIT_FLASH_COLOR: u32 = 0xffaa00;

const RECOIL_DISTANCE: f32 = 0.1;
const RECOIL_SECS: f32 = 0.1;
const MUZZLE_FLASH_SECS: f32 = 0.05;
const TRACER_SECS: f32 = 0.08;
const IMPACT_SECS: f32 = 0.3;
const HIT_FLASH_SECS: f32 = 0.2;

/// Weapon mount relative to the camera, and muzzle relative to the weapon.
const WEAPON_OFFSET: Vec3 = Vec3::new(0.5, -0.5, -1.0);
const WEAPON_PITCH: f32 = 0.1;
const MUZZLE_OFFSET: Vec3 = Vec3::new(0.0, 0.3, -0.6);

#[derive(Debug, Default)]
pub struct Weapon {
    /// False until the weapon model loads. An unloaded weapon cannot fire.
    pub loaded: bool,
    pub recoiling: bool,
    pub flash_visible: bool,
}

impl Weapon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_model_loaded(&mut self, result: Result<ModelData, AssetError>) {
        match result {
            Ok(model) => {
                tracing::info!("Weapon ready ({} triangles)", model.triangle_count());
                self.loaded = true;
            }
            Err(e) => tracing::error!("Failed to load weapon model: {}", e),
        }
    }

    /// Weapon transform in camera space, including recoil.
    pub fn local_matrix(&self) -> Mat4 {
        let mut offset = WEAPON_OFFSET;
        if self.recoiling {
            offset.z += RECOIL_DISTANCE;
        }
        Mat4::from_rotation_translation(Quat::from_rotation_x(WEAPON_PITCH), offset)
    }

    pub fn muzzle_world(&self, camera: Mat4) -> Vec3 {
        (camera * self.local_matrix()).transform_point3(MUZZLE_OFFSET)
    }

    /// Apply a weapon task. Returns false for tasks handled elsewhere.
    pub fn run_task(&mut self, task: GameTask) -> bool {
        match task {
            GameTask::EndRecoil => {
                self.recoiling = false;
                true
            }
            GameTask::EndMuzzleFlash => {
                self.flash_visible = false;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShotOutcome {
    /// Weapon not loaded or still recoiling. Nothing happened.
    Blocked,
    /// Fired into a scene without targets.
    NoTargets,
    Miss,
    Hit { name: String, health: i32 },
    Kill { name: String },
}

/// Everything a shot touches.
pub struct ShotContext<'a> {
    pub entities: &'a mut EntityManager,
    pub collision: &'a CollisionWorld,
    pub scheduler: &'a mut Scheduler,
    pub events: &'a mut EventBus,
}

/// Pull the trigger. `camera` is the camera-to-world matrix, `forward` the
/// look direction.
pub fn fire(weapon: &mut Weapon, camera: Mat4, forward: Vec3, ctx: ShotContext<'_>) -> ShotOutcome {
    if !weapon.loaded || weapon.recoiling {
        return ShotOutcome::Blocked;
    }

    weapon.recoiling = true;
    ctx.scheduler.schedule(RECOIL_SECS, GameTask::EndRecoil);
    weapon.flash_visible = true;
    ctx.scheduler.schedule(MUZZLE_FLASH_SECS, GameTask::EndMuzzleFlash);

    let muzzle = weapon.muzzle_world(camera);
    let dir = forward.normalize_or_zero();
    tracing::debug!("Shot from {} towards {}", muzzle, dir);

    let tracer = ctx.entities.spawn_tracer(muzzle, muzzle + dir * TRACER_LENGTH);
    ctx.scheduler
        .schedule_for(tracer, TRACER_SECS, GameTask::Despawn(tracer));
    ctx.events.emit(GameEvent::ShotFired);

    if ctx.entities.target_count() == 0 {
        tracing::warn!("No targets in the scene");
        return ShotOutcome::NoTargets;
    }

    let entities = &*ctx.entities;
    let hit = ctx
        .collision
        .raycast_targets(muzzle, dir, SHOT_RANGE, &|e| entities.is_live(e));
    let Some((target, ray_hit)) = hit else {
        tracing::debug!("Shot missed");
        ctx.events.emit(GameEvent::ShotMissed);
        return ShotOutcome::Miss;
    };

    let marker = ctx.entities.spawn_impact(ray_hit.point);
    ctx.scheduler
        .schedule_for(marker, IMPACT_SECS, GameTask::Despawn(marker));

    apply_hit(target, ctx.entities, ctx.scheduler, ctx.events)
}

fn apply_hit(
    target: hecs::Entity,
    entities: &mut EntityManager,
    scheduler: &mut Scheduler,
    events: &mut EventBus,
) -> ShotOutcome {
    let Ok((name, health, model)) = entities
        .world
        .query_one_mut::<(&TargetName, &mut Health, &mut VisualModel)>(target)
    else {
        return ShotOutcome::Miss;
    };
    let name = name.0.clone();

    let killed = health.apply_damage(DAMAGE);
    events.emit(GameEvent::TargetHit {
        name: name.clone(),
        health: health.display(),
    });

    if killed {
        tracing::info!("Target {} destroyed", name);
        events.emit(GameEvent::TargetKilled { name: name.clone() });
        ShotOutcome::Kill { name }
    } else {
        tracing::info!("Target {} hit, health {}", name, health.current);
        model.flash(rgb(HIT_FLASH_COLOR));
        scheduler.schedule_for(target, HIT_FLASH_SECS, GameTask::RestoreColor(target));
        ShotOutcome::Hit {
            name,
            health: health.current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project_config::TargetDef;

    struct Range {
        weapon: Weapon,
        entities: EntityManager,
        collision: CollisionWorld,
        scheduler: Scheduler,
        events: EventBus,
    }

    impl Range {
        /// Targets straight down -z from the origin at the given distances.
        fn new(distances: &[f32]) -> Self {
            let declared = distances
                .iter()
                .enumerate()
                .map(|(i, d)| TargetDef {
                    name: format!("t{}", i),
                    position: [0.0, -0.5, -d],
                    scale: 1.0,
                })
                .collect();
            let mut range = Self {
                weapon: Weapon { loaded: true, ..Weapon::new() },
                entities: EntityManager::new(declared, Some(1)),
                collision: CollisionWorld::new(),
                scheduler: Scheduler::new(),
                events: EventBus::new(1000),
            };
            for i in 0..distances.len() {
                range.entities.on_model_loaded(
                    i,
                    Err(AssetError::NoMeshes),
                    &mut range.collision,
                    &mut range.events,
                );
            }
            range.collision.refresh();
            range
        }

        /// Camera whose muzzle ray runs along x=0.5+, roughly level, so aim
        /// the camera so the muzzle lines up with the targets.
        fn shoot(&mut self) -> ShotOutcome {
            let camera = Mat4::from_translation(Vec3::new(-0.5, 0.0, 0.0));
            let outcome = fire(
                &mut self.weapon,
                camera,
                Vec3::NEG_Z,
                ShotContext {
                    entities: &mut self.entities,
                    collision: &self.collision,
                    scheduler: &mut self.scheduler,
                    events: &mut self.events,
                },
            );
            // Let recoil finish.
            for task in self.scheduler.advance(0.15) {
                if !self.weapon.run_task(task) {
                    self.entities.run_task(task);
                }
            }
            outcome
        }
    }

    #[test]
    fn test_muzzle_position() {
        let weapon = Weapon::new();
        let muzzle = weapon.muzzle_world(Mat4::IDENTITY);
        assert!((muzzle.x - 0.5).abs() < 1e-5);
        // Pitched mount lifts the muzzle slightly above the offset sum.
        assert!(muzzle.y > -0.5 && muzzle.y < 0.0);
        assert!(muzzle.z < -1.5);
    }

    #[test]
    fn test_unloaded_weapon_blocked() {
        let mut range = Range::new(&[5.0]);
        range.weapon.loaded = false;
        assert_eq!(range.shoot(), ShotOutcome::Blocked);
        assert_eq!(range.entities.health_of("t0"), Some(100));
    }

    #[test]
    fn test_recoil_blocks_second_shot() {
        let mut range = Range::new(&[5.0]);
        let ctx_shot = |r: &mut Range| {
            fire(
                &mut r.weapon,
                Mat4::from_translation(Vec3::new(-0.5, 0.0, 0.0)),
                Vec3::NEG_Z,
                ShotContext {
                    entities: &mut r.entities,
                    collision: &r.collision,
                    scheduler: &mut r.scheduler,
                    events: &mut r.events,
                },
            )
        };
        assert!(matches!(ctx_shot(&mut range), ShotOutcome::Hit { .. }));
        assert_eq!(ctx_shot(&mut range), ShotOutcome::Blocked);
        assert_eq!(range.entities.health_of("t0"), Some(80));
    }

    #[test]
    fn test_only_nearest_target_damaged() {
        let mut range = Range::new(&[10.0, 5.0, 20.0]);
        assert_eq!(
            range.shoot(),
            ShotOutcome::Hit {
                name: "t1".into(),
                health: 80
            }
        );
        assert_eq!(range.entities.health_of("t0"), Some(100));
        assert_eq!(range.entities.health_of("t1"), Some(80));
        assert_eq!(range.entities.health_of("t2"), Some(100));
    }

    #[test]
    fn test_five_hits_kill_on_fifth() {
        let mut range = Range::new(&[5.0]);
        let outcomes: Vec<ShotOutcome> = (0..5).map(|_| range.shoot()).collect();
        for (i, outcome) in outcomes[..4].iter().enumerate() {
            assert_eq!(
                *outcome,
                ShotOutcome::Hit {
                    name: "t0".into(),
                    health: 100 - 20 * (i as i32 + 1)
                }
            );
        }
        assert_eq!(outcomes[4], ShotOutcome::Kill { name: "t0".into() });
        // Dead targets are not hittable.
        assert_eq!(range.shoot(), ShotOutcome::Miss);
        assert_eq!(range.entities.health_of("t0"), Some(0));
    }

    #[test]
    fn test_hit_flash_restored() {
        let mut range = Range::new(&[5.0]);
        range.shoot();
        let e = range.entities.find("t0").unwrap();
        {
            let model = range.entities.world.get::<&VisualModel>(e).unwrap();
            assert_eq!(model.materials[0].color, rgb(HIT_FLASH_COLOR));
        }
        for task in range.scheduler.advance(0.1) {
            range.entities.run_task(task);
        }
        let model = range.entities.world.get::<&VisualModel>(e).unwrap();
        assert_eq!(model.materials[0].color, rgb(0xff4444));
    }

    #[test]
    fn test_effects_expire() {
        let mut range = Range::new(&[5.0]);
        range.shoot();
        // Tracer gone after recoil window, marker still up.
        assert_eq!(range.entities.effect_count(), 1);
        for task in range.scheduler.advance(0.2) {
            range.entities.run_task(task);
        }
        assert_eq!(range.entities.effect_count(), 0);
    }

    #[test]
    fn test_miss_and_no_targets() {
        let mut range = Range::new(&[]);
        assert_eq!(range.shoot(), ShotOutcome::NoTargets);

        let mut range = Range::new(&[5.0]);
        let camera = Mat4::from_translation(Vec3::new(-0.5, 0.0, 0.0));
        let outcome = fire(
            &mut range.weapon,
            camera,
            Vec3::Z,
            ShotContext {
                entities: &mut range.entities,
                collision: &range.collision,
                scheduler: &mut range.scheduler,
                events: &mut range.events,
            },
        );
        assert_eq!(outcome, ShotOutcome::Miss);
    }
}
