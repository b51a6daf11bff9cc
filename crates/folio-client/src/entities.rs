//! Shootable targets: spawning (model or fallback box), idle animation,
//! labels, unlock notification and fade-out removal.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rapier3d::prelude::ColliderHandle;

use folio_core::components::{
    rgb, Billboard, FloatBob, Health, MaterialState, ModelSource, TargetName, Transform,
    VisualModel,
};
use folio_core::events::{EventBus, GameEvent};

use crate::assets::{AssetError, ModelData};
use crate::physics::CollisionWorld;
use crate::project_config::TargetDef;
use crate::tasks::{GameTask, Scheduler};

pub const TARGET_HEALTH: i32 = 100;
/// Opacity lost per second once dead.
pub const FADE_RATE: f32 = 2.0;
pub const FALLBACK_COLOR: u32 = 0xff4444;

/// Hitbox and label placement for a loaded model.
const MODEL_HITBOX_HALF: Vec3 = Vec3::new(0.75, 1.0, 0.75);
const MODEL_HITBOX_OFFSET: Vec3 = Vec3::new(0.0, 1.0, 0.0);
const MODEL_LABEL_OFFSET: Vec3 = Vec3::new(0.0, 3.0, 0.0);
/// The fallback box is its own hitbox.
const FALLBACK_HALF: Vec3 = Vec3::splat(0.5);
const FALLBACK_LABEL_OFFSET: Vec3 = Vec3::new(0.0, 1.5, 0.0);

/// Interaction collider of a target, positioned relative to its container.
#[derive(Debug, Clone, Copy)]
pub struct Hitbox {
    pub collider: ColliderHandle,
    pub offset: Vec3,
}

/// Position of the target in the declared spawn list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnIndex(pub usize);

/// Transient impact marker left where a shot landed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactMarker {
    pub position: Vec3,
}

/// Visible shot line from the muzzle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tracer {
    pub from: Vec3,
    pub to: Vec3,
}

pub struct EntityManager {
    pub world: hecs::World,
    declared: Vec<TargetDef>,
    settled: usize,
    all_loaded_announced: bool,
    rng: StdRng,
}

impl EntityManager {
    pub fn new(declared: Vec<TargetDef>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            world: hecs::World::new(),
            declared,
            settled: 0,
            all_loaded_announced: false,
            rng,
        }
    }

    pub fn declared(&self) -> &[TargetDef] {
        &self.declared
    }

    /// Targets whose spawn finished, successfully or with the fallback.
    pub fn settled(&self) -> usize {
        self.settled
    }

    pub fn all_loaded(&self) -> bool {
        self.all_loaded_announced
    }

    /// Spawn the target at `index` from a finished model load.
    /// A failed load spawns the fallback box instead.
    pub fn on_model_loaded(
        &mut self,
        index: usize,
        result: Result<ModelData, AssetError>,
        collision: &mut CollisionWorld,
        events: &mut EventBus,
    ) -> Option<hecs::Entity> {
        let Some(def) = self.declared.get(index).cloned() else {
            tracing::warn!("Model loaded for unknown target index {}", index);
            return None;
        };
        let visual = match result {
            Ok(model) => {
                tracing::info!("Model loaded for {}", def.name);
                VisualModel {
                    source: ModelSource::Gltf { path: model.path },
                    materials: model.materials.into_iter().map(MaterialState::new).collect(),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to load model for {}: {}, using fallback", def.name, e);
                VisualModel::fallback_box(rgb(FALLBACK_COLOR))
            }
        };
        Some(self.spawn_target(index, &def, visual, collision, events))
    }

    fn spawn_target(
        &mut self,
        index: usize,
        def: &TargetDef,
        visual: VisualModel,
        collision: &mut CollisionWorld,
        events: &mut EventBus,
    ) -> hecs::Entity {
        let fallback = visual.source == ModelSource::FallbackBox;
        let (half, hitbox_offset, label_offset) = if fallback {
            (FALLBACK_HALF, Vec3::ZERO, FALLBACK_LABEL_OFFSET)
        } else {
            (MODEL_HITBOX_HALF, MODEL_HITBOX_OFFSET, MODEL_LABEL_OFFSET)
        };

        let position = Vec3::from(def.position);
        let transform = Transform {
            scale: Vec3::splat(def.scale),
            ..Transform::from_position(position)
        };
        let bob = FloatBob {
            phase: self.rng.gen_range(0.0..std::f32::consts::TAU),
            speed: self.rng.gen_range(0.5..1.0),
        };

        let entity = self.world.spawn((
            TargetName(def.name.clone()),
            SpawnIndex(index),
            Health::new(TARGET_HEALTH),
            transform,
            bob,
            visual,
            Billboard::new(&def.name, label_offset),
        ));
        let collider = collision.add_target_hitbox(entity, position + hitbox_offset, half);
        let _ = self.world.insert_one(
            entity,
            Hitbox {
                collider,
                offset: hitbox_offset,
            },
        );

        tracing::info!("Target spawned: {}{}", def.name, if fallback { " (fallback)" } else { "" });
        events.emit(GameEvent::TargetSpawned {
            name: def.name.clone(),
            fallback,
        });

        self.settled += 1;
        if self.settled == self.declared.len() && !self.all_loaded_announced {
            self.all_loaded_announced = true;
            tracing::info!("All targets loaded: {}", self.settled);
            events.emit(GameEvent::AllTargetsLoaded {
                count: self.settled,
            });
        }
        entity
    }

    /// Alive and present: the only targets a shot may hit.
    pub fn is_live(&self, entity: hecs::Entity) -> bool {
        self.world
            .get::<&Health>(entity)
            .map(|h| h.is_alive())
            .unwrap_or(false)
    }

    pub fn live_count(&self) -> usize {
        self.world
            .query::<&Health>()
            .iter()
            .filter(|(_, h)| h.is_alive())
            .count()
    }

    /// Targets still in the scene, alive or fading.
    pub fn target_count(&self) -> usize {
        self.world.query::<&TargetName>().iter().count()
    }

    pub fn find(&self, name: &str) -> Option<hecs::Entity> {
        self.world
            .query::<&TargetName>()
            .iter()
            .find(|(_, n)| n.0 == name)
            .map(|(e, _)| e)
    }

    pub fn health_of(&self, name: &str) -> Option<i32> {
        let entity = self.find(name)?;
        self.world.get::<&Health>(entity).ok().map(|h| h.current)
    }

    pub fn opacity_of(&self, name: &str) -> Option<f32> {
        let entity = self.find(name)?;
        self.world.get::<&VisualModel>(entity).ok().map(|m| m.opacity())
    }

    /// Per-frame update. `elapsed` is the game clock in seconds.
    pub fn update(
        &mut self,
        dt: f32,
        elapsed: f32,
        camera: Vec3,
        collision: &mut CollisionWorld,
        scheduler: &mut Scheduler,
        events: &mut EventBus,
    ) {
        for (_entity, (transform, bob, label, hitbox)) in self
            .world
            .query_mut::<(&mut Transform, &FloatBob, &mut Billboard, &Hitbox)>()
        {
            transform.position.y += bob.step(elapsed);
            collision.set_target_position(hitbox.collider, transform.position + hitbox.offset);
            label.face(transform.position + label.offset, camera);
        }

        let mut removed = Vec::new();
        for (entity, (name, health, model, label)) in self
            .world
            .query_mut::<(&TargetName, &mut Health, &mut VisualModel, &mut Billboard)>()
        {
            if health.take_unlock() {
                tracing::info!("Project unlocked: {}", name.0);
                events.emit(GameEvent::TargetUnlocked {
                    name: name.0.clone(),
                });
            }

            if health.current <= 0 {
                let amount = dt * FADE_RATE;
                model.fade(amount);
                label.opacity = (label.opacity - amount).max(0.0);
                if model.is_fully_transparent() {
                    removed.push(entity);
                }
            }
        }

        for entity in removed {
            self.remove(entity, collision, scheduler, events);
        }
    }

    fn remove(
        &mut self,
        entity: hecs::Entity,
        collision: &mut CollisionWorld,
        scheduler: &mut Scheduler,
        events: &mut EventBus,
    ) {
        let cancelled = scheduler.cancel_owned_by(entity);
        if let Ok(hitbox) = self.world.get::<&Hitbox>(entity).map(|h| *h) {
            collision.remove_target(hitbox.collider);
        }
        let name = self
            .world
            .get::<&TargetName>(entity)
            .map(|n| n.0.clone())
            .unwrap_or_default();
        if self.world.despawn(entity).is_ok() {
            tracing::info!("Target removed: {} ({} pending tasks cancelled)", name, cancelled);
            events.emit(GameEvent::TargetRemoved { name });
        }
    }

    /// Apply a task that belongs to this world. Returns false for tasks
    /// handled elsewhere.
    pub fn run_task(&mut self, task: GameTask) -> bool {
        match task {
            GameTask::RestoreColor(entity) => {
                if let Ok(mut model) = self.world.get::<&mut VisualModel>(entity) {
                    model.restore_colors();
                }
                true
            }
            GameTask::Despawn(entity) => {
                let _ = self.world.despawn(entity);
                true
            }
            _ => false,
        }
    }

    pub fn spawn_impact(&mut self, position: Vec3) -> hecs::Entity {
        self.world.spawn((ImpactMarker { position },))
    }

    pub fn spawn_tracer(&mut self, from: Vec3, to: Vec3) -> hecs::Entity {
        self.world.spawn((Tracer { from, to },))
    }

    pub fn effect_count(&self) -> usize {
        self.world.query::<&ImpactMarker>().iter().count()
            + self.world.query::<&Tracer>().iter().count()
    }
}
