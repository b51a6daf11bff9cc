use std::collections::{HashMap, HashSet};

use glam::Vec3;
use rapier3d::prelude::*;

/// Result of a ray cast against the collision world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
}

/// Static world surfaces plus target hitboxes, queried by ray casts only.
///
/// Nothing is simulated: surfaces never move, hitboxes are repositioned by
/// the entity manager each frame. Call [`refresh`](Self::refresh) after
/// changes and before querying.
pub struct CollisionWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub query_pipeline: QueryPipeline,
    island_manager: IslandManager,
    surfaces: HashSet<ColliderHandle>,
    // Mapping from hitbox colliders to ECS entities
    target_to_entity: HashMap<ColliderHandle, hecs::Entity>,
    dirty: bool,
}

impl Default for CollisionWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionWorld {
    pub fn new() -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            query_pipeline: QueryPipeline::new(),
            island_manager: IslandManager::new(),
            surfaces: HashSet::new(),
            target_to_entity: HashMap::new(),
            dirty: false,
        }
    }

    /// Add a triangle mesh surface (world geometry, already in world space).
    pub fn add_surface_trimesh(
        &mut self,
        vertices: &[Vec3],
        indices: &[[u32; 3]],
    ) -> Option<ColliderHandle> {
        if indices.is_empty() {
            return None;
        }
        let points = vertices.iter().map(|v| point![v.x, v.y, v.z]).collect();
        let collider = ColliderBuilder::trimesh(points, indices.to_vec()).build();
        let handle = self.collider_set.insert(collider);
        self.surfaces.insert(handle);
        self.dirty = true;
        Some(handle)
    }

    /// Add an axis-aligned box surface.
    pub fn add_surface_box(&mut self, center: Vec3, half_extents: Vec3) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(vector![center.x, center.y, center.z])
            .build();
        let handle = self.collider_set.insert(collider);
        self.surfaces.insert(handle);
        self.dirty = true;
        handle
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Add a box hitbox owned by `entity`.
    pub fn add_target_hitbox(
        &mut self,
        entity: hecs::Entity,
        center: Vec3,
        half_extents: Vec3,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(vector![center.x, center.y, center.z])
            .build();
        let handle = self.collider_set.insert(collider);
        self.target_to_entity.insert(handle, entity);
        self.dirty = true;
        handle
    }

    pub fn set_target_position(&mut self, handle: ColliderHandle, center: Vec3) {
        if let Some(collider) = self.collider_set.get_mut(handle) {
            collider.set_translation(vector![center.x, center.y, center.z]);
            self.dirty = true;
        }
    }

    pub fn remove_target(&mut self, handle: ColliderHandle) {
        self.collider_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.rigid_body_set,
            false,
        );
        self.target_to_entity.remove(&handle);
        self.dirty = true;
    }

    pub fn target_count(&self) -> usize {
        self.target_to_entity.len()
    }

    /// Rebuild the query acceleration structure if anything changed.
    pub fn refresh(&mut self) {
        if self.dirty {
            self.query_pipeline.update(&self.collider_set);
            self.dirty = false;
        }
    }

    fn cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: QueryFilter,
    ) -> Option<(ColliderHandle, RayHit)> {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }
        let ray = Ray::new(
            point![origin.x, origin.y, origin.z],
            vector![dir.x, dir.y, dir.z],
        );
        self.query_pipeline
            .cast_ray_and_get_normal(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                max_distance,
                true,
                filter,
            )
            .map(|(handle, intersection)| {
                let distance = intersection.time_of_impact;
                let hit = RayHit {
                    distance,
                    point: origin + dir * distance,
                    normal: Vec3::new(
                        intersection.normal.x,
                        intersection.normal.y,
                        intersection.normal.z,
                    ),
                };
                (handle, hit)
            })
    }

    /// Nearest world surface along the ray. Target hitboxes are ignored.
    pub fn raycast_surfaces(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        let is_surface = |handle: ColliderHandle, _: &Collider| self.surfaces.contains(&handle);
        let filter = QueryFilter::default().predicate(&is_surface);
        self.cast(origin, direction, max_distance, filter)
            .map(|(_, hit)| hit)
    }

    /// Nearest target hitbox along the ray whose entity passes `is_live`.
    /// World surfaces do not block the shot.
    pub fn raycast_targets(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        is_live: &dyn Fn(hecs::Entity) -> bool,
    ) -> Option<(hecs::Entity, RayHit)> {
        let targets = &self.target_to_entity;
        let is_target = |handle: ColliderHandle, _: &Collider| {
            targets.get(&handle).is_some_and(|&entity| is_live(entity))
        };
        let filter = QueryFilter::default().predicate(&is_target);
        let (handle, hit) = self.cast(origin, direction, max_distance, filter)?;
        targets.get(&handle).map(|&entity| (entity, hit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_world() -> CollisionWorld {
        let mut cw = CollisionWorld::new();
        cw.add_surface_box(Vec3::new(0.0, -0.5, 0.0), Vec3::new(50.0, 0.5, 50.0));
        cw.refresh();
        cw
    }

    #[test]
    fn test_raycast_floor() {
        let cw = floor_world();
        let hit = cw
            .raycast_surfaces(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y, 100.0)
            .unwrap();
        assert!((hit.distance - 5.0).abs() < 1e-3);
        assert!(hit.normal.y > 0.9);
    }

    #[test]
    fn test_trimesh_surface() {
        let mut cw = CollisionWorld::new();
        let vertices = [
            Vec3::new(-10.0, 0.0, -10.0),
            Vec3::new(10.0, 0.0, -10.0),
            Vec3::new(10.0, 0.0, 10.0),
            Vec3::new(-10.0, 0.0, 10.0),
        ];
        let handle = cw.add_surface_trimesh(&vertices, &[[0, 2, 1], [0, 3, 2]]);
        assert!(handle.is_some());
        assert!(cw.add_surface_trimesh(&vertices, &[]).is_none());
        cw.refresh();

        let hit = cw.raycast_surfaces(Vec3::new(1.0, 3.0, 1.0), Vec3::NEG_Y, 10.0);
        assert!((hit.unwrap().distance - 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_targets_ignored_by_surface_cast() {
        let mut world = hecs::World::new();
        let entity = world.spawn(());
        let mut cw = CollisionWorld::new();
        cw.add_target_hitbox(entity, Vec3::new(0.0, 2.0, 0.0), Vec3::splat(0.5));
        cw.refresh();
        assert!(cw
            .raycast_surfaces(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y, 10.0)
            .is_none());
    }

    #[test]
    fn test_nearest_live_target() {
        let mut world = hecs::World::new();
        let near = world.spawn(());
        let far = world.spawn(());
        let mut cw = floor_world();
        cw.add_target_hitbox(near, Vec3::new(0.0, 1.0, -5.0), Vec3::splat(0.5));
        cw.add_target_hitbox(far, Vec3::new(0.0, 1.0, -10.0), Vec3::splat(0.5));
        cw.refresh();

        let origin = Vec3::new(0.0, 1.0, 0.0);
        let (hit, _) = cw
            .raycast_targets(origin, Vec3::NEG_Z, 1000.0, &|_| true)
            .unwrap();
        assert_eq!(hit, near);

        let (hit, info) = cw
            .raycast_targets(origin, Vec3::NEG_Z, 1000.0, &|e| e != near)
            .unwrap();
        assert_eq!(hit, far);
        assert!((info.distance - 9.5).abs() < 1e-3);
    }

    #[test]
    fn test_move_and_remove_target() {
        let mut world = hecs::World::new();
        let entity = world.spawn(());
        let mut cw = CollisionWorld::new();
        let handle = cw.add_target_hitbox(entity, Vec3::new(0.0, 0.0, -5.0), Vec3::splat(0.5));
        cw.set_target_position(handle, Vec3::new(3.0, 0.0, -5.0));
        cw.refresh();
        assert!(cw
            .raycast_targets(Vec3::ZERO, Vec3::NEG_Z, 100.0, &|_| true)
            .is_none());

        cw.remove_target(handle);
        cw.refresh();
        assert_eq!(cw.target_count(), 0);
        assert!(cw
            .raycast_targets(Vec3::new(3.0, 0.0, 0.0), Vec3::NEG_Z, 100.0, &|_| true)
            .is_none());
    }
}
