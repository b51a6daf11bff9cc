//! Static environment: the walkable city model.

use crate::assets::{AssetError, ModelData};
use crate::physics::CollisionWorld;

/// Load status of the environment. Until `Ready`, the player walks through
/// everything and is never grounded.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldState {
    Loading,
    Ready { surfaces: usize },
    Failed { error: String },
}

impl WorldState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// Flatten every primitive of `model` into a collidable surface.
/// Returns the number of surfaces added.
pub fn install_world(collision: &mut CollisionWorld, model: &ModelData) -> usize {
    let mut added = 0;
    for part in &model.parts {
        if collision
            .add_surface_trimesh(&part.vertices, &part.triangles)
            .is_some()
        {
            added += 1;
        }
    }
    tracing::info!("World '{}' installed: {} collidable surfaces", model.path, added);
    added
}

/// Apply a finished world load.
pub fn finish_world_load(
    collision: &mut CollisionWorld,
    result: Result<ModelData, AssetError>,
) -> WorldState {
    match result {
        Ok(model) => WorldState::Ready {
            surfaces: install_world(collision, &model),
        },
        Err(e) => {
            tracing::error!("Failed to load world: {}", e);
            WorldState::Failed {
                error: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MeshPart;
    use glam::Vec3;

    fn quad(y: f32) -> MeshPart {
        MeshPart {
            vertices: vec![
                Vec3::new(-20.0, y, -20.0),
                Vec3::new(20.0, y, -20.0),
                Vec3::new(20.0, y, 20.0),
                Vec3::new(-20.0, y, 20.0),
            ],
            triangles: vec![[0, 2, 1], [0, 3, 2]],
            material: 0,
        }
    }

    #[test]
    fn test_install_skips_empty_parts() {
        let model = ModelData {
            path: "city.glb".into(),
            parts: vec![quad(0.0), MeshPart::default(), quad(4.0)],
            materials: vec![[1.0; 3]],
        };
        let mut collision = CollisionWorld::new();
        let state = finish_world_load(&mut collision, Ok(model));
        assert_eq!(state, WorldState::Ready { surfaces: 2 });
        assert_eq!(collision.surface_count(), 2);
    }

    #[test]
    fn test_failed_load_leaves_world_empty() {
        let mut collision = CollisionWorld::new();
        let state = finish_world_load(&mut collision, Err(AssetError::NoMeshes));
        assert!(!state.is_ready());
        assert!(matches!(state, WorldState::Failed { .. }));
        assert_eq!(collision.surface_count(), 0);
    }
}
