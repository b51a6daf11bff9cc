//! Image panels hung in the world. Purely decorative: not collidable,
//! not shootable.

use glam::{Vec2, Vec3};

use crate::assets::{AssetError, LoadedAsset};
use crate::project_config::DecorDef;

const SWAY_AMPLITUDE: f32 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct DecorPanel {
    pub image: String,
    pub position: Vec3,
    pub size: Vec2,
    pub texture_size: (u32, u32),
    pub yaw: f32,
}

#[derive(Debug, Default)]
pub struct DecorSet {
    defs: Vec<DecorDef>,
    /// Panels in the order their textures finished loading.
    panels: Vec<DecorPanel>,
}

impl DecorSet {
    pub fn new(defs: Vec<DecorDef>) -> Self {
        Self {
            defs,
            panels: Vec::new(),
        }
    }

    pub fn panels(&self) -> &[DecorPanel] {
        &self.panels
    }

    /// Hang the panel for `index` once its texture loaded. A failed texture
    /// means no panel.
    pub fn on_image_loaded(&mut self, index: usize, result: Result<LoadedAsset, AssetError>) {
        let Some(def) = self.defs.get(index) else {
            return;
        };
        match result {
            Ok(LoadedAsset::Image { width, height }) => {
                tracing::info!("Decor panel {} ({}x{})", def.image, width, height);
                self.panels.push(DecorPanel {
                    image: def.image.clone(),
                    position: Vec3::from(def.position),
                    size: Vec2::from(def.size),
                    texture_size: (width, height),
                    yaw: 0.0,
                });
            }
            Ok(LoadedAsset::Model(_)) => {
                tracing::warn!("Decor {} is not an image", def.image);
            }
            Err(e) => tracing::warn!("Failed to load decor {}: {}", def.image, e),
        }
    }

    /// Gentle sway around the vertical axis, offset per panel.
    pub fn update(&mut self, elapsed: f32) {
        for (i, panel) in self.panels.iter_mut().enumerate() {
            panel.yaw = (elapsed + i as f32).sin() * SWAY_AMPLITUDE;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project_config::AssetPaths;

    #[test]
    fn test_panels_follow_load_order() {
        let mut decor = DecorSet::new(AssetPaths::default().decor);
        decor.on_image_loaded(1, Ok(LoadedAsset::Image { width: 64, height: 32 }));
        decor.on_image_loaded(0, Err(AssetError::Io("missing".into())));
        assert_eq!(decor.panels().len(), 1);
        assert_eq!(decor.panels()[0].position, Vec3::new(4.0, -1.0, -2.0));

        decor.update(0.0);
        assert_eq!(decor.panels()[0].yaw, 0.0);
        decor.update(std::f32::consts::FRAC_PI_2);
        assert!((decor.panels()[0].yaw - SWAY_AMPLITUDE).abs() < 1e-6);
    }
}
