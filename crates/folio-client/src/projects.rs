//! Per-target popup content: what gets revealed when a target is unlocked.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDef {
    /// Target name this entry belongs to.
    pub name: String,
    pub description: String,
    pub link: String,
    #[serde(default)]
    pub image: Option<String>,
}

fn entry(name: &str, description: &str, link: &str, image: &str) -> ProjectDef {
    ProjectDef {
        name: name.to_string(),
        description: description.to_string(),
        link: link.to_string(),
        image: Some(image.to_string()),
    }
}

pub fn builtin_catalog() -> Vec<ProjectDef> {
    const SITE: &str = "https://juands21gamer-wq.github.io/computacion-grafica-2025-2";
    vec![
        entry(
            "proyecto de modelado 3d",
            "modelado 3d usando magic voxel.",
            &format!("{}/trabajoviewerde3modelos/index.html", SITE),
            "models/textures/paisaje.png",
        ),
        entry(
            "skills: ",
            "estos son los programas y herramientas que manejo.",
            &format!("{}/Mesa%20de%20trabajo%201%20copia.pdf", SITE),
            "models/textures/programas.png",
        ),
        entry(
            "HOJA DE VIDA",
            "soy juan david solano martinez, estudiante de ingenieria multimedia de 4 semestre ",
            &format!("{}/CVjuan.pdf", SITE),
            "models/textures/CVjuan.jpg",
        ),
        entry(
            "MERITOS",
            "graduado del colegio claret",
            &format!("{}/CVjuan.pdf", SITE),
            "models/textures/claret.jpeg",
        ),
        entry(
            "proyecto audiovisual",
            "un proyecto audiovisual realizado en equipo para guion.",
            "https://www.youtube.com/watch?v=hhlaZtVgwA4",
            "models/textures/lavida.png",
        ),
    ]
}

/// Lookup from target name to popup content.
#[derive(Debug, Clone)]
pub struct ProjectCatalog {
    entries: Vec<ProjectDef>,
}

impl ProjectCatalog {
    /// Use `configured` when non-empty, the built-in entries otherwise.
    pub fn new(configured: &[ProjectDef]) -> Self {
        let entries = if configured.is_empty() {
            builtin_catalog()
        } else {
            configured.to_vec()
        };
        Self { entries }
    }

    /// Content for `name`. Unknown names get a placeholder entry.
    pub fn lookup(&self, name: &str) -> ProjectDef {
        self.entries
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .unwrap_or_else(|| ProjectDef {
                name: name.to_string(),
                description: "Proyecto misterioso".to_string(),
                link: "#".to_string(),
                image: None,
            })
    }

    pub fn entries(&self) -> &[ProjectDef] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_default_targets() {
        let catalog = ProjectCatalog::new(&[]);
        for def in crate::project_config::default_targets() {
            assert_ne!(catalog.lookup(&def.name).link, "#", "{}", def.name);
        }
    }

    #[test]
    fn test_unknown_name_placeholder() {
        let catalog = ProjectCatalog::new(&[]);
        let info = catalog.lookup("nope");
        assert_eq!(info.description, "Proyecto misterioso");
        assert_eq!(info.link, "#");
    }

    #[test]
    fn test_configured_replaces_builtin() {
        let custom = vec![ProjectDef {
            name: "solo".into(),
            description: "d".into(),
            link: "https://example.org".into(),
            image: None,
        }];
        let catalog = ProjectCatalog::new(&custom);
        assert_eq!(catalog.entries().len(), 1);
        assert_eq!(catalog.lookup("MERITOS").link, "#");
    }
}
