//! Asset loading off the frame loop.
//!
//! Requests are served by worker threads and delivered through a channel;
//! the frame loop drains finished loads with [`AssetLoader::poll`]. There is
//! no ordering guarantee between requests and no retry.

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use glam::{Mat4, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub enum AssetError {
    Io(String),
    Gltf(String),
    Image(String),
    NoMeshes,
}

impl std::fmt::Display for AssetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "Asset IO error: {}", msg),
            Self::Gltf(msg) => write!(f, "glTF error: {}", msg),
            Self::Image(msg) => write!(f, "Image error: {}", msg),
            Self::NoMeshes => write!(f, "glTF file contains no meshes"),
        }
    }
}

impl From<gltf::Error> for AssetError {
    fn from(e: gltf::Error) -> Self {
        match e {
            gltf::Error::Io(io) => Self::Io(io.to_string()),
            other => Self::Gltf(other.to_string()),
        }
    }
}

/// One primitive flattened into world space.
#[derive(Debug, Clone, Default)]
pub struct MeshPart {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    /// Index into [`ModelData::materials`].
    pub material: usize,
}

/// CPU-side contents of a glTF file.
#[derive(Debug, Clone, Default)]
pub struct ModelData {
    pub path: String,
    pub parts: Vec<MeshPart>,
    /// Base color per material slot.
    pub materials: Vec<[f32; 3]>,
}

impl ModelData {
    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(|p| p.triangles.len()).sum()
    }
}

/// Import a glTF/GLB file, applying node transforms down the hierarchy.
pub fn load_model(full_path: &Path, display_path: &str) -> Result<ModelData, AssetError> {
    if !full_path.exists() {
        return Err(AssetError::Io(format!("{} not found", full_path.display())));
    }
    let (document, buffers, _images) = gltf::import(full_path)?;

    let mut model = ModelData {
        path: display_path.to_string(),
        parts: Vec::new(),
        materials: Vec::new(),
    };
    let mut material_slots: Vec<Option<usize>> = Vec::new();

    for scene in document.scenes() {
        for node in scene.nodes() {
            collect_node_parts(&node, Mat4::IDENTITY, &buffers, &mut model, &mut material_slots);
        }
    }

    if model.parts.is_empty() {
        return Err(AssetError::NoMeshes);
    }
    if model.materials.is_empty() {
        model.materials.push([1.0, 1.0, 1.0]);
    }

    tracing::info!(
        "glTF '{}': {} primitives, {} triangles, {} materials",
        display_path,
        model.parts.len(),
        model.triangle_count(),
        model.materials.len()
    );
    Ok(model)
}

fn collect_node_parts(
    node: &gltf::Node,
    parent_transform: Mat4,
    buffers: &[gltf::buffer::Data],
    model: &mut ModelData,
    material_slots: &mut Vec<Option<usize>>,
) {
    let world = parent_transform * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buf| Some(&buffers[buf.index()]));
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let vertices: Vec<Vec3> = positions
                .map(|p| world.transform_point3(Vec3::from(p)))
                .collect();

            let flat: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..vertices.len() as u32).collect(),
            };
            let triangles: Vec<[u32; 3]> = flat
                .chunks_exact(3)
                .map(|t| [t[0], t[1], t[2]])
                .filter(|t| t.iter().all(|&i| (i as usize) < vertices.len()))
                .collect();

            // Materials without an index use the glTF default material.
            let material = primitive.material();
            let key = material.index().map(|i| i + 1).unwrap_or(0);
            if material_slots.len() <= key {
                material_slots.resize(key + 1, None);
            }
            let slot = match material_slots[key] {
                Some(slot) => slot,
                None => {
                    let [r, g, b, _] = material.pbr_metallic_roughness().base_color_factor();
                    model.materials.push([r, g, b]);
                    let slot = model.materials.len() - 1;
                    material_slots[key] = Some(slot);
                    slot
                }
            };

            model.parts.push(MeshPart {
                vertices,
                triangles,
                material: slot,
            });
        }
    }

    for child in node.children() {
        collect_node_parts(&child, world, buffers, model, material_slots);
    }
}

/// Check that an image decodes and return its dimensions.
pub fn probe_image(full_path: &Path) -> Result<(u32, u32), AssetError> {
    image::image_dimensions(full_path).map_err(|e| match e {
        image::ImageError::IoError(io) => AssetError::Io(io.to_string()),
        other => AssetError::Image(other.to_string()),
    })
}

#[derive(Debug, Clone)]
pub enum LoadedAsset {
    Model(ModelData),
    Image { width: u32, height: u32 },
}

impl LoadedAsset {
    pub fn into_model(self) -> Option<ModelData> {
        match self {
            Self::Model(model) => Some(model),
            Self::Image { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetKind {
    Model,
    Image,
}

/// How requests are served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// One worker thread per request.
    Background,
    /// Load during the request call. Results are still delivered by `poll`,
    /// which keeps scripted runs deterministic.
    Inline,
}

pub type LoadResult<K> = (K, Result<LoadedAsset, AssetError>);

/// Dispatches asset loads and collects their results.
pub struct AssetLoader<K> {
    root: PathBuf,
    mode: LoadMode,
    tx: mpsc::Sender<LoadResult<K>>,
    rx: mpsc::Receiver<LoadResult<K>>,
    in_flight: usize,
}

impl<K: Send + 'static> AssetLoader<K> {
    pub fn new(root: &Path, mode: LoadMode) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            root: root.to_path_buf(),
            mode,
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn request_model(&mut self, key: K, rel_path: &str) {
        self.dispatch(key, rel_path, AssetKind::Model);
    }

    pub fn request_image(&mut self, key: K, rel_path: &str) {
        self.dispatch(key, rel_path, AssetKind::Image);
    }

    fn dispatch(&mut self, key: K, rel_path: &str, kind: AssetKind) {
        let full_path = self.root.join(rel_path);
        let rel = rel_path.to_string();
        let tx = self.tx.clone();
        self.in_flight += 1;

        let job = move || {
            let result = match kind {
                AssetKind::Model => load_model(&full_path, &rel).map(LoadedAsset::Model),
                AssetKind::Image => {
                    probe_image(&full_path).map(|(width, height)| LoadedAsset::Image { width, height })
                }
            };
            // The receiver only goes away when the loader is dropped.
            let _ = tx.send((key, result));
        };

        match self.mode {
            LoadMode::Inline => job(),
            LoadMode::Background => {
                let spawned = std::thread::Builder::new()
                    .name(format!("asset-{}", rel_path))
                    .spawn(job);
                if let Err(e) = spawned {
                    tracing::error!("Failed to spawn loader thread for {}: {}", rel_path, e);
                    self.in_flight -= 1;
                }
            }
        }
    }

    /// Drain every load that finished since the last call.
    pub fn poll(&mut self) -> Vec<LoadResult<K>> {
        let mut done = Vec::new();
        while let Ok(result) = self.rx.try_recv() {
            done.push(result);
        }
        self.in_flight = self.in_flight.saturating_sub(done.len());
        done
    }

    /// Block until every outstanding load finished or `timeout` passed.
    pub fn wait_all(&mut self, timeout: std::time::Duration) -> Vec<LoadResult<K>> {
        let deadline = instant::Instant::now() + timeout;
        let mut done = Vec::new();
        while self.in_flight > done.len() {
            let remaining = deadline.saturating_duration_since(instant::Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(result) => done.push(result),
                Err(_) => break,
            }
        }
        self.in_flight = self.in_flight.saturating_sub(done.len());
        done
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}
