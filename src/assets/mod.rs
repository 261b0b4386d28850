mod gltf;
mod obj;
mod procedural;

pub use procedural::ProceduralLoader;

use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::catalog::MaterialDescription;
use crate::scene::{MeshHandle, SceneNode};

/// Receives load progress as a fraction in `[0, 1]`.
pub type ProgressFn = Rc<dyn Fn(f32)>;

/// A pending mesh load. Loads run to completion once polled; there is no
/// cancellation.
pub type LoadFuture = LocalBoxFuture<'static, Result<MeshHandle, AssetError>>;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read mesh at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported mesh format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to parse glTF {path}: {reason}")]
    ParseGltf { path: String, reason: String },
    #[error("failed to parse OBJ {path} at line {line}: {reason}")]
    ParseObj {
        path: String,
        line: usize,
        reason: String,
    },
    #[error("mesh {path} contains no geometry")]
    EmptyMesh { path: String },
    #[error("loader worker for {path} went away")]
    WorkerDisconnected { path: String },
}

/// Turns a catalog file path into a scene hierarchy.
pub trait AssetLoader {
    fn load(&self, path: &str, material: &MaterialDescription, progress: ProgressFn)
        -> LoadFuture;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MeshFormat {
    Gltf,
    Obj,
}

impl MeshFormat {
    fn from_path(path: &str) -> Result<Self, AssetError> {
        let extension = Path::new(path)
            .extension()
            .and_then(|value| value.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("gltf") => Ok(MeshFormat::Gltf),
            Some("obj") => Ok(MeshFormat::Obj),
            _ => Err(AssetError::UnsupportedFormat(path.to_string())),
        }
    }
}

/// Loads `.gltf` and `.obj` files relative to `root`. The file is read on a
/// worker thread; parsing happens on the executor once the bytes arrive.
pub struct FileAssetLoader {
    root: PathBuf,
}

impl FileAssetLoader {
    /// The directory does not need to exist yet; it is checked at load time.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl AssetLoader for FileAssetLoader {
    fn load(&self, path: &str, material: &MaterialDescription, progress: ProgressFn) -> LoadFuture {
        let full_path = self.resolve(path);
        let path = path.to_string();
        let material = material.clone();
        Box::pin(async move {
            let format = MeshFormat::from_path(&path)?;
            progress(0.0);

            let bytes = read_on_worker(full_path).await.map_err(|err| match err {
                ReadError::Io(source) => AssetError::Read {
                    path: path.clone(),
                    source,
                },
                ReadError::Canceled => AssetError::WorkerDisconnected { path: path.clone() },
            })?;
            progress(0.5);

            let mut root = match format {
                MeshFormat::Gltf => gltf::parse(&path, &bytes)?,
                MeshFormat::Obj => obj::parse(&path, &bytes)?,
            };
            let size = root.world_bounds().map(|bounds| bounds.diagonal());
            if !size.is_some_and(|size| size.is_finite() && size > 0.0) {
                return Err(AssetError::EmptyMesh { path });
            }
            apply_material(&mut root, &material);
            log::info!("Loaded {} ({} nodes)", path, root.node_count());
            progress(1.0);
            Ok(MeshHandle::new(root))
        })
    }
}

enum ReadError {
    Io(std::io::Error),
    Canceled,
}

async fn read_on_worker(path: PathBuf) -> Result<Vec<u8>, ReadError> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let _ = tx.send(std::fs::read(&path));
    });
    match rx.await {
        Ok(result) => result.map_err(ReadError::Io),
        Err(oneshot::Canceled) => Err(ReadError::Canceled),
    }
}

/// Applies a catalog material description to every node of a loaded mesh.
pub fn apply_material(root: &mut SceneNode, material: &MaterialDescription) {
    root.visit_mut(&mut |node| {
        if material.color.is_some() {
            node.material.base_color = material.color;
        }
        node.material.double_sided = material.render_backface;
        if let Some(library) = &material.mtl {
            node.material.library = Some(library.clone());
        }
        if let Some(url) = &material.diffuse_map {
            node.material.set_texture("map", url);
        }
        if let Some(url) = &material.normal_map {
            node.material.set_texture("normalMap", url);
        }
    });
}
