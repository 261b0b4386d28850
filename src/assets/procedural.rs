use futures::channel::oneshot;
use glam::Vec3;
use std::path::Path;
use std::time::Duration;

use super::{apply_material, AssetError, AssetLoader, LoadFuture, ProgressFn};
use crate::catalog::MaterialDescription;
use crate::scene::{Aabb, AnimationClip, MeshHandle, SceneNode, Transform};

/// Stand-in geometry for running without model files. The same path always
/// yields the same boxes, placed off-origin so centering has work to do.
/// `.fbx` paths get a looping clip, as the rigged models do.
#[derive(Debug, Clone, Default)]
pub struct ProceduralLoader {
    latency: Duration,
}

impl ProceduralLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every load completes after `latency`, measured on a worker thread.
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

// FNV-1a; stable across runs and platforms.
fn path_hash(path: &str) -> u64 {
    path.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0100_0000_01b3)
    })
}

fn unit(hash: u64, shift: u32) -> f32 {
    ((hash >> shift) & 0xff) as f32 / 255.0
}

/// Deterministic node tree for `path`.
pub fn procedural_mesh(path: &str) -> SceneNode {
    let hash = path_hash(path);
    let extent = Vec3::new(
        20.0 + 200.0 * unit(hash, 0),
        20.0 + 200.0 * unit(hash, 8),
        20.0 + 200.0 * unit(hash, 16),
    );
    let offset = Vec3::new(
        -50.0 + 100.0 * unit(hash, 24),
        -50.0 + 100.0 * unit(hash, 32),
        -50.0 + 100.0 * unit(hash, 40),
    );
    let half = extent * 0.5;
    let base_height = extent.y * 0.1;

    let name = Path::new(path)
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("procedural");
    let body = SceneNode::new("body")
        .with_transform(Transform::from_translation(Vec3::new(0.0, base_height, 0.0)))
        .with_bounds(Aabb::new(
            Vec3::new(-half.x, 0.0, -half.z),
            Vec3::new(half.x, extent.y - base_height, half.z),
        ));
    let base = SceneNode::new("base").with_bounds(Aabb::new(
        Vec3::new(-half.x * 1.1, 0.0, -half.z * 1.1),
        Vec3::new(half.x * 1.1, base_height, half.z * 1.1),
    ));
    let mut root = SceneNode::new(name)
        .with_transform(Transform::from_translation(offset))
        .with_child(base)
        .with_child(body);

    let is_fbx = Path::new(path)
        .extension()
        .and_then(|value| value.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("fbx"));
    if is_fbx {
        root = root.with_animation(AnimationClip {
            name: "mixamo.com".to_string(),
            duration: 1.0 + 9.0 * unit(hash, 48),
        });
    }
    root
}

async fn sleep_on_worker(duration: Duration, path: &str) -> Result<(), AssetError> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        std::thread::sleep(duration);
        let _ = tx.send(());
    });
    rx.await.map_err(|_| AssetError::WorkerDisconnected {
        path: path.to_string(),
    })
}

impl AssetLoader for ProceduralLoader {
    fn load(&self, path: &str, material: &MaterialDescription, progress: ProgressFn) -> LoadFuture {
        let path = path.to_string();
        let material = material.clone();
        let latency = self.latency;
        Box::pin(async move {
            progress(0.0);
            if !latency.is_zero() {
                sleep_on_worker(latency, &path).await?;
            }
            let mut root = procedural_mesh(&path);
            apply_material(&mut root, &material);
            log::debug!("Generated placeholder mesh for {}", path);
            progress(1.0);
            Ok(MeshHandle::new(root))
        })
    }
}
