use glam::{Mat4, Quat, Vec3};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::AssetError;
use crate::scene::{Aabb, AnimationClip, SceneNode, Transform};

// Only the parts of a glTF document needed for hierarchy, bounds and clip
// lengths. Buffers are never read: POSITION accessors carry min/max.

#[derive(Deserialize)]
struct Document {
    scene: Option<usize>,
    #[serde(default)]
    scenes: Vec<GltfScene>,
    #[serde(default)]
    nodes: Vec<GltfNode>,
    #[serde(default)]
    meshes: Vec<GltfMesh>,
    #[serde(default)]
    accessors: Vec<Accessor>,
    #[serde(default)]
    animations: Vec<GltfAnimation>,
}

#[derive(Deserialize)]
struct GltfScene {
    #[serde(default)]
    nodes: Vec<usize>,
}

#[derive(Deserialize)]
struct GltfNode {
    name: Option<String>,
    #[serde(default)]
    children: Vec<usize>,
    mesh: Option<usize>,
    matrix: Option<[f32; 16]>,
    translation: Option<[f32; 3]>,
    rotation: Option<[f32; 4]>,
    scale: Option<[f32; 3]>,
}

#[derive(Deserialize)]
struct GltfMesh {
    #[serde(default)]
    primitives: Vec<Primitive>,
}

#[derive(Deserialize)]
struct Primitive {
    #[serde(default)]
    attributes: BTreeMap<String, usize>,
}

#[derive(Deserialize)]
struct Accessor {
    min: Option<Vec<f32>>,
    max: Option<Vec<f32>>,
}

#[derive(Deserialize)]
struct GltfAnimation {
    name: Option<String>,
    #[serde(default)]
    samplers: Vec<Sampler>,
}

#[derive(Deserialize)]
struct Sampler {
    input: usize,
}

struct Builder<'a> {
    path: &'a str,
    doc: &'a Document,
    on_path: Vec<bool>,
}

impl Builder<'_> {
    fn error(&self, reason: impl Into<String>) -> AssetError {
        AssetError::ParseGltf {
            path: self.path.to_string(),
            reason: reason.into(),
        }
    }

    fn accessor(&self, index: usize) -> Result<&Accessor, AssetError> {
        self.doc
            .accessors
            .get(index)
            .ok_or_else(|| self.error(format!("accessor {} out of range", index)))
    }

    fn mesh_bounds(&self, index: usize) -> Result<Option<Aabb>, AssetError> {
        let mesh = self
            .doc
            .meshes
            .get(index)
            .ok_or_else(|| self.error(format!("mesh {} out of range", index)))?;
        let mut bounds: Option<Aabb> = None;
        for primitive in &mesh.primitives {
            let Some(&position) = primitive.attributes.get("POSITION") else {
                continue;
            };
            let accessor = self.accessor(position)?;
            let (Some(min), Some(max)) = (&accessor.min, &accessor.max) else {
                return Err(self.error(format!("POSITION accessor {} has no min/max", position)));
            };
            if min.len() < 3 || max.len() < 3 {
                return Err(self.error(format!("POSITION accessor {} is not a vec3", position)));
            }
            if min[..3].iter().chain(&max[..3]).any(|value| !value.is_finite()) {
                return Err(self.error(format!(
                    "POSITION accessor {} has non-finite bounds",
                    position
                )));
            }
            let primitive_bounds = Aabb::new(
                Vec3::new(min[0], min[1], min[2]),
                Vec3::new(max[0], max[1], max[2]),
            );
            bounds = Some(match bounds {
                Some(current) => current.union(&primitive_bounds),
                None => primitive_bounds,
            });
        }
        Ok(bounds)
    }

    fn node(&mut self, index: usize) -> Result<SceneNode, AssetError> {
        let doc = self.doc;
        let source = doc
            .nodes
            .get(index)
            .ok_or_else(|| self.error(format!("node {} out of range", index)))?;
        if self.on_path[index] {
            return Err(self.error(format!("node {} is its own ancestor", index)));
        }
        self.on_path[index] = true;

        let mut node = SceneNode::new(
            source
                .name
                .clone()
                .unwrap_or_else(|| format!("node_{}", index)),
        )
        .with_transform(node_transform(source));
        if let Some(mesh) = source.mesh {
            node.bounds = self.mesh_bounds(mesh)?;
        }
        for &child in &source.children {
            node.children.push(self.node(child)?);
        }

        self.on_path[index] = false;
        Ok(node)
    }

    fn root_indices(&self) -> Result<Vec<usize>, AssetError> {
        if self.doc.scenes.is_empty() {
            let mut referenced = vec![false; self.doc.nodes.len()];
            for node in &self.doc.nodes {
                for &child in &node.children {
                    if let Some(flag) = referenced.get_mut(child) {
                        *flag = true;
                    }
                }
            }
            return Ok((0..self.doc.nodes.len())
                .filter(|&index| !referenced[index])
                .collect());
        }
        let scene = self.doc.scene.unwrap_or(0);
        self.doc
            .scenes
            .get(scene)
            .map(|scene| scene.nodes.clone())
            .ok_or_else(|| self.error(format!("scene {} out of range", scene)))
    }

    fn animations(&self) -> Result<Vec<AnimationClip>, AssetError> {
        let mut clips = Vec::with_capacity(self.doc.animations.len());
        for (index, animation) in self.doc.animations.iter().enumerate() {
            let mut duration: f32 = 0.0;
            for sampler in &animation.samplers {
                let input = self.accessor(sampler.input)?;
                if let Some(end) = input.max.as_ref().and_then(|max| max.first()) {
                    duration = duration.max(*end);
                }
            }
            clips.push(AnimationClip {
                name: animation
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("animation_{}", index)),
                duration,
            });
        }
        Ok(clips)
    }
}

fn node_transform(node: &GltfNode) -> Transform {
    if let Some(matrix) = node.matrix {
        return Transform::from_matrix(&Mat4::from_cols_array(&matrix));
    }
    let mut transform = Transform::default();
    if let Some(translation) = node.translation {
        transform.translation = Vec3::from_array(translation);
    }
    if let Some(rotation) = node.rotation {
        transform.rotation = Quat::from_array(rotation).normalize();
    }
    if let Some(scale) = node.scale {
        transform.scale = Vec3::from_array(scale);
    }
    transform
}

/// Builds a node tree from a glTF JSON document. The returned root is a
/// synthetic node named after the file, holding the scene's root nodes and
/// every animation clip.
pub(super) fn parse(path: &str, bytes: &[u8]) -> Result<SceneNode, AssetError> {
    let doc: Document = serde_json::from_slice(bytes).map_err(|err| AssetError::ParseGltf {
        path: path.to_string(),
        reason: err.to_string(),
    })?;
    let mut builder = Builder {
        path,
        on_path: vec![false; doc.nodes.len()],
        doc: &doc,
    };

    let name = Path::new(path)
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("gltf");
    let mut root = SceneNode::new(name);
    for index in builder.root_indices()? {
        let child = builder.node(index)?;
        root.children.push(child);
    }
    root.animations = builder.animations()?;
    Ok(root)
}
