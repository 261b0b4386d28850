mod bounds;
mod normalize;

pub use bounds::Aabb;
pub use normalize::center_at_origin;

use glam::{Mat4, Quat, Vec3};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Local transform of a scene node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Rotation is applied after scale, translation last.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Material parameters applied to a node after loading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialState {
    pub base_color: Option<u32>,
    pub double_sided: bool,
    pub library: Option<String>,
    /// Texture slot name (`map`, `normalMap`, ...) to texture URL.
    pub textures: BTreeMap<String, String>,
}

impl MaterialState {
    pub fn set_texture(&mut self, slot: &str, url: &str) {
        self.textures.insert(slot.to_string(), url.to_string());
    }

    pub fn texture(&self, slot: &str) -> Option<&str> {
        self.textures.get(slot).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// Seconds.
    pub duration: f32,
}

/// A node of a loaded mesh hierarchy.
#[derive(Debug, Clone, Default)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    /// Bounds of this node's own geometry in local space.
    pub bounds: Option<Aabb>,
    pub material: MaterialState,
    pub animations: Vec<AnimationClip>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_animation(mut self, clip: AnimationClip) -> Self {
        self.animations.push(clip);
        self
    }

    /// World-space bounds of the whole hierarchy, treating this node as a
    /// direct child of the scene root.
    pub fn world_bounds(&self) -> Option<Aabb> {
        bounds::subtree_bounds(self, Mat4::IDENTITY)
    }

    pub fn visit_mut(&mut self, visitor: &mut impl FnMut(&mut SceneNode)) {
        visitor(self);
        for child in &mut self.children {
            child.visit_mut(visitor);
        }
    }

    pub fn visit(&self, visitor: &mut impl FnMut(&SceneNode)) {
        visitor(self);
        for child in &self.children {
            child.visit(visitor);
        }
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.visit(&mut |_| count += 1);
        count
    }
}

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u64);

/// Shared handle to a loaded mesh hierarchy. Clones refer to the same mesh.
#[derive(Clone)]
pub struct MeshHandle {
    id: MeshId,
    root: Rc<RefCell<SceneNode>>,
}

impl MeshHandle {
    pub fn new(root: SceneNode) -> Self {
        Self {
            id: MeshId(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed)),
            root: Rc::new(RefCell::new(root)),
        }
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn borrow(&self) -> Ref<'_, SceneNode> {
        self.root.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, SceneNode> {
        self.root.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &MeshHandle) -> bool {
        Rc::ptr_eq(&self.root, &other.root)
    }
}

impl PartialEq for MeshHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for MeshHandle {}

impl fmt::Debug for MeshHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("MeshHandle");
        debug.field("id", &self.id);
        match self.root.try_borrow() {
            Ok(root) => debug.field("name", &root.name),
            Err(_) => debug.field("name", &"<borrowed>"),
        };
        debug.finish()
    }
}

/// The set of meshes currently attached to the render graph.
#[derive(Debug, Default)]
pub struct SceneGraph {
    attached: Vec<MeshHandle>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            attached: Vec::new(),
        }
    }

    /// Returns false if the mesh was already attached.
    pub fn add(&mut self, mesh: MeshHandle) -> bool {
        if self.contains(&mesh) {
            return false;
        }
        log::debug!("scene: attach {:?}", mesh);
        self.attached.push(mesh);
        true
    }

    /// Returns false if the mesh was not attached.
    pub fn remove(&mut self, mesh: &MeshHandle) -> bool {
        let before = self.attached.len();
        self.attached.retain(|attached| !attached.ptr_eq(mesh));
        let removed = self.attached.len() != before;
        if removed {
            log::debug!("scene: detach {:?}", mesh);
        }
        removed
    }

    pub fn contains(&self, mesh: &MeshHandle) -> bool {
        self.attached.iter().any(|attached| attached.ptr_eq(mesh))
    }

    pub fn attached(&self) -> &[MeshHandle] {
        &self.attached
    }

    pub fn len(&self) -> usize {
        self.attached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }
}
