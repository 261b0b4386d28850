use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::scene::{AnimationClip, MeshHandle};

/// Something the render loop advances once per frame.
pub trait Animation {
    fn update(&mut self, dt: f32);

    /// Current playback position in seconds.
    fn time(&self) -> f32;
}

/// Loops the longest clip of a mesh.
pub struct AnimationPlayer {
    clip: AnimationClip,
    time: f32,
    pub speed: f32,
}

impl AnimationPlayer {
    /// Returns `None` when the mesh has no clip with a positive duration.
    pub fn for_mesh(mesh: &MeshHandle) -> Option<Self> {
        let clip = {
            let root = mesh.borrow();
            let mut longest: Option<AnimationClip> = None;
            root.visit(&mut |node| {
                for clip in &node.animations {
                    let longer = longest
                        .as_ref()
                        .map_or(true, |current| clip.duration > current.duration);
                    if clip.duration > 0.0 && longer {
                        longest = Some(clip.clone());
                    }
                }
            });
            longest?
        };
        Some(Self {
            clip,
            time: 0.0,
            speed: 1.0,
        })
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }
}

impl Animation for AnimationPlayer {
    fn update(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.time = (self.time + dt * self.speed).rem_euclid(self.clip.duration);
    }

    fn time(&self) -> f32 {
        self.time
    }
}

/// Shared, type-erased animation attached to the render loop.
#[derive(Clone)]
pub struct AnimationHandle(Rc<RefCell<dyn Animation>>);

impl AnimationHandle {
    pub fn new(animation: impl Animation + 'static) -> Self {
        Self(Rc::new(RefCell::new(animation)))
    }

    pub fn update(&self, dt: f32) {
        self.0.borrow_mut().update(dt);
    }

    pub fn time(&self) -> f32 {
        self.0.borrow().time()
    }

    pub fn ptr_eq(&self, other: &AnimationHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for AnimationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationHandle")
            .field("time", &self.time())
            .finish()
    }
}
