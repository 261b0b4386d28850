use std::time::Instant;

use super::animation::AnimationHandle;
use super::timing::FrameTiming;
use super::RenderSurface;

/// Headless stand-in for the per-frame render callback: advances orbit
/// controls and the attached animation.
pub struct RenderLoop {
    timing: FrameTiming,
    animation: Option<AnimationHandle>,
    frames: u64,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self {
            timing: FrameTiming::new(),
            animation: None,
            frames: 0,
        }
    }

    /// Replaces the animation driven by the loop; `None` detaches it.
    pub fn attach_animation(&mut self, animation: Option<AnimationHandle>) {
        match &animation {
            Some(_) => log::debug!("render loop: animation attached"),
            None if self.animation.is_some() => log::debug!("render loop: animation detached"),
            None => {}
        }
        self.animation = animation;
    }

    pub fn animation(&self) -> Option<&AnimationHandle> {
        self.animation.as_ref()
    }

    pub fn tick(&mut self, surface: &mut RenderSurface, now: Instant) {
        self.timing.update(now);
        let RenderSurface {
            camera, controls, ..
        } = surface;
        controls.update(camera);
        if let Some(animation) = &self.animation {
            animation.update(self.timing.frame_dt);
        }
        self.frames = self.frames.saturating_add(1);
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}
