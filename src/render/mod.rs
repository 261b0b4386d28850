mod animation;
mod camera;
mod frame_loop;
pub mod framing;
pub mod lighting;
mod timing;

pub use animation::{Animation, AnimationHandle, AnimationPlayer};
pub use camera::{Camera, OrbitControls};
pub use frame_loop::RenderLoop;
pub use timing::FrameTiming;

use glam::Vec3;
use std::f32::consts::PI;

use crate::scene::{MeshHandle, SceneGraph};

/// Key light intensity in linear output.
pub const DEFAULT_LIGHT_INTENSITY: f32 = 0.7;
/// Key light intensity that looks equivalent with gamma output enabled.
pub const DEFAULT_GAMMA_REFERENCE_INTENSITY: f32 = 0.3;

// Roughly the light rig height used when the studio lights were authored.
const STUDIO_LIGHT_HEIGHT: f32 = 285.0;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("light intensities must be positive and finite (linear {linear}, gamma reference {gamma_reference})")]
    InvalidLightIntensity { linear: f32, gamma_reference: f32 },
    #[error("viewport aspect ratio must be positive and finite, got {0}")]
    InvalidAspect(f32),
}

/// Output settings of the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Renderer {
    pub gamma_output: bool,
    pub width: u32,
    pub height: u32,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            gamma_output: false,
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub name: String,
    pub color: [f32; 3],
    pub intensity: f32,
    pub direction: [f32; 3],
    pub cast_shadow: bool,
}

impl DirectionalLight {
    /// Light shining from `position` towards the origin.
    pub fn from_position(name: &str, position: Vec3, intensity: f32) -> Self {
        let direction = (-position).normalize_or_zero();
        Self {
            name: name.to_string(),
            color: [1.0, 1.0, 1.0],
            intensity,
            direction: direction.to_array(),
            cast_shadow: true,
        }
    }
}

/// Scene lights plus the intensity conversion factor between linear and
/// gamma output, fixed when the rig is built.
#[derive(Debug, Clone)]
pub struct LightRig {
    lights: Vec<DirectionalLight>,
    intensity_factor: f32,
}

impl LightRig {
    /// Key, fill and back light. Fill is half and back a quarter of the key.
    pub fn studio(linear_intensity: f32, gamma_reference_intensity: f32) -> Result<Self, RenderError> {
        let valid = |value: f32| value.is_finite() && value > 0.0;
        if !valid(linear_intensity) || !valid(gamma_reference_intensity) {
            return Err(RenderError::InvalidLightIntensity {
                linear: linear_intensity,
                gamma_reference: gamma_reference_intensity,
            });
        }
        let height = STUDIO_LIGHT_HEIGHT;
        let lights = vec![
            DirectionalLight::from_position(
                "key",
                Vec3::new(-247.0, height, 209.0),
                linear_intensity,
            ),
            DirectionalLight::from_position(
                "fill",
                Vec3::new(212.0, height, 250.0),
                linear_intensity / 2.0,
            ),
            DirectionalLight::from_position(
                "back",
                Vec3::new(-153.0, height, -183.0),
                linear_intensity / 4.0,
            ),
        ];
        Ok(Self {
            lights,
            intensity_factor: linear_intensity / gamma_reference_intensity,
        })
    }

    pub fn lights(&self) -> &[DirectionalLight] {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut [DirectionalLight] {
        &mut self.lights
    }

    /// `linear / gamma reference` intensity.
    pub fn intensity_factor(&self) -> f32 {
        self.intensity_factor
    }
}

/// Everything the configurator mutates on the rendering side.
pub struct RenderSurface {
    pub scene: SceneGraph,
    pub camera: Camera,
    pub controls: OrbitControls,
    pub renderer: Renderer,
    pub lights: LightRig,
}

impl RenderSurface {
    pub fn new(aspect: f32) -> Result<Self, RenderError> {
        let rig = LightRig::studio(DEFAULT_LIGHT_INTENSITY, DEFAULT_GAMMA_REFERENCE_INTENSITY)?;
        Self::with_lights(aspect, rig)
    }

    pub fn with_lights(aspect: f32, lights: LightRig) -> Result<Self, RenderError> {
        if !aspect.is_finite() || aspect <= 0.0 {
            return Err(RenderError::InvalidAspect(aspect));
        }
        let mut camera = Camera::new(90.0, aspect, 0.1, 10_000.0);
        camera.position = Vec3::new(0.0, 0.0, 100.0);

        let mut controls = OrbitControls::new();
        controls.max_polar_angle = PI;
        controls.min_polar_angle = 0.0;
        controls.update(&mut camera);

        Ok(Self {
            scene: SceneGraph::new(),
            camera,
            controls,
            renderer: Renderer::default(),
            lights,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.renderer.width = width;
        self.renderer.height = height;
        self.camera.aspect = width as f32 / height as f32;
        self.camera.update_projection_matrix();
    }

    /// See [`lighting::set_gamma_space`].
    pub fn set_gamma_space(&mut self, enabled: bool) -> bool {
        lighting::set_gamma_space(&mut self.renderer, &mut self.lights, enabled)
    }

    /// See [`framing::frame`].
    pub fn frame(&mut self, mesh: &MeshHandle, has_floor: bool) -> Option<f32> {
        framing::frame(&mut self.camera, &mut self.controls, mesh, has_floor)
    }
}

#[cfg(test)]
mod tests {
    use super::{LightRig, RenderError, RenderSurface};

    #[test]
    fn studio_rig_has_three_lights() {
        let rig = LightRig::studio(0.7, 0.3).unwrap();
        let intensities: Vec<f32> = rig.lights().iter().map(|light| light.intensity).collect();
        assert_eq!(intensities, vec![0.7, 0.35, 0.175]);
        assert!((rig.intensity_factor() - 0.7 / 0.3).abs() < 1e-6);
        for light in rig.lights() {
            let [x, y, z] = light.direction;
            assert!(((x * x + y * y + z * z).sqrt() - 1.0).abs() < 1e-5);
            assert!(y < 0.0, "lights shine downwards");
        }
    }

    #[test]
    fn studio_rig_rejects_zero_reference() {
        assert!(matches!(
            LightRig::studio(0.7, 0.0),
            Err(RenderError::InvalidLightIntensity { .. })
        ));
    }

    #[test]
    fn surface_starts_in_linear_mode() {
        let surface = RenderSurface::new(16.0 / 9.0).unwrap();
        assert!(!surface.renderer.gamma_output);
        assert!(surface.scene.is_empty());
        assert!((surface.camera.position.z - 100.0).abs() < 1e-3);
    }

    #[test]
    fn resize_updates_aspect() {
        let mut surface = RenderSurface::new(1.0).unwrap();
        surface.resize(1920, 1080);
        assert!((surface.camera.aspect - 1920.0 / 1080.0).abs() < 1e-6);
        surface.resize(0, 10);
        assert_eq!(surface.renderer.width, 1920);
        assert!(RenderSurface::new(0.0).is_err());
    }
}
