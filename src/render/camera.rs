use glam::{Mat4, Vec3};
use std::f32::consts::PI;

const MIN_POLAR: f32 = 1e-6;

/// Perspective camera with an explicitly refreshed projection matrix.
#[derive(Debug, Clone)]
pub struct Camera {
    pub fov_y_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    projection: Mat4,
    projection_updates: u32,
}

impl Camera {
    pub fn new(fov_y_deg: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov_y_deg,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            projection: Mat4::IDENTITY,
            projection_updates: 0,
        };
        camera.update_projection_matrix();
        camera.projection_updates = 0;
        camera
    }

    /// Recomputes the projection from `fov_y_deg`, `aspect`, `near` and `far`.
    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(
            self.fov_y_deg.to_radians(),
            self.aspect.max(1e-6),
            self.near,
            self.far,
        );
        self.projection_updates = self.projection_updates.saturating_add(1);
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn projection_updates(&self) -> u32 {
        self.projection_updates
    }
}

/// Orbit controls around `target`, expressed in spherical coordinates
/// (polar angle measured from +Y).
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pending_azimuth: f32,
    pending_polar: f32,
    pending_scale: f32,
    distance: f32,
    polar: f32,
    azimuth: f32,
    updates: u32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            pending_azimuth: 0.0,
            pending_polar: 0.0,
            pending_scale: 1.0,
            distance: 0.0,
            polar: PI * 0.5,
            azimuth: 0.0,
            updates: 0,
        }
    }
}

impl OrbitControls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an orbit step applied on the next `update`.
    pub fn rotate(&mut self, azimuth_delta: f32, polar_delta: f32) {
        self.pending_azimuth += azimuth_delta;
        self.pending_polar += polar_delta;
    }

    /// Queues a zoom; values above 1 move the camera away.
    pub fn dolly(&mut self, scale: f32) {
        if scale.is_finite() && scale > 0.0 {
            self.pending_scale *= scale;
        }
    }

    /// Reads the camera offset, applies queued input, clamps distance and
    /// polar angle to the current limits and writes the camera back.
    /// Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let offset = camera.position - self.target;
        let radius = offset.length();
        let (mut polar, mut azimuth) = if radius > 1e-6 {
            ((offset.y / radius).clamp(-1.0, 1.0).acos(), offset.x.atan2(offset.z))
        } else {
            (self.polar, self.azimuth)
        };

        azimuth += self.pending_azimuth;
        polar += self.pending_polar;
        polar = polar
            .clamp(self.min_polar_angle, self.max_polar_angle.max(self.min_polar_angle))
            .clamp(MIN_POLAR, PI - MIN_POLAR);

        let distance = (radius * self.pending_scale)
            .min(self.max_distance)
            .max(self.min_distance);

        self.pending_azimuth = 0.0;
        self.pending_polar = 0.0;
        self.pending_scale = 1.0;
        self.distance = distance;
        self.polar = polar;
        self.azimuth = azimuth;
        self.updates = self.updates.saturating_add(1);

        let sin_polar = polar.sin();
        let next = self.target
            + Vec3::new(
                distance * sin_polar * azimuth.sin(),
                distance * polar.cos(),
                distance * sin_polar * azimuth.cos(),
            );
        let moved = (next - camera.position).length_squared() > 1e-8;
        camera.position = next;
        camera.target = self.target;
        moved
    }

    /// Distance from the target after the last `update`.
    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn polar_angle(&self) -> f32 {
        self.polar
    }

    pub fn updates(&self) -> u32 {
        self.updates
    }
}

#[cfg(test)]
mod tests {
    use super::{Camera, OrbitControls};
    use glam::Vec3;
    use std::f32::consts::PI;

    fn camera_at(position: Vec3) -> Camera {
        let mut camera = Camera::new(90.0, 16.0 / 9.0, 0.1, 10_000.0);
        camera.position = position;
        camera
    }

    #[test]
    fn update_keeps_finite_state() {
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 100.0));
        let mut controls = OrbitControls::new();
        controls.update(&mut camera);
        assert!(camera.position.is_finite());
        assert!((controls.distance() - 100.0).abs() < 1e-3);
        assert!((controls.polar_angle() - PI * 0.5).abs() < 1e-5);
    }

    #[test]
    fn distance_is_clamped_to_limits() {
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 100.0));
        let mut controls = OrbitControls::new();
        controls.min_distance = 5.0;
        controls.max_distance = 5.0;
        controls.update(&mut camera);
        assert!((camera.position.length() - 5.0).abs() < 1e-4);

        controls.min_distance = 1.0;
        controls.max_distance = 10.0;
        controls.update(&mut camera);
        assert!((controls.distance() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn polar_angle_respects_floor_limit() {
        let mut camera = camera_at(Vec3::new(0.0, -50.0, 10.0));
        let mut controls = OrbitControls::new();
        controls.max_polar_angle = PI * 0.5;
        controls.update(&mut camera);
        assert!(camera.position.y >= -1e-3, "camera went below the floor");
    }

    #[test]
    fn rotate_and_dolly_apply_once() {
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 10.0));
        let mut controls = OrbitControls::new();
        controls.rotate(PI * 0.5, 0.0);
        controls.dolly(2.0);
        assert!(controls.update(&mut camera));
        assert!((camera.position - Vec3::new(20.0, 0.0, 0.0)).length() < 1e-3);
        assert!(!controls.update(&mut camera));
        assert_eq!(controls.updates(), 2);
    }

    #[test]
    fn projection_updates_are_counted() {
        let mut camera = camera_at(Vec3::Z);
        assert_eq!(camera.projection_updates(), 0);
        camera.near = 0.5;
        camera.update_projection_matrix();
        assert_eq!(camera.projection_updates(), 1);
        assert!(camera.projection().is_finite());
    }
}
