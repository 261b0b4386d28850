use std::f32::consts::PI;

use super::{Camera, OrbitControls};
use crate::scene::MeshHandle;

/// Fits the camera to a (centered) mesh.
///
/// Clip planes scale with the bounding-box diagonal. The orbit distance is
/// snapped to `1.15 * size` by collapsing the limits for one update, then the
/// limits are relaxed to `[0.75 * size, 1.5 * size]`. With a floor the camera
/// may not orbit below the horizon.
///
/// Returns the diagonal used, or `None` for a mesh without usable geometry
/// (no bounds, or a diagonal that is zero or not finite).
pub fn frame(
    camera: &mut Camera,
    controls: &mut OrbitControls,
    mesh: &MeshHandle,
    has_floor: bool,
) -> Option<f32> {
    let Some(bounds) = mesh.borrow().world_bounds() else {
        log::warn!("cannot frame mesh {:?}: no bounds", mesh.id());
        return None;
    };
    let size = bounds.diagonal();
    if !size.is_finite() || size <= 0.0 {
        log::warn!("cannot frame mesh {:?}: degenerate size {}", mesh.id(), size);
        return None;
    }

    camera.near = size / 100.0;
    camera.far = size * 100.0;
    camera.update_projection_matrix();

    controls.max_distance = size * 1.15;
    controls.min_distance = size * 1.15;
    controls.update(camera);

    controls.max_distance = size * 1.5;
    controls.min_distance = size * 0.75;
    controls.max_polar_angle = if has_floor { PI * 0.5 } else { PI };
    controls.update(camera);

    log::debug!(
        "framed mesh {:?}: size {:.3}, near {:.4}, far {:.1}, floor {}",
        mesh.id(),
        size,
        camera.near,
        camera.far,
        has_floor
    );
    Some(size)
}

#[cfg(test)]
mod tests {
    use super::frame;
    use crate::render::{Camera, OrbitControls};
    use crate::scene::{Aabb, MeshHandle, SceneNode};
    use glam::Vec3;
    use std::f32::consts::PI;

    fn setup() -> (Camera, OrbitControls) {
        let mut camera = Camera::new(90.0, 1.5, 0.1, 10_000.0);
        camera.position = Vec3::new(0.0, 0.0, 100.0);
        (camera, OrbitControls::new())
    }

    fn mesh_with_half_extent(half: Vec3) -> (MeshHandle, f32) {
        let bounds = Aabb::new(-half, half);
        let mesh = MeshHandle::new(SceneNode::new("mesh").with_bounds(bounds));
        (mesh, bounds.diagonal())
    }

    #[test]
    fn framing_sets_clip_planes_and_distance_limits() {
        let (mut camera, mut controls) = setup();
        let (mesh, size) = mesh_with_half_extent(Vec3::new(1.0, 2.0, 3.0));
        let result = frame(&mut camera, &mut controls, &mesh, false);

        assert_eq!(result, Some(size));
        assert!((camera.near - size / 100.0).abs() < 1e-6);
        assert!((camera.far - size * 100.0).abs() < 1e-3);
        assert!((controls.min_distance - size * 0.75).abs() < 1e-6);
        assert!((controls.max_distance - size * 1.5).abs() < 1e-6);
        assert_eq!(controls.max_polar_angle, PI);
    }

    #[test]
    fn framing_snaps_camera_distance() {
        let (mut camera, mut controls) = setup();
        let (mesh, size) = mesh_with_half_extent(Vec3::splat(0.5));
        frame(&mut camera, &mut controls, &mesh, true);

        assert!((controls.distance() - size * 1.15).abs() < 1e-4);
        assert!((camera.position.length() - size * 1.15).abs() < 1e-4);
        assert_eq!(controls.max_polar_angle, PI * 0.5);
        assert_eq!(camera.projection_updates(), 1);
        assert_eq!(controls.updates(), 2);
    }

    #[test]
    fn framing_without_bounds_leaves_camera() {
        let (mut camera, mut controls) = setup();
        let mesh = MeshHandle::new(SceneNode::new("empty"));
        assert!(frame(&mut camera, &mut controls, &mesh, true).is_none());
        assert_eq!(camera.near, 0.1);
        assert_eq!(controls.updates(), 0);
    }

    #[test]
    fn framing_degenerate_bounds_leaves_camera() {
        let (mut camera, mut controls) = setup();
        let point = MeshHandle::new(
            SceneNode::new("point").with_bounds(Aabb::new(Vec3::ONE, Vec3::ONE)),
        );
        assert!(frame(&mut camera, &mut controls, &point, false).is_none());

        let infinite = Aabb::new(Vec3::ZERO, Vec3::new(f32::INFINITY, 0.0, 0.0));
        let huge = MeshHandle::new(SceneNode::new("huge").with_bounds(infinite));
        assert!(frame(&mut camera, &mut controls, &huge, false).is_none());
        assert_eq!(camera.near, 0.1);
        assert_eq!(camera.far, 10_000.0);
        assert_eq!(camera.projection_updates(), 0);
        assert_eq!(controls.updates(), 0);
    }
}
