use glam::Vec3;

use super::MeshHandle;

/// Moves the mesh so the center of its world-space bounding box sits at the
/// origin. The box covers the whole node hierarchy.
///
/// Returns the offset that was removed, or `None` if the mesh has no
/// geometry to measure.
pub fn center_at_origin(mesh: &MeshHandle) -> Option<Vec3> {
    let mut root = mesh.borrow_mut();
    let Some(bounds) = root.world_bounds() else {
        log::debug!("mesh {:?} has no bounds, leaving it in place", mesh.id());
        return None;
    };
    let center = bounds.center();
    root.transform.translation -= center;
    log::debug!(
        "centered mesh {:?} '{}' (offset {:.3}, {:.3}, {:.3})",
        mesh.id(),
        root.name,
        center.x,
        center.y,
        center.z
    );
    Some(center)
}
