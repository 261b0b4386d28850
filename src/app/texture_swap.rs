use std::rc::Rc;

use crate::catalog::{CatalogItem, ConfiguratorState, SubItemPayload};
use crate::events::TextureSwapRequest;
use crate::scene::MeshHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSwapOutcome {
    /// The texture is on the product's mesh now.
    Applied,
    /// Remembered; applied once the product's mesh has been loaded.
    Deferred,
    /// Unknown product or sub-item.
    Ignored,
}

/// Handles `TextureSwap` events raised by sub-item activation.
pub struct TextureSwapHandler {
    state: Rc<ConfiguratorState>,
}

impl TextureSwapHandler {
    pub fn new(state: Rc<ConfiguratorState>) -> Self {
        Self { state }
    }

    pub fn handle(&self, request: &TextureSwapRequest) -> TextureSwapOutcome {
        let Some(item) = self.state.catalog().get(request.item) else {
            log::warn!("texture swap for unknown product {}", request.item);
            return TextureSwapOutcome::Ignored;
        };
        if item.sub_item(request.sub_item).is_none() {
            log::warn!(
                "texture swap for unknown sub-item {} of {}",
                request.sub_item,
                item.display_name()
            );
            return TextureSwapOutcome::Ignored;
        }

        self.state.set_selected_sub_item(item.id, request.sub_item);
        match self.state.meshes().get(item.id) {
            Some(mesh) => {
                apply_texture(&mesh, &request.texture_slot, &request.texture_url);
                log::info!(
                    "{}: {} -> {}",
                    item.display_name(),
                    request.texture_slot,
                    request.texture_url
                );
                TextureSwapOutcome::Applied
            }
            None => {
                log::debug!(
                    "{} not loaded yet, texture {} deferred",
                    item.display_name(),
                    request.sub_item
                );
                TextureSwapOutcome::Deferred
            }
        }
    }
}

/// Sets `slot` to `url` on every node of `mesh`.
pub fn apply_texture(mesh: &MeshHandle, slot: &str, url: &str) {
    mesh.borrow_mut()
        .visit_mut(&mut |node| node.material.set_texture(slot, url));
}

/// Applies the product's currently selected sub-item to its mesh. Returns
/// false when there is nothing to apply.
pub fn apply_selected_sub_item(
    state: &ConfiguratorState,
    item: &CatalogItem,
    mesh: &MeshHandle,
) -> bool {
    let Some(sub_item) = state
        .selected_sub_item(item.id)
        .and_then(|id| item.sub_item(id))
    else {
        return false;
    };
    match &sub_item.payload {
        SubItemPayload::TextureSwap {
            texture_slot,
            texture_url,
        } => apply_texture(mesh, texture_slot, texture_url),
    }
    true
}
