pub mod serialization;
mod state;

pub use state::{ConfiguratorState, LoadFailure, MeshCache, Selection, SharedLoad, Ticket};

use std::collections::HashSet;
use std::fmt;

use crate::events::{ConfiguratorEvent, EventKind, TextureSwapRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SubItemId(pub u32);

impl fmt::Display for SubItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a product's material is set up after its mesh is loaded.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MaterialDescription {
    /// Material library shipped next to the mesh (OBJ `.mtl`).
    pub mtl: Option<String>,
    pub normal_map: Option<String>,
    pub diffuse_map: Option<String>,
    pub render_backface: bool,
    /// 0xRRGGBB
    pub color: Option<u32>,
}

/// Data carried by a sub-item to whoever handles its event.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubItemPayload {
    TextureSwap {
        texture_slot: String,
        texture_url: String,
    },
}

impl SubItemPayload {
    pub fn event_kind(&self) -> EventKind {
        match self {
            SubItemPayload::TextureSwap { .. } => EventKind::TextureSwap,
        }
    }
}

/// A variant of a product (e.g. an alternative texture).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubItem {
    pub id: SubItemId,
    pub image: String,
    #[serde(default)]
    pub tooltip: String,
    pub event: EventKind,
    pub payload: SubItemPayload,
}

impl SubItem {
    /// Event to publish when the user activates this sub-item of `item`.
    pub fn activation_event(&self, item: ItemId) -> ConfiguratorEvent {
        match &self.payload {
            SubItemPayload::TextureSwap {
                texture_slot,
                texture_url,
            } => ConfiguratorEvent::TextureSwap(TextureSwapRequest {
                item,
                sub_item: self.id,
                texture_slot: texture_slot.clone(),
                texture_url: texture_url.clone(),
            }),
        }
    }
}

/// A selectable product.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub thumbnail: String,
    #[serde(default)]
    pub tooltip: String,
    pub file_path: String,
    #[serde(default)]
    pub material: MaterialDescription,
    #[serde(default)]
    pub has_floor: bool,
    #[serde(default)]
    pub use_gamma_space: bool,
    #[serde(default)]
    pub sub_items: Vec<SubItem>,
    #[serde(default)]
    pub default_sub_item: Option<SubItemId>,
}

impl CatalogItem {
    pub fn sub_item(&self, id: SubItemId) -> Option<&SubItem> {
        self.sub_items.iter().find(|sub| sub.id == id)
    }

    /// File name of the mesh, for display.
    pub fn display_name(&self) -> &str {
        self.file_path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.file_path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog is empty")]
    Empty,
    #[error("duplicate catalog id {0}")]
    DuplicateId(ItemId),
    #[error("catalog item {0} has no file path")]
    MissingFilePath(ItemId),
    #[error("catalog item {item} has duplicate sub-item id {sub_item}")]
    DuplicateSubItem { item: ItemId, sub_item: SubItemId },
    #[error("catalog item {item} defaults to unknown sub-item {sub_item}")]
    UnknownDefaultSubItem { item: ItemId, sub_item: SubItemId },
    #[error("sub-item {sub_item} of {item} triggers {event:?} but carries a {payload:?} payload")]
    PayloadMismatch {
        item: ItemId,
        sub_item: SubItemId,
        event: EventKind,
        payload: EventKind,
    },
}

/// Ordered, validated list of products.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    /// Validates the items; broken entries are rejected here rather than
    /// when they are selected.
    pub fn new(items: Vec<CatalogItem>) -> Result<Self, CatalogError> {
        if items.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut ids = HashSet::new();
        for item in &items {
            if !ids.insert(item.id) {
                return Err(CatalogError::DuplicateId(item.id));
            }
            if item.file_path.trim().is_empty() {
                return Err(CatalogError::MissingFilePath(item.id));
            }
            let mut sub_ids = HashSet::new();
            for sub in &item.sub_items {
                if !sub_ids.insert(sub.id) {
                    return Err(CatalogError::DuplicateSubItem {
                        item: item.id,
                        sub_item: sub.id,
                    });
                }
                if sub.payload.event_kind() != sub.event {
                    return Err(CatalogError::PayloadMismatch {
                        item: item.id,
                        sub_item: sub.id,
                        event: sub.event,
                        payload: sub.payload.event_kind(),
                    });
                }
            }
            if let Some(default) = item.default_sub_item {
                if !sub_ids.contains(&default) {
                    return Err(CatalogError::UnknownDefaultSubItem {
                        item: item.id,
                        sub_item: default,
                    });
                }
            }
        }
        Ok(Self { items })
    }

    /// The products bundled with the application.
    pub fn default_catalog() -> Self {
        Self {
            items: default_items(),
        }
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn get(&self, id: ItemId) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Initial selection.
    pub fn first(&self) -> &CatalogItem {
        &self.items[0]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn product(
    id: u32,
    thumbnail: &str,
    file_path: &str,
    material: MaterialDescription,
    has_floor: bool,
    use_gamma_space: bool,
) -> CatalogItem {
    CatalogItem {
        id: ItemId(id),
        thumbnail: thumbnail.to_string(),
        tooltip: String::new(),
        file_path: file_path.to_string(),
        material,
        has_floor,
        use_gamma_space,
        sub_items: Vec::new(),
        default_sub_item: None,
    }
}

fn chair_texture(id: u32, url: &str, tooltip: &str) -> SubItem {
    SubItem {
        id: SubItemId(id),
        image: url.to_string(),
        tooltip: tooltip.to_string(),
        event: EventKind::TextureSwap,
        payload: SubItemPayload::TextureSwap {
            texture_slot: "map".to_string(),
            texture_url: url.to_string(),
        },
    }
}

fn default_items() -> Vec<CatalogItem> {
    let pbr = MaterialDescription::default;

    let mut ikea_chair = product(
        7,
        "assets/models/pbr/thumbnail_ikea_chair.png",
        "assets/models/pbr/IKEA_chear.gltf",
        pbr(),
        false,
        true,
    );
    ikea_chair.sub_items = vec![
        chair_texture(0, "assets/models/pbr/chair_mat_baseColor.png", "White chair"),
        chair_texture(1, "assets/models/pbr/chair_mat_baseColor_alt.png", "Blue chair"),
    ];
    ikea_chair.default_sub_item = Some(SubItemId(0));

    vec![
        product(
            0,
            "assets/models/thumbnail_Samba Dancing.png",
            "assets/models/fbx/Samba Dancing.fbx",
            MaterialDescription {
                render_backface: true,
                color: Some(0xff0202),
                ..Default::default()
            },
            false,
            false,
        ),
        product(
            1,
            "assets/models/thumbnail_pr2_head_pan.png",
            "assets/models/stl/ascii/pr2_head_pan.stl",
            MaterialDescription {
                render_backface: true,
                color: Some(0x00ffff),
                ..Default::default()
            },
            false,
            false,
        ),
        product(
            2,
            "assets/models/thumbnail_pot.png",
            "assets/models/flowerpot.obj",
            MaterialDescription {
                mtl: Some("assets/models/flowerpot.mtl".to_string()),
                render_backface: true,
                ..Default::default()
            },
            false,
            false,
        ),
        product(
            3,
            "assets/models/thumbnail_rose.png",
            "assets/models/rose.obj",
            MaterialDescription {
                diffuse_map: Some("assets/models/rose.png".to_string()),
                normal_map: Some("assets/models/rosenormal.png".to_string()),
                ..Default::default()
            },
            false,
            false,
        ),
        product(
            4,
            "assets/models/thumbnail_wuffels.png",
            "assets/models/wuffels.obj",
            MaterialDescription {
                diffuse_map: Some("assets/models/wuffels.png".to_string()),
                ..Default::default()
            },
            true,
            false,
        ),
        product(
            5,
            "assets/models/pbr/thumbnail_wayfair_table.png",
            "assets/models/pbr/Waifair_table.gltf",
            pbr(),
            false,
            true,
        ),
        product(
            6,
            "assets/models/pbr/thumbnail_wayfair_chair.png",
            "assets/models/pbr/Waifair_chair.gltf",
            pbr(),
            false,
            true,
        ),
        ikea_chair,
        product(
            8,
            "assets/models/pbr/thumbnail_ikea_table.png",
            "assets/models/pbr/IKEA_table.gltf",
            pbr(),
            false,
            true,
        ),
    ]
}
