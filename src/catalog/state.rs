use futures::future::{LocalBoxFuture, Shared};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::{Catalog, CatalogItem, ItemId, SubItemId};
use crate::assets::AssetError;
use crate::scene::MeshHandle;

/// Load error shared between every request waiting on the same load.
pub type LoadFailure = Rc<AssetError>;

/// A load that several switch requests may await at once.
pub type SharedLoad = Shared<LocalBoxFuture<'static, Result<MeshHandle, LoadFailure>>>;

/// Issued once per selection change; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub item: Option<ItemId>,
    pub ticket: Ticket,
}

enum CacheEntry {
    Loading(SharedLoad),
    Ready(MeshHandle),
}

/// Side-table of loaded meshes by catalog id. Entries are created on first
/// selection and kept for the whole session; failed loads leave no entry.
#[derive(Default)]
pub struct MeshCache {
    entries: RefCell<HashMap<ItemId, CacheEntry>>,
}

impl MeshCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The finished mesh for `id`, if any.
    pub fn get(&self, id: ItemId) -> Option<MeshHandle> {
        match self.entries.borrow().get(&id) {
            Some(CacheEntry::Ready(mesh)) => Some(mesh.clone()),
            _ => None,
        }
    }

    pub fn is_loading(&self, id: ItemId) -> bool {
        matches!(self.entries.borrow().get(&id), Some(CacheEntry::Loading(_)))
    }

    /// Returns the in-flight load for `id`, starting one with `start` if
    /// there is none. Must not be called for an item that is already ready.
    pub fn load_or_join<F>(&self, id: ItemId, start: F) -> SharedLoad
    where
        F: FnOnce() -> LocalBoxFuture<'static, Result<MeshHandle, LoadFailure>>,
    {
        if let Some(CacheEntry::Loading(load)) = self.entries.borrow().get(&id) {
            log::debug!("joining in-flight load of {}", id);
            return load.clone();
        }
        let load = futures::FutureExt::shared(start());
        self.entries
            .borrow_mut()
            .insert(id, CacheEntry::Loading(load.clone()));
        load
    }

    /// Stores the result of `load`. Ignored if the entry has been replaced
    /// by a newer load in the meantime.
    pub fn complete(&self, id: ItemId, load: &SharedLoad, mesh: MeshHandle) {
        let mut entries = self.entries.borrow_mut();
        let current = match entries.get(&id) {
            Some(CacheEntry::Loading(pending)) => pending.ptr_eq(load),
            Some(CacheEntry::Ready(_)) => false,
            None => true,
        };
        if current {
            entries.insert(id, CacheEntry::Ready(mesh));
        }
    }

    /// Drops a failed load so the next selection retries it.
    pub fn forget_failed(&self, id: ItemId, load: &SharedLoad) {
        let mut entries = self.entries.borrow_mut();
        if let Some(CacheEntry::Loading(pending)) = entries.get(&id) {
            if pending.ptr_eq(load) {
                entries.remove(&id);
            }
        }
    }

    /// Ids with a finished mesh, ascending.
    pub fn loaded_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self
            .entries
            .borrow()
            .iter()
            .filter(|(_, entry)| matches!(entry, CacheEntry::Ready(_)))
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }
}

/// Configurator session state shared by the switch controller, the texture
/// swap handler and the UI. Only the switch controller changes the
/// selection.
pub struct ConfiguratorState {
    catalog: Catalog,
    selection: Cell<Selection>,
    next_ticket: Cell<u64>,
    meshes: MeshCache,
    selected_sub_items: RefCell<HashMap<ItemId, SubItemId>>,
}

impl ConfiguratorState {
    pub fn new(catalog: Catalog) -> Self {
        let selected_sub_items = catalog
            .items()
            .iter()
            .filter_map(|item| item.default_sub_item.map(|sub| (item.id, sub)))
            .collect();
        Self {
            catalog,
            selection: Cell::new(Selection {
                item: None,
                ticket: Ticket(0),
            }),
            next_ticket: Cell::new(1),
            meshes: MeshCache::new(),
            selected_sub_items: RefCell::new(selected_sub_items),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn meshes(&self) -> &MeshCache {
        &self.meshes
    }

    pub fn selection(&self) -> Selection {
        self.selection.get()
    }

    pub fn selected_id(&self) -> Option<ItemId> {
        self.selection.get().item
    }

    pub fn selected_item(&self) -> Option<&CatalogItem> {
        self.selected_id().and_then(|id| self.catalog.get(id))
    }

    /// Whether `ticket` still identifies the current selection.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.selection.get().ticket == ticket
    }

    pub fn selected_sub_item(&self, item: ItemId) -> Option<SubItemId> {
        self.selected_sub_items.borrow().get(&item).copied()
    }

    /// Selects `item` under a fresh ticket.
    pub(crate) fn begin_selection(&self, item: ItemId) -> Ticket {
        let ticket = Ticket(self.next_ticket.get());
        self.next_ticket.set(ticket.0 + 1);
        self.selection.set(Selection {
            item: Some(item),
            ticket,
        });
        ticket
    }

    /// Puts back an earlier selection together with its ticket, so a request
    /// still waiting under that ticket remains current.
    pub(crate) fn restore_selection(&self, selection: Selection) {
        self.selection.set(selection);
    }

    pub(crate) fn set_selected_sub_item(&self, item: ItemId, sub_item: SubItemId) {
        self.selected_sub_items.borrow_mut().insert(item, sub_item);
    }
}
