use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::catalog::{ItemId, SubItemId};
use crate::render::AnimationHandle;

/// Every event the configurator knows about. Sub-items name one of these in
/// the catalog, so the set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EventKind {
    SelectionRequested,
    LoadingStarted,
    LoadingProgress,
    LoadingFinished,
    LoadingFailed,
    TextureSwap,
    AnimationAttached,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::SelectionRequested,
        EventKind::LoadingStarted,
        EventKind::LoadingProgress,
        EventKind::LoadingFinished,
        EventKind::LoadingFailed,
        EventKind::TextureSwap,
        EventKind::AnimationAttached,
    ];
    pub const COUNT: usize = Self::ALL.len();

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureSwapRequest {
    pub item: ItemId,
    pub sub_item: SubItemId,
    pub texture_slot: String,
    pub texture_url: String,
}

#[derive(Debug, Clone)]
pub enum ConfiguratorEvent {
    SelectionRequested(ItemId),
    LoadingStarted(ItemId),
    /// `fraction` is in `[0, 1]`.
    LoadingProgress { id: ItemId, fraction: f32 },
    LoadingFinished(ItemId),
    LoadingFailed { id: ItemId, message: String },
    TextureSwap(TextureSwapRequest),
    /// The animation the render loop should drive; `None` stops it.
    AnimationAttached(Option<AnimationHandle>),
}

impl ConfiguratorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ConfiguratorEvent::SelectionRequested(_) => EventKind::SelectionRequested,
            ConfiguratorEvent::LoadingStarted(_) => EventKind::LoadingStarted,
            ConfiguratorEvent::LoadingProgress { .. } => EventKind::LoadingProgress,
            ConfiguratorEvent::LoadingFinished(_) => EventKind::LoadingFinished,
            ConfiguratorEvent::LoadingFailed { .. } => EventKind::LoadingFailed,
            ConfiguratorEvent::TextureSwap(_) => EventKind::TextureSwap,
            ConfiguratorEvent::AnimationAttached(_) => EventKind::AnimationAttached,
        }
    }
}

pub type Handler = Rc<dyn Fn(&ConfiguratorEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Synchronous publish/subscribe keyed by [`EventKind`].
///
/// Handlers run in subscription order on the publisher's stack, with no
/// buffering. A handler may subscribe, unsubscribe or publish again; changes
/// to the subscriber list take effect from the next `publish`.
pub struct EventBus {
    handlers: RefCell<Vec<Vec<(SubscriptionId, Handler)>>>,
    next_id: Cell<u64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(vec![Vec::new(); EventKind::COUNT]),
            next_id: Cell::new(0),
        }
    }

    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: impl Fn(&ConfiguratorEvent) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers.borrow_mut()[kind.index()].push((id, Rc::new(handler)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        for list in handlers.iter_mut() {
            if let Some(pos) = list.iter().position(|(sub, _)| *sub == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn publish(&self, event: ConfiguratorEvent) {
        let kind = event.kind();
        let handlers: Vec<Handler> = self.handlers.borrow()[kind.index()]
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect();
        log::trace!("publish {:?} to {} handler(s)", kind, handlers.len());
        for handler in handlers {
            handler(&event);
        }
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers.borrow()[kind.index()].len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
