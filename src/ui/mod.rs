use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::catalog::{ConfiguratorState, ItemId};
use crate::events::{ConfiguratorEvent, EventBus, EventKind, SubscriptionId};

/// Spinner state driven by loading events.
#[derive(Debug, Default)]
pub struct LoadingIndicator {
    outstanding: usize,
    progress: Option<(ItemId, f32)>,
    last_failure: Option<String>,
}

impl LoadingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `indicator` to the loading events of `bus`.
    pub fn subscribe(indicator: &Rc<RefCell<Self>>, bus: &EventBus) -> Vec<SubscriptionId> {
        [
            EventKind::LoadingStarted,
            EventKind::LoadingProgress,
            EventKind::LoadingFinished,
            EventKind::LoadingFailed,
        ]
        .into_iter()
        .map(|kind| {
            let indicator = Rc::clone(indicator);
            bus.subscribe(kind, move |event| indicator.borrow_mut().handle(event))
        })
        .collect()
    }

    pub fn handle(&mut self, event: &ConfiguratorEvent) {
        match event {
            ConfiguratorEvent::LoadingStarted(id) => {
                self.outstanding += 1;
                self.progress = Some((*id, 0.0));
            }
            ConfiguratorEvent::LoadingProgress { id, fraction } => {
                if self.outstanding > 0 {
                    self.progress = Some((*id, *fraction));
                }
            }
            ConfiguratorEvent::LoadingFinished(_) => self.finish_one(),
            ConfiguratorEvent::LoadingFailed { message, .. } => {
                self.last_failure = Some(message.clone());
                self.finish_one();
            }
            _ => {}
        }
    }

    fn finish_one(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
        if self.outstanding == 0 {
            self.progress = None;
        }
    }

    pub fn is_loading(&self) -> bool {
        self.outstanding > 0
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Latest reported fraction while something is loading.
    pub fn progress(&self) -> Option<(ItemId, f32)> {
        self.progress
    }

    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }
}

/// Text rendition of the product toolbar.
#[derive(Debug, Default)]
pub struct ToolbarState {
    summary: String,
}

impl ToolbarState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, state: &ConfiguratorState, indicator: &LoadingIndicator) {
        let selected = state.selected_item();
        let loaded = state.meshes().loaded_ids();
        let mut summary = String::new();
        for item in state.catalog().items() {
            let is_selected = selected.is_some_and(|current| current.id == item.id);
            let marker = if is_selected { '>' } else { ' ' };
            let status = if loaded.contains(&item.id) {
                "loaded"
            } else if state.meshes().is_loading(item.id) {
                "loading"
            } else {
                "-"
            };
            let _ = writeln!(
                summary,
                "{} {:>3} {:<28} {}",
                marker,
                item.id.0,
                item.display_name(),
                status
            );
            if is_selected {
                for sub in &item.sub_items {
                    let chosen = state.selected_sub_item(item.id) == Some(sub.id);
                    let _ = writeln!(
                        summary,
                        "      {} {}",
                        if chosen { '*' } else { 'o' },
                        if sub.tooltip.is_empty() { &sub.image } else { &sub.tooltip }
                    );
                }
            }
        }
        if indicator.is_loading() {
            match indicator.progress() {
                Some((id, fraction)) => {
                    let _ = writeln!(summary, "Loading {} ({:.0}%)", id, fraction * 100.0);
                }
                None => summary.push_str("Loading\n"),
            }
        }
        if let Some(message) = indicator.last_failure() {
            let _ = writeln!(summary, "Last error: {}", message);
        }
        self.summary = summary;
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }
}
