use futures::FutureExt;
use std::cell::RefCell;
use std::rc::Rc;

use super::texture_swap::apply_selected_sub_item;
use crate::assets::{AssetError, AssetLoader, ProgressFn};
use crate::catalog::{CatalogItem, ConfiguratorState, ItemId, LoadFailure, Selection, Ticket};
use crate::events::{ConfiguratorEvent, EventBus};
use crate::render::{AnimationHandle, AnimationPlayer, RenderSurface};
use crate::scene::{center_at_origin, MeshHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The product is attached, lit and framed.
    Presented,
    /// The product was already selected.
    Unchanged,
    /// Another selection was made while this one was loading.
    Superseded,
}

#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    #[error("no catalog item with id {0}")]
    UnknownItem(ItemId),
    #[error("failed to load {id} from {path}: {cause}")]
    Load {
        id: ItemId,
        path: String,
        cause: Rc<AssetError>,
    },
}

/// Owns the product switch lifecycle: detach the old mesh, load (or reuse)
/// the new one, then attach, light and frame it unless a newer selection has
/// been made in the meantime.
pub struct ProductSwitchController {
    state: Rc<ConfiguratorState>,
    bus: Rc<EventBus>,
    loader: Rc<dyn AssetLoader>,
    surface: Rc<RefCell<RenderSurface>>,
}

impl ProductSwitchController {
    pub fn new(
        state: Rc<ConfiguratorState>,
        bus: Rc<EventBus>,
        loader: Rc<dyn AssetLoader>,
        surface: Rc<RefCell<RenderSurface>>,
    ) -> Self {
        Self {
            state,
            bus,
            loader,
            surface,
        }
    }

    pub fn state(&self) -> &Rc<ConfiguratorState> {
        &self.state
    }

    pub async fn request_switch(&self, target: ItemId) -> Result<SwitchOutcome, SwitchError> {
        let item = self
            .state
            .catalog()
            .get(target)
            .ok_or(SwitchError::UnknownItem(target))?;
        let previous = self.state.selection();
        if previous.item == Some(target) {
            log::debug!("{} already selected", item.display_name());
            return Ok(SwitchOutcome::Unchanged);
        }

        if let Some(mesh) = previous.item.and_then(|id| self.state.meshes().get(id)) {
            self.surface.borrow_mut().scene.remove(&mesh);
        }
        let ticket = self.state.begin_selection(target);
        log::info!("Switching to {} ({})", item.display_name(), target);

        let mesh = match self.state.meshes().get(target) {
            Some(mesh) => mesh,
            None => match self.load(item).await {
                Ok(mesh) => mesh,
                Err(cause) => return Err(self.recover(item, ticket, previous, cause)),
            },
        };

        if !self.state.is_current(ticket) {
            log::debug!("{} superseded before it could be shown", item.display_name());
            return Ok(SwitchOutcome::Superseded);
        }
        self.present(item, &mesh);
        Ok(SwitchOutcome::Presented)
    }

    async fn load(&self, item: &CatalogItem) -> Result<MeshHandle, LoadFailure> {
        let id = item.id;
        self.bus.publish(ConfiguratorEvent::LoadingStarted(id));

        let load = self.state.meshes().load_or_join(id, || {
            let bus = Rc::clone(&self.bus);
            let progress: ProgressFn = Rc::new(move |fraction: f32| {
                bus.publish(ConfiguratorEvent::LoadingProgress {
                    id,
                    fraction: fraction.clamp(0.0, 1.0),
                });
            });
            self.loader
                .load(&item.file_path, &item.material, progress)
                .map(|result| match result {
                    Ok(mesh) => {
                        center_at_origin(&mesh);
                        Ok(mesh)
                    }
                    Err(err) => Err(Rc::new(err)),
                })
                .boxed_local()
        });

        match load.clone().await {
            Ok(mesh) => {
                self.state.meshes().complete(id, &load, mesh.clone());
                self.bus.publish(ConfiguratorEvent::LoadingFinished(id));
                Ok(mesh)
            }
            Err(cause) => {
                self.state.meshes().forget_failed(id, &load);
                self.bus.publish(ConfiguratorEvent::LoadingFailed {
                    id,
                    message: cause.to_string(),
                });
                Err(cause)
            }
        }
    }

    fn recover(
        &self,
        item: &CatalogItem,
        ticket: Ticket,
        previous: Selection,
        cause: LoadFailure,
    ) -> SwitchError {
        log::warn!("Failed to load {}: {}", item.display_name(), cause);
        if self.state.is_current(ticket) {
            self.state.restore_selection(previous);
            let restored = previous.item.and_then(|id| {
                let item = self.state.catalog().get(id)?;
                let mesh = self.state.meshes().get(id)?;
                Some((item, mesh))
            });
            if let Some((previous_item, mesh)) = restored {
                log::info!("Restoring {}", previous_item.display_name());
                self.present(previous_item, &mesh);
            }
        }
        SwitchError::Load {
            id: item.id,
            path: item.file_path.clone(),
            cause,
        }
    }

    fn present(&self, item: &CatalogItem, mesh: &MeshHandle) {
        {
            let mut surface = self.surface.borrow_mut();
            surface.scene.add(mesh.clone());
            surface.set_gamma_space(item.use_gamma_space);
            surface.frame(mesh, item.has_floor);
        }
        apply_selected_sub_item(&self.state, item, mesh);

        let animation = AnimationPlayer::for_mesh(mesh).map(AnimationHandle::new);
        self.bus
            .publish(ConfiguratorEvent::AnimationAttached(animation));
    }
}

#[cfg(test)]
mod tests {
    use super::{ProductSwitchController, SwitchError, SwitchOutcome};
    use crate::assets::{AssetError, AssetLoader, LoadFuture, ProceduralLoader, ProgressFn};
    use crate::catalog::{
        Catalog, CatalogItem, ConfiguratorState, ItemId, MaterialDescription,
    };
    use crate::events::{ConfiguratorEvent, EventBus, EventKind};
    use crate::render::RenderSurface;
    use crate::scene::{Aabb, AnimationClip, MeshHandle, SceneNode, Transform};
    use futures::channel::oneshot;
    use futures::executor::LocalPool;
    use futures::task::LocalSpawnExt;
    use glam::Vec3;
    use std::cell::RefCell;
    use std::f32::consts::PI;
    use std::rc::Rc;

    type Reply = oneshot::Sender<Result<MeshHandle, AssetError>>;

    /// Loads complete only when the test says so.
    #[derive(Default)]
    struct ManualLoader {
        calls: RefCell<Vec<String>>,
        pending: RefCell<Vec<(String, Reply)>>,
    }

    impl ManualLoader {
        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn reply(&self, path: &str) -> Reply {
            let mut pending = self.pending.borrow_mut();
            let index = pending
                .iter()
                .position(|(pending_path, _)| pending_path == path)
                .unwrap_or_else(|| panic!("no pending load for {path}"));
            pending.remove(index).1
        }
    }

    impl AssetLoader for ManualLoader {
        fn load(
            &self,
            path: &str,
            _material: &MaterialDescription,
            progress: ProgressFn,
        ) -> LoadFuture {
            let (tx, rx) = oneshot::channel();
            self.calls.borrow_mut().push(path.to_string());
            self.pending.borrow_mut().push((path.to_string(), tx));
            let path = path.to_string();
            Box::pin(async move {
                progress(-0.2);
                progress(0.5);
                let result = rx
                    .await
                    .unwrap_or(Err(AssetError::WorkerDisconnected { path }));
                progress(1.7);
                result
            })
        }
    }

    fn item(id: u32, path: &str, has_floor: bool, use_gamma_space: bool) -> CatalogItem {
        CatalogItem {
            id: ItemId(id),
            thumbnail: format!("thumb_{id}.png"),
            tooltip: String::new(),
            file_path: path.to_string(),
            material: MaterialDescription::default(),
            has_floor,
            use_gamma_space,
            sub_items: Vec::new(),
            default_sub_item: None,
        }
    }

    /// A box of edge `edge` centered at `offset`, nested one level deep.
    fn box_mesh(edge: f32, offset: Vec3) -> MeshHandle {
        let half = Vec3::splat(edge / 2.0);
        MeshHandle::new(
            SceneNode::new("root")
                .with_transform(Transform::from_translation(offset))
                .with_child(SceneNode::new("geometry").with_bounds(Aabb::new(-half, half))),
        )
    }

    fn diagonal(edge: f32) -> f32 {
        edge * 3.0f32.sqrt()
    }

    struct Harness {
        pool: LocalPool,
        loader: Rc<ManualLoader>,
        controller: Rc<ProductSwitchController>,
        surface: Rc<RefCell<RenderSurface>>,
        loading_events: Rc<RefCell<Vec<(EventKind, ItemId)>>>,
        progress: Rc<RefCell<Vec<(EventKind, ItemId, Option<f32>)>>>,
        animations: Rc<RefCell<Vec<bool>>>,
        results: Rc<RefCell<Vec<(ItemId, Result<SwitchOutcome, SwitchError>)>>>,
    }

    impl Harness {
        fn new() -> Self {
            let catalog = Catalog::new(vec![
                item(0, "a.obj", false, false),
                item(1, "b.gltf", false, true),
                item(2, "c.obj", true, false),
                item(3, "d.gltf", false, false),
            ])
            .unwrap();
            Self::with_catalog(catalog)
        }

        fn with_catalog(catalog: Catalog) -> Self {
            let loader = Rc::new(ManualLoader::default());
            let state = Rc::new(ConfiguratorState::new(catalog));
            let bus = Rc::new(EventBus::new());
            let surface = Rc::new(RefCell::new(RenderSurface::new(1.0).unwrap()));

            let loading_events = Rc::new(RefCell::new(Vec::new()));
            for kind in [
                EventKind::LoadingStarted,
                EventKind::LoadingFinished,
                EventKind::LoadingFailed,
            ] {
                let sink = loading_events.clone();
                bus.subscribe(kind, move |event| {
                    let id = match event {
                        ConfiguratorEvent::LoadingStarted(id)
                        | ConfiguratorEvent::LoadingFinished(id)
                        | ConfiguratorEvent::LoadingFailed { id, .. } => *id,
                        _ => return,
                    };
                    sink.borrow_mut().push((event.kind(), id));
                });
            }
            let progress = Rc::new(RefCell::new(Vec::new()));
            for kind in [
                EventKind::LoadingStarted,
                EventKind::LoadingProgress,
                EventKind::LoadingFinished,
            ] {
                let sink = progress.clone();
                bus.subscribe(kind, move |event| {
                    let entry = match event {
                        ConfiguratorEvent::LoadingStarted(id)
                        | ConfiguratorEvent::LoadingFinished(id) => (event.kind(), *id, None),
                        ConfiguratorEvent::LoadingProgress { id, fraction } => {
                            (event.kind(), *id, Some(*fraction))
                        }
                        _ => return,
                    };
                    sink.borrow_mut().push(entry);
                });
            }
            let animations = Rc::new(RefCell::new(Vec::new()));
            let sink = animations.clone();
            bus.subscribe(EventKind::AnimationAttached, move |event| {
                if let ConfiguratorEvent::AnimationAttached(animation) = event {
                    sink.borrow_mut().push(animation.is_some());
                }
            });

            let dyn_loader: Rc<dyn AssetLoader> = loader.clone();
            let controller = Rc::new(ProductSwitchController::new(
                state,
                bus,
                dyn_loader,
                surface.clone(),
            ));
            Self {
                pool: LocalPool::new(),
                loader,
                controller,
                surface,
                loading_events,
                progress,
                animations,
                results: Rc::new(RefCell::new(Vec::new())),
            }
        }

        fn request(&mut self, id: u32) {
            let controller = self.controller.clone();
            let results = self.results.clone();
            self.pool
                .spawner()
                .spawn_local(async move {
                    let result = controller.request_switch(ItemId(id)).await;
                    results.borrow_mut().push((ItemId(id), result));
                })
                .unwrap();
            self.pool.run_until_stalled();
        }

        fn resolve(&mut self, path: &str, mesh: &MeshHandle) {
            let _ = self.loader.reply(path).send(Ok(mesh.clone()));
            self.pool.run_until_stalled();
        }

        fn fail(&mut self, path: &str) {
            let _ = self
                .loader
                .reply(path)
                .send(Err(AssetError::UnsupportedFormat(path.to_string())));
            self.pool.run_until_stalled();
        }

        fn selected(&self) -> Option<ItemId> {
            self.controller.state().selected_id()
        }

        fn attached(&self) -> Vec<MeshHandle> {
            self.surface.borrow().scene.attached().to_vec()
        }

        fn outcome(&self, index: usize) -> Option<SwitchOutcome> {
            match &self.results.borrow()[index].1 {
                Ok(outcome) => Some(*outcome),
                Err(_) => None,
            }
        }

        fn take_events(&self) -> Vec<(EventKind, ItemId)> {
            std::mem::take(&mut *self.loading_events.borrow_mut())
        }
    }

    #[test]
    fn first_selection_loads_centers_and_frames() {
        let mut h = Harness::new();
        let mesh = box_mesh(10.0, Vec3::new(40.0, -5.0, 3.0));
        h.request(0);
        assert_eq!(h.selected(), Some(ItemId(0)));
        assert!(h.attached().is_empty());

        h.resolve("a.obj", &mesh);
        assert_eq!(h.outcome(0), Some(SwitchOutcome::Presented));
        assert_eq!(h.attached(), vec![mesh.clone()]);
        let bounds = mesh.borrow().world_bounds().unwrap();
        assert!(bounds.center().length() < 1e-4);

        let surface = h.surface.borrow();
        let size = diagonal(10.0);
        assert!((surface.camera.near - size / 100.0).abs() < 1e-4);
        assert!((surface.camera.far - size * 100.0).abs() < 1e-2);
        assert!((surface.controls.min_distance - size * 0.75).abs() < 1e-4);
        assert!((surface.controls.max_distance - size * 1.5).abs() < 1e-4);
        assert!((surface.controls.max_polar_angle - PI).abs() < 1e-6);
        assert!((surface.controls.distance() - size * 1.15).abs() < 1e-3);
        assert!(!surface.renderer.gamma_output);
        drop(surface);

        assert_eq!(
            h.take_events(),
            vec![
                (EventKind::LoadingStarted, ItemId(0)),
                (EventKind::LoadingFinished, ItemId(0))
            ]
        );
        assert_eq!(*h.animations.borrow(), vec![false]);
    }

    #[test]
    fn reselecting_current_item_is_a_no_op() {
        let mut h = Harness::new();
        h.request(0);
        h.resolve("a.obj", &box_mesh(4.0, Vec3::ZERO));
        h.take_events();
        let updates = h.surface.borrow().controls.updates();

        h.request(0);
        assert_eq!(h.outcome(1), Some(SwitchOutcome::Unchanged));
        assert_eq!(h.loader.calls(), vec!["a.obj"]);
        assert!(h.take_events().is_empty());
        assert_eq!(h.surface.borrow().controls.updates(), updates);
        assert_eq!(h.attached().len(), 1);
    }

    #[test]
    fn duplicate_click_while_loading_starts_one_load() {
        let mut h = Harness::new();
        h.request(1);
        h.request(1);
        assert_eq!(h.outcome(0), Some(SwitchOutcome::Unchanged));
        assert_eq!(h.loader.calls(), vec!["b.gltf"]);
        h.resolve("b.gltf", &box_mesh(2.0, Vec3::ONE));
        assert_eq!(h.outcome(1), Some(SwitchOutcome::Presented));
        assert_eq!(h.attached().len(), 1);
    }

    #[test]
    fn superseded_load_resolving_last_is_not_attached() {
        let mut h = Harness::new();
        let a = box_mesh(4.0, Vec3::ZERO);
        let b = box_mesh(8.0, Vec3::X);
        h.request(0);
        h.request(1);

        h.resolve("b.gltf", &b);
        h.resolve("a.obj", &a);

        assert_eq!(h.attached(), vec![b.clone()]);
        assert_eq!(h.selected(), Some(ItemId(1)));
        let outcomes: Vec<_> = (0..2).map(|i| h.outcome(i)).collect();
        assert_eq!(
            outcomes,
            vec![Some(SwitchOutcome::Presented), Some(SwitchOutcome::Superseded)]
        );

        let surface = h.surface.borrow();
        assert!(surface.renderer.gamma_output);
        assert!((surface.controls.distance() - diagonal(8.0) * 1.15).abs() < 1e-3);
    }

    #[test]
    fn superseded_load_resolving_first_is_not_attached() {
        let mut h = Harness::new();
        let a = box_mesh(4.0, Vec3::ZERO);
        let b = box_mesh(8.0, Vec3::X);
        h.request(0);
        h.request(1);

        h.resolve("a.obj", &a);
        assert!(h.attached().is_empty());
        assert_eq!(h.outcome(0), Some(SwitchOutcome::Superseded));
        assert!(!h.surface.borrow().renderer.gamma_output);

        h.resolve("b.gltf", &b);
        assert_eq!(h.attached(), vec![b]);
        assert!(h.surface.borrow().renderer.gamma_output);
        // Both loads ran to completion and stay cached.
        assert_eq!(
            h.controller.state().meshes().loaded_ids(),
            vec![ItemId(0), ItemId(1)]
        );
    }

    #[test]
    fn cached_mesh_is_reused_without_reloading() {
        let mut h = Harness::new();
        let a = box_mesh(4.0, Vec3::new(7.0, 7.0, 7.0));
        h.request(0);
        h.resolve("a.obj", &a);
        let centered = a.borrow().transform.translation;
        h.request(2);
        h.resolve("c.obj", &box_mesh(6.0, Vec3::ZERO));
        h.take_events();

        h.request(0);
        assert_eq!(h.outcome(2), Some(SwitchOutcome::Presented));
        assert_eq!(h.loader.calls(), vec!["a.obj", "c.obj"]);
        assert!(h.take_events().is_empty());
        assert_eq!(a.borrow().transform.translation, centered);
        assert_eq!(h.attached(), vec![a]);
    }

    #[test]
    fn floor_limits_polar_angle() {
        let mut h = Harness::new();
        h.request(2);
        h.resolve("c.obj", &box_mesh(6.0, Vec3::ZERO));
        let surface = h.surface.borrow();
        assert!((surface.controls.max_polar_angle - PI / 2.0).abs() < 1e-6);
    }

    #[test]
    fn gamma_is_toggled_once_per_mode_change() {
        let mut h = Harness::new();
        let initial: Vec<f32> = h
            .surface
            .borrow()
            .lights
            .lights()
            .iter()
            .map(|light| light.intensity)
            .collect();
        h.request(1);
        h.resolve("b.gltf", &box_mesh(2.0, Vec3::ZERO));
        h.request(3);
        h.resolve("d.gltf", &box_mesh(2.0, Vec3::ZERO));
        h.request(1);

        let surface = h.surface.borrow();
        let factor = surface.lights.intensity_factor();
        assert!(surface.renderer.gamma_output);
        for (light, before) in surface.lights.lights().iter().zip(initial) {
            assert!((light.intensity - before / factor).abs() < 1e-5);
        }
    }

    #[test]
    fn failed_load_reverts_to_previous_product() {
        let mut h = Harness::new();
        let a = box_mesh(4.0, Vec3::ZERO);
        h.request(0);
        h.resolve("a.obj", &a);
        h.take_events();

        h.request(1);
        assert!(h.attached().is_empty());
        h.fail("b.gltf");

        assert!(matches!(
            &h.results.borrow()[1],
            (ItemId(1), Err(SwitchError::Load { id: ItemId(1), .. }))
        ));
        assert_eq!(h.selected(), Some(ItemId(0)));
        assert_eq!(h.attached(), vec![a]);
        assert!(!h.surface.borrow().renderer.gamma_output);
        assert_eq!(
            h.take_events(),
            vec![
                (EventKind::LoadingStarted, ItemId(1)),
                (EventKind::LoadingFailed, ItemId(1))
            ]
        );
        assert!(!h.controller.state().meshes().is_loading(ItemId(1)));
    }

    #[test]
    fn failed_item_is_retried_on_next_selection() {
        let mut h = Harness::new();
        h.request(1);
        h.fail("b.gltf");
        assert_eq!(h.selected(), None);

        let b = box_mesh(3.0, Vec3::ZERO);
        h.request(1);
        h.resolve("b.gltf", &b);
        assert_eq!(h.loader.calls(), vec!["b.gltf", "b.gltf"]);
        assert_eq!(h.outcome(1), Some(SwitchOutcome::Presented));
        assert_eq!(h.attached(), vec![b]);
    }

    #[test]
    fn failure_after_supersession_keeps_newer_selection() {
        let mut h = Harness::new();
        let c = box_mesh(5.0, Vec3::ZERO);
        h.request(1);
        h.request(2);
        h.fail("b.gltf");
        assert_eq!(h.selected(), Some(ItemId(2)));

        h.resolve("c.obj", &c);
        assert_eq!(h.attached(), vec![c]);
        assert_eq!(
            h.take_events(),
            vec![
                (EventKind::LoadingStarted, ItemId(1)),
                (EventKind::LoadingStarted, ItemId(2)),
                (EventKind::LoadingFailed, ItemId(1)),
                (EventKind::LoadingFinished, ItemId(2)),
            ]
        );
    }

    #[test]
    fn revert_lets_previous_in_flight_load_present() {
        let mut h = Harness::new();
        let a = box_mesh(4.0, Vec3::ZERO);
        h.request(0);
        h.request(1);
        h.fail("b.gltf");
        assert_eq!(h.selected(), Some(ItemId(0)));
        assert!(h.attached().is_empty());

        h.resolve("a.obj", &a);
        assert_eq!(h.outcome(1), Some(SwitchOutcome::Presented));
        assert_eq!(h.attached(), vec![a]);
    }

    #[test]
    fn reselecting_superseded_item_joins_in_flight_load() {
        let mut h = Harness::new();
        let a = box_mesh(4.0, Vec3::new(2.0, 0.0, 0.0));
        h.request(0);
        h.request(1);
        h.request(0);
        assert_eq!(h.loader.calls(), vec!["a.obj", "b.gltf"]);

        h.resolve("a.obj", &a);
        let outcomes: Vec<_> = h
            .results
            .borrow()
            .iter()
            .map(|(id, result)| (*id, result.as_ref().ok().copied()))
            .collect();
        assert!(outcomes.contains(&(ItemId(0), Some(SwitchOutcome::Superseded))));
        assert!(outcomes.contains(&(ItemId(0), Some(SwitchOutcome::Presented))));
        assert_eq!(h.attached(), vec![a.clone()]);
        // Centered exactly once.
        assert!(a.borrow().world_bounds().unwrap().center().length() < 1e-4);

        h.resolve("b.gltf", &box_mesh(2.0, Vec3::ZERO));
        assert_eq!(h.attached(), vec![a]);
        assert_eq!(h.selected(), Some(ItemId(0)));
    }

    #[test]
    fn loader_progress_is_republished_clamped() {
        let mut h = Harness::new();
        h.request(0);
        h.resolve("a.obj", &box_mesh(4.0, Vec3::ZERO));
        assert_eq!(
            *h.progress.borrow(),
            vec![
                (EventKind::LoadingStarted, ItemId(0), None),
                (EventKind::LoadingProgress, ItemId(0), Some(0.0)),
                (EventKind::LoadingProgress, ItemId(0), Some(0.5)),
                (EventKind::LoadingProgress, ItemId(0), Some(1.0)),
                (EventKind::LoadingFinished, ItemId(0), None),
            ]
        );
    }

    #[test]
    fn joined_load_reports_progress_once() {
        let mut h = Harness::new();
        h.request(0);
        h.request(1);
        h.request(0);
        h.resolve("a.obj", &box_mesh(4.0, Vec3::ZERO));

        let fractions: Vec<f32> = h
            .progress
            .borrow()
            .iter()
            .filter(|(kind, id, _)| *kind == EventKind::LoadingProgress && *id == ItemId(0))
            .filter_map(|(_, _, fraction)| *fraction)
            .collect();
        assert_eq!(fractions, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn unknown_item_is_rejected_without_side_effects() {
        let mut h = Harness::new();
        h.request(42);
        assert!(matches!(
            &h.results.borrow()[0],
            (_, Err(SwitchError::UnknownItem(ItemId(42))))
        ));
        assert_eq!(h.selected(), None);
        assert!(h.loader.calls().is_empty());
        assert!(h.take_events().is_empty());
    }

    #[test]
    fn animated_mesh_attaches_player() {
        let mut h = Harness::new();
        let dancer = MeshHandle::new(
            SceneNode::new("dancer")
                .with_bounds(Aabb::new(Vec3::ZERO, Vec3::ONE))
                .with_animation(AnimationClip {
                    name: "samba".to_string(),
                    duration: 4.0,
                }),
        );
        h.request(3);
        h.resolve("d.gltf", &dancer);
        h.request(0);
        h.resolve("a.obj", &box_mesh(1.0, Vec3::ZERO));
        assert_eq!(*h.animations.borrow(), vec![true, false]);
    }

    #[test]
    fn samba_then_chair_end_to_end() {
        let state = Rc::new(ConfiguratorState::new(Catalog::default_catalog()));
        let bus = Rc::new(EventBus::new());
        let surface = Rc::new(RefCell::new(RenderSurface::new(16.0 / 9.0).unwrap()));
        let controller = ProductSwitchController::new(
            state.clone(),
            bus.clone(),
            Rc::new(ProceduralLoader::new()),
            surface.clone(),
        );
        let initial: Vec<f32> = surface
            .borrow()
            .lights
            .lights()
            .iter()
            .map(|light| light.intensity)
            .collect();

        let mut pool = LocalPool::new();
        let samba = pool.run_until(controller.request_switch(ItemId(0))).unwrap();
        assert_eq!(samba, SwitchOutcome::Presented);
        let samba_mesh = state.meshes().get(ItemId(0)).unwrap();
        assert!(surface.borrow().scene.contains(&samba_mesh));

        let events = Rc::new(RefCell::new(Vec::new()));
        for kind in [EventKind::LoadingStarted, EventKind::LoadingFinished] {
            let sink = events.clone();
            bus.subscribe(kind, move |event| sink.borrow_mut().push(event.kind()));
        }
        let chair = pool.run_until(controller.request_switch(ItemId(6))).unwrap();
        assert_eq!(chair, SwitchOutcome::Presented);

        assert_eq!(
            *events.borrow(),
            vec![EventKind::LoadingStarted, EventKind::LoadingFinished]
        );
        let chair_mesh = state.meshes().get(ItemId(6)).unwrap();
        let surface = surface.borrow();
        assert!(!surface.scene.contains(&samba_mesh));
        assert_eq!(surface.scene.attached(), &[chair_mesh]);
        assert!(surface.renderer.gamma_output);
        let factor = surface.lights.intensity_factor();
        for (light, before) in surface.lights.lights().iter().zip(initial) {
            assert!((light.intensity - before / factor).abs() < 1e-5);
        }
    }
}
