mod args;
mod switcher;
mod texture_swap;

pub use args::Args;
pub use switcher::{ProductSwitchController, SwitchError, SwitchOutcome};
pub use texture_swap::{apply_selected_sub_item, apply_texture, TextureSwapHandler, TextureSwapOutcome};

use clap::Parser;
use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
use std::cell::RefCell;
use std::fmt::Write as _;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::assets::{AssetLoader, FileAssetLoader, ProceduralLoader};
use crate::catalog::serialization::{self, SerializationError};
use crate::catalog::{Catalog, ConfiguratorState, ItemId, SubItemId};
use crate::events::{ConfiguratorEvent, EventBus, EventKind};
use crate::render::{LightRig, RenderError, RenderLoop, RenderSurface};
use crate::ui::{LoadingIndicator, ToolbarState};

#[derive(Debug, thiserror::Error)]
pub enum ConfiguratorError {
    #[error(transparent)]
    Catalog(#[from] SerializationError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("product {item} has no sub-item {sub_item}")]
    UnknownSubItem { item: ItemId, sub_item: SubItemId },
    #[error("no product with id {0}")]
    UnknownItem(ItemId),
}

/// Wires the event bus to the switch controller, texture swaps, the render
/// loop and the loading indicator, and drives switch requests on a
/// single-threaded executor.
pub struct Configurator {
    pool: LocalPool,
    state: Rc<ConfiguratorState>,
    bus: Rc<EventBus>,
    controller: Rc<ProductSwitchController>,
    surface: Rc<RefCell<RenderSurface>>,
    render_loop: Rc<RefCell<RenderLoop>>,
    indicator: Rc<RefCell<LoadingIndicator>>,
    toolbar: ToolbarState,
    failures: Rc<RefCell<Vec<String>>>,
}

impl Configurator {
    pub fn new(catalog: Catalog, loader: Rc<dyn AssetLoader>, surface: RenderSurface) -> Self {
        let pool = LocalPool::new();
        let state = Rc::new(ConfiguratorState::new(catalog));
        let bus = Rc::new(EventBus::new());
        let surface = Rc::new(RefCell::new(surface));
        let controller = Rc::new(ProductSwitchController::new(
            Rc::clone(&state),
            Rc::clone(&bus),
            loader,
            Rc::clone(&surface),
        ));
        let render_loop = Rc::new(RefCell::new(RenderLoop::new()));
        let indicator = Rc::new(RefCell::new(LoadingIndicator::new()));
        let failures = Rc::new(RefCell::new(Vec::new()));

        subscribe_selection(&bus, &controller, pool.spawner(), Rc::clone(&failures));

        let textures = TextureSwapHandler::new(Rc::clone(&state));
        bus.subscribe(EventKind::TextureSwap, move |event| {
            if let ConfiguratorEvent::TextureSwap(request) = event {
                textures.handle(request);
            }
        });

        let animated = Rc::clone(&render_loop);
        bus.subscribe(EventKind::AnimationAttached, move |event| {
            if let ConfiguratorEvent::AnimationAttached(animation) = event {
                animated.borrow_mut().attach_animation(animation.clone());
            }
        });

        LoadingIndicator::subscribe(&indicator, &bus);

        Self {
            pool,
            state,
            bus,
            controller,
            surface,
            render_loop,
            indicator,
            toolbar: ToolbarState::new(),
            failures,
        }
    }

    pub fn state(&self) -> &Rc<ConfiguratorState> {
        &self.state
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn controller(&self) -> &Rc<ProductSwitchController> {
        &self.controller
    }

    pub fn surface(&self) -> &Rc<RefCell<RenderSurface>> {
        &self.surface
    }

    pub fn render_loop(&self) -> &Rc<RefCell<RenderLoop>> {
        &self.render_loop
    }

    pub fn indicator(&self) -> &Rc<RefCell<LoadingIndicator>> {
        &self.indicator
    }

    /// Selects the first catalog product.
    pub fn start(&self) {
        self.select(self.state.catalog().first().id);
    }

    /// Same as a toolbar click: the switch runs on the next executor turn.
    pub fn select(&self, id: ItemId) {
        self.bus.publish(ConfiguratorEvent::SelectionRequested(id));
    }

    /// Publishes the event bound to a product's sub-item.
    pub fn activate_sub_item(&self, item: ItemId, sub_item: SubItemId) -> Result<(), ConfiguratorError> {
        let product = self
            .state
            .catalog()
            .get(item)
            .ok_or(ConfiguratorError::UnknownItem(item))?;
        let sub = product
            .sub_item(sub_item)
            .ok_or(ConfiguratorError::UnknownSubItem { item, sub_item })?;
        self.bus.publish(sub.activation_event(item));
        Ok(())
    }

    /// Polls switch tasks until they all wait on a load.
    pub fn run_until_stalled(&mut self) {
        self.pool.run_until_stalled();
    }

    /// Blocks until every pending switch has finished.
    pub fn settle(&mut self) {
        self.pool.run();
    }

    pub fn tick(&mut self, now: Instant) {
        self.pool.run_until_stalled();
        let mut surface = self.surface.borrow_mut();
        self.render_loop.borrow_mut().tick(&mut surface, now);
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.surface.borrow_mut().resize(width, height);
    }

    /// Messages of switch requests that failed since the last call.
    pub fn take_failures(&self) -> Vec<String> {
        std::mem::take(&mut *self.failures.borrow_mut())
    }

    pub fn summary(&mut self) -> String {
        self.toolbar.update(&self.state, &self.indicator.borrow());
        let mut summary = self.toolbar.summary().to_string();
        let surface = self.surface.borrow();
        let render_loop = self.render_loop.borrow();
        let _ = writeln!(
            summary,
            "gamma output: {}, camera distance {:.2} (near {:.3}, far {:.1}), {} mesh(es) attached",
            if surface.renderer.gamma_output { "on" } else { "off" },
            surface.controls.distance(),
            surface.camera.near,
            surface.camera.far,
            surface.scene.len()
        );
        let intensities: Vec<String> = surface
            .lights
            .lights()
            .iter()
            .map(|light| format!("{} {:.3}", light.name, light.intensity))
            .collect();
        let _ = writeln!(summary, "lights: {}", intensities.join(", "));
        let _ = write!(summary, "frames: {}", render_loop.frames());
        if let Some(animation) = render_loop.animation() {
            let _ = write!(summary, ", animation at {:.2}s", animation.time());
        }
        summary
    }
}

fn subscribe_selection(
    bus: &EventBus,
    controller: &Rc<ProductSwitchController>,
    spawner: LocalSpawner,
    failures: Rc<RefCell<Vec<String>>>,
) {
    let controller = Rc::downgrade(controller);
    bus.subscribe(EventKind::SelectionRequested, move |event| {
        let ConfiguratorEvent::SelectionRequested(id) = event else {
            return;
        };
        let Some(controller) = controller.upgrade() else {
            return;
        };
        let id = *id;
        let failures = Rc::clone(&failures);
        let spawned = spawner.spawn_local(async move {
            match controller.request_switch(id).await {
                Ok(outcome) => log::debug!("switch to {} finished: {:?}", id, outcome),
                Err(err) => {
                    log::error!("{}", err);
                    failures.borrow_mut().push(err.to_string());
                }
            }
        });
        if let Err(err) = spawned {
            log::error!("could not schedule switch to {}: {}", id, err);
        }
    });
}

fn load_catalog(args: &Args) -> Result<Catalog, ConfiguratorError> {
    let catalog = match &args.catalog {
        Some(path) => serialization::load_catalog_from_file(path)?,
        None => Catalog::default_catalog(),
    };
    if let Some(path) = &args.dump_catalog {
        serialization::save_catalog_to_file(&catalog, path)?;
        log::info!("Wrote catalog to {:?}", path);
    }
    Ok(catalog)
}

fn build(args: &Args) -> Result<Configurator, ConfiguratorError> {
    let catalog = load_catalog(args)?;
    let rig = LightRig::studio(args.light_intensity, args.gamma_reference)?;
    let mut surface = RenderSurface::with_lights(args.width as f32 / args.height.max(1) as f32, rig)?;
    surface.resize(args.width, args.height);

    let loader: Rc<dyn AssetLoader> = match &args.assets {
        Some(root) => {
            log::info!("Loading models from {:?}", root);
            Rc::new(FileAssetLoader::new(root))
        }
        None => {
            log::info!("No asset directory given, using placeholder geometry");
            Rc::new(ProceduralLoader::with_latency(Duration::from_millis(args.latency_ms)))
        }
    };
    Ok(Configurator::new(catalog, loader, surface))
}

fn run_scripted(args: &Args) -> Result<bool, ConfiguratorError> {
    let mut configurator = build(args)?;
    if args.select.is_empty() {
        configurator.start();
    }
    for &id in &args.select {
        configurator.select(ItemId(id));
        configurator.run_until_stalled();
    }
    configurator.settle();
    for &(item, sub_item) in &args.swap {
        configurator.activate_sub_item(item, sub_item)?;
    }

    let start = Instant::now();
    for frame in 0..args.frames {
        configurator.tick(start + Duration::from_millis(16 * frame as u64));
    }

    println!("{}", configurator.summary());
    Ok(configurator.take_failures().is_empty())
}

pub fn run() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    log::info!("Product configurator ({} selection(s) queued)", args.select.len());

    match run_scripted(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
