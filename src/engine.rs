//! Scene engine and caller-owned state
//!
//! `SceneEngine` is a validated, immutable `LayoutConfig` with its grid
//! specs compiled. Callers that recompose often keep a `GeometryCache` and
//! pool next to it; `SceneContext` bundles those per mount target.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::layout::compose::{ComposeRequest, compose};
use crate::layout::grid::{GridGeometry, GridSpec};
use crate::layout::state::{Composition, PoolItem};
use crate::platform::{DeviceClass, Mode, Viewport};
use crate::tuning::LayoutConfig;

/// Validated layout engine
#[derive(Debug, Clone)]
pub struct SceneEngine {
    config: LayoutConfig,
    grid_specs: BTreeMap<(Mode, DeviceClass), GridSpec>,
}

impl SceneEngine {
    pub fn new(config: LayoutConfig) -> Result<Self> {
        config.validate()?;
        let grid_specs = config.compile_grid_specs()?;

        for device in DeviceClass::ALL {
            let zones = config.zone_thresholds(device);
            if !zones.mid_reachable() {
                log::warn!(
                    "Screen zones for {device} have left {} > right {}: no item will be classified mid",
                    zones.left,
                    zones.right
                );
            }
        }

        log::info!(
            "Scene engine ready: {} grid specs, preset {}",
            grid_specs.len(),
            config.settings.preset.as_str()
        );
        Ok(Self { config, grid_specs })
    }

    /// Engine with the built-in tables
    pub fn with_defaults() -> Result<Self> {
        Self::new(LayoutConfig::default())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::new(LayoutConfig::from_json_str(json)?)
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn grid_spec(&self, mode: Mode, device: DeviceClass) -> Option<&GridSpec> {
        self.grid_specs.get(&(mode, device))
    }

    pub fn pool_size(&self, mode: Mode, device: DeviceClass) -> u32 {
        self.config.pool_sizes.size(mode, device)
    }

    /// Device class and grid geometry for a viewport in `mode`
    pub fn geometry(&self, viewport: Viewport, mode: Mode) -> (DeviceClass, GridGeometry) {
        let device = viewport.device_class();
        let geometry = self
            .grid_spec(mode, device)
            .map(|spec| spec.geometry(viewport.width, viewport.height))
            .unwrap_or(GridGeometry::EMPTY);
        (device, geometry)
    }

    pub fn compose(&self, request: &ComposeRequest, pool: &[PoolItem]) -> Composition {
        let (_, geometry) = self.geometry(request.viewport, request.mode());
        self.compose_with_geometry(request, pool, geometry)
    }

    /// Same as `compose`, reusing geometry from `cache`
    pub fn compose_cached(
        &self,
        request: &ComposeRequest,
        pool: &[PoolItem],
        cache: &mut GeometryCache,
    ) -> Composition {
        let mode = request.mode();
        let (_, geometry) = cache.resolve(request.viewport, mode, || {
            self.geometry(request.viewport, mode)
        });
        self.compose_with_geometry(request, pool, geometry)
    }

    fn compose_with_geometry(
        &self,
        request: &ComposeRequest,
        pool: &[PoolItem],
        geometry: GridGeometry,
    ) -> Composition {
        let mode = request.mode();
        let device = request.device();
        match self.grid_spec(mode, device) {
            Some(spec) => compose(&self.config, spec, geometry, request, pool),
            None => {
                log::warn!("No grid spec for {mode}/{device}, composing an empty grid");
                let empty = GridSpec::new(0, 1.0);
                compose(&self.config, &empty, GridGeometry::EMPTY, request, pool)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GeometryKey {
    width_bits: u64,
    height_bits: u64,
    mode: Mode,
}

impl GeometryKey {
    fn new(viewport: Viewport, mode: Mode) -> Self {
        Self {
            width_bits: viewport.width.to_bits(),
            height_bits: viewport.height.to_bits(),
            mode,
        }
    }
}

/// Memoized grid geometry keyed by `(width, height, mode)`
#[derive(Debug, Clone, Default)]
pub struct GeometryCache {
    entries: HashMap<GeometryKey, (DeviceClass, GridGeometry)>,
    hits: u64,
    misses: u64,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entry, or `compute` it and remember the result
    pub fn resolve(
        &mut self,
        viewport: Viewport,
        mode: Mode,
        compute: impl FnOnce() -> (DeviceClass, GridGeometry),
    ) -> (DeviceClass, GridGeometry) {
        let key = GeometryKey::new(viewport, mode);
        if let Some(entry) = self.entries.get(&key) {
            self.hits += 1;
            return *entry;
        }
        self.misses += 1;
        let entry = compute();
        self.entries.insert(key, entry);
        entry
    }

    pub fn get(&self, viewport: Viewport, mode: Mode) -> Option<(DeviceClass, GridGeometry)> {
        self.entries.get(&GeometryKey::new(viewport, mode)).copied()
    }

    /// Drop every entry (e.g. after swapping engines)
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

/// An engine bound to one mount target, with its pool and last result
#[derive(Debug, Clone)]
pub struct MountedScene {
    engine: SceneEngine,
    pool: Vec<PoolItem>,
    cache: GeometryCache,
    last: Option<Composition>,
}

impl MountedScene {
    pub fn new(engine: SceneEngine) -> Self {
        Self {
            engine,
            pool: Vec::new(),
            cache: GeometryCache::new(),
            last: None,
        }
    }

    pub fn engine(&self) -> &SceneEngine {
        &self.engine
    }

    pub fn pool(&self) -> &[PoolItem] {
        &self.pool
    }

    pub fn last(&self) -> Option<&Composition> {
        self.last.as_ref()
    }

    pub fn cache(&self) -> &GeometryCache {
        &self.cache
    }

    /// Compose against the retained pool and keep the updated pool
    pub fn recompose(&mut self, request: &ComposeRequest) -> &Composition {
        let composition = self
            .engine
            .compose_cached(request, &self.pool, &mut self.cache);
        self.pool = composition.pool.clone();
        self.last.insert(composition)
    }

    /// Swap in a new engine; the pool survives, cached geometry does not
    pub fn replace_engine(&mut self, engine: SceneEngine) {
        self.engine = engine;
        self.cache.invalidate();
    }

    /// Forget the pool and last result
    pub fn reset(&mut self) {
        self.pool.clear();
        self.last = None;
    }
}

/// Scenes keyed by mount target
#[derive(Debug, Clone, Default)]
pub struct SceneContext {
    scenes: HashMap<String, MountedScene>,
}

impl SceneContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `engine` at `target`, replacing any scene already there
    pub fn mount(&mut self, target: impl Into<String>, engine: SceneEngine) -> &mut MountedScene {
        let scene = MountedScene::new(engine);
        match self.scenes.entry(target.into()) {
            Entry::Occupied(mut entry) => {
                log::debug!("Remounting scene at `{}`", entry.key());
                entry.insert(scene);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(scene),
        }
    }

    pub fn unmount(&mut self, target: &str) -> Option<MountedScene> {
        self.scenes.remove(target)
    }

    pub fn scene(&self, target: &str) -> Option<&MountedScene> {
        self.scenes.get(target)
    }

    pub fn scene_mut(&mut self, target: &str) -> Option<&mut MountedScene> {
        self.scenes.get_mut(target)
    }

    /// Recompose the scene at `target`; `None` if nothing is mounted there
    pub fn recompose(&mut self, target: &str, request: &ComposeRequest) -> Option<&Composition> {
        self.scenes
            .get_mut(target)
            .map(|scene| scene.recompose(request))
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Mount targets in sorted order
    pub fn targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = self.scenes.keys().map(String::as_str).collect();
        targets.sort_unstable();
        targets
    }
}
