//! Data-driven layout tuning
//!
//! Every table the engine consults lives in `LayoutConfig`: pool sizes,
//! grid specs, quota curves, footprints, separations, bands and screen
//! zones. The built-in tables are the `Default`; callers can ship their own
//! as JSON.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{LayoutError, Result};
use crate::layout::bands::{Band, BandTable, BandTables};
use crate::layout::grid::GridSpec;
use crate::layout::quota::{CategoryAnchor, QuotaLimit, VariantAnchor};
use crate::layout::rules::RowRule;
use crate::layout::state::{Category, Footprint, Variant};
use crate::platform::{DeviceClass, Mode, ZoneThresholds};
use crate::settings::{CurveSet, EngineSettings};

/// Pool size per (mode, device class)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolSizePolicy {
    sizes: BTreeMap<Mode, BTreeMap<DeviceClass, u32>>,
}

impl PoolSizePolicy {
    pub fn new(sizes: BTreeMap<Mode, BTreeMap<DeviceClass, u32>>) -> Self {
        Self { sizes }
    }

    /// Missing entries size the pool to zero
    pub fn size(&self, mode: Mode, device: DeviceClass) -> u32 {
        self.sizes
            .get(&mode)
            .and_then(|by_device| by_device.get(&device))
            .copied()
            .unwrap_or(0)
    }

    pub fn size_for_width(&self, mode: Mode, width: f64) -> u32 {
        self.size(mode, DeviceClass::from_width(width))
    }

    fn has(&self, mode: Mode, device: DeviceClass) -> bool {
        self.sizes
            .get(&mode)
            .is_some_and(|by_device| by_device.contains_key(&device))
    }
}

impl Default for PoolSizePolicy {
    fn default() -> Self {
        let row = |s, m, l| {
            BTreeMap::from([
                (DeviceClass::Small, s),
                (DeviceClass::Medium, m),
                (DeviceClass::Large, l),
            ])
        };
        Self::new(BTreeMap::from([
            (Mode::Start, row(14, 20, 26)),
            (Mode::Questionnaire, row(10, 14, 18)),
            (Mode::Overlay, row(8, 12, 16)),
        ]))
    }
}

/// Grid spec as written in config (rules still in DSL form)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpecEntry {
    pub mode: Mode,
    pub device: DeviceClass,
    pub rows: u32,
    pub usable_height_ratio: f64,
    #[serde(default)]
    pub row_rules: Vec<String>,
}

impl GridSpecEntry {
    fn new(mode: Mode, device: DeviceClass, rows: u32, ratio: f64, rules: &[&str]) -> Self {
        Self {
            mode,
            device,
            rows,
            usable_height_ratio: ratio,
            row_rules: rules.iter().map(|r| r.to_string()).collect(),
        }
    }

    pub fn compile(&self) -> Result<GridSpec> {
        if self.rows == 0 {
            return Err(self.error("rows must be positive"));
        }
        if !(self.usable_height_ratio > 0.0 && self.usable_height_ratio <= 1.0) {
            return Err(self.error(format!(
                "usable_height_ratio must be within (0, 1], got {}",
                self.usable_height_ratio
            )));
        }
        let rules = self
            .row_rules
            .iter()
            .map(|r| RowRule::parse(r))
            .collect::<Result<Vec<_>>>()?;
        Ok(GridSpec::new(self.rows, self.usable_height_ratio).with_rules(rules))
    }

    fn error(&self, message: impl Into<String>) -> LayoutError {
        LayoutError::GridSpec {
            mode: self.mode.to_string(),
            device: self.device.to_string(),
            message: message.into(),
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub settings: EngineSettings,
    pub pool_sizes: PoolSizePolicy,
    pub grid_specs: Vec<GridSpecEntry>,
    pub category_curves: BTreeMap<CurveSet, Vec<CategoryAnchor>>,
    pub variant_curves: BTreeMap<CurveSet, BTreeMap<Category, Vec<VariantAnchor>>>,
    pub footprints: BTreeMap<Category, BTreeMap<Variant, Footprint>>,
    #[serde(default)]
    pub separations: BTreeMap<Variant, f64>,
    /// Fractional anchor inside the footprint, blended with the centre
    #[serde(default)]
    pub anchor_fractions: BTreeMap<Variant, [f32; 2]>,
    pub bands: BandTables,
    #[serde(default)]
    pub zones: BTreeMap<DeviceClass, ZoneThresholds>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            settings: EngineSettings::default(),
            pool_sizes: PoolSizePolicy::default(),
            grid_specs: default_grid_specs(),
            category_curves: default_category_curves(),
            variant_curves: default_variant_curves(),
            footprints: default_footprints(),
            separations: default_separations(),
            anchor_fractions: BTreeMap::from([
                (Variant::Balloon, [0.5, 0.0]),
                (Variant::Tree, [0.5, 1.0]),
                (Variant::Windmill, [0.5, 1.0]),
            ]),
            bands: default_bands(),
            zones: BTreeMap::from([
                (DeviceClass::Small, ZoneThresholds::new(0.33, 0.67)),
                (DeviceClass::Medium, ZoneThresholds::new(0.3, 0.7)),
                // left is above right on desktop: Mid never fires
                (DeviceClass::Large, ZoneThresholds::new(0.6, 0.4)),
            ]),
        }
    }
}

impl LayoutConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: LayoutConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn category_curve(&self, set: CurveSet) -> &[CategoryAnchor] {
        self.category_curves
            .get(&set)
            .or_else(|| self.category_curves.get(&CurveSet::Standard))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn variant_curve(&self, set: CurveSet, category: Category) -> &[VariantAnchor] {
        self.variant_curves
            .get(&set)
            .and_then(|by_cat| by_cat.get(&category))
            .or_else(|| {
                self.variant_curves
                    .get(&CurveSet::Standard)
                    .and_then(|by_cat| by_cat.get(&category))
            })
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Table footprint, or the variant's global default with a warning
    pub fn footprint(&self, category: Category, variant: Variant) -> Footprint {
        match self
            .footprints
            .get(&category)
            .and_then(|table| table.get(&variant))
        {
            Some(fp) => *fp,
            None => {
                let fallback = variant.default_footprint();
                log::warn!(
                    "No footprint for {category}/{variant}, using default {}x{}",
                    fallback.w,
                    fallback.h
                );
                fallback
            }
        }
    }

    /// Minimum same-group distance in cells (0 = no constraint)
    pub fn separation(&self, variant: Variant) -> f64 {
        self.separations.get(&variant).copied().unwrap_or(0.0)
    }

    pub fn anchor_fraction(&self, variant: Variant) -> Option<Vec2> {
        self.anchor_fractions
            .get(&variant)
            .map(|&[fx, fy]| Vec2::new(fx, fy))
    }

    pub fn zone_thresholds(&self, device: DeviceClass) -> ZoneThresholds {
        self.zones
            .get(&device)
            .copied()
            .unwrap_or(ZoneThresholds::new(1.0 / 3.0, 2.0 / 3.0))
    }

    /// Parse every grid spec, keyed by (mode, device)
    pub fn compile_grid_specs(&self) -> Result<BTreeMap<(Mode, DeviceClass), GridSpec>> {
        let mut specs = BTreeMap::new();
        for entry in &self.grid_specs {
            if specs.insert((entry.mode, entry.device), entry.compile()?).is_some() {
                return Err(entry.error("duplicate grid spec"));
            }
        }
        for mode in Mode::ALL {
            for device in DeviceClass::ALL {
                if !specs.contains_key(&(mode, device)) {
                    return Err(LayoutError::MissingGridSpec {
                        mode: mode.to_string(),
                        device: device.to_string(),
                    });
                }
            }
        }
        Ok(specs)
    }

    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;

        for mode in Mode::ALL {
            for device in DeviceClass::ALL {
                if !self.pool_sizes.has(mode, device) {
                    return Err(LayoutError::Config(format!(
                        "missing pool size for {mode}/{device}"
                    )));
                }
            }
        }

        self.compile_grid_specs()?;

        if !self.category_curves.contains_key(&CurveSet::Standard) {
            return Err(LayoutError::curve("standard", "missing category curve"));
        }
        for (set, anchors) in &self.category_curves {
            check_anchor_order(set.as_str(), anchors.iter().map(|a| a.t))?;
            for anchor in anchors {
                if anchor.weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(LayoutError::curve(
                        set.as_str(),
                        format!("negative or non-finite weight at t={}", anchor.t),
                    ));
                }
            }
        }

        for (set, by_category) in &self.variant_curves {
            for (category, anchors) in by_category {
                let name = format!("{}/{}", set.as_str(), category);
                check_anchor_order(&name, anchors.iter().map(|a| a.t))?;
                for anchor in anchors {
                    for (variant, limit) in &anchor.limits {
                        if variant.category() != *category {
                            return Err(LayoutError::curve(
                                name.as_str(),
                                format!("{variant} is not a {category} variant"),
                            ));
                        }
                        if let QuotaLimit::Cap(c) = limit {
                            if !c.is_finite() || *c < 0.0 {
                                return Err(LayoutError::curve(
                                    name.as_str(),
                                    format!("bad cap {c} for {variant}"),
                                ));
                            }
                        }
                    }
                }
            }
        }

        for (category, table) in &self.footprints {
            for (variant, fp) in table {
                if fp.w == 0 || fp.h == 0 {
                    return Err(LayoutError::Config(format!(
                        "footprint for {category}/{variant} must be at least 1x1"
                    )));
                }
            }
        }

        for (variant, sep) in &self.separations {
            if !sep.is_finite() || *sep < 0.0 {
                return Err(LayoutError::Config(format!(
                    "separation for {variant} must be finite and non-negative"
                )));
            }
        }

        for (variant, &[fx, fy]) in &self.anchor_fractions {
            if !(0.0..=1.0).contains(&fx) || !(0.0..=1.0).contains(&fy) {
                return Err(LayoutError::Config(format!(
                    "anchor fraction for {variant} must be within 0..=1"
                )));
            }
        }

        for (variant, band) in self.bands.iter_bands() {
            if !band.is_valid() {
                return Err(LayoutError::Band {
                    variant: variant.to_string(),
                    message: format!("[{}, {}] is not a valid band", band.top, band.bottom),
                });
            }
        }
        for band in [self.bands.sky_default, self.bands.ground_default] {
            if !band.is_valid() {
                return Err(LayoutError::Band {
                    variant: "default".to_string(),
                    message: format!("[{}, {}] is not a valid band", band.top, band.bottom),
                });
            }
        }

        for (device, zones) in &self.zones {
            if !(0.0..=1.0).contains(&zones.left) || !(0.0..=1.0).contains(&zones.right) {
                return Err(LayoutError::Config(format!(
                    "zone thresholds for {device} must be within 0..=1"
                )));
            }
        }

        Ok(())
    }
}

fn check_anchor_order(name: &str, ts: impl Iterator<Item = f64>) -> Result<()> {
    let mut prev = f64::NEG_INFINITY;
    let mut count = 0;
    for t in ts {
        if !(0.0..=1.0).contains(&t) {
            return Err(LayoutError::curve(name, format!("anchor t={t} outside 0..=1")));
        }
        if t < prev {
            return Err(LayoutError::curve(name, "anchors are not sorted by t"));
        }
        prev = t;
        count += 1;
    }
    if count == 0 {
        return Err(LayoutError::curve(name, "no anchors"));
    }
    Ok(())
}

fn default_grid_specs() -> Vec<GridSpecEntry> {
    use DeviceClass::*;
    use Mode::*;
    vec![
        GridSpecEntry::new(Start, Small, 16, 0.85, &[]),
        GridSpecEntry::new(Start, Medium, 14, 0.85, &["0-1: center 30%"]),
        GridSpecEntry::new(Start, Large, 12, 0.8, &["0-1: center 30%"]),
        GridSpecEntry::new(Questionnaire, Small, 16, 0.5, &["0-2: left 10%, right 10%"]),
        GridSpecEntry::new(Questionnaire, Medium, 14, 0.9, &["*: center 60%"]),
        GridSpecEntry::new(Questionnaire, Large, 12, 0.9, &["*: center 50%"]),
        GridSpecEntry::new(Overlay, Small, 14, 1.0, &["0: left 2, right 2"]),
        GridSpecEntry::new(Overlay, Medium, 12, 1.0, &[]),
        GridSpecEntry::new(Overlay, Large, 10, 1.0, &[]),
    ]
}

fn default_category_curves() -> BTreeMap<CurveSet, Vec<CategoryAnchor>> {
    BTreeMap::from([
        (
            CurveSet::Standard,
            vec![
                CategoryAnchor::new(0.0, [3.0, 2.0, 1.0, 8.0]),
                CategoryAnchor::new(0.5, [5.0, 7.0, 7.0, 5.0]),
                CategoryAnchor::new(1.0, [6.0, 9.0, 8.0, 1.0]),
            ],
        ),
        (
            CurveSet::Muted,
            vec![
                CategoryAnchor::new(0.0, [2.0, 1.0, 1.0, 6.0]),
                CategoryAnchor::new(1.0, [3.0, 4.0, 3.0, 2.0]),
            ],
        ),
    ])
}

fn default_variant_curves() -> BTreeMap<CurveSet, BTreeMap<Category, Vec<VariantAnchor>>> {
    use QuotaLimit::{Cap, Unbounded};
    let standard = BTreeMap::from([
        (
            Category::Sky,
            vec![
                VariantAnchor::new(
                    0.0,
                    [
                        (Variant::Cloud, Unbounded),
                        (Variant::Bird, Cap(1.0)),
                        (Variant::Balloon, Cap(0.0)),
                    ],
                ),
                VariantAnchor::new(
                    1.0,
                    [
                        (Variant::Cloud, Unbounded),
                        (Variant::Bird, Cap(4.0)),
                        (Variant::Balloon, Cap(2.0)),
                    ],
                ),
            ],
        ),
        (
            Category::Flora,
            vec![
                VariantAnchor::new(
                    0.0,
                    [
                        (Variant::Tree, Cap(0.0)),
                        (Variant::Bush, Unbounded),
                        (Variant::Flower, Cap(1.0)),
                        (Variant::Sprout, Cap(1.0)),
                    ],
                ),
                VariantAnchor::new(
                    1.0,
                    [
                        (Variant::Tree, Cap(6.0)),
                        (Variant::Bush, Unbounded),
                        (Variant::Flower, Cap(4.0)),
                        (Variant::Sprout, Cap(1.0)),
                    ],
                ),
            ],
        ),
        (
            Category::Structure,
            vec![
                VariantAnchor::new(
                    0.0,
                    [
                        (Variant::House, Cap(1.0)),
                        (Variant::Windmill, Cap(0.0)),
                        (Variant::Well, Unbounded),
                    ],
                ),
                VariantAnchor::new(
                    1.0,
                    [
                        (Variant::House, Cap(4.0)),
                        (Variant::Windmill, Cap(2.0)),
                        (Variant::Well, Unbounded),
                    ],
                ),
            ],
        ),
        (
            Category::Filler,
            vec![
                VariantAnchor::new(
                    0.0,
                    [(Variant::Rock, Unbounded), (Variant::Grass, Cap(2.0))],
                ),
                VariantAnchor::new(
                    1.0,
                    [(Variant::Rock, Cap(2.0)), (Variant::Grass, Unbounded)],
                ),
            ],
        ),
    ]);

    // Muted keeps the big pieces rare
    let muted = BTreeMap::from([
        (
            Category::Sky,
            vec![VariantAnchor::new(
                0.0,
                [(Variant::Cloud, Unbounded), (Variant::Bird, Cap(1.0))],
            )],
        ),
        (
            Category::Structure,
            vec![VariantAnchor::new(
                0.0,
                [(Variant::House, Cap(1.0)), (Variant::Well, Unbounded)],
            )],
        ),
    ]);

    BTreeMap::from([(CurveSet::Standard, standard), (CurveSet::Muted, muted)])
}

fn default_footprints() -> BTreeMap<Category, BTreeMap<Variant, Footprint>> {
    let mut table: BTreeMap<Category, BTreeMap<Variant, Footprint>> = BTreeMap::new();
    let sizes = [
        (Variant::Cloud, Footprint::new(2, 1)),
        (Variant::Bird, Footprint::UNIT),
        (Variant::Balloon, Footprint::new(1, 2)),
        (Variant::Tree, Footprint::new(1, 2)),
        (Variant::Bush, Footprint::UNIT),
        (Variant::Flower, Footprint::UNIT),
        (Variant::Sprout, Footprint::UNIT),
        (Variant::House, Footprint::new(2, 2)),
        (Variant::Windmill, Footprint::new(1, 2)),
        (Variant::Well, Footprint::UNIT),
        (Variant::Rock, Footprint::UNIT),
        (Variant::Grass, Footprint::UNIT),
    ];
    for (variant, fp) in sizes {
        table.entry(variant.category()).or_default().insert(variant, fp);
    }
    table
}

fn default_separations() -> BTreeMap<Variant, f64> {
    BTreeMap::from([
        (Variant::Cloud, 4.0),
        (Variant::Bird, 2.0),
        (Variant::Balloon, 5.0),
        (Variant::Tree, 2.0),
        (Variant::Bush, 1.5),
        (Variant::Flower, 1.0),
        (Variant::Sprout, 3.0),
        (Variant::House, 4.0),
        (Variant::Windmill, 5.0),
        (Variant::Well, 3.0),
        (Variant::Rock, 1.0),
        (Variant::Grass, 1.0),
    ])
}

fn default_bands() -> BandTables {
    let ground = |top| Band::new(top, 1.0);
    let large = BTreeMap::from([
        (Variant::Cloud, Band::new(0.0, 0.3)),
        (Variant::Bird, Band::new(0.05, 0.4)),
        (Variant::Balloon, Band::new(0.0, 0.35)),
        (Variant::Tree, ground(0.55)),
        (Variant::Bush, ground(0.65)),
        (Variant::Flower, ground(0.7)),
        (Variant::Sprout, ground(0.7)),
        (Variant::House, ground(0.55)),
        (Variant::Windmill, ground(0.5)),
        (Variant::Well, ground(0.7)),
        (Variant::Rock, ground(0.75)),
        (Variant::Grass, ground(0.8)),
    ]);
    let medium = BTreeMap::from([
        (Variant::Cloud, Band::new(0.0, 0.3)),
        (Variant::Balloon, Band::new(0.0, 0.4)),
        (Variant::Tree, ground(0.6)),
        (Variant::House, ground(0.6)),
        (Variant::Windmill, ground(0.55)),
    ]);
    let small = BTreeMap::from([
        (Variant::Cloud, Band::new(0.0, 0.25)),
        (Variant::House, ground(0.65)),
    ]);

    let questionnaire = BTreeMap::from([(
        DeviceClass::Large,
        BTreeMap::from([
            (Variant::Cloud, Band::new(0.0, 0.2)),
            (Variant::House, ground(0.7)),
        ]),
    )]);
    let overlay_birds = BTreeMap::from([(Variant::Bird, Band::new(0.0, 0.25))]);
    let overlay: BTreeMap<DeviceClass, BandTable> = DeviceClass::ALL
        .iter()
        .map(|&d| (d, overlay_birds.clone()))
        .collect();

    BandTables {
        overrides: BTreeMap::from([(Mode::Questionnaire, questionnaire), (Mode::Overlay, overlay)]),
        base: BTreeMap::from([
            (DeviceClass::Small, small),
            (DeviceClass::Medium, medium),
            (DeviceClass::Large, large),
        ]),
        sky_default: Band::new(0.0, 0.35),
        ground_default: Band::new(0.6, 1.0),
    }
}
