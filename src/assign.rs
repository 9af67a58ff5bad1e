use crate::config::{RefineConfig, SplitConfig};
use crate::data::{self, StateFile};
use crate::geometry::{centroid_of_coords, centroid_of_feature, feature_polygons, haversine_km};
use crate::spatial::StateIndex;
use crate::types::{feature_id, property_string, slugify, PolygonRings, NAME_KEYS};
use anyhow::Result;
use geo::Coord;
use geojson::{Feature, FeatureCollection};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// A state as loaded from its per-state file.
#[derive(Debug, Clone)]
pub struct StateBucket {
    pub key: String,
    pub polygons: Vec<PolygonRings>,
    /// Centroid of the first ring of the first polygon, used for the nearest-state fallback.
    anchor: Option<Coord<f64>>,
}

impl StateBucket {
    pub fn new(key: impl Into<String>, polygons: Vec<PolygonRings>) -> Self {
        let anchor = polygons
            .first()
            .and_then(|rings| rings.first())
            .and_then(|ring| centroid_of_coords(ring));
        Self {
            key: key.into(),
            polygons,
            anchor,
        }
    }
}

/// How a district ended up in its bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The centroid lies in one of this state's polygons.
    Contained(usize),
    /// No containing state; kept where it was before.
    Previous(usize),
    /// No centroid could be computed; kept where it was before.
    Uncentred(usize),
    /// Nearest state anchor by planar distance in degrees.
    Nearest(usize),
    /// No state has an anchor; the first bucket takes it.
    First(usize),
    Dropped,
}

impl Placement {
    pub fn state(self) -> Option<usize> {
        match self {
            Placement::Contained(s)
            | Placement::Previous(s)
            | Placement::Uncentred(s)
            | Placement::Nearest(s)
            | Placement::First(s) => Some(s),
            Placement::Dropped => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefineReport {
    pub total: usize,
    pub reassignments: usize,
    pub unassigned: usize,
    pub written: usize,
}

/// Districts grouped by state, in state order, plus the run counters.
#[derive(Debug)]
pub struct Assignment {
    pub buckets: Vec<(String, Vec<Feature>)>,
    pub report: RefineReport,
}

/// The existing per-state layout: polygons for containment plus the
/// district id → state memory used as a fallback.
pub struct StateSet {
    states: Vec<StateBucket>,
    previous: HashMap<String, usize>,
    index: StateIndex,
}

impl StateSet {
    /// Later collections overwrite earlier ones when a district id repeats.
    pub fn from_collections(collections: Vec<(String, FeatureCollection)>) -> Self {
        let mut states = Vec::with_capacity(collections.len());
        let mut previous = HashMap::new();
        for (state, (key, fc)) in collections.into_iter().enumerate() {
            let mut polygons = Vec::new();
            for feature in &fc.features {
                if let Some(id) = feature_id(feature) {
                    previous.insert(id, state);
                }
                polygons.extend(feature_polygons(feature));
            }
            states.push(StateBucket::new(key, polygons));
        }
        Self::new(states, previous)
    }

    pub fn new(states: Vec<StateBucket>, previous: HashMap<String, usize>) -> Self {
        let index = StateIndex::build(states.iter().map(|s| s.polygons.as_slice()));
        Self {
            states,
            previous,
            index,
        }
    }

    pub fn load(files: &[StateFile]) -> Result<Self> {
        let mut collections = Vec::with_capacity(files.len());
        for file in files {
            collections.push((file.key.clone(), data::read_feature_collection(&file.path)?));
        }
        Ok(Self::from_collections(collections))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn previous_key(&self, id: &str) -> Option<&str> {
        self.previous.get(id).map(|&s| self.states[s].key.as_str())
    }

    fn nearest(&self, point: Coord<f64>) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, state) in self.states.iter().enumerate() {
            let Some(anchor) = state.anchor else { continue };
            let d = (anchor.x - point.x).hypot(anchor.y - point.y);
            if best.map_or(true, |(_, best_d)| d < best_d) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }

    pub fn place(&self, feature: &Feature, polygons: &[&[PolygonRings]]) -> Placement {
        let previous = feature_id(feature).and_then(|id| self.previous.get(&id).copied());

        let Some(centroid) = centroid_of_feature(feature) else {
            return previous.map_or(Placement::Dropped, Placement::Uncentred);
        };
        if let Some(state) = self.index.locate(centroid, polygons) {
            return Placement::Contained(state);
        }
        if let Some(state) = previous {
            return Placement::Previous(state);
        }
        if let Some(state) = self.nearest(centroid) {
            return Placement::Nearest(state);
        }
        if self.states.is_empty() {
            Placement::Dropped
        } else {
            Placement::First(0)
        }
    }

    /// Buckets every district. Placement runs in parallel; buckets fill in input order.
    pub fn assign(&self, districts: Vec<Feature>) -> Assignment {
        let polygons: Vec<&[PolygonRings]> = self.states.iter().map(|s| s.polygons.as_slice()).collect();
        let placements: Vec<Placement> = districts
            .par_iter()
            .map(|feature| self.place(feature, &polygons))
            .collect();

        let mut buckets: Vec<Vec<Feature>> = vec![Vec::new(); self.states.len()];
        let mut report = RefineReport {
            total: districts.len(),
            ..RefineReport::default()
        };

        for (feature, placement) in districts.into_iter().zip(placements) {
            let Some(state) = placement.state() else {
                warn!(id = ?feature_id(&feature), "district has no centroid and no previous state; dropped");
                report.unassigned += 1;
                continue;
            };
            if let Some(id) = feature_id(&feature) {
                if let Some(before) = self.previous_key(&id) {
                    let after = self.states[state].key.as_str();
                    if before != after {
                        debug!(id = %id, from = before, to = after, "district reassigned");
                        report.reassignments += 1;
                    }
                }
            }
            buckets[state].push(feature);
        }

        let buckets = self
            .states
            .iter()
            .map(|s| s.key.clone())
            .zip(buckets)
            .collect();
        Assignment { buckets, report }
    }
}

/// Writes each non-empty bucket to `<dir>/<key>.geojson`, replacing what was there.
pub fn write_buckets(dir: &Path, buckets: &[(String, Vec<Feature>)]) -> Result<usize> {
    let mut written = 0;
    for (key, features) in buckets {
        if features.is_empty() {
            continue;
        }
        let out_path = dir.join(format!("{key}.geojson"));
        data::write_feature_collection(&out_path, &data::collection(features.clone()))?;
        written += 1;
        info!("Wrote {:?} features: {}", out_path, features.len());
    }
    Ok(written)
}

/// Reassigns every district in the source to the state containing its centroid
/// and rewrites the per-state files in place.
pub fn refine(config: &RefineConfig) -> Result<RefineReport> {
    data::require_file("districts source", &config.districts)?;
    data::require_dir("state-districts directory", &config.states_dir)?;

    info!("Loading districts source {:?}...", config.districts);
    let districts = data::read_feature_collection(&config.districts)?;

    info!("Loading existing per-state files from {:?}", config.states_dir);
    let files = data::list_state_files(&config.states_dir)?;
    let states = StateSet::load(&files)?;
    info!("States loaded: {}", states.len());

    let Assignment { buckets, mut report } = states.assign(districts.features);
    report.written = write_buckets(&config.states_dir, &buckets)?;

    info!(
        total = report.total,
        reassignments = report.reassignments,
        unassigned = report.unassigned,
        written = report.written,
        "Done refining districts"
    );
    Ok(report)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SplitReport {
    pub total: usize,
    pub unassigned: usize,
    pub written: usize,
}

/// Groups districts under the state whose centroid is nearest on the sphere.
/// Buckets are keyed by the slug of the state name and kept in state order.
pub fn split_by_nearest(
    states: &FeatureCollection,
    districts: Vec<Feature>,
) -> (Vec<(String, Vec<Feature>)>, usize) {
    let mut buckets: Vec<(String, Vec<Feature>)> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut anchors: Vec<(usize, Coord<f64>)> = Vec::new();

    for state in &states.features {
        let name = property_string(state, &NAME_KEYS).unwrap_or_else(|| "unknown".to_string());
        let key = slugify(&name);
        let slot = *slots.entry(key.clone()).or_insert_with(|| {
            buckets.push((key, Vec::new()));
            buckets.len() - 1
        });
        if let Some(centroid) = centroid_of_feature(state) {
            anchors.push((slot, centroid));
        }
    }

    let nearest: Vec<Option<usize>> = districts
        .par_iter()
        .map(|district| {
            let c = centroid_of_feature(district)?;
            let mut best: Option<(usize, f64)> = None;
            for &(slot, anchor) in &anchors {
                let d = haversine_km(c, anchor);
                if best.map_or(true, |(_, best_d)| d < best_d) {
                    best = Some((slot, d));
                }
            }
            best.map(|(slot, _)| slot)
        })
        .collect();

    let mut unassigned = 0;
    for (district, slot) in districts.into_iter().zip(nearest) {
        match slot {
            Some(slot) => buckets[slot].1.push(district),
            None => unassigned += 1,
        }
    }
    (buckets, unassigned)
}

pub fn split(config: &SplitConfig) -> Result<SplitReport> {
    data::require_file("districts source", &config.districts)?;
    data::require_file("states file", &config.states)?;

    info!("Reading states... {:?}", config.states);
    let states = data::read_feature_collection(&config.states)?;
    info!("Found {} states", states.features.len());

    info!("Reading districts {:?}...", config.districts);
    let districts = data::read_feature_collection(&config.districts)?;
    let total = districts.features.len();
    info!("Total district features: {}", total);

    let (buckets, unassigned) = split_by_nearest(&states, districts.features);
    let written = write_buckets(&config.out_dir, &buckets)?;

    info!(written, unassigned, "Done splitting districts");
    Ok(SplitReport {
        total,
        unassigned,
        written,
    })
}
