use crate::config::DissolveConfig;
use crate::data;
use anyhow::{anyhow, Context, Result};
use geo::{BooleanOps, MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, Geometry, Value};
use rayon::prelude::*;
use std::convert::TryInto;
use std::path::Path;
use tracing::{error, info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DissolveReport {
    pub processed: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Polygon parts of every feature, converted to `geo` types (rings get closed).
pub fn collect_polygons(fc: &FeatureCollection) -> Result<Vec<Polygon<f64>>> {
    let mut polygons = Vec::new();

    for feature in &fc.features {
        if let Some(geom) = &feature.geometry {
            match geom.value {
                Value::Polygon(_) | Value::MultiPolygon(_) => {
                    let geo_geom: geo::Geometry<f64> = geom.value.clone().try_into()
                        .map_err(|e| anyhow!("Failed to convert geometry: {:?}", e))?;

                    match geo_geom {
                        geo::Geometry::Polygon(p) => polygons.push(p),
                        geo::Geometry::MultiPolygon(mp) => polygons.extend(mp),
                        _ => {},
                    }
                },
                _ => {},
            }
        }
    }

    Ok(polygons)
}

/// Union of all polygons, merged pairwise in rounds.
pub fn union_all(polygons: Vec<Polygon<f64>>) -> MultiPolygon<f64> {
    let mut layer: Vec<MultiPolygon<f64>> = polygons
        .into_iter()
        .map(|p| MultiPolygon::new(vec![p]))
        .collect();

    while layer.len() > 1 {
        layer = layer
            .par_chunks(2)
            .map(|pair| match pair {
                [a, b] => a.union(b),
                [a] => a.clone(),
                _ => MultiPolygon::new(Vec::new()),
            })
            .collect();
    }

    layer.pop().unwrap_or_else(|| MultiPolygon::new(Vec::new()))
}

pub fn dissolve_collection(key: &str, fc: &FeatureCollection) -> Result<Option<FeatureCollection>> {
    let polygons = collect_polygons(fc)?;
    if polygons.is_empty() {
        return Ok(None);
    }
    let outline = union_all(polygons);
    let value = match outline.0.as_slice() {
        [polygon] => Value::from(polygon),
        _ => Value::from(&outline),
    };

    let mut properties = geojson::JsonObject::new();
    properties.insert("key".to_string(), key.into());
    let feature = Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    };
    Ok(Some(data::collection(vec![feature])))
}

fn dissolve_file(key: &str, in_path: &Path, out_path: &Path) -> Result<bool> {
    let fc = data::read_feature_collection(in_path)?;
    match dissolve_collection(key, &fc)? {
        Some(outline) => {
            data::write_feature_collection(out_path, &outline)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Writes one dissolved outline per state file. A bad file is logged and skipped.
pub fn dissolve(config: &DissolveConfig) -> Result<DissolveReport> {
    data::require_dir("state-districts directory", &config.input_dir)?;
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create directory: {:?}", config.output_dir))?;

    let mut report = DissolveReport::default();
    for file in data::list_state_files(&config.input_dir)? {
        info!("Processing {}", file.key);
        report.processed += 1;
        let out_path = config.output_dir.join(format!("{}.geojson", file.key));
        match dissolve_file(&file.key, &file.path, &out_path) {
            Ok(true) => report.written += 1,
            Ok(false) => {
                warn!("{} has no polygons, skipped", file.key);
                report.skipped += 1;
            }
            Err(e) => {
                error!("failed {}: {:#}", file.key, e);
                report.failed += 1;
            }
        }
    }

    info!(
        processed = report.processed,
        written = report.written,
        skipped = report.skipped,
        failed = report.failed,
        "Done dissolving states"
    );
    Ok(report)
}
