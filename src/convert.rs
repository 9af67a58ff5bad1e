use crate::data;
use crate::error::ConvertError;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use shapefile::dbase::FieldValue;
use shapefile::Shape;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Largest magnitude at which every integer is exactly representable as an f64.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

fn field_to_json(value: FieldValue) -> JsonValue {
    // Whole numbers are written without a fraction: `5`, not `5.0`.
    let number = |n: f64| {
        if n.fract() == 0.0 && n.abs() < MAX_EXACT_INT {
            return JsonValue::from(n as i64);
        }
        serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    };
    match value {
        FieldValue::Character(Some(s)) => JsonValue::String(s.trim_end().to_string()),
        FieldValue::Memo(s) => JsonValue::String(s),
        FieldValue::Numeric(Some(n)) | FieldValue::Double(n) | FieldValue::Currency(n) => number(n),
        FieldValue::Float(Some(f)) => number(f as f64),
        FieldValue::Integer(i) => JsonValue::from(i),
        FieldValue::Logical(Some(b)) => JsonValue::Bool(b),
        FieldValue::Date(Some(d)) => {
            JsonValue::String(format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day()))
        }
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None)
        | FieldValue::Date(None) => JsonValue::Null,
        #[allow(unreachable_patterns)]
        other => JsonValue::String(format!("{:?}", other)),
    }
}

/// Attribute record as GeoJSON properties; keys come out sorted.
pub fn record_to_properties(record: shapefile::dbase::Record) -> JsonObject {
    record
        .into_iter()
        .map(|(name, value)| (name, field_to_json(value)))
        .collect()
}

/// `None` for null shapes. A multipolygon with a single part is emitted as a Polygon.
pub fn shape_to_geometry(shape: Shape) -> Result<Option<Geometry>, String> {
    if let Shape::NullShape = shape {
        return Ok(None);
    }
    let geometry = geo::Geometry::<f64>::try_from(shape).map_err(|e| format!("{:?}", e))?;
    let value = match geometry {
        geo::Geometry::MultiPolygon(mut mp) if mp.0.len() == 1 => {
            let polygon = mp.0.remove(0);
            Value::from(&polygon)
        }
        other => Value::from(&other),
    };
    Ok(Some(Geometry::new(value)))
}

fn to_feature(geometry: Option<Geometry>, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry,
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Reads every shape (with attributes when a sibling `.dbf` exists).
pub fn read_features(shp_path: &Path) -> Result<Vec<Feature>, ConvertError> {
    let decode = |reason: String| ConvertError::Decode {
        path: shp_path.to_path_buf(),
        reason,
    };
    let read_err = |err: shapefile::Error| decode(err.to_string());

    let mut features = Vec::new();
    if shp_path.with_extension("dbf").is_file() {
        let mut reader = shapefile::Reader::from_path(shp_path).map_err(read_err)?;
        for result in reader.iter_shapes_and_records() {
            let (shape, record) = result.map_err(read_err)?;
            features.push(to_feature(shape_to_geometry(shape).map_err(decode)?, record_to_properties(record)));
        }
    } else {
        warn!("no .dbf next to {:?}; properties will be empty", shp_path);
        for shape in shapefile::read_shapes(shp_path).map_err(read_err)? {
            features.push(to_feature(shape_to_geometry(shape).map_err(decode)?, JsonObject::new()));
        }
    }
    Ok(features)
}

pub fn write_pretty(out_path: &Path, fc: &FeatureCollection) -> Result<(), ConvertError> {
    let write_err = |source: std::io::Error| ConvertError::Write {
        path: out_path.to_path_buf(),
        source,
    };
    let file = File::create(out_path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, fc).map_err(|e| write_err(e.into()))?;
    writer.flush().map_err(write_err)?;
    Ok(())
}

/// Shapefile to GeoJSON FeatureCollection. Returns the feature count.
pub fn convert(shp_path: &Path, out_path: &Path) -> Result<usize, ConvertError> {
    if !shp_path.exists() {
        return Err(ConvertError::MissingInput(shp_path.to_path_buf()));
    }

    let features = read_features(shp_path)?;
    let count = features.len();
    write_pretty(out_path, &data::collection(features))?;

    info!("Wrote {:?} with {} features", out_path, count);
    Ok(count)
}
