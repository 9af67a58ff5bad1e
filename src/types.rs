use geo::Coord;
use geojson::{Feature, JsonValue, PolygonType, Position};

/// Vertices exactly as they appear in the source; never closed or deduplicated.
pub type Ring = Vec<Coord<f64>>;

/// Ring 0 is the outer boundary, the rest are holes.
pub type PolygonRings = Vec<Ring>;

/// Property keys tried, in order, when identifying a district across runs.
pub const ID_KEYS: [&str; 4] = ["shapeID", "SHAPEID", "id", "shapeName"];

/// Property keys tried, in order, for a state's display name.
pub const NAME_KEYS: [&str; 3] = ["name", "NAME", "state"];

pub fn coord_from_position(position: &Position) -> Option<Coord<f64>> {
    match position.as_slice() {
        [x, y, ..] if x.is_finite() && y.is_finite() => Some(Coord { x: *x, y: *y }),
        _ => None,
    }
}

pub fn ring_from_positions(positions: &[Position]) -> Ring {
    positions.iter().filter_map(coord_from_position).collect()
}

pub fn polygon_from_geojson(polygon: &PolygonType) -> PolygonRings {
    polygon.iter().map(|ring| ring_from_positions(ring)).collect()
}

/// First truthy value among `keys`, rendered as a string.
pub fn property_string(feature: &Feature, keys: &[&str]) -> Option<String> {
    let props = feature.properties.as_ref()?;
    keys.iter().find_map(|key| match props.get(*key)? {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        JsonValue::Bool(true) => Some("true".to_string()),
        _ => None,
    })
}

pub fn feature_id(feature: &Feature) -> Option<String> {
    property_string(feature, &ID_KEYS)
}

/// Lowercase, runs of anything outside `[a-z0-9]` collapsed to `-`, no edge dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}
