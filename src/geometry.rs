//! Planar primitives over raw GeoJSON rings, in lon/lat degrees.
//!
//! Centroids here are unweighted vertex means. They are only used to pick
//! a bucket for a whole district, never as a geographic centre.

use crate::types::{coord_from_position, polygon_from_geojson, PolygonRings};
use geo::Coord;
use geojson::{Feature, Value};

/// Even-odd ray cast towards +x. The edge from the last vertex back to the
/// first is always tested, so open rings behave as if closed.
pub fn point_in_ring(point: Coord<f64>, ring: &[Coord<f64>]) -> bool {
    let mut inside = false;
    let Some(mut prev) = ring.last().copied() else {
        return false;
    };
    for &curr in ring {
        if (curr.y > point.y) != (prev.y > point.y) {
            let x_cross = (prev.x - curr.x) * (point.y - curr.y) / (prev.y - curr.y) + curr.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        prev = curr;
    }
    inside
}

/// Inside ring 0 and outside every hole.
pub fn point_in_polygon(point: Coord<f64>, polygon: &[Vec<Coord<f64>>]) -> bool {
    let Some((outer, holes)) = polygon.split_first() else {
        return false;
    };
    point_in_ring(point, outer) && !holes.iter().any(|hole| point_in_ring(point, hole))
}

pub fn centroid_of_coords(coords: &[Coord<f64>]) -> Option<Coord<f64>> {
    if coords.is_empty() {
        return None;
    }
    let n = coords.len() as f64;
    let sum = coords.iter().fold(Coord { x: 0.0, y: 0.0 }, |acc, c| acc + *c);
    Some(Coord { x: sum.x / n, y: sum.y / n })
}

fn mean(points: &[Coord<f64>]) -> Option<Coord<f64>> {
    centroid_of_coords(points)
}

pub fn centroid_of_feature(feature: &Feature) -> Option<Coord<f64>> {
    let geometry = feature.geometry.as_ref()?;
    match &geometry.value {
        Value::Polygon(rings) => {
            let polygon = polygon_from_geojson(rings);
            centroid_of_coords(polygon.first()?)
        }
        Value::MultiPolygon(polygons) => {
            let outer_centroids: Vec<Coord<f64>> = polygons
                .iter()
                .filter_map(|rings| {
                    let polygon = polygon_from_geojson(rings);
                    centroid_of_coords(polygon.first()?)
                })
                .collect();
            mean(&outer_centroids)
        }
        Value::Point(position) => coord_from_position(position),
        _ => None,
    }
}

/// Polygons usable for containment tests; other geometry kinds yield none.
pub fn feature_polygons(feature: &Feature) -> Vec<PolygonRings> {
    let Some(geometry) = feature.geometry.as_ref() else {
        return Vec::new();
    };
    match &geometry.value {
        Value::Polygon(rings) => vec![polygon_from_geojson(rings)],
        Value::MultiPolygon(polygons) => polygons.iter().map(polygon_from_geojson).collect(),
        _ => Vec::new(),
    }
}

/// Great-circle distance in km on a 6371 km sphere.
pub fn haversine_km(a: Coord<f64>, b: Coord<f64>) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (b.y - a.y).to_radians();
    let d_lon = (b.x - a.x).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.y.to_radians().cos() * b.y.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::Geometry;

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Coord<f64>> {
        vec![c(x0, y0), c(x1, y0), c(x1, y1), c(x0, y1), c(x0, y0)]
    }

    fn feature(value: Value) -> Feature {
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(value)),
            id: None,
            properties: None,
            foreign_members: None,
        }
    }

    #[test]
    fn convex_polygons_contain_their_centroid() {
        let shapes = [
            square(0.0, 0.0, 1.0, 1.0),
            square(70.0, 10.0, 80.0, 20.0),
            vec![c(0.0, 0.0), c(4.0, 0.0), c(2.0, 3.0)],
            vec![c(-3.0, 0.0), c(-1.0, -2.0), c(1.0, -2.0), c(3.0, 0.0), c(1.0, 2.0), c(-1.0, 2.0)],
        ];
        for ring in shapes {
            let centroid = centroid_of_coords(&ring).unwrap();
            let polygon = vec![ring];
            assert!(point_in_polygon(centroid, &polygon), "centroid {centroid:?}");
            assert!(!point_in_polygon(c(1000.0, 1000.0), &polygon));
            assert!(!point_in_polygon(c(-1000.0, centroid.y), &polygon));
        }
    }

    #[test]
    fn holes_exclude_points() {
        let polygon = vec![square(0.0, 0.0, 10.0, 10.0), square(4.0, 4.0, 6.0, 6.0)];
        assert!(!point_in_polygon(c(5.0, 5.0), &polygon));
        assert!(point_in_polygon(c(2.0, 2.0), &polygon));
        assert!(!point_in_polygon(c(5.0, 5.0), &[]));
    }

    #[test]
    fn open_rings_are_treated_as_closed() {
        let open = vec![c(0.0, 0.0), c(2.0, 0.0), c(2.0, 2.0), c(0.0, 2.0)];
        assert!(point_in_ring(c(1.0, 1.0), &open));
        assert!(!point_in_ring(c(3.0, 1.0), &open));
        assert!(!point_in_ring(c(1.0, 1.0), &open[..1]));
    }

    #[test]
    fn polygon_centroid_is_first_ring_mean() {
        let outer = vec![
            vec![74.0, 14.0],
            vec![75.0, 14.0],
            vec![75.0, 15.0],
            vec![74.0, 15.0],
            vec![74.0, 14.0],
        ];
        let hole = vec![vec![74.2, 14.2], vec![74.3, 14.2], vec![74.3, 14.3]];
        let f = feature(Value::Polygon(vec![outer.clone(), hole]));
        let expected = centroid_of_coords(&crate::types::ring_from_positions(&outer));
        assert_eq!(centroid_of_feature(&f), expected);
        assert_eq!(expected, Some(c(74.4, 14.4)));
    }

    #[test]
    fn multipolygon_centroid_averages_parts_equally() {
        let a = vec![vec![vec![0.0, 0.0], vec![2.0, 0.0], vec![2.0, 2.0], vec![0.0, 2.0]]];
        let b = vec![vec![vec![10.0, 10.0], vec![12.0, 10.0], vec![12.0, 12.0], vec![10.0, 12.0]]];
        let empty: Vec<Vec<Vec<f64>>> = vec![];
        let f = feature(Value::MultiPolygon(vec![a, b, empty]));
        assert_eq!(centroid_of_feature(&f), Some(c(6.0, 6.0)));
    }

    #[test]
    fn centroid_of_other_geometries() {
        assert_eq!(centroid_of_feature(&feature(Value::Point(vec![77.2, 28.6]))), Some(c(77.2, 28.6)));
        assert_eq!(
            centroid_of_feature(&feature(Value::LineString(vec![vec![0.0, 0.0], vec![1.0, 1.0]]))),
            None
        );
        assert_eq!(centroid_of_feature(&feature(Value::Polygon(vec![]))), None);
        assert_eq!(centroid_of_feature(&feature(Value::MultiPolygon(vec![]))), None);
        assert_eq!(centroid_of_coords(&[]), None);
    }

    #[test]
    fn haversine_quarter_meridian() {
        let d = haversine_km(c(0.0, 0.0), c(0.0, 90.0));
        assert!((d - std::f64::consts::PI * 6371.0 / 2.0).abs() < 1e-6);
        assert_eq!(haversine_km(c(77.0, 28.0), c(77.0, 28.0)), 0.0);
    }
}
