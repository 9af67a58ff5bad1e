use crate::geometry::point_in_polygon;
use crate::types::PolygonRings;
use geo::Coord;
use rstar::{RTree, RTreeObject, AABB};

// Wrapper for RTree indexing
struct PolygonEntry {
    state: usize,
    polygon: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for PolygonEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Bounding-box index over every state's polygons.
///
/// A point outside a ring's bounding box always has an even crossing count,
/// so the boxes only prune candidates. `locate` returns the same state a
/// sequential scan in state order would.
pub struct StateIndex {
    tree: RTree<PolygonEntry>,
}

fn outer_envelope(polygon: &PolygonRings) -> Option<AABB<[f64; 2]>> {
    let outer = polygon.first()?;
    let first = outer.first()?;
    let (mut min, mut max) = ([first.x, first.y], [first.x, first.y]);
    for c in outer {
        min = [min[0].min(c.x), min[1].min(c.y)];
        max = [max[0].max(c.x), max[1].max(c.y)];
    }
    Some(AABB::from_corners(min, max))
}

impl StateIndex {
    pub fn build<'a, I>(states: I) -> Self
    where
        I: IntoIterator<Item = &'a [PolygonRings]>,
    {
        let entries: Vec<PolygonEntry> = states
            .into_iter()
            .enumerate()
            .flat_map(|(state, polygons)| {
                polygons.iter().enumerate().filter_map(move |(polygon, rings)| {
                    outer_envelope(rings).map(|aabb| PolygonEntry { state, polygon, aabb })
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Index of the first state (in build order) with a polygon containing `point`.
    pub fn locate(&self, point: Coord<f64>, states: &[&[PolygonRings]]) -> Option<usize> {
        let envelope = AABB::from_point([point.x, point.y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|entry| point_in_polygon(point, &states[entry.state][entry.polygon]))
            .map(|entry| (entry.state, entry.polygon))
            .min()
            .map(|(state, _)| state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> PolygonRings {
        vec![vec![c(x0, y0), c(x1, y0), c(x1, y1), c(x0, y1), c(x0, y0)]]
    }

    #[test]
    fn first_state_in_order_wins_on_overlap() {
        let a = vec![square(0.0, 0.0, 10.0, 10.0)];
        let b = vec![square(5.0, 5.0, 15.0, 15.0)];
        let states: Vec<&[PolygonRings]> = vec![b.as_slice(), a.as_slice()];
        let index = StateIndex::build(states.iter().copied());
        assert_eq!(index.len(), 2);
        assert_eq!(index.locate(c(7.0, 7.0), &states), Some(0));
        assert_eq!(index.locate(c(2.0, 2.0), &states), Some(1));
        assert_eq!(index.locate(c(20.0, 20.0), &states), None);
    }

    #[test]
    fn bbox_hit_outside_concave_polygon_is_rejected() {
        // An L shape: the top-right quadrant is inside the box but outside the ring.
        let l = vec![vec![
            c(0.0, 0.0),
            c(10.0, 0.0),
            c(10.0, 5.0),
            c(5.0, 5.0),
            c(5.0, 10.0),
            c(0.0, 10.0),
        ]];
        let fallback = vec![square(6.0, 6.0, 9.0, 9.0)];
        let states: Vec<&[PolygonRings]> = vec![std::slice::from_ref(&l), fallback.as_slice()];
        let index = StateIndex::build(states.iter().copied());
        assert_eq!(index.locate(c(8.0, 8.0), &states), Some(1));
        assert_eq!(index.locate(c(2.0, 8.0), &states), Some(0));
    }

    #[test]
    fn empty_polygons_are_not_indexed() {
        let empty: Vec<PolygonRings> = vec![vec![], vec![vec![]]];
        let states: Vec<&[PolygonRings]> = vec![empty.as_slice()];
        let index = StateIndex::build(states.iter().copied());
        assert!(index.is_empty());
        assert_eq!(index.locate(c(0.0, 0.0), &states), None);
    }
}
