//! Shape assembly: stitch a candidate edge's polyline onto its predecessor's
//! so matching math sees one continuous traversal rather than two disjoint
//! segments.

use crate::geo::Point;
use crate::network::Edge;

/// One committed or candidate edge traversal, carrying the reversal flag
/// that decides which end of the stored shape is the traversal's start.
#[derive(Debug, Clone, Copy)]
pub struct Traversal<'a> {
    pub edge: &'a Edge,
    pub reversed: bool,
}

fn oriented_shape(t: &Traversal) -> Vec<Point> {
    if t.reversed {
        let mut shape = t.edge.shape.clone();
        shape.reverse();
        shape
    } else {
        t.edge.shape.clone()
    }
}

/// Assemble the polyline representing traversal of `current`, optionally
/// preceded by `predecessor`. When the predecessor's stitching vertex does
/// not already coincide with the candidate's start, it is prepended so the
/// combined polyline is continuous.
///
/// The stitching vertex is the predecessor's *last* shape point when neither
/// traversal is reversed or both are, and its *first* shape point otherwise.
pub fn combine_shape(current: &Traversal, predecessor: Option<&Traversal>) -> Vec<Point> {
    let mut shape = oriented_shape(current);

    if let Some(pred) = predecessor {
        let pred_shape = oriented_shape(pred);
        let both_same_or_both_reversed = !(current.reversed ^ pred.reversed);
        let stitch = if both_same_or_both_reversed {
            *pred_shape.last().expect("edge shape has >= 2 points")
        } else {
            pred_shape[0]
        };

        if shape.first().copied() != Some(stitch) {
            shape.insert(0, stitch);
        }
    }

    shape
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{EdgeId, NodeId};

    fn edge(id: u32, from: u32, to: u32, shape: Vec<Point>) -> Edge {
        let bbox = crate::geo::bounding_box(&shape);
        let length_m = crate::geo::polyline_length(&shape);
        Edge {
            id: EdgeId(id),
            from: NodeId(from),
            to: NodeId(to),
            speed_mps: 10.0,
            length_m,
            shape,
            bbox,
        }
    }

    #[test]
    fn no_predecessor_returns_oriented_shape() {
        let e = edge(0, 0, 1, vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
        let t = Traversal {
            edge: &e,
            reversed: false,
        };
        let shape = combine_shape(&t, None);
        assert_eq!(shape, vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
    }

    #[test]
    fn reversed_without_predecessor_flips_shape() {
        let e = edge(0, 0, 1, vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
        let t = Traversal {
            edge: &e,
            reversed: true,
        };
        let shape = combine_shape(&t, None);
        assert_eq!(shape, vec![Point::new(10.0, 0.0), Point::new(0.0, 0.0)]);
    }

    #[test]
    fn contiguous_predecessor_is_not_duplicated() {
        let pred_e = edge(0, 0, 1, vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
        let cur_e = edge(1, 1, 2, vec![Point::new(10.0, 0.0), Point::new(10.0, 10.0)]);
        let pred = Traversal {
            edge: &pred_e,
            reversed: false,
        };
        let cur = Traversal {
            edge: &cur_e,
            reversed: false,
        };
        let shape = combine_shape(&cur, Some(&pred));
        assert_eq!(
            shape,
            vec![Point::new(10.0, 0.0), Point::new(10.0, 10.0)]
        );
    }

    #[test]
    fn gap_is_stitched_with_predecessor_last_point() {
        let pred_e = edge(0, 0, 1, vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
        let cur_e = edge(1, 2, 3, vec![Point::new(20.0, 0.0), Point::new(20.0, 10.0)]);
        let pred = Traversal {
            edge: &pred_e,
            reversed: false,
        };
        let cur = Traversal {
            edge: &cur_e,
            reversed: false,
        };
        let shape = combine_shape(&cur, Some(&pred));
        assert_eq!(shape[0], Point::new(10.0, 0.0));
        assert_eq!(shape.len(), 3);
    }

    #[test]
    fn exactly_one_reversed_uses_predecessor_first_point() {
        let pred_e = edge(0, 0, 1, vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
        let cur_e = edge(1, 2, 3, vec![Point::new(20.0, 0.0), Point::new(20.0, 10.0)]);
        let pred = Traversal {
            edge: &pred_e,
            reversed: true,
        };
        let cur = Traversal {
            edge: &cur_e,
            reversed: false,
        };
        let shape = combine_shape(&cur, Some(&pred));
        // pred is reversed, current is not: stitch = predecessor's first point.
        assert_eq!(shape[0], Point::new(0.0, 0.0));
    }
}
