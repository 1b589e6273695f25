//! Spatial index over edge bounding boxes, used to answer radius queries
//! centered on a planar point.
//!
//! Grounded in the snapping index used elsewhere in this codebase (an
//! `rstar::RTree` over point geometry); here the indexed geometry is each
//! edge's bounding box rather than a single point, since candidate lookup
//! needs to find edges whose *polyline* passes near a query point, not just
//! edges whose endpoint does.

use rstar::{RTreeObject, AABB};

use crate::geo::BBox;
use crate::network::EdgeId;

/// One entry in the spatial index: an edge's id plus its bounding box.
#[derive(Debug, Clone, Copy)]
pub struct IndexedEdge {
    pub edge_id: EdgeId,
    pub bbox: BBox,
}

impl RTreeObject for IndexedEdge {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min_x, self.bbox.min_y],
            [self.bbox.max_x, self.bbox.max_y],
        )
    }
}

/// RTree-backed index over edge bounding boxes.
pub struct SpatialIndex {
    tree: rstar::RTree<IndexedEdge>,
}

impl SpatialIndex {
    /// Build an index over the given edges. `bulk_load` is preferred over
    /// repeated `insert` for the static, import-time construction this index
    /// is used for.
    pub fn build(entries: Vec<IndexedEdge>) -> Self {
        Self {
            tree: rstar::RTree::bulk_load(entries),
        }
    }

    /// Return the ids of all edges whose bounding box, expanded by `r`,
    /// intersects a box of radius `r` centered on `(x, y)`. This is a
    /// coarse bounding-box filter; callers must still apply the exact
    /// polyline distance check.
    pub fn candidate_edges_within_bbox(&self, x: f64, y: f64, r: f64) -> Vec<EdgeId> {
        let query = AABB::from_corners([x - r, y - r], [x + r, y + r]);
        self.tree
            .locate_in_envelope_intersecting(&query)
            .map(|entry| entry.edge_id)
            .collect()
    }
}
