//! Road network data model: an arena of nodes and edges plus a spatial index.
//!
//! Ownership follows a single-arena model: `RoadNetwork` is the sole owner of
//! every `Node` and `Edge`; everything else refers to them by stable opaque
//! id, never by reference. This mirrors how this codebase's CSR-based graph
//! formats hold a flat node/edge store and let callers resolve ids against it
//! rather than building a pointer graph.

pub mod spatial;

use serde::Serialize;

use crate::error::{MatchError, Result};
use crate::geo::{bounding_box, BBox, Point};
use spatial::{IndexedEdge, SpatialIndex};

/// Opaque stable identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

/// Opaque stable identifier for an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EdgeId(pub u32);

/// A road network node: a planar coordinate plus the ids of edges that
/// originate or terminate there.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub coord: Point,
    pub outgoing: Vec<EdgeId>,
    pub incoming: Vec<EdgeId>,
}

/// A road network edge: a directed segment with free-flow speed, length,
/// and the polyline shape it traverses, from its source node's coordinate
/// to its target node's coordinate.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub speed_mps: f64,
    pub length_m: f64,
    pub shape: Vec<Point>,
    pub bbox: BBox,
}

/// Converts between geographic (lon, lat) and this network's planar
/// coordinate space. The real proj4/UTM machinery lives outside this crate;
/// implementors only need to be consistent with the planar coordinates
/// baked into the network's node/edge geometry.
pub trait Projection: Send + Sync {
    fn lonlat_to_xy(&self, lon: f64, lat: f64) -> (f64, f64);
    fn xy_to_lonlat(&self, x: f64, y: f64) -> (f64, f64);
}

/// A no-op projection for networks that are already expressed in the target
/// planar space (used by tests and by callers who project upstream).
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityProjection;

impl Projection for IdentityProjection {
    fn lonlat_to_xy(&self, lon: f64, lat: f64) -> (f64, f64) {
        (lon, lat)
    }
    fn xy_to_lonlat(&self, x: f64, y: f64) -> (f64, f64) {
        (x, y)
    }
}

/// The road network: an immutable arena of nodes and edges plus a spatial
/// index over edge bounding boxes.
pub struct RoadNetwork {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    spatial_index: SpatialIndex,
    projection: Box<dyn Projection>,
}

impl RoadNetwork {
    pub fn node_by_id(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0 as usize)
            .ok_or_else(|| MatchError::InternalInvariant {
                detail: format!("node id {} out of range", id.0),
            })
    }

    pub fn edge_by_id(&self, id: EdgeId) -> Result<&Edge> {
        self.edges
            .get(id.0 as usize)
            .ok_or_else(|| MatchError::InternalInvariant {
                detail: format!("edge id {} out of range", id.0),
            })
    }

    pub fn lonlat_to_xy(&self, lon: f64, lat: f64) -> (f64, f64) {
        self.projection.lonlat_to_xy(lon, lat)
    }

    pub fn xy_to_lonlat(&self, x: f64, y: f64) -> (f64, f64) {
        self.projection.xy_to_lonlat(x, y)
    }

    /// Edges whose shape passes within `r` meters of `(x, y)`, each paired
    /// with its exact perpendicular distance. Uses the spatial index for a
    /// coarse bounding-box filter, then an exact polyline distance check.
    pub fn neighboring_edges(&self, x: f64, y: f64, r: f64) -> Vec<(EdgeId, f64)> {
        let query = Point::new(x, y);
        self.spatial_index
            .candidate_edges_within_bbox(x, y, r)
            .into_iter()
            .filter_map(|edge_id| {
                let edge = &self.edges[edge_id.0 as usize];
                let (_, dist) = crate::geo::polyline_project(query, &edge.shape);
                (dist <= r).then_some((edge_id, dist))
            })
            .collect()
    }

    /// Edges leaving `node` in the directed graph's own orientation.
    pub fn outgoing(&self, node: NodeId) -> &[EdgeId] {
        &self.nodes[node.0 as usize].outgoing
    }

    /// Edges arriving at `node` in the directed graph's own orientation.
    pub fn incoming(&self, node: NodeId) -> &[EdgeId] {
        &self.nodes[node.0 as usize].incoming
    }
}

/// Incremental, validating constructor for `RoadNetwork`.
///
/// Nodes must be pushed before the edges that reference them; pushing an
/// edge with an unknown source or target node is a construction-time error,
/// not something the matcher has to account for at match time.
pub struct RoadNetworkBuilder {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    projection: Box<dyn Projection>,
}

impl RoadNetworkBuilder {
    pub fn new(projection: Box<dyn Projection>) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            projection,
        }
    }

    pub fn with_identity_projection() -> Self {
        Self::new(Box::new(IdentityProjection))
    }

    pub fn push_node(&mut self, coord: Point) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            coord,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        });
        id
    }

    /// Add a directed edge `from -> to` with the given shape (which must
    /// start at `from`'s coordinate and end at `to`'s coordinate; this is
    /// not re-validated here since upstream import guarantees it).
    pub fn push_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        speed_mps: f64,
        shape: Vec<Point>,
    ) -> Result<EdgeId> {
        self.require_node(from)?;
        self.require_node(to)?;

        let length_m = crate::geo::polyline_length(&shape);
        let bbox = bounding_box(&shape);
        let id = EdgeId(self.edges.len() as u32);

        self.edges.push(Edge {
            id,
            from,
            to,
            speed_mps,
            length_m,
            shape,
            bbox,
        });
        self.nodes[from.0 as usize].outgoing.push(id);
        self.nodes[to.0 as usize].incoming.push(id);
        Ok(id)
    }

    fn require_node(&self, id: NodeId) -> Result<()> {
        if (id.0 as usize) < self.nodes.len() {
            Ok(())
        } else {
            Err(MatchError::InternalInvariant {
                detail: format!("edge references unknown node id {}", id.0),
            })
        }
    }

    pub fn finish(self) -> RoadNetwork {
        let indexed: Vec<IndexedEdge> = self
            .edges
            .iter()
            .map(|e| IndexedEdge {
                edge_id: e.id,
                bbox: e.bbox,
            })
            .collect();
        let spatial_index = SpatialIndex::build(indexed);
        RoadNetwork {
            nodes: self.nodes,
            edges: self.edges,
            spatial_index,
            projection: self.projection,
        }
    }
}
