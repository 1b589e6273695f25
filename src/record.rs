//! Matcher outputs: per-sample match records, the committed path, and the
//! route aggregation derived from consecutive records.

use serde::Serialize;

use crate::error::Result;
use crate::network::{EdgeId, RoadNetwork};

/// The classification of a transition at a given sample, recorded for
/// observability and testing rather than consumed downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    Stay,
    Change,
    NoDecision,
}

/// One committed edge traversal in the matcher's output path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathStep {
    pub edge: EdgeId,
    pub reversed: bool,
    /// Length of the assembled shape used when this edge was entered,
    /// including any stitch to its predecessor.
    pub traversal_length: f64,
}

/// One row of matcher output, one per input sample.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRecord {
    pub sample_index: usize,
    pub timestamp_s: i64,
    pub matched_x: f64,
    pub matched_y: f64,
    pub chosen_edge: EdgeId,
    pub edge_reversed: bool,
    pub offset: f64,
    pub traversal_length: f64,
    pub predecessor_edge: Option<EdgeId>,
    pub predecessor_reversed: Option<bool>,
    pub matched_bearing: f64,
    pub bearing_error: f64,
    pub perpendicular_error: f64,
    pub air_distance_error: f64,
    pub road_distance_error: f64,
    pub predicted_distance: f64,
    pub matched_road_distance: f64,
    pub decision: Decision,
    pub speed_mps: f64,
    pub stopindex: i64,
    pub kind: String,
    pub original_x: f64,
    pub original_y: f64,
}

/// Aggregated route segment: a run of consecutive `MatchRecord`s sharing the
/// same `(predecessor_edge, edge, edge_reversed, predecessor_reversed)` key.
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub edge: EdgeId,
    pub edge_reversed: bool,
    pub predecessor_edge: Option<EdgeId>,
    pub predecessor_reversed: Option<bool>,
    pub departure_s: i64,
    pub arrival_s: i64,
    pub travel_time_s: i64,
    pub stop_time_s: i64,
    pub shape: Vec<(f64, f64)>,
}

/// Group consecutive match records sharing the same edge/predecessor/
/// reversal key into `Route`s, as `save_routematch`'s groupby does upstream.
///
/// `shape` is the traversed edge's own geometry (oriented by `edge_reversed`)
/// converted to geographic coordinates via `network`, matching
/// `getGeoShape`'s output upstream — not the per-sample matched points,
/// which stay in planar space on `MatchRecord`.
pub fn aggregate_routes(records: &[MatchRecord], network: &RoadNetwork) -> Result<Vec<Route>> {
    let mut routes = Vec::new();
    let mut i = 0;

    while i < records.len() {
        let key = (
            records[i].chosen_edge,
            records[i].edge_reversed,
            records[i].predecessor_edge,
            records[i].predecessor_reversed,
        );
        let mut j = i;
        while j < records.len()
            && (
                records[j].chosen_edge,
                records[j].edge_reversed,
                records[j].predecessor_edge,
                records[j].predecessor_reversed,
            ) == key
        {
            j += 1;
        }

        let group = &records[i..j];
        let departure_s = group.first().unwrap().timestamp_s;
        let arrival_s = group.last().unwrap().timestamp_s;
        let stop_time_s = group.iter().filter(|r| r.speed_mps == 0.0).count() as i64;

        let edge = network.edge_by_id(key.0)?;
        let shape: Vec<(f64, f64)> = if key.1 {
            edge.shape
                .iter()
                .rev()
                .map(|p| network.xy_to_lonlat(p.x, p.y))
                .collect()
        } else {
            edge.shape
                .iter()
                .map(|p| network.xy_to_lonlat(p.x, p.y))
                .collect()
        };

        routes.push(Route {
            edge: key.0,
            edge_reversed: key.1,
            predecessor_edge: key.2,
            predecessor_reversed: key.3,
            departure_s,
            arrival_s,
            travel_time_s: arrival_s - departure_s,
            stop_time_s,
            shape,
        });

        i = j;
    }

    Ok(routes)
}
