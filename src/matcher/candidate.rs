//! Candidate enumeration and scoring: the two halves of one matcher step.
//!
//! Enumeration produces the set of `(edge, reversed)` pairs worth trying at
//! a sample, following the apparent-undirected successor rule. Scoring
//! assigns each candidate a cost so the matcher can pick the best one and,
//! on `REWIND`, retry the remainder in a deterministic order.

use std::collections::HashSet;

use crate::error::Result;
use crate::geo::{self, Point};
use crate::matcher::config::MatcherConfig;
use crate::network::{EdgeId, NodeId, RoadNetwork};
use crate::record::Decision;
use crate::shape::{combine_shape, Traversal};

/// The node successor enumeration pivots on: the edge's target when
/// traversed forward, its source when traversed reversed.
pub fn pivot_node(network: &RoadNetwork, edge: EdgeId, reversed: bool) -> Result<NodeId> {
    let e = network.edge_by_id(edge)?;
    Ok(if reversed { e.from } else { e.to })
}

/// All edges reachable from `pivot` under the apparent-undirected view:
/// edges leaving `pivot` in their own direction, plus (when
/// `map_one_way_fix` is set) edges arriving at `pivot` traversed backward.
pub fn successors(
    network: &RoadNetwork,
    pivot: NodeId,
    config: &MatcherConfig,
) -> Vec<(EdgeId, bool)> {
    let mut out: Vec<(EdgeId, bool)> = network
        .outgoing(pivot)
        .iter()
        .map(|&e| (e, false))
        .collect();
    if config.map_one_way_fix {
        out.extend(network.incoming(pivot).iter().map(|&e| (e, true)));
    }
    out.sort_by_key(|(e, _)| e.0);
    out
}

/// Build the CHANGE candidate set: successors of `last_edge`, filtered by
/// the u-turn and loop policy.
pub fn change_candidates(
    network: &RoadNetwork,
    config: &MatcherConfig,
    last_edge: EdgeId,
    last_reversed: bool,
    visited: &HashSet<EdgeId>,
) -> Result<Vec<(EdgeId, bool)>> {
    let pivot = pivot_node(network, last_edge, last_reversed)?;
    let mut candidates = successors(network, pivot, config);

    if !config.u_turn_on_oneway {
        candidates.retain(|(e, _)| *e != last_edge);
    }
    if !config.loop_allowed {
        candidates.retain(|(e, _)| !visited.contains(e));
    }

    Ok(candidates)
}

/// Build the NODECISION candidate set: CHANGE successors plus the current
/// edge itself (STAY remains an option too).
pub fn nodecision_candidates(
    network: &RoadNetwork,
    config: &MatcherConfig,
    last_edge: EdgeId,
    last_reversed: bool,
    visited: &HashSet<EdgeId>,
) -> Result<Vec<(EdgeId, bool)>> {
    let mut candidates = change_candidates(network, config, last_edge, last_reversed, visited)?;
    if !candidates.iter().any(|(e, r)| *e == last_edge && *r == last_reversed) {
        candidates.push((last_edge, last_reversed));
    }
    candidates.sort_by_key(|(e, _)| e.0);
    Ok(candidates)
}

/// Classify the transition at the next sample given the remaining distance
/// on the current edge and the observed/free-flow speeds.
pub fn classify_transition(
    remaining_m: f64,
    observed_speed_mps: f64,
    edge_speed_mps: f64,
    config: &MatcherConfig,
    dt_s: f64,
) -> Decision {
    if remaining_m < observed_speed_mps * dt_s - config.diff_gps_error_m {
        Decision::Change
    } else if remaining_m >= edge_speed_mps * dt_s + config.diff_gps_error_m {
        Decision::Stay
    } else {
        Decision::NoDecision
    }
}

/// Everything the scorer needs to know about the previously committed match,
/// or `None` on the very first sample.
pub struct PrevState {
    pub sample_xy: Point,
    pub foot: Point,
    pub last_edge: Option<EdgeId>,
    pub last_edge_reversed: bool,
    pub last_offset: f64,
    pub last_traversal_length: f64,
}

/// The outcome of scoring one candidate edge against one sample.
pub struct ScoredCandidate {
    pub edge: EdgeId,
    pub reversed: bool,
    pub cost: f64,
    pub offset: f64,
    pub traversal_length: f64,
    pub foot: Point,
    pub matched_bearing: f64,
    pub bearing_error: f64,
    pub perpendicular_error: f64,
    pub air_distance_error: f64,
    pub predicted_distance: f64,
    pub matched_road_distance: f64,
    pub road_distance_error: f64,
}

const REVERSAL_PENALTY: f64 = 100_000.0;
const BEARING_WEIGHT: f64 = 1.0;
const PERP_WEIGHT: f64 = 30.0;
const AIR_WEIGHT: f64 = 10.0;
const ROAD_WEIGHT: f64 = 5.0;

/// Score one `(edge, reversed)` candidate for `sample`, given its optional
/// predecessor traversal and the previously committed match state.
pub fn score_candidate(
    network: &RoadNetwork,
    edge_id: EdgeId,
    reversed: bool,
    predecessor: Option<(EdgeId, bool)>,
    sample_xy: Point,
    sample_bearing: f64,
    sample_speed: f64,
    dt_s: f64,
    prev: Option<&PrevState>,
) -> Result<ScoredCandidate> {
    let edge = network.edge_by_id(edge_id)?;
    let current = Traversal { edge, reversed };

    let pred_edge;
    let pred_traversal = match predecessor {
        Some((pid, prev_rev)) => {
            pred_edge = network.edge_by_id(pid)?;
            Some(Traversal {
                edge: pred_edge,
                reversed: prev_rev,
            })
        }
        None => None,
    };

    let polyline = combine_shape(&current, pred_traversal.as_ref());
    let traversal_length = geo::polyline_length(&polyline);
    let (offset, foot) = geo::polyline_project(sample_xy, &polyline);
    let perpendicular_error = geo::distance(foot, sample_xy);
    let matched_bearing = geo::bearing_at_offset(&polyline, offset)?;
    let bearing_error = geo::circular_bearing_diff(sample_bearing, matched_bearing);

    let predicted_distance = sample_speed * dt_s;

    let (air_distance_error, matched_road_distance, road_distance_error) = match prev {
        None => (0.0, 0.0, 0.0),
        Some(p) => {
            let air = (geo::distance(p.sample_xy, sample_xy) - geo::distance(p.foot, foot)).abs();
            let matched_road = match p.last_edge {
                Some(last) if last == edge_id => (offset - p.last_offset).max(0.0),
                _ => (p.last_traversal_length - p.last_offset) + offset,
            };
            let rd = (matched_road - predicted_distance).abs();
            (air, matched_road, rd)
        }
    };

    let cost = if reversed { REVERSAL_PENALTY } else { 0.0 }
        + BEARING_WEIGHT * bearing_error
        + PERP_WEIGHT * perpendicular_error
        + AIR_WEIGHT * air_distance_error
        + ROAD_WEIGHT * road_distance_error;

    Ok(ScoredCandidate {
        edge: edge_id,
        reversed,
        cost,
        offset,
        traversal_length,
        foot,
        matched_bearing,
        bearing_error,
        perpendicular_error,
        air_distance_error,
        predicted_distance,
        matched_road_distance,
        road_distance_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::RoadNetworkBuilder;

    fn straight_network() -> RoadNetwork {
        let mut b = RoadNetworkBuilder::with_identity_projection();
        let n0 = b.push_node(Point::new(0.0, 0.0));
        let n1 = b.push_node(Point::new(1000.0, 0.0));
        b.push_edge(n0, n1, 20.0, vec![Point::new(0.0, 0.0), Point::new(1000.0, 0.0)])
            .unwrap();
        b.finish()
    }

    #[test]
    fn classify_transition_stay_when_far_from_end() {
        let cfg = MatcherConfig::default();
        let decision = classify_transition(500.0, 10.0, 20.0, &cfg, 1.0);
        assert_eq!(decision, Decision::Stay);
    }

    #[test]
    fn classify_transition_change_when_past_end() {
        let cfg = MatcherConfig::default();
        let decision = classify_transition(2.0, 10.0, 20.0, &cfg, 1.0);
        assert_eq!(decision, Decision::Change);
    }

    #[test]
    fn reversed_candidate_incurs_penalty() {
        let net = straight_network();
        let forward = score_candidate(
            &net,
            EdgeId(0),
            false,
            None,
            Point::new(500.0, 0.0),
            90.0,
            10.0,
            1.0,
            None,
        )
        .unwrap();
        let reversed = score_candidate(
            &net,
            EdgeId(0),
            true,
            None,
            Point::new(500.0, 0.0),
            90.0,
            10.0,
            1.0,
            None,
        )
        .unwrap();
        assert!(reversed.cost - forward.cost >= REVERSAL_PENALTY - 1.0);
    }

    #[test]
    fn loop_disallowed_excludes_visited_edge() {
        let mut b = RoadNetworkBuilder::with_identity_projection();
        let n0 = b.push_node(Point::new(0.0, 0.0));
        let n1 = b.push_node(Point::new(100.0, 0.0));
        let n2 = b.push_node(Point::new(100.0, 100.0));
        let e0 = b
            .push_edge(n0, n1, 20.0, vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)])
            .unwrap();
        let e1 = b
            .push_edge(
                n1,
                n2,
                20.0,
                vec![Point::new(100.0, 0.0), Point::new(100.0, 100.0)],
            )
            .unwrap();
        let net = b.finish();
        let cfg = MatcherConfig::default().with_loop_allowed(false);

        let mut visited = HashSet::new();
        visited.insert(e1);
        // Pivoting from e0 towards n1: e1 is a legal successor but already
        // visited, so with LOOP disabled it must be excluded.
        let candidates = change_candidates(&net, &cfg, e0, false, &visited).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn change_candidates_exclude_last_edge_by_default() {
        let mut b = RoadNetworkBuilder::with_identity_projection();
        let n0 = b.push_node(Point::new(0.0, 0.0));
        let n1 = b.push_node(Point::new(500.0, 0.0));
        let n2 = b.push_node(Point::new(500.0, 500.0));
        b.push_edge(n0, n1, 20.0, vec![Point::new(0.0, 0.0), Point::new(500.0, 0.0)])
            .unwrap();
        b.push_edge(
            n1,
            n2,
            20.0,
            vec![Point::new(500.0, 0.0), Point::new(500.0, 500.0)],
        )
        .unwrap();
        let net = b.finish();
        let cfg = MatcherConfig::default();
        let visited = HashSet::new();
        let candidates = change_candidates(&net, &cfg, EdgeId(0), false, &visited).unwrap();
        assert_eq!(candidates, vec![(EdgeId(1), false)]);
    }
}
