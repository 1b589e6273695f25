//! The map-matching state machine: `INITIAL` → `ADVANCING` ⇄ `REWIND` →
//! `DONE`/`FAIL`.
//!
//! The matcher greedily commits the lowest-cost candidate at each sample
//! and keeps a backtracking stack of the alternatives it didn't take. When
//! a committed choice turns out to lead nowhere (the next sample is too far
//! from every continuation), it rewinds to the most recent choice point and
//! tries the next-best alternative instead of restarting from scratch.

pub mod candidate;
pub mod config;
pub mod stack;

use std::collections::HashSet;
use std::time::Instant;

pub use config::MatcherConfig;

use crate::error::{MatchError, Result};
use crate::geo::Point;
use crate::network::{EdgeId, RoadNetwork};
use crate::record::{aggregate_routes, Decision, MatchRecord, PathStep, Route};
use crate::sample::Sample;
use stack::{BacktrackStack, DecisionFrame};

/// The full output of matching one trajectory.
#[derive(Debug, Clone)]
pub struct MatchOutput {
    pub records: Vec<MatchRecord>,
    pub path: Vec<PathStep>,
    pub routes: Vec<Route>,
}

impl MatchOutput {
    fn empty() -> Self {
        Self {
            records: Vec::new(),
            path: Vec::new(),
            routes: Vec::new(),
        }
    }
}

/// The matcher's current position: the edge it last committed to, its
/// reversal flag, the offset reached along that edge's combined shape, and
/// that shape's total length.
#[derive(Debug, Clone, Copy)]
struct Position {
    edge: Option<EdgeId>,
    reversed: bool,
    offset: f64,
    traversal_length: f64,
}

impl Position {
    fn start() -> Self {
        Self {
            edge: None,
            reversed: false,
            offset: 0.0,
            traversal_length: 0.0,
        }
    }
}

/// Map-matches GPS trajectories onto a `RoadNetwork`. Borrows the network
/// read-only for the duration of each `match_trajectory` call; holds no
/// state of its own between calls.
pub struct Matcher<'a> {
    network: &'a RoadNetwork,
    config: MatcherConfig,
}

impl<'a> Matcher<'a> {
    pub fn new(network: &'a RoadNetwork, config: MatcherConfig) -> Self {
        Self { network, config }
    }

    /// Match a time-ordered, evenly-spaced sample sequence onto the road
    /// network. Returns `Unmatchable`/`Deadline`/`InternalInvariant` on
    /// failure; the caller's prior output is not preserved (a failed match
    /// produces no partial result).
    pub fn match_trajectory(&self, samples: &[Sample]) -> Result<MatchOutput> {
        if samples.is_empty() {
            return Ok(MatchOutput::empty());
        }

        let started = Instant::now();
        let mut stack = BacktrackStack::new();
        let mut records: Vec<MatchRecord> = Vec::new();
        let mut visited: HashSet<EdgeId> = HashSet::new();
        let mut pos = Position::start();
        let mut i = 0usize;
        // Set immediately after a REWIND: the surviving alternatives from the
        // decision point we resumed at, to be tried in place of a fresh
        // `enumerate()` (which would just rediscover the candidate we're
        // backing away from).
        let mut pending_candidates: Option<Vec<(EdgeId, bool)>> = None;

        tracing::info!(samples = samples.len(), "map match: INITIAL");

        loop {
            if started.elapsed().as_secs_f64() > self.config.max_running_time_s {
                tracing::warn!(
                    elapsed_s = started.elapsed().as_secs_f64(),
                    "map match: FAIL (deadline exceeded)"
                );
                return Err(MatchError::Deadline {
                    max_running_time_s: self.config.max_running_time_s,
                });
            }

            if i >= samples.len() {
                tracing::info!(path_len = stack.path().len(), "map match: DONE");
                break;
            }

            let (candidates, decision) = match pending_candidates.take() {
                Some(remaining) => (remaining, Decision::Change),
                None => self.enumerate(&pos, &samples[i], &visited)?,
            };

            if candidates.is_empty() {
                match self.rewind(&mut stack, &mut records, None)? {
                    Some((next_i, next_pos, remaining)) => {
                        tracing::debug!(from = i, to = next_i, "map match: REWIND");
                        i = next_i;
                        pos = next_pos;
                        pending_candidates = Some(remaining);
                        visited = stack.path().iter().map(|s| s.edge).collect();
                        continue;
                    }
                    None => {
                        tracing::warn!(sample_index = i, "map match: FAIL (unmatchable)");
                        return Err(MatchError::Unmatchable { sample_index: i });
                    }
                }
            }

            let best = self.score_all(&stack, &pos, &records, &samples[i], &candidates)?;

            if best.perpendicular_error > self.config.search_radius_m() {
                match self.rewind(&mut stack, &mut records, Some((best.edge, best.reversed)))? {
                    Some((next_i, next_pos, remaining)) => {
                        tracing::debug!(from = i, to = next_i, "map match: REWIND");
                        i = next_i;
                        pos = next_pos;
                        pending_candidates = Some(remaining);
                        visited = stack.path().iter().map(|s| s.edge).collect();
                        continue;
                    }
                    None => {
                        tracing::warn!(sample_index = i, "map match: FAIL (unmatchable)");
                        return Err(MatchError::Unmatchable { sample_index: i });
                    }
                }
            }

            let is_new_edge = pos.edge != Some(best.edge) || pos.reversed != best.reversed;
            let sample = &samples[i];
            // Same predecessor the scorer used for `best`: `path[-2]` while
            // staying on an edge, the edge just left on a change. Constant
            // across an entire run so the route aggregation in record.rs
            // doesn't split one traversal into multiple groups.
            let predecessor = self.predecessor_for(&stack, &pos, best.edge, best.reversed);

            records.push(MatchRecord {
                sample_index: i,
                timestamp_s: sample.timestamp_s,
                matched_x: best.foot.x,
                matched_y: best.foot.y,
                chosen_edge: best.edge,
                edge_reversed: best.reversed,
                offset: best.offset,
                traversal_length: best.traversal_length,
                predecessor_edge: predecessor.map(|(e, _)| e),
                predecessor_reversed: predecessor.map(|(_, r)| r),
                matched_bearing: best.matched_bearing,
                bearing_error: best.bearing_error,
                perpendicular_error: best.perpendicular_error,
                air_distance_error: best.air_distance_error,
                road_distance_error: best.road_distance_error,
                predicted_distance: best.predicted_distance,
                matched_road_distance: best.matched_road_distance,
                decision,
                speed_mps: sample.speed_mps,
                stopindex: sample.stopindex,
                kind: sample.kind.clone(),
                original_x: sample.x,
                original_y: sample.y,
            });

            if is_new_edge {
                let remaining: Vec<(EdgeId, bool)> = candidates
                    .into_iter()
                    .filter(|c| *c != (best.edge, best.reversed))
                    .collect();
                stack.commit(
                    DecisionFrame {
                        sample_index: i,
                        remaining_candidates: remaining,
                        predecessor_edge: pos.edge,
                        predecessor_reversed: pos.reversed,
                        predecessor_offset: pos.offset,
                        predecessor_traversal_length: pos.traversal_length,
                    },
                    PathStep {
                        edge: best.edge,
                        reversed: best.reversed,
                        traversal_length: best.traversal_length,
                    },
                );
                visited.insert(best.edge);
            }

            pos = Position {
                edge: Some(best.edge),
                reversed: best.reversed,
                offset: best.offset,
                traversal_length: best.traversal_length,
            };
            i += 1;
        }

        let routes = aggregate_routes(&records, self.network)?;
        let path = stack.path().to_vec();
        Ok(MatchOutput {
            records,
            path,
            routes,
        })
    }

    /// Enumerate the candidate set and transition classification for the
    /// sample at the matcher's current position.
    fn enumerate(
        &self,
        pos: &Position,
        sample: &Sample,
        visited: &HashSet<EdgeId>,
    ) -> Result<(Vec<(EdgeId, bool)>, Decision)> {
        match pos.edge {
            None => {
                let mut candidates: Vec<(EdgeId, bool)> = self
                    .network
                    .neighboring_edges(sample.x, sample.y, self.config.search_radius_m())
                    .into_iter()
                    .map(|(e, _)| (e, false))
                    .collect();
                candidates.sort_by_key(|(e, _)| e.0);
                Ok((candidates, Decision::Change))
            }
            Some(edge) => {
                let edge_speed = self.network.edge_by_id(edge)?.speed_mps;
                let remaining = pos.traversal_length - pos.offset;
                let kind = candidate::classify_transition(
                    remaining,
                    sample.speed_mps,
                    edge_speed,
                    &self.config,
                    1.0,
                );
                let candidates = match kind {
                    Decision::Stay => vec![(edge, pos.reversed)],
                    Decision::Change => candidate::change_candidates(
                        self.network,
                        &self.config,
                        edge,
                        pos.reversed,
                        visited,
                    )?,
                    Decision::NoDecision => candidate::nodecision_candidates(
                        self.network,
                        &self.config,
                        edge,
                        pos.reversed,
                        visited,
                    )?,
                };
                Ok((candidates, kind))
            }
        }
    }

    /// Score every candidate and return the lowest-cost one. Candidates are
    /// iterated in the (id-sorted) order they were enumerated, so ties
    /// resolve to the lowest edge id deterministically.
    fn score_all(
        &self,
        stack: &BacktrackStack,
        pos: &Position,
        records: &[MatchRecord],
        sample: &Sample,
        candidates: &[(EdgeId, bool)],
    ) -> Result<candidate::ScoredCandidate> {
        let sample_xy = Point::new(sample.x, sample.y);
        let prev_state = records.last().map(|r| candidate::PrevState {
            sample_xy: Point::new(r.original_x, r.original_y),
            foot: Point::new(r.matched_x, r.matched_y),
            last_edge: Some(r.chosen_edge),
            last_edge_reversed: r.edge_reversed,
            last_offset: r.offset,
            last_traversal_length: r.traversal_length,
        });

        let mut best: Option<candidate::ScoredCandidate> = None;
        for &(edge, reversed) in candidates {
            let predecessor = self.predecessor_for(stack, pos, edge, reversed);
            let scored = candidate::score_candidate(
                self.network,
                edge,
                reversed,
                predecessor,
                sample_xy,
                sample.bearing_deg,
                sample.speed_mps,
                1.0,
                prev_state.as_ref(),
            )?;
            match &best {
                Some(b) if b.cost <= scored.cost => {}
                _ => best = Some(scored),
            }
        }
        best.ok_or_else(|| MatchError::InternalInvariant {
            detail: "score_all called with no candidates".to_string(),
        })
    }

    /// The edge that precedes `candidate` for shape-stitching purposes: the
    /// edge before the current position when the candidate continues the
    /// current edge (so offsets stay continuous across a run on one edge),
    /// or the current edge itself when the candidate changes edges.
    fn predecessor_for(
        &self,
        stack: &BacktrackStack,
        pos: &Position,
        candidate_edge: EdgeId,
        candidate_reversed: bool,
    ) -> Option<(EdgeId, bool)> {
        let is_continuation =
            pos.edge == Some(candidate_edge) && pos.reversed == candidate_reversed;
        if is_continuation {
            let path = stack.path();
            path.len()
                .checked_sub(2)
                .and_then(|idx| path.get(idx))
                .map(|s| (s.edge, s.reversed))
        } else {
            pos.edge.map(|e| (e, pos.reversed))
        }
    }

    /// Undo commits from the top of the backtracking stack until one is
    /// found whose decision point still has untried alternatives, and
    /// report the position to resume from plus those alternatives. `failed`
    /// is the candidate that just proved infeasible at the current sample,
    /// if any (there is none when enumeration itself produced no
    /// candidates at all). Returns `None` once the stack is exhausted.
    ///
    /// Every examined frame is popped together with the `PathStep` it
    /// accompanies: a frame still holding alternatives is always being
    /// retried, which means its original commit must be undone first.
    fn rewind(
        &self,
        stack: &mut BacktrackStack,
        records: &mut Vec<MatchRecord>,
        failed: Option<(EdgeId, bool)>,
    ) -> Result<Option<(usize, Position, Vec<(EdgeId, bool)>)>> {
        if stack.is_empty() {
            return Ok(None);
        }
        if let Some(candidate) = failed {
            stack.discard_from_top(candidate)?;
        }

        loop {
            let remaining = stack
                .top_frame()
                .expect("checked non-empty above")
                .remaining_candidates
                .clone();
            let (frame, _step) = stack.pop().expect("checked non-empty above");

            if !remaining.is_empty() {
                let resume_pos = Position {
                    edge: frame.predecessor_edge,
                    reversed: frame.predecessor_reversed,
                    offset: frame.predecessor_offset,
                    traversal_length: frame.predecessor_traversal_length,
                };
                records.retain(|r| r.sample_index < frame.sample_index);
                return Ok(Some((frame.sample_index, resume_pos, remaining)));
            }

            if stack.is_empty() {
                return Ok(None);
            }
        }
    }
}
