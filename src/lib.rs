//! Online map-matching of vehicle GPS trajectories onto a road network.
//!
//! A [`Matcher`](matcher::Matcher) consumes a cleaned, evenly-spaced sample
//! sequence and a [`RoadNetwork`](network::RoadNetwork), greedily committing
//! the lowest-cost candidate edge at each sample while keeping a
//! backtracking stack of the alternatives it passed over. When a committed
//! choice turns out infeasible, the matcher rewinds to the most recent
//! decision point and retries instead of restarting the trajectory from
//! scratch.
//!
//! Coordinate projection, network import from OSM/SUMO sources, trajectory
//! cleaning, and file I/O are the responsibility of the surrounding
//! application; this crate only consumes their output.

pub mod error;
pub mod geo;
pub mod matcher;
pub mod network;
pub mod record;
pub mod sample;
pub mod shape;

pub use error::{MatchError, Result};
pub use matcher::{Matcher, MatcherConfig};
pub use network::{Edge, EdgeId, Node, NodeId, RoadNetwork, RoadNetworkBuilder};
pub use record::{Decision, MatchRecord, PathStep, Route};
pub use sample::Sample;
