//! Typed error taxonomy for the map-matching library boundary.

use thiserror::Error;

/// The five error kinds the matcher and its supporting components can raise.
///
/// Unlike the `anyhow`-based error handling used at CLI/HTTP boundaries elsewhere,
/// every caller of this crate needs to distinguish these cases, so they are a typed
/// enum rather than an opaque chain.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Required columns were absent from the input sample sequence.
    #[error("input schema error: missing column(s) {missing:?}")]
    InputSchema { missing: Vec<String> },

    /// A geometric primitive was called with an offset outside its polyline.
    #[error("offset {offset} out of range for polyline of length {length}")]
    OutOfRange { offset: f64, length: f64 },

    /// The backtracking decision stack was exhausted before reaching the end
    /// of the trajectory: no consistent edge sequence exists within the
    /// configured radius and cost budget.
    #[error("trajectory unmatchable: exhausted decision stack at sample {sample_index}")]
    Unmatchable { sample_index: usize },

    /// The wall-clock budget for one `match_trajectory` call was exceeded.
    #[error("match deadline of {max_running_time_s}s exceeded")]
    Deadline { max_running_time_s: f64 },

    /// A self-check inside the matcher failed. This indicates a bug in the
    /// matcher's own bookkeeping, not a problem with the input data.
    #[error("internal invariant violated: {detail}")]
    InternalInvariant { detail: String },
}

pub type Result<T> = std::result::Result<T, MatchError>;
