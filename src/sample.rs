//! The cleaned GPS observation the matcher consumes.
//!
//! Cleaning and interpolation (outlier rejection, 1 Hz resampling, bearing
//! carry-forward while stopped) happen upstream of this crate; `Sample` is
//! the contract that collaborator guarantees, not something this crate
//! produces.

use crate::error::MatchError;

/// One evenly-spaced, cleaned GPS observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub timestamp_s: i64,
    pub speed_mps: f64,
    pub bearing_deg: f64,
    /// `0` while moving; a positive run counter while stopped.
    pub stopindex: i64,
    /// Opaque origin/kind tag carried through from the cleaning collaborator.
    pub kind: String,
}

const REQUIRED_COLUMNS: &[&str] = &["x", "y", "timestamp", "speed", "bearing"];

/// Raw, not-yet-validated sample row, as a collaborator (CSV reader, Arrow
/// reader, ...) would hand it to this crate before schema validation.
#[derive(Debug, Clone, Default)]
pub struct RawSampleRow {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub timestamp: Option<i64>,
    pub speed: Option<f64>,
    pub bearing: Option<f64>,
    pub stopindex: Option<i64>,
    pub kind: Option<String>,
}

/// Validate that every required column is present and build a `Sample`.
///
/// This is the only schema check this crate performs; it does not parse a
/// file format or validate timestamp spacing (the cleaning collaborator's
/// responsibility per the trajectory contract).
pub fn validate_row(row: &RawSampleRow) -> Result<Sample, MatchError> {
    let mut missing = Vec::new();
    if row.x.is_none() {
        missing.push("x".to_string());
    }
    if row.y.is_none() {
        missing.push("y".to_string());
    }
    if row.timestamp.is_none() {
        missing.push("timestamp".to_string());
    }
    if row.speed.is_none() {
        missing.push("speed".to_string());
    }
    if row.bearing.is_none() {
        missing.push("bearing".to_string());
    }

    if !missing.is_empty() {
        return Err(MatchError::InputSchema { missing });
    }

    Ok(Sample {
        x: row.x.unwrap(),
        y: row.y.unwrap(),
        timestamp_s: row.timestamp.unwrap(),
        speed_mps: row.speed.unwrap(),
        bearing_deg: row.bearing.unwrap(),
        stopindex: row.stopindex.unwrap_or(0),
        kind: row.kind.clone().unwrap_or_default(),
    })
}

/// The column names `validate_row` requires; exposed so callers building
/// their own tabular reader can check a header row up front.
pub fn required_columns() -> &'static [&'static str] {
    REQUIRED_COLUMNS
}
