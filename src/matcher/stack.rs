//! The backtracking stack: a `DecisionFrame` is pushed exactly when a
//! `PathStep` is committed, and the two are always popped together — so a
//! rewind can never separate a checkpoint from the commit it belongs to.
//!
//! Each frame snapshots the matcher's position *before* the commit it
//! accompanies, not after: resuming from a frame means undoing that commit
//! and retrying with one of the alternatives that were not yet tried.

use crate::error::{MatchError, Result};
use crate::network::EdgeId;
use crate::record::PathStep;

/// A backtracking checkpoint. `remaining_candidates` holds the alternatives
/// not yet tried at `sample_index`; the `predecessor_*` fields are the
/// matcher's position immediately before the commit this frame accompanies,
/// i.e. what to resume from when retrying with one of those alternatives.
#[derive(Debug, Clone)]
pub struct DecisionFrame {
    pub sample_index: usize,
    pub remaining_candidates: Vec<(EdgeId, bool)>,
    pub predecessor_edge: Option<EdgeId>,
    pub predecessor_reversed: bool,
    pub predecessor_offset: f64,
    pub predecessor_traversal_length: f64,
}

/// The matcher's backtracking state: a decision frame and the path step it
/// accompanies are always pushed and popped as a pair.
#[derive(Debug, Default)]
pub struct BacktrackStack {
    frames: Vec<DecisionFrame>,
    path: Vec<PathStep>,
}

impl BacktrackStack {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            path: Vec::new(),
        }
    }

    /// Commit a new edge: push its path step and the checkpoint that lets a
    /// later rewind undo it.
    pub fn commit(&mut self, frame: DecisionFrame, step: PathStep) {
        self.frames.push(frame);
        self.path.push(step);
    }

    pub fn top_frame(&self) -> Option<&DecisionFrame> {
        self.frames.last()
    }

    pub fn path(&self) -> &[PathStep] {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Remove `candidate` from the top frame's remaining set (a no-op if it
    /// is not present — the caller may be discarding a candidate that
    /// belongs to a decision other than the one on top). Returns whether the
    /// top frame is now exhausted.
    pub fn discard_from_top(&mut self, candidate: (EdgeId, bool)) -> Result<bool> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| MatchError::InternalInvariant {
                detail: "discard_from_top called with empty decision stack".to_string(),
            })?;
        frame.remaining_candidates.retain(|c| *c != candidate);
        Ok(frame.remaining_candidates.is_empty())
    }

    /// Pop the top frame together with the path step it accompanies.
    pub fn pop(&mut self) -> Option<(DecisionFrame, PathStep)> {
        let frame = self.frames.pop()?;
        let step = self
            .path
            .pop()
            .expect("frame and path stacks must stay paired");
        Some((frame, step))
    }
}
