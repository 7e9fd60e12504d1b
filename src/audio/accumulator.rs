//! Pending-buffer accumulator for the transcription worker.
//!
//! Chunks arrive in arbitrary sizes and are concatenated in arrival order.
//! When enough audio has piled up, the whole buffer is swapped out for an
//! empty one so new chunks keep accumulating while inference runs on the
//! taken samples. The worker owns the pass lifecycle; this type only decides
//! when and what to hand over.

use crate::defaults::MIN_PASS_SAMPLES;

/// Growing buffer of 16kHz mono samples awaiting transcription.
#[derive(Debug, Default)]
pub struct AudioAccumulator {
    pending: Vec<f32>,
}

impl AudioAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Never blocks, never triggers work by itself.
    pub fn push(&mut self, chunk: &[f32]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Number of samples currently pending.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// True once at least [`MIN_PASS_SAMPLES`] are pending.
    pub fn is_ready(&self) -> bool {
        self.pending.len() >= MIN_PASS_SAMPLES
    }

    /// Take the entire buffer if the threshold is met, leaving it empty.
    ///
    /// Returns `None` below the threshold. The swap is a move, so samples
    /// pushed after this call land in a fresh buffer and are never mixed
    /// into an in-flight pass.
    pub fn take_ready(&mut self) -> Option<Vec<f32>> {
        if self.is_ready() {
            Some(std::mem::take(&mut self.pending))
        } else {
            None
        }
    }

    /// Take whatever is pending regardless of threshold (finalize path).
    ///
    /// Returns `None` when nothing is buffered.
    pub fn take_remainder(&mut self) -> Option<Vec<f32>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}
