//! Greedy top-K selection without replacement.
//!
//! The selector owns a scratch copy of one similarity row. Each step scans
//! for the highest score not yet taken (lowest index wins ties), emits it,
//! and masks that row out. Cached corpus data is never touched.
//!
//! ```text
//! Ready --next()--> Selecting --next()--> ... --> Done
//! ```

use crate::error::{RecommendError, Result};
use log::trace;

/// Lifecycle of a [`GreedySelector`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    Ready,
    Selecting,
    Done,
}

/// One selected corpus row and the score it was selected with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub index: usize,
    pub score: f64,
}

/// Iterator over corpus rows in descending score order
#[derive(Debug, Clone)]
pub struct GreedySelector {
    scores: Vec<f64>,
    taken: Vec<bool>,
    remaining: usize,
    state: SelectorState,
}

impl GreedySelector {
    #[must_use]
    pub fn new(scores: Vec<f64>) -> Self {
        let len = scores.len();
        Self {
            scores,
            taken: vec![false; len],
            remaining: len,
            state: SelectorState::Ready,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SelectorState {
        self.state
    }

    /// Rows not yet selected
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.remaining
    }

    /// Stable max-scan over untaken rows. NaN never beats a real score.
    fn best_remaining(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (index, &score) in self.scores.iter().enumerate() {
            if self.taken[index] {
                continue;
            }
            let better = match best {
                None => true,
                Some(b) => {
                    let current = self.scores[b];
                    score > current || (current.is_nan() && !score.is_nan())
                }
            };
            if better {
                best = Some(index);
            }
        }
        best
    }

    /// Take exactly `k` rows.
    ///
    /// Callers are expected to have checked the corpus size up front; running
    /// out of rows here still fails cleanly instead of returning a short list.
    ///
    /// # Errors
    ///
    /// [`RecommendError::InsufficientCorpus`] if fewer than `k` rows remain.
    pub fn select(mut self, k: usize) -> Result<Vec<Selection>> {
        if k > self.remaining {
            return Err(RecommendError::InsufficientCorpus {
                required: k,
                available: self.remaining,
            });
        }

        let picked: Vec<Selection> = self.by_ref().take(k).collect();
        self.state = SelectorState::Done;
        Ok(picked)
    }
}

impl Iterator for GreedySelector {
    type Item = Selection;

    fn next(&mut self) -> Option<Selection> {
        if self.state == SelectorState::Done {
            return None;
        }

        let Some(index) = self.best_remaining() else {
            self.state = SelectorState::Done;
            return None;
        };

        self.taken[index] = true;
        self.remaining -= 1;
        self.state = SelectorState::Selecting;

        let score = self.scores[index];
        trace!("Selected corpus row {index} (score {score:.4}), {} left", self.remaining);
        Some(Selection { index, score })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.state {
            SelectorState::Done => (0, Some(0)),
            _ => (self.remaining, Some(self.remaining)),
        }
    }
}

/// Select the `k` best rows of a similarity row, best first.
///
/// # Errors
///
/// [`RecommendError::InsufficientCorpus`] if `scores` has fewer than `k` entries.
pub fn select_top_k(scores: Vec<f64>, k: usize) -> Result<Vec<Selection>> {
    GreedySelector::new(scores).select(k)
}
