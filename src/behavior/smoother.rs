// src/behavior/smoother.rs

use super::classifier::BehaviorLabel;
use std::collections::VecDeque;

/// Majority-vote hysteresis over the last `window_size` candidate labels of
/// one identity.
///
/// A label replaces the output only once it holds `threshold` votes in the
/// window. Until the window holds `threshold` entries the raw candidate is
/// passed through so a new identity is labelled from its first frame.
pub struct BehaviorSmoother {
    history: VecDeque<BehaviorLabel>,
    window_size: usize,
    threshold: usize,
}

impl BehaviorSmoother {
    pub fn new(window_size: usize, threshold: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            history: VecDeque::with_capacity(window_size),
            window_size,
            threshold,
        }
    }

    pub fn smooth(&mut self, candidate: BehaviorLabel) -> BehaviorLabel {
        self.history.push_back(candidate);
        if self.history.len() > self.window_size {
            self.history.pop_front();
        }

        let (majority, votes) = match self.majority() {
            Some(m) => m,
            None => return candidate,
        };

        if votes >= self.threshold {
            majority
        } else if self.history.len() < self.threshold {
            candidate
        } else {
            // Window is split with no label at threshold: plurality still wins
            majority
        }
    }

    /// Most frequent label and its count. Ties go to the label seen first
    /// (oldest) in the window.
    pub fn majority(&self) -> Option<(BehaviorLabel, usize)> {
        let mut counts: Vec<(BehaviorLabel, usize)> = Vec::with_capacity(4);
        for label in &self.history {
            match counts.iter_mut().find(|(l, _)| l == label) {
                Some((_, n)) => *n += 1,
                None => counts.push((*label, 1)),
            }
        }

        let mut best: Option<(BehaviorLabel, usize)> = None;
        for (label, n) in counts {
            if best.map_or(true, |(_, best_n)| n > best_n) {
                best = Some((label, n));
            }
        }
        best
    }

    pub fn history(&self) -> impl Iterator<Item = &BehaviorLabel> {
        self.history.iter()
    }

    pub fn history_size(&self) -> usize {
        self.history.len()
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}
