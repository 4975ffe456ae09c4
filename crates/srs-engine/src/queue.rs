//! The answer loop shared by daily practice and range drills: words
//! are presented front-to-back, a miss requeues the word at the back,
//! and every showing counts one attempt.

use crate::models::{VocabEntry, VocabId};
use std::collections::{BTreeMap, VecDeque};

/// Outcome of a single answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The reply matched; the word leaves the queue.
    Correct { entry: VocabEntry },
    /// The reply did not match; the word was requeued at the back.
    Incorrect { entry: VocabEntry },
}

/// FIFO queue of words awaiting a correct answer.
///
/// The only ordering contract is FIFO-with-requeue-to-back; no other
/// reordering happens mid-session.
#[derive(Debug, Clone)]
pub struct ReviewQueue {
    pending: VecDeque<VocabEntry>,
    attempts: BTreeMap<VocabId, u32>,
    last_requeued: Option<VocabId>,
}

impl ReviewQueue {
    /// Build a queue over the given words, in the given order.
    pub fn new(entries: Vec<VocabEntry>) -> Self {
        let attempts = entries.iter().map(|e| (e.vocab_id, 0)).collect();
        Self {
            pending: entries.into(),
            attempts,
            last_requeued: None,
        }
    }

    /// The word currently awaiting an answer.
    pub fn current(&self) -> Option<&VocabEntry> {
        self.pending.front()
    }

    /// Words still awaiting a correct answer, counting requeues once.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_done(&self) -> bool {
        self.pending.is_empty()
    }

    /// Tries recorded so far, per word.
    pub fn attempts(&self) -> &BTreeMap<VocabId, u32> {
        &self.attempts
    }

    /// Process a reply for the head word. Returns None when the queue
    /// is already empty (a stray answer is a no-op, not an error).
    pub fn answer(&mut self, reply: &str) -> Option<Verdict> {
        let entry = self.pending.pop_front()?;
        *self.attempts.entry(entry.vocab_id).or_insert(0) += 1;

        if entry.matches(reply) {
            self.last_requeued = None;
            Some(Verdict::Correct { entry })
        } else {
            self.last_requeued = Some(entry.vocab_id);
            self.pending.push_back(entry.clone());
            Some(Verdict::Incorrect { entry })
        }
    }

    /// Retroactively convert the most recent miss into a success,
    /// intended for typo recovery. Pops the just-requeued word back
    /// out of the queue; its attempt count keeps the single increment
    /// it already received, so a lone marked-up miss still counts as a
    /// first-try success. Returns None if the last answer was not a
    /// miss or the word has already been shown again.
    pub fn mark_last_correct(&mut self) -> Option<VocabEntry> {
        let id = self.last_requeued.take()?;
        match self.pending.back() {
            Some(entry) if entry.vocab_id == id => self.pending.pop_back(),
            _ => None,
        }
    }
}
