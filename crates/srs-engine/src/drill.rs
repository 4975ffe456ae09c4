//! Ad-hoc drills over a frequency range of one word group. Drills use
//! the same answer loop as daily practice but touch no SRS records,
//! sessions, or streaks.

use crate::models::VocabEntry;
use crate::queue::{ReviewQueue, Verdict};
use crate::session::EngineError;
use crate::store::Catalog;
use tracing::debug;

/// A running drill.
pub struct Drill {
    tag: String,
    queue: ReviewQueue,
    completed: Vec<VocabEntry>,
}

/// End-of-drill report.
#[derive(Debug, Clone, PartialEq)]
pub struct DrillSummary {
    /// Words answered correctly on the first try.
    pub perfect: Vec<VocabEntry>,
    /// Words that needed several tries, most-missed first.
    pub needs_work: Vec<(VocabEntry, u32)>,
}

/// Parse a learner-supplied range of the form `A-B` (e.g. `0-20`).
/// Both bounds must be non-negative integers with `A < B`. Interior
/// whitespace is tolerated.
pub fn parse_range(input: &str) -> Option<(usize, usize)> {
    let cleaned = input.replace(' ', "");
    let (a, b) = cleaned.split_once('-')?;
    let start: usize = a.parse().ok()?;
    let end: usize = b.parse().ok()?;
    if start < end {
        Some((start, end))
    } else {
        None
    }
}

impl Drill {
    /// Build a drill over the `start..end` slice (by frequency rank)
    /// of the words tagged `tag`. The bounds must satisfy
    /// `start < end <= count_by_tag(tag)`.
    pub fn over_range(
        catalog: &dyn Catalog,
        tag: &str,
        start: usize,
        end: usize,
    ) -> Result<Self, EngineError> {
        let count = catalog.count_by_tag(tag)?;
        if start >= end || end > count {
            return Err(EngineError::InvalidRange {
                tag: tag.to_string(),
                start,
                end,
            });
        }

        let entries = catalog.range(tag, start, end)?;
        debug!(tag, start, end, words = entries.len(), "starting drill");
        Ok(Self {
            tag: tag.to_string(),
            queue: ReviewQueue::new(entries),
            completed: Vec::new(),
        })
    }

    /// The word group being drilled.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The word currently awaiting an answer.
    pub fn current(&self) -> Option<&VocabEntry> {
        self.queue.current()
    }

    pub fn is_done(&self) -> bool {
        self.queue.is_done()
    }

    /// Words not yet answered correctly.
    pub fn remaining(&self) -> usize {
        self.queue.remaining()
    }

    /// Process the learner's reply for the current word.
    pub fn answer(&mut self, reply: &str) -> Option<Verdict> {
        let verdict = self.queue.answer(reply)?;
        if let Verdict::Correct { entry } = &verdict {
            self.completed.push(entry.clone());
        }
        Some(verdict)
    }

    /// Typo recovery: convert the most recent miss into a success.
    pub fn mark_last_correct(&mut self) -> Option<VocabEntry> {
        let entry = self.queue.mark_last_correct()?;
        self.completed.push(entry.clone());
        Some(entry)
    }

    /// Split completed words into perfect and needs-work, the latter
    /// sorted by attempt count descending.
    pub fn summary(&self) -> DrillSummary {
        let mut perfect = Vec::new();
        let mut needs_work = Vec::new();

        for entry in &self.completed {
            let attempts = self.queue.attempts().get(&entry.vocab_id).copied().unwrap_or(0);
            if attempts <= 1 {
                perfect.push(entry.clone());
            } else {
                needs_work.push((entry.clone(), attempts));
            }
        }
        needs_work.sort_by_key(|&(_, attempts)| std::cmp::Reverse(attempts));

        DrillSummary { perfect, needs_work }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCatalog;
    use crate::models::VocabId;

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new(
            (1..=6)
                .map(|id: VocabId| VocabEntry {
                    vocab_id: id,
                    source: format!("en-{id}"),
                    target: format!("sp-{id}"),
                    source_sentence: String::new(),
                    target_sentence: String::new(),
                    tag: if id <= 4 { "v".into() } else { "adj".into() },
                    freq: id as u32,
                })
                .collect(),
        )
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("0-20"), Some((0, 20)));
        assert_eq!(parse_range(" 10 - 20 "), Some((10, 20)));
        assert_eq!(parse_range("20-10"), None);
        assert_eq!(parse_range("10-10"), None);
        assert_eq!(parse_range("-5-10"), None);
        assert_eq!(parse_range("abc"), None);
        assert_eq!(parse_range("5"), None);
    }

    #[test]
    fn test_range_bounds_validated_against_tag_count() {
        let catalog = catalog();
        assert!(Drill::over_range(&catalog, "v", 0, 5).is_err());
        assert!(Drill::over_range(&catalog, "v", 2, 2).is_err());
        assert!(Drill::over_range(&catalog, "v", 0, 4).is_ok());
        assert!(Drill::over_range(&catalog, "adj", 0, 2).is_ok());
    }

    #[test]
    fn test_drill_presents_by_frequency() {
        let catalog = catalog();
        let drill = Drill::over_range(&catalog, "v", 1, 3).unwrap();
        assert_eq!(drill.current().map(|e| e.vocab_id), Some(2));
        assert_eq!(drill.remaining(), 2);
    }

    #[test]
    fn test_summary_splits_perfect_and_needs_work() {
        let catalog = catalog();
        let mut drill = Drill::over_range(&catalog, "v", 0, 3).unwrap();

        drill.answer("sp-1"); // perfect
        drill.answer("wrong"); // word 2 misses twice
        drill.answer("sp-3"); // perfect
        drill.answer("wrong");
        drill.answer("sp-2");
        assert!(drill.is_done());

        let summary = drill.summary();
        let perfect: Vec<VocabId> = summary.perfect.iter().map(|e| e.vocab_id).collect();
        assert_eq!(perfect, vec![1, 3]);
        assert_eq!(summary.needs_work.len(), 1);
        assert_eq!(summary.needs_work[0].0.vocab_id, 2);
        assert_eq!(summary.needs_work[0].1, 3);
    }

    #[test]
    fn test_typo_recovery_keeps_word_perfect() {
        let catalog = catalog();
        let mut drill = Drill::over_range(&catalog, "adj", 0, 2).unwrap();

        drill.answer("typo");
        drill.mark_last_correct().unwrap();
        drill.answer("sp-6");
        assert!(drill.is_done());

        let summary = drill.summary();
        assert_eq!(summary.perfect.len(), 2);
        assert!(summary.needs_work.is_empty());
    }
}
