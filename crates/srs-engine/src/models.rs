//! Data models for the SRS engine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifiers. All ids are plain integers assigned by the
/// owning store.
pub type UserId = i64;
pub type VocabId = i64;
pub type PracticeId = i64;

/// Normalize a learner's answer for comparison: surrounding whitespace
/// and letter case are not significant.
pub fn normalize_answer(text: &str) -> String {
    text.trim().to_lowercase()
}

/// A vocabulary item. Owned by the catalog, read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabEntry {
    /// Unique identifier.
    pub vocab_id: VocabId,
    /// The word in the learner's language.
    pub source: String,
    /// The word in the language being learned.
    pub target: String,
    /// Example sentence in the source language.
    pub source_sentence: String,
    /// Example sentence in the target language.
    pub target_sentence: String,
    /// Part-of-speech tag (e.g. "v", "nf", "adj").
    pub tag: String,
    /// Frequency rank; lower means more common.
    pub freq: u32,
}

impl VocabEntry {
    /// Check a learner's reply against the target word.
    pub fn matches(&self, reply: &str) -> bool {
        normalize_answer(reply) == normalize_answer(&self.target)
    }
}

/// Per (user, word) scheduling state. Created on first exposure,
/// mutated only by [`crate::algorithm::advance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrsRecord {
    /// Owning user.
    pub user_id: UserId,
    /// The word this record schedules.
    pub vocab_id: VocabId,
    /// Retention level, always >= 1. Level 5 means mastered.
    pub level: u32,
    /// When the word was last reviewed. None until the first review.
    pub last_learn: Option<DateTime<Utc>>,
    /// When the word next becomes due. None until the first review.
    pub next_learn: Option<DateTime<Utc>>,
    /// Forces a next-day retest after a demotion, regardless of the
    /// level-implied interval. Cleared by the next first-try success.
    pub quick_repeat: bool,
}

impl SrsRecord {
    /// Initial record for a word the user has never reviewed.
    pub fn new(user_id: UserId, vocab_id: VocabId) -> Self {
        Self {
            user_id,
            vocab_id,
            level: 1,
            last_learn: None,
            next_learn: None,
            quick_repeat: false,
        }
    }

    /// Whether the word has left the review rotation.
    pub fn is_mastered(&self) -> bool {
        self.level >= crate::algorithm::MASTERY_LEVEL
    }

    /// Whether the word is due for review at the given time.
    pub fn is_due(&self, as_of: DateTime<Utc>) -> bool {
        self.next_learn.map_or(false, |t| t <= as_of)
    }
}

/// One practice session: the set of words a user studies on a given
/// calendar day. At most one session exists per user per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeSession {
    /// Monotonically increasing id.
    pub practice_id: PracticeId,
    /// Owning user.
    pub user_id: UserId,
    /// When the session was created.
    pub timestamp: DateTime<Utc>,
    /// Presentation order, fixed at creation.
    pub vocabs: Vec<VocabId>,
    /// Tries needed per word. Written once, at finalization.
    pub attempts: BTreeMap<VocabId, u32>,
    /// Set exactly once, when the session is first completed. Guards
    /// against double-finalization across resumes and restarts.
    pub finished_at: Option<DateTime<Utc>>,
}

impl PracticeSession {
    /// Create a fresh session over the given words.
    pub fn new(
        practice_id: PracticeId,
        user_id: UserId,
        timestamp: DateTime<Utc>,
        vocabs: Vec<VocabId>,
    ) -> Self {
        let attempts = vocabs.iter().map(|&v| (v, 0)).collect();
        Self {
            practice_id,
            user_id,
            timestamp,
            vocabs,
            attempts,
            finished_at: None,
        }
    }

    /// The calendar day this session belongs to.
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Whether the session has been finalized.
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// Learner settings and progress. Owned by the user store; the engine
/// reads the quotas and writes the streak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Unique identifier.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Daily new-word target.
    pub n_words: usize,
    /// Upper bound on daily session size.
    pub max_vocabs: usize,
    /// Consecutive-day completion counter.
    pub streak: u32,
    /// Daily reminder times. Consumed by an external notifier.
    pub reminders: Vec<Reminder>,
    /// When the user registered.
    pub sign_up: DateTime<Utc>,
}

/// A reminder time of day, validated as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    hour: u8,
    minute: u8,
}

impl Reminder {
    /// Parse a `HH:MM` string. Returns None for malformed input or an
    /// out-of-range time.
    pub fn parse(input: &str) -> Option<Self> {
        let (h, m) = input.split_once(':')?;
        if h.len() != 2 || m.len() != 2 {
            return None;
        }
        let hour: u8 = h.parse().ok()?;
        let minute: u8 = m.parse().ok()?;
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }
}

impl fmt::Display for Reminder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry() -> VocabEntry {
        VocabEntry {
            vocab_id: 1,
            source: "the house".into(),
            target: "la casa".into(),
            source_sentence: "The house is big.".into(),
            target_sentence: "La casa es grande.".into(),
            tag: "nf".into(),
            freq: 12,
        }
    }

    #[test]
    fn test_answer_matching() {
        let e = entry();
        assert!(e.matches("la casa"));
        assert!(e.matches("  La Casa "));
        assert!(!e.matches("la cosa"));
    }

    #[test]
    fn test_new_record() {
        let r = SrsRecord::new(7, 1);
        assert_eq!(r.level, 1);
        assert!(r.last_learn.is_none());
        assert!(!r.quick_repeat);
        assert!(!r.is_due(Utc::now()));
    }

    #[test]
    fn test_session_day_and_attempts() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 19, 30, 0).unwrap();
        let s = PracticeSession::new(1, 7, at, vec![3, 1, 2]);
        assert_eq!(s.day(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(s.attempts.len(), 3);
        assert!(s.attempts.values().all(|&a| a == 0));
        assert!(!s.is_finished());
    }

    #[test]
    fn test_reminder_parse() {
        assert_eq!(Reminder::parse("09:30").map(|r| r.to_string()), Some("09:30".into()));
        assert_eq!(Reminder::parse("23:59").map(|r| r.to_string()), Some("23:59".into()));
        assert!(Reminder::parse("9:30").is_none());
        assert!(Reminder::parse("24:00").is_none());
        assert!(Reminder::parse("12:61").is_none());
        assert!(Reminder::parse("0930").is_none());
    }
}
