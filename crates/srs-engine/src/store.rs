//! Storage interfaces consumed by the engine.
//!
//! The engine is storage-agnostic: it talks to a vocabulary catalog,
//! an SRS record store, a practice session store, and a user store
//! through these traits, all injected by the caller. Backends surface
//! failures as [`StoreError`]; retry policy belongs to the caller.

use crate::models::{PracticeId, PracticeSession, SrsRecord, UserId, UserProfile, VocabEntry, VocabId};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read-only lookup and sampling over the vocabulary set.
pub trait Catalog {
    /// Look up a single word.
    fn by_id(&self, vocab_id: VocabId) -> StoreResult<Option<VocabEntry>>;

    /// Look up several words, returned in the order of `ids`. Unknown
    /// ids are skipped.
    fn by_ids(&self, ids: &[VocabId]) -> StoreResult<Vec<VocabEntry>>;

    /// Random sample of at most `n` words, excluding the given ids.
    fn sample(&self, n: usize, exclude: &HashSet<VocabId>) -> StoreResult<Vec<VocabEntry>>;

    /// Number of words carrying the given part-of-speech tag.
    fn count_by_tag(&self, tag: &str) -> StoreResult<usize>;

    /// Words of one tag sorted by frequency rank ascending, sliced by
    /// zero-based `start..end`. Callers must pass
    /// `0 <= start < end <= count_by_tag(tag)`.
    fn range(&self, tag: &str, start: usize, end: usize) -> StoreResult<Vec<VocabEntry>>;
}

/// Per (user, word) scheduling records.
pub trait SrsStore {
    /// Fetch one record, if the user has seen the word before.
    fn get(&self, user_id: UserId, vocab_id: VocabId) -> StoreResult<Option<SrsRecord>>;

    /// Insert or replace a record.
    fn upsert(&self, record: &SrsRecord) -> StoreResult<()>;

    /// Records with `next_learn <= as_of`, ordered by `quick_repeat`
    /// descending then `next_learn` ascending: demoted words awaiting
    /// their next-day retest come first, then the longest overdue.
    fn due(&self, user_id: UserId, as_of: DateTime<Utc>) -> StoreResult<Vec<SrsRecord>>;

    /// Every vocab id the user has a record for, due or not.
    fn known_ids(&self, user_id: UserId) -> StoreResult<HashSet<VocabId>>;
}

/// Daily practice sessions.
pub trait SessionStore {
    /// The user's session on the given calendar day, if any.
    fn find_on(&self, user_id: UserId, day: NaiveDate) -> StoreResult<Option<PracticeSession>>;

    /// Persist a newly built session.
    fn create(&self, session: &PracticeSession) -> StoreResult<()>;

    /// Persist updated attempts / completion state for an existing
    /// session.
    fn save(&self, session: &PracticeSession) -> StoreResult<()>;

    /// Next free id: max existing + 1, or 0 when no session exists.
    fn next_id(&self) -> StoreResult<PracticeId>;
}

/// Learner settings and streak.
pub trait UserStore {
    /// Fetch a user's profile.
    fn get(&self, user_id: UserId) -> StoreResult<Option<UserProfile>>;

    /// Overwrite the user's streak counter.
    fn set_streak(&self, user_id: UserId, streak: u32) -> StoreResult<()>;
}
