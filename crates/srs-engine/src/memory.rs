//! In-memory store implementations, used by the engine's tests and by
//! callers that do not need durable storage.

use crate::models::{PracticeId, PracticeSession, SrsRecord, UserId, UserProfile, VocabEntry, VocabId};
use crate::store::{Catalog, SessionStore, SrsStore, StoreResult, UserStore};
use chrono::{DateTime, NaiveDate, Utc};
use rand::seq::SliceRandom;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// Vocabulary catalog backed by a plain vector.
pub struct MemoryCatalog {
    entries: Vec<VocabEntry>,
}

impl MemoryCatalog {
    pub fn new(mut entries: Vec<VocabEntry>) -> Self {
        entries.sort_by_key(|e| e.freq);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Catalog for MemoryCatalog {
    fn by_id(&self, vocab_id: VocabId) -> StoreResult<Option<VocabEntry>> {
        Ok(self.entries.iter().find(|e| e.vocab_id == vocab_id).cloned())
    }

    fn by_ids(&self, ids: &[VocabId]) -> StoreResult<Vec<VocabEntry>> {
        let mut out = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(e) = self.entries.iter().find(|e| e.vocab_id == id) {
                out.push(e.clone());
            }
        }
        Ok(out)
    }

    fn sample(&self, n: usize, exclude: &HashSet<VocabId>) -> StoreResult<Vec<VocabEntry>> {
        let candidates: Vec<&VocabEntry> = self
            .entries
            .iter()
            .filter(|e| !exclude.contains(&e.vocab_id))
            .collect();
        let picked = candidates
            .choose_multiple(&mut rand::thread_rng(), n)
            .map(|e| (*e).clone())
            .collect();
        Ok(picked)
    }

    fn count_by_tag(&self, tag: &str) -> StoreResult<usize> {
        Ok(self.entries.iter().filter(|e| e.tag == tag).count())
    }

    fn range(&self, tag: &str, start: usize, end: usize) -> StoreResult<Vec<VocabEntry>> {
        // entries are kept sorted by frequency rank
        let tagged: Vec<&VocabEntry> = self.entries.iter().filter(|e| e.tag == tag).collect();
        let end = end.min(tagged.len());
        let start = start.min(end);
        Ok(tagged[start..end].iter().map(|e| (*e).clone()).collect())
    }
}

/// SRS record store backed by a HashMap.
#[derive(Default)]
pub struct MemorySrsStore {
    records: RefCell<HashMap<(UserId, VocabId), SrsRecord>>,
}

impl MemorySrsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SrsStore for MemorySrsStore {
    fn get(&self, user_id: UserId, vocab_id: VocabId) -> StoreResult<Option<SrsRecord>> {
        Ok(self.records.borrow().get(&(user_id, vocab_id)).cloned())
    }

    fn upsert(&self, record: &SrsRecord) -> StoreResult<()> {
        self.records
            .borrow_mut()
            .insert((record.user_id, record.vocab_id), record.clone());
        Ok(())
    }

    fn due(&self, user_id: UserId, as_of: DateTime<Utc>) -> StoreResult<Vec<SrsRecord>> {
        let mut due: Vec<SrsRecord> = self
            .records
            .borrow()
            .values()
            .filter(|r| r.user_id == user_id && r.is_due(as_of))
            .cloned()
            .collect();
        due.sort_by_key(|r| (!r.quick_repeat, r.next_learn));
        Ok(due)
    }

    fn known_ids(&self, user_id: UserId) -> StoreResult<HashSet<VocabId>> {
        Ok(self
            .records
            .borrow()
            .values()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.vocab_id)
            .collect())
    }
}

/// Practice session store backed by a vector.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RefCell<Vec<PracticeSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn find_on(&self, user_id: UserId, day: NaiveDate) -> StoreResult<Option<PracticeSession>> {
        Ok(self
            .sessions
            .borrow()
            .iter()
            .find(|s| s.user_id == user_id && s.day() == day)
            .cloned())
    }

    fn create(&self, session: &PracticeSession) -> StoreResult<()> {
        self.sessions.borrow_mut().push(session.clone());
        Ok(())
    }

    fn save(&self, session: &PracticeSession) -> StoreResult<()> {
        let mut sessions = self.sessions.borrow_mut();
        match sessions.iter_mut().find(|s| s.practice_id == session.practice_id) {
            Some(slot) => *slot = session.clone(),
            None => sessions.push(session.clone()),
        }
        Ok(())
    }

    fn next_id(&self) -> StoreResult<PracticeId> {
        Ok(self
            .sessions
            .borrow()
            .iter()
            .map(|s| s.practice_id)
            .max()
            .map_or(0, |id| id + 1))
    }
}

/// User store backed by a HashMap.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RefCell<HashMap<UserId, UserProfile>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a profile.
    pub fn insert(&self, profile: UserProfile) {
        self.users.borrow_mut().insert(profile.user_id, profile);
    }
}

impl UserStore for MemoryUserStore {
    fn get(&self, user_id: UserId) -> StoreResult<Option<UserProfile>> {
        Ok(self.users.borrow().get(&user_id).cloned())
    }

    fn set_streak(&self, user_id: UserId, streak: u32) -> StoreResult<()> {
        if let Some(profile) = self.users.borrow_mut().get_mut(&user_id) {
            profile.streak = streak;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(id: VocabId, tag: &str, freq: u32) -> VocabEntry {
        VocabEntry {
            vocab_id: id,
            source: format!("word-{id}"),
            target: format!("palabra-{id}"),
            source_sentence: String::new(),
            target_sentence: String::new(),
            tag: tag.into(),
            freq,
        }
    }

    #[test]
    fn test_sample_excludes_and_caps() {
        let catalog = MemoryCatalog::new((1..=10).map(|i| entry(i, "v", i as u32)).collect());
        let exclude: HashSet<VocabId> = (1..=8).collect();

        let picked = catalog.sample(5, &exclude).unwrap();
        let ids: HashSet<VocabId> = picked.iter().map(|e| e.vocab_id).collect();
        assert_eq!(picked.len(), 2);
        assert!(ids.contains(&9) && ids.contains(&10));
    }

    #[test]
    fn test_range_sorted_by_frequency() {
        let catalog = MemoryCatalog::new(vec![
            entry(1, "v", 30),
            entry(2, "v", 10),
            entry(3, "nf", 5),
            entry(4, "v", 20),
        ]);

        assert_eq!(catalog.count_by_tag("v").unwrap(), 3);
        let slice = catalog.range("v", 0, 2).unwrap();
        let ids: Vec<VocabId> = slice.iter().map(|e| e.vocab_id).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn test_due_ordering() {
        let store = MemorySrsStore::new();
        let now = Utc::now();

        let mut overdue = SrsRecord::new(1, 10);
        overdue.next_learn = Some(now - Duration::days(5));
        let mut barely_due = SrsRecord::new(1, 11);
        barely_due.next_learn = Some(now - Duration::hours(1));
        let mut quick = SrsRecord::new(1, 12);
        quick.next_learn = Some(now - Duration::hours(1));
        quick.quick_repeat = true;
        let mut future = SrsRecord::new(1, 13);
        future.next_learn = Some(now + Duration::days(3));

        for r in [&overdue, &barely_due, &quick, &future] {
            store.upsert(r).unwrap();
        }

        let due: Vec<VocabId> = store.due(1, now).unwrap().iter().map(|r| r.vocab_id).collect();
        assert_eq!(due, vec![12, 10, 11]);
    }

    #[test]
    fn test_session_ids_and_lookup() {
        let store = MemorySessionStore::new();
        assert_eq!(store.next_id().unwrap(), 0);

        let now = Utc::now();
        let session = PracticeSession::new(0, 1, now, vec![1, 2]);
        store.create(&session).unwrap();

        assert_eq!(store.next_id().unwrap(), 1);
        let found = store.find_on(1, now.date_naive()).unwrap().unwrap();
        assert_eq!(found.practice_id, 0);
        assert!(store.find_on(2, now.date_naive()).unwrap().is_none());
    }
}
