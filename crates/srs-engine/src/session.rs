//! Daily practice sessions: building the day's word list, driving the
//! answer loop, and finalizing results back into the stores.

use crate::algorithm::{advance, midnight};
use crate::models::{PracticeSession, SrsRecord, UserId, VocabEntry};
use crate::queue::{ReviewQueue, Verdict};
use crate::store::{Catalog, SessionStore, SrsStore, StoreError, UserStore};
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::RngCore;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown user {0}")]
    UnknownUser(UserId),
    #[error("invalid range {start}-{end} for tag {tag}")]
    InvalidRange { tag: String, start: usize, end: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Builds, resumes, and finalizes practice sessions over injected
/// store implementations.
pub struct Scheduler<'a> {
    catalog: &'a dyn Catalog,
    records: &'a dyn SrsStore,
    sessions: &'a dyn SessionStore,
    users: &'a dyn UserStore,
}

/// A live practice session: the persisted session plus the in-memory
/// answer queue.
#[derive(Debug)]
pub struct Practice {
    session: PracticeSession,
    queue: ReviewQueue,
    resumed: bool,
}

/// Observable state of a running practice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PracticeState<'a> {
    /// Waiting for an answer to this word.
    Presenting(&'a VocabEntry),
    /// Every word has been answered correctly at least once.
    Done,
}

/// One word's level transition, for end-of-session reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelChange {
    pub entry: VocabEntry,
    pub level_pre: u32,
    pub level_post: u32,
}

/// Result of finalizing a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    /// The user's streak after this completion.
    pub streak: u32,
    /// False when the day's session had already been finalized; in
    /// that case no records or streak were touched and the change
    /// lists are empty.
    pub first_completion: bool,
    pub upgrades: Vec<LevelChange>,
    pub downgrades: Vec<LevelChange>,
    pub unchanged: Vec<LevelChange>,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        records: &'a dyn SrsStore,
        sessions: &'a dyn SessionStore,
        users: &'a dyn UserStore,
    ) -> Self {
        Self {
            catalog,
            records,
            sessions,
            users,
        }
    }

    /// Start (or resume) the user's practice for the day of `now`.
    ///
    /// If a session already exists for the day, it is resumed with its
    /// persisted word order; otherwise a new one is assembled from due
    /// words topped up with unseen words, shuffled, and persisted.
    /// Building twice on the same day therefore yields the same
    /// session id and word list.
    pub fn start_practice(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
        rng: &mut dyn RngCore,
    ) -> Result<Practice, EngineError> {
        let profile = self
            .users
            .get(user_id)?
            .ok_or(EngineError::UnknownUser(user_id))?;

        if let Some(existing) = self.sessions.find_on(user_id, now.date_naive())? {
            debug!(user_id, practice_id = existing.practice_id, "resuming today's session");
            let entries = self.catalog.by_ids(&existing.vocabs)?;
            return Ok(Practice {
                session: existing,
                queue: ReviewQueue::new(entries),
                resumed: true,
            });
        }

        // Due words first, in store order (quick repeats, then longest
        // overdue), capped at the daily maximum.
        let due = self.records.due(user_id, midnight(now))?;
        let due_ids: Vec<_> = due
            .iter()
            .map(|r| r.vocab_id)
            .take(profile.max_vocabs)
            .collect();
        let mut entries = self.catalog.by_ids(&due_ids)?;

        // Top up with never-before-seen words until the daily quota is
        // met. An exhausted catalog under-fills the quota; that is not
        // an error.
        let quota = profile.n_words.min(profile.max_vocabs);
        if entries.len() < quota {
            let known = self.records.known_ids(user_id)?;
            let fresh = self.catalog.sample(quota - entries.len(), &known)?;
            entries.extend(fresh);
        }

        // First exposure creates the record at level 1.
        for entry in &entries {
            if self.records.get(user_id, entry.vocab_id)?.is_none() {
                self.records.upsert(&SrsRecord::new(user_id, entry.vocab_id))?;
            }
        }

        // Selection order decided membership; presentation order is
        // randomized.
        entries.shuffle(rng);

        let session = PracticeSession::new(
            self.sessions.next_id()?,
            user_id,
            now,
            entries.iter().map(|e| e.vocab_id).collect(),
        );
        self.sessions.create(&session)?;
        debug!(
            user_id,
            practice_id = session.practice_id,
            due = due_ids.len(),
            total = session.vocabs.len(),
            "built new session"
        );

        Ok(Practice {
            session,
            queue: ReviewQueue::new(entries),
            resumed: false,
        })
    }

    /// Finalize a completed practice: write each word's new SRS state
    /// exactly once per day and update the streak.
    ///
    /// The guard is the persisted session's completion timestamp, so a
    /// session re-entered after a timeout or restart cannot charge the
    /// user twice. A second finalization is a no-op that just reports
    /// the current streak.
    pub fn finish_practice(
        &self,
        practice: &mut Practice,
        now: DateTime<Utc>,
    ) -> Result<SessionSummary, EngineError> {
        let user_id = practice.session.user_id;

        let stored = self.sessions.find_on(user_id, practice.session.day())?;
        if stored.map_or(false, |s| s.is_finished()) {
            debug!(user_id, practice_id = practice.session.practice_id, "already finalized today");
            let streak = self.users.get(user_id)?.map_or(0, |p| p.streak);
            return Ok(SessionSummary {
                streak,
                first_completion: false,
                upgrades: Vec::new(),
                downgrades: Vec::new(),
                unchanged: Vec::new(),
            });
        }

        // Streak continuity: completed yesterday as well, or starting
        // over at 1.
        let yesterday = practice.session.day() - Duration::days(1);
        let continued = self
            .sessions
            .find_on(user_id, yesterday)?
            .map_or(false, |s| s.is_finished());
        let streak = if continued {
            self.users.get(user_id)?.map_or(0, |p| p.streak) + 1
        } else {
            1
        };
        self.users.set_streak(user_id, streak)?;

        let mut summary = SessionSummary {
            streak,
            first_completion: true,
            upgrades: Vec::new(),
            downgrades: Vec::new(),
            unchanged: Vec::new(),
        };

        for (&vocab_id, &attempts) in practice.queue.attempts() {
            if attempts == 0 {
                continue;
            }
            let record = self
                .records
                .get(user_id, vocab_id)?
                .unwrap_or_else(|| SrsRecord::new(user_id, vocab_id));
            let level_pre = record.level;
            let updated = advance(&record, attempts, now);
            self.records.upsert(&updated)?;

            if let Some(entry) = self.catalog.by_id(vocab_id)? {
                let change = LevelChange {
                    entry,
                    level_pre,
                    level_post: updated.level,
                };
                if change.level_post > change.level_pre {
                    summary.upgrades.push(change);
                } else if change.level_post < change.level_pre {
                    summary.downgrades.push(change);
                } else {
                    summary.unchanged.push(change);
                }
            }
        }

        practice.session.attempts = practice.queue.attempts().clone();
        practice.session.finished_at = Some(now);
        self.sessions.save(&practice.session)?;
        debug!(
            user_id,
            practice_id = practice.session.practice_id,
            streak,
            upgrades = summary.upgrades.len(),
            downgrades = summary.downgrades.len(),
            "finalized session"
        );

        Ok(summary)
    }
}

impl Practice {
    /// The persisted session this practice plays.
    pub fn session(&self) -> &PracticeSession {
        &self.session
    }

    /// Whether today's existing session was resumed rather than built.
    pub fn resumed(&self) -> bool {
        self.resumed
    }

    pub fn state(&self) -> PracticeState<'_> {
        match self.queue.current() {
            Some(entry) => PracticeState::Presenting(entry),
            None => PracticeState::Done,
        }
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

    /// Total words in the session.
    pub fn total(&self) -> usize {
        self.session.vocabs.len()
    }

    /// Process the learner's reply for the current word.
    pub fn answer(&mut self, reply: &str) -> Option<Verdict> {
        self.queue.answer(reply)
    }

    /// Typo recovery: convert the most recent miss into a success.
    pub fn mark_last_correct(&mut self) -> Option<VocabEntry> {
        self.queue.mark_last_correct()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryCatalog, MemorySessionStore, MemorySrsStore, MemoryUserStore};
    use crate::models::{UserProfile, VocabEntry, VocabId};
    use crate::store::SrsStore;
    use chrono::TimeZone;
    use rand::rngs::mock::StepRng;

    const USER: UserId = 42;

    struct Fixture {
        catalog: MemoryCatalog,
        records: MemorySrsStore,
        sessions: MemorySessionStore,
        users: MemoryUserStore,
    }

    impl Fixture {
        fn new(catalog_size: usize, n_words: usize, max_vocabs: usize) -> Self {
            let entries = (1..=catalog_size as VocabId)
                .map(|id| VocabEntry {
                    vocab_id: id,
                    source: format!("en-{id}"),
                    target: format!("sp-{id}"),
                    source_sentence: format!("An English sentence {id}."),
                    target_sentence: format!("Una frase {id}."),
                    tag: "v".into(),
                    freq: id as u32,
                })
                .collect();
            let users = MemoryUserStore::new();
            users.insert(UserProfile {
                user_id: USER,
                name: "tester".into(),
                n_words,
                max_vocabs,
                streak: 0,
                reminders: Vec::new(),
                sign_up: Utc::now(),
            });
            Self {
                catalog: MemoryCatalog::new(entries),
                records: MemorySrsStore::new(),
                sessions: MemorySessionStore::new(),
                users,
            }
        }

        fn scheduler(&self) -> Scheduler<'_> {
            Scheduler::new(&self.catalog, &self.records, &self.sessions, &self.users)
        }
    }

    fn rng() -> StepRng {
        StepRng::new(0, 1)
    }

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn complete_all(practice: &mut Practice) {
        while let Some(entry) = practice.current().cloned() {
            practice.answer(&entry.target);
        }
    }

    #[test]
    fn test_new_user_gets_quota_of_new_words() {
        let fx = Fixture::new(20, 5, 30);
        let practice = fx.scheduler().start_practice(USER, noon(2024, 3, 5), &mut rng()).unwrap();

        assert_eq!(practice.total(), 5);
        assert!(!practice.resumed());
        for &id in &practice.session().vocabs {
            let record = fx.records.get(USER, id).unwrap().unwrap();
            assert_eq!(record.level, 1);
            assert!(record.next_learn.is_none());
        }
    }

    #[test]
    fn test_underfilled_quota_on_exhausted_catalog() {
        let fx = Fixture::new(3, 5, 30);
        let practice = fx.scheduler().start_practice(USER, noon(2024, 3, 5), &mut rng()).unwrap();
        assert_eq!(practice.total(), 3);
    }

    #[test]
    fn test_empty_catalog_yields_empty_done_session() {
        let fx = Fixture::new(0, 5, 30);
        let mut practice = fx.scheduler().start_practice(USER, noon(2024, 3, 5), &mut rng()).unwrap();

        assert_eq!(practice.total(), 0);
        assert!(matches!(practice.state(), PracticeState::Done));

        let summary = fx.scheduler().finish_practice(&mut practice, noon(2024, 3, 5)).unwrap();
        assert!(summary.first_completion);
        assert_eq!(summary.streak, 1);
    }

    #[test]
    fn test_building_twice_resumes_same_session() {
        let fx = Fixture::new(20, 5, 30);
        let now = noon(2024, 3, 5);
        let scheduler = fx.scheduler();

        let first = scheduler.start_practice(USER, now, &mut rng()).unwrap();
        let second = scheduler.start_practice(USER, now + Duration::hours(2), &mut rng()).unwrap();

        assert!(second.resumed());
        assert_eq!(first.session().practice_id, second.session().practice_id);
        assert_eq!(first.session().vocabs, second.session().vocabs);
    }

    #[test]
    fn test_unknown_user_is_rejected() {
        let fx = Fixture::new(5, 5, 30);
        let err = fx.scheduler().start_practice(999, noon(2024, 3, 5), &mut rng()).unwrap_err();
        assert!(matches!(err, EngineError::UnknownUser(999)));
    }

    #[test]
    fn test_due_words_take_priority_over_new() {
        let fx = Fixture::new(20, 5, 30);
        let now = noon(2024, 3, 10);

        // seen before and overdue
        for id in [1, 2] {
            let mut record = SrsRecord::new(USER, id);
            record.level = 2;
            record.next_learn = Some(now - Duration::days(3));
            fx.records.upsert(&record).unwrap();
        }

        let practice = fx.scheduler().start_practice(USER, now, &mut rng()).unwrap();
        assert_eq!(practice.total(), 5);
        assert!(practice.session().vocabs.contains(&1));
        assert!(practice.session().vocabs.contains(&2));
    }

    #[test]
    fn test_max_vocabs_caps_due_backlog() {
        let fx = Fixture::new(20, 3, 4);
        let now = noon(2024, 3, 10);

        for id in 1..=10 {
            let mut record = SrsRecord::new(USER, id);
            record.next_learn = Some(now - Duration::days(id));
            fx.records.upsert(&record).unwrap();
        }

        let practice = fx.scheduler().start_practice(USER, now, &mut rng()).unwrap();
        assert_eq!(practice.total(), 4);
        // longest overdue first: ids 10, 9, 8, 7
        let mut got = practice.session().vocabs.clone();
        got.sort_unstable();
        assert_eq!(got, vec![7, 8, 9, 10]);
    }

    #[test]
    fn test_miss_then_success_records_two_attempts() {
        let fx = Fixture::new(5, 2, 30);
        let now = noon(2024, 3, 5);
        let scheduler = fx.scheduler();
        let mut practice = scheduler.start_practice(USER, now, &mut rng()).unwrap();

        let first = practice.current().cloned().unwrap();
        assert!(matches!(practice.answer("nope"), Some(Verdict::Incorrect { .. })));

        // the missed word recurs after the rest of the queue
        let mut seen = Vec::new();
        while let Some(entry) = practice.current().cloned() {
            seen.push(entry.vocab_id);
            practice.answer(&entry.target);
        }
        assert_eq!(seen.last(), Some(&first.vocab_id));

        let summary = scheduler.finish_practice(&mut practice, now).unwrap();
        assert_eq!(practice.session().attempts[&first.vocab_id], 2);
        // attempts=2 keeps a level-1 word at level 1
        assert!(summary
            .unchanged
            .iter()
            .any(|c| c.entry.vocab_id == first.vocab_id && c.level_post == 1));

        let record = fx.records.get(USER, first.vocab_id).unwrap().unwrap();
        assert_eq!(record.next_learn, Some(midnight(now) + Duration::days(1)));
    }

    #[test]
    fn test_finalize_reports_upgrades_and_downgrades() {
        let fx = Fixture::new(5, 2, 30);
        let now = noon(2024, 3, 5);
        let scheduler = fx.scheduler();
        let mut practice = scheduler.start_practice(USER, now, &mut rng()).unwrap();

        // answer the first word wrong once, everything else first-try
        let miss = practice.current().cloned().unwrap();
        practice.answer("nope");
        complete_all(&mut practice);

        // raise the missed word's stored level so the miss demotes it
        let mut record = fx.records.get(USER, miss.vocab_id).unwrap().unwrap();
        record.level = 3;
        fx.records.upsert(&record).unwrap();

        let summary = scheduler.finish_practice(&mut practice, now).unwrap();
        assert!(summary.first_completion);
        assert_eq!(summary.upgrades.len(), 1);
        assert_eq!(summary.downgrades.len(), 1);
        let down = &summary.downgrades[0];
        assert_eq!(down.entry.vocab_id, miss.vocab_id);
        assert_eq!((down.level_pre, down.level_post), (3, 2));

        let demoted = fx.records.get(USER, miss.vocab_id).unwrap().unwrap();
        assert!(demoted.quick_repeat);
    }

    #[test]
    fn test_finalize_twice_is_noop() {
        let fx = Fixture::new(5, 3, 30);
        let now = noon(2024, 3, 5);
        let scheduler = fx.scheduler();
        let mut practice = scheduler.start_practice(USER, now, &mut rng()).unwrap();
        complete_all(&mut practice);

        let first = scheduler.finish_practice(&mut practice, now).unwrap();
        assert!(first.first_completion);
        assert_eq!(first.streak, 1);
        let snapshot: Vec<_> = practice
            .session()
            .vocabs
            .iter()
            .map(|&id| fx.records.get(USER, id).unwrap().unwrap())
            .collect();

        let second = scheduler.finish_practice(&mut practice, now).unwrap();
        assert!(!second.first_completion);
        assert_eq!(second.streak, 1);
        assert!(second.upgrades.is_empty() && second.unchanged.is_empty());

        // no record moved a second time
        for (i, &id) in practice.session().vocabs.iter().enumerate() {
            assert_eq!(fx.records.get(USER, id).unwrap().unwrap(), snapshot[i]);
        }
    }

    #[test]
    fn test_streak_continues_after_yesterday() {
        let fx = Fixture::new(30, 3, 30);
        let scheduler = fx.scheduler();

        let mut day_one = scheduler.start_practice(USER, noon(2024, 3, 5), &mut rng()).unwrap();
        complete_all(&mut day_one);
        let summary = scheduler.finish_practice(&mut day_one, noon(2024, 3, 5)).unwrap();
        assert_eq!(summary.streak, 1);

        let mut day_two = scheduler.start_practice(USER, noon(2024, 3, 6), &mut rng()).unwrap();
        complete_all(&mut day_two);
        let summary = scheduler.finish_practice(&mut day_two, noon(2024, 3, 6)).unwrap();
        assert_eq!(summary.streak, 2);
    }

    #[test]
    fn test_streak_resets_after_gap() {
        let fx = Fixture::new(30, 3, 30);
        let scheduler = fx.scheduler();

        let mut day_one = scheduler.start_practice(USER, noon(2024, 3, 5), &mut rng()).unwrap();
        complete_all(&mut day_one);
        scheduler.finish_practice(&mut day_one, noon(2024, 3, 5)).unwrap();

        let mut later = scheduler.start_practice(USER, noon(2024, 3, 8), &mut rng()).unwrap();
        complete_all(&mut later);
        let summary = scheduler.finish_practice(&mut later, noon(2024, 3, 8)).unwrap();
        assert_eq!(summary.streak, 1);
    }

    #[test]
    fn test_unfinished_yesterday_does_not_continue_streak() {
        let fx = Fixture::new(30, 3, 30);
        let scheduler = fx.scheduler();

        // built but never completed
        scheduler.start_practice(USER, noon(2024, 3, 5), &mut rng()).unwrap();

        let mut today = scheduler.start_practice(USER, noon(2024, 3, 6), &mut rng()).unwrap();
        complete_all(&mut today);
        let summary = scheduler.finish_practice(&mut today, noon(2024, 3, 6)).unwrap();
        assert_eq!(summary.streak, 1);
    }

    #[test]
    fn test_resume_survives_restart() {
        let fx = Fixture::new(20, 4, 30);
        let now = noon(2024, 3, 5);

        let original = {
            let scheduler = fx.scheduler();
            scheduler.start_practice(USER, now, &mut rng()).unwrap()
        };

        // a fresh scheduler over the same stores sees the same session
        let scheduler = fx.scheduler();
        let resumed = scheduler.start_practice(USER, now + Duration::hours(1), &mut rng()).unwrap();
        assert!(resumed.resumed());
        assert_eq!(resumed.session().practice_id, original.session().practice_id);
        assert_eq!(resumed.session().vocabs, original.session().vocabs);
    }

    #[test]
    fn test_mastered_word_leaves_rotation() {
        let fx = Fixture::new(5, 1, 30);
        let now = noon(2024, 3, 5);
        let scheduler = fx.scheduler();

        let mut practice = scheduler.start_practice(USER, now, &mut rng()).unwrap();
        let word = practice.current().cloned().unwrap();
        let mut record = fx.records.get(USER, word.vocab_id).unwrap().unwrap();
        record.level = 4;
        fx.records.upsert(&record).unwrap();

        complete_all(&mut practice);
        scheduler.finish_practice(&mut practice, now).unwrap();

        let mastered = fx.records.get(USER, word.vocab_id).unwrap().unwrap();
        assert!(mastered.is_mastered());
        // far-future sentinel keeps it out of any realistic due-list
        assert!(fx
            .records
            .due(USER, now + Duration::days(365))
            .unwrap()
            .iter()
            .all(|r| r.vocab_id != word.vocab_id));
    }
}
