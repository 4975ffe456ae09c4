//! Spaced repetition scheduling engine for vocabulary practice.
//!
//! The engine decides which words a learner sees on a given day, how a
//! word's retention level changes after each answer, and how a daily
//! practice session is assembled, played, and finalized. Storage is
//! abstracted behind the traits in [`store`]; [`memory`] provides
//! in-memory implementations for tests and embedding.

pub mod algorithm;
pub mod drill;
pub mod memory;
pub mod models;
pub mod queue;
pub mod session;
pub mod store;

pub use algorithm::{advance, interval_days, mastery_sentinel, midnight, MASTERY_LEVEL};
pub use drill::{parse_range, Drill, DrillSummary};
pub use models::{PracticeId, PracticeSession, Reminder, SrsRecord, UserId, UserProfile, VocabEntry, VocabId};
pub use queue::{ReviewQueue, Verdict};
pub use session::{EngineError, LevelChange, Practice, PracticeState, Scheduler, SessionSummary};
pub use store::{Catalog, SessionStore, SrsStore, StoreError, StoreResult, UserStore};
