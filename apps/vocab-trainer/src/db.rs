//! SQLite persistence for the vocabulary trainer. One `Database`
//! implements all four engine store traits.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{params, Connection, Result as SqlResult};
use srs_engine::store::{Catalog, SessionStore, SrsStore, StoreError, StoreResult, UserStore};
use srs_engine::{PracticeId, PracticeSession, SrsRecord, UserId, UserProfile, VocabEntry, VocabId};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

fn store_err(err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    pub fn in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> DbResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS vocabulary (
                vocab_id INTEGER PRIMARY KEY,
                source TEXT NOT NULL,
                target TEXT NOT NULL,
                source_sentence TEXT NOT NULL,
                target_sentence TEXT NOT NULL,
                tag TEXT NOT NULL,
                freq INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS srs (
                user_id INTEGER NOT NULL,
                vocab_id INTEGER NOT NULL REFERENCES vocabulary(vocab_id),
                level INTEGER NOT NULL,
                last_learn TEXT,
                next_learn TEXT,
                quick_repeat INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, vocab_id)
            );

            CREATE TABLE IF NOT EXISTS practice (
                practice_id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                vocabs TEXT NOT NULL,
                attempts TEXT NOT NULL,
                finished_at TEXT
            );

            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                n_words INTEGER NOT NULL,
                max_vocabs INTEGER NOT NULL,
                streak INTEGER NOT NULL DEFAULT 0,
                reminders TEXT NOT NULL DEFAULT '[]',
                sign_up TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_vocab_tag ON vocabulary(tag, freq);
            CREATE INDEX IF NOT EXISTS idx_srs_next ON srs(user_id, next_learn);
            CREATE INDEX IF NOT EXISTS idx_practice_user ON practice(user_id, timestamp);
            "#,
        )?;
        Ok(())
    }

    // Vocabulary import

    /// Insert entries, ignoring ids already present.
    pub fn import_entries(&self, entries: &[VocabEntry]) -> DbResult<usize> {
        let mut inserted = 0;
        for entry in entries {
            inserted += self.conn.execute(
                "INSERT OR IGNORE INTO vocabulary
                 (vocab_id, source, target, source_sentence, target_sentence, tag, freq)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    entry.vocab_id,
                    entry.source,
                    entry.target,
                    entry.source_sentence,
                    entry.target_sentence,
                    entry.tag,
                    entry.freq,
                ],
            )?;
        }
        Ok(inserted)
    }

    /// Load a JSON array of entries from disk and import it.
    pub fn import_vocab_file(&self, path: &Path) -> DbResult<usize> {
        let raw = std::fs::read_to_string(path)?;
        let entries: Vec<VocabEntry> = serde_json::from_str(&raw)?;
        self.import_entries(&entries)
    }

    pub fn vocab_count(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM vocabulary", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Distinct part-of-speech tags, most common group first.
    pub fn tags(&self) -> DbResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT tag, COUNT(*) AS n FROM vocabulary GROUP BY tag ORDER BY n DESC, tag",
        )?;
        let tags = stmt
            .query_map([], |row| row.get(0))?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(tags)
    }

    // Users

    /// Fetch the user, creating a fresh profile if this is the first
    /// run.
    pub fn ensure_user(&self, profile: &UserProfile) -> DbResult<UserProfile> {
        if let Some(existing) = self.get_user(profile.user_id)? {
            return Ok(existing);
        }
        self.conn.execute(
            "INSERT INTO users (user_id, name, n_words, max_vocabs, streak, reminders, sign_up)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                profile.user_id,
                profile.name,
                profile.n_words as i64,
                profile.max_vocabs as i64,
                profile.streak,
                serde_json::to_string(&profile.reminders)?,
                profile.sign_up.to_rfc3339(),
            ],
        )?;
        Ok(profile.clone())
    }

    /// Update the daily quotas from config.
    pub fn update_quotas(&self, user_id: UserId, n_words: usize, max_vocabs: usize) -> DbResult<()> {
        self.conn.execute(
            "UPDATE users SET n_words = ?2, max_vocabs = ?3 WHERE user_id = ?1",
            params![user_id, n_words as i64, max_vocabs as i64],
        )?;
        Ok(())
    }

    fn get_user(&self, user_id: UserId) -> DbResult<Option<UserProfile>> {
        let mut stmt = self.conn.prepare("SELECT * FROM users WHERE user_id = ?1")?;
        let user = stmt.query_row(params![user_id], parse_user_row);

        match user {
            Ok(u) => Ok(Some(u)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // Progress queries for the stats view

    /// Count of this user's words per level.
    pub fn level_counts(&self, user_id: UserId) -> DbResult<BTreeMap<u32, usize>> {
        let mut stmt = self
            .conn
            .prepare("SELECT level, COUNT(*) FROM srs WHERE user_id = ?1 GROUP BY level")?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(rows.into_iter().collect())
    }

    /// Words due on or before the given instant.
    pub fn due_count(&self, user_id: UserId, as_of: DateTime<Utc>) -> DbResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM srs WHERE user_id = ?1 AND next_learn IS NOT NULL AND next_learn <= ?2",
            params![user_id, as_of.to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn find_entry(&self, vocab_id: VocabId) -> DbResult<Option<VocabEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM vocabulary WHERE vocab_id = ?1")?;
        let entry = stmt.query_row(params![vocab_id], parse_vocab_row);

        match entry {
            Ok(e) => Ok(Some(e)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl Catalog for Database {
    fn by_id(&self, vocab_id: VocabId) -> StoreResult<Option<VocabEntry>> {
        self.find_entry(vocab_id).map_err(store_err)
    }

    fn by_ids(&self, ids: &[VocabId]) -> StoreResult<Vec<VocabEntry>> {
        let mut out = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(entry) = self.find_entry(id).map_err(store_err)? {
                out.push(entry);
            }
        }
        Ok(out)
    }

    fn sample(&self, n: usize, exclude: &HashSet<VocabId>) -> StoreResult<Vec<VocabEntry>> {
        // ids are integers, safe to inline into the NOT IN clause
        let sql = if exclude.is_empty() {
            "SELECT * FROM vocabulary ORDER BY RANDOM() LIMIT ?1".to_string()
        } else {
            let excluded: Vec<String> = exclude.iter().map(|id| id.to_string()).collect();
            format!(
                "SELECT * FROM vocabulary WHERE vocab_id NOT IN ({}) ORDER BY RANDOM() LIMIT ?1",
                excluded.join(",")
            )
        };
        let mut stmt = self.conn.prepare(&sql).map_err(store_err)?;
        let entries = stmt
            .query_map(params![n as i64], parse_vocab_row)
            .map_err(store_err)?
            .collect::<SqlResult<Vec<_>>>()
            .map_err(store_err)?;
        Ok(entries)
    }

    fn count_by_tag(&self, tag: &str) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM vocabulary WHERE tag = ?1",
                params![tag],
                |row| row.get(0),
            )
            .map_err(store_err)?;
        Ok(count as usize)
    }

    fn range(&self, tag: &str, start: usize, end: usize) -> StoreResult<Vec<VocabEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM vocabulary WHERE tag = ?1 ORDER BY freq LIMIT ?2 OFFSET ?3")
            .map_err(store_err)?;
        let entries = stmt
            .query_map(
                params![tag, (end.saturating_sub(start)) as i64, start as i64],
                parse_vocab_row,
            )
            .map_err(store_err)?
            .collect::<SqlResult<Vec<_>>>()
            .map_err(store_err)?;
        Ok(entries)
    }
}

impl SrsStore for Database {
    fn get(&self, user_id: UserId, vocab_id: VocabId) -> StoreResult<Option<SrsRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM srs WHERE user_id = ?1 AND vocab_id = ?2")
            .map_err(store_err)?;
        let record = stmt.query_row(params![user_id, vocab_id], parse_srs_row);

        match record {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(store_err(e)),
        }
    }

    fn upsert(&self, record: &SrsRecord) -> StoreResult<()> {
        self.conn
            .execute(
                "INSERT INTO srs (user_id, vocab_id, level, last_learn, next_learn, quick_repeat)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(user_id, vocab_id) DO UPDATE SET
                    level = excluded.level, last_learn = excluded.last_learn,
                    next_learn = excluded.next_learn, quick_repeat = excluded.quick_repeat",
                params![
                    record.user_id,
                    record.vocab_id,
                    record.level,
                    record.last_learn.map(|t| t.to_rfc3339()),
                    record.next_learn.map(|t| t.to_rfc3339()),
                    record.quick_repeat as i64,
                ],
            )
            .map_err(store_err)?;
        Ok(())
    }

    fn due(&self, user_id: UserId, as_of: DateTime<Utc>) -> StoreResult<Vec<SrsRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT * FROM srs
                 WHERE user_id = ?1 AND next_learn IS NOT NULL AND next_learn <= ?2
                 ORDER BY quick_repeat DESC, next_learn ASC",
            )
            .map_err(store_err)?;
        let records = stmt
            .query_map(params![user_id, as_of.to_rfc3339()], parse_srs_row)
            .map_err(store_err)?
            .collect::<SqlResult<Vec<_>>>()
            .map_err(store_err)?;
        Ok(records)
    }

    fn known_ids(&self, user_id: UserId) -> StoreResult<HashSet<VocabId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT vocab_id FROM srs WHERE user_id = ?1")
            .map_err(store_err)?;
        let ids = stmt
            .query_map(params![user_id], |row| row.get(0))
            .map_err(store_err)?
            .collect::<SqlResult<HashSet<_>>>()
            .map_err(store_err)?;
        Ok(ids)
    }
}

impl SessionStore for Database {
    fn find_on(&self, user_id: UserId, day: NaiveDate) -> StoreResult<Option<PracticeSession>> {
        let start = day.and_time(NaiveTime::MIN).and_utc();
        let end = start + chrono::Duration::days(1);
        let mut stmt = self
            .conn
            .prepare(
                "SELECT * FROM practice
                 WHERE user_id = ?1 AND timestamp >= ?2 AND timestamp < ?3",
            )
            .map_err(store_err)?;
        let session = stmt.query_row(
            params![user_id, start.to_rfc3339(), end.to_rfc3339()],
            parse_practice_row,
        );

        match session {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(store_err(e)),
        }
    }

    fn create(&self, session: &PracticeSession) -> StoreResult<()> {
        self.conn
            .execute(
                "INSERT INTO practice (practice_id, user_id, timestamp, vocabs, attempts, finished_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                practice_params(session).map_err(store_err)?,
            )
            .map_err(store_err)?;
        Ok(())
    }

    fn save(&self, session: &PracticeSession) -> StoreResult<()> {
        self.conn
            .execute(
                "UPDATE practice SET user_id = ?2, timestamp = ?3, vocabs = ?4,
                 attempts = ?5, finished_at = ?6 WHERE practice_id = ?1",
                practice_params(session).map_err(store_err)?,
            )
            .map_err(store_err)?;
        Ok(())
    }

    fn next_id(&self) -> StoreResult<PracticeId> {
        let max: Option<i64> = self
            .conn
            .query_row("SELECT MAX(practice_id) FROM practice", [], |row| row.get(0))
            .map_err(store_err)?;
        Ok(max.map_or(0, |id| id + 1))
    }
}

impl UserStore for Database {
    fn get(&self, user_id: UserId) -> StoreResult<Option<UserProfile>> {
        self.get_user(user_id).map_err(store_err)
    }

    fn set_streak(&self, user_id: UserId, streak: u32) -> StoreResult<()> {
        self.conn
            .execute(
                "UPDATE users SET streak = ?2 WHERE user_id = ?1",
                params![user_id, streak],
            )
            .map_err(store_err)?;
        Ok(())
    }
}

fn practice_params(session: &PracticeSession) -> Result<[rusqlite::types::Value; 6], DbError> {
    // attempts keys become strings in JSON; serialize as pairs instead
    let attempts: Vec<(VocabId, u32)> = session.attempts.iter().map(|(&k, &v)| (k, v)).collect();
    Ok([
        session.practice_id.into(),
        session.user_id.into(),
        session.timestamp.to_rfc3339().into(),
        serde_json::to_string(&session.vocabs)?.into(),
        serde_json::to_string(&attempts)?.into(),
        match session.finished_at {
            Some(t) => t.to_rfc3339().into(),
            None => rusqlite::types::Value::Null,
        },
    ])
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
}

fn parse_vocab_row(row: &rusqlite::Row) -> SqlResult<VocabEntry> {
    Ok(VocabEntry {
        vocab_id: row.get("vocab_id")?,
        source: row.get("source")?,
        target: row.get("target")?,
        source_sentence: row.get("source_sentence")?,
        target_sentence: row.get("target_sentence")?,
        tag: row.get("tag")?,
        freq: row.get("freq")?,
    })
}

fn parse_srs_row(row: &rusqlite::Row) -> SqlResult<SrsRecord> {
    let last_learn: Option<String> = row.get("last_learn")?;
    let next_learn: Option<String> = row.get("next_learn")?;

    Ok(SrsRecord {
        user_id: row.get("user_id")?,
        vocab_id: row.get("vocab_id")?,
        level: row.get("level")?,
        last_learn: last_learn.as_deref().and_then(parse_time),
        next_learn: next_learn.as_deref().and_then(parse_time),
        quick_repeat: row.get::<_, i64>("quick_repeat")? != 0,
    })
}

fn parse_practice_row(row: &rusqlite::Row) -> SqlResult<PracticeSession> {
    let timestamp: String = row.get("timestamp")?;
    let vocabs_raw: String = row.get("vocabs")?;
    let attempts_raw: String = row.get("attempts")?;
    let finished_raw: Option<String> = row.get("finished_at")?;

    let vocabs: Vec<VocabId> = serde_json::from_str(&vocabs_raw).unwrap_or_default();
    let attempts: Vec<(VocabId, u32)> = serde_json::from_str(&attempts_raw).unwrap_or_default();

    Ok(PracticeSession {
        practice_id: row.get("practice_id")?,
        user_id: row.get("user_id")?,
        timestamp: parse_time(&timestamp).unwrap_or_else(Utc::now),
        vocabs,
        attempts: attempts.into_iter().collect(),
        finished_at: finished_raw.as_deref().and_then(parse_time),
    })
}

fn parse_user_row(row: &rusqlite::Row) -> SqlResult<UserProfile> {
    let reminders_raw: String = row.get("reminders")?;
    let sign_up: String = row.get("sign_up")?;

    Ok(UserProfile {
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        n_words: row.get::<_, i64>("n_words")? as usize,
        max_vocabs: row.get::<_, i64>("max_vocabs")? as usize,
        streak: row.get("streak")?,
        reminders: serde_json::from_str(&reminders_raw).unwrap_or_default(),
        sign_up: parse_time(&sign_up).unwrap_or_else(Utc::now),
    })
}
