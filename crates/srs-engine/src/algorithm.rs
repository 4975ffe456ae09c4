//! SRS leveling: the rules that move a word between retention levels
//! and compute its next review date.

use crate::models::SrsRecord;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};

/// A word at this level is considered mastered and leaves the review
/// rotation.
pub const MASTERY_LEVEL: u32 = 5;

/// Days until the next review for a given level. Level 4 is the last
/// scheduled interval; level 5 takes the mastery sentinel instead.
pub fn interval_days(level: u32) -> i64 {
    match level {
        0 | 1 => 1,
        2 => 7,
        3 => 16,
        _ => 35,
    }
}

/// Far-future date used as `next_learn` for mastered words, keeping
/// them out of every due-list.
pub fn mastery_sentinel() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Midnight of the day containing the given instant.
pub fn midnight(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Compute the next SRS state after a completed session.
///
/// `attempts` is the number of tries the learner needed to answer the
/// word correctly; exactly 1 means first-try success. Callers must
/// pass `attempts >= 1`.
///
/// A first-try success promotes the word one level, unless it was on
/// quick repeat, in which case the flag is cleared and the level kept:
/// a quick-repeat success restores the pre-demotion schedule rather
/// than counting as a fresh promotion. A miss forces a next-day
/// retest and demotes the word one level (never below 1), flagging it
/// for quick repeat.
pub fn advance(record: &SrsRecord, attempts: u32, now: DateTime<Utc>) -> SrsRecord {
    let mut next = record.clone();
    next.last_learn = Some(now);

    if attempts == 1 {
        if next.quick_repeat {
            next.quick_repeat = false;
        } else {
            next.level += 1;
        }

        if next.level < MASTERY_LEVEL {
            next.next_learn = Some(midnight(now) + Duration::days(interval_days(next.level)));
        } else {
            next.next_learn = Some(mastery_sentinel());
        }
    } else {
        next.next_learn = Some(midnight(now) + Duration::days(1));

        if next.level > 1 {
            next.level -= 1;
            next.quick_repeat = true;
        } else {
            next.quick_repeat = false;
        }
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(level: u32, quick_repeat: bool) -> SrsRecord {
        SrsRecord {
            user_id: 463,
            vocab_id: 867,
            level,
            last_learn: None,
            next_learn: None,
            quick_repeat,
        }
    }

    #[test]
    fn test_first_try_success_promotes() {
        let now = Utc::now();
        for level in 1..=4 {
            let next = advance(&record(level, false), 1, now);
            assert_eq!(next.level, level + 1);
            assert_eq!(next.last_learn, Some(now));

            if level < 4 {
                assert_eq!(
                    next.next_learn,
                    Some(midnight(now) + Duration::days(interval_days(level + 1)))
                );
            } else {
                assert_eq!(next.next_learn, Some(mastery_sentinel()));
            }
        }
    }

    #[test]
    fn test_miss_demotes_and_schedules_next_day() {
        let now = Utc::now();
        for level in 1..=4 {
            let next = advance(&record(level, false), 2, now);
            assert_eq!(next.next_learn, Some(midnight(now) + Duration::days(1)));

            if level == 1 {
                assert_eq!(next.level, 1);
                assert!(!next.quick_repeat);
            } else {
                assert_eq!(next.level, level - 1);
                assert!(next.quick_repeat);
            }
        }
    }

    #[test]
    fn test_quick_repeat_success_keeps_level() {
        let now = Utc::now();
        for level in 2..=3 {
            let next = advance(&record(level, true), 1, now);
            assert_eq!(next.level, level);
            assert!(!next.quick_repeat);
            assert_eq!(
                next.next_learn,
                Some(midnight(now) + Duration::days(interval_days(level)))
            );
        }
    }

    #[test]
    fn test_quick_repeat_miss_behaves_like_miss() {
        let now = Utc::now();
        for level in 1..=4 {
            let next = advance(&record(level, true), 2, now);
            assert_eq!(next.next_learn, Some(midnight(now) + Duration::days(1)));

            if level == 1 {
                assert_eq!(next.level, 1);
                assert!(!next.quick_repeat);
            } else {
                assert_eq!(next.level, level - 1);
                assert!(next.quick_repeat);
            }
        }
    }

    #[test]
    fn test_many_attempts_counts_as_miss() {
        let now = Utc::now();
        let next = advance(&record(3, false), 5, now);
        assert_eq!(next.level, 2);
        assert!(next.quick_repeat);
    }

    #[test]
    fn test_interval_table() {
        assert_eq!(interval_days(1), 1);
        assert_eq!(interval_days(2), 7);
        assert_eq!(interval_days(3), 16);
        assert_eq!(interval_days(4), 35);
    }
}
