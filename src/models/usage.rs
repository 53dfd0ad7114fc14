use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

/// Per-user usage counters, one document per user in `usage_stats`.
///
/// A free user is governed by the weekly time window below, a paid user
/// strictly by `animations_left`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub user_id: String,
    #[serde(default)]
    pub is_paid_user: bool,
    #[serde(default)]
    pub animations_left: i32,
    #[serde(default)]
    pub last_generated_at: Option<BsonDateTime>,
    #[serde(default)]
    pub last_used: Option<BsonDateTime>,
    #[serde(default)]
    pub last_reset_at: Option<BsonDateTime>,
}

impl UsageRecord {
    /// Record for a user that has never generated anything.
    pub fn fresh(user_id: &str) -> Self {
        UsageRecord {
            user_id: user_id.to_string(),
            is_paid_user: false,
            animations_left: 0,
            last_generated_at: None,
            last_used: None,
            last_reset_at: None,
        }
    }

    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        if self.is_paid_user {
            self.animations_left > 0
        } else {
            can_generate_this_week(self.last_generated_at.map(|d| d.to_chrono()), now)
        }
    }

    pub fn remaining_animations(&self) -> i32 {
        if self.is_paid_user {
            self.animations_left
        } else {
            0
        }
    }
}

/// Start of the current week: the most recent Monday 00:00 UTC.
pub fn week_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let days_from_monday = now.weekday().num_days_from_monday() as i64;
    let monday = now.date_naive() - Duration::days(days_from_monday);
    monday.and_time(NaiveTime::MIN).and_utc()
}

/// Free-tier rule: one generation per calendar week.
pub fn can_generate_this_week(last_generated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_generated_at {
        None => true,
        Some(last) => last < week_start(now),
    }
}

/// First day of the current month, 00:00 UTC. Used by the monthly reset to
/// decide whether a counter has already been refilled this period.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let first = now
        .date_naive()
        .with_day(1)
        .unwrap_or_else(|| now.date_naive());
    first.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn week_starts_on_most_recent_monday() {
        // 2025-06-11 is a Wednesday
        assert_eq!(week_start(at(2025, 6, 11, 15, 30)), at(2025, 6, 9, 0, 0));
        // A Monday is its own week start
        assert_eq!(week_start(at(2025, 6, 9, 0, 0)), at(2025, 6, 9, 0, 0));
        // Sunday still belongs to the week that started six days earlier
        assert_eq!(week_start(at(2025, 6, 15, 23, 59)), at(2025, 6, 9, 0, 0));
    }

    #[test]
    fn free_user_without_history_is_eligible() {
        assert!(can_generate_this_week(None, at(2025, 6, 11, 12, 0)));
    }

    #[test]
    fn free_user_blocked_within_current_week() {
        let now = at(2025, 6, 11, 12, 0);
        // Generated Tuesday this week
        assert!(!can_generate_this_week(Some(at(2025, 6, 10, 8, 0)), now));
        // Generated exactly at the Monday boundary
        assert!(!can_generate_this_week(Some(at(2025, 6, 9, 0, 0)), now));
    }

    #[test]
    fn free_user_unblocked_after_week_rolls_over() {
        let now = at(2025, 6, 11, 12, 0);
        // Generated Sunday of the previous week
        assert!(can_generate_this_week(Some(at(2025, 6, 8, 23, 59)), now));
    }

    #[test]
    fn paid_user_governed_by_counter_only() {
        let now = at(2025, 6, 11, 12, 0);
        let mut record = UsageRecord::fresh("u1");
        record.is_paid_user = true;
        record.animations_left = 1;
        // Generated five minutes ago; still eligible because counter is positive
        record.last_generated_at = Some(BsonDateTime::from_chrono(at(2025, 6, 11, 11, 55)));
        assert!(record.is_eligible(now));

        record.animations_left = 0;
        assert!(!record.is_eligible(now));
    }

    #[test]
    fn free_user_remaining_is_zero() {
        let record = UsageRecord::fresh("u1");
        assert_eq!(record.remaining_animations(), 0);
    }

    #[test]
    fn month_start_is_first_midnight() {
        assert_eq!(month_start(at(2025, 6, 11, 15, 30)), at(2025, 6, 1, 0, 0));
        assert_eq!(month_start(at(2025, 1, 1, 0, 0)), at(2025, 1, 1, 0, 0));
    }
}
