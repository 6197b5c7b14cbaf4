use std::collections::HashSet;

use chrono::NaiveDateTime;

/// Minutes since the unix epoch, used as the dedup window key.
#[must_use]
pub fn minute_stamp(instant: NaiveDateTime) -> i64 {
    instant.and_utc().timestamp().div_euclid(60)
}

/// Remembers which classes already rang during the current minute.
///
/// The set is only ever about one minute: it is cleared as soon as a
/// different minute is seen, so nothing accumulates across minutes.
#[derive(Debug, Default)]
pub struct FiredEventTracker {
    fired: HashSet<String>,
    last_minute: Option<i64>,
}

impl FiredEventTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new dedup window if `minute` differs from the last one seen.
    /// Called once per tick before any class is checked.
    pub fn roll_over(&mut self, minute: i64) {
        if self.last_minute != Some(minute) {
            self.fired.clear();
            self.last_minute = Some(minute);
        }
    }

    /// Returns `true` the first time `class_id` is seen in `minute`.
    pub fn should_fire(&mut self, class_id: &str, minute: i64) -> bool {
        self.roll_over(minute);
        if self.fired.contains(class_id) {
            return false;
        }
        self.fired.insert(class_id.to_string())
    }

    #[must_use]
    pub const fn last_minute(&self) -> Option<i64> {
        self.last_minute
    }

    #[must_use]
    pub fn fired_count(&self) -> usize {
        self.fired.len()
    }
}
