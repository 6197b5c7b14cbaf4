//! Matches the schedule against a wall-clock instant.
//!
//! Everything here is pure: the same classes and instant always give the
//! same answer, so the tick loop and the `status` command share it.

use std::fmt;

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::class::{minute_of_day, ScheduledClass, MINUTES_PER_DAY};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation<'a> {
    /// The class running right now. On overlap the first one in list order wins.
    pub ongoing: Option<&'a ScheduledClass>,
    /// Classes whose end minute is the current minute.
    pub boundary_hits: Vec<&'a ScheduledClass>,
}

#[must_use]
pub fn evaluate(classes: &[ScheduledClass], instant: NaiveDateTime) -> Evaluation<'_> {
    let today = instant.weekday();
    let yesterday = today.pred();
    let minute = minute_of_day(instant.time());

    let mut ongoing = None;
    let mut boundary_hits = Vec::new();
    for class in classes.iter().filter(|c| c.enabled) {
        if class.is_active_on(today) {
            if ongoing.is_none() && (class.start_minute()..class.end_minute()).contains(&minute) {
                ongoing = Some(class);
            }
            if !class.ends_at_midnight() && class.end_minute() == minute {
                boundary_hits.push(class);
            }
        }
        // a class ending at 00:00 rings at the first minute of the next day
        if class.ends_at_midnight() && minute == 0 && class.is_active_on(yesterday) {
            boundary_hits.push(class);
        }
    }
    Evaluation {
        ongoing,
        boundary_hits,
    }
}

/// The ongoing class with its derived progress.
#[derive(Debug, Clone, PartialEq)]
pub struct Ongoing<'a> {
    pub class: &'a ScheduledClass,
    pub progress_pct: f64,
    pub remaining_secs: Option<i64>,
}

#[must_use]
pub fn ongoing(classes: &[ScheduledClass], instant: NaiveDateTime) -> Option<Ongoing<'_>> {
    evaluate(classes, instant).ongoing.map(|class| Ongoing {
        class,
        progress_pct: progress_pct(class, instant),
        remaining_secs: remaining_secs(class, instant),
    })
}

impl Ongoing<'_> {
    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            name: self.class.name.clone(),
            progress_pct: self.progress_pct,
            remaining_secs: self.remaining_secs,
        }
    }
}

/// Owned progress line for display, e.g. `Math: 50% done, 15m 00s left`.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub name: String,
    pub progress_pct: f64,
    pub remaining_secs: Option<i64>,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.0}% done", self.name, self.progress_pct)?;
        if let Some(secs) = self.remaining_secs {
            write!(f, ", {} left", format_remaining(secs))?;
        }
        Ok(())
    }
}

pub const NO_CLASS: &str = "no class right now";

/// The progress line for `instant`, or [`NO_CLASS`].
#[must_use]
pub fn describe(classes: &[ScheduledClass], instant: NaiveDateTime) -> String {
    ongoing(classes, instant).map_or_else(|| NO_CLASS.to_string(), |o| o.progress().to_string())
}

/// `1h 02m 03s` style countdown text.
#[must_use]
pub fn format_remaining(secs: i64) -> String {
    let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m {s:02}s")
    } else {
        format!("{m}m {s:02}s")
    }
}

fn second_of_day(instant: NaiveDateTime) -> i64 {
    i64::from(instant.time().num_seconds_from_midnight())
}

/// Elapsed share of the class, in percent, clamped to `0..=100`.
#[must_use]
pub fn progress_pct(class: &ScheduledClass, instant: NaiveDateTime) -> f64 {
    let total = class.duration_secs();
    if total <= 0 {
        return 0.0;
    }
    let elapsed = second_of_day(instant) - i64::from(class.start_minute()) * 60;
    #[allow(clippy::cast_precision_loss)]
    let pct = elapsed as f64 / total as f64 * 100.0;
    pct.clamp(0.0, 100.0)
}

/// Whole seconds until the class ends, `None` once it has ended.
#[must_use]
pub fn remaining_secs(class: &ScheduledClass, instant: NaiveDateTime) -> Option<i64> {
    let end = i64::from(class.end_minute().min(MINUTES_PER_DAY)) * 60;
    let remaining = end - second_of_day(instant);
    (remaining > 0).then_some(remaining)
}
