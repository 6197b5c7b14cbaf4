//! Weekly classes and the ordered schedule that owns them.

use std::str::FromStr;

use chrono::{NaiveTime, Timelike, Weekday};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    config::always_true,
    error::{Error, Result},
};

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Parses a zero-padded 24-hour `HH:MM` time of day.
pub fn parse_hhmm(text: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(text.trim(), "%H:%M").map_err(|_| Error::InvalidTime(text.to_string()))
}

#[must_use]
pub fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Parses a comma separated weekday list such as `mon,wed,fri`.
pub fn parse_days(text: &str) -> Result<Vec<Weekday>> {
    let mut days = Vec::new();
    for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let day = Weekday::from_str(part).map_err(|_| Error::InvalidWeekday(part.to_string()))?;
        days.push(day);
    }
    Ok(normalize_days(days))
}

/// Sorts Monday first and removes duplicates.
fn normalize_days(mut days: Vec<Weekday>) -> Vec<Weekday> {
    days.sort_by_key(Weekday::num_days_from_monday);
    days.dedup();
    days
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledClass {
    pub id: String,
    pub name: String,
    pub start: NaiveTime,
    /// `00:00` means the class runs until the end of the day.
    pub end: NaiveTime,
    pub days: Vec<Weekday>,
    pub enabled: bool,
}

impl ScheduledClass {
    /// Creates an enabled class with a fresh id.
    pub fn new(name: &str, start: NaiveTime, end: NaiveTime, days: Vec<Weekday>) -> Result<Self> {
        let class = Self {
            id: new_id(),
            name: name.trim().to_string(),
            start: truncate_to_minute(start),
            end: truncate_to_minute(end),
            days: normalize_days(days),
            enabled: true,
        };
        class.validate()?;
        Ok(class)
    }

    #[must_use]
    pub fn start_minute(&self) -> u32 {
        minute_of_day(self.start)
    }

    /// Minute of day the class ends at, `00:00` counting as the end of the day.
    #[must_use]
    pub fn end_minute(&self) -> u32 {
        match minute_of_day(self.end) {
            0 => MINUTES_PER_DAY,
            minute => minute,
        }
    }

    #[must_use]
    pub fn ends_at_midnight(&self) -> bool {
        self.end_minute() == MINUTES_PER_DAY
    }

    #[must_use]
    pub fn is_active_on(&self, day: Weekday) -> bool {
        self.days.contains(&day)
    }

    /// Length of the class in seconds, zero or less if it doesn't validate.
    #[must_use]
    pub fn duration_secs(&self) -> i64 {
        (i64::from(self.end_minute()) - i64::from(self.start_minute())) * 60
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidClass("id is empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(Error::InvalidClass("name is empty".to_string()));
        }
        if self.start_minute() >= self.end_minute() {
            return Err(Error::InvalidClass(format!(
                "start {} is not before end {}",
                self.start.format("%H:%M"),
                self.end.format("%H:%M")
            )));
        }
        Ok(())
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// The flat, persisted form of a [`ScheduledClass`].
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClassRecord {
    pub id: String,
    pub name: String,
    #[serde(with = "toml_datetime_compat")]
    pub start: NaiveTime,
    #[serde(with = "toml_datetime_compat")]
    pub end: NaiveTime,
    #[serde(default)]
    pub days: Vec<Weekday>,
    #[serde(default = "always_true")]
    pub enabled: bool,
}

impl From<&ScheduledClass> for ClassRecord {
    fn from(class: &ScheduledClass) -> Self {
        Self {
            id: class.id.clone(),
            name: class.name.clone(),
            start: class.start,
            end: class.end,
            days: class.days.clone(),
            enabled: class.enabled,
        }
    }
}

impl TryFrom<ClassRecord> for ScheduledClass {
    type Error = Error;

    fn try_from(record: ClassRecord) -> Result<Self> {
        let class = Self {
            id: record.id.trim().to_string(),
            name: record.name.trim().to_string(),
            start: truncate_to_minute(record.start),
            end: truncate_to_minute(record.end),
            days: normalize_days(record.days),
            enabled: record.enabled,
        };
        class.validate()?;
        Ok(class)
    }
}

#[derive(Debug, Clone)]
pub enum ClassEdit {
    Name(String),
    Start(NaiveTime),
    End(NaiveTime),
    Days(Vec<Weekday>),
}

/// The user's ordered list of classes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    classes: Vec<ScheduledClass>,
}

impl Schedule {
    /// Builds a schedule, dropping (and logging) classes that don't validate
    /// or reuse an id already in the list.
    #[must_use]
    pub fn new(classes: Vec<ScheduledClass>) -> Self {
        let mut schedule = Self::default();
        for class in classes {
            let id = class.id.clone();
            if let Err(e) = schedule.add(class) {
                warn!("dropping class `{id}`: {e}");
            }
        }
        schedule
    }

    #[must_use]
    pub fn classes(&self) -> &[ScheduledClass] {
        &self.classes
    }

    #[must_use]
    pub fn into_classes(self) -> Vec<ScheduledClass> {
        self.classes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.classes
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| Error::UnknownClass(id.to_string()))
    }

    pub fn get(&self, id: &str) -> Result<&ScheduledClass> {
        self.position(id).map(|i| &self.classes[i])
    }

    pub fn add(&mut self, class: ScheduledClass) -> Result<&ScheduledClass> {
        class.validate()?;
        if self.position(&class.id).is_ok() {
            return Err(Error::InvalidClass(format!("duplicate id `{}`", class.id)));
        }
        self.classes.push(class);
        Ok(&self.classes[self.classes.len() - 1])
    }

    pub fn remove(&mut self, id: &str) -> Result<ScheduledClass> {
        let i = self.position(id)?;
        Ok(self.classes.remove(i))
    }

    /// Flips the enabled flag, returning the new value.
    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        let i = self.position(id)?;
        let class = &mut self.classes[i];
        class.enabled = !class.enabled;
        Ok(class.enabled)
    }

    /// Copies a class under a new id, right after the original.
    pub fn duplicate(&mut self, id: &str) -> Result<&ScheduledClass> {
        let i = self.position(id)?;
        let mut copy = self.classes[i].clone();
        copy.id = new_id();
        copy.name = format!("{} (copy)", copy.name);
        self.classes.insert(i + 1, copy);
        Ok(&self.classes[i + 1])
    }

    /// Moves a class to `index`, clamped to the end of the list.
    pub fn move_to(&mut self, id: &str, index: usize) -> Result<()> {
        let i = self.position(id)?;
        let class = self.classes.remove(i);
        let index = index.min(self.classes.len());
        self.classes.insert(index, class);
        Ok(())
    }

    /// Applies all edits or none of them.
    pub fn edit(&mut self, id: &str, edits: Vec<ClassEdit>) -> Result<&ScheduledClass> {
        let i = self.position(id)?;
        let mut class = self.classes[i].clone();
        for edit in edits {
            match edit {
                ClassEdit::Name(name) => class.name = name.trim().to_string(),
                ClassEdit::Start(start) => class.start = truncate_to_minute(start),
                ClassEdit::End(end) => class.end = truncate_to_minute(end),
                ClassEdit::Days(days) => class.days = normalize_days(days),
            }
        }
        class.validate()?;
        self.classes[i] = class;
        Ok(&self.classes[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(text: &str) -> NaiveTime {
        parse_hhmm(text).unwrap()
    }

    fn class(name: &str, start: &str, end: &str) -> ScheduledClass {
        ScheduledClass::new(name, t(start), t(end), vec![Weekday::Mon]).unwrap()
    }

    #[test]
    fn parses_zero_padded_times() {
        assert_eq!(t("08:30"), NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert!(parse_hhmm("8:3x").is_err());
        assert!(parse_hhmm("25:00").is_err());
    }

    #[test]
    fn parses_and_orders_days() {
        let days = parse_days("fri, Mon,wed,mon").unwrap();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]);
        assert!(matches!(parse_days("mon,funday"), Err(Error::InvalidWeekday(_))));
    }

    #[test]
    fn rejects_start_not_before_end() {
        let err = ScheduledClass::new("Math", t("09:00"), t("09:00"), vec![]).unwrap_err();
        assert!(matches!(err, Error::InvalidClass(_)));
        assert!(ScheduledClass::new("Math", t("10:00"), t("09:00"), vec![]).is_err());
        assert!(ScheduledClass::new("  ", t("08:00"), t("09:00"), vec![]).is_err());
    }

    #[test]
    fn midnight_end_means_end_of_day() {
        let late = class("Night", "23:00", "00:00");
        assert!(late.ends_at_midnight());
        assert_eq!(late.end_minute(), MINUTES_PER_DAY);
        assert_eq!(late.duration_secs(), 3600);
    }

    #[test]
    fn new_schedule_drops_invalid_and_duplicate_classes() {
        let good = class("Math", "08:00", "09:00");
        let mut backwards = class("Art", "08:00", "09:00");
        backwards.id = "backwards".to_string();
        backwards.start = t("09:00");
        backwards.end = t("08:00");
        let mut twin = class("Twin", "10:00", "11:00");
        twin.id.clone_from(&good.id);

        let schedule = Schedule::new(vec![good.clone(), backwards, twin]);
        assert_eq!(schedule.classes(), [good]);
    }

    #[test]
    fn inverted_class_has_no_positive_duration() {
        let mut backwards = class("Art", "08:00", "09:00");
        backwards.start = t("09:00");
        backwards.end = t("08:00");
        assert_eq!(backwards.duration_secs(), -3600);
    }

    #[test]
    fn duplicate_inserts_copy_after_original() {
        let mut schedule = Schedule::default();
        let a = schedule.add(class("A", "08:00", "09:00")).unwrap().id.clone();
        schedule.add(class("B", "09:00", "10:00")).unwrap();

        let copy = schedule.duplicate(&a).unwrap().clone();
        assert_ne!(copy.id, a);
        assert_eq!(copy.name, "A (copy)");
        let names: Vec<_> = schedule.classes().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["A", "A (copy)", "B"]);
    }

    #[test]
    fn move_toggle_and_remove() {
        let mut schedule = Schedule::default();
        let a = schedule.add(class("A", "08:00", "09:00")).unwrap().id.clone();
        let b = schedule.add(class("B", "09:00", "10:00")).unwrap().id.clone();

        schedule.move_to(&b, 0).unwrap();
        assert_eq!(schedule.classes()[0].id, b);
        schedule.move_to(&b, 99).unwrap();
        assert_eq!(schedule.classes()[1].id, b);

        assert!(!schedule.toggle(&a).unwrap());
        assert!(!schedule.get(&a).unwrap().enabled);

        schedule.remove(&a).unwrap();
        assert!(matches!(schedule.get(&a), Err(Error::UnknownClass(_))));
    }

    #[test]
    fn failed_edit_leaves_class_unchanged() {
        let mut schedule = Schedule::default();
        let id = schedule.add(class("A", "08:00", "09:00")).unwrap().id.clone();

        let result = schedule.edit(
            &id,
            vec![ClassEdit::Name("Renamed".into()), ClassEdit::End(t("07:00"))],
        );
        assert!(result.is_err());
        assert_eq!(schedule.get(&id).unwrap().name, "A");

        let edited = schedule
            .edit(&id, vec![ClassEdit::Days(vec![Weekday::Sun, Weekday::Sat])])
            .unwrap();
        assert_eq!(edited.days, vec![Weekday::Sat, Weekday::Sun]);
    }
}
