use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use class_chime::{
    alarm::{AlarmKind, AlarmState, AlarmStateMachine},
    audio::{AudioDevice, SoundSource},
    class::{Schedule, ScheduledClass},
    engine::Engine,
    notify::{Notifier, Permission},
    store::{load_schedule, save_schedule, FileStore},
    Result,
};

#[derive(Debug, Default)]
struct Speaker {
    playing: bool,
    plays: usize,
}

impl AudioDevice for Speaker {
    fn play(&mut self, _looped: bool) -> Result<()> {
        self.playing = true;
        self.plays += 1;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek_to_start(&mut self) {}

    fn set_source(&mut self, _source: SoundSource) {}

    fn probe(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Inbox {
    tags: Vec<String>,
}

impl Notifier for Inbox {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn show(&mut self, _title: &str, _body: &str, tag: &str) -> Result<()> {
        self.tags.push(tag.to_string());
        Ok(())
    }
}

/// 2024-06-02 is a Sunday.
fn sunday(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 2)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

fn first_class() -> ScheduledClass {
    ScheduledClass {
        id: "1".to_string(),
        name: "Math".to_string(),
        start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        end: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
        days: vec![Weekday::Sun],
        enabled: true,
    }
}

fn new_engine(classes: Vec<ScheduledClass>) -> Engine<Speaker, Inbox> {
    Engine::new(
        Schedule::new(classes),
        AlarmStateMachine::new(Speaker::default(), Inbox::default(), 20),
    )
}

#[test]
fn class_end_rings_then_auto_stops() {
    let mut engine = new_engine(vec![first_class()]);

    let outcome = engine.on_tick(sunday(8, 30, 0));
    assert_eq!(outcome.fired, ["1"]);
    let event = engine.alarm().event().unwrap();
    assert_eq!(event.class_name, "Math");
    assert_eq!(event.kind, AlarmKind::ScheduleEnd);
    assert!(engine.alarm().audio().playing);
    assert_eq!(engine.alarm().notifier().tags, ["class-end-Math"]);

    for s in 1..20 {
        let outcome = engine.on_tick(sunday(8, 30, s));
        assert!(outcome.fired.is_empty());
        assert!(engine.alarm().is_ringing(), "stopped early at second {s}");
    }

    assert!(engine.on_tick(sunday(8, 30, 20)).auto_stopped);
    assert_eq!(engine.alarm().state(), &AlarmState::Idle);
    assert!(!engine.alarm().audio().playing);
    assert_eq!(engine.alarm().audio().plays, 1);

    // the rest of the minute stays quiet
    for s in 21..60 {
        assert!(engine.on_tick(sunday(8, 30, s)).fired.is_empty());
    }
    assert_eq!(engine.alarm().audio().plays, 1);
}

#[test]
fn a_week_of_ticks_rings_once_per_active_day() {
    let mut class = first_class();
    class.days = vec![Weekday::Mon, Weekday::Wed];
    let mut engine = new_engine(vec![class]);

    let monday = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
    let mut rang = Vec::new();
    for day in monday.iter_days().take(7) {
        for minute in 0..24 * 60 {
            for second in [0, 30] {
                let at = day.and_hms_opt(minute / 60, minute % 60, second).unwrap();
                if !engine.on_tick(at).fired.is_empty() {
                    rang.push(at);
                }
            }
        }
    }
    assert_eq!(
        rang,
        [
            monday.and_hms_opt(8, 30, 0).unwrap(),
            monday
                .succ_opt()
                .and_then(|d| d.succ_opt())
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap(),
        ]
    );
}

#[test]
fn stored_schedule_drives_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::for_user(dir.path(), "default");
    let mut schedule = Schedule::default();
    schedule.add(first_class()).unwrap();
    save_schedule(&store, &schedule).unwrap();

    let mut engine = new_engine(Vec::new());
    engine.replace_schedule(load_schedule(&store).unwrap());
    assert_eq!(engine.on_tick(sunday(8, 30, 0)).fired, ["1"]);
}
