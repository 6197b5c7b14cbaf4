//! Ties the clock, matcher, dedup tracker and alarm together.
//!
//! All engine state sits behind `&mut Engine`, and [`run`] is its only
//! owner while running: ticks, control messages and audio reports are
//! pulled off their channels and handled one at a time, so a tick is
//! always fully processed before the next one is looked at.

use std::{fmt, time::Duration};

use chrono::{Local, NaiveDateTime};
use crossbeam_channel::{never, select, Receiver};
use log::{error, info, warn};

use crate::{
    alarm::{AlarmEvent, AlarmStateMachine, Trigger},
    audio::{AudioDevice, AudioGate, AudioReport, SoundSource},
    class::{Schedule, ScheduledClass},
    clock::{ClockSource, Tick},
    communication::Message,
    matcher::{evaluate, ongoing, Progress, NO_CLASS},
    notify::Notifier,
    store::{load_schedule, load_sound, Store},
    tracker::{minute_stamp, FiredEventTracker},
};

/// Longest the loop sleeps without a tick while degraded.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// What the caller should do after [`Engine::handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Show [`Engine::status`] to the user.
    ShowStatus,
    Quit,
}

/// What a single tick did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    /// Id of the ongoing class.
    pub ongoing: Option<String>,
    /// Ids of classes that passed dedup and were handed to the alarm.
    pub fired: Vec<String>,
    /// The ringing alarm hit its auto-stop deadline.
    pub auto_stopped: bool,
}

#[derive(Debug)]
pub struct Engine<A, N> {
    schedule: Vec<ScheduledClass>,
    tracker: FiredEventTracker,
    alarm: AlarmStateMachine<A, N>,
    gate: AudioGate,
}

impl<A: AudioDevice, N: Notifier> Engine<A, N> {
    pub fn new(schedule: Schedule, alarm: AlarmStateMachine<A, N>) -> Self {
        Self {
            schedule: schedule.into_classes(),
            tracker: FiredEventTracker::new(),
            alarm,
            gate: AudioGate::new(),
        }
    }

    #[must_use]
    pub fn schedule(&self) -> &[ScheduledClass] {
        &self.schedule
    }

    pub fn replace_schedule(&mut self, schedule: Schedule) {
        self.schedule = schedule.into_classes();
    }

    #[must_use]
    pub const fn alarm(&self) -> &AlarmStateMachine<A, N> {
        &self.alarm
    }

    pub fn alarm_mut(&mut self) -> &mut AlarmStateMachine<A, N> {
        &mut self.alarm
    }

    #[must_use]
    pub const fn gate(&self) -> &AudioGate {
        &self.gate
    }

    pub fn on_tick(&mut self, now: NaiveDateTime) -> TickOutcome {
        let auto_stopped = self.alarm.expire(now).is_some();

        let minute = minute_stamp(now);
        self.tracker.roll_over(minute);
        let evaluation = evaluate(&self.schedule, now);

        let mut fired = Vec::new();
        for class in evaluation.boundary_hits {
            if !self.tracker.should_fire(&class.id, minute) {
                continue;
            }
            fired.push(class.id.clone());
            let trigger = self.alarm.trigger_from_schedule(&class.name, now);
            fold_trigger(&mut self.gate, &trigger);
        }

        TickOutcome {
            ongoing: evaluation.ongoing.map(|c| c.id.clone()),
            fired,
            auto_stopped,
        }
    }

    /// Stops the alarm if its deadline passed between ticks.
    pub fn expire(&mut self, now: NaiveDateTime) -> Option<AlarmEvent> {
        self.alarm.expire(now)
    }

    /// Applies a control message. `store` is read for [`Message::ReloadSound`].
    pub fn handle<S: Store + ?Sized>(
        &mut self,
        message: Message,
        store: &S,
        now: NaiveDateTime,
    ) -> Flow {
        match message {
            Message::StopAlarm => {
                if self.alarm.stop().is_none() {
                    info!("stop requested but no alarm is ringing");
                }
            }
            Message::TestSound(label) => {
                // a test press is a user gesture, so it can unlock sound too
                self.gate.attempt_unlock(self.alarm.audio_mut());
                let trigger = self.alarm.trigger_manual_test(&label, now);
                fold_trigger(&mut self.gate, &trigger);
            }
            Message::UnlockAudio => {
                self.gate.attempt_unlock(self.alarm.audio_mut());
            }
            Message::ReloadSound => match load_sound(store) {
                Ok(source) => self.set_sound(source),
                Err(e) => warn!("keeping the current sound: {e}"),
            },
            Message::Status => return Flow::ShowStatus,
            Message::Quit => {
                self.alarm.stop();
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    pub fn set_sound(&mut self, source: SoundSource) {
        self.alarm.audio_mut().set_source(source);
    }

    pub fn record_audio(&mut self, report: &AudioReport) {
        self.gate.record(report);
    }

    #[must_use]
    pub fn status(&self, now: NaiveDateTime) -> EngineStatus {
        EngineStatus {
            ongoing: ongoing(&self.schedule, now).map(|o| o.progress()),
            ringing: self.alarm.event().cloned(),
            sound_unlocked: self.gate.is_unlocked(),
        }
    }
}

fn fold_trigger(gate: &mut AudioGate, trigger: &Trigger) {
    if let Trigger::RingingSilently(_) = trigger {
        gate.lock();
    }
}

/// A printable snapshot of the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    pub ongoing: Option<Progress>,
    pub ringing: Option<AlarmEvent>,
    pub sound_unlocked: bool,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ongoing {
            Some(progress) => write!(f, "{progress}")?,
            None => write!(f, "{NO_CLASS}")?,
        }
        if let Some(event) = &self.ringing {
            write!(f, " | ringing for {} ({:?})", event.class_name, event.kind)?;
        }
        if !self.sound_unlocked {
            write!(f, " | sound locked, type `unlock` to enable")?;
        }
        Ok(())
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn reload_schedule<A, N, S>(engine: &mut Engine<A, N>, store: &S)
where
    A: AudioDevice,
    N: Notifier,
    S: Store + ?Sized,
{
    match load_schedule(store) {
        Ok(schedule) if schedule.classes() != engine.schedule() => {
            info!("schedule changed, {} classes", schedule.classes().len());
            engine.replace_schedule(schedule);
        }
        Ok(_) => {}
        Err(e) => warn!("keeping the current schedule, couldn't reload: {e}"),
    }
}

fn clock_tick<A, N, S>(
    engine: &mut Engine<A, N>,
    store: &S,
    last_minute: &mut Option<i64>,
    at: NaiveDateTime,
) where
    A: AudioDevice,
    N: Notifier,
    S: Store + ?Sized,
{
    let minute = minute_stamp(at);
    if *last_minute != Some(minute) {
        *last_minute = Some(minute);
        reload_schedule(engine, store);
    }
    let outcome = engine.on_tick(at);
    for id in &outcome.fired {
        info!("class {id} ended at {at}");
    }
}

enum Event {
    Tick(Option<NaiveDateTime>),
    Control(Option<Message>),
    Audio(Option<AudioReport>),
    Idle,
}

/// Runs the engine until a [`Message::Quit`] arrives.
///
/// The schedule is re-read from `store` at each new minute, so edits made
/// by other processes are picked up. If the clock thread can't be started
/// the loop keeps time by itself instead.
pub fn run<A, N, S>(
    engine: &mut Engine<A, N>,
    store: &S,
    controls: Receiver<Message>,
    reports: Receiver<AudioReport>,
) where
    A: AudioDevice,
    N: Notifier,
    S: Store + ?Sized,
{
    let mut clock = ClockSource::new();
    let ticks = match clock.start() {
        Ok(ticks) => Some(ticks),
        Err(e) => {
            error!("clock unavailable, keeping time in the engine loop: {e}");
            None
        }
    };
    drive(engine, store, ticks, controls, reports);
    clock.tear_down();
}

/// The loop behind [`run`]. Without `ticks` it keeps time by itself.
fn drive<A, N, S>(
    engine: &mut Engine<A, N>,
    store: &S,
    ticks: Option<Receiver<Tick>>,
    mut controls: Receiver<Message>,
    mut reports: Receiver<AudioReport>,
) where
    A: AudioDevice,
    N: Notifier,
    S: Store + ?Sized,
{
    let mut degraded = ticks.is_none();
    let mut ticks = ticks.unwrap_or_else(never);
    let mut last_minute = None;

    loop {
        let timeout = engine
            .alarm()
            .time_until_stop(now())
            .map_or(POLL_INTERVAL, |left| left.min(POLL_INTERVAL));
        let event = select! {
            recv(ticks) -> tick => Event::Tick(tick.ok().map(|t| t.at)),
            recv(controls) -> message => Event::Control(message.ok()),
            recv(reports) -> report => Event::Audio(report.ok()),
            default(timeout) => Event::Idle,
        };
        match event {
            Event::Tick(Some(at)) => clock_tick(engine, store, &mut last_minute, at),
            Event::Tick(None) => {
                error!("clock stopped unexpectedly, keeping time in the engine loop");
                ticks = never();
                degraded = true;
            }
            Event::Control(Some(message)) => match engine.handle(message, store, now()) {
                Flow::Continue => {}
                Flow::ShowStatus => println!("{}", engine.status(now())),
                Flow::Quit => break,
            },
            Event::Control(None) => {
                info!("control input closed");
                controls = never();
            }
            Event::Audio(Some(report)) => engine.record_audio(&report),
            Event::Audio(None) => {
                warn!("audio thread is gone, alarms will be silent");
                reports = never();
            }
            Event::Idle => {
                if degraded {
                    clock_tick(engine, store, &mut last_minute, now());
                }
            }
        }
        engine.expire(now());
    }
}
