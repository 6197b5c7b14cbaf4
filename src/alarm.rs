//! The ringing/idle alarm state machine.
//!
//! ```text
//!            trigger_from_schedule / trigger_manual_test
//!   Idle ─────────────────────────────────────────────► Ringing
//!    ▲                                                     │
//!    └──────────── stop() / auto-stop deadline ────────────┘
//! ```
//!
//! Triggers are only honoured while idle: a class ending while another
//! alarm rings is dropped, not queued. The auto-stop deadline lives inside
//! the `Ringing` variant, so there is never more than one outstanding and
//! leaving `Ringing` always cancels it.

use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta};
use log::{info, warn};

use crate::{
    audio::AudioDevice,
    error::Error,
    notify::{Notifier, Permission},
};

pub const DEFAULT_AUTO_STOP_SECS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmKind {
    ScheduleEnd,
    ManualTest,
}

/// The alarm currently ringing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmEvent {
    pub class_name: String,
    pub kind: AlarmKind,
    pub activated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AlarmState {
    #[default]
    Idle,
    Ringing {
        event: AlarmEvent,
        stop_at: NaiveDateTime,
    },
}

/// Result of a trigger request.
#[derive(Debug)]
pub enum Trigger {
    /// Another alarm is ringing; nothing changed.
    Dropped,
    Ringing,
    /// Ringing, but the sound couldn't be started.
    RingingSilently(Error),
}

impl Trigger {
    #[must_use]
    pub const fn is_ringing(&self) -> bool {
        !matches!(self, Self::Dropped)
    }
}

#[derive(Debug)]
pub struct AlarmStateMachine<A, N> {
    state: AlarmState,
    auto_stop: TimeDelta,
    audio: A,
    notifier: N,
}

impl<A: AudioDevice, N: Notifier> AlarmStateMachine<A, N> {
    pub fn new(audio: A, notifier: N, auto_stop_secs: u32) -> Self {
        Self {
            state: AlarmState::Idle,
            auto_stop: TimeDelta::seconds(i64::from(auto_stop_secs)),
            audio,
            notifier,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &AlarmState {
        &self.state
    }

    #[must_use]
    pub const fn event(&self) -> Option<&AlarmEvent> {
        match &self.state {
            AlarmState::Idle => None,
            AlarmState::Ringing { event, .. } => Some(event),
        }
    }

    #[must_use]
    pub const fn is_ringing(&self) -> bool {
        matches!(self.state, AlarmState::Ringing { .. })
    }

    /// When the ringing alarm stops by itself.
    #[must_use]
    pub const fn deadline(&self) -> Option<NaiveDateTime> {
        match &self.state {
            AlarmState::Idle => None,
            AlarmState::Ringing { stop_at, .. } => Some(*stop_at),
        }
    }

    /// Time left before the auto-stop, zero if it is overdue.
    #[must_use]
    pub fn time_until_stop(&self, now: NaiveDateTime) -> Option<Duration> {
        self.deadline()
            .map(|stop_at| (stop_at - now).to_std().unwrap_or(Duration::ZERO))
    }

    pub fn trigger_from_schedule(&mut self, class_name: &str, now: NaiveDateTime) -> Trigger {
        self.ring(class_name, AlarmKind::ScheduleEnd, now)
    }

    pub fn trigger_manual_test(&mut self, label: &str, now: NaiveDateTime) -> Trigger {
        self.ring(label, AlarmKind::ManualTest, now)
    }

    fn ring(&mut self, name: &str, kind: AlarmKind, now: NaiveDateTime) -> Trigger {
        if let Some(current) = self.event() {
            info!(
                "dropping {kind:?} alarm for {name}, {} is still ringing",
                current.class_name
            );
            return Trigger::Dropped;
        }
        info!("ringing {kind:?} alarm for {name}");
        self.state = AlarmState::Ringing {
            event: AlarmEvent {
                class_name: name.to_string(),
                kind,
                activated_at: now,
            },
            stop_at: now + self.auto_stop,
        };

        let trigger = match self.audio.play(true) {
            Ok(()) => Trigger::Ringing,
            Err(e) => {
                warn!("alarm for {name} has no sound: {e}");
                Trigger::RingingSilently(e)
            }
        };
        if kind == AlarmKind::ScheduleEnd {
            self.notify(name);
        }
        trigger
    }

    fn notify(&mut self, class_name: &str) {
        if self.notifier.permission() != Permission::Granted {
            return;
        }
        let body = format!("{class_name} has ended");
        let tag = format!("class-end-{class_name}");
        if let Err(e) = self.notifier.show("Class over", &body, &tag) {
            warn!("{e}");
        }
    }

    /// Silences the alarm. Does nothing when idle.
    pub fn stop(&mut self) -> Option<AlarmEvent> {
        match std::mem::take(&mut self.state) {
            AlarmState::Idle => None,
            AlarmState::Ringing { event, .. } => {
                self.audio.pause();
                self.audio.seek_to_start();
                info!("stopped alarm for {}", event.class_name);
                Some(event)
            }
        }
    }

    /// Stops the alarm if its auto-stop deadline has passed.
    pub fn expire(&mut self, now: NaiveDateTime) -> Option<AlarmEvent> {
        match self.deadline() {
            Some(stop_at) if now >= stop_at => {
                info!("auto-stopping alarm");
                self.stop()
            }
            _ => None,
        }
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    #[must_use]
    pub const fn audio(&self) -> &A {
        &self.audio
    }

    #[must_use]
    pub const fn notifier(&self) -> &N {
        &self.notifier
    }
}
