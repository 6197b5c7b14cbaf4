//! A once-a-second wall clock on its own thread.
//!
//! The tick loop must not depend on anything else being awake, so the clock
//! sleeps on a dedicated thread and hands ticks over a small bounded
//! channel. A slow consumer makes ticks coalesce; they are never reordered.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::{Local, NaiveDateTime, Timelike};
use crossbeam_channel::{Receiver, TrySendError};
use log::{debug, info, warn};

use crate::error::{Error, Result};

const TICK_BACKLOG: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub at: NaiveDateTime,
}

#[derive(Debug)]
enum ClockState {
    Stopped,
    Running {
        stop: Arc<AtomicBool>,
        handle: JoinHandle<()>,
    },
    TornDown,
}

#[derive(Debug)]
pub struct ClockSource {
    state: ClockState,
}

impl Default for ClockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: ClockState::Stopped,
        }
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, ClockState::Running { .. })
    }

    /// Starts ticking once per second, on the second.
    pub fn start(&mut self) -> Result<Receiver<Tick>> {
        match self.state {
            ClockState::TornDown => return Err(Error::ClockTornDown),
            ClockState::Running { .. } => return Err(Error::ClockRunning),
            ClockState::Stopped => {}
        }
        let (tx, rx) = crossbeam_channel::bounded(TICK_BACKLOG);
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("class-chime-clock".to_string())
            .spawn(move || {
                while !thread_stop.load(Ordering::Relaxed) {
                    thread::sleep(until_next_second());
                    if thread_stop.load(Ordering::Relaxed) {
                        break;
                    }
                    let tick = Tick {
                        at: Local::now().naive_local(),
                    };
                    match tx.try_send(tick) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => debug!("tick at {} coalesced", tick.at),
                        Err(TrySendError::Disconnected(_)) => break,
                    }
                }
                debug!("clock thread exiting");
            })
            .map_err(Error::ClockSpawn)?;
        info!("clock started");
        self.state = ClockState::Running { stop, handle };
        Ok(rx)
    }

    /// Stops ticking. Safe to call any number of times.
    pub fn stop(&mut self) {
        if let ClockState::Running { stop, handle } =
            std::mem::replace(&mut self.state, ClockState::Stopped)
        {
            stop.store(true, Ordering::Relaxed);
            if handle.join().is_err() {
                warn!("clock thread panicked");
            }
            info!("clock stopped");
        }
    }

    /// Stops the clock for good; a later `start` is an error.
    pub fn tear_down(&mut self) {
        self.stop();
        self.state = ClockState::TornDown;
    }
}

impl Drop for ClockSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn until_next_second() -> Duration {
    let nanos = Local::now().nanosecond() % 1_000_000_000;
    Duration::from_nanos(u64::from(1_000_000_000 - nanos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_arrive_in_order() {
        let mut clock = ClockSource::new();
        let ticks = clock.start().unwrap();
        let first = ticks.recv_timeout(Duration::from_secs(3)).unwrap();
        let second = ticks.recv_timeout(Duration::from_secs(3)).unwrap();
        assert!(second.at > first.at);
        clock.stop();
        assert!(!clock.is_running());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut clock = ClockSource::new();
        clock.stop();
        let _ticks = clock.start().unwrap();
        clock.stop();
        clock.stop();
        assert!(clock.start().is_ok());
    }

    #[test]
    fn cannot_start_twice_or_after_tear_down() {
        let mut clock = ClockSource::new();
        let _ticks = clock.start().unwrap();
        assert!(matches!(clock.start(), Err(Error::ClockRunning)));
        clock.tear_down();
        assert!(matches!(clock.start(), Err(Error::ClockTornDown)));
        clock.tear_down();
    }
}
