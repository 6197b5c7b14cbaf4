//! Recording fakes for the audio device and notification surface.

use crate::{
    audio::{AudioDevice, SoundSource},
    error::{Error, Result},
    notify::{Notifier, Permission},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCall {
    Play { looped: bool },
    Pause,
    SeekToStart,
    SetSource(SoundSource),
    Probe,
}

#[derive(Debug, Default)]
pub struct RecordingAudio {
    pub calls: Vec<AudioCall>,
    pub blocked: bool,
}

impl RecordingAudio {
    /// Refuses to play, like a host that hasn't seen a user gesture.
    pub fn failing() -> Self {
        Self {
            calls: Vec::new(),
            blocked: true,
        }
    }
}

impl AudioDevice for RecordingAudio {
    fn play(&mut self, looped: bool) -> Result<()> {
        self.calls.push(AudioCall::Play { looped });
        if self.blocked {
            return Err(Error::Playback("blocked".to_string()));
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.calls.push(AudioCall::Pause);
    }

    fn seek_to_start(&mut self) {
        self.calls.push(AudioCall::SeekToStart);
    }

    fn set_source(&mut self, source: SoundSource) {
        self.calls.push(AudioCall::SetSource(source));
    }

    fn probe(&mut self) -> Result<()> {
        self.calls.push(AudioCall::Probe);
        if self.blocked {
            return Err(Error::Playback("blocked".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub permission: Permission,
    /// `(title, body, tag)` of every notification shown.
    pub shown: Vec<(String, String, String)>,
}

impl RecordingNotifier {
    pub fn granted() -> Self {
        Self {
            permission: Permission::Granted,
            shown: Vec::new(),
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: Permission::Denied,
            shown: Vec::new(),
        }
    }
}

impl Notifier for RecordingNotifier {
    fn permission(&self) -> Permission {
        self.permission
    }

    fn request_permission(&mut self) -> Permission {
        if self.permission == Permission::Unrequested {
            self.permission = Permission::Granted;
        }
        self.permission
    }

    fn show(&mut self, title: &str, body: &str, tag: &str) -> Result<()> {
        self.shown
            .push((title.to_string(), body.to_string(), tag.to_string()));
        Ok(())
    }
}
