//! Alarm sound playback.
//!
//! The rodio output stream lives on its own thread, like the rest of the
//! playback, and is only opened the first time something asks for sound.
//! Failures there never reach the caller directly: they come back as
//! [`AudioReport`]s which the engine folds into the [`AudioGate`].

use std::{fmt, io::Cursor, sync::Arc, thread, time::Duration};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use rodio::{source::SineWave, Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use crate::error::{Error, Result};

const DEFAULT_TONE_HZ: f32 = 880.0;
const DEFAULT_TONE_VOLUME: f32 = 0.2;
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// What to play when an alarm rings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SoundSource {
    /// A generated tone.
    #[default]
    Default,
    /// A user supplied sound file, already loaded.
    Custom { name: String, bytes: Arc<[u8]> },
}

impl fmt::Display for SoundSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default tone"),
            Self::Custom { name, bytes } => write!(f, "{name} ({} bytes)", bytes.len()),
        }
    }
}

/// Asynchronous outcome of a play request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioReport {
    Playing,
    Failed(String),
}

pub trait AudioDevice {
    /// Requests playback from the start of the current source.
    fn play(&mut self, looped: bool) -> Result<()>;
    fn pause(&mut self);
    fn seek_to_start(&mut self);
    fn set_source(&mut self, source: SoundSource);
    /// Zero length play-then-pause, used to find out if sound is allowed.
    fn probe(&mut self) -> Result<()>;
}

/// Whether sound has been unlocked by a user gesture.
///
/// Alarms ring with or without it; it only decides whether the user should
/// be asked to enable sound.
#[derive(Debug, Default)]
pub struct AudioGate {
    unlocked: bool,
}

impl AudioGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only meaningful while handling a user interaction.
    pub fn attempt_unlock<A: AudioDevice + ?Sized>(&mut self, audio: &mut A) -> bool {
        match audio.probe() {
            Ok(()) => {
                if !self.unlocked {
                    info!("audio unlocked");
                }
                self.unlocked = true;
            }
            Err(e) => warn!("couldn't unlock audio: {e}"),
        }
        self.unlocked
    }

    pub fn record(&mut self, report: &AudioReport) {
        match report {
            AudioReport::Playing => self.unlocked = true,
            AudioReport::Failed(reason) => {
                warn!("alarm is ringing silently: {reason}");
                self.unlocked = false;
            }
        }
    }

    pub fn lock(&mut self) {
        self.unlocked = false;
    }

    #[must_use]
    pub const fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Whether to show the "enable sound" prompt.
    #[must_use]
    pub const fn needs_gesture(&self) -> bool {
        !self.unlocked
    }
}

enum AudioCommand {
    Play { looped: bool },
    Pause,
    SeekToStart,
    SetSource(SoundSource),
    Probe(Sender<std::result::Result<(), String>>),
}

/// [`AudioDevice`] backed by rodio on a dedicated thread.
#[derive(Debug)]
pub struct RodioAudio {
    commands: Sender<AudioCommand>,
}

impl fmt::Debug for AudioCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Play { looped } => write!(f, "Play {{ looped: {looped} }}"),
            Self::Pause => write!(f, "Pause"),
            Self::SeekToStart => write!(f, "SeekToStart"),
            Self::SetSource(source) => write!(f, "SetSource({source})"),
            Self::Probe(_) => write!(f, "Probe"),
        }
    }
}

impl RodioAudio {
    /// Starts the audio thread. Play results are sent to `reports`.
    pub fn spawn(source: SoundSource, reports: Sender<AudioReport>) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        thread::Builder::new()
            .name("class-chime-audio".to_string())
            .spawn(move || audio_thread(&rx, &reports, source))?;
        Ok(Self { commands: tx })
    }

    fn send(&self, command: AudioCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::Playback("audio thread has exited".to_string()))
    }
}

impl AudioDevice for RodioAudio {
    fn play(&mut self, looped: bool) -> Result<()> {
        self.send(AudioCommand::Play { looped })
    }

    fn pause(&mut self) {
        if let Err(e) = self.send(AudioCommand::Pause) {
            debug!("pause: {e}");
        }
    }

    fn seek_to_start(&mut self) {
        if let Err(e) = self.send(AudioCommand::SeekToStart) {
            debug!("seek: {e}");
        }
    }

    fn set_source(&mut self, source: SoundSource) {
        if let Err(e) = self.send(AudioCommand::SetSource(source)) {
            warn!("couldn't change sound: {e}");
        }
    }

    fn probe(&mut self) -> Result<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.send(AudioCommand::Probe(tx))?;
        match rx.recv_timeout(PROBE_TIMEOUT) {
            Ok(result) => result.map_err(Error::Playback),
            Err(_) => Err(Error::Playback("audio thread didn't answer".to_string())),
        }
    }
}

struct Output {
    // the sink goes silent once the stream is dropped
    _stream: OutputStream,
    sink: Sink,
}

fn open_output(slot: &mut Option<Output>) -> std::result::Result<&Sink, String> {
    if slot.is_none() {
        let stream = OutputStreamBuilder::open_default_stream().map_err(|e| e.to_string())?;
        let sink = Sink::connect_new(stream.mixer());
        *slot = Some(Output {
            _stream: stream,
            sink,
        });
    }
    slot.as_ref()
        .map(|output| &output.sink)
        .ok_or_else(|| "no audio output".to_string())
}

fn start(sink: &Sink, source: &SoundSource, looped: bool) -> std::result::Result<(), String> {
    sink.clear();
    match source {
        SoundSource::Default => {
            let tone = SineWave::new(DEFAULT_TONE_HZ).amplify(DEFAULT_TONE_VOLUME);
            if looped {
                sink.append(tone);
            } else {
                sink.append(tone.take_duration(Duration::from_secs(1)));
            }
        }
        SoundSource::Custom { name, bytes } => {
            let decoder = Decoder::new(Cursor::new(bytes.to_vec()))
                .map_err(|e| format!("couldn't decode {name}: {e}"))?;
            if looped {
                sink.append(decoder.repeat_infinite());
            } else {
                sink.append(decoder);
            }
        }
    }
    sink.play();
    Ok(())
}

fn audio_thread(
    commands: &Receiver<AudioCommand>,
    reports: &Sender<AudioReport>,
    mut source: SoundSource,
) {
    let mut output = None;
    for command in commands {
        debug!("audio command {command:?}");
        match command {
            AudioCommand::Play { looped } => {
                let report = match open_output(&mut output)
                    .and_then(|sink| start(sink, &source, looped))
                {
                    Ok(()) => AudioReport::Playing,
                    Err(e) => AudioReport::Failed(e),
                };
                if reports.send(report).is_err() {
                    break;
                }
            }
            AudioCommand::Pause => {
                if let Some(output) = &output {
                    output.sink.pause();
                }
            }
            AudioCommand::SeekToStart => {
                if let Some(output) = &output {
                    if let Err(e) = output.sink.try_seek(Duration::ZERO) {
                        debug!("couldn't rewind sound: {e}");
                    }
                }
            }
            AudioCommand::SetSource(new_source) => {
                info!("alarm sound is now {new_source}");
                source = new_source;
            }
            AudioCommand::Probe(reply) => {
                let result = open_output(&mut output).map(|sink| {
                    // leave a ringing alarm alone
                    if sink.empty() {
                        sink.append(SineWave::new(DEFAULT_TONE_HZ).take_duration(Duration::ZERO));
                        sink.play();
                        sink.pause();
                    }
                });
                let _ = reply.send(result);
            }
        }
    }
    debug!("audio thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{AudioCall, RecordingAudio};

    #[test]
    fn unlock_follows_the_probe() {
        let mut gate = AudioGate::new();
        assert!(gate.needs_gesture());

        let mut blocked = RecordingAudio::failing();
        assert!(!gate.attempt_unlock(&mut blocked));
        assert!(!gate.is_unlocked());

        let mut audio = RecordingAudio::default();
        assert!(gate.attempt_unlock(&mut audio));
        assert!(!gate.needs_gesture());
        assert_eq!(audio.calls, vec![AudioCall::Probe]);
    }

    #[test]
    fn playback_reports_fold_into_the_gate() {
        let mut gate = AudioGate::new();
        gate.record(&AudioReport::Playing);
        assert!(gate.is_unlocked());
        gate.record(&AudioReport::Failed("autoplay blocked".into()));
        assert!(!gate.is_unlocked());
    }

    #[test]
    fn custom_source_display_names_the_sound() {
        let source = SoundSource::Custom {
            name: "bell.ogg".into(),
            bytes: Arc::from(vec![0_u8; 4]),
        };
        assert_eq!(source.to_string(), "bell.ogg (4 bytes)");
        assert_eq!(SoundSource::default().to_string(), "default tone");
    }
}
