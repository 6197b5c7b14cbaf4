//! Per-user persistence of the schedule and the alarm sound.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use base64::{prelude::BASE64_STANDARD, Engine};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    audio::SoundSource,
    class::{ClassRecord, Schedule, ScheduledClass},
    error::{Error, Result},
};

pub const SCHEDULE_KEY: &str = "schedule";
pub const SOUND_KEY: &str = "sound";
/// Largest custom sound accepted, in bytes.
pub const MAX_SOUND_BYTES: usize = 2 * 1024 * 1024;

/// Key-value storage scoped to one user.
pub trait Store {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// One TOML file per key inside a user's directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    #[must_use]
    pub fn for_user(root: &Path, user: &str) -> Self {
        let user: String = user
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Self::new(root.join(user))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.toml"))
    }
}

impl Store for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        // write then rename so a running daemon never reads half a file
        let tmp = self.dir.join(format!(".{key}.toml.tmp"));
        std::fs::write(&tmp, value)?;
        std::fs::rename(tmp, self.path(key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Deserialize)]
struct StoredSchedule {
    #[serde(default)]
    classes: Vec<toml::Value>,
}

#[derive(Serialize)]
struct SavedSchedule {
    classes: Vec<ClassRecord>,
}

/// Loads the schedule, skipping (and logging) records that don't validate.
pub fn load_schedule<S: Store + ?Sized>(store: &S) -> Result<Schedule> {
    let Some(text) = store.load(SCHEDULE_KEY)? else {
        return Ok(Schedule::default());
    };
    let stored: StoredSchedule = toml::from_str(&text)?;
    let mut classes = Vec::with_capacity(stored.classes.len());
    for (index, value) in stored.classes.into_iter().enumerate() {
        match parse_record(index, value, &classes) {
            Ok(class) => classes.push(class),
            Err(e) => warn!("skipping {e}"),
        }
    }
    Ok(Schedule::new(classes))
}

fn parse_record(
    index: usize,
    value: toml::Value,
    loaded: &[ScheduledClass],
) -> Result<ScheduledClass> {
    let malformed = |reason: String| Error::MalformedRecord { index, reason };
    let record: ClassRecord = value
        .try_into()
        .map_err(|e: toml::de::Error| malformed(e.message().to_string()))?;
    let class = ScheduledClass::try_from(record).map_err(|e| malformed(e.to_string()))?;
    if loaded.iter().any(|c| c.id == class.id) {
        return Err(malformed(format!("duplicate id `{}`", class.id)));
    }
    Ok(class)
}

pub fn save_schedule<S: Store + ?Sized>(store: &S, schedule: &Schedule) -> Result<()> {
    let saved = SavedSchedule {
        classes: schedule.classes().iter().map(ClassRecord::from).collect(),
    };
    store.save(SCHEDULE_KEY, &toml::to_string(&saved)?)
}

#[derive(Serialize, Deserialize)]
struct StoredSound {
    name: String,
    /// base64 of the sound file
    data: String,
}

/// The user's alarm sound, the default tone if none was chosen.
pub fn load_sound<S: Store + ?Sized>(store: &S) -> Result<SoundSource> {
    let Some(text) = store.load(SOUND_KEY)? else {
        return Ok(SoundSource::Default);
    };
    let stored: StoredSound = toml::from_str(&text)?;
    let bytes = BASE64_STANDARD.decode(stored.data)?;
    check_size(bytes.len())?;
    Ok(SoundSource::Custom {
        name: stored.name,
        bytes: Arc::from(bytes),
    })
}

/// Stores a custom sound. Oversized sounds are rejected before anything is
/// written, so the previous choice stays in place.
pub fn save_custom_sound<S: Store + ?Sized>(
    store: &S,
    name: &str,
    bytes: Vec<u8>,
) -> Result<SoundSource> {
    check_size(bytes.len())?;
    let stored = StoredSound {
        name: name.to_string(),
        data: BASE64_STANDARD.encode(&bytes),
    };
    store.save(SOUND_KEY, &toml::to_string(&stored)?)?;
    Ok(SoundSource::Custom {
        name: stored.name,
        bytes: Arc::from(bytes),
    })
}

/// Goes back to the default tone.
pub fn reset_sound<S: Store + ?Sized>(store: &S) -> Result<()> {
    store.remove(SOUND_KEY)
}

fn check_size(size: usize) -> Result<()> {
    if size > MAX_SOUND_BYTES {
        return Err(Error::OversizeAsset {
            size,
            limit: MAX_SOUND_BYTES,
        });
    }
    Ok(())
}
