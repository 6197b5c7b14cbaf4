#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]

use std::{error::Error, fs, io, path::PathBuf, thread};

use chrono::{Local, NaiveTime, Weekday};
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use class_chime::{
    advice::{advice_or_fallback, AdviceSource, CommandAdvice, NoAdvice},
    alarm::AlarmStateMachine,
    audio::{RodioAudio, SoundSource},
    class::{parse_days, parse_hhmm, ClassEdit, Schedule, ScheduledClass},
    communication::Message,
    config::Config,
    engine::{self, Engine},
    matcher,
    notify::{Notifier, TerminalNotifier},
    store::{
        load_schedule, load_sound, reset_sound, save_custom_sound, save_schedule, FileStore,
        MAX_SOUND_BYTES,
    },
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// whose schedule to use, overrides the config file
    #[clap(long, short)]
    user: Option<String>,
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// write a default config file
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// add a class, times as HH:MM
    Add {
        name: String,
        start: String,
        end: String,
        /// comma separated weekdays
        #[clap(long, short, default_value = "mon,tue,wed,thu,fri")]
        days: String,
        #[clap(long)]
        disabled: bool,
    },
    Edit {
        id: String,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        start: Option<String>,
        #[clap(long)]
        end: Option<String>,
        #[clap(long)]
        days: Option<String>,
    },
    List,
    Remove {
        id: String,
    },
    /// enable or disable a class
    Toggle {
        id: String,
    },
    Duplicate {
        id: String,
    },
    /// move a class to a position in the list
    Move {
        id: String,
        index: usize,
    },
    Sound {
        #[clap(subcommand)]
        action: SoundAction,
    },
    /// show the ongoing class
    Status,
    /// watch the schedule and ring when classes end (the default)
    Run,
}

#[derive(Subcommand)]
enum SoundAction {
    /// use a sound file as the alarm
    Set {
        path: PathBuf,
        #[clap(long)]
        name: Option<String>,
    },
    /// go back to the default tone
    Reset,
    Show,
}

fn main() -> Result<(), Box<dyn Error>> {
    // initilize the logger
    simple_file_logger::init_logger!("class_chime").expect("couldn't initialize logger");

    let args = Args::parse();
    let mut config = load_config()?;
    if let Some(user) = args.user {
        config.user = user;
    }
    let store = FileStore::for_user(&Config::data_path()?, &config.user);

    match args.command.unwrap_or(Command::Run) {
        Command::Init { force } => {
            if force && Config::is_config_present() || !Config::is_config_present() {
                let path = Config::config_path()?;
                Config::new().save(&path)?;
                println!("wrote {}", path.display());
            } else {
                println!("config already exists, use --force to overwrite it");
            }
        }
        Command::Add {
            name,
            start,
            end,
            days,
            disabled,
        } => {
            let mut schedule = load_schedule(&store)?;
            let mut class =
                ScheduledClass::new(&name, parse_hhmm(&start)?, parse_hhmm(&end)?, parse_days(&days)?)?;
            class.enabled = !disabled;
            let added = schedule.add(class)?.clone();
            save_schedule(&store, &schedule)?;
            println!("added {}", describe(&added, &config.time_format));
        }
        Command::Edit {
            id,
            name,
            start,
            end,
            days,
        } => {
            let mut edits = Vec::new();
            if let Some(name) = name {
                edits.push(ClassEdit::Name(name));
            }
            if let Some(start) = start {
                edits.push(ClassEdit::Start(parse_hhmm(&start)?));
            }
            if let Some(end) = end {
                edits.push(ClassEdit::End(parse_hhmm(&end)?));
            }
            if let Some(days) = days {
                edits.push(ClassEdit::Days(parse_days(&days)?));
            }
            let mut schedule = load_schedule(&store)?;
            let edited = schedule.edit(&id, edits)?.clone();
            save_schedule(&store, &schedule)?;
            println!("updated {}", describe(&edited, &config.time_format));
        }
        Command::List => {
            let schedule = load_schedule(&store)?;
            if schedule.is_empty() {
                println!("no classes yet, add one with `class_chime add`");
            }
            for (i, class) in schedule.classes().iter().enumerate() {
                println!("{i:>2}. {}", describe(class, &config.time_format));
            }
        }
        Command::Remove { id } => {
            let mut schedule = load_schedule(&store)?;
            let removed = schedule.remove(&id)?;
            save_schedule(&store, &schedule)?;
            println!("removed {}", removed.name);
        }
        Command::Toggle { id } => {
            let mut schedule = load_schedule(&store)?;
            let enabled = schedule.toggle(&id)?;
            save_schedule(&store, &schedule)?;
            println!("{id} is now {}", if enabled { "enabled" } else { "disabled" });
        }
        Command::Duplicate { id } => {
            let mut schedule = load_schedule(&store)?;
            let copy = schedule.duplicate(&id)?.clone();
            save_schedule(&store, &schedule)?;
            println!("added {}", describe(&copy, &config.time_format));
        }
        Command::Move { id, index } => {
            let mut schedule = load_schedule(&store)?;
            schedule.move_to(&id, index)?;
            save_schedule(&store, &schedule)?;
        }
        Command::Sound { action } => sound(&store, action)?,
        Command::Status => {
            let schedule = load_schedule(&store)?;
            let now = Local::now().naive_local();
            println!("{}", matcher::describe(schedule.classes(), now));
        }
        Command::Run => run(&config, &store)?,
    }
    Ok(())
}

fn load_config() -> Result<Config, Box<dyn Error>> {
    if Config::is_config_present() {
        Ok(Config::load(&Config::config_path()?)?)
    } else {
        info!("no config file, using defaults");
        Ok(Config::default())
    }
}

fn describe(class: &ScheduledClass, time_format: &str) -> String {
    let days: Vec<String> = class.days.iter().map(Weekday::to_string).collect();
    format!(
        "{} {} {}-{} [{}]{}",
        class.id,
        class.name,
        format_time(class.start, time_format),
        format_time(class.end, time_format),
        days.join(","),
        if class.enabled { "" } else { " (disabled)" }
    )
}

fn format_time(time: NaiveTime, time_format: &str) -> String {
    time.format(time_format).to_string().trim().to_string()
}

fn sound(store: &FileStore, action: SoundAction) -> Result<(), Box<dyn Error>> {
    match action {
        SoundAction::Set { path, name } => {
            // check before reading so a huge file is never loaded
            let size = usize::try_from(fs::metadata(&path)?.len()).unwrap_or(usize::MAX);
            if size > MAX_SOUND_BYTES {
                return Err(class_chime::Error::OversizeAsset {
                    size,
                    limit: MAX_SOUND_BYTES,
                }
                .into());
            }
            let name = name.unwrap_or_else(|| {
                path.file_name()
                    .map_or_else(|| "custom".to_string(), |n| n.to_string_lossy().to_string())
            });
            let source = save_custom_sound(store, &name, fs::read(&path)?)?;
            println!("alarm sound is now {source}, type `reload` in a running session to use it");
        }
        SoundAction::Reset => {
            reset_sound(store)?;
            println!("alarm sound is now {}", SoundSource::Default);
        }
        SoundAction::Show => println!("{}", load_sound(store)?),
    }
    Ok(())
}

fn run(config: &Config, store: &FileStore) -> Result<(), Box<dyn Error>> {
    let schedule = load_schedule(store).unwrap_or_else(|e| {
        error!("couldn't load schedule, starting empty: {e}");
        Schedule::default()
    });
    let sound = load_sound(store).unwrap_or_else(|e| {
        warn!("using the default sound: {e}");
        SoundSource::Default
    });

    let (report_tx, report_rx) = crossbeam_channel::unbounded();
    let audio = RodioAudio::spawn(sound, report_tx)?;
    let mut notifier = TerminalNotifier::new(config.notifications);
    notifier.request_permission();
    let alarm = AlarmStateMachine::new(audio, notifier, config.auto_stop_secs);
    let mut engine = Engine::new(schedule, alarm);

    let advice: Box<dyn AdviceSource> = match &config.advice_command {
        Some(argv) => Box::new(CommandAdvice::new(argv.clone())),
        None => Box::new(NoAdvice),
    };
    println!("{}", advice_or_fallback(advice.as_ref()));
    println!(
        "watching {} classes for {} (stop, test [label], unlock, reload, status, quit)",
        engine.schedule().len(),
        config.user
    );

    let (control_tx, control_rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("class-chime-input".to_string())
        .spawn(move || {
            for line in io::stdin().lines() {
                let Ok(line) = line else { break };
                match line.parse::<Message>() {
                    Ok(message) => {
                        if control_tx.send(message).is_err() {
                            break;
                        }
                    }
                    Err(e) => eprintln!("{e}"),
                }
            }
        })?;

    engine::run(&mut engine, store, control_rx, report_rx);
    info!("bye");
    Ok(())
}
