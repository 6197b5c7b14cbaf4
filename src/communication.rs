use std::{fmt, str::FromStr};

/// Commands sent to a running engine, one per stdin line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Silence the ringing alarm.
    StopAlarm,
    /// Ring the alarm by hand to check the sound.
    TestSound(String),
    /// Enable sound; only works as a direct user action.
    UnlockAudio,
    /// Pick up a sound chosen with `class_chime sound`.
    ReloadSound,
    Status,
    Quit,
}

pub const DEFAULT_TEST_LABEL: &str = "Test sound";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMessage(pub String);

impl fmt::Display for UnknownMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown command `{}` (try stop, test [label], unlock, reload, status, quit)",
            self.0
        )
    }
}

impl FromStr for Message {
    type Err = UnknownMessage;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        match command.to_ascii_lowercase().as_str() {
            "stop" | "s" => Ok(Self::StopAlarm),
            "test" | "t" => {
                let label = rest.trim();
                Ok(Self::TestSound(if label.is_empty() {
                    DEFAULT_TEST_LABEL.to_string()
                } else {
                    label.to_string()
                }))
            }
            "unlock" | "u" => Ok(Self::UnlockAudio),
            "reload" | "r" => Ok(Self::ReloadSound),
            "status" | "" => Ok(Self::Status),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            _ => Err(UnknownMessage(line.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!("stop".parse(), Ok(Message::StopAlarm));
        assert_eq!(" Q ".parse(), Ok(Message::Quit));
        assert_eq!(
            "test".parse(),
            Ok(Message::TestSound(DEFAULT_TEST_LABEL.to_string()))
        );
        assert_eq!(
            "test  fire drill ".parse(),
            Ok(Message::TestSound("fire drill".to_string()))
        );
        assert_eq!("".parse(), Ok(Message::Status));
        assert_eq!("reload".parse(), Ok(Message::ReloadSound));
        assert!("snooze".parse::<Message>().is_err());
    }
}
