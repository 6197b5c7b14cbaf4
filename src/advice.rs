//! Optional motivational phrase shown when a session starts.

use std::process::Command;

use log::warn;

use crate::error::{Error, Result};

pub const FALLBACK_ADVICE: &str = "One class at a time. You've got this.";

pub trait AdviceSource {
    fn fetch(&self) -> Result<String>;
}

/// Used when no advice command is configured.
#[derive(Debug, Default)]
pub struct NoAdvice;

impl AdviceSource for NoAdvice {
    fn fetch(&self) -> Result<String> {
        Err(Error::AdviceUnavailable("no advice command configured".to_string()))
    }
}

/// Runs an external command and uses its trimmed stdout as the phrase.
#[derive(Debug)]
pub struct CommandAdvice {
    argv: Vec<String>,
}

impl CommandAdvice {
    #[must_use]
    pub const fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl AdviceSource for CommandAdvice {
    fn fetch(&self) -> Result<String> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(Error::AdviceUnavailable("empty advice command".to_string()));
        };
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| Error::AdviceUnavailable(format!("{program}: {e}")))?;
        if !output.status.success() {
            return Err(Error::AdviceUnavailable(format!(
                "{program} exited with {}",
                output.status
            )));
        }
        let advice = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if advice.is_empty() {
            return Err(Error::AdviceUnavailable(format!("{program} printed nothing")));
        }
        Ok(advice)
    }
}

/// The fetched phrase, or [`FALLBACK_ADVICE`] on any failure.
#[must_use]
pub fn advice_or_fallback<A: AdviceSource + ?Sized>(source: &A) -> String {
    source.fetch().unwrap_or_else(|e| {
        warn!("{e}");
        FALLBACK_ADVICE.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    impl AdviceSource for Fixed {
        fn fetch(&self) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn failures_fall_back_to_the_static_phrase() {
        assert_eq!(advice_or_fallback(&NoAdvice), FALLBACK_ADVICE);
        assert_eq!(advice_or_fallback(&CommandAdvice::new(vec![])), FALLBACK_ADVICE);
        let missing = CommandAdvice::new(vec!["class-chime-no-such-program".into()]);
        assert_eq!(advice_or_fallback(&missing), FALLBACK_ADVICE);
    }

    #[test]
    fn successful_fetch_is_used() {
        assert_eq!(advice_or_fallback(&Fixed("Keep going")), "Keep going");
    }
}
