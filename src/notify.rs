use std::io::{self, Write};

use log::info;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Permission {
    #[default]
    Unrequested,
    Granted,
    Denied,
}

/// A place to show "class is over" notifications.
pub trait Notifier {
    fn permission(&self) -> Permission;
    fn request_permission(&mut self) -> Permission;
    /// Shows a notification; a newer one with the same `tag` replaces the old.
    fn show(&mut self, title: &str, body: &str, tag: &str) -> Result<()>;
}

/// Writes notifications to the terminal, ringing the bell.
#[derive(Debug)]
pub struct TerminalNotifier {
    enabled: bool,
    permission: Permission,
}

impl TerminalNotifier {
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled,
            permission: Permission::Unrequested,
        }
    }
}

impl Notifier for TerminalNotifier {
    fn permission(&self) -> Permission {
        self.permission
    }

    fn request_permission(&mut self) -> Permission {
        if self.permission == Permission::Unrequested {
            self.permission = if self.enabled {
                Permission::Granted
            } else {
                Permission::Denied
            };
            info!("notification permission: {:?}", self.permission);
        }
        self.permission
    }

    fn show(&mut self, title: &str, body: &str, tag: &str) -> Result<()> {
        info!("notification [{tag}] {title}: {body}");
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "\x07{title}: {body}")
            .and_then(|()| stdout.flush())
            .map_err(|e| Error::Notification(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_is_decided_once() {
        let mut notifier = TerminalNotifier::new(true);
        assert_eq!(notifier.permission(), Permission::Unrequested);
        assert_eq!(notifier.request_permission(), Permission::Granted);

        let mut muted = TerminalNotifier::new(false);
        assert_eq!(muted.request_permission(), Permission::Denied);
        assert_eq!(muted.request_permission(), Permission::Denied);
    }
}
