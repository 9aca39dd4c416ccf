//! Fire-and-forget run notifications.
//!
//! When a notify command is configured, it is spawned with the message
//! subject and body in `SCRIPTFLOW_SUBJECT` / `SCRIPTFLOW_BODY`. Delivery
//! never blocks the run and failures are only logged.

use std::process::Command;

use crate::config::NotifyConfig;
use crate::{sflog_debug, sflog_warn};

pub struct Notifier {
    config: NotifyConfig,
}

impl Notifier {
    pub fn new(config: NotifyConfig) -> Self {
        Self { config }
    }

    /// Notify about a successful run, if configured.
    pub fn notify_success(&self, subject: &str, body: &str) {
        if self.config.on_success {
            self.send(subject, body);
        }
    }

    /// Notify about a failed run, if configured.
    pub fn notify_failure(&self, subject: &str, body: &str) {
        if self.config.on_failure {
            self.send(subject, body);
        }
    }

    fn send(&self, subject: &str, body: &str) {
        let Some(command) = &self.config.command else {
            sflog_warn!("Notification requested but no notify command configured");
            return;
        };

        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            sflog_warn!("Empty notify command");
            return;
        };

        sflog_debug!("Sending notification: {}", subject);
        let spawned = Command::new(program)
            .args(parts)
            .env("SCRIPTFLOW_SUBJECT", subject)
            .env("SCRIPTFLOW_BODY", body)
            .spawn();

        match spawned {
            Ok(mut child) => {
                // Reap off the critical path.
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => sflog_warn!("Notify command failed to start: {}", e),
        }
    }
}
