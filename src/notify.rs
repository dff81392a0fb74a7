//! Notification sink
//!
//! Fire-and-forget user-facing messages ("toasts"). The core never reads
//! anything back from the sink.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Success,
    Info,
    Error,
}

impl fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyLevel::Success => write!(f, "success"),
            NotifyLevel::Info => write!(f, "info"),
            NotifyLevel::Error => write!(f, "error"),
        }
    }
}

/// Receives human-readable messages
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotifyLevel, message: &str);
}

/// Forwards notifications to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Error => tracing::warn!(target: "querybench::notify", %level, "{message}"),
            _ => tracing::info!(target: "querybench::notify", %level, "{message}"),
        }
    }
}
