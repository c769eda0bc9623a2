//! Seams to the presentation layer: transient toasts and hard redirects

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Warning,
    Error,
}

/// An auto-dismissing notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub duration: Duration,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, toast: &Toast);
}

pub trait Navigator: Send + Sync {
    /// Full navigation to `path`, discarding in-memory app state.
    fn redirect(&self, path: &str);
}

/// Writes toasts to the log. Used when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, toast: &Toast) {
        match toast.kind {
            ToastKind::Warning => tracing::warn!(
                duration_ms = toast.duration.as_millis() as u64,
                "{}",
                toast.message
            ),
            ToastKind::Error => tracing::error!(
                duration_ms = toast.duration.as_millis() as u64,
                "{}",
                toast.message
            ),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect(&self, path: &str) {
        tracing::info!(path = %path, "Redirecting");
    }
}
