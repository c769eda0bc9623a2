//! Terminal renditions of toasts and redirects

use mathtutor_core::{Navigator, Notifier, Toast, ToastKind};

pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, toast: &Toast) {
        let label = match toast.kind {
            ToastKind::Warning => "warning",
            ToastKind::Error => "error",
        };
        eprintln!("[{}] {}", label, toast.message);
    }
}

pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn redirect(&self, path: &str) {
        eprintln!("Please sign in again ({})", path);
        tracing::info!(path = %path, "Sign-in required");
    }
}
