//! MathTutor Core
//!
//! Coordination layer for the tutoring platform client: configuration,
//! logging, and the `Portal` that opens session-managed tabs.

mod config;
mod error;
mod portal;

pub use config::Config;
pub use error::CoreError;
pub use portal::Portal;

// Re-export core components
pub use mathtutor_session::{
    ApiResponse, AuthState, Identity, LogNavigator, LogNotifier, Navigator, Notifier,
    RequestOptions, SessionConfig, SessionError, SessionEvent, SessionManager, SessionSignal,
    SignInResponse, SignUpRequest, SignUpResponse, SignalBus, Subscription, Toast, ToastKind,
    UserData, UserId,
};
pub use mathtutor_storage::{Database, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
