//! MathTutor Session Management
//!
//! Client-side session and authentication state:
//! - Credential Record (token + display name) persisted in the cookie jar
//! - Identity view decoded from the token payload, never verified locally
//! - In-tab listeners and a cross-tab signal bus
//! - Authenticated requests that log out on SESSION_INVALID / USER_BANNED

mod auth;
mod config;
mod credentials;
mod error;
mod events;
mod http;
mod identity;
mod manager;
mod signals;
mod ui;
mod validation;

pub use auth::{SignInResponse, SignUpRequest, SignUpResponse};
pub use config::{SessionConfig, DEFAULT_API_BASE_URL, DEFAULT_SIGN_IN_PATH};
pub use credentials::{LAST_READ_TIME_KEY, TOKEN_COOKIE, USERNAME_COOKIE, USER_SIGN_OUT_KEY};
pub use error::SessionError;
pub use events::{SessionEvent, Subscription};
pub use http::{ApiResponse, RequestOptions, SESSION_INVALID_CODE, USER_BANNED_CODE};
pub use identity::{decode_claims, Identity, TokenClaims, UserData, UserId};
pub use manager::{AuthState, SessionManager};
pub use signals::{SessionSignal, SignalBus};
pub use ui::{LogNavigator, LogNotifier, Navigator, Notifier, Toast, ToastKind};
pub use validation::{spawn_periodic_validation, DEFAULT_VALIDATION_INTERVAL};

pub type Result<T> = std::result::Result<T, SessionError>;
