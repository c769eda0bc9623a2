//! Session Manager
//!
//! Single source of truth, per tab, for "who is signed in". Tabs opened on
//! the same database and signal bus see each other's changes.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use mathtutor_storage::Database;

use crate::config::SessionConfig;
use crate::credentials::CredentialStore;
use crate::error::SessionError;
use crate::events::{ListenerRegistry, SessionEvent, Subscription};
use crate::http::{classify, merge_headers, resolve_url, ApiResponse, RequestOptions, Verdict};
use crate::identity::{derive_identity, Identity, UserData};
use crate::signals::{SessionSignal, SignalBus};
use crate::ui::{LogNavigator, LogNotifier, Navigator, Notifier, Toast, ToastKind};
use crate::Result;

pub const LOGOUT_PATH: &str = "/auth/logout";
pub const VALIDATE_PATH: &str = "/auth/validate";

const DEFAULT_INVALIDATION_MESSAGE: &str =
    "Your session has ended because your account was signed in on another device.";
const DEFAULT_BAN_MESSAGE: &str =
    "Your account has been suspended. Please contact support for more information.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated,
}

pub struct SessionManager {
    /// Identifies this tab on the signal bus
    tab_id: String,
    credentials: CredentialStore,
    listeners: Arc<ListenerRegistry>,
    bus: SignalBus,
    pub(crate) http: reqwest::Client,
    pub(crate) config: Arc<SessionConfig>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl SessionManager {
    pub fn new(db: Database, bus: SignalBus, config: SessionConfig) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;

        let manager = Self {
            tab_id: Uuid::new_v4().to_string(),
            credentials: CredentialStore::new(db),
            listeners: Arc::new(ListenerRegistry::default()),
            bus,
            http,
            config: Arc::new(config),
            notifier: Arc::new(LogNotifier),
            navigator: Arc::new(LogNavigator),
        };

        tracing::debug!(tab_id = %manager.tab_id, "Opened session manager");

        Ok(manager)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn tab_id(&self) -> &str {
        &self.tab_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // === Credential Record ===

    pub fn get_token(&self) -> Option<String> {
        match self.credentials.token() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read token");
                None
            }
        }
    }

    /// The identity view, or `None` for anything short of a complete,
    /// well-formed record. Never fails.
    pub fn get_user_data(&self) -> Option<Identity> {
        let username = match self.credentials.username() {
            Ok(username) => username?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read username");
                return None;
            }
        };
        let token = self.get_token()?;

        derive_identity(&token, &username)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.credentials.expires_at().ok().flatten()
    }

    pub fn set_session(&self, token: &str, user: &UserData, remember_me: bool) -> Result<()> {
        let expires_at = self.credentials.save(token, &user.name, remember_me)?;

        tracing::info!(
            tab_id = %self.tab_id,
            user_id = %user.id,
            remember_me,
            expires_at = %expires_at,
            "Session stored"
        );

        self.listeners.notify(&SessionEvent::Login(user.clone()));
        self.broadcast_auth_change(true);

        Ok(())
    }

    /// Drop the record and tell every listener and tab. Idempotent; the
    /// signals fire even if nothing was stored.
    pub fn clear_session(&self) -> Result<()> {
        self.credentials.clear()?;

        tracing::info!(tab_id = %self.tab_id, "Session cleared");

        self.listeners.notify(&SessionEvent::Logout);
        self.broadcast_auth_change(false);

        Ok(())
    }

    fn broadcast_auth_change(&self, authenticated: bool) {
        self.bus.publish(SessionSignal::StorageChanged {
            source: self.tab_id.clone(),
        });
        self.bus.publish(SessionSignal::AuthStateChanged {
            source: self.tab_id.clone(),
            authenticated,
        });
    }

    // === State ===

    pub fn is_authenticated(&self) -> bool {
        self.get_token().is_some() && self.get_user_data().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.get_user_data()
            .map(|identity| identity.is_admin())
            .unwrap_or(false)
    }

    pub fn state(&self) -> AuthState {
        if self.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        }
    }

    // === Listeners and signals ===

    pub fn add_listener<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.listeners.add(Arc::new(listener))
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionSignal> {
        self.bus.subscribe()
    }

    // === Authenticated requests ===

    pub async fn make_authenticated_request(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse> {
        let token = self.get_token().ok_or(SessionError::NoToken)?;

        let url = resolve_url(&self.config.api_base_url, url)?;
        let headers = merge_headers(&token, &options.headers)?;

        let mut request = self
            .http
            .request(options.method.clone(), url.clone())
            .headers(headers);
        if let Some(body) = options.body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::debug!(url = %url, error = %e, "Authenticated request failed");
            SessionError::Network(e.to_string())
        })?;
        let response = ApiResponse::read(response).await?;

        match classify(&response) {
            Verdict::Normal => Ok(response),
            Verdict::SessionInvalid(message) => {
                self.handle_session_invalidation(message.as_deref());
                Err(SessionError::SessionInvalid)
            }
            Verdict::UserBanned(message) => {
                self.handle_user_banned(message.as_deref());
                Err(SessionError::UserBanned)
            }
        }
    }

    /// Another login superseded this session.
    pub fn handle_session_invalidation(&self, message: Option<&str>) {
        let message = non_empty(message).unwrap_or(DEFAULT_INVALIDATION_MESSAGE);
        tracing::warn!(tab_id = %self.tab_id, "Session invalidated by server");

        self.terminate(
            Toast {
                message: message.to_string(),
                kind: ToastKind::Warning,
                duration: self.config.invalidation_toast_duration,
            },
            SessionSignal::SessionInvalidated {
                source: self.tab_id.clone(),
                message: message.to_string(),
            },
            self.config.invalidation_redirect_delay,
        );
    }

    pub fn handle_user_banned(&self, message: Option<&str>) {
        let message = non_empty(message).unwrap_or(DEFAULT_BAN_MESSAGE);
        tracing::warn!(tab_id = %self.tab_id, "Account banned by server");

        self.terminate(
            Toast {
                message: message.to_string(),
                kind: ToastKind::Error,
                duration: self.config.ban_toast_duration,
            },
            SessionSignal::UserBanned {
                source: self.tab_id.clone(),
                message: message.to_string(),
            },
            self.config.ban_redirect_delay,
        );
    }

    fn terminate(&self, toast: Toast, signal: SessionSignal, redirect_delay: Duration) {
        if let Err(e) = self.clear_session() {
            tracing::error!(error = %e, "Failed to clear session");
        }
        self.notifier.notify(&toast);
        self.bus.publish(signal);
        self.schedule_redirect(redirect_delay);
    }

    fn schedule_redirect(&self, delay: Duration) {
        let navigator = Arc::clone(&self.navigator);
        let target = self.config.sign_in_path.clone();

        tracing::info!(
            path = %target,
            delay_ms = delay.as_millis() as u64,
            "Scheduling redirect to sign-in"
        );

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    navigator.redirect(&target);
                });
            }
            Err(_) => {
                tracing::warn!("No async runtime; redirecting immediately");
                navigator.redirect(&target);
            }
        }
    }

    // === Backend session calls ===

    /// Tell the backend, then clear locally no matter what it said.
    pub async fn logout(&self) -> Result<()> {
        if let Err(e) = self
            .make_authenticated_request(LOGOUT_PATH, RequestOptions::post())
            .await
        {
            tracing::debug!(error = %e, "Backend logout failed; clearing locally");
        }

        self.clear_session()
    }

    /// Ask the backend whether the session is still live.
    ///
    /// Transport failures fail open: a flaky connection must not sign the
    /// user out. Only an explicit non-OK answer clears the session.
    pub async fn validate_session(&self) -> bool {
        match self
            .make_authenticated_request(VALIDATE_PATH, RequestOptions::get())
            .await
        {
            Ok(response) if response.is_ok() => true,
            Ok(response) => {
                tracing::info!(status = %response.status, "Session rejected by validate endpoint");
                if let Err(e) = self.clear_session() {
                    tracing::error!(error = %e, "Failed to clear session");
                }
                false
            }
            Err(e) if e.is_handled() => false,
            Err(SessionError::NoToken) => false,
            Err(SessionError::Network(e)) => {
                tracing::warn!(error = %e, "Session validation inconclusive; keeping session");
                true
            }
            // The stored credentials cannot be checked at all
            Err(e) => {
                tracing::warn!(error = %e, "Session could not be validated; clearing");
                if let Err(e) = self.clear_session() {
                    tracing::error!(error = %e, "Failed to clear session");
                }
                false
            }
        }
    }
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            tab_id: self.tab_id.clone(),
            credentials: self.credentials.clone(),
            listeners: Arc::clone(&self.listeners),
            bus: self.bus.clone(),
            http: self.http.clone(),
            config: Arc::clone(&self.config),
            notifier: Arc::clone(&self.notifier),
            navigator: Arc::clone(&self.navigator),
        }
    }
}

fn non_empty(message: Option<&str>) -> Option<&str> {
    message.filter(|m| !m.trim().is_empty())
}
