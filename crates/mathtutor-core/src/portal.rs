//! Portal: one origin's shared state
//!
//! Owns the credential store and the signal bus. Each tab opened here is a
//! `SessionManager` over that shared state, so a sign-out in one tab is
//! visible to the others.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use mathtutor_session::{
    spawn_periodic_validation, Navigator, Notifier, SessionConfig, SessionManager,
    SessionSignal, SignalBus,
};
use mathtutor_storage::Database;

use crate::config::Config;
use crate::Result;

pub struct Portal {
    config: Config,
    session_config: SessionConfig,
    db: Database,
    bus: SignalBus,
}

impl Portal {
    pub fn new(config: Config) -> Result<Self> {
        let db = Database::open(&config.database_path)?;
        let portal = Self::with_database(config, db)?;

        tracing::info!(
            database = %portal.config.database_path.display(),
            api = %portal.config.api_base_url,
            "Portal opened"
        );

        Ok(portal)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        Self::with_database(config, Database::open_in_memory()?)
    }

    fn with_database(config: Config, db: Database) -> Result<Self> {
        let session_config = config.session_config()?;

        Ok(Self {
            config,
            session_config,
            db,
            bus: SignalBus::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open a tab that reports through the log.
    pub fn open_tab(&self) -> Result<SessionManager> {
        Ok(SessionManager::new(
            self.db.clone(),
            self.bus.clone(),
            self.session_config.clone(),
        )?)
    }

    /// Open a tab wired to a UI.
    pub fn open_tab_with(
        &self,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<SessionManager> {
        Ok(self
            .open_tab()?
            .with_notifier(notifier)
            .with_navigator(navigator))
    }

    pub fn signals(&self) -> broadcast::Receiver<SessionSignal> {
        self.bus.subscribe()
    }

    /// Start background validation for `tab` at the configured interval.
    pub fn spawn_validation(&self, tab: &SessionManager) -> JoinHandle<()> {
        spawn_periodic_validation(tab.clone(), self.config.validation_interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathtutor_session::{SessionError, UserData, UserId};
    use std::path::PathBuf;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // {"id":1,"role":"student","sessionToken":"s1"}
    const TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.eyJpZCI6MSwicm9sZSI6InN0dWRlbnQiLCJzZXNzaW9uVG9rZW4iOiJzMSJ9.sig";

    fn user() -> UserData {
        UserData {
            id: UserId::Numeric(1),
            name: "Emmy Noether".to_string(),
            email: None,
            role: None,
        }
    }

    fn config(api_base_url: &str) -> Config {
        let mut config = Config::new(PathBuf::from("/unused"));
        config.api_base_url = api_base_url.to_string();
        config
    }

    #[tokio::test]
    async fn test_tabs_share_credentials_and_signals() {
        let portal = Portal::in_memory(config("http://127.0.0.1:9/api")).unwrap();
        let first = portal.open_tab().unwrap();
        let second = portal.open_tab().unwrap();
        let mut signals = portal.signals();

        assert_ne!(first.tab_id(), second.tab_id());

        first.set_session(TOKEN, &user(), false).unwrap();
        assert!(second.is_authenticated());
        assert_eq!(second.get_user_data().unwrap().username, "Emmy Noether");

        second.clear_session().unwrap();
        assert!(!first.is_authenticated());

        let mut last_auth_state = None;
        while let Ok(signal) = signals.try_recv() {
            if let SessionSignal::AuthStateChanged { authenticated, .. } = signal {
                last_auth_state = Some(authenticated);
            }
        }
        assert_eq!(last_auth_state, Some(false));
    }

    #[tokio::test]
    async fn test_invalidation_in_one_tab_signs_out_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/analytics/overview"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "code": "SESSION_INVALID",
                "message": "Signed in on another device",
            })))
            .mount(&server)
            .await;

        let portal = Portal::in_memory(config(&format!("{}/api", server.uri()))).unwrap();
        let admin_tab = portal.open_tab().unwrap();
        let other_tab = portal.open_tab().unwrap();
        let mut signals = other_tab.subscribe();

        admin_tab.set_session(TOKEN, &user(), true).unwrap();

        let result = admin_tab
            .make_authenticated_request("/analytics/overview", Default::default())
            .await;
        assert!(matches!(result, Err(SessionError::SessionInvalid)));
        assert!(!other_tab.is_authenticated());

        let mut invalidated = false;
        while let Ok(signal) = signals.try_recv() {
            if let SessionSignal::SessionInvalidated { message, .. } = signal {
                assert_eq!(message, "Signed in on another device");
                invalidated = true;
            }
        }
        assert!(invalidated);
    }

    #[test]
    fn test_bad_config_is_rejected() {
        assert!(Portal::in_memory(config("::not a url::")).is_err());
    }
}
