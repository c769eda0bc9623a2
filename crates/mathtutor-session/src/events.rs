//! In-tab session listeners

use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::identity::UserData;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Login(UserData),
    Logout,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Login(_) => "login",
            SessionEvent::Logout => "logout",
        }
    }
}

pub type Listener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

type ListenerList = RwLock<Vec<(u64, Listener)>>;

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: Arc<ListenerList>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub(crate) fn add(&self, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().push((id, listener));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Invoke every listener. A panicking listener is logged and skipped.
    pub(crate) fn notify(&self, event: &SessionEvent) {
        // Snapshot so listeners may (un)subscribe while being called
        let snapshot: Vec<(u64, Listener)> = self.listeners.read().clone();

        for (id, listener) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::error!(
                    listener_id = id,
                    event = event.name(),
                    "Session listener panicked"
                );
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.listeners.read().len()
    }
}

/// Handle returned by `add_listener`.
pub struct Subscription {
    id: u64,
    listeners: Weak<ListenerList>,
}

impl Subscription {
    /// Remove the listener. Safe to call after the manager is gone.
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.write().retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_notify_reaches_all_listeners() {
        let registry = ListenerRegistry::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            registry.add(Arc::new(move |event: &SessionEvent| {
                seen.lock().push(format!("{}:{}", tag, event.name()));
            }));
        }

        registry.notify(&SessionEvent::Logout);
        assert_eq!(*seen.lock(), vec!["first:logout", "second:logout"]);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let registry = ListenerRegistry::default();
        let called = Arc::new(Mutex::new(false));

        registry.add(Arc::new(|event: &SessionEvent| {
            if *event == SessionEvent::Logout {
                panic!("listener failure");
            }
        }));
        let flag = Arc::clone(&called);
        registry.add(Arc::new(move |_: &SessionEvent| {
            *flag.lock() = true;
        }));

        registry.notify(&SessionEvent::Logout);
        assert!(*called.lock());
    }

    #[test]
    fn test_unsubscribe() {
        let registry = ListenerRegistry::default();
        let count = Arc::new(AtomicU64::new(0));

        let counter = Arc::clone(&count);
        let subscription = registry.add(Arc::new(move |_: &SessionEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        registry.notify(&SessionEvent::Logout);

        subscription.unsubscribe();
        assert_eq!(registry.len(), 0);

        registry.notify(&SessionEvent::Logout);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
