//! Imperative navigation.
//!
//! The synchronizer and the screens only see [`Navigator`]. [`Router`] is the
//! in-process implementation: it tracks the current path, keeps the history,
//! and lets observers await route changes.

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{info, warn};

use super::routes::{Screen, HOME};

pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

pub struct Router {
    current: watch::Sender<String>,
    history: Mutex<Vec<String>>,
}

impl Router {
    pub fn new() -> Self {
        let (current, _) = watch::channel(HOME.to_string());
        Self {
            current,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn current(&self) -> String {
        self.current.borrow().clone()
    }

    pub fn current_screen(&self) -> Option<Screen> {
        Screen::from_path(&self.current.borrow())
    }

    /// Every path navigated to, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    /// A receiver notified on every navigation.
    pub fn watch(&self) -> watch::Receiver<String> {
        self.current.subscribe()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for Router {
    fn navigate(&self, path: &str) {
        if Screen::from_path(path).is_none() {
            warn!(path, "navigating to an unknown route");
        }
        info!(path, "navigate");
        self.history.lock().push(path.to_string());
        self.current.send_replace(path.to_string());
    }
}
