//! Fan-out of auth session changes to subscribers.
//!
//! Providers publish every session transition on an [`AuthEventBus`]; each
//! consumer holds its own [`AuthSubscription`] and stops receiving as soon as
//! the subscription is dropped.

use log::{debug, warn};
use tokio::sync::broadcast;

use crate::models::AuthEvent;

/// Events buffered per subscriber before the slowest one starts lagging.
const EVENT_CHANNEL_SIZE: usize = 64;

#[derive(Debug, Clone)]
pub struct AuthEventBus {
    tx: broadcast::Sender<AuthEvent>,
}

impl AuthEventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self { tx }
    }

    pub fn publish(&self, event: AuthEvent) {
        // No receivers is not an error: nobody is mounted yet.
        if self.tx.send(event).is_err() {
            debug!("auth event published with no subscribers");
        }
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for AuthEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of the bus. Dropping it unsubscribes.
#[derive(Debug)]
pub struct AuthSubscription {
    rx: broadcast::Receiver<AuthEvent>,
}

impl AuthSubscription {
    /// Waits for the next event. Returns `None` once the provider is gone.
    ///
    /// A lagging subscriber skips the events it missed; only the latest
    /// session state matters to consumers.
    pub async fn next(&mut self) -> Option<AuthEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("auth subscription lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
