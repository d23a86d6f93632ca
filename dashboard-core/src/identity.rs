use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub email: String,
}

/// A change reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    SignedIn(AuthenticatedUser),
    SignedOut,
    /// The provider itself failed; carries its message.
    Failed(String),
}

pub trait IdentityProvider {
    fn subscribe(&self) -> IdentitySubscription;
}

/// Live subscription to identity changes. Dropping it unsubscribes.
pub struct IdentitySubscription {
    pending: Option<IdentityEvent>,
    receiver: broadcast::Receiver<IdentityEvent>,
    on_release: Option<Box<dyn FnOnce() + Send>>,
}

impl IdentitySubscription {
    pub fn new(
        current: Option<IdentityEvent>,
        receiver: broadcast::Receiver<IdentityEvent>,
        on_release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            pending: current,
            receiver,
            on_release: Some(Box::new(on_release)),
        }
    }

    /// Next event, or `None` once the provider has gone away.
    pub async fn next_event(&mut self) -> Option<IdentityEvent> {
        if let Some(event) = self.pending.take() {
            return Some(event);
        }

        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Identity subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}
}

impl Drop for IdentitySubscription {
    fn drop(&mut self) {
        if let Some(release) = self.on_release.take() {
            release();
        }
    }
}

/// In-process identity stream. New subscribers first see the latest event, the
/// way an auth provider reports the current user on subscription.
pub struct ChannelIdentityProvider {
    sender: broadcast::Sender<IdentityEvent>,
    latest: Mutex<Option<IdentityEvent>>,
    subscribers: Arc<AtomicUsize>,
}

impl ChannelIdentityProvider {
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            latest: Mutex::new(None),
            subscribers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish an event, returning how many subscribers received it.
    pub fn publish(&self, event: IdentityEvent) -> usize {
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        *latest = Some(event.clone());
        self.sender.send(event).unwrap_or(0)
    }

    /// Publish `event` only if nothing has been published yet. Returns whether
    /// it went out.
    pub fn publish_initial(&self, event: IdentityEvent) -> bool {
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        if latest.is_some() {
            return false;
        }
        *latest = Some(event.clone());
        let _ = self.sender.send(event);
        true
    }

    pub fn sign_in(&self, email: impl Into<String>) -> usize {
        self.publish(IdentityEvent::SignedIn(AuthenticatedUser {
            email: email.into(),
        }))
    }

    pub fn sign_out(&self) -> usize {
        self.publish(IdentityEvent::SignedOut)
    }

    pub fn fail(&self, message: impl Into<String>) -> usize {
        self.publish(IdentityEvent::Failed(message.into()))
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }
}

impl Default for ChannelIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for ChannelIdentityProvider {
    fn subscribe(&self) -> IdentitySubscription {
        // Hold the lock so no event slips between the snapshot and the receiver
        let latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        let receiver = self.sender.subscribe();
        self.subscribers.fetch_add(1, Ordering::SeqCst);
        debug!("Identity subscriber added");

        let subscribers = self.subscribers.clone();
        IdentitySubscription::new(latest.clone(), receiver, move || {
            subscribers.fetch_sub(1, Ordering::SeqCst);
            debug!("Identity subscriber released");
        })
    }
}
