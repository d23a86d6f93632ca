//! Live dashboard state driven by identity events and background fetches.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::DashboardError;
use crate::identity::{IdentityEvent, IdentityProvider, IdentitySubscription};
use crate::queries::{highest_score, list_decks, list_threads, resolve_profile};
use crate::store::DocumentStore;
use dashboard_types::{FlashcardDeckSummary, ThreadSummary, ViewState};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProfileState {
    #[default]
    Pending,
    Resolved {
        name: String,
        score: u32,
    },
    Failed(String),
}

/// Aggregated dashboard data. Each background task owns one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardModel {
    pub profile: ProfileState,
    pub highest_score: u32,
    pub threads: Vec<ThreadSummary>,
    pub decks: Vec<FlashcardDeckSummary>,
    /// Set when the user is signed out and must be sent elsewhere.
    pub redirect: Option<String>,
    /// Bumped on every sign-out so repeated redirects stay distinguishable.
    pub sign_outs: u64,
}

impl DashboardModel {
    pub fn view_state(&self) -> ViewState {
        match &self.profile {
            ProfileState::Pending => ViewState::Loading,
            ProfileState::Failed(message) => ViewState::error(message.clone()),
            ProfileState::Resolved { name, score } => ViewState::Ready {
                name: name.clone(),
                your_score: *score,
                highest_score: self.highest_score,
                thread_ids: self.threads.iter().map(|t| t.id.clone()).collect(),
                deck_ids: self.decks.iter().map(|d| d.id.clone()).collect(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub signin_path: String,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            signin_path: "/signin".to_string(),
        }
    }
}

type ModelSink = Arc<watch::Sender<DashboardModel>>;

pub struct DashboardViewModel {
    model: watch::Receiver<DashboardModel>,
    tasks: Vec<JoinHandle<()>>,
}

impl DashboardViewModel {
    /// Start the dashboard: subscribe to identity changes and kick off the
    /// high-score, thread and deck fetches. Must run inside a tokio runtime.
    pub fn mount(
        store: Arc<dyn DocumentStore>,
        identity: &dyn IdentityProvider,
        options: DashboardOptions,
    ) -> Self {
        let (sender, model) = watch::channel(DashboardModel::default());
        let sink: ModelSink = Arc::new(sender);
        let subscription = identity.subscribe();

        let tasks = vec![
            tokio::spawn(scan_highest_score(store.clone(), sink.clone())),
            tokio::spawn(fetch_threads(store.clone(), sink.clone())),
            tokio::spawn(fetch_decks(store.clone(), sink.clone())),
            tokio::spawn(follow_identity(subscription, store, sink, options)),
        ];

        info!("Dashboard mounted");
        Self { model, tasks }
    }

    pub fn view_state(&self) -> ViewState {
        self.model.borrow().view_state()
    }

    pub fn redirect(&self) -> Option<String> {
        self.model.borrow().redirect.clone()
    }

    /// A receiver that wakes on every model change.
    pub fn watch(&self) -> watch::Receiver<DashboardModel> {
        self.model.clone()
    }

    /// Cancel in-flight work and release the identity subscription.
    pub async fn unmount(mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
            let _ = task.await;
        }
        info!("Dashboard unmounted");
    }
}

impl Drop for DashboardViewModel {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn scan_highest_score(store: Arc<dyn DocumentStore>, sink: ModelSink) {
    match highest_score(store.as_ref()).await {
        Ok(score) => sink.send_modify(|model| model.highest_score = score),
        Err(e) => error!("Failed to scan high score: {}", e),
    }
}

async fn fetch_threads(store: Arc<dyn DocumentStore>, sink: ModelSink) {
    match list_threads(store.as_ref()).await {
        Ok(threads) => sink.send_modify(|model| model.threads = threads),
        Err(e) => error!("Failed to list threads: {}", e),
    }
}

async fn fetch_decks(store: Arc<dyn DocumentStore>, sink: ModelSink) {
    match list_decks(store.as_ref()).await {
        Ok(decks) => sink.send_modify(|model| model.decks = decks),
        Err(e) => error!("Failed to list flashcard decks: {}", e),
    }
}

async fn follow_identity(
    mut subscription: IdentitySubscription,
    store: Arc<dyn DocumentStore>,
    sink: ModelSink,
    options: DashboardOptions,
) {
    while let Some(event) = subscription.next_event().await {
        match event {
            IdentityEvent::SignedIn(user) => {
                // Clear the previous user's profile before resolving the new one
                sink.send_modify(|model| {
                    model.profile = ProfileState::Pending;
                    model.redirect = None;
                });

                let profile = match resolve_profile(store.as_ref(), &user.email).await {
                    Ok(record) => ProfileState::Resolved {
                        name: record.name,
                        score: record.score,
                    },
                    Err(e) => {
                        warn!("Failed to resolve profile for {}: {}", user.email, e);
                        ProfileState::Failed(e.to_string())
                    }
                };
                sink.send_modify(|model| model.profile = profile);
            }
            IdentityEvent::SignedOut => {
                info!("Not signed in, redirecting to {}", options.signin_path);
                sink.send_modify(|model| {
                    model.profile = ProfileState::Pending;
                    model.redirect = Some(options.signin_path.clone());
                    model.sign_outs += 1;
                });
            }
            IdentityEvent::Failed(message) => {
                let e = DashboardError::AuthStream(message);
                error!("Identity provider error: {}", e);
                sink.send_modify(|model| {
                    model.profile = ProfileState::Failed(e.to_string());
                    model.redirect = None;
                });
            }
        }
    }
    debug!("Identity stream closed");
}
