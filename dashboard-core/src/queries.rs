//! Read-only queries behind the dashboard.

use tracing::{error, warn};

use crate::errors::DashboardError;
use crate::records::{decode_user, score_or_zero};
use crate::store::{CARDS, DocumentStore, FieldFilter, StoreError, THREADS, USERS};
use dashboard_types::{FlashcardDeckSummary, ThreadSummary, UserRecord, ViewState};

/// Look up the user record for `email`.
///
/// Emails are not unique at the store level; when several records match, the
/// first one in store order wins.
pub async fn resolve_profile(
    store: &dyn DocumentStore,
    email: &str,
) -> Result<UserRecord, DashboardError> {
    let filter = FieldFilter::eq("email", email);
    let documents = store.query(USERS, Some(&filter)).await?;

    let first = documents.first().ok_or(DashboardError::UserNotFound)?;
    if documents.len() > 1 {
        warn!(
            "{} user records share email {}, using {}",
            documents.len(),
            email,
            first.id
        );
    }

    Ok(decode_user(first)?)
}

/// Highest score across every user record, 0 for an empty collection.
pub async fn highest_score(store: &dyn DocumentStore) -> Result<u32, StoreError> {
    let documents = store.query(USERS, None).await?;
    Ok(documents.iter().map(score_or_zero).fold(0, u32::max))
}

pub async fn list_threads(store: &dyn DocumentStore) -> Result<Vec<ThreadSummary>, StoreError> {
    let documents = store.query(THREADS, None).await?;
    Ok(documents
        .into_iter()
        .map(|doc| ThreadSummary { id: doc.id })
        .collect())
}

pub async fn list_decks(
    store: &dyn DocumentStore,
) -> Result<Vec<FlashcardDeckSummary>, StoreError> {
    let documents = store.query(CARDS, None).await?;
    Ok(documents
        .into_iter()
        .map(|doc| FlashcardDeckSummary { id: doc.id })
        .collect())
}

/// Run all four queries at once and fold them into a single view state.
///
/// Only a profile failure produces `ViewState::Error`; the other queries log
/// and fall back to empty values.
pub async fn load_view_state(store: &dyn DocumentStore, email: &str) -> ViewState {
    let (profile, highest, threads, decks) = tokio::join!(
        resolve_profile(store, email),
        highest_score(store),
        list_threads(store),
        list_decks(store),
    );

    let profile = match profile {
        Ok(profile) => profile,
        Err(e) => {
            warn!("Failed to resolve profile for {}: {}", email, e);
            return ViewState::error(e.to_string());
        }
    };

    ViewState::Ready {
        name: profile.name,
        your_score: profile.score,
        highest_score: highest.unwrap_or_else(|e| {
            error!("Failed to scan high score: {}", e);
            0
        }),
        thread_ids: threads
            .unwrap_or_else(|e| {
                error!("Failed to list threads: {}", e);
                Vec::new()
            })
            .into_iter()
            .map(|t| t.id)
            .collect(),
        deck_ids: decks
            .unwrap_or_else(|e| {
                error!("Failed to list flashcard decks: {}", e);
                Vec::new()
            })
            .into_iter()
            .map(|d| d.id)
            .collect(),
    }
}
