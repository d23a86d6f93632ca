use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use dashboard_types::{ConnectionError, ServerMessage};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One connected dashboard client.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub email: Option<String>,
    pub connected_at: Instant,
    pub last_activity: Instant,
    pub sender: mpsc::UnboundedSender<ServerMessage>,
}

impl Session {
    pub fn new(id: SessionId) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let now = Instant::now();

        let session = Self {
            id,
            email: None,
            connected_at: now,
            last_activity: now,
            sender,
        };

        (session, receiver)
    }

    pub fn update_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.sender
            .send(message)
            .map_err(|_| "Session closed".to_string())
    }

    pub fn is_inactive(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }
}

/// Registry of live sessions. Removing a session drops its sender, which ends
/// the socket's outgoing loop and closes the connection.
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create_session(&self, id: SessionId) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (session, receiver) = Session::new(id);
        let mut sessions = self.sessions.write().await;
        sessions.insert(id, session);
        receiver
    }

    pub async fn remove_session(&self, id: SessionId) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&id);
    }

    pub async fn set_session_email(&self, id: SessionId, email: Option<String>) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&id) {
            session.email = email;
        }
    }

    pub async fn update_activity(&self, id: SessionId) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&id) {
            session.update_activity();
        }
    }

    pub async fn send_to_session(&self, id: SessionId, message: ServerMessage) -> Result<(), String> {
        let sessions = self.sessions.read().await;
        match sessions.get(&id) {
            Some(session) => session.send_message(message),
            None => Err("Session not found".to_string()),
        }
    }

    /// Drop sessions idle for longer than `timeout`, returning how many went.
    pub async fn cleanup_inactive_sessions(&self, timeout: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| {
            let keep = !session.is_inactive(timeout);
            if !keep {
                tracing::info!("Removing inactive session: {}", id);
                let _ = session.send_message(ServerMessage::ConnectionError {
                    error: ConnectionError::SessionExpired,
                });
            }
            keep
        });
        before - sessions.len()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn signed_in_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.values().filter(|s| s.email.is_some()).count()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_types::ViewState;

    #[tokio::test]
    async fn test_session_creation_and_removal() {
        let manager = SessionManager::new();
        let id = SessionId::new();

        let _receiver = manager.create_session(id).await;
        assert_eq!(manager.session_count().await, 1);

        manager.remove_session(id).await;
        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_signed_in_tracking() {
        let manager = SessionManager::new();
        let id = SessionId::new();
        let _receiver = manager.create_session(id).await;

        manager
            .set_session_email(id, Some("a@x.com".to_string()))
            .await;
        assert_eq!(manager.signed_in_count().await, 1);

        manager.set_session_email(id, None).await;
        assert_eq!(manager.signed_in_count().await, 0);
    }

    #[tokio::test]
    async fn test_activity_tracking_and_timeout() {
        let manager = SessionManager::new();
        let id = SessionId::new();
        let mut receiver = manager.create_session(id).await;

        let timeout = Duration::from_millis(50);
        assert_eq!(manager.cleanup_inactive_sessions(timeout).await, 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(manager.cleanup_inactive_sessions(timeout).await, 1);
        assert_eq!(manager.session_count().await, 0);

        assert!(matches!(
            receiver.recv().await,
            Some(ServerMessage::ConnectionError {
                error: ConnectionError::SessionExpired
            })
        ));
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_send_to_missing_session() {
        let manager = SessionManager::new();
        let result = manager
            .send_to_session(
                SessionId::new(),
                ServerMessage::StateUpdate {
                    state: ViewState::Loading,
                },
            )
            .await;
        assert_eq!(result.unwrap_err(), "Session not found");
    }

    #[tokio::test]
    async fn test_removal_closes_outgoing_channel() {
        let manager = SessionManager::new();
        let id = SessionId::new();
        let mut receiver = manager.create_session(id).await;

        manager
            .send_to_session(
                id,
                ServerMessage::Redirect {
                    location: "/signin".to_string(),
                },
            )
            .await
            .unwrap();
        manager.remove_session(id).await;

        assert!(matches!(
            receiver.recv().await,
            Some(ServerMessage::Redirect { .. })
        ));
        assert!(receiver.recv().await.is_none());
    }
}
