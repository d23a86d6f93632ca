use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::AuthService;
use crate::websocket::session::{SessionId, SessionManager};
use dashboard_core::ChannelIdentityProvider;
use dashboard_types::{ClientMessage, ServerMessage};

/// Turns a client's sign-in and sign-out messages into identity events for
/// that client's dashboard.
#[derive(Clone)]
pub struct MessageHandler {
    session_id: SessionId,
    session_manager: Arc<SessionManager>,
    auth_service: Arc<AuthService>,
    identity: Arc<ChannelIdentityProvider>,
}

impl MessageHandler {
    pub fn new(
        session_id: SessionId,
        session_manager: Arc<SessionManager>,
        auth_service: Arc<AuthService>,
        identity: Arc<ChannelIdentityProvider>,
    ) -> Self {
        Self {
            session_id,
            session_manager,
            auth_service,
            identity,
        }
    }

    pub async fn handle_message(&self, message: ClientMessage) -> Result<(), String> {
        self.session_manager.update_activity(self.session_id).await;

        match message {
            ClientMessage::Authenticate { token } => self.handle_authenticate(token).await,
            ClientMessage::SignOut => self.handle_sign_out().await,
            ClientMessage::Heartbeat => Ok(()),
        }
    }

    async fn handle_authenticate(&self, token: String) -> Result<(), String> {
        info!("Authenticating session {}", self.session_id);

        match self.auth_service.validate_token(&token).await {
            Ok(user) => {
                self.session_manager
                    .set_session_email(self.session_id, Some(user.email.clone()))
                    .await;
                self.identity.sign_in(user.email);
                Ok(())
            }
            Err(e) => {
                warn!("Authentication failed for session {}: {}", self.session_id, e);
                self.session_manager
                    .set_session_email(self.session_id, None)
                    .await;
                self.send_message(ServerMessage::AuthenticationFailed {
                    reason: e.to_string(),
                })
                .await?;
                self.identity.fail(e.to_string());
                Ok(())
            }
        }
    }

    async fn handle_sign_out(&self) -> Result<(), String> {
        info!("Session {} signed out", self.session_id);
        self.session_manager
            .set_session_email(self.session_id, None)
            .await;
        self.identity.sign_out();
        Ok(())
    }

    async fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.session_manager
            .send_to_session(self.session_id, message)
            .await
    }
}
