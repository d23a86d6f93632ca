use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use warp::ws::{Message, WebSocket};

use crate::auth::AuthService;
use dashboard_core::{
    ChannelIdentityProvider, DashboardModel, DashboardOptions, DashboardViewModel, DocumentStore,
    IdentityEvent, ProblemCatalog,
};
use dashboard_types::{ClientMessage, ConnectionError, ServerMessage, ViewState};

pub mod handlers;
pub mod rate_limiter;
pub mod session;


use handlers::MessageHandler;
use rate_limiter::RateLimiter;
use session::SessionId;
pub use session::SessionManager;

/// Everything a dashboard socket needs besides the socket itself.
#[derive(Clone)]
pub struct DashboardContext {
    pub session_manager: Arc<SessionManager>,
    pub auth_service: Arc<AuthService>,
    pub store: Arc<dyn DocumentStore>,
    pub catalog: Arc<ProblemCatalog>,
    pub options: DashboardOptions,
    /// How long a socket may stay unauthenticated before it is treated as signed out.
    pub auth_grace_period: Duration,
}

impl DashboardContext {
    pub fn with_auth_grace_period(mut self, period: Duration) -> Self {
        self.auth_grace_period = period;
        self
    }
}

pub async fn handle_connection(websocket: WebSocket, context: DashboardContext) {
    let session_id = SessionId::new();
    info!("New dashboard session: {}", session_id);

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let session_manager = context.session_manager.clone();
    let message_receiver = session_manager.create_session(session_id).await;

    // Each socket gets its own identity stream, fed by its auth messages
    let identity = Arc::new(ChannelIdentityProvider::new());
    let view_model = DashboardViewModel::mount(
        context.store.clone(),
        identity.as_ref(),
        context.options.clone(),
    );

    let _ = session_manager
        .send_to_session(
            session_id,
            ServerMessage::Problems {
                problems: context.catalog.problems().to_vec(),
            },
        )
        .await;
    let forwarder = tokio::spawn(forward_updates(
        view_model.watch(),
        session_id,
        session_manager.clone(),
    ));

    // Clients that never authenticate count as signed out
    let grace_timer = tokio::spawn({
        let identity = identity.clone();
        let period = context.auth_grace_period;
        async move {
            tokio::time::sleep(period).await;
            if identity.publish_initial(IdentityEvent::SignedOut) {
                info!("Session {} did not authenticate in time", session_id);
            }
        }
    });

    let message_handler = MessageHandler::new(
        session_id,
        session_manager.clone(),
        context.auth_service.clone(),
        identity,
    );

    let incoming_handler = {
        let session_manager = session_manager.clone();
        let mut rate_limiter = RateLimiter::new();

        async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(msg) => {
                        if let Err(e) = handle_message(
                            msg,
                            &mut rate_limiter,
                            &message_handler,
                            &session_manager,
                            session_id,
                        )
                        .await
                        {
                            error!("Error handling message for {}: {}", session_id, e);
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("WebSocket error for {}: {}", session_id, e);
                        break;
                    }
                }
            }
        }
    };

    let outgoing_handler = async move {
        let mut receiver = message_receiver;

        while let Some(message) = receiver.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize message: {:?}", e);
                    continue;
                }
            };

            if let Err(e) = ws_sender.send(Message::text(json)).await {
                warn!("Failed to send message to {}: {:?}", session_id, e);
                break;
            }
        }
    };

    tokio::select! {
        _ = incoming_handler => {},
        _ = outgoing_handler => {},
    }

    info!("Session {} disconnected", session_id);
    grace_timer.abort();
    forwarder.abort();
    view_model.unmount().await;
    session_manager.remove_session(session_id).await;
}

async fn handle_message(
    msg: Message,
    rate_limiter: &mut RateLimiter,
    message_handler: &MessageHandler,
    session_manager: &SessionManager,
    session_id: SessionId,
) -> Result<(), String> {
    if !rate_limiter.try_acquire() {
        warn!("Rate limit exceeded for session {}", session_id);
        let _ = session_manager
            .send_to_session(
                session_id,
                ServerMessage::ConnectionError {
                    error: ConnectionError::RateLimitExceeded,
                },
            )
            .await;
        return Err("Rate limit exceeded".to_string());
    }

    if !msg.is_text() {
        return Ok(());
    }

    let text = msg.to_str().map_err(|_| "Invalid text message")?;

    let client_message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            warn!("Invalid message from {}: {}", session_id, e);
            return session_manager
                .send_to_session(
                    session_id,
                    ServerMessage::ConnectionError {
                        error: ConnectionError::InvalidMessage {
                            reason: e.to_string(),
                        },
                    },
                )
                .await;
        }
    };

    message_handler
        .handle_message(client_message)
        .await
        .map_err(|e| format!("Message handling error: {}", e))
}

/// Push view-state changes to the client, skipping repeats. Every sign-out
/// produces its own redirect.
async fn forward_updates(
    mut model: watch::Receiver<DashboardModel>,
    session_id: SessionId,
    session_manager: Arc<SessionManager>,
) {
    let mut last_state: Option<ViewState> = None;
    let mut last_sign_outs = 0;

    loop {
        let (state, redirect, sign_outs) = {
            let current = model.borrow_and_update();
            (current.view_state(), current.redirect.clone(), current.sign_outs)
        };

        if sign_outs != last_sign_outs {
            if let Some(location) = redirect {
                let message = ServerMessage::Redirect { location };
                if session_manager.send_to_session(session_id, message).await.is_err() {
                    break;
                }
            }
            last_sign_outs = sign_outs;
        }

        if last_state.as_ref() != Some(&state) {
            let message = ServerMessage::StateUpdate {
                state: state.clone(),
            };
            if session_manager.send_to_session(session_id, message).await.is_err() {
                break;
            }
            last_state = Some(state);
        }

        if model.changed().await.is_err() {
            break;
        }
    }
}
