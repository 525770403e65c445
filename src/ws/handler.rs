//! WebSocket Handler
//!
//! Handles upgrade requests and runs the per-connection read/write loop.
//! Each connection gets a reader task (dispatching inbound frames) and a
//! writer task (draining the session's outbound channel onto the socket);
//! whichever finishes first tears the other down, then the session is
//! unregistered exactly once.

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::dispatcher::{Dispatch, Dispatcher};
use super::frames::ServerFrame;
use super::registry::{RoomRegistry, SessionMessage};
use crate::api::AppState;

/// WebSocket upgrade handler, mounted at `/ws`.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let registry = Arc::clone(&state.registry);
    let dispatcher = Arc::clone(&state.dispatcher);
    ws.on_upgrade(move |socket| handle_socket(socket, registry, dispatcher))
}

/// Run one established connection to completion.
async fn handle_socket(
    socket: WebSocket,
    registry: Arc<RoomRegistry>,
    dispatcher: Arc<Dispatcher>,
) {
    let (mut sender, mut receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<SessionMessage>();

    let session_id = match registry.register(tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "Refusing WebSocket connection");
            let frame = ServerFrame::RespError {
                error: e.to_string(),
            };
            if let Ok(text) = serde_json::to_string(&frame) {
                let _ = sender.send(Message::Text(text)).await;
            }
            return;
        }
    };

    // Writer: drains the session channel onto the socket. All network
    // sends for this session happen here, never under a registry lock.
    let send_id = session_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match msg {
                SessionMessage::Frame(frame) => match serde_json::to_string(&frame) {
                    Ok(text) => {
                        if sender.send(Message::Text(text)).await.is_err() {
                            tracing::debug!(
                                session_id = %send_id,
                                "Socket send failed, stopping writer"
                            );
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize frame");
                    }
                },
                SessionMessage::Close { code, reason } => {
                    let _ = sender
                        .send(Message::Close(Some(CloseFrame {
                            code,
                            reason: reason.into(),
                        })))
                        .await;
                    break;
                }
            }
        }
    });

    // Reader: dispatches inbound frames until close-or-error.
    let recv_registry = Arc::clone(&registry);
    let recv_id = session_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            let message = match result {
                Ok(message) => message,
                Err(e) => {
                    tracing::debug!(
                        session_id = %recv_id,
                        error = %e,
                        "Socket receive error"
                    );
                    break;
                }
            };

            match message {
                Message::Text(text) => {
                    match dispatcher.dispatch(&recv_id, &text).await {
                        Dispatch::Reply(frame) => {
                            if recv_registry.send_to(&recv_id, frame).await.is_err() {
                                break;
                            }
                        }
                        Dispatch::Close => {
                            // The writer sends the close frame and stops;
                            // keep reading until the socket winds down.
                            recv_registry
                                .close_session(&recv_id, close_code::NORMAL, "closed by request")
                                .await;
                        }
                    }
                }
                Message::Binary(_) => {
                    let frame = ServerFrame::RespError {
                        error: "Binary frames are not supported".to_string(),
                    };
                    let _ = recv_registry.send_to(&recv_id, frame).await;
                }
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Close(_) => {
                    tracing::debug!(session_id = %recv_id, "Viewer closed the connection");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    registry.unregister(&session_id).await;
}
