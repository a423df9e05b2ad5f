pub mod admin;
pub mod handlers;
pub mod team;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;

use handlers::ConnectionContext;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (tx, mut outbound) = mpsc::channel::<ServerMessage>(state.outbound_buffer);
    let conn_id = state.connections.register(tx).await;
    let ctx = ConnectionContext::new(conn_id, state.remember_admin_secret);

    tracing::info!(conn_id = %ctx.id, "WebSocket connected");

    // Pongs go through the writer too, so the socket sink has a single owner
    let (pong_tx, mut pongs) = mpsc::channel::<axum::body::Bytes>(8);

    let writer_id = ctx.id.clone();
    let mut writer = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                msg = outbound.recv() => match msg {
                    Some(msg) => match serde_json::to_string(&msg) {
                        Ok(json) => Message::Text(json.into()),
                        Err(e) => {
                            tracing::error!(conn_id = %writer_id, "Failed to serialize {}: {}", msg.event(), e);
                            continue;
                        }
                    },
                    None => break,
                },
                data = pongs.recv() => match data {
                    Some(data) => Message::Pong(data),
                    None => break,
                },
            };
            if sender.send(frame).await.is_err() {
                tracing::debug!(conn_id = %writer_id, "Socket send failed, stopping writer");
                break;
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut writer => break,

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                // Rejections are reported to the client inside the handler
                                let _ = handlers::handle_message(client_msg, &ctx, &state).await;
                            }
                            Err(e) => {
                                tracing::warn!(conn_id = %ctx.id, "Failed to parse client message: {}", e);
                                let error = ServerMessage::Error {
                                    message: format!("Invalid message format: {}", e),
                                    code: "PARSE_ERROR".to_string(),
                                };
                                state.connections.send(&ctx.id, error).await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(conn_id = %ctx.id, "WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if pong_tx.try_send(data).is_err() {
                            tracing::debug!(conn_id = %ctx.id, "Dropping pong");
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(conn_id = %ctx.id, "WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    handlers::handle_disconnect(&state, &ctx).await;
    drop(pong_tx);
    writer.abort();
    tracing::info!(conn_id = %ctx.id, "WebSocket connection closed");
}
