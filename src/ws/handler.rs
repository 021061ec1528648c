//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::game::room::ConnectionId;
use crate::game::EngineHandle;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::parse_client_msg;

/// Frames queued for one slow client before snapshots start being skipped
const OUTBOUND_QUEUE: usize = 4;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (ws_sink, ws_stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);

    let conn_id = match state.engine.connect(outbound_tx).await {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "Rejecting connection");
            return;
        }
    };
    info!(conn_id, "New WebSocket connection");

    let writer_handle = tokio::spawn(run_writer(conn_id, ws_sink, outbound_rx));

    let limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);
    run_reader(conn_id, ws_stream, &state.engine, &limiter).await;

    // Removes the player (and the room, if it was the last one) right away
    if let Err(e) = state.engine.disconnect(conn_id).await {
        debug!(conn_id, error = %e, "Disconnect not delivered");
    }
    writer_handle.abort();

    info!(conn_id, "WebSocket connection closed");
}

/// Engine frames -> WebSocket
async fn run_writer(
    conn_id: ConnectionId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<String>,
) {
    while let Some(frame) = outbound_rx.recv().await {
        if let Err(e) = ws_sink.send(Message::Text(frame)).await {
            debug!(conn_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

/// WebSocket -> engine. Anything unusable is dropped without a reply.
async fn run_reader(
    conn_id: ConnectionId,
    mut ws_stream: SplitStream<WebSocket>,
    engine: &EngineHandle,
    limiter: &ConnectionRateLimiter,
) {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !limiter.check() {
                    debug!(conn_id, "Rate limited message dropped");
                    continue;
                }

                match parse_client_msg(&text) {
                    Ok(msg) => {
                        if engine.send(conn_id, msg).await.is_err() {
                            warn!(conn_id, "Session engine gone");
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(conn_id, error = %e, "Dropping client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                debug!(conn_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                debug!(conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }
}
