//! WebSocket progress streaming (§4.13) with backpressure and heartbeat, in the teacher's
//! bounded-mpsc + `tokio::select!` fan-in shape.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};

use clipcast_models::{EventKind, Identity, JobId};

use crate::auth::AuthUser;
use crate::metrics;
use crate::state::AppState;

static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

const WS_SEND_BUFFER_SIZE: usize = 32;
const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Send a WebSocket text message with backpressure handling.
async fn send_ws_message(tx: &mpsc::Sender<Message>, json: String) -> bool {
    match tx.try_send(Message::Text(json.clone())) {
        Ok(_) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            debug!("WebSocket send buffer full, applying backpressure");
            tx.send(Message::Text(json)).await.is_ok()
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

/// GET /ws/jobs/:job_id
///
/// Streams progress events for a job the caller owns. Closes once a terminal event
/// (`complete`/`error`) arrives.
pub async fn ws_job_progress(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    AuthUser(caller): AuthUser,
) -> impl IntoResponse {
    let job_id = JobId::from_string(job_id);

    match state.orchestrator.query_job(&caller, &job_id).await {
        Ok(_) => {}
        Err(e) => {
            return e.into_response();
        }
    }

    let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_ws_active_connections(count);
    metrics::record_ws_connection("job_progress");

    ws.on_upgrade(move |socket| async move {
        handle_job_socket(socket, state, job_id, caller).await;
        let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_ws_active_connections(count);
    })
    .into_response()
}

async fn handle_job_socket(socket: WebSocket, state: AppState, job_id: JobId, caller: Identity) {
    let (ws_sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(WS_SEND_BUFFER_SIZE);

    let send_task = tokio::spawn(async move {
        let mut ws_sender = ws_sender;
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
        ws_sender
    });

    info!(job_id = %job_id, caller = %caller, "job progress websocket opened");

    match state.progress.subscribe(&job_id).await {
        Ok(mut stream) => {
            let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
            let mut last_activity = std::time::Instant::now();

            loop {
                tokio::select! {
                    stored = stream.next() => {
                        match stored {
                            Some(stored) => {
                                last_activity = std::time::Instant::now();
                                let msg_type = match stored.event.kind {
                                    EventKind::Progress => "progress",
                                    EventKind::Complete => "complete",
                                    EventKind::Error => "error",
                                    EventKind::RegenUpdate => "regen_update",
                                    EventKind::RegenComplete => "regen_complete",
                                    EventKind::RegenError => "regen_error",
                                };
                                metrics::record_ws_message_sent("job_progress", msg_type);

                                let Ok(json) = serde_json::to_string(&stored.event) else { continue };
                                if !send_ws_message(&tx, json).await {
                                    warn!("WebSocket send failed, client disconnected");
                                    break;
                                }

                                if matches!(stored.event.kind, EventKind::Complete | EventKind::Error) {
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                    _ = heartbeat.tick() => {
                        if last_activity.elapsed() > WS_HEARTBEAT_INTERVAL / 2
                            && tx.send(Message::Ping(vec![])).await.is_err() {
                            warn!("Heartbeat failed, client disconnected");
                            break;
                        }
                    }
                    client_msg = receiver.next() => {
                        match client_msg {
                            Some(Ok(Message::Pong(_))) => {
                                last_activity = std::time::Instant::now();
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                info!("Client closed connection");
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            }
        }
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "failed to subscribe to progress");
        }
    }

    drop(tx);
    let _ = send_task.await;
    info!(job_id = %job_id, "job progress websocket closed");
}
