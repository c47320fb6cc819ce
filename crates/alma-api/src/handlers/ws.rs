//! WebSocket push channel

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use alma_session::Subscription;
use alma_types::{ClientFrame, ServerFrame};

use crate::state::AppState;

const OUTBOUND_CAPACITY: usize = 100;

/// Thread subscriptions owned by one connection
struct Attached {
    subscription_id: u64,
    forwarder: JoinHandle<()>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    info!("New WebSocket connection");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerFrame>(OUTBOUND_CAPACITY);

    // Forward frames to the socket
    let send_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize frame: {}", e);
                    continue;
                }
            };
            if ws_tx.send(Message::Text(json)).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    let mut attached: HashMap<String, Attached> = HashMap::new();

    while let Some(result) = ws_rx.next().await {
        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => {
                info!("Client sent close frame");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!("WebSocket error: {}", e);
                break;
            }
        };

        let frame: ClientFrame = match serde_json::from_str(&text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to parse client frame: {} - {}", e, text);
                let _ = outbound_tx
                    .send(ServerFrame::error(format!("invalid frame: {}", e)))
                    .await;
                continue;
            }
        };

        match frame {
            ClientFrame::Register { thread_id } => {
                let subscription = state.session.channel().register(thread_id.clone());
                let previous = attached.insert(
                    thread_id.clone(),
                    Attached {
                        subscription_id: subscription.id,
                        forwarder: forward(subscription, outbound_tx.clone()),
                    },
                );
                if let Some(previous) = previous {
                    previous.forwarder.abort();
                }
                debug!(thread_id = %thread_id, "Subscriber registered");
            }
            ClientFrame::Stop { thread_id } => {
                if !state.session.stop(&thread_id) {
                    debug!(thread_id = %thread_id, "Stop for idle thread ignored");
                }
            }
        }
    }

    for (thread_id, entry) in attached {
        entry.forwarder.abort();
        state
            .session
            .channel()
            .unregister(&thread_id, entry.subscription_id);
    }
    send_task.abort();
    info!("WebSocket connection closed");
}

/// Pump one thread's frames into the connection's outbound queue
fn forward(mut subscription: Subscription, outbound: mpsc::Sender<ServerFrame>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = subscription.rx.recv().await {
            if outbound.send(frame).await.is_err() {
                break;
            }
        }
    })
}
