use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use todotag_data::DataClient;
use todotag_types::events::{GatewayCommand, GatewayEvent};

use crate::watchers::Watchers;

/// Server sends a Ping every 15 seconds; 2 consecutive missed Pongs drop
/// the connection.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
const MAX_MISSED_PONGS: u8 = 2;

/// Serve one WebSocket connection whose credentials were resolved at the
/// HTTP upgrade. Live queries run with those credentials and all of them
/// are cancelled when the socket closes.
pub async fn handle_connection(
    socket: WebSocket,
    client: Arc<dyn DataClient>,
    username: Option<String>,
) {
    let (mut sender, mut receiver) = socket.split();
    let who = username.clone().unwrap_or_else(|| "anonymous".to_string());

    info!("{} connected to gateway", who);

    if send_event(&mut sender, &GatewayEvent::Ready { username })
        .await
        .is_err()
    {
        return;
    }

    let (event_tx, mut event_rx) = mpsc::channel::<GatewayEvent>(64);

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed: u8 = 0;

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    let Some(event) = event else { break };
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed = 0;
                    } else {
                        missed += 1;
                        if missed >= MAX_MISSED_PONGS {
                            warn!(
                                "Heartbeat timeout (missed {} pongs), dropping connection",
                                missed
                            );
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let who_recv = who.clone();
    let mut recv_task = tokio::spawn(async move {
        let mut watchers = Watchers::new(client, event_tx.clone());

        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => {
                        if let Some(reply) = watchers.handle(cmd) {
                            if event_tx.send(reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(
                            "{} bad command: {} -- raw: {}",
                            who_recv,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("{} disconnected from gateway", who);
}

async fn send_event(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: &GatewayEvent,
) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode gateway event: {}", e);
            return Ok(());
        }
    };
    sender.send(Message::Text(text.into())).await
}
