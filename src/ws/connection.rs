//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching subscription commands and forwarding filtered bus events.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::domain::{DomainEvent, DomainKey, EventFilter, Topic};

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards matching events from the [`broadcast::Receiver`] to the client.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<DomainEvent>,
    topic_prefix: String,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut subs);
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "ws read failed");
                        break;
                    }
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(domain_event) => {
                        if !subs.matches(&domain_event) {
                            continue;
                        }
                        let Some(json) = event_json(&topic_prefix, &domain_event) else {
                            continue;
                        };
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

/// Serializes an event envelope carrying its topic.
fn event_json(topic_prefix: &str, event: &DomainEvent) -> Option<String> {
    let payload = match serde_json::to_value(event) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "serializing bus event failed");
            return None;
        }
    };
    let msg = WsMessage::new(
        Topic::for_event(topic_prefix, event).to_string(),
        WsMessageType::Event,
        payload,
    );
    serde_json::to_string(&msg).ok()
}

/// Handles a text message from the client, returning an optional JSON response.
fn handle_text_message(text: &str, subs: &mut SubscriptionManager) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return serde_json::to_string(&WsMessage::error("", 400, "malformed JSON")).ok();
    };
    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return serde_json::to_string(&WsMessage::error(msg.id, 404, "unknown command")).ok();
    };

    let response = match command {
        WsCommand::Subscribe { domains, filter } => {
            let filter = match filter.as_deref().map(str::parse::<EventFilter>).transpose() {
                Ok(filter) => filter,
                Err(e) => {
                    return serde_json::to_string(&WsMessage::error(msg.id, 400, &e.to_string()))
                        .ok();
                }
            };
            let (keys, wildcard) = split_domains(&domains);
            subs.subscribe(&keys, wildcard);
            if let Some(filter) = filter {
                subs.set_filter(filter);
            }
            WsMessage::new(
                msg.id,
                WsMessageType::Response,
                serde_json::json!({
                    "subscribed": keys.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                    "filter": subs.filter().to_string(),
                }),
            )
        }
        WsCommand::Unsubscribe { domains } => {
            let (keys, wildcard) = split_domains(&domains);
            subs.unsubscribe(&keys, wildcard);
            WsMessage::new(
                msg.id,
                WsMessageType::Response,
                serde_json::json!({
                    "unsubscribed": keys.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "remaining_count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                }),
            )
        }
    };
    serde_json::to_string(&response).ok()
}

/// Splits raw domain keys into valid keys and the wildcard flag.
fn split_domains(raw: &[String]) -> (Vec<DomainKey>, bool) {
    let mut keys = Vec::new();
    let mut wildcard = false;
    for key in raw {
        if key == "*" {
            wildcard = true;
        } else {
            let key = DomainKey::new(key.as_str());
            if key.is_topic_safe() {
                keys.push(key);
            }
        }
    }
    (keys, wildcard)
}
