use super::{EventSubscription, SHUTDOWN_GRACE};
use crate::config::Commitment;
use crate::error::AuthorityError;
use crate::program::parse_log_events;
use crate::types::{Pubkey, ResolutionEvent};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, trace, warn};

const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(10);
const SUBSCRIBE_REQUEST_ID: u64 = 1;

type EventItem = Result<ResolutionEvent, AuthorityError>;

#[derive(Debug, Deserialize)]
struct SubscribeReply {
    id: Option<u64>,
    result: Option<u64>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Notification {
    method: String,
    params: NotificationParams,
}

#[derive(Debug, Deserialize)]
struct NotificationParams {
    subscription: u64,
    result: NotificationResult,
}

#[derive(Debug, Deserialize)]
struct NotificationResult {
    value: LogsValue,
}

#[derive(Debug, Deserialize)]
struct LogsValue {
    signature: String,
    err: Option<Value>,
    #[serde(default)]
    logs: Vec<String>,
}

/// Subscribe to the logs of every transaction mentioning `player` and
/// stream out the dice results found in them.
pub async fn subscribe_logs(
    ws_url: &str,
    player: &Pubkey,
    commitment: Commitment,
    capacity: usize,
) -> Result<EventSubscription, AuthorityError> {
    let (mut ws, _) = tokio_tungstenite::connect_async(ws_url).await?;

    let request = json!({
        "jsonrpc": "2.0",
        "id": SUBSCRIBE_REQUEST_ID,
        "method": "logsSubscribe",
        "params": [
            { "mentions": [player.to_string()] },
            { "commitment": commitment.as_str() }
        ]
    });
    ws.send(Message::Text(request.to_string())).await?;

    let id = tokio::time::timeout(SUBSCRIBE_TIMEOUT, await_subscription_id(&mut ws))
        .await
        .map_err(|_| AuthorityError::subscription("timed out waiting for logsSubscribe reply"))??;

    info!(subscription = id, player = %player, "subscribed to program logs");

    let (tx, rx) = mpsc::channel(capacity);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(read_notifications(ws, id, tx, shutdown_rx));

    Ok(EventSubscription::new(id, rx, shutdown_tx, handle))
}

async fn await_subscription_id<S>(ws: &mut WebSocketStream<S>) -> Result<u64, AuthorityError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(msg) = ws.next().await {
        let text = match msg? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let reply: SubscribeReply = match serde_json::from_str(&text) {
            Ok(reply) => reply,
            Err(e) => {
                trace!(error = %e, "ignoring message before subscription reply");
                continue;
            }
        };
        if reply.id != Some(SUBSCRIBE_REQUEST_ID) {
            continue;
        }
        if let Some(error) = reply.error {
            return Err(AuthorityError::subscription(format!(
                "logsSubscribe rejected: {}",
                error
            )));
        }
        return reply
            .result
            .ok_or_else(|| AuthorityError::subscription("logsSubscribe reply without id"));
    }

    Err(AuthorityError::subscription(
        "connection closed before subscription was confirmed",
    ))
}

async fn read_notifications<S>(
    mut ws: WebSocketStream<S>,
    subscription: u64,
    tx: mpsc::Sender<EventItem>,
    mut shutdown: oneshot::Receiver<()>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                let goodbye = async {
                    let request = json!({
                        "jsonrpc": "2.0",
                        "id": SUBSCRIBE_REQUEST_ID + 1,
                        "method": "logsUnsubscribe",
                        "params": [subscription]
                    });
                    if let Err(e) = ws.send(Message::Text(request.to_string())).await {
                        debug!(subscription, error = %e, "logsUnsubscribe not sent");
                    }
                    let _ = ws.close(None).await;
                };
                if tokio::time::timeout(SHUTDOWN_GRACE, goodbye).await.is_err() {
                    debug!(subscription, "logsUnsubscribe timed out");
                }
                break;
            }
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    for item in parse_notification(&text, subscription) {
                        if tx.send(item).await.is_err() {
                            return; // receiver dropped
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!(subscription, "WebSocket closed");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(subscription, error = %e, "WebSocket error");
                    let _ = tx.send(Err(e.into())).await;
                    break;
                }
            }
        }
    }
}

/// Dice results carried by one PubSub message. Messages for other
/// subscriptions, non-log notifications and failed transactions yield
/// nothing.
fn parse_notification(text: &str, subscription: u64) -> Vec<EventItem> {
    let notification: Notification = match serde_json::from_str(text) {
        Ok(notification) => notification,
        Err(e) => {
            trace!(error = %e, "ignoring non-notification message");
            return Vec::new();
        }
    };

    if notification.method != "logsNotification" || notification.params.subscription != subscription {
        trace!(method = %notification.method, "ignoring notification");
        return Vec::new();
    }

    let value = notification.params.result.value;
    if value.err.is_some() {
        debug!(signature = %value.signature, "skipping failed transaction");
        return Vec::new();
    }

    parse_log_events(&value.logs)
        .into_iter()
        .map(|item| item.map_err(AuthorityError::from))
        .collect()
}
