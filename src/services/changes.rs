//! Change notifications for connected clients

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChangeTable {
    Books,
    Members,
    Categories,
    Circulation,
    Feedback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

/// A committed row change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChangeEvent {
    pub table: ChangeTable,
    pub action: ChangeAction,
    pub id: Uuid,
}

impl ChangeEvent {
    pub fn new(table: ChangeTable, action: ChangeAction, id: Uuid) -> Self {
        Self { table, action, id }
    }
}

/// Sink for change events. Services publish only after a successful commit.
pub trait ChangeNotifier: Send + Sync {
    fn publish(&self, event: ChangeEvent);
}

/// Broadcast-backed notifier. Slow subscribers lose old events instead of
/// holding back publishers.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Events for `table` (all tables when `None`), skipping anything lost to lag
    pub fn stream(&self, table: Option<ChangeTable>) -> impl Stream<Item = ChangeEvent> {
        BroadcastStream::new(self.tx.subscribe()).filter_map(move |item| match item {
            Ok(event) if table.map(|t| t == event.table).unwrap_or(true) => Some(event),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Change subscriber lagging: {}", e);
                None
            }
        })
    }

    /// Run `callback` for every change to `table` until the returned task is aborted
    pub fn subscribe<F>(&self, table: ChangeTable, callback: F) -> JoinHandle<()>
    where
        F: Fn(ChangeEvent) + Send + 'static,
    {
        let mut stream = Box::pin(self.stream(Some(table)));
        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                callback(event);
            }
        })
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ChangeNotifier for ChangeFeed {
    fn publish(&self, event: ChangeEvent) {
        tracing::debug!(?event, "Publishing change");
        // No subscriber is not an error
        let _ = self.tx.send(event);
    }
}

/// Notifier that drops every event
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn publish(&self, _event: ChangeEvent) {}
}
