//! WebSocket subscription multiplexer.
//!
//! One physical connection carries many logical subscriptions. Subscribers
//! register a channel tag in an explicit registry; a single reader task
//! demultiplexes inbound frames to every registered consumer whose tag is
//! contained in one of the frame's tags. Each subscriber owns its own
//! unbounded queue, so a slow consumer never blocks delivery to another,
//! and per-tag arrival order is preserved.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use dashmap::DashMap;
use futures::Stream;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use fedikit_core::{Error, Event, RawEvent, Result, StreamCommand};
use fedikit_transport::{StreamingConnector, WsOutbound};

pub struct StreamingClient {
    inner: Arc<Inner>,
}

struct Inner {
    connector: Box<dyn StreamingConnector>,
    subscriptions: DashMap<u64, SubscriptionEntry>,
    next_id: AtomicU64,
    generation: AtomicU64,
    /// The live connection, if any. Mutation of connection state is
    /// serialized through this lock; registration happens under it too, so
    /// a subscriber can never attach to a connection whose reader already
    /// tore it down.
    conn: Mutex<Option<Connection>>,
}

struct Connection {
    out: mpsc::UnboundedSender<WsOutbound>,
    /// Ties registry entries to the connection that carried them, so a
    /// stale reader cannot wipe state belonging to a replacement.
    generation: u64,
    /// Cleared by the reader task on exit. A connection whose reader is
    /// gone is dead even while its writer channel stays open.
    live: Arc<AtomicBool>,
}

struct SubscriptionEntry {
    tag: String,
    generation: u64,
    sender: mpsc::UnboundedSender<Result<Event>>,
}

impl std::fmt::Debug for StreamingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingClient")
            .field("subscriptions", &self.inner.subscriptions.len())
            .finish()
    }
}

impl StreamingClient {
    pub fn new(connector: impl StreamingConnector + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector: Box::new(connector),
                subscriptions: DashMap::new(),
                next_id: AtomicU64::new(1),
                generation: AtomicU64::new(0),
                conn: Mutex::new(None),
            }),
        }
    }

    /// Subscribe to a channel, e.g. `"user"` or `"hashtag:local"` with a
    /// `tag` filter. Acquires (or reuses) the shared connection and sends
    /// the subscribe control frame.
    pub async fn subscribe(&self, stream: &str, params: Option<Value>) -> Result<Subscription> {
        let mut conn = self.inner.conn.lock().await;

        let stale = match conn.as_ref() {
            Some(c) => c.out.is_closed() || !c.live.load(Ordering::Acquire),
            None => true,
        };
        if stale {
            let raw = self.inner.connector.connect().await?;
            let (out, inbound) = raw.into_parts();
            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let live = Arc::new(AtomicBool::new(true));
            tokio::spawn(pump(
                Arc::clone(&self.inner),
                inbound,
                generation,
                Arc::clone(&live),
            ));
            *conn = Some(Connection {
                out,
                generation,
                live,
            });
        }

        let connection = conn
            .as_ref()
            .ok_or_else(|| Error::Transport("streaming connection unavailable".to_string()))?;
        let out = connection.out.clone();
        let generation = connection.generation;

        let frame = StreamCommand::subscribe(stream, params.clone()).to_json()?;
        out.send(WsOutbound::Text(frame))
            .map_err(|_| Error::Transport("streaming connection closed".to_string()))?;

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.subscriptions.insert(
            id,
            SubscriptionEntry {
                tag: stream.to_string(),
                generation,
                sender: tx,
            },
        );
        drop(conn);

        debug!(stream, id, "subscribed");

        Ok(Subscription {
            id,
            tag: stream.to_string(),
            params,
            rx,
            out,
            inner: Arc::clone(&self.inner),
        })
    }

    /// Send the mirrored unsubscribe control frame and terminate local
    /// event production for every subscription on `stream`. The shared
    /// connection stays open for the remaining subscriptions.
    pub async fn unsubscribe(&self, stream: &str, params: Option<Value>) -> Result<()> {
        let frame = StreamCommand::unsubscribe(stream, params).to_json()?;
        if let Some(connection) = self.inner.conn.lock().await.as_ref() {
            let _ = connection.out.send(WsOutbound::Text(frame));
        }

        self.inner.subscriptions.retain(|_, entry| entry.tag != stream);
        Ok(())
    }

    /// Close the shared connection and end every live subscription.
    pub async fn close(&self) {
        if let Some(connection) = self.inner.conn.lock().await.take() {
            let _ = connection.out.send(WsOutbound::Close);
        }
        self.inner.subscriptions.clear();
    }
}

/// Reader task: demultiplex inbound frames to the subscribers registered on
/// this connection generation.
async fn pump(
    inner: Arc<Inner>,
    mut inbound: mpsc::UnboundedReceiver<Result<String>>,
    generation: u64,
    live: Arc<AtomicBool>,
) {
    while let Some(frame) = inbound.recv().await {
        match frame {
            Ok(text) => {
                let raw: RawEvent = match serde_json::from_str(&text) {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!(error = %e, "skipping unparseable frame");
                        continue;
                    }
                };

                match Event::from_raw(raw) {
                    Ok(event) => deliver(&inner, generation, &event),
                    // Server-reported in-band error: terminal for the
                    // connection's subscriptions.
                    Err(err) => end_generation(&inner, generation, err),
                }
            }
            Err(err) => end_generation(&inner, generation, err),
        }
    }

    // The connection is gone. Mark it dead before touching shared state so
    // a concurrent subscribe redials instead of reusing it, then drop the
    // cached connection only if it is still ours.
    live.store(false, Ordering::Release);
    {
        let mut conn = inner.conn.lock().await;
        if conn.as_ref().is_some_and(|c| c.generation == generation) {
            *conn = None;
        }
    }

    // Anything still registered on this generation did not ask to close;
    // its subscribers get a terminal error. A clean `close` clears the
    // registry first and leaves nothing to report here.
    end_generation(
        &inner,
        generation,
        Error::Transport("streaming connection closed".to_string()),
    );
}

fn deliver(inner: &Inner, generation: u64, event: &Event) {
    let mut dropped = Vec::new();
    for entry in inner.subscriptions.iter() {
        if entry.generation == generation
            && event.matches(&entry.tag)
            && entry.sender.send(Ok(event.clone())).is_err()
        {
            dropped.push(*entry.key());
        }
    }
    for id in dropped {
        inner.subscriptions.remove(&id);
    }
}

/// Terminate every subscription registered on `generation` with `err`.
fn end_generation(inner: &Inner, generation: u64, err: Error) {
    let stale: Vec<u64> = inner
        .subscriptions
        .iter()
        .filter(|entry| entry.generation == generation)
        .map(|entry| *entry.key())
        .collect();
    for id in stale {
        if let Some((_, entry)) = inner.subscriptions.remove(&id) {
            let _ = entry.sender.send(Err(err.clone()));
        }
    }
}

/// A lazy, effectively infinite sequence of events for one channel tag.
///
/// Dropping the subscription promptly sends the unsubscribe control frame
/// and deregisters the consumer; it does not close the shared connection.
pub struct Subscription {
    id: u64,
    tag: String,
    params: Option<Value>,
    rx: mpsc::UnboundedReceiver<Result<Event>>,
    out: mpsc::UnboundedSender<WsOutbound>,
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .finish()
    }
}

impl Subscription {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Receive the next event. `None` means the subscription ended, either
    /// through unsubscribe or because the connection went away.
    pub async fn next(&mut self) -> Option<Result<Event>> {
        self.rx.recv().await
    }

    /// Collect the next `n` events.
    pub async fn take(&mut self, n: usize) -> Result<Vec<Event>> {
        let mut events = Vec::with_capacity(n);
        while events.len() < n {
            match self.rx.recv().await {
                Some(Ok(event)) => events.push(event),
                Some(Err(err)) => return Err(err),
                None => break,
            }
        }
        Ok(events)
    }
}

impl Stream for Subscription {
    type Item = Result<Event>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Deregister first so the reader stops delivering, then release the
        // server-side channel registration.
        if self.inner.subscriptions.remove(&self.id).is_some() {
            if let Ok(frame) =
                StreamCommand::unsubscribe(self.tag.clone(), self.params.clone()).to_json()
            {
                let _ = self.out.send(WsOutbound::Text(frame));
            }
        }
    }
}
