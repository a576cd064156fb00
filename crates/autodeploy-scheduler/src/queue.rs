//! In-process event queue between intake and the deploy worker.

use autodeploy_core::PushEvent;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;

/// The worker is gone; the event was not queued and is handed back.
#[derive(Debug, Error)]
#[error("event queue is closed")]
pub struct QueueClosed(pub Box<PushEvent>);

/// FIFO hand-off from request handlers to the deploy worker.
pub struct EventQueue;

impl EventQueue {
    /// Create an unbounded queue.
    ///
    /// There is no capacity limit and so no backpressure: enqueueing never
    /// waits, whatever the worker is doing. Push traffic for a single
    /// repository is low, so memory is not a concern in practice.
    ///
    /// The sender may be cloned freely. The receiver cannot be, so there is
    /// exactly one consumer.
    pub fn unbounded() -> (EventSender, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        (
            EventSender {
                tx,
                pending: pending.clone(),
            },
            EventReceiver { rx, pending },
        )
    }
}

/// Producer side, one clone per request handler.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<PushEvent>,
    pending: Arc<AtomicUsize>,
}

impl EventSender {
    /// Queue an event. Never blocks.
    ///
    /// Returns the number of events waiting, including this one.
    pub fn enqueue(&self, event: PushEvent) -> Result<usize, QueueClosed> {
        let queued = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        match self.tx.send(event) {
            Ok(()) => Ok(queued),
            Err(mpsc::error::SendError(event)) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                Err(QueueClosed(Box::new(event)))
            }
        }
    }

    /// Events queued but not yet taken by the worker.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// True once the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side, owned by the deploy worker.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<PushEvent>,
    pending: Arc<AtomicUsize>,
}

impl EventReceiver {
    /// Wait for the next event. Returns `None` once every sender is dropped
    /// and the queue is empty.
    pub async fn recv(&mut self) -> Option<PushEvent> {
        let event = self.rx.recv().await;
        if event.is_some() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        event
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}
