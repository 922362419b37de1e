//! SinkHandle - one sink fed from a bounded snapshot mailbox
//!
//! Snapshots reach the sink in sequence order. When the mailbox is full a new
//! snapshot takes the place of the newest queued one: every snapshot is a
//! complete copy of the capture buffers, so the later copy supersedes it. The
//! most recent snapshot offered is therefore always written.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace};

use contracts::{CaptureSnapshot, SnapshotSink};

use crate::metrics::SinkMetrics;

/// Result of offering a snapshot to a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Appended behind the snapshots already waiting
    Queued,
    /// Replaced the newest waiting snapshot, whose sequence is given
    Superseded(u64),
    /// Worker has stopped; the snapshot was not taken
    Closed,
}

#[derive(Debug)]
struct MailboxState {
    waiting: VecDeque<Arc<CaptureSnapshot>>,
    closed: bool,
}

/// Bounded, latest-wins queue between the dispatcher and one sink worker
#[derive(Debug)]
struct Mailbox {
    capacity: usize,
    state: Mutex<MailboxState>,
    ready: Notify,
}

impl Mailbox {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: Mutex::new(MailboxState {
                waiting: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            ready: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MailboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn offer(&self, snapshot: Arc<CaptureSnapshot>) -> (Offer, usize) {
        let mut state = self.lock();
        if state.closed {
            return (Offer::Closed, state.waiting.len());
        }

        let full = state.waiting.len() >= self.capacity;
        let offer = match state.waiting.back_mut().filter(|_| full) {
            Some(newest) => Offer::Superseded(std::mem::replace(newest, snapshot).sequence),
            None => {
                state.waiting.push_back(snapshot);
                Offer::Queued
            }
        };
        let len = state.waiting.len();
        drop(state);

        self.ready.notify_one();
        (offer, len)
    }

    fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_one();
    }

    /// Next snapshot to write; `None` once closed and drained
    async fn next(&self) -> Option<(Arc<CaptureSnapshot>, usize)> {
        loop {
            let ready = self.ready.notified();
            {
                let mut state = self.lock();
                if let Some(snapshot) = state.waiting.pop_front() {
                    return Some((snapshot, state.waiting.len()));
                }
                if state.closed {
                    return None;
                }
            }
            ready.await;
        }
    }
}

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    mailbox: Arc<Mailbox>,
    metrics: Arc<SinkMetrics>,
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker task for `sink`
    pub fn spawn<S: SnapshotSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let mailbox = Arc::new(Mailbox::new(queue_capacity));
        let metrics = Arc::new(SinkMetrics::new());

        let worker_handle = tokio::spawn(sink_worker(
            sink,
            Arc::clone(&mailbox),
            Arc::clone(&metrics),
            name.clone(),
        ));

        Self {
            name,
            mailbox,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Hand a snapshot to the worker without waiting
    pub fn offer(&self, snapshot: Arc<CaptureSnapshot>) -> Offer {
        let sequence = snapshot.sequence;
        let (offer, queue_len) = self.mailbox.offer(snapshot);
        self.metrics.set_queue_len(queue_len);

        match offer {
            Offer::Queued => {}
            Offer::Superseded(replaced) => {
                self.metrics.record_superseded();
                trace!(sink = %self.name, replaced, sequence, "Snapshot superseded in queue");
            }
            Offer::Closed => {
                error!(sink = %self.name, sequence, "Sink worker already stopped");
            }
        }
        offer
    }

    /// Close the mailbox and wait for the worker to drain it
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(mut self) {
        self.mailbox.close();
        if let Err(e) = (&mut self.worker_handle).await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

impl Drop for SinkHandle {
    fn drop(&mut self) {
        self.mailbox.close();
    }
}

#[instrument(name = "sink_worker_loop", skip(sink, mailbox, metrics), fields(sink = %name))]
async fn sink_worker<S: SnapshotSink>(
    mut sink: S,
    mailbox: Arc<Mailbox>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!("Sink worker started");

    while let Some((snapshot, remaining)) = mailbox.next().await {
        metrics.set_queue_len(remaining);

        match sink.write(&snapshot).await {
            Ok(()) => metrics.record_written(snapshot.sequence),
            Err(e) => {
                metrics.record_failed();
                error!(sequence = snapshot.sequence, error = %e, "Write failed");
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(error = %e, "Close failed on shutdown");
    }

    debug!("Sink worker stopped");
}
