//! QueueHandle - bounded record queue drained by one dedicated worker thread

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use contracts::LogRecord;
use tracing::{debug, error, instrument};

use crate::error::DispatcherError;
use crate::metrics::QueueMetrics;
use crate::sink_set::SinkSet;

/// Messages travelling through the queue.
///
/// Control messages share the record channel, so everything queued before a
/// flush or close is written before it is acknowledged.
pub(crate) enum Command {
    Record(LogRecord),
    /// Drain, flush every sink, then acknowledge
    Flush(SyncSender<()>),
    /// Drain, flush and destroy every sink, acknowledge, stop
    Close(SyncSender<()>),
}

/// Handle to the running queue worker
pub(crate) struct QueueHandle {
    /// Channel to send records to worker
    tx: SyncSender<Command>,
    /// Shared metrics
    metrics: Arc<QueueMetrics>,
    /// Worker thread handle
    worker_handle: JoinHandle<()>,
}

impl QueueHandle {
    /// Create the bounded queue and spawn the worker thread
    pub(crate) fn spawn(
        sinks: Arc<SinkSet>,
        capacity: usize,
        metrics: Arc<QueueMetrics>,
    ) -> Result<Self, DispatcherError> {
        let (tx, rx) = mpsc::sync_channel(capacity);
        let worker_metrics = Arc::clone(&metrics);

        let worker_handle = thread::Builder::new()
            .name("logpipe-dispatch".to_string())
            .spawn(move || queue_worker(sinks, rx, worker_metrics))
            .map_err(DispatcherError::WorkerSpawn)?;

        Ok(Self {
            tx,
            metrics,
            worker_handle,
        })
    }

    /// Producer side of the queue
    pub(crate) fn sender(&self) -> QueueSender {
        QueueSender {
            tx: self.tx.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Block until everything queued so far is written and flushed
    pub(crate) fn flush(&self) -> Result<(), DispatcherError> {
        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        self.tx
            .send(Command::Flush(ack_tx))
            .map_err(|_| DispatcherError::Closed)?;
        ack_rx.recv().map_err(|_| DispatcherError::Closed)
    }

    /// Drain the queue, destroy every sink and stop the worker
    #[instrument(name = "queue_handle_shutdown", skip(self))]
    pub(crate) fn shutdown(self) {
        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        if self.tx.send(Command::Close(ack_tx)).is_ok() {
            // An Err here means the worker died early; the join below reports it
            let _ = ack_rx.recv();
        }
        drop(self.tx);
        if self.worker_handle.join().is_err() {
            error!("Dispatch worker panicked");
        }
        debug!("QueueHandle shutdown complete");
    }
}

/// Cloneable producer end, used outside the dispatcher's mode lock
#[derive(Clone)]
pub(crate) struct QueueSender {
    tx: SyncSender<Command>,
    metrics: Arc<QueueMetrics>,
}

impl QueueSender {
    /// Enqueue a record, blocking while the queue is full.
    ///
    /// Returns `false` if the worker has already stopped.
    pub(crate) fn send(&self, record: LogRecord) -> bool {
        // Count before sending: the worker may dequeue before send() returns
        self.metrics.on_enqueue();
        match self.tx.send(Command::Record(record)) {
            Ok(()) => true,
            Err(_) => {
                self.metrics.on_dequeue();
                self.metrics.inc_dropped_count();
                false
            }
        }
    }
}

/// Worker loop that consumes records and writes them to all sinks
fn queue_worker(sinks: Arc<SinkSet>, rx: Receiver<Command>, metrics: Arc<QueueMetrics>) {
    debug!("Dispatch worker started");

    while let Ok(command) = rx.recv() {
        match command {
            Command::Record(record) => {
                metrics.on_dequeue();
                sinks.write_all(&record);
            }
            Command::Flush(ack) => {
                sinks.flush_all();
                let _ = ack.send(());
            }
            Command::Close(ack) => {
                sinks.flush_all();
                sinks.destroy_all();
                let _ = ack.send(());
                debug!("Dispatch worker stopped");
                return;
            }
        }
    }

    // Every sender dropped without a close message
    sinks.flush_all();
    debug!("Dispatch worker stopped (queue disconnected)");
}
