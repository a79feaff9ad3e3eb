//! Background compression and retention for one FileSink
//!
//! The janitor owns a single-slot request channel. A request that arrives
//! while another is already pending is dropped: the pending sweep lists the
//! directory when it runs, so it picks up every file rotated before then.

use std::io;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use super::archive::{self, ArchivePlan};

pub(crate) struct Janitor {
    requests: SyncSender<()>,
    done: Receiver<()>,
    worker: Option<JoinHandle<()>>,
    label: String,
}

impl Janitor {
    pub(crate) fn spawn(plan: ArchivePlan) -> io::Result<Self> {
        let (requests, rx) = mpsc::sync_channel::<()>(1);
        let (done_tx, done) = mpsc::channel();
        let label = plan.base_name.clone();

        let worker = thread::Builder::new()
            .name(format!("logpipe-janitor-{label}"))
            .spawn(move || {
                while rx.recv().is_ok() {
                    archive::sweep(&plan);
                }
                let _ = done_tx.send(());
            })?;

        Ok(Self {
            requests,
            done,
            worker: Some(worker),
            label,
        })
    }

    /// Ask for a sweep; never blocks the caller
    pub(crate) fn request_sweep(&self) {
        match self.requests.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(())) => debug!(sink = %self.label, "Sweep already pending"),
            Err(TrySendError::Disconnected(())) => {
                warn!(sink = %self.label, "Janitor stopped, rotated file left uncompressed")
            }
        }
    }

    /// Finish pending work, waiting at most `timeout`
    ///
    /// Returns false when the worker was still busy at the deadline; it is
    /// then left to finish on its own.
    pub(crate) fn shutdown(mut self, timeout: Duration) -> bool {
        drop(self.requests);
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                if let Some(worker) = self.worker.take() {
                    let _ = worker.join();
                }
                true
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    sink = %self.label,
                    timeout_ms = timeout.as_millis() as u64,
                    "Background compression still running at shutdown"
                );
                false
            }
        }
    }
}
