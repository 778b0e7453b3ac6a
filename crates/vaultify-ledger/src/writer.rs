//! Bounded worker pool for ledger appends.
//!
//! Callers enqueue events and carry on; a fixed number of workers drain the
//! queue and append through the ledger's lock. Entry order follows append
//! completion, not submission.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use vaultify_core::{LedgerEntry, LedgerEvent};

use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;

/// Default number of append workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

struct AppendJob {
    event: LedgerEvent,
    reply: oneshot::Sender<Result<LedgerEntry>>,
}

/// Handle to an enqueued append.
///
/// Dropping it does not cancel the append.
#[derive(Debug)]
pub struct PendingAppend {
    rx: oneshot::Receiver<Result<LedgerEntry>>,
}

impl PendingAppend {
    /// Wait for the append to complete.
    pub async fn wait(self) -> Result<LedgerEntry> {
        self.rx.await.map_err(|_| LedgerError::WorkerGone)?
    }

    /// The append's outcome if it has already finished.
    pub fn try_result(&mut self) -> Option<Result<LedgerEntry>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(LedgerError::WorkerGone)),
        }
    }
}

/// A fixed pool of tasks appending to a shared [`Ledger`].
pub struct LedgerWriter {
    /// `None` once shut down.
    tx: std::sync::Mutex<Option<mpsc::Sender<AppendJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl LedgerWriter {
    /// Start `workers` append tasks behind a queue of `capacity` jobs.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(ledger: Arc<Ledger>, workers: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel::<AppendJob>(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let workers: Vec<_> = (0..workers.max(1))
            .map(|id| tokio::spawn(worker_loop(id, ledger.clone(), rx.clone())))
            .collect();

        Self {
            tx: std::sync::Mutex::new(Some(tx)),
            worker_count: workers.len(),
            workers: Mutex::new(workers),
        }
    }

    fn sender(&self) -> Result<mpsc::Sender<AppendJob>> {
        self.tx
            .lock()
            .map_err(|_| LedgerError::Poisoned)?
            .clone()
            .ok_or(LedgerError::WorkerGone)
    }

    /// Enqueue an event. Waits for queue space when the queue is full.
    ///
    /// Fails with [`LedgerError::WorkerGone`] after [`LedgerWriter::shutdown`].
    pub async fn submit(&self, event: LedgerEvent) -> Result<PendingAppend> {
        let (reply, rx) = oneshot::channel();
        self.sender()?
            .send(AppendJob { event, reply })
            .await
            .map_err(|_| LedgerError::WorkerGone)?;
        Ok(PendingAppend { rx })
    }

    /// Enqueue an event and wait for its entry.
    pub async fn append(&self, event: LedgerEvent) -> Result<LedgerEntry> {
        self.submit(event).await?.wait().await
    }

    /// Number of worker tasks.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Stop accepting work, drain the queue, and wait for the workers.
    ///
    /// Later calls return immediately.
    pub async fn shutdown(&self) {
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
        let workers = std::mem::take(&mut *self.workers.lock().await);
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "ledger worker ended abnormally");
            }
        }
    }
}

async fn worker_loop(id: usize, ledger: Arc<Ledger>, rx: Arc<Mutex<mpsc::Receiver<AppendJob>>>) {
    loop {
        let job = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(AppendJob { event, reply }) = job else {
            break;
        };

        let ledger = ledger.clone();
        let result = tokio::task::spawn_blocking(move || ledger.record(&event))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(worker = id, error = %e, "ledger append task failed");
                Err(LedgerError::WorkerGone)
            });

        if let Err(e) = &result {
            tracing::warn!(worker = id, error = %e, "queued ledger append failed");
        }
        let _ = reply.send(result);
    }
    tracing::debug!(worker = id, "ledger worker stopped");
}
