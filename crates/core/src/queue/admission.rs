use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::metrics;

type RunFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The queue has been shut down.
    #[error("Admission queue is shut down")]
    Closed,
}

/// Snapshot of queue occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    /// Runs accepted but not yet started.
    pub queued: usize,
    /// Runs currently executing.
    pub active: usize,
    pub concurrency: usize,
}

struct QueuedRun {
    job_id: String,
    run: RunFuture,
}

#[derive(Default)]
struct Counters {
    queued: AtomicUsize,
    active: AtomicUsize,
}

/// One started run. Dropping it frees the slot, including when the run
/// panics.
struct ActiveRun {
    job_id: String,
    counters: Arc<Counters>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        metrics::ADMISSION_ACTIVE.dec();
        if std::thread::panicking() {
            warn!(job_id = %self.job_id, "Job run panicked");
        }
    }
}

/// FIFO queue that owns the task executing job runs.
///
/// Must be created inside a tokio runtime; the dispatcher is spawned on
/// construction.
pub struct AdmissionQueue {
    tx: mpsc::UnboundedSender<QueuedRun>,
    counters: Arc<Counters>,
    concurrency: usize,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl AdmissionQueue {
    /// Creates a queue running at most `concurrency` jobs at once.
    pub fn new(concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = broadcast::channel(1);

        let queue = Self {
            tx,
            counters: Arc::new(Counters::default()),
            concurrency,
            running: Arc::new(AtomicBool::new(true)),
            shutdown_tx,
        };
        queue.spawn_dispatcher(rx);
        queue
    }

    /// Appends a run to the queue. Never waits for a slot.
    pub fn enqueue<F>(&self, job_id: impl Into<String>, run: F) -> Result<(), QueueError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.running.load(Ordering::SeqCst) {
            return Err(QueueError::Closed);
        }

        let job_id = job_id.into();
        self.counters.queued.fetch_add(1, Ordering::SeqCst);
        metrics::ADMISSION_QUEUE_DEPTH.inc();

        self.tx
            .send(QueuedRun {
                job_id: job_id.clone(),
                run: Box::pin(run),
            })
            .map_err(|_| {
                self.counters.queued.fetch_sub(1, Ordering::SeqCst);
                metrics::ADMISSION_QUEUE_DEPTH.dec();
                QueueError::Closed
            })?;

        debug!(job_id = %job_id, "Job admitted to queue");
        Ok(())
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            queued: self.counters.queued.load(Ordering::SeqCst),
            active: self.counters.active.load(Ordering::SeqCst),
            concurrency: self.concurrency,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops dispatching. Runs already started continue; queued runs are
    /// dropped and later enqueues fail.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("Shutting down admission queue");
        let _ = self.shutdown_tx.send(());
    }

    fn spawn_dispatcher(&self, mut rx: mpsc::UnboundedReceiver<QueuedRun>) {
        let counters = Arc::clone(&self.counters);
        let slots = Arc::new(Semaphore::new(self.concurrency));
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            debug!("Admission dispatcher started");
            loop {
                let next = tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    next = rx.recv() => next,
                };
                let Some(queued) = next else {
                    break;
                };

                // Hold the head of the queue until a slot frees up.
                let permit = tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    permit = Arc::clone(&slots).acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };

                counters.queued.fetch_sub(1, Ordering::SeqCst);
                counters.active.fetch_add(1, Ordering::SeqCst);
                metrics::ADMISSION_QUEUE_DEPTH.dec();
                metrics::ADMISSION_ACTIVE.inc();
                debug!(job_id = %queued.job_id, "Job run started");

                let active = ActiveRun {
                    job_id: queued.job_id,
                    counters: Arc::clone(&counters),
                    _permit: permit,
                };
                tokio::spawn(async move {
                    queued.run.await;
                    drop(active);
                });
            }

            // Anything left behind never starts.
            rx.close();
            let mut dropped = 0usize;
            while rx.try_recv().is_ok() {
                dropped += 1;
            }
            let left = counters.queued.swap(0, Ordering::SeqCst);
            metrics::ADMISSION_QUEUE_DEPTH.sub(left as i64);
            debug!(dropped, "Admission dispatcher stopped");
        });
    }
}

impl Drop for AdmissionQueue {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
    }
}
