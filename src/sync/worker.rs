//! Background batch execution.
//!
//! A single named thread drains a job queue, so batches never overlap and
//! run in submission order. The caller only pays for the selection
//! snapshot; everything else happens on the worker.

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;

use super::{BatchReport, SyncContext, SyncEvent, run_batch};
use crate::error::{Error, Result};
use crate::host::SelectionSnapshot;

enum Job {
    Batch {
        snapshot: SelectionSnapshot,
        reply: oneshot::Sender<BatchReport>,
    },
    Shutdown,
}

/// Handle to a queued batch.
///
/// Resolves to the [`BatchReport`] once the batch has committed. Await it,
/// or call [`wait`](BatchTicket::wait) from a non-async thread. Dropping
/// the ticket does not cancel the batch.
#[derive(Debug)]
pub struct BatchTicket {
    rx: oneshot::Receiver<BatchReport>,
}

impl BatchTicket {
    /// Block until the batch finishes.
    ///
    /// Must not be called from inside an async runtime.
    pub fn wait(self) -> Result<BatchReport> {
        self.rx.blocking_recv().map_err(|_| Error::WorkerStopped)
    }
}

impl Future for BatchTicket {
    type Output = Result<BatchReport>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| Error::WorkerStopped))
    }
}

/// Owner of the sync thread.
///
/// Dropping it lets queued batches finish, then joins the thread.
pub struct SyncWorker {
    context: Arc<SyncContext>,
    jobs: Sender<Job>,
    thread: Option<JoinHandle<()>>,
}

impl SyncWorker {
    /// Start the worker thread.
    pub fn spawn(context: Arc<SyncContext>, events: Option<Sender<SyncEvent>>) -> Result<Self> {
        let (jobs, job_rx) = unbounded();
        let thread_context = Arc::clone(&context);

        let thread = thread::Builder::new()
            .name("podsync-worker".to_string())
            .spawn(move || worker_main(thread_context, job_rx, events))?;

        tracing::debug!(target: "podsync::sync", "Sync worker started");
        Ok(Self {
            context,
            jobs,
            thread: Some(thread),
        })
    }

    /// Snapshot the current selection and queue it.
    pub fn submit(&self) -> Result<BatchTicket> {
        let snapshot = SelectionSnapshot::capture(&self.context.host);
        self.submit_snapshot(snapshot)
    }

    /// Queue an already captured snapshot.
    pub fn submit_snapshot(&self, snapshot: SelectionSnapshot) -> Result<BatchTicket> {
        let (reply, rx) = oneshot::channel();
        self.jobs
            .send(Job::Batch { snapshot, reply })
            .map_err(|_| Error::WorkerStopped)?;
        Ok(BatchTicket { rx })
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        let _ = self.jobs.send(Job::Shutdown);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::error!(target: "podsync::sync", "Sync worker panicked");
        }
        tracing::debug!(target: "podsync::sync", "Sync worker stopped");
    }
}

fn worker_main(context: Arc<SyncContext>, jobs: Receiver<Job>, events: Option<Sender<SyncEvent>>) {
    while let Ok(job) = jobs.recv() {
        match job {
            Job::Batch { snapshot, reply } => {
                let report = run_batch(&context, snapshot, events.as_ref());
                // The ticket may have been dropped
                let _ = reply.send(report);
            }
            Job::Shutdown => break,
        }
    }
}
