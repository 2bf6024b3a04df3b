use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::errors::ScrollError;

use super::{ScrollHooks, Transition};

struct Job {
    transitions: Vec<Transition>,
    done: oneshot::Sender<anyhow::Result<()>>,
}

/// Single-worker queue running hook transitions strictly one at a time, in
/// submission order, across every caller.
pub struct TransitionQueue {
    tx: mpsc::UnboundedSender<Job>,
    worker: JoinHandle<()>,
}

impl TransitionQueue {
    /// Start the worker. Must be called inside a tokio runtime.
    pub fn spawn<H: ScrollHooks>(hooks: Arc<H>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let result = run_job(hooks.as_ref(), &job.transitions).await;
                if let Err(err) = &result {
                    log::debug!("transition job {:?} failed: {err}", job.transitions);
                }
                let _ = job.done.send(result);
            }
        });
        Self { tx, worker }
    }

    /// Enqueue transitions and wait until they (and everything queued before
    /// them) have run. A failing hook stops the rest of its job.
    pub async fn submit(&self, transitions: Vec<Transition>) -> Result<(), ScrollError> {
        let (done, wait) = oneshot::channel();
        self.tx
            .send(Job { transitions, done })
            .map_err(|_| ScrollError::QueueClosed)?;
        wait.await.map_err(|_| ScrollError::QueueClosed)??;
        Ok(())
    }
}

impl Drop for TransitionQueue {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_job<H: ScrollHooks + ?Sized>(
    hooks: &H,
    transitions: &[Transition],
) -> anyhow::Result<()> {
    for transition in transitions {
        match transition {
            Transition::Next => hooks.next().await?,
            Transition::Previous => hooks.previous().await?,
            Transition::ThresholdLeave => hooks.on_threshold_leave().await?,
        }
    }
    Ok(())
}
