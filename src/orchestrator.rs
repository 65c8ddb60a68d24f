//! Background dispatch with completions marshalled back to the UI task.
//!
//! Work runs on its own tokio task. When it finishes, the caller's completion
//! closure is boxed and queued; the event loop pops it and runs it against the
//! state it owns. Nothing a worker does touches UI state directly.

use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::TransportError;

/// A completion waiting to be applied on the UI task.
pub type Continuation<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Dispatch handle. Cheap to clone; every clone feeds the same queue.
pub struct Orchestrator<S> {
    tx: mpsc::UnboundedSender<Continuation<S>>,
}

impl<S> Clone for Orchestrator<S> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

/// The receiving end, polled only by the UI task.
pub struct Completions<S> {
    rx: mpsc::UnboundedReceiver<Continuation<S>>,
}

pub fn channel<S>() -> (Orchestrator<S>, Completions<S>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Orchestrator { tx }, Completions { rx })
}

impl<S: 'static> Orchestrator<S> {
    /// Run `work` off the UI task and queue `on_complete` with its result.
    ///
    /// `on_complete` is queued exactly once, after `work` has finished, on
    /// every path. A panic inside `work` arrives as
    /// [`TransportError::Internal`].
    pub fn dispatch<T, W, C>(&self, label: &'static str, work: W, on_complete: C)
    where
        T: Send + 'static,
        W: Future<Output = Result<T, TransportError>> + Send + 'static,
        C: FnOnce(&mut S, Result<T, TransportError>) + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            debug!(label, "dispatched");
            let result = match tokio::spawn(work).await {
                Ok(result) => result,
                Err(join_err) => {
                    error!(label, error = %join_err, "worker failed");
                    Err(TransportError::Internal {
                        reason: format!("{} failed: {}", label, join_err),
                    })
                }
            };
            debug!(label, ok = result.is_ok(), "finished");

            let continuation: Continuation<S> = Box::new(move |state| on_complete(state, result));
            if tx.send(continuation).is_err() {
                debug!(label, "ui gone, dropping completion");
            }
        });
    }
}

impl<S> Completions<S> {
    /// Wait for the next finished call.
    pub async fn next(&mut self) -> Option<Continuation<S>> {
        self.rx.recv().await
    }

    /// Pop a finished call without waiting.
    pub fn try_next(&mut self) -> Option<Continuation<S>> {
        self.rx.try_recv().ok()
    }
}
