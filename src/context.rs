//! Cancellation and deadline propagation
//!
//! Every hosting operation takes a `Context`. A context can be cancelled
//! explicitly through its `CancelHandle`, or expire at a deadline. Child
//! contexts observe their parent, so cancelling a parent stops everything
//! derived from it. The hosting layer imposes no timeout of its own.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Why a context is done
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation and deadline scope for an operation
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
    parent: Option<Arc<Context>>,
}

/// Cancels the context it was created with
///
/// Dropping the handle without calling `cancel` leaves the context live.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context that can be cancelled through the returned handle
    pub fn with_cancel(&self) -> (Context, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Context {
            cancel: Some(rx),
            deadline: None,
            parent: self.as_parent(),
        };
        (ctx, CancelHandle { tx })
    }

    /// Derive a context that expires after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Context {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context that expires at `deadline`
    pub fn with_deadline(&self, deadline: Instant) -> Context {
        Context {
            cancel: None,
            deadline: Some(deadline),
            parent: self.as_parent(),
        }
    }

    /// The earliest deadline in effect for this context
    pub fn deadline(&self) -> Option<Instant> {
        let inherited = self.parent.as_ref().and_then(|p| p.deadline());
        match (self.deadline, inherited) {
            (Some(own), Some(parent)) => Some(own.min(parent)),
            (own, parent) => own.or(parent),
        }
    }

    /// Returns why the context is done, or `None` while it is still live
    pub fn err(&self) -> Option<ContextError> {
        if let Some(rx) = &self.cancel {
            if *rx.borrow() {
                return Some(ContextError::Cancelled);
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Some(ContextError::DeadlineExceeded);
            }
        }
        self.parent.as_ref().and_then(|p| p.err())
    }

    /// Resolves once the context is cancelled or its deadline passes.
    ///
    /// Never resolves for a background context.
    pub fn done(&self) -> Pin<Box<dyn Future<Output = ContextError> + Send + '_>> {
        Box::pin(async move {
            let cancelled = async {
                match &self.cancel {
                    Some(rx) => {
                        let mut rx = rx.clone();
                        let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
                        if closed {
                            std::future::pending::<()>().await;
                        }
                    }
                    None => std::future::pending::<()>().await,
                }
            };
            let expired = async {
                match self.deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };
            let inherited = async {
                match &self.parent {
                    Some(parent) => parent.done().await,
                    None => std::future::pending::<ContextError>().await,
                }
            };

            tokio::select! {
                () = cancelled => ContextError::Cancelled,
                () = expired => ContextError::DeadlineExceeded,
                reason = inherited => reason,
            }
        })
    }

    fn as_parent(&self) -> Option<Arc<Context>> {
        if self.cancel.is_none() && self.deadline.is_none() && self.parent.is_none() {
            None
        } else {
            Some(Arc::new(self.clone()))
        }
    }
}
