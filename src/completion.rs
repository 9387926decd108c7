//! Single-resolution completion signal handed out by `load_with`.
//!
//! A [`Completion`] has exactly one writer (the step or link that created it)
//! and one reader (the caller that awaits it). When the writer side is dropped
//! without sending, e.g. because the step was loaded again and replaced its
//! signal, the reader observes [`FlowError::Superseded`].

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::FlowError;

/// Writer half of a completion signal.
pub(crate) type Resolver = oneshot::Sender<Value>;

/// Awaitable result of loading a step or link.
#[must_use = "a completion does nothing unless awaited; drop it explicitly for fire-and-forget"]
#[derive(Debug)]
pub struct Completion {
    state: CompletionState,
}

#[derive(Debug)]
enum CompletionState {
    Pending(oneshot::Receiver<Value>),
    Ready(Option<Value>),
    Failed(Option<FlowError>),
}

impl Completion {
    /// Create a pending completion and the resolver that fulfills it.
    pub(crate) fn channel() -> (Self, Resolver) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                state: CompletionState::Pending(rx),
            },
            tx,
        )
    }

    /// A completion that is already fulfilled with `value`.
    pub fn ready(value: Value) -> Self {
        Self {
            state: CompletionState::Ready(Some(value)),
        }
    }

    /// A completion that is already settled with an error.
    pub fn failed(error: FlowError) -> Self {
        Self {
            state: CompletionState::Failed(Some(error)),
        }
    }

    /// Non-blocking check: `Some` once the signal has settled.
    pub fn try_take(&mut self) -> Option<Result<Value, FlowError>> {
        match &mut self.state {
            CompletionState::Pending(rx) => match rx.try_recv() {
                Ok(value) => Some(Ok(value)),
                Err(oneshot::error::TryRecvError::Empty) => None,
                Err(oneshot::error::TryRecvError::Closed) => Some(Err(FlowError::Superseded)),
            },
            CompletionState::Ready(value) => value.take().map(Ok),
            CompletionState::Failed(error) => error.take().map(Err),
        }
    }
}

impl Future for Completion {
    type Output = Result<Value, FlowError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            CompletionState::Pending(rx) => Pin::new(rx)
                .poll(cx)
                .map(|res| res.map_err(|_| FlowError::Superseded)),
            CompletionState::Ready(value) => Poll::Ready(value.take().ok_or(FlowError::Superseded)),
            CompletionState::Failed(error) => {
                Poll::Ready(Err(error.take().unwrap_or(FlowError::Superseded)))
            }
        }
    }
}
