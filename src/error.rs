//! Error types for step and chain construction and completion

use thiserror::Error;

/// Wiring mistakes detected while building a step or a chain.
///
/// These are raised eagerly by the constructors so that a misconfigured
/// workflow fails when it is declared rather than on first submit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("step '{0}' has no modal surface")]
    MissingSurface(String),

    #[error("step '{0}' needs a form or a clickthrough link to trigger submit")]
    MissingTrigger(String),

    #[error("step '{0}' has both a form and a clickthrough link; only one may trigger submit")]
    ConflictingTriggers(String),

    #[error("step '{0}' submits remotely but has neither an error handler nor an error processor")]
    MissingErrorSink(String),

    #[error("chain requires at least two nodes, got {0}")]
    ChainTooShort(usize),

    #[error("chain exit function must be the last node, found one at position {0}")]
    ExitNotLast(usize),
}

/// Errors observed by whoever awaits a [`Completion`](crate::Completion).
#[derive(Error, Debug)]
pub enum FlowError {
    /// The signal was dropped before it resolved, e.g. because the step was
    /// loaded again and a newer caller now owns its completion.
    #[error("completion superseded before it resolved")]
    Superseded,

    #[error("no tokio runtime available to drive the workflow")]
    NoRuntime,
}
