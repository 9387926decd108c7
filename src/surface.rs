//! Capabilities a step consumes from the UI layer.
//!
//! The workflow core never renders anything itself. It asks a
//! [`ModalSurface`] to show or hide, binds a [`SubmitHandler`] to a
//! [`TriggerSource`] (a form submission or a clickthrough link), and reports
//! validation state through an optional [`ErrorProcessor`].

use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::remote::SubmitFailure;
use crate::step::StepInner;

/// The visual panel a step lives in.
pub trait ModalSurface: Send + Sync {
    /// Show the panel. Assumed synchronous and infallible.
    fn open(&self);

    /// Dismiss the panel.
    fn hide(&self);
}

/// Something the user activates to submit a step.
///
/// Implementations hold at most one handler: `bind` replaces whatever was
/// bound before, and `unbind` clears it.
pub trait TriggerSource: Send + Sync {
    fn bind(&self, handler: SubmitHandler);
    fn unbind(&self);
}

/// Optional collaborator that renders and clears validation errors.
pub trait ErrorProcessor: Send + Sync {
    /// Called before every submit attempt so stale messages never linger.
    fn clear_validation_errors(&self);

    /// Fallback sink for failed remote submissions.
    fn handle_errors(&self, failure: &SubmitFailure);
}

/// The event passed to a [`SubmitHandler`] when its trigger fires.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    default_prevented: bool,
}

impl TriggerEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress the trigger's native action (form post, link navigation).
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Handler bound to a trigger by each `load_with` call.
///
/// Holds the owning step weakly, so a trigger that outlives its step simply
/// does nothing when fired.
#[derive(Clone)]
pub struct SubmitHandler {
    step: Weak<StepInner>,
}

impl SubmitHandler {
    pub(crate) fn new(step: Weak<StepInner>) -> Self {
        Self { step }
    }

    /// Run the step's submit sequence for this trigger activation.
    pub fn handle(&self, event: &mut TriggerEvent) {
        event.prevent_default();
        match self.step.upgrade() {
            Some(step) => step.submit(),
            None => tracing::debug!("Trigger fired for a step that no longer exists"),
        }
    }

    /// Whether the owning step is still alive.
    pub fn is_live(&self) -> bool {
        self.step.strong_count() > 0
    }
}

impl std::fmt::Debug for SubmitHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmitHandler")
            .field("live", &self.is_live())
            .finish()
    }
}

/// A trigger fired programmatically, e.g. from a key press in a terminal UI.
#[derive(Debug, Default)]
pub struct ManualTrigger {
    handler: Mutex<Option<SubmitHandler>>,
}

impl ManualTrigger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Activate the trigger. Returns the event if a handler was bound.
    pub fn fire(&self) -> Option<TriggerEvent> {
        // Clone out of the lock: the handler may rebind this trigger.
        let handler = self
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        let mut event = TriggerEvent::new();
        handler.handle(&mut event);
        Some(event)
    }

    pub fn is_bound(&self) -> bool {
        self.handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl TriggerSource for ManualTrigger {
    fn bind(&self, handler: SubmitHandler) {
        *self.handler.lock().unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    fn unbind(&self) {
        self.handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
