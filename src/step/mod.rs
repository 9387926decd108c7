//! Step: one modal's load / submit / resolve lifecycle as an awaitable unit.
//!
//! A step is built once when the workflow is declared and can be loaded any
//! number of times. Each `load_with` runs the initializer with the input,
//! stores the input together with a fresh [`Completion`] resolver, rebinds
//! the submit trigger and opens the modal surface. Firing the trigger runs
//! the submit action, which ends in [`resolve`](StepInner::resolve): hide the
//! surface, then fulfill the signal.
//!
//! A step holds one pending signal at a time. Loading it again while a
//! previous load is unresolved drops the earlier signal, so only the latest
//! caller observes the result.

pub mod submit;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::completion::{Completion, Resolver};
use crate::error::ConfigError;
use crate::link::Loadable;
use crate::remote::SubmitFailure;
use crate::surface::{ErrorProcessor, ModalSurface, SubmitHandler, TriggerSource};

pub use submit::{RemoteSubmit, SubmitAction};
use submit::{merge_mixin, DataFn};

pub type InitializeFn = Arc<dyn Fn(&Value) + Send + Sync>;
pub type BeforeSubmitFn = Arc<dyn Fn() + Send + Sync>;

/// How the user submits a step. Exactly one kind per step.
#[derive(Clone)]
pub(crate) enum SubmitTrigger {
    Form(Arc<dyn TriggerSource>),
    Clickthrough(Arc<dyn TriggerSource>),
}

impl SubmitTrigger {
    fn source(&self) -> &Arc<dyn TriggerSource> {
        match self {
            Self::Form(source) | Self::Clickthrough(source) => source,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Form(_) => "form",
            Self::Clickthrough(_) => "clickthrough",
        }
    }
}

/// Every knob a step accepts. Only `surface` and one trigger are required;
/// remote steps additionally need an error sink.
#[derive(Clone, Default)]
pub struct StepOptions {
    /// Name used in logs and errors
    pub name: String,
    pub surface: Option<Arc<dyn ModalSurface>>,
    /// Form whose submission triggers the step
    pub form: Option<Arc<dyn TriggerSource>>,
    /// Link whose activation triggers the step when there is no form
    pub clickthrough_link: Option<Arc<dyn TriggerSource>>,
    /// Called with the input on every load, before the surface opens
    pub initialize: Option<InitializeFn>,
    /// Called on every trigger activation, before the submit action
    pub before_submit: Option<BeforeSubmitFn>,
    pub error_processor: Option<Arc<dyn ErrorProcessor>>,
    pub submit: SubmitAction,
}

/// Fluent front-end over [`StepOptions`].
pub struct StepBuilder {
    options: StepOptions,
}

impl StepBuilder {
    pub fn form(mut self, form: Arc<dyn TriggerSource>) -> Self {
        self.options.form = Some(form);
        self
    }

    pub fn clickthrough_link(mut self, link: Arc<dyn TriggerSource>) -> Self {
        self.options.clickthrough_link = Some(link);
        self
    }

    pub fn initialize<F>(mut self, initialize: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.options.initialize = Some(Arc::new(initialize));
        self
    }

    pub fn before_submit<F>(mut self, before_submit: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.options.before_submit = Some(Arc::new(before_submit));
        self
    }

    pub fn error_processor(mut self, processor: Arc<dyn ErrorProcessor>) -> Self {
        self.options.error_processor = Some(processor);
        self
    }

    /// Resolve locally with `updater(input)` instead of the bare input.
    pub fn resolve_with<F>(mut self, updater: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        let updater: DataFn = Arc::new(updater);
        self.options.submit = SubmitAction::LocalWith(updater);
        self
    }

    pub fn remote(mut self, remote: RemoteSubmit) -> Self {
        self.options.submit = SubmitAction::Remote(remote);
        self
    }

    pub fn build(self) -> Result<Step, ConfigError> {
        Step::build_with(self.options)
    }
}

#[derive(Default)]
struct StepState {
    input: Value,
    pending: Option<Resolver>,
    loads: u64,
}

pub(crate) struct StepInner {
    name: String,
    surface: Arc<dyn ModalSurface>,
    trigger: SubmitTrigger,
    initialize: Option<InitializeFn>,
    before_submit: Option<BeforeSubmitFn>,
    error_processor: Option<Arc<dyn ErrorProcessor>>,
    action: SubmitAction,
    state: Mutex<StepState>,
}

/// Handle to a modal step. Cloning shares the same step.
#[derive(Clone)]
pub struct Step {
    inner: Arc<StepInner>,
}

impl Step {
    pub fn builder(name: impl Into<String>, surface: Arc<dyn ModalSurface>) -> StepBuilder {
        StepBuilder {
            options: StepOptions {
                name: name.into(),
                surface: Some(surface),
                ..StepOptions::default()
            },
        }
    }

    /// Validate the options and build the step.
    pub fn build_with(options: StepOptions) -> Result<Self, ConfigError> {
        let StepOptions {
            name,
            surface,
            form,
            clickthrough_link,
            initialize,
            before_submit,
            error_processor,
            submit,
        } = options;

        let surface = surface.ok_or_else(|| ConfigError::MissingSurface(name.clone()))?;

        let trigger = match (form, clickthrough_link) {
            (Some(form), None) => SubmitTrigger::Form(form),
            (None, Some(link)) => SubmitTrigger::Clickthrough(link),
            (None, None) => return Err(ConfigError::MissingTrigger(name)),
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingTriggers(name)),
        };

        if let SubmitAction::Remote(remote) = &submit {
            if !remote.has_error_handler() && error_processor.is_none() {
                return Err(ConfigError::MissingErrorSink(name));
            }
        }

        tracing::debug!(step = %name, trigger = trigger.kind(), remote = submit.is_remote(), "Built step");

        Ok(Self {
            inner: Arc::new(StepInner {
                name,
                surface,
                trigger,
                initialize,
                before_submit,
                error_processor,
                action: submit,
                state: Mutex::new(StepState::default()),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Input of the most recent load (`Null` before the first load).
    pub fn input(&self) -> Value {
        self.inner.lock_state().input.clone()
    }

    /// Whether a load is waiting for its trigger to fire.
    pub fn is_pending(&self) -> bool {
        self.inner.lock_state().pending.is_some()
    }

    /// Number of times this step has been loaded.
    pub fn load_count(&self) -> u64 {
        self.inner.lock_state().loads
    }

    pub fn load(&self) -> Completion {
        self.load_with(Value::Null)
    }

    pub fn load_with(&self, input: Value) -> Completion {
        let inner = &self.inner;

        if let Some(initialize) = &inner.initialize {
            initialize(&input);
        }

        // Input and resolver are swapped together so a submit always pairs
        // the stored input with the caller that receives it.
        let (completion, resolver) = Completion::channel();
        let (load, previous) = {
            let mut state = inner.lock_state();
            state.input = input;
            state.loads += 1;
            (state.loads, state.pending.replace(resolver))
        };
        if previous.is_some_and(|previous| !previous.is_closed()) {
            tracing::warn!(
                step = %inner.name,
                load,
                "Step reloaded before its previous load resolved; earlier waiter will not be notified"
            );
        }

        let source = inner.trigger.source();
        source.unbind();
        source.bind(SubmitHandler::new(Arc::downgrade(inner)));

        tracing::debug!(step = %inner.name, load, "Opening step");
        inner.surface.open();

        completion
    }
}

impl Loadable for Step {
    fn load_with(&self, input: Value) -> Completion {
        Step::load_with(self, input)
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.inner.name)
            .field("trigger", &self.inner.trigger.kind())
            .field("remote", &self.inner.action.is_remote())
            .finish()
    }
}

impl StepInner {
    fn lock_state(&self) -> MutexGuard<'_, StepState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Submit sequence run by the bound trigger handler.
    pub(crate) fn submit(self: &Arc<Self>) {
        tracing::debug!(step = %self.name, "Submit triggered");

        if let Some(processor) = &self.error_processor {
            processor.clear_validation_errors();
        }
        if let Some(before_submit) = &self.before_submit {
            before_submit();
        }

        let input = self.lock_state().input.clone();
        match &self.action {
            SubmitAction::Local => self.resolve(input),
            SubmitAction::LocalWith(updater) => self.resolve(updater(&input)),
            SubmitAction::Remote(remote) => self.submit_remote(remote.clone(), input),
        }
    }

    fn submit_remote(self: &Arc<Self>, remote: RemoteSubmit, input: Value) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(step = %self.name, "No tokio runtime available for remote submit");
            self.report_failure(
                &remote,
                &SubmitFailure::transport("no async runtime available to submit"),
            );
            return;
        };

        let data = (remote.data)(&input);
        let step = Arc::clone(self);
        runtime.spawn(async move {
            match remote
                .submitter
                .submit(remote.method, &remote.target, data)
                .await
            {
                Ok(mut response) => {
                    if let Some(mixin) = &remote.response_mixin {
                        merge_mixin(&mut response, mixin(&input));
                    }
                    step.resolve(response);
                    if let Some(on_success) = &remote.on_success {
                        on_success();
                    }
                }
                Err(failure) => {
                    tracing::warn!(
                        step = %step.name,
                        method = %remote.method,
                        target = %remote.target,
                        error = %failure,
                        "Remote submit failed"
                    );
                    step.report_failure(&remote, &failure);
                }
            }
        });
    }

    fn report_failure(&self, remote: &RemoteSubmit, failure: &SubmitFailure) {
        if let Some(on_error) = &remote.on_error {
            on_error(failure);
        } else if let Some(processor) = &self.error_processor {
            processor.handle_errors(failure);
        } else {
            tracing::error!(step = %self.name, error = %failure, "Unhandled submit failure");
        }
    }

    /// Hide the surface, then fulfill the pending signal.
    fn resolve(&self, value: Value) {
        self.surface.hide();
        let pending = self.lock_state().pending.take();
        match pending {
            Some(resolver) => {
                tracing::debug!(step = %self.name, "Step resolved");
                if resolver.send(value).is_err() {
                    tracing::debug!(step = %self.name, "Completion was dropped by its caller");
                }
            }
            None => tracing::debug!(step = %self.name, "Submit fired with no pending load"),
        }
    }
}
