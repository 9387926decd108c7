//! Submit actions: resolve locally, or post to a remote and resolve with the response

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::remote::{RemoteSubmitter, SubmitFailure, SubmitMethod};

pub type DataFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;
pub type MixinFn = Arc<dyn Fn(&Value) -> Map<String, Value> + Send + Sync>;
pub type SuccessFn = Arc<dyn Fn() + Send + Sync>;
pub type FailureFn = Arc<dyn Fn(&SubmitFailure) + Send + Sync>;

/// What a step does once its trigger fires.
#[derive(Clone, Default)]
pub enum SubmitAction {
    /// Resolve immediately. With an updater the step resolves with
    /// `updater(input)`, otherwise with the input itself.
    #[default]
    Local,
    LocalWith(DataFn),
    Remote(RemoteSubmit),
}

impl SubmitAction {
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

/// Configuration for a step that submits to a remote endpoint.
#[derive(Clone)]
pub struct RemoteSubmit {
    pub(crate) submitter: Arc<dyn RemoteSubmitter>,
    pub(crate) method: SubmitMethod,
    pub(crate) target: String,
    pub(crate) data: DataFn,
    pub(crate) response_mixin: Option<MixinFn>,
    pub(crate) on_success: Option<SuccessFn>,
    pub(crate) on_error: Option<FailureFn>,
}

impl RemoteSubmit {
    /// `data` is evaluated with the step's current input each time the
    /// trigger fires.
    pub fn new<F>(
        submitter: Arc<dyn RemoteSubmitter>,
        method: SubmitMethod,
        target: impl Into<String>,
        data: F,
    ) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self {
            submitter,
            method,
            target: target.into(),
            data: Arc::new(data),
            response_mixin: None,
            on_success: None,
            on_error: None,
        }
    }

    /// Extra fields written onto the server response before resolving.
    pub fn response_mixin<F>(mut self, mixin: F) -> Self
    where
        F: Fn(&Value) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.response_mixin = Some(Arc::new(mixin));
        self
    }

    /// Side effect run after the step resolves successfully.
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(callback));
        self
    }

    /// Explicit failure handler; takes precedence over the step's error processor.
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&SubmitFailure) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(handler));
        self
    }

    pub fn has_error_handler(&self) -> bool {
        self.on_error.is_some()
    }
}

/// Write mixin fields onto a response. Mixin keys overwrite server keys.
pub(crate) fn merge_mixin(response: &mut Value, mixin: Map<String, Value>) {
    if mixin.is_empty() {
        return;
    }
    match response {
        Value::Object(fields) => fields.extend(mixin),
        Value::Null => *response = Value::Object(mixin),
        other => {
            tracing::warn!(
                response_type = json_type(other),
                "Response is not an object; mixin fields dropped"
            );
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
