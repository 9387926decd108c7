//! modalflow - present a sequence of modal dialogs as one workflow
//!
//! A [`Step`] wraps one modal: loading it opens the modal and returns a
//! [`Completion`] that fulfills when the user submits. [`link`],
//! [`link_branches`], [`link_exit`] and [`chain`] compose steps into linear
//! or branching workflows whose results flow forward from step to step.
//!
//! The UI is injected through the traits in [`surface`] and the network
//! through [`remote::RemoteSubmitter`]; the crate ships a terminal surface
//! ([`ui::ModalDialog`]) and an HTTP submitter ([`remote::HttpSubmitter`]).

pub mod completion;
pub mod config;
pub mod error;
pub mod link;
pub mod logging;
pub mod remote;
pub mod step;
pub mod surface;
pub mod ui;

pub use completion::Completion;
pub use config::Config;
pub use error::{ConfigError, FlowError};
pub use link::{chain, link, link_branches, link_exit, ChainNode, Link, LinkKind, Loadable};
pub use remote::{FieldError, RemoteSubmitter, SubmitFailure, SubmitMethod};
pub use step::{RemoteSubmit, Step, StepBuilder, StepOptions, SubmitAction};
pub use surface::{
    ErrorProcessor, ManualTrigger, ModalSurface, SubmitHandler, TriggerEvent, TriggerSource,
};
