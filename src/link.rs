//! Composing steps into linear and branching workflows.
//!
//! A [`Link`] wraps a source (a [`Step`] or another link) and a next
//! behavior. Loading a link loads its source; when the source's completion
//! fulfills, the next behavior runs with the result. Because links and steps
//! share the [`Loadable`] contract, a link can stand anywhere a step can.
//!
//! Downstream links must exist before an upstream branching function can
//! refer to them, so branching workflows are declared tail-first:
//!
//! ```no_run
//! # use modalflow::{link, link_branches, link_exit, Loadable, Step};
//! # fn demo(entry: Step, second: Step, high: Step, low: Step) {
//! let exit_high = link_exit(high, |data| println!("high: {data}"));
//! let exit_low = link_exit(low, |data| println!("low: {data}"));
//! let branch = link_branches(second, move |data| {
//!     if data["salary"].as_f64().unwrap_or(0.0) > 99_999.0 {
//!         exit_high.load()
//!     } else {
//!         exit_low.load()
//!     }
//! });
//! let _ = link(entry, branch).load();
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::completion::Completion;
use crate::error::{ConfigError, FlowError};
use crate::step::Step;

/// Uniform load contract shared by steps and links.
pub trait Loadable: Send + Sync {
    /// Load with `input`. The returned completion fulfills once the unit
    /// (and, for links, everything chained after it) has finished.
    fn load_with(&self, input: Value) -> Completion;

    fn load(&self) -> Completion {
        self.load_with(Value::Null)
    }
}

impl<T: Loadable + ?Sized> Loadable for Arc<T> {
    fn load_with(&self, input: Value) -> Completion {
        (**self).load_with(input)
    }
}

/// Continuation run with the source's result.
pub type NextBehavior = Arc<dyn Fn(Value) -> Completion + Send + Sync>;

/// Terminal action that ends a workflow branch.
pub type ExitFn = Arc<dyn Fn(Value) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Always forwards to a fixed next unit
    Forward,
    /// Picks the continuation at runtime
    Branch,
    /// Ends in an exit function
    Exit,
}

/// A source unit plus what to do with its result. Cloning shares the link.
#[derive(Clone)]
pub struct Link {
    source: Arc<dyn Loadable>,
    next: NextBehavior,
    kind: LinkKind,
}

impl Link {
    fn new(source: Arc<dyn Loadable>, next: NextBehavior, kind: LinkKind) -> Self {
        Self { source, next, kind }
    }

    pub fn kind(&self) -> LinkKind {
        self.kind
    }
}

impl Loadable for Link {
    fn load_with(&self, input: Value) -> Completion {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!("Link loaded outside of a tokio runtime");
            return Completion::failed(FlowError::NoRuntime);
        };

        let upstream = self.source.load_with(input);
        // Triggers hold steps weakly; the task keeps the source alive until it settles
        let source = Arc::clone(&self.source);
        let next = Arc::clone(&self.next);
        let kind = self.kind;
        let (completion, resolver) = Completion::channel();

        runtime.spawn(async move {
            let response = match upstream.await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!(?kind, error = %e, "Upstream did not resolve; continuation dropped");
                    return;
                }
            };
            drop(source);

            match next(response).await {
                Ok(outcome) => {
                    let _ = resolver.send(outcome);
                }
                Err(e) => {
                    tracing::debug!(?kind, error = %e, "Downstream did not resolve");
                }
            }
        });

        completion
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link").field("kind", &self.kind).finish()
    }
}

/// Forward the source's result unconditionally to `next`.
pub fn link(source: impl Loadable + 'static, next: impl Loadable + 'static) -> Link {
    link_units(Arc::new(source), Arc::new(next))
}

/// Let `branching` inspect the source's result and load whichever
/// continuation it selects.
pub fn link_branches<F>(source: impl Loadable + 'static, branching: F) -> Link
where
    F: Fn(Value) -> Completion + Send + Sync + 'static,
{
    Link::new(Arc::new(source), Arc::new(branching), LinkKind::Branch)
}

/// End the workflow by handing the source's result to `exit`.
pub fn link_exit<F>(source: impl Loadable + 'static, exit: F) -> Link
where
    F: Fn(Value) + Send + Sync + 'static,
{
    exit_link(Arc::new(source), Arc::new(exit))
}

fn link_units(source: Arc<dyn Loadable>, next: Arc<dyn Loadable>) -> Link {
    let forward: NextBehavior = Arc::new(move |response| next.load_with(response));
    Link::new(source, forward, LinkKind::Forward)
}

fn exit_link(source: Arc<dyn Loadable>, exit: ExitFn) -> Link {
    let terminal: NextBehavior = Arc::new(move |response: Value| {
        exit(response.clone());
        Completion::ready(response)
    });
    Link::new(source, terminal, LinkKind::Exit)
}

/// One element of a [`chain`].
#[derive(Clone)]
pub enum ChainNode {
    Unit(Arc<dyn Loadable>),
    Exit(ExitFn),
}

impl ChainNode {
    pub fn unit(unit: impl Loadable + 'static) -> Self {
        Self::Unit(Arc::new(unit))
    }

    pub fn exit<F>(exit: F) -> Self
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        Self::Exit(Arc::new(exit))
    }
}

impl From<Step> for ChainNode {
    fn from(step: Step) -> Self {
        Self::unit(step)
    }
}

impl From<Link> for ChainNode {
    fn from(link: Link) -> Self {
        Self::unit(link)
    }
}

impl fmt::Debug for ChainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit(_) => f.write_str("Unit"),
            Self::Exit(_) => f.write_str("Exit"),
        }
    }
}

/// Build a linear workflow and return its head link.
///
/// Needs at least two nodes. If the last node is an exit it is paired with
/// the unit before it via [`link_exit`]; all earlier units are joined with
/// [`link`]. Nothing is built when validation fails.
pub fn chain<I>(nodes: I) -> Result<Link, ConfigError>
where
    I: IntoIterator<Item = ChainNode>,
{
    let mut nodes: Vec<ChainNode> = nodes.into_iter().collect();
    if nodes.len() < 2 {
        return Err(ConfigError::ChainTooShort(nodes.len()));
    }
    let last = nodes.len() - 1;
    if let Some(position) = nodes[..last]
        .iter()
        .position(|node| matches!(node, ChainNode::Exit(_)))
    {
        return Err(ConfigError::ExitNotLast(position));
    }

    let mut units = Vec::with_capacity(nodes.len());
    let tail = nodes.pop();
    for node in nodes {
        if let ChainNode::Unit(unit) = node {
            units.push(unit);
        }
    }

    // Validated above: at least one unit precedes the tail.
    let Some(from) = units.pop() else {
        return Err(ConfigError::ChainTooShort(1));
    };
    let mut head = match tail {
        Some(ChainNode::Exit(exit)) => exit_link(from, exit),
        Some(ChainNode::Unit(next)) => link_units(from, next),
        None => return Err(ConfigError::ChainTooShort(0)),
    };

    while let Some(from) = units.pop() {
        head = link_units(from, Arc::new(head));
    }

    tracing::debug!(nodes = last + 1, "Built chain");
    Ok(head)
}
