use thiserror::Error;

use crate::NodeId;

/// Failures reported by an output medium.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("host node {id} missing")]
    Missing { id: NodeId },
    #[error("host node {id} is not an element")]
    NotAnElement { id: NodeId },
    #[error("host node {id} is not a text node")]
    NotText { id: NodeId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A hook function ran while no component render was active.
    #[error("invalid hook call: `{hook}` may only be called while a component is rendering")]
    InvalidHookCall { hook: &'static str },
    /// A render result could not be classified as a spec.
    #[error("invalid spec: cannot render {found}")]
    InvalidSpec { found: &'static str },
    #[error("state update requested while a component is rendering")]
    UpdateDuringRender,
    #[error("hook slot {index} changed type between renders; hooks must be called in the same order")]
    HookOrder { index: usize },
    #[error("shadow node is detached from its root")]
    Detached,
    #[error(transparent)]
    Host(#[from] HostError),
}
