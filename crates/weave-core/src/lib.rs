#![doc = r"Shadow-tree reconciler and hook state engine for declarative UI."]

pub mod component;
pub mod context;
pub mod error;
pub mod hooks;
pub mod host;
pub mod platform;
pub mod props;
pub mod root;
pub mod runtime;
pub mod spec;
pub mod value;

mod reconcile;
mod render;
mod shadow;

/// Identifier of a node owned by a [`Host`].
pub type NodeId = usize;

pub use component::{forward_ref, fragment, memo, Component};
pub use context::{create_context, use_context, Context, ContextId};
pub use error::{Error, HostError};
pub use hooks::{
    use_callback, use_effect, use_imperative_handle, use_layout_effect, use_memo, use_reducer,
    use_ref, use_state, Cleanup, Deps, Dispatch, EffectResult, Setter,
};
pub use host::{Host, HostStats, MemoryHost};
pub use platform::RuntimeScheduler;
pub use props::Props;
pub use render::{is_reconciling, is_rendering};
pub use root::{create_root, Root};
pub use runtime::{DefaultScheduler, Runtime, RuntimeHandle};
pub use spec::{make_spec, ComponentSpec, HostSpec, IntoSpec, Spec, SpecTarget};
pub use value::{Callback, ErasedRef, Event, NodeRef, Ref, StyleMap, Value};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod lib_tests;

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod reconcile_tests;
