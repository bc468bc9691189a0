//! Render driver.
//!
//! Runs a component's render function with the node installed on a
//! thread-local render stack, reconciles the result against the node's
//! rendered child and hands the effects registered by the render to the
//! runtime.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::debug;

use crate::error::Error;
use crate::hooks::{run_effects, EffectPhase};
use crate::host::Host;
use crate::props::{CHILDREN_PROP, KEY_PROP, REF_PROP};
use crate::reconcile::{create, remove, update};
use crate::runtime::RuntimeHandle;
use crate::shadow::{can_adopt, output_location, refresh_counts, InsertionPoint, Parent, ShadowRef};
use crate::spec::Spec;
use crate::value::Value;

/// What a render pass writes to and schedules on.
pub(crate) struct Env {
    pub(crate) host: Rc<RefCell<dyn Host>>,
    pub(crate) runtime: RuntimeHandle,
}

struct RenderFrame {
    node: ShadowRef,
    env: Weak<Env>,
}

thread_local! {
    static RENDER_STACK: RefCell<Vec<RenderFrame>> = const { RefCell::new(Vec::new()) };
    static RECONCILE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Marks a synchronous reconciliation pass on this thread until dropped.
pub(crate) struct ReconcileGuard;

impl ReconcileGuard {
    pub(crate) fn enter() -> Self {
        RECONCILE_DEPTH.with(|depth| depth.set(depth.get() + 1));
        ReconcileGuard
    }
}

impl Drop for ReconcileGuard {
    fn drop(&mut self) {
        RECONCILE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Whether a root render, unmount or state-driven re-render is in progress
/// on this thread. Teardowns run inside such a pass.
pub fn is_reconciling() -> bool {
    RECONCILE_DEPTH.with(|depth| depth.get() > 0)
}

struct RenderGuard;

impl Drop for RenderGuard {
    fn drop(&mut self) {
        RENDER_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

fn push_frame(node: &ShadowRef, env: &Rc<Env>) -> RenderGuard {
    RENDER_STACK.with(|stack| {
        stack.borrow_mut().push(RenderFrame {
            node: Rc::clone(node),
            env: Rc::downgrade(env),
        })
    });
    RenderGuard
}

/// Whether a component render function is running on this thread.
pub fn is_rendering() -> bool {
    RENDER_STACK.with(|stack| !stack.borrow().is_empty())
}

/// Calls `f` with the component node currently rendering.
///
/// # Panics
///
/// Panics with [`Error::InvalidHookCall`] when no render is active.
pub(crate) fn with_current_node<R>(
    hook: &'static str,
    f: impl FnOnce(&ShadowRef, &Weak<Env>) -> R,
) -> R {
    let frame = RENDER_STACK.with(|stack| {
        stack
            .borrow()
            .last()
            .map(|frame| (Rc::clone(&frame.node), Weak::clone(&frame.env)))
    });
    match frame {
        Some((node, env)) => f(&node, &env),
        None => panic!("{}", Error::InvalidHookCall { hook }),
    }
}

/// Empty text and empty arrays render nothing.
fn normalize(spec: Spec) -> Spec {
    match spec {
        Spec::Text(text) if text.is_empty() => Spec::Null,
        Spec::Array(items) if items.is_empty() => Spec::Null,
        other => other,
    }
}

/// Renders the component `node` and reconciles its output at `at`.
pub(crate) fn render_component(env: &Rc<Env>, node: &ShadowRef, at: InsertionPoint) -> Result<(), Error> {
    let (component, props, forwarded) = {
        let mut shadow = node.borrow_mut();
        let Some(current) = shadow.as_component_mut() else {
            return Ok(());
        };
        current.hooks.begin_render();
        let mut props = current.props.clone();
        props.remove(KEY_PROP);
        let forwarded = match props.remove(REF_PROP) {
            Some(Value::Ref(target)) => Some(target),
            _ => None,
        };
        props.insert(CHILDREN_PROP, Spec::Array(current.children.clone()));
        let forwarded = forwarded.filter(|_| current.component.forwards_ref());
        (current.component.clone(), props, forwarded)
    };

    let spec = {
        let _guard = push_frame(node, env);
        component.invoke(&props, forwarded)?
    };
    let spec = normalize(spec);

    let previous = node
        .borrow_mut()
        .as_component_mut()
        .and_then(|current| current.rendered.take());
    let rendered = match previous {
        Some(child) if can_adopt(&child.borrow(), &spec) => {
            update(env, &child, &spec, at)?;
            Some(child)
        }
        previous => {
            if let Some(child) = previous {
                debug!("replace {} with {} output", child.borrow().describe(), spec.kind_name());
                remove(env, &child, true)?;
            }
            create(env, &spec, Parent::Node(Rc::downgrade(node)), at)?
        }
    };

    let (layout, passive) = {
        let mut shadow = node.borrow_mut();
        shadow.real_count = rendered.as_ref().map_or(0, |child| child.borrow().real_count);
        match shadow.as_component_mut() {
            Some(current) => {
                current.rendered = rendered;
                (
                    current.hooks.take_queued(EffectPhase::Layout),
                    current.hooks.take_queued(EffectPhase::Passive),
                )
            }
            None => return Ok(()),
        }
    };
    schedule_effects(env, node, layout, passive);
    Ok(())
}

fn schedule_effects(env: &Env, node: &ShadowRef, layout: Vec<usize>, passive: Vec<usize>) {
    if !layout.is_empty() {
        let node = Rc::clone(node);
        env.runtime
            .request_frame(Box::new(move || run_effects(&node, EffectPhase::Layout, layout)));
    }
    if !passive.is_empty() {
        let node = Rc::clone(node);
        env.runtime
            .spawn_task(Box::new(move || run_effects(&node, EffectPhase::Passive, passive)));
    }
}

/// Re-renders a mounted component in place after one of its state slots
/// changed, then propagates its new output count to its ancestors.
pub(crate) fn rerender(env: &Rc<Env>, node: &ShadowRef) -> Result<(), Error> {
    let _pass = ReconcileGuard::enter();
    let at = output_location(node)?;
    debug!("re-render {}", node.borrow().describe());
    render_component(env, node, at)?;
    refresh_counts(node);
    Ok(())
}
