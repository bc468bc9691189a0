//! Hook state engine.
//!
//! Every component node owns parallel slot vectors, one per hook family, and
//! a cursor per vector that the render driver rewinds before each render.
//! Slot `i` of a family always belongs to the `i`-th call of that family in
//! render order, so slots only ever grow.
//!
//! Hook functions find their slots through the render stack and panic when
//! no component is rendering or when the call order changed between renders.

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use log::{debug, error, warn};

use crate::error::Error;
use crate::render::{is_reconciling, is_rendering, rerender, with_current_node, Env};
use crate::shadow::{ShadowNode, ShadowRef, WeakShadow};
use crate::value::{ErasedRef, Ref, Value};

type EffectFn = Box<dyn FnOnce() -> Result<Option<Cleanup>, String>>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum EffectPhase {
    /// Runs before the next frame is presented.
    Layout,
    /// Runs once the current call stack unwinds.
    Passive,
}

#[derive(Default, Clone, Copy)]
struct Cursors {
    state: usize,
    effect: usize,
    layout_effect: usize,
    reference: usize,
    memo: usize,
}

struct EffectSlot {
    deps: Deps,
    pending: Option<EffectFn>,
    cleanup: Option<Cleanup>,
}

struct MemoSlot {
    value: Box<dyn Any>,
    deps: Deps,
}

#[derive(Default)]
pub(crate) struct HookSlots {
    states: Vec<Box<dyn Any>>,
    effects: Vec<EffectSlot>,
    layout_effects: Vec<EffectSlot>,
    refs: Vec<Box<dyn Any>>,
    memos: Vec<MemoSlot>,
    cursors: Cursors,
    queued: Vec<usize>,
    queued_layout: Vec<usize>,
}

impl HookSlots {
    pub(crate) fn begin_render(&mut self) {
        self.cursors = Cursors::default();
        self.queued.clear();
        self.queued_layout.clear();
    }

    /// Indices of the effects registered by the last render.
    pub(crate) fn take_queued(&mut self, phase: EffectPhase) -> Vec<usize> {
        match phase {
            EffectPhase::Layout => std::mem::take(&mut self.queued_layout),
            EffectPhase::Passive => std::mem::take(&mut self.queued),
        }
    }

    /// Teardowns still owned by the node, layout effects first.
    pub(crate) fn take_cleanups(&mut self) -> Vec<Cleanup> {
        self.layout_effects
            .iter_mut()
            .chain(self.effects.iter_mut())
            .filter_map(|slot| slot.cleanup.take())
            .collect()
    }

    fn effect_slots(&mut self, phase: EffectPhase) -> &mut Vec<EffectSlot> {
        match phase {
            EffectPhase::Layout => &mut self.layout_effects,
            EffectPhase::Passive => &mut self.effects,
        }
    }

    fn next_effect_index(&mut self, phase: EffectPhase) -> usize {
        let cursor = match phase {
            EffectPhase::Layout => &mut self.cursors.layout_effect,
            EffectPhase::Passive => &mut self.cursors.effect,
        };
        let index = *cursor;
        *cursor += 1;
        index
    }

    fn queue(&mut self, phase: EffectPhase, index: usize) {
        match phase {
            EffectPhase::Layout => self.queued_layout.push(index),
            EffectPhase::Passive => self.queued.push(index),
        }
    }
}

fn hooks_mut<'a>(shadow: &'a mut ShadowNode, hook: &'static str) -> &'a mut HookSlots {
    match shadow.as_component_mut() {
        Some(component) => &mut component.hooks,
        None => panic!("{}", Error::InvalidHookCall { hook }),
    }
}

fn downcast_slot<T: Clone + 'static>(slot: &dyn Any, index: usize) -> T {
    match slot.downcast_ref::<T>() {
        Some(value) => value.clone(),
        None => panic!("{}", Error::HookOrder { index }),
    }
}

/// Dependency list of an effect or memoized value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Deps {
    /// No dependency list: re-run on every render.
    #[default]
    Always,
    Values(Vec<Value>),
}

impl Deps {
    /// Empty dependency list: run once per mount.
    pub fn none() -> Self {
        Deps::Values(Vec::new())
    }

    fn changed_from(&self, previous: &Deps) -> bool {
        match (previous, self) {
            (Deps::Values(previous), Deps::Values(next)) => previous != next,
            _ => true,
        }
    }
}

/// Builds [`Deps::Values`] from expressions convertible into [`Value`].
#[macro_export]
macro_rules! deps {
    ($($value:expr),* $(,)?) => {
        $crate::Deps::Values(vec![$($crate::Value::from($value)),*])
    };
}

/// Teardown returned by an effect.
pub struct Cleanup(Box<dyn FnOnce()>);

impl Cleanup {
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Cleanup(Box::new(teardown))
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup(..)")
    }
}

/// What an effect body may return.
pub trait EffectResult {
    fn into_cleanup(self) -> Result<Option<Cleanup>, String>;
}

impl EffectResult for () {
    fn into_cleanup(self) -> Result<Option<Cleanup>, String> {
        Ok(None)
    }
}

impl EffectResult for Cleanup {
    fn into_cleanup(self) -> Result<Option<Cleanup>, String> {
        Ok(Some(self))
    }
}

impl EffectResult for Option<Cleanup> {
    fn into_cleanup(self) -> Result<Option<Cleanup>, String> {
        Ok(self)
    }
}

impl<E: fmt::Display> EffectResult for Result<(), E> {
    fn into_cleanup(self) -> Result<Option<Cleanup>, String> {
        self.map(|()| None).map_err(|err| err.to_string())
    }
}

impl<E: fmt::Display> EffectResult for Result<Cleanup, E> {
    fn into_cleanup(self) -> Result<Option<Cleanup>, String> {
        self.map(Some).map_err(|err| err.to_string())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

pub(crate) fn run_cleanup(component: &str, cleanup: Cleanup) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(cleanup.0)) {
        error!(
            "effect teardown in <{component}> panicked: {}",
            panic_message(payload.as_ref())
        );
    }
}

/// Runs the effects `indices` of `phase` registered on `node`.
///
/// Each effect first runs the teardown of its previous run. A failing effect
/// or teardown is logged and the remaining effects still run. When the node
/// has been unmounted in the meantime the new teardown runs right away.
pub(crate) fn run_effects(node: &ShadowRef, phase: EffectPhase, indices: Vec<usize>) {
    for index in indices {
        let taken = {
            let mut shadow = node.borrow_mut();
            let Some(component) = shadow.as_component_mut() else {
                return;
            };
            let name = component.component.name();
            component
                .hooks
                .effect_slots(phase)
                .get_mut(index)
                .and_then(|slot| {
                    let effect = slot.pending.take()?;
                    Some((name, effect, slot.cleanup.take()))
                })
        };
        let Some((name, effect, previous)) = taken else {
            continue;
        };
        if let Some(previous) = previous {
            run_cleanup(name, previous);
        }
        let cleanup = match catch_unwind(AssertUnwindSafe(effect)) {
            Ok(Ok(cleanup)) => cleanup,
            Ok(Err(message)) => {
                error!("effect in <{name}> failed: {message}");
                None
            }
            Err(payload) => {
                error!("effect in <{name}> panicked: {}", panic_message(payload.as_ref()));
                None
            }
        };
        let Some(cleanup) = cleanup else {
            continue;
        };
        let orphaned = {
            let mut shadow = node.borrow_mut();
            match shadow.as_component_mut() {
                Some(component) if component.mounted => {
                    match component.hooks.effect_slots(phase).get_mut(index) {
                        Some(slot) => {
                            slot.cleanup = Some(cleanup);
                            None
                        }
                        None => Some(cleanup),
                    }
                }
                _ => Some(cleanup),
            }
        };
        if let Some(cleanup) = orphaned {
            debug!("<{name}> unmounted before its effect ran; tearing down immediately");
            run_cleanup(name, cleanup);
        }
    }
}

/// State cell of the rendering component. `init` runs on the first render
/// only.
///
/// # Panics
///
/// Panics outside a component render or when hook order changed.
pub fn use_state<T: Clone + 'static>(init: impl FnOnce() -> T) -> (T, Setter<T>) {
    with_current_node("use_state", |node, env| {
        let (index, existing) = {
            let mut shadow = node.borrow_mut();
            let hooks = hooks_mut(&mut shadow, "use_state");
            let index = hooks.cursors.state;
            hooks.cursors.state += 1;
            let existing = hooks
                .states
                .get(index)
                .map(|slot| downcast_slot::<T>(slot.as_ref(), index));
            (index, existing)
        };
        let value = match existing {
            Some(value) => value,
            None => {
                let value = init();
                let mut shadow = node.borrow_mut();
                hooks_mut(&mut shadow, "use_state")
                    .states
                    .push(Box::new(value.clone()));
                value
            }
        };
        let setter = Setter {
            node: Rc::downgrade(node),
            env: Weak::clone(env),
            index,
            _marker: PhantomData,
        };
        (value, setter)
    })
}

/// Replaces a state slot and synchronously re-renders its component.
pub struct Setter<T> {
    node: WeakShadow,
    env: Weak<Env>,
    index: usize,
    _marker: PhantomData<fn(T)>,
}

impl<T: Clone + 'static> Setter<T> {
    pub fn set(&self, value: T) -> Result<(), Error> {
        self.update(move |_| value)
    }

    /// Computes the next value from the current one.
    ///
    /// Fails with [`Error::UpdateDuringRender`] while any component renders
    /// or a reconciliation pass (including the teardowns it runs) is under
    /// way. Does nothing once the component is unmounted or its root is gone.
    pub fn update(&self, next: impl FnOnce(&T) -> T) -> Result<(), Error> {
        let (Some(node), Some(env)) = (self.node.upgrade(), self.env.upgrade()) else {
            debug!("state update ignored: root or component dropped");
            return Ok(());
        };
        let current = {
            let shadow = node.borrow();
            let Some(component) = shadow.as_component().filter(|component| component.mounted)
            else {
                debug!("state update ignored: component unmounted");
                return Ok(());
            };
            if is_rendering() || is_reconciling() {
                return Err(Error::UpdateDuringRender);
            }
            component
                .hooks
                .states
                .get(self.index)
                .and_then(|slot| slot.downcast_ref::<T>())
                .cloned()
                .ok_or(Error::HookOrder { index: self.index })?
        };
        // The updater runs with the node released so it may read it.
        let value = next(&current);
        {
            let mut shadow = node.borrow_mut();
            let slot = shadow
                .as_component_mut()
                .and_then(|component| component.hooks.states.get_mut(self.index))
                .ok_or(Error::HookOrder { index: self.index })?;
            *slot = Box::new(value);
        }
        rerender(&env, &node)
    }
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            node: Weak::clone(&self.node),
            env: Weak::clone(&self.env),
            index: self.index,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("slot", &self.index)
            .field("live", &(self.node.strong_count() > 0))
            .finish()
    }
}

/// State driven by a reducer.
pub fn use_reducer<S, A>(
    reducer: impl Fn(&S, A) -> S + 'static,
    init: impl FnOnce() -> S,
) -> (S, Dispatch<S, A>)
where
    S: Clone + 'static,
    A: 'static,
{
    let (state, setter) = use_state(init);
    let dispatch = Dispatch {
        setter,
        reducer: Rc::new(reducer),
    };
    (state, dispatch)
}

pub struct Dispatch<S, A> {
    setter: Setter<S>,
    reducer: Rc<dyn Fn(&S, A) -> S>,
}

impl<S: Clone + 'static, A> Dispatch<S, A> {
    pub fn dispatch(&self, action: A) -> Result<(), Error> {
        let reducer = Rc::clone(&self.reducer);
        self.setter.update(move |state| reducer(state, action))
    }
}

impl<S, A> Clone for Dispatch<S, A> {
    fn clone(&self) -> Self {
        Self {
            setter: self.setter.clone(),
            reducer: Rc::clone(&self.reducer),
        }
    }
}

fn register_effect(hook: &'static str, phase: EffectPhase, effect: EffectFn, deps: Deps) {
    with_current_node(hook, |node, _| {
        let mut shadow = node.borrow_mut();
        let hooks = hooks_mut(&mut shadow, hook);
        let index = hooks.next_effect_index(phase);
        match hooks.effect_slots(phase).get_mut(index) {
            Some(slot) => {
                if !deps.changed_from(&slot.deps) {
                    return;
                }
                slot.deps = deps;
                slot.pending = Some(effect);
            }
            None => hooks.effect_slots(phase).push(EffectSlot {
                deps,
                pending: Some(effect),
                cleanup: None,
            }),
        }
        hooks.queue(phase, index);
    })
}

/// Runs `effect` after the render pass once the call stack unwinds,
/// whenever `deps` changed since the previous render.
pub fn use_effect<F, R>(effect: F, deps: Deps)
where
    F: FnOnce() -> R + 'static,
    R: EffectResult,
{
    register_effect(
        "use_effect",
        EffectPhase::Passive,
        Box::new(move || effect().into_cleanup()),
        deps,
    );
}

/// Like [`use_effect`], but runs before the next frame and ahead of every
/// regular effect.
pub fn use_layout_effect<F, R>(effect: F, deps: Deps)
where
    F: FnOnce() -> R + 'static,
    R: EffectResult,
{
    register_effect(
        "use_layout_effect",
        EffectPhase::Layout,
        Box::new(move || effect().into_cleanup()),
        deps,
    );
}

/// Mutable cell whose identity is stable for the component's lifetime.
pub fn use_ref<T: 'static>(initial: T) -> Ref<T> {
    with_current_node("use_ref", |node, _| {
        let mut shadow = node.borrow_mut();
        let hooks = hooks_mut(&mut shadow, "use_ref");
        let index = hooks.cursors.reference;
        hooks.cursors.reference += 1;
        match hooks.refs.get(index) {
            Some(slot) => downcast_slot::<Ref<T>>(slot.as_ref(), index),
            None => {
                let cell = Ref::new(initial);
                hooks.refs.push(Box::new(cell.clone()));
                cell
            }
        }
    })
}

/// Recomputes the value only when `deps` changed.
pub fn use_memo<T: Clone + 'static>(compute: impl FnOnce() -> T, deps: Deps) -> T {
    with_current_node("use_memo", |node, _| {
        let (index, cached) = {
            let mut shadow = node.borrow_mut();
            let hooks = hooks_mut(&mut shadow, "use_memo");
            let index = hooks.cursors.memo;
            hooks.cursors.memo += 1;
            let cached = hooks
                .memos
                .get(index)
                .filter(|slot| !deps.changed_from(&slot.deps))
                .map(|slot| downcast_slot::<T>(slot.value.as_ref(), index));
            (index, cached)
        };
        if let Some(value) = cached {
            return value;
        }
        let value = compute();
        let mut shadow = node.borrow_mut();
        let memos = &mut hooks_mut(&mut shadow, "use_memo").memos;
        let slot = MemoSlot {
            value: Box::new(value.clone()),
            deps,
        };
        match memos.get_mut(index) {
            Some(existing) => *existing = slot,
            None => memos.push(slot),
        }
        value
    })
}

/// Keeps returning the first `callback` until `deps` change.
pub fn use_callback<F: Clone + 'static>(callback: F, deps: Deps) -> F {
    use_memo(move || callback, deps)
}

/// Installs the value built by `create` into a forwarded ref holding
/// `Option<H>` during the layout phase, and clears it on teardown.
pub fn use_imperative_handle<H: 'static>(
    target: Option<&ErasedRef>,
    create: impl FnOnce() -> H + 'static,
    deps: Deps,
) {
    let target = target.cloned();
    use_layout_effect(
        move || {
            let target = target?;
            let Some(slot) = target.downcast::<Option<H>>() else {
                warn!(
                    "imperative handle target does not hold Option<{}>",
                    type_name::<H>()
                );
                return None;
            };
            slot.set(Some(create()));
            Some(Cleanup::new(move || slot.set(None)))
        },
        deps,
    );
}
