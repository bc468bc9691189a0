use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::component::Component;
use crate::props::Props;
use crate::render::with_current_node;
use crate::shadow::{NodeKind, Parent};
use crate::spec::{make_spec, Spec};
use crate::value::Value;

const VALUE_PROP: &str = "value";

static NEXT_CONTEXT_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ContextId(usize);

impl ContextId {
    pub(crate) fn next() -> Self {
        ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A value shared with every descendant rendered under its provider.
pub struct Context<T: 'static> {
    id: ContextId,
    default: Rc<T>,
    provider: Component,
}

impl<T: 'static> Context<T> {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Component that passes its children through while carrying the
    /// context value in its `value` prop.
    pub fn provider(&self) -> Component {
        self.provider.clone()
    }

    /// Spec of a provider binding `value` for `children`.
    pub fn provide(&self, value: T, children: impl IntoIterator<Item = Spec>) -> Spec {
        let payload: Rc<dyn Any> = Rc::new(value);
        make_spec(
            &self.provider,
            Props::new().with(VALUE_PROP, Value::Any(payload)),
            children,
        )
    }
}

impl<T: 'static> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            default: Rc::clone(&self.default),
            provider: self.provider.clone(),
        }
    }
}

impl<T: 'static> PartialEq for Context<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: 'static> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("id", &self.id).finish()
    }
}

pub fn create_context<T: 'static>(default: T) -> Context<T> {
    let id = ContextId::next();
    Context {
        id,
        default: Rc::new(default),
        provider: Component::provider(id),
    }
}

/// Reads the value bound by the nearest ancestor provider of `context`, or
/// its default when there is none.
///
/// # Panics
///
/// Panics when called outside a component render.
pub fn use_context<T: Clone + 'static>(context: &Context<T>) -> T {
    with_current_node("use_context", |node, _| {
        let mut parent = node.borrow().parent.clone();
        while let Parent::Node(weak) = parent {
            let Some(ancestor) = weak.upgrade() else {
                break;
            };
            let ancestor = ancestor.borrow();
            if let NodeKind::Component(component) = &ancestor.kind {
                if component.component.provides() == Some(context.id) {
                    if let Some(value) = component
                        .props
                        .get(VALUE_PROP)
                        .and_then(|value| value.downcast_ref::<T>())
                    {
                        return value.clone();
                    }
                }
            }
            parent = ancestor.parent.clone();
        }
        T::clone(&context.default)
    })
}
