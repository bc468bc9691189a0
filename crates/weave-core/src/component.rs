use std::any::TypeId;
use std::fmt;
use std::rc::Rc;

use crate::context::ContextId;
use crate::error::Error;
use crate::props::Props;
use crate::spec::{make_spec, IntoSpec, Spec};
use crate::value::ErasedRef;

type RenderFn = Rc<dyn Fn(&Props, Option<ErasedRef>) -> Result<Spec, Error>>;

/// A function component.
///
/// Two components share an identity when they wrap the same render function
/// type under the same name and wrapper flags. Building a component from the
/// same function on every render therefore keeps matching the existing shadow
/// node, and its hook state survives.
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentDef>,
}

struct ComponentDef {
    name: &'static str,
    type_id: TypeId,
    render: RenderFn,
    memo: bool,
    forwards_ref: bool,
    provides: Option<ContextId>,
}

impl Component {
    pub fn new<F, R>(name: &'static str, render: F) -> Self
    where
        F: Fn(&Props) -> R + 'static,
        R: IntoSpec,
    {
        Self::from_def(ComponentDef {
            name,
            type_id: TypeId::of::<F>(),
            render: Rc::new(move |props: &Props, _: Option<ErasedRef>| render(props).into_spec()),
            memo: false,
            forwards_ref: false,
            provides: None,
        })
    }

    /// Identity component that renders its children without a host wrapper.
    pub fn fragment() -> Self {
        Component::new("Fragment", pass_children)
    }

    pub(crate) fn provider(context: ContextId) -> Self {
        Self::from_def(ComponentDef {
            name: "Provider",
            type_id: TypeId::of::<ContextId>(),
            render: Rc::new(|props: &Props, _: Option<ErasedRef>| -> Result<Spec, Error> {
                Ok(pass_children(props))
            }),
            memo: false,
            forwards_ref: false,
            provides: Some(context),
        })
    }

    fn from_def(def: ComponentDef) -> Self {
        Self {
            inner: Rc::new(def),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn is_memo(&self) -> bool {
        self.inner.memo
    }

    pub fn forwards_ref(&self) -> bool {
        self.inner.forwards_ref
    }

    pub(crate) fn provides(&self) -> Option<ContextId> {
        self.inner.provides
    }

    pub(crate) fn same_identity(&self, other: &Component) -> bool {
        if Rc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        let (a, b) = (&*self.inner, &*other.inner);
        a.type_id == b.type_id
            && a.name == b.name
            && a.memo == b.memo
            && a.forwards_ref == b.forwards_ref
            && a.provides == b.provides
    }

    pub(crate) fn invoke(&self, props: &Props, forwarded: Option<ErasedRef>) -> Result<Spec, Error> {
        (self.inner.render)(props, forwarded)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.inner.name)
            .field("memo", &self.inner.memo)
            .finish()
    }
}

fn pass_children(props: &Props) -> Spec {
    props.children()
}

/// Opts a component into skipping re-renders when its props and children are
/// structurally equal to the previous ones.
pub fn memo(component: &Component) -> Component {
    let def = &*component.inner;
    Component::from_def(ComponentDef {
        name: def.name,
        type_id: def.type_id,
        render: def.render.clone(),
        memo: true,
        forwards_ref: def.forwards_ref,
        provides: def.provides,
    })
}

/// Component whose render function receives the `ref` prop separately from
/// the remaining props.
pub fn forward_ref<F, R>(name: &'static str, render: F) -> Component
where
    F: Fn(&Props, Option<ErasedRef>) -> R + 'static,
    R: IntoSpec,
{
    Component::from_def(ComponentDef {
        name,
        type_id: TypeId::of::<F>(),
        render: Rc::new(move |props: &Props, forwarded: Option<ErasedRef>| {
            render(props, forwarded).into_spec()
        }),
        memo: false,
        forwards_ref: true,
        provides: None,
    })
}

/// Groups `children` without a host wrapper.
pub fn fragment(children: impl IntoIterator<Item = Spec>) -> Spec {
    make_spec(Component::fragment(), Props::new(), children)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(_: &Props) -> Spec {
        Spec::text("label")
    }

    fn other(_: &Props) -> Spec {
        Spec::text("other")
    }

    #[test]
    fn identity_follows_render_function() {
        assert!(Component::new("Label", label).same_identity(&Component::new("Label", label)));
        assert!(!Component::new("Label", label).same_identity(&Component::new("Other", other)));
        assert!(!Component::new("Label", label).same_identity(&memo(&Component::new("Label", label))));
        assert!(memo(&Component::new("Label", label))
            .same_identity(&memo(&Component::new("Label", label))));
    }

    #[test]
    fn providers_of_different_contexts_never_match() {
        let a = Component::provider(ContextId::next());
        let b = Component::provider(ContextId::next());
        assert!(a.same_identity(&a.clone()));
        assert!(!a.same_identity(&b));
    }
}
