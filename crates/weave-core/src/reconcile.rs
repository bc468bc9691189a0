//! Reconciler: turns specs into shadow nodes and keeps both the shadow tree
//! and the output medium in step with the latest specs.

use std::rc::Rc;

use log::{debug, trace, warn};

use crate::error::Error;
use crate::hooks::{run_cleanup, HookSlots};
use crate::host::Host;
use crate::props::{Props, CHILDREN_PROP, KEY_PROP, REF_PROP, STYLE_PROP};
use crate::render::{render_component, Env};
use crate::shadow::{
    can_adopt, sum_counts, ArrayNode, ComponentNode, HostNode, InsertionPoint, NodeKind, Parent,
    ShadowNode, ShadowRef, TextNode,
};
use crate::spec::Spec;
use crate::value::{NodeRef, StyleMap, Value};
use crate::NodeId;

/// Builds a shadow subtree for `spec` and inserts its outputs at `at`.
/// Null specs produce no node.
pub(crate) fn create(
    env: &Rc<Env>,
    spec: &Spec,
    parent: Parent,
    at: InsertionPoint,
) -> Result<Option<ShadowRef>, Error> {
    let node = match spec {
        Spec::Null => return Ok(None),
        Spec::Text(text) => {
            let handle = {
                let mut host = env.host.borrow_mut();
                let handle = host.create_text(text);
                host.insert_at(at.parent, handle, at.offset)?;
                handle
            };
            trace!("create text {text:?} as #{handle} at {}:{}", at.parent, at.offset);
            ShadowNode::new(
                parent,
                NodeKind::Text(TextNode {
                    text: text.clone(),
                    handle,
                }),
            )
        }
        Spec::Host(spec) => {
            let handle = env.host.borrow_mut().create_element(&spec.tag);
            trace!("create <{}> as #{handle} at {}:{}", spec.tag, at.parent, at.offset);
            sync_props(env, handle, &Props::new(), &spec.props)?;
            let node = ShadowNode::new(
                parent,
                NodeKind::Host(HostNode {
                    tag: spec.tag.clone(),
                    props: spec.props.clone(),
                    handle,
                    children: Vec::new(),
                }),
            );
            let children = reconcile_children(
                env,
                &node,
                Vec::new(),
                &spec.children,
                InsertionPoint::new(handle, 0),
            )?;
            if let NodeKind::Host(host) = &mut node.borrow_mut().kind {
                host.children = children;
            }
            env.host.borrow_mut().insert_at(at.parent, handle, at.offset)?;
            node
        }
        Spec::Array(items) => {
            let node = ShadowNode::new(parent, NodeKind::Array(ArrayNode::default()));
            let children = reconcile_children(env, &node, Vec::new(), items, at)?;
            set_array_children(&node, children);
            node
        }
        Spec::Component(spec) => {
            debug!("mount <{}>", spec.component.name());
            let node = ShadowNode::new(
                parent,
                NodeKind::Component(ComponentNode {
                    component: spec.component.clone(),
                    props: spec.props.clone(),
                    children: spec.children.clone(),
                    rendered: None,
                    hooks: HookSlots::default(),
                    mounted: true,
                }),
            );
            render_component(env, &node, at)?;
            node
        }
    };
    Ok(Some(node))
}

/// Updates `node` in place to represent `spec`. `at` is where the node's
/// outputs currently start; callers guarantee `can_adopt(node, spec)`.
pub(crate) fn update(env: &Rc<Env>, node: &ShadowRef, spec: &Spec, at: InsertionPoint) -> Result<(), Error> {
    match spec {
        Spec::Null => Ok(()),
        Spec::Text(next) => {
            let mut shadow = node.borrow_mut();
            let NodeKind::Text(text) = &mut shadow.kind else {
                return Ok(());
            };
            if text.text != *next {
                trace!("set text #{} to {next:?}", text.handle);
                env.host.borrow_mut().set_text(text.handle, next)?;
                next.clone_into(&mut text.text);
            }
            Ok(())
        }
        Spec::Host(spec) => {
            let (handle, previous, children) = {
                let mut shadow = node.borrow_mut();
                let NodeKind::Host(host) = &mut shadow.kind else {
                    return Ok(());
                };
                let previous = std::mem::replace(&mut host.props, spec.props.clone());
                (host.handle, previous, std::mem::take(&mut host.children))
            };
            sync_props(env, handle, &previous, &spec.props)?;
            let children = reconcile_children(
                env,
                node,
                children,
                &spec.children,
                InsertionPoint::new(handle, 0),
            )?;
            if let NodeKind::Host(host) = &mut node.borrow_mut().kind {
                host.children = children;
            }
            Ok(())
        }
        Spec::Array(items) => {
            let children = match &mut node.borrow_mut().kind {
                NodeKind::Array(array) => std::mem::take(&mut array.children),
                _ => return Ok(()),
            };
            let children = reconcile_children(env, node, children, items, at)?;
            set_array_children(node, children);
            Ok(())
        }
        Spec::Component(spec) => {
            {
                let mut shadow = node.borrow_mut();
                let Some(current) = shadow.as_component_mut() else {
                    return Ok(());
                };
                if current.component.is_memo()
                    && current.props == spec.props
                    && current.children == spec.children
                {
                    trace!("skip memoized <{}>", current.component.name());
                    return Ok(());
                }
                current.component = spec.component.clone();
                current.props = spec.props.clone();
                current.children = spec.children.clone();
            }
            render_component(env, node, at)
        }
    }
}

/// Destroys `node` and its subtree, running every teardown it owns.
///
/// Only the outermost output nodes are detached: handles nested under a
/// removed host node leave the medium together with it.
pub(crate) fn remove(env: &Rc<Env>, node: &ShadowRef, detach: bool) -> Result<(), Error> {
    enum Removal {
        Component(&'static str, Option<ShadowRef>),
        Host(NodeId, Option<Value>, Vec<ShadowRef>),
        Array(Vec<ShadowRef>),
        Text(NodeId),
    }

    let removal = match &mut node.borrow_mut().kind {
        NodeKind::Component(component) => {
            component.mounted = false;
            Removal::Component(component.component.name(), component.rendered.take())
        }
        NodeKind::Host(host) => Removal::Host(
            host.handle,
            host.props.get(REF_PROP).cloned(),
            std::mem::take(&mut host.children),
        ),
        NodeKind::Array(array) => Removal::Array(std::mem::take(&mut array.children)),
        NodeKind::Text(text) => Removal::Text(text.handle),
    };

    match removal {
        Removal::Component(name, rendered) => {
            debug!("unmount <{name}>");
            if let Some(child) = rendered {
                remove(env, &child, detach)?;
            }
            let cleanups = node
                .borrow_mut()
                .as_component_mut()
                .map(|component| component.hooks.take_cleanups())
                .unwrap_or_default();
            for cleanup in cleanups {
                run_cleanup(name, cleanup);
            }
        }
        Removal::Host(handle, reference, children) => {
            bind_ref(reference.as_ref(), None);
            for child in &children {
                remove(env, child, false)?;
            }
            if detach {
                trace!("remove #{handle}");
                env.host.borrow_mut().remove(handle)?;
            }
        }
        Removal::Array(children) => {
            for child in &children {
                remove(env, child, detach)?;
            }
        }
        Removal::Text(handle) => {
            if detach {
                trace!("remove text #{handle}");
                env.host.borrow_mut().remove(handle)?;
            }
        }
    }
    node.borrow_mut().real_count = 0;
    Ok(())
}

/// Moves the outputs of `node` so they start at `at`, keeping their order.
/// Returns how many output nodes moved.
pub(crate) fn relocate(env: &Rc<Env>, node: &ShadowRef, at: InsertionPoint) -> Result<usize, Error> {
    enum Target {
        Handle(NodeId),
        Children(Vec<ShadowRef>),
    }

    let target = match &node.borrow().kind {
        NodeKind::Host(host) => Target::Handle(host.handle),
        NodeKind::Text(text) => Target::Handle(text.handle),
        NodeKind::Array(array) => Target::Children(array.children.clone()),
        NodeKind::Component(component) => {
            Target::Children(component.rendered.iter().cloned().collect())
        }
    };
    match target {
        Target::Handle(handle) => {
            trace!("move #{handle} to {}:{}", at.parent, at.offset);
            env.host.borrow_mut().insert_at(at.parent, handle, at.offset)?;
            Ok(1)
        }
        Target::Children(children) => {
            let mut moved = 0;
            for child in &children {
                moved += relocate(env, child, at.advance(moved))?;
            }
            Ok(moved)
        }
    }
}

/// Reconciles the child list `existing` of `owner` against `specs`, whose
/// outputs start at `base`. Returns the new child list.
///
/// Each non-null spec adopts the first unclaimed existing node that
/// `can_adopt` it, so keyed and same-typed nodes keep their identity across
/// reorders. Text specs are matched after every other spec. Matched nodes
/// are moved into place before being updated; unmatched specs are created
/// in place and unclaimed nodes are removed afterwards.
pub(crate) fn reconcile_children(
    env: &Rc<Env>,
    owner: &ShadowRef,
    existing: Vec<ShadowRef>,
    specs: &[Spec],
    base: InsertionPoint,
) -> Result<Vec<ShadowRef>, Error> {
    let mut claimed = vec![false; existing.len()];
    let mut matches: Vec<Option<usize>> = vec![None; specs.len()];
    for texts in [false, true] {
        for (slot, spec) in specs.iter().enumerate() {
            if spec.is_null() || spec.is_text() != texts {
                continue;
            }
            let found = (0..existing.len())
                .find(|&index| !claimed[index] && can_adopt(&existing[index].borrow(), spec));
            if let Some(index) = found {
                claimed[index] = true;
                matches[slot] = Some(index);
            }
        }
    }

    let mut live = existing.clone();
    let mut placed = 0;
    let mut offset = base.offset;
    for (spec, matched) in specs.iter().zip(&matches) {
        if spec.is_null() {
            continue;
        }
        let at = InsertionPoint::new(base.parent, offset);
        let node = match matched {
            Some(index) => {
                let node = Rc::clone(&existing[*index]);
                let current = live
                    .iter()
                    .position(|candidate| Rc::ptr_eq(candidate, &node))
                    .unwrap_or(placed);
                if current != placed {
                    live.remove(current);
                    live.insert(placed, Rc::clone(&node));
                    relocate(env, &node, at)?;
                }
                update(env, &node, spec, at)?;
                node
            }
            None => {
                let Some(node) = create(env, spec, Parent::Node(Rc::downgrade(owner)), at)? else {
                    continue;
                };
                live.insert(placed, Rc::clone(&node));
                node
            }
        };
        offset += node.borrow().real_count;
        placed += 1;
    }

    for (node, claimed) in existing.iter().zip(claimed) {
        if !claimed {
            remove(env, node, true)?;
        }
    }
    live.truncate(placed);
    Ok(live)
}

fn set_array_children(node: &ShadowRef, children: Vec<ShadowRef>) {
    let count = sum_counts(&children);
    let mut shadow = node.borrow_mut();
    shadow.real_count = count;
    if let NodeKind::Array(array) = &mut shadow.kind {
        array.children = children;
    }
}

fn is_event_prop(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('o')
        && chars.next() == Some('n')
        && chars.next().is_some_and(|c| c.is_ascii_uppercase())
}

fn event_name(prop: &str) -> String {
    prop[2..].to_ascii_lowercase()
}

fn bind_ref(target: Option<&Value>, handle: Option<NodeId>) {
    let Some(Value::Ref(target)) = target else {
        return;
    };
    let node_ref: Option<NodeRef> = target.downcast::<Option<NodeId>>();
    match node_ref {
        Some(node_ref) => node_ref.set(handle),
        None => warn!("`ref` prop does not hold a node reference"),
    }
}

fn style_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => other.to_text(),
    }
}

fn sync_style(env: &Env, handle: NodeId, previous: &StyleMap, next: &StyleMap) -> Result<(), Error> {
    let mut host = env.host.borrow_mut();
    for (property, value) in next {
        if previous.get(property) != Some(value) {
            host.set_style(handle, property, style_text(value).as_deref())?;
        }
    }
    for property in previous.keys() {
        if !next.contains_key(property) {
            host.set_style(handle, property, None)?;
        }
    }
    Ok(())
}

/// Applies the difference between two prop maps to host node `handle`.
fn sync_props(env: &Env, handle: NodeId, previous: &Props, next: &Props) -> Result<(), Error> {
    let empty = StyleMap::new();
    for (name, value) in next.iter() {
        let old = previous.get(name);
        if old == Some(value) {
            continue;
        }
        match name {
            KEY_PROP | CHILDREN_PROP => {}
            REF_PROP => {
                bind_ref(old, None);
                bind_ref(Some(value), Some(handle));
            }
            STYLE_PROP => {
                let old = old.and_then(Value::as_style).unwrap_or(&empty);
                sync_style(env, handle, old, value.as_style().unwrap_or(&empty))?;
            }
            _ if is_event_prop(name) => {
                let event = event_name(name);
                let mut host = env.host.borrow_mut();
                if old.is_some() {
                    host.remove_listener(handle, &event)?;
                }
                if let Some(callback) = value.as_callback() {
                    trace!("listen #{handle} {event}");
                    host.add_listener(handle, &event, callback.clone())?;
                }
            }
            _ => {
                trace!("set #{handle} {name}={value:?}");
                env.host.borrow_mut().set_attribute(handle, name, value)?;
            }
        }
    }
    for (name, value) in previous.iter() {
        if next.contains(name) {
            continue;
        }
        match name {
            KEY_PROP | CHILDREN_PROP => {}
            REF_PROP => bind_ref(Some(value), None),
            STYLE_PROP => {
                let old = value.as_style().unwrap_or(&empty);
                sync_style(env, handle, old, &empty)?;
            }
            _ if is_event_prop(name) => {
                env.host.borrow_mut().remove_listener(handle, &event_name(name))?;
            }
            _ => {
                trace!("unset #{handle} {name}");
                env.host.borrow_mut().remove_attribute(handle, name)?;
            }
        }
    }
    Ok(())
}
