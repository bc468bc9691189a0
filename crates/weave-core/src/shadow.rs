//! Persistent shadow tree.
//!
//! One [`ShadowNode`] exists per rendered spec occurrence. Nodes own their
//! children and keep a weak back-reference to their parent; the root node's
//! parent is the output container itself.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::component::Component;
use crate::error::Error;
use crate::hooks::HookSlots;
use crate::props::Props;
use crate::spec::Spec;
use crate::NodeId;

pub(crate) type ShadowRef = Rc<RefCell<ShadowNode>>;
pub(crate) type WeakShadow = Weak<RefCell<ShadowNode>>;

#[derive(Clone)]
pub(crate) enum Parent {
    /// Top of the tree; outputs land directly in this container.
    Root(NodeId),
    Node(WeakShadow),
}

pub(crate) struct ShadowNode {
    pub(crate) parent: Parent,
    /// Number of output-medium nodes this subtree contributes.
    pub(crate) real_count: usize,
    pub(crate) kind: NodeKind,
}

pub(crate) enum NodeKind {
    Component(ComponentNode),
    Host(HostNode),
    Array(ArrayNode),
    Text(TextNode),
}

pub(crate) struct ComponentNode {
    pub(crate) component: Component,
    pub(crate) props: Props,
    pub(crate) children: Vec<Spec>,
    pub(crate) rendered: Option<ShadowRef>,
    pub(crate) hooks: HookSlots,
    pub(crate) mounted: bool,
}

pub(crate) struct HostNode {
    pub(crate) tag: String,
    pub(crate) props: Props,
    pub(crate) handle: NodeId,
    pub(crate) children: Vec<ShadowRef>,
}

#[derive(Default)]
pub(crate) struct ArrayNode {
    pub(crate) children: Vec<ShadowRef>,
}

pub(crate) struct TextNode {
    pub(crate) text: String,
    pub(crate) handle: NodeId,
}

/// Where the outputs of a subtree go: under `parent`, starting at child
/// `offset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct InsertionPoint {
    pub(crate) parent: NodeId,
    pub(crate) offset: usize,
}

impl InsertionPoint {
    pub(crate) fn new(parent: NodeId, offset: usize) -> Self {
        Self { parent, offset }
    }

    pub(crate) fn advance(self, by: usize) -> Self {
        Self {
            parent: self.parent,
            offset: self.offset + by,
        }
    }
}

impl ShadowNode {
    pub(crate) fn new(parent: Parent, kind: NodeKind) -> ShadowRef {
        let real_count = match kind {
            NodeKind::Host(_) | NodeKind::Text(_) => 1,
            NodeKind::Array(_) | NodeKind::Component(_) => 0,
        };
        Rc::new(RefCell::new(ShadowNode {
            parent,
            real_count,
            kind,
        }))
    }

    pub(crate) fn as_component(&self) -> Option<&ComponentNode> {
        match &self.kind {
            NodeKind::Component(component) => Some(component),
            _ => None,
        }
    }

    pub(crate) fn as_component_mut(&mut self) -> Option<&mut ComponentNode> {
        match &mut self.kind {
            NodeKind::Component(component) => Some(component),
            _ => None,
        }
    }

    /// Identity hint of this node among its siblings.
    fn key(&self) -> Option<&crate::Value> {
        match &self.kind {
            NodeKind::Component(component) => component.props.key(),
            NodeKind::Host(host) => host.props.key(),
            NodeKind::Array(_) | NodeKind::Text(_) => None,
        }
    }

    pub(crate) fn describe(&self) -> String {
        match &self.kind {
            NodeKind::Component(component) => format!("<{}>", component.component.name()),
            NodeKind::Host(host) => format!("<{}#{}>", host.tag, host.handle),
            NodeKind::Array(array) => format!("[{} children]", array.children.len()),
            NodeKind::Text(text) => format!("{:?}", text.text),
        }
    }

    /// Output count implied by this node's children.
    fn computed_count(&self) -> usize {
        match &self.kind {
            NodeKind::Host(_) | NodeKind::Text(_) => 1,
            NodeKind::Array(array) => sum_counts(&array.children),
            NodeKind::Component(component) => component
                .rendered
                .as_ref()
                .map_or(0, |child| child.borrow().real_count),
        }
    }
}

pub(crate) fn sum_counts(children: &[ShadowRef]) -> usize {
    children.iter().map(|child| child.borrow().real_count).sum()
}

/// Whether `node` may be updated in place to represent `spec`.
pub(crate) fn can_adopt(node: &ShadowNode, spec: &Spec) -> bool {
    match (&node.kind, spec) {
        (NodeKind::Component(existing), Spec::Component(spec)) => {
            existing.component.same_identity(&spec.component) && node.key() == spec.props.key()
        }
        (NodeKind::Host(existing), Spec::Host(spec)) => {
            existing.tag == spec.tag && node.key() == spec.props.key()
        }
        (NodeKind::Array(_), Spec::Array(_)) | (NodeKind::Text(_), Spec::Text(_)) => true,
        _ => false,
    }
}

fn preceding_count(siblings: &[ShadowRef], node: &ShadowRef) -> usize {
    let mut count = 0;
    for sibling in siblings {
        if Rc::ptr_eq(sibling, node) {
            return count;
        }
        count += sibling.borrow().real_count;
    }
    count
}

/// Output parent and child offset of the first output of `node`.
pub(crate) fn output_location(node: &ShadowRef) -> Result<InsertionPoint, Error> {
    let mut offset = 0;
    let mut current = Rc::clone(node);
    loop {
        let parent = current.borrow().parent.clone();
        let weak = match parent {
            Parent::Root(container) => return Ok(InsertionPoint::new(container, offset)),
            Parent::Node(weak) => weak,
        };
        let parent = weak.upgrade().ok_or(Error::Detached)?;
        {
            let owner = parent.borrow();
            match &owner.kind {
                NodeKind::Host(host) => {
                    offset += preceding_count(&host.children, &current);
                    return Ok(InsertionPoint::new(host.handle, offset));
                }
                NodeKind::Array(array) => offset += preceding_count(&array.children, &current),
                NodeKind::Component(_) => {}
                NodeKind::Text(_) => return Err(Error::Detached),
            }
        }
        current = parent;
    }
}

/// Recomputes output counts from `node` upwards until a host node or the
/// root absorbs the change.
pub(crate) fn refresh_counts(node: &ShadowRef) {
    let mut current = Rc::clone(node);
    loop {
        let parent = {
            let mut shadow = current.borrow_mut();
            let count = shadow.computed_count();
            shadow.real_count = count;
            match &shadow.parent {
                Parent::Root(_) => return,
                Parent::Node(weak) => weak.upgrade(),
            }
        };
        let Some(parent) = parent else {
            return;
        };
        if matches!(parent.borrow().kind, NodeKind::Host(_) | NodeKind::Text(_)) {
            return;
        }
        current = parent;
    }
}
