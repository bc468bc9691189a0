//! Boundary with the output medium.
//!
//! The reconciler only ever talks to the medium through [`Host`]. The
//! [`MemoryHost`] implementation keeps an arena of element and text nodes and
//! counts every mutation, which is what tests, benches and the demo render
//! into.

use std::fmt::Write as _;

use hashbrown::HashMap;

use crate::error::HostError;
use crate::value::{Callback, Event, Value};
use crate::NodeId;

/// Ordered tree of mutable nodes.
pub trait Host {
    fn create_element(&mut self, tag: &str) -> NodeId;

    fn create_text(&mut self, text: &str) -> NodeId;

    /// Inserts `child` under `parent`. Offset 0 prepends; any other offset
    /// places the child after the parent's current child at `offset - 1`.
    /// Inserting an attached node moves it.
    fn insert_at(&mut self, parent: NodeId, child: NodeId, offset: usize) -> Result<(), HostError>;

    /// Detaches `node` from its parent and releases its subtree.
    fn remove(&mut self, node: NodeId) -> Result<(), HostError>;

    fn clear_children(&mut self, node: NodeId) -> Result<(), HostError>;

    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), HostError>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &Value) -> Result<(), HostError>;

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), HostError>;

    fn add_listener(&mut self, node: NodeId, event: &str, handler: Callback) -> Result<(), HostError>;

    fn remove_listener(&mut self, node: NodeId, event: &str) -> Result<(), HostError>;

    /// Writes one style property; `None` clears it.
    fn set_style(&mut self, node: NodeId, property: &str, value: Option<&str>) -> Result<(), HostError>;
}

/// Mutation counters kept by [`MemoryHost`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub created: usize,
    pub inserted: usize,
    pub removed: usize,
    pub text_writes: usize,
    pub attributes_set: usize,
    pub attributes_removed: usize,
    pub listeners_added: usize,
    pub listeners_removed: usize,
    pub style_writes: usize,
}

impl HostStats {
    pub fn total(&self) -> usize {
        self.created
            + self.inserted
            + self.removed
            + self.text_writes
            + self.attributes_set
            + self.attributes_removed
            + self.listeners_added
            + self.listeners_removed
            + self.style_writes
    }
}

enum HostNodeKind {
    Element { tag: String },
    Text { text: String },
}

struct HostNode {
    kind: HostNodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: HashMap<String, Value>,
    listeners: HashMap<String, Callback>,
    style: HashMap<String, String>,
}

impl HostNode {
    fn new(kind: HostNodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attributes: HashMap::new(),
            listeners: HashMap::new(),
            style: HashMap::new(),
        }
    }
}

#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<Option<HostNode>>,
    stats: HostStats,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached element to serve as a render container. Not counted
    /// as a mutation.
    pub fn create_container(&mut self, tag: &str) -> NodeId {
        self.push(HostNode::new(HostNodeKind::Element {
            tag: tag.to_owned(),
        }))
    }

    fn push(&mut self, node: HostNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(node));
        id
    }

    fn node(&self, id: NodeId) -> Result<&HostNode, HostError> {
        self.nodes
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(HostError::Missing { id })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut HostNode, HostError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(HostError::Missing { id })
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut HostNode, HostError> {
        let node = self.node_mut(id)?;
        match node.kind {
            HostNodeKind::Element { .. } => Ok(node),
            HostNodeKind::Text { .. } => Err(HostError::NotAnElement { id }),
        }
    }

    fn detach(&mut self, id: NodeId) -> Result<(), HostError> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(());
        };
        let siblings = &mut self.node_mut(parent)?.children;
        siblings.retain(|&child| child != id);
        self.node_mut(id)?.parent = None;
        Ok(())
    }

    fn release(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id).and_then(Option::take) else {
            return;
        };
        for child in node.children {
            self.release(child);
        }
    }

    pub fn stats(&self) -> HostStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = HostStats::default();
    }

    /// Number of live nodes, containers included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok().and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).ok()?.kind {
            HostNodeKind::Element { tag } => Some(tag),
            HostNodeKind::Text { .. } => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).ok()?.kind {
            HostNodeKind::Text { text } => Some(text),
            HostNodeKind::Element { .. } => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&Value> {
        self.node(id).ok()?.attributes.get(name)
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.node(id).ok()?.style.get(property).map(String::as_str)
    }

    pub fn listener(&self, id: NodeId, event: &str) -> Option<Callback> {
        self.node(id).ok()?.listeners.get(event).cloned()
    }

    /// Invokes the listener registered for `event` on `id`, if any.
    ///
    /// The host must not be borrowed while the handler runs when the handler
    /// can trigger a re-render; prefer fetching the [`listener`](Self::listener)
    /// and calling it after releasing the borrow in that case.
    pub fn dispatch(&self, id: NodeId, event: &str) -> bool {
        match self.listener(id, event) {
            Some(handler) => {
                handler.call(&Event::new(event, id));
                true
            }
            None => false,
        }
    }

    /// Concatenated text of every text node under `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut output = String::new();
        self.collect_text(id, &mut output);
        output
    }

    fn collect_text(&self, id: NodeId, output: &mut String) {
        let Ok(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            HostNodeKind::Text { text } => output.push_str(text),
            HostNodeKind::Element { .. } => {
                for &child in &node.children {
                    self.collect_text(child, output);
                }
            }
        }
    }

    /// Serializes the children of `id` as markup, attributes and style
    /// properties sorted by name.
    pub fn inner_markup(&self, id: NodeId) -> String {
        let mut output = String::new();
        for &child in self.children(id) {
            self.write_markup(child, &mut output);
        }
        output
    }

    pub fn to_markup(&self, id: NodeId) -> String {
        let mut output = String::new();
        self.write_markup(id, &mut output);
        output
    }

    fn write_markup(&self, id: NodeId, output: &mut String) {
        let Ok(node) = self.node(id) else {
            return;
        };
        let tag = match &node.kind {
            HostNodeKind::Text { text } => {
                output.push_str(text);
                return;
            }
            HostNodeKind::Element { tag } => tag,
        };
        output.push('<');
        output.push_str(tag);
        let mut attributes: Vec<_> = node.attributes.iter().collect();
        attributes.sort_by(|a, b| a.0.cmp(b.0));
        for (name, value) in attributes {
            let text = value.to_text().unwrap_or_else(|| value.kind_name().to_owned());
            let _ = write!(output, " {name}=\"{text}\"");
        }
        if !node.style.is_empty() {
            let mut style: Vec<_> = node.style.iter().collect();
            style.sort_by(|a, b| a.0.cmp(b.0));
            let rendered: Vec<String> = style
                .into_iter()
                .map(|(property, value)| format!("{property}: {value}"))
                .collect();
            let _ = write!(output, " style=\"{}\"", rendered.join("; "));
        }
        output.push('>');
        for &child in &node.children {
            self.write_markup(child, output);
        }
        let _ = write!(output, "</{tag}>");
    }

    pub fn dump_tree(&self, root: NodeId) -> String {
        let mut output = String::new();
        self.dump_node(&mut output, root, 0);
        output
    }

    fn dump_node(&self, output: &mut String, id: NodeId, depth: usize) {
        let indent = "  ".repeat(depth);
        match self.node(id) {
            Ok(node) => {
                match &node.kind {
                    HostNodeKind::Element { tag } => {
                        let _ = writeln!(output, "{indent}[{id}] <{tag}>");
                    }
                    HostNodeKind::Text { text } => {
                        let _ = writeln!(output, "{indent}[{id}] {text:?}");
                    }
                }
                for &child in &node.children {
                    self.dump_node(output, child, depth + 1);
                }
            }
            Err(_) => {
                let _ = writeln!(output, "{indent}[{id}] (missing)");
            }
        }
    }
}

impl Host for MemoryHost {
    fn create_element(&mut self, tag: &str) -> NodeId {
        self.stats.created += 1;
        self.push(HostNode::new(HostNodeKind::Element {
            tag: tag.to_owned(),
        }))
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.stats.created += 1;
        self.push(HostNode::new(HostNodeKind::Text {
            text: text.to_owned(),
        }))
    }

    fn insert_at(&mut self, parent: NodeId, child: NodeId, offset: usize) -> Result<(), HostError> {
        self.node(child)?;
        let siblings = &self.element_mut(parent)?.children;
        let reference = match offset {
            0 => None,
            _ => siblings.get(offset - 1).or(siblings.last()).copied(),
        };
        self.stats.inserted += 1;
        if reference == Some(child) {
            return Ok(());
        }
        self.detach(child)?;
        let siblings = &mut self.element_mut(parent)?.children;
        let index = reference
            .and_then(|reference| siblings.iter().position(|&id| id == reference))
            .map_or(0, |position| position + 1);
        siblings.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn remove(&mut self, node: NodeId) -> Result<(), HostError> {
        self.detach(node)?;
        self.release(node);
        self.stats.removed += 1;
        Ok(())
    }

    fn clear_children(&mut self, node: NodeId) -> Result<(), HostError> {
        let children = std::mem::take(&mut self.element_mut(node)?.children);
        for child in children {
            self.release(child);
            self.stats.removed += 1;
        }
        Ok(())
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), HostError> {
        let HostNodeKind::Text { text: current } = &mut self.node_mut(node)?.kind else {
            return Err(HostError::NotText { id: node });
        };
        text.clone_into(current);
        self.stats.text_writes += 1;
        Ok(())
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &Value) -> Result<(), HostError> {
        self.element_mut(node)?
            .attributes
            .insert(name.to_owned(), value.clone());
        self.stats.attributes_set += 1;
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), HostError> {
        self.element_mut(node)?.attributes.remove(name);
        self.stats.attributes_removed += 1;
        Ok(())
    }

    fn add_listener(&mut self, node: NodeId, event: &str, handler: Callback) -> Result<(), HostError> {
        self.element_mut(node)?
            .listeners
            .insert(event.to_owned(), handler);
        self.stats.listeners_added += 1;
        Ok(())
    }

    fn remove_listener(&mut self, node: NodeId, event: &str) -> Result<(), HostError> {
        self.element_mut(node)?.listeners.remove(event);
        self.stats.listeners_removed += 1;
        Ok(())
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: Option<&str>) -> Result<(), HostError> {
        let style = &mut self.element_mut(node)?.style;
        match value {
            Some(value) => {
                style.insert(property.to_owned(), value.to_owned());
            }
            None => {
                style.remove(property);
            }
        }
        self.stats.style_writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(host: &mut MemoryHost, labels: &[&str]) -> (NodeId, Vec<NodeId>) {
        let root = host.create_container("ul");
        let mut items = Vec::new();
        for (offset, label) in labels.iter().enumerate() {
            let item = host.create_text(label);
            host.insert_at(root, item, offset).expect("insert");
            items.push(item);
        }
        (root, items)
    }

    #[test]
    fn offset_zero_prepends_and_other_offsets_follow_previous_child() {
        let mut host = MemoryHost::new();
        let (root, _) = list(&mut host, &["b", "d"]);
        let a = host.create_text("a");
        host.insert_at(root, a, 0).expect("prepend");
        let c = host.create_text("c");
        host.insert_at(root, c, 2).expect("insert after b");
        assert_eq!(host.text_content(root), "abcd");
    }

    #[test]
    fn inserting_attached_node_moves_it() {
        let mut host = MemoryHost::new();
        let (root, items) = list(&mut host, &["a", "b", "c"]);
        host.insert_at(root, items[2], 0).expect("move c to front");
        assert_eq!(host.text_content(root), "cab");
        host.insert_at(root, items[1], 1).expect("move b after c");
        assert_eq!(host.text_content(root), "cba");
        assert_eq!(host.children(root).len(), 3);
    }

    #[test]
    fn remove_releases_subtree() {
        let mut host = MemoryHost::new();
        let root = host.create_container("root");
        let div = host.create_element("div");
        let text = host.create_text("x");
        host.insert_at(div, text, 0).expect("insert text");
        host.insert_at(root, div, 0).expect("insert div");
        host.remove(div).expect("remove");
        assert!(!host.contains(div));
        assert!(!host.contains(text));
        assert!(host.children(root).is_empty());
        assert_eq!(host.remove(div), Err(HostError::Missing { id: div }));
    }

    #[test]
    fn markup_sorts_attributes_and_style() {
        let mut host = MemoryHost::new();
        let root = host.create_container("root");
        let div = host.create_element("div");
        host.set_attribute(div, "title", &Value::from("t")).expect("attr");
        host.set_attribute(div, "id", &Value::from("main")).expect("attr");
        host.set_style(div, "width", Some("10px")).expect("style");
        host.set_style(div, "color", Some("red")).expect("style");
        host.insert_at(root, div, 0).expect("insert");
        assert_eq!(
            host.inner_markup(root),
            "<div id=\"main\" title=\"t\" style=\"color: red; width: 10px\"></div>"
        );
    }
}
