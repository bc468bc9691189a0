use std::cell::{Ref as CellRef, RefCell};
use std::rc::Rc;

use weave_core::{create_root, Error, Event, HostStats, MemoryHost, NodeId, Root, Spec};

/// Headless harness for exercising component trees in tests.
///
/// `TestRoot` owns a [`MemoryHost`] and a root with its own runtime, and
/// exposes helpers to render, drain effects, fire events and inspect the
/// produced output tree.
pub struct TestRoot {
    root: Root<MemoryHost>,
}

impl TestRoot {
    pub fn new() -> Self {
        let host = Rc::new(RefCell::new(MemoryHost::new()));
        let container = host.borrow_mut().create_container("root");
        let root = match create_root(host, container) {
            Ok(root) => root,
            Err(err) => unreachable!("fresh container rejected: {err}"),
        };
        Self { root }
    }

    /// Renders `spec` and runs every effect it queues.
    pub fn set_content(&mut self, spec: impl Into<Spec>) -> Result<(), Error> {
        self.render(spec)?;
        self.flush_effects();
        Ok(())
    }

    /// Renders `spec` without draining effects.
    pub fn render(&mut self, spec: impl Into<Spec>) -> Result<(), Error> {
        self.root.render(spec)
    }

    /// Drains layout effects, then regular effects, until none remain.
    pub fn flush_effects(&self) -> usize {
        self.root.flush_effects()
    }

    pub fn unmount(&mut self) -> Result<(), Error> {
        self.root.unmount()
    }

    /// Dispatches `event` to the listener registered on `node`, then drains
    /// the effects the handler caused. Returns whether a listener ran.
    pub fn fire(&self, node: NodeId, event: &str) -> bool {
        self.fire_event(node, Event::new(event, node))
    }

    pub fn fire_event(&self, node: NodeId, event: Event) -> bool {
        let listener = self.root.host().listener(node, &event.name);
        let Some(listener) = listener else {
            return false;
        };
        listener.call(&event);
        self.flush_effects();
        true
    }

    pub fn container(&self) -> NodeId {
        self.root.container()
    }

    pub fn host(&self) -> CellRef<'_, MemoryHost> {
        self.root.host()
    }

    pub fn root(&mut self) -> &mut Root<MemoryHost> {
        &mut self.root
    }

    /// Markup of everything rendered into the container.
    pub fn markup(&self) -> String {
        self.host().inner_markup(self.container())
    }

    pub fn text(&self) -> String {
        self.host().text_content(self.container())
    }

    pub fn dump_tree(&self) -> String {
        self.host().dump_tree(self.container())
    }

    pub fn stats(&self) -> HostStats {
        self.host().stats()
    }

    pub fn reset_stats(&self) {
        self.root.host_mut().reset_stats();
    }

    /// Element nodes with `tag`, in document order.
    pub fn find_all(&self, tag: &str) -> Vec<NodeId> {
        let host = self.host();
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = host.children(self.container()).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if host.tag(node) == Some(tag) {
                found.push(node);
            }
            stack.extend(host.children(node).iter().rev().copied());
        }
        found
    }

    pub fn find(&self, tag: &str) -> Option<NodeId> {
        self.find_all(tag).into_iter().next()
    }
}

impl Default for TestRoot {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// `TestRoot`.
pub fn run_test_root<R>(f: impl FnOnce(&mut TestRoot) -> R) -> R {
    let mut root = TestRoot::new();
    f(&mut root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::{make_spec, props, use_state, Callback, Component, Props};

    #[test]
    fn test_root_fires_listeners_and_finds_nodes() {
        run_test_root(|rule| {
            let toggle = Component::new("Toggle", |_: &Props| {
                let (on, set_on) = use_state(|| false);
                let flip = Callback::new(move |_| {
                    let _ = set_on.update(|on| !on);
                });
                make_spec(
                    "div",
                    Props::new(),
                    [
                        make_spec("button", props! { "onClick" => flip }, [Spec::text("flip")]),
                        make_spec("span", Props::new(), [Spec::text(if on { "on" } else { "off" })]),
                    ],
                )
            });
            rule.set_content(make_spec(&toggle, Props::new(), []))
                .expect("install content");
            assert_eq!(rule.text(), "flipoff");

            let button = rule.find("button").expect("button rendered");
            assert!(rule.fire(button, "click"));
            assert_eq!(rule.text(), "flipon");
            assert!(!rule.fire(button, "keydown"));
            assert_eq!(rule.find_all("span").len(), 1);
        });
    }
}
