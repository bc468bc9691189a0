use std::cell::{Ref as CellRef, RefCell, RefMut};
use std::rc::Rc;

use log::debug;

use crate::error::Error;
use crate::host::Host;
use crate::reconcile::{create, remove, update};
use crate::render::{is_reconciling, is_rendering, Env, ReconcileGuard};
use crate::runtime::{Runtime, RuntimeHandle};
use crate::shadow::{can_adopt, InsertionPoint, Parent, ShadowRef};
use crate::spec::Spec;
use crate::NodeId;

/// Entry point binding a shadow tree to one container node of a host.
pub struct Root<H: Host + 'static> {
    host: Rc<RefCell<H>>,
    env: Rc<Env>,
    container: NodeId,
    current: Option<ShadowRef>,
    runtime: Option<Runtime>,
}

/// Creates a root rendering into `container` with its own effect runtime.
/// Existing children of the container are removed.
pub fn create_root<H: Host + 'static>(host: Rc<RefCell<H>>, container: NodeId) -> Result<Root<H>, Error> {
    let runtime = Runtime::default();
    let mut root = Root::with_runtime(host, container, runtime.handle())?;
    root.runtime = Some(runtime);
    Ok(root)
}

impl<H: Host + 'static> Root<H> {
    /// Creates a root whose effects are queued on an externally driven
    /// runtime.
    pub fn with_runtime(host: Rc<RefCell<H>>, container: NodeId, runtime: RuntimeHandle) -> Result<Self, Error> {
        host.borrow_mut().clear_children(container)?;
        let shared: Rc<RefCell<dyn Host>> = host.clone();
        Ok(Self {
            host,
            env: Rc::new(Env {
                host: shared,
                runtime,
            }),
            container,
            current: None,
            runtime: None,
        })
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn host(&self) -> CellRef<'_, H> {
        self.host.borrow()
    }

    pub fn host_mut(&self) -> RefMut<'_, H> {
        self.host.borrow_mut()
    }

    pub fn shared_host(&self) -> Rc<RefCell<H>> {
        Rc::clone(&self.host)
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.env.runtime.clone()
    }

    /// Number of output nodes the current tree contributes to the container.
    pub fn output_count(&self) -> usize {
        self.current.as_ref().map_or(0, |node| node.borrow().real_count)
    }

    pub fn is_mounted(&self) -> bool {
        self.current.is_some()
    }

    /// Reconciles the container against `spec`. Mutations happen before this
    /// returns; effects wait in the runtime.
    pub fn render(&mut self, spec: impl Into<Spec>) -> Result<(), Error> {
        if is_rendering() || is_reconciling() {
            return Err(Error::UpdateDuringRender);
        }
        let _pass = ReconcileGuard::enter();
        let spec = spec.into();
        let at = InsertionPoint::new(self.container, 0);
        match self.current.take() {
            Some(node) if can_adopt(&node.borrow(), &spec) => {
                self.current = Some(Rc::clone(&node));
                update(&self.env, &node, &spec, at)
            }
            previous => {
                if let Some(node) = previous {
                    debug!(
                        "root #{}: replace {} with {}",
                        self.container,
                        node.borrow().describe(),
                        spec.kind_name()
                    );
                    remove(&self.env, &node, true)?;
                }
                self.current = create(&self.env, &spec, Parent::Root(self.container), at)?;
                Ok(())
            }
        }
    }

    /// Removes everything rendered so far, running all teardowns before
    /// returning.
    pub fn unmount(&mut self) -> Result<(), Error> {
        if is_rendering() || is_reconciling() {
            return Err(Error::UpdateDuringRender);
        }
        let _pass = ReconcileGuard::enter();
        if let Some(node) = self.current.take() {
            debug!("unmount root #{}", self.container);
            remove(&self.env, &node, true)?;
        }
        Ok(())
    }

    /// Drains the owned runtime: layout effects, then regular effects, until
    /// none remain. Returns how many effect batches ran. Roots sharing an
    /// external runtime leave draining to its owner and return 0.
    pub fn flush_effects(&self) -> usize {
        self.runtime.as_ref().map_or(0, Runtime::run_until_idle)
    }
}
