//! Standard runtime services backed by Rust's `std` library.
//!
//! [`StdScheduler`] records which queues of a [`weave_core::Runtime`] have
//! work waiting and wakes the embedding loop; [`StdRuntime`] bundles it with
//! a runtime and offers [`StdRuntime::pump`] to drain both queues in order.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use log::trace;
use weave_core::{Runtime, RuntimeHandle, RuntimeScheduler};

type Waker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Scheduler that flags pending work with atomics.
pub struct StdScheduler {
    frame_requested: AtomicBool,
    task_requested: AtomicBool,
    waker: RwLock<Option<Waker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            frame_requested: AtomicBool::new(false),
            task_requested: AtomicBool::new(false),
            waker: RwLock::new(None),
        }
    }

    /// Returns whether a frame has been requested since the last call.
    pub fn take_frame_request(&self) -> bool {
        self.frame_requested.swap(false, Ordering::SeqCst)
    }

    /// Returns whether a task has been queued since the last call.
    pub fn take_task_request(&self) -> bool {
        self.task_requested.swap(false, Ordering::SeqCst)
    }

    /// Registers a waker invoked whenever the runtime queues work.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self.waker.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    pub fn clear_waker(&self) {
        *self.waker.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field("frame_requested", &self.frame_requested.load(Ordering::SeqCst))
            .field("task_requested", &self.task_requested.load(Ordering::SeqCst))
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_frame(&self) {
        self.frame_requested.store(true, Ordering::SeqCst);
        self.wake();
    }

    fn schedule_task(&self) {
        self.task_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Convenience container bundling the standard scheduler with a runtime.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    runtime: Runtime,
}

impl StdRuntime {
    pub fn new() -> Self {
        let scheduler = Arc::new(StdScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        Self { scheduler, runtime }
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    /// Handle to pass to [`weave_core::Root::with_runtime`].
    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn take_frame_request(&self) -> bool {
        self.scheduler.take_frame_request()
    }

    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_waker(waker);
    }

    pub fn clear_waker(&self) {
        self.scheduler.clear_waker();
    }

    /// Runs the frame callbacks (layout effects) queued so far.
    pub fn drain_frame(&self) -> usize {
        self.scheduler.take_frame_request();
        self.runtime.drain_frame_callbacks()
    }

    /// Drains layout effects, then regular effects, until nothing is queued.
    /// Returns how many jobs ran.
    pub fn pump(&self) -> usize {
        self.scheduler.take_frame_request();
        self.scheduler.take_task_request();
        let ran = self.runtime.run_until_idle();
        if ran > 0 {
            trace!("pumped {ran} runtime jobs");
        }
        self.scheduler.take_frame_request();
        self.scheduler.take_task_request();
        ran
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use weave_core::{
        make_spec, use_effect, use_layout_effect, use_state, Component, Deps, MemoryHost, Props,
        Root, Spec,
    };

    use super::StdRuntime;

    #[test]
    fn effects_flag_the_scheduler_and_run_on_pump() {
        let runtime = StdRuntime::new();
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        runtime.set_waker(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let host = Rc::new(RefCell::new(MemoryHost::new()));
        let container = host.borrow_mut().create_container("root");
        let mut root = Root::with_runtime(Rc::clone(&host), container, runtime.runtime_handle())
            .expect("root");

        let log = Rc::new(RefCell::new(Vec::new()));
        let watcher = {
            let log = Rc::clone(&log);
            Component::new("Watcher", move |_: &Props| {
                let (loaded, set_loaded) = use_state(|| false);
                let layout = Rc::clone(&log);
                use_layout_effect(move || layout.borrow_mut().push("measure"), Deps::none());
                let passive = Rc::clone(&log);
                use_effect(
                    move || {
                        passive.borrow_mut().push("load");
                        set_loaded.set(true)
                    },
                    Deps::none(),
                );
                Spec::text(if loaded { "ready" } else { "loading" })
            })
        };

        root.render(make_spec(&watcher, Props::new(), []))
            .expect("render");
        assert!(runtime.take_frame_request());
        assert!(wakes.load(Ordering::SeqCst) >= 2);
        assert_eq!(host.borrow().text_content(container), "loading");

        assert_eq!(runtime.pump(), 2);
        assert_eq!(*log.borrow(), ["measure", "load"]);
        assert_eq!(host.borrow().text_content(container), "ready");
        assert!(!runtime.take_frame_request());
    }
}
