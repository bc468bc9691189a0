use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use log::debug;

use crate::platform::RuntimeScheduler;

pub(crate) type Job = Box<dyn FnOnce() + 'static>;

struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    needs_frame: Cell<bool>,
    frame_callbacks: RefCell<VecDeque<Job>>,
    pending_tasks: RefCell<VecDeque<Job>>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            scheduler,
            needs_frame: Cell::new(false),
            frame_callbacks: RefCell::new(VecDeque::new()),
            pending_tasks: RefCell::new(VecDeque::new()),
        }
    }

    fn request_frame(&self, job: Job) {
        self.frame_callbacks.borrow_mut().push_back(job);
        if !self.needs_frame.replace(true) {
            self.scheduler.schedule_frame();
        }
    }

    fn enqueue_task(&self, job: Job) {
        self.pending_tasks.borrow_mut().push_back(job);
        self.scheduler.schedule_task();
    }

    // Work queued while draining waits for the next drain.
    fn drain_frame_callbacks(&self) -> usize {
        let pending: Vec<Job> = self.frame_callbacks.borrow_mut().drain(..).collect();
        self.needs_frame.set(!self.frame_callbacks.borrow().is_empty());
        let count = pending.len();
        for job in pending {
            job();
        }
        count
    }

    fn drain_tasks(&self) -> usize {
        let pending: Vec<Job> = self.pending_tasks.borrow_mut().drain(..).collect();
        let count = pending.len();
        for job in pending {
            job();
        }
        count
    }

    fn has_frame_callbacks(&self) -> bool {
        !self.frame_callbacks.borrow().is_empty()
    }

    fn has_tasks(&self) -> bool {
        !self.pending_tasks.borrow().is_empty()
    }
}

/// Owner of the deferred effect queues.
///
/// Frame callbacks carry layout effects and always drain before tasks, which
/// carry regular effects.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn needs_frame(&self) -> bool {
        self.inner.needs_frame.get()
    }

    pub fn has_pending_work(&self) -> bool {
        self.inner.has_frame_callbacks() || self.inner.has_tasks()
    }

    /// Runs the frame callbacks queued so far. Returns how many ran.
    pub fn drain_frame_callbacks(&self) -> usize {
        self.inner.drain_frame_callbacks()
    }

    /// Runs the tasks queued so far. Returns how many ran.
    pub fn drain_tasks(&self) -> usize {
        self.inner.drain_tasks()
    }

    /// Alternates frame and task drains until both queues stay empty.
    /// Returns the total number of jobs that ran.
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        loop {
            let ran = self.drain_frame_callbacks() + self.drain_tasks();
            if ran == 0 {
                return total;
            }
            total += ran;
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new(Arc::new(DefaultScheduler))
    }
}

/// Scheduler that ignores notifications; the owner drains the runtime
/// explicitly.
#[derive(Debug, Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_frame(&self) {}

    fn schedule_task(&self) {}
}

/// Weak handle to a [`Runtime`]. Work submitted after the runtime is dropped
/// is discarded; effects never run in the middle of a render pass.
#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub(crate) fn request_frame(&self, job: Job) {
        match self.0.upgrade() {
            Some(inner) => inner.request_frame(job),
            None => debug!("runtime dropped; discarding frame callback"),
        }
    }

    pub(crate) fn spawn_task(&self, job: Job) {
        match self.0.upgrade() {
            Some(inner) => inner.enqueue_task(job),
            None => debug!("runtime dropped; discarding task"),
        }
    }

    pub fn drain_frame_callbacks(&self) -> usize {
        self.0
            .upgrade()
            .map(|inner| inner.drain_frame_callbacks())
            .unwrap_or(0)
    }

    pub fn drain_tasks(&self) -> usize {
        self.0
            .upgrade()
            .map(|inner| inner.drain_tasks())
            .unwrap_or(0)
    }

    pub fn has_frame_callbacks(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.has_frame_callbacks())
            .unwrap_or(false)
    }

    pub fn has_pending_tasks(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.has_tasks())
            .unwrap_or(false)
    }
}
