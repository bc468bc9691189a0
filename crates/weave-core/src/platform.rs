//! Platform abstraction for effect scheduling.
//!
//! The runtime never drives itself. It tells the embedding environment that
//! work is waiting, and the environment calls back into
//! [`Runtime::run_until_idle`](crate::Runtime::run_until_idle) (or the finer
//! grained drain functions) when it is ready.

/// Receives notifications whenever the runtime queues work.
///
/// Implementations must be safe to share across threads; the runtime itself
/// stays on the thread that created it.
pub trait RuntimeScheduler: Send + Sync {
    /// Layout work is waiting to run before the next frame is presented.
    fn schedule_frame(&self);

    /// Deferred work is waiting to run once the current call stack unwinds.
    fn schedule_task(&self);
}
