/// Events that drive the job lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Msg {
    /// The worker pool was spawned and is pulling work.
    PoolStarted,
    /// The worker pool could not be brought up at all.
    PoolStartFailed,
    /// The user (or a policy) asked to stop dispatching new work.
    CancelRequested,
    /// Every worker has exited; in-flight items have reached a terminal status.
    PoolDrained,
}
