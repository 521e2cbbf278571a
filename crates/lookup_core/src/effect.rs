use crate::JobState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Workers must stop taking new items from the queue.
    StopDispatch,
    /// The job reached a terminal state.
    Finished(JobState),
}
