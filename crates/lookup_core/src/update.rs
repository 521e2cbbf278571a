use crate::{Effect, JobState, Lifecycle, Msg};

/// Pure update function: applies a lifecycle event and returns any effects.
///
/// Terminal states absorb every message, so late events (a second cancel, a
/// drain notification after failure) are no-ops.
pub fn update(mut lifecycle: Lifecycle, msg: Msg) -> (Lifecycle, Vec<Effect>) {
    if lifecycle.state().is_terminal() {
        return (lifecycle, Vec::new());
    }

    let effects = match msg {
        Msg::PoolStarted => {
            if lifecycle.state() != JobState::Pending {
                return (lifecycle, Vec::new());
            }
            lifecycle.set_state(JobState::Running);
            if lifecycle.cancel_requested() {
                vec![Effect::StopDispatch]
            } else {
                Vec::new()
            }
        }
        Msg::PoolStartFailed => {
            if lifecycle.state() != JobState::Pending {
                return (lifecycle, Vec::new());
            }
            lifecycle.set_state(JobState::Failed);
            vec![Effect::Finished(JobState::Failed)]
        }
        Msg::CancelRequested => {
            if lifecycle.cancel_requested() {
                Vec::new()
            } else {
                lifecycle.request_cancel();
                match lifecycle.state() {
                    // Dispatch is stopped as soon as the pool starts.
                    JobState::Pending => Vec::new(),
                    _ => vec![Effect::StopDispatch],
                }
            }
        }
        Msg::PoolDrained => {
            if lifecycle.state() != JobState::Running {
                return (lifecycle, Vec::new());
            }
            let terminal = if lifecycle.cancel_requested() {
                JobState::Cancelled
            } else {
                JobState::Completed
            };
            lifecycle.set_state(terminal);
            vec![Effect::Finished(terminal)]
        }
    };

    (lifecycle, effects)
}
