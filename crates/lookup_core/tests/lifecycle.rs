use lookup_core::{update, Effect, JobState, Lifecycle, Msg};

fn run(msgs: &[Msg]) -> (Lifecycle, Vec<Effect>) {
    let mut lifecycle = Lifecycle::new();
    let mut all = Vec::new();
    for msg in msgs {
        let (next, effects) = update(lifecycle, *msg);
        lifecycle = next;
        all.extend(effects);
    }
    (lifecycle, all)
}

#[test]
fn new_job_is_pending() {
    assert_eq!(Lifecycle::new().state(), JobState::Pending);
}

#[test]
fn started_pool_drains_to_completed() {
    let (lifecycle, effects) = run(&[Msg::PoolStarted, Msg::PoolDrained]);
    assert_eq!(lifecycle.state(), JobState::Completed);
    assert_eq!(effects, vec![Effect::Finished(JobState::Completed)]);
}

#[test]
fn cancel_while_running_stops_dispatch_then_cancels() {
    let (lifecycle, effects) = run(&[Msg::PoolStarted, Msg::CancelRequested, Msg::PoolDrained]);
    assert_eq!(lifecycle.state(), JobState::Cancelled);
    assert_eq!(
        effects,
        vec![Effect::StopDispatch, Effect::Finished(JobState::Cancelled)]
    );
}

#[test]
fn second_cancel_is_a_noop() {
    let (once, once_effects) = run(&[Msg::PoolStarted, Msg::CancelRequested]);
    let (twice, twice_effects) = run(&[Msg::PoolStarted, Msg::CancelRequested, Msg::CancelRequested]);
    assert_eq!(once, twice);
    assert_eq!(once_effects, twice_effects);
}

#[test]
fn cancel_before_start_applies_when_pool_starts() {
    let (lifecycle, effects) = run(&[Msg::CancelRequested, Msg::PoolStarted]);
    assert_eq!(lifecycle.state(), JobState::Running);
    assert_eq!(effects, vec![Effect::StopDispatch]);
}

#[test]
fn pool_start_failure_is_only_reachable_from_pending() {
    let (failed, effects) = run(&[Msg::PoolStartFailed]);
    assert_eq!(failed.state(), JobState::Failed);
    assert_eq!(effects, vec![Effect::Finished(JobState::Failed)]);

    let (running, effects) = run(&[Msg::PoolStarted, Msg::PoolStartFailed]);
    assert_eq!(running.state(), JobState::Running);
    assert!(effects.is_empty());
}

#[test]
fn terminal_states_absorb_everything() {
    let (done, _) = run(&[Msg::PoolStarted, Msg::PoolDrained]);
    for msg in [
        Msg::PoolStarted,
        Msg::PoolStartFailed,
        Msg::CancelRequested,
        Msg::PoolDrained,
    ] {
        let (next, effects) = update(done, msg);
        assert_eq!(next, done);
        assert!(effects.is_empty());
    }
}

#[test]
fn drain_before_start_is_ignored() {
    let (lifecycle, effects) = run(&[Msg::PoolDrained]);
    assert_eq!(lifecycle.state(), JobState::Pending);
    assert!(effects.is_empty());
}

#[test]
fn transition_table_matches_state_machine() {
    use JobState::*;
    assert!(Pending.can_transition_to(Running));
    assert!(Pending.can_transition_to(Failed));
    assert!(Running.can_transition_to(Completed));
    assert!(Running.can_transition_to(Cancelled));
    assert!(!Running.can_transition_to(Failed));
    assert!(!Completed.can_transition_to(Running));
    assert!(!Cancelled.can_transition_to(Completed));
}
