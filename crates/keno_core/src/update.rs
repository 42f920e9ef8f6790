use crate::{Effect, FailureReason, Msg, Notification, Phase, RunState, StreamEvent};

/// Pure update function: applies a message to state and returns any effects.
///
/// Stream messages only apply while `Running`; once a run is terminal every
/// further stream message is ignored and the state is returned untouched.
pub fn update(mut state: RunState, msg: Msg) -> (RunState, Vec<Effect>) {
    let effects = match msg {
        Msg::RunStarted => {
            // At most one run in flight; callers reject re-entry before sending this.
            if state.phase() == Phase::Running {
                return (state, Vec::new());
            }
            state.begin_run();
            Vec::new()
        }
        Msg::Stream(event) => {
            if state.phase() != Phase::Running {
                return (state, Vec::new());
            }
            apply_event(&mut state, event)
        }
        Msg::StreamEnded => {
            // Upstream closed cleanly without `complete`: terminal, but not worth an error toast.
            if state.phase() == Phase::Running {
                state.fail(FailureReason::Incomplete);
            }
            Vec::new()
        }
        Msg::RunFailed(reason) => fail_if_running(&mut state, reason),
    };

    (state, effects)
}

fn apply_event(state: &mut RunState, event: StreamEvent) -> Vec<Effect> {
    match event {
        StreamEvent::Progress { percent } => {
            state.set_progress(percent);
            Vec::new()
        }
        StreamEvent::Result { value } => {
            state.push_result(value);
            Vec::new()
        }
        StreamEvent::Complete { total } => {
            state.complete(total);
            vec![Effect::Notify(Notification::Completed {
                total,
                received: state.results().len(),
            })]
        }
    }
}

fn fail_if_running(state: &mut RunState, reason: FailureReason) -> Vec<Effect> {
    if state.phase() != Phase::Running {
        return Vec::new();
    }
    state.fail(reason);
    vec![Effect::Notify(Notification::Failed { reason })]
}
