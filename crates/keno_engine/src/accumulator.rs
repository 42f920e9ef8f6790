//! Drives one job run from trigger call to terminal phase.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use keno_core::{update, Effect, FailureReason, Msg, Notification, Phase, RunSnapshot, RunState};
use keno_logging::{keno_debug, keno_info, keno_warn};
use tokio_util::sync::CancellationToken;

use crate::decode::StreamDecoder;
use crate::export::{self, ExportError, ExportFormat};
use crate::fetch::JobClient;
use crate::RunError;

/// Receives state changes of a run.
///
/// Both callbacks run synchronously on the task driving the run, after the
/// state lock has been released.
pub trait RunObserver: Send + Sync {
    /// Called after every change to the run state.
    fn on_snapshot(&self, _snapshot: &RunSnapshot) {}
    /// Called once when the run enters `Completed` or `Failed`.
    fn on_notification(&self, _notification: &Notification) {}
}

pub struct RunAccumulator {
    client: Arc<dyn JobClient>,
    state: Mutex<RunState>,
    observers: Vec<Arc<dyn RunObserver>>,
}

impl RunAccumulator {
    pub fn new(client: Arc<dyn JobClient>) -> Self {
        Self {
            client,
            state: Mutex::new(RunState::new()),
            observers: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Snapshot of the run as of now. Never blocks on the network.
    pub fn current_state(&self) -> RunSnapshot {
        self.lock().view()
    }

    /// Encodes the results received so far, whatever the phase.
    pub fn export(&self, format: ExportFormat) -> Result<String, ExportError> {
        let state = self.lock();
        export::encode(state.results(), format)
    }

    /// Runs one job to its end and returns the final snapshot.
    ///
    /// The previous run's results are discarded when the new run starts. On
    /// failure the run is left in `Failed` with the results it had received.
    /// Cancelling `cancel`, or dropping the returned future, ends the run as
    /// `Failed(Cancelled)` and closes the response body.
    pub async fn start(&self, cancel: CancellationToken) -> Result<RunSnapshot, RunError> {
        self.begin()?;
        let guard = RunGuard { accumulator: self };

        let outcome = self.consume(&cancel).await;
        if let Err(err) = &outcome {
            keno_warn!("Run failed: {}", err);
            if let Some(reason) = err.failure_reason() {
                self.dispatch(Msg::RunFailed(reason));
            }
        }
        drop(guard);

        outcome.map(|()| self.current_state())
    }

    async fn consume(&self, cancel: &CancellationToken) -> Result<(), RunError> {
        let mut body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RunError::Cancelled),
            triggered = self.client.trigger() => triggered.map_err(RunError::Request)?,
        };

        let mut decoder = StreamDecoder::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RunError::Cancelled),
                next = body.next() => next,
            };
            let chunk = match next {
                Some(chunk) => chunk.map_err(RunError::Transport)?,
                None => break,
            };

            for event in decoder.push_chunk(&chunk) {
                self.dispatch(Msg::Stream(event));
            }
            if self.phase().is_terminal() {
                keno_debug!(
                    "Run is terminal, closing body with {} byte(s) unread in buffer",
                    decoder.buffered_len()
                );
                return Ok(());
            }
        }

        for event in decoder.finish() {
            self.dispatch(Msg::Stream(event));
        }
        self.dispatch(Msg::StreamEnded);
        if self.lock().failure() == Some(FailureReason::Incomplete) {
            keno_warn!("Upstream closed the stream before signalling completion");
        }
        Ok(())
    }

    fn begin(&self) -> Result<(), RunError> {
        let (snapshot, effects) = {
            let mut state = self.lock();
            if state.phase() == Phase::Running {
                keno_warn!("Rejecting start: a run is already in progress");
                return Err(RunError::AlreadyRunning);
            }
            self.apply(&mut state, Msg::RunStarted)
        };
        keno_info!("Run started");
        self.publish(snapshot, effects);
        Ok(())
    }

    fn dispatch(&self, msg: Msg) {
        let (snapshot, effects) = {
            let mut state = self.lock();
            self.apply(&mut state, msg)
        };
        self.publish(snapshot, effects);
    }

    fn apply(&self, slot: &mut RunState, msg: Msg) -> (Option<RunSnapshot>, Vec<Effect>) {
        let state = std::mem::take(slot);
        let (mut state, effects) = update(state, msg);
        let changed = state.consume_dirty();
        let snapshot = (changed && !self.observers.is_empty()).then(|| state.view());
        *slot = state;
        (snapshot, effects)
    }

    fn publish(&self, snapshot: Option<RunSnapshot>, effects: Vec<Effect>) {
        if let Some(snapshot) = snapshot {
            for observer in &self.observers {
                observer.on_snapshot(&snapshot);
            }
        }
        for effect in effects {
            match effect {
                Effect::Notify(notification) => {
                    let (title, description) = (notification.title(), notification.description());
                    if notification.is_error() {
                        keno_warn!("{}: {}", title, description);
                    } else {
                        keno_info!("{}: {}", title, description);
                    }
                    for observer in &self.observers {
                        observer.on_notification(&notification);
                    }
                }
            }
        }
    }

    fn phase(&self) -> Phase {
        self.lock().phase()
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Finalizes a run whose `start` future is dropped before it returns.
struct RunGuard<'a> {
    accumulator: &'a RunAccumulator,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        // No-op when the run already reached a terminal phase.
        self.accumulator
            .dispatch(Msg::RunFailed(FailureReason::Cancelled));
    }
}
