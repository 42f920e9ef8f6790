use std::fmt;

use crate::view_model::RunSnapshot;
use crate::DrawResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

/// Why a run ended in `Phase::Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The trigger call was rejected or never got a response.
    Request,
    /// The body stream errored mid-read.
    Transport,
    /// The caller cancelled the run.
    Cancelled,
    /// Upstream closed the body without a completion marker.
    Incomplete,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Request => write!(f, "trigger request failed"),
            FailureReason::Transport => write!(f, "stream transport failed"),
            FailureReason::Cancelled => write!(f, "cancelled"),
            FailureReason::Incomplete => write!(f, "stream ended before completion"),
        }
    }
}

/// State of one run. Only `update` mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunState {
    phase: Phase,
    progress: u32,
    results: Vec<DrawResult>,
    reported_total: Option<u64>,
    failure: Option<FailureReason>,
    dirty: bool,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn results(&self) -> &[DrawResult] {
        &self.results
    }

    pub fn reported_total(&self) -> Option<u64> {
        self.reported_total
    }

    pub fn failure(&self) -> Option<FailureReason> {
        self.failure
    }

    pub fn view(&self) -> RunSnapshot {
        RunSnapshot {
            phase: self.phase,
            progress: self.progress,
            results: self.results.clone(),
            reported_total: self.reported_total,
            failure: self.failure,
        }
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn begin_run(&mut self) {
        self.phase = Phase::Running;
        self.progress = 0;
        self.results.clear();
        self.reported_total = None;
        self.failure = None;
        self.dirty = true;
    }

    pub(crate) fn set_progress(&mut self, percent: u32) {
        self.progress = percent;
        self.dirty = true;
    }

    pub(crate) fn push_result(&mut self, value: DrawResult) {
        self.results.push(value);
        self.dirty = true;
    }

    pub(crate) fn complete(&mut self, total: Option<u64>) {
        self.phase = Phase::Completed;
        self.reported_total = total;
        self.dirty = true;
    }

    pub(crate) fn fail(&mut self, reason: FailureReason) {
        self.phase = Phase::Failed;
        self.failure = Some(reason);
        self.dirty = true;
    }
}
