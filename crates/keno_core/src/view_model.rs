use crate::{DrawResult, FailureReason, Phase};

/// Number of leading results shown in the result table.
pub const PREVIEW_LIMIT: usize = 50;

/// Immutable copy of a run's state, handed to observers and exporters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSnapshot {
    pub phase: Phase,
    pub progress: u32,
    pub results: Vec<DrawResult>,
    pub reported_total: Option<u64>,
    pub failure: Option<FailureReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preview<'a> {
    pub rows: &'a [DrawResult],
    /// Results beyond the preview window; only reachable through export.
    pub hidden: usize,
}

impl RunSnapshot {
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Export is only offered once at least one result has arrived.
    pub fn exportable(&self) -> bool {
        !self.results.is_empty()
    }

    pub fn preview(&self) -> Preview<'_> {
        let shown = self.results.len().min(PREVIEW_LIMIT);
        Preview {
            rows: &self.results[..shown],
            hidden: self.results.len() - shown,
        }
    }
}
