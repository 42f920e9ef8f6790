use serde::{Deserialize, Serialize};

/// One extracted draw. Field order matches the wire and export layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawResult {
    pub draw_number: u64,
    /// Passed through as received; never parsed.
    pub date: String,
    pub numbers: Vec<i64>,
}

/// A decoded unit of the job stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Percent of the job done. Not clamped or checked for monotonicity.
    Progress { percent: u32 },
    /// One extracted record, in arrival order.
    Result { value: DrawResult },
    /// Terminal marker. `total` is what upstream claims it produced.
    Complete { total: Option<u64> },
}
