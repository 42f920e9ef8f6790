#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A new run is about to issue its trigger call.
    RunStarted,
    /// One event decoded from the response body.
    Stream(crate::StreamEvent),
    /// Upstream closed the body and the decoder has been flushed.
    StreamEnded,
    /// The trigger call or the body transport failed, or the run was cancelled.
    RunFailed(crate::FailureReason),
}
