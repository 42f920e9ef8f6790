//! Keno core: pure run state machine and snapshot helpers.
mod effect;
mod event;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, Notification};
pub use event::{DrawResult, StreamEvent};
pub use msg::Msg;
pub use state::{FailureReason, Phase, RunState};
pub use update::update;
pub use view_model::{Preview, RunSnapshot, PREVIEW_LIMIT};
