//! Reply-assist core: the pure detection scheduler state machine.
mod config;
mod effect;
mod msg;
mod state;
mod summary;
mod update;

pub use config::SchedulerConfig;
pub use effect::{Effect, TimerKind};
pub use msg::Msg;
pub use state::{Phase, SchedulerState, SchedulerView};
pub use summary::{PageMode, PassOrigin, PassSummary};
pub use update::update;
