mod host;
mod registry;
mod view;
mod workflow;

// Public API of the round subsystem.
pub use host::RoundHost;
pub use registry::HostRegistry;
pub use view::{OptionView, QuestionView, RoundSnapshot, ScoreRow};
pub use workflow::RoundLoopService;
