mod engine;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use engine::{ExamPhase, ExamSession, SelectOutcome, TickStatus};
pub use view::{QuestionView, SessionView, format_hms};
pub use workflow::ExamLoopService;
