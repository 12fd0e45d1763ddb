#![forbid(unsafe_code)]

pub mod auth_service;
pub mod error;
pub mod sessions;
pub mod ticker;

pub use exam_core::Clock;
pub use sessions as session;

pub use auth_service::AuthService;
pub use error::{AuthError, SessionError};

pub use sessions::{
    ExamLoopService, ExamPhase, ExamSession, QuestionView, SelectOutcome, SessionView, TickStatus,
    format_hms,
};
pub use ticker::{TICK_PERIOD, Tick, Ticker};
