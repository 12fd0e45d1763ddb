mod bank;
mod ids;
mod question;
mod roll;
mod session;

pub use bank::{BankError, QuestionBank};
pub use ids::{ParseIdError, QuestionId};
pub use question::{OPTION_COUNT, OptionIndex, QuestionError, QuestionRecord, Subject};
pub use roll::{RollError, RollNumber};
pub use session::{
    EXAM_DURATION_SECS, QuestionStatus, SessionState, SubmissionSummary, SubmissionSummaryError,
    exam_duration,
};
