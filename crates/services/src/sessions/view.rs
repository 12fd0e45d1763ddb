use chrono::{DateTime, Utc};

use exam_core::model::{QuestionId, QuestionStatus, Subject};

use super::engine::{ExamPhase, ExamSession};

/// Palette entry for one question.
///
/// Presentation-agnostic: no pre-formatted strings beyond the clock, no
/// layout assumptions. The UI decides how to render statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub index: usize,
    pub id: QuestionId,
    pub subject: Subject,
    pub status: QuestionStatus,
    pub is_placeholder: bool,
}

/// Read-only snapshot of a sitting for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub roll: String,
    pub phase: ExamPhase,
    pub current_index: usize,
    pub time_left_seconds: i64,
    pub time_left: String,
    pub answered: usize,
    pub marked: usize,
    pub unanswered: usize,
    pub questions: Vec<QuestionView>,
}

impl SessionView {
    #[must_use]
    pub fn snapshot(session: &ExamSession, now: DateTime<Utc>) -> Self {
        let state = session.state();
        let questions: Vec<QuestionView> = session
            .bank()
            .iter()
            .enumerate()
            .map(|(index, q)| QuestionView {
                index,
                id: q.id(),
                subject: q.subject(),
                status: state.status(q.id()),
                is_placeholder: q.is_placeholder(),
            })
            .collect();

        let answered = state.answered_count();
        let time_left_seconds = state.time_left_seconds(now);

        Self {
            roll: state.roll().as_str().to_owned(),
            phase: session.phase(),
            current_index: state.current_index(),
            time_left_seconds,
            time_left: format_hms(time_left_seconds),
            answered,
            marked: state.marked_count(),
            unanswered: questions.len() - answered,
            questions,
        }
    }
}

/// Remaining time as `HH:MM:SS`; negative inputs clamp to `00:00:00`.
#[must_use]
pub fn format_hms(total_seconds: i64) -> String {
    let total = total_seconds.max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{
        OptionIndex, QuestionBank, QuestionRecord, RollNumber,
    };
    use exam_core::time::fixed_now;
    use std::sync::Arc;

    #[test]
    fn formats_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(61), "00:01:01");
        assert_eq!(format_hms(3 * 60 * 60), "03:00:00");
        assert_eq!(format_hms(2 * 3600 + 59 * 60 + 59), "02:59:59");
        assert_eq!(format_hms(-5), "00:00:00");
    }

    #[test]
    fn snapshot_reports_statuses_and_counts() {
        let bank = Arc::new(
            QuestionBank::new(vec![
                QuestionRecord::new(
                    QuestionId::new(1),
                    Subject::Physics,
                    "Q1",
                    ["a", "b", "c", "d"].map(str::to_owned),
                ),
                QuestionRecord::new(
                    QuestionId::new(2),
                    Subject::Biology,
                    "Q2",
                    ["a", "b", "c", "d"].map(str::to_owned),
                ),
                QuestionRecord::new(
                    QuestionId::new(3),
                    Subject::Biology,
                    "",
                    ["", "", "", ""].map(str::to_owned),
                ),
            ])
            .unwrap(),
        );
        let mut session = ExamSession::begin(
            bank,
            RollNumber::new("ROLL001").unwrap(),
            fixed_now(),
        );
        session
            .select_option(QuestionId::new(1), OptionIndex::new(2).unwrap(), fixed_now())
            .unwrap();
        session.toggle_review(QuestionId::new(2)).unwrap();

        let view = SessionView::snapshot(&session, fixed_now());

        assert_eq!(view.roll, "ROLL001");
        assert_eq!(view.phase, ExamPhase::InProgress);
        assert_eq!(view.answered, 1);
        assert_eq!(view.marked, 1);
        assert_eq!(view.unanswered, 2);
        assert_eq!(view.time_left, "03:00:00");
        assert_eq!(view.questions.len(), 3);
        assert_eq!(view.questions[0].status, QuestionStatus::Answered);
        assert_eq!(view.questions[1].status, QuestionStatus::Marked);
        assert_eq!(view.questions[2].status, QuestionStatus::Unanswered);
        assert!(view.questions[2].is_placeholder);
    }
}
