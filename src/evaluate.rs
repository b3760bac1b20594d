use crate::models::{InterventionStatus, Outcome, StudentStatus};

pub const QUIZ_SCORE_THRESHOLD: i32 = 7;
pub const FOCUS_MINUTES_THRESHOLD: i32 = 60;

/// A check-in passes only when both dimensions clear their bar.
pub fn evaluate_outcome(quiz_score: i32, focus_minutes: i32) -> Outcome {
    if quiz_score > QUIZ_SCORE_THRESHOLD && focus_minutes > FOCUS_MINUTES_THRESHOLD {
        Outcome::Pass
    } else {
        Outcome::Fail
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowEvent {
    CheckInPassed,
    CheckInFailed,
    InterventionAssigned,
    InterventionCompleted,
}

impl WorkflowEvent {
    pub fn from_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Pass => WorkflowEvent::CheckInPassed,
            Outcome::Fail => WorkflowEvent::CheckInFailed,
        }
    }

    /// Student status after this event. The previous status is never consulted:
    /// whichever event ran last wins.
    pub fn student_status(self) -> StudentStatus {
        match self {
            WorkflowEvent::CheckInPassed => StudentStatus::OnTrack,
            WorkflowEvent::CheckInFailed => StudentStatus::NeedsIntervention,
            WorkflowEvent::InterventionAssigned => StudentStatus::Remedial,
            WorkflowEvent::InterventionCompleted => StudentStatus::OnTrack,
        }
    }

    /// The `(from, to)` intervention move this event performs, if any.
    pub fn intervention_transition(self) -> Option<(InterventionStatus, InterventionStatus)> {
        match self {
            WorkflowEvent::InterventionAssigned => {
                Some((InterventionStatus::PendingMentor, InterventionStatus::Assigned))
            }
            WorkflowEvent::InterventionCompleted => {
                Some((InterventionStatus::Assigned, InterventionStatus::Resolved))
            }
            WorkflowEvent::CheckInPassed | WorkflowEvent::CheckInFailed => None,
        }
    }
}

pub fn check_in_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Pass => "On Track",
        Outcome::Fail => "Pending Mentor Review",
    }
}
