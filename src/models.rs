use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const PLACEHOLDER_STUDENT_NAME: &str = "Unnamed Student";

pub fn placeholder_email(student_id: &str) -> String {
    format!("{student_id}@pending.invalid")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentStatus {
    OnTrack,
    NeedsIntervention,
    Remedial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterventionStatus {
    PendingMentor,
    Assigned,
    Resolved,
}

impl StudentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StudentStatus::OnTrack => "ON_TRACK",
            StudentStatus::NeedsIntervention => "NEEDS_INTERVENTION",
            StudentStatus::Remedial => "REMEDIAL",
        }
    }
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Pass => "PASS",
            Outcome::Fail => "FAIL",
        }
    }
}

impl InterventionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InterventionStatus::PendingMentor => "PENDING_MENTOR",
            InterventionStatus::Assigned => "ASSIGNED",
            InterventionStatus::Resolved => "RESOLVED",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

macro_rules! text_enum {
    ($ty:ident, $kind:literal, [$($variant:ident),+]) => {
        impl FromStr for $ty {
            type Err = ParseStatusError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                $(
                    if value == $ty::$variant.as_str() {
                        return Ok($ty::$variant);
                    }
                )+
                Err(ParseStatusError {
                    kind: $kind,
                    value: value.to_string(),
                })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(StudentStatus, "student status", [OnTrack, NeedsIntervention, Remedial]);
text_enum!(Outcome, "outcome", [Pass, Fail]);
text_enum!(InterventionStatus, "intervention status", [PendingMentor, Assigned, Resolved]);

#[derive(Debug, Clone, Serialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub email: String,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyLog {
    pub id: Uuid,
    pub student_id: String,
    pub quiz_score: i32,
    pub focus_minutes: i32,
    pub outcome: Outcome,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Intervention {
    pub id: Uuid,
    pub student_id: String,
    pub daily_log_id: Uuid,
    pub status: InterventionStatus,
    pub task: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated check-in ready to be written, with the verdict already computed.
#[derive(Debug, Clone)]
pub struct NewCheckIn {
    pub student_id: String,
    pub quiz_score: i32,
    pub focus_minutes: i32,
    pub outcome: Outcome,
    pub student_status: StudentStatus,
}

/// Everything one check-in wrote.
#[derive(Debug, Clone)]
pub struct CheckInRecord {
    pub student: Student,
    pub daily_log: DailyLog,
    pub intervention: Option<Intervention>,
}

/// Guarded bulk move of a student's interventions from one status to another.
///
/// Only rows currently in `from` are touched. When `intervention_id` is set the
/// update is narrowed to that row; otherwise every matching row for the student
/// moves at once. The student's status is written only if at least one row moved.
#[derive(Debug, Clone)]
pub struct InterventionChange {
    pub student_id: String,
    pub intervention_id: Option<Uuid>,
    pub from: InterventionStatus,
    pub to: InterventionStatus,
    pub task: Option<String>,
    pub student_status: StudentStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentDetail {
    #[serde(flatten)]
    pub student: Student,
    pub interventions: Vec<Intervention>,
}
