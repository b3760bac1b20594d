use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{
    WorkflowError, INTERVENTION_NOT_FOUND, NO_ACTIVE_INTERVENTION, NO_PENDING_INTERVENTION,
};
use crate::evaluate::{evaluate_outcome, WorkflowEvent};
use crate::models::{
    CheckInRecord, Intervention, InterventionChange, NewCheckIn, StudentDetail,
    PLACEHOLDER_STUDENT_NAME,
};
use crate::notify::{InterventionNotice, Notifier};
use crate::store::Store;

/// One day's submission as received; every field is optional until validated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckInInput {
    #[serde(default, deserialize_with = "deserialize_student_id")]
    pub student_id: Option<String>,
    pub quiz_score: Option<i32>,
    pub focus_minutes: Option<i32>,
}

/// Intervention workflow engine: validates input, applies transitions through the
/// store and hands notifications to a background task.
#[derive(Clone)]
pub struct Workflow {
    store: Arc<dyn Store>,
    notifier: Option<Arc<dyn Notifier>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStudentId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

/// Student ids are opaque: callers may send them as strings or integers.
pub fn deserialize_student_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<RawStudentId>::deserialize(deserializer)?.map(|raw| match raw {
            RawStudentId::Text(id) => id,
            RawStudentId::Signed(id) => id.to_string(),
            RawStudentId::Unsigned(id) => id.to_string(),
        }),
    )
}

/// Identifiers are taken verbatim; only an empty value counts as missing.
fn required<'a>(value: Option<&'a str>) -> Result<&'a str, WorkflowError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(WorkflowError::missing_fields()),
    }
}

fn required_text<'a>(value: Option<&'a str>) -> Result<&'a str, WorkflowError> {
    required(value.map(str::trim))
}

impl Workflow {
    pub fn new(store: Arc<dyn Store>, notifier: Option<Arc<dyn Notifier>>) -> Self {
        Self { store, notifier }
    }

    pub async fn record_check_in(
        &self,
        input: CheckInInput,
    ) -> Result<CheckInRecord, WorkflowError> {
        let student_id = required(input.student_id.as_deref())?.to_string();
        let (Some(quiz_score), Some(focus_minutes)) = (input.quiz_score, input.focus_minutes)
        else {
            return Err(WorkflowError::missing_fields());
        };

        let outcome = evaluate_outcome(quiz_score, focus_minutes);
        let entry = NewCheckIn {
            student_id,
            quiz_score,
            focus_minutes,
            outcome,
            student_status: WorkflowEvent::from_outcome(outcome).student_status(),
        };

        let record = self.store.record_check_in(&entry).await?;
        info!(
            student_id = %record.student.id,
            daily_log_id = %record.daily_log.id,
            outcome = %outcome,
            "check-in recorded"
        );

        if let Some(intervention) = &record.intervention {
            info!(
                student_id = %record.student.id,
                intervention_id = %intervention.id,
                "intervention opened"
            );
            self.dispatch(InterventionNotice {
                student_id: record.student.id.clone(),
                student_name: (record.student.name != PLACEHOLDER_STUDENT_NAME)
                    .then(|| record.student.name.clone()),
                daily_log_id: record.daily_log.id,
                intervention_id: intervention.id,
                quiz_score,
                focus_minutes,
            });
        }

        Ok(record)
    }

    /// Approve one specific pending intervention.
    pub async fn assign_by_approval(
        &self,
        student_id: Option<&str>,
        intervention_id: Option<&str>,
    ) -> Result<Intervention, WorkflowError> {
        let student_id = required(student_id)?;
        let intervention_id = required(intervention_id)?;
        let Ok(intervention_id) = Uuid::parse_str(intervention_id) else {
            return Err(WorkflowError::validation(INTERVENTION_NOT_FOUND));
        };

        let moved = self
            .apply(student_id, WorkflowEvent::InterventionAssigned, Some(intervention_id), None)
            .await?;

        moved
            .into_iter()
            .next()
            .ok_or_else(|| WorkflowError::validation(INTERVENTION_NOT_FOUND))
    }

    /// Attach `task` to every pending intervention of the student.
    pub async fn assign_by_task(
        &self,
        student_id: Option<&str>,
        task: Option<&str>,
    ) -> Result<Vec<Intervention>, WorkflowError> {
        let student_id = required(student_id)?;
        let task = required_text(task)?;

        let moved = self
            .apply(
                student_id,
                WorkflowEvent::InterventionAssigned,
                None,
                Some(task.to_string()),
            )
            .await?;

        if moved.is_empty() {
            return Err(WorkflowError::validation(NO_PENDING_INTERVENTION));
        }
        Ok(moved)
    }

    /// Resolve every assigned intervention of the student in one step.
    pub async fn complete_intervention(
        &self,
        student_id: Option<&str>,
    ) -> Result<Vec<Intervention>, WorkflowError> {
        let student_id = required(student_id)?;

        let moved = self
            .apply(student_id, WorkflowEvent::InterventionCompleted, None, None)
            .await?;

        if moved.is_empty() {
            return Err(WorkflowError::validation(NO_ACTIVE_INTERVENTION));
        }
        Ok(moved)
    }

    pub async fn student_detail(
        &self,
        student_id: &str,
    ) -> Result<Option<StudentDetail>, WorkflowError> {
        let Some(student) = self.store.fetch_student(student_id).await? else {
            return Ok(None);
        };
        let interventions = self.store.fetch_interventions(student_id).await?;
        Ok(Some(StudentDetail {
            student,
            interventions,
        }))
    }

    async fn apply(
        &self,
        student_id: &str,
        event: WorkflowEvent,
        intervention_id: Option<Uuid>,
        task: Option<String>,
    ) -> Result<Vec<Intervention>, WorkflowError> {
        let Some((from, to)) = event.intervention_transition() else {
            return Ok(Vec::new());
        };

        let change = InterventionChange {
            student_id: student_id.to_string(),
            intervention_id,
            from,
            to,
            task,
            student_status: event.student_status(),
        };
        let moved = self.store.transition_interventions(&change).await?;

        if !moved.is_empty() {
            info!(
                student_id,
                from = %from,
                to = %to,
                count = moved.len(),
                student_status = %change.student_status,
                "interventions moved"
            );
        }
        Ok(moved)
    }

    fn dispatch(&self, notice: InterventionNotice) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };

        tokio::spawn(async move {
            match notifier.send(&notice).await {
                Ok(()) => debug!(intervention_id = %notice.intervention_id, "notifier accepted notice"),
                Err(err) => warn!(
                    intervention_id = %notice.intervention_id,
                    error = %format!("{err:#}"),
                    "intervention notification failed"
                ),
            }
        });
    }
}
