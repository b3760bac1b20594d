use async_trait::async_trait;

use crate::models::{CheckInRecord, Intervention, InterventionChange, NewCheckIn, Student};

/// Persistence seam for the intervention workflow.
///
/// Each write method is one transactional unit: either every row it touches is
/// written or none are.
#[async_trait]
pub trait Store: Send + Sync {
    /// Provision the student if unknown, append the daily log, set the student's
    /// status and open an intervention when the outcome failed.
    async fn record_check_in(&self, entry: &NewCheckIn) -> anyhow::Result<CheckInRecord>;

    /// Apply a guarded intervention move and return the rows that moved.
    async fn transition_interventions(
        &self,
        change: &InterventionChange,
    ) -> anyhow::Result<Vec<Intervention>>;

    async fn fetch_student(&self, student_id: &str) -> anyhow::Result<Option<Student>>;

    /// All interventions for a student, newest first.
    async fn fetch_interventions(&self, student_id: &str) -> anyhow::Result<Vec<Intervention>>;
}
