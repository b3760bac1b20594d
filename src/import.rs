use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::error::WorkflowError;
use crate::models::Outcome;
use crate::workflow::{CheckInInput, Workflow};

/// Ids stay text here so values like `007` are not read back as numbers.
#[derive(Debug, Deserialize)]
struct CsvRow {
    student_id: Option<String>,
    quiz_score: Option<i32>,
    focus_minutes: Option<i32>,
}

impl From<CsvRow> for CheckInInput {
    fn from(row: CsvRow) -> Self {
        CheckInInput {
            student_id: row.student_id,
            quiz_score: row.quiz_score,
            focus_minutes: row.focus_minutes,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Replay `student_id,quiz_score,focus_minutes` rows through the check-in workflow.
///
/// Rows missing a field are skipped; store failures abort the import with the
/// rows before them already applied.
pub async fn import_csv(workflow: &Workflow, csv_path: &Path) -> anyhow::Result<ImportSummary> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut summary = ImportSummary::default();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid row {}", index + 1))?;

        match workflow.record_check_in(row.into()).await {
            Ok(record) => match record.daily_log.outcome {
                Outcome::Pass => summary.passed += 1,
                Outcome::Fail => summary.failed += 1,
            },
            Err(WorkflowError::Validation(message)) => {
                tracing::warn!(row = index + 1, %message, "skipping check-in row");
                summary.skipped += 1;
            }
            Err(WorkflowError::Internal(err)) => {
                return Err(err.context(format!("row {} could not be recorded", index + 1)));
            }
        }
    }

    Ok(summary)
}
