use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::models::{
    placeholder_email, CheckInRecord, DailyLog, Intervention, InterventionChange,
    InterventionStatus, NewCheckIn, Outcome, Student, StudentStatus, PLACEHOLDER_STUDENT_NAME,
};
use crate::store::Store;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let students = vec![
        ("gs-1001", "Avery Lee", "avery.lee@groupscholar.com"),
        ("gs-1002", "Jules Moreno", "jules.moreno@groupscholar.com"),
        ("gs-1003", "Kiara Patel", "kiara.patel@groupscholar.com"),
        ("gs-1004", "Noah Okafor", "noah.okafor@groupscholar.com"),
    ];

    let mut upserted = 0usize;
    for (id, name, email) in students {
        let result = sqlx::query(
            r#"
            INSERT INTO student_checkins.students (id, name, email, status)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, email = EXCLUDED.email
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(StudentStatus::OnTrack.as_str())
        .execute(pool)
        .await?;
        upserted += result.rows_affected() as usize;
    }

    Ok(upserted)
}

/// Postgres-backed workflow store. Every write method runs in its own transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INTERVENTION_COLUMNS: &str =
    "id, student_id, daily_log_id, status, task, created_at, updated_at";

fn student_from_row(row: &PgRow) -> anyhow::Result<Student> {
    let status: String = row.try_get("status")?;
    Ok(Student {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        status: status.parse()?,
        created_at: row.try_get("created_at")?,
    })
}

fn daily_log_from_row(row: &PgRow) -> anyhow::Result<DailyLog> {
    let outcome: String = row.try_get("outcome")?;
    Ok(DailyLog {
        id: row.try_get("id")?,
        student_id: row.try_get("student_id")?,
        quiz_score: row.try_get("quiz_score")?,
        focus_minutes: row.try_get("focus_minutes")?,
        outcome: outcome.parse::<Outcome>()?,
        logged_at: row.try_get("logged_at")?,
    })
}

fn intervention_from_row(row: &PgRow) -> anyhow::Result<Intervention> {
    let status: String = row.try_get("status")?;
    Ok(Intervention {
        id: row.try_get("id")?,
        student_id: row.try_get("student_id")?,
        daily_log_id: row.try_get("daily_log_id")?,
        status: status.parse::<InterventionStatus>()?,
        task: row.try_get("task")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn set_student_status(
    tx: &mut Transaction<'_, Postgres>,
    student_id: &str,
    status: StudentStatus,
) -> anyhow::Result<Option<Student>> {
    let row = sqlx::query(
        r#"
        UPDATE student_checkins.students
        SET status = $2
        WHERE id = $1
        RETURNING id, name, email, status, created_at
        "#,
    )
    .bind(student_id)
    .bind(status.as_str())
    .fetch_optional(&mut **tx)
    .await?;

    row.as_ref().map(student_from_row).transpose()
}

#[async_trait]
impl Store for PgStore {
    async fn record_check_in(&self, entry: &NewCheckIn) -> anyhow::Result<CheckInRecord> {
        let mut tx = self.pool.begin().await.context("failed to open transaction")?;

        sqlx::query(
            r#"
            INSERT INTO student_checkins.students (id, name, email, status)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&entry.student_id)
        .bind(PLACEHOLDER_STUDENT_NAME)
        .bind(placeholder_email(&entry.student_id))
        .bind(StudentStatus::OnTrack.as_str())
        .execute(&mut *tx)
        .await
        .context("failed to provision student")?;

        let log_row = sqlx::query(
            r#"
            INSERT INTO student_checkins.daily_logs
            (id, student_id, quiz_score, focus_minutes, outcome)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, student_id, quiz_score, focus_minutes, outcome, logged_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&entry.student_id)
        .bind(entry.quiz_score)
        .bind(entry.focus_minutes)
        .bind(entry.outcome.as_str())
        .fetch_one(&mut *tx)
        .await
        .context("failed to append daily log")?;
        let daily_log = daily_log_from_row(&log_row)?;

        let student = set_student_status(&mut tx, &entry.student_id, entry.student_status)
            .await?
            .context("student row vanished during check-in")?;

        let intervention = if entry.outcome == Outcome::Fail {
            let row = sqlx::query(&format!(
                r#"
                INSERT INTO student_checkins.interventions
                (id, student_id, daily_log_id, status)
                VALUES ($1, $2, $3, $4)
                RETURNING {INTERVENTION_COLUMNS}
                "#
            ))
            .bind(Uuid::new_v4())
            .bind(&entry.student_id)
            .bind(daily_log.id)
            .bind(InterventionStatus::PendingMentor.as_str())
            .fetch_one(&mut *tx)
            .await
            .context("failed to open intervention")?;
            Some(intervention_from_row(&row)?)
        } else {
            None
        };

        tx.commit().await.context("failed to commit check-in")?;

        Ok(CheckInRecord {
            student,
            daily_log,
            intervention,
        })
    }

    async fn transition_interventions(
        &self,
        change: &InterventionChange,
    ) -> anyhow::Result<Vec<Intervention>> {
        let mut tx = self.pool.begin().await.context("failed to open transaction")?;

        let rows = sqlx::query(&format!(
            r#"
            UPDATE student_checkins.interventions
            SET status = $3, task = COALESCE($5::text, task), updated_at = now()
            WHERE student_id = $1
              AND status = $2
              AND ($4::uuid IS NULL OR id = $4)
            RETURNING {INTERVENTION_COLUMNS}
            "#
        ))
        .bind(&change.student_id)
        .bind(change.from.as_str())
        .bind(change.to.as_str())
        .bind(change.intervention_id)
        .bind(change.task.as_deref())
        .fetch_all(&mut *tx)
        .await
        .context("failed to update interventions")?;

        let moved = rows
            .iter()
            .map(intervention_from_row)
            .collect::<anyhow::Result<Vec<_>>>()?;

        if !moved.is_empty() {
            set_student_status(&mut tx, &change.student_id, change.student_status).await?;
        }

        tx.commit().await.context("failed to commit intervention change")?;
        Ok(moved)
    }

    async fn fetch_student(&self, student_id: &str) -> anyhow::Result<Option<Student>> {
        let row = sqlx::query(
            "SELECT id, name, email, status, created_at FROM student_checkins.students WHERE id = $1",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(student_from_row).transpose()
    }

    async fn fetch_interventions(&self, student_id: &str) -> anyhow::Result<Vec<Intervention>> {
        let rows = sqlx::query(&format!(
            "SELECT {INTERVENTION_COLUMNS} FROM student_checkins.interventions \
             WHERE student_id = $1 ORDER BY created_at DESC"
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(intervention_from_row).collect()
    }
}
