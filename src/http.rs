use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::error::WorkflowError;
use crate::evaluate::check_in_label;
use crate::workflow::{deserialize_student_id, CheckInInput, Workflow};

pub const ASSIGNED_CONFIRMATION: &str = "Intervention assigned. Student moved to remedial plan.";

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct AssignQuery {
    pub student_id: Option<String>,
    pub intervention_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignTaskRequest {
    #[serde(default, deserialize_with = "deserialize_student_id")]
    pub student_id: Option<String>,
    pub task: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    #[serde(default, deserialize_with = "deserialize_student_id")]
    pub student_id: Option<String>,
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        match self {
            WorkflowError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response()
            }
            WorkflowError::Internal(err) => {
                error!(error = %format!("{err:#}"), "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Internal error".into(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

/// Create the HTTP router with all routes configured
pub fn create_router(workflow: Workflow) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/daily-checkin", post(daily_check_in))
        .route(
            "/assign-intervention",
            get(assign_by_approval).post(assign_by_task),
        )
        .route("/complete-intervention", post(complete_intervention))
        .route("/students/:id", get(student_detail))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(workflow)
}

/// GET /
async fn health() -> Json<Value> {
    Json(json!({ "message": "Backend Running..." }))
}

/// POST /daily-checkin
async fn daily_check_in(
    State(workflow): State<Workflow>,
    payload: Result<Json<CheckInInput>, JsonRejection>,
) -> Result<Json<StatusResponse>, WorkflowError> {
    let Json(input) = payload.map_err(|_| WorkflowError::missing_fields())?;
    let record = workflow.record_check_in(input).await?;
    Ok(Json(StatusResponse {
        status: check_in_label(record.daily_log.outcome),
    }))
}

/// GET /assign-intervention?student_id=..&intervention_id=..
async fn assign_by_approval(
    State(workflow): State<Workflow>,
    query: Result<Query<AssignQuery>, QueryRejection>,
) -> Result<&'static str, WorkflowError> {
    let Query(query) = query.map_err(|_| WorkflowError::missing_fields())?;
    workflow
        .assign_by_approval(query.student_id.as_deref(), query.intervention_id.as_deref())
        .await?;
    Ok(ASSIGNED_CONFIRMATION)
}

/// POST /assign-intervention
async fn assign_by_task(
    State(workflow): State<Workflow>,
    payload: Result<Json<AssignTaskRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, WorkflowError> {
    let Json(request) = payload.map_err(|_| WorkflowError::missing_fields())?;
    workflow
        .assign_by_task(request.student_id.as_deref(), request.task.as_deref())
        .await?;
    Ok(Json(StatusResponse {
        status: "Task Assigned",
    }))
}

/// POST /complete-intervention
async fn complete_intervention(
    State(workflow): State<Workflow>,
    payload: Result<Json<CompleteRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, WorkflowError> {
    let Json(request) = payload.map_err(|_| WorkflowError::missing_fields())?;
    workflow
        .complete_intervention(request.student_id.as_deref())
        .await?;
    Ok(Json(StatusResponse {
        status: "Unlocked. Back on Track!",
    }))
}

/// GET /students/:id
async fn student_detail(
    State(workflow): State<Workflow>,
    Path(student_id): Path<String>,
) -> Result<Response, WorkflowError> {
    match workflow.student_detail(&student_id).await? {
        Some(detail) => Ok(Json(detail).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Student not found".into(),
            }),
        )
            .into_response()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::memory::{MemoryStore, UnavailableStore};
    use axum_test::TestServer;

    fn server() -> TestServer {
        let workflow = Workflow::new(Arc::new(MemoryStore::new()), None);
        TestServer::new(create_router(workflow)).unwrap()
    }

    async fn first_intervention_id(server: &TestServer, student_id: &str) -> String {
        let detail: Value = server.get(&format!("/students/{student_id}")).await.json();
        detail["interventions"][0]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = server().get("/").await;
        response.assert_status_ok();
        response.assert_json(&json!({ "message": "Backend Running..." }));
    }

    #[tokio::test]
    async fn test_passing_check_in_reports_on_track() {
        let server = server();

        let response = server
            .post("/daily-checkin")
            .json(&json!({ "student_id": "s1", "quiz_score": 9, "focus_minutes": 70 }))
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({ "status": "On Track" }));

        let detail: Value = server.get("/students/s1").await.json();
        assert_eq!(detail["status"], "ON_TRACK");
        assert_eq!(detail["interventions"], json!([]));
    }

    #[tokio::test]
    async fn test_failing_check_in_then_assign_and_complete() {
        let server = server();

        let response = server
            .post("/daily-checkin")
            .json(&json!({ "student_id": "s2", "quiz_score": 5, "focus_minutes": 30 }))
            .await;
        response.assert_json(&json!({ "status": "Pending Mentor Review" }));

        let detail: Value = server.get("/students/s2").await.json();
        assert_eq!(detail["status"], "NEEDS_INTERVENTION");
        assert_eq!(detail["interventions"].as_array().unwrap().len(), 1);
        assert_eq!(detail["interventions"][0]["status"], "PENDING_MENTOR");

        let intervention_id = first_intervention_id(&server, "s2").await;
        let response = server
            .get("/assign-intervention")
            .add_query_param("student_id", "s2")
            .add_query_param("intervention_id", &intervention_id)
            .await;
        response.assert_status_ok();
        response.assert_text(ASSIGNED_CONFIRMATION);

        let detail: Value = server.get("/students/s2").await.json();
        assert_eq!(detail["status"], "REMEDIAL");

        let response = server
            .post("/complete-intervention")
            .json(&json!({ "student_id": "s2" }))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "status": "Unlocked. Back on Track!" }));

        let detail: Value = server.get("/students/s2").await.json();
        assert_eq!(detail["status"], "ON_TRACK");
        assert_eq!(detail["interventions"][0]["status"], "RESOLVED");
    }

    #[tokio::test]
    async fn test_numeric_student_id_is_accepted() {
        let server = server();

        let response = server
            .post("/daily-checkin")
            .json(&json!({ "student_id": 42, "quiz_score": 5, "focus_minutes": 30 }))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "status": "Pending Mentor Review" }));

        let response = server
            .post("/assign-intervention")
            .json(&json!({ "student_id": 42, "task": "Weekly mentor call" }))
            .await;
        response.assert_status_ok();

        let response = server
            .post("/complete-intervention")
            .json(&json!({ "student_id": 42 }))
            .await;
        response.assert_status_ok();

        let detail: Value = server.get("/students/42").await.json();
        assert_eq!(detail["id"], "42");
        assert_eq!(detail["status"], "ON_TRACK");
    }

    #[tokio::test]
    async fn test_padded_student_id_is_a_distinct_student() {
        let server = server();

        server
            .post("/daily-checkin")
            .json(&json!({ "student_id": " s1 ", "quiz_score": 9, "focus_minutes": 70 }))
            .await
            .assert_status_ok();

        let detail: Value = server.get("/students/%20s1%20").await.json();
        assert_eq!(detail["id"], " s1 ");
        server
            .get("/students/s1")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_complete_without_assignment_is_bad_request() {
        let server = server();
        server
            .post("/daily-checkin")
            .json(&json!({ "student_id": "s3", "quiz_score": 2, "focus_minutes": 10 }))
            .await;

        let response = server
            .post("/complete-intervention")
            .json(&json!({ "student_id": "s3" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "No active intervention found" }));
    }

    #[tokio::test]
    async fn test_missing_or_malformed_fields_are_bad_request() {
        let server = server();

        for body in [
            json!({ "student_id": "s1", "quiz_score": 9 }),
            json!({ "quiz_score": 9, "focus_minutes": 70 }),
            json!({ "student_id": "s1", "quiz_score": null, "focus_minutes": 70 }),
            json!({ "student_id": "s1", "quiz_score": "nine", "focus_minutes": 70 }),
        ] {
            let response = server.post("/daily-checkin").json(&body).await;
            response.assert_status(StatusCode::BAD_REQUEST);
            response.assert_json(&json!({ "error": "Missing fields" }));
        }

        let response = server.post("/daily-checkin").text("not json").await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .get("/assign-intervention")
            .add_query_param("student_id", "s1")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "Missing fields" }));
    }

    #[tokio::test]
    async fn test_assign_unknown_intervention_is_bad_request() {
        let server = server();
        server
            .post("/daily-checkin")
            .json(&json!({ "student_id": "s2", "quiz_score": 5, "focus_minutes": 30 }))
            .await;

        let response = server
            .get("/assign-intervention")
            .add_query_param("student_id", "s2")
            .add_query_param("intervention_id", uuid::Uuid::new_v4().to_string())
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "Intervention not found" }));

        let detail: Value = server.get("/students/s2").await.json();
        assert_eq!(detail["status"], "NEEDS_INTERVENTION");
    }

    #[tokio::test]
    async fn test_assign_by_task() {
        let server = server();
        server
            .post("/daily-checkin")
            .json(&json!({ "student_id": "s2", "quiz_score": 5, "focus_minutes": 30 }))
            .await;

        let response = server
            .post("/assign-intervention")
            .json(&json!({ "student_id": "s2", "task": "Two tutoring sessions" }))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "status": "Task Assigned" }));

        let detail: Value = server.get("/students/s2").await.json();
        assert_eq!(detail["status"], "REMEDIAL");
        assert_eq!(detail["interventions"][0]["task"], "Two tutoring sessions");

        let response = server
            .post("/assign-intervention")
            .json(&json!({ "student_id": "s2", "task": "Again" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "No pending intervention found" }));
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_error() {
        let server = TestServer::new(create_router(Workflow::new(
            Arc::new(UnavailableStore),
            None,
        )))
        .unwrap();

        let response = server
            .post("/daily-checkin")
            .json(&json!({ "student_id": "s1", "quiz_score": 9, "focus_minutes": 70 }))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({ "error": "Internal error" }));
    }

    #[tokio::test]
    async fn test_unknown_student_is_not_found() {
        let response = server().get("/students/ghost").await;
        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_json(&json!({ "error": "Student not found" }));
    }
}
