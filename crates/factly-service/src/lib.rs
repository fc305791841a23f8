use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use factly_api::{CreateFactRequest, FactlyApi, UpdateFactRequest};
use factly_core::{Fact, FactError};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct ServiceState {
    api: FactlyApi,
}

impl ServiceState {
    #[must_use]
    pub fn new(api: FactlyApi) -> Self {
        Self { api }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
struct ServiceError {
    status: StatusCode,
    error: String,
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct DeleteResponse {
    success: bool,
}

impl ServiceError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, error: message.into() }
    }

    /// Map an operation failure onto the HTTP contract: validation is 400,
    /// missing rows are 404, everything else is a generic 500 whose cause is
    /// logged server-side only.
    fn from_operation(fallback: &'static str, err: &anyhow::Error) -> Self {
        match err.downcast_ref::<FactError>() {
            Some(FactError::Validation(message)) => Self::bad_request(message.clone()),
            Some(FactError::NotFound(_)) => Self {
                status: StatusCode::NOT_FOUND,
                error: "Fact not found".to_string(),
            },
            None => {
                tracing::error!(error = ?err, "{fallback}");
                Self { status: StatusCode::INTERNAL_SERVER_ERROR, error: fallback.to_string() }
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.error })).into_response()
    }
}

#[must_use]
pub fn app(state: ServiceState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/facts", get(list_facts).post(create_fact))
        .route("/facts/:id", axum::routing::put(update_fact).delete(delete_fact))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn list_facts(
    State(state): State<ServiceState>,
) -> Result<Json<Vec<Fact>>, ServiceError> {
    let facts = state
        .api
        .list_facts()
        .map_err(|err| ServiceError::from_operation("Failed to fetch facts", &err))?;
    Ok(Json(facts))
}

async fn create_fact(
    State(state): State<ServiceState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Fact>), ServiceError> {
    let (content, category, source) = read_fact_body(&body)?;
    let fact = state
        .api
        .create_fact(CreateFactRequest { content, category, source, created_at: None })
        .map_err(|err| ServiceError::from_operation("Failed to create fact", &err))?;
    Ok((StatusCode::CREATED, Json(fact)))
}

async fn update_fact(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Fact>, ServiceError> {
    let (content, category, source) = read_fact_body(&body)?;
    let fact = state
        .api
        .update_fact(&id, UpdateFactRequest { content, category, source })
        .map_err(|err| ServiceError::from_operation("Failed to update fact", &err))?;
    Ok(Json(fact))
}

async fn delete_fact(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ServiceError> {
    state
        .api
        .delete_fact(&id)
        .map_err(|err| ServiceError::from_operation("Failed to delete fact", &err))?;
    Ok(Json(DeleteResponse { success: true }))
}

// Write bodies are read field by field rather than through a typed request
// so that a missing or non-string `content` yields the contract's 400 body
// instead of a deserializer reject.
fn read_fact_body(body: &Value) -> Result<(String, Option<String>, Option<String>), ServiceError> {
    let Some(content) = body.get("content").and_then(Value::as_str) else {
        return Err(ServiceError::bad_request("Content is required"));
    };
    let category = body.get("category").and_then(Value::as_str).map(ToString::to_string);
    let source = body.get("source").and_then(Value::as_str).map(ToString::to_string);
    Ok((content.to_string(), category, source))
}
