use crate::todo::service::{
    CreateTodoRequest, ListTodosQuery, Page, ServiceError, UpdateTodoRequest,
};
use crate::todo::TodoRecord;
use crate::todo::validation::ValidationErrors;
use crate::todo::web::TodoState;
use crate::web::api::v1::ProblemResponse;
use axum::{
    Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, patch},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// JSON representation of a todo for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodoJson {
    /// Unique identifier of the todo
    pub id: Uuid,
    /// Title of the todo
    pub title: String,
    /// Optional description
    pub description: Option<String>,
    /// Optional due date in YYYY-MM-DD format
    pub due_date: Option<NaiveDate>,
    /// Whether the todo has been completed
    pub is_completed: bool,
    /// UTC timestamp of creation
    pub created_at: DateTime<Utc>,
}

impl From<TodoRecord> for TodoJson {
    fn from(record: TodoRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            due_date: record.due_date,
            is_completed: record.is_completed,
            created_at: record.created_at,
        }
    }
}

/// One page of todos with pagination metadata.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedTodosResponse {
    /// Todos on this page
    pub items: Vec<TodoJson>,
    /// 1-based page number
    pub page: u32,
    /// Requested page size
    pub page_size: u32,
    /// Number of todos matching the filters
    pub total_count: usize,
    /// Number of pages for the matching todos
    pub total_pages: usize,
    /// Whether a previous page exists
    pub has_previous_page: bool,
    /// Whether a next page exists
    pub has_next_page: bool,
}

impl From<Page<TodoRecord>> for PaginatedTodosResponse {
    fn from(page: Page<TodoRecord>) -> Self {
        let has_previous_page = page.has_previous_page();
        let has_next_page = page.has_next_page();
        let page = page.map(TodoJson::from);
        Self {
            items: page.items,
            page: page.page,
            page_size: page.page_size,
            total_count: page.total_count,
            total_pages: page.total_pages,
            has_previous_page,
            has_next_page,
        }
    }
}

/// Custom error type for todo API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The todo does not exist, or the id is not a valid todo id.
    #[error("Todo not found")]
    NotFound,
    /// The request failed validation.
    #[error("Validation failed")]
    Validation(#[from] ValidationErrors),
    /// Anything else, reported to the client without detail.
    #[error("Unexpected error: {0}")]
    Internal(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(errors) => ApiError::Validation(errors),
            ServiceError::Store(err) => ApiError::Internal(format!("{err}: {}", error_chain(&err))),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(ValidationErrors::single("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(ValidationErrors::single("query", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                ProblemResponse::new(StatusCode::NOT_FOUND, "Not found."),
            ),
            ApiError::Validation(errors) => {
                tracing::warn!("Validation failed: {:?}", errors.errors());
                (
                    StatusCode::BAD_REQUEST,
                    ProblemResponse::validation(errors.into_errors()),
                )
            }
            ApiError::Internal(message) => {
                tracing::error!("Unhandled error occurred: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ProblemResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "Unexpected error."),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut messages = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        messages.push(cause.to_string());
        source = cause.source();
    }
    messages.join(": ")
}

/// Ids that are not UUIDs cannot name a todo, so they are reported as missing.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound)
}

/// Handler for POST /todos - Creates a todo.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/todos",
    request_body = CreateTodoRequest,
    responses(
        (status = 201, description = "Todo created", body = TodoJson),
        (status = 400, description = "Validation failed", body = ProblemResponse),
        (status = 500, description = "Internal server error", body = ProblemResponse)
    ),
    tag = "Todos"
)]
pub async fn create_todo_handler(
    State(state): State<Arc<TodoState>>,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let created = state.service.create(request).await?;
    let location = format!("/todos/{}", created.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(TodoJson::from(created)),
    )
        .into_response())
}

/// Handler for GET /todos - Lists todos with filtering, sorting and pagination.
#[tracing::instrument(skip(state, query))]
#[utoipa::path(
    get,
    path = "/todos",
    params(ListTodosQuery),
    responses(
        (status = 200, description = "Successfully retrieved todos", body = PaginatedTodosResponse),
        (status = 400, description = "Validation failed", body = ProblemResponse)
    ),
    tag = "Todos"
)]
pub async fn list_todos_handler(
    State(state): State<Arc<TodoState>>,
    query: Result<Query<ListTodosQuery>, QueryRejection>,
) -> Result<Json<PaginatedTodosResponse>, ApiError> {
    let Query(query) = query?;
    let page = state.service.list(query).await?;
    Ok(Json(PaginatedTodosResponse::from(page)))
}

/// Handler for GET /todos/{id} - Returns one todo.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/todos/{id}",
    params(("id" = Uuid, Path, description = "Todo id")),
    responses(
        (status = 200, description = "Todo found", body = TodoJson),
        (status = 404, description = "Todo not found", body = ProblemResponse)
    ),
    tag = "Todos"
)]
pub async fn get_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<String>,
) -> Result<Json<TodoJson>, ApiError> {
    let id = parse_id(&id)?;
    let todo = state.service.get(id).await.ok_or(ApiError::NotFound)?;
    Ok(Json(TodoJson::from(todo)))
}

/// Handler for PUT /todos/{id} - Updates title, description or due date.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    put,
    path = "/todos/{id}",
    params(("id" = Uuid, Path, description = "Todo id")),
    request_body = UpdateTodoRequest,
    responses(
        (status = 200, description = "Todo updated", body = TodoJson),
        (status = 400, description = "Validation failed", body = ProblemResponse),
        (status = 404, description = "Todo not found", body = ProblemResponse)
    ),
    tag = "Todos"
)]
pub async fn update_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<Json<TodoJson>, ApiError> {
    let id = parse_id(&id)?;
    let Json(request) = payload?;
    let updated = state
        .service
        .update(id, request)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(TodoJson::from(updated)))
}

/// Handler for PATCH /todos/{id}/complete - Marks a todo as completed.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    patch,
    path = "/todos/{id}/complete",
    params(("id" = Uuid, Path, description = "Todo id")),
    responses(
        (status = 200, description = "Todo marked as completed", body = TodoJson),
        (status = 404, description = "Todo not found", body = ProblemResponse)
    ),
    tag = "Todos"
)]
pub async fn complete_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<String>,
) -> Result<Json<TodoJson>, ApiError> {
    set_completed(&state, &id, true).await
}

/// Handler for PATCH /todos/{id}/incomplete - Marks a todo as incomplete.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    patch,
    path = "/todos/{id}/incomplete",
    params(("id" = Uuid, Path, description = "Todo id")),
    responses(
        (status = 200, description = "Todo marked as incomplete", body = TodoJson),
        (status = 404, description = "Todo not found", body = ProblemResponse)
    ),
    tag = "Todos"
)]
pub async fn incomplete_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<String>,
) -> Result<Json<TodoJson>, ApiError> {
    set_completed(&state, &id, false).await
}

async fn set_completed(
    state: &TodoState,
    id: &str,
    completed: bool,
) -> Result<Json<TodoJson>, ApiError> {
    let id = parse_id(id)?;
    let updated = state
        .service
        .set_completed(id, completed)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(TodoJson::from(updated)))
}

/// Handler for DELETE /todos/{id} - Deletes a todo permanently.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/todos/{id}",
    params(("id" = Uuid, Path, description = "Todo id")),
    responses(
        (status = 204, description = "Todo deleted"),
        (status = 404, description = "Todo not found", body = ProblemResponse)
    ),
    tag = "Todos"
)]
pub async fn delete_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    if state.service.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// Creates and returns the todos API router.
pub fn create_api_router(state: Arc<TodoState>) -> Router {
    Router::new()
        .route("/todos", get(list_todos_handler).post(create_todo_handler))
        .route(
            "/todos/{id}",
            get(get_todo_handler)
                .put(update_todo_handler)
                .delete(delete_todo_handler),
        )
        .route("/todos/{id}/complete", patch(complete_todo_handler))
        .route("/todos/{id}/incomplete", patch(incomplete_todo_handler))
        .with_state(state)
}
