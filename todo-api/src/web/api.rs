use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod v1 {
    use std::collections::BTreeMap;

    use axum::http::StatusCode;
    use serde::{Deserialize, Serialize};
    use utoipa::ToSchema;

    /// JSON body returned for every non-success API response.
    #[derive(Debug, Serialize, Deserialize, ToSchema)]
    pub struct ProblemResponse {
        /// Short human readable summary
        pub title: String,
        /// HTTP status code
        pub status: u16,
        /// Messages keyed by the request field they concern
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub errors: Option<BTreeMap<String, Vec<String>>>,
    }

    impl ProblemResponse {
        pub fn new(status: StatusCode, title: impl Into<String>) -> Self {
            Self {
                title: title.into(),
                status: status.as_u16(),
                errors: None,
            }
        }

        pub fn validation(errors: BTreeMap<String, Vec<String>>) -> Self {
            Self {
                errors: Some(errors),
                ..Self::new(StatusCode::BAD_REQUEST, "Validation failed.")
            }
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Todo API",
        version = "v1",
        description = "A RESTful API for managing todo items with filtering, sorting, and pagination support."
    ),
    paths(
        crate::todo::api::v1::create_todo_handler,
        crate::todo::api::v1::list_todos_handler,
        crate::todo::api::v1::get_todo_handler,
        crate::todo::api::v1::update_todo_handler,
        crate::todo::api::v1::complete_todo_handler,
        crate::todo::api::v1::incomplete_todo_handler,
        crate::todo::api::v1::delete_todo_handler,
    ),
    components(schemas(
        crate::todo::api::v1::TodoJson,
        crate::todo::api::v1::PaginatedTodosResponse,
        crate::todo::service::CreateTodoRequest,
        crate::todo::service::UpdateTodoRequest,
        v1::ProblemResponse,
    )),
    tags((name = "Todos", description = "Todo item management"))
)]
pub struct ApiDoc;

/// Serves the OpenAPI document and the Swagger UI that browses it.
pub fn create_docs_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
