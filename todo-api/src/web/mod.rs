use axum::Router;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Html;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{self, Config};
use crate::health::{FileSystemHealthCheck, create_health_router};
use crate::todo::web::{TodoState, create_todo_router};
use crate::todo::{FileTodoRepository, TodoService, TodoStore};

pub mod api;

/// Custom error type for web handler operations.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// The index page template could not be rendered.
    #[error("Template rendering failed")]
    Template(#[from] askama::Error),
}

impl axum::response::IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!("Failed to render page: {}", self);
        let user_facing_error_message =
            "The todo list could not be displayed. Please reload the page or try again later.";
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!(
                "<h1>Internal Server Error</h1><p>{}</p>",
                user_facing_error_message
            )),
        )
            .into_response()
    }
}

/// Builds the full application router over an opened store.
pub fn create_app(config: &Config, store: Arc<TodoStore>) -> anyhow::Result<Router> {
    let health_check = Arc::new(FileSystemHealthCheck::new(store.path()));
    let repository = Arc::new(FileTodoRepository::new(store));
    let todo_state = Arc::new(TodoState::new(TodoService::new(repository)));

    let app = Router::new()
        .merge(create_todo_router(todo_state))
        .merge(create_health_router(health_check))
        .merge(api::create_docs_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.cors_origins)?),
        );
    Ok(app)
}

fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin.trim()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([header::LOCATION]))
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let data_path = std::path::absolute(config.data_file_path())?;
    config::ensure_writable(&data_path)?;
    let store = Arc::new(TodoStore::open(&data_path)?);
    tracing::info!("Using data file {}", store.path().display());

    let app = create_app(&config, store)?;

    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    axum::serve(listener, app).await?;
    Ok(())
}
