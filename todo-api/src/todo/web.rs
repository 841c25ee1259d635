use askama::Template;
use axum::{Router, response::Html, routing::get};
use std::sync::Arc;

use crate::todo::TodoService;
use crate::todo::service::DEFAULT_PAGE_SIZE;
use crate::todo::validation::{MAX_PAGE_SIZE, MAX_TITLE_LENGTH};
use crate::web::WebError;

/// Shared state for todo handlers.
#[derive(Clone)]
pub struct TodoState {
    pub service: TodoService,
}

impl TodoState {
    pub fn new(service: TodoService) -> Self {
        Self { service }
    }
}

/// Single page client that drives the JSON API from the browser.
#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    default_page_size: u32,
    max_page_size: u32,
    max_title_length: usize,
}

impl IndexTemplate {
    fn new() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            max_title_length: MAX_TITLE_LENGTH,
        }
    }
}

#[tracing::instrument]
pub async fn index_handler() -> Result<Html<String>, WebError> {
    let template = IndexTemplate::new();
    template.render().map(Html).map_err(WebError::from)
}

/// Creates the router serving the browser UI and the JSON API.
pub fn create_todo_router(state: Arc<TodoState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .merge(crate::todo::api::v1::create_api_router(state))
}
