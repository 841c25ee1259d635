use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::TodoRecord;
use super::store::{StoreError, TodoStore};

/// Trait defining the persistence operations the todo service relies on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TodoRepository: Send + Sync {
    /// Returns every todo in storage order.
    async fn get_all(&self) -> Vec<TodoRecord>;

    /// Returns the todo with the given id, if any.
    async fn get_by_id(&self, id: Uuid) -> Option<TodoRecord>;

    /// Stores a new todo and returns the stored copy.
    async fn add(&self, record: TodoRecord) -> Result<TodoRecord, StoreError>;

    /// Replaces an existing todo. `Ok(None)` when the id is unknown.
    async fn update(&self, record: TodoRecord) -> Result<Option<TodoRecord>, StoreError>;

    /// Deletes a todo. `Ok(false)` when the id is unknown.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// Repository backed by the shared JSON file store.
#[derive(Clone, Debug)]
pub struct FileTodoRepository {
    store: Arc<TodoStore>,
}

impl FileTodoRepository {
    pub fn new(store: Arc<TodoStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TodoRepository for FileTodoRepository {
    async fn get_all(&self) -> Vec<TodoRecord> {
        self.store.read_all().await
    }

    async fn get_by_id(&self, id: Uuid) -> Option<TodoRecord> {
        self.store.read_by_id(id).await
    }

    async fn add(&self, record: TodoRecord) -> Result<TodoRecord, StoreError> {
        self.store.add(record).await
    }

    async fn update(&self, record: TodoRecord) -> Result<Option<TodoRecord>, StoreError> {
        self.store.update(record).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.store.remove(id).await
    }
}
