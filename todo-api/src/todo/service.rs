use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::TodoRecord;
use super::repository::TodoRepository;
use super::store::StoreError;
use super::validation::{self, ValidationErrors};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Error type for TodoService operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The request failed field validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    /// The store could not durably apply the change.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Payload for creating a todo.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoRequest {
    /// Title of the todo, 1 to 200 characters
    #[serde(default)]
    pub title: String,
    /// Optional free text description
    pub description: Option<String>,
    /// Optional due date in YYYY-MM-DD format
    pub due_date: Option<String>,
}

/// Payload for editing a todo. At least one field must be present.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoRequest {
    /// New title, 1 to 200 characters
    pub title: Option<String>,
    /// New description; blank clears it
    pub description: Option<String>,
    /// New due date in YYYY-MM-DD format; blank clears it
    pub due_date: Option<String>,
}

/// Raw list parameters as they arrive from a caller.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListTodosQuery {
    /// Only todos with this completion status
    pub is_completed: Option<bool>,
    /// When true, only incomplete todos whose due date has passed
    pub overdue: Option<bool>,
    /// Only todos due on or before this date (YYYY-MM-DD)
    pub due_before: Option<String>,
    /// Only todos due on or after this date (YYYY-MM-DD)
    pub due_after: Option<String>,
    /// Sort field: title, dueDate or createdAt
    pub sort_by: Option<String>,
    /// Sort direction: asc (default) or desc
    pub order: Option<String>,
    /// 1-based page number, defaults to 1
    pub page: Option<u32>,
    /// Items per page, 1 to 100, defaults to 10
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoSortField {
    Title,
    DueDate,
    CreatedAt,
}

impl FromStr for TodoSortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "duedate" => Ok(Self::DueDate),
            "createdat" => Ok(Self::CreatedAt),
            _ => Err("SortBy must be one of: title, dueDate, createdAt.".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err("Order must be either asc or desc.".to_string()),
        }
    }
}

/// Validated list parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCriteria {
    pub is_completed: Option<bool>,
    pub overdue: bool,
    pub due_before: Option<NaiveDate>,
    pub due_after: Option<NaiveDate>,
    pub sort_by: Option<TodoSortField>,
    pub order: SortOrder,
    pub page: u32,
    pub page_size: u32,
}

impl Default for ListCriteria {
    fn default() -> Self {
        Self {
            is_completed: None,
            overdue: false,
            due_before: None,
            due_after: None,
            sort_by: None,
            order: SortOrder::Asc,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TryFrom<ListTodosQuery> for ListCriteria {
    type Error = ValidationErrors;

    fn try_from(query: ListTodosQuery) -> Result<Self, Self::Error> {
        let mut errors = ValidationErrors::new();

        let due_before = errors
            .check("dueBefore", validation::parse_date("dueBefore", query.due_before.as_deref()))
            .flatten();
        let due_after = errors
            .check("dueAfter", validation::parse_date("dueAfter", query.due_after.as_deref()))
            .flatten();
        errors.check("dateRange", validation::ensure_date_range(due_after, due_before));
        let page = errors.check("page", validation::validate_page(query.page.unwrap_or(1)));
        let page_size = errors.check(
            "pageSize",
            validation::validate_page_size(query.page_size.unwrap_or(DEFAULT_PAGE_SIZE)),
        );
        let sort_by: Option<TodoSortField> = match query.sort_by.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => errors.check("sortBy", raw.parse()),
        };
        let order: Option<SortOrder> = match query.order.as_deref().map(str::trim) {
            None | Some("") => Some(SortOrder::Asc),
            Some(raw) => errors.check("order", raw.parse()),
        };

        match (page, page_size, order) {
            (Some(page), Some(page_size), Some(order)) if errors.is_empty() => Ok(Self {
                is_completed: query.is_completed,
                overdue: query.overdue.unwrap_or(false),
                due_before,
                due_after,
                sort_by,
                order,
                page,
                page_size,
            }),
            _ => Err(errors),
        }
    }
}

impl ListCriteria {
    /// Filters, sorts and paginates `items` as of the calendar day `today`.
    pub fn apply(&self, items: Vec<TodoRecord>, today: NaiveDate) -> Page<TodoRecord> {
        let mut matching: Vec<TodoRecord> = items
            .into_iter()
            .filter(|item| self.matches(item, today))
            .collect();

        if let Some(field) = self.sort_by {
            matching.sort_by(|a, b| {
                let ordering = compare_by(field, a, b);
                match self.order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        Page::paginate(matching, self.page, self.page_size)
    }

    fn matches(&self, item: &TodoRecord, today: NaiveDate) -> bool {
        if self.is_completed.is_some_and(|wanted| item.is_completed != wanted) {
            return false;
        }
        if self.overdue && !item.is_overdue(today) {
            return false;
        }
        if let Some(before) = self.due_before {
            if !item.due_date.is_some_and(|due| due <= before) {
                return false;
            }
        }
        if let Some(after) = self.due_after {
            if !item.due_date.is_some_and(|due| due >= after) {
                return false;
            }
        }
        true
    }
}

/// Ascending comparison on `field`. Missing due dates sort after present ones.
fn compare_by(field: TodoSortField, a: &TodoRecord, b: &TodoRecord) -> Ordering {
    match field {
        TodoSortField::Title => a.title.cmp(&b.title),
        TodoSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        TodoSortField::DueDate => match (a.due_date, b.due_date) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

/// One page of results plus the totals needed to navigate the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Cuts page `page` (1-based) of `page_size` items out of `all`.
    pub fn paginate(all: Vec<T>, page: u32, page_size: u32) -> Self {
        let size = page_size.max(1) as usize;
        let total_count = all.len();
        let total_pages = total_count.div_ceil(size);
        let skip = (page.max(1) as usize - 1).saturating_mul(size);
        let items = all.into_iter().skip(skip).take(size).collect();
        Self {
            items,
            page,
            page_size,
            total_count,
            total_pages,
        }
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }

    pub fn has_next_page(&self) -> bool {
        (self.page as usize) < self.total_pages
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }
}

#[derive(Clone)]
pub struct TodoService {
    repository: Arc<dyn TodoRepository>,
}

impl TodoService {
    pub fn new(repository: Arc<dyn TodoRepository>) -> Self {
        Self { repository }
    }

    /// Validates the request and stores a new, incomplete todo.
    ///
    /// # Returns
    ///
    /// The stored todo, a validation error, or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, request: CreateTodoRequest) -> Result<TodoRecord, ServiceError> {
        let mut errors = ValidationErrors::new();
        let title = errors.check("title", validation::validate_title(&request.title));
        let due_date = errors
            .check("dueDate", validation::parse_date("dueDate", request.due_date.as_deref()))
            .flatten();
        let Some(title) = title.filter(|_| errors.is_empty()) else {
            return Err(errors.into());
        };

        let mut record = TodoRecord::new(title);
        record.description = normalize_description(request.description);
        record.due_date = due_date;

        let created = self.repository.add(record).await?;
        tracing::info!("Created todo {}", created.id);
        Ok(created)
    }

    /// Lists todos matching the query, sorted and paginated.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, query: ListTodosQuery) -> Result<Page<TodoRecord>, ServiceError> {
        let criteria = ListCriteria::try_from(query)?;
        let items = self.repository.get_all().await;
        Ok(criteria.apply(items, Utc::now().date_naive()))
    }

    /// Retrieves a todo by its ID.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Option<TodoRecord> {
        self.repository.get_by_id(id).await
    }

    /// Applies the fields present in `request` to an existing todo.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the todo does not exist; a validation error when the
    /// request carries no field or an invalid one.
    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateTodoRequest,
    ) -> Result<Option<TodoRecord>, ServiceError> {
        let Some(mut existing) = self.repository.get_by_id(id).await else {
            return Ok(None);
        };

        if request.title.is_none() && request.description.is_none() && request.due_date.is_none()
        {
            return Err(
                ValidationErrors::single("request", "Provide at least one field to update.").into(),
            );
        }

        let mut errors = ValidationErrors::new();
        if let Some(title) = request.title {
            if let Some(title) = errors.check("title", validation::validate_title(&title)) {
                existing.title = title;
            }
        }
        if let Some(description) = request.description {
            existing.description = normalize_description(Some(description));
        }
        if let Some(due_date) = request.due_date {
            if let Some(due_date) =
                errors.check("dueDate", validation::parse_date("dueDate", Some(due_date.as_str())))
            {
                existing.due_date = due_date;
            }
        }
        errors.into_result()?;

        Ok(self.repository.update(existing).await?)
    }

    /// Marks a todo as completed or incomplete.
    #[tracing::instrument(skip(self))]
    pub async fn set_completed(
        &self,
        id: Uuid,
        completed: bool,
    ) -> Result<Option<TodoRecord>, ServiceError> {
        let Some(mut existing) = self.repository.get_by_id(id).await else {
            return Ok(None);
        };
        existing.is_completed = completed;
        Ok(self.repository.update(existing).await?)
    }

    /// Deletes a todo. Returns `false` when it did not exist.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        let deleted = self.repository.delete(id).await?;
        if deleted {
            tracing::info!("Deleted todo {}", id);
        }
        Ok(deleted)
    }
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::repository::MockTodoRepository;
    use chrono::{Duration, TimeZone};
    use mockall::predicate::eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(title: &str, due: Option<NaiveDate>, completed: bool, created_day: u32) -> TodoRecord {
        let mut record = TodoRecord::new(title.to_string());
        record.due_date = due;
        record.is_completed = completed;
        record.created_at = Utc.with_ymd_and_hms(2025, 1, created_day, 12, 0, 0).unwrap();
        record
    }

    fn titles(page: &Page<TodoRecord>) -> Vec<&str> {
        page.items.iter().map(|item| item.title.as_str()).collect()
    }

    fn durability_error() -> StoreError {
        StoreError::Durability {
            path: "todos.json".into(),
            source: std::io::Error::other("disk full"),
        }
    }

    #[tokio::test]
    async fn can_create_todo_with_trimmed_fields() {
        let mut repository = MockTodoRepository::new();
        repository
            .expect_add()
            .withf(|record| {
                record.title == "ship feature"
                    && record.description.as_deref() == Some("finish writing docs")
                    && record.due_date == Some(date(2025, 1, 1))
                    && !record.is_completed
            })
            .times(1)
            .returning(Ok);
        let service = TodoService::new(Arc::new(repository));

        let created = service
            .create(CreateTodoRequest {
                title: "  ship feature  ".to_string(),
                description: Some("  finish writing docs ".to_string()),
                due_date: Some("2025-01-01".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(created.title, "ship feature");
        assert!(created.created_at <= Utc::now());
    }

    #[tokio::test]
    async fn rejects_blank_title_without_touching_repository() {
        let mut repository = MockTodoRepository::new();
        repository.expect_add().never();
        let service = TodoService::new(Arc::new(repository));

        let result = service
            .create(CreateTodoRequest {
                title: "   ".to_string(),
                description: None,
                due_date: Some("01/02/2025".to_string()),
            })
            .await;

        let Err(ServiceError::Validation(errors)) = result else {
            panic!("expected validation error, got {result:?}");
        };
        assert_eq!(errors.errors()["title"], vec!["Title is required.".to_string()]);
        assert!(errors.errors().contains_key("dueDate"));
    }

    #[tokio::test]
    async fn propagates_durability_error_on_create() {
        let mut repository = MockTodoRepository::new();
        repository
            .expect_add()
            .times(1)
            .returning(|_| Err(durability_error()));
        let service = TodoService::new(Arc::new(repository));

        let result = service
            .create(CreateTodoRequest {
                title: "write".to_string(),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Store(StoreError::Durability { .. }))));
    }

    #[tokio::test]
    async fn update_without_fields_is_rejected() {
        let existing = TodoRecord::new("initial".to_string());
        let id = existing.id;
        let mut repository = MockTodoRepository::new();
        repository
            .expect_get_by_id()
            .with(eq(id))
            .times(1)
            .returning(move |_| Some(existing.clone()));
        repository.expect_update().never();
        let service = TodoService::new(Arc::new(repository));

        let result = service.update(id, UpdateTodoRequest::default()).await;

        let Err(ServiceError::Validation(errors)) = result else {
            panic!("expected validation error, got {result:?}");
        };
        assert!(errors.errors().contains_key("request"));
    }

    #[tokio::test]
    async fn update_returns_none_for_unknown_todo() {
        let mut repository = MockTodoRepository::new();
        repository.expect_get_by_id().times(1).returning(|_| None);
        repository.expect_update().never();
        let service = TodoService::new(Arc::new(repository));

        let result = service
            .update(
                Uuid::new_v4(),
                UpdateTodoRequest {
                    title: Some("anything".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn update_writes_back_full_record_with_changes() {
        let existing = TodoRecord::new("initial".to_string())
            .with_description("keep me")
            .with_due_date(date(2025, 5, 5));
        let id = existing.id;
        let created_at = existing.created_at;
        let mut repository = MockTodoRepository::new();
        repository
            .expect_get_by_id()
            .returning(move |_| Some(existing.clone()));
        repository
            .expect_update()
            .withf(move |record| {
                record.id == id
                    && record.title == "renamed"
                    && record.description.as_deref() == Some("keep me")
                    && record.due_date.is_none()
                    && record.created_at == created_at
            })
            .times(1)
            .returning(|record| Ok(Some(record)));
        let service = TodoService::new(Arc::new(repository));

        let updated = service
            .update(
                id,
                UpdateTodoRequest {
                    title: Some(" renamed ".to_string()),
                    description: None,
                    due_date: Some(String::new()),
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "renamed");
    }

    #[tokio::test]
    async fn can_toggle_completion() {
        let existing = TodoRecord::new("toggle".to_string());
        let id = existing.id;
        let mut repository = MockTodoRepository::new();
        repository
            .expect_get_by_id()
            .returning(move |_| Some(existing.clone()));
        repository
            .expect_update()
            .withf(|record| record.is_completed)
            .times(1)
            .returning(|record| Ok(Some(record)));
        let service = TodoService::new(Arc::new(repository));

        let updated = service.set_completed(id, true).await.unwrap().unwrap();

        assert!(updated.is_completed);
    }

    #[tokio::test]
    async fn list_rejects_invalid_query_before_reading() {
        let mut repository = MockTodoRepository::new();
        repository.expect_get_all().never();
        let service = TodoService::new(Arc::new(repository));

        let result = service
            .list(ListTodosQuery {
                due_before: Some("2025-01-01".to_string()),
                due_after: Some("2025-02-01".to_string()),
                page: Some(0),
                page_size: Some(500),
                sort_by: Some("priority".to_string()),
                ..Default::default()
            })
            .await;

        let Err(ServiceError::Validation(errors)) = result else {
            panic!("expected validation error, got {result:?}");
        };
        let fields: Vec<&str> = errors.errors().keys().map(String::as_str).collect();
        assert_eq!(fields, vec!["dateRange", "page", "pageSize", "sortBy"]);
    }

    #[tokio::test]
    async fn list_filters_overdue_items() {
        let today = Utc::now().date_naive();
        let overdue = record("done", Some(today - Duration::days(1)), false, 2);
        let completed = record("remaining", Some(today + Duration::days(365)), true, 3);
        let mut repository = MockTodoRepository::new();
        repository
            .expect_get_all()
            .times(1)
            .returning(move || vec![overdue.clone(), completed.clone()]);
        let service = TodoService::new(Arc::new(repository));

        let page = service
            .list(ListTodosQuery {
                is_completed: Some(false),
                overdue: Some(true),
                sort_by: Some("DueDate".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(titles(&page), vec!["done"]);
        assert_eq!(page.total_count, 1);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn parses_sort_options_case_insensitively() {
        assert_eq!("Title".parse::<TodoSortField>(), Ok(TodoSortField::Title));
        assert_eq!("dueDate".parse::<TodoSortField>(), Ok(TodoSortField::DueDate));
        assert_eq!("CREATEDAT".parse::<TodoSortField>(), Ok(TodoSortField::CreatedAt));
        assert_eq!("Desc".parse::<SortOrder>(), Ok(SortOrder::Desc));
        assert!("sideways".parse::<SortOrder>().is_err());
    }

    #[test]
    fn due_date_sort_puts_missing_dates_last_ascending_and_first_descending() {
        let items = vec![
            record("undated", None, false, 1),
            record("late", Some(date(2025, 3, 1)), false, 2),
            record("early", Some(date(2025, 2, 1)), false, 3),
        ];
        let ascending = ListCriteria {
            sort_by: Some(TodoSortField::DueDate),
            ..Default::default()
        };
        let descending = ListCriteria {
            order: SortOrder::Desc,
            ..ascending.clone()
        };

        let today = date(2025, 1, 1);
        assert_eq!(
            titles(&ascending.apply(items.clone(), today)),
            vec!["early", "late", "undated"]
        );
        assert_eq!(
            titles(&descending.apply(items, today)),
            vec!["undated", "late", "early"]
        );
    }

    #[test]
    fn sorts_by_title_and_created_at() {
        let items = vec![
            record("b", None, false, 3),
            record("c", None, false, 1),
            record("a", None, false, 2),
        ];
        let by_title = ListCriteria {
            sort_by: Some(TodoSortField::Title),
            ..Default::default()
        };
        let newest_first = ListCriteria {
            sort_by: Some(TodoSortField::CreatedAt),
            order: SortOrder::Desc,
            ..Default::default()
        };
        let today = date(2025, 1, 1);

        assert_eq!(titles(&by_title.apply(items.clone(), today)), vec!["a", "b", "c"]);
        assert_eq!(titles(&newest_first.apply(items.clone(), today)), vec!["b", "a", "c"]);
        assert_eq!(
            titles(&ListCriteria::default().apply(items, today)),
            vec!["b", "c", "a"]
        );
    }

    #[test]
    fn due_range_filters_exclude_undated_items() {
        let items = vec![
            record("undated", None, false, 1),
            record("jan", Some(date(2025, 1, 15)), false, 2),
            record("feb", Some(date(2025, 2, 15)), false, 3),
            record("mar", Some(date(2025, 3, 15)), false, 4),
        ];
        let criteria = ListCriteria {
            due_after: Some(date(2025, 1, 15)),
            due_before: Some(date(2025, 2, 15)),
            ..Default::default()
        };

        let page = criteria.apply(items, date(2025, 1, 1));

        assert_eq!(titles(&page), vec!["jan", "feb"]);
    }

    #[test]
    fn paginates_with_ceiling_page_count() {
        let page = Page::paginate((1..=15).collect::<Vec<u32>>(), 2, 10);

        assert_eq!(page.items, (11..=15).collect::<Vec<u32>>());
        assert_eq!(page.total_count, 15);
        assert_eq!(page.total_pages, 2);
        assert!(page.has_previous_page());
        assert!(!page.has_next_page());
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let page = Page::paginate(vec![1, 2, 3], 5, 2);

        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 2);
        assert!(!page.has_next_page());
    }

    #[test]
    fn empty_list_has_zero_pages() {
        let page: Page<u32> = Page::paginate(Vec::new(), 1, 10);

        assert_eq!(page.total_pages, 0);
        assert!(!page.has_previous_page());
        assert!(!page.has_next_page());
    }
}
