use axum::{extract::State, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{ok, ok_with_message, ApiError, ApiJson, ApiPath, ApiResult};
use crate::models::{Category, MAX_CATEGORY_DESCRIPTION_LENGTH, MAX_CATEGORY_NAME_LENGTH};
use crate::store::{next_id, Store};
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub sort: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub sort: Option<i32>,
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("category name is required".to_string()));
    }
    if name.chars().count() > MAX_CATEGORY_NAME_LENGTH {
        return Err(ApiError::Validation(format!(
            "category name must be at most {} characters",
            MAX_CATEGORY_NAME_LENGTH
        )));
    }
    Ok(())
}

fn validate_slug(slug: &str) -> Result<(), ApiError> {
    if slug.trim().is_empty() {
        return Err(ApiError::Validation("category slug is required".to_string()));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ApiError> {
    if description.chars().count() > MAX_CATEGORY_DESCRIPTION_LENGTH {
        return Err(ApiError::Validation(format!(
            "description must be at most {} characters",
            MAX_CATEGORY_DESCRIPTION_LENGTH
        )));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Store {
    /// Categories ordered by `sort`, then id.
    pub fn list_categories(&self) -> Vec<Category> {
        let mut categories = self.categories.clone();
        categories.sort_by(|a, b| a.sort.cmp(&b.sort).then(a.id.cmp(&b.id)));
        categories
    }

    fn category_name_taken(&self, name: &str, except: Option<u32>) -> bool {
        self.categories
            .iter()
            .any(|c| c.name == name && Some(c.id) != except)
    }

    pub fn create_category(&mut self, form: CategoryForm, now: DateTime<Utc>) -> Result<Category, ApiError> {
        validate_name(&form.name)?;
        validate_slug(&form.slug)?;
        if let Some(description) = &form.description {
            validate_description(description)?;
        }
        if self.category_name_taken(&form.name, None) {
            return Err(ApiError::DuplicateCategoryName);
        }

        let sort = form
            .sort
            .unwrap_or_else(|| self.categories.iter().map(|c| c.sort).max().map_or(1, |s| s + 1));
        let category = Category {
            id: next_id(self.categories.iter().map(|c| c.id)),
            name: form.name,
            slug: form.slug,
            description: non_empty(form.description),
            icon: non_empty(form.icon),
            sort,
            article_count: 0,
            create_time: now,
            update_time: now,
        };
        self.categories.push(category.clone());
        Ok(category)
    }

    /// Merges `patch` into the category. The id and article count are kept.
    pub fn update_category(
        &mut self,
        id: u32,
        patch: CategoryPatch,
        now: DateTime<Utc>,
    ) -> Result<Category, ApiError> {
        let index = self
            .categories
            .iter()
            .position(|c| c.id == id)
            .ok_or(ApiError::NotFound("category"))?;

        if let Some(name) = &patch.name {
            validate_name(name)?;
            if self.category_name_taken(name, Some(id)) {
                return Err(ApiError::DuplicateCategoryName);
            }
        }
        if let Some(slug) = &patch.slug {
            validate_slug(slug)?;
        }
        if let Some(description) = &patch.description {
            validate_description(description)?;
        }

        let category = &mut self.categories[index];
        if let Some(name) = patch.name {
            category.name = name;
        }
        if let Some(slug) = patch.slug {
            category.slug = slug;
        }
        if patch.description.is_some() {
            category.description = non_empty(patch.description);
        }
        if patch.icon.is_some() {
            category.icon = non_empty(patch.icon);
        }
        if let Some(sort) = patch.sort {
            category.sort = sort;
        }
        category.update_time = now;
        Ok(category.clone())
    }

    /// Refuses while any article, draft or published, still points at it.
    pub fn delete_category(&mut self, id: u32) -> Result<Category, ApiError> {
        let index = self
            .categories
            .iter()
            .position(|c| c.id == id)
            .ok_or(ApiError::NotFound("category"))?;
        if self.articles.iter().any(|a| a.category_id == id) {
            return Err(ApiError::CategoryHasArticles(self.categories[index].article_count));
        }
        Ok(self.categories.remove(index))
    }
}

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    let store = state.store.read().await;
    Ok(ok(store.list_categories()))
}

pub async fn create_category(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<CategoryForm>,
) -> ApiResult<Category> {
    tracing::info!("create_category {}", &form.name);
    let mut store = state.store.write().await;
    let category = store.create_category(form, Utc::now())?;
    Ok(ok_with_message(category, "Category created"))
}

pub async fn update_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u32>,
    ApiJson(patch): ApiJson<CategoryPatch>,
) -> ApiResult<Category> {
    tracing::info!("update_category {}", id);
    let mut store = state.store.write().await;
    let category = store.update_category(id, patch, Utc::now())?;
    Ok(ok_with_message(category, "Category updated"))
}

pub async fn delete_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u32>,
) -> ApiResult<()> {
    tracing::info!("delete_category {}", id);
    let mut store = state.store.write().await;
    store.delete_category(id)?;
    Ok(ok_with_message((), "Category deleted"))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/:id",
            axum::routing::put(update_category).delete(delete_category),
        )
}
