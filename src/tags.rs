use std::sync::LazyLock;

use axum::{
    extract::State,
    routing::{get, put},
    Router,
};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;

use crate::error::{ok, ok_with_message, ApiError, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::models::{Tag, MAX_TAG_NAME_LENGTH};
use crate::store::{next_id, Store};
use crate::AppState;

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid color regex"));

#[derive(Debug, Clone, Deserialize)]
pub struct TagForm {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagPatch {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagQuery {
    pub keyword: Option<String>,
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("tag name is required".to_string()));
    }
    if name.chars().count() > MAX_TAG_NAME_LENGTH {
        return Err(ApiError::Validation(format!(
            "tag name must be at most {} characters",
            MAX_TAG_NAME_LENGTH
        )));
    }
    Ok(())
}

/// Empty means "no color"; anything else must be `#rgb` or `#rrggbb`.
fn normalize_color(color: Option<String>) -> Result<Option<String>, ApiError> {
    match color.filter(|c| !c.trim().is_empty()) {
        Some(c) if HEX_COLOR.is_match(&c) => Ok(Some(c)),
        Some(c) => Err(ApiError::Validation(format!("invalid color {:?}", c))),
        None => Ok(None),
    }
}

impl Store {
    pub fn list_tags(&self, keyword: Option<&str>) -> Vec<Tag> {
        match keyword.map(str::trim).filter(|k| !k.is_empty()) {
            Some(kw) => {
                let kw = kw.to_lowercase();
                self.tags
                    .iter()
                    .filter(|t| t.name.to_lowercase().contains(&kw))
                    .cloned()
                    .collect()
            }
            None => self.tags.clone(),
        }
    }

    fn tag_name_taken(&self, name: &str, except: Option<u32>) -> bool {
        self.tags.iter().any(|t| t.name == name && Some(t.id) != except)
    }

    pub fn create_tag(&mut self, form: TagForm, now: DateTime<Utc>) -> Result<Tag, ApiError> {
        validate_name(&form.name)?;
        let color = normalize_color(form.color)?;
        if self.tag_name_taken(&form.name, None) {
            return Err(ApiError::DuplicateTagName);
        }

        let tag = Tag {
            id: next_id(self.tags.iter().map(|t| t.id)),
            name: form.name,
            color,
            article_count: 0,
            create_time: now,
            update_time: now,
        };
        self.tags.push(tag.clone());
        Ok(tag)
    }

    pub fn update_tag(&mut self, id: u32, patch: TagPatch, now: DateTime<Utc>) -> Result<Tag, ApiError> {
        let index = self
            .tags
            .iter()
            .position(|t| t.id == id)
            .ok_or(ApiError::NotFound("tag"))?;

        if let Some(name) = &patch.name {
            validate_name(name)?;
            if self.tag_name_taken(name, Some(id)) {
                return Err(ApiError::DuplicateTagName);
            }
        }
        let color = match patch.color {
            Some(c) => Some(normalize_color(Some(c))?),
            None => None,
        };

        let tag = &mut self.tags[index];
        if let Some(name) = patch.name {
            tag.name = name;
        }
        if let Some(color) = color {
            tag.color = color;
        }
        tag.update_time = now;
        Ok(tag.clone())
    }

    pub fn delete_tag(&mut self, id: u32) -> Result<Tag, ApiError> {
        let index = self
            .tags
            .iter()
            .position(|t| t.id == id)
            .ok_or(ApiError::NotFound("tag"))?;
        if self.articles.iter().any(|a| a.tags.contains(&id)) {
            return Err(ApiError::TagHasArticles(self.tags[index].article_count));
        }
        Ok(self.tags.remove(index))
    }
}

pub async fn list_tags(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TagQuery>,
) -> ApiResult<Vec<Tag>> {
    let store = state.store.read().await;
    Ok(ok(store.list_tags(query.keyword.as_deref())))
}

pub async fn create_tag(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<TagForm>,
) -> ApiResult<Tag> {
    tracing::info!("create_tag {}", &form.name);
    let mut store = state.store.write().await;
    let tag = store.create_tag(form, Utc::now())?;
    Ok(ok_with_message(tag, "Tag created"))
}

pub async fn update_tag(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u32>,
    ApiJson(patch): ApiJson<TagPatch>,
) -> ApiResult<Tag> {
    tracing::info!("update_tag {}", id);
    let mut store = state.store.write().await;
    let tag = store.update_tag(id, patch, Utc::now())?;
    Ok(ok_with_message(tag, "Tag updated"))
}

pub async fn delete_tag(State(state): State<AppState>, ApiPath(id): ApiPath<u32>) -> ApiResult<()> {
    tracing::info!("delete_tag {}", id);
    let mut store = state.store.write().await;
    store.delete_tag(id)?;
    Ok(ok_with_message((), "Tag deleted"))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/tags", get(list_tags).post(create_tag))
        .route("/api/tags/:id", put(update_tag).delete(delete_tag))
}
