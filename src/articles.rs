use std::cmp::Ordering;

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::{ok, ok_with_message, ApiError, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::models::{
    Article, ArticleDetail, ArticleListItem, ArticleStatus, Page, UserRole, MAX_SUMMARY_LENGTH,
    MAX_TITLE_LENGTH,
};
use crate::store::{dedup_ids, next_id, Store};
use crate::AppState;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Draft,
    Published,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    CreateTime,
    #[default]
    UpdateTime,
    ViewCount,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascend,
    #[default]
    Descend,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleQuery {
    #[serde(default = "default_page_num")]
    pub page_num: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    pub keyword: Option<String>,
    pub category_id: Option<u32>,
    pub tag_id: Option<u32>,
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub sort_field: SortField,
    #[serde(default)]
    pub sort_order: SortOrder,
}

fn default_page_num() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for ArticleQuery {
    fn default() -> Self {
        Self {
            page_num: default_page_num(),
            page_size: default_page_size(),
            keyword: None,
            category_id: None,
            tag_id: None,
            status: StatusFilter::All,
            sort_field: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleForm {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub summary: String,
    pub cover_image: Option<String>,
    pub category_id: u32,
    #[serde(default)]
    pub tags: Vec<u32>,
    #[serde(default = "default_status")]
    pub status: ArticleStatus,
    #[serde(default)]
    pub is_top: bool,
    #[serde(default = "default_allow_comment")]
    pub allow_comment: bool,
}

fn default_status() -> ArticleStatus {
    ArticleStatus::Draft
}

fn default_allow_comment() -> bool {
    true
}

/// Maps a field that is present in the body, `null` included, to `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Partial update; absent fields keep their current value.
/// `coverImage` distinguishes absent from `null`: `null` or `""` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub cover_image: Option<Option<String>>,
    pub category_id: Option<u32>,
    pub tags: Option<Vec<u32>>,
    pub status: Option<ArticleStatus>,
    pub is_top: Option<bool>,
    pub allow_comment: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchDelete {
    #[serde(default)]
    pub ids: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchUpdateStatus {
    #[serde(default)]
    pub ids: Vec<u32>,
    pub status: ArticleStatus,
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::Validation(format!(
            "title must be at most {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(())
}

fn validate_summary(summary: &str) -> Result<(), ApiError> {
    if summary.chars().count() > MAX_SUMMARY_LENGTH {
        return Err(ApiError::Validation(format!(
            "summary must be at most {} characters",
            MAX_SUMMARY_LENGTH
        )));
    }
    Ok(())
}

fn require_ids(ids: &[u32]) -> Result<(), ApiError> {
    if ids.is_empty() {
        return Err(ApiError::Validation("ids must be a non-empty list".to_string()));
    }
    Ok(())
}

fn compare(a: &Article, b: &Article, field: SortField) -> Ordering {
    match field {
        SortField::CreateTime => a.create_time.cmp(&b.create_time),
        SortField::UpdateTime => a.update_time.cmp(&b.update_time),
        SortField::ViewCount => a.view_count.cmp(&b.view_count),
    }
}

impl Store {
    fn default_author(&self) -> (String, u32) {
        self.users
            .iter()
            .find(|u| u.role == UserRole::Admin)
            .map(|u| (u.nickname.clone(), u.id))
            .unwrap_or_else(|| ("Administrator".to_string(), 1))
    }

    pub fn article_list_item(&self, article: &Article) -> ArticleListItem {
        ArticleListItem {
            id: article.id,
            title: article.title.clone(),
            summary: article.summary.clone(),
            cover_image: article.cover_image.clone(),
            category: self.category_ref(article.category_id, false),
            tags: self.tag_refs(&article.tags),
            author: article.author.clone(),
            author_id: article.author_id,
            status: article.status,
            view_count: article.view_count,
            like_count: article.like_count,
            comment_count: article.comment_count,
            is_top: article.is_top,
            allow_comment: article.allow_comment,
            create_time: article.create_time,
            update_time: article.update_time,
            publish_time: article.publish_time,
        }
    }

    pub fn article_detail(&self, id: u32) -> Result<ArticleDetail, ApiError> {
        let article = self.article(id).ok_or(ApiError::ArticleNotFound)?;
        Ok(ArticleDetail {
            id: article.id,
            title: article.title.clone(),
            content: article.content.clone(),
            summary: article.summary.clone(),
            cover_image: article.cover_image.clone(),
            category_id: article.category_id,
            category: self.category_ref(article.category_id, true),
            tags: self.tag_refs(&article.tags),
            author: article.author.clone(),
            author_id: article.author_id,
            status: article.status,
            view_count: article.view_count,
            like_count: article.like_count,
            comment_count: article.comment_count,
            is_top: article.is_top,
            allow_comment: article.allow_comment,
            create_time: article.create_time,
            update_time: article.update_time,
            publish_time: article.publish_time,
        })
    }

    pub fn list_articles(&self, query: &ArticleQuery) -> Result<Page<ArticleListItem>, ApiError> {
        if query.page_num < 1 {
            return Err(ApiError::Validation("pageNum must be at least 1".to_string()));
        }
        if query.page_size < 1 || query.page_size > MAX_PAGE_SIZE {
            return Err(ApiError::Validation(format!(
                "pageSize must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let keyword = query
            .keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_lowercase);

        let mut matched: Vec<&Article> = self
            .articles
            .iter()
            .filter(|a| match &keyword {
                Some(kw) => {
                    a.title.to_lowercase().contains(kw)
                        || a.content.to_lowercase().contains(kw)
                        || a.summary.to_lowercase().contains(kw)
                }
                None => true,
            })
            .filter(|a| query.category_id.map_or(true, |id| a.category_id == id))
            .filter(|a| query.tag_id.map_or(true, |id| a.tags.contains(&id)))
            .filter(|a| match query.status {
                StatusFilter::All => true,
                StatusFilter::Draft => a.status == ArticleStatus::Draft,
                StatusFilter::Published => a.status == ArticleStatus::Published,
            })
            .collect();

        // pinned articles lead regardless of the requested order
        matched.sort_by(|a, b| {
            b.is_top.cmp(&a.is_top).then_with(|| {
                let ord = compare(a, b, query.sort_field).then_with(|| a.id.cmp(&b.id));
                match query.sort_order {
                    SortOrder::Ascend => ord,
                    SortOrder::Descend => ord.reverse(),
                }
            })
        });

        let total = matched.len();
        let start = (query.page_num as usize - 1).saturating_mul(query.page_size as usize);
        let list = matched
            .into_iter()
            .skip(start)
            .take(query.page_size as usize)
            .map(|a| self.article_list_item(a))
            .collect();

        Ok(Page {
            list,
            total,
            page_num: query.page_num,
            page_size: query.page_size,
        })
    }

    pub fn create_article(&mut self, form: ArticleForm, now: DateTime<Utc>) -> Result<Article, ApiError> {
        validate_title(&form.title)?;
        validate_summary(&form.summary)?;
        let tags = dedup_ids(form.tags);
        self.check_references(form.category_id, &tags)?;

        let (author, author_id) = self.default_author();
        let article = Article {
            id: next_id(self.articles.iter().map(|a| a.id)),
            title: form.title,
            content: form.content,
            summary: form.summary,
            cover_image: form.cover_image,
            category_id: form.category_id,
            tags,
            author,
            author_id,
            status: form.status,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            is_top: form.is_top,
            allow_comment: form.allow_comment,
            create_time: now,
            update_time: now,
            publish_time: form.status.is_published().then_some(now),
        };

        self.apply_contribution(article.status, article.category_id, &article.tags, 1);
        self.articles.push(article.clone());
        Ok(article)
    }

    pub fn update_article(
        &mut self,
        id: u32,
        patch: ArticlePatch,
        now: DateTime<Utc>,
    ) -> Result<Article, ApiError> {
        let index = self
            .articles
            .iter()
            .position(|a| a.id == id)
            .ok_or(ApiError::ArticleNotFound)?;

        if let Some(title) = &patch.title {
            validate_title(title)?;
        }
        if let Some(summary) = &patch.summary {
            validate_summary(summary)?;
        }
        let tags = patch.tags.map(dedup_ids);

        let old = self.articles[index].clone();
        let mut updated = old.clone();
        if let Some(title) = patch.title {
            updated.title = title;
        }
        if let Some(content) = patch.content {
            updated.content = content;
        }
        if let Some(summary) = patch.summary {
            updated.summary = summary;
        }
        if let Some(cover) = patch.cover_image {
            updated.cover_image = cover.filter(|c| !c.is_empty());
        }
        if let Some(category_id) = patch.category_id {
            updated.category_id = category_id;
        }
        if let Some(tags) = tags {
            updated.tags = tags;
        }
        if let Some(status) = patch.status {
            updated.status = status;
        }
        if let Some(is_top) = patch.is_top {
            updated.is_top = is_top;
        }
        if let Some(allow_comment) = patch.allow_comment {
            updated.allow_comment = allow_comment;
        }
        if updated.category_id != old.category_id || updated.tags != old.tags {
            self.check_references(updated.category_id, &updated.tags)?;
        }
        updated.update_time = now;
        if !old.status.is_published() && updated.status.is_published() {
            updated.publish_time = Some(now);
        }

        self.apply_contribution(old.status, old.category_id, &old.tags, -1);
        self.apply_contribution(updated.status, updated.category_id, &updated.tags, 1);
        self.articles[index] = updated.clone();
        Ok(updated)
    }

    pub fn delete_article(&mut self, id: u32) -> Result<Article, ApiError> {
        let index = self
            .articles
            .iter()
            .position(|a| a.id == id)
            .ok_or(ApiError::ArticleNotFound)?;
        let article = self.articles.remove(index);
        self.apply_contribution(article.status, article.category_id, &article.tags, -1);
        Ok(article)
    }

    /// Deletes every listed article that exists; returns how many were removed.
    pub fn batch_delete_articles(&mut self, ids: &[u32]) -> Result<usize, ApiError> {
        require_ids(ids)?;
        let mut deleted = 0;
        for id in dedup_ids(ids.to_vec()) {
            if self.delete_article(id).is_ok() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Moves every listed article to `status`; returns how many were touched.
    pub fn batch_update_status(
        &mut self,
        ids: &[u32],
        status: ArticleStatus,
        now: DateTime<Utc>,
    ) -> Result<usize, ApiError> {
        require_ids(ids)?;
        let mut updated = 0;
        for id in dedup_ids(ids.to_vec()) {
            let patch = ArticlePatch {
                status: Some(status),
                ..ArticlePatch::default()
            };
            if self.update_article(id, patch, now).is_ok() {
                updated += 1;
            }
        }
        Ok(updated)
    }
}

pub async fn list_articles(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ArticleQuery>,
) -> ApiResult<Page<ArticleListItem>> {
    tracing::debug!("list_articles: {:?}", &query);
    let store = state.store.read().await;
    Ok(ok(store.list_articles(&query)?))
}

pub async fn get_article(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u32>,
) -> ApiResult<ArticleDetail> {
    let store = state.store.read().await;
    Ok(ok(store.article_detail(id)?))
}

pub async fn create_article(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<ArticleForm>,
) -> ApiResult<Article> {
    tracing::info!("create_article started");
    let mut store = state.store.write().await;
    let article = store.create_article(form, Utc::now())?;
    tracing::info!("create_article created article {}", article.id);
    Ok(ok_with_message(article, "Article created"))
}

pub async fn update_article(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u32>,
    ApiJson(patch): ApiJson<ArticlePatch>,
) -> ApiResult<Article> {
    tracing::info!("update_article {}", id);
    let mut store = state.store.write().await;
    let article = store.update_article(id, patch, Utc::now())?;
    Ok(ok_with_message(article, "Article updated"))
}

pub async fn delete_article(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u32>,
) -> ApiResult<()> {
    tracing::info!("delete_article {}", id);
    let mut store = state.store.write().await;
    store.delete_article(id)?;
    Ok(ok_with_message((), "Article deleted"))
}

pub async fn batch_delete(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<BatchDelete>,
) -> ApiResult<()> {
    tracing::info!("batch_delete {:?}", &body.ids);
    let mut store = state.store.write().await;
    let deleted = store.batch_delete_articles(&body.ids)?;
    Ok(ok_with_message((), format!("Deleted {} articles", deleted)))
}

pub async fn batch_update_status(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<BatchUpdateStatus>,
) -> ApiResult<()> {
    tracing::info!("batch_update_status {:?} -> {:?}", &body.ids, body.status);
    let mut store = state.store.write().await;
    let updated = store.batch_update_status(&body.ids, body.status, Utc::now())?;
    Ok(ok_with_message((), format!("Updated {} articles", updated)))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/articles", get(list_articles).post(create_article))
        .route("/api/articles/batchDelete", post(batch_delete))
        .route("/api/articles/batchUpdateStatus", post(batch_update_status))
        .route(
            "/api/articles/:id",
            get(get_article).put(update_article).delete(delete_article),
        )
}
