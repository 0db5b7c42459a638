use axum::{extract::State, routing::get, Router};
use chrono::{Duration, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ok, ApiError, ApiQuery, ApiResult};
use crate::models::ArticleStatus;
use crate::store::Store;
use crate::AppState;

pub const MAX_TREND_DAYS: u32 = 90;
pub const MAX_RECENT_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub article_count: usize,
    pub article_growth: f64,
    pub view_count: u64,
    pub view_growth: f64,
    pub comment_count: u64,
    pub comment_growth: f64,
    pub user_count: usize,
    pub user_growth: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VisitPoint {
    pub date: NaiveDate,
    pub views: u32,
    pub visitors: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryShare {
    pub name: String,
    pub value: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecentArticle {
    pub id: u32,
    pub title: String,
    pub status: ArticleStatus,
    pub update_time: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrendQuery {
    #[serde(default = "default_days")]
    pub days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_days() -> u32 {
    7
}

fn default_limit() -> usize {
    5
}

/// Percentage with one decimal.
fn growth(rng: &mut impl Rng, low: f64, high: f64) -> f64 {
    (rng.random_range(low..high) * 10.0).round() / 10.0
}

pub fn visit_trend(rng: &mut impl Rng, today: NaiveDate, days: u32) -> Result<Vec<VisitPoint>, ApiError> {
    if days < 1 || days > MAX_TREND_DAYS {
        return Err(ApiError::Validation(format!(
            "days must be between 1 and {}",
            MAX_TREND_DAYS
        )));
    }
    Ok((0..days)
        .rev()
        .map(|offset| {
            let visitors: u32 = rng.random_range(100..=300);
            let factor: f64 = rng.random_range(1.0..=2.5);
            VisitPoint {
                date: today - Duration::days(i64::from(offset)),
                views: (f64::from(visitors) * factor).floor() as u32,
                visitors,
            }
        })
        .collect())
}

impl Store {
    pub fn statistics(&self, rng: &mut impl Rng) -> Statistics {
        Statistics {
            article_count: self
                .articles
                .iter()
                .filter(|a| a.status.is_published())
                .count(),
            article_growth: growth(rng, 0.0, 20.0),
            view_count: self.articles.iter().map(|a| u64::from(a.view_count)).sum(),
            view_growth: growth(rng, 0.0, 30.0),
            comment_count: self.articles.iter().map(|a| u64::from(a.comment_count)).sum(),
            comment_growth: growth(rng, -5.0, 15.0),
            user_count: self.users.len(),
            user_growth: 0.0,
        }
    }

    pub fn category_distribution(&self) -> Vec<CategoryShare> {
        self.list_categories()
            .into_iter()
            .map(|c| CategoryShare {
                name: c.name,
                value: c.article_count,
            })
            .collect()
    }

    /// Most recently updated first, without reordering the store.
    pub fn recent_articles(&self, limit: usize) -> Result<Vec<RecentArticle>, ApiError> {
        if limit < 1 || limit > MAX_RECENT_LIMIT {
            return Err(ApiError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_RECENT_LIMIT
            )));
        }
        let mut articles: Vec<_> = self.articles.iter().collect();
        articles.sort_by(|a, b| b.update_time.cmp(&a.update_time).then(b.id.cmp(&a.id)));
        Ok(articles
            .into_iter()
            .take(limit)
            .map(|a| RecentArticle {
                id: a.id,
                title: a.title.clone(),
                status: a.status,
                update_time: a.update_time,
            })
            .collect())
    }
}

pub async fn statistics(State(state): State<AppState>) -> ApiResult<Statistics> {
    let store = state.store.read().await;
    Ok(ok(store.statistics(&mut rand::rng())))
}

pub async fn visit_trend_handler(ApiQuery(query): ApiQuery<TrendQuery>) -> ApiResult<Vec<VisitPoint>> {
    let points = visit_trend(&mut rand::rng(), Utc::now().date_naive(), query.days)?;
    Ok(ok(points))
}

pub async fn category_distribution(State(state): State<AppState>) -> ApiResult<Vec<CategoryShare>> {
    let store = state.store.read().await;
    Ok(ok(store.category_distribution()))
}

pub async fn recent_articles(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RecentQuery>,
) -> ApiResult<Vec<RecentArticle>> {
    let store = state.store.read().await;
    Ok(ok(store.recent_articles(query.limit)?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard/statistics", get(statistics))
        .route("/api/dashboard/visitTrend", get(visit_trend_handler))
        .route("/api/dashboard/categoryDistribution", get(category_distribution))
        .route("/api/dashboard/recentArticles", get(recent_articles))
}
