use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::ApiError;
use crate::models::{Article, ArticleStatus, Category, CategoryRef, Tag, TagRef, User, UNCATEGORIZED};

pub type SharedStore = Arc<RwLock<Store>>;

/// Process-memory collections backing every endpoint.
///
/// Category and tag `article_count` fields are denormalized: they must equal
/// the number of published articles referencing them. Every mutation that can
/// change that number goes through [`Store::adjust_counts`].
#[derive(Debug, Default)]
pub struct Store {
    pub articles: Vec<Article>,
    pub categories: Vec<Category>,
    pub tags: Vec<Tag>,
    pub users: Vec<User>,
    pub(crate) sessions: HashMap<String, SessionEntry>,
    pub(crate) session_seq: u64,
}

/// Owner of a live token and the order it was issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SessionEntry {
    pub user_id: u32,
    pub issued: u64,
}

/// A category or tag whose stored count disagrees with the articles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterDrift {
    pub kind: &'static str,
    pub id: u32,
    pub stored: u32,
    pub actual: u32,
}

pub(crate) fn next_id(ids: impl Iterator<Item = u32>) -> u32 {
    ids.max().map_or(1, |id| id + 1)
}

fn apply_delta(count: &mut u32, delta: i32) {
    *count = if delta >= 0 {
        count.saturating_add(delta.unsigned_abs())
    } else {
        count.saturating_sub(delta.unsigned_abs())
    };
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    pub fn article(&self, id: u32) -> Option<&Article> {
        self.articles.iter().find(|a| a.id == id)
    }

    pub fn category(&self, id: u32) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn tag(&self, id: u32) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == id)
    }

    pub fn user(&self, id: u32) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Applies `delta` to the count of `category_id` and of every tag in `tags`.
    /// Unknown ids are ignored and counts never drop below zero.
    pub fn adjust_counts(&mut self, category_id: u32, tags: &[u32], delta: i32) {
        if let Some(category) = self.categories.iter_mut().find(|c| c.id == category_id) {
            apply_delta(&mut category.article_count, delta);
        }
        for tag in self.tags.iter_mut().filter(|t| tags.contains(&t.id)) {
            apply_delta(&mut tag.article_count, delta);
        }
    }

    /// Adds (`delta > 0`) or withdraws (`delta < 0`) an article's contribution.
    /// Drafts contribute nothing.
    pub(crate) fn apply_contribution(
        &mut self,
        status: ArticleStatus,
        category_id: u32,
        tags: &[u32],
        delta: i32,
    ) {
        if status.is_published() {
            self.adjust_counts(category_id, tags, delta);
        }
    }

    /// Rebuilds every counter from the articles.
    pub fn recount(&mut self) {
        let articles = &self.articles;
        for category in self.categories.iter_mut() {
            category.article_count = published_in_category(articles, category.id);
        }
        for tag in self.tags.iter_mut() {
            tag.article_count = published_with_tag(articles, tag.id);
        }
    }

    pub fn verify_counts(&self) -> Vec<CounterDrift> {
        let categories = self.categories.iter().filter_map(|c| {
            let actual = published_in_category(&self.articles, c.id);
            (actual != c.article_count).then_some(CounterDrift {
                kind: "category",
                id: c.id,
                stored: c.article_count,
                actual,
            })
        });
        let tags = self.tags.iter().filter_map(|t| {
            let actual = published_with_tag(&self.articles, t.id);
            (actual != t.article_count).then_some(CounterDrift {
                kind: "tag",
                id: t.id,
                stored: t.article_count,
                actual,
            })
        });
        categories.chain(tags).collect()
    }

    /// Rejects a category or tag id that does not exist.
    pub(crate) fn check_references(&self, category_id: u32, tags: &[u32]) -> Result<(), ApiError> {
        if self.category(category_id).is_none() {
            return Err(ApiError::Validation(format!(
                "category {} does not exist",
                category_id
            )));
        }
        if let Some(missing) = tags.iter().find(|id| self.tag(**id).is_none()) {
            return Err(ApiError::Validation(format!("tag {} does not exist", missing)));
        }
        Ok(())
    }

    pub(crate) fn category_ref(&self, id: u32, with_slug: bool) -> CategoryRef {
        match self.category(id) {
            Some(c) => CategoryRef {
                id: c.id,
                name: c.name.clone(),
                slug: with_slug.then(|| c.slug.clone()),
            },
            None => CategoryRef {
                id: 0,
                name: UNCATEGORIZED.to_string(),
                slug: with_slug.then(String::new),
            },
        }
    }

    /// Resolved tags in the order the store holds them; dangling ids are dropped.
    pub(crate) fn tag_refs(&self, ids: &[u32]) -> Vec<TagRef> {
        self.tags
            .iter()
            .filter(|t| ids.contains(&t.id))
            .map(|t| TagRef {
                id: t.id,
                name: t.name.clone(),
                color: t.color.clone(),
            })
            .collect()
    }
}

fn published_in_category(articles: &[Article], category_id: u32) -> u32 {
    articles
        .iter()
        .filter(|a| a.status.is_published() && a.category_id == category_id)
        .count() as u32
}

fn published_with_tag(articles: &[Article], tag_id: u32) -> u32 {
    articles
        .iter()
        .filter(|a| a.status.is_published() && a.tags.contains(&tag_id))
        .count() as u32
}

/// Drops repeated ids, keeping the first occurrence.
pub(crate) fn dedup_ids(ids: Vec<u32>) -> Vec<u32> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}


#[cfg(test)]
mod tests {
    use super::fixtures;
    use super::*;

    #[test]
    fn recount_only_counts_published_articles() {
        let store = fixtures::store();
        assert_eq!(store.category(1).unwrap().article_count, 1);
        assert_eq!(store.category(2).unwrap().article_count, 1);
        assert_eq!(store.tag(2).unwrap().article_count, 1);
        assert_eq!(store.tag(3).unwrap().article_count, 1);
        assert!(store.verify_counts().is_empty());
    }

    #[test]
    fn adjust_counts_saturates_at_zero() {
        let mut store = fixtures::store();
        store.adjust_counts(1, &[1], -5);
        assert_eq!(store.category(1).unwrap().article_count, 0);
        assert_eq!(store.tag(1).unwrap().article_count, 0);
    }

    #[test]
    fn drafts_contribute_nothing() {
        let mut store = fixtures::store();
        store.apply_contribution(ArticleStatus::Draft, 1, &[1], 1);
        assert!(store.verify_counts().is_empty());
    }

    #[test]
    fn verify_counts_reports_drift() {
        let mut store = fixtures::store();
        store.adjust_counts(2, &[], 3);
        assert_eq!(
            store.verify_counts(),
            vec![CounterDrift {
                kind: "category",
                id: 2,
                stored: 4,
                actual: 1
            }]
        );
    }

    #[test]
    fn next_id_follows_the_highest_id() {
        assert_eq!(next_id([].into_iter()), 1);
        assert_eq!(next_id([1, 7, 3].into_iter()), 8);
    }

    #[test]
    fn dangling_category_shows_as_uncategorized() {
        let store = fixtures::store();
        let reference = store.category_ref(99, false);
        assert_eq!(reference.id, 0);
        assert_eq!(reference.name, UNCATEGORIZED);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        assert_eq!(dedup_ids(vec![3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }
}
