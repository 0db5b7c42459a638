//! Startup dataset.
//!
//! One admin account, a fixed set of categories and tags, and a batch of
//! generated articles. Counters are derived once from the generated
//! articles and maintained incrementally from then on.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::config::Config;
use crate::models::{Article, ArticleStatus, Category, Tag, User, UserRole, UserStatus};
use crate::store::Store;

const CATEGORIES: [(&str, &str, &str, &str); 5] = [
    ("Frontend", "frontend", "React, Vue, TypeScript and friends", "CodeOutlined"),
    ("Backend", "backend", "Services, runtimes and APIs", "CloudOutlined"),
    ("Databases", "database", "MySQL, MongoDB, Redis and more", "DatabaseOutlined"),
    ("DevOps", "devops", "Docker, CI/CD and Linux operations", "ToolOutlined"),
    ("Architecture", "architecture", "System design and patterns", "AppstoreOutlined"),
];

const TAGS: [(&str, &str); 10] = [
    ("React", "#61dafb"),
    ("Vue", "#42b883"),
    ("TypeScript", "#3178c6"),
    ("Node.js", "#339933"),
    ("Docker", "#2496ed"),
    ("Webpack", "#8dd6f9"),
    ("Next.js", "#000000"),
    ("MySQL", "#4479a1"),
    ("MongoDB", "#47a248"),
    ("Redis", "#dc382d"),
];

const TITLES: [&str; 24] = [
    "React 18 in depth: concurrent rendering and automatic batching",
    "What is new in TypeScript 5.0",
    "Vue 3 Composition API patterns",
    "Node.js performance from theory to practice",
    "A complete guide to deploying with Docker",
    "Tuning Webpack 5 builds",
    "Next.js App Router explained",
    "MySQL indexing and query tuning",
    "MongoDB aggregation pipeline recipes",
    "Redis caching strategies",
    "Frontend performance from first paint to runtime",
    "Designing micro-frontends",
    "GraphQL in modern web applications",
    "Understanding Vite",
    "Enterprise backends with Nest.js",
    "React Hooks pitfalls",
    "Kubernetes for beginners",
    "CI/CD with GitHub Actions",
    "Advanced TypeScript type tricks",
    "Monorepos with pnpm and Turborepo",
    "Getting started with WebAssembly",
    "Serverless architecture in practice",
    "RESTful API design guidelines",
    "Distributed systems: CAP in practice",
];

const SENTENCES: [&str; 6] = [
    "Small, focused changes are easier to review and to revert.",
    "Measure before optimizing; the bottleneck is rarely where you expect.",
    "Consistent naming removes a surprising amount of friction.",
    "Automate the boring parts so reviews can focus on design.",
    "Caching trades freshness for speed, so decide what can be stale.",
    "Good defaults matter more than exhaustive configuration.",
];

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

pub fn admin_user(password: &str, now: DateTime<Utc>) -> User {
    User {
        id: 1,
        username: "admin".to_string(),
        password: password.to_string(),
        nickname: "Administrator".to_string(),
        avatar: Some("https://avatars.githubusercontent.com/u/1".to_string()),
        email: "admin@blog.com".to_string(),
        role: UserRole::Admin,
        bio: Some("Full-stack developer who enjoys writing".to_string()),
        status: UserStatus::Active,
        last_login_time: None,
        create_time: now,
        update_time: now,
    }
}

pub fn categories() -> Vec<Category> {
    CATEGORIES
        .iter()
        .enumerate()
        .map(|(i, (name, slug, description, icon))| Category {
            id: i as u32 + 1,
            name: name.to_string(),
            slug: slug.to_string(),
            description: Some(description.to_string()),
            icon: Some(icon.to_string()),
            sort: i as i32 + 1,
            article_count: 0,
            create_time: epoch(),
            update_time: epoch(),
        })
        .collect()
}

pub fn tags() -> Vec<Tag> {
    TAGS.iter()
        .enumerate()
        .map(|(i, (name, color))| Tag {
            id: i as u32 + 1,
            name: name.to_string(),
            color: Some(color.to_string()),
            article_count: 0,
            create_time: epoch(),
            update_time: epoch(),
        })
        .collect()
}

fn paragraph(rng: &mut impl Rng) -> String {
    let count = rng.random_range(2..=4);
    (0..count)
        .map(|_| SENTENCES[rng.random_range(0..SENTENCES.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

fn content(title: &str, rng: &mut impl Rng) -> String {
    format!(
        "# {title}\n\n## Introduction\n\n{}\n\n## Core ideas\n\n{}\n\n## Example\n\n```rust\nfn main() {{\n    println!(\"hello\");\n}}\n```\n\n## Summary\n\n{}\n",
        paragraph(rng),
        paragraph(rng),
        paragraph(rng),
    )
}

pub fn articles(count: usize, rng: &mut impl Rng, now: DateTime<Utc>, author: &User) -> Vec<Article> {
    let tag_ids: Vec<u32> = (1..=TAGS.len() as u32).collect();
    (0..count)
        .map(|index| {
            let id = index as u32 + 1;
            let title = TITLES
                .get(index)
                .map(|t| t.to_string())
                .unwrap_or_else(|| format!("Engineering notes #{}", id));

            let mut tags = tag_ids.clone();
            tags.shuffle(rng);
            tags.truncate(rng.random_range(1..=3));

            let status = if rng.random_bool(0.5) {
                ArticleStatus::Published
            } else {
                ArticleStatus::Draft
            };
            let create_time = now - Duration::days(rng.random_range(1..=30));
            let update_time = (now - Duration::days(rng.random_range(0..=7))).max(create_time);

            Article {
                id,
                content: content(&title, rng),
                summary: paragraph(rng),
                title,
                cover_image: rng
                    .random_bool(0.5)
                    .then(|| format!("https://picsum.photos/800/400?random={}", id)),
                category_id: rng.random_range(1..=CATEGORIES.len() as u32),
                tags,
                author: author.nickname.clone(),
                author_id: author.id,
                status,
                view_count: rng.random_range(50..=1000),
                like_count: rng.random_range(0..=100),
                comment_count: rng.random_range(0..=50),
                is_top: index < 3,
                allow_comment: true,
                create_time,
                update_time,
                publish_time: status.is_published().then_some(create_time),
            }
        })
        .collect()
}

/// Builds the initial store described by `config`.
pub fn seed_store(config: &Config) -> Store {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let now = Utc::now();
    let admin = admin_user(&config.admin_password, epoch());

    let mut store = Store::new();
    store.categories = categories();
    store.tags = tags();
    store.articles = articles(config.seed_articles, &mut rng, now, &admin);
    store.users.push(admin);
    store.recount();

    tracing::info!(
        "seeded {} articles, {} categories, {} tags",
        store.articles.len(),
        store.categories.len(),
        store.tags.len()
    );
    store
}
