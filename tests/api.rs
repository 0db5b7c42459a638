mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use blog_admin::upload::{BODY_LIMIT, MAX_UPLOAD_BYTES};
use common::{delete, fetch, get, login, png, post, put, router, send, state, state_with, upload};

const MIB: usize = 1024 * 1024;

fn article(title: &str, category_id: u32, tags: &[u32], status: &str) -> serde_json::Value {
    json!({
        "title": title,
        "content": "# Notes",
        "summary": "short summary",
        "categoryId": category_id,
        "tags": tags,
        "status": status,
    })
}

#[tokio::test]
async fn healthcheck_reports_collections() {
    let state = state();
    let app = router(&state);
    let body = get(&app, "/api/healthcheck").await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["categories"], 5);
    assert_eq!(body["tags"], 10);
    assert_eq!(body["countersConsistent"], true);
}

#[tokio::test]
async fn unknown_route_is_a_404_envelope() {
    let app = router(&state());
    let (status, body) = send(&app, Method::GET, "/api/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn wrong_method_is_a_bare_405() {
    let app = router(&state());
    let (status, body) = fetch(&app, Method::DELETE, "/api/articles").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(body.is_empty());
}

#[tokio::test]
async fn article_lifecycle_keeps_counters_in_sync() {
    let state = state();
    let app = router(&state);

    let created = post(&app, "/api/articles", article("First", 1, &[1, 3], "published")).await;
    assert_eq!(created["success"], true);
    assert_eq!(created["data"]["id"], 1);
    assert!(created["data"]["publishTime"].is_string());

    post(&app, "/api/articles", article("Second", 1, &[1], "draft")).await;

    let categories = get(&app, "/api/categories").await;
    assert_eq!(categories["data"][0]["articleCount"], 1);

    // move the published article to another category and tag set
    let updated = put(&app, "/api/articles/1", json!({ "categoryId": 2, "tags": [5] })).await;
    assert_eq!(updated["success"], true);
    {
        let store = state.store.read().await;
        assert_eq!(store.category(1).unwrap().article_count, 0);
        assert_eq!(store.category(2).unwrap().article_count, 1);
        assert_eq!(store.tag(1).unwrap().article_count, 0);
        assert_eq!(store.tag(5).unwrap().article_count, 1);
        assert!(store.verify_counts().is_empty());
    }

    let batch = post(
        &app,
        "/api/articles/batchUpdateStatus",
        json!({ "ids": [1, 2, 99], "status": "published" }),
    )
    .await;
    assert_eq!(batch["message"], "Updated 2 articles");
    assert!(state.store.read().await.verify_counts().is_empty());

    let removed = post(&app, "/api/articles/batchDelete", json!({ "ids": [1, 2] })).await;
    assert_eq!(removed["message"], "Deleted 2 articles");
    let store = state.store.read().await;
    assert!(store.articles.is_empty());
    assert!(store.categories.iter().all(|c| c.article_count == 0));
    assert!(store.tags.iter().all(|t| t.article_count == 0));
}

#[tokio::test]
async fn list_and_detail_resolve_references() {
    let app = router(&state());
    post(&app, "/api/articles", article("Rust ownership", 2, &[3], "published")).await;
    post(&app, "/api/articles", article("Docker layers", 4, &[5], "draft")).await;

    let page = get(&app, "/api/articles?keyword=rust&pageSize=5").await;
    assert_eq!(page["data"]["total"], 1);
    assert_eq!(page["data"]["pageSize"], 5);
    let item = &page["data"]["list"][0];
    assert_eq!(item["category"]["name"], "Backend");
    assert_eq!(item["tags"][0]["name"], "TypeScript");
    assert!(item.get("content").is_none());

    let page = get(&app, "/api/articles?status=draft").await;
    assert_eq!(page["data"]["list"][0]["title"], "Docker layers");

    let detail = get(&app, "/api/articles/1").await;
    assert_eq!(detail["data"]["content"], "# Notes");
    assert_eq!(detail["data"]["categoryId"], 2);
    assert_eq!(detail["data"]["category"]["slug"], "backend");
}

#[tokio::test]
async fn business_errors_use_http_200() {
    let app = router(&state());

    let (status, body) = send(&app, Method::GET, "/api/articles/42", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["errorCode"], "3001");

    let body = post(&app, "/api/articles/batchDelete", json!({ "ids": [] })).await;
    assert_eq!(body["errorCode"], "1001");

    let body = get(&app, "/api/articles?sortField=title").await;
    assert_eq!(body["errorCode"], "1001");

    let body = get(&app, "/api/articles/abc").await;
    assert_eq!(body["errorCode"], "1001");
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = router(&state());
    let body = post(&app, "/api/tags", json!({ "color": "#fff" })).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errorCode"], "1001");
}

#[tokio::test]
async fn category_and_tag_guards() {
    let app = router(&state());
    post(&app, "/api/articles", article("Pinned", 3, &[8], "published")).await;

    let body = post(&app, "/api/categories", json!({ "name": "Databases", "slug": "db2" })).await;
    assert_eq!(body["errorCode"], "3004");

    let body = delete(&app, "/api/categories/3").await;
    assert_eq!(body["errorCode"], "3002");

    let body = delete(&app, "/api/tags/8").await;
    assert_eq!(body["errorCode"], "3003");

    let body = put(&app, "/api/tags/9", json!({ "name": "Redis" })).await;
    assert_eq!(body["errorCode"], "3005");

    let body = delete(&app, "/api/tags/10").await;
    assert_eq!(body["success"], true);
    let tags = get(&app, "/api/tags?keyword=mongo").await;
    assert_eq!(tags["data"].as_array().unwrap().len(), 1);

    let body = put(&app, "/api/categories/42", json!({ "name": "Ghost" })).await;
    assert_eq!(body["errorCode"], "1004");
}

#[tokio::test]
async fn dashboard_reflects_the_store() {
    let app = router(&state());
    post(&app, "/api/articles", article("A", 1, &[1], "published")).await;
    post(&app, "/api/articles", article("B", 1, &[2], "draft")).await;

    let stats = get(&app, "/api/dashboard/statistics").await;
    assert_eq!(stats["data"]["articleCount"], 1);
    assert_eq!(stats["data"]["userCount"], 1);

    let trend = get(&app, "/api/dashboard/visitTrend?days=3").await;
    assert_eq!(trend["data"].as_array().unwrap().len(), 3);

    let shares = get(&app, "/api/dashboard/categoryDistribution").await;
    assert_eq!(shares["data"][0]["name"], "Frontend");
    assert_eq!(shares["data"][0]["value"], 1);

    let recent = get(&app, "/api/dashboard/recentArticles?limit=1").await;
    assert_eq!(recent["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn login_current_user_and_logout() {
    let app = router(&state());

    let body = post(&app, "/api/auth/login", json!({ "username": "admin", "password": "bad" })).await;
    assert_eq!(body["errorCode"], "2003");

    let token = login(&app).await;
    let (_, me) = send(&app, Method::GET, "/api/auth/currentUser", Some(&token), None).await;
    assert_eq!(me["data"]["username"], "admin");
    assert!(me["data"].get("password").is_none());

    let (_, out) = send(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(out["success"], true);
    assert!(out["data"].is_null());

    let (_, me) = send(&app, Method::GET, "/api/auth/currentUser", Some(&token), None).await;
    assert_eq!(me["errorCode"], "2001");

    let me = get(&app, "/api/auth/currentUser").await;
    assert_eq!(me["errorCode"], "2001");
}

#[tokio::test]
async fn user_settings_need_a_session() {
    let app = router(&state());
    let body = put(&app, "/api/user/profile", json!({ "nickname": "Jane" })).await;
    assert_eq!(body["errorCode"], "2001");

    let token = login(&app).await;
    let (_, body) = send(
        &app,
        Method::PUT,
        "/api/user/profile",
        Some(&token),
        Some(json!({ "nickname": "Jane", "email": "jane@blog.com" })),
    )
    .await;
    assert_eq!(body["data"]["nickname"], "Jane");
    assert_eq!(body["data"]["email"], "jane@blog.com");

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/user/changePassword",
        Some(&token),
        Some(json!({ "oldPassword": "secret", "newPassword": "n3w", "confirmPassword": "n3w" })),
    )
    .await;
    assert_eq!(body["success"], true);

    let body = post(&app, "/api/auth/login", json!({ "username": "admin", "password": "n3w" })).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn require_auth_guards_admin_routes() {
    let app = router(&state_with(true));

    let body = get(&app, "/api/articles").await;
    assert_eq!(body["errorCode"], "2001");

    let (_, body) = send(&app, Method::GET, "/api/articles", Some("forged"), None).await;
    assert_eq!(body["errorCode"], "2001");

    let token = login(&app).await;
    let (_, body) = send(&app, Method::GET, "/api/articles", Some(&token), None).await;
    assert_eq!(body["success"], true);

    let health = get(&app, "/api/healthcheck").await;
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn image_upload_is_stored_and_served() {
    let app = router(&state());
    let image = png(3 * MIB);

    let body = upload(&app, "/api/upload/image", None, "image/png", &image).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["size"], image.len());
    let url = body["data"]["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/image-"));

    let (status, served) = fetch(&app, Method::GET, &url).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served.len(), image.len());
}

#[tokio::test]
async fn oversized_uploads_are_file_too_large() {
    let app = router(&state());

    // over the per-file limit but inside the request body limit
    let body = upload(&app, "/api/upload/image", None, "image/png", &png(MAX_UPLOAD_BYTES + 10)).await;
    assert_eq!(body["errorCode"], "4001");

    // over the request body limit, rejected while reading the multipart stream
    let body = upload(&app, "/api/upload/image", None, "image/png", &png(BODY_LIMIT + MIB)).await;
    assert_eq!(body["errorCode"], "4001");

    let body = upload(&app, "/api/upload/image", None, "application/pdf", &png(1024)).await;
    assert_eq!(body["errorCode"], "4002");
}

#[tokio::test]
async fn avatar_upload_updates_current_user() {
    let app = router(&state());

    let body = upload(&app, "/api/user/avatar", None, "image/png", &png(1024)).await;
    assert_eq!(body["errorCode"], "2001");

    let token = login(&app).await;
    let body = upload(&app, "/api/user/avatar", Some(&token), "image/png", &png(3 * MIB)).await;
    assert_eq!(body["success"], true);
    let url = body["data"]["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/avatar-"));

    let (_, me) = send(&app, Method::GET, "/api/auth/currentUser", Some(&token), None).await;
    assert_eq!(me["data"]["avatar"], url.as_str());

    let body = upload(&app, "/api/user/avatar", Some(&token), "image/png", &png(BODY_LIMIT + 2 * MIB)).await;
    assert_eq!(body["errorCode"], "4001");
}
