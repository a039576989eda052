//! HTTP tests for the JSON API and the pages, run against an in-memory database

use super::*;
use crate::config::Config;
use crate::db::{create_test_pool, migrations};
use axum::http::{HeaderName, StatusCode};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};

const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

async fn setup() -> (TestServer, AppState) {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let mut config = Config::default();
    config.security.bcrypt_cost = 4;
    config.security.secure_cookies = false;

    let state = AppState::new(pool, &config, SECRET).expect("Failed to build state");
    let app = build_router(state.clone(), &config.server.cors_origin);
    (TestServer::new(app).unwrap(), state)
}

/// `session=...` pair from a response's Set-Cookie header
fn session_cookie(response: &TestResponse) -> HeaderValue {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Missing Set-Cookie")
        .to_str()
        .unwrap();
    let pair = set_cookie.split(';').next().unwrap();
    HeaderValue::from_str(pair).unwrap()
}

fn bearer(uuid: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", uuid)).unwrap()
}

async fn register(server: &TestServer, email: &str) -> HeaderValue {
    let response = server
        .post("/api/auth/register")
        .json(&json!({ "email": email, "password": "correct horse" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    session_cookie(&response)
}

async fn me(server: &TestServer, name: HeaderName, value: HeaderValue) -> TestResponse {
    server.get("/api/auth/me").add_header(name, value).await
}

#[tokio::test]
async fn test_register_sets_cookie_and_me_works() {
    let (server, _) = setup().await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({ "email": " Jo@Example.com ", "password": "correct horse" }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let set_cookie = response.headers().get(header::SET_COOKIE).unwrap();
    let set_cookie = set_cookie.to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));

    let body: Value = response.json();
    assert_eq!(body["user"]["email"], "jo@example.com");
    assert!(body["user"].get("password_hash").is_none());

    let response = me(&server, header::COOKIE, session_cookie(&response)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["user"]["email"], "jo@example.com");
}

#[tokio::test]
async fn test_register_errors() {
    let (server, _) = setup().await;
    register(&server, "jo@example.com").await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({ "email": "JO@example.com", "password": "another password" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "CONFLICT");

    let response = server
        .post("/api/auth/register")
        .json(&json!({ "email": "min@example.com", "password": "short" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_login_failures_are_uniform() {
    let (server, _) = setup().await;
    register(&server, "jo@example.com").await;

    let wrong_password = server
        .post("/api/auth/login")
        .json(&json!({ "email": "jo@example.com", "password": "wrong password" }))
        .await;
    let unknown_email = server
        .post("/api/auth/login")
        .json(&json!({ "email": "nobody@example.com", "password": "correct horse" }))
        .await;

    wrong_password.assert_status(StatusCode::UNAUTHORIZED);
    unknown_email.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.text(), unknown_email.text());

    let ok = server
        .post("/api/auth/login")
        .json(&json!({ "email": "jo@example.com", "password": "correct horse" }))
        .await;
    ok.assert_status_ok();
    me(&server, header::COOKIE, session_cookie(&ok))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_logout_ends_session() {
    let (server, _) = setup().await;
    let cookie = register(&server, "jo@example.com").await;

    let response = server
        .post("/api/auth/logout")
        .add_header(header::COOKIE, cookie.clone())
        .await;
    response.assert_status(StatusCode::NO_CONTENT);
    let cleared = response.headers().get(header::SET_COOKIE).unwrap();
    assert!(cleared.to_str().unwrap().contains("Max-Age=0"));

    me(&server, header::COOKIE, cookie)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_anonymous_and_tampered_requests_are_unauthorized() {
    let (server, _) = setup().await;
    let cookie = register(&server, "jo@example.com").await;

    server
        .get("/api/auth/me")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let tampered = format!("{}x", cookie.to_str().unwrap());
    me(&server, header::COOKIE, HeaderValue::from_str(&tampered).unwrap())
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    me(&server, header::AUTHORIZATION, bearer("not-a-uuid"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    me(&server, header::AUTHORIZATION, bearer(&uuid::Uuid::new_v4().to_string()))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_cookie_takes_priority_over_bearer_token() {
    let (server, _) = setup().await;
    let jo = register(&server, "jo@example.com").await;
    let min = register(&server, "min@example.com").await;

    let response = server
        .post("/api/tokens")
        .add_header(header::COOKIE, min)
        .json(&json!({ "name": "script" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let token: Value = response.json();
    let uuid = token["uuid"].as_str().unwrap().to_string();

    // Bearer alone identifies the token owner
    let body: Value = me(&server, header::AUTHORIZATION, bearer(&uuid)).await.json();
    assert_eq!(body["user"]["email"], "min@example.com");

    // Both present: the cookie wins
    let response = server
        .get("/api/auth/me")
        .add_header(header::COOKIE, jo)
        .add_header(header::AUTHORIZATION, bearer(&uuid))
        .await;
    let body: Value = response.json();
    assert_eq!(body["user"]["email"], "jo@example.com");
}

#[tokio::test]
async fn test_unusable_cookie_falls_back_to_bearer_token() {
    let (server, _) = setup().await;
    let jo = register(&server, "jo@example.com").await;
    let min = register(&server, "min@example.com").await;

    let response = server
        .post("/api/tokens")
        .add_header(header::COOKIE, min)
        .json(&json!({ "name": "script" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let token: Value = response.json();
    let uuid = token["uuid"].as_str().unwrap().to_string();

    let tampered = HeaderValue::from_str(&format!("{}x", jo.to_str().unwrap())).unwrap();
    let response = server
        .get("/api/auth/me")
        .add_header(header::COOKIE, tampered)
        .add_header(header::AUTHORIZATION, bearer(&uuid))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["user"]["email"], "min@example.com");

    // Correctly signed but the session is gone
    server
        .post("/api/auth/logout")
        .add_header(header::COOKIE, jo.clone())
        .await
        .assert_status(StatusCode::NO_CONTENT);
    let response = server
        .get("/api/auth/me")
        .add_header(header::COOKIE, jo)
        .add_header(header::AUTHORIZATION, bearer(&uuid))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["user"]["email"], "min@example.com");
}

#[tokio::test]
async fn test_token_lifecycle() {
    let (server, _) = setup().await;
    let jo = register(&server, "jo@example.com").await;
    let min = register(&server, "min@example.com").await;

    server
        .post("/api/tokens")
        .add_header(header::COOKIE, jo.clone())
        .json(&json!({ "name": "   " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let created: Value = server
        .post("/api/tokens")
        .add_header(header::COOKIE, jo.clone())
        .json(&json!({ "name": "laptop" }))
        .await
        .json();
    let uuid = created["uuid"].as_str().unwrap().to_string();

    let listed: Value = server
        .get("/api/tokens")
        .add_header(header::COOKIE, jo.clone())
        .await
        .json();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["name"], "laptop");

    // Someone else's token is not found and stays in place
    server
        .delete(&format!("/api/tokens/{}", uuid))
        .add_header(header::COOKIE, min)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    me(&server, header::AUTHORIZATION, bearer(&uuid))
        .await
        .assert_status_ok();

    server
        .delete(&format!("/api/tokens/{}", uuid))
        .add_header(header::COOKIE, jo)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    me(&server, header::AUTHORIZATION, bearer(&uuid))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let (server, state) = setup().await;
    register(&server, "jo@example.com").await;

    server
        .post("/api/auth/forgot")
        .json(&json!({ "email": "nobody@example.com" }))
        .await
        .assert_status(StatusCode::ACCEPTED);
    server
        .post("/api/auth/forgot")
        .json(&json!({ "email": "jo@example.com" }))
        .await
        .assert_status(StatusCode::ACCEPTED);

    let reset = state
        .password_reset_service
        .create("jo@example.com")
        .await
        .unwrap();
    let token = reset.token.unwrap();

    // A short password is rejected without using up the token
    server
        .post("/api/auth/reset")
        .json(&json!({ "token": token, "password": "short" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/auth/reset")
        .json(&json!({ "token": token, "password": "brand new password" }))
        .await;
    response.assert_status_ok();
    me(&server, header::COOKIE, session_cookie(&response))
        .await
        .assert_status_ok();

    let reused = server
        .post("/api/auth/reset")
        .json(&json!({ "token": token, "password": "another new password" }))
        .await;
    reused.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = reused.json();
    assert_eq!(
        body["error"]["message"],
        "The password reset token is invalid or expired."
    );

    server
        .post("/api/auth/login")
        .json(&json!({ "email": "jo@example.com", "password": "brand new password" }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_article_endpoints() {
    let (server, _) = setup().await;

    server
        .post("/api/articles")
        .json(&json!({ "headline": "h", "content": "c" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let cookie = register(&server, "jo@example.com").await;
    let response = server
        .post("/api/articles")
        .add_header(header::COOKIE, cookie.clone())
        .json(&json!({
            "headline": "오늘의 뉴스",
            "content": "첫 문장.\n둘째 문장.",
            "published": true,
            "tags": ["news", " news ", ""]
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let article: Value = response.json();
    let id = article["id"].as_i64().unwrap();
    let slug = article["slug"].as_str().unwrap().to_string();
    let uuid = article["uuid"].as_str().unwrap().to_string();
    assert!(article["source_url"].is_null());

    server.get(&format!("/api/articles/{}", id)).await.assert_status_ok();
    let by_slug: Value = server.get(&format!("/api/articles/slug/{}", slug)).await.json();
    assert_eq!(by_slug["tags"], json!(["news"]));
    let by_uuid: Value = server.get(&format!("/api/articles/uuid/{}", uuid)).await.json();
    assert_eq!(by_uuid["id"], id);

    server
        .get("/api/articles/uuid/not-a-uuid")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get("/api/articles/999")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let page: Value = server.get("/api/articles?page=abc&page_size=0").await.json();
    assert_eq!(page["current_page"], 1);
    assert_eq!(page["page_size"], 10);
    assert_eq!(page["total_count"], 1);

    let updated: Value = server
        .put(&format!("/api/articles/{}", id))
        .add_header(header::COOKIE, cookie.clone())
        .json(&json!({ "headline": "수정", "content": "c" }))
        .await
        .json();
    assert_eq!(updated["headline"], "수정");
    assert_eq!(updated["slug"], slug.as_str());

    server
        .delete(&format!("/api/articles/{}", id))
        .add_header(header::COOKIE, cookie)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .get(&format!("/api/articles/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_article_vocabulary_and_grammar() {
    let (server, _) = setup().await;
    let cookie = register(&server, "jo@example.com").await;

    let article: Value = server
        .post("/api/articles")
        .add_header(header::COOKIE, cookie.clone())
        .json(&json!({ "headline": "h", "content": "c" }))
        .await
        .json();
    let id = article["id"].as_i64().unwrap();

    let word: Value = server
        .post("/api/vocabulary/get-or-create")
        .add_header(header::COOKIE, cookie.clone())
        .json(&json!({ "word": "대박" }))
        .await
        .json();
    assert_eq!(word["definition"], "incomplete: todo call tool");
    let again: Value = server
        .post("/api/vocabulary/get-or-create")
        .add_header(header::COOKIE, cookie.clone())
        .json(&json!({ "word": "대박" }))
        .await
        .json();
    assert_eq!(word["id"], again["id"]);

    let set: Value = server
        .put(&format!("/api/articles/{}/vocabulary", id))
        .add_header(header::COOKIE, cookie.clone())
        .json(&json!({ "vocabulary_ids": [word["id"], word["id"]] }))
        .await
        .json();
    assert_eq!(set.as_array().unwrap().len(), 1);

    server
        .put(&format!("/api/articles/{}/vocabulary", id))
        .add_header(header::COOKIE, cookie.clone())
        .json(&json!({ "vocabulary_ids": [4040] }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let listed: Value = server
        .get(&format!("/api/articles/{}/vocabulary", id))
        .await
        .json();
    assert_eq!(listed[0]["word"], "대박");

    let grammar = server
        .post("/api/grammar")
        .add_header(header::COOKIE, cookie.clone())
        .json(&json!({ "title": "-(으)니까", "explanation_short": "because" }))
        .await;
    grammar.assert_status(StatusCode::CREATED);
    let grammar: Value = grammar.json();

    let attached: Value = server
        .put(&format!("/api/articles/{}/grammar/{}", id, grammar["id"]))
        .add_header(header::COOKIE, cookie)
        .json(&json!({ "article_example": "비가 오니까" }))
        .await
        .json();
    assert_eq!(attached[0]["title"], "-(으)니까");
    assert_eq!(attached[0]["article_example"], "비가 오니까");
}

#[tokio::test]
async fn test_vocabulary_endpoints() {
    let (server, _) = setup().await;
    let cookie = register(&server, "jo@example.com").await;

    let created = server
        .post("/api/vocabulary")
        .add_header(header::COOKIE, cookie.clone())
        .json(&json!({ "word": "사과", "translation_en": "apple" }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let created: Value = created.json();
    let id = created["id"].as_i64().unwrap();
    assert!(created["definition"].is_null());

    server
        .post("/api/vocabulary")
        .add_header(header::COOKIE, cookie.clone())
        .json(&json!({ "word": "사과" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let updated: Value = server
        .put(&format!("/api/vocabulary/{}", id))
        .add_header(header::COOKIE, cookie.clone())
        .json(&json!({ "word": "사과", "translation_en": "apology" }))
        .await
        .json();
    assert_eq!(updated["translation_en"], "apology");

    let page: Value = server.get("/api/vocabulary").await.json();
    assert_eq!(page["total_count"], 1);

    server
        .delete(&format!("/api/vocabulary/{}", id))
        .add_header(header::COOKIE, cookie)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .get(&format!("/api/vocabulary/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pages() {
    let (server, state) = setup().await;

    let home = server.get("/").await;
    home.assert_status_ok();
    assert!(home.text().contains("No articles yet."));

    server
        .get("/a/missing")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let redirect = server.get("/users/me").await;
    redirect.assert_status(StatusCode::FOUND);
    assert_eq!(
        redirect.headers().get(header::LOCATION).unwrap(),
        "/users/login"
    );

    let article = state
        .article_service
        .create(crate::models::ArticleInput::new("<첫> 기사", "본문"))
        .await
        .unwrap();
    let page = server.get(&article.path()).await;
    page.assert_status_ok();
    assert!(page.text().contains("&lt;첫&gt; 기사"));
}

#[tokio::test]
async fn test_account_pages() {
    let (server, _) = setup().await;

    let registered = server
        .post("/users/register")
        .form(&[("email", "jo@example.com"), ("password", "correct horse")])
        .await;
    registered.assert_status(StatusCode::SEE_OTHER);
    let cookie = session_cookie(&registered);

    let failed = server
        .post("/users/login")
        .form(&[("email", "jo@example.com"), ("password", "nope nope")])
        .await;
    failed.assert_status_ok();
    assert!(failed.text().contains("That email or password is incorrect."));

    let forgot = server
        .post("/users/forgot")
        .form(&[("email", "nobody@example.com")])
        .await;
    assert!(forgot.text().contains("a reset link is on its way"));

    let reset = server
        .post("/users/reset")
        .form(&[("token", "bogus"), ("password", "long enough")])
        .await;
    assert!(reset
        .text()
        .contains("The password reset token is invalid or expired."));

    let profile = server
        .get("/users/me")
        .add_header(header::COOKIE, cookie.clone())
        .await;
    profile.assert_status_ok();
    assert!(profile.text().contains("No tokens yet."));

    server
        .post("/users/me/tokens")
        .add_header(header::COOKIE, cookie.clone())
        .form(&[("name", "laptop")])
        .await
        .assert_status(StatusCode::SEE_OTHER);
    let profile = server
        .get("/users/me")
        .add_header(header::COOKIE, cookie.clone())
        .await;
    assert!(profile.text().contains("laptop"));

    let logout = server
        .get("/users/logout")
        .add_header(header::COOKIE, cookie.clone())
        .await;
    logout.assert_status(StatusCode::SEE_OTHER);
    server
        .get("/users/me")
        .add_header(header::COOKIE, cookie)
        .await
        .assert_status(StatusCode::FOUND);
}

#[tokio::test]
async fn test_admin_article_form() {
    let (server, state) = setup().await;
    let cookie = register(&server, "jo@example.com").await;

    let bad_date = server
        .post("/admin/articles/new")
        .add_header(header::COOKIE, cookie.clone())
        .form(&[("headline", "h"), ("content", "c"), ("date", "yesterday")])
        .await;
    bad_date.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(bad_date.text(), "Invalid date");

    let word = state.vocabulary_service.get_or_create("뉴스").await.unwrap();
    let word_id = word.id.to_string();
    let created = server
        .post("/admin/articles/new")
        .add_header(header::COOKIE, cookie.clone())
        .form(&[
            ("headline", "새 기사"),
            ("content", "본문"),
            ("date", "2024-03-09"),
            ("published", "on"),
            ("tags", "news, culture"),
            ("vocabulary", word_id.as_str()),
        ])
        .await;
    created.assert_status_ok();
    assert!(created.text().contains("Saved"));

    let page = state.article_service.list_page(&Default::default()).await.unwrap();
    let article = state
        .article_service
        .hydrate(page.items[0].clone())
        .await
        .unwrap();
    assert!(article.published);
    assert_eq!(article.tags, vec!["culture".to_string(), "news".to_string()]);
    assert_eq!(article.vocabulary.len(), 1);
    assert_eq!(article.accessed_at.to_rfc3339(), "2024-03-09T00:00:00+00:00");

    // Saving without vocabulary fields clears the links
    let edited = server
        .post(&format!("/admin/articles/{}", article.id))
        .add_header(header::COOKIE, cookie.clone())
        .form(&[("headline", "고친 기사"), ("content", "본문"), ("date", "2024-03-10")])
        .await;
    edited.assert_status_ok();
    let article = state.article_service.get_by_slug(&article.slug).await.unwrap();
    assert_eq!(article.headline, "고친 기사");
    assert!(article.vocabulary.is_empty());
    assert!(!article.published);

    server
        .get("/admin/articles/4040")
        .add_header(header::COOKIE, cookie)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
