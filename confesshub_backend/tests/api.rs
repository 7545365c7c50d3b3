//! HTTP-level tests for the JSON API.
//!
//! Each test gets its own temporary database directory and a cookie-session
//! app wired exactly like the server (minus CORS and headers).

use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::Key;
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use chrono::{Duration, Utc};
use confesshub_backend::helper::account_helpers;
use confesshub_backend::{routes, AppSettings, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Lowest cost bcrypt accepts.
const TEST_HASH_COST: u32 = 4;

fn open_state() -> (TempDir, web::Data<AppState>) {
    let dir = TempDir::new().unwrap();
    let settings = AppSettings {
        password_hash_cost: TEST_HASH_COST,
        reset_token_ttl: Duration::hours(24),
        public_base_url: "http://localhost:3000".to_string(),
    };
    let state = AppState::open(dir.path(), settings).unwrap();
    (dir, web::Data::new(state))
}

macro_rules! test_app {
    ($data:expr) => {
        test::init_service(
            App::new()
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), Key::from(&[42u8; 64]))
                        .cookie_secure(false)
                        .build(),
                )
                .app_data($data.clone())
                .configure(routes::config_api),
        )
        .await
    };
}

/// Sends the request and returns status, JSON body and the session cookie
/// if the response set one.
macro_rules! send {
    ($app:expr, $req:expr) => {{
        let resp = test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == "id")
            .map(|c| c.into_owned());
        let body = test::read_body(resp).await;
        let json: Value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json, cookie)
    }};
}

macro_rules! register {
    ($app:expr, $email:expr) => {{
        let (status, body, cookie) = send!(
            $app,
            test::TestRequest::post().uri("/api/auth/register").set_json(json!({
                "email": $email,
                "password": "secret1",
                "confirmPassword": "secret1",
            }))
        );
        assert_eq!(status, StatusCode::OK, "{}", body);
        cookie.expect("register sets a session cookie")
    }};
}

macro_rules! create_post {
    ($app:expr) => {{
        let (status, body, _) = send!(
            $app,
            test::TestRequest::post().uri("/api/posts").set_json(json!({
                "content": "I never told anyone how lonely I have been",
                "category": "personal",
                "tags": "lonely, night",
            }))
        );
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["post"]["id"].as_str().unwrap().to_string()
    }};
}

fn seed_admin(data: &web::Data<AppState>) {
    account_helpers::create_account(
        data.users.as_ref(),
        "admin@example.com",
        "adminpass",
        true,
        TEST_HASH_COST,
        Utc::now(),
        &mut rand::thread_rng(),
    )
    .unwrap();
}

macro_rules! login_admin {
    ($app:expr) => {{
        let (status, body, cookie) = send!(
            $app,
            test::TestRequest::post()
                .uri("/api/auth/login")
                .set_json(json!({ "email": "admin@example.com", "password": "adminpass" }))
        );
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["user"]["isAdmin"], true);
        cookie.expect("login sets a session cookie")
    }};
}

#[actix_web::test]
async fn health_reports_ok() {
    let (_dir, data) = open_state();
    let app = test_app!(data);
    let (status, body, _) = send!(app, test::TestRequest::get().uri("/api/health"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn posts_are_created_listed_and_reacted_to() {
    let (_dir, data) = open_state();
    let app = test_app!(data);
    let post_id = create_post!(app);

    let (status, body, _) = send!(app, test::TestRequest::get().uri("/api/posts?category=personal&sort=popular"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 1);
    assert_eq!(body["posts"][0]["tags"], json!(["lonely", "night"]));
    assert!(body["posts"][0].get("userId").is_none());
    assert_eq!(body["analytics"]["totalPosts"], 1);

    let (status, body, _) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/posts/{}/reactions", post_id))
            .set_json(json!({ "type": "care" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reactions"]["care"], 1);
    assert_eq!(body["total"], 1);

    let (status, _, _) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/posts/{}/reactions", post_id))
            .set_json(json!({ "type": "love" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body, _) = send!(app, test::TestRequest::get().uri("/api/posts/not-a-post"));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Post not found");
}

#[actix_web::test]
async fn invalid_posts_and_bodies_are_rejected() {
    let (_dir, data) = open_state();
    let app = test_app!(data);

    let (status, body, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/posts")
            .set_json(json!({ "content": "too short", "category": "general" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("at least"));

    let (status, body, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/reports")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn comments_are_threaded() {
    let (_dir, data) = open_state();
    let app = test_app!(data);
    let post_id = create_post!(app);
    let uri = format!("/api/posts/{}/comments", post_id);

    let (status, body, _) = send!(app, test::TestRequest::post().uri(&uri).set_json(json!({ "content": "You are not alone" })));
    assert_eq!(status, StatusCode::OK, "{}", body);
    let parent_id = body["comment"]["id"].as_str().unwrap().to_string();

    let (status, _, _) = send!(
        app,
        test::TestRequest::post()
            .uri(&uri)
            .set_json(json!({ "content": "Thank you", "parentId": parent_id }))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, body, _) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/comments/{}/reactions", parent_id))
            .set_json(json!({ "type": "support" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reactions"]["support"], 1);

    let (_, body, _) = send!(app, test::TestRequest::get().uri(&uri));
    assert_eq!(body["comments"].as_array().unwrap().len(), 1);
    assert_eq!(body["comments"][0]["replies"][0]["content"], "Thank you");

    let (_, body, _) = send!(app, test::TestRequest::get().uri(&format!("/api/posts/{}", post_id)));
    assert_eq!(body["post"]["comments"], 2);
}

#[actix_web::test]
async fn duplicate_reports_from_a_user_are_rejected() {
    let (_dir, data) = open_state();
    let app = test_app!(data);
    let post_id = create_post!(app);
    let cookie = register!(app, "reader@example.com");

    let report = json!({ "postId": post_id, "reason": "self-harm", "description": "worrying" });
    let (status, body, _) = send!(
        app,
        test::TestRequest::post().uri("/api/reports").cookie(cookie.clone()).set_json(&report)
    );
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["report"]["priority"], "urgent");
    assert_eq!(body["report"]["status"], "pending");

    let (status, body, _) = send!(
        app,
        test::TestRequest::post().uri("/api/reports").cookie(cookie.clone()).set_json(&report)
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You have already reported this post");

    // Anonymous reporters are not deduplicated.
    for _ in 0..2 {
        let (status, _, _) = send!(app, test::TestRequest::post().uri("/api/reports").set_json(&report));
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/reports")
            .set_json(json!({ "postId": uuid::Uuid::new_v4().to_string(), "reason": "spam" }))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send!(
        app,
        test::TestRequest::post().uri("/api/reports").set_json(json!({ "postId": post_id, "reason": " " }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn admin_routes_require_an_admin_session() {
    let (_dir, data) = open_state();
    let app = test_app!(data);
    let member = register!(app, "member@example.com");

    let (status, _, _) = send!(app, test::TestRequest::get().uri("/api/admin/stats"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body, _) = send!(app, test::TestRequest::get().uri("/api/admin/stats").cookie(member.clone()));
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    let (status, _, _) = send!(app, test::TestRequest::get().uri("/api/reports").cookie(member));
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admin_triages_and_reviews_reports() {
    let (_dir, data) = open_state();
    seed_admin(&data);
    let app = test_app!(data);
    let post_id = create_post!(app);
    let admin = login_admin!(app);

    for reason in ["self-harm", "spam", "harassment"] {
        let (status, _, _) = send!(
            app,
            test::TestRequest::post()
                .uri("/api/reports")
                .set_json(json!({ "postId": post_id, "reason": reason }))
        );
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body, _) = send!(
        app,
        test::TestRequest::get().uri("/api/admin/reports?status=pending").cookie(admin.clone())
    );
    assert_eq!(status, StatusCode::OK);
    let priorities: Vec<&str> = body["reports"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["priority"].as_str().unwrap())
        .collect();
    assert_eq!(priorities, vec!["urgent", "high", "low"]);
    assert_eq!(body["stats"]["urgentReports"], 1);
    let urgent_id = body["reports"][0]["id"].as_str().unwrap().to_string();
    let low_id = body["reports"][2]["id"].as_str().unwrap().to_string();

    let review = json!({ "reportId": urgent_id, "action": "resolve", "notes": "reached out" });
    let (status, body, _) = send!(
        app,
        test::TestRequest::post().uri("/api/admin/reports/review").cookie(admin.clone()).set_json(&review)
    );
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["report"]["status"], "resolved");

    let (status, body, _) = send!(
        app,
        test::TestRequest::post().uri("/api/admin/reports/review").cookie(admin.clone()).set_json(&review)
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Report has already been reviewed");

    let (status, body, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/admin/reports/bulk-resolve")
            .cookie(admin.clone())
            .set_json(json!({ "reportIds": [low_id, urgent_id, "missing"] }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], 1);
    assert_eq!(body["failed"], 2);

    let (_, body, _) = send!(app, test::TestRequest::get().uri("/api/admin/stats").cookie(admin.clone()));
    assert_eq!(body["stats"]["reports"]["totalReports"], 3);
    assert_eq!(body["stats"]["reports"]["resolvedReports"], 2);
    assert_eq!(body["stats"]["users"]["adminUsers"], 1);
    assert_eq!(body["stats"]["posts"]["totalPosts"], 1);

    let (_, body, _) = send!(
        app,
        test::TestRequest::get()
            .uri(&format!("/api/admin/posts/{}/reports", post_id))
            .cookie(admin.clone())
    );
    assert_eq!(body["reports"].as_array().unwrap().len(), 3);

    let (status, _, _) = send!(
        app,
        test::TestRequest::delete().uri(&format!("/api/admin/posts/{}", post_id)).cookie(admin)
    );
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send!(app, test::TestRequest::get().uri(&format!("/api/posts/{}", post_id)));
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn deactivated_users_lose_their_session() {
    let (_dir, data) = open_state();
    seed_admin(&data);
    let app = test_app!(data);
    let member = register!(app, "member@example.com");
    let admin = login_admin!(app);

    let (status, body, _) = send!(app, test::TestRequest::get().uri("/api/auth/me").cookie(member.clone()));
    assert_eq!(status, StatusCode::OK);
    let member_id = body["user"]["id"].as_str().unwrap().to_string();
    assert!(body["user"].get("passwordHash").is_none());

    let (status, body, _) = send!(
        app,
        test::TestRequest::post()
            .uri(&format!("/api/admin/users/{}/deactivate", member_id))
            .cookie(admin.clone())
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["isActive"], false);

    let (status, _, _) = send!(app, test::TestRequest::get().uri("/api/auth/me").cookie(member));
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "member@example.com", "password": "secret1" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Account is deactivated");

    let (_, body, _) = send!(app, test::TestRequest::get().uri("/api/admin/users").cookie(admin));
    assert_eq!(body["stats"]["totalUsers"], 2);
    assert_eq!(body["stats"]["activeUsers"], 1);
}

#[actix_web::test]
async fn password_reset_round_trip() {
    let (_dir, data) = open_state();
    let app = test_app!(data);
    register!(app, "forgetful@example.com");

    let (status, unknown, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/forgot-password")
            .set_json(json!({ "email": "nobody@example.com" }))
    );
    assert_eq!(status, StatusCode::OK);
    let (status, known, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/forgot-password")
            .set_json(json!({ "email": "forgetful@example.com" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unknown, known);

    // The HTTP response never carries the token; issue one directly.
    let token = account_helpers::forgot_password(
        data.users.as_ref(),
        "forgetful@example.com",
        Duration::hours(1),
        "http://localhost:3000",
        Utc::now(),
        &mut rand::thread_rng(),
    )
    .unwrap()
    .unwrap();

    let reset = json!({ "token": token.token, "newPassword": "brandnew", "confirmPassword": "brandnew" });
    let (status, body, _) = send!(app, test::TestRequest::post().uri("/api/auth/reset-password").set_json(&reset));
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, body, _) = send!(app, test::TestRequest::post().uri("/api/auth/reset-password").set_json(&reset));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid or expired reset token");

    let (status, _, cookie) = send!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "forgetful@example.com", "password": "brandnew" }))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send!(
        app,
        test::TestRequest::post().uri("/api/auth/logout").cookie(cookie.unwrap())
    );
    assert_eq!(status, StatusCode::OK);
}
