mod common;

use reqwest::StatusCode;
use serde_json::json;

use humanika::models::ActivityType;

// ── Health ──────────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

// ── Registration & Auth ─────────────────────────────────────────

#[tokio::test]
async fn register_bootstrap_admin() {
    let app = common::spawn_app().await;

    let (body, status) = app.register("admin@test.com", "password123", "Admin").await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["token"].is_string());
    assert_eq!(body["user"]["role"], "admin");
    assert_eq!(body["user"]["email"], "admin@test.com");
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn register_rejects_second_user() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    let (body, status) = app.register("other@test.com", "password123", "Other").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("disabled"));
}

#[tokio::test]
async fn register_rejects_short_password() {
    let app = common::spawn_app().await;

    let (body, status) = app.register("admin@test.com", "short", "Admin").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password must be at least 8 characters");
}

#[tokio::test]
async fn login_sets_http_only_session_cookie() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": "admin@test.com", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("auth_token="))
        .expect("auth cookie missing")
        .to_string();
    assert!(cookie.contains("HttpOnly"));

    let body: serde_json::Value = resp.json().await.unwrap();
    let token = body["token"].as_str().unwrap();

    // The cookie alone authenticates.
    let resp = app
        .client
        .get(app.url("/api/auth/me"))
        .header("cookie", format!("auth_token={token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let me: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(me["email"], "admin@test.com");
}

#[tokio::test]
async fn login_records_activity() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    let (body, status) = app.login("ADMIN@test.com", "password123").await;
    assert_eq!(status, StatusCode::OK);

    let logins: Vec<_> = app
        .logs_for("User")
        .await
        .into_iter()
        .filter(|e| e.activity_type == ActivityType::Login)
        .collect();
    assert_eq!(logins.len(), 1);
    assert_eq!(
        logins[0].user_id.map(|id| id.to_string()),
        body["user"]["id"].as_str().map(str::to_string)
    );
}

#[tokio::test]
async fn login_invalid_credentials() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    let (body, status) = app.login("admin@test.com", "wrongpassword").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (_, status) = app.login("nobody@test.com", "password123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_brute_force_protection() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    // 5 bad logins should pass (incrementing counter)
    for _ in 0..5 {
        let (_, status) = app.login("admin@test.com", "wrong").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // 6th should be rate limited, even with the right password
    let (_, status) = app.login("admin@test.com", "password123").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn logout_clears_cookie_and_logs_once() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let resp = app
        .client
        .post(app.url("/api/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cleared = resp
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with("auth_token=;") && v.contains("Max-Age=0"));
    assert!(cleared, "auth cookie was not cleared");

    // Anonymous logout still succeeds but is not logged.
    let resp = app
        .client
        .post(app.url("/api/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let logouts = app
        .logs()
        .await
        .into_iter()
        .filter(|e| e.activity_type == ActivityType::Logout)
        .count();
    assert_eq!(logouts, 1);
}

#[tokio::test]
async fn me_requires_session() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    let (body, status) = app.get("/api/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing authentication token");

    let (body, status) = app.get_auth("/api/auth/me", "invalid-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");
}

// ── Users ───────────────────────────────────────────────────────

#[tokio::test]
async fn users_crud() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let created = app
        .create(
            "/api/users",
            &token,
            &json!({ "name": "Budi", "email": "budi@test.com", "password": "budipass1" }),
        )
        .await;
    assert_eq!(created["role"], "member");
    assert!(created.get("passwordHash").is_none());
    let id = created["id"].as_str().unwrap();

    let (list, status) = app.get_auth("/api/users", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 2);

    let (updated, status) = app
        .put_auth(&format!("/api/users/{id}"), &token, &json!({ "name": "Budi S." }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Budi S.");
    assert_eq!(updated["email"], "budi@test.com");

    let (body, status) = app.delete_auth(&format!("/api/users/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted");

    let (_, status) = app.delete_auth(&format!("/api/users/{id}"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let kinds: Vec<_> = app
        .logs_for("User")
        .await
        .into_iter()
        .filter(|e| e.entity_id.map(|e| e.to_string()).as_deref() == Some(id))
        .map(|e| e.activity_type)
        .collect();
    assert_eq!(
        kinds,
        vec![ActivityType::Create, ActivityType::Update, ActivityType::Delete]
    );
}

#[tokio::test]
async fn users_reject_duplicate_email_and_short_password() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let (body, status) = app
        .post_auth(
            "/api/users",
            &token,
            &json!({ "name": "Dup", "email": "Admin@Test.com", "password": "password123" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "A user with this email already exists");

    let (body, status) = app
        .post_auth(
            "/api/users",
            &token,
            &json!({ "name": "Short", "email": "short@test.com", "password": "1234567" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password must be at least 8 characters");

    let (body, status) = app
        .post_auth(
            "/api/users",
            &token,
            &json!({ "name": "Bad", "email": "not-an-email", "password": "password123" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email is invalid");
}

#[tokio::test]
async fn admin_cannot_delete_self() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let (me, _) = app.get_auth("/api/auth/me", &token).await;
    let id = me["id"].as_str().unwrap();

    let (body, status) = app.delete_auth(&format!("/api/users/{id}"), &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You cannot delete your own account");
}

#[tokio::test]
async fn members_cannot_manage_users() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let member = app.member_token(&admin, "member@test.com").await;

    let (_, status) = app.get_auth("/api/users", &member).await;
    assert_eq!(status, StatusCode::OK);

    let (body, status) = app
        .post_auth(
            "/api/users",
            &member,
            &json!({ "name": "X", "email": "x@test.com", "password": "password123" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin access required");
}

#[tokio::test]
async fn deleted_user_session_loses_write_access() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let member = app.member_token(&admin, "leaver@test.com").await;

    let (users, _) = app.get_auth("/api/users", &admin).await;
    let member_id = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "leaver@test.com")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    let (_, status) = app.delete_auth(&format!("/api/users/{member_id}"), &admin).await;
    assert_eq!(status, StatusCode::OK);

    let (body, status) = app
        .post_auth("/api/event/category", &member, &json!({ "name": "Ghost" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (_, status) = app.get_auth("/api/auth/me", &member).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The stale token reads public data like an anonymous caller.
    let (list, status) = app.get_auth("/api/event/category", &member).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
    assert!(app.logs_for("EventCategory").await.is_empty());
}

#[tokio::test]
async fn demoted_admin_loses_admin_rights_immediately() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;

    let second = app
        .create(
            "/api/users",
            &admin,
            &json!({
                "name": "Deputy",
                "email": "deputy@test.com",
                "password": "deputypass1",
                "role": "admin"
            }),
        )
        .await;
    let (body, status) = app.login("deputy@test.com", "deputypass1").await;
    assert_eq!(status, StatusCode::OK);
    let deputy = body["token"].as_str().unwrap().to_string();

    let (_, status) = app
        .put_auth(
            &format!("/api/users/{}", second["id"].as_str().unwrap()),
            &admin,
            &json!({ "role": "member" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (body, status) = app.get_auth("/api/activity-logs", &deputy).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin access required");
}

// ── Activity logs & dashboard ───────────────────────────────────

#[tokio::test]
async fn activity_logs_are_admin_only_and_filterable() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let member = app.member_token(&admin, "member@test.com").await;

    app.create("/api/event/category", &admin, &json!({ "name": "Seminar" }))
        .await;
    app.create("/api/event/category", &admin, &json!({ "name": "Workshop" }))
        .await;
    app.state.activity.flush().await;

    let (_, status) = app.get_auth("/api/activity-logs", &member).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (body, status) = app
        .get_auth("/api/activity-logs?entityType=EventCategory", &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e["activityType"] == "CREATE"));
    // Newest first.
    assert_eq!(entries[0]["description"], "Created event category: Workshop");

    let (body, _) = app
        .get_auth("/api/activity-logs?entityType=EventCategory&limit=1&page=2", &admin)
        .await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["description"], "Created event category: Seminar");
}

#[tokio::test]
async fn dashboard_counts_records() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    app.create("/api/period", &token, &json!({ "name": "2024/2025" }))
        .await;
    app.create("/api/event", &token, &json!({ "title": "Open House" }))
        .await;
    app.create("/api/event", &token, &json!({ "title": "Orientation" }))
        .await;

    let (_, status) = app.get("/api/dashboard").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (body, status) = app.get_auth("/api/dashboard", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["counts"]["Period"], 1);
    assert_eq!(body["counts"]["Event"], 2);
    assert_eq!(body["counts"]["Letter"], 0);
    assert_eq!(body["users"], 1);
}

// ── Security Headers ────────────────────────────────────────────

#[tokio::test]
async fn security_headers_present() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(
        resp.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
    assert_eq!(
        resp.headers().get("referrer-policy").unwrap(),
        "strict-origin-when-cross-origin"
    );
}

#[tokio::test]
async fn cors_preflight_allows_back_office_origin() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .request(reqwest::Method::OPTIONS, app.url("/api/event"))
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(
        resp.headers().get("access-control-allow-credentials").unwrap(),
        "true"
    );
}
