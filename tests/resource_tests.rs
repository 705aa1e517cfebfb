mod common;

use reqwest::StatusCode;
use serde_json::json;

use humanika::models::ActivityType;

const MISSING_ID: &str = "0191f3a4-6b1e-7c2d-9e8f-0a1b2c3d4e5f";

// ── Generic CRUD contract ───────────────────────────────────────

#[tokio::test]
async fn create_with_blank_name_is_rejected() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let (body, status) = app
        .post_auth("/api/event/category", &token, &json!({ "name": "" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Name is required" }));

    // Missing and whitespace-only names fail the same way.
    let (body, status) = app.post_auth("/api/event/category", &token, &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Name is required");
    let (_, status) = app
        .post_auth("/api/event/category", &token, &json!({ "name": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (list, _) = app.get("/api/event/category").await;
    assert_eq!(list, json!([]));
    assert!(app.logs_for("EventCategory").await.is_empty());
}

#[tokio::test]
async fn create_returns_record_and_logs_once() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let (body, status) = app
        .post_auth("/api/event/category", &token, &json!({ "name": "Seminar" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Seminar");
    let id = body["id"].as_str().expect("id should be a string");
    assert!(body["createdAt"].is_string());
    assert!(body["updatedAt"].is_string());

    let logs = app.logs_for("EventCategory").await;
    assert_eq!(logs.len(), 1);
    let entry = &logs[0];
    assert_eq!(entry.activity_type, ActivityType::Create);
    assert_eq!(entry.entity_id.map(|e| e.to_string()).as_deref(), Some(id));
    assert!(entry.user_id.is_some());
    assert_eq!(entry.description, "Created event category: Seminar");
    let metadata = entry.metadata.as_ref().unwrap();
    assert_eq!(metadata["newData"]["name"], "Seminar");
}

#[tokio::test]
async fn unauthenticated_writes_are_rejected_without_side_effects() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;
    let existing = app
        .create("/api/event/category", &token, &json!({ "name": "Seminar" }))
        .await;
    let id = existing["id"].as_str().unwrap();
    let before = app.logs().await.len();

    let (body, status) = app
        .post("/api/event/category", &json!({ "name": "Workshop" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing authentication token");

    let resp = app
        .client
        .put(app.url(&format!("/api/event/category/{id}")))
        .json(&json!({ "name": "Renamed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .client
        .delete(app.url(&format!("/api/event/category/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let (list, _) = app.get("/api/event/category").await;
    let names: Vec<_> = list.as_array().unwrap().iter().map(|c| c["name"].clone()).collect();
    assert_eq!(names, vec![json!("Seminar")]);
    assert_eq!(app.logs().await.len(), before);
}

#[tokio::test]
async fn get_update_and_delete_round() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let created = app
        .create(
            "/api/event/category",
            &token,
            &json!({ "name": "Seminar", "description": "Talks" }),
        )
        .await;
    let id = created["id"].as_str().unwrap();
    let path = format!("/api/event/category/{id}");

    let (fetched, status) = app.get(&path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["description"], "Talks");

    let (updated, status) = app
        .put_auth(&path, &token, &json!({ "name": "Seminars" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Seminars");
    assert_eq!(updated["description"], "Talks");
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["createdAt"], created["createdAt"]);

    let (body, status) = app.delete_auth(&path, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event category deleted");

    let (body, status) = app.get(&path).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Event category not found");

    let logs = app.logs_for("EventCategory").await;
    let kinds: Vec<_> = logs.iter().map(|e| e.activity_type).collect();
    assert_eq!(
        kinds,
        vec![ActivityType::Create, ActivityType::Update, ActivityType::Delete]
    );
    let update_meta = logs[1].metadata.as_ref().unwrap();
    assert_eq!(update_meta["oldData"]["name"], "Seminar");
    assert_eq!(update_meta["newData"]["name"], "Seminars");
}

#[tokio::test]
async fn update_with_blank_field_is_rejected() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;
    let created = app
        .create("/api/event/category", &token, &json!({ "name": "Seminar" }))
        .await;
    let id = created["id"].as_str().unwrap();

    let (body, status) = app
        .put_auth(&format!("/api/event/category/{id}"), &token, &json!({ "name": " " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Name is required");

    let (fetched, _) = app.get(&format!("/api/event/category/{id}")).await;
    assert_eq!(fetched["name"], "Seminar");
}

#[tokio::test]
async fn unknown_ids_yield_not_found_without_logging() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    for id in [MISSING_ID, "not-a-uuid"] {
        let path = format!("/api/event/category/{id}");

        let (body, status) = app.put_auth(&path, &token, &json!({ "name": "X" })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Event category not found");

        let (_, status) = app.delete_auth(&path, &token).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    assert!(app.logs_for("EventCategory").await.is_empty());
}

#[tokio::test]
async fn second_delete_is_not_found() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;
    let created = app
        .create("/api/article/category", &token, &json!({ "name": "News" }))
        .await;
    let path = format!("/api/article/category/{}", created["id"].as_str().unwrap());

    let (_, status) = app.delete_auth(&path, &token).await;
    assert_eq!(status, StatusCode::OK);
    let (_, status) = app.delete_auth(&path, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let deletes = app
        .logs_for("ArticleCategory")
        .await
        .into_iter()
        .filter(|e| e.activity_type == ActivityType::Delete)
        .count();
    assert_eq!(deletes, 1);
}

#[tokio::test]
async fn duplicate_names_conflict() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    app.create("/api/document/type", &token, &json!({ "name": "Decree" }))
        .await;
    let (body, status) = app
        .post_auth("/api/document/type", &token, &json!({ "name": "  decree " }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Document type with this name already exists");

    // The same name is fine under a different entity type.
    app.create("/api/event/category", &token, &json!({ "name": "Decree" }))
        .await;

    // Renaming onto an existing name also conflicts.
    let other = app
        .create("/api/document/type", &token, &json!({ "name": "Report" }))
        .await;
    let (_, status) = app
        .put_auth(
            &format!("/api/document/type/{}", other["id"].as_str().unwrap()),
            &token,
            &json!({ "name": "DECREE" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn failing_activity_sink_does_not_affect_responses() {
    let app = common::spawn_app_with_failing_logger().await;
    let token = app.bootstrap().await;

    let created = app
        .create("/api/event/category", &token, &json!({ "name": "Seminar" }))
        .await;
    assert_eq!(created["name"], "Seminar");
    let path = format!("/api/event/category/{}", created["id"].as_str().unwrap());

    let (fetched, status) = app.get_auth(&path, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (updated, status) = app.put_auth(&path, &token, &json!({ "name": "Talks" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["name"], "Talks");
    assert_eq!(updated["createdAt"], created["createdAt"]);
    let (fetched, _) = app.get_auth(&path, &token).await;
    assert_eq!(fetched, updated);

    let (deleted, status) = app.delete_auth(&path, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({ "message": "Event category deleted" }));

    // Nothing reached the in-memory store; the sink swallowed every entry.
    assert!(app.logs().await.is_empty());
}

// ── Request bodies ──────────────────────────────────────────────

#[tokio::test]
async fn null_required_fields_read_as_missing() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let (body, status) = app
        .post_auth("/api/event/category", &token, &json!({ "name": null }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Name is required" }));

    let (body, status) = app
        .post_auth(
            "/api/letter",
            &token,
            &json!({ "number": "001/HMK/2025", "subject": null }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Subject is required");

    assert!(app.logs().await.iter().all(|e| e.entity_type == "User"));
}

#[tokio::test]
async fn malformed_bodies_use_error_shape() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let (body, status) = app
        .post_raw("/api/event/category", &token, "application/json", "{not json")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Request body is not valid JSON");

    let (body, status) = app
        .post_raw("/api/event/category", &token, "text/plain", r#"{"name":"Seminar"}"#)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Expected a JSON request body");

    // Wrong types are still a 400 with a JSON error, never a 422.
    let (body, status) = app
        .post_auth("/api/finance", &token, &json!({ "description": "Dues", "amount": "lots" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (body, status) = app.get_auth("/api/event?page=abc", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (list, _) = app.get("/api/event/category").await;
    assert_eq!(list, json!([]));
}

// ── Access policy ───────────────────────────────────────────────

#[tokio::test]
async fn public_resources_are_readable_anonymously() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;
    app.create("/api/document/type", &token, &json!({ "name": "Decree" }))
        .await;

    let (body, status) = app.get("/api/document/type").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Decree");

    // An invalid token on a public read is treated as anonymous.
    let (_, status) = app.get_auth("/api/document/type", "garbage").await;
    assert_eq!(status, StatusCode::OK);

    for path in ["/api/document", "/api/finance", "/api/letter", "/api/contact", "/api/work-program"] {
        let (_, status) = app.get(path).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path} should be private");
        let (_, status) = app.get_auth(path, &token).await;
        assert_eq!(status, StatusCode::OK, "{path} should be readable when signed in");
    }
}

#[tokio::test]
async fn public_reads_follow_configuration() {
    let mut config = common::test_config();
    config.public_reads = Some(vec!["document".to_string()]);
    let app = common::spawn_app_with_config(config).await;
    let token = app.bootstrap().await;

    let (_, status) = app.get("/api/document/type").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (_, status) = app.get("/api/document").await;
    assert_eq!(status, StatusCode::OK);
    let (_, status) = app.get_auth("/api/document/type", &token).await;
    assert_eq!(status, StatusCode::OK);
}

// ── Listing ─────────────────────────────────────────────────────

#[tokio::test]
async fn list_supports_search_filters_and_paging() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let period = app
        .create("/api/period", &token, &json!({ "name": "2025" }))
        .await;
    let period_id = period["id"].as_str().unwrap();

    app.create(
        "/api/event",
        &token,
        &json!({ "title": "Leadership Seminar", "periodId": period_id }),
    )
    .await;
    app.create("/api/event", &token, &json!({ "title": "Charity Run" }))
        .await;
    app.create(
        "/api/event",
        &token,
        &json!({ "title": "Coding Seminar", "location": "Hall B", "periodId": period_id }),
    )
    .await;

    let (body, _) = app.get("/api/event?search=seminar").await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (body, _) = app.get("/api/event?search=hall").await;
    assert_eq!(body[0]["title"], "Coding Seminar");

    let (body, _) = app.get(&format!("/api/event?periodId={period_id}")).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (body, _) = app.get("/api/event?limit=2").await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    // Newest first.
    assert_eq!(body[0]["title"], "Coding Seminar");

    let (body, _) = app.get("/api/event?limit=2&page=2").await;
    let page: Vec<_> = body.as_array().unwrap().iter().map(|e| e["title"].clone()).collect();
    assert_eq!(page, vec![json!("Leadership Seminar")]);
}

#[tokio::test]
async fn categories_are_listed_by_name() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    for name in ["workshop", "Seminar", "Conference"] {
        app.create("/api/event/category", &token, &json!({ "name": name }))
            .await;
    }

    let (body, _) = app.get("/api/event/category").await;
    let names: Vec<_> = body.as_array().unwrap().iter().map(|c| c["name"].clone()).collect();
    assert_eq!(names, vec![json!("Conference"), json!("Seminar"), json!("workshop")]);
}

// ── Period ──────────────────────────────────────────────────────

#[tokio::test]
async fn period_dates_are_validated() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let (body, status) = app
        .post_auth(
            "/api/period",
            &token,
            &json!({ "name": "2025", "startDate": "2025-07-01", "endDate": "2025-01-01" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "End date must not be before start date");
}

#[tokio::test]
async fn period_update_is_checked_against_stored_dates() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let period = app
        .create(
            "/api/period",
            &token,
            &json!({ "name": "2025", "startDate": "2025-03-01", "endDate": "2025-06-01" }),
        )
        .await;
    let path = format!("/api/period/{}", period["id"].as_str().unwrap());

    let (body, status) = app
        .put_auth(&path, &token, &json!({ "endDate": "2025-01-01" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "End date must not be before start date");

    let (stored, _) = app.get(&path).await;
    assert_eq!(stored["endDate"], "2025-06-01");

    let (body, status) = app
        .put_auth(&path, &token, &json!({ "startDate": "2025-07-01" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "End date must not be before start date");

    let (updated, status) = app
        .put_auth(&path, &token, &json!({ "endDate": "2025-12-31" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["startDate"], "2025-03-01");
    assert_eq!(updated["endDate"], "2025-12-31");

    let updates = app
        .logs_for("Period")
        .await
        .into_iter()
        .filter(|e| e.activity_type == ActivityType::Update)
        .count();
    assert_eq!(updates, 1);
}

#[tokio::test]
async fn event_update_is_checked_against_stored_dates() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let event = app
        .create(
            "/api/event",
            &token,
            &json!({ "title": "Gathering", "startDate": "2025-05-10", "endDate": "2025-05-12" }),
        )
        .await;
    let path = format!("/api/event/{}", event["id"].as_str().unwrap());

    let (body, status) = app
        .put_auth(&path, &token, &json!({ "endDate": "2025-05-01" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "End date must not be before start date");
}

#[tokio::test]
async fn period_reorder_updates_all_and_logs_once() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let mut ids = Vec::new();
    for (i, name) in ["2023", "2024", "2025"].iter().enumerate() {
        let p = app
            .create("/api/period", &token, &json!({ "name": name, "order": i }))
            .await;
        ids.push(p["id"].as_str().unwrap().to_string());
    }

    let (body, status) = app
        .put_auth(
            "/api/period/reorder",
            &token,
            &json!({ "items": [
                { "id": ids[2], "order": 0 },
                { "id": ids[1], "order": 1 },
                { "id": ids[0], "order": 2 },
            ] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (list, _) = app.get("/api/period").await;
    let names: Vec<_> = list.as_array().unwrap().iter().map(|p| p["name"].clone()).collect();
    assert_eq!(names, vec![json!("2025"), json!("2024"), json!("2023")]);

    let updates = app
        .logs_for("Period")
        .await
        .into_iter()
        .filter(|e| e.activity_type == ActivityType::Update)
        .collect::<Vec<_>>();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].description, "Reordered 3 periods");
}

#[tokio::test]
async fn period_reorder_rejects_empty_and_unknown_items() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;
    let period = app
        .create("/api/period", &token, &json!({ "name": "2025", "order": 5 }))
        .await;
    let id = period["id"].as_str().unwrap();

    let (body, status) = app
        .put_auth("/api/period/reorder", &token, &json!({ "items": [] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Items are required");

    let (body, status) = app
        .put_auth(
            "/api/period/reorder",
            &token,
            &json!({ "items": [{ "id": id, "order": 0 }, { "id": MISSING_ID, "order": 1 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Period not found");

    // Nothing was written.
    let (fetched, _) = app.get(&format!("/api/period/{id}")).await;
    assert_eq!(fetched["order"], 5);

    let resp = app
        .client
        .put(app.url("/api/period/reorder"))
        .json(&json!({ "items": [{ "id": id, "order": 1 }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ── Article ─────────────────────────────────────────────────────

#[tokio::test]
async fn article_publishing_sets_timestamp_once() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let article = app
        .create("/api/article", &token, &json!({ "title": "Hello" }))
        .await;
    assert_eq!(article["status"], "draft");
    assert!(article["publishedAt"].is_null());
    let path = format!("/api/article/{}", article["id"].as_str().unwrap());

    let (published, _) = app
        .put_auth(&path, &token, &json!({ "status": "published" }))
        .await;
    assert!(published["publishedAt"].is_string());

    let (again, _) = app
        .put_auth(&path, &token, &json!({ "title": "Hello again", "status": "published" }))
        .await;
    assert_eq!(again["publishedAt"], published["publishedAt"]);

    let (body, status) = app
        .put_auth(&path, &token, &json!({ "status": "archived" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Status must be one of: draft, published");
}

// ── Finance ─────────────────────────────────────────────────────

#[tokio::test]
async fn finance_amount_must_be_positive() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let (body, status) = app
        .post_auth(
            "/api/finance",
            &token,
            &json!({ "description": "Dues", "amount": 0, "type": "income" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Amount must be greater than zero");

    let (body, status) = app
        .post_auth("/api/finance", &token, &json!({ "amount": 10, "type": "income" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Description is required");
}

#[tokio::test]
async fn finance_summary_totals_by_period() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let category = app
        .create(
            "/api/finance/category",
            &token,
            &json!({ "name": "Dues", "type": "income" }),
        )
        .await;
    assert_eq!(category["type"], "income");

    for (description, amount, kind, period) in [
        ("Member dues", 100.0, "income", "p1"),
        ("Snacks", 30.5, "expense", "p1"),
        ("Sponsorship", 50.0, "income", "p2"),
    ] {
        app.create(
            "/api/finance",
            &token,
            &json!({ "description": description, "amount": amount, "type": kind, "periodId": period }),
        )
        .await;
    }

    let (_, status) = app.get("/api/finance/summary").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (body, status) = app.get_auth("/api/finance/summary?periodId=p1", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["income"].as_f64(), Some(100.0));
    assert_eq!(body["expense"].as_f64(), Some(30.5));
    assert_eq!(body["balance"].as_f64(), Some(69.5));
    assert_eq!(body["byType"], json!({ "expense": 1, "income": 1 }));

    let (body, _) = app.get_auth("/api/finance/summary", &token).await;
    assert_eq!(body["income"].as_f64(), Some(150.0));
    assert_eq!(body["byType"]["income"], 2);
}

// ── Letter ──────────────────────────────────────────────────────

#[tokio::test]
async fn letter_numbers_are_unique() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let (body, status) = app
        .post_auth("/api/letter", &token, &json!({ "number": "001/HMK/2025" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Subject is required");

    app.create(
        "/api/letter",
        &token,
        &json!({ "number": "001/HMK/2025", "subject": "Invitation" }),
    )
    .await;
    let (body, status) = app
        .post_auth(
            "/api/letter",
            &token,
            &json!({ "number": "001/hmk/2025", "subject": "Other" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Letter with this number already exists");
}

#[tokio::test]
async fn letter_verification() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let letter = app
        .create(
            "/api/letter",
            &token,
            &json!({ "number": "002/HMK/2025", "subject": "Budget", "type": "outgoing" }),
        )
        .await;
    assert_eq!(letter["status"], "pending");
    let id = letter["id"].as_str().unwrap();
    let path = format!("/api/letter/{id}/verify");

    let resp = app.client.post(app.url(&path)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let (verified, status) = app.post_auth(&path, &token, &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["status"], "verified");
    assert!(verified["verifiedAt"].is_string());
    assert!(verified["verifiedBy"].is_string());

    let (body, status) = app.post_auth(&path, &token, &json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Letter is already verified");

    let (_, status) = app
        .post_auth(&format!("/api/letter/{MISSING_ID}/verify"), &token, &json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let verifies: Vec<_> = app
        .logs_for("Letter")
        .await
        .into_iter()
        .filter(|e| e.activity_type == ActivityType::Verify)
        .collect();
    assert_eq!(verifies.len(), 1);
    assert_eq!(verifies[0].description, "Verified letter: 002/HMK/2025 - Budget");
}

// ── Structure & Gallery ─────────────────────────────────────────

#[tokio::test]
async fn structure_requires_position_and_sorts_by_order() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let (body, status) = app
        .post_auth("/api/structure", &token, &json!({ "name": "Sari" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Position is required");

    app.create(
        "/api/structure",
        &token,
        &json!({ "position": "Secretary", "name": "Sari", "order": 2 }),
    )
    .await;
    app.create(
        "/api/structure",
        &token,
        &json!({ "position": "Chair", "name": "Andi", "order": 1 }),
    )
    .await;

    let (body, status) = app.get("/api/structure").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["position"], "Chair");
    assert_eq!(body[1]["position"], "Secretary");

    let created = app
        .logs_for("Structure")
        .await
        .into_iter()
        .map(|e| e.description)
        .collect::<Vec<_>>();
    assert_eq!(
        created,
        vec![
            "Created structure: Secretary: Sari".to_string(),
            "Created structure: Chair: Andi".to_string()
        ]
    );
}

#[tokio::test]
async fn gallery_drops_blank_image_urls() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let gallery = app
        .create(
            "/api/gallery",
            &token,
            &json!({ "title": "Retreat", "imageUrls": ["https://cdn/a.jpg", " ", ""] }),
        )
        .await;
    assert_eq!(gallery["imageUrls"], json!(["https://cdn/a.jpg"]));
}

// ── Contact form ────────────────────────────────────────────────

async fn submit_contact(
    app: &common::TestApp,
    ip: &str,
    body: &serde_json::Value,
) -> (serde_json::Value, StatusCode) {
    let resp = app
        .client
        .post(app.url("/api/contact/submit"))
        .header("x-forwarded-for", format!("{ip}, 10.0.0.1"))
        .header("user-agent", "humanika-tests")
        .json(body)
        .send()
        .await
        .unwrap();
    let status = resp.status();
    (resp.json().await.unwrap_or(json!(null)), status)
}

#[tokio::test]
async fn contact_submission_is_stored_and_logged_as_system() {
    let app = common::spawn_app().await;
    let token = app.bootstrap().await;

    let (body, status) = submit_contact(
        &app,
        "203.0.113.9",
        &json!({ "name": "Rina", "email": "rina@example.com", "message": "Hello!" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Message sent");

    let (list, status) = app.get_auth("/api/contact", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["email"], "rina@example.com");
    assert_eq!(list[0]["isRead"], false);

    let logs = app.logs_for("ContactMessage").await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].user_id, None);
    assert_eq!(logs[0].activity_type, ActivityType::Create);
    assert_eq!(logs[0].ip_address, "203.0.113.9");
    assert_eq!(logs[0].user_agent, "humanika-tests");
}

#[tokio::test]
async fn contact_submission_is_validated() {
    let app = common::spawn_app().await;

    let (body, status) = submit_contact(
        &app,
        "203.0.113.10",
        &json!({ "name": "Rina", "email": "rina", "message": "Hello" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email is invalid");

    let (body, status) = submit_contact(
        &app,
        "203.0.113.10",
        &json!({ "name": "Rina", "email": "rina@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Message is required");
}

#[tokio::test]
async fn contact_submission_is_rate_limited_per_client_behind_trusted_proxy() {
    let mut config = common::test_config();
    config.trusted_proxies = vec!["127.0.0.1/32".parse().unwrap()];
    let app = common::spawn_app_with_config(config).await;
    let body = json!({ "name": "Rina", "email": "rina@example.com", "message": "Hi" });

    for _ in 0..5 {
        let (_, status) = submit_contact(&app, "198.51.100.7", &body).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (body_429, status) = submit_contact(&app, "198.51.100.7", &body).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_429["error"], "Too many messages. Please try again later.");

    // Another client behind the same proxy is unaffected.
    let (_, status) = submit_contact(&app, "198.51.100.8", &body).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn contact_rate_limit_ignores_forwarded_for_from_untrusted_peers() {
    let app = common::spawn_app().await;
    let body = json!({ "name": "Rina", "email": "rina@example.com", "message": "Hi" });

    // Rotating the header does not open new buckets for a direct client.
    for i in 0..5 {
        let (_, status) = submit_contact(&app, &format!("10.9.9.{i}"), &body).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (_, status) = submit_contact(&app, "10.9.9.200", &body).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // The audit trail still records the reported address.
    let logs = app.logs_for("ContactMessage").await;
    assert_eq!(logs.len(), 5);
    assert!(logs.iter().any(|e| e.ip_address == "10.9.9.0"));
}
