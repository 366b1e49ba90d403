mod common;

use std::collections::HashSet;
use std::sync::atomic::Ordering;

use axum::{body::Body, http::StatusCode, http::header};
use common::{FakeGenerator, request, spawn_app, spawn_app_with};
use http_body_util::BodyExt;
use insurecontent::domain::{AgentId, InsuranceFocus};
use insurecontent::services::{ContentError, GenerateRequest};
use serde_json::json;
use tower::ServiceExt;

fn week_request(week_start: &str) -> GenerateRequest {
    GenerateRequest {
        insurance_types: vec!["mortgage_protection".to_string(), "annuities".to_string()],
        tone: Some("serious".to_string()),
        additional_instructions: Some("Mention the spring open house".to_string()),
        week_start: Some(week_start.to_string()),
    }
}

#[tokio::test]
async fn test_concurrent_generation_persists_one_schedule() {
    let app = spawn_app_with(FakeGenerator::with_barrier(2)).await;
    let (_, id) = app.register("race@example.com").await;
    let agent_id = AgentId::new(id);
    let service = app.state.shared.content_service.clone();

    // Both requests pass the idempotency check before either writes.
    let results = futures::future::join_all(
        (0..2).map(|_| service.generate(agent_id, week_request("2031-03-03"))),
    )
    .await;

    let outcomes: Vec<_> = results.into_iter().map(Result::unwrap).collect();
    assert_eq!(app.generator.completions(), 2);
    assert_eq!(outcomes.iter().filter(|o| o.created).count(), 1);
    assert_eq!(outcomes[0].schedule.id, outcomes[1].schedule.id);
    assert_eq!(outcomes[0].schedule.posts.len(), 7);

    let schedules = service.list(agent_id).await.unwrap();
    assert_eq!(schedules.len(), 1);

    // Only the winning request is billed.
    let usage = app.state.shared.usage_service.summary(agent_id).await.unwrap();
    assert_eq!(usage.total_calls, 1);
}

#[tokio::test]
async fn test_upstream_failure_writes_nothing() {
    let app = spawn_app().await;
    let (cookie, id) = app.register("outage@example.com").await;
    app.generator.fail_completion.store(true, Ordering::SeqCst);

    let err = app
        .state
        .shared
        .content_service
        .generate(AgentId::new(id), week_request("2031-03-10"))
        .await
        .unwrap_err();
    assert!(matches!(err, ContentError::Upstream(_)));

    let (status, body) = app
        .post_json(
            "/api/content/generate",
            Some(&cookie),
            &json!({"insurance_types": ["annuities"], "week_start": "2031-03-10"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "upstream_generation_error");

    let (_, body) = app.get("/api/content/schedules", Some(&cookie)).await;
    assert!(body["data"].as_array().unwrap().is_empty());
    let (_, body) = app.get("/api/usage", Some(&cookie)).await;
    assert_eq!(body["data"]["total_calls"], 0);

    // The same week can be generated once the provider recovers.
    app.generator.fail_completion.store(false, Ordering::SeqCst);
    let outcome = app
        .state
        .shared
        .content_service
        .generate(AgentId::new(id), week_request("2031-03-10"))
        .await
        .unwrap();
    assert!(outcome.created);
}

#[tokio::test]
async fn test_garbage_response_yields_full_week() {
    let app = spawn_app().await;
    let (_, id) = app.register("garbage@example.com").await;
    app.generator
        .respond_with("Sorry, I can only answer questions about the weather.")
        .await;

    let outcome = app
        .state
        .shared
        .content_service
        .generate(AgentId::new(id), week_request("2031-03-17"))
        .await
        .unwrap();

    let posts = &outcome.schedule.posts;
    assert_eq!(posts.len(), 7);
    let requested = [InsuranceFocus::MortgageProtection, InsuranceFocus::Annuities];
    for (index, post) in posts.iter().enumerate() {
        assert_eq!(post.day, i32::try_from(index + 1).unwrap());
        assert!(!post.post_text.is_empty());
        assert!(!post.hashtags.is_empty());
        assert!(post.hashtags.iter().all(|tag| tag.starts_with('#')));
        assert!(requested.contains(&post.insurance_focus.unwrap()));
    }
    assert_eq!(posts[0].post_date.to_string(), "2031-03-17");
    assert_eq!(posts[6].post_date.to_string(), "2031-03-23");
}

#[tokio::test]
async fn test_short_response_is_padded_in_order() {
    let app = spawn_app().await;
    let (_, id) = app.register("short@example.com").await;
    app.generator
        .respond_with(
            r##"Here you go: [{"post_text": "Only one", "hashtags": "#Mortgage ##Safety"}] Enjoy!"##,
        )
        .await;

    let outcome = app
        .state
        .shared
        .content_service
        .generate(AgentId::new(id), week_request("2031-03-24"))
        .await
        .unwrap();

    let posts = &outcome.schedule.posts;
    assert_eq!(posts.len(), 7);
    assert_eq!(posts[0].post_text, "Only one");
    assert_eq!(posts[0].hashtags, vec!["#Mortgage", "#Safety"]);
    assert!(posts[1..].iter().all(|post| !post.post_text.is_empty()));
}

#[tokio::test]
async fn test_current_week_reports_bounds_when_missing() {
    let app = spawn_app().await;
    let (cookie, _) = app.register("current@example.com").await;

    let (status, body) = app.get("/api/content/current-week", Some(&cookie)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains(" to "));

    let (status, _) = app
        .post_json(
            "/api/content/generate",
            Some(&cookie),
            &json!({"insurance_types": ["final_expense"]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/content/current-week", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["posts"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_image_batch_tolerates_partial_failure() {
    let app = spawn_app().await;
    let (cookie, _) = app.register("images@example.com").await;
    app.generator
        .failing_image_calls
        .lock()
        .await
        .extend(HashSet::from([2, 5]));

    let (_, body) = app
        .post_json(
            "/api/content/generate",
            Some(&cookie),
            &json!({"insurance_types": ["index_universal_life"], "week_start": "2031-04-07"}),
        )
        .await;
    let schedule_id = body["data"]["schedule"]["id"].as_i64().unwrap();
    let first_post = body["data"]["schedule"]["posts"][0]["id"].as_i64().unwrap();

    let (status, body) = app
        .post_json(
            &format!("/api/images/generate-all/{schedule_id}"),
            Some(&cookie),
            &json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["generated"].as_array().unwrap().len(), 5);
    assert_eq!(body["data"]["failures"].as_array().unwrap().len(), 2);
    let total_cost = body["data"]["total_cost"].as_f64().unwrap();
    assert!((total_cost - 0.2).abs() < 1e-9);

    // Only the two failed posts are retried.
    let (_, body) = app
        .post_json(
            &format!("/api/images/generate-all/{schedule_id}"),
            Some(&cookie),
            &json!({}),
        )
        .await;
    assert_eq!(body["data"]["generated"].as_array().unwrap().len(), 2);
    assert_eq!(app.generator.images(), 9);

    // Generating an existing image is a no-op.
    let (status, body) = app
        .post_json(
            &format!("/api/images/generate/{first_post}"),
            Some(&cookie),
            &json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["generated"], false);
    assert_eq!(app.generator.images(), 9);

    let (status, body) = app
        .post_json(
            &format!("/api/images/regenerate/{first_post}"),
            Some(&cookie),
            &json!({"image_description": "A red car in the rain"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["generated"], true);
    assert_eq!(body["data"]["post"]["image_description"], "A red car in the rain");

    let (_, usage) = app.get("/api/usage", Some(&cookie)).await;
    assert_eq!(usage["data"]["total_calls"], 9);
    assert_eq!(usage["data"]["recent"][0]["endpoint"], "regenerate_image");
}

#[tokio::test]
async fn test_image_download_sets_attachment_headers() {
    let app = spawn_app().await;
    let (cookie, _) = app.register("download@example.com").await;

    let (_, body) = app
        .post_json(
            "/api/content/generate",
            Some(&cookie),
            &json!({"insurance_types": ["health_insurance"], "week_start": "2031-05-05"}),
        )
        .await;
    let post_id = body["data"]["schedule"]["posts"][2]["id"].as_i64().unwrap();
    let uri = format!("/api/images/download/{post_id}");

    let (status, body) = app.get(&uri, Some(&cookie)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    app.post_json(
        &format!("/api/images/generate/{post_id}"),
        Some(&cookie),
        &json!({}),
    )
    .await;

    let response = app
        .router
        .clone()
        .oneshot(request("GET", &uri, Some(&cookie), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"post_{post_id}_20310507.png\"").as_str()
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[1..4], b"PNG");
}
