mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_event_promotion_reports_missing_dependencies_then_relinks() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;

    let event = app.seed_event(&admin, "sandbox", "Order Shipped").await;
    let event_id = event["id"].as_i64().unwrap();
    assert_eq!(event["slug"], "order_shipped");

    // Nothing is in production yet: created, both references dropped.
    let first = app
        .as_user(
            &admin,
            None,
            "POST",
            &format!("/api/events/definitions/{event_id}/promote"),
            None,
        )
        .await;
    assert_eq!(first.status, StatusCode::CREATED, "{:?}", first.body);
    assert_eq!(first.data()["environment"], "production");
    assert_eq!(first.data()["slug"], "order_shipped");
    assert!(first.data()["template_id"].is_null());
    assert!(first.data()["integration_id"].is_null());
    assert_eq!(
        first.data()["warnings"],
        json!([
            "Template \"Welcome\" has not been promoted to production yet.",
            "Integration \"Primary SES\" has not been configured for production yet."
        ])
    );

    let template_id = event["template_id"].as_i64().unwrap();
    let integration_id = event["integration_id"].as_i64().unwrap();

    let template = app
        .as_user(
            &admin,
            None,
            "POST",
            &format!("/api/templates/{template_id}/promote"),
            None,
        )
        .await;
    assert_eq!(template.status, StatusCode::CREATED);
    assert_eq!(template.data()["warnings"], json!([]));
    let prod_template_id = template.data()["id"].as_i64().unwrap();
    assert_ne!(prod_template_id, template_id);

    let integration = app
        .as_user(
            &admin,
            None,
            "POST",
            &format!("/api/integrations/{integration_id}/promote"),
            None,
        )
        .await;
    assert_eq!(integration.status, StatusCode::CREATED);
    assert_eq!(integration.data()["is_verified"], false);
    assert!(integration.data().get("access_key_encrypted").is_none());
    let prod_integration_id = integration.data()["id"].as_i64().unwrap();

    // Second promotion updates the same production row and links both.
    let second = app
        .as_user(
            &admin,
            None,
            "POST",
            &format!("/api/events/definitions/{event_id}/promote"),
            None,
        )
        .await;
    assert_eq!(second.status, StatusCode::OK, "{:?}", second.body);
    assert_eq!(second.data()["id"], first.data()["id"]);
    assert_eq!(second.data()["template_id"], prod_template_id);
    assert_eq!(second.data()["integration_id"], prod_integration_id);
    assert_eq!(second.data()["template_name"], "Welcome");
    assert_eq!(second.data()["warnings"], json!([]));

    // Idempotent.
    let third = app
        .as_user(
            &admin,
            None,
            "POST",
            &format!("/api/events/definitions/{event_id}/promote"),
            None,
        )
        .await;
    assert_eq!(third.status, StatusCode::OK);
    assert_eq!(third.data()["id"], second.data()["id"]);
    assert_eq!(third.data()["template_id"], second.data()["template_id"]);
    assert_eq!(third.data()["integration_id"], second.data()["integration_id"]);
    assert_eq!(third.data()["warnings"], json!([]));

    // The sandbox source is untouched.
    let source = app
        .as_user(
            &admin,
            None,
            "GET",
            &format!("/api/events/definitions/{event_id}"),
            None,
        )
        .await;
    assert_eq!(source.data()["environment"], "sandbox");
    assert_eq!(source.data()["template_id"], template_id);

    let production = app
        .as_user(&admin, Some("production"), "GET", "/api/events/definitions", None)
        .await;
    assert_eq!(production.data().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_template_promotion_overwrites_production_copy() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;

    let template = app.create_template(&admin, "sandbox", "Receipt").await;
    let id = template["id"].as_i64().unwrap();

    let created = app
        .as_user(&admin, None, "POST", &format!("/api/templates/{id}/promote"), None)
        .await;
    assert_eq!(created.status, StatusCode::CREATED);

    let edited = app
        .as_user(
            &admin,
            None,
            "PUT",
            &format!("/api/templates/{id}"),
            Some(json!({ "subject": "Receipt for {{order_id}}" })),
        )
        .await;
    assert_eq!(edited.status, StatusCode::OK);
    assert_eq!(
        edited.data()["placeholders"],
        json!([
            { "name": "order_id", "default_value": "" }
        ])
    );

    let updated = app
        .as_user(&admin, None, "POST", &format!("/api/templates/{id}/promote"), None)
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.data()["id"], created.data()["id"]);
    assert_eq!(updated.data()["subject"], "Receipt for {{order_id}}");
    assert_eq!(updated.data()["environment"], "production");

    let listed = app
        .as_user(&admin, Some("production"), "GET", "/api/templates", None)
        .await;
    assert_eq!(listed.data().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_promoting_production_resource_is_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;

    let template = app.create_template(&admin, "production", "Receipt").await;
    assert_eq!(template["environment"], "production");
    let id = template["id"].as_i64().unwrap();

    let response = app
        .as_user(
            &admin,
            Some("production"),
            "POST",
            &format!("/api/templates/{id}/promote"),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), "Only sandbox resources can be promoted");
}

#[tokio::test]
async fn test_developer_is_pinned_to_sandbox() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;
    let dev = app.add_member(&admin, "dev@acme.test", "developer").await;

    // Asking for production still creates a sandbox row.
    let template = app.create_template(&dev, "production", "Receipt").await;
    assert_eq!(template["environment"], "sandbox");

    let listed = app
        .as_user(&dev, Some("production"), "GET", "/api/templates", None)
        .await;
    let items = listed.data().as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["environment"], "sandbox");

    // Developers may still promote their own sandbox work.
    let id = template["id"].as_i64().unwrap();
    let promoted = app
        .as_user(&dev, None, "POST", &format!("/api/templates/{id}/promote"), None)
        .await;
    assert_eq!(promoted.status, StatusCode::CREATED);
    assert_eq!(promoted.data()["environment"], "production");
}
