mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_template_names_are_unique_per_environment() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;

    app.create_template(&admin, "sandbox", "Receipt").await;

    let duplicate = app
        .as_user(
            &admin,
            Some("sandbox"),
            "POST",
            "/api/templates",
            Some(json!({ "name": "Receipt", "subject": "Again" })),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let production = app.create_template(&admin, "production", "Receipt").await;
    assert_eq!(production["environment"], "production");
}

#[tokio::test]
async fn test_template_placeholders_and_preview() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;

    let template = app.create_template(&admin, "sandbox", "Receipt").await;
    assert_eq!(
        template["placeholders"],
        json!([
            { "name": "name", "default_value": "" },
            { "name": "order_id", "default_value": "" }
        ])
    );
    let id = template["id"].as_i64().unwrap();

    let defaults = app
        .as_user(
            &admin,
            None,
            "POST",
            &format!("/api/templates/{id}/placeholders"),
            Some(json!({
                "placeholders": [
                    { "name": "name", "default_value": "customer" },
                    { "name": "unused", "default_value": "x" }
                ]
            })),
        )
        .await;
    assert_eq!(defaults.status, StatusCode::OK, "{:?}", defaults.body);
    assert_eq!(
        defaults.data()["placeholders"],
        json!([
            { "name": "name", "default_value": "customer" },
            { "name": "order_id", "default_value": "" }
        ])
    );

    let preview = app
        .as_user(
            &admin,
            None,
            "POST",
            &format!("/api/templates/{id}/preview"),
            Some(json!({ "data": { "order_id": 7 } })),
        )
        .await;
    assert_eq!(preview.status, StatusCode::OK, "{:?}", preview.body);
    assert_eq!(preview.data()["subject"], "Hello customer");
    assert_eq!(preview.data()["html"], "<p>Your order 7 has shipped.</p>");
}

#[tokio::test]
async fn test_resources_are_private_to_their_owner() {
    let app = TestApp::spawn().await;
    let ada = app.register("ada", "Acme").await;
    let bob = app.register("bob", "Globex").await;

    let template = app.create_template(&ada, "sandbox", "Receipt").await;
    let id = template["id"].as_i64().unwrap();

    let foreign = app
        .as_user(&bob, None, "GET", &format!("/api/templates/{id}"), None)
        .await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);

    let foreign_delete = app
        .as_user(&bob, None, "DELETE", &format!("/api/templates/{id}"), None)
        .await;
    assert_eq!(foreign_delete.status, StatusCode::NOT_FOUND);

    // Bob cannot wire Ada's template into his own event.
    let event = app
        .create_event(&bob, "sandbox", "Stolen", Some(id), None)
        .await;
    assert_eq!(event.status, StatusCode::BAD_REQUEST);

    let listed = app
        .as_user(&bob, None, "GET", "/api/templates", None)
        .await;
    assert_eq!(listed.data(), &json!([]));
}

#[tokio::test]
async fn test_environment_partition_hides_other_side() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;

    let template = app.create_template(&admin, "sandbox", "Receipt").await;
    let id = template["id"].as_i64().unwrap();

    let from_production = app
        .as_user(
            &admin,
            Some("production"),
            "GET",
            &format!("/api/templates/{id}"),
            None,
        )
        .await;
    assert_eq!(from_production.status, StatusCode::NOT_FOUND);

    // A production event cannot point at a sandbox template.
    let event = app
        .create_event(&admin, "production", "Cross Wired", Some(id), None)
        .await;
    assert_eq!(event.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_event_slug_and_update() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;

    let event = app.seed_event(&admin, "sandbox", "  Password Reset! ").await;
    assert_eq!(event["slug"], "password_reset");
    assert_eq!(event["template_name"], "Welcome");
    assert_eq!(event["integration_name"], "Primary SES");

    let id = event["id"].as_i64().unwrap();
    let renamed = app
        .as_user(
            &admin,
            None,
            "PUT",
            &format!("/api/events/definitions/{id}"),
            Some(json!({ "name": "Reset Password", "description": "Sent on request" })),
        )
        .await;
    assert_eq!(renamed.status, StatusCode::OK);
    assert_eq!(renamed.data()["name"], "Reset Password");
    assert_eq!(renamed.data()["slug"], "password_reset");

    let blank = app
        .create_event(&admin, "sandbox", "!!!", None, None)
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let deleted = app
        .as_user(
            &admin,
            None,
            "DELETE",
            &format!("/api/events/definitions/{id}"),
            None,
        )
        .await;
    assert_eq!(deleted.status, StatusCode::OK);

    let gone = app
        .as_user(
            &admin,
            None,
            "GET",
            &format!("/api/events/definitions/{id}"),
            None,
        )
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_integration_credentials_are_write_only() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;

    let integration = app.create_integration(&admin, "sandbox", "Primary SES").await;
    assert_eq!(integration["sender_email"], "noreply@shop.test");
    assert!(integration.get("access_key").is_none());
    assert!(integration.get("secret_key").is_none());
    assert!(integration.get("access_key_encrypted").is_none());

    let id = integration["id"].as_i64().unwrap();
    let updated = app
        .as_user(
            &admin,
            None,
            "PUT",
            &format!("/api/integrations/{id}"),
            Some(json!({ "region": "eu-west-1" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.data()["region"], "eu-west-1");
}

#[tokio::test]
async fn test_brand_components_are_shared_within_organization() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;
    let dev = app.add_member(&admin, "dev@acme.test", "developer").await;
    let outsider = app.register("bob", "Globex").await;

    let created = app
        .as_user(
            &admin,
            None,
            "POST",
            "/api/brand-components",
            Some(json!({
                "name": "Footer",
                "category": "footer",
                "html_content": "<footer>Acme Inc.</footer>",
            })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    assert_eq!(created.data()["editable"], true);
    let id = created.data()["id"].as_i64().unwrap();

    let member_view = app
        .as_user(&dev, None, "GET", "/api/brand-components", None)
        .await;
    let items = member_view.data().as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Footer");
    assert_eq!(items[0]["editable"], false);

    let member_edit = app
        .as_user(
            &dev,
            None,
            "PUT",
            &format!("/api/brand-components/{id}"),
            Some(json!({ "name": "Hijacked" })),
        )
        .await;
    assert_eq!(member_edit.status, StatusCode::NOT_FOUND);

    let outsider_view = app
        .as_user(&outsider, None, "GET", "/api/brand-components", None)
        .await;
    assert_eq!(outsider_view.data(), &json!([]));

    let outsider_get = app
        .as_user(
            &outsider,
            None,
            "GET",
            &format!("/api/brand-components/{id}"),
            None,
        )
        .await;
    assert_eq!(outsider_get.status, StatusCode::NOT_FOUND);
}
