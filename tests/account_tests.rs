mod common;

use axum::http::StatusCode;
use common::{PASSWORD, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_register_creates_admin_and_session() {
    let app = TestApp::spawn().await;

    let response = app
        .send(
            "POST",
            "/api/auth/register",
            &[],
            Some(json!({
                "username": "ada",
                "email": "Ada@Example.com",
                "password": PASSWORD,
                "password_confirm": PASSWORD,
                "company_name": "Acme",
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    assert_eq!(response.data()["role"], "admin");
    assert_eq!(response.data()["email"], "ada@example.com");
    assert_eq!(response.data()["status"], "active");

    let cookie = response.cookie.expect("register starts a session");
    let me = app.as_user(&cookie, None, "GET", "/api/auth/me", None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.data()["username"], "ada");
    assert!(me.data().get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_rejects_taken_organization_and_bad_input() {
    let app = TestApp::spawn().await;
    app.register("ada", "Acme").await;

    let same_org = app
        .send(
            "POST",
            "/api/auth/register",
            &[],
            Some(json!({
                "username": "eve",
                "email": "eve@example.com",
                "password": PASSWORD,
                "password_confirm": PASSWORD,
                "company_name": "Acme",
            })),
        )
        .await;
    assert_eq!(same_org.status, StatusCode::CONFLICT);

    let mismatch = app
        .send(
            "POST",
            "/api/auth/register",
            &[],
            Some(json!({
                "username": "eve",
                "email": "eve@example.com",
                "password": PASSWORD,
                "password_confirm": "something else entirely",
                "company_name": "Evil Corp",
            })),
        )
        .await;
    assert_eq!(mismatch.status, StatusCode::BAD_REQUEST);
    assert_eq!(mismatch.error(), "Passwords do not match");
}

#[tokio::test]
async fn test_login_and_logout() {
    let app = TestApp::spawn().await;
    app.register("ada", "Acme").await;

    let wrong = app
        .send(
            "POST",
            "/api/auth/login",
            &[],
            Some(json!({ "username": "ada", "password": "not the password" })),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.error(), "Invalid credentials");

    // Email works as a login name too.
    let cookie = app.login("ada@example.com", PASSWORD).await;

    let logout = app
        .as_user(&cookie, None, "POST", "/api/auth/logout", None)
        .await;
    assert_eq!(logout.status, StatusCode::OK);

    let me = app.as_user(&cookie, None, "GET", "/api/auth/me", None).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invitation_flow() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;

    let invited = app
        .as_user(
            &admin,
            None,
            "POST",
            "/api/auth/users/invite",
            Some(json!({
                "first_name": "Grace",
                "last_name": "Hopper",
                "email": "grace@acme.test",
                "role": "developer",
            })),
        )
        .await;
    assert_eq!(invited.status, StatusCode::CREATED, "{:?}", invited.body);
    let user = &invited.data()["user"];
    assert_eq!(user["status"], "invited");
    assert_eq!(user["username"], "grace@acme.test");
    assert_eq!(user["role"], "developer");
    // No platform mailer is configured in tests.
    assert_eq!(invited.data()["warnings"].as_array().unwrap().len(), 1);

    let user_id = user["id"].as_i64().unwrap();

    let early = app
        .send(
            "POST",
            "/api/auth/login",
            &[],
            Some(json!({ "username": "grace@acme.test", "password": PASSWORD })),
        )
        .await;
    assert_eq!(early.status, StatusCode::UNAUTHORIZED);

    let token = app.latest_token(user_id).await;
    let body = json!({
        "token": token,
        "password": PASSWORD,
        "password_confirm": PASSWORD,
    });

    let set = app
        .send("POST", "/api/auth/set-password", &[], Some(body.clone()))
        .await;
    assert_eq!(set.status, StatusCode::OK, "{:?}", set.body);

    let reused = app
        .send("POST", "/api/auth/set-password", &[], Some(body))
        .await;
    assert_eq!(reused.status, StatusCode::BAD_REQUEST);

    app.login("grace@acme.test", PASSWORD).await;

    let listed = app
        .as_user(&admin, None, "GET", "/api/auth/users", None)
        .await;
    let members = listed.data().as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["status"], "active");
}

#[tokio::test]
async fn test_user_management_requires_admin() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;
    let dev = app.add_member(&admin, "dev@acme.test", "developer").await;

    let list = app.as_user(&dev, None, "GET", "/api/auth/users", None).await;
    assert_eq!(list.status, StatusCode::FORBIDDEN);

    let me = app.as_user(&admin, None, "GET", "/api/auth/me", None).await;
    let admin_id = me.data()["id"].as_i64().unwrap();

    let delete_self = app
        .as_user(
            &admin,
            None,
            "DELETE",
            &format!("/api/auth/users/{admin_id}"),
            None,
        )
        .await;
    assert_eq!(delete_self.status, StatusCode::FORBIDDEN);

    let members = app
        .as_user(&admin, None, "GET", "/api/auth/users", None)
        .await;
    let dev_id = members.data()[0]["id"].as_i64().unwrap();

    let promoted = app
        .as_user(
            &admin,
            None,
            "PUT",
            &format!("/api/auth/users/{dev_id}"),
            Some(json!({ "role": "admin", "phone": "555-0100" })),
        )
        .await;
    assert_eq!(promoted.status, StatusCode::OK);
    assert_eq!(promoted.data()["role"], "admin");
    assert_eq!(promoted.data()["phone"], "555-0100");

    let outsider = app.register("bob", "Globex").await;
    let foreign = app
        .as_user(
            &outsider,
            None,
            "DELETE",
            &format!("/api/auth/users/{dev_id}"),
            None,
        )
        .await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);

    let deleted = app
        .as_user(
            &admin,
            None,
            "DELETE",
            &format!("/api/auth/users/{dev_id}"),
            None,
        )
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
}

#[tokio::test]
async fn test_password_reset() {
    let app = TestApp::spawn().await;
    app.register("ada", "Acme").await;

    let unknown = app
        .send(
            "POST",
            "/api/auth/forgot-password",
            &[],
            Some(json!({ "email": "nobody@example.com" })),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::OK);

    let known = app
        .send(
            "POST",
            "/api/auth/forgot-password",
            &[],
            Some(json!({ "email": "ada@example.com" })),
        )
        .await;
    assert_eq!(known.status, StatusCode::OK);
    assert_eq!(known.body, unknown.body);

    let me = app.login("ada", PASSWORD).await;
    let user_id = app
        .as_user(&me, None, "GET", "/api/auth/me", None)
        .await
        .data()["id"]
        .as_i64()
        .unwrap();
    let token = app.latest_token(user_id).await;

    let new_password = "a brand new passphrase";
    let reset = app
        .send(
            "POST",
            "/api/auth/reset-password",
            &[],
            Some(json!({
                "token": token,
                "password": new_password,
                "password_confirm": new_password,
            })),
        )
        .await;
    assert_eq!(reset.status, StatusCode::OK, "{:?}", reset.body);

    let old = app
        .send(
            "POST",
            "/api/auth/login",
            &[],
            Some(json!({ "username": "ada", "password": PASSWORD })),
        )
        .await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);

    app.login("ada", new_password).await;
}

#[tokio::test]
async fn test_deactivated_user_cannot_reset_back_in() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;
    app.add_member(&admin, "dev@acme.test", "developer").await;

    let members = app
        .as_user(&admin, None, "GET", "/api/auth/users", None)
        .await;
    let dev_id = members.data()[0]["id"].as_i64().unwrap();

    let forgot = app
        .send(
            "POST",
            "/api/auth/forgot-password",
            &[],
            Some(json!({ "email": "dev@acme.test" })),
        )
        .await;
    assert_eq!(forgot.status, StatusCode::OK);
    let token = app.latest_token(dev_id).await;

    let deactivated = app
        .as_user(
            &admin,
            None,
            "PUT",
            &format!("/api/auth/users/{dev_id}"),
            Some(json!({ "is_active": false })),
        )
        .await;
    assert_eq!(deactivated.status, StatusCode::OK, "{:?}", deactivated.body);
    assert_eq!(deactivated.data()["status"], "inactive");

    let new_password = "a brand new passphrase";
    let reset = app
        .send(
            "POST",
            "/api/auth/reset-password",
            &[],
            Some(json!({
                "token": token,
                "password": new_password,
                "password_confirm": new_password,
            })),
        )
        .await;
    assert_eq!(reset.status, StatusCode::BAD_REQUEST);
    assert_eq!(reset.error(), "Invalid or expired token");

    for password in [PASSWORD, new_password] {
        let login = app
            .send(
                "POST",
                "/api/auth/login",
                &[],
                Some(json!({ "username": "dev@acme.test", "password": password })),
            )
            .await;
        assert_eq!(login.status, StatusCode::UNAUTHORIZED);
    }

    let listed = app
        .as_user(&admin, None, "GET", "/api/auth/users", None)
        .await;
    assert_eq!(listed.data()[0]["status"], "inactive");
    assert_eq!(listed.data()[0]["is_active"], false);
}

#[tokio::test]
async fn test_reset_token_issued_while_active_dies_with_deactivation() {
    let app = TestApp::spawn().await;
    let admin = app.register("ada", "Acme").await;
    app.add_member(&admin, "dev@acme.test", "developer").await;

    let members = app
        .as_user(&admin, None, "GET", "/api/auth/users", None)
        .await;
    let dev_id = members.data()[0]["id"].as_i64().unwrap();

    app.send(
        "POST",
        "/api/auth/forgot-password",
        &[],
        Some(json!({ "email": "dev@acme.test" })),
    )
    .await;
    let token = app.latest_token(dev_id).await;

    let path = format!("/api/auth/users/{dev_id}");
    app.as_user(&admin, None, "PUT", &path, Some(json!({ "is_active": false })))
        .await;
    let reactivated = app
        .as_user(&admin, None, "PUT", &path, Some(json!({ "is_active": true })))
        .await;
    assert_eq!(reactivated.data()["status"], "active");

    // Reactivation does not revive the token revoked on the way down.
    let reset = app
        .send(
            "POST",
            "/api/auth/reset-password",
            &[],
            Some(json!({
                "token": token,
                "password": "a brand new passphrase",
                "password_confirm": "a brand new passphrase",
            })),
        )
        .await;
    assert_eq!(reset.status, StatusCode::BAD_REQUEST);

    app.login("dev@acme.test", PASSWORD).await;
}

#[tokio::test]
async fn test_sessions_survive_router_rebuild() {
    let mut app = TestApp::spawn().await;
    let cookie = app.register("ada", "Acme").await;

    app.router = xyno::api::router(app.state.clone()).await.unwrap();

    let me = app.as_user(&cookie, None, "GET", "/api/auth/me", None).await;
    assert_eq!(me.status, StatusCode::OK, "{:?}", me.body);
    assert_eq!(me.data()["username"], "ada");
}
