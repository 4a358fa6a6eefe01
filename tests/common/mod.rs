#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use xyno::api::AppState;
use xyno::config::Config;
use xyno::entities::user_tokens;
use xyno::services::{
    CredentialCipher, DispatchError, LogTransport, SendDispatcher, SendJob, TaskHandle,
};
use xyno::state::SharedState;

pub const PASSWORD: &str = "correct horse battery";

/// Records jobs instead of delivering them.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub jobs: Mutex<Vec<SendJob>>,
}

#[async_trait]
impl SendDispatcher for RecordingDispatcher {
    async fn enqueue(&self, job: SendJob) -> Result<TaskHandle, DispatchError> {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.push(job);
        Ok(TaskHandle {
            task_id: format!("task-{}", jobs.len()),
        })
    }
}

pub fn test_config() -> (Config, PathBuf) {
    let db_path = std::env::temp_dir().join(format!("xyno-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.security.credential_key = CredentialCipher::generate_key();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.server.secure_cookies = false;
    config.delivery.retry_base_delay_secs = 0;
    config.observability.metrics_enabled = false;

    (config, db_path)
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub dispatcher: Arc<RecordingDispatcher>,
    db_path: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
    }
}

pub struct Response {
    pub status: StatusCode,
    pub body: Value,
    pub cookie: Option<String>,
}

impl Response {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let (config, db_path) = test_config();
        let dispatcher = Arc::new(RecordingDispatcher::default());

        let shared = SharedState::with_collaborators(
            config,
            Arc::new(LogTransport),
            Some(dispatcher.clone() as Arc<dyn SendDispatcher>),
        )
        .await
        .expect("Failed to create shared state");

        let state = xyno::api::create_app_state(Arc::new(shared), None);
        let router = xyno::api::router(state.clone())
            .await
            .expect("Failed to build router");

        Self {
            router,
            state,
            dispatcher,
            db_path,
        }
    }

    pub fn jobs(&self) -> Vec<SendJob> {
        self.dispatcher.jobs.lock().unwrap().clone()
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookie = response
            .headers()
            .get("set-cookie")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Response {
            status,
            body,
            cookie,
        }
    }

    /// Request as a logged-in user, optionally choosing the environment.
    pub async fn as_user(
        &self,
        cookie: &str,
        env: Option<&str>,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        let mut headers = vec![("Cookie", cookie)];
        if let Some(env) = env {
            headers.push(("X-Environment", env));
        }
        self.send(method, uri, &headers, body).await
    }

    pub async fn register(&self, username: &str, company: &str) -> String {
        let response = self
            .send(
                "POST",
                "/api/auth/register",
                &[],
                Some(json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": PASSWORD,
                    "password_confirm": PASSWORD,
                    "company_name": company,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        self.login(username, PASSWORD).await
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .send(
                "POST",
                "/api/auth/login",
                &[],
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.cookie.expect("login sets a session cookie")
    }

    /// Latest unused token of any purpose issued to `user_id`.
    pub async fn latest_token(&self, user_id: i64) -> String {
        user_tokens::Entity::find()
            .filter(user_tokens::Column::UserId.eq(i32::try_from(user_id).unwrap()))
            .filter(user_tokens::Column::Used.eq(false))
            .order_by_desc(user_tokens::Column::Id)
            .one(&self.state.shared.store.conn)
            .await
            .unwrap()
            .expect("token issued")
            .token
    }

    /// Invites a member into the admin's organization, completes the
    /// invitation and logs them in.
    pub async fn add_member(&self, admin_cookie: &str, email: &str, role: &str) -> String {
        let invited = self
            .as_user(
                admin_cookie,
                None,
                "POST",
                "/api/auth/users/invite",
                Some(json!({
                    "first_name": "Dev",
                    "last_name": "Eloper",
                    "email": email,
                    "role": role,
                })),
            )
            .await;
        assert_eq!(invited.status, StatusCode::CREATED, "{:?}", invited.body);

        let user_id = invited.data()["user"]["id"].as_i64().unwrap();
        let token = self.latest_token(user_id).await;

        let set = self
            .send(
                "POST",
                "/api/auth/set-password",
                &[],
                Some(json!({
                    "token": token,
                    "password": PASSWORD,
                    "password_confirm": PASSWORD,
                })),
            )
            .await;
        assert_eq!(set.status, StatusCode::OK, "{:?}", set.body);

        self.login(email, PASSWORD).await
    }

    pub async fn api_key(&self, cookie: &str, environment: &str) -> String {
        let response = self
            .as_user(
                cookie,
                None,
                "POST",
                "/api/auth/api-keys",
                Some(json!({ "name": format!("{environment} key"), "environment": environment })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.data()["raw_key"].as_str().unwrap().to_string()
    }

    pub async fn create_template(&self, cookie: &str, env: &str, name: &str) -> Value {
        let response = self
            .as_user(
                cookie,
                Some(env),
                "POST",
                "/api/templates",
                Some(json!({
                    "name": name,
                    "subject": "Hello {{name}}",
                    "html_content": "<p>Your order {{order_id}} has shipped.</p>",
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.data().clone()
    }

    pub async fn create_integration(&self, cookie: &str, env: &str, name: &str) -> Value {
        let response = self
            .as_user(
                cookie,
                Some(env),
                "POST",
                "/api/integrations",
                Some(json!({
                    "name": name,
                    "access_key": "AKIAEXAMPLE",
                    "secret_key": "secret",
                    "region": "us-east-1",
                    "sender_email": "noreply@shop.test",
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.data().clone()
    }

    pub async fn create_event(
        &self,
        cookie: &str,
        env: &str,
        name: &str,
        template_id: Option<i64>,
        integration_id: Option<i64>,
    ) -> Response {
        self.as_user(
            cookie,
            Some(env),
            "POST",
            "/api/events/definitions",
            Some(json!({
                "name": name,
                "description": "",
                "template_id": template_id,
                "integration_id": integration_id,
            })),
        )
        .await
    }

    /// Template, integration and an event wired to both, in `env`.
    pub async fn seed_event(&self, cookie: &str, env: &str, name: &str) -> Value {
        let template = self.create_template(cookie, env, "Welcome").await;
        let integration = self.create_integration(cookie, env, "Primary SES").await;
        let event = self
            .create_event(
                cookie,
                env,
                name,
                template["id"].as_i64(),
                integration["id"].as_i64(),
            )
            .await;
        assert_eq!(event.status, StatusCode::CREATED, "{:?}", event.body);
        event.data().clone()
    }
}
