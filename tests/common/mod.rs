//! Common test utilities for all integration tests.
//!
//! Builds the full API against a private in-memory database and captures outgoing
//! mail so tests can pick tokens out of it.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, Response},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use penwright::{
    api::{build_router, ApiState},
    auth::{seed_roles, validation::RegisterRequest, Account},
    config::AppConfig,
    mail::{ChannelMailer, OutgoingMessage},
    storage::{create_pool, DbPool, SqlxRoleRepository},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const PASSWORD: &str = "correct horse battery";

pub struct TestApp {
    pub state: ApiState,
    pub pool: DbPool,
    pub inbox: UnboundedReceiver<OutgoingMessage>,
}

impl TestApp {
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Next captured message; panics when nothing was sent.
    pub fn next_mail(&mut self) -> OutgoingMessage {
        self.inbox.try_recv().expect("expected an outgoing message")
    }

    pub fn token_from_mail(&mut self) -> String {
        let message = self.next_mail();
        message.context["token"].as_str().expect("token in mail context").to_string()
    }

    pub async fn register(&mut self, email: &str, username: &str) -> Account {
        self.state
            .accounts
            .register(RegisterRequest {
                email: email.to_string(),
                username: username.to_string(),
                password: PASSWORD.to_string(),
            })
            .await
            .expect("register account")
    }

    /// Register and confirm an account, draining its confirmation mail.
    pub async fn confirmed(&mut self, email: &str, username: &str) -> Account {
        let account = self.register(email, username).await;
        let token = self.token_from_mail();
        self.state.accounts.confirm(&token, account.id).await.expect("confirm account");
        self.state.accounts.get_account(account.id).await.expect("reload account")
    }
}

pub async fn setup_test_app() -> TestApp {
    let mut config = AppConfig::default();
    config.database.url = "sqlite::memory:".to_string();
    config.auth.admin_email = Some(ADMIN_EMAIL.to_string());
    config.server.public_base_url = "http://localhost".to_string();
    config.pagination.posts_per_page = 5;

    let pool = create_pool(&config.database).await.expect("create sqlite pool");
    seed_roles(&SqlxRoleRepository::new(pool.clone())).await.expect("seed roles");

    let (mailer, inbox) = ChannelMailer::new(config.mail.clone());
    let state =
        ApiState::with_sqlx(pool.clone(), &config, Arc::new(mailer)).expect("build api state");

    TestApp { state, pool, inbox }
}

pub fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
}

pub fn password_auth(email: &str) -> String {
    basic(email, PASSWORD)
}

pub fn token_auth(token: &str) -> String {
    basic(token, "")
}

pub async fn send_request(
    app: &TestApp,
    method: Method,
    path: &str,
    auth: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }

    let request = if let Some(json) = body {
        let bytes = serde_json::to_vec(&json).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("build request")
    } else {
        builder.body(Body::empty()).expect("build request")
    };

    app.router().oneshot(request).await.expect("request")
}

pub async fn read_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}
