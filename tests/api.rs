mod common;

use axum::http::{header, Method, StatusCode};
use serde_json::{json, Value};

use common::{password_auth, read_json, send_request, setup_test_app, token_auth, ADMIN_EMAIL};

#[tokio::test]
async fn health_is_public() {
    let app = setup_test_app().await;
    let response = send_request(&app, Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn token_endpoint_requires_password_credentials() {
    let mut app = setup_test_app().await;
    app.confirmed("john@example.com", "john").await;

    let response = send_request(&app, Method::GET, "/api/v1/token", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let auth = password_auth("john@example.com");
    let response = send_request(&app, Method::GET, "/api/v1/token", Some(&auth), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert_eq!(body["expiration"], 3600);
    let token = body["token"].as_str().unwrap().to_string();

    // A token cannot be exchanged for another token.
    let response =
        send_request(&app, Method::GET, "/api/v1/token", Some(&token_auth(&token)), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = read_json(response).await;
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(body["message"], "Invalid credentials");

    // But it does authenticate resource requests.
    let response = send_request(
        &app,
        Method::POST,
        "/api/v1/posts/",
        Some(&token_auth(&token)),
        Some(json!({"body": "posted with a token"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let mut app = setup_test_app().await;
    app.confirmed("john@example.com", "john").await;

    let wrong = common::basic("john@example.com", "not the password");
    let response = send_request(&app, Method::GET, "/api/v1/posts/", Some(&wrong), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = read_json(response).await;
    assert_eq!(body["error"], "unauthorized");

    let bogus = token_auth("not.a.token");
    let response = send_request(&app, Method::GET, "/api/v1/posts/", Some(&bogus), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unconfirmed_accounts_are_refused_on_resources() {
    let mut app = setup_test_app().await;
    app.register("pending@example.com", "pending").await;
    let auth = password_auth("pending@example.com");

    let response = send_request(&app, Method::GET, "/api/v1/posts/", Some(&auth), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = read_json(response).await;
    assert_eq!(body, json!({"error": "forbidden", "message": "Unconfirmed account"}));

    let response = send_request(&app, Method::GET, "/api/v1/token", Some(&auth), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Lifecycle routes stay reachable.
    let response =
        send_request(&app, Method::POST, "/api/v1/auth/confirm/resend", Some(&auth), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn anonymous_callers_can_read_but_not_write() {
    let app = setup_test_app().await;

    let response = send_request(&app, Method::GET, "/api/v1/posts/", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["posts"], json!([]));

    let response = send_request(
        &app,
        Method::POST,
        "/api/v1/posts/",
        None,
        Some(json!({"body": "hello"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn posts_are_paginated_with_links() {
    let mut app = setup_test_app().await;
    let john = app.confirmed("john@example.com", "john").await;
    let auth = password_auth("john@example.com");

    for n in 0..7 {
        let response = send_request(
            &app,
            Method::POST,
            "/api/v1/posts/",
            Some(&auth),
            Some(json!({"body": format!("post {}", n)})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().contains_key(header::LOCATION));
    }

    let response = send_request(&app, Method::GET, "/api/v1/posts/", Some(&auth), None).await;
    let body: Value = read_json(response).await;
    assert_eq!(body["posts"].as_array().unwrap().len(), 5);
    assert_eq!(body["posts"][0]["body"], "post 6");
    assert_eq!(body["prev"], Value::Null);
    assert_eq!(body["next"], "http://localhost/api/v1/posts/?page=2");
    assert_eq!(body["count"], 7);

    let response =
        send_request(&app, Method::GET, "/api/v1/posts/?page=-1", Some(&auth), None).await;
    let body: Value = read_json(response).await;
    assert_eq!(body["posts"].as_array().unwrap().len(), 2);
    assert_eq!(body["prev"], "http://localhost/api/v1/posts/?page=1");
    assert_eq!(body["next"], Value::Null);

    let response =
        send_request(&app, Method::GET, "/api/v1/posts/?page=9", Some(&auth), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert_eq!(body["posts"], json!([]));

    let path = format!("/api/v1/users/{}", john.id);
    let response = send_request(&app, Method::GET, &path, Some(&auth), None).await;
    let user: Value = read_json(response).await;
    assert_eq!(user["username"], "john");
    assert_eq!(user["post_count"], 7);
    assert_eq!(user["posts"], format!("http://localhost/api/v1/users/{}/posts/", john.id));

    let path = format!("/api/v1/users/{}/posts/", john.id);
    let response = send_request(&app, Method::GET, &path, Some(&auth), None).await;
    let body: Value = read_json(response).await;
    assert_eq!(body["count"], 7);
}

#[tokio::test]
async fn only_authors_and_admins_edit_posts() {
    let mut app = setup_test_app().await;
    app.confirmed("john@example.com", "john").await;
    app.confirmed("susan@example.com", "susan").await;
    app.confirmed(ADMIN_EMAIL, "admin").await;

    let response = send_request(
        &app,
        Method::POST,
        "/api/v1/posts/",
        Some(&password_auth("john@example.com")),
        Some(json!({"body": "original"})),
    )
    .await;
    let post: Value = read_json(response).await;
    let path = post["url"].as_str().unwrap().trim_start_matches("http://localhost").to_string();

    let response = send_request(
        &app,
        Method::PUT,
        &path,
        Some(&password_auth("susan@example.com")),
        Some(json!({"body": "vandalised"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send_request(
        &app,
        Method::PUT,
        &path,
        Some(&password_auth(ADMIN_EMAIL)),
        Some(json!({"body": "edited by admin"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let post: Value = read_json(response).await;
    assert_eq!(post["body"], "edited by admin");

    let response = send_request(
        &app,
        Method::PUT,
        &path,
        Some(&password_auth("john@example.com")),
        Some(json!({"body": ""})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = read_json(response).await;
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn comments_and_moderation() {
    let mut app = setup_test_app().await;
    app.confirmed("john@example.com", "john").await;
    app.confirmed(ADMIN_EMAIL, "admin").await;
    let john = password_auth("john@example.com");

    let response = send_request(
        &app,
        Method::POST,
        "/api/v1/posts/",
        Some(&john),
        Some(json!({"body": "a post"})),
    )
    .await;
    let post: Value = read_json(response).await;
    let comments_path =
        post["comments"].as_str().unwrap().trim_start_matches("http://localhost").to_string();

    let response = send_request(
        &app,
        Method::POST,
        &comments_path,
        Some(&john),
        Some(json!({"body": "first!"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let comment: Value = read_json(response).await;
    assert_eq!(comment["post"], post["url"]);
    let moderation_path = format!(
        "{}/moderation",
        comment["url"].as_str().unwrap().trim_start_matches("http://localhost")
    );

    let response = send_request(
        &app,
        Method::PUT,
        &moderation_path,
        Some(&john),
        Some(json!({"disabled": true})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send_request(
        &app,
        Method::PUT,
        &moderation_path,
        Some(&password_auth(ADMIN_EMAIL)),
        Some(json!({"disabled": true})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send_request(&app, Method::GET, &comments_path, Some(&john), None).await;
    let body: Value = read_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["comments"][0]["body"], "This comment has been disabled by a moderator.");

    let response = send_request(&app, Method::GET, "/api/v1/comments/", Some(&john), None).await;
    let body: Value = read_json(response).await;
    assert_eq!(body["count"], 1);

    let post_path = post["url"].as_str().unwrap().trim_start_matches("http://localhost");
    let response = send_request(&app, Method::GET, post_path, Some(&john), None).await;
    let body: Value = read_json(response).await;
    assert_eq!(body["comment_count"], 1);
}

#[tokio::test]
async fn follow_graph_and_timeline() {
    let mut app = setup_test_app().await;
    let john = app.confirmed("john@example.com", "john").await;
    let susan = app.confirmed("susan@example.com", "susan").await;
    let john_auth = password_auth("john@example.com");
    let susan_auth = password_auth("susan@example.com");

    send_request(
        &app,
        Method::POST,
        "/api/v1/posts/",
        Some(&susan_auth),
        Some(json!({"body": "from susan"})),
    )
    .await;

    let follow_path = format!("/api/v1/users/{}/follow", susan.id);
    let response = send_request(&app, Method::POST, &follow_path, Some(&john_auth), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let own_path = format!("/api/v1/users/{}/follow", john.id);
    let response = send_request(&app, Method::POST, &own_path, Some(&john_auth), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let path = format!("/api/v1/users/{}/followers", susan.id);
    let response = send_request(&app, Method::GET, &path, Some(&john_auth), None).await;
    let body: Value = read_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["followers"][0]["username"], "john");

    let path = format!("/api/v1/users/{}/timeline", john.id);
    let response = send_request(&app, Method::GET, &path, Some(&john_auth), None).await;
    let body: Value = read_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["posts"][0]["body"], "from susan");

    let response = send_request(&app, Method::DELETE, &follow_path, Some(&john_auth), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let path = format!("/api/v1/users/{}/following", john.id);
    let response = send_request(&app, Method::GET, &path, Some(&john_auth), None).await;
    let body: Value = read_json(response).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn unknown_resources_are_not_found() {
    let mut app = setup_test_app().await;
    app.confirmed("john@example.com", "john").await;
    let auth = password_auth("john@example.com");

    for path in ["/api/v1/posts/999", "/api/v1/users/999", "/api/v1/comments/999"] {
        let response = send_request(&app, Method::GET, path, Some(&auth), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
        let body: Value = read_json(response).await;
        assert_eq!(body["error"], "not_found");
    }
}

#[tokio::test]
async fn administrators_assign_roles() {
    let mut app = setup_test_app().await;
    let john = app.confirmed("john@example.com", "john").await;
    app.confirmed(ADMIN_EMAIL, "admin").await;
    let path = format!("/api/v1/users/{}/role", john.id);

    let response = send_request(
        &app,
        Method::PUT,
        &path,
        Some(&password_auth("john@example.com")),
        Some(json!({"role": "Administrator"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send_request(
        &app,
        Method::PUT,
        &path,
        Some(&password_auth(ADMIN_EMAIL)),
        Some(json!({"role": "Moderator"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let account = app.state.accounts.get_account(john.id).await.unwrap();
    let role = app.state.accounts.role_of(&account).await.unwrap();
    assert_eq!(role.name, "Moderator");

    let response = send_request(
        &app,
        Method::PUT,
        &path,
        Some(&password_auth(ADMIN_EMAIL)),
        Some(json!({"role": "Overlord"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn administrators_edit_accounts() {
    let mut app = setup_test_app().await;
    let john = app.register("john@example.com", "john").await;
    app.next_mail();
    app.confirmed("susan@example.com", "susan").await;
    app.confirmed(ADMIN_EMAIL, "admin").await;
    let path = format!("/api/v1/users/{}", john.id);
    let edit = |email: &str, username: &str| {
        json!({
            "email": email,
            "username": username,
            "confirmed": true,
            "role": "Moderator",
            "name": "John Smith",
            "location": "Porto",
            "about_me": null,
        })
    };

    let response = send_request(
        &app,
        Method::PUT,
        &path,
        Some(&password_auth("susan@example.com")),
        Some(edit("johnny@example.com", "johnny")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send_request(
        &app,
        Method::PUT,
        &path,
        Some(&password_auth(ADMIN_EMAIL)),
        Some(edit("susan@example.com", "johnny")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send_request(
        &app,
        Method::PUT,
        &path,
        Some(&password_auth(ADMIN_EMAIL)),
        Some(edit("johnny@example.com", "johnny")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let user: Value = read_json(response).await;
    assert_eq!(user["username"], "johnny");

    let account = app.state.accounts.get_account(john.id).await.unwrap();
    assert_eq!(account.email, "johnny@example.com");
    assert!(account.confirmed);
    assert_eq!(account.location.as_deref(), Some("Porto"));
    assert_eq!(app.state.accounts.role_of(&account).await.unwrap().name, "Moderator");

    // The confirmed flag set by the administrator opens the resource routes.
    let response = send_request(
        &app,
        Method::GET,
        "/api/v1/posts/",
        Some(&password_auth("johnny@example.com")),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}
