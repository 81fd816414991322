use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use serde_json::json;

// Shared test context
struct TestContext {
    client: reqwest::Client,
    base_url: String,
}

static BASE_URL: Lazy<String> =
    Lazy::new(|| std::env::var("TEST_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".into()));

impl TestContext {
    fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .cookie_store(true)
                .build()
                .unwrap(),
            base_url: BASE_URL.clone(),
        }
    }

    fn unique_email(prefix: &str) -> String {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("{}_{}@example.com", prefix, timestamp)
    }

    async fn fetch_csrf_token(&self) -> String {
        let response = self
            .client
            .get(format!("{}/api/csrf-token", self.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> reqwest::Response {
        let csrf_token = self.fetch_csrf_token().await;
        self.client
            .post(format!("{}/api/auth/register", self.base_url))
            .header("X-CSRF-Token", csrf_token)
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    #[ignore = "requires a running server, PostgreSQL and Redis"]
    async fn register_login_and_fetch_user_without_password_field() {
        let context = TestContext::new();
        let email = TestContext::unique_email("alice");

        let reg_response = context.register("Alice", &email, "secret123").await;
        assert_eq!(reg_response.status().as_u16(), 200, "Registration failed");
        let reg_body: Value = reg_response.json().await.unwrap();
        assert_eq!(reg_body["success"], true);
        let user_id = reg_body["id"].as_str().unwrap().to_string();

        // Registration logs the user in; the record is readable right away.
        let get_response = context
            .client
            .get(format!("{}/api/users/get?id={}", context.base_url, user_id))
            .send()
            .await
            .unwrap();
        assert_eq!(get_response.status().as_u16(), 200);
        let user: Value = get_response.json().await.unwrap();
        assert_eq!(user["name"], "Alice");
        assert_eq!(user["email"], email);
        assert!(user.get("password").is_none());
        assert!(user.get("password_hash").is_none());
    }

    #[tokio::test]
    #[ignore = "requires a running server, PostgreSQL and Redis"]
    async fn login_failure_is_identical_for_unknown_email_and_wrong_password() {
        let context = TestContext::new();
        let email = TestContext::unique_email("bob");
        context.register("Bob", &email, "secret123").await;

        let wrong_password = context
            .client
            .post(format!("{}/api/auth/login", context.base_url))
            .json(&json!({ "email": email, "password": "wrong-password" }))
            .send()
            .await
            .unwrap();
        let unknown_email = context
            .client
            .post(format!("{}/api/auth/login", context.base_url))
            .json(&json!({ "email": "nobody@example.com", "password": "wrong-password" }))
            .send()
            .await
            .unwrap();

        assert_eq!(wrong_password.status().as_u16(), 401);
        assert_eq!(unknown_email.status().as_u16(), 401);

        let body_a: Value = wrong_password.json().await.unwrap();
        let body_b: Value = unknown_email.json().await.unwrap();
        assert_eq!(body_a, body_b, "failure bodies must not differ");
    }

    #[tokio::test]
    #[ignore = "requires a running server, PostgreSQL and Redis"]
    async fn logout_invalidates_the_session() {
        let context = TestContext::new();
        let email = TestContext::unique_email("carol");
        context.register("Carol", &email, "secret123").await;

        let logout = context
            .client
            .post(format!("{}/api/auth/logout", context.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(logout.status().as_u16(), 200);

        // Cookie jar may still hold the old id; the server must reject it.
        let list = context
            .client
            .get(format!("{}/api/users", context.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(list.status().as_u16(), 401);
    }

    #[tokio::test]
    #[ignore = "requires a running server, PostgreSQL and Redis"]
    async fn duplicate_email_registration_conflicts() {
        let context = TestContext::new();
        let email = TestContext::unique_email("dave");

        let first = context.register("Dave", &email, "secret123").await;
        assert_eq!(first.status().as_u16(), 200);

        let second = TestContext::new().register("Dave II", &email, "other-pass-456").await;
        assert_eq!(second.status().as_u16(), 409);

        // The original credential still works.
        let login = context
            .client
            .post(format!("{}/api/auth/login", context.base_url))
            .json(&json!({ "email": email, "password": "secret123" }))
            .send()
            .await
            .unwrap();
        assert_eq!(login.status().as_u16(), 200);
    }

    #[tokio::test]
    #[ignore = "requires a running server, PostgreSQL and Redis"]
    async fn update_with_empty_body_is_422_and_csrf_is_enforced() {
        let context = TestContext::new();
        let email = TestContext::unique_email("erin");
        let reg_body: Value = context
            .register("Erin", &email, "secret123")
            .await
            .json()
            .await
            .unwrap();
        let user_id = reg_body["id"].as_str().unwrap().to_string();

        let csrf_token = context.fetch_csrf_token().await;

        // Empty update set → 422 with the canonical message.
        let empty_update = context
            .client
            .post(format!("{}/api/users/update", context.base_url))
            .header("X-CSRF-Token", &csrf_token)
            .json(&json!({ "id": user_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(empty_update.status().as_u16(), 422);
        let body: Value = empty_update.json().await.unwrap();
        assert_eq!(body["error"], "No data sent for update");

        // Delete without the CSRF header → 403, record survives.
        let delete_no_csrf = context
            .client
            .post(format!("{}/api/users/delete", context.base_url))
            .json(&json!({ "id": user_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(delete_no_csrf.status().as_u16(), 403);

        let still_there = context
            .client
            .get(format!("{}/api/users/get?id={}", context.base_url, user_id))
            .send()
            .await
            .unwrap();
        assert_eq!(still_there.status().as_u16(), 200);

        // With the header, the delete goes through.
        let delete = context
            .client
            .post(format!("{}/api/users/delete", context.base_url))
            .header("X-CSRF-Token", &csrf_token)
            .json(&json!({ "id": user_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(delete.status().as_u16(), 200);
    }

    #[tokio::test]
    #[ignore = "requires a running server, PostgreSQL and Redis"]
    async fn csrf_token_fetch_is_idempotent_per_session() {
        let context = TestContext::new();
        let first = context.fetch_csrf_token().await;
        let second = context.fetch_csrf_token().await;
        assert_eq!(first, second);

        // A different session gets a different token.
        let other = TestContext::new().fetch_csrf_token().await;
        assert_ne!(first, other);
    }

    #[tokio::test]
    #[ignore = "requires a running server, PostgreSQL and Redis"]
    async fn upload_rejects_disallowed_content() {
        let context = TestContext::new();
        let email = TestContext::unique_email("frank");
        context.register("Frank", &email, "secret123").await;
        let csrf_token = context.fetch_csrf_token().await;

        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(b"#!/bin/sh\necho pwned\n".to_vec())
                .file_name("script.png"),
        );

        let response = context
            .client
            .post(format!("{}/api/files/upload", context.base_url))
            .header("X-CSRF-Token", csrf_token)
            .multipart(form)
            .send()
            .await
            .unwrap();

        // Magic-byte sniffing ignores the claimed .png name.
        assert_eq!(response.status().as_u16(), 400);
    }
}
