//! Named API endpoints.
//!
//! Each call is a fixed verb and path; none of them retry.

use crate::{CredentialGateway, GatewayResult, HttpMethod};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Credentials for `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Account details for `POST /register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Body returned by login and registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: Value,
}

fn post_path(id: &str) -> String {
    format!("/posts/{}", id)
}

impl CredentialGateway {
    // ==========================================
    // Auth
    // ==========================================

    pub async fn register(&self, data: &RegisterRequest) -> GatewayResult<AuthPayload> {
        let body = serde_json::to_value(data)?;
        self.request_as(HttpMethod::Post, "/register", Some(body)).await
    }

    pub async fn login(&self, credentials: &LoginRequest) -> GatewayResult<AuthPayload> {
        let body = serde_json::to_value(credentials)?;
        self.request_as(HttpMethod::Post, "/login", Some(body)).await
    }

    pub async fn logout(&self) -> GatewayResult<Value> {
        self.request(HttpMethod::Post, "/logout", Vec::new(), None)
            .await
    }

    /// Fetch the signed-in user record.
    pub async fn current_user(&self) -> GatewayResult<Value> {
        self.request(HttpMethod::Get, "/user", Vec::new(), None).await
    }

    // ==========================================
    // Posts
    // ==========================================

    pub async fn list_posts(&self, query: Vec<(String, String)>) -> GatewayResult<Value> {
        self.request(HttpMethod::Get, "/posts", query, None).await
    }

    pub async fn get_post(&self, id: &str) -> GatewayResult<Value> {
        self.request(HttpMethod::Get, &post_path(id), Vec::new(), None)
            .await
    }

    pub async fn create_post(&self, data: Value) -> GatewayResult<Value> {
        self.request(HttpMethod::Post, "/posts", Vec::new(), Some(data))
            .await
    }

    pub async fn update_post(&self, id: &str, data: Value) -> GatewayResult<Value> {
        self.request(HttpMethod::Put, &post_path(id), Vec::new(), Some(data))
            .await
    }

    pub async fn delete_post(&self, id: &str) -> GatewayResult<Value> {
        self.request(HttpMethod::Delete, &post_path(id), Vec::new(), None)
            .await
    }

    // ==========================================
    // Sync
    // ==========================================

    /// Trigger a bulk sync on the server.
    pub async fn sync_posts(&self) -> GatewayResult<Value> {
        self.request(HttpMethod::Post, "/posts/sync", Vec::new(), None)
            .await
    }

    pub async fn last_sync(&self) -> GatewayResult<Value> {
        self.request(HttpMethod::Get, "/posts/sync/last", Vec::new(), None)
            .await
    }

    // ==========================================
    // Dashboard
    // ==========================================

    pub async fn dashboard(&self, query: Vec<(String, String)>) -> GatewayResult<Value> {
        self.request(HttpMethod::Get, "/dashboard", query, None).await
    }

    pub async fn categories(&self) -> GatewayResult<Value> {
        self.request(HttpMethod::Get, "/posts/data/categories", Vec::new(), None)
            .await
    }
}
