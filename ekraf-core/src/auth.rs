//! Thin client for the hosted auth service (`/auth/v1/*`).
//!
//! Credentials are passed straight through; validation and session lifetime
//! are the auth service's business.

use crate::config::BackendConfig;
use crate::error::QueryError;
use crate::session::{Session, User};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct AuthClient {
    client: Client,
    config: BackendConfig,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

impl From<RemoteUser> for User {
    fn from(remote: RemoteUser) -> Self {
        let display_name = remote
            .user_metadata
            .get("display_name")
            .or_else(|| remote.user_metadata.get("full_name"))
            .and_then(Value::as_str)
            .map(str::to_string);
        User {
            id: remote.id,
            email: remote.email.unwrap_or_default(),
            display_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: RemoteUser,
}

async fn auth_error(response: reqwest::Response) -> QueryError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "message"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| format!("status {}", status));
    QueryError::Auth(message)
}

impl AuthClient {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.url, path)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, QueryError> {
        let response = self
            .client
            .post(self.url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.config.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }
        let token: TokenResponse = response.json().await?;
        log::info!("[EKRAF] auth: signed in {}", email);
        Ok(Session {
            access_token: token.access_token,
            user: token.user.into(),
        })
    }

    /// Register a new account. Returns a session when the auth service signs
    /// the user in immediately, `None` when it waits for email confirmation.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Option<Session>, QueryError> {
        let response = self
            .client
            .post(self.url("signup"))
            .header("apikey", &self.config.anon_key)
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "display_name": display_name },
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }
        let body: Value = response.json().await?;
        match serde_json::from_value::<TokenResponse>(body) {
            Ok(token) => Ok(Some(Session {
                access_token: token.access_token,
                user: token.user.into(),
            })),
            Err(_) => Ok(None),
        }
    }

    /// The user behind `access_token`, or `None` if the token is no longer valid.
    pub async fn current_user(&self, access_token: &str) -> Result<Option<User>, QueryError> {
        let response = self
            .client
            .get(self.url("user"))
            .header("apikey", &self.config.anon_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;
        if response.status().as_u16() == 401 || response.status().as_u16() == 403 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }
        let user: RemoteUser = response.json().await?;
        Ok(Some(user.into()))
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), QueryError> {
        let response = self
            .client
            .post(self.url("logout"))
            .header("apikey", &self.config.anon_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_user_maps_display_name() {
        let remote: RemoteUser = serde_json::from_value(json!({
            "id": "abc",
            "email": "a@b.id",
            "user_metadata": { "full_name": "Siti" }
        }))
        .unwrap();
        let user: User = remote.into();
        assert_eq!(user.display_name.as_deref(), Some("Siti"));
        assert_eq!(user.name(), "Siti");
    }

    #[test]
    fn remote_user_without_metadata() {
        let remote: RemoteUser = serde_json::from_value(json!({ "id": "abc" })).unwrap();
        let user: User = remote.into();
        assert_eq!(user.email, "");
        assert_eq!(user.display_name, None);
    }
}
