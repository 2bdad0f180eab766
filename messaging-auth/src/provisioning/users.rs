//! Messaging user registration and removal.

use std::sync::Arc;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::credential::CredentialClient;
use crate::error::{provisioning_error, Error, ErrorKind, ProvisioningErrorKind};

#[derive(Debug, Serialize)]
struct RegisterUserRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct EntityListResponse {
    #[serde(default)]
    entities: Vec<UserEntity>,
}

/// A messaging account as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserEntity {
    pub uuid: String,
    pub username: String,
    #[serde(rename = "type", default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub modified: Option<i64>,
    #[serde(default)]
    pub activated: Option<bool>,
}

/// Creates and deletes messaging accounts with the service token.
///
/// Calls are not retried. A 401 from the provider invalidates the cached service
/// token so the next call fetches a fresh one.
pub struct UserDirectory {
    credentials: Arc<CredentialClient>,
}

impl UserDirectory {
    pub fn new(credentials: Arc<CredentialClient>) -> Self {
        Self { credentials }
    }

    /// Register a messaging account for `username`.
    pub async fn register_user(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Vec<UserEntity>, Error> {
        let token = self.credentials.acquire_token().await?;
        let url = self.credentials.config().users_url();

        debug!("Registering messaging user {}", username);

        let response = self
            .credentials
            .http_client()
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(&RegisterUserRequest {
                username,
                password: password.expose_secret(),
            })
            .send()
            .await?;

        let response = self.check_status(response, "register user").await?;
        let body: EntityListResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse user registration response: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::Provisioning(ProvisioningErrorKind::InvalidResponse),
            }
        })?;

        info!("Registered messaging user {}", username);
        Ok(body.entities)
    }

    /// Delete the messaging account for `username`.
    pub async fn delete_user(&self, username: &str) -> Result<(), Error> {
        let token = self.credentials.acquire_token().await?;
        let url = format!(
            "{}/{}",
            self.credentials.config().users_url(),
            urlencoding::encode(username)
        );

        debug!("Deleting messaging user {}", username);

        let response = self
            .credentials
            .http_client()
            .delete(&url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        self.check_status(response, "delete user").await?;
        info!("Deleted messaging user {}", username);
        Ok(())
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
        operation: &str,
    ) -> Result<reqwest::Response, Error> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        warn!("Messaging provider failed to {}: {} - {}", operation, status, error_text);

        if status == StatusCode::UNAUTHORIZED {
            self.credentials.invalidate();
            return Err(provisioning_error(
                ProvisioningErrorKind::Unauthorized,
                &format!("Service token rejected while trying to {}", operation),
            ));
        }

        Err(provisioning_error(
            ProvisioningErrorKind::Rejected,
            &format!("{} {}", status, error_text),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MessagingConfig;
    use mockito::{Matcher, Server, ServerGuard};

    async fn server_with_token() -> (ServerGuard, mockito::Mock) {
        let mut server = Server::new_async().await;
        let token_mock = server
            .mock("POST", "/org/app/token")
            .with_status(200)
            .with_body(r#"{"access_token":"svc-token","expires_in":7200}"#)
            .create_async()
            .await;
        (server, token_mock)
    }

    fn directory(server: &ServerGuard) -> (UserDirectory, Arc<CredentialClient>) {
        let config = MessagingConfig {
            base_url: server.url(),
            org_id: "org".to_string(),
            app_name: "app".to_string(),
            client_id: "client-id".to_string(),
            client_secret: SecretString::new("client-secret".to_string()),
        };
        let credentials = Arc::new(CredentialClient::new(reqwest::Client::new(), config));
        (UserDirectory::new(credentials.clone()), credentials)
    }

    fn password() -> SecretString {
        SecretString::new("hunter2".to_string())
    }

    #[tokio::test]
    async fn test_register_user() {
        let (mut server, _token) = server_with_token().await;
        let mock = server
            .mock("POST", "/org/app/users")
            .match_header("authorization", "Bearer svc-token")
            .match_body(Matcher::Json(serde_json::json!({
                "username": "alice",
                "password": "hunter2"
            })))
            .with_status(200)
            .with_body(
                r#"{
                    "action": "post",
                    "entities": [{
                        "uuid": "7f90f7ca-bb24-11e2-b2d0-6d8e359945e4",
                        "type": "user",
                        "created": 1368421623066,
                        "modified": 1368421623066,
                        "username": "alice",
                        "activated": true
                    }]
                }"#,
            )
            .create_async()
            .await;
        let (directory, _) = directory(&server);

        let entities = directory.register_user("alice", &password()).await.expect("registered");

        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].username, "alice");
        assert_eq!(entities[0].entity_type.as_deref(), Some("user"));
        assert_eq!(entities[0].activated, Some(true));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_register_conflict_is_rejected_without_retry() {
        let (mut server, _token) = server_with_token().await;
        let mock = server
            .mock("POST", "/org/app/users")
            .with_status(400)
            .with_body(r#"{"error":"duplicate_unique_property_exists"}"#)
            .expect(1)
            .create_async()
            .await;
        let (directory, credentials) = directory(&server);

        let err = directory.register_user("alice", &password()).await.unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::Provisioning(ProvisioningErrorKind::Rejected)
        );
        assert!(credentials.current().is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_invalidates_token() {
        let (mut server, _token) = server_with_token().await;
        let _mock = server
            .mock("DELETE", "/org/app/users/alice")
            .with_status(401)
            .create_async()
            .await;
        let (directory, credentials) = directory(&server);

        let err = directory.delete_user("alice").await.unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::Provisioning(ProvisioningErrorKind::Unauthorized)
        );
        assert!(credentials.current().is_none());
    }

    #[tokio::test]
    async fn test_delete_user_encodes_username() {
        let (mut server, _token) = server_with_token().await;
        let mock = server
            .mock("DELETE", "/org/app/users/bob%20smith")
            .match_header("authorization", "Bearer svc-token")
            .with_status(200)
            .with_body(r#"{"action":"delete","entities":[]}"#)
            .create_async()
            .await;
        let (directory, _) = directory(&server);

        directory.delete_user("bob smith").await.expect("deleted");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_body_is_invalid_response() {
        let (mut server, _token) = server_with_token().await;
        let _mock = server
            .mock("POST", "/org/app/users")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;
        let (directory, _) = directory(&server);

        let err = directory.register_user("alice", &password()).await.unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::Provisioning(ProvisioningErrorKind::InvalidResponse)
        );
    }
}
