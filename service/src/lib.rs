use config::Config;
use log::info;
use messaging_auth::{
    attachment::AttachmentRewriter,
    config::{AttachmentConfig, MessagingConfig, StorageConfig},
    credential::CredentialClient,
    error::{config_error, ConfigErrorKind, Error},
    http::HttpClientBuilder,
    provisioning::UserDirectory,
    storage::UploadSigner,
};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod logging;

// Service-level state holding the process-wide integration clients.
// Needs to implement Clone to be able to be handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<CredentialClient>,
    pub users: Arc<UserDirectory>,
    pub upload_signer: Arc<UploadSigner>,
    pub attachments: Arc<AttachmentRewriter>,
    pub config: Config,
}

impl AppState {
    /// Build every integration client from `app_config`.
    ///
    /// Missing storage settings are not an error here; signing reports them per call.
    pub fn new(app_config: Config) -> Result<Self, Error> {
        info!(
            "Integration config: messaging_base_url={}, storage_host={}, \
             http_timeout={}s, attachment_cache_capacity={}",
            app_config.messaging_base_url(),
            app_config.storage_host(),
            app_config.http_timeout_secs,
            app_config.attachment_cache_capacity,
        );

        let http_client = HttpClientBuilder::new()
            .with_timeout(Duration::from_secs(app_config.http_timeout_secs))
            .build()?;

        let credentials = Arc::new(CredentialClient::new(
            http_client,
            messaging_config(&app_config)?,
        ));
        let users = Arc::new(UserDirectory::new(Arc::clone(&credentials)));
        let upload_signer = Arc::new(UploadSigner::new(storage_config(&app_config)));
        let attachments = Arc::new(AttachmentRewriter::new(attachment_config(&app_config)?));

        Ok(Self {
            credentials,
            users,
            upload_signer,
            attachments,
            config: app_config,
        })
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, Error> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| config_error(ConfigErrorKind::Missing, &format!("{} is not set", name)))
}

fn messaging_config(config: &Config) -> Result<MessagingConfig, Error> {
    Ok(MessagingConfig {
        base_url: config.messaging_base_url().to_string(),
        org_id: required(config.messaging_org_id(), "MESSAGING_ORG_ID")?,
        app_name: required(config.messaging_app_name(), "MESSAGING_APP_NAME")?,
        client_id: required(config.messaging_client_id(), "MESSAGING_CLIENT_ID")?,
        client_secret: SecretString::new(required(
            config.messaging_client_secret(),
            "MESSAGING_CLIENT_SECRET",
        )?),
    })
}

fn storage_config(config: &Config) -> StorageConfig {
    StorageConfig {
        region: config.storage_region(),
        host: config.storage_host().to_string(),
        bucket: config.storage_bucket(),
        access_key_id: config.storage_access_key_id(),
        access_key_secret: config.storage_access_key_secret().map(SecretString::new),
    }
}

fn attachment_config(config: &Config) -> Result<AttachmentConfig, Error> {
    let public_base_url = required(
        config.attachment_public_base_url(),
        "ATTACHMENT_PUBLIC_BASE_URL",
    )?;
    AttachmentConfig::new(
        &public_base_url,
        config.attachment_placeholder_url(),
        config.attachment_cache_capacity,
    )
}
