//! Provider settings consumed by the integration core.

use secrecy::SecretString;

use crate::error::{config_error, ConfigErrorKind, Error};

/// Messaging provider identity and endpoint.
#[derive(Debug, Clone)]
pub struct MessagingConfig {
    /// Base API URL (e.g. "https://a1.easemob.com").
    pub base_url: String,
    /// Organization the application is registered under.
    pub org_id: String,
    /// Application name within the organization.
    pub app_name: String,
    /// Client identity for the client-credentials grant.
    pub client_id: String,
    pub client_secret: SecretString,
}

impl MessagingConfig {
    /// Root URL of the application: `{base}/{org}/{app}`.
    pub fn app_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.org_id,
            self.app_name
        )
    }

    /// Token endpoint for the client-credentials grant.
    pub fn token_url(&self) -> String {
        format!("{}/token", self.app_url())
    }

    /// User collection endpoint.
    pub fn users_url(&self) -> String {
        format!("{}/users", self.app_url())
    }
}

/// Object storage bucket and signing credentials.
///
/// Fields are optional so a partially configured deployment still starts;
/// signing fails with `SigningErrorKind::MissingConfiguration` until they are set.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Region endpoint label (e.g. "oss-cn-hangzhou").
    pub region: Option<String>,
    /// Storage service host (e.g. "aliyuncs.com").
    pub host: String,
    pub bucket: Option<String>,
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<SecretString>,
}

/// Public rendering of chat attachments.
#[derive(Debug, Clone)]
pub struct AttachmentConfig {
    /// Base URL the rewritten links are hosted under.
    pub public_base_url: String,
    /// Returned in place of any URL that cannot be rewritten.
    pub placeholder_url: String,
    /// Maximum number of rewritten URLs kept in memory.
    pub cache_capacity: usize,
}

impl AttachmentConfig {
    /// Validate the public base, normalizing away any trailing slash.
    pub fn new(
        public_base_url: &str,
        placeholder_url: &str,
        cache_capacity: usize,
    ) -> Result<Self, Error> {
        let parsed = url::Url::parse(public_base_url).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: crate::error::ErrorKind::Config(ConfigErrorKind::Invalid),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(config_error(
                ConfigErrorKind::Invalid,
                "Attachment public base URL must be http or https",
            ));
        }

        Ok(Self {
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            placeholder_url: placeholder_url.to_string(),
            cache_capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn messaging_config() -> MessagingConfig {
        MessagingConfig {
            base_url: "https://a1.easemob.com/".to_string(),
            org_id: "1102190223222824".to_string(),
            app_name: "lovechat".to_string(),
            client_id: "client".to_string(),
            client_secret: SecretString::new("secret".to_string()),
        }
    }

    #[test]
    fn test_messaging_urls() {
        let config = messaging_config();
        assert_eq!(
            config.token_url(),
            "https://a1.easemob.com/1102190223222824/lovechat/token"
        );
        assert_eq!(
            config.users_url(),
            "https://a1.easemob.com/1102190223222824/lovechat/users"
        );
    }

    #[test]
    fn test_attachment_config_trims_trailing_slash() {
        let config = AttachmentConfig::new("https://files.example.com/", "/img/missing.png", 10)
            .expect("valid config");
        assert_eq!(config.public_base_url, "https://files.example.com");
    }

    #[test]
    fn test_attachment_config_rejects_non_http_base() {
        let result = AttachmentConfig::new("ftp://files.example.com", "/img/missing.png", 10);
        assert!(matches!(
            result,
            Err(Error {
                error_kind: ErrorKind::Config(ConfigErrorKind::Invalid),
                ..
            })
        ));
    }

    #[test]
    fn test_attachment_config_rejects_unparseable_base() {
        let result = AttachmentConfig::new("files.example.com", "/img/missing.png", 10);
        assert!(result.is_err());
    }
}
