//! HMAC-SHA1 request signing for direct uploads.

use std::sync::Arc;
use std::time::SystemTime;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha1::Sha1;

use crate::clock::{Clock, SystemClock};
use crate::config::StorageConfig;
use crate::error::{signing_error, Error, SigningErrorKind};

type HmacSha1 = Hmac<Sha1>;

/// Scheme prefix of the `Authorization` header value.
pub const AUTHORIZATION_SCHEME: &str = "OSS";

/// A fully signed PUT the client can send directly to the storage service.
///
/// Valid only within the provider's clock-skew tolerance of `date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUploadRequest {
    pub method: &'static str,
    pub url: String,
    pub resource_path: String,
    pub content_type: String,
    pub content_length: u64,
    /// RFC-1123 timestamp, sent as the `Date` header.
    pub date: String,
    /// Value of the `Authorization` header.
    pub authorization: String,
}

impl SignedUploadRequest {
    /// Headers the upload must carry, in the order the signature covers them.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Date", self.date.clone()),
            ("Content-Type", self.content_type.clone()),
            ("Content-Length", self.content_length.to_string()),
            ("Authorization", self.authorization.clone()),
        ]
    }
}

/// Signs upload requests with the bucket's static access key.
///
/// Pure computation plus one clock read; no network I/O.
pub struct UploadSigner {
    config: StorageConfig,
    clock: Arc<dyn Clock>,
}

impl UploadSigner {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sign a PUT of `payload_length` bytes of `content_type` to `resource_path`.
    ///
    /// A leading `/` on `resource_path` is ignored.
    pub fn sign_upload(
        &self,
        resource_path: &str,
        content_type: &str,
        payload_length: u64,
    ) -> Result<SignedUploadRequest, Error> {
        let bucket = required(self.config.bucket.as_deref(), "storage bucket")?;
        let access_key_id = required(self.config.access_key_id.as_deref(), "storage access key id")?;
        let secret = required(
            self.config
                .access_key_secret
                .as_ref()
                .map(|s| s.expose_secret().as_str()),
            "storage access key secret",
        )?;

        let resource_path = resource_path.trim_start_matches('/');
        let date = httpdate::fmt_http_date(SystemTime::from(self.clock.now()));
        let canonical = canonical_string(content_type, &date, bucket, resource_path);
        let signature = sign(secret, &canonical)?;

        Ok(SignedUploadRequest {
            method: "PUT",
            url: self.upload_url(bucket, resource_path)?,
            resource_path: resource_path.to_string(),
            content_type: content_type.to_string(),
            content_length: payload_length,
            date,
            authorization: format!("{} {}:{}", AUTHORIZATION_SCHEME, access_key_id, signature),
        })
    }

    fn upload_url(&self, bucket: &str, resource_path: &str) -> Result<String, Error> {
        let region = required(self.config.region.as_deref(), "storage region")?;
        Ok(format!(
            "https://{}.{}.{}/{}",
            bucket, region, self.config.host, resource_path
        ))
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, Error> {
    value.filter(|v| !v.is_empty()).ok_or_else(|| {
        signing_error(
            SigningErrorKind::MissingConfiguration,
            &format!("Missing {}", name),
        )
    })
}

fn canonical_string(content_type: &str, date: &str, bucket: &str, resource_path: &str) -> String {
    format!(
        "PUT\n\n{}\n{}\n/{}/{}",
        content_type, date, bucket, resource_path
    )
}

fn sign(secret: &str, canonical: &str) -> Result<String, Error> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).map_err(|_| {
        signing_error(SigningErrorKind::MissingConfiguration, "Invalid HMAC key")
    })?;
    mac.update(canonical.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ErrorKind;
    use chrono::{TimeZone, Utc};
    use secrecy::SecretString;

    fn storage_config() -> StorageConfig {
        StorageConfig {
            region: Some("oss-cn-hangzhou".to_string()),
            host: "aliyuncs.com".to_string(),
            bucket: Some("b".to_string()),
            access_key_id: Some("AK".to_string()),
            access_key_secret: Some(SecretString::new("SECRET".to_string())),
        }
    }

    fn signer(config: StorageConfig) -> UploadSigner {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        UploadSigner::new(config).with_clock(Arc::new(clock))
    }

    fn assert_missing_configuration(result: Result<SignedUploadRequest, Error>) {
        assert!(matches!(
            result,
            Err(Error {
                error_kind: ErrorKind::Signing(SigningErrorKind::MissingConfiguration),
                ..
            })
        ));
    }

    #[test]
    fn test_canonical_string_layout() {
        assert_eq!(
            canonical_string(
                "image/png",
                "Wed, 01 Jan 2025 00:00:00 GMT",
                "b",
                "albums/x.png"
            ),
            "PUT\n\nimage/png\nWed, 01 Jan 2025 00:00:00 GMT\n/b/albums/x.png"
        );
    }

    #[test]
    fn test_golden_signature() {
        let request = signer(storage_config())
            .sign_upload("albums/x.png", "image/png", 2048)
            .expect("signing should succeed");

        assert_eq!(request.date, "Wed, 01 Jan 2025 00:00:00 GMT");
        assert_eq!(request.authorization, "OSS AK:4V3Z8Wut5AL4BtQ6+zjvlqfk7cY=");
    }

    #[test]
    fn test_descriptor_fields() {
        let request = signer(storage_config())
            .sign_upload("/albums/x.png", "image/png", 2048)
            .unwrap();

        assert_eq!(request.method, "PUT");
        assert_eq!(request.resource_path, "albums/x.png");
        assert_eq!(request.content_length, 2048);
        assert_eq!(
            request.url,
            "https://b.oss-cn-hangzhou.aliyuncs.com/albums/x.png"
        );
        assert_eq!(
            request.headers()[3],
            ("Authorization", "OSS AK:4V3Z8Wut5AL4BtQ6+zjvlqfk7cY=".to_string())
        );
    }

    #[test]
    fn test_signing_is_deterministic() {
        let signer = signer(storage_config());
        let first = signer.sign_upload("albums/x.png", "image/png", 1).unwrap();
        let second = signer.sign_upload("albums/x.png", "image/png", 1).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_content_type_changes_signature() {
        let signer = signer(storage_config());
        let png = signer.sign_upload("albums/x.png", "image/png", 1).unwrap();
        let jpeg = signer.sign_upload("albums/x.png", "image/jpeg", 1).unwrap();
        assert_ne!(png.authorization, jpeg.authorization);
    }

    #[test]
    fn test_missing_bucket() {
        let config = StorageConfig {
            bucket: None,
            ..storage_config()
        };
        assert_missing_configuration(signer(config).sign_upload("a.png", "image/png", 1));
    }

    #[test]
    fn test_empty_access_key_id() {
        let config = StorageConfig {
            access_key_id: Some(String::new()),
            ..storage_config()
        };
        assert_missing_configuration(signer(config).sign_upload("a.png", "image/png", 1));
    }

    #[test]
    fn test_missing_secret() {
        let config = StorageConfig {
            access_key_secret: None,
            ..storage_config()
        };
        assert_missing_configuration(signer(config).sign_upload("a.png", "image/png", 1));
    }
}
