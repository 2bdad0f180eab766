//! Service credential type.

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;

use crate::error::{credential_error, CredentialErrorKind, Error};

/// Subtracted from the provider-reported expiry so a token is never handed out
/// during its last minutes of real validity.
pub const SAFETY_MARGIN_MINUTES: i64 = 5;

/// TTL assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_TTL_SECS: i64 = 7200;

/// Bearer token issued by the messaging provider.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Token for server-to-server calls.
    pub token: SecretString,
    /// Instant after which the token must no longer be handed out.
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Build a credential from a freshly issued token.
    ///
    /// `expires_at` is `issued_at + ttl` minus the safety margin. Fails with
    /// `MalformedResponse` when that instant is not representable.
    pub fn issued(
        token: SecretString,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, Error> {
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .and_then(|expiry| expiry.checked_sub_signed(Duration::minutes(SAFETY_MARGIN_MINUTES)))
            .ok_or_else(|| {
                credential_error(
                    CredentialErrorKind::MalformedResponse,
                    &format!("Token lifetime of {}s is out of range", ttl.num_seconds()),
                )
            })?;

        Ok(Self { token, expires_at })
    }

    /// Whether the credential may still be handed out at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Get the remaining time until expiration.
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_expiry_applies_safety_margin() {
        let credential = Credential::issued(
            SecretString::new("token".to_string()),
            issued_at(),
            Duration::seconds(3600),
        )
        .expect("credential");

        assert_eq!(credential.expires_at, issued_at() + Duration::minutes(55));
    }

    #[test]
    fn test_valid_until_margin() {
        let credential = Credential::issued(
            SecretString::new("token".to_string()),
            issued_at(),
            Duration::seconds(3600),
        )
        .expect("credential");

        assert!(credential.is_valid_at(issued_at() + Duration::minutes(54)));
        assert!(!credential.is_valid_at(issued_at() + Duration::minutes(55)));
        assert!(!credential.is_valid_at(issued_at() + Duration::minutes(58)));
    }

    #[test]
    fn test_ttl_shorter_than_margin_is_never_valid() {
        let credential = Credential::issued(
            SecretString::new("token".to_string()),
            issued_at(),
            Duration::seconds(120),
        )
        .expect("credential");

        assert!(!credential.is_valid_at(issued_at()));
        assert!(credential.time_until_expiry(issued_at()) < Duration::zero());
    }

    #[test]
    fn test_unrepresentable_expiry_is_malformed() {
        let err = Credential::issued(
            SecretString::new("token".to_string()),
            issued_at(),
            Duration::days(365 * 300_000),
        )
        .unwrap_err();

        assert_eq!(
            err.error_kind,
            crate::error::ErrorKind::Credential(CredentialErrorKind::MalformedResponse)
        );
    }
}
