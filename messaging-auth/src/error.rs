//! Error types for the `messaging-auth` crate.
//!
//! Follows the same pattern as the service layers with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for messaging-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in messaging-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Credential(CredentialErrorKind),
    Signing(SigningErrorKind),
    Rewrite(RewriteErrorKind),
    Provisioning(ProvisioningErrorKind),
    Config(ConfigErrorKind),
    Http(HttpErrorKind),
}

/// Errors from acquiring the messaging provider's service credential.
#[derive(Debug, PartialEq)]
pub enum CredentialErrorKind {
    /// The token endpoint could not be reached or answered with a non-2xx status.
    NetworkFailure,
    /// The token endpoint answered 2xx but the body carried no usable token.
    MalformedResponse,
    /// Every attempt failed; `source` holds the last underlying cause.
    RetriesExhausted,
}

/// Errors from signing storage requests.
#[derive(Debug, PartialEq)]
pub enum SigningErrorKind {
    MissingConfiguration,
}

/// Errors from rewriting attachment URLs.
#[derive(Debug, PartialEq)]
pub enum RewriteErrorKind {
    UnrecognizedFormat,
}

/// Errors from the user provisioning endpoints.
#[derive(Debug, PartialEq)]
pub enum ProvisioningErrorKind {
    /// The provider answered with a non-2xx status other than 401.
    Rejected,
    /// The provider refused the bearer token.
    Unauthorized,
    InvalidResponse,
}

/// Errors from building the integration configuration.
#[derive(Debug, PartialEq)]
pub enum ConfigErrorKind {
    Missing,
    Invalid,
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let result = match &self.error_kind {
            ErrorKind::Credential(kind) => write!(f, "Credential error: {:?}", kind),
            ErrorKind::Signing(kind) => write!(f, "Signing error: {:?}", kind),
            ErrorKind::Rewrite(kind) => write!(f, "Rewrite error: {:?}", kind),
            ErrorKind::Provisioning(kind) => write!(f, "Provisioning error: {:?}", kind),
            ErrorKind::Config(kind) => write!(f, "Config error: {:?}", kind),
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind),
        };
        result?;
        if let Some(source) = &self.source {
            write!(f, " ({})", source)?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

/// Helper function to create credential errors.
pub fn credential_error(kind: CredentialErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Credential(kind),
    }
}

/// Helper function to create signing errors.
pub fn signing_error(kind: SigningErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Signing(kind),
    }
}

/// Helper function to create rewrite errors.
pub fn rewrite_error(kind: RewriteErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Rewrite(kind),
    }
}

/// Helper function to create provisioning errors.
pub fn provisioning_error(kind: ProvisioningErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Provisioning(kind),
    }
}

/// Helper function to create configuration errors.
pub fn config_error(kind: ConfigErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Config(kind),
    }
}
