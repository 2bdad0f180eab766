//! # messaging-auth
//!
//! Integration layer between the platform and its two external providers:
//! - Service credential caching for the real-time messaging provider
//!   (client-credentials token, cached with a safety margin, refreshed with backoff)
//! - User provisioning against the messaging provider's REST API
//! - Signed direct-upload requests for the object-storage provider
//! - Rewriting of provider-issued chat attachment URLs into public links
//!
//! ## Architecture
//!
//! Every component takes its collaborators explicitly (clock, sleeper, HTTP client),
//! so the request handlers that call into this crate own a single instance of each
//! and tests can drive expiry and retry behavior without real time passing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use messaging_auth::{
//!     attachment::{AttachmentRewriter, ThumbnailSize},
//!     credential::CredentialClient,
//!     provisioning::UserDirectory,
//!     storage::UploadSigner,
//! };
//! ```

pub mod attachment;
pub mod clock;
pub mod config;
pub mod credential;
pub mod error;
pub mod http;
pub mod provisioning;
pub mod storage;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
