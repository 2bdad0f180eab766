//! Service credential caching for the messaging provider.

mod backoff;
mod client;
mod store;
mod token;

#[cfg(any(test, feature = "mock"))]
pub use backoff::RecordingSleeper;
pub use backoff::{BackoffPolicy, Sleeper, TokioSleeper};
pub use client::CredentialClient;
pub use store::CredentialStore;
pub use token::{Credential, DEFAULT_TTL_SECS, SAFETY_MARGIN_MINUTES};
