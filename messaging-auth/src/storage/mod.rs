//! Signed direct-upload requests for the object-storage provider.

mod signer;

pub use signer::{SignedUploadRequest, UploadSigner, AUTHORIZATION_SCHEME};
