//! Rendering of provider-issued chat attachment URLs as public links.

mod rewriter;
mod thumbnail;

pub use rewriter::{AttachmentReference, AttachmentRewriter};
pub use thumbnail::ThumbnailSize;
