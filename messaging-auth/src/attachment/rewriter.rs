//! Attachment URL parsing and re-hosting.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};
use url::Url;

use super::ThumbnailSize;
use crate::config::AttachmentConfig;
use crate::error::{rewrite_error, Error, ErrorKind, RewriteErrorKind};

const CHAT_FILES_SEGMENT: &str = "chatfiles";
const SHARE_SECRET_PARAM: &str = "share-secret";

/// A chat attachment as laid out by the messaging provider:
/// `/{org_id}/{app_id}/chatfiles/{file_name}[?share-secret=...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentReference {
    pub org_id: String,
    pub app_id: String,
    pub file_name: String,
    /// Raw query value, carried forward verbatim.
    pub share_secret: Option<String>,
}

impl AttachmentReference {
    /// Parse a provider-issued attachment URL.
    pub fn parse(original_url: &str) -> Result<Self, Error> {
        let url = Url::parse(original_url).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Rewrite(RewriteErrorKind::UnrecognizedFormat),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(unrecognized(original_url));
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.collect())
            .unwrap_or_default();

        let (org_id, app_id, file_name) = match segments.as_slice() {
            [org_id, app_id, CHAT_FILES_SEGMENT, file_name]
                if !org_id.is_empty() && !app_id.is_empty() && !file_name.is_empty() =>
            {
                (*org_id, *app_id, *file_name)
            }
            _ => return Err(unrecognized(original_url)),
        };

        let share_secret = url.query().and_then(|query| {
            query.split('&').find_map(|pair| {
                pair.strip_prefix(SHARE_SECRET_PARAM)
                    .and_then(|rest| rest.strip_prefix('='))
                    .map(str::to_string)
            })
        });

        Ok(Self {
            org_id: org_id.to_string(),
            app_id: app_id.to_string(),
            file_name: file_name.to_string(),
            share_secret,
        })
    }
}

fn unrecognized(original_url: &str) -> Error {
    rewrite_error(
        RewriteErrorKind::UnrecognizedFormat,
        &format!("Not a chat attachment URL: {}", original_url),
    )
}

type CacheKey = (String, Option<ThumbnailSize>);

/// Rewrites attachment URLs onto the public attachment host.
///
/// Results are cached per original URL and thumbnail size. Attachment URLs never
/// change once issued, so entries do not expire; once `cache_capacity` entries are
/// held, further results are computed but not cached. Slots are reserved before
/// insertion, so the limit holds under concurrent callers.
pub struct AttachmentRewriter {
    config: AttachmentConfig,
    cache: DashMap<CacheKey, String>,
    reserved: AtomicUsize,
}

impl AttachmentRewriter {
    pub fn new(config: AttachmentConfig) -> Self {
        Self {
            config,
            cache: DashMap::new(),
            reserved: AtomicUsize::new(0),
        }
    }

    /// Public URL for the full attachment, or the placeholder if it cannot be parsed.
    pub fn rewrite(&self, original_url: &str) -> String {
        self.rewrite_or_placeholder(original_url, None)
    }

    /// Public URL for a thumbnail of the attachment, or the placeholder.
    pub fn rewrite_thumbnail(&self, original_url: &str, size: ThumbnailSize) -> String {
        self.rewrite_or_placeholder(original_url, Some(size))
    }

    /// Fallible form of [`rewrite`](Self::rewrite) / [`rewrite_thumbnail`](Self::rewrite_thumbnail).
    pub fn try_rewrite(
        &self,
        original_url: &str,
        thumbnail: Option<ThumbnailSize>,
    ) -> Result<String, Error> {
        let key = (original_url.to_string(), thumbnail);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.value().clone());
        }

        let reference = AttachmentReference::parse(original_url)?;
        let rewritten = self.render(&reference, thumbnail);

        match self.cache.entry(key) {
            Entry::Occupied(existing) => return Ok(existing.get().clone()),
            Entry::Vacant(slot) => {
                if self.reserve_slot() {
                    slot.insert(rewritten.clone());
                } else {
                    debug!("Attachment URL cache is full, not caching {}", original_url);
                }
            }
        }

        Ok(rewritten)
    }

    fn reserve_slot(&self) -> bool {
        let capacity = self.config.cache_capacity;
        self.reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |held| {
                (held < capacity).then_some(held + 1)
            })
            .is_ok()
    }

    /// Number of cached rewrites.
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub fn placeholder_url(&self) -> &str {
        &self.config.placeholder_url
    }

    fn rewrite_or_placeholder(&self, original_url: &str, thumbnail: Option<ThumbnailSize>) -> String {
        self.try_rewrite(original_url, thumbnail).unwrap_or_else(|err| {
            warn!("Falling back to placeholder attachment URL: {}", err);
            self.config.placeholder_url.clone()
        })
    }

    fn render(&self, reference: &AttachmentReference, thumbnail: Option<ThumbnailSize>) -> String {
        let mut query = Vec::with_capacity(3);
        if let Some(secret) = &reference.share_secret {
            query.push(format!("{}={}", SHARE_SECRET_PARAM, secret));
        }
        query.push("em-redirect=true".to_string());
        if let Some(size) = thumbnail {
            query.push(format!("thumbnail={}", size.dimensions()));
        }

        format!(
            "{}/{}/{}/{}/{}?{}",
            self.config.public_base_url,
            reference.org_id,
            reference.app_id,
            CHAT_FILES_SEGMENT,
            reference.file_name,
            query.join("&")
        )
    }
}
