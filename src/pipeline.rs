//! The upload-event pipeline.
//!
//! On an image upload the hosting runtime hands us the bucket and object
//! path. Uploads under `stories/` and `messages/` are described by the
//! vision model, matched against the tag index, filtered by the oracle, and
//! the surviving tags are written through the document store. Everything
//! cloud-specific sits behind the [`ObjectStore`] and [`DocumentStore`]
//! seams.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{debug, info, warn};

use crate::{
    backend::{ChatBackend, EmbeddingBackend},
    data_dir::DataDir,
    describe::{describe_image, is_no_content},
    error::Result,
    filter::select_tags,
    retrieval::{IndexCache, Retriever, TOP_K},
};

/// Matches urllib's `quote(path, safe="")`: encode everything but the
/// unreserved characters.
const OBJECT_PATH_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A storage finalize event, as delivered by the hosting runtime.
#[derive(Debug, Clone)]
pub struct UploadEvent {
    pub bucket: String,
    pub path: String,
}

/// Where the final tags get written, resolved from the object path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagTarget {
    /// `stories/<userId>/<mediaId>.<ext>`: the media entry inside the
    /// user's story document.
    Story { user_id: String, media_id: String },
    /// `messages/...`: the message document whose media URL starts with
    /// this prefix.
    Message { media_url_prefix: String },
}

/// Signed-URL access to uploaded objects.
pub trait ObjectStore {
    fn signed_url(&self, bucket: &str, path: &str) -> Result<String>;
}

/// Tag updates against the document database.
pub trait DocumentStore {
    fn set_story_media_tags(
        &self,
        user_id: &str,
        media_id: &str,
        tags: &[String],
    ) -> Result<()>;

    fn set_message_tags(
        &self,
        media_url_prefix: &str,
        tags: &[String],
    ) -> Result<()>;
}

/// Resolve the document-store target for an uploaded object, or `None` for
/// uploads outside the handled folders.
pub fn resolve_target(bucket: &str, path: &str) -> Option<TagTarget> {
    if let Some(rest) = path.strip_prefix("stories/") {
        let (user_id, media_filename) = rest.split_once('/')?;
        if user_id.is_empty() || media_filename.is_empty() {
            return None;
        }
        // Drop the extension; story media is keyed by its bare ID.
        let media_id = media_filename
            .rsplit_once('.')
            .map_or(media_filename, |(stem, _)| stem);
        if media_id.is_empty() {
            return None;
        }
        Some(TagTarget::Story {
            user_id: user_id.to_string(),
            media_id: media_id.to_string(),
        })
    } else if path.strip_prefix("messages/").is_some() {
        Some(TagTarget::Message {
            media_url_prefix: media_url_prefix(bucket, path),
        })
    } else {
        None
    }
}

/// Public download URL prefix for an uploaded object, used to locate the
/// message document that references it.
pub fn media_url_prefix(bucket: &str, path: &str) -> String {
    format!(
        "https://firebasestorage.googleapis.com/v0/b/{bucket}/o/{}?alt=media",
        utf8_percent_encode(path, OBJECT_PATH_ENCODE)
    )
}

/// The assembled online pipeline.
pub struct AutoTagger<'a> {
    data_dir: &'a DataDir,
    cache: &'a IndexCache,
    embeddings: &'a dyn EmbeddingBackend,
    chat: &'a dyn ChatBackend,
    objects: &'a dyn ObjectStore,
    documents: &'a dyn DocumentStore,
}

impl<'a> AutoTagger<'a> {
    pub fn new(
        data_dir: &'a DataDir,
        cache: &'a IndexCache,
        embeddings: &'a dyn EmbeddingBackend,
        chat: &'a dyn ChatBackend,
        objects: &'a dyn ObjectStore,
        documents: &'a dyn DocumentStore,
    ) -> Self {
        Self {
            data_dir,
            cache,
            embeddings,
            chat,
            objects,
            documents,
        }
    }

    /// Handle one upload event end to end.
    ///
    /// Returns the tags written for a handled upload, or `None` when the
    /// path is outside the handled folders. Configuration and backend
    /// failures abort the invocation; nothing partial is written.
    pub fn handle(&self, event: &UploadEvent) -> Result<Option<Vec<String>>> {
        let Some(target) = resolve_target(&event.bucket, &event.path)
        else {
            debug!(path = %event.path, "ignoring upload outside handled folders");
            return Ok(None);
        };

        info!(path = %event.path, "received upload event");

        let url = self.objects.signed_url(&event.bucket, &event.path)?;
        let description = describe_image(self.chat, &url)?;
        info!(%description, "vision description");

        let tags = if is_no_content(&description) {
            Vec::new()
        } else {
            let retriever = Retriever::open(self.cache, self.data_dir)?;
            let candidates =
                retriever.retrieve(self.embeddings, &description, TOP_K)?;
            let candidate_tags: Vec<String> =
                candidates.into_iter().map(|c| c.tag).collect();
            info!(?candidate_tags, "candidate tags");

            select_tags(self.chat, &description, &candidate_tags)?
        };
        info!(?tags, "validated tags");

        match &target {
            TagTarget::Story { user_id, media_id } => {
                self.documents
                    .set_story_media_tags(user_id, media_id, &tags)?;
            }
            TagTarget::Message { media_url_prefix } => {
                self.documents.set_message_tags(media_url_prefix, &tags)?;
            }
        }

        if tags.is_empty() {
            warn!(path = %event.path, "no relevant tags for upload");
        }
        Ok(Some(tags))
    }
}
