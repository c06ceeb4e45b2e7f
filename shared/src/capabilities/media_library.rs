use crux_core::capability::{Capability, CapabilityContext, Operation};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

use crate::model::{MediaId, MediaKind};

static IMAGE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(gif|jpe?g|tiff?|png|webp|bmp)$").expect("image extension pattern")
});

pub struct MediaLibrary<Ev> {
    context: CapabilityContext<MediaLibraryOperation, Ev>,
}

impl<Ev> Capability<Ev> for MediaLibrary<Ev> {
    type Operation = MediaLibraryOperation;
    type MappedSelf<MappedEv> = MediaLibrary<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        MediaLibrary::new(self.context.map_event(f))
    }
}

impl<Ev> MediaLibrary<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<MediaLibraryOperation, Ev>) -> Self {
        Self { context }
    }

    /// Downloads `url` into the device library as a photo or a video.
    pub fn save<F>(&self, url: String, callback: F)
    where
        F: FnOnce(MediaLibraryResult) -> Ev + Send + 'static,
    {
        let kind = classify_url(&url);
        self.run(MediaLibraryOperation::Save { url, kind }, callback);
    }

    /// Resolves a cached local copy if the shell has one, else the remote URL.
    pub fn locate_playable<F>(&self, media_id: MediaId, remote_url: String, callback: F)
    where
        F: FnOnce(MediaLibraryResult) -> Ev + Send + 'static,
    {
        self.run(
            MediaLibraryOperation::LocatePlayable {
                media_id,
                remote_url,
            },
            callback,
        );
    }

    fn run<F>(&self, operation: MediaLibraryOperation, callback: F)
    where
        F: FnOnce(MediaLibraryResult) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(callback(result));
        });
    }
}

/// Picks the library save path from the URL's extension. Query strings and
/// fragments of presigned URLs are ignored.
pub fn classify_url(url: &str) -> MediaKind {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    if IMAGE_EXTENSION.is_match(&path) {
        MediaKind::Photo
    } else {
        MediaKind::Video
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaLibraryOperation {
    Save { url: String, kind: MediaKind },
    LocatePlayable { media_id: MediaId, remote_url: String },
}

impl Operation for MediaLibraryOperation {
    type Output = MediaLibraryResult;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaLibraryOutput {
    Saved,
    Located { uri: String },
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaLibraryError {
    #[error("download failed: {message}")]
    Download { message: String },

    #[error("could not write to the media library: {message}")]
    Storage { message: String },

    #[error("permission denied")]
    PermissionDenied,

    #[error("unexpected media library output: {output}")]
    UnexpectedOutput { output: String },
}

pub type MediaLibraryResult = Result<MediaLibraryOutput, MediaLibraryError>;
