use std::fmt;
use std::path::Path;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};

use crate::surface::PaintMode;

/// Which semantic content a snapshot holds. The label picks the upload
/// path on the collection server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Image,
    Depth,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Image => "image",
            Label::Depth => "depth",
        }
    }

    /// The paint mode whose output this label describes.
    pub fn mode(&self) -> PaintMode {
        match self {
            Label::Image => PaintMode::Color,
            Label::Depth => PaintMode::Depth,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An encoded JPEG of the surface at the moment of capture. Immutable
/// once produced.
pub struct Snapshot {
    label: Label,
    bytes: Vec<u8>,
}

impl Snapshot {
    pub fn new(label: Label, bytes: Vec<u8>) -> Self {
        Self { label, bytes }
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Writes the snapshot into a directory as `<label>.jpg`.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<()> {
        std::fs::write(dir.join(format!("{}.jpg", self.label)), &self.bytes)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid server URL [{0}]")]
    BadUrl(String),

    /// Connection or protocol failure; logged, never retried
    #[error("request: {0}")]
    Transport(#[from] reqwest::Error),

    /// The dispatch task itself was cancelled or panicked
    #[error("upload task aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

/// How an upload ended. Any server status counts as delivered; the status
/// is logged, never branched on.
#[derive(Debug)]
pub enum UploadOutcome {
    Delivered(reqwest::StatusCode),
    Failed(UploadError),
}

impl UploadOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, UploadOutcome::Delivered(_))
    }
}

/// A dispatched upload. The request is already in flight; awaiting the
/// task observes its outcome without affecting it.
pub struct UploadTask {
    label: Label,
    handle: tokio::task::JoinHandle<UploadOutcome>,
}

impl UploadTask {
    pub fn label(&self) -> Label {
        self.label
    }

    pub async fn wait(self) -> UploadOutcome {
        let UploadTask { label, handle } = self;
        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("{label} upload task aborted: {e}");
                UploadOutcome::Failed(UploadError::Aborted(e))
            }
        }
    }
}

/// Sends snapshots to the collection server. Cheap to clone; the inner
/// HTTP client is shared.
#[derive(Clone)]
pub struct Uploader {
    client: reqwest::Client,
    base: String,
}

impl Uploader {
    /// Builds an uploader for a base URL such as `http://127.0.0.1:8000`.
    pub fn new(base: impl Into<String>) -> Result<Uploader, UploadError> {
        let base = base.into();
        let trimmed = base.trim_end_matches('/').to_string();
        // Validate early so a bad flag fails at startup, not mid-sequence.
        reqwest::Url::parse(&trimmed)
            .map_err(|_| UploadError::BadUrl(trimmed.clone()))?;
        Ok(Uploader {
            client: reqwest::Client::new(),
            base: trimmed,
        })
    }

    /// The full endpoint a label posts to.
    pub fn endpoint(&self, label: Label) -> String {
        format!("{}/return/{}", self.base, label)
    }

    /// Dispatches the snapshot as an HTTP POST. The request runs on the
    /// Tokio runtime; this returns immediately with a handle to the
    /// in-flight task. Must be called from within a runtime context.
    pub fn send(&self, snapshot: Snapshot) -> UploadTask {
        let label = snapshot.label();
        let url = self.endpoint(label);
        let client = self.client.clone();
        let handle = tokio::spawn(async move {
            let len = snapshot.bytes.len();
            log::debug!("POST {url} ({len} bytes)");
            let result = client
                .post(&url)
                .header(CONTENT_TYPE, "image/jpeg")
                .header(CONTENT_LENGTH, len)
                .body(snapshot.bytes)
                .send()
                .await;
            match result {
                Ok(response) => {
                    log::info!("{label} upload: {}", response.status());
                    UploadOutcome::Delivered(response.status())
                }
                Err(e) => {
                    log::error!("{label} upload failed: {e}");
                    UploadOutcome::Failed(UploadError::Transport(e))
                }
            }
        });
        UploadTask { label, handle }
    }
}
