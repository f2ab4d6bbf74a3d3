//! Rendered artifacts and remote publication references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::Region;

/// Reference to a finished video produced by a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Where the video file lives (renderer-specific, usually a local path).
    pub location: PathBuf,
    /// Region the video was rendered for.
    pub region: Region,
    /// Length of the video.
    pub duration_ms: u64,
    /// Name featured in the video, used for captions.
    pub caption_subject: String,
    /// Amount as shown on screen, already formatted for the region.
    pub amount_display: String,
    /// Whether the file should be kept after publishing.
    pub persist_file: bool,
    /// When rendering finished.
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Caption used when publishing this artifact.
    pub fn caption(&self) -> String {
        format!(
            "👑 {} - {} {}\n\n{}",
            self.caption_subject,
            self.region.currency_symbol(),
            self.amount_display,
            self.region.hashtags()
        )
    }
}

/// Identifier of a published post on the remote platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteReference {
    /// Publisher that produced this reference.
    pub platform: String,
    /// Post identifier assigned by the platform.
    pub remote_id: String,
    pub published_at: DateTime<Utc>,
}
