use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the find/wait/observe protocol.
///
/// `FindFailed` is the only transient condition that ever becomes an error,
/// and only after the region's escalation policy decided to abort. The
/// other variants are configuration or environment problems: retrying
/// cannot fix a missing file, so they surface immediately.
#[derive(Debug, Error)]
pub enum FindError {
    /// The target never appeared and the FindFailed policy said abort.
    #[error("cannot find {0} on the screen")]
    FindFailed(String),

    /// The target references an image file that is not on disk.
    #[error("image file {} not found on disk", .0.display())]
    ImageMissing(PathBuf),

    /// A text target was given while text search is switched off or no
    /// recognizer is installed.
    #[error("text search is currently switched off (target \"{0}\")")]
    TextSearchUnsupported(String),

    /// Screen capture failed or the rect lies outside the display.
    #[error("screen capture failed: {0}")]
    Capture(String),
}
