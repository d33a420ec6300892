pub mod captured_pages;
pub mod page_detector;
pub mod page_images;
pub mod pdf_output;
pub mod score_builder;

use std::path::PathBuf;

use ffmpeg_cmdline_utils::FfmpegError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vid_score_common::{LayoutError, RenderError};

/// An error that prevented a score from being extracted or written.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum Error {
    /// The video could not be opened or decoded at all. No pages are produced for it.
    #[error("Could not read video {}: {error}", src_path.display())]
    SourceUnreadable {
        src_path: PathBuf,
        error: FfmpegError,
    },

    /// File is not a video.
    #[error("File is not a video: {}", .0.display())]
    NotVideo(PathBuf),

    #[error("Invalid sheet layout: {0}")]
    Layout(#[from] LayoutError),

    #[error("Failed to render sheet: {0}")]
    Render(#[from] RenderError),

    #[error("Failed to build PDF: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<lopdf::Error> for Error {
    fn from(e: lopdf::Error) -> Self {
        Self::Pdf(e.to_string())
    }
}
