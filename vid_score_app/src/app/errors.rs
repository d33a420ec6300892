use std::path::PathBuf;

use thiserror::Error;
use vid_score_common::RenderError;
use vid_score_lib::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Video list not found at {}. Create it with one video path per line", .0.display())]
    MissingVideoList(PathBuf),

    #[error("Failed to read video list at {}: {source}", path.display())]
    VideoListUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Ffmpeg and/or Ffprobe could not be called. Make sure both are installed and on the PATH")]
    FfmpegMissing,

    #[error("Score creation error: {0}")]
    Score(#[from] Error),

    #[error("Sheet preview error: {0}")]
    Preview(#[from] RenderError),

    #[error("Failed to write {}: {source}", path.display())]
    PreviewWrite {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize sheet layouts: {0}")]
    LayoutJson(#[from] serde_json::Error),

    #[error("{0} of {1} videos could not be read")]
    VideosFailed(usize, usize),
}

pub fn print_error_and_quit(e: eyre::Report) -> ! {
    #[allow(clippy::print_stderr)]
    let () = eprintln!("{:?}", e);
    std::process::exit(1);
}
