//! Thin wrapper around the `ffmpeg` and `ffprobe` command line tools.
//!
//! Frames are decoded by an `ffmpeg` child process and streamed back over
//! its stdout as raw `rgb24` buffers, so no ffmpeg libraries need to be linked.
//!
//! ```no_run
//! use ffmpeg_cmdline_utils::FfmpegFrameReaderBuilder;
//!
//! let (frames, info) = FfmpegFrameReaderBuilder::new("lesson.mp4").spawn_rgb()?;
//! println!("{:?} at {:?} fps", info.resolution(), info.frame_rate());
//! for frame in frames {
//!     let _ = frame.dimensions();
//! }
//! # Ok::<(), ffmpeg_cmdline_utils::FfmpegError>(())
//! ```

#![deny(clippy::dbg_macro)]

mod ffmpeg_error_kind;
mod ffmpeg_ops;
mod ffmpeg_stats;

pub use ffmpeg_error_kind::FfmpegError;
pub use ffmpeg_ops::{
    ffmpeg_and_ffprobe_are_callable, get_video_stats, is_video_file, FfmpegFrameIterRgb,
    FfmpegFrameReaderBuilder, StreamEnd,
};
pub use ffmpeg_stats::{VideoInfo, VideoInfoError};
