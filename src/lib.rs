#![allow(clippy::let_and_return)]
#![allow(clippy::len_without_is_empty)]
#![warn(clippy::cast_lossless)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![warn(clippy::todo)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::unimplemented)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::panic)]
#![allow(clippy::doc_markdown)]

//! # Overview
//! vid_score_lib turns a screen recording of a paged document (sheet music, slides, a
//! scrolled PDF) back into a printable document.
//!
//! # How it works
//! * Every frame of the video is decoded in order.
//! * Near-black frames at the start are skipped. Once real content appears, a short jump
//!   is made past any opening transition and that frame becomes the first page.
//! * After that, each frame is compared against the one before it. When enough pixels
//!   change the frame is captured as a new page, and no further capture is allowed for a
//!   cooldown period so that one page turn is only captured once.
//! * Each captured page has its black borders cropped off.
//! * Pages are laid out two per sheet (top and bottom), scaled to fit without distortion,
//!   and written to a PDF.
//!
//! # High Level API
//! ```no_run
//! use vid_score_lib::{build_score, DetectorOptions, SheetSpec};
//!
//! let summary = build_score(
//!     "lesson.mp4",
//!     "lesson_score.pdf",
//!     DetectorOptions::default(),
//!     SheetSpec::default(),
//! )?;
//! assert_eq!(summary.sheets, summary.pages.div_ceil(2));
//! # Ok::<(), vid_score_lib::Error>(())
//! ```
//!
//! For frames that do not come from a file, use [`build_score_from_frames`], drive a
//! [`PageDetector`] directly, or
//! use [`detect`] over any iterator of frames.
//!
//! # Limitations
//! Each frame is compared only with the frame immediately before it. A slow fade or scroll
//! where no single step exceeds the threshold is never captured, however large the total
//! change.
//!
//! # Prerequisites
//! This crate calls Ffmpeg from the command line. You must make Ffmpeg and Ffprobe available
//! on the command line, for example:
//!
//! * Debian-based systems: ```# apt-get install ffmpeg```
//! * Yum-based systems: ```# yum install ffmpeg```
//! * Windows:
//!     1) Download the correct installer from <https://ffmpeg.org/download.html>
//!     2) Run the installer and install ffmpeg to any directory
//!     3) Add the directory into the PATH environment variable

#[macro_use]
extern crate log;

mod definitions;
mod page_extraction;

pub use page_extraction::{
    captured_pages::{CapturedPage, CapturedPages},
    page_detector::{detect, DetectionStats, DetectorOptions, DetectorState, PageDetector},
    page_images::{load_page_images, placed_images},
    pdf_output::PdfSheetWriter,
    score_builder::{build_score, build_score_from_frames, Score, ScoreExtractor, ScoreSummary},
    Error,
};

pub use definitions::{
    DEFAULT_BRIGHTNESS_FLOOR, DEFAULT_CHANGE_THRESHOLD, DEFAULT_COOLDOWN_FRAMES,
    DEFAULT_INITIAL_JUMP_FRAMES,
};

pub use vid_score_common::{
    Placement, SheetLayout, SheetSpec, Slot, A4_HEIGHT_MM, A4_WIDTH_MM, DEFAULT_MARGIN_MM,
};
