/// The default number of changed pixels between two consecutive frames above which a
/// new page is captured. A pixel counts as changed when its intensity moves by more than
/// [`vid_score_common::PIXEL_DIFF_THRESHOLD`].
///
/// Lower values capture more eagerly (and risk capturing mid-scroll). Higher values may
/// miss page turns which only change a small part of the frame.
///
/// Unit: Pixels
pub const DEFAULT_CHANGE_THRESHOLD: u64 = 50_000;

/// The default number of frames after a capture during which no new capture can occur.
/// A single page turn usually spans several frames, all of which exceed the threshold.
///
/// Unit: Frames
pub const DEFAULT_COOLDOWN_FRAMES: u32 = 40;

/// The default mean intensity a frame must exceed before it is treated as content.
/// Near-black frames at the start of a recording (e.g. fade-ins) are skipped.
///
/// Unit: Mean grayscale intensity, 0-255
pub const DEFAULT_BRIGHTNESS_FLOOR: f64 = 5.0;

/// The default number of frames skipped after the first bright frame before the first
/// page is captured, to get past any opening transition.
///
/// Unit: Frames
pub const DEFAULT_INITIAL_JUMP_FRAMES: u32 = 40;

//Quality of the page images embedded into the output document.
pub const PDF_JPEG_QUALITY: u8 = 90;

pub const POINTS_PER_MM: f64 = 72.0 / 25.4;
