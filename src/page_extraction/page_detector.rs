use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use vid_score_common::{
    autocrop, count_changed_pixels, to_gray, FrameDiffError, GrayFrameExt, PIXEL_DIFF_THRESHOLD,
};

use crate::definitions::{
    DEFAULT_BRIGHTNESS_FLOOR, DEFAULT_CHANGE_THRESHOLD, DEFAULT_COOLDOWN_FRAMES,
    DEFAULT_INITIAL_JUMP_FRAMES,
};
use crate::CapturedPages;

/// Options controlling how pages are detected in a stream of frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorOptions {
    /// A frame is captured when more than this many pixels changed since the previous frame.
    ///
    /// Unit: Pixels
    pub change_threshold: u64,

    /// After a capture, this many frames are only remembered, never compared.
    ///
    /// Unit: Frames
    pub cooldown_frames: u32,

    /// Frames with a mean intensity at or below this value are skipped until the
    /// first page is found.
    ///
    /// The mean is taken over the luma (grayscale) projection of the frame, not over
    /// any single colour channel.
    ///
    /// Unit: Mean luma intensity, 0-255
    pub brightness_floor: f64,

    /// Number of frames discarded after the first bright frame. The frame after
    /// them becomes the first page.
    ///
    /// Unit: Frames
    pub initial_jump_frames: u32,
}

impl std::default::Default for DetectorOptions {
    fn default() -> Self {
        Self {
            change_threshold: DEFAULT_CHANGE_THRESHOLD,
            cooldown_frames: DEFAULT_COOLDOWN_FRAMES,
            brightness_floor: DEFAULT_BRIGHTNESS_FLOOR,
            initial_jump_frames: DEFAULT_INITIAL_JUMP_FRAMES,
        }
    }
}

/// Counters describing what the detector did with a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionStats {
    pub frames_read: u64,
    pub frames_compared: u64,
    pub frames_in_cooldown: u64,
    pub size_mismatches: u64,
    pub captures: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingContent,
    Jumping { remaining: u32 },
    Tracking,
}

/// State carried from one frame to the next once the first page is found.
///
/// `cooldown_remaining` only ever decreases by one per frame, or is reset
/// to the full cooldown by a capture.
#[derive(Debug, Clone, Default)]
pub struct DetectorState {
    previous_gray: Option<GrayImage>,
    cooldown_remaining: u32,
}

impl DetectorState {
    pub fn previous_gray(&self) -> Option<&GrayImage> {
        self.previous_gray.as_ref()
    }

    pub fn cooldown_remaining(&self) -> u32 {
        self.cooldown_remaining
    }
}

/// Finds page changes in a stream of frames, one frame at a time.
///
/// Frames must be pushed in stream order. Captured pages are autocropped
/// before they are stored.
#[derive(Debug)]
pub struct PageDetector {
    opts: DetectorOptions,
    phase: Phase,
    state: DetectorState,
    pages: CapturedPages,
    stats: DetectionStats,
}

impl PageDetector {
    pub fn new(opts: DetectorOptions) -> Self {
        Self {
            opts,
            phase: Phase::AwaitingContent,
            state: DetectorState::default(),
            pages: CapturedPages::default(),
            stats: DetectionStats::default(),
        }
    }

    pub fn options(&self) -> &DetectorOptions {
        &self.opts
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    pub fn stats(&self) -> &DetectionStats {
        &self.stats
    }

    pub fn pages(&self) -> &CapturedPages {
        &self.pages
    }

    /// True once the first page has been captured.
    pub fn is_tracking(&self) -> bool {
        self.phase == Phase::Tracking
    }

    /// Process the next frame. Returns the index of the page captured from it, if any.
    pub fn push_frame(&mut self, frame: RgbImage) -> Option<usize> {
        let frame_index = self.stats.frames_read;
        self.stats.frames_read += 1;

        match self.phase {
            Phase::AwaitingContent => {
                if to_gray(&frame).mean_brightness() > self.opts.brightness_floor {
                    trace!("first content at frame {frame_index}");
                    self.phase = Phase::Jumping {
                        remaining: self.opts.initial_jump_frames,
                    };
                }
                None
            }

            Phase::Jumping { remaining } if remaining > 0 => {
                self.phase = Phase::Jumping {
                    remaining: remaining - 1,
                };
                None
            }

            Phase::Jumping { .. } => {
                self.phase = Phase::Tracking;
                self.state.previous_gray = Some(to_gray(&frame));
                Some(self.capture(frame_index, &frame))
            }

            Phase::Tracking => self.track(frame_index, frame),
        }
    }

    fn track(&mut self, frame_index: u64, frame: RgbImage) -> Option<usize> {
        let gray = to_gray(&frame);

        let triggered = if self.state.cooldown_remaining > 0 {
            self.state.cooldown_remaining -= 1;
            self.stats.frames_in_cooldown += 1;
            false
        } else {
            match self.state.previous_gray.as_ref() {
                None => false,
                Some(prev) => match count_changed_pixels(prev, &gray, PIXEL_DIFF_THRESHOLD) {
                    Ok(changed) => {
                        self.stats.frames_compared += 1;
                        changed > self.opts.change_threshold
                    }
                    Err(FrameDiffError::DimensionMismatch { prev, curr }) => {
                        warn!(
                            "frame {frame_index} is {curr:?} but the previous frame was {prev:?}. Not comparing it"
                        );
                        self.stats.size_mismatches += 1;
                        false
                    }
                },
            }
        };

        self.state.previous_gray = Some(gray);

        if triggered {
            self.state.cooldown_remaining = self.opts.cooldown_frames;
            Some(self.capture(frame_index, &frame))
        } else {
            None
        }
    }

    fn capture(&mut self, frame_index: u64, frame: &RgbImage) -> usize {
        let page_idx = self.pages.push(frame_index, autocrop(frame));
        self.stats.captures += 1;
        debug!("captured page {page_idx} at frame {frame_index}");
        page_idx
    }

    pub fn finish(self) -> (CapturedPages, DetectionStats) {
        (self.pages, self.stats)
    }
}

/// Run a whole frame stream through a fresh [`PageDetector`].
pub fn detect<I>(frames: I, opts: DetectorOptions) -> CapturedPages
where
    I: IntoIterator<Item = RgbImage>,
{
    let detector = frames
        .into_iter()
        .fold(PageDetector::new(opts), |mut detector, frame| {
            detector.push_frame(frame);
            detector
        });

    detector.finish().0
}

#[cfg(test)]
mod test {
    use image::Rgb;

    use super::*;

    const W: u32 = 20;
    const H: u32 = 10;

    fn solid(val: u8) -> RgbImage {
        RgbImage::from_pixel(W, H, Rgb([val, val, val]))
    }

    fn opts(jump: u32, cooldown: u32) -> DetectorOptions {
        DetectorOptions {
            change_threshold: 50,
            cooldown_frames: cooldown,
            brightness_floor: 5.0,
            initial_jump_frames: jump,
        }
    }

    fn run(frames: Vec<RgbImage>, opts: DetectorOptions) -> (CapturedPages, DetectionStats) {
        let mut detector = PageDetector::new(opts);
        for frame in frames {
            detector.push_frame(frame);
        }
        detector.finish()
    }

    #[test]
    fn test_all_dark_captures_nothing() {
        let (pages, stats) = run(vec![solid(0); 30], opts(0, 0));
        assert!(pages.is_empty());
        assert_eq!(stats.frames_read, 30);
        assert_eq!(stats.frames_compared, 0);
    }

    #[test]
    fn test_brightness_floor_is_exclusive() {
        let (pages, _) = run(vec![solid(5); 10], opts(0, 0));
        assert!(pages.is_empty());

        let (pages, _) = run(vec![solid(6); 10], opts(0, 0));
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_jump_lands_after_skipped_frames() {
        //bright frame at index 3, two frames skipped, page taken from index 6
        let mut frames = vec![solid(0); 3];
        frames.extend((0..10).map(|_| solid(100)));

        let (pages, stats) = run(frames, opts(2, 0));
        assert_eq!(pages.frame_indices().collect::<Vec<_>>(), vec![6]);
        assert_eq!(stats.captures, 1);
    }

    #[test]
    fn test_zero_jump_takes_next_frame() {
        let frames = vec![solid(0), solid(100), solid(100), solid(100)];
        let (pages, _) = run(frames, opts(0, 0));
        assert_eq!(pages.frame_indices().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_stream_ending_during_jump_captures_nothing() {
        let frames = vec![solid(0), solid(100), solid(100)];
        let (pages, _) = run(frames, opts(5, 0));
        assert!(pages.is_empty());
    }

    #[test]
    fn test_cooldown_suppresses_retrigger() {
        //f0 bright, f1 first page, f2 changes, f3..f5 cool down, f6 changes again
        let frames = vec![
            solid(100),
            solid(100),
            solid(200),
            solid(100),
            solid(200),
            solid(100),
            solid(200),
        ];

        let (pages, stats) = run(frames, opts(0, 3));
        assert_eq!(pages.frame_indices().collect::<Vec<_>>(), vec![1, 2, 6]);
        assert_eq!(stats.frames_in_cooldown, 3);
    }

    #[test]
    fn test_change_threshold_is_exclusive() {
        let mut changed = solid(100);
        //exactly 50 pixels change: not enough
        for (x, y) in (0..W).flat_map(|x| (0..H).map(move |y| (x, y))).take(50) {
            changed.put_pixel(x, y, Rgb([250, 250, 250]));
        }
        let mut more_changed = changed.clone();
        more_changed.put_pixel(W - 1, H - 1, Rgb([250, 250, 250]));

        let (pages, _) = run(vec![solid(100), solid(100), changed], opts(0, 0));
        assert_eq!(pages.len(), 1);

        let (pages, _) = run(vec![solid(100), solid(100), more_changed], opts(0, 0));
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn test_small_differences_are_not_changes() {
        //every pixel moves, but only by 30, which is not above the pixel threshold
        let (pages, _) = run(vec![solid(100), solid(100), solid(130)], opts(0, 0));
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_slow_drift_is_never_captured() {
        //each step moves every pixel by 10: the total drift is large but no step triggers
        let frames = (0..20).map(|i| solid(20 + i * 10)).collect::<Vec<_>>();
        let (pages, stats) = run(frames, opts(0, 0));

        assert_eq!(pages.len(), 1);
        assert_eq!(stats.frames_compared, 18);
    }

    #[test]
    fn test_size_change_is_skipped_and_replaces_previous() {
        let big = RgbImage::from_pixel(W * 2, H, Rgb([100, 100, 100]));
        let big_changed = RgbImage::from_pixel(W * 2, H, Rgb([200, 200, 200]));

        let frames = vec![solid(100), solid(100), big.clone(), big, big_changed];
        let (pages, stats) = run(frames, opts(0, 0));

        assert_eq!(stats.size_mismatches, 1);
        assert_eq!(pages.frame_indices().collect::<Vec<_>>(), vec![1, 4]);
    }

    #[test]
    fn test_captures_are_autocropped() {
        let mut letterboxed = RgbImage::new(W, H);
        for x in 0..W {
            for y in 2..8 {
                letterboxed.put_pixel(x, y, Rgb([180, 180, 180]));
            }
        }

        let (pages, _) = run(vec![letterboxed.clone(), letterboxed], opts(0, 0));
        assert_eq!(pages.get(0).unwrap().image().dimensions(), (W, 6));
    }

    #[test]
    fn test_detect_matches_push_frame() {
        let frames = vec![solid(0), solid(90), solid(90), solid(10), solid(90)];
        let (expected, _) = run(frames.clone(), opts(0, 1));
        assert_eq!(detect(frames, opts(0, 1)), expected);
    }

    #[test]
    fn test_state_is_exposed() {
        let mut detector = PageDetector::new(opts(0, 2));
        assert!(!detector.is_tracking());

        detector.push_frame(solid(100));
        detector.push_frame(solid(100));
        assert!(detector.is_tracking());
        assert!(detector.state().previous_gray().is_some());

        detector.push_frame(solid(200));
        assert_eq!(detector.state().cooldown_remaining(), 2);
        detector.push_frame(solid(200));
        assert_eq!(detector.state().cooldown_remaining(), 1);
    }
}
