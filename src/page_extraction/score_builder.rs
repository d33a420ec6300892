use std::path::Path;

use ffmpeg_cmdline_utils::{is_video_file, FfmpegError, FfmpegFrameReaderBuilder, StreamEnd};
use image::RgbImage;
use vid_score_common::{compose_sheets, render_sheet, RenderError, SheetLayout, SheetSpec};

use crate::page_extraction::page_images::placed_images;
use crate::{CapturedPages, DetectionStats, DetectorOptions, Error, PageDetector, PdfSheetWriter};

/// Extracts the pages of a video by decoding it with ffmpeg and running every frame
/// through a [`PageDetector`].
///
/// Use the default constructor unless supplying custom options.
#[derive(Debug, Clone, Default)]
pub struct ScoreExtractor {
    options: DetectorOptions,
}

impl ScoreExtractor {
    pub fn from_options(options: DetectorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }

    /// Decode `src_path` from the start and capture its pages.
    ///
    /// Finding no pages is not an error: the returned [`CapturedPages`] is simply empty.
    ///
    /// # errors
    /// * [`Error::NotVideo`] if ffprobe finds no usable video stream
    /// * [`Error::SourceUnreadable`] if the video cannot be probed, spawned or decoded at all
    pub fn extract(
        &self,
        src_path: impl AsRef<Path>,
    ) -> Result<(CapturedPages, DetectionStats), Error> {
        let src_path = src_path.as_ref();
        let unreadable = |error: FfmpegError| Error::SourceUnreadable {
            src_path: src_path.to_path_buf(),
            error,
        };

        //ffprobe reports a missing file as "no video streams", so check it first
        if !src_path.is_file() {
            return Err(unreadable(FfmpegError::Io(format!(
                "{} does not exist or is not a file",
                src_path.display()
            ))));
        }

        if !is_video_file(src_path).map_err(unreadable)? {
            return Err(Error::NotVideo(src_path.to_path_buf()));
        }

        let (mut frames, info) = FfmpegFrameReaderBuilder::new(src_path)
            .multithreaded(true)
            .spawn_rgb()
            .map_err(unreadable)?;

        debug!(
            "{}: {:?} at {:?} fps, {:.1}s",
            src_path.display(),
            info.resolution(),
            info.frame_rate(),
            info.duration().as_secs_f64()
        );

        let mut detector = PageDetector::new(self.options);
        for frame in frames.by_ref() {
            detector.push_frame(frame);
        }

        match frames.end_reason() {
            Some(StreamEnd::TimedOut) => warn!(
                "{}: decoding timed out after {} frames",
                src_path.display(),
                frames.frames_read()
            ),
            Some(StreamEnd::ReadFailed) => warn!(
                "{}: frame stream was cut off after {} frames",
                src_path.display(),
                frames.frames_read()
            ),
            _ => (),
        }

        let (pages, stats) = detector.finish();
        if stats.frames_read == 0 {
            return Err(unreadable(FfmpegError::FfmpegInternal(
                "no frames could be decoded".to_string(),
            )));
        }

        info!(
            "{}: read {} frames, captured {} pages",
            src_path.display(),
            stats.frames_read,
            pages.len()
        );

        Ok((pages, stats))
    }
}

/// An ordered set of page images laid out onto sheets.
#[derive(Debug, Clone)]
pub struct Score {
    sheet: SheetSpec,
    pages: Vec<Option<RgbImage>>,
    layouts: Vec<SheetLayout>,
}

impl Score {
    /// Lay out `pages` two per sheet. A None page leaves its slot empty.
    pub fn compose(pages: Vec<Option<RgbImage>>, sheet: SheetSpec) -> Self {
        let layouts = compose_sheets(
            pages.iter().map(|page| page.as_ref().map(RgbImage::dimensions)),
            &sheet,
        );

        Self {
            sheet,
            pages,
            layouts,
        }
    }

    pub fn from_captured(pages: CapturedPages, sheet: SheetSpec) -> Self {
        Self::compose(pages.into_images().map(Some).collect(), sheet)
    }

    pub fn sheet_spec(&self) -> &SheetSpec {
        &self.sheet
    }

    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn layouts(&self) -> &[SheetLayout] {
        &self.layouts
    }

    pub fn to_pdf(&self) -> Result<PdfSheetWriter, Error> {
        let mut writer = PdfSheetWriter::new(self.sheet);
        for layout in &self.layouts {
            writer.add_sheet(placed_images(layout, &self.pages))?;
        }
        Ok(writer)
    }

    pub fn write_pdf(&self, dst_path: impl AsRef<Path>) -> Result<(), Error> {
        self.to_pdf()?.save(dst_path)
    }

    /// Rasterise each sheet in order, at `px_per_mm` pixels per millimetre.
    pub fn render_sheets(
        &self,
        px_per_mm: f64,
    ) -> impl Iterator<Item = Result<RgbImage, RenderError>> + '_ {
        self.layouts.iter().map(move |layout| {
            render_sheet(&self.sheet, placed_images(layout, &self.pages), px_per_mm)
        })
    }
}

/// What [`build_score`] did with one video.
#[derive(Debug, Clone)]
pub struct ScoreSummary {
    pub pages: usize,
    pub sheets: usize,
    pub frames_read: u64,
    /// False if no pages were found, in which case no document was written.
    pub written: bool,
    pub score: Score,
}

/// Extract the pages of `src_path` and write them two per sheet to `dst_pdf`.
pub fn build_score(
    src_path: impl AsRef<Path>,
    dst_pdf: impl AsRef<Path>,
    options: DetectorOptions,
    sheet: SheetSpec,
) -> Result<ScoreSummary, Error> {
    let src_path = src_path.as_ref();

    let (pages, stats) = ScoreExtractor::from_options(options).extract(src_path)?;
    write_score(&src_path.display().to_string(), pages, stats, dst_pdf.as_ref(), sheet)
}

/// As [`build_score`], but for frames that do not come from a video file.
pub fn build_score_from_frames<I>(
    frames: I,
    dst_pdf: impl AsRef<Path>,
    options: DetectorOptions,
    sheet: SheetSpec,
) -> Result<ScoreSummary, Error>
where
    I: IntoIterator<Item = RgbImage>,
{
    let mut detector = PageDetector::new(options);
    for frame in frames {
        detector.push_frame(frame);
    }

    let (pages, stats) = detector.finish();
    write_score("frame stream", pages, stats, dst_pdf.as_ref(), sheet)
}

fn write_score(
    src_name: &str,
    pages: CapturedPages,
    stats: DetectionStats,
    dst_pdf: &Path,
    sheet: SheetSpec,
) -> Result<ScoreSummary, Error> {
    let score = Score::from_captured(pages, sheet);

    let written = if score.num_pages() == 0 {
        warn!("{src_name}: no pages found. Nothing written");
        false
    } else {
        score.write_pdf(dst_pdf)?;
        info!(
            "{src_name}: wrote {} pages on {} sheets to {}",
            score.num_pages(),
            score.layouts().len(),
            dst_pdf.display()
        );
        true
    };

    Ok(ScoreSummary {
        pages: score.num_pages(),
        sheets: score.layouts().len(),
        frames_read: stats.frames_read,
        written,
        score,
    })
}

#[cfg(test)]
mod test {
    use image::Rgb;

    use super::*;

    fn page(w: u32, h: u32) -> Option<RgbImage> {
        Some(RgbImage::from_pixel(w, h, Rgb([30, 60, 90])))
    }

    #[test]
    fn test_compose_three_pages() {
        let pages = vec![page(40, 30), page(30, 40), page(50, 50)];
        let score = Score::compose(pages, SheetSpec::default());

        assert_eq!(score.num_pages(), 3);
        assert_eq!(score.layouts().len(), 2);
        assert_eq!(score.to_pdf().unwrap().num_sheets(), 2);

        let previews = score
            .render_sheets(1.0)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(previews.len(), 2);
        assert!(previews.iter().all(|p| p.dimensions() == (210, 297)));
    }

    #[test]
    fn test_compose_with_missing_page() {
        let score = Score::compose(vec![None, page(10, 10)], SheetSpec::default());

        assert_eq!(score.layouts().len(), 1);
        assert_eq!(score.layouts()[0].len(), 1);
        assert_eq!(score.to_pdf().unwrap().num_sheets(), 1);
    }

    fn scratch_pdf(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("vid_score_lib_{name}_{}.pdf", std::process::id()))
    }

    #[test]
    fn test_dark_stream_writes_nothing() {
        let dst = scratch_pdf("dark");
        let _ = std::fs::remove_file(&dst);

        let frames = (0..50).map(|_| RgbImage::from_pixel(16, 12, Rgb([3, 3, 3])));
        let summary =
            build_score_from_frames(frames, &dst, DetectorOptions::default(), SheetSpec::default())
                .unwrap();

        assert!(!summary.written);
        assert_eq!(summary.pages, 0);
        assert_eq!(summary.sheets, 0);
        assert_eq!(summary.frames_read, 50);
        assert!(!dst.exists());
    }

    #[test]
    fn test_bright_stream_writes_pdf() {
        let dst = scratch_pdf("bright");

        let opts = DetectorOptions {
            initial_jump_frames: 0,
            ..DetectorOptions::default()
        };
        let frames = (0..5).map(|_| RgbImage::from_pixel(16, 12, Rgb([200, 200, 200])));
        let summary = build_score_from_frames(frames, &dst, opts, SheetSpec::default()).unwrap();

        assert!(summary.written);
        assert_eq!((summary.pages, summary.sheets), (1, 1));
        assert!(std::fs::read(&dst).unwrap().starts_with(b"%PDF"));

        let _ = std::fs::remove_file(&dst);
    }

    #[test]
    fn test_missing_video_is_unreadable() {
        let src = std::env::temp_dir().join("vid_score_lib_no_such_video.mp4");
        let dst = std::env::temp_dir().join("vid_score_lib_no_such_video_score.pdf");

        let res = build_score(&src, &dst, DetectorOptions::default(), SheetSpec::default());
        assert!(matches!(res, Err(Error::SourceUnreadable { .. })));
        assert!(!dst.exists());
    }
}
