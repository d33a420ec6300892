use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use ffmpeg_cmdline_utils::ffmpeg_and_ffprobe_are_callable;
use itertools::Itertools;
use serde::Serialize;
use vid_score_lib::*;

use crate::app::*;

// * read cfg
// * collect the videos (or page images) to process
// * for each video: extract pages, lay out sheets, write the document
// * optionally write sheet previews and layout json

pub fn run_app() -> i32 {
    let cfg = arg_parse::parse_args();
    configure_logs(cfg.output_cfg.verbosity);

    let ret = match run_app_inner(&cfg) {
        Ok(()) => 0,
        Err(fatal_error) => {
            print_fatal_err(fatal_error, cfg.output_cfg.verbosity);
            1
        }
    };

    ret
}

fn run_app_inner(cfg: &AppCfg) -> eyre::Result<()> {
    match &cfg.input {
        InputCfg::Images { images, output } => build_from_images(cfg, images, output),
        InputCfg::Videos(videos) => process_videos(cfg, videos),
        InputCfg::VideoList(list_path) => {
            let videos = read_video_list(list_path)?;
            if videos.is_empty() {
                warn!(
                    "Video list {} is empty. Nothing to do",
                    list_path.display()
                );
                return Ok(());
            }
            process_videos(cfg, &videos)
        }
    }
}

// One path per line. Blank lines are ignored.
fn read_video_list(list_path: &Path) -> Result<Vec<PathBuf>, AppError> {
    if !list_path.exists() {
        return Err(AppError::MissingVideoList(list_path.to_path_buf()));
    }

    let text =
        std::fs::read_to_string(list_path).map_err(|source| AppError::VideoListUnreadable {
            path: list_path.to_path_buf(),
            source,
        })?;

    let videos = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect();

    Ok(videos)
}

fn process_videos(cfg: &AppCfg, videos: &[PathBuf]) -> eyre::Result<()> {
    if !ffmpeg_and_ffprobe_are_callable() {
        return Err(AppError::FfmpegMissing.into());
    }

    let output_dir = &cfg.output_cfg.output_dir;
    create_dir(output_dir)?;

    let missing = videos.iter().filter(|v| !v.exists()).collect::<Vec<_>>();
    if !missing.is_empty() {
        warn!(
            "videos not found: {}",
            missing.iter().map(|p| p.to_string_lossy()).join(", ")
        );
    }

    //each video is independent. Only a video that could not be read at all counts as a failure.
    let mut num_unreadable = 0;
    for (i, video) in videos.iter().enumerate() {
        info!("[{}/{}] {}", i + 1, videos.len(), video.display());

        if report_outcome(video, process_video(cfg, video)) {
            num_unreadable += 1;
        }
    }

    if num_unreadable > 0 {
        return Err(AppError::VideosFailed(num_unreadable, videos.len()).into());
    }

    Ok(())
}

/// Log how one video went. Returns true only if the video could not be read at all,
/// which is the one outcome that fails the whole run.
fn report_outcome(video: &Path, outcome: Result<(), AppError>) -> bool {
    match outcome {
        Ok(()) => false,
        Err(e @ AppError::Score(Error::SourceUnreadable { .. })) => {
            error!("{e}");
            true
        }
        Err(e) => {
            error!("{}: {e}", video.display());
            false
        }
    }
}

fn process_video(cfg: &AppCfg, video: &Path) -> Result<(), AppError> {
    let stem = file_stem_string(video);
    let dst_pdf = cfg.output_cfg.output_dir.join(format!("{stem}_score.pdf"));

    let summary = build_score(video, &dst_pdf, cfg.detector, cfg.sheet)?;
    debug!(
        "{}: {} frames read, {} pages, {} sheets",
        video.display(),
        summary.frames_read,
        summary.pages,
        summary.sheets
    );

    if summary.written {
        write_extra_outputs(&cfg.output_cfg, &stem, &summary.score)?;
    }

    Ok(())
}

fn build_from_images(cfg: &AppCfg, images: &[PathBuf], output: &Path) -> eyre::Result<()> {
    let pages = load_page_images(images);

    let num_readable = pages.iter().flatten().count();
    if num_readable == 0 {
        warn!("None of the {} page images could be read. Nothing written", images.len());
        return Ok(());
    }

    let score = Score::compose(pages, cfg.sheet);
    score.write_pdf(output).map_err(AppError::from)?;
    info!(
        "wrote {} of {} pages on {} sheets to {}",
        num_readable,
        images.len(),
        score.layouts().len(),
        output.display()
    );

    write_extra_outputs(&cfg.output_cfg, &file_stem_string(output), &score)?;

    Ok(())
}

fn write_extra_outputs(output_cfg: &OutputCfg, stem: &str, score: &Score) -> Result<(), AppError> {
    if let PreviewCfg::Preview {
        preview_dir,
        px_per_mm,
    } = &output_cfg.preview
    {
        write_previews(preview_dir, stem, score, *px_per_mm)?;
    }

    if let Some(json_dir) = &output_cfg.layout_json_dir {
        write_layout_json(json_dir, stem, score)?;
    }

    Ok(())
}

/// Write `<stem>_sheet_<n>.png` for each sheet, numbering from 1.
fn write_previews(
    preview_dir: &Path,
    stem: &str,
    score: &Score,
    px_per_mm: f64,
) -> Result<Vec<PathBuf>, AppError> {
    create_dir(preview_dir)?;

    let mut written = vec![];
    for (i, sheet) in score.render_sheets(px_per_mm).enumerate() {
        let path = preview_dir.join(format!("{stem}_sheet_{}.png", i + 1));
        sheet?
            .save(&path)
            .map_err(|source| AppError::PreviewWrite {
                path: path.clone(),
                source,
            })?;
        debug!("wrote preview {}", path.display());
        written.push(path);
    }

    Ok(written)
}

fn write_layout_json(json_dir: &Path, stem: &str, score: &Score) -> Result<PathBuf, AppError> {
    //Struct only exists to be serialized.
    #[derive(Serialize)]
    struct LayoutJson<'a> {
        name: &'a str,
        pages: usize,
        sheet: &'a SheetSpec,
        sheets: &'a [SheetLayout],
    }

    create_dir(json_dir)?;

    let path = json_dir.join(format!("{stem}_layout.json"));
    let file = File::create(&path).map_err(|source| AppError::Write {
        path: path.clone(),
        source,
    })?;

    let contents = LayoutJson {
        name: stem,
        pages: score.num_pages(),
        sheet: score.sheet_spec(),
        sheets: score.layouts(),
    };
    serde_json::to_writer_pretty(BufWriter::new(file), &contents)?;

    Ok(path)
}

fn create_dir(dir: &Path) -> Result<(), AppError> {
    std::fs::create_dir_all(dir).map_err(|source| AppError::Write {
        path: dir.to_path_buf(),
        source,
    })
}

fn file_stem_string(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "score".to_string())
}

fn print_fatal_err(fatal_err: eyre::Report, verbosity: ReportVerbosity) {
    error!("{}", fatal_err);

    if verbosity == ReportVerbosity::Verbose {
        let mut source = fatal_err.source();
        while let Some(e) = source {
            error!("    caused by: {}", e);
            source = e.source();
        }
    }
}

pub fn configure_logs(verbosity: ReportVerbosity) {
    use simplelog::*;

    //only show logs from this workspace, not from the pdf/image crates.
    let mut cfg = simplelog::ConfigBuilder::new();
    cfg.add_filter_allow_str("vid_score");

    let min_loglevel = match verbosity {
        ReportVerbosity::Quiet => LevelFilter::Warn,
        ReportVerbosity::Default => LevelFilter::Info,
        ReportVerbosity::Verbose => LevelFilter::Trace,
    };

    let init_result = TermLogger::init(
        min_loglevel,
        cfg.build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    if let Err(e) = init_result {
        #[allow(clippy::print_stderr)]
        let () = eprintln!("failed to initialize logging: {e}");
    }
}
