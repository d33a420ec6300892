use std::path::{Path, PathBuf};

use clap::{value_parser, ArgAction::*};
use vid_score_lib::*;

use crate::app::*;

// inputs
const FILE_PATHS: &str = "Video files";
const VIDEO_LIST: &str = "Video list";
const IMAGE_PATHS: &str = "Page images";
const OUTPUT_PDF: &str = "Output document";

//detection configuration
const THRESHOLD: &str = "Change threshold";
const COOLDOWN_FRAMES: &str = "Cooldown frames";
const BRIGHTNESS_FLOOR: &str = "Brightness floor";
const INITIAL_JUMP_FRAMES: &str = "Initial jump frames";

//sheet configuration
const SHEET_WIDTH: &str = "Sheet width";
const SHEET_HEIGHT: &str = "Sheet height";
const MARGIN: &str = "Margin";

//output settings
const OUTPUT_DIR: &str = "Output directory";
const PREVIEW_DIR: &str = "Preview directory";
const PREVIEW_RESOLUTION: &str = "Preview resolution";
const LAYOUT_JSON_DIR: &str = "Layout json directory";

// Arg specification
const ARGS_FILE: &str = "Args file";

//Verbosity
const VERBOSITY_QUIET: &str = "Quiet";
const VERBOSITY_VERBOSE: &str = "Verbose";

const DEFAULT_VIDEO_LIST: &str = "video_list.txt";
const DEFAULT_PREVIEW_RESOLUTION: &str = "4.0";

const DISPLAY_ORDERING: [&str; 18] = [
    //
    // inputs
    FILE_PATHS,
    VIDEO_LIST,
    IMAGE_PATHS,
    OUTPUT_PDF,
    //
    //detection
    THRESHOLD,
    COOLDOWN_FRAMES,
    BRIGHTNESS_FLOOR,
    INITIAL_JUMP_FRAMES,
    //
    //sheets
    SHEET_WIDTH,
    SHEET_HEIGHT,
    MARGIN,
    //
    //outputs
    OUTPUT_DIR,
    PREVIEW_DIR,
    PREVIEW_RESOLUTION,
    LAYOUT_JSON_DIR,
    //
    //verbosity
    VERBOSITY_QUIET,
    VERBOSITY_VERBOSE,
    //argument replacement
    ARGS_FILE,
];

pub(super) fn build_app() -> clap::Command {
    let get_ordering = |arg_name: &str| -> usize {
        match DISPLAY_ORDERING.iter().position(|x| *x == arg_name) {
            Some(idx) => idx,
            None => {
                panic!("argument not assigned a display order: {arg_name:?}");
            }
        }
    };

    //args are not added through method chaining because rustfmt struggles with very long expressions.
    let mut clap_app = clap::Command::new("Video score extractor")
        .version(clap::crate_version!())
        .about("Turn screen recordings of sheet music (or any paged document) into printable PDFs")
        .help_template(include_str!("arg_parse_template.txt"));

    clap_app = clap_app.arg(
        clap::Arg::new(FILE_PATHS)
            .long("files")
            .num_args(1..)
            .value_parser(value_parser!(PathBuf))
            .action(Append)
            .conflicts_with_all([VIDEO_LIST, IMAGE_PATHS])
            .help("Video files to extract pages from. Each video is written to its own document")
            .display_order(get_ordering(FILE_PATHS)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(VIDEO_LIST)
            .long("video-list")
            .num_args(1)
            .value_parser(value_parser!(PathBuf))
            .conflicts_with(IMAGE_PATHS)
            .help(format!("A text file listing one video path per line. Used when neither --files nor --images is given [default: {DEFAULT_VIDEO_LIST}]"))
            .display_order(get_ordering(VIDEO_LIST)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(IMAGE_PATHS)
            .long("images")
            .num_args(1..)
            .value_parser(value_parser!(PathBuf))
            .action(Append)
            .requires(OUTPUT_PDF)
            .help("Do not read any video. Instead lay out these already-extracted page images, in the order given")
            .display_order(get_ordering(IMAGE_PATHS)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(OUTPUT_PDF)
            .long("output")
            .num_args(1)
            .value_parser(value_parser!(PathBuf))
            .requires(IMAGE_PATHS)
            .help("The document to write when using --images")
            .display_order(get_ordering(OUTPUT_PDF)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(THRESHOLD)
            .long("threshold")
            .num_args(1)
            .value_parser(value_parser!(u64))
            .default_value(DEFAULT_CHANGE_THRESHOLD.to_string())
            .help("How many pixels must change between two consecutive frames for a new page to be captured")
            .display_order(get_ordering(THRESHOLD)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(COOLDOWN_FRAMES)
            .long("cooldown-frames")
            .num_args(1)
            .value_parser(value_parser!(u32))
            .default_value(DEFAULT_COOLDOWN_FRAMES.to_string())
            .help("After a page is captured, ignore this many frames so that one page turn is only captured once")
            .display_order(get_ordering(COOLDOWN_FRAMES)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(BRIGHTNESS_FLOOR)
            .long("brightness-floor")
            .num_args(1)
            .value_parser(value_parser!(f64))
            .default_value(DEFAULT_BRIGHTNESS_FLOOR.to_string())
            .help("Frames at the start of the video with a mean brightness (0-255) at or below this value are skipped")
            .display_order(get_ordering(BRIGHTNESS_FLOOR)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(INITIAL_JUMP_FRAMES)
            .long("initial-jump-frames")
            .num_args(1)
            .value_parser(value_parser!(u32))
            .default_value(DEFAULT_INITIAL_JUMP_FRAMES.to_string())
            .help("Once content first appears, skip this many frames before capturing the first page. Can be used to skip past an opening fade")
            .display_order(get_ordering(INITIAL_JUMP_FRAMES)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(SHEET_WIDTH)
            .long("sheet-width")
            .num_args(1)
            .value_parser(value_parser!(f64))
            .default_value(A4_WIDTH_MM.to_string())
            .help("Width of each output sheet in millimetres")
            .display_order(get_ordering(SHEET_WIDTH)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(SHEET_HEIGHT)
            .long("sheet-height")
            .num_args(1)
            .value_parser(value_parser!(f64))
            .default_value(A4_HEIGHT_MM.to_string())
            .help("Height of each output sheet in millimetres")
            .display_order(get_ordering(SHEET_HEIGHT)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(MARGIN)
            .long("margin")
            .num_args(1)
            .value_parser(value_parser!(f64))
            .default_value(DEFAULT_MARGIN_MM.to_string())
            .help("Margin in millimetres around the edges of each sheet and between the two pages on it")
            .display_order(get_ordering(MARGIN)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(OUTPUT_DIR)
            .long("output-dir")
            .num_args(1)
            .value_parser(value_parser!(PathBuf))
            .default_value(".")
            .help("Directory that <video name>_score.pdf is written to for each video")
            .display_order(get_ordering(OUTPUT_DIR)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(PREVIEW_DIR)
            .long("preview-dir")
            .num_args(1)
            .value_parser(value_parser!(PathBuf))
            .help("Also write each sheet as a png image to the given directory")
            .display_order(get_ordering(PREVIEW_DIR)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(PREVIEW_RESOLUTION)
            .long("preview-resolution")
            .num_args(1)
            .value_parser(value_parser!(f64))
            .default_value(DEFAULT_PREVIEW_RESOLUTION)
            .requires(PREVIEW_DIR)
            .help("Pixels per millimetre of the preview images")
            .display_order(get_ordering(PREVIEW_RESOLUTION)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(LAYOUT_JSON_DIR)
            .long("layout-json")
            .num_args(1)
            .value_parser(value_parser!(PathBuf))
            .help("Write the sheet layout of each document as json to the given directory")
            .display_order(get_ordering(LAYOUT_JSON_DIR)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(ARGS_FILE)
            .long("args-file")
            .value_parser(value_parser!(PathBuf))
            .num_args(1)
            .help("Read command line arguments from a file. If this argument is used it must be the only argument. Lines starting with # are ignored")
            .display_order(get_ordering(ARGS_FILE)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(VERBOSITY_QUIET)
            .long("quiet")
            .help("Reduced verbosity")
            .conflicts_with(VERBOSITY_VERBOSE)
            .action(SetTrue)
            .display_order(get_ordering(VERBOSITY_QUIET)),
    );

    clap_app = clap_app.arg(
        clap::Arg::new(VERBOSITY_VERBOSE)
            .long("verbose")
            .help("Increased verbosity")
            .conflicts_with(VERBOSITY_QUIET)
            .action(SetTrue)
            .display_order(get_ordering(VERBOSITY_VERBOSE)),
    );

    clap_app
}

pub fn parse_args() -> AppCfg {
    //capture the cwd once, to minimize the risk of working with two values if it is changed by the OS at runtime.
    let cwd = std::env::current_dir()
        .map_err(|e| eyre::Report::msg(e).wrap_err("failed to read the current directory"))
        .unwrap_or_else(|e| print_error_and_quit(e));

    //Start by parsing the provided arguments from the commandline. If the --args-file
    //argument is provided, then we will ignore the true command line arguments and
    //take the arguments from the file instead.
    let args = get_args_from_cmdline_or_file();

    cfg_from_matches(&args, &cwd).unwrap_or_else(|e| print_error_and_quit(e))
}

pub(super) fn cfg_from_matches(args: &clap::ArgMatches, cwd: &Path) -> eyre::Result<AppCfg> {
    let paths = |id: &str| -> Option<Vec<PathBuf>> {
        args.get_many::<PathBuf>(id)
            .map(|paths| paths.map(|p| absolutify_path(cwd, p)).collect())
    };

    let input = match (paths(IMAGE_PATHS), paths(FILE_PATHS)) {
        (Some(images), _) => {
            let output = args
                .get_one::<PathBuf>(OUTPUT_PDF)
                .ok_or_else(|| eyre::Report::msg("--images requires --output"))?;
            InputCfg::Images {
                images,
                output: absolutify_path(cwd, output),
            }
        }
        (None, Some(files)) => InputCfg::Videos(files),
        (None, None) => {
            let list = args
                .get_one::<PathBuf>(VIDEO_LIST)
                .cloned()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_VIDEO_LIST));
            InputCfg::VideoList(absolutify_path(cwd, &list))
        }
    };

    //every value below has a default, so get_one only fails if the arg is misconfigured above.
    let get_or_default = |id: &str| -> eyre::Result<f64> {
        args.get_one::<f64>(id)
            .copied()
            .ok_or_else(|| eyre::Report::msg(format!("missing value for {id}")))
    };

    let brightness_floor = get_or_default(BRIGHTNESS_FLOOR)?;
    if !brightness_floor.is_finite() {
        return Err(eyre::Report::msg(format!(
            "brightness floor must be a finite number, got {brightness_floor}"
        )));
    }

    let detector = DetectorOptions {
        change_threshold: *args
            .get_one::<u64>(THRESHOLD)
            .unwrap_or(&DEFAULT_CHANGE_THRESHOLD),
        cooldown_frames: *args
            .get_one::<u32>(COOLDOWN_FRAMES)
            .unwrap_or(&DEFAULT_COOLDOWN_FRAMES),
        brightness_floor,
        initial_jump_frames: *args
            .get_one::<u32>(INITIAL_JUMP_FRAMES)
            .unwrap_or(&DEFAULT_INITIAL_JUMP_FRAMES),
    };

    let sheet = SheetSpec::new(
        get_or_default(SHEET_WIDTH)?,
        get_or_default(SHEET_HEIGHT)?,
        get_or_default(MARGIN)?,
    )
    .map_err(|e| eyre::Report::msg(e).wrap_err("Invalid sheet dimensions"))?;

    let preview = match args.get_one::<PathBuf>(PREVIEW_DIR) {
        Some(dir) => {
            let px_per_mm = get_or_default(PREVIEW_RESOLUTION)?;
            if !(px_per_mm.is_finite() && px_per_mm > 0.0) {
                return Err(eyre::Report::msg(format!(
                    "preview resolution must be a positive number, got {px_per_mm}"
                )));
            }
            PreviewCfg::Preview {
                preview_dir: absolutify_path(cwd, dir),
                px_per_mm,
            }
        }
        None => PreviewCfg::NoPreview,
    };

    let verbosity = if args.get_flag(VERBOSITY_QUIET) {
        ReportVerbosity::Quiet
    } else if args.get_flag(VERBOSITY_VERBOSE) {
        ReportVerbosity::Verbose
    } else {
        ReportVerbosity::Default
    };

    let output_dir = args
        .get_one::<PathBuf>(OUTPUT_DIR)
        .map(|dir| absolutify_path(cwd, dir))
        .unwrap_or_else(|| cwd.to_path_buf());

    let output_cfg = OutputCfg {
        output_dir,
        preview,
        layout_json_dir: args
            .get_one::<PathBuf>(LAYOUT_JSON_DIR)
            .map(|dir| absolutify_path(cwd, dir)),
        verbosity,
    };

    let ret = AppCfg {
        input,
        detector,
        sheet,
        output_cfg,
    };

    Ok(ret)
}

// Arguments are always first read from the command line, but if --args-file
// is present, then arguments are actually located in a file on disk.
// This fn obtains the args from the correct location.
fn get_args_from_cmdline_or_file() -> clap::ArgMatches {
    let cmdline_args = build_app().get_matches();

    match cmdline_args.get_one::<PathBuf>(ARGS_FILE) {
        None => cmdline_args,
        Some(args_path) => get_argsfile_args(args_path),
    }
}

fn get_argsfile_args(argsfile_path: &Path) -> clap::ArgMatches {
    let args = std::fs::read_to_string(argsfile_path)
        .map_err(eyre::Report::msg)
        .and_then(|text| split_args_file(&text).map_err(eyre::Report::msg))
        .map_err(|e| {
            e.wrap_err(format!(
                "Failed to parse args file at location {}",
                argsfile_path.to_string_lossy()
            ))
        })
        .unwrap_or_else(|e| print_error_and_quit(e));

    //When parsing args from file, the binary name will not be present,
    // so update the parser that we use to not expect it.
    let matches = build_app().no_binary_name(true).get_matches_from(args);
    matches
}

//the arguments file needs to be split into args in the same way as the shell would do it,
//after dropping comment lines.
fn split_args_file(text: &str) -> Result<Vec<String>, shell_words::ParseError> {
    let without_comments = text
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");

    shell_words::split(&without_comments)
}

fn absolutify_path(cwd: &Path, path: &Path) -> PathBuf {
    //get the absolute path if it is not absolute, by prepending the cwd.
    let path = if path.is_relative() {
        cwd.join(path)
    } else {
        path.to_path_buf()
    };

    //canonicalizing fails for files that do not exist yet (e.g. outputs), so fall back to the joined path.
    let p = path.canonicalize().unwrap_or(path);

    p
}
