use std::path::PathBuf;

use vid_score_lib::{DetectorOptions, SheetSpec};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportVerbosity {
    Quiet,
    Default,
    Verbose,
}

// Where do the pages come from?
#[derive(Debug, Clone, PartialEq)]
pub enum InputCfg {
    /// Videos given directly on the command line.
    Videos(Vec<PathBuf>),

    /// A text file listing one video per line.
    VideoList(PathBuf),

    /// Page images that were extracted earlier, written to a single document.
    Images {
        images: Vec<PathBuf>,
        output: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewCfg {
    NoPreview,
    Preview { preview_dir: PathBuf, px_per_mm: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputCfg {
    pub output_dir: PathBuf,
    pub preview: PreviewCfg,
    pub layout_json_dir: Option<PathBuf>,

    pub verbosity: ReportVerbosity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppCfg {
    pub input: InputCfg,
    pub detector: DetectorOptions,
    pub sheet: SheetSpec,
    pub output_cfg: OutputCfg,
}
