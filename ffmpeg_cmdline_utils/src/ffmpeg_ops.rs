use std::{
    ffi::OsStr,
    io::prelude::*,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    time::{Duration, Instant},
};

#[cfg(target_family = "windows")]
use std::os::windows::process::CommandExt;

use image::RgbImage;
use FfmpegCommandName::*;
use FfmpegError::*;

use crate::*;

const FFPROBE_TIMEOUT_SECS: u64 = 60;

// Attempt to prevent OOM on very implausible sizes
const MAX_FRAME_BYTES: u64 = 5 << 30;

/// Why a frame iterator stopped producing frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// Ffmpeg closed its output cleanly between two frames.
    Exhausted,
    /// The requested number of frames has been read.
    FrameLimit,
    /// The decode deadline passed.
    TimedOut,
    /// The pipe failed or closed partway through a frame.
    ReadFailed,
}

/// Iterator over the decoded frames of a video, in presentation order.
///
/// Any failure to read a frame ends the stream. Use [`FfmpegFrameIterRgb::end_reason`]
/// afterwards to tell a clean end from a truncated one.
#[derive(Debug)]
pub struct FfmpegFrameIterRgb {
    width: u32,
    height: u32,
    child: Child,
    num_frames: u32,
    frames_read: u32,
    deadline: Option<Instant>,
    end: Option<StreamEnd>,
}

impl FfmpegFrameIterRgb {
    pub fn frames_read(&self) -> u32 {
        self.frames_read
    }

    /// None while frames are still being produced.
    pub fn end_reason(&self) -> Option<StreamEnd> {
        self.end
    }

    fn finish(&mut self, reason: StreamEnd) -> Option<RgbImage> {
        self.end.get_or_insert(reason);
        let _kill_error = self.child.kill();
        let _wait_error = self.child.wait();
        None
    }

    fn frame_len(&self) -> Option<usize> {
        let len = u64::from(self.width)
            .checked_mul(u64::from(self.height))?
            .checked_mul(3)?;

        if len > MAX_FRAME_BYTES {
            return None;
        }

        usize::try_from(len).ok()
    }
}

impl Iterator for FfmpegFrameIterRgb {
    type Item = RgbImage;

    fn next(&mut self) -> Option<Self::Item> {
        if self.end.is_some() {
            return None;
        }

        if self.frames_read >= self.num_frames {
            return self.finish(StreamEnd::FrameLimit);
        }

        let Some(frame_len) = self.frame_len() else {
            return self.finish(StreamEnd::ReadFailed);
        };
        let mut raw_buf = vec![0u8; frame_len];

        let read_result = match self.child.stdout.as_mut() {
            Some(stdout) => read_frame(stdout, &mut raw_buf, self.deadline),
            None => Err(StreamEnd::ReadFailed),
        };

        if let Err(reason) = read_result {
            return self.finish(reason);
        }

        self.frames_read += 1;
        RgbImage::from_raw(self.width, self.height, raw_buf)
    }
}

// to prevent accumulation of zombie processes, reap the return code of
// ffmpeg subcommands (if nothing else has done so already) here
impl Drop for FfmpegFrameIterRgb {
    fn drop(&mut self) {
        let _kill_error = self.child.kill();
        let _wait_error = self.child.wait();
    }
}

/// Fill `buf` with exactly one frame's worth of bytes.
fn read_frame(
    stdout: &mut impl Read,
    buf: &mut [u8],
    deadline: Option<Instant>,
) -> Result<(), StreamEnd> {
    let mut buf_head = 0;
    while buf_head < buf.len() {
        if deadline.is_some_and(|deadline| Instant::now() > deadline) {
            return Err(StreamEnd::TimedOut);
        }

        match stdout.read(&mut buf[buf_head..]) {
            Ok(0) if buf_head == 0 => return Err(StreamEnd::Exhausted),
            Ok(0) => return Err(StreamEnd::ReadFailed),
            Ok(bytes_read) => buf_head += bytes_read,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => (),
            Err(_) => return Err(StreamEnd::ReadFailed),
        }
    }

    Ok(())
}

#[derive(Clone, Debug)]
pub struct FfmpegFrameReaderBuilder {
    src_path: PathBuf,
    multithreaded: bool,
    num_frames: Option<u32>,
    skip_forward: Option<u32>,
    timeout_secs: Option<u64>,
}

impl FfmpegFrameReaderBuilder {
    pub fn new(src_path: impl AsRef<Path>) -> Self {
        Self {
            src_path: src_path.as_ref().to_path_buf(),
            multithreaded: false,
            num_frames: None,
            skip_forward: None,
            timeout_secs: None,
        }
    }

    pub fn src_path(&self) -> &Path {
        &self.src_path
    }

    /// Let ffmpeg pick its own decoder thread count. Otherwise one thread is used.
    pub fn multithreaded(&mut self, val: bool) -> &mut Self {
        self.multithreaded = val;
        self
    }

    /// Stop after this many frames.
    pub fn num_frames(&mut self, num_frames: u32) -> &mut Self {
        self.num_frames = Some(num_frames);
        self
    }

    /// Start decoding this many seconds into the video.
    pub fn skip_forward(&mut self, amount_secs: u32) -> &mut Self {
        self.skip_forward = Some(amount_secs);
        self
    }

    /// Give up on the whole decode after this many seconds.
    pub fn timeout_secs(&mut self, timeout_secs: u64) -> &mut Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    pub fn spawn_rgb(&self) -> Result<(FfmpegFrameIterRgb, VideoInfo), FfmpegError> {
        //we also need to find out the resolution of the video so that stdout can be converted into frames.
        let stats = VideoInfo::new(&self.src_path)?;

        //bail out if we get invalid dimensions.
        let (x, y) = stats.resolution();
        if x == 0 || y == 0 {
            return Err(InvalidResolution);
        }

        let num_frames_string: String;
        let num_frames_arg = match self.num_frames {
            Some(num_frames) => {
                num_frames_string = num_frames.to_string();
                vec![OsStr::new("-vframes"), OsStr::new(&num_frames_string)]
            }
            None => vec![],
        };

        let threads_arg = if self.multithreaded {
            vec![]
        } else {
            vec![OsStr::new("-threads"), OsStr::new("1")]
        };

        let skip_forward_string: String;
        let skip_forward_arg = match self.skip_forward {
            Some(amount) => {
                skip_forward_string = amount.to_string();
                vec![OsStr::new("-ss"), OsStr::new(&skip_forward_string)]
            }
            None => vec![],
        };

        #[rustfmt::skip]
        let mut args = vec![
            OsStr::new("-hide_banner"),
            OsStr::new("-loglevel"), OsStr::new("warning"),
            OsStr::new("-nostats"),
        ];

        args.extend(threads_arg);
        args.extend(skip_forward_arg);

        #[rustfmt::skip]
        args.extend([
            OsStr::new("-i"),        OsStr::new(&self.src_path),
        ]);

        args.extend(num_frames_arg);

        #[rustfmt::skip]
        args.extend([
            OsStr::new("-pix_fmt"),  OsStr::new("rgb24"),
            OsStr::new("-c:v"),      OsStr::new("rawvideo"),
            OsStr::new("-f"),        OsStr::new("image2pipe"),
            OsStr::new("-")
        ]);

        let mut child = spawn_ffmpeg_command(Ffmpeg, &args, true)?;

        //Prevent possible lockup if stderr gets full by dropping the
        //handle from our side
        std::mem::drop(child.stderr.take());

        let deadline = self
            .timeout_secs
            .and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs)));

        let frame_iterator = FfmpegFrameIterRgb {
            width: x,
            height: y,
            child,
            num_frames: self.num_frames.unwrap_or(u32::MAX),
            frames_read: 0,
            deadline,
            end: None,
        };

        Ok((frame_iterator, stats))
    }
}

/// Raw JSON from `ffprobe -show_format -show_streams`.
pub fn get_video_stats<P: AsRef<Path>>(src_path: P) -> Result<String, FfmpegError> {
    let args = &[
        OsStr::new("-v"),
        OsStr::new("quiet"),
        OsStr::new("-show_format"),
        OsStr::new("-show_streams"),
        OsStr::new("-print_format"),
        OsStr::new("json"),
        OsStr::new(src_path.as_ref()),
    ];

    let stdout = run_ffmpeg_command(Ffprobe, args, true)?.stdout;

    String::from_utf8(stdout).map_err(|_| Utf8Conversion)
}

/// True if ffprobe finds a video stream. A stream of any length counts.
pub fn is_video_file<P: AsRef<Path>>(src_path: P) -> Result<bool, FfmpegError> {
    #[rustfmt::skip]
    let args = &[
        OsStr::new("-v"),              OsStr::new("error"),
        OsStr::new("-select_streams"), OsStr::new("v"),
        OsStr::new("-show_entries"),   OsStr::new("stream=codec_name,codec_type"),
        OsStr::new("-of"),             OsStr::new("compact=p=0:nk=1"),
        OsStr::new(src_path.as_ref())
    ];

    let output = run_ffmpeg_command(Ffprobe, args, false)?;
    let streams_string = String::from_utf8(output.stdout).map_err(|_| Utf8Conversion)?;

    Ok(parse_stream_summary(streams_string.trim()))
}

// "codec_name|codec_type" for the first video stream
fn parse_stream_summary(summary: &str) -> bool {
    let mut fields_iter = summary.lines().next().unwrap_or("").split('|');

    let _codec_name = fields_iter.next().unwrap_or("");
    let codec_type = fields_iter.next().unwrap_or("").trim();

    codec_type == "video"
}

pub fn ffmpeg_and_ffprobe_are_callable() -> bool {
    //check ffprobe is callable.
    if run_ffmpeg_command(Ffprobe, &[OsStr::new("-version")], true).is_err() {
        return false;
    }

    //now ffmpeg.
    if run_ffmpeg_command(Ffmpeg, &[OsStr::new("-version")], true).is_err() {
        return false;
    }

    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FfmpegCommandName {
    Ffprobe,
    Ffmpeg,
}

impl FfmpegCommandName {
    pub fn as_os_str(&self) -> &'static OsStr {
        match self {
            Self::Ffprobe => OsStr::new("ffprobe"),
            Self::Ffmpeg => OsStr::new("ffmpeg"),
        }
    }
}

fn spawn_ffmpeg_command(
    name: FfmpegCommandName,
    args: &[&OsStr],
    stderr_null: bool,
) -> Result<Child, FfmpegError> {
    let stderr_cfg = if stderr_null {
        Stdio::null()
    } else {
        Stdio::piped()
    };

    let mut command = Command::new(name.as_os_str());
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(stderr_cfg);

    //do not spawn a command window on windows
    #[cfg(target_family = "windows")]
    command.creation_flags(winapi::um::winbase::CREATE_NO_WINDOW);

    command.spawn().map_err(|e| match e.kind() {
        //by far the most likely cause of NotFound is ffmpeg is not installed.
        std::io::ErrorKind::NotFound => FfmpegNotFound,
        _ => Io(format!("{:?}", e.kind())),
    })
}

struct FfmpegOutput {
    stdout: Vec<u8>,
}

type FfmpegCmdResult = Result<FfmpegOutput, FfmpegError>;

fn run_ffmpeg_command(
    name: FfmpegCommandName,
    args: &[&OsStr],
    stderr_null: bool,
) -> FfmpegCmdResult {
    fn truncate_ffmpeg_err_msg(stderr: Vec<u8>) -> FfmpegError {
        match std::str::from_utf8(&stderr) {
            Ok(error_text) => FfmpegInternal(error_text.chars().take(500).collect::<String>()),
            Err(_) => Utf8Conversion,
        }
    }

    let mut child = spawn_ffmpeg_command(name, args, stderr_null)?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| Io("stdout was not captured".to_string()))?;

    //drain stderr on its own thread so a chatty ffprobe can never fill the pipe and stall
    let stderr_reader = child.stderr.take().map(|mut stderr| {
        std::thread::spawn(move || {
            let mut acc = vec![];
            let _read_error = stderr.read_to_end(&mut acc);
            acc
        })
    });

    //Poll quickly at first, as ffprobe usually completes within a few milliseconds.
    //Ok(None) means the child was killed for exceeding the timeout.
    let waiter = std::thread::spawn(move || -> std::io::Result<Option<ExitStatus>> {
        let started = Instant::now();
        let timeout = Duration::from_secs(FFPROBE_TIMEOUT_SECS);
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }

            let elapsed = started.elapsed();
            if elapsed > timeout {
                let _kill_error = child.kill();
                let _wait_error = child.wait();
                return Ok(None);
            }

            let poll_interval = if elapsed < Duration::from_secs(1) {
                Duration::from_millis(1)
            } else {
                Duration::from_millis(50)
            };
            std::thread::sleep(poll_interval);
        }
    });

    let mut stdout_acc = vec![];
    stdout
        .read_to_end(&mut stdout_acc)
        .map_err(|e| Io(format!("{:?}", e.kind())))?;

    let stderr_acc = stderr_reader
        .map(|handle| handle.join().unwrap_or_default())
        .unwrap_or_default();

    let exit_status = waiter
        .join()
        .map_err(|_| Io("ffmpeg watcher thread panicked".to_string()))?;

    match exit_status {
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Err(FfmpegNotFound),
            _ => Err(Io(format!("{:?}", e.kind()))),
        },
        Ok(None) => Err(Timeout(FFPROBE_TIMEOUT_SECS)),
        Ok(Some(status)) if status.success() => Ok(FfmpegOutput { stdout: stdout_acc }),
        //sometimes ffmpeg creates very long error messages. Limit them to the first 500 characters
        Ok(Some(_)) => Err(truncate_ffmpeg_err_msg(stderr_acc)),
    }
}
