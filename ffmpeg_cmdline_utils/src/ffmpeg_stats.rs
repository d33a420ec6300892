use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::*;

#[derive(Debug, Deserialize, Serialize, Clone, Error)]
pub enum VideoInfoError {
    #[error("Error parsing stats: {0}")]
    JsonError(String),
    #[error("Error parsing stats: {0}")]
    ParseIntError(String),
    #[error("Error parsing stats: {0}")]
    ParseFloatError(String),
    #[error("Unexpected video rotation: {0}")]
    UnexpectedRotation(String),
}

impl From<serde_json::Error> for VideoInfoError {
    fn from(e: serde_json::Error) -> Self {
        //limit maximum number of characters
        let error_string = format!("{e}").chars().take(500).collect::<String>();
        VideoInfoError::JsonError(error_string)
    }
}

impl From<std::num::ParseIntError> for VideoInfoError {
    fn from(e: std::num::ParseIntError) -> Self {
        VideoInfoError::ParseIntError(format!("{e}"))
    }
}

impl From<std::num::ParseFloatError> for VideoInfoError {
    fn from(e: std::num::ParseFloatError) -> Self {
        VideoInfoError::ParseFloatError(format!("{e}"))
    }
}

// If the metadata declares a rotation, ffprobe reports the unrotated resolution while
// ffmpeg hands us autorotated frames. Width and height must be swapped for 90 and 270.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
enum Rotation {
    #[default]
    Upright,
    Sideways,
}

impl Rotation {
    fn from_json(rotation: Option<&Value>) -> Result<Self, VideoInfoError> {
        let degrees = match rotation {
            None => return Ok(Self::Upright),
            Some(Value::Number(val)) => val
                .as_i64()
                .ok_or_else(|| VideoInfoError::UnexpectedRotation(val.to_string()))?,
            Some(Value::String(val)) => val.parse::<i64>()?,
            Some(other) => return Err(VideoInfoError::UnexpectedRotation(other.to_string())),
        };

        match degrees.rem_euclid(360) {
            0 | 180 => Ok(Self::Upright),
            90 | 270 => Ok(Self::Sideways),
            _ => Err(VideoInfoError::UnexpectedRotation(degrees.to_string())),
        }
    }
}

/// Some of the video metadata that can be obtained by using ffprobe.
#[derive(PartialEq, Clone, Debug, Serialize, Deserialize, Default)]
pub struct VideoInfo {
    duration: Duration,
    file_size: u64,
    resolution: (u32, u32),
    frame_rate: Option<f64>,
}

impl VideoInfo {
    /// Use ffprobe to get the duration, resolution and frame rate of a video. If the video
    /// contains multiple streams then only information about the first video stream is returned.
    ///
    /// # errors
    /// * The file cannot be read or is not recognized as a video by ffprobe
    /// * The output from ffprobe could not be parsed as JSON
    pub fn new<P>(src_path: P) -> Result<Self, FfmpegError>
    where
        P: AsRef<Path>,
    {
        let stats_string = get_video_stats(&src_path)?;
        Ok(Self::from_ffprobe_json(&stats_string)?)
    }

    /// Parse the output of `ffprobe -show_format -show_streams -print_format json`.
    pub fn from_ffprobe_json(stats_string: &str) -> Result<Self, VideoInfoError> {
        let stats_parsed: Value = serde_json::from_str(stats_string)?;

        let duration = match &stats_parsed["format"]["duration"] {
            Value::String(d) => {
                Duration::try_from_secs_f64(d.parse::<f64>()?).unwrap_or_default()
            }
            _ => Duration::ZERO,
        };

        let file_size = match &stats_parsed["format"]["size"] {
            Value::String(s) => s.parse()?,
            _ => 0,
        };

        let first_video = Self::first_video(&stats_parsed);

        let rotation = Rotation::from_json(first_video.and_then(|video_stream| {
            video_stream
                .get("side_data_list")
                .and_then(|list| list.get(0))
                .and_then(|side_data| side_data.get("rotation"))
        }))?;

        let resolution = {
            let width = first_video.and_then(|v| Self::as_u32(&v["width"])).unwrap_or(0);
            let height = first_video.and_then(|v| Self::as_u32(&v["height"])).unwrap_or(0);

            match rotation {
                Rotation::Upright => (width, height),
                Rotation::Sideways => (height, width),
            }
        };

        let frame_rate = first_video.and_then(|video_stream| {
            Self::parse_rational(&video_stream["avg_frame_rate"])
                .or_else(|| Self::parse_rational(&video_stream["r_frame_rate"]))
        });

        Ok(VideoInfo {
            duration,
            file_size,
            resolution,
            frame_rate,
        })
    }

    /// The duration of the video
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// The size of the video in bytes
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// The resolution of the video in pixels, in the orientation it is intended to be viewed.
    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    /// Average frames per second, if ffprobe reported a usable one.
    pub fn frame_rate(&self) -> Option<f64> {
        self.frame_rate
    }

    fn first_video(stats_parsed: &Value) -> Option<&Value> {
        let Value::Array(streams) = &stats_parsed["streams"] else {
            return None;
        };

        streams
            .iter()
            .find(|s| matches!(&s["codec_type"], Value::String(t) if t == "video"))
    }

    fn as_u32(v: &Value) -> Option<u32> {
        v.as_u64().and_then(|v| u32::try_from(v).ok())
    }

    //ffprobe reports rates as "num/den", with "0/0" meaning unknown
    fn parse_rational(v: &Value) -> Option<f64> {
        let (num, den) = v.as_str()?.split_once('/')?;
        let num = num.trim().parse::<f64>().ok()?;
        let den = den.trim().parse::<f64>().ok()?;

        let rate = num / den;
        (rate.is_finite() && rate > 0.0).then_some(rate)
    }
}
