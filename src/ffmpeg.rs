use log::debug;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{Error, Result};
use crate::segment::{ClipWindow, MediaInfo};

/// VP8, the WebM codec every multimodal provider accepts
pub const VIDEO_CODEC: &str = "libvpx";
pub const AUDIO_CODEC: &str = "libvorbis";
pub const AUDIO_BITRATE: &str = "50k";
/// High compression, segments only need to be legible to the model
pub const CRF: u8 = 50;
pub const MIME_TYPE: &str = "video/webm";

/// One encode of a clip window into a segment file
#[derive(Debug, Clone, Copy)]
pub struct EncodeJob<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub window: ClipWindow,
    pub include_audio: bool,
}

/// Decode/encode capability used by the extractor
pub trait Transcoder {
    /// Read duration and frame size of a source video
    fn probe(&self, input: &Path) -> Result<MediaInfo>;

    /// Encode the job's window into `job.output`
    fn encode(&self, job: &EncodeJob<'_>) -> Result<()>;
}

/// Handles all FFMPEG-related operations for probing and clipping videos
#[derive(Debug, Clone)]
pub struct FFmpeg {
    /// Keep ffmpeg's own output out of the diagnostic stream
    quiet: bool,
}

impl Default for FFmpeg {
    fn default() -> Self {
        Self { quiet: true }
    }
}

impl FFmpeg {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Checks if FFmpeg and FFprobe are available on the system
    pub fn check_ffmpeg() -> Result<()> {
        for binary in ["ffmpeg", "ffprobe"] {
            Command::new(binary)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map_err(|_| {
                    Error::Config(format!(
                        "{} is not installed or not available in system PATH",
                        binary
                    ))
                })?;
        }
        Ok(())
    }

    fn probe_args(input: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(input.as_os_str().to_owned());
        args
    }

    /// Builds the ffmpeg arguments for a segment encode
    ///
    /// Seeking happens before `-i` so ffmpeg skips straight to the window.
    /// Height is derived from the width and kept even.
    fn segment_args(&self, job: &EncodeJob<'_>) -> Vec<OsString> {
        let log_level = if self.quiet { "error" } else { "info" };
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            log_level.into(),
            "-y".into(),
            "-ss".into(),
            format!("{:.3}", job.window.start).into(),
            "-i".into(),
            job.input.into(),
            "-t".into(),
            format!("{:.3}", job.window.duration()).into(),
            "-vf".into(),
            format!("scale={}:-2", job.window.width).into(),
            "-c:v".into(),
            VIDEO_CODEC.into(),
            "-crf".into(),
            CRF.to_string().into(),
        ];

        if job.include_audio {
            args.extend(["-c:a", AUDIO_CODEC, "-b:a", AUDIO_BITRATE].map(OsString::from));
        } else {
            args.push("-an".into());
        }

        args.extend(["-f", "webm"].map(OsString::from));
        args.push(job.output.into());
        args
    }
}

impl Transcoder for FFmpeg {
    fn probe(&self, input: &Path) -> Result<MediaInfo> {
        if !input.is_file() {
            return Err(Error::decode(input, "file does not exist"));
        }

        let output = Command::new("ffprobe")
            .args(Self::probe_args(input))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::decode(input, format!("failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(Error::decode(
                input,
                format!(
                    "ffprobe exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        parse_probe(input, &output.stdout)
    }

    fn encode(&self, job: &EncodeJob<'_>) -> Result<()> {
        let args = self.segment_args(job);
        debug!("Running ffmpeg {:?}", args);

        let stderr = if self.quiet {
            Stdio::piped()
        } else {
            Stdio::inherit()
        };
        let output = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(stderr)
            .output()
            .map_err(|e| Error::decode(job.input, format!("failed to run ffmpeg: {}", e)))?;

        let diagnostics = String::from_utf8_lossy(&output.stderr);
        if !diagnostics.trim().is_empty() {
            debug!("ffmpeg: {}", diagnostics.trim());
        }

        if !output.status.success() {
            return Err(Error::decode(
                job.input,
                format!("ffmpeg exited with {}: {}", output.status, diagnostics.trim()),
            ));
        }

        Ok(())
    }
}

/// FFprobe JSON output format
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
    #[serde(default)]
    tags: Option<FfprobeTags>,
}

#[derive(Debug, Deserialize)]
struct FfprobeSideData {
    rotation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FfprobeTags {
    rotate: Option<String>,
}

impl FfprobeStream {
    /// Display rotation in degrees, from the display matrix or the legacy tag
    fn rotation(&self) -> i64 {
        self.side_data_list
            .iter()
            .find_map(|d| d.rotation)
            .or_else(|| {
                self.tags
                    .as_ref()
                    .and_then(|t| t.rotate.as_deref())
                    .and_then(|r| r.trim().parse::<f64>().ok())
            })
            .filter(|r| r.is_finite())
            .map(|r| r.round() as i64)
            .unwrap_or(0)
    }
}

fn parse_duration(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
}

fn parse_probe(input: &Path, stdout: &[u8]) -> Result<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)
        .map_err(|e| Error::decode(input, format!("unreadable ffprobe output: {}", e)))?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| Error::decode(input, "no video stream found"))?;

    // Container duration first, some formats only report it per stream
    let duration = parse_duration(probe.format.as_ref().and_then(|f| f.duration.as_deref()))
        .or_else(|| parse_duration(video_stream.duration.as_deref()))
        .ok_or_else(|| Error::decode(input, "video duration is unknown"))?;

    let width = video_stream
        .width
        .filter(|w| *w > 0)
        .ok_or_else(|| Error::decode(input, "video width is unknown"))?;
    let height = video_stream.height.unwrap_or(0);

    // ffmpeg autorotates, so a portrait recording is encoded at its displayed size
    let (width, height) = if video_stream.rotation().abs() % 180 == 90 {
        if height == 0 {
            return Err(Error::decode(input, "rotated video has no height"));
        }
        (height, width)
    } else {
        (width, height)
    };

    Ok(MediaInfo {
        duration,
        width,
        height,
    })
}
