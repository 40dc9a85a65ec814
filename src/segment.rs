use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A request for a time and width bounded excerpt of a source video
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRequest {
    source_path: PathBuf,
    start_second: f64,
    duration_seconds: f64,
    width: u32,
    include_audio: bool,
}

impl SegmentRequest {
    /// Build a request, rejecting negative starts, empty durations and zero widths
    ///
    /// # Arguments
    /// * `source_path` - Path to the source video file
    /// * `start_second` - Offset of the segment in the source, in seconds
    /// * `duration_seconds` - Requested length of the segment, in seconds
    /// * `width` - Requested frame width, height follows the aspect ratio
    /// * `include_audio` - Whether the segment keeps its audio track
    pub fn new(
        source_path: impl Into<PathBuf>,
        start_second: f64,
        duration_seconds: f64,
        width: u32,
        include_audio: bool,
    ) -> Result<Self> {
        if !start_second.is_finite() || start_second < 0.0 {
            return Err(Error::InvalidRequest(format!(
                "start must be a non-negative number of seconds, got {}",
                start_second
            )));
        }
        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return Err(Error::InvalidRequest(format!(
                "duration must be a positive number of seconds, got {}",
                duration_seconds
            )));
        }
        if width == 0 {
            return Err(Error::InvalidRequest("width must be positive".to_string()));
        }

        Ok(Self {
            source_path: source_path.into(),
            start_second,
            duration_seconds,
            width,
            include_audio,
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn start_second(&self) -> f64 {
        self.start_second
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn include_audio(&self) -> bool {
        self.include_audio
    }
}

/// What the transcoder reports about a source video
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// The part of the source that actually gets encoded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipWindow {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Output width in pixels
    pub width: u32,
}

impl ClipWindow {
    /// Clamp a request to what the source can provide.
    ///
    /// A request past the end of the source yields an empty window at the
    /// end instead of an error, and the width is never upscaled.
    pub fn clamp(request: &SegmentRequest, info: &MediaInfo) -> Self {
        let native_duration = info.duration.max(0.0);
        let start = request.start_second.min(native_duration);
        let end = (start + request.duration_seconds).min(native_duration);
        let width = request.width.min(info.width);

        Self { start, end, width }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}
