use log::{debug, info, warn};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::ffmpeg::{EncodeJob, Transcoder};
use crate::segment::{ClipWindow, SegmentRequest};
use crate::utils::Cache;

/// Produces segments, reusing the cached copy whenever the key already exists
pub struct SegmentExtractor<T: Transcoder> {
    cache: Cache,
    transcoder: T,
}

impl<T: Transcoder> SegmentExtractor<T> {
    pub fn new(cache: Cache, transcoder: T) -> Self {
        Self { cache, transcoder }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn transcoder(&self) -> &T {
        &self.transcoder
    }

    /// Extract a segment and return its bytes
    pub fn extract(&self, request: &SegmentRequest) -> Result<Vec<u8>> {
        let path = self.materialize(request)?;
        self.cache.read(&path)
    }

    /// Make sure the segment exists in the cache and return its path
    ///
    /// # Arguments
    /// * `request` - The segment to produce
    pub fn materialize(&self, request: &SegmentRequest) -> Result<PathBuf> {
        self.cache.init()?;

        let key = self.cache.key_for(request)?;
        if let Some(path) = self.cache.lookup(&key) {
            info!("{} already exists. Skip", path.display());
            return Ok(path);
        }

        let path = self.cache.segment_path(&key);
        let media = self.transcoder.probe(request.source_path())?;
        let window = ClipWindow::clamp(request, &media);
        debug!(
            "Source {}: {:.3}s at {}px, encoding [{:.3}, {:.3}) at {}px",
            request.source_path().display(),
            media.duration,
            media.width,
            window.start,
            window.end,
            window.width
        );

        // A cache directory that rejects writes is an I/O failure, not a decode one
        let output = PartialOutput::new(&path);
        File::create(&path).map_err(|e| Error::io(&path, e))?;
        self.transcoder.encode(&EncodeJob {
            input: request.source_path(),
            output: &path,
            window,
            include_audio: request.include_audio(),
        })?;
        output.commit();

        info!("Extracted segment to {}", path.display());
        Ok(path)
    }
}

/// Removes a half-written segment unless the encode completed
struct PartialOutput<'a> {
    path: &'a Path,
    committed: bool,
}

impl<'a> PartialOutput<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for PartialOutput<'_> {
    fn drop(&mut self) {
        if !self.committed && self.path.exists() {
            warn!("Removing incomplete segment {}", self.path.display());
            if let Err(e) = fs::remove_file(self.path) {
                warn!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}
