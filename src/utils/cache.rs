use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::hash::{DefaultHasher, Hasher};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::segment::SegmentRequest;

/// Extension of every cached segment
pub const SEGMENT_EXTENSION: &str = "webm";

const BUFFER_SIZE: usize = 8192; // 8KB buffer size

/// How cache keys are derived from a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    /// File stem, width, start and duration only
    #[default]
    NameOnly,
    /// Name-only key plus a hash of the source content
    Fingerprint,
}

/// Deterministic identifier of a cached segment.
///
/// Built from the source file stem, width, start and duration. The audio
/// flag is not part of the key, so requests that differ only in audio share
/// one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_request(request: &SegmentRequest) -> Self {
        let file_stem = request.source_path().file_stem().unwrap_or_default();
        Self(format!(
            "{}_{}_{}_{}",
            file_stem.to_string_lossy(),
            request.width(),
            request.start_second(),
            request.duration_seconds()
        ))
    }

    pub fn with_fingerprint(self, fingerprint: u64) -> Self {
        Self(format!("{}_{:016x}", self.0, fingerprint))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Manages the scratch directory holding extracted segments
#[derive(Debug)]
pub struct Cache {
    /// Directory holding the segment files
    segments_dir: PathBuf,
    key_mode: KeyMode,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(default_cache_dir())
    }
}

/// `{user cache dir}/clipask/segments`, or `.cache/clipask/segments` when the
/// platform has no cache directory
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("clipask")
        .join("segments")
}

impl Cache {
    /// Create a new cache instance with the specified segment directory
    pub fn new(segments_dir: PathBuf) -> Self {
        Self {
            segments_dir,
            key_mode: KeyMode::default(),
        }
    }

    pub fn with_key_mode(mut self, key_mode: KeyMode) -> Self {
        self.key_mode = key_mode;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.segments_dir
    }

    pub fn key_mode(&self) -> KeyMode {
        self.key_mode
    }

    /// Create the segment directory if needed
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.segments_dir).map_err(|e| Error::io(&self.segments_dir, e))
    }

    /// Derive the cache key of a request.
    ///
    /// In fingerprint mode the source is read in full, so a missing or
    /// unreadable source is reported as a decode failure.
    pub fn key_for(&self, request: &SegmentRequest) -> Result<CacheKey> {
        let key = CacheKey::for_request(request);
        match self.key_mode {
            KeyMode::NameOnly => Ok(key),
            KeyMode::Fingerprint => {
                let fingerprint = content_fingerprint(request.source_path())
                    .map_err(|e| Error::decode(request.source_path(), e.to_string()))?;
                Ok(key.with_fingerprint(fingerprint))
            }
        }
    }

    /// Get the path for a cached segment
    pub fn segment_path(&self, key: &CacheKey) -> PathBuf {
        self.segments_dir
            .join(format!("{}.{}", key.as_str(), SEGMENT_EXTENSION))
    }

    /// Returns the cached segment path when one exists.
    ///
    /// Existence is the only validity check, a truncated file is still a hit.
    pub fn lookup(&self, key: &CacheKey) -> Option<PathBuf> {
        let path = self.segment_path(key);
        path.is_file().then_some(path)
    }

    /// Read a cached segment
    pub fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| Error::io(path, e))
    }

    /// Remove every cached segment
    pub fn cleanup(&self) -> Result<()> {
        if self.segments_dir.exists() {
            fs::remove_dir_all(&self.segments_dir).map_err(|e| Error::io(&self.segments_dir, e))?;
        }
        Ok(())
    }

    /// Remove the cached segments extracted from a specific input file,
    /// returning how many were deleted
    pub fn cleanup_for_input(&self, input_path: &Path) -> Result<usize> {
        if !self.segments_dir.exists() {
            return Ok(0);
        }

        let stem = input_path.file_stem().unwrap_or_default().to_string_lossy();
        let entries =
            fs::read_dir(&self.segments_dir).map_err(|e| Error::io(&self.segments_dir, e))?;

        let mut removed = 0;
        for entry in entries {
            let path = entry.map_err(|e| Error::io(&self.segments_dir, e))?.path();
            let matches = path
                .file_name()
                .and_then(|s| s.to_str())
                .map(|s| is_segment_of(s, &stem))
                .unwrap_or(false);
            if matches {
                debug!("Removing {}", path.display());
                fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

/// Whether `file_name` is a segment key for `stem`:
/// `{stem}_{width}_{start}_{duration}[_{fingerprint}].webm`
fn is_segment_of(file_name: &str, stem: &str) -> bool {
    let Some(rest) = file_name
        .strip_prefix(stem)
        .and_then(|s| s.strip_prefix('_'))
        .and_then(|s| s.strip_suffix(SEGMENT_EXTENSION))
        .and_then(|s| s.strip_suffix('.'))
    else {
        return false;
    };

    let parts: Vec<&str> = rest.split('_').collect();
    let fingerprint_ok = match parts.get(3) {
        None => true,
        Some(hex) => hex.len() == 16 && hex.chars().all(|c| c.is_ascii_hexdigit()),
    };
    let is_seconds = |s: &str| s.parse::<f64>().is_ok_and(|v| v.is_finite() && v >= 0.0);

    (3..=4).contains(&parts.len())
        && parts[0].parse::<u32>().is_ok()
        && is_seconds(parts[1])
        && is_seconds(parts[2])
        && fingerprint_ok
}

/// Hash the full content of a file
pub fn content_fingerprint(path: &Path) -> io::Result<u64> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = DefaultHasher::new();
    let mut buffer = vec![0; BUFFER_SIZE];

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => hasher.write(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_cache() -> (Cache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = Cache::new(temp_dir.path().join("segments"));
        cache.init().unwrap();
        (cache, temp_dir)
    }

    fn request(path: &Path, audio: bool) -> SegmentRequest {
        SegmentRequest::new(path, 0.0, 300.0, 640, audio).unwrap()
    }

    #[test]
    fn test_cache_initialization() {
        let (cache, _temp_dir) = setup_test_cache();
        assert!(cache.dir().is_dir());
    }

    #[test]
    fn test_key_format() {
        let key = CacheKey::for_request(&request(Path::new("/videos/holiday.mp4"), false));
        assert_eq!(key.as_str(), "holiday_640_0_300");

        let fractional = SegmentRequest::new("clip.mkv", 1.5, 2.25, 320, false).unwrap();
        assert_eq!(CacheKey::for_request(&fractional).as_str(), "clip_320_1.5_2.25");
    }

    #[test]
    fn test_key_ignores_audio_flag() {
        let path = Path::new("talk.mp4");
        assert_eq!(
            CacheKey::for_request(&request(path, true)),
            CacheKey::for_request(&request(path, false))
        );
    }

    #[test]
    fn test_segment_path() {
        let (cache, _temp_dir) = setup_test_cache();
        let key = CacheKey::for_request(&request(Path::new("talk.mp4"), false));
        let path = cache.segment_path(&key);
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            "talk_640_0_300.webm"
        );
        assert!(path.starts_with(cache.dir()));
    }

    #[test]
    fn test_lookup_trusts_existence() -> Result<()> {
        let (cache, _temp_dir) = setup_test_cache();
        let key = CacheKey::for_request(&request(Path::new("talk.mp4"), false));
        assert!(cache.lookup(&key).is_none());

        fs::write(cache.segment_path(&key), b"trunc").unwrap();
        let hit = cache.lookup(&key).unwrap();
        assert_eq!(cache.read(&hit)?, b"trunc");
        Ok(())
    }

    #[test]
    fn test_fingerprint_mode_tracks_content() -> Result<()> {
        let (cache, temp_dir) = setup_test_cache();
        let cache = cache.with_key_mode(KeyMode::Fingerprint);

        let first = temp_dir.path().join("a").join("talk.mp4");
        let second = temp_dir.path().join("b").join("talk.mp4");
        fs::create_dir_all(first.parent().unwrap()).unwrap();
        fs::create_dir_all(second.parent().unwrap()).unwrap();
        fs::write(&first, b"first recording").unwrap();
        fs::write(&second, b"second recording").unwrap();

        let first_key = cache.key_for(&request(&first, false))?;
        let second_key = cache.key_for(&request(&second, false))?;
        assert_ne!(first_key, second_key);
        assert!(first_key.as_str().starts_with("talk_640_0_300_"));
        assert_eq!(first_key, cache.key_for(&request(&first, true))?);

        // Name-only mode cannot tell the two apart
        let plain = Cache::new(cache.dir().to_path_buf());
        assert_eq!(
            plain.key_for(&request(&first, false))?,
            plain.key_for(&request(&second, false))?
        );
        Ok(())
    }

    #[test]
    fn test_fingerprint_of_missing_source_is_decode_error() {
        let (cache, temp_dir) = setup_test_cache();
        let cache = cache.with_key_mode(KeyMode::Fingerprint);
        let missing = temp_dir.path().join("missing.mp4");
        assert!(matches!(
            cache.key_for(&request(&missing, false)),
            Err(Error::MediaDecode { .. })
        ));
    }

    #[test]
    fn test_cleanup() -> Result<()> {
        let (cache, _temp_dir) = setup_test_cache();

        let talk = cache.segment_path(&CacheKey::for_request(&request(
            Path::new("talk.mp4"),
            false,
        )));
        let other = cache.segment_path(&CacheKey::for_request(&request(
            Path::new("talkshow.mp4"),
            false,
        )));
        fs::write(&talk, "test").unwrap();
        fs::write(&other, "test").unwrap();

        // Test cleanup for specific input
        assert_eq!(cache.cleanup_for_input(Path::new("talk.mp4"))?, 1);
        assert!(!talk.exists());
        assert!(other.exists());

        // Test full cleanup
        cache.cleanup()?;
        assert!(!cache.dir().exists());
        assert_eq!(cache.cleanup_for_input(Path::new("talk.mp4"))?, 0);

        Ok(())
    }

    #[test]
    fn test_cleanup_keeps_videos_sharing_a_stem_prefix() -> Result<()> {
        let (cache, _temp_dir) = setup_test_cache();

        let talk = cache.segment_path(&CacheKey::for_request(&request(
            Path::new("talk.mp4"),
            false,
        )));
        let talk_show = cache.segment_path(&CacheKey::for_request(&request(
            Path::new("talk_show.mp4"),
            false,
        )));
        let talk_fingerprinted = cache.segment_path(
            &CacheKey::for_request(&request(Path::new("talk.mkv"), true))
                .with_fingerprint(0x0123_4567_89ab_cdef),
        );
        let notes = cache.dir().join("talk_notes.webm");
        for path in [&talk, &talk_show, &talk_fingerprinted, &notes] {
            fs::write(path, "test").unwrap();
        }

        assert_eq!(cache.cleanup_for_input(Path::new("talk.mp4"))?, 2);
        assert!(!talk.exists());
        assert!(!talk_fingerprinted.exists());
        assert!(talk_show.exists());
        assert!(notes.exists());

        Ok(())
    }

    #[test]
    fn test_is_segment_of() {
        assert!(is_segment_of("talk_640_0_300.webm", "talk"));
        assert!(is_segment_of("talk_640_2.5_10.webm", "talk"));
        assert!(is_segment_of("talk_show_640_0_300.webm", "talk_show"));
        assert!(!is_segment_of("talk_show_640_0_300.webm", "talk"));
        assert!(!is_segment_of("talk_640_0_300.mp4", "talk"));
        assert!(!is_segment_of("talk_640_0_300_xyz.webm", "talk"));
        assert!(!is_segment_of("talk_640_0.webm", "talk"));
    }
}
