use std::cell::Cell;
use std::fs;
use std::path::Path;

use clipask::ffmpeg::EncodeJob;
use clipask::llm::InferenceRequest;
use clipask::{
    Cache, Error, LlmCapability, MediaInfo, PromptSpec, QueryOrchestrator, Result,
    SegmentExtractor, SegmentRequest, StructuredResult, Transcoder,
};
use tempfile::TempDir;

/// A 10 second 1280px source that encodes into a text description
struct TenSecondSource {
    encodes: Cell<usize>,
}

impl Transcoder for TenSecondSource {
    fn probe(&self, input: &Path) -> Result<MediaInfo> {
        if !input.exists() {
            return Err(Error::MediaDecode {
                path: input.to_path_buf(),
                reason: "file does not exist".to_string(),
            });
        }
        Ok(MediaInfo {
            duration: 10.0,
            width: 1280,
            height: 720,
        })
    }

    fn encode(&self, job: &EncodeJob<'_>) -> Result<()> {
        self.encodes.set(self.encodes.get() + 1);
        let body = format!("{}s@{}", job.window.duration(), job.window.width);
        fs::write(job.output, body).map_err(|source| Error::Io {
            path: job.output.to_path_buf(),
            source,
        })
    }
}

struct DogModel;

impl LlmCapability for DogModel {
    fn name(&self) -> &str {
        "dog"
    }

    fn model(&self) -> &str {
        "dog-1"
    }

    fn complete_raw(&self, request: &InferenceRequest) -> Result<String> {
        assert_eq!(request.user_text, "describe the action");
        assert_eq!(request.media.mime_type, "video/webm");
        assert!(!request.media.data.is_empty());
        Ok(r#"{"result": "a dog runs"}"#.to_string())
    }
}

#[test]
fn clipped_segment_is_answered_by_the_model() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("dog.mp4");
    fs::write(&source, b"source video").unwrap();

    let cache = Cache::new(temp_dir.path().join("segments"));
    let extractor = SegmentExtractor::new(
        cache,
        TenSecondSource {
            encodes: Cell::new(0),
        },
    );
    let request = SegmentRequest::new(&source, 0.0, 30.0, 640, false)?;

    let segment = extractor.extract(&request)?;
    assert_eq!(String::from_utf8(segment.clone()).unwrap(), "10s@640");

    let cached = temp_dir.path().join("segments").join("dog_640_0_30.webm");
    assert!(cached.is_file());

    let orchestrator = QueryOrchestrator::new(Box::new(DogModel));
    let prompt = PromptSpec::new("describe the action", 0.0)?;
    let response = orchestrator.query(&segment, &prompt)?;

    assert_eq!(
        response,
        StructuredResult {
            result: "a dog runs".to_string()
        }
    );

    // Asking again reuses the cached segment
    extractor.extract(&request)?;
    assert_eq!(extractor.transcoder().encodes.get(), 1);
    Ok(())
}

#[test]
fn missing_source_fails_before_caching() {
    let temp_dir = TempDir::new().unwrap();
    let segments = temp_dir.path().join("segments");
    let extractor = SegmentExtractor::new(
        Cache::new(segments.clone()),
        TenSecondSource {
            encodes: Cell::new(0),
        },
    );
    let request =
        SegmentRequest::new(temp_dir.path().join("nope.mp4"), 0.0, 30.0, 640, false).unwrap();

    assert!(matches!(
        extractor.extract(&request),
        Err(Error::MediaDecode { .. })
    ));
    assert!(!segments.join("nope_640_0_30.webm").exists());
}
