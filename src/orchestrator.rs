use base64::{engine::general_purpose::STANDARD, Engine};
use log::info;

use crate::error::Result;
use crate::ffmpeg::MIME_TYPE;
use crate::llm::{InferenceRequest, LlmCapability, Media, StructuredResult, SYSTEM_INSTRUCTION};
use crate::prompt::PromptSpec;
use crate::provider::LlmSettings;

/// Sends a segment and a prompt to the configured model
pub struct QueryOrchestrator {
    capability: Box<dyn LlmCapability>,
}

impl QueryOrchestrator {
    pub fn new(capability: Box<dyn LlmCapability>) -> Self {
        Self { capability }
    }

    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self::new(settings.build_capability())
    }

    pub fn capability(&self) -> &dyn LlmCapability {
        self.capability.as_ref()
    }

    /// Build the multimodal request for a segment
    pub fn build_request(&self, segment: &[u8], prompt: &PromptSpec) -> InferenceRequest {
        InferenceRequest {
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            user_text: prompt.text.clone(),
            media: Media {
                mime_type: MIME_TYPE.to_string(),
                data: STANDARD.encode(segment),
            },
            temperature: prompt.temperature,
            output_schema: StructuredResult::json_schema(),
        }
    }

    /// Ask the model about a segment, failing on any reply without a `result`
    pub fn query(&self, segment: &[u8], prompt: &PromptSpec) -> Result<StructuredResult> {
        let request = self.build_request(segment, prompt);
        info!(
            "Asking {} ({} bytes of video)...",
            self.capability.model(),
            segment.len()
        );
        self.capability.complete(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::RefCell;

    /// Replies with a fixed body and remembers what it was asked
    struct StubCapability {
        reply: std::result::Result<String, String>,
        seen: RefCell<Vec<InferenceRequest>>,
    }

    impl StubCapability {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                seen: RefCell::new(Vec::new()),
            }
        }

        fn unreachable() -> Self {
            Self {
                reply: Err("connection refused".to_string()),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl LlmCapability for StubCapability {
        fn name(&self) -> &str {
            "stub"
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        fn complete_raw(&self, request: &InferenceRequest) -> Result<String> {
            self.seen.borrow_mut().push(request.clone());
            self.reply
                .clone()
                .map_err(|reason| Error::inference("stub", reason))
        }
    }

    fn prompt() -> PromptSpec {
        PromptSpec::new("describe the action", 0.3).unwrap()
    }

    #[test]
    fn test_query_returns_parsed_result() -> Result<()> {
        let orchestrator =
            QueryOrchestrator::new(Box::new(StubCapability::replying(r#"{"result": "a dog runs"}"#)));

        let result = orchestrator.query(b"webm bytes", &prompt())?;
        assert_eq!(
            result,
            StructuredResult {
                result: "a dog runs".to_string()
            }
        );
        Ok(())
    }

    #[test]
    fn test_request_shape() {
        let orchestrator = QueryOrchestrator::new(Box::new(StubCapability::replying("{}")));
        let request = orchestrator.build_request(b"\x00\x01\x02", &prompt());

        assert_eq!(request.system_instruction, SYSTEM_INSTRUCTION);
        assert_eq!(request.user_text, "describe the action");
        assert_eq!(request.media.mime_type, "video/webm");
        assert_eq!(request.media.data, "AAEC");
        assert_eq!(request.temperature, 0.3);
        assert_eq!(request.output_schema["required"][0], "result");
    }

    #[test]
    fn test_missing_result_field_is_inference_error() {
        let orchestrator =
            QueryOrchestrator::new(Box::new(StubCapability::replying(r#"{"answer": "a dog runs"}"#)));
        assert!(matches!(
            orchestrator.query(b"bytes", &prompt()),
            Err(Error::Inference { .. })
        ));
    }

    #[test]
    fn test_unreachable_capability_is_inference_error() {
        let orchestrator = QueryOrchestrator::new(Box::new(StubCapability::unreachable()));
        assert!(matches!(
            orchestrator.query(b"bytes", &prompt()),
            Err(Error::Inference { .. })
        ));
    }
}
