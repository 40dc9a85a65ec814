use log::debug;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{agent, post_json, InferenceRequest, LlmCapability};
use crate::error::{Error, Result};

const PROVIDER_NAME: &str = "OpenAI";

/// Any `/chat/completions` endpoint that speaks the OpenAI wire format
pub struct OpenAiCapability {
    agent: ureq::Agent,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiCapability {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            agent: agent(timeout),
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, request: &InferenceRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": request.system_instruction,
                },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": request.user_text },
                        {
                            "type": "video_url",
                            "video_url": { "url": request.media.data_uri() }
                        }
                    ],
                },
            ],
            "temperature": request.temperature,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "structured_result",
                    "strict": true,
                    "schema": request.output_schema
                }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
    refusal: Option<String>,
}

fn reply_text(body: &str) -> Result<String> {
    let response: ChatCompletionResponse = serde_json::from_str(body).map_err(|e| {
        Error::inference(PROVIDER_NAME, format!("invalid API response ({}): {}", e, body))
    })?;

    let message = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| Error::inference(PROVIDER_NAME, format!("no choices in response: {}", body)))?;

    if let Some(refusal) = message.refusal {
        return Err(Error::inference(
            PROVIDER_NAME,
            format!("model refused: {}", refusal),
        ));
    }

    message
        .content
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| Error::inference(PROVIDER_NAME, "empty reply"))
}

impl LlmCapability for OpenAiCapability {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn complete_raw(&self, request: &InferenceRequest) -> Result<String> {
        let endpoint = self.endpoint();
        debug!("POST {}", endpoint);

        let http_request = self
            .agent
            .post(&endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key));
        let body = post_json(PROVIDER_NAME, http_request, &self.request_body(request))?;

        reply_text(&body)
    }
}
