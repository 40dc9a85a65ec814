//! Multimodal LLM capabilities.
//!
//! A capability takes an [`InferenceRequest`] and returns the model's reply
//! parsed into a [`StructuredResult`]. Providers ask the model for structured
//! output natively and the reply is validated against the same schema here.

mod google;
mod openai;

pub use google::GoogleCapability;
pub use openai::OpenAiCapability;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use ureq::typestate::WithBody;
use ureq::RequestBuilder;

use crate::error::{Error, Result};

/// Instruction sent as the system message of every request
pub const SYSTEM_INSTRUCTION: &str =
    "Please respond to the user using JSON format and place the result in the `result` field";

/// Base64 encoded media attached to the user message
#[derive(Debug, Clone, PartialEq)]
pub struct Media {
    pub mime_type: String,
    pub data: String,
}

impl Media {
    /// `data:` URI form used by OpenAI-style content parts
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub system_instruction: String,
    pub user_text: String,
    pub media: Media,
    pub temperature: f64,
    /// JSON schema the reply has to satisfy
    pub output_schema: Value,
}

/// The only shape a model reply is allowed to take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredResult {
    /// The result of the AI response
    pub result: String,
}

impl StructuredResult {
    pub fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "result": {
                    "type": "string",
                    "description": "The result of the AI response"
                }
            },
            "required": ["result"],
            "additionalProperties": false
        })
    }

    /// Parse a raw model reply, rejecting anything without a string `result`
    pub fn from_reply(provider: &str, reply: &str) -> Result<Self> {
        let mismatch = |reason: String| {
            Error::inference(
                provider,
                format!("reply does not match the result schema ({}): {}", reason, reply),
            )
        };

        // serde also builds structs from sequences, so insist on an object first
        let value: Value =
            serde_json::from_str(strip_code_fence(reply)).map_err(|e| mismatch(e.to_string()))?;
        if !value.is_object() {
            return Err(mismatch("expected a JSON object".to_string()));
        }
        serde_json::from_value(value).map_err(|e| mismatch(e.to_string()))
    }
}

/// Models occasionally wrap JSON in a Markdown fence even in JSON mode
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an info string such as `json` or `JSON` on the opening line
    let rest = match rest.split_once('\n') {
        Some((tag, body)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => body,
        _ => match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        },
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// A model that can answer multimodal requests
pub trait LlmCapability {
    /// Provider name used in logs and errors
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Send the request and return the model's raw reply text
    fn complete_raw(&self, request: &InferenceRequest) -> Result<String>;

    /// Send the request and parse the reply against [`StructuredResult`]
    fn complete(&self, request: &InferenceRequest) -> Result<StructuredResult> {
        let reply = self.complete_raw(request)?;
        StructuredResult::from_reply(self.name(), &reply)
    }
}

/// POST a JSON body and return the response text of a 2xx reply
fn post_json(provider: &str, request: RequestBuilder<WithBody>, body: &Value) -> Result<String> {
    let payload = serde_json::to_string(body)
        .map_err(|e| Error::inference(provider, format!("failed to serialize request: {}", e)))?;

    let mut response = request
        .header("Content-Type", "application/json")
        .send(payload)
        .map_err(|e| Error::inference(provider, format!("request failed: {}", e)))?;

    let status = response.status();
    let text = response
        .body_mut()
        .read_to_string()
        .map_err(|e| Error::inference(provider, format!("failed to read response: {}", e)))?;

    if !status.is_success() {
        return Err(Error::inference(
            provider,
            format!("HTTP {}: {}", status.as_u16(), text.trim()),
        ));
    }

    Ok(text)
}

fn agent(timeout: Option<std::time::Duration>) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(timeout)
        .build();
    ureq::Agent::new_with_config(config)
}
