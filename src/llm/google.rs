use log::debug;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::{agent, post_json, InferenceRequest, LlmCapability};
use crate::error::{Error, Result};

const PROVIDER_NAME: &str = "Google";

/// Gemini through the `generateContent` REST endpoint
pub struct GoogleCapability {
    agent: ureq::Agent,
    api_key: String,
    model: String,
    base_url: String,
}

impl GoogleCapability {
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
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn request_body(request: &InferenceRequest) -> Value {
        json!({
            "systemInstruction": {
                "parts": [{ "text": request.system_instruction }]
            },
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": request.user_text },
                    {
                        "inlineData": {
                            "mimeType": request.media.mime_type,
                            "data": request.media.data
                        }
                    }
                ]
            }],
            "generationConfig": {
                "temperature": request.temperature,
                "responseMimeType": "application/json",
                "responseSchema": gemini_schema(&request.output_schema)
            }
        })
    }
}

/// Gemini's schema dialect: upper-case type names, no `additionalProperties`
fn gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(fields) => {
            let mut converted = Map::new();
            for (key, value) in fields {
                match (key.as_str(), value) {
                    ("additionalProperties", _) => {}
                    ("type", Value::String(name)) => {
                        converted.insert(key.clone(), Value::String(name.to_uppercase()));
                    }
                    ("properties", Value::Object(properties)) => {
                        let properties = properties
                            .iter()
                            .map(|(name, property)| (name.clone(), gemini_schema(property)))
                            .collect();
                        converted.insert(key.clone(), Value::Object(properties));
                    }
                    ("items", item) => {
                        converted.insert(key.clone(), gemini_schema(item));
                    }
                    _ => {
                        converted.insert(key.clone(), value.clone());
                    }
                }
            }
            Value::Object(converted)
        }
        other => other.clone(),
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

fn reply_text(body: &str) -> Result<String> {
    let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        Error::inference(PROVIDER_NAME, format!("invalid API response ({}): {}", e, body))
    })?;

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::inference(PROVIDER_NAME, format!("no candidates in response: {}", body)))?;

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(Error::inference(
            PROVIDER_NAME,
            format!(
                "empty reply (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ),
        ));
    }

    Ok(text)
}

impl LlmCapability for GoogleCapability {
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
            .header("x-goog-api-key", &self.api_key);
        let body = post_json(PROVIDER_NAME, http_request, &Self::request_body(request))?;

        reply_text(&body)
    }
}
