use std::path::PathBuf;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::arbiter::{
    arbiter::{Arbiter, ArbiterRequest},
    decision::{Decision, extract_decision},
    prompt::{SYSTEM_PROMPT, build_prompt},
};
use crate::error::ServiceError;
use crate::retry::RetryPolicy;

/// How the API key is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    #[default]
    Bearer,
    /// `api-key: <key>` (Azure deployments)
    ApiKey,
}

// ============================================================================
// ChatClient: one OpenAI-compatible chat completion
// ============================================================================

pub struct ChatClient {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    api_key: Option<String>,
    auth: AuthStyle,
    http: HttpClient,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<Value>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatClient {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: Option<String>,
        auth: AuthStyle,
        max_tokens: u32,
    ) -> Result<Self, ServiceError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|source| ServiceError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            max_tokens,
            api_key,
            auth,
            http,
        })
    }

    /// Single completion attempt; returns the assistant message text.
    pub fn complete(
        &self,
        system: &str,
        user: &str,
        images: &[PathBuf],
    ) -> Result<String, ServiceError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            max_tokens: self.max_tokens,
            messages: vec![
                json!({ "role": "system", "content": system }),
                json!({ "role": "user", "content": user_content(user, images)? }),
            ],
        };

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = match self.auth {
                AuthStyle::Bearer => request.bearer_auth(key),
                AuthStyle::ApiKey => request.header("api-key", key),
            };
        }

        let response = request.send().map_err(|source| ServiceError::Http {
            endpoint: self.endpoint.clone(),
            source,
        })?;
        let status = response.status();
        let text = response.text().map_err(|source| ServiceError::Http {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        if status.as_u16() == 429 {
            return Err(ServiceError::RateLimited {
                endpoint: self.endpoint.clone(),
                message: text,
            });
        }
        if !status.is_success() {
            return Err(ServiceError::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|source| ServiceError::Decode {
                context: "chat completion".into(),
                source,
            })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ServiceError::Shape("chat completion had no message content".into()))
    }
}

/// Text part followed by one inline data URL per image.
pub fn user_content(text: &str, images: &[PathBuf]) -> Result<Value, ServiceError> {
    if images.is_empty() {
        return Ok(Value::String(text.to_string()));
    }
    let mut parts = vec![json!({ "type": "text", "text": text })];
    for path in images {
        let bytes = std::fs::read(path).map_err(|source| ServiceError::Attachment {
            path: path.clone(),
            source,
        })?;
        parts.push(json!({
            "type": "image_url",
            "image_url": { "url": format!("data:image/jpeg;base64,{}", BASE64.encode(bytes)) }
        }));
    }
    Ok(Value::Array(parts))
}

// ============================================================================
// ChatArbiter
// ============================================================================

/// Arbiter backed by a chat model, retrying transport failures and
/// unparseable answers under `retry`.
pub struct ChatArbiter {
    client: ChatClient,
    retry: RetryPolicy,
}

impl ChatArbiter {
    pub fn new(client: ChatClient, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }
}

impl Arbiter for ChatArbiter {
    fn choose(&self, request: &ArbiterRequest<'_>) -> Result<Decision, ServiceError> {
        let prompt = build_prompt(request);
        debug!(target_text = request.target, candidates = request.candidates.len(), "asking arbiter");

        self.retry.run("arbiter call", |_| {
            let answer = self.client.complete(SYSTEM_PROMPT, &prompt, &[])?;
            extract_decision(&answer)
        })
    }
}
