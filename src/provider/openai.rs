use super::{GenerationRequest, Provider};
use crate::error::RelayError;
use crate::settings::Credential;
use anyhow::Context;
use futures_core::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_base: Url,
}

impl OpenAiProvider {
    /// `api_base` is the versioned root, e.g. `https://api.openai.com/v1/`.
    pub fn new(http: reqwest::Client, api_base: &str) -> anyhow::Result<Self> {
        let mut base = api_base.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let api_base = Url::parse(&base).with_context(|| format!("invalid provider base URL: {api_base}"))?;
        Ok(Self { http, api_base })
    }

    fn endpoint(&self) -> Result<Url, RelayError> {
        self.api_base
            .join("chat/completions")
            .map_err(|e| RelayError::transport(format!("invalid endpoint URL: {e}")))
    }

    fn headers(credential: &Credential) -> Result<HeaderMap, RelayError> {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut v = HeaderValue::from_str(&format!("Bearer {}", credential.expose()))
            .map_err(|_| RelayError::configuration("API key contains characters not allowed in a header"))?;
        v.set_sensitive(true);
        h.insert(AUTHORIZATION, v);
        Ok(h)
    }
}

impl Provider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn generate<'a>(
        &'a self,
        req: GenerationRequest,
        credential: &'a Credential,
    ) -> BoxFuture<'a, Result<String, RelayError>> {
        Box::pin(async move {
            let url = self.endpoint()?;
            let headers = Self::headers(credential)?;

            let body = ChatCompletionRequest {
                model: &req.model,
                messages: [
                    Message {
                        role: "system",
                        content: &req.system_instruction,
                    },
                    Message {
                        role: "user",
                        content: &req.prompt,
                    },
                ],
                max_tokens: req.max_tokens,
                temperature: req.temperature,
            };

            tracing::debug!(%url, model = %req.model, "sending chat completion request");

            let resp = self
                .http
                .post(url)
                .headers(headers)
                .json(&body)
                .send()
                .await
                .map_err(|e| RelayError::transport(transport_message(&e)))?;

            let status = resp.status();
            if status != StatusCode::OK {
                return Err(RelayError::UpstreamStatus {
                    status: status.as_u16(),
                });
            }

            let bytes = resp
                .bytes()
                .await
                .map_err(|e| RelayError::transport(transport_message(&e)))?;

            extract_content(&bytes).ok_or(RelayError::UpstreamShape)
        })
    }
}

fn transport_message(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request to the API timed out".to_string()
    } else if e.is_connect() {
        "could not connect to the API".to_string()
    } else {
        format!("request to the API failed: {e}")
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// `choices[0].message.content`, trimmed. Anything else is a shape error.
fn extract_content(body: &[u8]) -> Option<String> {
    let parsed: ChatCompletionResponse = serde_json::from_slice(body).ok()?;
    let content = parsed.choices.into_iter().next()?.message?.content?;
    Some(content.trim().to_string())
}
