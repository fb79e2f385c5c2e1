use super::{chat_messages, http_client, json_from_text, require_key};
use crate::stream::{check_status, lines, network, sse_data};
use crate::{CompletionService, LlmConfig, LlmError, Role, TextStream, Turn};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

/// Anthropic Messages API.
pub struct AnthropicProvider {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            api_key: require_key(&config)?,
            client: http_client(&config)?,
            config,
        })
    }

    fn body(&self, prompt: &str, history: &[Turn], stream: bool) -> Value {
        let messages: Vec<Value> = chat_messages(prompt, history)
            .map(|(role, content)| {
                let role = match role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                json!({ "role": role, "content": content })
            })
            .collect();
        json!({
            "model": self.config.model,
            "max_tokens": MAX_TOKENS,
            "temperature": self.config.temperature,
            "messages": messages,
            "stream": stream,
        })
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, LlmError> {
        let resp = self
            .client
            .post(format!("{}/messages", self.config.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await
            .map_err(network)?;
        check_status(resp).await
    }
}

enum Event {
    Text(String),
    Error(String),
    Stop,
    Other,
}

fn classify(v: &Value) -> Event {
    match v.get("type").and_then(Value::as_str) {
        Some("content_block_delta") => v
            .pointer("/delta/text")
            .and_then(Value::as_str)
            .map(|t| Event::Text(t.to_string()))
            .unwrap_or(Event::Other),
        Some("error") => Event::Error(
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("stream error")
                .to_string(),
        ),
        Some("message_stop") => Event::Stop,
        _ => Event::Other,
    }
}

#[async_trait]
impl CompletionService for AnthropicProvider {
    async fn generate_stream(
        &self,
        prompt: &str,
        history: &[Turn],
    ) -> Result<TextStream, LlmError> {
        let resp = self.post(&self.body(prompt, history, true)).await?;
        let mut lines = lines(resp);

        let s = stream! {
            while let Some(line) = lines.next().await {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                let data = match sse_data(&line) {
                    Some(data) => data,
                    None => continue,
                };
                let event: Value = match serde_json::from_str(data) {
                    Ok(v) => v,
                    Err(e) => {
                        yield Err(LlmError::InvalidResponse(format!("bad SSE event: {e}")));
                        return;
                    }
                };
                match classify(&event) {
                    Event::Text(text) if !text.is_empty() => {
                        yield Ok(text);
                    }
                    Event::Error(msg) => {
                        yield Err(LlmError::InvalidResponse(msg));
                        return;
                    }
                    Event::Stop => return,
                    _ => {}
                }
            }
        };
        Ok(s.boxed())
    }

    async fn generate_json(&self, prompt: &str) -> Result<Value, LlmError> {
        // no JSON mode on this API; the prompt carries the format
        let resp = self.post(&self.body(prompt, &[], false)).await?;
        let v: Value = resp.json().await.map_err(network)?;
        let text: String = v
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| LlmError::InvalidResponse("anthropic response has no content".into()))?
            .iter()
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect();
        json_from_text(&text)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_stream_events() {
        let delta = json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": "Hi"}});
        assert!(matches!(classify(&delta), Event::Text(t) if t == "Hi"));

        let err = json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}});
        assert!(matches!(classify(&err), Event::Error(m) if m == "Overloaded"));

        assert!(matches!(classify(&json!({"type": "message_stop"})), Event::Stop));
        assert!(matches!(classify(&json!({"type": "ping"})), Event::Other));
    }
}
