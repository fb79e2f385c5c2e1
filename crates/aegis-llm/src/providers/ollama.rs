use super::{chat_messages, http_client, json_from_text};
use crate::stream::{check_status, lines, network};
use crate::{CompletionService, LlmConfig, LlmError, Role, TextStream, Turn};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

/// Local Ollama server (`/api/chat`, NDJSON streaming).
pub struct OllamaProvider {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(&config)?,
            config,
        })
    }

    fn body(&self, prompt: &str, history: &[Turn], stream: bool, json_mode: bool) -> Value {
        let messages: Vec<Value> = chat_messages(prompt, history)
            .map(|(role, content)| {
                let role = match role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                json!({ "role": role, "content": content })
            })
            .collect();
        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "stream": stream,
            "options": { "temperature": self.config.temperature },
        });
        if json_mode {
            body["format"] = json!("json");
        }
        body
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/api/chat", self.config.base_url);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                LlmError::Network(format!(
                    "failed to reach ollama at {url} (is it running?): {e}"
                ))
            })?;
        check_status(resp).await
    }
}

#[async_trait]
impl CompletionService for OllamaProvider {
    async fn generate_stream(
        &self,
        prompt: &str,
        history: &[Turn],
    ) -> Result<TextStream, LlmError> {
        let resp = self.post(&self.body(prompt, history, true, false)).await?;
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
                if line.trim().is_empty() {
                    continue;
                }
                let event: Value = match serde_json::from_str(&line) {
                    Ok(v) => v,
                    Err(e) => {
                        yield Err(LlmError::InvalidResponse(format!("bad NDJSON line: {e}")));
                        return;
                    }
                };
                if let Some(err) = event.get("error").and_then(Value::as_str) {
                    yield Err(LlmError::InvalidResponse(err.to_string()));
                    return;
                }
                if let Some(text) = event.pointer("/message/content").and_then(Value::as_str) {
                    if !text.is_empty() {
                        yield Ok(text.to_string());
                    }
                }
                if event.get("done").and_then(Value::as_bool) == Some(true) {
                    return;
                }
            }
        };
        Ok(s.boxed())
    }

    async fn generate_json(&self, prompt: &str) -> Result<Value, LlmError> {
        let resp = self.post(&self.body(prompt, &[], false, true)).await?;
        let v: Value = resp.json().await.map_err(network)?;
        let text = v
            .pointer("/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| LlmError::InvalidResponse("ollama response has no message".into()))?;
        json_from_text(text)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Provider;

    #[test]
    fn body_carries_history_and_format() {
        let p = OllamaProvider::new(LlmConfig::for_provider(Provider::Ollama)).unwrap();
        let body = p.body("next", &[Turn::user("a"), Turn::assistant("b")], true, true);
        assert_eq!(body["messages"].as_array().unwrap().len(), 3);
        assert_eq!(body["messages"][1]["role"], "assistant");
        assert_eq!(body["format"], "json");
        assert_eq!(p.model_name(), "llama3.1");
    }
}
