use super::{chat_messages, http_client, json_from_text, require_key};
use crate::stream::{check_status, lines, network, sse_data};
use crate::{CompletionService, LlmConfig, LlmError, Role, TextStream, Turn};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

/// OpenAI-compatible Chat Completions endpoint.
///
/// `AEGIS_LLM_BASE_URL` can point this at any server speaking the same API.
pub struct OpenAiProvider {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            api_key: require_key(&config)?,
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
            "temperature": self.config.temperature,
            "stream": stream,
        });
        if json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, LlmError> {
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(network)?;
        check_status(resp).await
    }
}

fn delta_text(v: &Value) -> Option<&str> {
    v.get("choices")?.get(0)?.get("delta")?.get("content")?.as_str()
}

#[async_trait]
impl CompletionService for OpenAiProvider {
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
                let data = match sse_data(&line) {
                    Some(data) => data,
                    None => continue,
                };
                if data == "[DONE]" {
                    return;
                }
                match serde_json::from_str::<Value>(data) {
                    Ok(event) => {
                        if let Some(text) = delta_text(&event).filter(|t| !t.is_empty()) {
                            yield Ok(text.to_string());
                        }
                    }
                    Err(e) => {
                        yield Err(LlmError::InvalidResponse(format!("bad SSE event: {e}")));
                        return;
                    }
                }
            }
        };
        Ok(s.boxed())
    }

    async fn generate_json(&self, prompt: &str) -> Result<Value, LlmError> {
        let resp = self.post(&self.body(prompt, &[], false, true)).await?;
        let v: Value = resp.json().await.map_err(network)?;
        let text = v
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| LlmError::InvalidResponse("openai response has no content".into()))?;
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
    fn json_mode_sets_response_format() {
        let mut cfg = LlmConfig::for_provider(Provider::OpenAi);
        cfg.api_key = Some("sk".into());
        let p = OpenAiProvider::new(cfg).unwrap();

        let body = p.body("q", &[], false, true);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn delta_text_reads_first_choice() {
        let v = json!({"choices": [{"delta": {"content": "Hi"}}]});
        assert_eq!(delta_text(&v), Some("Hi"));
        assert_eq!(delta_text(&json!({"choices": [{"delta": {}}]})), None);
    }
}
