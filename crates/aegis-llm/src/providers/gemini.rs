use super::{chat_messages, http_client, json_from_text, require_key};
use crate::stream::{check_status, lines, network, sse_data};
use crate::{CompletionService, LlmConfig, LlmError, Role, TextStream, Turn};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

/// Google Generative Language API (`generateContent`).
pub struct GeminiProvider {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            api_key: require_key(&config)?,
            client: http_client(&config)?,
            config,
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/models/{}:{method}", self.config.base_url, self.config.model)
    }

    fn body(&self, prompt: &str, history: &[Turn], json_mode: bool) -> Value {
        let contents: Vec<Value> = chat_messages(prompt, history)
            .map(|(role, text)| {
                let role = match role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                json!({ "role": role, "parts": [{ "text": text }] })
            })
            .collect();
        let mut generation = json!({ "temperature": self.config.temperature });
        if json_mode {
            generation["responseMimeType"] = json!("application/json");
        }
        json!({ "contents": contents, "generationConfig": generation })
    }

    async fn post(&self, url: &str, body: &Value) -> Result<reqwest::Response, LlmError> {
        let resp = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(network)?;
        check_status(resp).await
    }
}

/// Concatenated text of the first candidate.
fn candidate_text(v: &Value) -> Option<String> {
    let parts = v
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    Some(
        parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect(),
    )
}

#[async_trait]
impl CompletionService for GeminiProvider {
    async fn generate_stream(
        &self,
        prompt: &str,
        history: &[Turn],
    ) -> Result<TextStream, LlmError> {
        let url = format!("{}?alt=sse", self.url("streamGenerateContent"));
        let resp = self.post(&url, &self.body(prompt, history, false)).await?;
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
                if let Some(err) = event.get("error") {
                    yield Err(LlmError::InvalidResponse(err.to_string()));
                    return;
                }
                if let Some(text) = candidate_text(&event).filter(|t| !t.is_empty()) {
                    yield Ok(text);
                }
            }
        };
        Ok(s.boxed())
    }

    async fn generate_json(&self, prompt: &str) -> Result<Value, LlmError> {
        let url = self.url("generateContent");
        let resp = self.post(&url, &self.body(prompt, &[], true)).await?;
        let v: Value = resp.json().await.map_err(network)?;
        let text = candidate_text(&v)
            .ok_or_else(|| LlmError::InvalidResponse("gemini response has no candidates".into()))?;
        json_from_text(&text)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
