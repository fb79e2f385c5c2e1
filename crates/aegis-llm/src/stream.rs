//! Line framing for streaming HTTP bodies (SSE and NDJSON).

use crate::LlmError;
use async_stream::stream;
use futures::stream::BoxStream;
use futures::StreamExt;

/// Split a response body into complete lines, without the trailing `\r\n`.
///
/// Bytes are buffered until a newline so multi-byte characters split across
/// network chunks decode correctly.
pub(crate) fn lines(resp: reqwest::Response) -> BoxStream<'static, Result<String, LlmError>> {
    let mut body = resp.bytes_stream();
    let s = stream! {
        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(LlmError::Network(e.to_string()));
                    return;
                }
            };
            buf.extend_from_slice(&chunk);
            while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                yield Ok(decode_line(&line));
            }
        }
        if !buf.is_empty() {
            yield Ok(decode_line(&buf));
        }
    };
    s.boxed()
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}

/// Payload of an SSE `data:` line; `None` for comments, event names, blanks.
pub(crate) fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Map a non-success status to an error, consuming the body for context.
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status.as_u16() == 429 {
        let header = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok());
        return Err(LlmError::RateLimited {
            retry_after_ms: retry_after_ms(header),
        });
    }
    let body = resp.text().await.unwrap_or_default();
    Err(LlmError::Api {
        status: status.as_u16(),
        body: crate::json::preview(&body, 500),
    })
}

/// `Retry-After` in whole seconds as milliseconds; one second when absent or
/// not a number (HTTP-date values included).
fn retry_after_ms(header: Option<&str>) -> u64 {
    header
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs.saturating_mul(1000))
        .unwrap_or(1000)
}

pub(crate) fn network(e: reqwest::Error) -> LlmError {
    LlmError::Network(e.to_string())
}
