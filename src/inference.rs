use std::time::Duration;

use futures_util::{TryStream, TryStreamExt};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Failure of a single generation turn. `Display` is the text shown in the chat.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// Transport fault: refused, DNS, timeout, broken body.
    #[error("{0}")]
    Request(String),
    #[error("Could not connect to LLM")]
    ConnectionFailed(StatusCode),
    #[error("No valid response")]
    EmptyResponse,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// One line of the streamed body. Only `response` is read; `done` is ignored.
#[derive(Deserialize)]
struct GenerateFragment {
    #[serde(default)]
    response: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<TagsModel>,
}

#[derive(Deserialize)]
struct TagsModel {
    name: String,
}

/// Client for the Ollama HTTP API.
#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    generate_url: String,
    tags_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {e}");
                reqwest::Client::new()
            });

        Self {
            client,
            generate_url: config.generate_url(),
            tags_url: config.tags_url(),
            model: config.model.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one prompt and concatenate the streamed `response` fragments.
    pub async fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        log::info!("Generating with {} ({} chars)", self.model, prompt.len());

        let resp = self
            .client
            .post(&self.generate_url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
            })
            .send()
            .await
            .map_err(|e| InferenceError::Request(e.to_string()))?;

        let status = resp.status();
        if status != StatusCode::OK {
            log::warn!("Generate request returned {status}");
            return Err(InferenceError::ConnectionFailed(status));
        }

        let text = collect_response(resp.bytes_stream()).await?;
        if text.is_empty() {
            return Err(InferenceError::EmptyResponse);
        }

        log::info!("Received {} chars", text.len());
        Ok(text)
    }

    /// Names of the models the server has pulled.
    pub async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        let resp = self
            .client
            .get(&self.tags_url)
            .send()
            .await
            .map_err(|e| InferenceError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(InferenceError::ConnectionFailed(resp.status()));
        }

        let tags: TagsResponse = resp
            .json()
            .await
            .map_err(|e| InferenceError::Request(e.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

/// Fold a chunked body into the concatenated `response` text.
///
/// Chunks are re-split on `\n`, so a JSON line may span several chunks. Lines that
/// do not decode are logged and skipped. A transport error aborts the fold.
pub async fn collect_response<S>(stream: S) -> Result<String, InferenceError>
where
    S: TryStream,
    S::Ok: AsRef<[u8]>,
    S::Error: std::fmt::Display,
{
    let (lines, mut text) = stream
        .map_err(|e| InferenceError::Request(e.to_string()))
        .try_fold(
            (LineBuffer::default(), String::new()),
            |(mut lines, mut text), chunk| async move {
                for line in lines.push(chunk.as_ref()) {
                    append_fragment(&mut text, &line);
                }
                Ok((lines, text))
            },
        )
        .await?;

    // The last line may arrive without a newline before the stream closes.
    if let Some(rest) = lines.finish() {
        append_fragment(&mut text, &rest);
    }
    Ok(text)
}

fn append_fragment(text: &mut String, line: &[u8]) {
    if line.iter().all(u8::is_ascii_whitespace) {
        return;
    }
    match serde_json::from_slice::<GenerateFragment>(line) {
        Ok(fragment) => text.push_str(fragment.response.as_deref().unwrap_or_default()),
        Err(e) => log::warn!("Skipping malformed stream chunk: {e}"),
    }
}

/// Accumulates raw bytes and hands out complete `\n`-terminated lines.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }

    fn finish(self) -> Option<Vec<u8>> {
        (!self.pending.is_empty()).then_some(self.pending)
    }
}

/// Runs generation to completion on the calling thread.
///
/// The chat window calls this from the GTK main loop, which stalls the UI until
/// the server closes the stream.
pub struct BlockingClient {
    client: OllamaClient,
    runtime: tokio::runtime::Handle,
}

impl BlockingClient {
    pub fn new(client: OllamaClient, runtime: tokio::runtime::Handle) -> Self {
        Self { client, runtime }
    }

    pub fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        self.runtime.block_on(self.client.generate(prompt))
    }
}
