//! One simulated client: a single streaming POST driven through a [`StreamDecoder`].

use std::time::{Duration, Instant};

use loadgen_common::config::HarnessConfig;
use loadgen_common::{prompts, Endpoint};
use reqwest::StatusCode;
use serde::Serialize;
use tokio_stream::StreamExt as _;

use crate::decoder::{DecoderState, LineBuffer, StreamDecoder};
use crate::outcome::{ErrorKind, Outcome};

#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub index: usize,
    pub base_url: String,
    pub endpoint: Endpoint,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout: Duration,
    pub api_key: Option<String>,
    pub prompt: String,
    pub system_prompt: String,
    pub debug: bool,
}

impl RequestSpec {
    pub fn from_config(cfg: &HarnessConfig, index: usize) -> Self {
        Self {
            index,
            base_url: cfg.base_url.clone(),
            endpoint: cfg.endpoint,
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            timeout: Duration::from_secs(cfg.timeout_secs),
            api_key: cfg.api_key().map(str::to_string),
            prompt: prompts::select(&cfg.prompts, index).to_string(),
            system_prompt: cfg.system_prompt.clone(),
            debug: cfg.debug,
        }
    }

    pub fn url(&self) -> String {
        self.endpoint.url(&self.base_url)
    }

    pub fn body(&self) -> RequestBody<'_> {
        let model = self.model.as_deref();
        match self.endpoint {
            Endpoint::Chat => RequestBody::Chat(ChatBody {
                messages: [
                    ChatMessage { role: "system", content: &self.system_prompt },
                    ChatMessage { role: "user", content: &self.prompt },
                ],
                max_tokens: self.max_tokens,
                temperature: self.temperature,
                stream: true,
                model,
            }),
            Endpoint::Completion => RequestBody::Completion(CompletionBody {
                prompt: &self.prompt,
                max_tokens: self.max_tokens,
                temperature: self.temperature,
                stream: true,
                model,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RequestBody<'a> {
    Chat(ChatBody<'a>),
    Completion(CompletionBody<'a>),
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ChatBody<'a> {
    pub messages: [ChatMessage<'a>; 2],
    pub max_tokens: u32,
    pub temperature: f64,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct CompletionBody<'a> {
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: f64,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
}

/// Client shared by all runners. No transport timeout: each runner enforces its own.
pub fn build_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().build()
}

enum Exchange {
    Status { code: u16, latency: Duration },
    Streamed { state: DecoderState, latency: Duration },
    /// Headers arrived but reading the body failed.
    Interrupted(reqwest::Error),
}

/// Runs one request to completion. Every failure is folded into the returned [`Outcome`].
pub async fn run(client: &reqwest::Client, spec: &RequestSpec) -> Outcome {
    let start = Instant::now();
    let outcome = match tokio::time::timeout(spec.timeout, exchange(client, spec, start)).await {
        Ok(Ok(Exchange::Streamed { state, latency })) => Outcome::success(spec.index, latency, &state.text),
        Ok(Ok(Exchange::Status { code, latency })) => Outcome::failure(spec.index, latency, ErrorKind::HttpStatus(code)),
        Ok(Ok(Exchange::Interrupted(err))) => {
            tracing::debug!(target: "runner", index = spec.index, "body read failed: {}", err);
            let kind = if err.is_timeout() { ErrorKind::Timeout } else { ErrorKind::Transport("body") };
            Outcome::failure(spec.index, start.elapsed(), kind)
        }
        Ok(Err(err)) => {
            tracing::debug!(target: "runner", index = spec.index, "transport error: {}", err);
            Outcome::failure(spec.index, start.elapsed(), classify_error(&err))
        }
        Err(_) => Outcome::failure(spec.index, start.elapsed(), ErrorKind::Timeout),
    };
    match &outcome.error {
        None => tracing::debug!(
            target: "runner",
            index = outcome.index,
            latency = outcome.latency_secs(),
            tokens = outcome.estimated_tokens,
            "request completed"
        ),
        Some(kind) => tracing::debug!(
            target: "runner",
            index = outcome.index,
            latency = outcome.latency_secs(),
            error = %kind,
            "request failed"
        ),
    }
    outcome
}

async fn exchange(client: &reqwest::Client, spec: &RequestSpec, start: Instant) -> reqwest::Result<Exchange> {
    let mut request = client.post(spec.url()).json(&spec.body());
    if let Some(key) = spec.api_key.as_deref() {
        request = request.bearer_auth(key);
    }
    let response = request.send().await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Ok(Exchange::Status { code: status.as_u16(), latency: start.elapsed() });
    }

    let mut decoder = StreamDecoder::new(spec.endpoint).with_debug(spec.debug);
    let mut lines = LineBuffer::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => return Ok(Exchange::Interrupted(err)),
        };
        if !decoder.feed_lines(lines.push(&chunk)) { break; }
    }
    // connection closed without a sentinel
    if !decoder.is_finished() {
        if let Some(rest) = lines.finish() { decoder.feed_line(&rest); }
    }
    Ok(Exchange::Streamed { latency: start.elapsed(), state: decoder.finish() })
}

fn classify_error(err: &reqwest::Error) -> ErrorKind {
    if err.is_timeout() {
        return ErrorKind::Timeout;
    }
    let category = if err.is_connect() {
        "connect"
    } else if err.is_body() {
        "body"
    } else if err.is_decode() {
        "decode"
    } else if err.is_redirect() {
        "redirect"
    } else if err.is_builder() {
        "builder"
    } else if err.is_request() {
        "request"
    } else {
        "other"
    };
    ErrorKind::Transport(category)
}
