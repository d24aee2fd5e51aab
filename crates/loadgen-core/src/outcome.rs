use std::fmt;
use std::time::Duration;

use crate::decoder::truncate_chars;

const PREVIEW_CHARS: usize = 256;

/// Why a unit of work failed. Rendered as `http-status:503`, `timeout`, `transport-failure:connect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    HttpStatus(u16),
    Timeout,
    Transport(&'static str),
    /// The unit's task ended without reporting.
    TaskFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::HttpStatus(code) => write!(f, "http-status:{}", code),
            ErrorKind::Timeout => f.write_str("timeout"),
            ErrorKind::Transport(category) => write!(f, "transport-failure:{}", category),
            ErrorKind::TaskFailed => f.write_str("task-failed"),
        }
    }
}

/// Terminal result of one simulated client.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub index: usize,
    pub success: bool,
    pub latency: Duration,
    pub estimated_tokens: u64,
    pub text_length: usize,
    pub error: Option<ErrorKind>,
    pub preview: String,
}

impl Outcome {
    pub fn success(index: usize, latency: Duration, text: &str) -> Self {
        let text_length = text.chars().count();
        Self {
            index,
            success: true,
            latency,
            estimated_tokens: estimate_tokens(text_length),
            text_length,
            error: None,
            preview: preview(text),
        }
    }

    pub fn failure(index: usize, latency: Duration, kind: ErrorKind) -> Self {
        Self {
            index,
            success: false,
            latency,
            estimated_tokens: 0,
            text_length: 0,
            error: Some(kind),
            preview: String::new(),
        }
    }

    pub fn latency_secs(&self) -> f64 { self.latency.as_secs_f64() }
}

/// Rough 4-characters-per-token approximation.
pub fn estimate_tokens(text_length: usize) -> u64 {
    (text_length / 4) as u64
}

fn preview(text: &str) -> String {
    if text.is_empty() {
        return "(empty response)".into();
    }
    let flat = text.replace('\n', " ");
    truncate_chars(&flat, PREVIEW_CHARS).to_string()
}
