//! Streaming load generation: SSE decoding, per-request runners, fan-out and aggregation.

pub mod aggregate;
pub mod decoder;
pub mod dispatch;
pub mod outcome;
pub mod runner;

use std::time::Instant;

use loadgen_common::config::HarnessConfig;
use loadgen_common::{LoadgenError, Result};

pub use aggregate::Summary;
pub use decoder::{DecoderState, LineBuffer, StreamDecoder};
pub use dispatch::Dispatcher;
pub use outcome::{ErrorKind, Outcome};
pub use runner::RequestSpec;

pub struct LoadReport {
    pub outcomes: Vec<Outcome>,
    pub summary: Summary,
}

/// Validates `cfg`, fires `cfg.concurrency` streaming requests and summarises them.
pub async fn run_load<O>(cfg: &HarnessConfig, on_outcome: O) -> Result<LoadReport>
where
    O: FnMut(&Outcome),
{
    cfg.validate()?;
    let dispatcher = Dispatcher::new(cfg.concurrency)?;
    let client = runner::build_client().map_err(|e| LoadgenError::Message(format!("http client: {}", e)))?;

    let started = Instant::now();
    let outcomes = dispatcher
        .run(
            |index| {
                let client = client.clone();
                let spec = RequestSpec::from_config(cfg, index);
                async move { runner::run(&client, &spec).await }
            },
            on_outcome,
        )
        .await;
    let summary = Summary::from_outcomes(&outcomes, started.elapsed());
    Ok(LoadReport { outcomes, summary })
}
