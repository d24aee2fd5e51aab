use std::path::PathBuf;

use clap::Parser;
use loadgen_common::config::HarnessConfig;
use loadgen_common::Endpoint;
use loadgen_core::{run_load, Outcome, Summary};
use opentelemetry_otlp::WithExportConfig;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "loadgen", version, about = "Send concurrent streaming requests to an OpenAI-compatible server")]
struct Cli {
    /// Base URL [default: http://localhost:8000]
    #[arg(long)]
    base_url: Option<String>,
    /// Optional model name; omitted from the request body when unset
    #[arg(long)]
    model: Option<String>,
    /// Number of concurrent requests [default: 10]
    #[arg(short, long)]
    concurrency: Option<usize>,
    /// Max tokens [default: 2048]
    #[arg(long)]
    max_tokens: Option<u32>,
    /// Sampling temperature [default: 0.2]
    #[arg(long)]
    temperature: Option<f64>,
    /// Per-request timeout in seconds [default: 120]
    #[arg(long)]
    timeout: Option<u64>,
    /// Optional API key, sent as a bearer token
    #[arg(long)]
    api_key: Option<String>,
    /// Use /v1/completions instead of chat
    #[arg(long)]
    completions: bool,
    /// Enable decoder debug output (forces `decoder=debug` whatever RUST_LOG says)
    #[arg(long)]
    debug: bool,
    /// Print Prometheus metrics after the summary
    #[arg(long)]
    metrics: bool,
    /// YAML config file (overrides LOADGEN_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn resolve(self) -> anyhow::Result<HarnessConfig> {
        let mut cfg = match &self.config {
            Some(path) => HarnessConfig::from_file(path)?,
            None => HarnessConfig::load()?,
        };
        if let Some(v) = self.base_url { cfg.base_url = v; }
        if let Some(v) = self.model { cfg.model = Some(v); }
        if let Some(v) = self.concurrency { cfg.concurrency = v; }
        if let Some(v) = self.max_tokens { cfg.max_tokens = v; }
        if let Some(v) = self.temperature { cfg.temperature = v; }
        if let Some(v) = self.timeout { cfg.timeout_secs = v; }
        if let Some(v) = self.api_key { cfg.api_key = Some(v); }
        if self.completions { cfg.endpoint = Endpoint::Completion; }
        if self.debug { cfg.debug = true; }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    let print_metrics = cli.metrics;
    let cfg = cli.resolve().map_err(|err| {
        tracing::error!(target: "cli", "{:#}", err);
        err
    })?;

    loadgen_obs::init();
    println!("Sending {} concurrent requests to {}", cfg.concurrency, cfg.url());
    match &cfg.model {
        Some(model) => println!("Including model field: {}", model),
        None => println!("Omitting model field (server default)"),
    }
    println!();

    let report = run_load(&cfg, |outcome| {
        loadgen_obs::observe(outcome.success, outcome.latency_secs(), outcome.estimated_tokens);
        print_outcome(outcome);
    })
    .await?;

    print_summary(&report.summary);
    if print_metrics {
        println!();
        print!("{}", loadgen_obs::render());
    }
    Ok(())
}

fn print_outcome(outcome: &Outcome) {
    match &outcome.error {
        None => println!("[{}] HTTP 200 {:.2}s  {}", outcome.index, outcome.latency_secs(), outcome.preview),
        Some(kind) => println!("[{}] ERROR {:.2}s ({})", outcome.index, outcome.latency_secs(), kind),
    }
}

fn print_summary(summary: &Summary) {
    let rule = "=".repeat(60);
    println!();
    println!("{}", rule);
    println!("SUMMARY");
    println!("{}", rule);
    println!("Total time:           {:.2}s", summary.total_wall_time.as_secs_f64());
    println!("Successful responses: {}", summary.success_count);
    println!("Error responses:      {}", summary.error_count);
    if summary.total() > 0 {
        println!("Shortest latency:     {:.2}s", summary.min_latency);
        println!("Longest latency:      {:.2}s", summary.max_latency);
        println!("Average latency:      {:.2}s", summary.mean_latency);
    }
    println!("Total tokens:         ~{} (estimated)", summary.total_estimated_tokens);
    println!("Requests/s:           {:.2}", summary.requests_per_second());
    println!("Tokens/s:             {:.2}", summary.tokens_per_second());
    println!("{}", rule);
}

fn env_filter(debug: bool, rust_log: Option<String>) -> tracing_subscriber::EnvFilter {
    let default_level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::new(rust_log.unwrap_or_else(|| default_level.into()));
    if !debug {
        return filter;
    }
    match "decoder=debug".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

fn init_tracing(debug: bool) {
    let env_filter = env_filter(debug, std::env::var("RUST_LOG").ok());
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic().with_endpoint(endpoint))
            .install_simple()
            .ok();
        if let Some(tracer) = tracer {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .with(OpenTelemetryLayer::new(tracer))
                .init();
            return;
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
