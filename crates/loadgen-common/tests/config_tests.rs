use loadgen_common::config::HarnessConfig;
use loadgen_common::{prompts, Endpoint, LoadgenError};

#[test]
fn defaults_are_valid() {
    let cfg = HarnessConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.concurrency, 10);
    assert_eq!(cfg.url(), "http://localhost:8000/v1/chat/completions");
    assert_eq!(cfg.prompts.len(), prompts::DEFAULT_PROMPTS.len());
}

#[test]
fn zero_concurrency_is_fatal() {
    let cfg = HarnessConfig { concurrency: 0, ..HarnessConfig::default() };
    assert!(matches!(cfg.validate(), Err(LoadgenError::InvalidConfig(_))));
}

#[test]
fn empty_prompts_and_bad_url_are_fatal() {
    let cfg = HarnessConfig { prompts: Vec::new(), ..HarnessConfig::default() };
    assert!(cfg.validate().is_err());
    let cfg = HarnessConfig { base_url: "localhost:8000".into(), ..HarnessConfig::default() };
    assert!(cfg.validate().is_err());
}

#[test]
fn yaml_overrides_only_given_fields() {
    let cfg = HarnessConfig::from_yaml(
        "base_url: http://gpu-box:9000/\nendpoint: completion\nconcurrency: 3\nprompts:\n  - one\n  - two\n",
    )
    .unwrap();
    assert_eq!(cfg.endpoint, Endpoint::Completion);
    assert_eq!(cfg.concurrency, 3);
    assert_eq!(cfg.max_tokens, 2048);
    assert_eq!(cfg.url(), "http://gpu-box:9000/v1/completions");
    assert_eq!(prompts::select(&cfg.prompts, 5), "two");
}

#[test]
fn invalid_yaml_and_missing_file_are_errors() {
    assert!(matches!(HarnessConfig::from_yaml("concurrency: [1"), Err(LoadgenError::ConfigParse(_))));
    assert!(matches!(
        HarnessConfig::from_file("/nonexistent/loadgen.yaml"),
        Err(LoadgenError::ConfigFile { .. })
    ));
}

#[test]
fn empty_api_key_counts_as_absent() {
    let cfg = HarnessConfig { api_key: Some(String::new()), ..HarnessConfig::default() };
    assert_eq!(cfg.api_key(), None);
    let cfg = HarnessConfig { api_key: Some("k".into()), ..HarnessConfig::default() };
    assert_eq!(cfg.api_key(), Some("k"));
}

#[test]
fn endpoint_url_joins_base_and_path() {
    assert_eq!(Endpoint::Chat.url("http://h:1"), "http://h:1/v1/chat/completions");
    assert_eq!(Endpoint::Completion.url("http://h:1//"), "http://h:1/v1/completions");
    let cfg = HarnessConfig { base_url: "http://h:1/".into(), ..HarnessConfig::default() };
    assert_eq!(cfg.url(), Endpoint::Chat.url("http://h:1"));
}
