//! Small demo binary: starts the centralized strategy against a local rule
//! file and classifies a handful of synthetic requests, logging the result.

use std::process::ExitCode;

use clap::Parser;
use sampling_engine::config::SamplingArgs;
use sampling_engine::{CentralizedStrategy, LocalManifest, Request, SamplingConfig};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = SamplingConfig::from_args(SamplingArgs::parse());

    let local = match &config.rule_file_path {
        Some(path) => match sampling_engine::loader::load_from_path(path) {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::error!(error = %e, path = ?path, "failed loading local rule file");
                return ExitCode::FAILURE;
            }
        },
        None => LocalManifest::new(vec![], 1, 0.05),
    };

    let strategy = match CentralizedStrategy::new(&config, local) {
        Ok(strategy) => strategy,
        Err(e) => {
            tracing::error!(error = %e, "failed constructing sampling engine");
            return ExitCode::FAILURE;
        }
    };

    let sample_requests = [
        Request::new()
            .with_host("www.example.com")
            .with_method("GET")
            .with_url_path("/api/orders"),
        Request::new()
            .with_host("www.example.com")
            .with_method("POST")
            .with_url_path("/checkout"),
        Request::new(),
    ];

    for req in sample_requests {
        let decision = strategy.should_trace(req.clone());
        tracing::info!(
            host = %req.host,
            url_path = %req.url_path,
            sample = decision.sample,
            rule = ?decision.rule_name,
            "sampling decision"
        );
    }

    ExitCode::SUCCESS
}
