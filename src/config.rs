//! Process-wide engine configuration: daemon endpoint override, local
//! rule-file path, and the default service-type ("origin") stamped onto
//! requests that don't carry one.
//!
//! Precedence, lowest to highest: compiled-in defaults, a caller-built
//! [`SamplingConfig`], environment variables (read via `clap`'s `env`
//! attribute so the engine honors the same convention as the rest of the
//! host application), then explicit setter calls such as
//! `CentralizedStrategy::load_daemon_endpoints`.

use std::path::PathBuf;

use clap::Parser;

/// Settings assembled once, at engine construction time.
#[derive(Debug, Clone)]
pub struct SamplingConfig {
    /// Overrides the compiled-in daemon address (`127.0.0.1:2000`).
    /// `AWS_XRAY_DAEMON_ADDRESS`, if set, wins over this at resolution time.
    pub daemon_address: Option<String>,
    /// Path to the local (file-based) fallback rule manifest.
    pub rule_file_path: Option<PathBuf>,
    /// Default `service_type` stamped onto requests that arrive with an
    /// empty one.
    pub origin: String,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            daemon_address: None,
            rule_file_path: None,
            origin: String::new(),
        }
    }
}

impl SamplingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_daemon_address(mut self, address: impl Into<String>) -> Self {
        self.daemon_address = Some(address.into());
        self
    }

    pub fn with_rule_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.rule_file_path = Some(path.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Builds from [`SamplingArgs`], the environment-aware CLI layer.
    pub fn from_args(args: SamplingArgs) -> Self {
        Self {
            daemon_address: args.daemon_address,
            rule_file_path: args.rule_file_path,
            origin: args.origin.unwrap_or_default(),
        }
    }

    /// Parses `SamplingArgs` from the process environment and arguments,
    /// then converts into a `SamplingConfig`. Intended for binaries that
    /// embed the engine directly; libraries should prefer constructing
    /// `SamplingConfig` explicitly and layering environment lookups
    /// themselves.
    pub fn from_env() -> Self {
        Self::from_args(SamplingArgs::parse())
    }
}

/// `clap`-derived argument/environment layer. Every field also reads from
/// an environment variable of the same name, so the engine can be
/// configured without command-line flags in daemonized deployments.
#[derive(Debug, Parser)]
#[command(name = "sampling-engine", about = "Centralized sampling engine configuration")]
pub struct SamplingArgs {
    /// Overrides the compiled-in X-Ray daemon address.
    #[arg(long, env = "AWS_XRAY_DAEMON_ADDRESS")]
    pub daemon_address: Option<String>,

    /// Path to the local fallback sampling rule file.
    #[arg(long, env = "SAMPLING_RULE_FILE")]
    pub rule_file_path: Option<PathBuf>,

    /// Default service_type stamped onto requests with none supplied.
    #[arg(long, env = "SAMPLING_ORIGIN")]
    pub origin: Option<String>,
}
