//! Loads the local (file-based) fallback manifest: a small JSON schema with
//! `version`, `default`, and `rules`, in two supported schema versions.

use serde::Deserialize;

use crate::error::{SamplingError, SamplingResult};
use crate::localized::LocalManifest;
use crate::request::Properties;
use crate::rule::LocalRule;

#[derive(Debug, Deserialize)]
struct RuleFile {
    version: i32,
    default: DefaultRecord,
    #[serde(default)]
    rules: Vec<RuleRecord>,
}

#[derive(Debug, Deserialize)]
struct DefaultRecord {
    fixed_target: i64,
    rate: f64,
}

#[derive(Debug, Default, Deserialize)]
struct RuleRecord {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    service_name: Option<String>,
    #[serde(default)]
    http_method: String,
    #[serde(default)]
    url_path: String,
    fixed_target: i64,
    rate: f64,
}

/// Parses and validates a local rule file's JSON text into a
/// [`LocalManifest`]. Supported schema versions are 1 (predicate keyed on
/// `service_name`) and 2 (predicate keyed on `host`); version 1 records are
/// normalized into the version-2 shape (`host` populated, `service_name`
/// cleared) so downstream matching is uniform.
pub fn load_from_str(text: &str) -> SamplingResult<LocalManifest> {
    let file: RuleFile = serde_json::from_str(text)
        .map_err(|e| SamplingError::configuration(format!("parsing rule file: {e}")))?;

    if file.default.fixed_target < 0 || file.default.rate < 0.0 {
        return Err(SamplingError::configuration(
            "default rule must have non-negative fixed_target and rate",
        ));
    }

    let mut rules = Vec::with_capacity(file.rules.len());
    for (i, record) in file.rules.into_iter().enumerate() {
        rules.push(
            normalize(file.version, record)
                .map_err(|e| SamplingError::configuration(format!("rule[{i}]: {e}")))?,
        );
    }

    Ok(LocalManifest::new(
        rules,
        file.default.fixed_target as u64,
        file.default.rate,
    ))
}

pub fn load_from_path(path: &std::path::Path) -> SamplingResult<LocalManifest> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| SamplingError::configuration(format!("reading rule file {path:?}: {e}")))?;
    load_from_str(&text)
}

fn normalize(version: i32, record: RuleRecord) -> Result<LocalRule, String> {
    if record.fixed_target < 0 {
        return Err("fixed_target must be non-negative".to_string());
    }
    if record.rate < 0.0 {
        return Err("rate must be non-negative".to_string());
    }
    if record.http_method.is_empty() {
        return Err("http_method must be non-empty".to_string());
    }
    if record.url_path.is_empty() {
        return Err("url_path must be non-empty".to_string());
    }

    let host = match version {
        1 => {
            let service_name = record.service_name.unwrap_or_default();
            if service_name.is_empty() {
                return Err("version 1 rule requires service_name".to_string());
            }
            if record.host.is_some_and(|h| !h.is_empty()) {
                return Err("version 1 rule must not set host".to_string());
            }
            service_name
        }
        2 => {
            let host = record.host.unwrap_or_default();
            if host.is_empty() {
                return Err("version 2 rule requires host".to_string());
            }
            if record.service_name.is_some_and(|s| !s.is_empty()) {
                return Err("version 2 rule must not set service_name".to_string());
            }
            host
        }
        other => return Err(format!("unsupported rule file version {other}")),
    };

    Ok(LocalRule::new(Properties {
        host,
        http_method: record.http_method,
        url_path: record.url_path,
        service_name: String::new(),
        fixed_target: record.fixed_target as u64,
        rate: record.rate,
    }))
}
