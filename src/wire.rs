//! JSON envelopes exchanged with the control-plane daemon.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize)]
pub struct GetSamplingRulesRequest {
    #[serde(rename = "NextToken")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetSamplingRulesResponse {
    #[serde(rename = "SamplingRuleRecords", default)]
    pub sampling_rule_records: Vec<SamplingRuleRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingRuleRecord {
    #[serde(rename = "CreatedAt", default)]
    pub created_at: Option<f64>,
    #[serde(rename = "ModifiedAt", default)]
    pub modified_at: Option<f64>,
    #[serde(rename = "SamplingRule")]
    pub sampling_rule: SamplingRule,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingRule {
    #[serde(rename = "RuleName", default)]
    pub rule_name: Option<String>,
    #[serde(rename = "Priority", default)]
    pub priority: i32,
    #[serde(rename = "FixedRate", default)]
    pub fixed_rate: f64,
    #[serde(rename = "ReservoirSize", default)]
    pub reservoir_size: u64,
    #[serde(rename = "HTTPMethod", default)]
    pub http_method: String,
    #[serde(rename = "URLPath", default)]
    pub url_path: String,
    #[serde(rename = "Host", default)]
    pub host: String,
    #[serde(rename = "ServiceName", default)]
    pub service_name: String,
    #[serde(rename = "ServiceType", default)]
    pub service_type: String,
    #[serde(rename = "ResourceARN", default)]
    pub resource_arn: String,
    #[serde(rename = "RuleARN", default)]
    pub rule_arn: Option<String>,
    #[serde(rename = "Version", default)]
    pub version: i32,
    #[serde(rename = "Attributes", default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SamplingStatisticsDocument {
    #[serde(rename = "ClientID")]
    pub client_id: String,
    #[serde(rename = "RuleName")]
    pub rule_name: String,
    #[serde(rename = "RequestCount")]
    pub request_count: u64,
    #[serde(rename = "SampledCount")]
    pub sampled_count: u64,
    #[serde(rename = "BorrowCount")]
    pub borrow_count: u64,
    #[serde(rename = "Timestamp")]
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetSamplingTargetsRequest {
    #[serde(rename = "SamplingStatisticsDocuments")]
    pub sampling_statistics_documents: Vec<SamplingStatisticsDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetSamplingTargetsResponse {
    #[serde(rename = "LastRuleModification", default)]
    pub last_rule_modification: f64,
    #[serde(rename = "SamplingTargetDocuments", default)]
    pub sampling_target_documents: Vec<SamplingTargetDocument>,
    #[serde(rename = "UnprocessedStatistics", default)]
    pub unprocessed_statistics: Vec<UnprocessedStatistics>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingTargetDocument {
    #[serde(rename = "RuleName", default)]
    pub rule_name: Option<String>,
    #[serde(rename = "FixedRate", default)]
    pub fixed_rate: Option<f64>,
    #[serde(rename = "ReservoirQuota", default)]
    pub reservoir_quota: Option<u64>,
    #[serde(rename = "ReservoirQuotaTTL", default)]
    pub reservoir_quota_ttl: Option<f64>,
    #[serde(rename = "Interval", default)]
    pub interval: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnprocessedStatistics {
    #[serde(rename = "RuleName", default)]
    pub rule_name: Option<String>,
    #[serde(rename = "ErrorCode", default)]
    pub error_code: Option<String>,
    #[serde(rename = "Message", default)]
    pub message: Option<String>,
}
