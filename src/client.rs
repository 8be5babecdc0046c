//! The control-plane RPC surface: `GetSamplingRules` and `GetSamplingTargets`
//! against the local X-Ray daemon's TCP endpoint.

use std::time::Duration;

use async_trait::async_trait;

use crate::daemon::DaemonEndpoints;
use crate::error::{SamplingError, SamplingResult};
use crate::wire::{
    GetSamplingRulesRequest, GetSamplingRulesResponse, GetSamplingTargetsRequest,
    GetSamplingTargetsResponse, SamplingStatisticsDocument,
};

/// Two-method capability exposed by the control-plane daemon. Tests
/// substitute an in-memory implementation; production wraps `reqwest`.
#[async_trait]
pub trait SamplingClient: Send + Sync {
    async fn get_sampling_rules(&self) -> SamplingResult<GetSamplingRulesResponse>;

    async fn get_sampling_targets(
        &self,
        documents: Vec<SamplingStatisticsDocument>,
    ) -> SamplingResult<GetSamplingTargetsResponse>;
}

/// Default per-request timeout for control-plane calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Production client: HTTP POST to the daemon's TCP endpoint.
pub struct HttpSamplingClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSamplingClient {
    pub fn new(endpoints: DaemonEndpoints) -> SamplingResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SamplingError::configuration(format!("building HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: format!("http://{}", endpoints.tcp),
        })
    }
}

#[async_trait]
impl SamplingClient for HttpSamplingClient {
    async fn get_sampling_rules(&self) -> SamplingResult<GetSamplingRulesResponse> {
        let url = format!("{}/GetSamplingRules", self.base_url);
        let span = tracing::debug_span!("get_sampling_rules", url = %url);
        let _enter = span.enter();

        let response = self
            .http
            .post(&url)
            .json(&GetSamplingRulesRequest::default())
            .send()
            .await
            .map_err(|e| SamplingError::transport(format!("GetSamplingRules request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SamplingError::transport(format!(
                "GetSamplingRules returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SamplingError::transport(format!("GetSamplingRules decode failed: {e}")))
    }

    async fn get_sampling_targets(
        &self,
        documents: Vec<SamplingStatisticsDocument>,
    ) -> SamplingResult<GetSamplingTargetsResponse> {
        let url = format!("{}/SamplingTargets", self.base_url);
        let span = tracing::debug_span!("get_sampling_targets", url = %url, count = documents.len());
        let _enter = span.enter();

        let request = GetSamplingTargetsRequest {
            sampling_statistics_documents: documents,
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SamplingError::transport(format!("GetSamplingTargets request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SamplingError::transport(format!(
                "GetSamplingTargets returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SamplingError::transport(format!("GetSamplingTargets decode failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_sampling_rules_decodes_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/GetSamplingRules"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "SamplingRuleRecords": [{
                    "CreatedAt": 1500000000.0,
                    "ModifiedAt": 1500000000.0,
                    "SamplingRule": {
                        "RuleName": "r1",
                        "Priority": 1,
                        "FixedRate": 0.05,
                        "ReservoirSize": 10,
                        "HTTPMethod": "*",
                        "URLPath": "*",
                        "Host": "*",
                        "ServiceName": "*",
                        "ServiceType": "*",
                        "ResourceARN": "*",
                        "Version": 1,
                        "Attributes": {}
                    }
                }]
            })))
            .mount(&server)
            .await;

        let client = HttpSamplingClient {
            http: reqwest::Client::new(),
            base_url: server.uri(),
        };

        let resp = client.get_sampling_rules().await.unwrap();
        assert_eq!(resp.sampling_rule_records.len(), 1);
    }

    #[tokio::test]
    async fn non_200_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/GetSamplingRules"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = HttpSamplingClient {
            http: reqwest::Client::new(),
            base_url: server.uri(),
        };

        let err = client.get_sampling_rules().await.unwrap_err();
        assert!(matches!(err, SamplingError::Transport(_)));
    }

    #[tokio::test]
    async fn get_sampling_targets_posts_statistics() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/SamplingTargets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "LastRuleModification": 1500000000.0,
                "SamplingTargetDocuments": [],
                "UnprocessedStatistics": []
            })))
            .mount(&server)
            .await;

        let client = HttpSamplingClient {
            http: reqwest::Client::new(),
            base_url: server.uri(),
        };

        let doc = SamplingStatisticsDocument {
            client_id: "abcdef0123456789abcdef01".to_string(),
            rule_name: "r1".to_string(),
            request_count: 1,
            sampled_count: 1,
            borrow_count: 0,
            timestamp: 1_500_000_000,
        };
        let resp = client.get_sampling_targets(vec![doc]).await.unwrap();
        assert_eq!(resp.sampling_target_documents.len(), 0);
    }
}
