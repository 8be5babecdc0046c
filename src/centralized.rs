//! Owns the control-plane-backed manifest, the two background pollers, and
//! the local fallback; serves `ShouldTrace` to the embedding SDK.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::client::{HttpSamplingClient, SamplingClient};
use crate::clock::{Clock, Rand, SystemClock, ThreadRand};
use crate::config::SamplingConfig;
use crate::daemon::{self, DaemonEndpoints};
use crate::error::{SamplingError, SamplingResult};
use crate::localized::{LocalManifest, LocalizedStrategy};
use crate::manifest::Manifest;
use crate::request::{Decision, Request};
use crate::rule::CentralRuleFields;
use crate::wire::{SamplingRuleRecord, SamplingStatisticsDocument, SamplingTargetDocument};

const RULE_POLL_INTERVAL_SECS: i64 = 300;
const RULE_POLL_JITTER_SECS: i64 = 5;
const TARGET_POLL_INTERVAL_MS: i64 = 10_100;
const TARGET_POLL_JITTER_MS: i64 = 100;

/// The centralized sampling strategy: a manifest kept fresh by two
/// background pollers, falling back to a [`LocalizedStrategy`] when the
/// manifest is expired or has never been populated.
pub struct CentralizedStrategy {
    manifest: RwLock<Manifest>,
    local: LocalizedStrategy,
    client: RwLock<Arc<dyn SamplingClient>>,
    clock: Box<dyn Clock>,
    rand: Box<dyn Rand>,
    origin: String,
    client_id: String,
    started: AtomicBool,
    auto_start_pollers: bool,
}

impl CentralizedStrategy {
    /// Production constructor: resolves the daemon address from
    /// `config` (environment overrides win, per [`daemon::resolve`]) and
    /// wires up the real HTTP client and pollers.
    pub fn new(config: &SamplingConfig, local: LocalManifest) -> SamplingResult<Arc<Self>> {
        let endpoints = daemon::resolve(config.daemon_address.as_deref())?;
        let client = HttpSamplingClient::new(endpoints)?;
        Ok(Arc::new(Self {
            manifest: RwLock::new(Manifest::new()),
            local: LocalizedStrategy::new(local),
            client: RwLock::new(Arc::new(client)),
            clock: Box::new(SystemClock),
            rand: Box::new(ThreadRand),
            origin: config.origin.clone(),
            client_id: generate_client_id(),
            started: AtomicBool::new(false),
            auto_start_pollers: true,
        }))
    }

    /// Swaps the control-plane address the pollers will connect to. Only
    /// takes effect if the pollers have not yet started; afterwards the
    /// call is logged and ignored (the pollers captured their client at
    /// start time).
    pub fn load_daemon_endpoints(&self, endpoints: DaemonEndpoints) -> SamplingResult<()> {
        if self.started.load(Ordering::SeqCst) {
            tracing::warn!(
                tcp = %endpoints.tcp,
                "daemon endpoint change ignored: pollers already started"
            );
            return Ok(());
        }
        let client = HttpSamplingClient::new(endpoints)?;
        *self.client.write() = Arc::new(client);
        tracing::info!(tcp = %endpoints.tcp, "daemon endpoint updated");
        Ok(())
    }

    /// Classifies one request. Infallible: always returns a [`Decision`].
    /// Lazily starts the background pollers on first call.
    pub fn should_trace(self: &Arc<Self>, mut req: Request) -> Decision {
        self.ensure_started();

        if req.service_type.is_empty() {
            req.service_type = self.origin.clone();
        }

        let now = self.clock.now_secs();
        {
            let manifest = self.manifest.read();
            if !manifest.expired(now) {
                for rule in manifest.rules() {
                    if rule.applies_to(&req) {
                        return rule.sample(now, &*self.rand);
                    }
                }
                if let Some(default_rule) = manifest.default_rule() {
                    return default_rule.sample(now, &*self.rand);
                }
            } else {
                tracing::trace!("manifest expired, falling back to local strategy");
            }
        }

        self.local.should_trace(&req)
    }

    fn ensure_started(self: &Arc<Self>) {
        if !self.auto_start_pollers {
            return;
        }
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            tracing::info!("starting sampling pollers");
            let rule_strategy = self.clone();
            tokio::spawn(async move { rule_strategy.run_rule_poller().await });
            let target_strategy = self.clone();
            tokio::spawn(async move { target_strategy.run_target_poller().await });
        }
    }

    async fn run_rule_poller(self: Arc<Self>) {
        self.poll_rules_once().await;
        loop {
            let jitter = self.rand.int63n(2 * RULE_POLL_JITTER_SECS + 1) - RULE_POLL_JITTER_SECS;
            let secs = (RULE_POLL_INTERVAL_SECS + jitter).max(0) as u64;
            tokio::time::sleep(Duration::from_secs(secs)).await;
            self.poll_rules_once().await;
        }
    }

    async fn run_target_poller(self: Arc<Self>) {
        loop {
            let jitter = self.rand.int63n(2 * TARGET_POLL_JITTER_MS + 1) - TARGET_POLL_JITTER_MS;
            let ms = (TARGET_POLL_INTERVAL_MS + jitter).max(0) as u64;
            tokio::time::sleep(Duration::from_millis(ms)).await;
            self.poll_targets_once().await;
        }
    }

    /// One rule-refresh cycle: fetch, validate, put, prune, sort.
    async fn poll_rules_once(&self) {
        let now = self.clock.now_secs();
        let client = self.client.read().clone();
        match client.get_sampling_rules().await {
            Ok(resp) => self.apply_rule_records(now, resp.sampling_rule_records),
            Err(e) => tracing::warn!(error = %e, "rule poll transport failure"),
        }
    }

    fn apply_rule_records(&self, now: i64, records: Vec<SamplingRuleRecord>) {
        let total = records.len();
        let mut rejected = 0usize;
        let mut active = HashSet::new();

        let mut manifest = self.manifest.write();
        for record in records {
            match validate_rule_record(&record) {
                Ok(fields) => {
                    let name = fields.rule_name.clone();
                    match manifest.put(fields) {
                        Ok(_) => {
                            active.insert(name);
                        }
                        Err(e) => {
                            rejected += 1;
                            tracing::warn!(rule_name = %name, error = %e, "rule rejected");
                        }
                    }
                }
                Err(reason) => {
                    rejected += 1;
                    tracing::warn!(error = %reason, "rule record failed validation");
                }
            }
        }
        manifest.prune(&active);
        manifest.sort();
        manifest.set_refreshed_at(now);
        drop(manifest);

        if rejected > 0 {
            let err = SamplingError::PartialApply {
                total,
                rejected,
                summary: format!("{rejected} of {total} rule records rejected during refresh"),
            };
            tracing::warn!(error = %err, "rule poll completed with rejected records");
        } else {
            tracing::debug!(total, "rule poll succeeded");
        }
    }

    /// One target-refresh cycle: snapshot, send, apply, maybe refresh rules.
    async fn poll_targets_once(self: &Arc<Self>) {
        let now = self.clock.now_secs();
        let documents = self.collect_statistics(now);
        if documents.is_empty() {
            tracing::debug!("no statistics to report, skipping target poll");
            return;
        }

        let client = self.client.read().clone();
        match client.get_sampling_targets(documents).await {
            Ok(resp) => self.apply_target_response(now, resp).await,
            Err(e) => tracing::warn!(error = %e, "target poll transport failure"),
        }
    }

    async fn apply_target_response(
        self: &Arc<Self>,
        now: i64,
        resp: crate::wire::GetSamplingTargetsResponse,
    ) {
        let mut needs_refresh = resp.last_rule_modification as i64 >= self.manifest.read().refreshed_at();

        for doc in resp.sampling_target_documents {
            if let Err(reason) = self.apply_target_document(doc, now) {
                tracing::warn!(error = %reason, "failed applying sampling target");
            }
        }

        for unprocessed in resp.unprocessed_statistics {
            let Some(code) = unprocessed.error_code.as_deref() else {
                continue;
            };
            if code.starts_with('5') {
                tracing::error!(
                    rule_name = ?unprocessed.rule_name,
                    code,
                    "target batch failure"
                );
            } else if code.starts_with('4') {
                tracing::warn!(
                    rule_name = ?unprocessed.rule_name,
                    code,
                    "target rejected, rule refresh needed"
                );
                needs_refresh = true;
            }
        }

        if needs_refresh {
            let strategy = self.clone();
            tokio::spawn(async move { strategy.poll_rules_once().await });
        }
    }

    fn apply_target_document(&self, doc: SamplingTargetDocument, now: i64) -> Result<(), String> {
        let rule_name = doc.rule_name.ok_or_else(|| "target missing RuleName".to_string())?;
        let rate = doc
            .fixed_rate
            .ok_or_else(|| format!("target for {rule_name} missing FixedRate"))?;
        let manifest = self.manifest.read();
        let rule = manifest
            .get(&rule_name)
            .ok_or_else(|| format!("target for unknown rule {rule_name}"))?;
        rule.apply_target(
            now,
            rate,
            doc.reservoir_quota,
            doc.reservoir_quota_ttl.map(|ttl| ttl as i64),
            doc.interval,
        );
        Ok(())
    }

    fn collect_statistics(&self, now: i64) -> Vec<SamplingStatisticsDocument> {
        let manifest = self.manifest.read();
        manifest
            .rules()
            .iter()
            .chain(manifest.default_rule())
            .filter_map(|rule| {
                rule.snapshot(now).map(|snap| SamplingStatisticsDocument {
                    client_id: self.client_id.clone(),
                    rule_name: rule.rule_name.clone(),
                    request_count: snap.requests,
                    sampled_count: snap.sampled,
                    borrow_count: snap.borrows,
                    timestamp: now,
                })
            })
            .collect()
    }
}

fn validate_rule_record(record: &SamplingRuleRecord) -> Result<CentralRuleFields, String> {
    let rule = &record.sampling_rule;
    let rule_name = rule
        .rule_name
        .clone()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| "record missing RuleName".to_string())?;
    if rule.version != 1 {
        return Err(format!("rule {rule_name} has unsupported version {}", rule.version));
    }
    if !rule.attributes.is_empty() {
        return Err(format!("rule {rule_name} has non-empty attributes"));
    }
    if rule.resource_arn != "*" {
        return Err(format!("rule {rule_name} has non-wildcard ResourceARN"));
    }

    Ok(CentralRuleFields {
        rule_name,
        priority: rule.priority,
        host: rule.host.clone(),
        http_method: rule.http_method.clone(),
        url_path: rule.url_path.clone(),
        service_name: rule.service_name.clone(),
        service_type: rule.service_type.clone(),
        resource_arn: rule.resource_arn.clone(),
        attributes: rule.attributes.clone(),
        fixed_target: rule.reservoir_size,
        rate: rule.fixed_rate,
    })
}

fn generate_client_id() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
