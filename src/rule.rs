//! Local and central rules: a match predicate plus a sampling policy.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::central_reservoir::CentralReservoir;
use crate::clock::Rand;
use crate::request::{Decision, Properties, Request};
use crate::reservoir::Reservoir;

/// A statically-configured rule served by [`crate::localized::LocalizedStrategy`].
/// Local rules are unnamed: the file format never assigns them an identity,
/// so a local match never produces a `rule_name` in the returned [`Decision`].
#[derive(Debug)]
pub struct LocalRule {
    pub properties: Properties,
    reservoir: Reservoir,
}

impl LocalRule {
    pub fn new(properties: Properties) -> Self {
        let reservoir = Reservoir::new(properties.fixed_target);
        Self {
            properties,
            reservoir,
        }
    }

    pub fn applies_to(&self, req: &Request) -> bool {
        self.properties.applies_to(req)
    }

    /// `Reservoir.Take()`, falling back to a bernoulli draw against the
    /// rule's rate.
    pub fn sample(&self, now: i64, rand: &dyn Rand) -> bool {
        if self.reservoir.take(now) {
            return true;
        }
        rand.float64() < self.properties.rate
    }
}

/// Mutable state guarded by a `CentralRule`'s single read/write lock:
/// properties are read under the read lock by `applies_to`; everything is
/// read-and-mutated under the write lock by `sample` and `snapshot`.
#[derive(Debug)]
struct CentralRuleInner {
    properties: Properties,
    priority: i32,
    service_type: String,
    resource_arn: String,
    attributes: BTreeMap<String, String>,
    reservoir: CentralReservoir,
    requests: u64,
    sampled: u64,
    borrows: u64,
    used_at: i64,
}

/// A control-plane-sourced sampling rule: a [`Properties`] predicate plus
/// identity, priority, a remotely-granted reservoir, and request counters.
#[derive(Debug)]
pub struct CentralRule {
    pub rule_name: String,
    inner: RwLock<CentralRuleInner>,
}

/// The name reserved for the manifest's no-predicate catch-all rule.
pub const DEFAULT_RULE_NAME: &str = "Default";

/// Fields needed to create or update a user-defined central rule. Mirrors
/// the subset of `SamplingRule` the manifest actually stores.
#[derive(Debug, Clone)]
pub struct CentralRuleFields {
    pub rule_name: String,
    pub priority: i32,
    pub host: String,
    pub http_method: String,
    pub url_path: String,
    pub service_name: String,
    pub service_type: String,
    pub resource_arn: String,
    pub attributes: BTreeMap<String, String>,
    pub fixed_target: u64,
    pub rate: f64,
}

impl CentralRule {
    pub fn new(fields: CentralRuleFields) -> Self {
        let reservoir = CentralReservoir::new(fields.fixed_target);
        let properties = Properties {
            host: fields.host,
            http_method: fields.http_method,
            url_path: fields.url_path,
            service_name: fields.service_name,
            fixed_target: fields.fixed_target,
            rate: fields.rate,
        };
        Self {
            rule_name: fields.rule_name,
            inner: RwLock::new(CentralRuleInner {
                properties,
                priority: fields.priority,
                service_type: fields.service_type,
                resource_arn: fields.resource_arn,
                attributes: fields.attributes,
                reservoir,
                requests: 0,
                sampled: 0,
                borrows: 0,
                used_at: 0,
            }),
        }
    }

    /// Creates the special Default rule: rate and capacity only, no
    /// predicate, always applies.
    pub fn new_default(fixed_target: u64, rate: f64) -> Self {
        Self::new(CentralRuleFields {
            rule_name: DEFAULT_RULE_NAME.to_string(),
            priority: i32::MAX,
            host: "*".to_string(),
            http_method: "*".to_string(),
            url_path: "*".to_string(),
            service_name: "*".to_string(),
            service_type: "*".to_string(),
            resource_arn: "*".to_string(),
            attributes: BTreeMap::new(),
            fixed_target,
            rate,
        })
    }

    pub fn priority(&self) -> i32 {
        self.inner.read().priority
    }

    /// Updates every mutable field from a fresh control-plane record.
    /// Replaces the whole inner snapshot at once, preserving counters and
    /// reservoir state (which are not part of the rule definition).
    pub fn update_from(&self, fields: CentralRuleFields) {
        let mut inner = self.inner.write();
        inner.properties = Properties {
            host: fields.host,
            http_method: fields.http_method,
            url_path: fields.url_path,
            service_name: fields.service_name,
            fixed_target: fields.fixed_target,
            rate: fields.rate,
        };
        inner.priority = fields.priority;
        inner.service_type = fields.service_type;
        inner.resource_arn = fields.resource_arn;
        inner.attributes = fields.attributes;
        inner.reservoir.capacity = fields.fixed_target;
    }

    /// Updates just the rate and capacity; used for the Default rule, which
    /// has no predicate to update.
    pub fn update_default(&self, fixed_target: u64, rate: f64) {
        let mut inner = self.inner.write();
        inner.properties.fixed_target = fixed_target;
        inner.properties.rate = rate;
        inner.reservoir.capacity = fixed_target;
    }

    pub fn applies_to(&self, req: &Request) -> bool {
        let inner = self.inner.read();
        inner.properties.applies_to(req)
            && crate::wildcard::field_matches(&inner.service_type, &req.service_type)
    }

    /// The ordered central-rule decision: borrow on expiry, else take from
    /// quota, else bernoulli fallback.
    pub fn sample(&self, now: i64, rand: &dyn Rand) -> Decision {
        let mut inner = self.inner.write();
        inner.requests += 1;
        inner.used_at = now;

        if inner.reservoir.expired(now) {
            if inner.reservoir.borrow(now) {
                inner.borrows += 1;
                return Decision::sampled(self.rule_name.clone());
            }
        } else if inner.reservoir.take(now) {
            inner.sampled += 1;
            return Decision::sampled(self.rule_name.clone());
        }

        if rand.float64() < inner.properties.rate {
            inner.sampled += 1;
            Decision::sampled(self.rule_name.clone())
        } else {
            Decision::not_sampled(self.rule_name.clone())
        }
    }

    /// Applies a `SamplingTargetDocument`: rate always, quota/ttl/interval
    /// when present, and always stamps `quota_refreshed_at`.
    pub fn apply_target(
        &self,
        now: i64,
        rate: f64,
        quota: Option<u64>,
        quota_expires_at: Option<i64>,
        interval: Option<i64>,
    ) {
        let mut inner = self.inner.write();
        inner.properties.rate = rate;
        if let Some(quota) = quota {
            inner.reservoir.quota = quota;
        }
        if let Some(expires_at) = quota_expires_at {
            inner.reservoir.quota_expires_at = expires_at;
        }
        if let Some(interval) = interval {
            inner.reservoir.interval = interval;
        }
        inner.reservoir.quota_refreshed_at = now;
    }

    /// True if the rule has unreported requests and its statistics are due
    /// (`requests != 0 AND now >= quota_refreshed_at + interval`).
    pub fn is_stale(&self, now: i64) -> bool {
        let inner = self.inner.read();
        inner.requests != 0 && now >= inner.reservoir.quota_refreshed_at + inner.reservoir.interval
    }

    /// Atomically reads and zeroes the request/sampled/borrow counters.
    /// Returns `None` if there is nothing to report.
    pub fn snapshot(&self, now: i64) -> Option<RuleSnapshot> {
        let mut inner = self.inner.write();
        if inner.requests == 0 || now < inner.reservoir.quota_refreshed_at + inner.reservoir.interval
        {
            return None;
        }
        let snapshot = RuleSnapshot {
            requests: inner.requests,
            sampled: inner.sampled,
            borrows: inner.borrows,
        };
        inner.requests = 0;
        inner.sampled = 0;
        inner.borrows = 0;
        Some(snapshot)
    }
}

/// The result of a rule's counter snapshot: pre-reset values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuleSnapshot {
    pub requests: u64,
    pub sampled: u64,
    pub borrows: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedRand;
    use crate::request::Request;

    fn rule(host: &str, priority: i32) -> CentralRule {
        CentralRule::new(CentralRuleFields {
            rule_name: "r1".to_string(),
            priority,
            host: host.to_string(),
            http_method: "POST".to_string(),
            url_path: "/resource/*".to_string(),
            service_name: "localhost".to_string(),
            service_type: "*".to_string(),
            resource_arn: "*".to_string(),
            attributes: BTreeMap::new(),
            fixed_target: 50,
            rate: 0.05,
        })
    }

    #[test]
    fn s1_matched_central_rule_quota_available() {
        let r = rule("www.foo.com", 4);
        {
            let mut inner = r.inner.write();
            inner.reservoir.quota = 10;
            inner.reservoir.quota_expires_at = 1_600_000_000;
            // pretend 8 already used this epoch by priming current_epoch via take()
        }
        // Prime used=8 at epoch 1_500_000_000 by taking 8 tokens.
        for _ in 0..8 {
            assert!(r.inner.write().reservoir.take(1_500_000_000));
        }

        let req = Request::new()
            .with_host("www.foo.com")
            .with_url_path("/resource/bar")
            .with_method("POST")
            .with_service_name("localhost")
            .with_service_type("AWS::EC2::Instance");

        assert!(r.applies_to(&req));
        let decision = r.sample(1_500_000_000, &FixedRand::new(0.99));
        assert_eq!(decision, Decision::sampled("r1"));

        let inner = r.inner.read();
        assert_eq!(inner.requests, 1);
        assert_eq!(inner.sampled, 1);
        assert_eq!(inner.reservoir.used(), 9);
    }

    #[test]
    fn s4_borrow_then_bernoulli_same_second() {
        let r = rule("*", 1);
        {
            let mut inner = r.inner.write();
            inner.reservoir.quota = 0;
            inner.reservoir.quota_expires_at = 1_500_000_060;
        }

        let decision = r.sample(1_500_000_061, &FixedRand::new(0.01));
        assert_eq!(decision, Decision::sampled("r1"));
        assert_eq!(r.inner.read().borrows, 1);

        // Second call same second: borrow refused (already borrowed this
        // epoch), falls through to bernoulli.
        let decision2 = r.sample(1_500_000_061, &FixedRand::new(0.01));
        assert_eq!(decision2, Decision::sampled("r1"));
        assert_eq!(r.inner.read().borrows, 1, "borrow must not double-count");
        assert_eq!(r.inner.read().sampled, 1);
    }

    #[test]
    fn snapshot_reads_and_zeroes() {
        let r = rule("*", 1);
        r.sample(100, &FixedRand::new(0.0));
        assert!(r.is_stale(111));
        let snap = r.snapshot(111).expect("stale rule with requests");
        assert_eq!(snap.requests, 1);
        assert_eq!(r.inner.read().requests, 0);
        assert!(r.snapshot(111).is_none());
    }

    #[test]
    fn applies_to_matches_service_type_wildcard() {
        let r = rule("*", 1);
        let req = Request::new()
            .with_host("anything")
            .with_method("POST")
            .with_url_path("/resource/x")
            .with_service_name("localhost")
            .with_service_type("ignored");
        assert!(r.applies_to(&req));
    }
}
