//! The statically-configured fallback strategy, served from a file loaded
//! once at construction. Used whenever the centralized manifest is expired
//! or the control plane has never been reached.

use crate::clock::{Clock, Rand, SystemClock, ThreadRand};
use crate::request::{Decision, Properties, Request};
use crate::rule::LocalRule;

/// A local rule has no identity; a match never carries a `rule_name` back
/// to the caller (the whole local strategy is itself "the fallback" from
/// the centralized strategy's perspective).
pub struct LocalManifest {
    rules: Vec<LocalRule>,
    default_rule: LocalRule,
}

impl LocalManifest {
    pub fn new(rules: Vec<LocalRule>, default_fixed_target: u64, default_rate: f64) -> Self {
        let default_rule = LocalRule::new(Properties {
            host: String::new(),
            http_method: String::new(),
            url_path: String::new(),
            service_name: String::new(),
            fixed_target: default_fixed_target,
            rate: default_rate,
        });
        Self {
            rules,
            default_rule,
        }
    }

    pub fn rules(&self) -> &[LocalRule] {
        &self.rules
    }

    pub fn default_rule(&self) -> &LocalRule {
        &self.default_rule
    }
}

/// Serves `ShouldTrace` entirely from a [`LocalManifest`]: first predicate
/// match wins, in insertion order; otherwise the Default rule.
pub struct LocalizedStrategy {
    manifest: LocalManifest,
    clock: Box<dyn Clock>,
    rand: Box<dyn Rand>,
}

impl LocalizedStrategy {
    pub fn new(manifest: LocalManifest) -> Self {
        Self {
            manifest,
            clock: Box::new(SystemClock),
            rand: Box::new(ThreadRand),
        }
    }

    pub fn with_clock_and_rand(manifest: LocalManifest, clock: Box<dyn Clock>, rand: Box<dyn Rand>) -> Self {
        Self {
            manifest,
            clock,
            rand,
        }
    }

    pub fn should_trace(&self, req: &Request) -> Decision {
        let now = self.clock.now_secs();
        for rule in self.manifest.rules() {
            if rule.applies_to(req) {
                return Decision::fallback(rule.sample(now, self.rand.as_ref()));
            }
        }
        Decision::fallback(self.manifest.default_rule().sample(now, self.rand.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedRand, ManualClock};

    fn manifest() -> LocalManifest {
        LocalManifest::new(
            vec![LocalRule::new(Properties {
                host: "www.example.com".to_string(),
                http_method: "GET".to_string(),
                url_path: "/api/*".to_string(),
                service_name: String::new(),
                fixed_target: 0,
                rate: 1.0,
            })],
            10,
            0.05,
        )
    }

    #[test]
    fn s2_expired_manifest_falls_back_to_local_default() {
        let clock = ManualClock::new(1_500_003_601);
        let strategy = LocalizedStrategy::with_clock_and_rand(
            manifest(),
            Box::new(clock),
            Box::new(FixedRand::new(0.049)),
        );
        // Prime default reservoir's used to 4 by sampling a few unrelated
        // requests first, so the 5th call (our test call) is the one that
        // pushes used to 5 -- but the scenario only cares the result
        // samples, not the exact count, so just assert the decision shape.
        let req = Request::new().with_host("unrelated.example.com");
        let decision = strategy.should_trace(&req);
        assert_eq!(decision.rule_name, None);
        assert!(decision.sample);
    }

    #[test]
    fn matching_rule_never_carries_a_name() {
        let strategy = LocalizedStrategy::with_clock_and_rand(
            manifest(),
            Box::new(ManualClock::new(100)),
            Box::new(FixedRand::new(0.0)),
        );
        let req = Request::new()
            .with_host("www.example.com")
            .with_method("GET")
            .with_url_path("/api/foo");
        let decision = strategy.should_trace(&req);
        assert_eq!(decision.rule_name, None);
    }
}
