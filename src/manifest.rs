//! The sorted, indexed set of central rules in force at a point in time.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{SamplingError, SamplingResult};
use crate::rule::{CentralRule, CentralRuleFields, DEFAULT_RULE_NAME};

/// Manifest TTL: once `now - refreshed_at` exceeds this, the manifest is
/// expired and the engine must fall back to the local strategy.
pub const MANIFEST_TTL_SECS: i64 = 3600;

/// The ordered, indexed set of rules served by
/// [`crate::centralized::CentralizedStrategy`].
///
/// Not internally synchronized: callers (the strategy) hold this behind a
/// `parking_lot::RwLock`, taking the read lock for `ShouldTrace`'s match
/// loop and the write lock for `put`/`prune`/`sort`.
#[derive(Default)]
pub struct Manifest {
    rules: Vec<Arc<CentralRule>>,
    index: HashMap<String, Arc<CentralRule>>,
    default_rule: Option<Arc<CentralRule>>,
    refreshed_at: i64,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> &[Arc<CentralRule>] {
        &self.rules
    }

    pub fn default_rule(&self) -> Option<&Arc<CentralRule>> {
        self.default_rule.as_ref()
    }

    pub fn get(&self, rule_name: &str) -> Option<Arc<CentralRule>> {
        if rule_name == DEFAULT_RULE_NAME {
            self.default_rule.clone()
        } else {
            self.index.get(rule_name).cloned()
        }
    }

    pub fn refreshed_at(&self) -> i64 {
        self.refreshed_at
    }

    pub fn set_refreshed_at(&mut self, now: i64) {
        self.refreshed_at = now;
    }

    pub fn expired(&self, now: i64) -> bool {
        now - self.refreshed_at > MANIFEST_TTL_SECS
    }

    /// Installs or updates a rule from a control-plane record. The Default
    /// rule is handled specially: it has no predicate, so only `rate` and
    /// `fixed_target` are applied. Validates the whole record before
    /// mutating any state.
    pub fn put(&mut self, fields: CentralRuleFields) -> SamplingResult<Arc<CentralRule>> {
        if fields.rule_name.is_empty() {
            return Err(SamplingError::validation("rule record missing RuleName"));
        }

        if fields.rule_name == DEFAULT_RULE_NAME {
            return Ok(match &self.default_rule {
                Some(existing) => {
                    existing.update_default(fields.fixed_target, fields.rate);
                    existing.clone()
                }
                None => {
                    let rule = Arc::new(CentralRule::new_default(fields.fixed_target, fields.rate));
                    self.default_rule = Some(rule.clone());
                    rule
                }
            });
        }

        if let Some(existing) = self.index.get(&fields.rule_name) {
            existing.update_from(fields);
            Ok(existing.clone())
        } else {
            let rule = Arc::new(CentralRule::new(fields));
            self.index.insert(rule.rule_name.clone(), rule.clone());
            self.rules.push(rule.clone());
            Ok(rule)
        }
    }

    /// Removes every user rule whose name is not in `active`. The Default
    /// rule is never pruned.
    pub fn prune(&mut self, active: &HashSet<String>) {
        self.rules.retain(|rule| active.contains(&rule.rule_name));
        self.index.retain(|name, _| active.contains(name));
    }

    /// Stable sort by `(priority asc, rule_name asc)`. Must be called after
    /// any batch of `put`s.
    pub fn sort(&mut self) {
        self.rules
            .sort_by(|a, b| a.priority().cmp(&b.priority()).then_with(|| a.rule_name.cmp(&b.rule_name)));
    }

    /// Number of user rules currently indexed (excludes Default).
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn fields(name: &str, priority: i32) -> CentralRuleFields {
        CentralRuleFields {
            rule_name: name.to_string(),
            priority,
            host: "*".to_string(),
            http_method: "*".to_string(),
            url_path: "*".to_string(),
            service_name: "*".to_string(),
            service_type: "*".to_string(),
            resource_arn: "*".to_string(),
            attributes: BTreeMap::new(),
            fixed_target: 10,
            rate: 0.05,
        }
    }

    #[test]
    fn put_then_sort_orders_by_priority_then_name() {
        let mut m = Manifest::new();
        m.put(fields("b", 2)).unwrap();
        m.put(fields("a", 2)).unwrap();
        m.put(fields("z", 1)).unwrap();
        m.sort();

        let names: Vec<&str> = m.rules().iter().map(|r| r.rule_name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "b"]);
    }

    #[test]
    fn put_updates_existing_rule_in_place() {
        let mut m = Manifest::new();
        let first = m.put(fields("a", 2)).unwrap();
        let second = m.put(fields("a", 5)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(m.len(), 1);
        assert_eq!(second.priority(), 5);
    }

    #[test]
    fn default_rule_is_indexed_but_not_in_ordered_list() {
        let mut m = Manifest::new();
        m.put(CentralRuleFields {
            rule_name: DEFAULT_RULE_NAME.to_string(),
            ..fields("Default", 0)
        })
        .unwrap();
        assert!(m.default_rule().is_some());
        assert_eq!(m.len(), 0);
    }

    #[test]
    fn prune_removes_only_absent_user_rules() {
        let mut m = Manifest::new();
        m.put(fields("a", 1)).unwrap();
        m.put(fields("b", 1)).unwrap();
        m.put(CentralRuleFields {
            rule_name: DEFAULT_RULE_NAME.to_string(),
            ..fields("Default", 0)
        })
        .unwrap();

        let mut active = HashSet::new();
        active.insert("a".to_string());
        m.prune(&active);

        assert_eq!(m.len(), 1);
        assert!(m.get("a").is_some());
        assert!(m.get("b").is_none());
        assert!(m.default_rule().is_some(), "Default survives prune");
    }

    #[test]
    fn prune_preserves_sort_order() {
        let mut m = Manifest::new();
        for (name, prio) in [("c", 1), ("a", 1), ("b", 1), ("d", 0)] {
            m.put(fields(name, prio)).unwrap();
        }
        m.sort();

        let mut active = HashSet::new();
        for n in ["a", "b", "c", "d"] {
            active.insert(n.to_string());
        }
        active.remove("c");
        m.prune(&active);

        let names: Vec<&str> = m.rules().iter().map(|r| r.rule_name.as_str()).collect();
        assert_eq!(names, vec!["d", "a", "b"]);
    }

    #[test]
    fn expiry_boundary() {
        let mut m = Manifest::new();
        m.set_refreshed_at(1_500_000_000);
        assert!(!m.expired(1_500_000_000 + MANIFEST_TTL_SECS));
        assert!(m.expired(1_500_000_000 + MANIFEST_TTL_SECS + 1));
    }

    #[test]
    fn put_rejects_missing_rule_name() {
        let mut m = Manifest::new();
        let err = m.put(fields("", 1)).unwrap_err();
        assert!(matches!(err, SamplingError::Validation(_)));
    }

    proptest! {
        #[test]
        fn sorted_after_any_put_sequence(
            names in prop::collection::vec("[a-z]{1,4}", 0..20),
            priorities in prop::collection::vec(0i32..10, 0..20),
        ) {
            let mut m = Manifest::new();
            for (name, priority) in names.iter().zip(priorities.iter()) {
                let _ = m.put(fields(name, *priority));
            }
            m.sort();

            let rules = m.rules();
            for pair in rules.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                let key_a = (a.priority(), a.rule_name.clone());
                let key_b = (b.priority(), b.rule_name.clone());
                prop_assert!(key_a <= key_b);
            }

            let unique_names: HashSet<&str> = rules.iter().map(|r| r.rule_name.as_str()).collect();
            prop_assert_eq!(unique_names.len(), rules.len());
        }
    }
}
