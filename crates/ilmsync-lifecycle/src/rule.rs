use tracing::debug;

use crate::{
    expiration::{decode_expiration, encode_expiration},
    filter::{decode_filter, encode_filter},
    spec::RuleSpec,
    transition::{decode_transition, encode_transition},
    types::{
        LifecycleConfiguration, LifecycleRule, NoncurrentVersionExpiration,
        NoncurrentVersionTransition, RuleStatus,
    },
};

/// Assembles the store rule. Rules are always written enabled.
pub fn build_rule(spec: &RuleSpec) -> LifecycleRule {
    LifecycleRule {
        id: spec.id.clone(),
        status: RuleStatus::Enabled,
        filter: encode_filter(&spec.filter, &spec.tags),
        expiration: encode_expiration(&spec.expiration),
        transition: encode_transition(&spec.transition),
        noncurrent_version_expiration: noncurrent_days(spec.noncurrent_version_expiration_days)
            .map(|noncurrent_days| NoncurrentVersionExpiration { noncurrent_days }),
        noncurrent_version_transition: noncurrent_days(spec.noncurrent_version_transition_days)
            .map(|noncurrent_days| NoncurrentVersionTransition { noncurrent_days }),
    }
}

pub fn decode_rule(rule: &LifecycleRule) -> RuleSpec {
    let (filter, tags) = decode_filter(&rule.filter);
    RuleSpec {
        id: rule.id.clone(),
        expiration: decode_expiration(rule.expiration.as_ref()),
        transition: decode_transition(rule.transition.as_ref()),
        noncurrent_version_expiration_days: rule
            .noncurrent_version_expiration
            .and_then(|policy| stored_days(policy.noncurrent_days)),
        noncurrent_version_transition_days: rule
            .noncurrent_version_transition
            .and_then(|policy| stored_days(policy.noncurrent_days)),
        status: rule.status.as_str().to_string(),
        filter,
        tags,
    }
}

/// Builds the full replacement configuration, keeping the input order.
pub fn build_rules(bucket: &str, specs: &[RuleSpec]) -> LifecycleConfiguration {
    let rules: Vec<LifecycleRule> = specs.iter().map(build_rule).collect();
    debug!(bucket = %bucket, rules = rules.len(), "assembled lifecycle configuration");
    LifecycleConfiguration { rules }
}

pub fn decode_rules(config: &LifecycleConfiguration) -> Vec<RuleSpec> {
    config.rules.iter().map(decode_rule).collect()
}

// zero means unset
fn noncurrent_days(days: Option<i64>) -> Option<u32> {
    days.and_then(|days| u32::try_from(days).ok())
        .filter(|days| *days > 0)
}

fn stored_days(days: u32) -> Option<i64> {
    (days != 0).then_some(i64::from(days))
}
