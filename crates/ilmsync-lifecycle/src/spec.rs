use std::collections::{BTreeMap, HashSet};

use ilmsync_common::error::{IlmError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{rule::build_rule, types::Expiration};

const MAX_BUCKET_NAME_LEN: usize = 63;

/// Declarative lifecycle description for one bucket. The bucket name is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketLifecycleSpec {
    pub bucket: String,
    #[serde(rename = "rule", default)]
    pub rules: Vec<RuleSpec>,
}

/// Flat, string-typed rule as written by users and as mirrored back from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub id: String,
    #[serde(default)]
    pub expiration: String,
    #[serde(default)]
    pub transition: Vec<TransitionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noncurrent_version_expiration_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noncurrent_version_transition_days: Option<i64>,
    /// Reported by the store; ignored on write.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub filter: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub storage_class: String,
}

impl BucketLifecycleSpec {
    pub fn new(bucket: impl Into<String>, rules: Vec<RuleSpec>) -> Self {
        Self {
            bucket: bucket.into(),
            rules,
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|err| {
            IlmError::InvalidArgument(format!("invalid bucket lifecycle spec: {err}"))
        })
    }

    /// Checks everything that can be rejected before talking to the store.
    pub fn validate(&self) -> Result<()> {
        validate_bucket_name(&self.bucket)?;

        let mut seen = HashSet::with_capacity(self.rules.len());
        for rule in &self.rules {
            rule.validate()?;
            if !seen.insert(rule.id.as_str()) {
                return Err(IlmError::InvalidArgument(format!(
                    "duplicate lifecycle rule id {} in bucket {}",
                    rule.id, self.bucket
                )));
            }
        }
        Ok(())
    }
}

impl RuleSpec {
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(IlmError::InvalidArgument(
                "lifecycle rule id must not be empty".to_string(),
            ));
        }

        if !self.expiration.is_empty() {
            self.expiration.parse::<Expiration>()?;
        }

        if self.transition.len() > 1 {
            return Err(IlmError::InvalidArgument(format!(
                "lifecycle rule {} accepts at most one transition",
                self.id
            )));
        }
        if let Some(TransitionSpec {
            days: Some(days),
            date: Some(date),
            ..
        }) = self.transition.first()
        {
            warn!(rule = %self.id, days = %days, date = %date, "transition sets both days and date, date is ignored");
        }

        validate_positive(
            "noncurrent_version_expiration_days",
            self.noncurrent_version_expiration_days,
        )?;
        validate_positive(
            "noncurrent_version_transition_days",
            self.noncurrent_version_transition_days,
        )?;
        Ok(())
    }

    /// Compares the rules as the store would receive them, so spellings that
    /// encode alike (`05d` and `5d`) and the computed status do not count.
    pub fn same_inputs(&self, other: &RuleSpec) -> bool {
        build_rule(self) == build_rule(other)
    }
}

pub fn validate_bucket_name(bucket: &str) -> Result<()> {
    if bucket.is_empty()
        || bucket == "."
        || bucket == ".."
        || bucket.len() > MAX_BUCKET_NAME_LEN
        || bucket.contains('/')
        || bucket.contains('\\')
    {
        return Err(IlmError::InvalidBucketName(bucket.to_string()));
    }
    Ok(())
}

fn validate_positive(field: &'static str, value: Option<i64>) -> Result<()> {
    match value {
        Some(value) if value < 1 => Err(IlmError::OutOfRange { field, value }),
        Some(value) if value > i64::from(u32::MAX) => Err(IlmError::InvalidArgument(format!(
            "{field} is too large: {value}"
        ))),
        _ => Ok(()),
    }
}
