//! S3 `LifecycleConfiguration` XML document.
//!
//! The wire shape is a bag of optional elements; it is converted to and from
//! the structured sum types at this boundary only. Shapes the structured model
//! does not know read back as absent instead of failing.

use ilmsync_common::{
    error::{IlmError, Result},
    time::{format_lifecycle_date, parse_lifecycle_date},
};
use quick_xml::{de::from_str as xml_from_str, se::to_string as xml_to_string};
use serde::{Deserialize, Serialize};

use crate::types::{
    Expiration, LifecycleConfiguration, LifecycleFilter, LifecycleRule,
    NoncurrentVersionExpiration, NoncurrentVersionTransition, RuleStatus, Tag, Transition,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "LifecycleConfiguration")]
struct WireConfiguration {
    #[serde(rename = "Rule", default)]
    rules: Vec<WireRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireRule {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Filter", default, skip_serializing_if = "Option::is_none")]
    filter: Option<WireFilter>,
    /// Pre-`Filter` documents carry the prefix directly on the rule.
    #[serde(rename = "Prefix", default, skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,
    #[serde(rename = "Expiration", default, skip_serializing_if = "Option::is_none")]
    expiration: Option<WireExpiration>,
    #[serde(rename = "Transition", default, skip_serializing_if = "Option::is_none")]
    transition: Option<WireTransition>,
    #[serde(
        rename = "NoncurrentVersionExpiration",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    noncurrent_version_expiration: Option<WireNoncurrentDays>,
    #[serde(
        rename = "NoncurrentVersionTransition",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    noncurrent_version_transition: Option<WireNoncurrentDays>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireFilter {
    #[serde(rename = "Prefix", default, skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,
    #[serde(rename = "Tag", default, skip_serializing_if = "Option::is_none")]
    tag: Option<WireTag>,
    #[serde(rename = "And", default, skip_serializing_if = "Option::is_none")]
    and: Option<WireAnd>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireAnd {
    #[serde(rename = "Prefix", default, skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,
    #[serde(rename = "Tag", default)]
    tags: Vec<WireTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireTag {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Value", default)]
    value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireExpiration {
    #[serde(rename = "Days", default, skip_serializing_if = "Option::is_none")]
    days: Option<u32>,
    #[serde(rename = "Date", default, skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(
        rename = "ExpiredObjectDeleteMarker",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    expired_object_delete_marker: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireTransition {
    #[serde(rename = "Days", default, skip_serializing_if = "Option::is_none")]
    days: Option<u32>,
    #[serde(rename = "Date", default, skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(rename = "StorageClass", default)]
    storage_class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireNoncurrentDays {
    #[serde(rename = "NoncurrentDays", default)]
    noncurrent_days: u32,
}

impl LifecycleConfiguration {
    pub fn from_xml(xml: &str) -> Result<Self> {
        let wire: WireConfiguration = xml_from_str(xml)
            .map_err(|err| IlmError::MalformedXml(err.to_string()))?;
        wire.rules
            .into_iter()
            .map(LifecycleRule::try_from)
            .collect::<Result<Vec<_>>>()
            .map(|rules| Self { rules })
    }

    pub fn to_xml(&self) -> Result<String> {
        let wire = WireConfiguration {
            rules: self.rules.iter().map(WireRule::from).collect(),
        };
        xml_to_string(&wire).map_err(|err| {
            IlmError::InternalError(format!("failed to serialize lifecycle xml: {err}"))
        })
    }
}

impl TryFrom<WireRule> for LifecycleRule {
    type Error = IlmError;

    fn try_from(wire: WireRule) -> Result<Self> {
        let status = RuleStatus::parse(wire.status.trim()).ok_or_else(|| {
            IlmError::MalformedXml(format!(
                "lifecycle rule {} has unknown status {:?}",
                wire.id, wire.status
            ))
        })?;

        Ok(Self {
            id: wire.id,
            status,
            filter: filter_from_wire(wire.filter, wire.prefix),
            expiration: wire.expiration.and_then(expiration_from_wire),
            transition: wire.transition.and_then(transition_from_wire),
            noncurrent_version_expiration: wire
                .noncurrent_version_expiration
                .map(|policy| NoncurrentVersionExpiration {
                    noncurrent_days: policy.noncurrent_days,
                }),
            noncurrent_version_transition: wire
                .noncurrent_version_transition
                .map(|policy| NoncurrentVersionTransition {
                    noncurrent_days: policy.noncurrent_days,
                }),
        })
    }
}

impl From<&LifecycleRule> for WireRule {
    fn from(rule: &LifecycleRule) -> Self {
        Self {
            id: rule.id.clone(),
            status: rule.status.as_str().to_string(),
            filter: Some(filter_to_wire(&rule.filter)),
            prefix: None,
            expiration: rule.expiration.as_ref().map(expiration_to_wire),
            transition: rule.transition.as_ref().map(transition_to_wire),
            noncurrent_version_expiration: rule.noncurrent_version_expiration.map(|policy| {
                WireNoncurrentDays {
                    noncurrent_days: policy.noncurrent_days,
                }
            }),
            noncurrent_version_transition: rule.noncurrent_version_transition.map(|policy| {
                WireNoncurrentDays {
                    noncurrent_days: policy.noncurrent_days,
                }
            }),
        }
    }
}

fn filter_from_wire(filter: Option<WireFilter>, legacy_prefix: Option<String>) -> LifecycleFilter {
    let Some(filter) = filter else {
        return LifecycleFilter::Prefix(legacy_prefix.unwrap_or_default());
    };

    if let Some(and) = filter.and {
        return LifecycleFilter::And {
            prefix: and.prefix.unwrap_or_default(),
            tags: and.tags.into_iter().map(tag_from_wire).collect(),
        };
    }

    if let Some(tag) = filter.tag {
        return LifecycleFilter::And {
            prefix: filter.prefix.unwrap_or_default(),
            tags: vec![tag_from_wire(tag)],
        };
    }

    LifecycleFilter::Prefix(filter.prefix.or(legacy_prefix).unwrap_or_default())
}

fn filter_to_wire(filter: &LifecycleFilter) -> WireFilter {
    match filter {
        LifecycleFilter::Prefix(prefix) => WireFilter {
            prefix: Some(prefix.clone()),
            ..WireFilter::default()
        },
        LifecycleFilter::And { prefix, tags } => WireFilter {
            and: Some(WireAnd {
                prefix: (!prefix.is_empty()).then(|| prefix.clone()),
                tags: tags
                    .iter()
                    .map(|tag| WireTag {
                        key: tag.key.clone(),
                        value: tag.value.clone(),
                    })
                    .collect(),
            }),
            ..WireFilter::default()
        },
    }
}

fn tag_from_wire(tag: WireTag) -> Tag {
    Tag {
        key: tag.key,
        value: tag.value,
    }
}

fn expiration_from_wire(wire: WireExpiration) -> Option<Expiration> {
    if wire.expired_object_delete_marker == Some(true) {
        return Some(Expiration::DeleteMarker);
    }
    if let Some(days) = wire.days {
        return Some(Expiration::Days(days));
    }
    wire.date
        .as_deref()
        .and_then(parse_lifecycle_date)
        .map(Expiration::Date)
}

fn expiration_to_wire(expiration: &Expiration) -> WireExpiration {
    match expiration {
        Expiration::Days(days) => WireExpiration {
            days: Some(*days),
            ..WireExpiration::default()
        },
        Expiration::Date(date) => WireExpiration {
            date: Some(format_lifecycle_date(date)),
            ..WireExpiration::default()
        },
        Expiration::DeleteMarker => WireExpiration {
            expired_object_delete_marker: Some(true),
            ..WireExpiration::default()
        },
    }
}

fn transition_from_wire(wire: WireTransition) -> Option<Transition> {
    let storage_class = wire.storage_class;
    if let Some(days) = wire.days {
        return Some(Transition::Days {
            days,
            storage_class,
        });
    }
    wire.date
        .as_deref()
        .and_then(parse_lifecycle_date)
        .map(|date| Transition::Date {
            date,
            storage_class,
        })
}

fn transition_to_wire(transition: &Transition) -> WireTransition {
    match transition {
        Transition::Days {
            days,
            storage_class,
        } => WireTransition {
            days: Some(*days),
            date: None,
            storage_class: storage_class.clone(),
        },
        Transition::Date {
            date,
            storage_class,
        } => WireTransition {
            days: None,
            date: Some(format_lifecycle_date(date)),
            storage_class: storage_class.clone(),
        },
    }
}
