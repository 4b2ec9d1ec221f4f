use std::collections::BTreeMap;

use crate::types::{LifecycleFilter, Tag};

/// Chooses the AND form as soon as one tag is present, even with an empty prefix.
pub fn encode_filter(prefix: &str, tags: &BTreeMap<String, String>) -> LifecycleFilter {
    if tags.is_empty() {
        return LifecycleFilter::Prefix(prefix.to_string());
    }

    LifecycleFilter::And {
        prefix: prefix.to_string(),
        tags: tags
            .iter()
            .map(|(key, value)| Tag {
                key: key.clone(),
                value: value.clone(),
            })
            .collect(),
    }
}

/// An AND filter without tags reads back exactly like a plain prefix.
pub fn decode_filter(filter: &LifecycleFilter) -> (String, BTreeMap<String, String>) {
    match filter {
        LifecycleFilter::Prefix(prefix) => (prefix.clone(), BTreeMap::new()),
        LifecycleFilter::And { prefix, tags } => {
            let tags = tags
                .iter()
                .map(|tag| (tag.key.clone(), tag.value.clone()))
                .collect();
            (prefix.clone(), tags)
        }
    }
}
