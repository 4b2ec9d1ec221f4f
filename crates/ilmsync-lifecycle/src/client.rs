use std::{
    collections::HashMap,
    sync::{
        RwLock,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use ilmsync_common::error::{IlmError, Result};

use crate::types::LifecycleConfiguration;

/// Store operations the reconciler needs. Writes replace the whole configuration.
#[async_trait]
pub trait LifecycleClient: Send + Sync {
    /// An empty rule list clears the bucket's configuration.
    async fn set_lifecycle(&self, bucket: &str, config: &LifecycleConfiguration) -> Result<()>;
    /// A bucket without configuration yields an empty rule list.
    async fn get_lifecycle(&self, bucket: &str) -> Result<LifecycleConfiguration>;
}

/// In-process store that keeps each configuration in its XML form, so reads
/// return the canonical re-serialized document like a real endpoint does.
#[derive(Debug, Default)]
pub struct MemoryLifecycleClient {
    buckets: RwLock<HashMap<String, Option<String>>>,
    unavailable: AtomicBool,
    writes: AtomicU64,
}

impl MemoryLifecycleClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buckets<I, S>(buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        if let Ok(mut map) = client.buckets.write() {
            map.extend(buckets.into_iter().map(|bucket| (bucket.into(), None)));
        }
        client
    }

    /// Makes every call fail as a transport error would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of accepted `set_lifecycle` calls.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn raw_xml(&self, bucket: &str) -> Option<String> {
        self.buckets
            .read()
            .ok()
            .and_then(|map| map.get(bucket).cloned().flatten())
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IlmError::InternalError(
                "lifecycle store unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn buckets_write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Option<String>>>> {
        self.buckets
            .write()
            .map_err(|_| IlmError::InternalError("memory store lock poisoned".to_string()))
    }

    fn buckets_read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Option<String>>>> {
        self.buckets
            .read()
            .map_err(|_| IlmError::InternalError("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl LifecycleClient for MemoryLifecycleClient {
    async fn set_lifecycle(&self, bucket: &str, config: &LifecycleConfiguration) -> Result<()> {
        self.check_available()?;
        let document = if config.is_empty() {
            None
        } else {
            Some(config.to_xml()?)
        };

        let mut buckets = self.buckets_write()?;
        let slot = buckets
            .get_mut(bucket)
            .ok_or_else(|| IlmError::BucketNotFound(bucket.to_string()))?;
        *slot = document;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_lifecycle(&self, bucket: &str) -> Result<LifecycleConfiguration> {
        self.check_available()?;
        let buckets = self.buckets_read()?;
        match buckets.get(bucket) {
            None => Err(IlmError::BucketNotFound(bucket.to_string())),
            Some(None) => Ok(LifecycleConfiguration::default()),
            Some(Some(xml)) => LifecycleConfiguration::from_xml(xml),
        }
    }
}

#[cfg(test)]
mod tests {
    use ilmsync_common::IlmError;

    use super::{LifecycleClient, MemoryLifecycleClient};
    use crate::{rule::build_rules, spec::RuleSpec};

    fn config() -> crate::types::LifecycleConfiguration {
        build_rules(
            "b1",
            &[RuleSpec {
                id: "r1".to_string(),
                expiration: "5d".to_string(),
                ..RuleSpec::default()
            }],
        )
    }

    #[tokio::test]
    async fn unknown_bucket_is_rejected() {
        let client = MemoryLifecycleClient::new();

        let err = client.set_lifecycle("nope", &config()).await.unwrap_err();
        assert!(matches!(err, IlmError::BucketNotFound(_)));
        assert!(client.get_lifecycle("nope").await.is_err());
        assert_eq!(client.write_count(), 0);
    }

    #[tokio::test]
    async fn empty_write_clears_configuration() {
        let client = MemoryLifecycleClient::with_buckets(["b1"]);
        client.set_lifecycle("b1", &config()).await.unwrap();
        assert!(client.raw_xml("b1").is_some());

        client
            .set_lifecycle("b1", &Default::default())
            .await
            .unwrap();
        assert!(client.raw_xml("b1").is_none());
        assert!(client.get_lifecycle("b1").await.unwrap().rules.is_empty());
        assert_eq!(client.write_count(), 2);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let client = MemoryLifecycleClient::with_buckets(["b1"]);
        client.set_unavailable(true);

        assert!(client.get_lifecycle("b1").await.is_err());
        assert!(client.set_lifecycle("b1", &config()).await.is_err());

        client.set_unavailable(false);
        assert!(client.get_lifecycle("b1").await.is_ok());
    }
}
