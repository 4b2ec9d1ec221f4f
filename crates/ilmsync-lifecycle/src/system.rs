use std::sync::Arc;

use ilmsync_common::error::{IlmError, Result};
use tracing::{debug, info, warn};

use crate::{
    client::LifecycleClient,
    rule::{build_rules, decode_rules},
    spec::{BucketLifecycleSpec, RuleSpec, validate_bucket_name},
    state::BucketLifecycle,
    types::LifecycleConfiguration,
};

const CREATE_FAILED: &str = "creating bucket lifecycle failed";
const UPDATE_FAILED: &str = "updating bucket lifecycle failed";
const READ_FAILED: &str = "reading lifecycle configuration failed";
const DELETE_FAILED: &str = "deleting lifecycle configuration failed";

/// Drives a bucket's lifecycle configuration towards a declarative rule set.
///
/// Every write replaces the full rule list and is followed by a read, so the
/// mirrored state always reflects what the store returned. Concurrent writers
/// against one bucket are not coordinated here; the last write wins.
pub struct LifecycleSys {
    client: Arc<dyn LifecycleClient>,
}

impl LifecycleSys {
    pub fn new(client: Arc<dyn LifecycleClient>) -> Self {
        Self { client }
    }

    pub async fn create(&self, spec: &BucketLifecycleSpec) -> Result<BucketLifecycle> {
        spec.validate()?;
        self.write_rules(&spec.bucket, &spec.rules, CREATE_FAILED)
            .await?;

        let mut state = BucketLifecycle::imported(spec.bucket.clone());
        info!(bucket = %spec.bucket, rules = spec.rules.len(), "bucket lifecycle created");
        self.read(&mut state).await?;
        Ok(state)
    }

    /// Refreshes the mirrored rules from the store.
    ///
    /// A failed fetch is treated as the configuration being gone: the state
    /// becomes absent and no error is returned. Use [`Self::read_strict`] to
    /// see the failure instead.
    pub async fn read(&self, state: &mut BucketLifecycle) -> Result<()> {
        let Some(bucket) = state.id.clone() else {
            return Ok(());
        };

        match self.client.get_lifecycle(&bucket).await {
            Ok(config) => {
                mirror(state, bucket, &config);
                Ok(())
            }
            Err(err) => {
                let err = IlmError::resource(READ_FAILED, bucket.as_str(), err);
                warn!(bucket = %bucket, error = %err, "treating unreadable lifecycle configuration as absent");
                state.clear();
                Ok(())
            }
        }
    }

    /// Like [`Self::read`], but a failed fetch is returned and the state is left untouched.
    pub async fn read_strict(&self, state: &mut BucketLifecycle) -> Result<()> {
        let Some(bucket) = state.id.clone() else {
            return Ok(());
        };

        let config = self
            .client
            .get_lifecycle(&bucket)
            .await
            .map_err(|err| IlmError::resource(READ_FAILED, bucket.as_str(), err))?;
        mirror(state, bucket, &config);
        Ok(())
    }

    /// Re-submits the whole rule list when any encoded rule changed, then reads back.
    pub async fn update(
        &self,
        state: &mut BucketLifecycle,
        spec: &BucketLifecycleSpec,
    ) -> Result<()> {
        if !state.is_present() {
            *state = self.create(spec).await?;
            return Ok(());
        }

        if state.bucket != spec.bucket {
            return Err(IlmError::InvalidArgument(format!(
                "bucket cannot change from {} to {}; destroy and recreate the lifecycle instead",
                state.bucket, spec.bucket
            )));
        }

        spec.validate()?;
        if rules_changed(&state.rules, &spec.rules) {
            self.write_rules(&spec.bucket, &spec.rules, UPDATE_FAILED)
                .await?;
            info!(bucket = %spec.bucket, rules = spec.rules.len(), "bucket lifecycle replaced");
        } else {
            debug!(bucket = %spec.bucket, "bucket lifecycle rules unchanged");
        }

        self.read(state).await
    }

    /// Clears the remote configuration by writing an empty rule list.
    pub async fn delete(&self, state: &mut BucketLifecycle) -> Result<()> {
        let Some(bucket) = state.id.clone() else {
            return Ok(());
        };

        self.client
            .set_lifecycle(&bucket, &LifecycleConfiguration::default())
            .await
            .map_err(|err| IlmError::resource(DELETE_FAILED, bucket.as_str(), err))?;

        state.clear();
        info!(bucket = %bucket, "bucket lifecycle deleted");
        Ok(())
    }

    /// Adopts an existing remote configuration; the bucket name is the identity.
    pub async fn import(&self, bucket: &str) -> Result<BucketLifecycle> {
        validate_bucket_name(bucket)?;
        let mut state = BucketLifecycle::imported(bucket);
        self.read(&mut state).await?;
        Ok(state)
    }

    async fn write_rules(
        &self,
        bucket: &str,
        rules: &[RuleSpec],
        context: &'static str,
    ) -> Result<()> {
        let config = build_rules(bucket, rules);
        self.client
            .set_lifecycle(bucket, &config)
            .await
            .map_err(|err| IlmError::resource(context, bucket, err))
    }
}

fn mirror(state: &mut BucketLifecycle, bucket: String, config: &LifecycleConfiguration) {
    state.rules = decode_rules(config);
    state.bucket = bucket;
}

fn rules_changed(current: &[RuleSpec], desired: &[RuleSpec]) -> bool {
    current.len() != desired.len()
        || current
            .iter()
            .zip(desired)
            .any(|(current, desired)| !current.same_inputs(desired))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ilmsync_common::IlmError;

    use super::{LifecycleSys, rules_changed};
    use crate::{
        client::MemoryLifecycleClient,
        spec::{BucketLifecycleSpec, RuleSpec, TransitionSpec},
        state::BucketLifecycle,
    };

    fn spec(bucket: &str, expiration: &str) -> BucketLifecycleSpec {
        BucketLifecycleSpec::new(
            bucket,
            vec![RuleSpec {
                id: "r1".to_string(),
                expiration: expiration.to_string(),
                filter: "tmp/".to_string(),
                ..RuleSpec::default()
            }],
        )
    }

    fn system() -> (Arc<MemoryLifecycleClient>, LifecycleSys) {
        let client = Arc::new(MemoryLifecycleClient::with_buckets(["b1"]));
        let sys = LifecycleSys::new(client.clone());
        (client, sys)
    }

    #[tokio::test]
    async fn create_sets_identity_and_mirrors_store() {
        let (client, sys) = system();

        let state = sys.create(&spec("b1", "5d")).await.unwrap();
        assert_eq!(state.id.as_deref(), Some("b1"));
        assert_eq!(state.rules.len(), 1);
        assert_eq!(state.rules[0].status, "Enabled");
        assert_eq!(client.write_count(), 1);
    }

    #[tokio::test]
    async fn invalid_spec_never_reaches_store() {
        let (client, sys) = system();

        let err = sys.create(&spec("b1", "someday")).await.unwrap_err();
        assert!(matches!(err, IlmError::InvalidExpiration(_)));
        assert_eq!(client.write_count(), 0);
    }

    #[tokio::test]
    async fn create_failure_is_tagged_with_bucket() {
        let (_, sys) = system();

        let err = sys.create(&spec("missing", "5d")).await.unwrap_err();
        assert_eq!(err.bucket(), Some("missing"));
        assert!(err.to_string().starts_with("creating bucket lifecycle failed"));
    }

    #[tokio::test]
    async fn read_failure_becomes_absence() {
        let (client, sys) = system();
        let mut state = sys.create(&spec("b1", "5d")).await.unwrap();

        client.set_unavailable(true);
        sys.read(&mut state).await.unwrap();
        assert!(!state.is_present());
        assert!(state.rules.is_empty());
    }

    #[tokio::test]
    async fn strict_read_reports_failure_and_keeps_state() {
        let (client, sys) = system();
        let mut state = sys.create(&spec("b1", "5d")).await.unwrap();
        let before = state.clone();

        client.set_unavailable(true);
        let err = sys.read_strict(&mut state).await.unwrap_err();
        assert!(err.to_string().starts_with("reading lifecycle configuration failed"));
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn update_skips_write_when_unchanged() {
        let (client, sys) = system();
        let mut state = sys.create(&spec("b1", "5d")).await.unwrap();

        sys.update(&mut state, &spec("b1", "5d")).await.unwrap();
        assert_eq!(client.write_count(), 1);

        sys.update(&mut state, &spec("b1", "9d")).await.unwrap();
        assert_eq!(client.write_count(), 2);
        assert_eq!(state.rules[0].expiration, "9d");
    }

    #[tokio::test]
    async fn update_converges_on_equivalent_spelling() {
        let (client, sys) = system();
        let mut state = sys.create(&spec("b1", "05d")).await.unwrap();
        assert_eq!(state.rules[0].expiration, "5d");

        sys.update(&mut state, &spec("b1", "05d")).await.unwrap();
        sys.update(&mut state, &spec("b1", "05d")).await.unwrap();
        assert_eq!(client.write_count(), 1);
    }

    #[tokio::test]
    async fn transition_with_days_and_date_converges() {
        let (client, sys) = system();
        let spec = BucketLifecycleSpec::new(
            "b1",
            vec![RuleSpec {
                id: "r1".to_string(),
                transition: vec![TransitionSpec {
                    days: Some("30d".to_string()),
                    date: Some("2030-01-01".to_string()),
                    storage_class: "COLD".to_string(),
                }],
                ..RuleSpec::default()
            }],
        );

        let mut state = sys.create(&spec).await.unwrap();
        assert_eq!(state.rules[0].transition[0].date, None);
        sys.update(&mut state, &spec).await.unwrap();
        assert_eq!(client.write_count(), 1);
    }

    #[tokio::test]
    async fn update_validates_even_when_rules_look_unchanged() {
        let (client, sys) = system();
        let mut state = sys.create(&spec("b1", "")).await.unwrap();

        let err = sys.update(&mut state, &spec("b1", "someday")).await.unwrap_err();
        assert!(matches!(err, IlmError::InvalidExpiration(_)));
        assert_eq!(client.write_count(), 1);
    }

    #[tokio::test]
    async fn update_write_failure_is_tagged_with_bucket() {
        let (client, sys) = system();
        let mut state = sys.create(&spec("b1", "5d")).await.unwrap();

        client.set_unavailable(true);
        let err = sys.update(&mut state, &spec("b1", "9d")).await.unwrap_err();
        assert!(err.to_string().starts_with("updating bucket lifecycle failed"));
        assert_eq!(err.bucket(), Some("b1"));
        assert_eq!(client.write_count(), 1);
    }

    #[tokio::test]
    async fn update_on_absent_state_creates() {
        let (client, sys) = system();
        let mut state = BucketLifecycle::absent("b1");

        sys.update(&mut state, &spec("b1", "5d")).await.unwrap();
        assert!(state.is_present());
        assert_eq!(state.rules[0].expiration, "5d");
        assert_eq!(client.write_count(), 1);
    }

    #[tokio::test]
    async fn update_rejects_bucket_change() {
        let (_, sys) = system();
        let mut state = sys.create(&spec("b1", "5d")).await.unwrap();

        let err = sys.update(&mut state, &spec("b2", "5d")).await.unwrap_err();
        assert!(matches!(err, IlmError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn delete_failure_keeps_identity() {
        let (client, sys) = system();
        let mut state = sys.create(&spec("b1", "5d")).await.unwrap();

        client.set_unavailable(true);
        let err = sys.delete(&mut state).await.unwrap_err();
        assert!(err.to_string().starts_with("deleting lifecycle configuration failed"));
        assert!(state.is_present());

        client.set_unavailable(false);
        sys.delete(&mut state).await.unwrap();
        assert!(!state.is_present());
    }

    #[tokio::test]
    async fn absent_state_is_a_no_op_for_read_and_delete() {
        let (client, sys) = system();
        let mut state = BucketLifecycle::absent("b1");

        sys.read(&mut state).await.unwrap();
        sys.delete(&mut state).await.unwrap();
        assert_eq!(state, BucketLifecycle::absent("b1"));
        assert_eq!(client.write_count(), 0);
    }

    #[test]
    fn rule_count_change_is_a_change() {
        let one = spec("b1", "5d").rules;
        assert!(!rules_changed(&one, &one));
        assert!(rules_changed(&one, &[]));
    }
}
