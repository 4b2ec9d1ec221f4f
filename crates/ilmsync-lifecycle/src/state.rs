use std::path::{Path, PathBuf};

use ilmsync_common::error::{IlmError, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::spec::{RuleSpec, validate_bucket_name};

/// Locally mirrored view of one bucket's lifecycle configuration.
///
/// `id` is `Some(bucket)` while the configuration is known to exist and
/// `None` once it is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketLifecycle {
    pub id: Option<String>,
    pub bucket: String,
    #[serde(rename = "rule", default)]
    pub rules: Vec<RuleSpec>,
}

impl BucketLifecycle {
    pub fn absent(bucket: impl Into<String>) -> Self {
        Self {
            id: None,
            bucket: bucket.into(),
            rules: Vec::new(),
        }
    }

    /// State for a configuration that exists remotely but has not been read yet.
    pub fn imported(bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        Self {
            id: Some(bucket.clone()),
            bucket,
            rules: Vec::new(),
        }
    }

    pub fn is_present(&self) -> bool {
        self.id.is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.id = None;
        self.rules.clear();
    }
}

/// Keeps mirrored state between runs, one JSON document per bucket.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub async fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub async fn load(&self, bucket: &str) -> Result<Option<BucketLifecycle>> {
        let path = self.state_path(bucket)?;
        match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|err| {
                IlmError::InternalError(format!(
                    "failed to parse lifecycle state {}: {err}",
                    path.display()
                ))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(IlmError::Io(err)),
        }
    }

    /// Writes present state and drops the file once the resource is absent.
    pub async fn save(&self, state: &BucketLifecycle) -> Result<()> {
        let path = self.state_path(&state.bucket)?;
        if !state.is_present() {
            return match fs::remove_file(path).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(IlmError::Io(err)),
            };
        }

        let bytes = serde_json::to_vec_pretty(state).map_err(|err| {
            IlmError::InternalError(format!(
                "failed to serialize lifecycle state {}: {err}",
                path.display()
            ))
        })?;
        fs::write(path, bytes).await?;
        Ok(())
    }

    fn state_path(&self, bucket: &str) -> Result<PathBuf> {
        validate_bucket_name(bucket)?;
        Ok(self.dir.join(format!("{bucket}.json")))
    }
}
