use std::path::PathBuf;

use async_trait::async_trait;
use ilmsync_common::error::{IlmError, Result};
use tokio::fs;

use crate::{client::LifecycleClient, spec::validate_bucket_name, types::LifecycleConfiguration};

const LIFECYCLE_FILE_NAME: &str = ".lifecycle.xml";

/// Filesystem-backed store: one directory per bucket, configuration kept as S3 XML.
#[derive(Debug, Clone)]
pub struct FsLifecycleClient {
    root: PathBuf,
}

impl FsLifecycleClient {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub async fn make_bucket(&self, bucket: &str) -> Result<()> {
        validate_bucket_name(bucket)?;
        fs::create_dir_all(self.bucket_dir(bucket)).await?;
        Ok(())
    }

    fn config_path(&self, bucket: &str) -> PathBuf {
        self.bucket_dir(bucket).join(LIFECYCLE_FILE_NAME)
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    async fn ensure_bucket_dir(&self, bucket: &str) -> Result<()> {
        validate_bucket_name(bucket)?;
        let bucket_dir = self.bucket_dir(bucket);
        let metadata = fs::metadata(&bucket_dir).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                return IlmError::BucketNotFound(bucket.to_string());
            }
            IlmError::Io(err)
        })?;
        if !metadata.is_dir() {
            return Err(IlmError::BucketNotFound(bucket.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LifecycleClient for FsLifecycleClient {
    async fn set_lifecycle(&self, bucket: &str, config: &LifecycleConfiguration) -> Result<()> {
        self.ensure_bucket_dir(bucket).await?;
        let path = self.config_path(bucket);
        if config.is_empty() {
            return match fs::remove_file(path).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(IlmError::Io(err)),
            };
        }

        let xml = config.to_xml()?;
        fs::write(path, xml).await?;
        Ok(())
    }

    async fn get_lifecycle(&self, bucket: &str) -> Result<LifecycleConfiguration> {
        self.ensure_bucket_dir(bucket).await?;
        let path = self.config_path(bucket);
        match fs::read_to_string(&path).await {
            Ok(xml) => LifecycleConfiguration::from_xml(&xml).map_err(|err| {
                IlmError::InternalError(format!(
                    "failed to parse bucket lifecycle config {}: {err}",
                    path.display()
                ))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(LifecycleConfiguration::default())
            }
            Err(err) => Err(IlmError::Io(err)),
        }
    }
}
