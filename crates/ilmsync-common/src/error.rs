use thiserror::Error;

pub const EXPIRATION_FORMAT_HINT: &str =
    "expiration must be a duration (5d), date (1970-01-01), or \"DeleteMarker\"";

#[derive(Debug, Error)]
pub enum IlmError {
    #[error("bucket not found: {0}")]
    BucketNotFound(String),
    #[error("invalid bucket name: {0}")]
    InvalidBucketName(String),
    #[error("{}, got {:?}", EXPIRATION_FORMAT_HINT, .0)]
    InvalidExpiration(String),
    #[error("{field} must be strictly positive, got {value}")]
    OutOfRange { field: &'static str, value: i64 },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("malformed lifecycle xml: {0}")]
    MalformedXml(String),
    #[error("{context} [{bucket}]: {source}")]
    Resource {
        context: &'static str,
        bucket: String,
        #[source]
        source: Box<IlmError>,
    },
    #[error("internal error: {0}")]
    InternalError(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IlmError {
    /// Wraps a store failure with the operation summary and the bucket it concerned.
    pub fn resource(context: &'static str, bucket: impl Into<String>, source: IlmError) -> Self {
        Self::Resource {
            context,
            bucket: bucket.into(),
            source: Box::new(source),
        }
    }

    pub fn s3_error_code(&self) -> &'static str {
        match self {
            Self::BucketNotFound(_) => "NoSuchBucket",
            Self::InvalidBucketName(_) => "InvalidBucketName",
            Self::InvalidExpiration(_) | Self::OutOfRange { .. } | Self::InvalidArgument(_) => {
                "InvalidArgument"
            }
            Self::MalformedXml(_) => "MalformedXML",
            Self::Resource { source, .. } => source.s3_error_code(),
            Self::InternalError(_) => "InternalError",
            Self::Io(_) => "InternalError",
        }
    }

    pub fn bucket(&self) -> Option<&str> {
        match self {
            Self::BucketNotFound(bucket) | Self::InvalidBucketName(bucket) => Some(bucket),
            Self::Resource { bucket, .. } => Some(bucket),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, IlmError>;

#[cfg(test)]
mod tests {
    use super::IlmError;

    #[test]
    fn resource_error_carries_bucket_and_cause() {
        let err = IlmError::resource(
            "creating bucket lifecycle failed",
            "b1",
            IlmError::BucketNotFound("b1".to_string()),
        );

        assert_eq!(err.bucket(), Some("b1"));
        assert_eq!(err.s3_error_code(), "NoSuchBucket");
        assert_eq!(
            err.to_string(),
            "creating bucket lifecycle failed [b1]: bucket not found: b1"
        );
    }

    #[test]
    fn format_error_names_accepted_shapes() {
        let err = IlmError::InvalidExpiration("soon".to_string());
        let message = err.to_string();

        assert!(message.contains("duration (5d)"));
        assert!(message.contains("date (1970-01-01)"));
        assert!(message.contains("\"DeleteMarker\""));
        assert_eq!(err.s3_error_code(), "InvalidArgument");
    }
}
