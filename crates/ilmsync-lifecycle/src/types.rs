use chrono::NaiveDate;

/// Structured lifecycle configuration as the store consumes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleConfiguration {
    pub rules: Vec<LifecycleRule>,
}

impl LifecycleConfiguration {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleRule {
    pub id: String,
    pub status: RuleStatus,
    pub filter: LifecycleFilter,
    pub expiration: Option<Expiration>,
    pub transition: Option<Transition>,
    pub noncurrent_version_expiration: Option<NoncurrentVersionExpiration>,
    pub noncurrent_version_transition: Option<NoncurrentVersionTransition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleStatus {
    Enabled,
    Disabled,
}

impl RuleStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Enabled" => Some(Self::Enabled),
            "Disabled" => Some(Self::Disabled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "Enabled",
            Self::Disabled => "Disabled",
        }
    }
}

/// Object selector of a rule. `And` is used whenever tags are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleFilter {
    Prefix(String),
    And { prefix: String, tags: Vec<Tag> },
}

impl Default for LifecycleFilter {
    fn default() -> Self {
        Self::Prefix(String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    Days(u32),
    Date(NaiveDate),
    /// Removes expired object delete markers.
    DeleteMarker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Days { days: u32, storage_class: String },
    Date { date: NaiveDate, storage_class: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoncurrentVersionExpiration {
    pub noncurrent_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoncurrentVersionTransition {
    pub noncurrent_days: u32,
}
