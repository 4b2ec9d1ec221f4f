pub mod client;
pub mod expiration;
pub mod filter;
pub mod rule;
pub mod spec;
pub mod state;
pub mod store;
pub mod system;
pub mod transition;
pub mod types;
mod xml;

pub use client::{LifecycleClient, MemoryLifecycleClient};
pub use expiration::{decode_expiration, encode_expiration};
pub use filter::{decode_filter, encode_filter};
pub use rule::{build_rule, build_rules, decode_rule, decode_rules};
pub use spec::{BucketLifecycleSpec, RuleSpec, TransitionSpec};
pub use state::{BucketLifecycle, StateStore};
pub use store::FsLifecycleClient;
pub use system::LifecycleSys;
pub use transition::{decode_transition, encode_transition};
pub use types::{
    Expiration, LifecycleConfiguration, LifecycleFilter, LifecycleRule,
    NoncurrentVersionExpiration, NoncurrentVersionTransition, RuleStatus, Tag, Transition,
};
