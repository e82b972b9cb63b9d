use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::ActivityLog;

/// Named record collections the engine persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Users,
    Submissions,
    CreditTransactions,
    RewardsCatalog,
    UserRedemptions,
    ActivityLogs,
}

impl Collection {
    pub const fn all() -> [Self; 6] {
        [
            Self::Users,
            Self::Submissions,
            Self::CreditTransactions,
            Self::RewardsCatalog,
            Self::UserRedemptions,
            Self::ActivityLogs,
        ]
    }

    /// Storage key; the JSON file adapter uses it as the file stem.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Submissions => "submissions",
            Self::CreditTransactions => "credit_transactions",
            Self::RewardsCatalog => "rewards_catalog",
            Self::UserRedemptions => "user_redemptions",
            Self::ActivityLogs => "activity_logs",
        }
    }
}

/// Storage abstraction so the engine can be exercised without a backing store.
///
/// Implementations must give read-after-write consistency: a `load` issued after a
/// successful `save` of the same collection returns what was saved.
pub trait PersistenceAdapter: Send + Sync {
    fn load(&self, collection: Collection) -> Result<Vec<Value>, StoreError>;
    fn save(&self, collection: Collection, records: Vec<Value>) -> Result<(), StoreError>;
}

/// Error enumeration for persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("collection '{collection}' holds a malformed record: {source}")]
    Corrupt {
        collection: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("collection '{collection}' could not be encoded: {source}")]
    Encode {
        collection: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage io failure on '{collection}': {source}")]
    Io {
        collection: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// One-way hook for the admin activity feed.
pub trait ActivityPublisher: Send + Sync {
    fn publish(&self, entry: ActivityLog) -> Result<(), ActivityError>;
}

/// Activity dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    #[error("activity transport unavailable: {0}")]
    Transport(String),
}
