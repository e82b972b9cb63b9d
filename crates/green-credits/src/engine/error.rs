use super::domain::{RewardId, TransactionType, UserId};
use super::repository::StoreError;
use super::tier::Tier;

/// Domain-level rejection of an engine operation. None of these leave partial state behind.
#[derive(Debug, thiserror::Error)]
pub enum CreditsError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("cannot {operation} {entity} '{id}' while it is {status}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        operation: &'static str,
        status: &'static str,
    },
    #[error("{entity} '{id}' is already {status}")]
    AlreadyFinalized {
        entity: &'static str,
        id: String,
        status: &'static str,
    },
    #[error("reward requires {required} tier, current tier is {current}")]
    TierLocked { required: Tier, current: Tier },
    #[error("reward '{reward_id}' is out of stock")]
    OutOfStock { reward_id: RewardId },
    #[error("reward costs {required} credits but only {available} are available")]
    InsufficientCredits { required: i64, available: i64 },
    #[error("posting {amount} credits would overdraw '{user_id}' (balance {balance})")]
    InsufficientFunds {
        user_id: UserId,
        balance: i64,
        amount: i64,
    },
    #[error("{amount} is not a valid amount for a {kind} transaction")]
    InvalidAmount { kind: TransactionType, amount: i64 },
    #[error("account '{0}' is suspended")]
    AccountSuspended(UserId),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CreditsError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable name, used in HTTP error bodies.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::AlreadyFinalized { .. } => "already_finalized",
            Self::TierLocked { .. } => "tier_locked",
            Self::OutOfStock { .. } => "out_of_stock",
            Self::InsufficientCredits { .. } => "insufficient_credits",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::AccountSuspended(_) => "account_suspended",
            Self::Validation(_) => "validation",
            Self::Store(_) => "store",
        }
    }
}
