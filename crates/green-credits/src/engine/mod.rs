//! Green Credits engine: recommendation, submission lifecycle, credit ledger, tiers,
//! rewards catalog and redemption.
//!
//! All state lives behind [`GreenCreditsService`], which persists each touched collection
//! through a [`PersistenceAdapter`] before a change becomes visible.

pub mod catalog;
pub mod clock;
pub(crate) mod codes;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod rates;
pub mod recommendation;
mod redemption;
pub mod repository;
pub mod service;
mod state;
pub mod storage;
pub mod submissions;
pub mod summary;
pub mod tier;
pub mod users;

#[cfg(test)]
mod tests;

pub use catalog::{RewardDraft, RewardsCatalog};
pub use clock::{Clock, SystemClock};
pub use domain::{
    AccountStatus, ActivityId, ActivityLog, CreditTransaction, DisposalAction, RedemptionId,
    RedemptionState, RedemptionStatus, RedemptionTransaction, RedemptionType, Reward,
    RewardCategory, RewardId, Role, Stock, Submission, SubmissionId, SubmissionState,
    SubmissionStatus, TransactionId, TransactionSource, TransactionType, User, UserId,
};
pub use error::CreditsError;
pub use ledger::{BalanceDrift, CreditLedger, LedgerPosting};
pub use rates::{CreditRates, EngineSettings, IntentKey};
pub use recommendation::{DeviceAnswers, Recommendation, RecommendationEngine};
pub use redemption::REDEMPTION_VALIDITY_DAYS;
pub use repository::{ActivityError, ActivityPublisher, Collection, PersistenceAdapter, StoreError};
pub use service::{GreenCreditsService, ADMIN_ACTOR};
pub use storage::{JsonFileAdapter, MemoryActivityFeed, MemoryAdapter};
pub use submissions::NewSubmission;
pub use summary::{AdminOverview, CreditSummary};
pub use tier::{points_to_next_tier, tier_of, NextTier, Tier, TierThresholds};
pub use users::NewUser;
