use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tier::Tier;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

identifier!(
    /// Account identifier shared by students, staff and administrators.
    UserId
);
identifier!(SubmissionId);
identifier!(TransactionId);
identifier!(RewardId);
identifier!(RedemptionId);
identifier!(ActivityId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    Active,
    Suspended,
}

/// Account holding a Green Credit balance.
///
/// `points` mirrors the ledger: it is only ever written by [`super::ledger::CreditLedger::post`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub points: i64,
    pub role: Role,
    pub status: AccountStatus,
    pub joined_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// Disposal path suggested for a reported device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisposalAction {
    Repair,
    Donate,
    Recycle,
}

impl DisposalAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Repair => "Repair",
            Self::Donate => "Donate",
            Self::Recycle => "Recycle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Pending,
    Dropped,
    Completed,
    Rejected,
}

impl SubmissionStatus {
    pub const fn ordered() -> [Self; 4] {
        [Self::Pending, Self::Dropped, Self::Completed, Self::Rejected]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Dropped => "DROPPED",
            Self::Completed => "COMPLETED",
            Self::Rejected => "REJECTED",
        }
    }

    pub const fn is_final(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }
}

/// Status-dependent part of a submission. Only a completed submission carries an award.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionState {
    Pending,
    #[serde(rename_all = "camelCase")]
    Dropped { dropped_at: DateTime<Utc> },
    #[serde(rename_all = "camelCase")]
    Completed {
        dropped_at: DateTime<Utc>,
        verified_at: DateTime<Utc>,
        credits_awarded: i64,
    },
    #[serde(rename_all = "camelCase")]
    Rejected {
        dropped_at: DateTime<Utc>,
        rejected_at: DateTime<Utc>,
        rejected_reason: String,
    },
}

/// A single reported device and its journey to a collection point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: SubmissionId,
    pub user_id: UserId,
    pub category: String,
    pub condition: String,
    pub intent: String,
    pub recommendation: DisposalAction,
    pub credits_pending: i64,
    pub drop_off_code: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: SubmissionState,
}

impl Submission {
    pub fn status(&self) -> SubmissionStatus {
        match self.state {
            SubmissionState::Pending => SubmissionStatus::Pending,
            SubmissionState::Dropped { .. } => SubmissionStatus::Dropped,
            SubmissionState::Completed { .. } => SubmissionStatus::Completed,
            SubmissionState::Rejected { .. } => SubmissionStatus::Rejected,
        }
    }

    pub fn credits_awarded(&self) -> i64 {
        match self.state {
            SubmissionState::Completed {
                credits_awarded, ..
            } => credits_awarded,
            _ => 0,
        }
    }

    pub fn dropped_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            SubmissionState::Pending => None,
            SubmissionState::Dropped { dropped_at }
            | SubmissionState::Completed { dropped_at, .. }
            | SubmissionState::Rejected { dropped_at, .. } => Some(dropped_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Earned,
    Spent,
    Bonus,
    Refunded,
}

impl TransactionType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Earned => "earned",
            Self::Spent => "spent",
            Self::Bonus => "bonus",
            Self::Refunded => "refunded",
        }
    }

    /// Whether `amount` has the sign this entry type requires.
    pub const fn accepts(self, amount: i64) -> bool {
        match self {
            Self::Spent => amount <= 0,
            Self::Earned | Self::Bonus | Self::Refunded => amount >= 0,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionSource {
    Submission,
    Redemption,
    Bonus,
}

/// Immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditTransaction {
    pub id: TransactionId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: i64,
    pub balance: i64,
    pub source: TransactionSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardCategory {
    Recognition,
    Impact,
    CampusPerk,
    PhysicalItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionType {
    Instant,
    RequiresApproval,
    Scheduled,
}

/// Remaining inventory for a reward. Serialized as a number or the string `"unlimited"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StockRepr", into = "StockRepr")]
pub enum Stock {
    Limited(u32),
    Unlimited,
}

impl Stock {
    pub const fn is_available(self) -> bool {
        !matches!(self, Self::Limited(0))
    }

    /// Take one unit; saturates at zero.
    pub const fn decremented(self) -> Self {
        match self {
            Self::Limited(count) => Self::Limited(count.saturating_sub(1)),
            Self::Unlimited => Self::Unlimited,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StockRepr {
    Count(u32),
    Word(String),
}

impl TryFrom<StockRepr> for Stock {
    type Error = String;

    fn try_from(value: StockRepr) -> Result<Self, Self::Error> {
        match value {
            StockRepr::Count(count) => Ok(Stock::Limited(count)),
            StockRepr::Word(word) if word.eq_ignore_ascii_case("unlimited") => {
                Ok(Stock::Unlimited)
            }
            StockRepr::Word(word) => Err(format!(
                "stock must be a non-negative integer or \"unlimited\", got \"{word}\""
            )),
        }
    }
}

impl From<Stock> for StockRepr {
    fn from(value: Stock) -> Self {
        match value {
            Stock::Limited(count) => StockRepr::Count(count),
            Stock::Unlimited => StockRepr::Word("unlimited".to_string()),
        }
    }
}

/// Catalog entry a user can exchange credits for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: RewardId,
    pub name: String,
    pub description: String,
    pub category: RewardCategory,
    pub credit_cost: i64,
    pub min_tier: Tier,
    pub stock: Stock,
    pub redemption_type: RedemptionType,
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_and_conditions: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedemptionStatus {
    Pending,
    Approved,
    Rejected,
    Fulfilled,
    Cancelled,
}

impl RedemptionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Fulfilled => "fulfilled",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Status-dependent part of a redemption. A code exists only once the claim is approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RedemptionState {
    Pending,
    #[serde(rename_all = "camelCase")]
    Approved {
        redemption_code: String,
        fulfilled_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Fulfilled {
        redemption_code: String,
        fulfilled_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        handed_over_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Rejected { rejected_at: DateTime<Utc> },
    #[serde(rename_all = "camelCase")]
    Cancelled { cancelled_at: DateTime<Utc> },
}

/// Record of a reward claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionTransaction {
    pub id: RedemptionId,
    pub user_id: UserId,
    pub reward_id: RewardId,
    pub reward_name: String,
    pub credits_cost: i64,
    pub redeemed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub state: RedemptionState,
}

impl RedemptionTransaction {
    pub fn status(&self) -> RedemptionStatus {
        match self.state {
            RedemptionState::Pending => RedemptionStatus::Pending,
            RedemptionState::Approved { .. } => RedemptionStatus::Approved,
            RedemptionState::Fulfilled { .. } => RedemptionStatus::Fulfilled,
            RedemptionState::Rejected { .. } => RedemptionStatus::Rejected,
            RedemptionState::Cancelled { .. } => RedemptionStatus::Cancelled,
        }
    }

    pub fn redemption_code(&self) -> Option<&str> {
        match &self.state {
            RedemptionState::Approved {
                redemption_code, ..
            }
            | RedemptionState::Fulfilled {
                redemption_code, ..
            } => Some(redemption_code),
            _ => None,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            RedemptionState::Approved { expires_at, .. }
            | RedemptionState::Fulfilled { expires_at, .. } => Some(expires_at),
            _ => None,
        }
    }
}

/// Audit record consumed by the admin activity view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: ActivityId,
    pub action: String,
    pub actor_id: String,
    pub target_id: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}
