use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::catalog::RewardsCatalog;
use super::domain::{
    ActivityId, ActivityLog, RedemptionId, RedemptionTransaction, Reward, RewardId, Submission,
    SubmissionId, TransactionId, User, UserId,
};
use super::error::CreditsError;
use super::ledger::CreditLedger;
use super::repository::{Collection, PersistenceAdapter, StoreError};

/// Monotonic counters behind the human-readable identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Sequences {
    user: u64,
    submission: u64,
    transaction: u64,
    reward: u64,
    redemption: u64,
    activity: u64,
}

impl Sequences {
    pub(crate) fn next_user(&mut self) -> UserId {
        self.user += 1;
        UserId(format!("usr-{:06}", self.user))
    }

    pub(crate) fn next_submission(&mut self) -> SubmissionId {
        self.submission += 1;
        SubmissionId(format!("sub-{:06}", self.submission))
    }

    pub(crate) fn next_transaction(&mut self) -> TransactionId {
        self.transaction += 1;
        TransactionId(format!("txn-{:06}", self.transaction))
    }

    pub(crate) fn next_reward(&mut self) -> RewardId {
        self.reward += 1;
        RewardId(format!("rwd-{:06}", self.reward))
    }

    pub(crate) fn next_redemption(&mut self) -> RedemptionId {
        self.redemption += 1;
        RedemptionId(format!("rdm-{:06}", self.redemption))
    }

    pub(crate) fn next_activity(&mut self) -> ActivityId {
        self.activity += 1;
        ActivityId(format!("act-{:06}", self.activity))
    }
}

// Highest numeric suffix among ids shaped like `prefix-NNNNNN`.
fn highest_suffix<'a>(ids: impl Iterator<Item = &'a str>) -> u64 {
    ids.filter_map(|id| id.rsplit_once('-'))
        .filter_map(|(_, digits)| digits.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

/// Every collection the engine owns, held in memory between persists.
#[derive(Debug, Clone, Default)]
pub(crate) struct CreditState {
    pub(crate) users: BTreeMap<UserId, User>,
    pub(crate) submissions: BTreeMap<SubmissionId, Submission>,
    pub(crate) ledger: CreditLedger,
    pub(crate) catalog: RewardsCatalog,
    pub(crate) redemptions: BTreeMap<RedemptionId, RedemptionTransaction>,
    pub(crate) activity: Vec<ActivityLog>,
    pub(crate) sequences: Sequences,
}

impl CreditState {
    pub(crate) fn hydrate<P: PersistenceAdapter + ?Sized>(store: &P) -> Result<Self, StoreError> {
        let users: Vec<User> = load_records(store, Collection::Users)?;
        let submissions: Vec<Submission> = load_records(store, Collection::Submissions)?;
        let transactions = load_records(store, Collection::CreditTransactions)?;
        let rewards: Vec<Reward> = load_records(store, Collection::RewardsCatalog)?;
        let redemptions: Vec<RedemptionTransaction> =
            load_records(store, Collection::UserRedemptions)?;
        let activity: Vec<ActivityLog> = load_records(store, Collection::ActivityLogs)?;

        let ledger = CreditLedger::from_entries(transactions);
        let sequences = Sequences {
            user: highest_suffix(users.iter().map(|user| user.id.as_str())),
            submission: highest_suffix(submissions.iter().map(|entry| entry.id.as_str())),
            transaction: highest_suffix(ledger.entries().iter().map(|entry| entry.id.as_str())),
            reward: highest_suffix(rewards.iter().map(|reward| reward.id.as_str())),
            redemption: highest_suffix(redemptions.iter().map(|entry| entry.id.as_str())),
            activity: highest_suffix(activity.iter().map(|entry| entry.id.as_str())),
        };

        Ok(Self {
            users: users.into_iter().map(|user| (user.id.clone(), user)).collect(),
            submissions: submissions
                .into_iter()
                .map(|entry| (entry.id.clone(), entry))
                .collect(),
            ledger,
            catalog: RewardsCatalog::from_rewards(rewards),
            redemptions: redemptions
                .into_iter()
                .map(|entry| (entry.id.clone(), entry))
                .collect(),
            activity,
            sequences,
        })
    }

    pub(crate) fn persist<P: PersistenceAdapter + ?Sized>(
        &self,
        store: &P,
        collection: Collection,
    ) -> Result<(), StoreError> {
        let records = match collection {
            Collection::Users => encode_records(collection, self.users.values())?,
            Collection::Submissions => encode_records(collection, self.submissions.values())?,
            Collection::CreditTransactions => {
                encode_records(collection, self.ledger.entries().iter())?
            }
            Collection::RewardsCatalog => encode_records(collection, self.catalog.iter())?,
            Collection::UserRedemptions => encode_records(collection, self.redemptions.values())?,
            Collection::ActivityLogs => encode_records(collection, self.activity.iter())?,
        };
        store.save(collection, records)
    }

    pub(crate) fn user(&self, id: &UserId) -> Result<&User, CreditsError> {
        self.users
            .get(id)
            .ok_or_else(|| CreditsError::not_found("user", id))
    }

    pub(crate) fn user_mut(&mut self, id: &UserId) -> Result<&mut User, CreditsError> {
        self.users
            .get_mut(id)
            .ok_or_else(|| CreditsError::not_found("user", id))
    }

    /// Fails unless the account exists and is active.
    pub(crate) fn active_user(&self, id: &UserId) -> Result<&User, CreditsError> {
        let user = self.user(id)?;
        if !user.is_active() {
            return Err(CreditsError::AccountSuspended(id.clone()));
        }
        Ok(user)
    }
}

fn load_records<T, P>(store: &P, collection: Collection) -> Result<Vec<T>, StoreError>
where
    T: DeserializeOwned,
    P: PersistenceAdapter + ?Sized,
{
    store
        .load(collection)?
        .into_iter()
        .map(|value| {
            serde_json::from_value(value).map_err(|source| StoreError::Corrupt {
                collection: collection.key(),
                source,
            })
        })
        .collect()
}

fn encode_records<'a, T>(
    collection: Collection,
    records: impl Iterator<Item = &'a T>,
) -> Result<Vec<Value>, StoreError>
where
    T: Serialize + 'a,
{
    records
        .map(|record| {
            serde_json::to_value(record).map_err(|source| StoreError::Encode {
                collection: collection.key(),
                source,
            })
        })
        .collect()
}
