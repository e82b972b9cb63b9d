use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    CreditTransaction, TransactionId, TransactionSource, TransactionType, User, UserId,
};
use super::error::CreditsError;

/// Append-only credit log. Balances are always a function of this log.
#[derive(Debug, Clone, Default)]
pub struct CreditLedger {
    entries: Vec<CreditTransaction>,
}

/// Parameters for a new ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPosting {
    pub kind: TransactionType,
    pub amount: i64,
    pub source: TransactionSource,
    pub reference_id: Option<String>,
    pub description: String,
}

impl LedgerPosting {
    pub fn earned(amount: i64, reference_id: impl Into<String>, description: String) -> Self {
        Self {
            kind: TransactionType::Earned,
            amount,
            source: TransactionSource::Submission,
            reference_id: Some(reference_id.into()),
            description,
        }
    }

    pub fn spent(cost: i64, reference_id: impl Into<String>, description: String) -> Self {
        Self {
            kind: TransactionType::Spent,
            amount: -cost,
            source: TransactionSource::Redemption,
            reference_id: Some(reference_id.into()),
            description,
        }
    }

    pub fn refunded(amount: i64, reference_id: impl Into<String>, description: String) -> Self {
        Self {
            kind: TransactionType::Refunded,
            amount,
            source: TransactionSource::Redemption,
            reference_id: Some(reference_id.into()),
            description,
        }
    }

    pub fn bonus(amount: i64, description: String) -> Self {
        Self {
            kind: TransactionType::Bonus,
            amount,
            source: TransactionSource::Bonus,
            reference_id: None,
            description,
        }
    }
}

/// A user whose cached balance no longer matches the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDrift {
    pub user_id: UserId,
    pub recorded: i64,
    pub computed: i64,
}

impl CreditLedger {
    pub fn from_entries(entries: Vec<CreditTransaction>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CreditTransaction] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry for `account` and move its balance by `posting.amount`.
    ///
    /// The balance check runs before anything is written, so a rejected posting leaves
    /// both the log and the account untouched.
    pub fn post(
        &mut self,
        id: TransactionId,
        account: &mut User,
        posting: LedgerPosting,
        timestamp: DateTime<Utc>,
    ) -> Result<CreditTransaction, CreditsError> {
        if !posting.kind.accepts(posting.amount) {
            return Err(CreditsError::InvalidAmount {
                kind: posting.kind,
                amount: posting.amount,
            });
        }

        let balance = account
            .points
            .checked_add(posting.amount)
            .ok_or(CreditsError::InvalidAmount {
                kind: posting.kind,
                amount: posting.amount,
            })?;
        if balance < 0 {
            return Err(CreditsError::InsufficientFunds {
                user_id: account.id.clone(),
                balance: account.points,
                amount: posting.amount,
            });
        }

        let entry = CreditTransaction {
            id,
            user_id: account.id.clone(),
            kind: posting.kind,
            amount: posting.amount,
            balance,
            source: posting.source,
            reference_id: posting.reference_id,
            description: posting.description,
            timestamp,
        };

        self.entries.push(entry.clone());
        account.points = balance;
        Ok(entry)
    }

    /// Entries for `user_id`, newest first.
    pub fn history(&self, user_id: &UserId) -> Vec<CreditTransaction> {
        self.entries
            .iter()
            .rev()
            .filter(|entry| &entry.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Balance recomputed from the log alone.
    pub fn recompute_balance(&self, user_id: &UserId) -> i64 {
        self.entries
            .iter()
            .filter(|entry| &entry.user_id == user_id)
            .map(|entry| entry.amount)
            .sum()
    }

    pub fn total_of(&self, user_id: &UserId, kind: TransactionType) -> i64 {
        self.entries
            .iter()
            .filter(|entry| &entry.user_id == user_id && entry.kind == kind)
            .map(|entry| entry.amount)
            .sum()
    }

    /// Users whose cached `points` disagree with the log.
    pub fn verify_consistency<'a>(
        &self,
        users: impl IntoIterator<Item = &'a User>,
    ) -> Vec<BalanceDrift> {
        users
            .into_iter()
            .filter_map(|user| {
                let computed = self.recompute_balance(&user.id);
                (computed != user.points).then(|| BalanceDrift {
                    user_id: user.id.clone(),
                    recorded: user.points,
                    computed,
                })
            })
            .collect()
    }

    /// Entries that reference `reference_id`, oldest first.
    pub fn referencing<'a>(
        &'a self,
        reference_id: &'a str,
    ) -> impl Iterator<Item = &'a CreditTransaction> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.reference_id.as_deref() == Some(reference_id))
    }
}
