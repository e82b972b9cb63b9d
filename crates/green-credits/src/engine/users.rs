use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AccountStatus, CreditTransaction, Role, TransactionType, User, UserId};
use super::error::CreditsError;
use super::ledger::LedgerPosting;
use super::state::CreditState;

/// Registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::User
}

impl CreditState {
    pub(crate) fn register_user(
        &mut self,
        request: NewUser,
        now: DateTime<Utc>,
    ) -> Result<User, CreditsError> {
        let name = request.name.trim();
        let email = request.email.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err(CreditsError::Validation("name must not be empty".to_string()));
        }
        if !email.contains('@') {
            return Err(CreditsError::Validation(format!(
                "'{email}' is not an email address"
            )));
        }
        if self.users.values().any(|user| user.email == email) {
            return Err(CreditsError::Validation(format!(
                "an account for '{email}' already exists"
            )));
        }

        let user = User {
            id: self.sequences.next_user(),
            name: name.to_string(),
            email,
            points: 0,
            role: request.role,
            status: AccountStatus::Active,
            joined_at: now,
        };
        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    pub(crate) fn set_account_status(
        &mut self,
        id: &UserId,
        status: AccountStatus,
    ) -> Result<User, CreditsError> {
        let user = self.user_mut(id)?;
        user.status = status;
        Ok(user.clone())
    }

    /// Admin goodwill credit, recorded as a `bonus` entry.
    pub(crate) fn grant_bonus(
        &mut self,
        id: &UserId,
        amount: i64,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<CreditTransaction, CreditsError> {
        if amount <= 0 {
            return Err(CreditsError::InvalidAmount {
                kind: TransactionType::Bonus,
                amount,
            });
        }
        let description = match description.trim() {
            "" => "Bonus credits".to_string(),
            text => text.to_string(),
        };

        let txn_id = self.sequences.next_transaction();
        let account = self
            .users
            .get_mut(id)
            .ok_or_else(|| CreditsError::not_found("user", id))?;
        self.ledger
            .post(txn_id, account, LedgerPosting::bonus(amount, description), now)
    }
}
