use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use super::codes::{redemption_code, unique_code};
use super::domain::{
    CreditTransaction, RedemptionId, RedemptionState, RedemptionStatus, RedemptionTransaction,
    RedemptionType, RewardId, UserId,
};
use super::error::CreditsError;
use super::ledger::LedgerPosting;
use super::state::CreditState;
use super::tier::TierThresholds;

/// Approved rewards stay usable for this long after fulfilment.
pub const REDEMPTION_VALIDITY_DAYS: i64 = 30;

fn not_pending(redemption: &RedemptionTransaction, operation: &'static str) -> CreditsError {
    let status = redemption.status();
    match status {
        RedemptionStatus::Approved => CreditsError::InvalidTransition {
            entity: "redemption",
            id: redemption.id.to_string(),
            operation,
            status: status.label(),
        },
        _ => CreditsError::AlreadyFinalized {
            entity: "redemption",
            id: redemption.id.to_string(),
            status: status.label(),
        },
    }
}

impl CreditState {
    pub(crate) fn redemption(
        &self,
        id: &RedemptionId,
    ) -> Result<&RedemptionTransaction, CreditsError> {
        self.redemptions
            .get(id)
            .ok_or_else(|| CreditsError::not_found("redemption", id))
    }

    fn redemption_mut(
        &mut self,
        id: &RedemptionId,
    ) -> Result<&mut RedemptionTransaction, CreditsError> {
        self.redemptions
            .get_mut(id)
            .ok_or_else(|| CreditsError::not_found("redemption", id))
    }

    fn approved_state<R: Rng + ?Sized>(
        &self,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<RedemptionState, CreditsError> {
        let code = unique_code(rng, redemption_code, |code| {
            self.redemptions
                .values()
                .any(|existing| existing.redemption_code() == Some(code))
        })
        .ok_or_else(|| {
            CreditsError::Validation("no free redemption code could be allocated".to_string())
        })?;

        Ok(RedemptionState::Approved {
            redemption_code: code,
            fulfilled_at: now,
            expires_at: now + Duration::days(REDEMPTION_VALIDITY_DAYS),
        })
    }

    /// Exchange credits for a reward.
    ///
    /// Checks run in a fixed order (reward, tier, stock, balance) and the first failure
    /// is reported; nothing is written until all of them pass.
    pub(crate) fn redeem<R: Rng + ?Sized>(
        &mut self,
        user_id: &UserId,
        reward_id: &RewardId,
        tiers: &TierThresholds,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<(RedemptionTransaction, CreditTransaction), CreditsError> {
        let balance = self.active_user(user_id)?.points;
        let reward = self.catalog.get(reward_id)?.clone();

        let current = tiers.tier_of(balance);
        if current < reward.min_tier {
            return Err(CreditsError::TierLocked {
                required: reward.min_tier,
                current,
            });
        }
        if !reward.stock.is_available() {
            return Err(CreditsError::OutOfStock {
                reward_id: reward.id.clone(),
            });
        }
        if balance < reward.credit_cost {
            return Err(CreditsError::InsufficientCredits {
                required: reward.credit_cost,
                available: balance,
            });
        }

        let state = match reward.redemption_type {
            RedemptionType::Instant => self.approved_state(now, rng)?,
            RedemptionType::RequiresApproval | RedemptionType::Scheduled => {
                RedemptionState::Pending
            }
        };

        let redemption_id = self.sequences.next_redemption();
        let txn_id = self.sequences.next_transaction();
        let account = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| CreditsError::not_found("user", user_id))?;
        let entry = self.ledger.post(
            txn_id,
            account,
            LedgerPosting::spent(
                reward.credit_cost,
                redemption_id.as_str(),
                format!("Redeemed: {}", reward.name),
            ),
            now,
        )?;
        self.catalog.take_one(&reward.id)?;

        let redemption = RedemptionTransaction {
            id: redemption_id,
            user_id: user_id.clone(),
            reward_id: reward.id,
            reward_name: reward.name,
            credits_cost: reward.credit_cost,
            redeemed_at: now,
            notes: reward.terms_and_conditions,
            state,
        };
        self.redemptions
            .insert(redemption.id.clone(), redemption.clone());
        Ok((redemption, entry))
    }

    pub(crate) fn approve_redemption<R: Rng + ?Sized>(
        &mut self,
        id: &RedemptionId,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<RedemptionTransaction, CreditsError> {
        let redemption = self.redemption(id)?;
        if redemption.state != RedemptionState::Pending {
            return Err(not_pending(redemption, "approve"));
        }
        let approved = self.approved_state(now, rng)?;

        let redemption = self.redemption_mut(id)?;
        redemption.state = approved;
        Ok(redemption.clone())
    }

    /// Move a pending redemption to a terminal state and refund its full cost.
    fn close_with_refund(
        &mut self,
        id: &RedemptionId,
        operation: &'static str,
        closed: RedemptionState,
        now: DateTime<Utc>,
    ) -> Result<(RedemptionTransaction, CreditTransaction), CreditsError> {
        let redemption = self.redemption(id)?;
        if redemption.state != RedemptionState::Pending {
            return Err(not_pending(redemption, operation));
        }
        let user_id = redemption.user_id.clone();
        let posting = LedgerPosting::refunded(
            redemption.credits_cost,
            id.as_str(),
            format!("Refund: {}", redemption.reward_name),
        );

        let txn_id = self.sequences.next_transaction();
        let account = self
            .users
            .get_mut(&user_id)
            .ok_or_else(|| CreditsError::not_found("user", &user_id))?;
        let entry = self.ledger.post(txn_id, account, posting, now)?;

        let redemption = self.redemption_mut(id)?;
        redemption.state = closed;
        Ok((redemption.clone(), entry))
    }

    pub(crate) fn reject_redemption(
        &mut self,
        id: &RedemptionId,
        now: DateTime<Utc>,
    ) -> Result<(RedemptionTransaction, CreditTransaction), CreditsError> {
        self.close_with_refund(
            id,
            "reject",
            RedemptionState::Rejected { rejected_at: now },
            now,
        )
    }

    /// Owner-initiated withdrawal of a pending claim.
    pub(crate) fn cancel_redemption(
        &mut self,
        user_id: &UserId,
        id: &RedemptionId,
        now: DateTime<Utc>,
    ) -> Result<(RedemptionTransaction, CreditTransaction), CreditsError> {
        if &self.redemption(id)?.user_id != user_id {
            // another user's claim looks the same as a missing one
            return Err(CreditsError::not_found("redemption", id));
        }
        self.close_with_refund(
            id,
            "cancel",
            RedemptionState::Cancelled { cancelled_at: now },
            now,
        )
    }

    /// Record the physical hand-over of an approved reward.
    pub(crate) fn fulfill_redemption(
        &mut self,
        id: &RedemptionId,
        now: DateTime<Utc>,
    ) -> Result<RedemptionTransaction, CreditsError> {
        let redemption = self.redemption_mut(id)?;
        let RedemptionState::Approved {
            redemption_code,
            fulfilled_at,
            expires_at,
        } = redemption.state.clone()
        else {
            let status = redemption.status();
            return Err(if status == RedemptionStatus::Pending {
                CreditsError::InvalidTransition {
                    entity: "redemption",
                    id: id.to_string(),
                    operation: "fulfil",
                    status: status.label(),
                }
            } else {
                CreditsError::AlreadyFinalized {
                    entity: "redemption",
                    id: id.to_string(),
                    status: status.label(),
                }
            });
        };

        redemption.state = RedemptionState::Fulfilled {
            redemption_code,
            fulfilled_at,
            expires_at,
            handed_over_at: now,
        };
        Ok(redemption.clone())
    }

    /// Claims for `user_id`, newest first.
    pub(crate) fn redemptions_for(&self, user_id: &UserId) -> Vec<RedemptionTransaction> {
        let mut owned: Vec<RedemptionTransaction> = self
            .redemptions
            .values()
            .filter(|redemption| &redemption.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.redeemed_at.cmp(&a.redeemed_at).then(b.id.cmp(&a.id)));
        owned
    }

    pub(crate) fn pending_redemptions(&self) -> Vec<RedemptionTransaction> {
        self.redemptions
            .values()
            .filter(|redemption| redemption.state == RedemptionState::Pending)
            .cloned()
            .collect()
    }
}
