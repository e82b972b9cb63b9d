use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{RedemptionStatus, SubmissionStatus, TransactionType, UserId};
use super::error::CreditsError;
use super::state::CreditState;
use super::tier::{NextTier, Tier, TierThresholds};

/// Figures shown on a user's Green Credits page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditSummary {
    pub user_id: UserId,
    pub points: i64,
    pub tier: Tier,
    pub next_tier: Option<NextTier>,
    pub tier_progress: u8,
    pub total_earned: i64,
    pub total_spent: i64,
    pub total_refunded: i64,
    pub total_bonus: i64,
    pub completed_submissions: usize,
    pub open_submissions: usize,
}

/// Programme-wide counters for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverview {
    pub users: usize,
    pub submissions_by_status: BTreeMap<&'static str, usize>,
    pub pending_redemptions: usize,
    pub credits_in_circulation: i64,
    pub credits_awarded: i64,
    pub rewards_in_catalog: usize,
}

impl CreditState {
    pub(crate) fn user_summary(
        &self,
        user_id: &UserId,
        tiers: &TierThresholds,
    ) -> Result<CreditSummary, CreditsError> {
        let user = self.user(user_id)?;
        let owned = || {
            self.submissions
                .values()
                .filter(move |submission| &submission.user_id == user_id)
        };

        Ok(CreditSummary {
            user_id: user.id.clone(),
            points: user.points,
            tier: tiers.tier_of(user.points),
            next_tier: tiers.points_to_next_tier(user.points),
            tier_progress: tiers.progress_percent(user.points),
            total_earned: self.ledger.total_of(user_id, TransactionType::Earned),
            total_spent: -self.ledger.total_of(user_id, TransactionType::Spent),
            total_refunded: self.ledger.total_of(user_id, TransactionType::Refunded),
            total_bonus: self.ledger.total_of(user_id, TransactionType::Bonus),
            completed_submissions: owned()
                .filter(|submission| submission.status() == SubmissionStatus::Completed)
                .count(),
            open_submissions: owned()
                .filter(|submission| !submission.status().is_final())
                .count(),
        })
    }

    pub(crate) fn admin_overview(&self) -> AdminOverview {
        let mut submissions_by_status: BTreeMap<&'static str, usize> =
            SubmissionStatus::ordered()
                .into_iter()
                .map(|status| (status.label(), 0))
                .collect();
        for submission in self.submissions.values() {
            *submissions_by_status
                .entry(submission.status().label())
                .or_default() += 1;
        }

        AdminOverview {
            users: self.users.len(),
            submissions_by_status,
            pending_redemptions: self
                .redemptions
                .values()
                .filter(|redemption| redemption.status() == RedemptionStatus::Pending)
                .count(),
            credits_in_circulation: self.users.values().map(|user| user.points).sum(),
            credits_awarded: self
                .submissions
                .values()
                .map(|submission| submission.credits_awarded())
                .sum(),
            rewards_in_catalog: self.catalog.iter().count(),
        }
    }
}
