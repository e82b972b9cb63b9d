use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::catalog::RewardDraft;
use super::clock::{Clock, SystemClock};
use super::domain::{
    AccountStatus, ActivityLog, CreditTransaction, RedemptionId, RedemptionTransaction, Reward,
    RewardId, Submission, SubmissionId, SubmissionStatus, User, UserId,
};
use super::error::CreditsError;
use super::ledger::BalanceDrift;
use super::rates::EngineSettings;
use super::recommendation::{DeviceAnswers, Recommendation, RecommendationEngine};
use super::repository::{ActivityPublisher, Collection, PersistenceAdapter, StoreError};
use super::state::CreditState;
use super::submissions::NewSubmission;
use super::summary::{AdminOverview, CreditSummary};
use super::users::NewUser;

/// Actor recorded for operations reserved to administrators.
pub const ADMIN_ACTOR: &str = "admin";

#[derive(Debug)]
struct ActivityDraft {
    action: &'static str,
    actor_id: String,
    target_id: String,
    details: String,
}

/// Activity records collected while an operation runs; published only if it commits.
#[derive(Debug, Default)]
struct Audit {
    drafts: Vec<ActivityDraft>,
}

impl Audit {
    fn record(
        &mut self,
        action: &'static str,
        actor_id: impl ToString,
        target_id: impl ToString,
        details: String,
    ) {
        self.drafts.push(ActivityDraft {
            action,
            actor_id: actor_id.to_string(),
            target_id: target_id.to_string(),
            details,
        });
    }
}

/// Facade composing the ledger, submission lifecycle, catalog and redemption rules.
///
/// Every mutation runs against a copy of the state under one lock; the copy replaces the
/// live state only after the operation and its persistence both succeed.
pub struct GreenCreditsService<P, A> {
    state: Mutex<CreditState>,
    store: Arc<P>,
    activity: Arc<A>,
    settings: EngineSettings,
    recommender: RecommendationEngine,
    clock: Arc<dyn Clock>,
}

impl<P, A> GreenCreditsService<P, A>
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    /// Hydrate the engine from `store`.
    pub fn open(
        store: Arc<P>,
        activity: Arc<A>,
        settings: EngineSettings,
    ) -> Result<Self, CreditsError> {
        let state = CreditState::hydrate(store.as_ref())?;

        for drift in state.ledger.verify_consistency(state.users.values()) {
            warn!(
                user = %drift.user_id,
                recorded = drift.recorded,
                computed = drift.computed,
                "stored balance disagrees with the credit ledger"
            );
        }
        info!(
            users = state.users.len(),
            submissions = state.submissions.len(),
            transactions = state.ledger.len(),
            rewards = state.catalog.iter().count(),
            "green credits state loaded"
        );

        Ok(Self {
            state: Mutex::new(state),
            store,
            activity,
            settings,
            recommender: RecommendationEngine::new(settings.rates),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn lock(&self) -> Result<MutexGuard<'_, CreditState>, CreditsError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("engine state lock poisoned".to_string()).into())
    }

    fn read<T>(
        &self,
        query: impl FnOnce(&CreditState) -> Result<T, CreditsError>,
    ) -> Result<T, CreditsError> {
        let guard = self.lock()?;
        query(&guard)
    }

    /// Apply `operation` to a copy of the state, persist `touched` and swap the copy in.
    ///
    /// Cost grows with history: every call clones the whole state and rewrites each touched
    /// collection in full (activity logs included) while holding the state mutex. Callers on
    /// an async runtime block their worker for that long; with a file-backed store, run
    /// high-volume callers on a blocking pool.
    fn commit<T, F>(&self, touched: &[Collection], operation: F) -> Result<T, CreditsError>
    where
        F: FnOnce(&mut CreditState, &mut Audit, DateTime<Utc>) -> Result<T, CreditsError>,
    {
        let mut guard = self.lock()?;
        let mut working = guard.clone();
        let now = self.clock.now();
        let mut audit = Audit::default();

        let value = operation(&mut working, &mut audit, now)?;

        let entries: Vec<ActivityLog> = audit
            .drafts
            .into_iter()
            .map(|draft| ActivityLog {
                id: working.sequences.next_activity(),
                action: draft.action.to_string(),
                actor_id: draft.actor_id,
                target_id: draft.target_id,
                details: draft.details,
                timestamp: now,
            })
            .collect();
        working.activity.extend(entries.iter().cloned());

        let mut collections = touched.to_vec();
        if !entries.is_empty() && !collections.contains(&Collection::ActivityLogs) {
            collections.push(Collection::ActivityLogs);
        }
        for (index, collection) in collections.iter().enumerate() {
            if let Err(err) = working.persist(self.store.as_ref(), *collection) {
                // put back what this commit already overwrote
                for written in &collections[..index] {
                    if let Err(restore) = guard.persist(self.store.as_ref(), *written) {
                        warn!(
                            collection = written.key(),
                            error = %restore,
                            "rollback write failed"
                        );
                    }
                }
                return Err(err.into());
            }
        }

        *guard = working;
        drop(guard);

        for entry in entries {
            info!(
                action = %entry.action,
                actor = %entry.actor_id,
                target = %entry.target_id,
                "{}",
                entry.details
            );
            if let Err(err) = self.activity.publish(entry) {
                warn!(error = %err, "activity record not delivered");
            }
        }
        Ok(value)
    }

    // ----- users -----

    pub fn register_user(&self, request: NewUser) -> Result<User, CreditsError> {
        self.commit(&[Collection::Users], |state, audit, now| {
            let user = state.register_user(request, now)?;
            audit.record(
                "user.registered",
                &user.id,
                &user.id,
                format!("{} joined as {:?}", user.name, user.role),
            );
            Ok(user)
        })
    }

    pub fn user(&self, id: &UserId) -> Result<User, CreditsError> {
        self.read(|state| state.user(id).cloned())
    }

    pub fn list_users(&self) -> Result<Vec<User>, CreditsError> {
        self.read(|state| Ok(state.users.values().cloned().collect()))
    }

    pub fn suspend_user(&self, id: &UserId) -> Result<User, CreditsError> {
        self.change_account_status(id, AccountStatus::Suspended, "user.suspended")
    }

    pub fn reactivate_user(&self, id: &UserId) -> Result<User, CreditsError> {
        self.change_account_status(id, AccountStatus::Active, "user.reactivated")
    }

    fn change_account_status(
        &self,
        id: &UserId,
        status: AccountStatus,
        action: &'static str,
    ) -> Result<User, CreditsError> {
        self.commit(&[Collection::Users], |state, audit, _now| {
            let user = state.set_account_status(id, status)?;
            audit.record(action, ADMIN_ACTOR, id, format!("{} is now {:?}", user.name, status));
            Ok(user)
        })
    }

    pub fn grant_bonus(
        &self,
        id: &UserId,
        amount: i64,
        description: &str,
    ) -> Result<CreditTransaction, CreditsError> {
        self.commit(
            &[Collection::Users, Collection::CreditTransactions],
            |state, audit, now| {
                let entry = state.grant_bonus(id, amount, description, now)?;
                audit.record(
                    "credits.bonus",
                    ADMIN_ACTOR,
                    id,
                    format!("+{} credits: {}", entry.amount, entry.description),
                );
                Ok(entry)
            },
        )
    }

    // ----- recommendation & submissions -----

    pub fn recommend(&self, answers: &DeviceAnswers) -> Recommendation {
        self.recommender.recommend(answers)
    }

    pub fn create_submission(&self, request: NewSubmission) -> Result<Submission, CreditsError> {
        let recommender = self.recommender;
        self.commit(&[Collection::Submissions], |state, audit, now| {
            let mut rng = rand::thread_rng();
            let submission = state.create_submission(request, &recommender, now, &mut rng)?;
            audit.record(
                "submission.created",
                &submission.user_id,
                &submission.id,
                format!(
                    "{} reported for {} ({} credits pending, code {})",
                    submission.category,
                    submission.recommendation.label(),
                    submission.credits_pending,
                    submission.drop_off_code
                ),
            );
            Ok(submission)
        })
    }

    pub fn mark_dropped(&self, id: &SubmissionId) -> Result<Submission, CreditsError> {
        self.commit(&[Collection::Submissions], |state, audit, now| {
            let submission = state.mark_dropped(id, now)?;
            audit.record(
                "submission.dropped",
                &submission.user_id,
                id,
                format!("drop-off confirmed with {}", submission.drop_off_code),
            );
            Ok(submission)
        })
    }

    /// Complete a dropped submission and credit its owner.
    pub fn verify_submission(&self, id: &SubmissionId) -> Result<Submission, CreditsError> {
        self.commit(
            &[
                Collection::Submissions,
                Collection::Users,
                Collection::CreditTransactions,
            ],
            |state, audit, now| {
                let (submission, entry) = state.verify_submission(id, now)?;
                audit.record(
                    "submission.verified",
                    ADMIN_ACTOR,
                    id,
                    format!(
                        "awarded {} credits to {} (balance {})",
                        entry.amount, entry.user_id, entry.balance
                    ),
                );
                Ok(submission)
            },
        )
    }

    pub fn reject_submission(
        &self,
        id: &SubmissionId,
        reason: &str,
    ) -> Result<Submission, CreditsError> {
        self.commit(&[Collection::Submissions], |state, audit, now| {
            let submission = state.reject_submission(id, reason, now)?;
            audit.record(
                "submission.rejected",
                ADMIN_ACTOR,
                id,
                format!("rejected: {}", reason.trim()),
            );
            Ok(submission)
        })
    }

    pub fn submission(&self, id: &SubmissionId) -> Result<Submission, CreditsError> {
        self.read(|state| state.submission(id).cloned())
    }

    pub fn submissions_for(&self, user_id: &UserId) -> Result<Vec<Submission>, CreditsError> {
        self.read(|state| {
            state.user(user_id)?;
            Ok(state.submissions_for(user_id))
        })
    }

    pub fn submissions_by_status(
        &self,
        status: SubmissionStatus,
    ) -> Result<Vec<Submission>, CreditsError> {
        self.read(|state| Ok(state.submissions_by_status(status)))
    }

    pub fn find_by_drop_off_code(&self, code: &str) -> Result<Submission, CreditsError> {
        self.read(|state| state.find_by_drop_off_code(code).cloned())
    }

    // ----- ledger -----

    pub fn balance_of(&self, user_id: &UserId) -> Result<i64, CreditsError> {
        self.read(|state| state.user(user_id).map(|user| user.points))
    }

    /// Ledger entries for `user_id`, newest first.
    pub fn history(&self, user_id: &UserId) -> Result<Vec<CreditTransaction>, CreditsError> {
        self.read(|state| {
            state.user(user_id)?;
            Ok(state.ledger.history(user_id))
        })
    }

    pub fn recompute_balance(&self, user_id: &UserId) -> Result<i64, CreditsError> {
        self.read(|state| {
            state.user(user_id)?;
            Ok(state.ledger.recompute_balance(user_id))
        })
    }

    pub fn verify_consistency(&self) -> Result<Vec<BalanceDrift>, CreditsError> {
        self.read(|state| Ok(state.ledger.verify_consistency(state.users.values())))
    }

    // ----- catalog -----

    pub fn create_reward(&self, draft: RewardDraft) -> Result<Reward, CreditsError> {
        self.commit(&[Collection::RewardsCatalog], |state, audit, _now| {
            let id = state.sequences.next_reward();
            let reward = state.catalog.create(id, draft)?;
            audit.record(
                "reward.created",
                ADMIN_ACTOR,
                &reward.id,
                format!("{} for {} credits", reward.name, reward.credit_cost),
            );
            Ok(reward)
        })
    }

    pub fn update_reward(&self, id: &RewardId, draft: RewardDraft) -> Result<Reward, CreditsError> {
        self.commit(&[Collection::RewardsCatalog], |state, audit, _now| {
            let reward = state.catalog.update(id, draft)?;
            audit.record("reward.updated", ADMIN_ACTOR, id, reward.name.clone());
            Ok(reward)
        })
    }

    pub fn delete_reward(&self, id: &RewardId) -> Result<Reward, CreditsError> {
        self.commit(&[Collection::RewardsCatalog], |state, audit, _now| {
            let reward = state.catalog.remove(id)?;
            audit.record("reward.deleted", ADMIN_ACTOR, id, reward.name.clone());
            Ok(reward)
        })
    }

    pub fn reward(&self, id: &RewardId) -> Result<Reward, CreditsError> {
        self.read(|state| state.catalog.get(id).cloned())
    }

    pub fn list_rewards(&self) -> Result<Vec<Reward>, CreditsError> {
        self.read(|state| Ok(state.catalog.iter().cloned().collect()))
    }

    /// Rewards `user_id` could redeem on tier and stock alone.
    pub fn available_rewards(&self, user_id: &UserId) -> Result<Vec<Reward>, CreditsError> {
        let tiers = self.settings.tiers;
        self.read(|state| {
            let points = state.user(user_id)?.points;
            Ok(state.catalog.available_for(tiers.tier_of(points)))
        })
    }

    // ----- redemptions -----

    pub fn redeem(
        &self,
        user_id: &UserId,
        reward_id: &RewardId,
    ) -> Result<RedemptionTransaction, CreditsError> {
        let tiers = self.settings.tiers;
        self.commit(
            &[
                Collection::Users,
                Collection::CreditTransactions,
                Collection::RewardsCatalog,
                Collection::UserRedemptions,
            ],
            |state, audit, now| {
                let mut rng = rand::thread_rng();
                let (redemption, entry) = state.redeem(user_id, reward_id, &tiers, now, &mut rng)?;
                audit.record(
                    "redemption.created",
                    user_id,
                    &redemption.id,
                    format!(
                        "{} for {} credits ({}, balance {})",
                        redemption.reward_name,
                        redemption.credits_cost,
                        redemption.status().label(),
                        entry.balance
                    ),
                );
                Ok(redemption)
            },
        )
    }

    pub fn approve_redemption(
        &self,
        id: &RedemptionId,
    ) -> Result<RedemptionTransaction, CreditsError> {
        self.commit(&[Collection::UserRedemptions], |state, audit, now| {
            let mut rng = rand::thread_rng();
            let redemption = state.approve_redemption(id, now, &mut rng)?;
            audit.record(
                "redemption.approved",
                ADMIN_ACTOR,
                id,
                format!("{} approved for {}", redemption.reward_name, redemption.user_id),
            );
            Ok(redemption)
        })
    }

    /// Reject a pending claim and refund its cost with a new ledger entry.
    pub fn reject_redemption(
        &self,
        id: &RedemptionId,
    ) -> Result<RedemptionTransaction, CreditsError> {
        self.commit(
            &[
                Collection::Users,
                Collection::CreditTransactions,
                Collection::UserRedemptions,
            ],
            |state, audit, now| {
                let (redemption, entry) = state.reject_redemption(id, now)?;
                audit.record(
                    "redemption.rejected",
                    ADMIN_ACTOR,
                    id,
                    format!("refunded {} credits to {}", entry.amount, entry.user_id),
                );
                Ok(redemption)
            },
        )
    }

    pub fn cancel_redemption(
        &self,
        user_id: &UserId,
        id: &RedemptionId,
    ) -> Result<RedemptionTransaction, CreditsError> {
        self.commit(
            &[
                Collection::Users,
                Collection::CreditTransactions,
                Collection::UserRedemptions,
            ],
            |state, audit, now| {
                let (redemption, entry) = state.cancel_redemption(user_id, id, now)?;
                audit.record(
                    "redemption.cancelled",
                    user_id,
                    id,
                    format!("refunded {} credits", entry.amount),
                );
                Ok(redemption)
            },
        )
    }

    pub fn fulfill_redemption(
        &self,
        id: &RedemptionId,
    ) -> Result<RedemptionTransaction, CreditsError> {
        self.commit(&[Collection::UserRedemptions], |state, audit, now| {
            let redemption = state.fulfill_redemption(id, now)?;
            audit.record(
                "redemption.fulfilled",
                ADMIN_ACTOR,
                id,
                format!("{} handed to {}", redemption.reward_name, redemption.user_id),
            );
            Ok(redemption)
        })
    }

    pub fn redemption(&self, id: &RedemptionId) -> Result<RedemptionTransaction, CreditsError> {
        self.read(|state| state.redemption(id).cloned())
    }

    pub fn redemptions_for(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<RedemptionTransaction>, CreditsError> {
        self.read(|state| {
            state.user(user_id)?;
            Ok(state.redemptions_for(user_id))
        })
    }

    pub fn pending_redemptions(&self) -> Result<Vec<RedemptionTransaction>, CreditsError> {
        self.read(|state| Ok(state.pending_redemptions()))
    }

    // ----- dashboards -----

    pub fn user_summary(&self, user_id: &UserId) -> Result<CreditSummary, CreditsError> {
        let tiers = self.settings.tiers;
        self.read(|state| state.user_summary(user_id, &tiers))
    }

    pub fn admin_overview(&self) -> Result<AdminOverview, CreditsError> {
        self.read(|state| Ok(state.admin_overview()))
    }

    /// Most recent activity records, newest first.
    pub fn activity_log(&self, limit: usize) -> Result<Vec<ActivityLog>, CreditsError> {
        self.read(|state| {
            debug!(limit, total = state.activity.len(), "reading activity log");
            Ok(state.activity.iter().rev().take(limit).cloned().collect())
        })
    }
}
