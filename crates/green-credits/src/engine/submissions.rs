use chrono::{DateTime, Utc};
use rand::Rng;

use super::codes::{drop_off_code, unique_code};
use super::domain::{
    CreditTransaction, Submission, SubmissionId, SubmissionState, SubmissionStatus, UserId,
};
use super::error::CreditsError;
use super::ledger::LedgerPosting;
use super::recommendation::{DeviceAnswers, RecommendationEngine};
use super::state::CreditState;

/// What a user reports about a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    pub user_id: UserId,
    pub category: String,
    pub condition: String,
    pub intent: String,
}

fn invalid(submission: &Submission, operation: &'static str) -> CreditsError {
    let status = submission.status();
    if status.is_final() {
        CreditsError::AlreadyFinalized {
            entity: "submission",
            id: submission.id.to_string(),
            status: status.label(),
        }
    } else {
        CreditsError::InvalidTransition {
            entity: "submission",
            id: submission.id.to_string(),
            operation,
            status: status.label(),
        }
    }
}

impl CreditState {
    pub(crate) fn submission(&self, id: &SubmissionId) -> Result<&Submission, CreditsError> {
        self.submissions
            .get(id)
            .ok_or_else(|| CreditsError::not_found("submission", id))
    }

    fn submission_mut(&mut self, id: &SubmissionId) -> Result<&mut Submission, CreditsError> {
        self.submissions
            .get_mut(id)
            .ok_or_else(|| CreditsError::not_found("submission", id))
    }

    pub(crate) fn create_submission<R: Rng + ?Sized>(
        &mut self,
        request: NewSubmission,
        engine: &RecommendationEngine,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Submission, CreditsError> {
        if request.category.trim().is_empty() {
            return Err(CreditsError::Validation(
                "device category must not be empty".to_string(),
            ));
        }
        self.active_user(&request.user_id)?;

        let recommendation = engine.recommend(&DeviceAnswers {
            device_condition: request.condition.clone(),
            intent: request.intent.clone(),
        });
        let drop_off_code = unique_code(rng, drop_off_code, |code| {
            self.submissions
                .values()
                .any(|existing| existing.drop_off_code == code)
        })
        .ok_or_else(|| {
            CreditsError::Validation("no free drop-off code could be allocated".to_string())
        })?;

        let submission = Submission {
            id: self.sequences.next_submission(),
            user_id: request.user_id,
            category: request.category.trim().to_string(),
            condition: request.condition,
            intent: request.intent,
            recommendation: recommendation.action,
            credits_pending: recommendation.credits,
            drop_off_code,
            created_at: now,
            state: SubmissionState::Pending,
        };
        self.submissions
            .insert(submission.id.clone(), submission.clone());
        Ok(submission)
    }

    pub(crate) fn mark_dropped(
        &mut self,
        id: &SubmissionId,
        now: DateTime<Utc>,
    ) -> Result<Submission, CreditsError> {
        let submission = self.submission_mut(id)?;
        if submission.state != SubmissionState::Pending {
            return Err(invalid(submission, "drop off"));
        }
        submission.state = SubmissionState::Dropped { dropped_at: now };
        Ok(submission.clone())
    }

    /// Complete a dropped submission and credit its owner in the same step.
    pub(crate) fn verify_submission(
        &mut self,
        id: &SubmissionId,
        now: DateTime<Utc>,
    ) -> Result<(Submission, CreditTransaction), CreditsError> {
        let submission = self.submission(id)?;
        let SubmissionState::Dropped { dropped_at } = submission.state else {
            return Err(invalid(submission, "verify"));
        };
        let award = submission.credits_pending;
        let user_id = submission.user_id.clone();
        let description = format!(
            "{}: {}",
            submission.recommendation.label(),
            submission.category
        );

        let txn_id = self.sequences.next_transaction();
        let account = self
            .users
            .get_mut(&user_id)
            .ok_or_else(|| CreditsError::not_found("user", &user_id))?;
        let entry = self.ledger.post(
            txn_id,
            account,
            LedgerPosting::earned(award, id.as_str(), description),
            now,
        )?;

        let submission = self.submission_mut(id)?;
        submission.state = SubmissionState::Completed {
            dropped_at,
            verified_at: now,
            credits_awarded: award,
        };
        Ok((submission.clone(), entry))
    }

    pub(crate) fn reject_submission(
        &mut self,
        id: &SubmissionId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Submission, CreditsError> {
        let submission = self.submission_mut(id)?;
        let SubmissionState::Dropped { dropped_at } = submission.state else {
            return Err(invalid(submission, "reject"));
        };
        submission.state = SubmissionState::Rejected {
            dropped_at,
            rejected_at: now,
            rejected_reason: reason.trim().to_string(),
        };
        Ok(submission.clone())
    }

    /// Submissions for `user_id`, newest first.
    pub(crate) fn submissions_for(&self, user_id: &UserId) -> Vec<Submission> {
        let mut owned: Vec<Submission> = self
            .submissions
            .values()
            .filter(|submission| &submission.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        owned
    }

    /// Admin queue for one status, oldest first.
    pub(crate) fn submissions_by_status(&self, status: SubmissionStatus) -> Vec<Submission> {
        self.submissions
            .values()
            .filter(|submission| submission.status() == status)
            .cloned()
            .collect()
    }

    pub(crate) fn find_by_drop_off_code(&self, code: &str) -> Result<&Submission, CreditsError> {
        let wanted = code.trim();
        self.submissions
            .values()
            .find(|submission| submission.drop_off_code.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CreditsError::not_found("drop-off code", wanted))
    }
}
