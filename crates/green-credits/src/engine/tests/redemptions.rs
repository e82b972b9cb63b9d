use super::common::*;
use chrono::Duration;

use crate::engine::{
    Collection, CreditsError, PersistenceAdapter, RedemptionId, RedemptionStatus, RedemptionType,
    RewardId, Stock, Tier, TransactionType, User, REDEMPTION_VALIDITY_DAYS,
};

#[test]
fn rejected_redemption_refunds_the_full_cost() {
    let h = harness();
    let user = register(&h.service, "Katherine");
    fund(&h.service, &user.id, 1550);
    let reward = add_reward(
        &h.service,
        "Tree planted in your name",
        150,
        Tier::Gold,
        Stock::Limited(10),
        RedemptionType::RequiresApproval,
    );

    let redemption = h.service.redeem(&user.id, &reward.id).expect("redeemed");
    assert_eq!(redemption.status(), RedemptionStatus::Pending);
    assert_eq!(redemption.redemption_code(), None);
    assert_eq!(redemption.notes.as_deref(), Some("Valid on campus only"));
    assert_eq!(h.service.balance_of(&user.id).unwrap(), 1400);
    assert_eq!(
        h.service.reward(&reward.id).unwrap().stock,
        Stock::Limited(9)
    );

    let rejected = h
        .service
        .reject_redemption(&redemption.id)
        .expect("rejected");
    assert_eq!(rejected.status(), RedemptionStatus::Rejected);
    assert_eq!(h.service.balance_of(&user.id).unwrap(), 1550);

    let related: Vec<_> = h
        .service
        .history(&user.id)
        .unwrap()
        .into_iter()
        .filter(|entry| entry.reference_id.as_deref() == Some(redemption.id.as_str()))
        .collect();
    assert_eq!(related.len(), 2);
    assert_eq!(related[0].kind, TransactionType::Refunded);
    assert_eq!(related[0].amount, 150);
    assert_eq!(related[0].balance, 1550);
    assert_eq!(related[1].kind, TransactionType::Spent);
    assert_eq!(related[1].amount, -150);
    assert_eq!(related[1].balance, 1400);

    // stock stays consumed after a refund
    assert_eq!(
        h.service.reward(&reward.id).unwrap().stock,
        Stock::Limited(9)
    );
}

#[test]
fn tier_gate_reopens_once_the_same_user_reaches_silver() {
    let h = harness();
    let user = register(&h.service, "Annie");
    fund(&h.service, &user.id, 360);
    completed_submission(&h.service, &user.id);
    assert_eq!(h.service.balance_of(&user.id).unwrap(), 400);
    let reward = add_reward(
        &h.service,
        "Reusable bottle",
        100,
        Tier::Silver,
        Stock::Unlimited,
        RedemptionType::Instant,
    );

    let err = h.service.redeem(&user.id, &reward.id).unwrap_err();
    assert!(matches!(
        err,
        CreditsError::TierLocked {
            required: Tier::Silver,
            current: Tier::Bronze
        }
    ));
    assert_eq!(h.service.balance_of(&user.id).unwrap(), 400);
    assert_eq!(h.service.history(&user.id).unwrap().len(), 2);

    h.service
        .grant_bonus(&user.id, 100, "Repair cafe volunteer")
        .expect("bonus posts");
    assert_eq!(h.service.user_summary(&user.id).unwrap().tier, Tier::Silver);

    let redemption = h.service.redeem(&user.id, &reward.id).expect("silver redeems");
    assert_eq!(redemption.status(), RedemptionStatus::Approved);
    assert_eq!(h.service.balance_of(&user.id).unwrap(), 400);
    assert_eq!(h.service.history(&user.id).unwrap().len(), 4);
    assert_eq!(
        h.service.reward(&reward.id).unwrap().stock,
        Stock::Unlimited
    );
}

#[test]
fn last_unit_goes_to_the_first_claimant() {
    let h = harness();
    let first = register(&h.service, "Frances");
    let second = register(&h.service, "Jean");
    fund(&h.service, &first.id, 300);
    fund(&h.service, &second.id, 300);
    let reward = add_reward(
        &h.service,
        "Campus cafe voucher",
        200,
        Tier::Bronze,
        Stock::Limited(1),
        RedemptionType::Instant,
    );

    h.service.redeem(&first.id, &reward.id).expect("first claim");
    assert_eq!(
        h.service.reward(&reward.id).unwrap().stock,
        Stock::Limited(0)
    );

    let err = h.service.redeem(&second.id, &reward.id).unwrap_err();
    assert!(matches!(err, CreditsError::OutOfStock { .. }));
    assert_eq!(h.service.balance_of(&second.id).unwrap(), 300);
    assert!(h.service.redemptions_for(&second.id).unwrap().is_empty());
}

#[test]
fn checks_report_the_first_failure_in_order() {
    let h = harness();
    let user = register(&h.service, "Radia");
    fund(&h.service, &user.id, 50);
    let locked_and_empty = add_reward(
        &h.service,
        "Gold lanyard",
        500,
        Tier::Gold,
        Stock::Limited(0),
        RedemptionType::Instant,
    );
    let empty = add_reward(
        &h.service,
        "Sticker pack",
        500,
        Tier::Bronze,
        Stock::Limited(0),
        RedemptionType::Instant,
    );
    let pricey = add_reward(
        &h.service,
        "Hoodie",
        500,
        Tier::Bronze,
        Stock::Limited(5),
        RedemptionType::Instant,
    );

    assert!(matches!(
        h.service.redeem(&user.id, &RewardId::from("rwd-404404")),
        Err(CreditsError::NotFound { entity: "reward", .. })
    ));
    assert!(matches!(
        h.service.redeem(&user.id, &locked_and_empty.id),
        Err(CreditsError::TierLocked { .. })
    ));
    assert!(matches!(
        h.service.redeem(&user.id, &empty.id),
        Err(CreditsError::OutOfStock { .. })
    ));
    assert!(matches!(
        h.service.redeem(&user.id, &pricey.id),
        Err(CreditsError::InsufficientCredits {
            required: 500,
            available: 50
        })
    ));
    assert_eq!(h.service.balance_of(&user.id).unwrap(), 50);
    assert_eq!(h.service.history(&user.id).unwrap().len(), 1);
    assert_eq!(h.service.reward(&pricey.id).unwrap().stock, Stock::Limited(5));
    assert_eq!(h.service.reward(&empty.id).unwrap().stock, Stock::Limited(0));
    assert!(h.service.redemptions_for(&user.id).unwrap().is_empty());
}

#[test]
fn instant_rewards_carry_a_code_valid_for_thirty_days() {
    let h = harness();
    let user = register(&h.service, "Sophie");
    fund(&h.service, &user.id, 100);
    let reward = add_reward(
        &h.service,
        "Thank-you badge",
        0,
        Tier::Bronze,
        Stock::Unlimited,
        RedemptionType::Instant,
    );

    let redemption = h.service.redeem(&user.id, &reward.id).unwrap();
    let code = redemption.redemption_code().expect("instant rewards get a code");
    assert!(code.starts_with("ECO-"));
    assert_eq!(code.len(), 10);
    assert!(code[4..]
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    assert_eq!(
        redemption.expires_at(),
        Some(start() + Duration::days(REDEMPTION_VALIDITY_DAYS))
    );
    assert_eq!(h.service.balance_of(&user.id).unwrap(), 100);
}

fn pending_claim(h: &Harness) -> (User, RedemptionId) {
    let user = register(&h.service, "Hopper");
    fund(&h.service, &user.id, 600);
    let reward = add_reward(
        &h.service,
        "Lab tour",
        250,
        Tier::Silver,
        Stock::Limited(5),
        RedemptionType::Scheduled,
    );
    let redemption = h.service.redeem(&user.id, &reward.id).unwrap();
    assert_eq!(redemption.status(), RedemptionStatus::Pending);
    (user, redemption.id)
}

#[test]
fn approval_then_fulfilment() {
    let h = harness();
    let (user, id) = pending_claim(&h);
    assert_eq!(h.service.pending_redemptions().unwrap().len(), 1);

    h.clock.advance(Duration::days(2));
    let approved = h.service.approve_redemption(&id).expect("approved");
    assert_eq!(approved.status(), RedemptionStatus::Approved);
    assert!(approved.redemption_code().is_some());
    assert_eq!(
        approved.expires_at(),
        Some(start() + Duration::days(2 + REDEMPTION_VALIDITY_DAYS))
    );
    assert!(h.service.pending_redemptions().unwrap().is_empty());

    let err = h.service.reject_redemption(&id).unwrap_err();
    assert!(matches!(err, CreditsError::InvalidTransition { .. }));
    assert_eq!(h.service.balance_of(&user.id).unwrap(), 350);

    let fulfilled = h.service.fulfill_redemption(&id).expect("handed over");
    assert_eq!(fulfilled.status(), RedemptionStatus::Fulfilled);
    assert_eq!(fulfilled.redemption_code(), approved.redemption_code());

    let err = h.service.approve_redemption(&id).unwrap_err();
    assert!(matches!(err, CreditsError::AlreadyFinalized { .. }));
}

#[test]
fn pending_claims_cannot_be_fulfilled() {
    let h = harness();
    let (_, id) = pending_claim(&h);
    let err = h.service.fulfill_redemption(&id).unwrap_err();
    assert!(matches!(
        err,
        CreditsError::InvalidTransition { status: "pending", .. }
    ));
}

#[test]
fn owner_can_cancel_a_pending_claim() {
    let h = harness();
    let (user, id) = pending_claim(&h);
    let stranger = register(&h.service, "Mallory");

    let err = h.service.cancel_redemption(&stranger.id, &id).unwrap_err();
    assert!(matches!(err, CreditsError::NotFound { .. }));

    let cancelled = h.service.cancel_redemption(&user.id, &id).expect("cancelled");
    assert_eq!(cancelled.status(), RedemptionStatus::Cancelled);
    assert_eq!(h.service.balance_of(&user.id).unwrap(), 600);

    let err = h.service.reject_redemption(&id).unwrap_err();
    assert!(matches!(
        err,
        CreditsError::AlreadyFinalized { status: "cancelled", .. }
    ));
    assert_eq!(h.service.balance_of(&user.id).unwrap(), 600);
}

#[test]
fn suspended_accounts_cannot_redeem() {
    let h = harness();
    let user = register(&h.service, "Eve");
    fund(&h.service, &user.id, 100);
    let reward = add_reward(
        &h.service,
        "Sticker",
        10,
        Tier::Bronze,
        Stock::Unlimited,
        RedemptionType::Instant,
    );
    h.service.suspend_user(&user.id).unwrap();

    let err = h.service.redeem(&user.id, &reward.id).unwrap_err();
    assert!(matches!(err, CreditsError::AccountSuspended(_)));
}

#[test]
fn failed_persist_leaves_no_trace() {
    let (service, store) = flaky_service(Collection::UserRedemptions);
    let user = service
        .register_user(crate::engine::NewUser {
            name: "Barbara".to_string(),
            email: "barbara@campus.example".to_string(),
            role: crate::engine::Role::User,
        })
        .unwrap();
    service.grant_bonus(&user.id, 500, "Opening balance").unwrap();
    let reward = service
        .create_reward(draft(
            "Plant pot",
            100,
            Tier::Silver,
            Stock::Limited(3),
            RedemptionType::Instant,
        ))
        .unwrap();

    store.arm();
    let err = service.redeem(&user.id, &reward.id).unwrap_err();
    assert!(matches!(err, CreditsError::Store(_)));

    assert_eq!(service.balance_of(&user.id).unwrap(), 500);
    assert_eq!(service.reward(&reward.id).unwrap().stock, Stock::Limited(3));
    assert_eq!(service.history(&user.id).unwrap().len(), 1);
    assert!(service.redemptions_for(&user.id).unwrap().is_empty());
    assert!(service.verify_consistency().unwrap().is_empty());

    let stored_users = store.load(Collection::Users).unwrap();
    assert_eq!(stored_users[0]["points"], 500);
    assert_eq!(store.load(Collection::CreditTransactions).unwrap().len(), 1);

    store.disarm();
    let redemption = service.redeem(&user.id, &reward.id).expect("store is back");
    assert_eq!(redemption.id.as_str(), "rdm-000001");
    assert_eq!(service.balance_of(&user.id).unwrap(), 400);
}
