use crate::infra::{seed_catalog, ConfiguredStore};
use clap::Args;
use green_credits::engine::{
    ActivityPublisher, CreditsError, DeviceAnswers, EngineSettings, GreenCreditsService,
    MemoryActivityFeed, NewSubmission, NewUser, PersistenceAdapter, Reward, Role, Submission,
    User, UserId,
};
use green_credits::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Persist the demo run as JSON files under this directory instead of memory.
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
    /// Number of activity entries to print at the end.
    #[arg(long, default_value_t = 12)]
    pub(crate) activity: usize,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { data_dir, activity } = args;

    let store = ConfiguredStore::open(data_dir.as_deref()).map_err(CreditsError::from)?;
    let feed = Arc::new(MemoryActivityFeed::default());
    let service = GreenCreditsService::open(Arc::new(store), feed, EngineSettings::default())?;
    seed_catalog(&service)?;

    println!("Green Credits demo");
    println!("\nRewards catalog");
    for reward in service.list_rewards()? {
        print_reward(&reward);
    }

    let priya = register(&service, "Priya Raman", "priya.raman@uni.example")?;
    let tom = register(&service, "Tom Okafor", "tom.okafor@uni.example")?;

    println!("\nDrop-offs");
    for category in ["Laptop", "Phone charger", "Monitor"] {
        let submission = recycle(
            &service,
            &priya.id,
            category,
            "No, it's broken",
            "Formally recycle it",
        )?;
        print_submission(&submission);
    }
    let donated = recycle(&service, &tom.id, "Tablet", "Yes, perfectly", "Donate it")?;
    print_submission(&donated);

    let questionable = service.create_submission(NewSubmission {
        user_id: tom.id.clone(),
        category: "Smart watch".to_string(),
        condition: "Partially".to_string(),
        intent: "Formally recycle it".to_string(),
    })?;
    service.mark_dropped(&questionable.id)?;
    let rejected = service.reject_submission(&questionable.id, "Nothing found in the bin")?;
    print_submission(&rejected);

    service.grant_bonus(&priya.id, 400, "Green week volunteer")?;
    print_standing(&service, &priya.id)?;
    print_standing(&service, &tom.id)?;

    println!("\nRedemptions");
    let rewards = service.list_rewards()?;
    let bottle = find_reward(&rewards, "Reusable bottle")?;
    let voucher = find_reward(&rewards, "Campus cafe voucher")?;

    let claim = service.redeem(&priya.id, &bottle.id)?;
    println!(
        "  {} claimed {} ({})",
        priya.name,
        claim.reward_name,
        claim.status().label()
    );
    let approved = service.approve_redemption(&claim.id)?;
    println!(
        "  approved with code {}",
        approved.redemption_code().unwrap_or("-")
    );
    service.fulfill_redemption(&claim.id)?;

    report_attempt(&service, &priya, voucher);
    report_attempt(&service, &tom, bottle);

    print_standing(&service, &priya.id)?;
    print_standing(&service, &tom.id)?;

    let overview = service.admin_overview()?;
    println!("\nProgramme overview");
    println!("  users:                  {}", overview.users);
    for (status, count) in &overview.submissions_by_status {
        println!("  submissions {status:<10} {count}");
    }
    println!("  pending redemptions:    {}", overview.pending_redemptions);
    println!("  credits awarded:        {}", overview.credits_awarded);
    println!("  credits in circulation: {}", overview.credits_in_circulation);

    let drift = service.verify_consistency()?;
    println!(
        "  ledger consistent:      {}",
        if drift.is_empty() { "yes" } else { "NO" }
    );

    println!("\nRecent activity");
    for entry in service.activity_log(activity)? {
        println!(
            "  {} {:<22} {:<12} {}",
            entry.timestamp.format("%H:%M:%S"),
            entry.action,
            entry.target_id,
            entry.details
        );
    }

    Ok(())
}

fn register<P, A>(
    service: &GreenCreditsService<P, A>,
    name: &str,
    email: &str,
) -> Result<User, CreditsError>
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    // a persisted demo directory keeps its accounts between runs
    if let Some(existing) = service
        .list_users()?
        .into_iter()
        .find(|user| user.email == email)
    {
        return Ok(existing);
    }
    service.register_user(NewUser {
        name: name.to_string(),
        email: email.to_string(),
        role: Role::User,
    })
}

fn recycle<P, A>(
    service: &GreenCreditsService<P, A>,
    user_id: &UserId,
    category: &str,
    condition: &str,
    intent: &str,
) -> Result<Submission, CreditsError>
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    let recommendation = service.recommend(&DeviceAnswers {
        device_condition: condition.to_string(),
        intent: intent.to_string(),
    });
    println!(
        "  {category}: {} for {} credits",
        recommendation.action.label(),
        recommendation.credits
    );

    let submission = service.create_submission(NewSubmission {
        user_id: user_id.clone(),
        category: category.to_string(),
        condition: condition.to_string(),
        intent: intent.to_string(),
    })?;
    service.mark_dropped(&submission.id)?;
    service.verify_submission(&submission.id)
}

fn find_reward<'a>(rewards: &'a [Reward], name: &str) -> Result<&'a Reward, CreditsError> {
    rewards
        .iter()
        .find(|reward| reward.name == name)
        .ok_or_else(|| CreditsError::Validation(format!("demo catalog has no '{name}'")))
}

fn report_attempt<P, A>(service: &GreenCreditsService<P, A>, user: &User, reward: &Reward)
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    match service.redeem(&user.id, &reward.id) {
        Ok(redemption) => println!(
            "  {} claimed {} ({})",
            user.name,
            redemption.reward_name,
            redemption.status().label()
        ),
        Err(err) => println!("  {} could not claim {}: {err}", user.name, reward.name),
    }
}

fn print_reward(reward: &Reward) {
    println!(
        "  {:<28} {:>5} credits  min tier {:<8} stock {}",
        reward.name,
        reward.credit_cost,
        reward.min_tier.label(),
        serde_json::to_string(&reward.stock).unwrap_or_default()
    );
}

fn print_submission(submission: &Submission) {
    println!(
        "    {} {} [{}] code {} -> {} credits",
        submission.id,
        submission.category,
        submission.status().label(),
        submission.drop_off_code,
        submission.credits_awarded()
    );
}

fn print_standing<P, A>(
    service: &GreenCreditsService<P, A>,
    user_id: &UserId,
) -> Result<(), CreditsError>
where
    P: PersistenceAdapter + 'static,
    A: ActivityPublisher + 'static,
{
    let user = service.user(user_id)?;
    let summary = service.user_summary(user_id)?;
    let next = summary
        .next_tier
        .map(|next| format!("{} more for {}", next.points_needed, next.tier.label()))
        .unwrap_or_else(|| "top tier".to_string());
    println!(
        "\n{}: {} credits, {} tier ({}% through, {next})",
        user.name,
        summary.points,
        summary.tier.label(),
        summary.tier_progress
    );
    for entry in service.history(user_id)?.iter().take(4) {
        println!(
            "    {:<9} {:>5}  balance {:>5}  {}",
            entry.kind.label(),
            entry.amount,
            entry.balance,
            entry.description
        );
    }
    Ok(())
}
