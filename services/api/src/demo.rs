use crate::infra::{load_catalog, seeded_store};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use wishlist_rewards::error::AppError;
use wishlist_rewards::rewards::{
    level_for_points, points_required_for_level, progress_to_next_level, AwardResult,
    BadgeAction, BadgeCatalog, CriteriaConfig, InMemoryRewardsStore, OrderStatus,
    RewardsService, RewardsSummary, SellerId, UserId,
};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// User id for the sample journey
    #[arg(long, default_value = "demo-user")]
    pub(crate) user: String,
    /// Badge catalog CSV to use instead of the standard catalog
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Skip the seller and trending wishlist portion of the journey
    #[arg(long)]
    pub(crate) skip_seller: bool,
}

#[derive(Args, Debug)]
pub(crate) struct LevelArgs {
    /// Points balance to report on
    pub(crate) points: u64,
}

pub(crate) fn run_level_report(args: LevelArgs) -> Result<(), AppError> {
    let level = level_for_points(args.points);
    println!("Points: {}", args.points);
    println!("Level: {level}");
    println!(
        "Next level at {} points ({:.1}% of the way there)",
        points_required_for_level(level),
        progress_to_next_level(args.points, level)
    );
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        user,
        catalog,
        skip_seller,
    } = args;

    let catalog = load_catalog(catalog.as_deref())?;
    println!("Wishlist rewards demo ({} badges loaded)", catalog.badges().len());

    let user_id = UserId(user);
    let summary = run_journey(catalog, &user_id, !skip_seller, Utc::now(), render_step)?;
    render_summary(&summary);
    Ok(())
}

/// Scripted activity for one user. Every step mutates the store and then fires
/// the matching action, handing the results to `report`.
pub(crate) fn run_journey<F>(
    catalog: BadgeCatalog,
    user_id: &UserId,
    include_seller: bool,
    now: DateTime<Utc>,
    mut report: F,
) -> Result<RewardsSummary, AppError>
where
    F: FnMut(&str, &[AwardResult]),
{
    let store = seeded_store(catalog);
    store.create_profile(user_id);
    let service = RewardsService::new(Arc::new(store.clone()), CriteriaConfig::default());

    let mut fire = |step: &str, action: BadgeAction| {
        let results = service.check_and_award_badges_at(user_id, action, None, now);
        report(step, &results);
    };

    for index in 1..=5 {
        store.add_wishlist(
            &format!("{user_id}-wishlist-{index}"),
            user_id,
            0,
            now - Duration::days(6 - index),
        );
        fire(
            &format!("Created wishlist #{index}"),
            BadgeAction::CreateWishlist,
        );
    }

    store.record_order(user_id, None, OrderStatus::Pending, now);
    fire("Placed a pending order", BadgeAction::PurchaseGift);
    for index in 1..=5 {
        store.record_order(user_id, None, OrderStatus::Delivered, now);
        fire(
            &format!("Gift #{index} delivered"),
            BadgeAction::PurchaseGift,
        );
    }

    for index in 0..10 {
        store.add_follow(user_id, now - Duration::hours(index));
    }
    fire("Followed 10 friends", BadgeAction::Follow);

    if include_seller {
        seller_steps(&store, user_id, now, &mut fire);
    }

    Ok(service.summary(user_id)?)
}

fn seller_steps<F>(
    store: &InMemoryRewardsStore,
    user_id: &UserId,
    now: DateTime<Utc>,
    fire: &mut F,
) where
    F: FnMut(&str, BadgeAction),
{
    let seller = SellerId(format!("{user_id}-shop"));
    store.register_seller(user_id, seller.clone());
    store.record_order(
        &UserId("demo-buyer".to_string()),
        Some(&seller),
        OrderStatus::Delivered,
        now,
    );
    fire("Completed a first sale", BadgeAction::SellerSales);

    store.add_wishlist(
        "community-favourite",
        &UserId("demo-rival".to_string()),
        1_000,
        now,
    );
    if store
        .set_wishlist_views(&format!("{user_id}-wishlist-1"), 850)
        .is_ok()
    {
        fire("Wishlist reached 850 views", BadgeAction::TopWishlist);
    }
}

fn render_step(step: &str, results: &[AwardResult]) {
    println!("- {step}");
    for result in results {
        let slug = result.badge_slug.as_deref().unwrap_or("<lookup>");
        if let Some(error) = &result.error {
            println!("    ! {slug}: {error}");
        } else if result.awarded {
            println!("    + {slug} awarded (+{} points)", result.points_awarded);
        } else if result.already_has {
            println!("    = {slug} already held");
        }
    }
}

fn render_summary(summary: &RewardsSummary) {
    println!("\nStanding for {}", summary.user_id);
    println!(
        "- {} points | level {} | next level at {} points ({:.1}%)",
        summary.points, summary.level, summary.points_for_next_level, summary.progress
    );
    println!("- {} badges held", summary.badges.len());
    println!("Recent transactions:");
    for transaction in &summary.recent_transactions {
        println!("  - {}: {}", transaction.id, transaction.description);
    }
}
