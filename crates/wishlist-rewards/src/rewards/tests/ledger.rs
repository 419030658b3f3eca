use std::sync::Arc;

use super::common::*;
use crate::rewards::domain::{BadgeAction, TransactionKind};
use crate::rewards::ledger::AwardLedger;
use crate::rewards::leveling::level_for_points;
use crate::rewards::memory::InMemoryRewardsStore;
use crate::rewards::points::PointsAwarder;
use crate::rewards::repository::PointsLedger;

fn ledger(store: &InMemoryRewardsStore) -> AwardLedger<InMemoryRewardsStore, InMemoryRewardsStore> {
    AwardLedger::new(Arc::new(store.clone()), Arc::new(store.clone()))
}

#[test]
fn award_records_grant_and_credits_points() {
    let owner = user("u-1");
    let store = store_with_profile(&owner);
    let badge = count_badge("first_wishlist", BadgeAction::CreateWishlist, 1, None, 120);

    let result = ledger(&store)
        .award(&owner, &badge, now())
        .expect("award succeeds");

    assert!(result.awarded);
    assert!(!result.already_has);
    assert_eq!(result.points_awarded, 120);
    assert_eq!(store.grant_count(), 1);

    let standing = store.standing(&owner).expect("profile exists");
    assert_eq!(standing.points(), 120);
    assert_eq!(standing.level(), 2);

    let transactions = store
        .transactions_for_user(&owner, 10)
        .expect("transactions load");
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].kind, TransactionKind::Earn);
    assert_eq!(transactions[0].source, "badge_first_wishlist");
    assert_eq!(
        transactions[0].description,
        "Earned 120 points from badge_first_wishlist"
    );
}

#[test]
fn award_is_at_most_once_per_badge() {
    let owner = user("u-1");
    let store = store_with_profile(&owner);
    let badge = count_badge("first_gift", BadgeAction::PurchaseGift, 1, None, 100);
    let ledger = ledger(&store);

    assert!(ledger.award(&owner, &badge, now()).expect("first").awarded);
    let second = ledger.award(&owner, &badge, now()).expect("second");

    assert!(!second.awarded);
    assert!(second.already_has);
    assert_eq!(store.grant_count(), 1);
    assert_eq!(store.transaction_count(), 1);
    assert_eq!(store.standing(&owner).expect("profile").points(), 100);
}

#[test]
fn insert_conflict_reports_already_has() {
    let owner = user("u-1");
    let store = FaultyStore::new(
        store_with_profile(&owner),
        Faults {
            race_on_insert: true,
            ..Faults::default()
        },
    );
    let shared = Arc::new(store.clone());
    let ledger = AwardLedger::new(shared.clone(), shared);
    let badge = count_badge("first_follow", BadgeAction::Follow, 1, None, 25);

    let result = ledger.award(&owner, &badge, now()).expect("award resolves");

    assert!(result.already_has);
    assert!(!result.awarded);
    assert_eq!(store.inner.transaction_count(), 0);
    assert_eq!(store.inner.standing(&owner).expect("profile").points(), 0);
}

#[test]
fn zero_reward_badges_skip_points() {
    let owner = user("u-1");
    let store = store_with_profile(&owner);
    let badge = count_badge("lurker", BadgeAction::Follow, 1, None, 0);

    let result = ledger(&store).award(&owner, &badge, now()).expect("award");

    assert!(result.awarded);
    assert_eq!(result.points_awarded, 0);
    assert_eq!(store.transaction_count(), 0);
}

#[test]
fn grant_stands_when_points_cannot_be_recorded() {
    let owner = user("u-1");
    let store = FaultyStore::new(
        store_with_profile(&owner),
        Faults {
            transactions: true,
            ..Faults::default()
        },
    );
    let shared = Arc::new(store.clone());
    let ledger = AwardLedger::new(shared.clone(), shared);
    let badge = count_badge("first_sale", BadgeAction::SellerSales, 1, None, 100);

    let result = ledger.award(&owner, &badge, now()).expect("award resolves");

    assert!(result.awarded);
    assert_eq!(result.points_awarded, 0);
    assert!(result
        .error
        .as_deref()
        .expect("crediting error reported")
        .contains("points not credited"));
    assert_eq!(store.inner.grant_count(), 1);
}

#[test]
fn award_points_is_noop_for_unknown_user() {
    let store = InMemoryRewardsStore::default();
    let awarder = PointsAwarder::new(Arc::new(store.clone()));

    let outcome = awarder
        .award(&user("ghost"), 50, "promo", now())
        .expect("no error for unknown user");

    assert!(outcome.is_none());
    assert_eq!(store.transaction_count(), 0);
}

#[test]
fn award_points_keeps_level_in_step_with_points() {
    let owner = user("u-1");
    let store = store_with_profile(&owner);
    let awarder = PointsAwarder::new(Arc::new(store.clone()));

    for amount in [30, 70, 250, 49, 1, 500, 3_000] {
        let standing = awarder
            .award(&owner, amount, "promo", now())
            .expect("award succeeds")
            .expect("profile exists");
        let persisted = store.standing(&owner).expect("profile exists");
        assert_eq!(persisted, standing);
        assert_eq!(persisted.level(), level_for_points(persisted.points()));
    }

    let persisted = store.standing(&owner).expect("profile exists");
    assert_eq!(persisted.points(), 3_900);
    assert_eq!(persisted.level(), 7);
    assert_eq!(store.transaction_count(), 7);
}
