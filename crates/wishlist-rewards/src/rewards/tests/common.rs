use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::rewards::domain::{
    Badge, BadgeAction, BadgeCriteria, BadgeGrant, BadgeId, NewTransaction, OrderStatus, Period,
    SellerId, Transaction, UserId, WishlistViews,
};
use crate::rewards::leveling::PointsStanding;
use crate::rewards::memory::InMemoryRewardsStore;
use crate::rewards::repository::{
    ActivityRepository, BadgeRepository, PointsLedger, RepositoryError,
};
use crate::rewards::{CriteriaConfig, RewardsService};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 20, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

pub(super) fn user(id: &str) -> UserId {
    UserId(id.to_string())
}

pub(super) fn badge(slug: &str, criteria: BadgeCriteria, points_reward: u64) -> Badge {
    Badge {
        id: BadgeId(format!("badge-{slug}")),
        slug: slug.to_string(),
        name: slug.replace('_', " "),
        description: String::new(),
        criteria,
        points_reward,
    }
}

pub(super) fn count_badge(
    slug: &str,
    action: BadgeAction,
    count: u64,
    period: Option<Period>,
    points_reward: u64,
) -> Badge {
    badge(
        slug,
        BadgeCriteria::for_action(action, count, period),
        points_reward,
    )
}

/// Store with a single profile and nothing else.
pub(super) fn store_with_profile(user_id: &UserId) -> InMemoryRewardsStore {
    let store = InMemoryRewardsStore::default();
    store.create_profile(user_id);
    store
}

pub(super) fn service_for(store: &InMemoryRewardsStore) -> RewardsService<InMemoryRewardsStore> {
    RewardsService::new(Arc::new(store.clone()), CriteriaConfig::default())
}

pub(super) fn deliver_orders(store: &InMemoryRewardsStore, buyer: &UserId, count: usize) {
    for _ in 0..count {
        store.record_order(buyer, None, OrderStatus::Delivered, days_ago(1));
    }
}

/// Switches for injecting store failures around an in-memory store.
#[derive(Default, Clone)]
pub(super) struct Faults {
    pub(super) badge_lookup: bool,
    pub(super) grant_check_for: Option<BadgeId>,
    pub(super) race_on_insert: bool,
    pub(super) transactions: bool,
    /// Fails follow counts restricted to a period; all-time counts still succeed.
    pub(super) windowed_follow_counts: bool,
}

#[derive(Clone)]
pub(super) struct FaultyStore {
    pub(super) inner: InMemoryRewardsStore,
    pub(super) faults: Faults,
}

impl FaultyStore {
    pub(super) fn new(inner: InMemoryRewardsStore, faults: Faults) -> Self {
        Self { inner, faults }
    }

    pub(super) fn service(&self) -> RewardsService<FaultyStore> {
        RewardsService::new(Arc::new(self.clone()), CriteriaConfig::default())
    }
}

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

impl BadgeRepository for FaultyStore {
    fn badges_for_action(&self, action: BadgeAction) -> Result<Vec<Badge>, RepositoryError> {
        if self.faults.badge_lookup {
            return Err(offline());
        }
        self.inner.badges_for_action(action)
    }

    fn has_grant(&self, user_id: &UserId, badge_id: &BadgeId) -> Result<bool, RepositoryError> {
        if self.faults.grant_check_for.as_ref() == Some(badge_id) {
            return Err(offline());
        }
        if self.faults.race_on_insert {
            return Ok(false);
        }
        self.inner.has_grant(user_id, badge_id)
    }

    fn insert_grant(&self, grant: BadgeGrant) -> Result<BadgeGrant, RepositoryError> {
        if self.faults.race_on_insert {
            // Another trigger already inserted the same grant.
            let _ = self.inner.insert_grant(grant);
            return Err(RepositoryError::Conflict);
        }
        self.inner.insert_grant(grant)
    }

    fn grants_for_user(&self, user_id: &UserId) -> Result<Vec<BadgeGrant>, RepositoryError> {
        self.inner.grants_for_user(user_id)
    }
}

impl ActivityRepository for FaultyStore {
    fn count_wishlists(
        &self,
        owner: &UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<u64, RepositoryError> {
        self.inner.count_wishlists(owner, since)
    }

    fn count_orders_by_buyer(
        &self,
        buyer: &UserId,
        statuses: &[OrderStatus],
        since: Option<DateTime<Utc>>,
    ) -> Result<u64, RepositoryError> {
        self.inner.count_orders_by_buyer(buyer, statuses, since)
    }

    fn count_following(
        &self,
        follower: &UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<u64, RepositoryError> {
        if self.faults.windowed_follow_counts && since.is_some() {
            return Err(offline());
        }
        self.inner.count_following(follower, since)
    }

    fn seller_for_user(&self, user_id: &UserId) -> Result<Option<SellerId>, RepositoryError> {
        self.inner.seller_for_user(user_id)
    }

    fn count_seller_orders(
        &self,
        seller: &SellerId,
        statuses: &[OrderStatus],
        since: Option<DateTime<Utc>>,
    ) -> Result<u64, RepositoryError> {
        self.inner.count_seller_orders(seller, statuses, since)
    }

    fn top_wishlists(
        &self,
        owner: Option<&UserId>,
        limit: usize,
    ) -> Result<Vec<WishlistViews>, RepositoryError> {
        self.inner.top_wishlists(owner, limit)
    }
}

impl PointsLedger for FaultyStore {
    fn fetch_points(&self, user_id: &UserId) -> Result<Option<u64>, RepositoryError> {
        self.inner.fetch_points(user_id)
    }

    fn store_standing(
        &self,
        user_id: &UserId,
        standing: PointsStanding,
    ) -> Result<(), RepositoryError> {
        self.inner.store_standing(user_id, standing)
    }

    fn append_transaction(
        &self,
        transaction: NewTransaction,
    ) -> Result<Transaction, RepositoryError> {
        if self.faults.transactions {
            return Err(offline());
        }
        self.inner.append_transaction(transaction)
    }

    fn transactions_for_user(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<Transaction>, RepositoryError> {
        self.inner.transactions_for_user(user_id, limit)
    }
}
