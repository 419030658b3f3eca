use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    Badge, BadgeAction, BadgeGrant, BadgeId, NewTransaction, OrderStatus, SellerId, Transaction,
    UserId, WishlistId, WishlistViews,
};
use super::leveling::PointsStanding;
use super::repository::{
    ActivityRepository, BadgeRepository, PointsCredit, PointsLedger, RepositoryError,
};

#[derive(Debug, Clone)]
struct WishlistRow {
    id: WishlistId,
    owner: UserId,
    view_count: u64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct OrderRow {
    buyer: UserId,
    seller: Option<SellerId>,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct FollowRow {
    follower: UserId,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreState {
    badges: Vec<Badge>,
    grants: Vec<BadgeGrant>,
    grant_keys: HashSet<(UserId, BadgeId)>,
    standings: HashMap<UserId, PointsStanding>,
    transactions: Vec<Transaction>,
    wishlists: Vec<WishlistRow>,
    orders: Vec<OrderRow>,
    follows: Vec<FollowRow>,
    sellers: BTreeMap<UserId, SellerId>,
}

/// Process-local store backing the API service, demo, and tests.
///
/// Grants are unique per (user, badge); a duplicate insert returns `Conflict`.
#[derive(Default, Clone)]
pub struct InMemoryRewardsStore {
    state: Arc<Mutex<StoreState>>,
}

fn within(created_at: DateTime<Utc>, since: Option<DateTime<Utc>>) -> bool {
    since.map_or(true, |since| created_at >= since)
}

impl InMemoryRewardsStore {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().expect("rewards store mutex poisoned")
    }

    pub fn insert_badge(&self, badge: Badge) {
        let mut state = self.lock();
        state.badges.retain(|existing| existing.id != badge.id);
        state.badges.push(badge);
    }

    pub fn insert_badges(&self, badges: impl IntoIterator<Item = Badge>) {
        for badge in badges {
            self.insert_badge(badge);
        }
    }

    /// Creates a profile with zero points if it does not exist yet.
    pub fn create_profile(&self, user_id: &UserId) {
        self.lock().standings.entry(user_id.clone()).or_default();
    }

    pub fn standing(&self, user_id: &UserId) -> Option<PointsStanding> {
        self.lock().standings.get(user_id).copied()
    }

    pub fn add_wishlist(
        &self,
        id: &str,
        owner: &UserId,
        view_count: u64,
        created_at: DateTime<Utc>,
    ) {
        self.lock().wishlists.push(WishlistRow {
            id: WishlistId(id.to_string()),
            owner: owner.clone(),
            view_count,
            created_at,
        });
    }

    pub fn set_wishlist_views(&self, id: &str, view_count: u64) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let row = state
            .wishlists
            .iter_mut()
            .find(|row| row.id.0 == id)
            .ok_or(RepositoryError::NotFound)?;
        row.view_count = view_count;
        Ok(())
    }

    pub fn record_order(
        &self,
        buyer: &UserId,
        seller: Option<&SellerId>,
        status: OrderStatus,
        created_at: DateTime<Utc>,
    ) {
        self.lock().orders.push(OrderRow {
            buyer: buyer.clone(),
            seller: seller.cloned(),
            status,
            created_at,
        });
    }

    pub fn add_follow(&self, follower: &UserId, created_at: DateTime<Utc>) {
        self.lock().follows.push(FollowRow {
            follower: follower.clone(),
            created_at,
        });
    }

    pub fn register_seller(&self, user_id: &UserId, seller: SellerId) {
        self.lock().sellers.insert(user_id.clone(), seller);
    }

    pub fn grant_count(&self) -> usize {
        self.lock().grants.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.lock().transactions.len()
    }
}

impl BadgeRepository for InMemoryRewardsStore {
    fn badges_for_action(&self, action: BadgeAction) -> Result<Vec<Badge>, RepositoryError> {
        Ok(self
            .lock()
            .badges
            .iter()
            .filter(|badge| badge.criteria.action() == Some(action))
            .cloned()
            .collect())
    }

    fn has_grant(&self, user_id: &UserId, badge_id: &BadgeId) -> Result<bool, RepositoryError> {
        Ok(self
            .lock()
            .grant_keys
            .contains(&(user_id.clone(), badge_id.clone())))
    }

    fn insert_grant(&self, grant: BadgeGrant) -> Result<BadgeGrant, RepositoryError> {
        let mut state = self.lock();
        let key = (grant.user_id.clone(), grant.badge_id.clone());
        if !state.grant_keys.insert(key) {
            return Err(RepositoryError::Conflict);
        }
        state.grants.push(grant.clone());
        Ok(grant)
    }

    fn grants_for_user(&self, user_id: &UserId) -> Result<Vec<BadgeGrant>, RepositoryError> {
        Ok(self
            .lock()
            .grants
            .iter()
            .filter(|grant| &grant.user_id == user_id)
            .cloned()
            .collect())
    }
}

impl ActivityRepository for InMemoryRewardsStore {
    fn count_wishlists(
        &self,
        owner: &UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<u64, RepositoryError> {
        Ok(self
            .lock()
            .wishlists
            .iter()
            .filter(|row| &row.owner == owner && within(row.created_at, since))
            .count() as u64)
    }

    fn count_orders_by_buyer(
        &self,
        buyer: &UserId,
        statuses: &[OrderStatus],
        since: Option<DateTime<Utc>>,
    ) -> Result<u64, RepositoryError> {
        Ok(self
            .lock()
            .orders
            .iter()
            .filter(|row| {
                &row.buyer == buyer
                    && statuses.contains(&row.status)
                    && within(row.created_at, since)
            })
            .count() as u64)
    }

    fn count_following(
        &self,
        follower: &UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<u64, RepositoryError> {
        Ok(self
            .lock()
            .follows
            .iter()
            .filter(|row| &row.follower == follower && within(row.created_at, since))
            .count() as u64)
    }

    fn seller_for_user(&self, user_id: &UserId) -> Result<Option<SellerId>, RepositoryError> {
        Ok(self.lock().sellers.get(user_id).cloned())
    }

    fn count_seller_orders(
        &self,
        seller: &SellerId,
        statuses: &[OrderStatus],
        since: Option<DateTime<Utc>>,
    ) -> Result<u64, RepositoryError> {
        Ok(self
            .lock()
            .orders
            .iter()
            .filter(|row| {
                row.seller.as_ref() == Some(seller)
                    && statuses.contains(&row.status)
                    && within(row.created_at, since)
            })
            .count() as u64)
    }

    fn top_wishlists(
        &self,
        owner: Option<&UserId>,
        limit: usize,
    ) -> Result<Vec<WishlistViews>, RepositoryError> {
        let state = self.lock();
        let mut rows: Vec<WishlistViews> = state
            .wishlists
            .iter()
            .filter(|row| owner.map_or(true, |owner| &row.owner == owner))
            .map(|row| WishlistViews {
                wishlist_id: row.id.clone(),
                owner: row.owner.clone(),
                view_count: row.view_count,
            })
            .collect();
        rows.sort_by(|a, b| b.view_count.cmp(&a.view_count));
        rows.truncate(limit);
        Ok(rows)
    }
}

impl PointsLedger for InMemoryRewardsStore {
    fn fetch_points(&self, user_id: &UserId) -> Result<Option<u64>, RepositoryError> {
        Ok(self
            .lock()
            .standings
            .get(user_id)
            .map(|standing| standing.points()))
    }

    fn store_standing(
        &self,
        user_id: &UserId,
        standing: PointsStanding,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let slot = state
            .standings
            .get_mut(user_id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = standing;
        Ok(())
    }

    fn credit_points(
        &self,
        user_id: &UserId,
        amount: u64,
    ) -> Result<Option<PointsCredit>, RepositoryError> {
        let mut state = self.lock();
        let Some(slot) = state.standings.get_mut(user_id) else {
            return Ok(None);
        };
        let before = *slot;
        *slot = before.credit(amount);
        Ok(Some(PointsCredit {
            before,
            after: *slot,
        }))
    }

    fn append_transaction(
        &self,
        transaction: NewTransaction,
    ) -> Result<Transaction, RepositoryError> {
        let mut state = self.lock();
        let id = format!("txn-{:06}", state.transactions.len() + 1);
        let stored = Transaction {
            id,
            user_id: transaction.user_id,
            kind: transaction.kind,
            amount: transaction.amount,
            source: transaction.source,
            description: transaction.description,
            created_at: transaction.created_at,
        };
        state.transactions.push(stored.clone());
        Ok(stored)
    }

    fn transactions_for_user(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<Transaction>, RepositoryError> {
        Ok(self
            .lock()
            .transactions
            .iter()
            .rev()
            .filter(|transaction| &transaction.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewards::domain::BadgeCriteria;
    use chrono::Duration;

    fn user(id: &str) -> UserId {
        UserId(id.to_string())
    }

    #[test]
    fn duplicate_grant_is_a_conflict() {
        let store = InMemoryRewardsStore::default();
        let grant = BadgeGrant {
            user_id: user("u-1"),
            badge_id: BadgeId("b-1".to_string()),
            granted_at: Utc::now(),
        };
        store.insert_grant(grant.clone()).expect("first insert");
        assert_eq!(store.insert_grant(grant), Err(RepositoryError::Conflict));
        assert_eq!(store.grant_count(), 1);
    }

    #[test]
    fn counts_respect_since_window() {
        let store = InMemoryRewardsStore::default();
        let now = Utc::now();
        let owner = user("u-1");
        store.add_wishlist("w-1", &owner, 0, now - Duration::days(40));
        store.add_wishlist("w-2", &owner, 0, now - Duration::days(2));
        store.add_wishlist("w-3", &user("u-2"), 0, now);

        assert_eq!(store.count_wishlists(&owner, None), Ok(2));
        assert_eq!(
            store.count_wishlists(&owner, Some(now - Duration::days(7))),
            Ok(1)
        );
    }

    #[test]
    fn top_wishlists_sort_by_views() {
        let store = InMemoryRewardsStore::default();
        let now = Utc::now();
        store.add_wishlist("w-1", &user("u-1"), 10, now);
        store.add_wishlist("w-2", &user("u-2"), 50, now);
        store.add_wishlist("w-3", &user("u-1"), 30, now);

        let global = store.top_wishlists(None, 1).expect("query");
        assert_eq!(global[0].view_count, 50);
        let mine = store.top_wishlists(Some(&user("u-1")), 5).expect("query");
        assert_eq!(
            mine.iter().map(|row| row.view_count).collect::<Vec<_>>(),
            vec![30, 10]
        );
    }

    #[test]
    fn badges_filter_by_action_and_replace_by_id() {
        let store = InMemoryRewardsStore::default();
        let mut badge = Badge {
            id: BadgeId("b-1".to_string()),
            slug: "first_follow".to_string(),
            name: "First Follow".to_string(),
            description: String::new(),
            criteria: BadgeCriteria::Follow {
                count: 1,
                period: None,
            },
            points_reward: 10,
        };
        store.insert_badge(badge.clone());
        badge.points_reward = 20;
        store.insert_badge(badge);

        let follow = store
            .badges_for_action(BadgeAction::Follow)
            .expect("query");
        assert_eq!(follow.len(), 1);
        assert_eq!(follow[0].points_reward, 20);
        assert!(store
            .badges_for_action(BadgeAction::PurchaseGift)
            .expect("query")
            .is_empty());
    }

    #[test]
    fn concurrent_credits_are_not_lost() {
        let store = InMemoryRewardsStore::default();
        let owner = user("u-1");
        store.create_profile(&owner);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        store
                            .credit_points(&owner, 3)
                            .expect("credit succeeds")
                            .expect("profile exists");
                    }
                });
            }
        });

        let standing = store.standing(&owner).expect("profile exists");
        assert_eq!(standing.points(), 1_200);
        assert_eq!(standing.level(), 4);
    }

    #[test]
    fn credit_for_missing_profile_is_none() {
        let store = InMemoryRewardsStore::default();
        assert_eq!(store.credit_points(&user("ghost"), 10), Ok(None));
    }

    #[test]
    fn standing_updates_require_a_profile() {
        let store = InMemoryRewardsStore::default();
        let owner = user("u-1");
        assert_eq!(
            store.store_standing(&owner, PointsStanding::from_points(10)),
            Err(RepositoryError::NotFound)
        );
        store.create_profile(&owner);
        store
            .store_standing(&owner, PointsStanding::from_points(10))
            .expect("update");
        assert_eq!(store.fetch_points(&owner), Ok(Some(10)));
    }
}
