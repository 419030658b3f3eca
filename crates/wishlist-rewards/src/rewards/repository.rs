use chrono::{DateTime, Utc};

use super::domain::{
    Badge, BadgeAction, BadgeGrant, BadgeId, NewTransaction, OrderStatus, SellerId, Transaction,
    UserId, WishlistViews,
};
use super::leveling::PointsStanding;

/// Badge definitions and the grants recorded against them.
pub trait BadgeRepository: Send + Sync {
    fn badges_for_action(&self, action: BadgeAction) -> Result<Vec<Badge>, RepositoryError>;
    fn has_grant(&self, user_id: &UserId, badge_id: &BadgeId) -> Result<bool, RepositoryError>;
    /// Must reject a second grant for the same (user, badge) with `RepositoryError::Conflict`.
    fn insert_grant(&self, grant: BadgeGrant) -> Result<BadgeGrant, RepositoryError>;
    fn grants_for_user(&self, user_id: &UserId) -> Result<Vec<BadgeGrant>, RepositoryError>;
}

/// Read-only counters over the app's wishlists, orders, follows, and sellers.
///
/// `since` restricts counts to records created at or after the given instant.
pub trait ActivityRepository: Send + Sync {
    fn count_wishlists(
        &self,
        owner: &UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<u64, RepositoryError>;

    fn count_orders_by_buyer(
        &self,
        buyer: &UserId,
        statuses: &[OrderStatus],
        since: Option<DateTime<Utc>>,
    ) -> Result<u64, RepositoryError>;

    fn count_following(
        &self,
        follower: &UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<u64, RepositoryError>;

    fn seller_for_user(&self, user_id: &UserId) -> Result<Option<SellerId>, RepositoryError>;

    fn count_seller_orders(
        &self,
        seller: &SellerId,
        statuses: &[OrderStatus],
        since: Option<DateTime<Utc>>,
    ) -> Result<u64, RepositoryError>;

    /// Wishlists ordered by descending view count, optionally limited to one owner.
    fn top_wishlists(
        &self,
        owner: Option<&UserId>,
        limit: usize,
    ) -> Result<Vec<WishlistViews>, RepositoryError>;
}

/// Profile points and the transaction audit log.
pub trait PointsLedger: Send + Sync {
    /// Current cumulative points, or `None` when the profile does not exist.
    fn fetch_points(&self, user_id: &UserId) -> Result<Option<u64>, RepositoryError>;
    fn store_standing(
        &self,
        user_id: &UserId,
        standing: PointsStanding,
    ) -> Result<(), RepositoryError>;
    fn append_transaction(
        &self,
        transaction: NewTransaction,
    ) -> Result<Transaction, RepositoryError>;
    /// Most recent transactions first.
    fn transactions_for_user(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<Transaction>, RepositoryError>;

    /// Adds `amount` to the user's points and stores the re-derived standing.
    /// Returns `None` when the profile does not exist.
    ///
    /// The default is a separate read and write, so concurrent credits for the same user
    /// can lose one another. Stores able to update in place should override it.
    fn credit_points(
        &self,
        user_id: &UserId,
        amount: u64,
    ) -> Result<Option<PointsCredit>, RepositoryError> {
        let Some(points) = self.fetch_points(user_id)? else {
            return Ok(None);
        };
        let before = PointsStanding::from_points(points);
        let after = before.credit(amount);
        self.store_standing(user_id, after)?;
        Ok(Some(PointsCredit { before, after }))
    }
}

/// Standing on either side of a points credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointsCredit {
    pub before: PointsStanding,
    pub after: PointsStanding,
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
