use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::domain::{
    BadgeCriteria, Period, UserId, COMPLETED_SALE_STATUSES, PURCHASED_STATUSES,
};
use super::repository::{ActivityRepository, RepositoryError};

/// Default share of the global top view count a wishlist needs to count as trending.
pub const DEFAULT_TOP_WISHLIST_PERCENT: u8 = 80;

/// Tunables for criteria evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CriteriaConfig {
    pub top_wishlist_percent: u8,
}

impl Default for CriteriaConfig {
    fn default() -> Self {
        Self {
            top_wishlist_percent: DEFAULT_TOP_WISHLIST_PERCENT,
        }
    }
}

/// Decides whether a user currently satisfies badge criteria, reading counts fresh
/// from the activity repository on every call.
pub struct CriteriaEvaluator<A> {
    activity: Arc<A>,
    config: CriteriaConfig,
}

impl<A> CriteriaEvaluator<A>
where
    A: ActivityRepository,
{
    pub fn new(activity: Arc<A>, config: CriteriaConfig) -> Self {
        Self { activity, config }
    }

    pub fn is_met(
        &self,
        user_id: &UserId,
        criteria: &BadgeCriteria,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let since = |period: &Option<Period>| period.map(|period| period.window_start(now));

        match criteria {
            BadgeCriteria::CreateWishlist { count, period } => {
                let owned = self.activity.count_wishlists(user_id, since(period))?;
                Ok(meets_count("create_wishlist", user_id, owned, *count))
            }
            BadgeCriteria::PurchaseGift { count, period } => {
                let purchased = self.activity.count_orders_by_buyer(
                    user_id,
                    &PURCHASED_STATUSES,
                    since(period),
                )?;
                Ok(meets_count("purchase_gift", user_id, purchased, *count))
            }
            BadgeCriteria::Follow { count, period } => {
                let following = self.activity.count_following(user_id, since(period))?;
                Ok(meets_count("follow", user_id, following, *count))
            }
            BadgeCriteria::SellerSales { count, period } => {
                let Some(seller) = self.activity.seller_for_user(user_id)? else {
                    debug!(user = %user_id, "no seller record; seller_sales not met");
                    return Ok(false);
                };
                let delivered = self.activity.count_seller_orders(
                    &seller,
                    &COMPLETED_SALE_STATUSES,
                    since(period),
                )?;
                Ok(meets_count("seller_sales", user_id, delivered, *count))
            }
            BadgeCriteria::TopWishlist => self.has_top_wishlist(user_id),
            BadgeCriteria::Unrecognized => {
                debug!(user = %user_id, "unrecognized criteria never qualify");
                Ok(false)
            }
        }
    }

    fn has_top_wishlist(&self, user_id: &UserId) -> Result<bool, RepositoryError> {
        let Some(user_best) = self.activity.top_wishlists(Some(user_id), 1)?.into_iter().next()
        else {
            debug!(user = %user_id, "user has no wishlists; top_wishlist not met");
            return Ok(false);
        };
        let Some(global_best) = self.activity.top_wishlists(None, 1)?.into_iter().next() else {
            return Ok(false);
        };

        let percent = u128::from(self.config.top_wishlist_percent);
        let met = u128::from(user_best.view_count) * 100
            >= u128::from(global_best.view_count) * percent;
        debug!(
            user = %user_id,
            user_views = user_best.view_count,
            top_views = global_best.view_count,
            percent = self.config.top_wishlist_percent,
            met,
            "top_wishlist evaluated"
        );
        Ok(met)
    }
}

fn meets_count(kind: &'static str, user_id: &UserId, actual: u64, required: u64) -> bool {
    let met = actual >= required;
    debug!(user = %user_id, criteria = kind, actual, required, met, "count criteria evaluated");
    met
}
