use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{AwardResult, Badge, BadgeGrant, UserId};
use super::points::PointsAwarder;
use super::repository::{BadgeRepository, PointsLedger, RepositoryError};

/// Records badge grants at most once per (user, badge) and credits their rewards.
pub struct AwardLedger<B, P> {
    badges: Arc<B>,
    points: PointsAwarder<P>,
}

impl<B, P> AwardLedger<B, P>
where
    B: BadgeRepository,
    P: PointsLedger,
{
    pub fn new(badges: Arc<B>, ledger: Arc<P>) -> Self {
        Self {
            badges,
            points: PointsAwarder::new(ledger),
        }
    }

    pub fn points(&self) -> &PointsAwarder<P> {
        &self.points
    }

    /// Grants `badge` to the user. Call only after the criteria have been confirmed.
    ///
    /// The store's uniqueness constraint is authoritative: a `Conflict` on insert means
    /// another trigger won the race and is reported as `already_has`.
    pub fn award(
        &self,
        user_id: &UserId,
        badge: &Badge,
        now: DateTime<Utc>,
    ) -> Result<AwardResult, RepositoryError> {
        if self.badges.has_grant(user_id, &badge.id)? {
            return Ok(AwardResult::already_has(badge));
        }

        let grant = BadgeGrant {
            user_id: user_id.clone(),
            badge_id: badge.id.clone(),
            granted_at: now,
        };
        match self.badges.insert_grant(grant) {
            Ok(_) => {}
            Err(RepositoryError::Conflict) => {
                info!(user = %user_id, badge = %badge.slug, "grant raced with a concurrent award");
                return Ok(AwardResult::already_has(badge));
            }
            Err(err) => return Err(err),
        }
        info!(user = %user_id, badge = %badge.slug, "badge granted");

        if badge.points_reward == 0 {
            return Ok(AwardResult::awarded(badge, 0));
        }

        let source = badge.points_source();
        match self.points.award(user_id, badge.points_reward, &source, now) {
            Ok(Some(_)) => Ok(AwardResult::awarded(badge, badge.points_reward)),
            Ok(None) => Ok(AwardResult::awarded(badge, 0)),
            Err(err) => {
                warn!(
                    user = %user_id,
                    badge = %badge.slug,
                    amount = badge.points_reward,
                    error = %err,
                    "badge granted but points were not credited"
                );
                Ok(AwardResult {
                    error: Some(format!("points not credited: {err}")),
                    ..AwardResult::awarded(badge, 0)
                })
            }
        }
    }
}
