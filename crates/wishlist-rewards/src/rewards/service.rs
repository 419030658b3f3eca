use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info_span, warn};

use super::criteria::{CriteriaConfig, CriteriaEvaluator};
use super::domain::{
    AwardMetadata, AwardResult, Badge, BadgeAction, BadgeGrant, Transaction, UserId,
};
use super::ledger::AwardLedger;
use super::leveling::{self, PointsStanding};
use super::repository::{ActivityRepository, BadgeRepository, PointsLedger, RepositoryError};

const SUMMARY_TRANSACTION_LIMIT: usize = 10;

/// Everything the engine needs from persistence.
pub trait RewardsStore: BadgeRepository + ActivityRepository + PointsLedger {}

impl<T> RewardsStore for T where T: BadgeRepository + ActivityRepository + PointsLedger {}

/// Service composing the criteria evaluator, award ledger, and leveling rules.
pub struct RewardsService<S> {
    store: Arc<S>,
    evaluator: CriteriaEvaluator<S>,
    ledger: AwardLedger<S, S>,
}

impl<S> RewardsService<S>
where
    S: RewardsStore + 'static,
{
    pub fn new(store: Arc<S>, config: CriteriaConfig) -> Self {
        Self {
            evaluator: CriteriaEvaluator::new(store.clone(), config),
            ledger: AwardLedger::new(store.clone(), store.clone()),
            store,
        }
    }

    /// Evaluate every badge tied to `action` and grant the ones the user newly qualifies for.
    ///
    /// Never fails: a badge lookup failure yields a single result carrying the error, and a
    /// failure while checking one badge is reported on that badge only.
    pub fn check_and_award_badges(
        &self,
        user_id: &UserId,
        action: BadgeAction,
        metadata: Option<&AwardMetadata>,
    ) -> Vec<AwardResult> {
        self.check_and_award_badges_at(user_id, action, metadata, Utc::now())
    }

    pub fn check_and_award_badges_at(
        &self,
        user_id: &UserId,
        action: BadgeAction,
        metadata: Option<&AwardMetadata>,
        now: DateTime<Utc>,
    ) -> Vec<AwardResult> {
        let span = info_span!("check_and_award_badges", user = %user_id, %action);
        let _entered = span.enter();
        if let Some(metadata) = metadata {
            debug!(?metadata, "action metadata received");
        }

        let badges = match self.store.badges_for_action(action) {
            Ok(badges) => badges,
            Err(err) => {
                warn!(error = %err, "badge lookup failed; no badges evaluated");
                return vec![AwardResult::lookup_failed(err)];
            }
        };

        badges
            .iter()
            .map(|badge| {
                self.evaluate_badge(user_id, badge, now)
                    .unwrap_or_else(|err| {
                        warn!(badge = %badge.slug, error = %err, "badge evaluation failed");
                        AwardResult::failed(badge, err)
                    })
            })
            .collect()
    }

    fn evaluate_badge(
        &self,
        user_id: &UserId,
        badge: &Badge,
        now: DateTime<Utc>,
    ) -> Result<AwardResult, RepositoryError> {
        if self.store.has_grant(user_id, &badge.id)? {
            return Ok(AwardResult::already_has(badge));
        }
        if !self.evaluator.is_met(user_id, &badge.criteria, now)? {
            return Ok(AwardResult::not_met(badge));
        }
        self.ledger.award(user_id, badge, now)
    }

    /// Points at which a user at `level` reaches the next level.
    pub fn points_for_next_level(&self, level: u64) -> u64 {
        leveling::points_required_for_level(level)
    }

    /// Progress from `level`'s floor toward the next threshold, in `[0, 100]`.
    pub fn level_progress(&self, points: u64, level: u64) -> f64 {
        leveling::progress_to_next_level(points, level)
    }

    /// Credit points outside of a badge award (e.g. promotional grants).
    pub fn award_points(
        &self,
        user_id: &UserId,
        amount: u64,
        source: &str,
    ) -> Result<Option<PointsStanding>, RewardsServiceError> {
        Ok(self
            .ledger
            .points()
            .award(user_id, amount, source, Utc::now())?)
    }

    /// Current standing, held badges, and recent transactions for a user.
    pub fn summary(&self, user_id: &UserId) -> Result<RewardsSummary, RewardsServiceError> {
        let points = self
            .store
            .fetch_points(user_id)?
            .ok_or_else(|| RewardsServiceError::UnknownUser(user_id.clone()))?;
        let standing = PointsStanding::from_points(points);
        let badges = self.store.grants_for_user(user_id)?;
        let recent_transactions = self
            .store
            .transactions_for_user(user_id, SUMMARY_TRANSACTION_LIMIT)?;

        Ok(RewardsSummary {
            user_id: user_id.clone(),
            points: standing.points(),
            level: standing.level(),
            points_for_next_level: standing.points_for_next_level(),
            progress: standing.progress(),
            badges,
            recent_transactions,
        })
    }
}

/// Profile-facing snapshot of a user's rewards.
#[derive(Debug, Clone, Serialize)]
pub struct RewardsSummary {
    pub user_id: UserId,
    pub points: u64,
    pub level: u64,
    pub points_for_next_level: u64,
    pub progress: f64,
    pub badges: Vec<BadgeGrant>,
    pub recent_transactions: Vec<Transaction>,
}

/// Error raised by the rewards service.
#[derive(Debug, thiserror::Error)]
pub enum RewardsServiceError {
    #[error("user {0} has no rewards profile")]
    UnknownUser(UserId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
