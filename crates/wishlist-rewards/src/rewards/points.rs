use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{NewTransaction, UserId};
use super::leveling::PointsStanding;
use super::repository::{PointsCredit, PointsLedger, RepositoryError};

/// Credits points to profiles and records the matching `earn` transaction.
pub struct PointsAwarder<P> {
    ledger: Arc<P>,
}

impl<P> PointsAwarder<P>
where
    P: PointsLedger,
{
    pub fn new(ledger: Arc<P>) -> Self {
        Self { ledger }
    }

    /// Returns the new standing, or `None` when the user has no profile.
    ///
    /// The credit goes through `PointsLedger::credit_points`, which is only as atomic as the
    /// store makes it; the default read-then-write can drop one of two concurrent credits
    /// for the same user. The credit and the transaction append are separate store calls;
    /// an error from the append is returned after the new standing has been persisted.
    pub fn award(
        &self,
        user_id: &UserId,
        amount: u64,
        source: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PointsStanding>, RepositoryError> {
        let Some(PointsCredit { before, after }) = self.ledger.credit_points(user_id, amount)?
        else {
            warn!(user = %user_id, amount, source, "cannot award points to unknown user");
            return Ok(None);
        };

        let transaction = self
            .ledger
            .append_transaction(NewTransaction::earn(user_id.clone(), amount, source, now))?;

        if after.level() > before.level() {
            info!(
                user = %user_id,
                from = before.level(),
                to = after.level(),
                "level up"
            );
        }
        info!(
            user = %user_id,
            amount,
            source,
            points = after.points(),
            transaction = %transaction.id,
            "points awarded"
        );

        Ok(Some(after))
    }
}
