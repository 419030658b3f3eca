//! Badge evaluation, idempotent grants, and points/level bookkeeping.
//!
//! Events from the app (a wishlist created, a gift bought, a follow, a completed sale,
//! wishlist views changing) are fed to [`RewardsService::check_and_award_badges`], which
//! re-reads authoritative counts from the store, grants newly earned badges at most once,
//! and credits their points.

pub mod catalog;
pub(crate) mod criteria;
pub mod domain;
pub(crate) mod ledger;
pub mod leveling;
pub mod memory;
pub(crate) mod points;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use catalog::{BadgeCatalog, BadgeCatalogImporter, CatalogImportError};
pub use criteria::{CriteriaConfig, DEFAULT_TOP_WISHLIST_PERCENT};
pub use domain::{
    AwardMetadata, AwardResult, Badge, BadgeAction, BadgeCriteria, BadgeGrant, BadgeId,
    NewTransaction, OrderStatus, Period, SellerId, Transaction, TransactionKind, UnknownAction,
    UserId, WishlistId, WishlistViews,
};
pub use leveling::{
    level_for_points, points_required_for_level, progress_to_next_level, PointsStanding,
};
pub use memory::InMemoryRewardsStore;
pub use repository::{
    ActivityRepository, BadgeRepository, PointsCredit, PointsLedger, RepositoryError,
};
pub use router::rewards_router;
pub use service::{RewardsService, RewardsServiceError, RewardsStore, RewardsSummary};
