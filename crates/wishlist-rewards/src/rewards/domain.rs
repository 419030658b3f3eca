use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier wrapper for app users (profile owners).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for badge definitions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BadgeId(pub String);

impl fmt::Display for BadgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SellerId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WishlistId(pub String);

/// User activity that can unlock badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeAction {
    CreateWishlist,
    PurchaseGift,
    Follow,
    SellerSales,
    TopWishlist,
}

impl BadgeAction {
    pub const ALL: [BadgeAction; 5] = [
        BadgeAction::CreateWishlist,
        BadgeAction::PurchaseGift,
        BadgeAction::Follow,
        BadgeAction::SellerSales,
        BadgeAction::TopWishlist,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            BadgeAction::CreateWishlist => "create_wishlist",
            BadgeAction::PurchaseGift => "purchase_gift",
            BadgeAction::Follow => "follow",
            BadgeAction::SellerSales => "seller_sales",
            BadgeAction::TopWishlist => "top_wishlist",
        }
    }
}

impl fmt::Display for BadgeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown badge action '{0}'")]
pub struct UnknownAction(pub String);

impl FromStr for BadgeAction {
    type Err = UnknownAction;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        BadgeAction::ALL
            .into_iter()
            .find(|action| action.tag() == normalized)
            .ok_or_else(|| UnknownAction(value.to_string()))
    }
}

/// Trailing window applied to count-based criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    pub fn duration(&self) -> Duration {
        match self {
            Period::Day => Duration::days(1),
            Period::Week => Duration::days(7),
            Period::Month => Duration::days(30),
            Period::Year => Duration::days(365),
        }
    }

    /// Start of the window ending at `now`.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Period::Day),
            "week" | "weekly" => Ok(Period::Week),
            "month" | "monthly" => Ok(Period::Month),
            "year" | "yearly" => Ok(Period::Year),
            other => Err(format!("unknown period '{other}'")),
        }
    }
}

fn default_required_count() -> u64 {
    1
}

/// What a user has to accomplish to earn a badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BadgeCriteria {
    CreateWishlist {
        #[serde(default = "default_required_count")]
        count: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        period: Option<Period>,
    },
    PurchaseGift {
        #[serde(default = "default_required_count")]
        count: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        period: Option<Period>,
    },
    Follow {
        #[serde(default = "default_required_count")]
        count: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        period: Option<Period>,
    },
    SellerSales {
        #[serde(default = "default_required_count")]
        count: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        period: Option<Period>,
    },
    TopWishlist,
    /// Definition authored against an action this build does not know.
    #[serde(other)]
    Unrecognized,
}

impl BadgeCriteria {
    pub fn action(&self) -> Option<BadgeAction> {
        match self {
            BadgeCriteria::CreateWishlist { .. } => Some(BadgeAction::CreateWishlist),
            BadgeCriteria::PurchaseGift { .. } => Some(BadgeAction::PurchaseGift),
            BadgeCriteria::Follow { .. } => Some(BadgeAction::Follow),
            BadgeCriteria::SellerSales { .. } => Some(BadgeAction::SellerSales),
            BadgeCriteria::TopWishlist => Some(BadgeAction::TopWishlist),
            BadgeCriteria::Unrecognized => None,
        }
    }

    /// Builds criteria for an action with the given threshold and window.
    pub fn for_action(action: BadgeAction, count: u64, period: Option<Period>) -> Self {
        match action {
            BadgeAction::CreateWishlist => BadgeCriteria::CreateWishlist { count, period },
            BadgeAction::PurchaseGift => BadgeCriteria::PurchaseGift { count, period },
            BadgeAction::Follow => BadgeCriteria::Follow { count, period },
            BadgeAction::SellerSales => BadgeCriteria::SellerSales { count, period },
            BadgeAction::TopWishlist => BadgeCriteria::TopWishlist,
        }
    }
}

/// Externally authored badge definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: BadgeId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub criteria: BadgeCriteria,
    #[serde(default)]
    pub points_reward: u64,
}

impl Badge {
    /// Source tag recorded on transactions crediting this badge's reward.
    pub fn points_source(&self) -> String {
        format!("badge_{}", self.slug)
    }
}

/// A badge held by a user. Unique per (user, badge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeGrant {
    pub user_id: UserId,
    pub badge_id: BadgeId,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

/// Statuses that count an order as a completed gift purchase.
pub const PURCHASED_STATUSES: [OrderStatus; 3] = [
    OrderStatus::Confirmed,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
];

/// Statuses that count an order as a completed sale.
pub const COMPLETED_SALE_STATUSES: [OrderStatus; 1] = [OrderStatus::Delivered];

/// View count snapshot for a single wishlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistViews {
    pub wishlist_id: WishlistId,
    pub owner: UserId,
    pub view_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Earn,
    Spend,
}

/// Transaction payload before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub kind: TransactionKind,
    pub amount: u64,
    pub source: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl NewTransaction {
    pub fn earn(user_id: UserId, amount: u64, source: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            kind: TransactionKind::Earn,
            amount,
            source: source.to_string(),
            description: format!("Earned {amount} points from {source}"),
            created_at,
        }
    }
}

/// Append-only audit entry for a points change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: UserId,
    pub kind: TransactionKind,
    pub amount: u64,
    pub source: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Optional caller hints accompanying an action.
///
/// Parsing never fails: a `count` or `period` hint that does not parse is kept
/// verbatim in `extra`, and a non-object payload is stored under `extra["value"]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AwardMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl From<Value> for AwardMetadata {
    fn from(value: Value) -> Self {
        let mut extra = match value {
            Value::Object(fields) => fields.into_iter().collect::<BTreeMap<_, _>>(),
            Value::Null => BTreeMap::new(),
            other => BTreeMap::from([("value".to_string(), other)]),
        };

        let count = extra.get("count").and_then(Value::as_u64);
        if count.is_some() {
            extra.remove("count");
        }
        let period = extra
            .get("period")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse::<Period>().ok());
        if period.is_some() {
            extra.remove("period");
        }

        Self {
            count,
            period,
            extra,
        }
    }
}

impl<'de> Deserialize<'de> for AwardMetadata {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(AwardMetadata::from)
    }
}

/// Outcome of evaluating a single badge for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge_id: Option<BadgeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge_slug: Option<String>,
    pub awarded: bool,
    pub already_has: bool,
    #[serde(default)]
    pub points_awarded: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AwardResult {
    fn for_badge(badge: &Badge) -> Self {
        Self {
            badge_id: Some(badge.id.clone()),
            badge_slug: Some(badge.slug.clone()),
            awarded: false,
            already_has: false,
            points_awarded: 0,
            error: None,
        }
    }

    pub fn awarded(badge: &Badge, points_awarded: u64) -> Self {
        Self {
            awarded: true,
            points_awarded,
            ..Self::for_badge(badge)
        }
    }

    pub fn already_has(badge: &Badge) -> Self {
        Self {
            already_has: true,
            ..Self::for_badge(badge)
        }
    }

    pub fn not_met(badge: &Badge) -> Self {
        Self::for_badge(badge)
    }

    pub fn failed(badge: &Badge, error: impl fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::for_badge(badge)
        }
    }

    /// Synthetic result returned when no candidate badges could be loaded.
    pub fn lookup_failed(error: impl fmt::Display) -> Self {
        Self {
            badge_id: None,
            badge_slug: None,
            awarded: false,
            already_has: false,
            points_awarded: 0,
            error: Some(error.to_string()),
        }
    }
}
