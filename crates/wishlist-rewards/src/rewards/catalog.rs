use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use tracing::warn;

use super::domain::{Badge, BadgeAction, BadgeCriteria, BadgeId, Period};

/// Set of badge definitions loaded into a store at startup.
#[derive(Debug, Clone)]
pub struct BadgeCatalog {
    badges: Vec<Badge>,
}

impl BadgeCatalog {
    pub fn standard() -> Self {
        Self {
            badges: standard_badges(),
        }
    }

    pub fn badges(&self) -> &[Badge] {
        &self.badges
    }

    pub fn into_badges(self) -> Vec<Badge> {
        self.badges
    }

    pub fn for_action(&self, action: BadgeAction) -> Vec<&Badge> {
        self.badges
            .iter()
            .filter(|badge| badge.criteria.action() == Some(action))
            .collect()
    }
}

fn badge(
    id: &str,
    slug: &str,
    name: &str,
    description: &str,
    criteria: BadgeCriteria,
    points_reward: u64,
) -> Badge {
    Badge {
        id: BadgeId(id.to_string()),
        slug: slug.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        criteria,
        points_reward,
    }
}

fn standard_badges() -> Vec<Badge> {
    vec![
        badge(
            "badge-first-wishlist",
            "first_wishlist",
            "First Wish",
            "Created your first wishlist.",
            BadgeCriteria::CreateWishlist {
                count: 1,
                period: None,
            },
            50,
        ),
        badge(
            "badge-wishlist-curator",
            "wishlist_curator",
            "Wishlist Curator",
            "Created five wishlists.",
            BadgeCriteria::CreateWishlist {
                count: 5,
                period: None,
            },
            150,
        ),
        badge(
            "badge-first-gift",
            "first_gift",
            "First Gift",
            "Bought your first gift for someone.",
            BadgeCriteria::PurchaseGift {
                count: 1,
                period: None,
            },
            100,
        ),
        badge(
            "badge-generous-giver",
            "generous_giver",
            "Generous Giver",
            "Bought five gifts.",
            BadgeCriteria::PurchaseGift {
                count: 5,
                period: None,
            },
            300,
        ),
        badge(
            "badge-social-butterfly",
            "social_butterfly",
            "Social Butterfly",
            "Followed ten people.",
            BadgeCriteria::Follow {
                count: 10,
                period: None,
            },
            100,
        ),
        badge(
            "badge-first-sale",
            "first_sale",
            "First Sale",
            "Delivered your first order as a seller.",
            BadgeCriteria::SellerSales {
                count: 1,
                period: None,
            },
            100,
        ),
        badge(
            "badge-top-seller",
            "top_seller",
            "Top Seller",
            "Delivered fifty orders as a seller.",
            BadgeCriteria::SellerSales {
                count: 50,
                period: None,
            },
            500,
        ),
        badge(
            "badge-trending-wishlist",
            "trending_wishlist",
            "Trending Wishlist",
            "Own one of the most viewed wishlists in the app.",
            BadgeCriteria::TopWishlist,
            250,
        ),
    ]
}

#[derive(Debug)]
pub enum CatalogImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidPeriod { slug: String, value: String },
    DuplicateSlug(String),
}

impl std::fmt::Display for CatalogImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogImportError::Io(err) => write!(f, "failed to read badge catalog: {}", err),
            CatalogImportError::Csv(err) => write!(f, "invalid badge catalog CSV: {}", err),
            CatalogImportError::InvalidPeriod { slug, value } => {
                write!(f, "badge '{}' has invalid period '{}'", slug, value)
            }
            CatalogImportError::DuplicateSlug(slug) => {
                write!(f, "badge slug '{}' appears more than once", slug)
            }
        }
    }
}

impl std::error::Error for CatalogImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogImportError::Io(err) => Some(err),
            CatalogImportError::Csv(err) => Some(err),
            CatalogImportError::InvalidPeriod { .. } | CatalogImportError::DuplicateSlug(_) => None,
        }
    }
}

impl From<std::io::Error> for CatalogImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Loads badge definitions from a CSV export with the columns
/// `id,slug,name,description,action,count,period,points_reward`.
pub struct BadgeCatalogImporter;

impl BadgeCatalogImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<BadgeCatalog, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<BadgeCatalog, CatalogImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut seen = HashSet::new();
        let mut badges = Vec::new();

        for row in csv_reader.deserialize::<CatalogRow>() {
            let row = row?;
            if !seen.insert(row.slug.clone()) {
                return Err(CatalogImportError::DuplicateSlug(row.slug));
            }
            badges.push(row.into_badge()?);
        }

        Ok(BadgeCatalog { badges })
    }
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    id: String,
    slug: String,
    name: String,
    #[serde(default)]
    description: String,
    action: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    count: Option<u64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    period: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    points_reward: Option<u64>,
}

impl CatalogRow {
    fn into_badge(self) -> Result<Badge, CatalogImportError> {
        let period = match self.period.as_deref() {
            Some(raw) => Some(raw.parse::<Period>().map_err(|_| {
                CatalogImportError::InvalidPeriod {
                    slug: self.slug.clone(),
                    value: raw.to_string(),
                }
            })?),
            None => None,
        };

        let criteria = match self.action.parse::<BadgeAction>() {
            Ok(action) => BadgeCriteria::for_action(action, self.count.unwrap_or(1), period),
            Err(err) => {
                warn!(slug = %self.slug, error = %err, "catalog badge will never be awarded");
                BadgeCriteria::Unrecognized
            }
        };

        Ok(Badge {
            id: BadgeId(self.id),
            slug: self.slug,
            name: self.name,
            description: self.description,
            criteria,
            points_reward: self.points_reward.unwrap_or(0),
        })
    }
}

fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn standard_catalog_covers_every_action() {
        let catalog = BadgeCatalog::standard();
        for action in BadgeAction::ALL {
            assert!(
                !catalog.for_action(action).is_empty(),
                "no standard badge for {action}"
            );
        }

        let slugs: HashSet<_> = catalog.badges().iter().map(|badge| &badge.slug).collect();
        assert_eq!(slugs.len(), catalog.badges().len());
    }

    #[test]
    fn importer_reads_rows_with_defaults() {
        let csv = "id,slug,name,description,action,count,period,points_reward\n\
b-1,weekly_giver,Weekly Giver,Three gifts in a week,purchase_gift,3,week,75\n\
b-2,first_follow,First Follow,,follow,,,\n";
        let catalog = BadgeCatalogImporter::from_reader(Cursor::new(csv)).expect("imports");
        let badges = catalog.badges();
        assert_eq!(badges.len(), 2);
        assert_eq!(
            badges[0].criteria,
            BadgeCriteria::PurchaseGift {
                count: 3,
                period: Some(Period::Week)
            }
        );
        assert_eq!(badges[0].points_reward, 75);
        assert_eq!(
            badges[1].criteria,
            BadgeCriteria::Follow {
                count: 1,
                period: None
            }
        );
        assert_eq!(badges[1].points_reward, 0);
    }

    #[test]
    fn importer_keeps_unknown_actions_as_unrecognized() {
        let csv = "id,slug,name,description,action,count,period,points_reward\n\
b-9,sharer,Sharer,,share_wishlist,2,,10\n";
        let catalog = BadgeCatalogImporter::from_reader(Cursor::new(csv)).expect("imports");
        assert_eq!(catalog.badges()[0].criteria, BadgeCriteria::Unrecognized);
    }

    #[test]
    fn importer_rejects_duplicate_slugs_and_bad_periods() {
        let duplicate = "id,slug,name,description,action,count,period,points_reward\n\
b-1,gifter,Gifter,,purchase_gift,1,,10\n\
b-2,gifter,Gifter Again,,purchase_gift,2,,10\n";
        match BadgeCatalogImporter::from_reader(Cursor::new(duplicate)) {
            Err(CatalogImportError::DuplicateSlug(slug)) => assert_eq!(slug, "gifter"),
            other => panic!("expected duplicate slug error, got {other:?}"),
        }

        let bad_period = "id,slug,name,description,action,count,period,points_reward\n\
b-1,gifter,Gifter,,purchase_gift,1,fortnight,10\n";
        match BadgeCatalogImporter::from_reader(Cursor::new(bad_period)) {
            Err(CatalogImportError::InvalidPeriod { slug, value }) => {
                assert_eq!(slug, "gifter");
                assert_eq!(value, "fortnight");
            }
            other => panic!("expected invalid period error, got {other:?}"),
        }
    }

    #[test]
    fn importer_from_path_propagates_io_errors() {
        match BadgeCatalogImporter::from_path("./does-not-exist.csv") {
            Err(CatalogImportError::Io(_)) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
