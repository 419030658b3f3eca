use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;
use wishlist_rewards::rewards::{
    BadgeCatalog, BadgeCatalogImporter, CatalogImportError, InMemoryRewardsStore,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Loads the catalog at `path`, or the standard catalog when none is configured.
pub(crate) fn load_catalog(path: Option<&Path>) -> Result<BadgeCatalog, CatalogImportError> {
    match path {
        Some(path) => {
            let catalog = BadgeCatalogImporter::from_path(path)?;
            info!(path = %path.display(), badges = catalog.badges().len(), "badge catalog imported");
            Ok(catalog)
        }
        None => Ok(BadgeCatalog::standard()),
    }
}

pub(crate) fn seeded_store(catalog: BadgeCatalog) -> InMemoryRewardsStore {
    let store = InMemoryRewardsStore::default();
    store.insert_badges(catalog.into_badges());
    store
}
