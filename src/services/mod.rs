//! Business logic services

pub mod catalog;
pub mod changes;
pub mod circulation;
pub mod feedback;
pub mod reports;

use std::sync::Arc;

use crate::{config::AppConfig, repository::CatalogStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub circulation: circulation::CirculationService,
    pub reports: reports::ReportsService,
    pub feedback: feedback::FeedbackService,
    pub changes: Arc<changes::ChangeFeed>,
}

impl Services {
    /// Create all services over the given store, publishing to `changes`
    pub fn new(store: Arc<dyn CatalogStore>, changes: Arc<changes::ChangeFeed>, config: &AppConfig) -> Self {
        let notifier: Arc<dyn changes::ChangeNotifier> = changes.clone();
        Self {
            catalog: catalog::CatalogService::new(store.clone(), notifier.clone()),
            circulation: circulation::CirculationService::new(
                store.clone(),
                notifier.clone(),
                config.circulation.clone(),
            ),
            reports: reports::ReportsService::new(store.clone(), config.reports.clone()),
            feedback: feedback::FeedbackService::new(store, notifier),
            changes,
        }
    }
}
