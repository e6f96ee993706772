use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::catalog::BrandCatalog;
use crate::config::AppConfig;
use crate::services::car_ad::CarAdService;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub catalog: Arc<BrandCatalog>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        let catalog = Arc::new(BrandCatalog::from_config(&config.catalog));
        Self {
            db,
            config,
            catalog,
        }
    }

    pub fn car_ads(&self) -> CarAdService<'_> {
        CarAdService::new(&self.db, &self.catalog, &self.config.listing)
    }
}
