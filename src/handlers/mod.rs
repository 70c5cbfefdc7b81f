use std::sync::Arc;

use crate::{
    config::Config,
    database::Database,
    services::{metrics::MetricsService, query_facade::QueryFacade},
};

pub mod health;
pub mod metrics;
pub mod query;

#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub facade: Arc<QueryFacade>,
    pub config: Config,
    pub metrics: Arc<MetricsService>,
}

impl AppState {
    pub fn new(database: Database, config: Config) -> anyhow::Result<Self> {
        let facade = QueryFacade::new(Arc::new(database.clone()));

        Ok(Self {
            database,
            facade: Arc::new(facade),
            config,
            metrics: Arc::new(MetricsService::new()?),
        })
    }
}
