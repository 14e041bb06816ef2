use crate::breaker::BreakerRegistry;
use crate::config::store::ConfigStore;
use crate::config::DistributorConfig;
use crate::metrics::Metrics;
use crate::pool::AnalyzerPool;
use anyhow::Result;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared distributor state, cheaply cloneable. Constructed once at startup;
/// `weights` is the only field mutated afterward (by the config watcher),
/// via lock-free `ArcSwap` reads on the dispatch hot path.
#[derive(Clone)]
pub struct DistributorState {
    pub config: Arc<DistributorConfig>,
    pub breakers: Arc<BreakerRegistry>,
    pub pool: Arc<AnalyzerPool>,
    pub weights: Arc<ArcSwap<HashMap<String, f64>>>,
    pub analyzer_names: Arc<Vec<String>>,
    pub store: ConfigStore,
    pub metrics: Metrics,
}

impl DistributorState {
    pub async fn new(config: DistributorConfig) -> Result<Self> {
        let analyzer_names: Vec<String> = config.analyzers.iter().map(|a| a.name.clone()).collect();
        let breakers = BreakerRegistry::new(analyzer_names.clone(), config.breaker.clone());
        let pool = AnalyzerPool::connect_lazy(&config.analyzers)?;
        let store = ConfigStore::connect(&config.mongo_uri).await?;
        let metrics = Metrics::install();

        Ok(Self {
            weights: Arc::new(ArcSwap::new(Arc::new(config.default_weights.clone()))),
            analyzer_names: Arc::new(analyzer_names),
            config: Arc::new(config),
            breakers: Arc::new(breakers),
            pool: Arc::new(pool),
            store,
            metrics,
        })
    }

    pub fn current_weights(&self) -> arc_swap::Guard<Arc<HashMap<String, f64>>> {
        self.weights.load()
    }
}
