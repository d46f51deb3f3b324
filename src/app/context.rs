use std::sync::Arc;

use crate::app::error::{RatecastError, Result};
use crate::config::Config;
use crate::pipeline::{Analyzer, BatchCoordinator};
use crate::renderer::{self, PageRenderer};
use crate::store::sqlite::SqliteCache;
use crate::store::ResultCache;

pub struct AppContext {
    pub config: Config,
    pub analyzer: Arc<Analyzer>,
    pub cache: Option<Arc<dyn ResultCache + Send + Sync>>,
}

impl AppContext {
    /// Wire up the renderer selected in `config` and open the result cache.
    pub async fn new(config: Config) -> Result<Self> {
        let renderer = renderer::from_config(&config.renderer).await?;
        let cache: Option<Arc<dyn ResultCache + Send + Sync>> = if config.cache.enabled {
            let path = config
                .cache_path()
                .map_err(|e| RatecastError::Config(e.to_string()))?;
            Some(Arc::new(SqliteCache::new(&path)?))
        } else {
            None
        };
        Self::assemble(config, renderer, cache)
    }

    /// Context around an existing renderer with an in-memory cache.
    pub fn with_renderer(config: Config, renderer: Arc<dyn PageRenderer>) -> Result<Self> {
        let cache: Option<Arc<dyn ResultCache + Send + Sync>> = if config.cache.enabled {
            Some(Arc::new(SqliteCache::in_memory()?))
        } else {
            None
        };
        Self::assemble(config, renderer, cache)
    }

    fn assemble(
        config: Config,
        renderer: Arc<dyn PageRenderer>,
        cache: Option<Arc<dyn ResultCache + Send + Sync>>,
    ) -> Result<Self> {
        let analyzer = Arc::new(Analyzer::new(renderer, &config)?);
        Ok(Self {
            config,
            analyzer,
            cache,
        })
    }

    pub fn batch(&self) -> BatchCoordinator {
        BatchCoordinator::new(self.analyzer.clone(), &self.config.batch)
    }
}
