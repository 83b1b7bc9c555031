use axum::extract::FromRef;

use crate::config::Config;
use crate::services::analysis_service::AnalysisCache;

#[derive(Clone, Debug)]
pub struct AppState {
    /// Memo of finished runs; `None` when caching is disabled in the config
    pub cache: Option<AnalysisCache>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let cache = config
            .cache
            .enabled
            .then(|| AnalysisCache::new(config.cache.max_entries));
        Self { cache }
    }

    pub fn cached_runs(&self) -> usize {
        self.cache.as_ref().map_or(0, AnalysisCache::len)
    }
}

/// Router state: handlers extract `State<AppState>` or `State<Config>`.
#[derive(Clone, Debug)]
pub struct SharedState {
    pub app: AppState,
    pub config: Config,
}

impl SharedState {
    pub fn new(config: Config) -> Self {
        Self {
            app: AppState::new(&config),
            config,
        }
    }
}

impl FromRef<SharedState> for AppState {
    fn from_ref(shared: &SharedState) -> Self {
        shared.app.clone()
    }
}

impl FromRef<SharedState> for Config {
    fn from_ref(shared: &SharedState) -> Self {
        shared.config.clone()
    }
}
