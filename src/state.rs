use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::agents::AgentCatalog;
use crate::config::AppConfig;
use crate::engine::extract::{AssistedExtraction, Extractor};
use crate::engine::planner::{LookupDefaults, LookupLexicon, Planner};
use crate::engine::{IdempotencyCache, TurnMetrics};
use crate::services::ai::{LegacyGenerator, LlmExtractor, LlmProvider};

/// Everything a turn needs, constructed once at startup.
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub catalog: AgentCatalog,
    pub extractor: Extractor,
    pub planner: Planner,
    /// Absent when no provider is configured; the legacy path then relies
    /// on the sanitizer alone.
    pub legacy: Option<LegacyGenerator>,
    pub idempotency: IdempotencyCache,
    pub metrics: TurnMetrics,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        conn: Connection,
        llm: Option<Arc<dyn LlmProvider>>,
    ) -> anyhow::Result<Self> {
        let catalog = AgentCatalog::builtin()?;

        let assisted = llm
            .clone()
            .map(|llm| Arc::new(LlmExtractor::new(llm)) as Arc<dyn AssistedExtraction>);
        let extractor = Extractor::new(
            assisted,
            config.extraction_timeout,
            &config.default_calling_code,
        );

        let planner = Planner::new(
            LookupLexicon::new(&config.lookup_phrases),
            LookupDefaults {
                query: config.lookup_default_query.clone(),
                area: config.lookup_default_area.clone(),
                country: config.lookup_country.clone(),
            },
        );

        let legacy = llm.map(|llm| LegacyGenerator::new(llm, &config.lookup_country));
        let idempotency =
            IdempotencyCache::new(config.idempotency_ttl, config.idempotency_prune_threshold);

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            config,
            catalog,
            extractor,
            planner,
            legacy,
            idempotency,
            metrics: TurnMetrics::new(),
        })
    }

    pub fn lock_db(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))
    }
}
