pub mod extract;
pub mod idempotency;
pub mod metrics;
pub mod planner;
pub mod sanitize;
pub mod slots;

pub use extract::{AssistedExtraction, AssistedRequest, ExtractionResult, Extractor};
pub use idempotency::IdempotencyCache;
pub use metrics::{MetricsSnapshot, TurnMetrics};
pub use planner::{LookupDefaults, LookupLexicon, Planner, PlannerResult};
