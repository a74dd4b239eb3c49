use std::env;
use std::time::Duration;

use crate::engine::planner::DEFAULT_LOOKUP_PHRASES;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LlmBackend {
    None,
    OpenAi,
    Groq,
    Ollama,
}

impl LlmBackend {
    fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => LlmBackend::OpenAi,
            "groq" => LlmBackend::Groq,
            "ollama" => LlmBackend::Ollama,
            _ => LlmBackend::None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub llm_provider: LlmBackend,
    pub openai_api_key: String,
    pub openai_model: String,
    pub groq_api_key: String,
    pub groq_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub extraction_timeout: Duration,
    pub idempotency_ttl: Duration,
    pub idempotency_prune_threshold: usize,
    pub lookup_phrases: Vec<String>,
    pub lookup_default_query: String,
    pub lookup_default_area: String,
    pub lookup_country: String,
    pub default_calling_code: String,
    pub kill_switch: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: parsed("PORT", 3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "callagent.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            llm_provider: LlmBackend::parse(&env::var("LLM_PROVIDER").unwrap_or_default()),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            groq_api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
            groq_model: env::var("GROQ_MODEL")
                .unwrap_or_else(|_| "llama-3.1-8b-instant".to_string()),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
            extraction_timeout: Duration::from_millis(parsed("EXTRACTION_TIMEOUT_MS", 8000)),
            idempotency_ttl: Duration::from_secs(parsed("IDEMPOTENCY_TTL_SECS", 300)),
            idempotency_prune_threshold: parsed("IDEMPOTENCY_PRUNE_THRESHOLD", 1000),
            lookup_phrases: env::var("LOOKUP_PHRASES")
                .ok()
                .map(|v| split_phrases(&v))
                .filter(|phrases| !phrases.is_empty())
                .unwrap_or_else(|| DEFAULT_LOOKUP_PHRASES.iter().map(|p| p.to_string()).collect()),
            lookup_default_query: env::var("LOOKUP_DEFAULT_QUERY")
                .unwrap_or_else(|_| "business".to_string()),
            lookup_default_area: env::var("LOOKUP_DEFAULT_AREA")
                .unwrap_or_else(|_| "Australia".to_string()),
            lookup_country: env::var("LOOKUP_COUNTRY").unwrap_or_else(|_| "AU".to_string()),
            default_calling_code: env::var("DEFAULT_COUNTRY_CALLING_CODE")
                .unwrap_or_else(|_| "61".to_string()),
            kill_switch: env::var("CONVERSATION_ENGINE_KILL_SWITCH")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    /// Fails when a hosted provider is selected without its API key.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.llm_provider {
            LlmBackend::OpenAi => {
                anyhow::ensure!(!self.openai_api_key.is_empty(), "LLM_PROVIDER=openai requires OPENAI_API_KEY")
            }
            LlmBackend::Groq => {
                anyhow::ensure!(!self.groq_api_key.is_empty(), "LLM_PROVIDER=groq requires GROQ_API_KEY")
            }
            LlmBackend::Ollama | LlmBackend::None => {}
        }
        anyhow::ensure!(
            !self.default_calling_code.is_empty()
                && self.default_calling_code.chars().all(|c| c.is_ascii_digit()),
            "DEFAULT_COUNTRY_CALLING_CODE must be digits only"
        );
        Ok(())
    }
}

impl Default for AppConfig {
    /// Deterministic-only configuration with an in-memory database.
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: ":memory:".to_string(),
            admin_token: "changeme".to_string(),
            llm_provider: LlmBackend::None,
            openai_api_key: String::new(),
            openai_model: "gpt-4o-mini".to_string(),
            groq_api_key: String::new(),
            groq_model: "llama-3.1-8b-instant".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2".to_string(),
            extraction_timeout: Duration::from_millis(8000),
            idempotency_ttl: Duration::from_secs(300),
            idempotency_prune_threshold: 1000,
            lookup_phrases: DEFAULT_LOOKUP_PHRASES.iter().map(|p| p.to_string()).collect(),
            lookup_default_query: "business".to_string(),
            lookup_default_area: "Australia".to_string(),
            lookup_country: "AU".to_string(),
            default_calling_code: "61".to_string(),
            kill_switch: false,
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn split_phrases(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!(LlmBackend::parse("OpenAI"), LlmBackend::OpenAi);
        assert_eq!(LlmBackend::parse("groq"), LlmBackend::Groq);
        assert_eq!(LlmBackend::parse(""), LlmBackend::None);
    }

    #[test]
    fn test_split_phrases() {
        assert_eq!(split_phrases(" no idea , ,look it up"), vec!["no idea", "look it up"]);
    }

    #[test]
    fn test_validate_requires_key_for_hosted_provider() {
        let mut config = AppConfig {
            llm_provider: LlmBackend::Groq,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
        config.groq_api_key = "gsk_test".to_string();
        assert!(config.validate().is_ok());

        config.default_calling_code = "+61".to_string();
        assert!(config.validate().is_err());
    }
}
