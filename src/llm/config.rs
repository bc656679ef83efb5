//! Per-role LLM configuration.

use std::time::Duration;

use serde_json::Value;

use super::LlmError;

/// Connection and sampling settings for one workflow role.
///
/// API keys are resolved from the environment at request time and never
/// stored. `extra_params` is merged verbatim into the request body, which is
/// how provider-specific switches such as thinking modes are carried:
///
/// ```
/// use alphasolve::llm::LlmConfig;
/// use serde_json::json;
///
/// let cfg = LlmConfig::openai_compatible(
///     "https://ark.cn-beijing.volces.com/api/v3",
///     "ARK_API_KEY",
///     "deepseek-v3-2-251201",
/// )
/// .with_extra_params(json!({"thinking": {"type": "enabled"}}))
/// .with_tools(["math_research_subagent", "read_lemma"]);
/// assert_eq!(cfg.tools.len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub model: String,
    pub timeout: Duration,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Extra top-level request fields (e.g. thinking enablers).
    pub extra_params: Value,
    /// Names of registry tools this role may call.
    pub tools: Vec<String>,
    /// Whole-conversation retries on service failure.
    pub max_api_retry: u32,
}

impl LlmConfig {
    #[must_use]
    pub fn openai_compatible(
        base_url: impl Into<String>,
        api_key_env: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key_env: api_key_env.into(),
            model: model.into(),
            timeout: Duration::from_secs(3600),
            temperature: None,
            max_tokens: None,
            extra_params: Value::Null,
            tools: Vec::new(),
            max_api_retry: 8,
        }
    }

    /// DeepSeek official endpoint; thinking enabled via the model name.
    #[must_use]
    pub fn deepseek() -> Self {
        Self::openai_compatible("https://api.deepseek.com", "DEEPSEEK_API_KEY", "deepseek-reasoner")
    }

    /// Moonshot/Kimi official endpoint; thinking enabled via the model name.
    #[must_use]
    pub fn moonshot() -> Self {
        Self::openai_compatible(
            "https://api.moonshot.cn/v1",
            "MOONSHOT_API_KEY",
            "kimi-k2-thinking",
        )
        .with_temperature(1.0)
    }

    /// Volcano Engine (Ark); deep thinking enabled through `extra_body`.
    #[must_use]
    pub fn volcano() -> Self {
        Self::openai_compatible(
            "https://ark.cn-beijing.volces.com/api/v3",
            "ARK_API_KEY",
            "deepseek-v3-2-251201",
        )
        .with_timeout(Duration::from_secs(120))
        .with_max_tokens(64000)
        .with_extra_params(serde_json::json!({"thinking": {"type": "enabled"}}))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub fn with_extra_params(mut self, extra: Value) -> Self {
        self.extra_params = extra;
        self
    }

    #[must_use]
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_max_api_retry(mut self, retries: u32) -> Self {
        self.max_api_retry = retries;
        self
    }

    /// Resolve the API key from the configured environment variable.
    pub fn resolve_api_key(&self) -> Result<String, LlmError> {
        std::env::var(&self.api_key_env).map_err(|_| LlmError::MissingApiKey {
            env: self.api_key_env.clone(),
        })
    }
}
