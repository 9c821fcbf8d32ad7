//! Configuration types for PDF comparison runs.
//!
//! All run behaviour is controlled through [`CompareConfig`], built via its
//! [`CompareConfigBuilder`]. The builder clamps numeric knobs to their
//! documented ranges and `build()` rejects combinations that cannot work.
//!
//! The API credential is part of the configuration rather than something the
//! pipeline reads from the process environment. The CLI loads it with
//! [`Credential::from_env`]; library callers and tests pass one explicitly.

use crate::error::CompareError;
use crate::pipeline::extract::TextExtractor;
use crate::pipeline::llm::{ChatModel, Sampling};
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Default provider name.
pub const DEFAULT_PROVIDER: &str = "openai";

/// Characters of each document's text embedded in its summary prompt.
pub const DEFAULT_CHAR_BUDGET: usize = 8000;

/// Accepted range for `max_tokens`.
pub const MAX_TOKENS_RANGE: (usize, usize) = (512, 8192);

/// Accepted range for `temperature`.
pub const TEMPERATURE_RANGE: (f32, f32) = (0.0, 1.0);

/// Environment variable holding the API key for a provider.
///
/// Returns `None` for local providers that run without a key.
pub fn credential_env_var(provider: &str) -> Option<String> {
    match provider.to_ascii_lowercase().as_str() {
        "ollama" | "lmstudio" | "lm-studio" => None,
        "openai" => Some("OPENAI_API_KEY".to_string()),
        "anthropic" => Some("ANTHROPIC_API_KEY".to_string()),
        "gemini" | "google" => Some("GEMINI_API_KEY".to_string()),
        "mistral" => Some("MISTRAL_API_KEY".to_string()),
        "azure" => Some("AZURE_OPENAI_API_KEY".to_string()),
        "openrouter" => Some("OPENROUTER_API_KEY".to_string()),
        other => Some(format!(
            "{}_API_KEY",
            other.to_ascii_uppercase().replace('-', "_")
        )),
    }
}

/// An API credential. The secret never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    secret: String,
    source: String,
}

impl Credential {
    /// A credential supplied directly by the caller.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            source: "explicit value".to_string(),
        }
    }

    /// A placeholder for providers that need no key (local servers).
    pub fn not_required() -> Self {
        Self {
            secret: String::new(),
            source: "not required".to_string(),
        }
    }

    /// Load the credential for `provider` from its conventional environment variable.
    ///
    /// Returns `None` when the variable is unset or empty, and a
    /// [`Credential::not_required`] for keyless providers.
    pub fn from_env(provider: &str) -> Option<Self> {
        match credential_env_var(provider) {
            None => Some(Self::not_required()),
            Some(var) => std::env::var(&var)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|secret| Self {
                    secret,
                    source: var,
                }),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Where the credential came from (an env var name or "explicit value").
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// TrueType font family used by the report renderer.
///
/// genpdf loads `<family>-Regular.ttf`, `-Bold.ttf`, `-Italic.ttf` and
/// `-BoldItalic.ttf` from a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSettings {
    /// Directory to load from. `None` searches [`FontSettings::SEARCH_DIRS`].
    pub dir: Option<PathBuf>,
    /// Family base name. Default: `LiberationSans`.
    pub family: String,
}

impl FontSettings {
    /// Directories searched when no explicit font directory is configured.
    pub const SEARCH_DIRS: &'static [&'static str] = &[
        "./fonts",
        "/usr/share/fonts/truetype/liberation",
        "/usr/share/fonts/truetype/liberation2",
        "/usr/share/fonts/liberation-sans",
        "/usr/share/fonts/liberation",
        "/usr/share/fonts/TTF",
        "/usr/local/share/fonts",
        "/Library/Fonts",
    ];

    /// Candidate directories in search order.
    pub fn candidate_dirs(&self) -> Vec<PathBuf> {
        match &self.dir {
            Some(dir) => vec![dir.clone()],
            None => Self::SEARCH_DIRS.iter().map(PathBuf::from).collect(),
        }
    }
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            dir: None,
            family: "LiberationSans".to_string(),
        }
    }
}

/// Configuration for a comparison run.
///
/// Built via [`CompareConfig::builder()`] or [`CompareConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdfcompare::{CompareConfig, Credential};
///
/// let config = CompareConfig::builder()
///     .model("gpt-4.1-mini")
///     .temperature(0.3)
///     .max_tokens(2048)
///     .credential(Credential::new("sk-test"))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct CompareConfig {
    /// LLM model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama"). Default: "openai".
    pub provider_name: String,

    /// Pre-constructed model. Takes precedence over `provider_name` / `model`.
    pub model_client: Option<Arc<dyn ChatModel>>,

    /// Credential gating the run. `None` means the run is rejected.
    pub credential: Option<Credential>,

    /// Sampling temperature, 0.0–1.0. Default: 0.2.
    ///
    /// Summaries and comparison objects are structured output; low values
    /// keep the model on the requested JSON shape.
    pub temperature: f32,

    /// Maximum output tokens per call, 512–8192. Default: 2048.
    pub max_tokens: usize,

    /// Characters of each document included in its summary prompt. Default: 8000.
    ///
    /// Bounds prompt size and cost. Everything after the budget is dropped;
    /// there is no chunking.
    pub char_budget: usize,

    /// How many summary calls may be in flight at once. Default: 1 (sequential).
    ///
    /// Summaries are independent of each other, so a higher value is safe;
    /// results are always kept in input order.
    pub summary_concurrency: usize,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Report font family.
    pub fonts: FontSettings,

    /// Custom text extractor. Default: pdfium.
    pub extractor: Option<Arc<dyn TextExtractor>>,

    /// Progress events sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider_name: DEFAULT_PROVIDER.to_string(),
            model_client: None,
            credential: None,
            temperature: 0.2,
            max_tokens: 2048,
            char_budget: DEFAULT_CHAR_BUDGET,
            summary_concurrency: 1,
            download_timeout_secs: 120,
            fonts: FontSettings::default(),
            extractor: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CompareConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompareConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field(
                "model_client",
                &self.model_client.as_ref().map(|m| m.model_name().to_string()),
            )
            .field("credential", &self.credential)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("char_budget", &self.char_budget)
            .field("summary_concurrency", &self.summary_concurrency)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("fonts", &self.fonts)
            .field("extractor", &self.extractor.as_ref().map(|_| "<dyn TextExtractor>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ComparisonProgressCallback>"),
            )
            .finish()
    }
}

impl CompareConfig {
    /// Create a new builder for `CompareConfig`.
    pub fn builder() -> CompareConfigBuilder {
        CompareConfigBuilder {
            config: Self::default(),
        }
    }

    /// Sampling settings shared by every call of the run.
    pub fn sampling(&self) -> Sampling {
        Sampling {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// The credential, or the error that rejects the run.
    pub fn require_credential(&self) -> Result<&Credential, CompareError> {
        self.credential
            .as_ref()
            .ok_or_else(|| CompareError::MissingCredential {
                provider: self.provider_name.clone(),
                env_var: credential_env_var(&self.provider_name)
                    .unwrap_or_else(|| "an API key variable".to_string()),
            })
    }
}

/// Builder for [`CompareConfig`].
pub struct CompareConfigBuilder {
    config: CompareConfig,
}

impl fmt::Debug for CompareConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompareConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl CompareConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn model_client(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.config.model_client = Some(model);
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.config.credential = Some(credential);
        self
    }

    /// Set or clear the credential.
    pub fn maybe_credential(mut self, credential: Option<Credential>) -> Self {
        self.config.credential = credential;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.clamp(MAX_TOKENS_RANGE.0, MAX_TOKENS_RANGE.1);
        self
    }

    pub fn char_budget(mut self, chars: usize) -> Self {
        self.config.char_budget = chars;
        self
    }

    pub fn summary_concurrency(mut self, n: usize) -> Self {
        self.config.summary_concurrency = n.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn fonts(mut self, fonts: FontSettings) -> Self {
        self.config.fonts = fonts;
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CompareConfig, CompareError> {
        let c = &self.config;
        if c.model.trim().is_empty() && c.model_client.is_none() {
            return Err(CompareError::InvalidConfig("Model must not be empty".into()));
        }
        if c.provider_name.trim().is_empty() && c.model_client.is_none() {
            return Err(CompareError::InvalidConfig(
                "Provider must not be empty".into(),
            ));
        }
        if c.char_budget == 0 {
            return Err(CompareError::InvalidConfig(
                "Character budget must be ≥ 1".into(),
            ));
        }
        if !c.temperature.is_finite() {
            return Err(CompareError::InvalidConfig(format!(
                "Temperature must be {}–{}, got {}",
                TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1, c.temperature
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = CompareConfig::default();
        assert_eq!(c.model, DEFAULT_MODEL);
        assert_eq!(c.provider_name, "openai");
        assert_eq!(c.char_budget, 8000);
        assert_eq!(c.summary_concurrency, 1);
        assert!(c.credential.is_none());
        assert_eq!(
            c.sampling(),
            Sampling {
                temperature: 0.2,
                max_tokens: 2048
            }
        );
    }

    #[test]
    fn builder_clamps_ranges() {
        let c = CompareConfig::builder()
            .temperature(1.7)
            .max_tokens(100_000)
            .summary_concurrency(0)
            .build()
            .unwrap();
        assert_eq!(c.temperature, 1.0);
        assert_eq!(c.max_tokens, 8192);
        assert_eq!(c.summary_concurrency, 1);

        let c = CompareConfig::builder()
            .temperature(-0.5)
            .max_tokens(10)
            .build()
            .unwrap();
        assert_eq!(c.temperature, 0.0);
        assert_eq!(c.max_tokens, 512);
    }

    #[test]
    fn zero_budget_rejected() {
        let err = CompareConfig::builder().char_budget(0).build().unwrap_err();
        assert!(matches!(err, CompareError::InvalidConfig(_)));
    }

    #[test]
    fn missing_credential_names_provider_variable() {
        let c = CompareConfig::builder()
            .provider_name("anthropic")
            .build()
            .unwrap();
        match c.require_credential().unwrap_err() {
            CompareError::MissingCredential { provider, env_var } => {
                assert_eq!(provider, "anthropic");
                assert_eq!(env_var, "ANTHROPIC_API_KEY");
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn credential_debug_is_redacted() {
        let c = Credential::new("sk-very-secret");
        let dbg = format!("{:?}", c);
        assert!(!dbg.contains("sk-very-secret"));
        assert_eq!(c.secret(), "sk-very-secret");

        let cfg = CompareConfig::builder().credential(c).build().unwrap();
        assert!(!format!("{:?}", cfg).contains("sk-very-secret"));
    }

    #[test]
    fn env_var_mapping() {
        assert_eq!(credential_env_var("openai").as_deref(), Some("OPENAI_API_KEY"));
        assert_eq!(credential_env_var("Gemini").as_deref(), Some("GEMINI_API_KEY"));
        assert_eq!(credential_env_var("ollama"), None);
        assert_eq!(
            credential_env_var("my-proxy").as_deref(),
            Some("MY_PROXY_API_KEY")
        );
    }

    #[test]
    fn keyless_provider_needs_no_env() {
        let c = Credential::from_env("ollama").unwrap();
        assert_eq!(c.source(), "not required");
    }

    #[test]
    fn font_candidates() {
        let default = FontSettings::default();
        assert_eq!(default.candidate_dirs().len(), FontSettings::SEARCH_DIRS.len());

        let explicit = FontSettings {
            dir: Some(PathBuf::from("/opt/fonts")),
            family: "DejaVuSans".into(),
        };
        assert_eq!(explicit.candidate_dirs(), vec![PathBuf::from("/opt/fonts")]);
    }
}
