//! Configuration types for outline generation and rendering.
//!
//! Generation behaviour is controlled through [`MindMapConfig`], built via
//! [`MindMapConfigBuilder`]. Visual settings handed to the rendering
//! collaborator live in [`RenderOptions`], which serialises to the option
//! names the markmap viewer understands.

use crate::error::MindMapError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default model when a provider is named but no model is.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Default per-call LLM timeout, in seconds.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 120;

/// Default timeout for downloading URL inputs, in seconds.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 120;

/// Configuration for turning a document into a mind map.
///
/// # Example
/// ```rust
/// use pdf2mindmap::MindMapConfig;
///
/// let config = MindMapConfig::builder()
///     .model("gpt-4.1-mini")
///     .temperature(0.2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct MindMapConfig {
    /// LLM model identifier, e.g. "gpt-4.1-mini", "claude-sonnet-4-20250514".
    /// If None, uses [`DEFAULT_MODEL`] or the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.2.
    ///
    /// Summarisation benefits from a little freedom in wording, but the
    /// outline structure must stay stable between runs.
    pub temperature: f32,

    /// Maximum tokens the model may generate for the outline. Default: 4096.
    pub max_tokens: usize,

    /// Transport-level retries on a failed LLM call. Default: 0.
    ///
    /// A failed generation normally goes back to the user, who triggers a
    /// fresh request. Raise this for unattended batch runs.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds. Default: 120.
    ///
    /// A whole document goes out in one request, so this is generous
    /// compared to per-page calls.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Visual settings passed to the renderer.
    pub render: RenderOptions,
}

impl Default for MindMapConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 4096,
            max_retries: 0,
            retry_backoff_ms: 500,
            api_timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            password: None,
            system_prompt: None,
            render: RenderOptions::default(),
        }
    }
}

impl fmt::Debug for MindMapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MindMapConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("render", &self.render)
            .finish()
    }
}

impl MindMapConfig {
    /// Create a new builder for `MindMapConfig`.
    pub fn builder() -> MindMapConfigBuilder {
        MindMapConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`MindMapConfig`].
#[derive(Debug)]
pub struct MindMapConfigBuilder {
    config: MindMapConfig,
}

impl MindMapConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn render(mut self, options: RenderOptions) -> Self {
        self.config.render = options;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<MindMapConfig, MindMapError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(MindMapError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(MindMapError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.system_prompt.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(MindMapError::InvalidConfig(
                "System prompt must not be blank".into(),
            ));
        }
        c.render.validate()?;
        Ok(self.config)
    }
}

// ── Rendering ────────────────────────────────────────────────────────────

/// Visual settings for the rendered mind map.
///
/// Field names serialise in camelCase to match markmap's option keys, so the
/// HTML renderer can embed this struct verbatim. The palette is handled
/// separately because markmap expects a colour *function*.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    /// Branch colours indexed by depth (wrapping). Default: d3 category10.
    #[serde(skip)]
    pub palette: Vec<String>,

    /// Maximum label width in pixels before wrapping. 0 disables wrapping.
    pub max_width: u32,

    /// Minimum node height in pixels.
    pub node_min_height: u32,

    /// Horizontal padding inside a node label.
    pub padding_x: u32,

    /// Horizontal gap between depth levels.
    pub spacing_horizontal: u32,

    /// Vertical gap between siblings.
    pub spacing_vertical: u32,

    /// Expand/collapse animation duration in milliseconds.
    pub duration: u32,

    /// Depth to which nodes start expanded; -1 expands everything.
    pub initial_expand_level: i32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            palette: [
                "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2",
                "#7f7f7f", "#bcbd22", "#17becf",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            max_width: 300,
            node_min_height: 16,
            padding_x: 8,
            spacing_horizontal: 80,
            spacing_vertical: 5,
            duration: 500,
            initial_expand_level: -1,
        }
    }
}

impl RenderOptions {
    /// Colour for a node at `depth`.
    pub fn color_for_depth(&self, depth: usize) -> Option<&str> {
        if self.palette.is_empty() {
            return None;
        }
        Some(self.palette[depth % self.palette.len()].as_str())
    }

    fn validate(&self) -> Result<(), MindMapError> {
        if self.palette.is_empty() {
            return Err(MindMapError::InvalidConfig(
                "Render palette needs at least one colour".into(),
            ));
        }
        if let Some(bad) = self.palette.iter().find(|c| !is_css_colour(c)) {
            return Err(MindMapError::InvalidConfig(format!(
                "Palette entry '{bad}' is not a #rgb / #rrggbb colour"
            )));
        }
        if self.initial_expand_level < -1 {
            return Err(MindMapError::InvalidConfig(format!(
                "initial_expand_level must be ≥ -1, got {}",
                self.initial_expand_level
            )));
        }
        Ok(())
    }
}

fn is_css_colour(s: &str) -> bool {
    s.strip_prefix('#').is_some_and(|hex| {
        matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
    })
}
