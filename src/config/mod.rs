use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use crate::backend::BackendId;
use crate::types::CarouselRequest;

/// LLM provider used for script generation.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "anthropic")]
    #[default]
    Anthropic,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::OpenAI => write!(f, "openai"),
            LlmProvider::Anthropic => write!(f, "anthropic"),
            LlmProvider::OpenRouter => write!(f, "openrouter"),
            LlmProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAI),
            "anthropic" => Ok(LlmProvider::Anthropic),
            "openrouter" => Ok(LlmProvider::OpenRouter),
            "ollama" => Ok(LlmProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// Model used for the product slides (8-10) when a reference photo is supplied.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
pub enum ProductModel {
    /// Recraft V3, the highest-fidelity product compositing.
    #[serde(rename = "recraft")]
    #[default]
    Recraft,
    /// FLUX image-to-image with the reference photo as the init image.
    #[serde(rename = "flux_img2img")]
    FluxImg2Img,
    /// FLUX Redux identity-preserving variant.
    #[serde(rename = "flux_redux")]
    FluxRedux,
}

impl std::fmt::Display for ProductModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductModel::Recraft => write!(f, "recraft"),
            ProductModel::FluxImg2Img => write!(f, "flux_img2img"),
            ProductModel::FluxRedux => write!(f, "flux_redux"),
        }
    }
}

impl std::str::FromStr for ProductModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "recraft" => Ok(ProductModel::Recraft),
            "flux_img2img" => Ok(ProductModel::FluxImg2Img),
            "flux_redux" => Ok(ProductModel::FluxRedux),
            _ => Err(format!("Unknown product model: {}", s)),
        }
    }
}

/// How the reference photo is fitted into the 9:16 frame.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormatMode {
    /// Crop to fill, center-weighted.
    #[default]
    Cover,
    /// Uniform scale, padded with a white background.
    Contain,
    /// Non-uniform scale to exact target dimensions, accepting distortion.
    Stretch,
}

impl std::fmt::Display for FormatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatMode::Cover => write!(f, "cover"),
            FormatMode::Contain => write!(f, "contain"),
            FormatMode::Stretch => write!(f, "stretch"),
        }
    }
}

impl std::str::FromStr for FormatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cover" => Ok(FormatMode::Cover),
            "contain" => Ok(FormatMode::Contain),
            "stretch" => Ok(FormatMode::Stretch),
            _ => Err(format!("Unknown format mode: {}", s)),
        }
    }
}

/// Application configuration, constructed once at startup and passed by
/// reference into every component.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Product metadata for this run.
    pub request: CarouselRequest,

    /// Backend used for the product slides.
    pub product_model: ProductModel,

    /// Fit mode for the reference photo.
    pub format_mode: FormatMode,

    /// Use Gemini 2.5 Flash instead of FLUX for the scene slides.
    pub use_gemini: bool,

    /// Keep the raw generated images, without caption overlays.
    pub skip_text_overlay: bool,

    /// Directory the run directories are created under.
    pub output_path: PathBuf,

    /// Scratch directory for intermediate slide files.
    pub work_path: PathBuf,

    /// Verbose progress output.
    pub verbose: bool,

    /// Script-generation LLM configuration.
    pub llm: LlmConfig,

    /// Image backend credentials and tuning.
    pub backends: BackendConfig,

    /// Caption overlay configuration.
    pub overlay: OverlayConfig,
}

/// LLM configuration for the script generator.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,

    pub api_key: String,

    /// API base URL; empty means the provider default.
    pub api_base_url: String,

    /// Model used for script generation.
    pub model: String,

    /// Model tried when the primary model keeps failing.
    pub model_fallback: Option<String>,

    pub max_tokens: u32,

    pub temperature: f64,

    /// Attempts per model before falling over.
    pub retry_attempts: u32,

    /// Delay between attempts, in milliseconds.
    pub retry_delay_ms: u64,
}

/// Credentials and tuning shared by the image backend adapters.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub replicate_api_token: String,

    pub fal_key: String,

    pub openai_api_key: String,

    /// Interval between prediction status polls, in milliseconds.
    pub poll_interval_ms: u64,
}

/// Caption overlay configuration. Defaults follow the TikTok style the
/// pipeline is tuned for: large white text with a thick dark outline,
/// anchored near the vertical center.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct OverlayConfig {
    pub ffmpeg_path: PathBuf,

    /// Preferred font; the renderer falls back to DejaVu Sans Bold when this
    /// file does not exist.
    pub font_path: PathBuf,

    pub font_size: u32,

    pub outline_width: u32,

    pub line_spacing: u32,

    /// Character count after which a caption line wraps.
    pub max_chars_per_line: usize,

    /// Vertical anchor as a fraction of the frame height.
    pub y_anchor: f64,
}

impl Config {
    /// Loads configuration from a TOML file. Missing sections keep their
    /// defaults, so a file may override only the keys it cares about.
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Ordered fallback chain for scene slides.
    pub fn scene_chain(&self) -> Vec<BackendId> {
        if self.use_gemini {
            vec![BackendId::Gemini, BackendId::Flux]
        } else {
            vec![BackendId::Flux, BackendId::Dalle3]
        }
    }

    /// Ordered fallback chain for product slides. Every chain ends in a
    /// backend that does not require the reference image, so a permanent
    /// reference failure still leaves a usable tail.
    pub fn product_chain(&self) -> Vec<BackendId> {
        match self.product_model {
            ProductModel::Recraft => vec![
                BackendId::Recraft,
                BackendId::FluxImg2Img,
                BackendId::Gemini,
            ],
            ProductModel::FluxImg2Img => vec![BackendId::FluxImg2Img, BackendId::Gemini],
            ProductModel::FluxRedux => vec![
                BackendId::FluxRedux,
                BackendId::FluxImg2Img,
                BackendId::Gemini,
            ],
        }
    }

    /// Credential backing a backend, as (value, env var name).
    fn credential_for(&self, id: BackendId) -> (&str, &'static str) {
        match id {
            BackendId::Flux | BackendId::Recraft | BackendId::FluxRedux => {
                (&self.backends.replicate_api_token, "REPLICATE_API_TOKEN")
            }
            BackendId::Gemini | BackendId::FluxImg2Img => (&self.backends.fal_key, "FAL_KEY"),
            BackendId::Dalle3 => (&self.backends.openai_api_key, "OPENAI_API_KEY"),
        }
    }

    /// Validates the configuration before any slide work starts. A missing
    /// credential for any backend reachable through the selected chains is a
    /// fatal error here, not a per-slide failure later.
    pub fn validate(&self) -> Result<()> {
        if self.request.product.trim().is_empty() {
            bail!("Product name must not be empty");
        }

        if self.llm.api_key.trim().is_empty() {
            bail!(
                "Missing LLM API key for script generation (set CAROUSEL_LLM_API_KEY or pass --llm-api-key)"
            );
        }

        let mut reachable = self.scene_chain();
        if self.request.product_image.is_some() {
            reachable.extend(self.product_chain());
        }
        for id in reachable {
            let (value, env_name) = self.credential_for(id);
            if value.trim().is_empty() {
                bail!(
                    "Missing credential for backend '{}' (set {} in the environment or .env)",
                    id,
                    env_name
                );
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request: CarouselRequest {
                currency: String::from("USD"),
                category: String::from("general"),
                target_audience: String::from("general consumers"),
                ..CarouselRequest::default()
            },
            product_model: ProductModel::default(),
            format_mode: FormatMode::default(),
            use_gemini: false,
            skip_text_overlay: false,
            output_path: PathBuf::from("./output"),
            work_path: PathBuf::from("./.carousel"),
            verbose: false,
            llm: LlmConfig::default(),
            backends: BackendConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            api_key: std::env::var("CAROUSEL_LLM_API_KEY")
                .or_else(|_| std::env::var("ANTHROPIC_API_KEY"))
                .unwrap_or_default(),
            api_base_url: String::new(),
            model: String::from("claude-3-opus-20240229"),
            model_fallback: None,
            max_tokens: 4000,
            temperature: 0.7,
            retry_attempts: 3,
            retry_delay_ms: 2000,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            replicate_api_token: std::env::var("REPLICATE_API_TOKEN").unwrap_or_default(),
            fal_key: std::env::var("FAL_KEY").unwrap_or_default(),
            openai_api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            poll_interval_ms: 2000,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            font_path: PathBuf::from("/usr/share/fonts/truetype/proxima/ProximaNovaSemibold.otf"),
            font_size: 75,
            outline_width: 4,
            line_spacing: 12,
            max_chars_per_line: 27,
            y_anchor: 0.50,
        }
    }
}
