use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::config::{Config, FormatMode, LlmProvider, ProductModel};

/// carousel-rs - TikTok VSL carousel generator
#[derive(Parser, Debug)]
#[command(name = "carousel-rs")]
#[command(
    about = "Generates a complete 10-slide TikTok VSL carousel: an LLM writes the script, hosted image models render the slides, and FFmpeg burns the captions."
)]
#[command(version)]
pub struct Args {
    /// Product name
    #[arg(short, long)]
    pub product: String,

    /// Brand name
    #[arg(short, long)]
    pub brand: Option<String>,

    /// Product price
    #[arg(long)]
    pub price: Option<f64>,

    /// Price currency code
    #[arg(long)]
    pub currency: Option<String>,

    /// Product category
    #[arg(long)]
    pub category: Option<String>,

    /// Key product feature, repeatable
    #[arg(long)]
    pub features: Vec<String>,

    /// Target audience description
    #[arg(long)]
    pub target_audience: Option<String>,

    /// Reference product photo for the closing slides
    #[arg(long)]
    pub product_image: Option<PathBuf>,

    /// Backend for the product slides (recraft, flux_img2img, flux_redux)
    #[arg(long)]
    pub product_model: Option<String>,

    /// Reference photo fit mode (cover, contain, stretch)
    #[arg(long)]
    pub format_mode: Option<String>,

    /// Use Gemini instead of FLUX for the scene slides
    #[arg(long)]
    pub use_gemini: bool,

    /// Keep the raw generated images, without caption overlays
    #[arg(long)]
    pub skip_text_overlay: bool,

    /// Output path
    #[arg(short, long)]
    pub output_path: Option<PathBuf>,

    /// Config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose progress output
    #[arg(short, long)]
    pub verbose: bool,

    /// LLM provider (openai, anthropic, openrouter, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// LLM API key
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// LLM API base URL
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// Model used for script generation
    #[arg(long)]
    pub model: Option<String>,

    /// Model tried when the primary model keeps failing
    #[arg(long)]
    pub model_fallback: Option<String>,
}

impl Args {
    /// Converts CLI arguments into a configuration: config file first, then
    /// CLI overrides on top.
    pub fn into_config(self) -> Result<Config> {
        let mut config = if let Some(config_path) = &self.config {
            Config::from_file(config_path)
                .with_context(|| format!("Failed to load config file {:?}", config_path))?
        } else {
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("carousel.toml");

            if default_config_path.exists() {
                Config::from_file(&default_config_path).with_context(|| {
                    format!("Failed to load config file {:?}", default_config_path)
                })?
            } else {
                Config::default()
            }
        };

        // Product brief
        config.request.product = self.product;
        if let Some(brand) = self.brand {
            config.request.brand = brand;
        }
        if let Some(price) = self.price {
            config.request.price = price;
        }
        if let Some(currency) = self.currency {
            config.request.currency = currency;
        }
        if let Some(category) = self.category {
            config.request.category = category;
        }
        if !self.features.is_empty() {
            config.request.features = self.features;
        }
        if let Some(target_audience) = self.target_audience {
            config.request.target_audience = target_audience;
        }
        if let Some(product_image) = self.product_image {
            config.request.product_image = Some(product_image);
        }

        // Image generation
        if let Some(product_model_str) = self.product_model {
            if let Ok(product_model) = product_model_str.parse::<ProductModel>() {
                config.product_model = product_model;
            } else {
                eprintln!(
                    "⚠️  Unknown product model: {}, using default ({})",
                    product_model_str, config.product_model
                );
            }
        }
        if let Some(format_mode_str) = self.format_mode {
            if let Ok(format_mode) = format_mode_str.parse::<FormatMode>() {
                config.format_mode = format_mode;
            } else {
                eprintln!(
                    "⚠️  Unknown format mode: {}, using default ({})",
                    format_mode_str, config.format_mode
                );
            }
        }
        if self.use_gemini {
            config.use_gemini = true;
        }
        if self.skip_text_overlay {
            config.skip_text_overlay = true;
        }
        if let Some(output_path) = self.output_path {
            config.output_path = output_path;
        }

        // LLM overrides
        if let Some(provider_str) = self.llm_provider {
            if let Ok(provider) = provider_str.parse::<LlmProvider>() {
                config.llm.provider = provider;
            } else {
                eprintln!(
                    "⚠️  Unknown provider: {}, using default ({})",
                    provider_str, config.llm.provider
                );
            }
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(model) = self.model {
            config.llm.model = model;
        }
        if let Some(model_fallback) = self.model_fallback {
            config.llm.model_fallback = Some(model_fallback);
        }

        config.verbose = self.verbose;

        Ok(config)
    }
}

// Include tests
#[cfg(test)]
mod tests;
