//! Core data types shared across the pipeline.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Number of slides in a finished carousel.
pub const SLIDE_COUNT: usize = 10;

/// First slide that shows the product itself when a reference photo is supplied.
/// Slides before this one set the scene without naming the product.
pub const FIRST_PRODUCT_SLIDE: u8 = 8;

/// Classification of a carousel position, determining default backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideRole {
    /// Narrative slide, rendered from the prompt alone.
    Scene,
    /// Product slide, composited around the reference photo when one exists.
    Product,
}

impl std::fmt::Display for SlideRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlideRole::Scene => write!(f, "scene"),
            SlideRole::Product => write!(f, "product"),
        }
    }
}

/// One slide of the generated script, as extracted from the LLM response.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SlideScript {
    /// 1-based slide position.
    pub position: u8,
    /// Persuasive caption burned onto the slide.
    pub caption: String,
    /// Prompt handed to the image-generation backends.
    pub image_prompt: String,
}

/// The complete 10-slide script returned by the script generator.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CarouselScript {
    pub slides: Vec<SlideScript>,
}

/// Product metadata describing one carousel run. Immutable once the run starts.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CarouselRequest {
    pub product: String,
    pub brand: String,
    pub price: f64,
    pub currency: String,
    pub category: String,
    pub features: Vec<String>,
    pub target_audience: String,
    /// Reference product photo used for slides 8-10.
    pub product_image: Option<PathBuf>,
}

/// A slide moving through the pipeline. Owned by the run coordinator and
/// mutated in place as each stage finishes.
#[derive(Debug, Clone)]
pub struct Slide {
    pub position: u8,
    pub role: SlideRole,
    pub caption: String,
    pub image_prompt: String,
    /// Path of the most recent rendition of this slide.
    pub image_path: Option<PathBuf>,
    pub overlay: OverlayStatus,
    /// Set when the whole fallback chain was exhausted.
    pub failed: bool,
}

impl Slide {
    pub fn from_script(script: SlideScript, role: SlideRole) -> Self {
        Self {
            position: script.position,
            role,
            caption: script.caption,
            image_prompt: script.image_prompt,
            image_path: None,
            overlay: OverlayStatus::Skipped,
            failed: false,
        }
    }
}

/// Whether the caption overlay made it onto the final image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayStatus {
    Applied,
    Skipped,
    Failed,
}

/// Outcome of one backend invocation, kept for the run record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub backend: String,
    /// "ok" or the failure classification label.
    pub outcome: String,
    pub latency_ms: u64,
}

/// Per-slide entry of the run metadata, keyed by ordinal rather than by
/// completion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideRecord {
    pub position: u8,
    pub role: SlideRole,
    pub caption: String,
    pub image_prompt: String,
    /// Backend that produced the final image, if any succeeded.
    pub backend: Option<String>,
    pub attempts: Vec<AttemptRecord>,
    pub overlay: OverlayStatus,
    pub failed: bool,
}

/// Record written once per run, immutable afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub product: String,
    pub brand: String,
    pub price: f64,
    pub currency: String,
    pub category: String,
    pub product_model: String,
    pub format_mode: String,
    pub created_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub slide_count: usize,
    pub slides: Vec<SlideRecord>,
}
