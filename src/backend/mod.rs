//! Uniform interface over the hosted image-generation services.
//!
//! Each adapter translates a [`GenerationRequest`] into the call shape its
//! service expects and maps the response back into a [`BackendResult`] or a
//! classified [`BackendError`]. Adapters are stateless per call; the only
//! shared state is configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::config::Config;

mod fal;
mod openai;
mod replicate;

pub use fal::{FluxImg2ImgBackend, GeminiBackend};
pub use openai::Dalle3Backend;
pub use replicate::{FluxBackend, FluxReduxBackend, RecraftBackend};

/// Exact pixel dimensions of a finished slide.
pub const TARGET_WIDTH: u32 = 1080;
pub const TARGET_HEIGHT: u32 = 1920;

/// Identifier of one hosted image-generation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendId {
    /// FLUX 1.1 Pro text-to-image via Replicate.
    Flux,
    /// Gemini 2.5 Flash image via FAL.
    Gemini,
    /// DALL-E 3 via the OpenAI Images API.
    Dalle3,
    /// Recraft V3 product compositing via Replicate.
    Recraft,
    /// FLUX image-to-image via FAL.
    FluxImg2Img,
    /// FLUX Redux identity-preserving variant via Replicate.
    FluxRedux,
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendId::Flux => write!(f, "flux"),
            BackendId::Gemini => write!(f, "gemini"),
            BackendId::Dalle3 => write!(f, "dalle3"),
            BackendId::Recraft => write!(f, "recraft"),
            BackendId::FluxImg2Img => write!(f, "flux_img2img"),
            BackendId::FluxRedux => write!(f, "flux_redux"),
        }
    }
}

/// Uniform request handed to every backend adapter.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// 1-based slide ordinal; used to namespace working files.
    pub slide: u8,
    pub prompt: String,
    /// Formatted reference photo. Only set when the target adapter accepts
    /// one; the orchestrator enforces that invariant.
    pub reference_image: Option<PathBuf>,
    /// Override of the adapter's default reference influence.
    pub strength: Option<f64>,
    /// Directory the resulting image is downloaded into.
    pub work_dir: PathBuf,
}

impl GenerationRequest {
    /// Strength to send, falling back to the adapter default.
    pub fn strength_or(&self, default: f64) -> f64 {
        self.strength.unwrap_or(default)
    }
}

/// Successful outcome of one backend invocation.
#[derive(Debug, Clone)]
pub struct BackendResult {
    pub image_path: PathBuf,
}

/// Failure classification the fallback orchestrator branches on.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("service error: {0}")]
    Service(String),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("reference image rejected: {0}")]
    UnsupportedReference(String),
}

impl BackendError {
    /// Retryable failures advance the fallback chain; permanent ones also
    /// short-circuit every remaining backend with the same requirement.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BackendError::Timeout(_) | BackendError::RateLimited(_) | BackendError::Service(_)
        )
    }

    /// Stable label recorded in the run metadata.
    pub fn label(&self) -> &'static str {
        match self {
            BackendError::Timeout(_) => "timeout",
            BackendError::RateLimited(_) => "rate_limited",
            BackendError::Service(_) => "service_error",
            BackendError::Auth(_) => "auth_error",
            BackendError::InvalidInput(_) => "invalid_input",
            BackendError::UnsupportedReference(_) => "unsupported_reference",
        }
    }
}

/// One hosted image-generation service.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    fn id(&self) -> BackendId;

    /// Whether the service can composite a product reference photo.
    fn accepts_reference(&self) -> bool {
        false
    }

    /// Default reference influence for image-to-image services.
    fn default_strength(&self) -> f64 {
        0.0
    }

    /// Ceiling after which an in-flight call counts as a retryable failure.
    /// The remote job may keep running; the client simply stops waiting.
    fn timeout(&self) -> Duration;

    async fn generate(&self, request: &GenerationRequest)
    -> Result<BackendResult, BackendError>;
}

/// All production adapters, keyed by id. Adapters for services whose
/// credential is absent are still constructed; config validation guarantees
/// the reachable chains are backed before any slide work starts.
pub fn registry(config: &Config) -> HashMap<BackendId, Arc<dyn ImageBackend>> {
    let http = reqwest::Client::new();
    let backends = &config.backends;
    let poll_interval = Duration::from_millis(backends.poll_interval_ms);

    let all: Vec<Arc<dyn ImageBackend>> = vec![
        Arc::new(FluxBackend::new(
            http.clone(),
            backends.replicate_api_token.clone(),
            poll_interval,
        )),
        Arc::new(RecraftBackend::new(
            http.clone(),
            backends.replicate_api_token.clone(),
            poll_interval,
        )),
        Arc::new(FluxReduxBackend::new(
            http.clone(),
            backends.replicate_api_token.clone(),
            poll_interval,
        )),
        Arc::new(GeminiBackend::new(http.clone(), backends.fal_key.clone())),
        Arc::new(FluxImg2ImgBackend::new(
            http.clone(),
            backends.fal_key.clone(),
        )),
        Arc::new(Dalle3Backend::new(http, backends.openai_api_key.clone())),
    ];

    all.into_iter().map(|b| (b.id(), b)).collect()
}

/// Maps an HTTP error status to the orchestrator's failure taxonomy.
pub fn classify_status(status: reqwest::StatusCode, detail: &str) -> BackendError {
    let detail = format!("HTTP {}: {}", status.as_u16(), detail.trim());
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        BackendError::RateLimited(detail)
    } else if status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
    {
        BackendError::Auth(detail)
    } else if status.is_client_error() {
        BackendError::InvalidInput(detail)
    } else {
        BackendError::Service(detail)
    }
}

/// Maps a transport-level failure. Connection drops and read timeouts are
/// transient by nature.
pub(crate) fn transport_error(err: reqwest::Error) -> BackendError {
    BackendError::Service(err.to_string())
}

/// Downloads a result image into the work directory under a
/// slide-namespaced filename.
pub(crate) async fn download_image(
    http: &reqwest::Client,
    url: &str,
    work_dir: &Path,
    filename: &str,
) -> Result<PathBuf, BackendError> {
    let response = http.get(url).send().await.map_err(transport_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(classify_status(status, "image download failed"));
    }
    let bytes = response.bytes().await.map_err(transport_error)?;

    std::fs::create_dir_all(work_dir)
        .map_err(|e| BackendError::Service(format!("cannot create work dir: {}", e)))?;
    let path = work_dir.join(filename);
    std::fs::write(&path, &bytes)
        .map_err(|e| BackendError::Service(format!("cannot write {}: {}", path.display(), e)))?;
    Ok(path)
}

/// Resizes a downloaded slide to exactly 1080x1920 when the service returned
/// another size.
pub(crate) fn ensure_portrait(path: &Path) -> Result<(), BackendError> {
    let img = image::open(path)
        .map_err(|e| BackendError::Service(format!("unreadable result image: {}", e)))?;
    if img.width() == TARGET_WIDTH && img.height() == TARGET_HEIGHT {
        return Ok(());
    }
    img.resize_exact(TARGET_WIDTH, TARGET_HEIGHT, FilterType::Lanczos3)
        .to_rgb8()
        .save(path)
        .map_err(|e| BackendError::Service(format!("cannot resize result image: {}", e)))
}

/// Inlines the reference photo as a data URI. The services accept URLs or
/// data URIs for reference inputs; inlining avoids a separate upload step.
pub(crate) fn reference_data_uri(request: &GenerationRequest) -> Result<String, BackendError> {
    let Some(path) = &request.reference_image else {
        return Err(BackendError::InvalidInput(
            "this backend requires a product reference image".into(),
        ));
    };
    let bytes = std::fs::read(path).map_err(|e| {
        BackendError::UnsupportedReference(format!(
            "cannot read reference image {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(bytes)))
}
