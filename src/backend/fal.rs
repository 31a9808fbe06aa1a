//! FAL-hosted models: Gemini 2.5 Flash image and FLUX image-to-image.
//!
//! FAL's synchronous endpoint blocks until the image is ready, so these
//! adapters are a single POST plus the result download.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{
    BackendError, BackendId, BackendResult, GenerationRequest, ImageBackend, classify_status,
    download_image, ensure_portrait, reference_data_uri, transport_error,
};

const API_BASE: &str = "https://fal.run";

async fn invoke(
    http: &reqwest::Client,
    key: &str,
    model_path: &str,
    payload: Value,
) -> Result<Value, BackendError> {
    let response = http
        .post(format!("{}/{}", API_BASE, model_path))
        .header("Authorization", format!("Key {}", key))
        .json(&payload)
        .send()
        .await
        .map_err(transport_error)?;

    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;
    if !status.is_success() {
        return Err(classify_status(status, &body));
    }
    serde_json::from_str(&body)
        .map_err(|e| BackendError::Service(format!("malformed FAL response: {}", e)))
}

/// FAL responses carry either an `images` array or a single `image` object.
fn result_image_url(result: &Value) -> Result<String, BackendError> {
    result["images"]
        .get(0)
        .and_then(|img| img["url"].as_str())
        .or_else(|| result["image"]["url"].as_str())
        .map(str::to_string)
        .ok_or_else(|| BackendError::Service("no image URL in FAL response".into()))
}

/// Gemini 2.5 Flash image generation. Faster and cheaper than FLUX; selected
/// for scene slides via `--use-gemini`, and the no-reference tail of the
/// product chains.
pub struct GeminiBackend {
    http: reqwest::Client,
    key: String,
}

impl GeminiBackend {
    pub fn new(http: reqwest::Client, key: String) -> Self {
        Self { http, key }
    }

    fn enhance_prompt(prompt: &str) -> String {
        format!(
            "{}, professional photography, 9:16 vertical format, commercial quality, sharp focus, natural colors, photorealistic",
            prompt
        )
    }
}

#[async_trait]
impl ImageBackend for GeminiBackend {
    fn id(&self) -> BackendId {
        BackendId::Gemini
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(90)
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<BackendResult, BackendError> {
        let payload = json!({
            "prompt": Self::enhance_prompt(&request.prompt),
            "aspect_ratio": "9:16",
            "num_inference_steps": 28,
            "enable_safety_checker": false,
        });
        let result = invoke(
            &self.http,
            &self.key,
            "fal-ai/gemini-25-flash-image",
            payload,
        )
        .await?;
        let url = result_image_url(&result)?;

        let path = download_image(
            &self.http,
            &url,
            &request.work_dir,
            &format!("slide_{}_gemini.jpg", request.slide),
        )
        .await?;
        ensure_portrait(&path)?;
        Ok(BackendResult { image_path: path })
    }
}

/// FLUX image-to-image seeded with the product reference. A low strength
/// keeps the generation a scene featuring the product rather than a close-up
/// of the reference itself.
pub struct FluxImg2ImgBackend {
    http: reqwest::Client,
    key: String,
}

impl FluxImg2ImgBackend {
    pub fn new(http: reqwest::Client, key: String) -> Self {
        Self { http, key }
    }

    fn enhance_prompt(prompt: &str) -> String {
        format!(
            "{}, professional photography, 9:16 vertical format, commercial quality, sharp focus, natural colors. \
             Prominently feature the exact product shown in the reference image.",
            prompt
        )
    }
}

#[async_trait]
impl ImageBackend for FluxImg2ImgBackend {
    fn id(&self) -> BackendId {
        BackendId::FluxImg2Img
    }

    fn accepts_reference(&self) -> bool {
        true
    }

    fn default_strength(&self) -> f64 {
        0.40
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(150)
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<BackendResult, BackendError> {
        let reference = reference_data_uri(request)?;
        let payload = json!({
            "prompt": Self::enhance_prompt(&request.prompt),
            "image_url": reference,
            "strength": request.strength_or(self.default_strength()),
            "num_inference_steps": 35,
            "guidance_scale": 4.5,
            "image_size": { "width": super::TARGET_WIDTH, "height": super::TARGET_HEIGHT },
            "enable_safety_checker": false,
        });
        let result = invoke(
            &self.http,
            &self.key,
            "fal-ai/flux-general/image-to-image",
            payload,
        )
        .await?;
        let url = result_image_url(&result)?;

        let path = download_image(
            &self.http,
            &url,
            &request.work_dir,
            &format!("slide_{}_flux_img2img.jpg", request.slide),
        )
        .await?;
        ensure_portrait(&path)?;
        Ok(BackendResult { image_path: path })
    }
}
