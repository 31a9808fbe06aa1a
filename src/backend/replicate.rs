//! Replicate-hosted models: FLUX 1.1 Pro, Recraft V3 and FLUX Redux.
//!
//! Replicate is asynchronous: a prediction is created, then polled until it
//! reaches a terminal state. There is no mid-flight cancellation; when the
//! orchestrator's timeout fires the remote job may keep running server-side.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{
    BackendError, BackendId, BackendResult, GenerationRequest, ImageBackend, classify_status,
    download_image, ensure_portrait, reference_data_uri, transport_error,
};

const API_BASE: &str = "https://api.replicate.com/v1";

/// Creates a prediction for `model` and returns its output image URL.
async fn run_prediction(
    http: &reqwest::Client,
    token: &str,
    model: &str,
    input: Value,
    poll_interval: Duration,
) -> Result<String, BackendError> {
    let response = http
        .post(format!("{}/models/{}/predictions", API_BASE, model))
        .bearer_auth(token)
        .header("Prefer", "wait")
        .json(&json!({ "input": input }))
        .send()
        .await
        .map_err(transport_error)?;

    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;
    if !status.is_success() {
        return Err(classify_status(status, &body));
    }
    let mut prediction: Value = serde_json::from_str(&body)
        .map_err(|e| BackendError::Service(format!("malformed prediction response: {}", e)))?;

    loop {
        match prediction["status"].as_str() {
            Some("succeeded") => return output_url(&prediction),
            Some("failed") | Some("canceled") => {
                let detail = prediction["error"]
                    .as_str()
                    .unwrap_or("prediction failed without detail")
                    .to_string();
                return Err(BackendError::Service(detail));
            }
            _ => {
                tokio::time::sleep(poll_interval).await;
                let poll_url = prediction["urls"]["get"]
                    .as_str()
                    .ok_or_else(|| {
                        BackendError::Service("prediction is missing its poll URL".into())
                    })?
                    .to_string();
                let response = http
                    .get(&poll_url)
                    .bearer_auth(token)
                    .send()
                    .await
                    .map_err(transport_error)?;
                let status = response.status();
                let body = response.text().await.map_err(transport_error)?;
                if !status.is_success() {
                    return Err(classify_status(status, &body));
                }
                prediction = serde_json::from_str(&body).map_err(|e| {
                    BackendError::Service(format!("malformed prediction response: {}", e))
                })?;
            }
        }
    }
}

/// Replicate returns either a single URL or an array of them.
fn output_url(prediction: &Value) -> Result<String, BackendError> {
    let output = &prediction["output"];
    output
        .as_str()
        .or_else(|| output.get(0).and_then(Value::as_str))
        .map(str::to_string)
        .ok_or_else(|| BackendError::Service("prediction returned no output image".into()))
}

/// FLUX 1.1 Pro text-to-image. Default backend for scene slides.
pub struct FluxBackend {
    http: reqwest::Client,
    token: String,
    poll_interval: Duration,
}

impl FluxBackend {
    pub fn new(http: reqwest::Client, token: String, poll_interval: Duration) -> Self {
        Self {
            http,
            token,
            poll_interval,
        }
    }

    fn enhance_prompt(prompt: &str) -> String {
        format!(
            "{}, professional photography, 9:16 vertical format, commercial quality, sharp focus, natural colors",
            prompt
        )
    }
}

#[async_trait]
impl ImageBackend for FluxBackend {
    fn id(&self) -> BackendId {
        BackendId::Flux
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(120)
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<BackendResult, BackendError> {
        let input = json!({
            "prompt": Self::enhance_prompt(&request.prompt),
            "aspect_ratio": "9:16",
            "output_format": "jpg",
            "output_quality": 90,
            "safety_tolerance": 2,
        });
        let url = run_prediction(
            &self.http,
            &self.token,
            "black-forest-labs/flux-1.1-pro",
            input,
            self.poll_interval,
        )
        .await?;

        let path = download_image(
            &self.http,
            &url,
            &request.work_dir,
            &format!("slide_{}_flux.jpg", request.slide),
        )
        .await?;
        ensure_portrait(&path)?;
        Ok(BackendResult { image_path: path })
    }
}

/// Recraft V3 with a product reference. The strength parameter balances the
/// prompt against the reference photo; 0.5-0.8 keeps the product recognizable
/// while still generating a scene.
pub struct RecraftBackend {
    http: reqwest::Client,
    token: String,
    poll_interval: Duration,
}

impl RecraftBackend {
    pub fn new(http: reqwest::Client, token: String, poll_interval: Duration) -> Self {
        Self {
            http,
            token,
            poll_interval,
        }
    }

    fn enhance_prompt(prompt: &str) -> String {
        format!(
            "{}, professional photography, 9:16 vertical format, commercial quality, sharp focus, natural lighting, product photography style. \
             The scene prominently features the exact product from the reference image in a natural, engaging way.",
            prompt
        )
    }
}

#[async_trait]
impl ImageBackend for RecraftBackend {
    fn id(&self) -> BackendId {
        BackendId::Recraft
    }

    fn accepts_reference(&self) -> bool {
        true
    }

    fn default_strength(&self) -> f64 {
        0.65
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(180)
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<BackendResult, BackendError> {
        let reference = reference_data_uri(request)?;
        let input = json!({
            "prompt": Self::enhance_prompt(&request.prompt),
            "image": reference,
            "style": "realistic_image",
            "size": "1365x2048",
            "image_influence": request.strength_or(self.default_strength()),
            "output_format": "jpg",
            "output_quality": 90,
        });
        let url = run_prediction(
            &self.http,
            &self.token,
            "recraft-ai/recraft-v3",
            input,
            self.poll_interval,
        )
        .await?;

        let path = download_image(
            &self.http,
            &url,
            &request.work_dir,
            &format!("slide_{}_recraft.jpg", request.slide),
        )
        .await?;
        ensure_portrait(&path)?;
        Ok(BackendResult { image_path: path })
    }
}

/// FLUX Redux, which regenerates a scene while preserving the identity of the
/// subject in the reference photo.
pub struct FluxReduxBackend {
    http: reqwest::Client,
    token: String,
    poll_interval: Duration,
}

impl FluxReduxBackend {
    pub fn new(http: reqwest::Client, token: String, poll_interval: Duration) -> Self {
        Self {
            http,
            token,
            poll_interval,
        }
    }
}

#[async_trait]
impl ImageBackend for FluxReduxBackend {
    fn id(&self) -> BackendId {
        BackendId::FluxRedux
    }

    fn accepts_reference(&self) -> bool {
        true
    }

    fn default_strength(&self) -> f64 {
        0.75
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(180)
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<BackendResult, BackendError> {
        let reference = reference_data_uri(request)?;
        let input = json!({
            "redux_image": reference,
            "aspect_ratio": "9:16",
            "output_format": "jpg",
            "megapixels": "1",
        });
        let url = run_prediction(
            &self.http,
            &self.token,
            "black-forest-labs/flux-redux-dev",
            input,
            self.poll_interval,
        )
        .await?;

        let path = download_image(
            &self.http,
            &url,
            &request.work_dir,
            &format!("slide_{}_flux_redux.jpg", request.slide),
        )
        .await?;
        ensure_portrait(&path)?;
        Ok(BackendResult { image_path: path })
    }
}
