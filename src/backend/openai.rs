//! DALL-E 3 via the OpenAI Images API. Tail of the default scene chain.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{
    BackendError, BackendId, BackendResult, GenerationRequest, ImageBackend, classify_status,
    download_image, ensure_portrait, transport_error,
};

const API_URL: &str = "https://api.openai.com/v1/images/generations";

pub struct Dalle3Backend {
    http: reqwest::Client,
    api_key: String,
}

impl Dalle3Backend {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key }
    }

    fn enhance_prompt(prompt: &str) -> String {
        format!(
            "{}, high quality professional photography, 9:16 aspect ratio, clean composition, good lighting, sharp focus, commercial product photography style",
            prompt
        )
    }
}

#[async_trait]
impl ImageBackend for Dalle3Backend {
    fn id(&self) -> BackendId {
        BackendId::Dalle3
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(120)
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<BackendResult, BackendError> {
        let payload = json!({
            "model": "dall-e-3",
            "prompt": Self::enhance_prompt(&request.prompt),
            // closest supported size to 9:16; resized after download
            "size": "1024x1792",
            "quality": "hd",
            "style": "natural",
            "n": 1,
        });

        let response = self
            .http
            .post(API_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }
        let result: Value = serde_json::from_str(&body)
            .map_err(|e| BackendError::Service(format!("malformed images response: {}", e)))?;
        let url = result["data"]
            .get(0)
            .and_then(|d| d["url"].as_str())
            .ok_or_else(|| BackendError::Service("no image URL in images response".into()))?;

        let path = download_image(
            &self.http,
            url,
            &request.work_dir,
            &format!("slide_{}_dalle3.jpg", request.slide),
        )
        .await?;
        ensure_portrait(&path)?;
        Ok(BackendResult { image_path: path })
    }
}
