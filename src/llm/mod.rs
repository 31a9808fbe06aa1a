//! LLM client with a unified structured-extraction interface.

use std::future::Future;

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod providers;

use providers::ProviderClient;

use crate::config::LlmConfig;

/// LLM client wrapping the configured provider.
#[derive(Clone)]
pub struct LlmClient {
    config: LlmConfig,
    client: ProviderClient,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = ProviderClient::new(&config)?;
        Ok(Self { client, config })
    }

    /// Generic retry logic for async model calls.
    async fn retry_with_backoff<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        let max_retries = self.config.retry_attempts;
        let retry_delay_ms = self.config.retry_delay_ms;
        let mut retries = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    retries += 1;
                    eprintln!(
                        "❌ Model call failed, retrying (attempt {} / {}): {}",
                        retries, max_retries, err
                    );
                    if retries >= max_retries {
                        return Err(err);
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(retry_delay_ms)).await;
                }
            }
        }
    }

    /// Structured data extraction.
    pub async fn extract<T>(&self, system_prompt: &str, user_prompt: &str) -> Result<T>
    where
        T: JsonSchema + for<'a> Deserialize<'a> + Serialize + Send + Sync + 'static,
    {
        self.extract_inner(
            system_prompt,
            user_prompt,
            self.config.model.clone(),
            self.config.model_fallback.clone(),
        )
        .await
    }

    async fn extract_inner<T>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: String,
        fallback_model: Option<String>,
    ) -> Result<T>
    where
        T: JsonSchema + for<'a> Deserialize<'a> + Serialize + Send + Sync + 'static,
    {
        let extractor = self
            .client
            .create_extractor::<T>(&model, system_prompt, &self.config);

        self.retry_with_backoff(|| async {
            match extractor.extract(user_prompt).await {
                Ok(r) => Ok(r),
                Err(e) => match fallback_model {
                    Some(ref fallback) => {
                        eprintln!(
                            "❌ Model {} failed after {} attempt(s), switching to fallback model {}: {}",
                            model, self.config.retry_attempts, fallback, e
                        );
                        let user_prompt_with_fixer = format!(
                            "{}\n\n**Note** a previous model call failed with \"{}\"; avoid that failure this time",
                            user_prompt, e
                        );
                        Box::pin(self.extract_inner(
                            system_prompt,
                            &user_prompt_with_fixer,
                            fallback.clone(),
                            None,
                        ))
                        .await
                    }
                    None => {
                        eprintln!(
                            "❌ Model {} failed after {} attempt(s): {}",
                            model, self.config.retry_attempts, e
                        );
                        Err(e)
                    }
                },
            }
        })
        .await
    }
}
