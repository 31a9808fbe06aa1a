//! Carousel script generation: one LLM call yields all ten captions and
//! image prompts as a structured document.

use anyhow::{Result, bail};

use crate::config::Config;
use crate::llm::LlmClient;
use crate::types::{CarouselScript, SLIDE_COUNT, SlideScript};

pub mod prompts;

pub struct ScriptGenerator {
    llm: LlmClient,
}

impl ScriptGenerator {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            llm: LlmClient::new(config.llm.clone())?,
        })
    }

    /// Generates the full ten-slide script for `request`. The extraction is
    /// structured, so a malformed or incomplete script is an error here, not
    /// downstream.
    pub async fn generate(&self, request: &crate::types::CarouselRequest) -> Result<Vec<SlideScript>> {
        println!("📝 Generating carousel script for {}...", request.product);

        let system_prompt = prompts::build_system_prompt();
        let task_prompt = prompts::build_task_prompt(request);

        let script: CarouselScript = self.llm.extract(&system_prompt, &task_prompt).await?;
        let slides = validate_script(script.slides)?;

        println!("✅ Script generated: {} slides", slides.len());
        Ok(slides)
    }
}

/// Sorts slides by position and verifies positions 1..=10 are each present
/// exactly once.
pub fn validate_script(mut slides: Vec<SlideScript>) -> Result<Vec<SlideScript>> {
    slides.sort_by_key(|s| s.position);

    if slides.len() != SLIDE_COUNT {
        bail!(
            "Script has {} slides, expected {}",
            slides.len(),
            SLIDE_COUNT
        );
    }
    for (i, slide) in slides.iter().enumerate() {
        let expected = (i + 1) as u8;
        if slide.position != expected {
            bail!(
                "Script slide positions are not 1..={}: found {} where {} was expected",
                SLIDE_COUNT,
                slide.position,
                expected
            );
        }
        if slide.caption.trim().is_empty() {
            bail!("Script slide {} has an empty caption", slide.position);
        }
        if slide.image_prompt.trim().is_empty() {
            bail!("Script slide {} has an empty image prompt", slide.position);
        }
    }
    Ok(slides)
}
