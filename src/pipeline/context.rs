//! Shared context for one carousel run.

use anyhow::Result;

use crate::config::Config;
use crate::orchestrator::Orchestrator;
use crate::overlay::TextOverlayRenderer;
use crate::script::ScriptGenerator;

/// Everything a run needs, built once after configuration validation.
pub struct PipelineContext {
    pub config: Config,
    pub script_generator: ScriptGenerator,
    pub orchestrator: Orchestrator,
    pub overlay: TextOverlayRenderer,
}

impl PipelineContext {
    /// Builds the context. When overlays are enabled, a missing FFmpeg
    /// binary fails here, before any API spend.
    pub fn new(config: Config) -> Result<Self> {
        let script_generator = ScriptGenerator::new(&config)?;
        let orchestrator = Orchestrator::new(&config);
        let overlay = TextOverlayRenderer::new(config.overlay.clone());

        if !config.skip_text_overlay {
            overlay.probe()?;
        }

        Ok(Self {
            config,
            script_generator,
            orchestrator,
            overlay,
        })
    }
}
