//! The fallback orchestrator: walks the per-role backend chain, strictly in
//! order, until one backend produces an image or the chain is exhausted.
//!
//! Failures fall through to the next chain entry instead of retrying the same
//! backend in place. A permanent failure from a reference-requiring backend
//! short-circuits every remaining reference-requiring entry, since the
//! reference itself is the likeliest culprit.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::backend::{BackendError, BackendId, GenerationRequest, ImageBackend, registry};
use crate::config::Config;
use crate::types::{AttemptRecord, Slide, SlideRole};

/// Ordered sequence of backends tried for one slide role. Static
/// configuration, not runtime state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackChain(pub Vec<BackendId>);

/// Result of orchestrating one slide: either a finished image or a terminal
/// failure, always with the full attempt log.
#[derive(Debug)]
pub struct SlideOutcome {
    pub image_path: Option<PathBuf>,
    /// Backend that succeeded, if any.
    pub backend: Option<BackendId>,
    pub attempts: Vec<AttemptRecord>,
}

impl SlideOutcome {
    pub fn is_failure(&self) -> bool {
        self.image_path.is_none()
    }
}

pub struct Orchestrator {
    backends: HashMap<BackendId, Arc<dyn ImageBackend>>,
    scene_chain: FallbackChain,
    product_chain: FallbackChain,
}

impl Orchestrator {
    pub fn new(config: &Config) -> Self {
        Self {
            backends: registry(config),
            scene_chain: FallbackChain(config.scene_chain()),
            product_chain: FallbackChain(config.product_chain()),
        }
    }

    /// Builds an orchestrator over explicit backends and chains. This is the
    /// seam unit tests inject deterministic fake backends through.
    pub fn with_backends(
        backends: Vec<Arc<dyn ImageBackend>>,
        scene_chain: FallbackChain,
        product_chain: FallbackChain,
    ) -> Self {
        Self {
            backends: backends.into_iter().map(|b| (b.id(), b)).collect(),
            scene_chain,
            product_chain,
        }
    }

    fn chain_for(&self, role: SlideRole) -> &FallbackChain {
        match role {
            SlideRole::Scene => &self.scene_chain,
            SlideRole::Product => &self.product_chain,
        }
    }

    /// Produces a finished image for `slide` or a terminal failure. Never
    /// invents placeholder content; an exhausted chain is reported upward.
    pub async fn generate_slide(
        &self,
        slide: &Slide,
        reference_image: Option<&Path>,
        work_dir: &Path,
    ) -> SlideOutcome {
        let chain = self.chain_for(slide.role);
        let mut attempts = Vec::new();
        let mut skip_reference_backends = false;

        for id in &chain.0 {
            let Some(backend) = self.backends.get(id) else {
                attempts.push(AttemptRecord {
                    backend: id.to_string(),
                    outcome: "unavailable".into(),
                    latency_ms: 0,
                });
                continue;
            };

            if skip_reference_backends && backend.accepts_reference() {
                continue;
            }

            // The reference image never reaches a backend that cannot use it.
            let request = GenerationRequest {
                slide: slide.position,
                prompt: slide.image_prompt.clone(),
                reference_image: if backend.accepts_reference() {
                    reference_image.map(Path::to_path_buf)
                } else {
                    None
                },
                strength: None,
                work_dir: work_dir.to_path_buf(),
            };

            println!("🎨 Slide {} → {}", slide.position, id);
            let started = Instant::now();
            let outcome = match tokio::time::timeout(backend.timeout(), backend.generate(&request))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout(backend.timeout())),
            };
            let latency_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(result) => {
                    attempts.push(AttemptRecord {
                        backend: id.to_string(),
                        outcome: "ok".into(),
                        latency_ms,
                    });
                    println!("✅ Slide {} generated by {} in {}ms", slide.position, id, latency_ms);
                    return SlideOutcome {
                        image_path: Some(result.image_path),
                        backend: Some(*id),
                        attempts,
                    };
                }
                Err(err) => {
                    attempts.push(AttemptRecord {
                        backend: id.to_string(),
                        outcome: err.label().into(),
                        latency_ms,
                    });
                    eprintln!(
                        "⚠️  Slide {}: {} failed ({}), falling through",
                        slide.position, id, err
                    );
                    if !err.is_retryable() && backend.accepts_reference() {
                        skip_reference_backends = true;
                    }
                }
            }
        }

        eprintln!(
            "❌ Slide {}: fallback chain exhausted after {} attempt(s)",
            slide.position,
            attempts.len()
        );
        SlideOutcome {
            image_path: None,
            backend: None,
            attempts,
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
