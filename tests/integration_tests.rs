//! End-to-end tests of the slide production path: orchestration, fallback,
//! file placement, and the run record, with deterministic in-process
//! backends standing in for the hosted services.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use carousel_rs::backend::{
    BackendError, BackendId, BackendResult, GenerationRequest, ImageBackend,
};
use carousel_rs::orchestrator::{FallbackChain, Orchestrator};
use carousel_rs::pipeline::{build_slides, produce_slides};
use carousel_rs::types::{SlideRole, SlideScript};

/// Backend that writes a real file for every slide except the positions it
/// is scripted to fail.
struct ScriptedBackend {
    id: BackendId,
    accepts_reference: bool,
    fail_positions: Vec<u8>,
    permanent: bool,
}

impl ScriptedBackend {
    fn ok(id: BackendId) -> Self {
        Self {
            id,
            accepts_reference: false,
            fail_positions: Vec::new(),
            permanent: false,
        }
    }

    fn failing(id: BackendId, positions: &[u8], permanent: bool) -> Self {
        Self {
            id,
            accepts_reference: false,
            fail_positions: positions.to_vec(),
            permanent,
        }
    }

    fn with_reference(mut self) -> Self {
        self.accepts_reference = true;
        self
    }
}

#[async_trait]
impl ImageBackend for ScriptedBackend {
    fn id(&self) -> BackendId {
        self.id
    }

    fn accepts_reference(&self) -> bool {
        self.accepts_reference
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<BackendResult, BackendError> {
        if self.fail_positions.contains(&request.slide) {
            return if self.permanent {
                Err(BackendError::UnsupportedReference("scripted rejection".into()))
            } else {
                Err(BackendError::Service("scripted outage".into()))
            };
        }

        std::fs::create_dir_all(&request.work_dir)
            .map_err(|e| BackendError::Service(e.to_string()))?;
        let path = request
            .work_dir
            .join(format!("slide_{}_{}.jpg", request.slide, self.id));
        std::fs::write(&path, b"fake jpeg bytes")
            .map_err(|e| BackendError::Service(e.to_string()))?;
        Ok(BackendResult { image_path: path })
    }
}

fn full_script() -> Vec<SlideScript> {
    (1..=10)
        .map(|position| SlideScript {
            position,
            caption: format!("caption {}", position),
            image_prompt: format!("prompt {}", position),
        })
        .collect()
}

fn run_dirs() -> (TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    let out = dir.path().join("out");
    std::fs::create_dir_all(&work).unwrap();
    std::fs::create_dir_all(&out).unwrap();
    (dir, work, out)
}

#[tokio::test]
async fn full_run_without_reference_produces_ten_numbered_slides() {
    let (_guard, work, out) = run_dirs();
    let orchestrator = Orchestrator::with_backends(
        vec![Arc::new(ScriptedBackend::ok(BackendId::Flux))],
        FallbackChain(vec![BackendId::Flux]),
        FallbackChain(vec![BackendId::Recraft]),
    );

    let mut slides = build_slides(full_script(), false);
    assert!(slides.iter().all(|s| s.role == SlideRole::Scene));

    let records = produce_slides(&orchestrator, None, &mut slides, None, &work, &out)
        .await
        .unwrap();

    assert_eq!(records.len(), 10);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.position, (i + 1) as u8);
        assert!(!record.failed);
        assert_eq!(record.backend, Some("flux".to_string()));
    }
    for position in 1..=10 {
        assert!(
            out.join(format!("slide_{:02}.jpg", position)).exists(),
            "missing slide {}",
            position
        );
    }
}

#[tokio::test]
async fn failing_product_backend_falls_through_on_closing_slides() {
    let (_guard, work, out) = run_dirs();
    let reference = work.join("reference.jpg");
    std::fs::write(&reference, b"reference bytes").unwrap();

    let orchestrator = Orchestrator::with_backends(
        vec![
            Arc::new(ScriptedBackend::ok(BackendId::Flux)),
            Arc::new(
                ScriptedBackend::failing(BackendId::Recraft, &[8, 9, 10], false)
                    .with_reference(),
            ),
            Arc::new(ScriptedBackend::ok(BackendId::Gemini)),
        ],
        FallbackChain(vec![BackendId::Flux]),
        FallbackChain(vec![BackendId::Recraft, BackendId::Gemini]),
    );

    let mut slides = build_slides(full_script(), true);
    let records = produce_slides(
        &orchestrator,
        None,
        &mut slides,
        Some(&reference),
        &work,
        &out,
    )
    .await
    .unwrap();

    for record in &records {
        assert!(!record.failed);
        if record.position >= 8 {
            // Product slides needed two attempts each.
            assert_eq!(record.attempts.len(), 2, "slide {}", record.position);
            assert_eq!(record.attempts[0].outcome, "service_error");
            assert_eq!(record.backend, Some("gemini".to_string()));
        } else {
            assert_eq!(record.attempts.len(), 1);
            assert_eq!(record.backend, Some("flux".to_string()));
        }
    }
}

#[tokio::test]
async fn permanent_reference_failure_skips_remaining_reference_backends() {
    let (_guard, work, out) = run_dirs();
    let reference = work.join("reference.jpg");
    std::fs::write(&reference, b"reference bytes").unwrap();

    let orchestrator = Orchestrator::with_backends(
        vec![
            Arc::new(ScriptedBackend::ok(BackendId::Flux)),
            Arc::new(
                ScriptedBackend::failing(BackendId::Recraft, &[8, 9, 10], true)
                    .with_reference(),
            ),
            Arc::new(ScriptedBackend::ok(BackendId::FluxImg2Img).with_reference()),
            Arc::new(ScriptedBackend::ok(BackendId::Gemini)),
        ],
        FallbackChain(vec![BackendId::Flux]),
        FallbackChain(vec![
            BackendId::Recraft,
            BackendId::FluxImg2Img,
            BackendId::Gemini,
        ]),
    );

    let mut slides = build_slides(full_script(), true);
    let records = produce_slides(
        &orchestrator,
        None,
        &mut slides,
        Some(&reference),
        &work,
        &out,
    )
    .await
    .unwrap();

    for record in records.iter().filter(|r| r.position >= 8) {
        // FluxImg2Img is never tried after Recraft's permanent rejection.
        let tried: Vec<&str> = record.attempts.iter().map(|a| a.backend.as_str()).collect();
        assert_eq!(tried, vec!["recraft", "gemini"], "slide {}", record.position);
        assert_eq!(record.backend, Some("gemini".to_string()));
    }
}

#[tokio::test]
async fn one_exhausted_slide_does_not_abort_the_run() {
    let (_guard, work, out) = run_dirs();
    let orchestrator = Orchestrator::with_backends(
        vec![Arc::new(ScriptedBackend::failing(
            BackendId::Flux,
            &[5],
            false,
        ))],
        FallbackChain(vec![BackendId::Flux]),
        FallbackChain(vec![BackendId::Flux]),
    );

    let mut slides = build_slides(full_script(), false);
    let records = produce_slides(&orchestrator, None, &mut slides, None, &work, &out)
        .await
        .unwrap();

    assert_eq!(records.len(), 10);
    let failed: Vec<u8> = records.iter().filter(|r| r.failed).map(|r| r.position).collect();
    assert_eq!(failed, vec![5]);

    assert!(!out.join("slide_05.jpg").exists());
    assert!(out.join("slide_04.jpg").exists());
    assert!(out.join("slide_06.jpg").exists());

    let record = &records[4];
    assert_eq!(record.backend, None);
    assert_eq!(record.attempts.len(), 1);
    assert_eq!(record.attempts[0].outcome, "service_error");
}
