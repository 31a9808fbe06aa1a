#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::backend::{
        BackendError, BackendId, BackendResult, GenerationRequest, ImageBackend,
    };
    use crate::orchestrator::{FallbackChain, Orchestrator};
    use crate::types::{Slide, SlideRole, SlideScript};

    enum Behavior {
        Succeed,
        FailRetryable,
        FailPermanent,
        Hang,
    }

    /// Call log entry: which backend ran and whether it saw the reference.
    type CallLog = Arc<Mutex<Vec<(BackendId, bool)>>>;

    struct FakeBackend {
        id: BackendId,
        accepts_reference: bool,
        behavior: Behavior,
        timeout: Duration,
        calls: CallLog,
    }

    impl FakeBackend {
        fn new(id: BackendId, behavior: Behavior, calls: CallLog) -> Self {
            Self {
                id,
                accepts_reference: false,
                behavior,
                timeout: Duration::from_secs(5),
                calls,
            }
        }

        fn with_reference(mut self) -> Self {
            self.accepts_reference = true;
            self
        }

        fn with_timeout(mut self, timeout: Duration) -> Self {
            self.timeout = timeout;
            self
        }
    }

    #[async_trait]
    impl ImageBackend for FakeBackend {
        fn id(&self) -> BackendId {
            self.id
        }

        fn accepts_reference(&self) -> bool {
            self.accepts_reference
        }

        fn timeout(&self) -> Duration {
            self.timeout
        }

        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<BackendResult, BackendError> {
            self.calls
                .lock()
                .unwrap()
                .push((self.id, request.reference_image.is_some()));

            match self.behavior {
                Behavior::Succeed => Ok(BackendResult {
                    image_path: request
                        .work_dir
                        .join(format!("slide_{}_{}.jpg", request.slide, self.id)),
                }),
                Behavior::FailRetryable => {
                    Err(BackendError::Service("synthetic outage".into()))
                }
                Behavior::FailPermanent => Err(BackendError::UnsupportedReference(
                    "synthetic rejection".into(),
                )),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Err(BackendError::Service("unreachable".into()))
                }
            }
        }
    }

    fn scene_slide() -> Slide {
        Slide::from_script(
            SlideScript {
                position: 1,
                caption: "I almost gave up".to_string(),
                image_prompt: "a dim kitchen at dawn".to_string(),
            },
            SlideRole::Scene,
        )
    }

    fn product_slide() -> Slide {
        Slide::from_script(
            SlideScript {
                position: 9,
                caption: "Then I found this".to_string(),
                image_prompt: "the product on a marble counter".to_string(),
            },
            SlideRole::Product,
        )
    }

    fn orchestrator(backends: Vec<Arc<dyn ImageBackend>>, chain: Vec<BackendId>) -> Orchestrator {
        Orchestrator::with_backends(
            backends,
            FallbackChain(chain.clone()),
            FallbackChain(chain),
        )
    }

    #[tokio::test]
    async fn test_first_success_stops_the_chain() {
        let calls: CallLog = Arc::default();
        let orch = orchestrator(
            vec![
                Arc::new(FakeBackend::new(
                    BackendId::Flux,
                    Behavior::Succeed,
                    calls.clone(),
                )),
                Arc::new(FakeBackend::new(
                    BackendId::Dalle3,
                    Behavior::Succeed,
                    calls.clone(),
                )),
            ],
            vec![BackendId::Flux, BackendId::Dalle3],
        );

        let outcome = orch
            .generate_slide(&scene_slide(), None, Path::new("/tmp"))
            .await;

        assert!(!outcome.is_failure());
        assert_eq!(outcome.backend, Some(BackendId::Flux));
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(outcome.attempts[0].outcome, "ok");
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_falls_through_in_chain_order() {
        let calls: CallLog = Arc::default();
        let orch = orchestrator(
            vec![
                Arc::new(FakeBackend::new(
                    BackendId::Flux,
                    Behavior::FailRetryable,
                    calls.clone(),
                )),
                Arc::new(FakeBackend::new(
                    BackendId::Dalle3,
                    Behavior::Succeed,
                    calls.clone(),
                )),
            ],
            vec![BackendId::Flux, BackendId::Dalle3],
        );

        let outcome = orch
            .generate_slide(&scene_slide(), None, Path::new("/tmp"))
            .await;

        assert_eq!(outcome.backend, Some(BackendId::Dalle3));
        assert_eq!(outcome.attempts.len(), 2);
        assert_eq!(outcome.attempts[0].backend, "flux");
        assert_eq!(outcome.attempts[0].outcome, "service_error");
        assert_eq!(outcome.attempts[1].outcome, "ok");

        let log = calls.lock().unwrap();
        assert_eq!(
            log.as_slice(),
            &[(BackendId::Flux, false), (BackendId::Dalle3, false)]
        );
    }

    #[tokio::test]
    async fn test_exhausted_chain_is_terminal_failure() {
        let calls: CallLog = Arc::default();
        let orch = orchestrator(
            vec![
                Arc::new(FakeBackend::new(
                    BackendId::Flux,
                    Behavior::FailRetryable,
                    calls.clone(),
                )),
                Arc::new(FakeBackend::new(
                    BackendId::Dalle3,
                    Behavior::FailRetryable,
                    calls.clone(),
                )),
            ],
            vec![BackendId::Flux, BackendId::Dalle3],
        );

        let outcome = orch
            .generate_slide(&scene_slide(), None, Path::new("/tmp"))
            .await;

        assert!(outcome.is_failure());
        assert_eq!(outcome.backend, None);
        assert_eq!(outcome.attempts.len(), 2);
        assert!(outcome.attempts.iter().all(|a| a.outcome == "service_error"));
    }

    #[tokio::test]
    async fn test_permanent_reference_failure_skips_reference_backends() {
        let calls: CallLog = Arc::default();
        let reference = PathBuf::from("/tmp/reference.jpg");
        let orch = orchestrator(
            vec![
                Arc::new(
                    FakeBackend::new(BackendId::Recraft, Behavior::FailPermanent, calls.clone())
                        .with_reference(),
                ),
                Arc::new(
                    FakeBackend::new(BackendId::FluxImg2Img, Behavior::Succeed, calls.clone())
                        .with_reference(),
                ),
                Arc::new(FakeBackend::new(
                    BackendId::Gemini,
                    Behavior::Succeed,
                    calls.clone(),
                )),
            ],
            vec![
                BackendId::Recraft,
                BackendId::FluxImg2Img,
                BackendId::Gemini,
            ],
        );

        let outcome = orch
            .generate_slide(&product_slide(), Some(&reference), Path::new("/tmp"))
            .await;

        // FluxImg2Img also needs the reference, so it is skipped entirely.
        assert_eq!(outcome.backend, Some(BackendId::Gemini));
        let log = calls.lock().unwrap();
        assert_eq!(
            log.as_slice(),
            &[(BackendId::Recraft, true), (BackendId::Gemini, false)]
        );
    }

    #[tokio::test]
    async fn test_retryable_reference_failure_keeps_reference_backends() {
        let calls: CallLog = Arc::default();
        let reference = PathBuf::from("/tmp/reference.jpg");
        let orch = orchestrator(
            vec![
                Arc::new(
                    FakeBackend::new(BackendId::Recraft, Behavior::FailRetryable, calls.clone())
                        .with_reference(),
                ),
                Arc::new(
                    FakeBackend::new(BackendId::FluxImg2Img, Behavior::Succeed, calls.clone())
                        .with_reference(),
                ),
            ],
            vec![BackendId::Recraft, BackendId::FluxImg2Img],
        );

        let outcome = orch
            .generate_slide(&product_slide(), Some(&reference), Path::new("/tmp"))
            .await;

        assert_eq!(outcome.backend, Some(BackendId::FluxImg2Img));
        let log = calls.lock().unwrap();
        assert_eq!(
            log.as_slice(),
            &[(BackendId::Recraft, true), (BackendId::FluxImg2Img, true)]
        );
    }

    #[tokio::test]
    async fn test_reference_never_reaches_non_accepting_backend() {
        let calls: CallLog = Arc::default();
        let reference = PathBuf::from("/tmp/reference.jpg");
        let orch = orchestrator(
            vec![Arc::new(FakeBackend::new(
                BackendId::Gemini,
                Behavior::Succeed,
                calls.clone(),
            ))],
            vec![BackendId::Gemini],
        );

        orch.generate_slide(&product_slide(), Some(&reference), Path::new("/tmp"))
            .await;

        assert_eq!(calls.lock().unwrap().as_slice(), &[(BackendId::Gemini, false)]);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_attempt_and_falls_through() {
        let calls: CallLog = Arc::default();
        let orch = orchestrator(
            vec![
                Arc::new(
                    FakeBackend::new(BackendId::Flux, Behavior::Hang, calls.clone())
                        .with_timeout(Duration::from_millis(50)),
                ),
                Arc::new(FakeBackend::new(
                    BackendId::Dalle3,
                    Behavior::Succeed,
                    calls.clone(),
                )),
            ],
            vec![BackendId::Flux, BackendId::Dalle3],
        );

        let outcome = orch
            .generate_slide(&scene_slide(), None, Path::new("/tmp"))
            .await;

        assert_eq!(outcome.backend, Some(BackendId::Dalle3));
        assert_eq!(outcome.attempts[0].outcome, "timeout");
        assert_eq!(outcome.attempts[1].outcome, "ok");
    }

    #[tokio::test]
    async fn test_unregistered_backend_is_recorded_as_unavailable() {
        let calls: CallLog = Arc::default();
        let orch = orchestrator(
            vec![Arc::new(FakeBackend::new(
                BackendId::Dalle3,
                Behavior::Succeed,
                calls.clone(),
            ))],
            vec![BackendId::Flux, BackendId::Dalle3],
        );

        let outcome = orch
            .generate_slide(&scene_slide(), None, Path::new("/tmp"))
            .await;

        assert_eq!(outcome.backend, Some(BackendId::Dalle3));
        assert_eq!(outcome.attempts[0].outcome, "unavailable");
        assert_eq!(outcome.attempts[0].backend, "flux");
    }
}
