use crate::config::toml_config::GenerationConfig;
use crate::core::sanitizer::{sanitize_for_embedding, sanitize_for_model};
use crate::domain::model::{GeneratedCandidate, GenerationOutcome, GenerationRequest};
use crate::domain::ports::CardGenerator;
use crate::utils::error::{CardError, Result};
use crate::utils::validation::Validate;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Overall time budget for a generation run and the pause before its one retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub total_timeout: Duration,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            total_timeout: Duration::from_secs(30),
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            total_timeout: config.timeout(),
            backoff: config.retry_backoff(),
        }
    }
}

pub struct GenerationOrchestrator<G: CardGenerator> {
    generator: G,
    policy: RetryPolicy,
}

impl<G: CardGenerator> GenerationOrchestrator<G> {
    pub fn new(generator: G, policy: RetryPolicy) -> Self {
        Self { generator, policy }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Validates, sanitizes and generates. A transient communication failure
    /// is retried once; both attempts share one deadline.
    pub async fn generate_for_collection(
        &self,
        raw_text: &str,
        requested_count: u32,
        model_key_override: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome> {
        let request =
            GenerationRequest::new(raw_text, requested_count).with_model_key(model_key_override);
        request.validate()?;

        let source_text = sanitize_for_embedding(&sanitize_for_model(&request.source_text));
        if source_text.is_empty() {
            return Err(CardError::validation(
                "source text has no printable content left after sanitizing",
            ));
        }
        let request = GenerationRequest {
            source_text,
            ..request
        };

        let deadline = Instant::now() + self.policy.total_timeout;
        let (batch, attempts) = match self.generator.generate(&request, deadline, cancel).await {
            Ok(batch) => (batch, 1),
            Err(e) if e.is_transient() => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining <= self.policy.backoff {
                    tracing::warn!("Generation failed ({}); no time left to retry", e);
                    return Err(e);
                }

                tracing::warn!(
                    "Generation failed ({}); retrying once in {:?}",
                    e,
                    self.policy.backoff
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(CardError::Cancelled),
                    _ = tokio::time::sleep(self.policy.backoff) => {}
                }

                let batch = self.generator.generate(&request, deadline, cancel).await?;
                (batch, 2)
            }
            Err(e) => return Err(e),
        };

        // whatever the generator handed back, candidates leave here as AI/New
        let candidates: Vec<GeneratedCandidate> = batch
            .candidates
            .into_iter()
            .map(|c| GeneratedCandidate::new(c.front, c.back, c.tags, c.categories))
            .collect();

        if candidates.len() < requested_count as usize {
            tracing::info!(
                "Returning {} of {} requested candidates",
                candidates.len(),
                requested_count
            );
        }

        Ok(GenerationOutcome {
            candidates,
            dropped_count: batch.dropped_count,
            requested_count,
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CreationSource, GenerationBatch, ReviewStatus};
    use crate::utils::error::CommunicationFailure;
    use async_trait::async_trait;
    use std::collections::{BTreeSet, VecDeque};
    use std::sync::Mutex;

    struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<GenerationBatch>>>,
        seen: Mutex<Vec<(GenerationRequest, Instant)>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<Result<GenerationBatch>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CardGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            request: &GenerationRequest,
            deadline: Instant,
            _cancel: &CancellationToken,
        ) -> Result<GenerationBatch> {
            self.seen.lock().unwrap().push((request.clone(), deadline));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected extra generation call")
        }
    }

    fn batch(count: usize, dropped_count: usize) -> GenerationBatch {
        let candidates = (0..count)
            .map(|i| {
                let mut candidate = GeneratedCandidate::new(
                    format!("Q{}", i),
                    format!("A{}", i),
                    BTreeSet::new(),
                    BTreeSet::new(),
                );
                // a generator that forgets the invariants must not leak them
                candidate.review_status = ReviewStatus::Approved;
                candidate.creation_source = CreationSource::Manual;
                candidate
            })
            .collect();
        GenerationBatch {
            candidates,
            dropped_count,
        }
    }

    fn unavailable() -> CardError {
        CardError::communication(CommunicationFailure::Status(503))
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            total_timeout: Duration::from_secs(5),
            backoff: Duration::from_millis(10),
        }
    }

    const TEXT: &str = "Rust ownership: each value has a single owner.";

    #[tokio::test]
    async fn test_out_of_bounds_input_never_calls_service() {
        let orchestrator = GenerationOrchestrator::new(ScriptedGenerator::new(vec![]), policy());
        let cancel = CancellationToken::new();

        for (text, count) in [(TEXT, 0), (TEXT, 51), ("too short", 5)] {
            let result = orchestrator
                .generate_for_collection(text, count, None, &cancel)
                .await;
            assert!(matches!(result, Err(CardError::ValidationError { .. })));
        }
        let blank = "\u{1F600}".repeat(20);
        assert!(orchestrator
            .generate_for_collection(&blank, 5, None, &cancel)
            .await
            .is_err());
        assert_eq!(orchestrator.generator().calls(), 0);
    }

    #[tokio::test]
    async fn test_sanitized_text_reaches_generator() {
        let generator = ScriptedGenerator::new(vec![Ok(batch(1, 0))]);
        let orchestrator = GenerationOrchestrator::new(generator, policy());
        orchestrator
            .generate_for_collection(
                "  Say \"hi\"\n\tto C:\\ \u{1F44B} now  ",
                3,
                Some("key".into()),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let seen = orchestrator.generator().seen.lock().unwrap();
        let (request, _) = &seen[0];
        assert_eq!(request.source_text, r#"Say \"hi\" to C:\\ now"#);
        assert_eq!(request.requested_count, 3);
        assert_eq!(request.model_key.as_deref(), Some("key"));
    }

    #[tokio::test]
    async fn test_partial_success_is_a_value() {
        let orchestrator =
            GenerationOrchestrator::new(ScriptedGenerator::new(vec![Ok(batch(3, 2))]), policy());
        let outcome = orchestrator
            .generate_for_collection(TEXT, 10, None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.candidates.len(), 3);
        assert_eq!(outcome.dropped_count, 2);
        assert_eq!(outcome.requested_count, 10);
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.candidates.iter().all(|c| {
            c.creation_source == CreationSource::Ai && c.review_status == ReviewStatus::New
        }));
    }

    #[tokio::test]
    async fn test_transient_failure_retried_once_with_same_deadline() {
        let generator = ScriptedGenerator::new(vec![Err(unavailable()), Ok(batch(2, 0))]);
        let orchestrator = GenerationOrchestrator::new(generator, policy());
        let outcome = orchestrator
            .generate_for_collection(TEXT, 2, None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.candidates.len(), 2);
        let seen = orchestrator.generator().seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].1, seen[1].1);
    }

    #[tokio::test]
    async fn test_second_transient_failure_surfaces() {
        let generator = ScriptedGenerator::new(vec![Err(unavailable()), Err(unavailable())]);
        let orchestrator = GenerationOrchestrator::new(generator, policy());
        let result = orchestrator
            .generate_for_collection(TEXT, 2, None, &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(CardError::CommunicationError {
                failure: CommunicationFailure::Status(503)
            })
        ));
        assert_eq!(orchestrator.generator().calls(), 2);
    }

    #[tokio::test]
    async fn test_auth_and_validation_not_retried() {
        let failures = vec![
            CardError::AuthenticationError {
                message: "bad key".into(),
            },
            CardError::validation("garbage"),
            CardError::communication(CommunicationFailure::Status(400)),
        ];
        for failure in failures {
            let orchestrator =
                GenerationOrchestrator::new(ScriptedGenerator::new(vec![Err(failure)]), policy());
            assert!(orchestrator
                .generate_for_collection(TEXT, 2, None, &CancellationToken::new())
                .await
                .is_err());
            assert_eq!(orchestrator.generator().calls(), 1);
        }
    }

    #[tokio::test]
    async fn test_no_retry_when_backoff_exceeds_budget() {
        let generator = ScriptedGenerator::new(vec![Err(unavailable())]);
        let orchestrator = GenerationOrchestrator::new(
            generator,
            RetryPolicy {
                total_timeout: Duration::from_millis(50),
                backoff: Duration::from_millis(100),
            },
        );
        let result = orchestrator
            .generate_for_collection(TEXT, 2, None, &CancellationToken::new())
            .await;
        assert!(result.is_err());
        assert_eq!(orchestrator.generator().calls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_during_backoff() {
        let generator = ScriptedGenerator::new(vec![Err(unavailable())]);
        let orchestrator = GenerationOrchestrator::new(
            generator,
            RetryPolicy {
                total_timeout: Duration::from_secs(10),
                backoff: Duration::from_secs(5),
            },
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = orchestrator
            .generate_for_collection(TEXT, 2, None, &cancel)
            .await;
        assert!(matches!(result, Err(CardError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(orchestrator.generator().calls(), 1);
    }
}
