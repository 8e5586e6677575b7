use aprassist_core::chat::{FailureKind, Outcome};
use aprassist_core::completion::CompletionRequest;
use aprassist_core::prompt::FALLBACK_ANSWER;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::backoff::{BackoffPause, RetryPolicy, TokioPause};
use super::outcome::{classify_failure, FailureClassifier};
use super::transport::CompletionTransport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttemptState {
    Attempting(u32),
    Succeeded(String),
    Failed(FailureKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttemptEvent {
    Answered(Option<String>),
    Failed(FailureKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Transition {
    pub(crate) next: AttemptState,
    pub(crate) pause: Option<Duration>,
}

/// One step of the attempt state machine. Terminal states absorb every event.
pub(crate) fn transition(
    state: AttemptState,
    event: AttemptEvent,
    policy: &RetryPolicy,
    fallback_answer: &str,
) -> Transition {
    let attempt = match state {
        AttemptState::Attempting(attempt) => attempt,
        terminal => {
            return Transition {
                next: terminal,
                pause: None,
            }
        }
    };
    let next = match event {
        AttemptEvent::Answered(text) => AttemptState::Succeeded(
            text.filter(|value| !value.is_empty())
                .unwrap_or_else(|| fallback_answer.to_string()),
        ),
        AttemptEvent::Failed(FailureKind::QuotaExhausted) if attempt < policy.max_retries => {
            return Transition {
                next: AttemptState::Attempting(attempt + 1),
                pause: Some(policy.delay_for(attempt)),
            };
        }
        AttemptEvent::Failed(kind) => AttemptState::Failed(kind),
    };
    Transition { next, pause: None }
}

/// Executes a built request under the bounded exponential-backoff policy.
///
/// Each call owns its attempt counter; nothing is shared between concurrent
/// invocations except the transport itself.
pub struct RetryingInvoker {
    transport: Arc<dyn CompletionTransport>,
    policy: RetryPolicy,
    pause: Arc<dyn BackoffPause>,
    classify: FailureClassifier,
    fallback_answer: String,
}

impl RetryingInvoker {
    pub fn new(transport: Arc<dyn CompletionTransport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            pause: Arc::new(TokioPause),
            classify: classify_failure,
            fallback_answer: FALLBACK_ANSWER.to_string(),
        }
    }

    pub fn with_pause(mut self, pause: Arc<dyn BackoffPause>) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_classifier(mut self, classify: FailureClassifier) -> Self {
        self.classify = classify;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    pub async fn invoke(&self, request: &CompletionRequest) -> Outcome {
        self.invoke_traced(request, "-").await
    }

    pub async fn invoke_traced(&self, request: &CompletionRequest, request_id: &str) -> Outcome {
        let started_at = Instant::now();
        let mut state = AttemptState::Attempting(0);
        loop {
            let attempt = match state {
                AttemptState::Attempting(attempt) => attempt,
                AttemptState::Succeeded(text) => return Outcome::Answer(text),
                AttemptState::Failed(kind) => return Outcome::Failed(kind),
            };

            log::debug!(
                "event=chat_upstream_attempt request_id={} transport={} model={} attempt={}/{}",
                request_id,
                self.transport.name(),
                request.model,
                attempt + 1,
                self.policy.max_attempts()
            );
            let event = match self.transport.complete(request).await {
                Ok(text) => AttemptEvent::Answered(text),
                Err(err) => {
                    let kind = (self.classify)(&err);
                    log::warn!(
                        "event=chat_upstream_error request_id={} transport={} attempt={} kind={} err={}",
                        request_id,
                        self.transport.name(),
                        attempt + 1,
                        kind.code(),
                        err
                    );
                    AttemptEvent::Failed(kind)
                }
            };

            let Transition { next, pause } =
                transition(state, event, &self.policy, &self.fallback_answer);
            if let Some(delay) = pause {
                log::warn!(
                    "event=chat_upstream_retry request_id={} delay_ms={} retry={}/{}",
                    request_id,
                    delay.as_millis(),
                    attempt + 1,
                    self.policy.max_retries
                );
                self.pause.pause(delay).await;
            } else if let AttemptState::Failed(kind) = &next {
                log::error!(
                    "event=chat_upstream_failed request_id={} kind={} attempts={} elapsed_ms={}",
                    request_id,
                    kind.code(),
                    attempt + 1,
                    started_at.elapsed().as_millis()
                );
            }
            state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::upstream::transport::TransportError;
    use aprassist_core::completion::{build_completion_request, CompletionSettings};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    type Scripted = Result<Option<String>, TransportError>;

    struct ScriptedTransport {
        script: Mutex<VecDeque<Scripted>>,
        calls: Mutex<usize>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
        }
    }

    #[async_trait]
    impl CompletionTransport for ScriptedTransport {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn complete(&self, _request: &CompletionRequest) -> Scripted {
            *self.calls.lock().expect("calls") += 1;
            self.script
                .lock()
                .expect("script")
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Network("script exhausted".to_string())))
        }
    }

    #[derive(Default)]
    struct RecordingPause {
        delays: Mutex<Vec<Duration>>,
    }

    impl RecordingPause {
        fn delays_ms(&self) -> Vec<u128> {
            self.delays
                .lock()
                .expect("delays")
                .iter()
                .map(Duration::as_millis)
                .collect()
        }
    }

    #[async_trait]
    impl BackoffPause for RecordingPause {
        async fn pause(&self, delay: Duration) {
            self.delays.lock().expect("delays").push(delay);
        }
    }

    fn quota() -> Scripted {
        Err(TransportError::Status {
            status: 429,
            message: "RESOURCE_EXHAUSTED: Resource has been exhausted".to_string(),
        })
    }

    fn answer(text: &str) -> Scripted {
        Ok(Some(text.to_string()))
    }

    fn request() -> CompletionRequest {
        build_completion_request(
            "How do I fill Section B?",
            &[],
            &[],
            &CompletionSettings::default(),
        )
        .expect("build")
    }

    fn run(
        script: Vec<Scripted>,
    ) -> (Outcome, Arc<ScriptedTransport>, Arc<RecordingPause>) {
        let transport = ScriptedTransport::new(script);
        let pause = Arc::new(RecordingPause::default());
        let invoker = RetryingInvoker::new(transport.clone(), RetryPolicy::default())
            .with_pause(pause.clone());
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let outcome = runtime.block_on(invoker.invoke(&request()));
        (outcome, transport, pause)
    }

    #[test]
    fn first_attempt_success_returns_answer() {
        let (outcome, transport, pause) = run(vec![answer("Use enrolment and graduation counts...")]);
        assert_eq!(
            outcome,
            Outcome::Answer("Use enrolment and graduation counts...".to_string())
        );
        assert_eq!(transport.calls(), 1);
        assert!(pause.delays_ms().is_empty());
    }

    #[test]
    fn quota_failures_then_success_retry_with_doubling_delays() {
        let (outcome, transport, pause) = run(vec![quota(), quota(), quota(), answer("ok")]);
        assert_eq!(outcome, Outcome::Answer("ok".to_string()));
        assert_eq!(transport.calls(), 4);
        assert_eq!(pause.delays_ms(), vec![2_000, 4_000, 8_000]);
    }

    #[test]
    fn quota_every_time_exhausts_budget() {
        let (outcome, transport, pause) = run(vec![quota(); 8]);
        assert_eq!(outcome, Outcome::Failed(FailureKind::QuotaExhausted));
        assert_eq!(transport.calls(), 5);
        assert_eq!(pause.delays_ms(), vec![2_000, 4_000, 8_000, 16_000]);
    }

    #[test]
    fn generic_failure_is_never_retried() {
        let (outcome, transport, pause) = run(vec![
            Err(TransportError::Status {
                status: 500,
                message: "INTERNAL".to_string(),
            }),
            answer("unreachable"),
        ]);
        assert_eq!(outcome, Outcome::Failed(FailureKind::Generic));
        assert_eq!(transport.calls(), 1);
        assert!(pause.delays_ms().is_empty());
    }

    #[test]
    fn non_quota_failure_short_circuits_remaining_budget() {
        let (outcome, transport, pause) = run(vec![
            quota(),
            quota(),
            quota(),
            Err(TransportError::Network("operation timed out".to_string())),
            answer("unreachable"),
        ]);
        assert_eq!(outcome, Outcome::Failed(FailureKind::Generic));
        assert_eq!(transport.calls(), 4);
        assert_eq!(pause.delays_ms(), vec![2_000, 4_000, 8_000]);
    }

    #[test]
    fn empty_or_absent_text_uses_fallback_answer() {
        let (outcome, _, _) = run(vec![Ok(None)]);
        assert_eq!(outcome, Outcome::Answer(FALLBACK_ANSWER.to_string()));
        let (outcome, _, _) = run(vec![Ok(Some(String::new()))]);
        assert_eq!(outcome, Outcome::Answer(FALLBACK_ANSWER.to_string()));
    }

    #[test]
    fn injected_classifier_controls_retry_decision() {
        fn always_generic(_: &TransportError) -> FailureKind {
            FailureKind::Generic
        }
        let transport = ScriptedTransport::new(vec![quota(), answer("late")]);
        let pause = Arc::new(RecordingPause::default());
        let invoker = RetryingInvoker::new(transport.clone(), RetryPolicy::default())
            .with_pause(pause.clone())
            .with_classifier(always_generic);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let outcome = runtime.block_on(invoker.invoke(&request()));
        assert_eq!(outcome, Outcome::Failed(FailureKind::Generic));
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn zero_retry_budget_fails_on_first_quota() {
        let transport = ScriptedTransport::new(vec![quota(), answer("late")]);
        let invoker = RetryingInvoker::new(transport.clone(), RetryPolicy::new(0, Duration::ZERO));
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let outcome = runtime.block_on(invoker.invoke(&request()));
        assert_eq!(outcome, Outcome::Failed(FailureKind::QuotaExhausted));
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn backoff_pause_does_not_block_other_invocations() {
        let slow = RetryingInvoker::new(
            ScriptedTransport::new(vec![quota(), answer("slow")]),
            RetryPolicy::new(4, Duration::from_millis(50)),
        );
        let fast = RetryingInvoker::new(
            ScriptedTransport::new(vec![answer("fast")]),
            RetryPolicy::default(),
        );
        let order = Mutex::new(Vec::new());
        let request = request();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        runtime.block_on(async {
            tokio::join!(
                async {
                    let outcome = slow.invoke(&request).await;
                    order.lock().expect("order").push(outcome);
                },
                async {
                    let outcome = fast.invoke(&request).await;
                    order.lock().expect("order").push(outcome);
                }
            );
        });
        assert_eq!(
            order.into_inner().expect("order"),
            vec![
                Outcome::Answer("fast".to_string()),
                Outcome::Answer("slow".to_string())
            ]
        );
    }

    #[test]
    fn terminal_states_absorb_events() {
        let policy = RetryPolicy::default();
        let done = AttemptState::Succeeded("x".to_string());
        let transition = transition(
            done.clone(),
            AttemptEvent::Failed(FailureKind::QuotaExhausted),
            &policy,
            FALLBACK_ANSWER,
        );
        assert_eq!(transition.next, done);
        assert_eq!(transition.pause, None);

        let failed = AttemptState::Failed(FailureKind::Generic);
        let transition = super::transition(
            failed.clone(),
            AttemptEvent::Answered(Some("late".to_string())),
            &policy,
            FALLBACK_ANSWER,
        );
        assert_eq!(transition.next, failed);
    }

    #[test]
    fn last_attempt_quota_becomes_terminal_failure() {
        let policy = RetryPolicy::default();
        let transition = transition(
            AttemptState::Attempting(policy.max_retries),
            AttemptEvent::Failed(FailureKind::QuotaExhausted),
            &policy,
            FALLBACK_ANSWER,
        );
        assert_eq!(transition.next, AttemptState::Failed(FailureKind::QuotaExhausted));
        assert_eq!(transition.pause, None);
    }
}
