//! The generation request/response state machine.
//!
//! ```text
//! Idle ──submit──▶ (validate) ──▶ Pending ──▶ Success | Failure
//!                      │                           │
//!                      └──▶ Failure (empty prompt) └──submit──▶ ...
//! ```
//!
//! Exactly one request can be outstanding. Submits while [`Outcome::Pending`]
//! are ignored, and an in-flight request always runs to completion: its
//! result is applied even if the prompt or image changed in the meantime.
//! A request whose task is aborted or panics ends as a failure.

use crate::encoder::UploadedImage;
use crate::error::{NovaError, UNKNOWN_ERROR_MESSAGE};
use crate::image::{GenerationRequest, ImageProvider};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Failure message for an empty or whitespace-only prompt.
pub const EMPTY_PROMPT_MESSAGE: &str = "Please enter a prompt to generate an image.";

/// The result state of the latest request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Outcome {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// A request is in flight.
    Pending,
    /// The last request produced an image (a displayable data URL).
    Success(String),
    /// The last request failed, or was rejected by validation.
    Failure(String),
}

impl Outcome {
    /// Returns true while a request is in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// The generated image reference, on success.
    pub fn generated_image(&self) -> Option<&str> {
        match self {
            Self::Success(uri) => Some(uri),
            _ => None,
        }
    }

    /// The error message, on failure.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failure(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Result of trying to start a request.
#[derive(Debug)]
#[must_use = "a started ticket must be run or the outcome stays pending"]
pub enum Admission {
    /// Validation passed; the outcome is now `Pending`.
    Started(Ticket),
    /// The prompt was empty; the outcome is now a validation `Failure`.
    Rejected,
    /// A request is already in flight; nothing changed.
    Ignored,
}

/// A validated request waiting to be sent.
///
/// Dropping a ticket before it is settled (the task running it was aborted,
/// or the provider panicked) ends the request with a failure, so the
/// generator never stays `Pending` without a request in flight.
#[derive(Debug)]
pub struct Ticket {
    request_id: u64,
    request: GenerationRequest,
    outcome: Arc<watch::Sender<Outcome>>,
    settled: bool,
}

impl Ticket {
    /// Monotonic id of this request, for logging.
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// The request that will be sent.
    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    fn settle(mut self, outcome: Outcome) {
        self.outcome.send_replace(outcome);
        self.settled = true;
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let abandoned = self.outcome.send_if_modified(|outcome| {
            if !outcome.is_pending() {
                return false;
            }
            *outcome = Outcome::Failure(UNKNOWN_ERROR_MESSAGE.to_string());
            true
        });
        if abandoned {
            tracing::warn!(
                request_id = self.request_id,
                "generation abandoned before completing"
            );
        }
    }
}

/// How a submit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Another request was in flight.
    Ignored,
    /// The prompt was empty; no call was made.
    Rejected,
    /// The provider returned an image.
    Succeeded { request_id: u64 },
    /// The provider failed.
    Failed { request_id: u64 },
}

/// Drives one [`ImageProvider`] and owns the [`Outcome`].
pub struct Generator<P> {
    provider: P,
    outcome: Arc<watch::Sender<Outcome>>,
    next_request_id: AtomicU64,
}

impl<P: ImageProvider> Generator<P> {
    /// Creates an idle generator.
    pub fn new(provider: P) -> Self {
        let (outcome, _rx) = watch::channel(Outcome::Idle);
        Self {
            provider,
            outcome: Arc::new(outcome),
            next_request_id: AtomicU64::new(1),
        }
    }

    /// The provider requests are sent to.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns a copy of the current outcome.
    pub fn outcome(&self) -> Outcome {
        self.outcome.borrow().clone()
    }

    /// Returns true while a request is in flight.
    pub fn is_pending(&self) -> bool {
        self.outcome.borrow().is_pending()
    }

    /// Subscribes to outcome changes.
    pub fn subscribe(&self) -> watch::Receiver<Outcome> {
        self.outcome.subscribe()
    }

    /// Waits until no request is in flight and returns the outcome.
    pub async fn settled(&self) -> Outcome {
        let mut rx = self.outcome.subscribe();
        let outcome = match rx.wait_for(|outcome| !outcome.is_pending()).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => self.outcome(),
        };
        outcome
    }

    /// Validates the input and, if accepted, moves to `Pending`.
    ///
    /// The check and the transition happen under one lock, so two racing
    /// callers cannot both start a request.
    pub fn begin(&self, prompt: &str, image: Option<&UploadedImage>) -> Admission {
        let valid = !prompt.trim().is_empty();

        let changed = self.outcome.send_if_modified(|outcome| {
            if outcome.is_pending() {
                return false;
            }
            *outcome = if valid {
                Outcome::Pending
            } else {
                let error = NovaError::Validation(EMPTY_PROMPT_MESSAGE.to_string());
                Outcome::Failure(error.user_message())
            };
            true
        });

        if !changed {
            tracing::debug!("generation already in flight, ignoring submit");
            return Admission::Ignored;
        }
        if !valid {
            tracing::debug!("rejected submit with empty prompt");
            return Admission::Rejected;
        }

        let mut request = GenerationRequest::new(prompt);
        if let Some(image) = image {
            request = request.with_reference_image(image.reference());
        }
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            request_id,
            edit = request.is_edit(),
            provider = self.provider.name(),
            "generation started"
        );

        Admission::Started(Ticket {
            request_id,
            request,
            outcome: Arc::clone(&self.outcome),
            settled: false,
        })
    }

    /// Sends a started request and records its outcome.
    pub async fn run(&self, ticket: Ticket) -> Submission {
        let request_id = ticket.request_id;
        let start = Instant::now();

        let (outcome, submission) = match self.provider.generate(&ticket.request).await {
            Ok(image) => {
                tracing::info!(
                    request_id,
                    size = image.size(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "generation succeeded"
                );
                (
                    Outcome::Success(image.to_data_url()),
                    Submission::Succeeded { request_id },
                )
            }
            Err(e) => {
                tracing::warn!(
                    request_id,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "generation failed: {e}"
                );
                (
                    Outcome::Failure(e.user_message()),
                    Submission::Failed { request_id },
                )
            }
        };

        ticket.settle(outcome);
        submission
    }

    /// Validates, sends, and records a request in one step.
    pub async fn submit(&self, prompt: &str, image: Option<&UploadedImage>) -> Submission {
        match self.begin(prompt, image) {
            Admission::Started(ticket) => self.run(ticket).await,
            Admission::Rejected => Submission::Rejected,
            Admission::Ignored => Submission::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{self, SelectedFile};
    use crate::testing::{MockProvider, Reply};

    #[tokio::test]
    async fn test_empty_prompt_never_calls_provider() {
        let provider = Arc::new(MockProvider::succeeding());
        let generator = Generator::new(Arc::clone(&provider));

        for prompt in ["", "   ", "\n\t "] {
            assert_eq!(generator.submit(prompt, None).await, Submission::Rejected);
            assert_eq!(
                generator.outcome(),
                Outcome::Failure(EMPTY_PROMPT_MESSAGE.to_string())
            );
        }
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_success_stores_data_url() {
        let generator = Generator::new(MockProvider::succeeding());

        let result = generator.submit("a cat", None).await;
        assert!(matches!(result, Submission::Succeeded { .. }));

        let outcome = generator.outcome();
        assert_eq!(outcome.generated_image(), Some("data:image/png;base64,AAAA"));
        assert!(outcome.error().is_none());
        assert!(!outcome.is_pending());
    }

    #[tokio::test]
    async fn test_failure_stores_provider_message() {
        let generator = Generator::new(MockProvider::failing("quota exceeded"));

        let result = generator.submit("a cat", None).await;
        assert!(matches!(result, Submission::Failed { .. }));

        let outcome = generator.outcome();
        assert_eq!(outcome, Outcome::Failure("quota exceeded".to_string()));
        assert!(outcome.generated_image().is_none());
        assert!(!outcome.is_pending());
    }

    #[tokio::test]
    async fn test_failure_without_message_uses_fallback() {
        let generator = Generator::new(MockProvider::failing(""));
        generator.submit("a cat", None).await;
        assert_eq!(
            generator.outcome().error(),
            Some(crate::error::UNKNOWN_ERROR_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_transitions_once_per_submit() {
        let provider = Arc::new(MockProvider::succeeding());
        let generator = Generator::new(Arc::clone(&provider));
        let mut rx = generator.subscribe();

        generator.submit("a cat", None).await;

        // Only the latest value is retained, but we were notified and the
        // provider was called exactly once.
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().generated_image().is_some());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_pending_clears_previous_result() {
        let provider = Arc::new(MockProvider::succeeding().gated());
        let generator = Generator::new(Arc::clone(&provider));

        provider.release();
        generator.submit("first", None).await;
        assert!(generator.outcome().generated_image().is_some());

        let Admission::Started(ticket) = generator.begin("second", None) else {
            panic!("expected request to start");
        };
        assert_eq!(generator.outcome(), Outcome::Pending);

        provider.release();
        generator.run(ticket).await;
        assert!(generator.outcome().generated_image().is_some());
    }

    #[tokio::test]
    async fn test_submit_while_pending_is_ignored() {
        let provider = Arc::new(MockProvider::succeeding().gated());
        let generator = Arc::new(Generator::new(Arc::clone(&provider)));

        let Admission::Started(ticket) = generator.begin("a cat", None) else {
            panic!("expected request to start");
        };
        let in_flight = tokio::spawn({
            let generator = Arc::clone(&generator);
            async move { generator.run(ticket).await }
        });

        assert_eq!(generator.submit("a dog", None).await, Submission::Ignored);
        // Empty prompts are ignored too, rather than clobbering Pending.
        assert_eq!(generator.submit("", None).await, Submission::Ignored);
        assert!(generator.is_pending());

        provider.release();
        let result = in_flight.await.unwrap();
        assert!(matches!(result, Submission::Succeeded { request_id: 1 }));
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.calls()[0].prompt, "a cat");
    }

    #[tokio::test]
    async fn test_retry_after_failure() {
        let provider = Arc::new(MockProvider::failing("server error"));
        let generator = Generator::new(Arc::clone(&provider));

        generator.submit("a cat", None).await;
        assert!(generator.outcome().error().is_some());

        provider.set_reply(Reply::Image(vec![0, 0, 0]));
        let result = generator.submit("a cat", None).await;
        assert!(matches!(result, Submission::Succeeded { request_id: 2 }));
        assert!(generator.outcome().error().is_none());
    }

    #[tokio::test]
    async fn test_reference_image_is_sent() {
        let provider = Arc::new(MockProvider::succeeding());
        let generator = Generator::new(Arc::clone(&provider));
        let image = encoder::encode(&SelectedFile::new("a.png", "image/png", vec![1, 2, 3]))
            .unwrap();

        generator.submit("add a hat", Some(&image)).await;

        let calls = provider.calls();
        let reference = calls[0].reference_image.as_ref().unwrap();
        assert_eq!(reference.encoded, "AQID");
        assert_eq!(reference.media_type, "image/png");
    }

    #[tokio::test]
    async fn test_empty_prompt_failure_is_validation_message() {
        let generator = Generator::new(MockProvider::succeeding());
        let Admission::Rejected = generator.begin("  ", None) else {
            panic!("expected rejection");
        };
        let expected = NovaError::Validation(EMPTY_PROMPT_MESSAGE.to_string()).user_message();
        assert_eq!(generator.outcome().error(), Some(expected.as_str()));
    }

    #[tokio::test]
    async fn test_dropped_ticket_fails_instead_of_staying_pending() {
        let provider = Arc::new(MockProvider::succeeding());
        let generator = Generator::new(Arc::clone(&provider));

        let Admission::Started(ticket) = generator.begin("a cat", None) else {
            panic!("expected request to start");
        };
        assert!(generator.is_pending());
        drop(ticket);

        assert_eq!(
            generator.outcome(),
            Outcome::Failure(UNKNOWN_ERROR_MESSAGE.to_string())
        );
        assert!(matches!(
            generator.submit("a cat", None).await,
            Submission::Succeeded { request_id: 2 }
        ));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_aborted_run_fails_instead_of_staying_pending() {
        let provider = Arc::new(MockProvider::succeeding().gated());
        let generator = Arc::new(Generator::new(Arc::clone(&provider)));

        let Admission::Started(ticket) = generator.begin("a cat", None) else {
            panic!("expected request to start");
        };
        let in_flight = tokio::spawn({
            let generator = Arc::clone(&generator);
            async move { generator.run(ticket).await }
        });
        // Let the request reach the provider before aborting it.
        while provider.call_count() == 0 {
            tokio::task::yield_now().await;
        }
        in_flight.abort();
        assert!(in_flight.await.unwrap_err().is_cancelled());

        assert_eq!(generator.outcome().error(), Some(UNKNOWN_ERROR_MESSAGE));
        assert!(!generator.is_pending());
        assert!(matches!(
            generator.begin("again", None),
            Admission::Started(_)
        ));
    }

    #[tokio::test]
    async fn test_panicking_provider_fails_instead_of_staying_pending() {
        let provider = Arc::new(MockProvider::new(Reply::Panic("provider blew up".into())));
        let generator = Arc::new(Generator::new(Arc::clone(&provider)));

        let Admission::Started(ticket) = generator.begin("a cat", None) else {
            panic!("expected request to start");
        };
        let in_flight = tokio::spawn({
            let generator = Arc::clone(&generator);
            async move { generator.run(ticket).await }
        });
        assert!(in_flight.await.unwrap_err().is_panic());

        assert_eq!(generator.outcome().error(), Some(UNKNOWN_ERROR_MESSAGE));
        provider.set_reply(Reply::Image(vec![0, 0, 0]));
        assert!(matches!(
            generator.submit("a cat", None).await,
            Submission::Succeeded { .. }
        ));
    }

    #[tokio::test]
    async fn test_settled_waits_for_in_flight_request() {
        let provider = Arc::new(MockProvider::succeeding().gated());
        let generator = Arc::new(Generator::new(Arc::clone(&provider)));

        assert_eq!(generator.settled().await, Outcome::Idle);

        let Admission::Started(ticket) = generator.begin("a cat", None) else {
            panic!("expected request to start");
        };
        let in_flight = tokio::spawn({
            let generator = Arc::clone(&generator);
            async move { generator.run(ticket).await }
        });
        provider.release();

        let outcome = generator.settled().await;
        assert_eq!(outcome.generated_image(), Some("data:image/png;base64,AAAA"));
        assert!(matches!(
            in_flight.await.unwrap(),
            Submission::Succeeded { .. }
        ));
    }
}
