//! Brain module: the completion gateway abstraction.
//!
//! Defines the `CompletionGateway` trait the research engine talks to, and a
//! scripted `MockCompletionGateway` for tests and offline runs. The HTTP
//! implementation lives in `providers`.

use crate::credentials::Credential;
use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, TokenUsage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A language model endpoint.
///
/// Implementations make exactly one attempt per call and report any non-2xx
/// status or transport failure as an error.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn complete(
        &self,
        request: CompletionRequest,
        credential: &Credential,
    ) -> Result<CompletionResponse, LlmError>;
}

/// A scripted completion gateway.
///
/// Responses are returned in the order they were queued. Every request is
/// recorded so tests can inspect the prompts the engine built.
pub struct MockCompletionGateway {
    responses: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletionGateway {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a text response with fixed usage (100 in, 50 out).
    pub fn queue_text(&self, text: &str) {
        self.queue_response(Ok(Self::text_response(text)));
    }

    /// Queue an error for the next call.
    pub fn queue_error(&self, error: LlmError) {
        self.queue_response(Err(error));
    }

    pub fn queue_response(&self, response: Result<CompletionResponse, LlmError>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
    }

    /// Create a simple text response for testing.
    pub fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse::new(text, TokenUsage::new(100, 50), "mock-model")
    }

    /// All requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for MockCompletionGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionGateway for MockCompletionGateway {
    async fn complete(
        &self,
        request: CompletionRequest,
        _credential: &Credential,
    ) -> Result<CompletionResponse, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        let next = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        next.unwrap_or_else(|| {
            Ok(Self::text_response(
                "I'm a mock LLM. No queued responses available.",
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    fn cred() -> Credential {
        Credential::new("sk-test").unwrap()
    }

    #[tokio::test]
    async fn test_mock_returns_in_order() {
        let gateway = MockCompletionGateway::new();
        gateway.queue_text("first");
        gateway.queue_text("second");

        let req = CompletionRequest::new("gpt-4o", vec![Message::user("q")]);
        let a = gateway.complete(req.clone(), &cred()).await.unwrap();
        let b = gateway.complete(req, &cred()).await.unwrap();
        assert_eq!(a.text, "first");
        assert_eq!(b.text, "second");
        assert_eq!(gateway.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_queued_error() {
        let gateway = MockCompletionGateway::new();
        gateway.queue_error(LlmError::Connection {
            message: "reset".into(),
        });
        let req = CompletionRequest::new("gpt-4o", vec![Message::user("q")]);
        assert!(gateway.complete(req, &cred()).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let gateway = MockCompletionGateway::new();
        let req = CompletionRequest::new(
            "o1",
            vec![Message::system("style"), Message::user("prompt")],
        );
        let resp = gateway.complete(req, &cred()).await.unwrap();
        assert!(resp.text.contains("mock"));

        let seen = gateway.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "o1");
        assert_eq!(seen[0].messages[1].content, "prompt");
    }
}
