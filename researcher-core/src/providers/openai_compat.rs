//! OpenAI-compatible completion gateway.
//!
//! Works with OpenAI and any endpoint that follows the chat completions API
//! format (Azure OpenAI, Ollama, vLLM, LM Studio).

use crate::brain::CompletionGateway;
use crate::config::LlmConfig;
use crate::credentials::Credential;
use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, Message, Role, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// Chat completions over HTTP.
pub struct OpenAiCompatibleGateway {
    client: Client,
    base_url: String,
}

impl OpenAiCompatibleGateway {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Connection {
                message: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn messages_to_json(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                json!({ "role": role, "content": msg.content })
            })
            .collect()
    }

    fn request_body(request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "messages": Self::messages_to_json(&request.messages),
            "temperature": request.temperature,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }

    fn parse_response(body: &Value, model: &str) -> Result<CompletionResponse, LlmError> {
        let message = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|choice| choice.get("message"))
            .ok_or_else(|| LlmError::ResponseParse {
                message: "No message in response choices".to_string(),
            })?;

        let text = message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or("")
            .to_string();

        let usage_obj = body.get("usage");
        let usage = TokenUsage {
            input_tokens: usage_obj
                .and_then(|u| u.get("prompt_tokens"))
                .and_then(|t| t.as_u64())
                .unwrap_or(0),
            output_tokens: usage_obj
                .and_then(|u| u.get("completion_tokens"))
                .and_then(|t| t.as_u64())
                .unwrap_or(0),
        };

        let resp_model = body
            .get("model")
            .and_then(|m| m.as_str())
            .unwrap_or(model)
            .to_string();

        Ok(CompletionResponse {
            text,
            usage,
            model: resp_model,
        })
    }

    fn map_http_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        match status.as_u16() {
            401 | 403 => {
                debug!(body = %body, "Authentication failed ({})", status);
                LlmError::AuthFailed {
                    provider: "OpenAI-compatible".to_string(),
                }
            }
            429 => {
                // "Rate limit reached ... Please try again in 20s."
                let retry_secs = serde_json::from_str::<Value>(body)
                    .ok()
                    .and_then(|v| {
                        v.get("error")?
                            .get("message")?
                            .as_str()
                            .map(|s| s.to_string())
                    })
                    .and_then(|msg| {
                        msg.split("in ").last().and_then(|s| {
                            s.trim()
                                .trim_end_matches('.')
                                .trim_end_matches('s')
                                .parse::<u64>()
                                .ok()
                        })
                    })
                    .unwrap_or(5);
                LlmError::RateLimited {
                    retry_after_secs: retry_secs,
                }
            }
            _ => LlmError::ApiRequest {
                message: format!("HTTP {status}: {body}"),
            },
        }
    }
}

#[async_trait]
impl CompletionGateway for OpenAiCompatibleGateway {
    async fn complete(
        &self,
        request: CompletionRequest,
        credential: &Credential,
    ) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            url = %url,
            model = %request.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Connection {
                message: format!("Request failed: {e}"),
            })?;

        let status = response.status();
        let response_body = response.text().await.map_err(|e| LlmError::ApiRequest {
            message: format!("Failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &response_body));
        }

        let json: Value =
            serde_json::from_str(&response_body).map_err(|e| LlmError::ResponseParse {
                message: format!("Invalid JSON: {e}"),
            })?;

        Self::parse_response(&json, &request.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_body_shape() {
        let req = CompletionRequest::new(
            "gpt-4o",
            vec![Message::system("style"), Message::user("question")],
        )
        .with_max_tokens(Some(16_000));
        let body = OpenAiCompatibleGateway::request_body(&req);

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "question");
        assert_eq!(body["max_tokens"], 16_000);
    }

    #[test]
    fn test_request_body_omits_unset_max_tokens() {
        let req = CompletionRequest::new("o1", vec![Message::user("q")]);
        let body = OpenAiCompatibleGateway::request_body(&req);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_parse_response() {
        let body = json!({
            "model": "gpt-4o-2024-08-06",
            "choices": [{ "message": { "role": "assistant", "content": "1. A\n2. B" } }],
            "usage": { "prompt_tokens": 1200, "completion_tokens": 80 }
        });
        let resp = OpenAiCompatibleGateway::parse_response(&body, "gpt-4o").unwrap();
        assert_eq!(resp.text, "1. A\n2. B");
        assert_eq!(resp.usage, TokenUsage::new(1200, 80));
        assert_eq!(resp.model, "gpt-4o-2024-08-06");
    }

    #[test]
    fn test_parse_response_without_choices() {
        let body = json!({ "error": { "message": "bad" } });
        let err = OpenAiCompatibleGateway::parse_response(&body, "gpt-4o").unwrap_err();
        assert!(matches!(err, LlmError::ResponseParse { .. }));
    }

    #[test]
    fn test_parse_response_missing_usage_defaults_to_zero() {
        let body = json!({ "choices": [{ "message": { "content": "ok" } }] });
        let resp = OpenAiCompatibleGateway::parse_response(&body, "gpt-4o").unwrap();
        assert_eq!(resp.usage, TokenUsage::default());
        assert_eq!(resp.model, "gpt-4o");
    }

    #[test]
    fn test_map_http_errors() {
        let auth =
            OpenAiCompatibleGateway::map_http_error(reqwest::StatusCode::UNAUTHORIZED, "{}");
        assert!(matches!(auth, LlmError::AuthFailed { .. }));

        let limited = OpenAiCompatibleGateway::map_http_error(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"Rate limit reached. Please try again in 20s"}}"#,
        );
        assert!(matches!(
            limited,
            LlmError::RateLimited {
                retry_after_secs: 20
            }
        ));

        let server = OpenAiCompatibleGateway::map_http_error(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "oops",
        );
        assert!(server.to_string().contains("500"));
    }
}
