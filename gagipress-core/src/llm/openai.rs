use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::OpenAiSection;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::retry::{retry_if, RetryPolicy};

use super::{ProviderKind, TextProvider};

const CONNECTION_PROBE: &str = "Say 'OK' if you can read this.";

/// Non-200 answer from the completion endpoint.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("HTTP {status}: {message}")]
pub struct HttpError {
    pub status: u16,
    pub message: String,
}

impl HttpError {
    /// Uses the API's `error.message` when the body parses, the raw body otherwise.
    pub fn from_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .map(|parsed| parsed.error.message)
            .unwrap_or_else(|_| body.to_string());
        Self { status, message }
    }

    pub fn is_client_error(&self) -> bool {
        self.status < 500
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "is_zero_temperature")]
    pub temperature: f32,
    #[serde(skip_serializing_if = "is_zero_tokens")]
    pub max_tokens: u32,
}

fn is_zero_temperature(value: &f32) -> bool {
    *value == 0.0
}

fn is_zero_tokens(value: &u32) -> bool {
    *value == 0
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Chat-completion client for the hosted model API.
///
/// Server-side (5xx) and transport failures are retried under the configured
/// policy; any other HTTP status is returned immediately.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiSection, cancel: CancellationToken) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| AppError::wrap(err, ErrorKind::Network, "failed to build http client"))?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_tokens: config.max_tokens,
            retry: config.retry,
            cancel,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: u32,
    ) -> AppResult<ChatCompletionResponse> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature,
            max_tokens,
        };

        let result = retry_if(&self.retry, &self.cancel, is_retryable, |attempt| {
            debug!(
                target: "llm",
                attempt = attempt + 1,
                model = %self.model,
                "sending chat completion"
            );
            self.send(&request)
        })
        .await;

        match result {
            Ok(response) => Ok(response),
            Err(err) if !is_retryable(&err) || err.is_kind(ErrorKind::Validation) => Err(err),
            Err(err) if err.is_kind(ErrorKind::Cancelled) => Err(err),
            Err(err) => Err(AppError::wrap(
                err,
                ErrorKind::Api,
                format!("failed after {} attempts", self.retry.max_attempts()),
            )),
        }
    }

    pub async fn generate_text(&self, prompt: &str, temperature: f32) -> AppResult<String> {
        let response = self
            .chat_completion(vec![ChatMessage::user(prompt)], temperature, self.max_tokens)
            .await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::new(ErrorKind::Api, "no response from OpenAI"))?;
        if let Some(usage) = response.usage {
            info!(
                target: "llm",
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion received"
            );
        }
        Ok(choice.message.content)
    }

    pub async fn test_connection(&self) -> AppResult<()> {
        self.generate_text(CONNECTION_PROBE, 0.0).await.map(|_| ())
    }

    async fn send(&self, request: &ChatCompletionRequest) -> AppResult<ChatCompletionResponse> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|err| AppError::wrap(err, ErrorKind::Network, "failed to send request"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| AppError::wrap(err, ErrorKind::Network, "failed to read response"))?;

        if status != StatusCode::OK {
            return Err(AppError::wrap(
                HttpError::from_body(status.as_u16(), &body),
                ErrorKind::Api,
                "chat completion rejected",
            ));
        }

        serde_json::from_str(&body)
            .map_err(|err| AppError::wrap(err, ErrorKind::Api, "failed to decode response"))
    }
}

/// Client-class HTTP failures are final; everything else may be transient.
fn is_retryable(err: &AppError) -> bool {
    err.find_cause::<HttpError>()
        .map(|http| !http.is_client_error())
        .unwrap_or(true)
}

#[async_trait]
impl TextProvider for OpenAiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Network
    }

    async fn generate(&self, prompt: &str, temperature: f32) -> AppResult<String> {
        self.generate_text(prompt, temperature).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> OpenAiClient {
        let config = OpenAiSection {
            api_key: "sk-test".into(),
            ..OpenAiSection::default()
        };
        OpenAiClient::new(&config, CancellationToken::new())
            .unwrap()
            .with_base_url(base_url)
            .with_retry_policy(RetryPolicy::new(
                3,
                Duration::from_millis(5),
                Duration::from_millis(20),
                2.0,
            ))
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        })
    }

    #[tokio::test]
    async fn generate_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "max_tokens": 2000,
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("hi there")))
            .expect(1)
            .mount(&server)
            .await;

        let text = test_client(&server.uri()).generate_text("hello", 0.8).await.unwrap();
        assert_eq!(text, "hi there");
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {
                    "message": "Incorrect API key",
                    "type": "invalid_request_error",
                    "code": "invalid_api_key"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).generate_text("hello", 0.8).await.unwrap_err();
        assert!(err.is_kind(ErrorKind::Api));
        let http = err.find_cause::<HttpError>().expect("http cause");
        assert_eq!(http.status, 401);
        assert_eq!(http.message, "Incorrect API key");
    }

    #[tokio::test]
    async fn server_errors_exhaust_the_budget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
            .expect(3)
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).generate_text("hello", 0.8).await.unwrap_err();
        assert!(err.is_kind(ErrorKind::Api));
        assert!(err.to_string().contains("failed after 3 attempts"));
        let http = err.find_cause::<HttpError>().expect("http cause");
        assert_eq!(http.status, 503);
        assert_eq!(http.message, "upstream overloaded");
    }

    #[tokio::test]
    async fn recovers_after_transient_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("second time")))
            .mount(&server)
            .await;

        let text = test_client(&server.uri()).generate_text("hello", 0.8).await.unwrap();
        assert_eq!(text, "second time");
    }

    #[tokio::test]
    async fn empty_choices_is_a_hard_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-2",
                "model": "gpt-4o-mini",
                "choices": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).generate_text("hello", 0.8).await.unwrap_err();
        assert!(err.is_kind(ErrorKind::Api));
        assert!(err.to_string().contains("no response"));
    }

    #[tokio::test]
    async fn transport_failures_are_retried_then_wrapped() {
        let client = test_client("http://127.0.0.1:9");
        let err = client.generate_text("hello", 0.8).await.unwrap_err();
        assert!(err.is_kind(ErrorKind::Api));
        assert!(err.find_cause::<reqwest::Error>().is_some());
    }

    #[test]
    fn unparseable_error_body_is_kept_verbatim() {
        let err = HttpError::from_body(502, "<html>bad gateway</html>");
        assert_eq!(err.to_string(), "HTTP 502: <html>bad gateway</html>");
        assert!(!err.is_client_error());
    }

    #[test]
    fn zero_temperature_is_omitted_from_the_wire() {
        let request = ChatCompletionRequest {
            model: "m".into(),
            messages: vec![ChatMessage::user("x")],
            temperature: 0.0,
            max_tokens: 10,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("temperature").is_none());
        assert_eq!(value["max_tokens"], 10);
    }
}
