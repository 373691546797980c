//! OpenRouter-compatible `/chat/completions` client.
//!
//! Behaviour:
//! - The composed system prompt is sent first, followed by the transcript in
//!   received order.
//! - Every call carries its own timeout; nothing is retried here.
//! - `HTTP-Referer` and `X-Title` identify the calling site to the provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::credentials::Credential;
use super::error::ProviderError;
use super::provider::CompletionProvider;
use super::types::{CompletionRequest, Role};
use crate::config::ProviderConfig;

/// Connection establishment timeout, independent of the attempt timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum number of body characters kept in a status error.
const ERROR_BODY_CHARS: usize = 200;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionPayload<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// HTTP client for an OpenRouter-style provider.
pub struct OpenRouterClient {
    client: reqwest::Client,
    endpoint: String,
    attempt_timeout: Duration,
}

impl OpenRouterClient {
    /// Build a client from provider configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        insert_site_header(&mut headers, "http-referer", &config.site_url);
        insert_site_header(&mut headers, "x-title", &config.site_name);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: completions_endpoint(&config.base_url),
            attempt_timeout: config.timeout(),
        })
    }

    /// Full URL of the completions endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterClient {
    async fn complete(
        &self,
        credential: &Credential,
        request: CompletionRequest<'_>,
    ) -> Result<String, ProviderError> {
        let payload = build_payload(request);

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", credential.key()))
            .timeout(self.attempt_timeout)
            .json(&payload)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(ProviderError::from_transport)?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_CHARS).collect(),
            });
        }

        extract_content(&body)
    }

    fn name(&self) -> &'static str {
        "openrouter"
    }
}

/// Site identification is optional; a value that is not a legal header is
/// left out rather than failing startup.
fn insert_site_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    let parsed = HeaderValue::from_str(value)
        .inspect_err(|_| warn!(header = name, value, "Ignoring site value that is not a valid header"));
    if let Ok(header) = parsed {
        headers.insert(name, header);
    }
}

/// Append `/chat/completions` unless the base URL already points there.
fn completions_endpoint(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/chat/completions")
    }
}

fn build_payload(request: CompletionRequest<'_>) -> ChatCompletionPayload<'_> {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    messages.push(ChatMessage {
        role: Role::System.as_str(),
        content: request.system_prompt,
    });
    messages.extend(request.messages.iter().map(|m| ChatMessage {
        role: m.role.as_str(),
        content: &m.content,
    }));

    let params = request.params;
    ChatCompletionPayload {
        model: &params.model,
        messages,
        temperature: params.temperature,
        max_tokens: params.max_tokens,
        top_p: params.top_p,
        frequency_penalty: params.frequency_penalty,
        presence_penalty: params.presence_penalty,
    }
}

/// Pull `choices[0].message.content` out of a response body.
fn extract_content(body: &str) -> Result<String, ProviderError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedPayload(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedPayload("no choices".to_string()))?
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| ProviderError::MalformedPayload("choice without content".to_string()))
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use axum::Router;
    use axum::http::{HeaderMap as RequestHeaders, StatusCode};
    use axum::routing::post;

    use super::*;
    use crate::llm::credentials::CredentialPool;
    use crate::llm::types::{GenerationParams, Message};

    fn params() -> GenerationParams {
        GenerationParams {
            model: "test/model".to_string(),
            temperature: 0.7,
            max_tokens: 800,
            top_p: 0.9,
            frequency_penalty: 0.5,
            presence_penalty: 0.3,
        }
    }

    #[test]
    fn test_payload_puts_system_prompt_first() {
        let messages = vec![Message::user("first"), Message::assistant("second")];
        let params = params();
        let request = CompletionRequest {
            system_prompt: "be a facilitator",
            messages: &messages,
            params: &params,
        };

        let value = serde_json::to_value(build_payload(request)).unwrap_or_default();
        let sent = value["messages"].as_array().cloned().unwrap_or_default();

        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0]["role"], "system");
        assert_eq!(sent[0]["content"], "be a facilitator");
        assert_eq!(sent[1]["content"], "first");
        assert_eq!(sent[2]["role"], "assistant");
        assert_eq!(value["model"], "test/model");
        assert_eq!(value["max_tokens"], 800);
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#;
        assert_eq!(extract_content(body).ok().as_deref(), Some("hello"));
    }

    #[test]
    fn test_extract_content_rejects_missing_choice() {
        assert!(matches!(
            extract_content(r#"{"choices":[]}"#),
            Err(ProviderError::MalformedPayload(_))
        ));
        assert!(matches!(
            extract_content(r#"{"error":{"message":"quota"}}"#),
            Err(ProviderError::MalformedPayload(_))
        ));
        assert!(matches!(
            extract_content(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(ProviderError::MalformedPayload(_))
        ));
        assert!(matches!(
            extract_content("<html>bad gateway</html>"),
            Err(ProviderError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_completions_endpoint() {
        assert_eq!(
            completions_endpoint("https://openrouter.ai/api/v1/"),
            "https://openrouter.ai/api/v1/chat/completions"
        );
        assert_eq!(
            completions_endpoint("https://openrouter.ai/api/v1/chat/completions"),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    /// Serve `router` on an ephemeral local port and return its base URL.
    async fn local_provider(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        let addr = listener.local_addr().unwrap_or_else(|e| unreachable!("{e}"));
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{addr}/api/v1")
    }

    fn client_for(base_url: String, site_name: &str, timeout_secs: u64) -> OpenRouterClient {
        let config = ProviderConfig {
            base_url,
            site_url: "https://discuss.example".to_string(),
            site_name: site_name.to_string(),
            timeout_secs,
            ..ProviderConfig::default()
        };
        OpenRouterClient::new(&config).unwrap_or_else(|e| unreachable!("{e}"))
    }

    async fn call(client: &OpenRouterClient) -> Result<String, ProviderError> {
        let pool = CredentialPool::from_keys(["sk-test"]).unwrap_or_else(|e| unreachable!("{e}"));
        let credential = pool.iter().next().unwrap_or_else(|| unreachable!());
        let messages = vec![Message::user("hello")];
        let params = params();
        let request = CompletionRequest {
            system_prompt: "be a facilitator",
            messages: &messages,
            params: &params,
        };
        client.complete(credential, request).await
    }

    fn header(headers: &RequestHeaders, name: &str) -> String {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("<missing>")
            .to_string()
    }

    #[tokio::test]
    async fn test_sends_auth_and_site_headers() {
        let router = Router::new().route(
            "/api/v1/chat/completions",
            post(|headers: RequestHeaders| async move {
                let seen = format!(
                    "{}|{}|{}",
                    header(&headers, "authorization"),
                    header(&headers, "http-referer"),
                    header(&headers, "x-title"),
                );
                axum::Json(serde_json::json!({
                    "choices": [{ "message": { "role": "assistant", "content": seen } }]
                }))
            }),
        );
        let client = client_for(local_provider(router).await, "Town Hall", 5);

        let content = call(&client).await;

        assert_eq!(
            content.ok().as_deref(),
            Some("Bearer sk-test|https://discuss.example|Town Hall")
        );
    }

    #[tokio::test]
    async fn test_invalid_site_name_is_left_out() {
        let router = Router::new().route(
            "/api/v1/chat/completions",
            post(|headers: RequestHeaders| async move {
                axum::Json(serde_json::json!({
                    "choices": [{ "message": { "content": header(&headers, "x-title") } }]
                }))
            }),
        );
        let client = client_for(local_provider(router).await, "Café Débat", 5);

        assert_eq!(call(&client).await.ok().as_deref(), Some("<missing>"));
    }

    #[tokio::test]
    async fn test_error_status_is_reported_with_truncated_body() {
        let router = Router::new().route(
            "/api/v1/chat/completions",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "x".repeat(500)) }),
        );
        let client = client_for(local_provider(router).await, "Town Hall", 5);

        match call(&client).await {
            Err(ProviderError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body.chars().count(), ERROR_BODY_CHARS);
            }
            other => unreachable!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let router = Router::new().route(
            "/api/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "too late"
            }),
        );
        let client = client_for(local_provider(router).await, "Town Hall", 1);

        let started = Instant::now();
        let result = call(&client).await;

        assert!(matches!(result, Err(ProviderError::Timeout)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
