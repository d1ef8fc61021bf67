//! Gemini inference client.
//!
//! One `generateContent` request per question: the packaged repository and
//! the question go out in a single prompt, and the generated text comes back
//! with the token counters from `usageMetadata`. There is no chunking,
//! streaming, retry or request timeout; a failed request ends the run.

use std::fmt;

use serde::Deserialize;

use crate::constants::{API_KEY_ENV, DEFAULT_BASE_URL};
use crate::error::{RepoqError, Result};
use crate::packager::PackagedRepository;

/// Fixed instructions placed ahead of the repository content.
pub const SYSTEM_PROMPT: &str = "You are an expert software developer analyzing a codebase.
Your task is to answer questions about the repository content provided below.

Guidelines:
- Provide accurate, detailed answers based on the actual code
- Reference specific files and line numbers when relevant
- If you're unsure about something, say so
- Be concise but thorough";

/// API key for the inference service.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// Read the credential from `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::from_value(std::env::var(API_KEY_ENV).ok())
    }

    /// Build a credential from an optional raw value.
    ///
    /// Missing and blank values are both [`RepoqError::CredentialMissing`].
    pub fn from_value(value: Option<String>) -> Result<Self> {
        match value {
            Some(key) if !key.trim().is_empty() => Ok(Self(key.trim().to_string())),
            _ => Err(RepoqError::CredentialMissing { var: API_KEY_ENV }),
        }
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Token counters reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// Generated answer plus usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub text: String,
    pub usage: TokenUsage,
}

/// Build the single prompt sent to the model.
pub fn build_prompt(packaged: &PackagedRepository, question: &str) -> String {
    format!(
        "{SYSTEM_PROMPT}

## Repository Content

{}

## User Query

{question}

Please answer the query based on the repository content above.",
        packaged.as_str()
    )
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    credential: Credential,
    base_url: String,
}

impl GeminiClient {
    /// Client for the public Gemini endpoint.
    pub fn new(credential: Credential) -> Self {
        Self {
            client: reqwest::Client::new(),
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the JSON request body for a prompt.
    pub fn build_request_body(prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }],
            }],
        })
    }

    /// Ask `question` about the packaged repository using `model`.
    pub async fn query(
        &self,
        packaged: &PackagedRepository,
        question: &str,
        model: &str,
    ) -> Result<QueryResult> {
        let prompt = build_prompt(packaged, question);
        self.generate(&prompt, model).await
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<QueryResult> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        tracing::debug!("POST {} ({} prompt bytes)", url, prompt.len());

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.credential.expose())
            .json(&Self::build_request_body(prompt))
            .send()
            .await
            .map_err(|e| inference_failed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            return Err(inference_failed(format!(
                "API error (status {}): {}",
                status.as_u16(),
                message.trim()
            )));
        }

        let body: GenerateContentResponse = resp
            .json()
            .await
            .map_err(|e| inference_failed(format!("invalid response: {e}")))?;

        body.into_query_result()
    }
}

fn inference_failed(message: impl Into<String>) -> RepoqError {
    RepoqError::InferenceFailed {
        message: message.into(),
    }
}

/// Deserialize helpers for the `generateContent` response.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: UsageMetadata,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    total_token_count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GenerateContentResponse {
    fn into_query_result(self) -> Result<QueryResult> {
        let usage = TokenUsage {
            input_tokens: self.usage_metadata.prompt_token_count,
            output_tokens: self.usage_metadata.candidates_token_count,
            total_tokens: self.usage_metadata.total_token_count,
        };

        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
                .map(|reason| format!("prompt blocked ({reason})"))
                .unwrap_or_else(|| "response contained no candidates".to_string());
            return Err(inference_failed(reason));
        };

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(QueryResult { text, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::time::Duration;

    const PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new(Credential::from_value(Some("test-key".to_string())).unwrap())
            .with_base_url(server.base_url())
    }

    #[test]
    fn test_credential_from_value() {
        assert!(Credential::from_value(Some("abc".to_string())).is_ok());

        let err = Credential::from_value(None).unwrap_err();
        assert!(matches!(
            err,
            RepoqError::CredentialMissing {
                var: "GEMINI_API_KEY"
            }
        ));
        assert!(Credential::from_value(Some("   ".to_string())).is_err());
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::from_value(Some("super-secret".to_string())).unwrap();
        assert!(!format!("{credential:?}").contains("super-secret"));
    }

    #[test]
    fn test_prompt_layout() {
        let packaged = PackagedRepository::new("fn main() {}");
        let prompt = build_prompt(&packaged, "What does main do?");

        let system = prompt.find("expert software developer").unwrap();
        let content = prompt.find("fn main() {}").unwrap();
        let question = prompt.find("What does main do?").unwrap();
        assert!(system < content && content < question);
        assert!(prompt.contains("## Repository Content"));
        assert!(prompt.contains("## User Query"));
    }

    #[test]
    fn test_request_body() {
        let body = GeminiClient::build_request_body("Hello");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Hello");
    }

    #[tokio::test]
    async fn test_query_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(PATH)
                    .header("x-goog-api-key", "test-key")
                    .body_contains("## User Query");
                then.status(200).json_body(serde_json::json!({
                    "candidates": [{
                        "content": {
                            "role": "model",
                            "parts": [{ "text": "It prints " }, { "text": "hello." }]
                        },
                        "finishReason": "STOP"
                    }],
                    "usageMetadata": {
                        "promptTokenCount": 1234,
                        "candidatesTokenCount": 56,
                        "totalTokenCount": 1300
                    }
                }));
            })
            .await;

        let result = client(&server)
            .query(&PackagedRepository::new("repo"), "What?", "gemini-2.5-flash")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.text, "It prints hello.");
        assert_eq!(
            result.usage,
            TokenUsage {
                input_tokens: 1234,
                output_tokens: 56,
                total_tokens: 1300,
            }
        );
    }

    #[tokio::test]
    async fn test_missing_usage_reads_as_zero() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(200).json_body(serde_json::json!({
                    "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }]
                }));
            })
            .await;

        let result = client(&server)
            .query(&PackagedRepository::new("repo"), "q", "gemini-2.5-flash")
            .await
            .unwrap();
        assert_eq!(result.text, "ok");
        assert_eq!(result.usage, TokenUsage::default());
    }

    #[tokio::test]
    async fn test_api_error_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(400).json_body(serde_json::json!({
                    "error": {
                        "code": 400,
                        "message": "API key not valid.",
                        "status": "INVALID_ARGUMENT"
                    }
                }));
            })
            .await;

        let err = client(&server)
            .query(&PackagedRepository::new("repo"), "q", "gemini-2.5-flash")
            .await
            .unwrap_err();

        assert!(matches!(err, RepoqError::InferenceFailed { .. }));
        let message = err.to_string();
        assert!(message.contains("status 400"), "{message}");
        assert!(message.contains("API key not valid."), "{message}");
    }

    #[tokio::test]
    async fn test_server_error_raw_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(503).body("upstream unavailable");
            })
            .await;

        let err = client(&server)
            .query(&PackagedRepository::new("repo"), "q", "gemini-2.5-flash")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("upstream unavailable"));
    }

    #[tokio::test]
    async fn test_blocked_prompt() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(200).json_body(serde_json::json!({
                    "promptFeedback": { "blockReason": "SAFETY" },
                    "usageMetadata": { "promptTokenCount": 10, "totalTokenCount": 10 }
                }));
            })
            .await;

        let err = client(&server)
            .query(&PackagedRepository::new("repo"), "q", "gemini-2.5-flash")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_connection_failure() {
        // Nothing listens on port 9 (discard) in the test environment.
        let client = GeminiClient::new(Credential::from_value(Some("k".to_string())).unwrap())
            .with_base_url("http://127.0.0.1:9/");
        let err = client
            .query(&PackagedRepository::new("repo"), "q", "gemini-2.5-flash")
            .await
            .unwrap_err();
        assert!(matches!(err, RepoqError::InferenceFailed { .. }));
    }

    #[tokio::test]
    async fn test_error_status_with_truncated_body() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Announces a 100-byte body, sends a few bytes, then hangs up.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64 * 1024];
            while let Ok(Ok(n)) =
                tokio::time::timeout(Duration::from_millis(200), socket.read(&mut buf)).await
            {
                if n == 0 {
                    break;
                }
            }
            let response = "HTTP/1.1 500 Internal Server Error\r\n\
                            content-length: 100\r\n\r\npartial";
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        let client = GeminiClient::new(Credential::from_value(Some("k".to_string())).unwrap())
            .with_base_url(format!("http://{addr}"));
        let err = client
            .query(&PackagedRepository::new("repo"), "q", "gemini-2.5-flash")
            .await
            .unwrap_err();
        server.await.unwrap();

        let message = err.to_string();
        assert!(message.contains("status 500"), "{message}");
        assert!(message.contains("<unreadable body:"), "{message}");
    }
}
