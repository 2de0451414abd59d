//! Blocking client for Ollama's `/api/generate` endpoint.

use super::prompt::{answer_prompt, question_prompt};
use super::{ProviderError, ProviderResult, QuestionProvider, QuestionStyle};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const DEFAULT_PROVIDER_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3:8b-instruct-q4_K_M";
const GENERATE_PATH: &str = "/api/generate";
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Question provider backed by a local Ollama server.
pub struct OllamaProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
}

impl OllamaProvider {
    /// Builds a provider for `base_url` (e.g. `http://localhost:11434`).
    ///
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> ProviderResult<Self> {
        let endpoint = format!("{}{GENERATE_PATH}", base_url.trim().trim_end_matches('/'));
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ProviderError::Unavailable {
                endpoint: endpoint.clone(),
                message: format!("cannot build http client: {err}"),
            })?;
        Ok(Self {
            client,
            endpoint,
            model: model.trim().to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate(&self, kind: &'static str, prompt: &str) -> ProviderResult<String> {
        let started_at = Instant::now();
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|err| self.transport_error(kind, err))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|err| self.transport_error(kind, err))?;
        if !status.is_success() {
            warn!(
                "event=provider_generate module=study status=error kind={} http_status={}",
                kind,
                status.as_u16()
            );
            return Err(self.protocol_error(format!(
                "http status {}: {}",
                status.as_u16(),
                crate::logging::sanitize_message(&body, MAX_ERROR_BODY_CHARS)
            )));
        }

        let text = decode_generate_body(&body).map_err(|message| self.protocol_error(message))?;
        debug!(
            "event=provider_generate module=study status=ok kind={} model={} chars={} duration_ms={}",
            kind,
            self.model,
            text.chars().count(),
            started_at.elapsed().as_millis()
        );
        Ok(text)
    }

    fn transport_error(&self, kind: &'static str, err: reqwest::Error) -> ProviderError {
        warn!(
            "event=provider_generate module=study status=error kind={} timeout={} connect={}",
            kind,
            err.is_timeout(),
            err.is_connect()
        );
        if err.is_connect() || err.is_timeout() || err.is_request() {
            ProviderError::Unavailable {
                endpoint: self.endpoint.clone(),
                message: err.to_string(),
            }
        } else {
            self.protocol_error(err.to_string())
        }
    }

    fn protocol_error(&self, message: String) -> ProviderError {
        ProviderError::Protocol {
            endpoint: self.endpoint.clone(),
            message,
        }
    }
}

impl QuestionProvider for OllamaProvider {
    fn generate_question(&self, body: &str, style: QuestionStyle) -> ProviderResult<String> {
        self.generate("question", &question_prompt(body, style))
    }

    fn generate_answer(&self, question: &str, body: &str) -> ProviderResult<String> {
        self.generate("answer", &answer_prompt(question, body))
    }
}

/// Extracts the trimmed `response` text from a non-streaming generate body.
///
/// An empty response is rejected since neither a question nor an answer can
/// be empty.
pub fn decode_generate_body(body: &str) -> Result<String, String> {
    let decoded: GenerateResponse = serde_json::from_str(body).map_err(|err| {
        format!(
            "cannot decode response: {err}; body was: {}",
            crate::logging::sanitize_message(body, MAX_ERROR_BODY_CHARS)
        )
    })?;
    let text = decoded.response.trim();
    if text.is_empty() {
        return Err("model returned an empty response".to_string());
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::{decode_generate_body, OllamaProvider, DEFAULT_MODEL};
    use crate::study::{ProviderError, QuestionProvider, QuestionStyle};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn decode_trims_response_text() {
        let text = decode_generate_body(r#"{"response":"  What is a borrow?\n","done":true}"#)
            .unwrap();
        assert_eq!(text, "What is a borrow?");
    }

    #[test]
    fn decode_rejects_malformed_or_empty_bodies() {
        assert!(decode_generate_body("not json").is_err());
        assert!(decode_generate_body(r#"{"done":true}"#).is_err());
        assert!(decode_generate_body(r#"{"response":"   "}"#).is_err());
    }

    #[tokio::test]
    async fn generate_question_posts_non_streaming_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({ "model": DEFAULT_MODEL, "stream": false })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "response": " Why move? ", "done": true })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let base_url = format!("{}/", server.uri());
        let (endpoint, question) = tokio::task::spawn_blocking(move || {
            let provider =
                OllamaProvider::new(&base_url, DEFAULT_MODEL, Duration::from_secs(5)).unwrap();
            let question =
                provider.generate_question("Moves transfer ownership.", QuestionStyle::Factual);
            (provider.endpoint().to_string(), question)
        })
        .await
        .unwrap();
        assert!(endpoint.ends_with("/api/generate"));
        assert!(!endpoint.contains("//api"));
        assert_eq!(question.unwrap(), "Why move?");

        let requests = server.received_requests().await.unwrap();
        let request: serde_json::Value = requests[0].body_json().unwrap();
        assert!(request["prompt"]
            .as_str()
            .unwrap()
            .contains("Moves transfer ownership."));
    }

    #[tokio::test]
    async fn error_status_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "boom" })))
            .mount(&server)
            .await;

        let base_url = server.uri();
        let err = tokio::task::spawn_blocking(move || {
            let provider = OllamaProvider::new(&base_url, "m", Duration::from_secs(5)).unwrap();
            provider.generate_answer("q?", "body")
        })
        .await
        .unwrap()
        .unwrap_err();
        match err {
            ProviderError::Protocol { message, .. } => assert!(message.contains("500")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_response_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "  " })))
            .mount(&server)
            .await;

        let base_url = server.uri();
        let err = tokio::task::spawn_blocking(move || {
            let provider = OllamaProvider::new(&base_url, "m", Duration::from_secs(5)).unwrap();
            provider.generate_question("body", QuestionStyle::Mixed)
        })
        .await
        .unwrap()
        .unwrap_err();
        assert!(matches!(err, ProviderError::Protocol { .. }), "{err:?}");
    }

    #[test]
    fn closed_port_is_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let provider = OllamaProvider::new(&base_url, "m", Duration::from_secs(2)).unwrap();
        let err = provider
            .generate_question("body", QuestionStyle::Mixed)
            .unwrap_err();
        assert!(err.is_unavailable(), "{err:?}");
    }
}
