//! Ollama daemon client
//!
//! Talks to a local Ollama server over its native HTTP API. Only the
//! non-streaming `/api/generate` call is used: a component is previewed once
//! the whole response is in.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{GenerationError, Result};

/// Default Ollama URL
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Sampling options sent with every generate request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OllamaOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub num_predict: i32,
}

impl Default for OllamaOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.9,
            num_predict: 2000,
        }
    }
}

/// A model installed in the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub modified_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelSummary>,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: OllamaOptions,
}

/// Response of a non-streaming generate call
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerateResponse {
    pub model: String,
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
    /// Nanoseconds spent generating `eval_count` tokens
    #[serde(default)]
    pub eval_duration: Option<u64>,
}

impl GenerateResponse {
    /// Generation speed, or 0 when the daemon did not report timings
    pub fn tokens_per_second(&self) -> f64 {
        match (self.eval_count, self.eval_duration) {
            (Some(count), Some(duration)) if count > 0 && duration > 0 => {
                count as f64 / (duration as f64 / 1_000_000_000.0)
            }
            _ => 0.0,
        }
    }
}

/// HTTP client for one Ollama daemon
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http_client: reqwest::Client,
    base_url: String,
    options: OllamaOptions,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, options: OllamaOptions) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            options,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> OllamaOptions {
        self.options
    }

    /// Whether the daemon answers on `/api/tags`
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.http_client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                log::debug!("Ollama health check failed: {}", e);
                false
            }
        }
    }

    /// Daemon version string
    pub async fn version(&self) -> Result<String> {
        let url = format!("{}/api/version", self.base_url);
        let response = check_status(self.http_client.get(&url).send().await?).await?;
        let version: VersionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;
        Ok(version.version)
    }

    pub async fn list_models(&self) -> Result<Vec<ModelSummary>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = check_status(self.http_client.get(&url).send().await?).await?;
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;
        Ok(tags.models)
    }

    /// Run one non-streaming completion
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<GenerateResponse> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model,
            prompt,
            system,
            stream: false,
            options: self.options,
        };

        log::debug!("Sending generate request to {} (model {})", url, model);
        let response = self.http_client.post(&url).json(&request).send().await?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(GenerationError::Status { status, body })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and hand back the raw request
    pub(crate) async fn serve_once(
        status: u16,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{}", addr), handle)
    }

    #[test]
    fn test_tokens_per_second() {
        let response = GenerateResponse {
            model: "m".into(),
            response: String::new(),
            done: true,
            total_duration: None,
            eval_count: Some(100),
            eval_duration: Some(2_000_000_000),
        };
        assert_eq!(response.tokens_per_second(), 50.0);

        let missing = GenerateResponse {
            eval_duration: None,
            ..response
        };
        assert_eq!(missing.tokens_per_second(), 0.0);
    }

    #[test]
    fn test_default_options() {
        let options = OllamaOptions::default();
        assert_eq!(options.temperature, 0.1);
        assert_eq!(options.top_p, 0.9);
        assert_eq!(options.num_predict, 2000);
    }

    #[tokio::test]
    async fn test_generate_sends_non_streaming_request() {
        let (url, server) = serve_once(
            200,
            r#"{"model":"coder","response":"```tsx\nexport const A = () => null;\n```","done":true,"eval_count":10,"eval_duration":500000000}"#,
        )
        .await;
        let client = OllamaClient::new(url, OllamaOptions::default()).unwrap();

        let response = client.generate("coder", "make a button", Some("system")).await.unwrap();
        assert_eq!(response.model, "coder");
        assert_eq!(response.tokens_per_second(), 20.0);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/generate"));
        assert!(request.contains(r#""stream":false"#));
        assert!(request.contains(r#""num_predict":2000"#));
        assert!(request.contains(r#""system":"system""#));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (url, _server) = serve_once(404, r#"{"error":"model not found"}"#).await;
        let client = OllamaClient::new(url, OllamaOptions::default()).unwrap();
        match client.generate("missing", "x", None).await {
            Err(GenerationError::Status { status, body }) => {
                assert_eq!(status, 404);
                assert!(body.contains("model not found"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_models() {
        let (url, _server) = serve_once(
            200,
            r#"{"models":[{"name":"qwen2.5-coder:7b","size":42},{"name":"llama3"}]}"#,
        )
        .await;
        let client = OllamaClient::new(url, OllamaOptions::default()).unwrap();
        let models = client.list_models().await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].size, Some(42));
        assert_eq!(models[1].name, "llama3");
    }

    #[tokio::test]
    async fn test_health_check_without_daemon() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = OllamaClient::new(format!("http://{}", addr), OllamaOptions::default()).unwrap();
        assert!(!client.health_check().await);
    }
}
