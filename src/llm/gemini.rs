use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{header::RETRY_AFTER, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CompletionBackend, UpstreamFailure};
use crate::config::LlmConfig;

lazy_static! {
    static ref RETRY_IN_RE: Regex = Regex::new(r"(?i)retry in ([0-9]+(?:\.[0-9]+)?)\s*s").unwrap();
    static ref RETRY_DELAY_RE: Regex = Regex::new(r#""retryDelay"\s*:\s*"([0-9]+(?:\.[0-9]+)?)s""#).unwrap();
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Single-attempt client for the `generateContent` endpoint.
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiBackend {
    pub fn from_config(cfg: &LlmConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(cfg.timeout()).build()?;
        Ok(Self {
            client,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

fn parse_seconds(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(Duration::from_secs_f64)
}

/// Retry hint from a 429: `Retry-After` header first, then the error body.
fn retry_hint(header: Option<&str>, body: &str) -> Option<Duration> {
    if let Some(d) = header.and_then(parse_seconds) {
        return Some(d);
    }
    RETRY_IN_RE
        .captures(body)
        .or_else(|| RETRY_DELAY_RE.captures(body))
        .and_then(|c| c.get(1))
        .and_then(|m| parse_seconds(m.as_str()))
}

/// First non-empty text part of the first candidate.
fn first_text(body: &str) -> Option<String> {
    let parsed: GenerateResponse = serde_json::from_str(body).ok()?;
    parsed
        .candidates?
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .find(|t| !t.trim().is_empty())
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    async fn complete(&self, prompt: &str) -> Result<String, UpstreamFailure> {
        let request = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [TextPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let res = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamFailure::Timeout
                } else {
                    warn!(error = %e.without_url(), "gemini transport error");
                    UpstreamFailure::Transport
                }
            })?;

        let status = res.status();
        let header_hint = res
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = res.text().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamFailure::Timeout
            } else {
                UpstreamFailure::Transport
            }
        })?;

        if !status.is_success() {
            let retry_after = (status.as_u16() == 429)
                .then(|| retry_hint(header_hint.as_deref(), &body))
                .flatten();
            debug!(status = status.as_u16(), model = %self.model, "gemini returned an error status");
            return Err(UpstreamFailure::from_status(status.as_u16(), retry_after));
        }

        first_text(&body).ok_or(UpstreamFailure::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{header, HeaderMap, StatusCode, Uri},
        response::{IntoResponse, Response},
        Json, Router,
    };
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn backend(base_url: String, api_key: &str) -> GeminiBackend {
        GeminiBackend::from_config(&LlmConfig {
            api_key: api_key.into(),
            model: "test-model".into(),
            base_url,
            timeout_secs: 1,
            max_attempts: 1,
            initial_backoff_ms: 1,
            rate_limit_delay_ms: 1,
            max_retry_delay_ms: 1,
        })
        .unwrap()
    }

    async fn echo(uri: Uri, headers: HeaderMap, Json(body): Json<Value>) -> Response {
        let key = headers.get("x-goog-api-key").and_then(|v| v.to_str().ok());
        if key != Some("test-key") {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        if uri.path() != "/models/test-model:generateContent"
            || body["contents"][0]["role"] != "user"
            || body["generationConfig"]["responseMimeType"] != "application/json"
        {
            return StatusCode::BAD_REQUEST.into_response();
        }
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();
        Json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": format!("echo: {prompt}")}]}}]
        }))
        .into_response()
    }

    async fn status_server(code: u16) -> String {
        serve(Router::new().fallback(move || async move {
            (StatusCode::from_u16(code).unwrap(), "upstream says no")
        }))
        .await
    }

    #[tokio::test]
    async fn sends_key_and_body_and_returns_text() {
        let url = serve(Router::new().fallback(echo)).await;
        let text = backend(url, "test-key").complete("plan please").await.unwrap();
        assert_eq!(text, "echo: plan please");
    }

    #[tokio::test]
    async fn wrong_key_is_an_auth_failure() {
        let url = serve(Router::new().fallback(echo)).await;
        let err = backend(url, "other-key").complete("p").await.unwrap_err();
        assert_eq!(err, UpstreamFailure::Auth(401));
    }

    #[tokio::test]
    async fn status_codes_map_to_failures() {
        for (code, expected) in [
            (403, UpstreamFailure::Auth(403)),
            (400, UpstreamFailure::Rejected(400)),
            (503, UpstreamFailure::Server(503)),
            (500, UpstreamFailure::Server(500)),
        ] {
            let url = status_server(code).await;
            let err = backend(url, "test-key").complete("p").await.unwrap_err();
            assert_eq!(err, expected, "status {code}");
        }
    }

    #[tokio::test]
    async fn rate_limit_reads_retry_after_header() {
        let url = serve(Router::new().fallback(|| async {
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, "7")],
                "slow down",
            )
        }))
        .await;
        let err = backend(url, "test-key").complete("p").await.unwrap_err();
        assert_eq!(
            err,
            UpstreamFailure::RateLimited {
                retry_after: Some(Duration::from_secs(7))
            }
        );
    }

    #[tokio::test]
    async fn rate_limit_reads_hint_from_body() {
        let url = serve(Router::new().fallback(|| async {
            (
                StatusCode::TOO_MANY_REQUESTS,
                r#"{"error":{"message":"Quota exceeded. Please retry in 2s."}}"#,
            )
        }))
        .await;
        let err = backend(url, "test-key").complete("p").await.unwrap_err();
        assert_eq!(
            err,
            UpstreamFailure::RateLimited {
                retry_after: Some(Duration::from_secs(2))
            }
        );
    }

    #[tokio::test]
    async fn success_without_text_is_malformed() {
        let url = serve(Router::new().fallback(|| async { Json(json!({"candidates": []})) })).await;
        let err = backend(url, "test-key").complete("p").await.unwrap_err();
        assert_eq!(err, UpstreamFailure::Malformed);
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let url = serve(Router::new().fallback(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            "too late"
        }))
        .await;
        let started = std::time::Instant::now();
        let err = backend(url, "test-key").complete("p").await.unwrap_err();
        assert_eq!(err, UpstreamFailure::Timeout);
        assert!(started.elapsed() < Duration::from_millis(2500));
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = backend(format!("http://{addr}"), "test-key")
            .complete("p")
            .await
            .unwrap_err();
        assert_eq!(err, UpstreamFailure::Transport);
    }

    #[test]
    fn request_body_shape() {
        let req = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [TextPart { text: "hi" }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["contents"][0]["role"], "user");
        assert_eq!(v["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn hint_prefers_header() {
        assert_eq!(
            retry_hint(Some("3"), "Please retry in 20s."),
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn hint_from_body() {
        assert_eq!(
            retry_hint(None, "Quota exceeded. Please retry in 12.5s."),
            Some(Duration::from_millis(12_500))
        );
        assert_eq!(
            retry_hint(None, r#"{"details":[{"retryDelay": "9s"}]}"#),
            Some(Duration::from_secs(9))
        );
        assert_eq!(retry_hint(Some("Wed, 21 Oct 2015 07:28:00 GMT"), "nothing"), None);
    }

    #[test]
    fn extracts_first_text_part() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":1}"}],"role":"model"}}]}"#;
        assert_eq!(first_text(body).as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn empty_candidates_are_malformed() {
        assert_eq!(first_text(r#"{"candidates":[]}"#), None);
        assert_eq!(first_text(r#"{"candidates":[{"content":{"parts":[]}}]}"#), None);
        assert_eq!(first_text("not json"), None);
    }

    #[test]
    fn url_has_model_and_method() {
        let backend = GeminiBackend {
            client: Client::new(),
            api_key: "k".into(),
            model: "gemini-1.5-flash".into(),
            base_url: "https://example.test/v1beta".into(),
        };
        assert_eq!(
            backend.url(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
