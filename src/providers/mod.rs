//! External providers
//!
//! The analysis and plan generators talk to a remote model endpoint that
//! returns structured JSON. Transport lives here behind the `JsonCompletion`
//! trait; prompt construction and response validation live in the per-domain
//! modules.

pub mod analysis;
pub mod plan;

use std::path::Path;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};

use crate::error::{ReportError, ReportResult};

pub use analysis::AnalysisProvider;
pub use plan::{MealPlanRequest, PlanProvider, WorkoutPlanRequest};

/// Endpoint configuration, read from the environment at startup
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

impl ProviderConfig {
    pub fn from_env() -> ReportResult<Self> {
        let api_url = std::env::var("LABSENSE_API_URL")
            .map_err(|_| ReportError::Provider("LABSENSE_API_URL is not set".to_string()))?;
        let api_key = std::env::var("LABSENSE_API_KEY")
            .map_err(|_| ReportError::Provider("LABSENSE_API_KEY is not set".to_string()))?;
        let model =
            std::env::var("LABSENSE_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());

        Ok(ProviderConfig {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }
}

/// A lab-report file inlined into the provider request
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub data_base64: String,
}

/// Read a file from disk and inline it as a base64 attachment. The mime type
/// comes from the extension; unknown extensions go out as octet-stream.
pub fn load_attachment(path: &Path) -> ReportResult<Attachment> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());

    let mime_type = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
    .to_string();

    Ok(Attachment {
        file_name,
        mime_type,
        data_base64: BASE64.encode(&bytes),
    })
}

/// One structured-output request: a prompt plus inline attachments
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub attachments: Vec<Attachment>,
}

impl CompletionRequest {
    pub fn text(prompt: String) -> Self {
        CompletionRequest {
            prompt,
            attachments: Vec::new(),
        }
    }
}

/// Transport for JSON-mode completions. One call, one parsed JSON value.
#[async_trait]
pub trait JsonCompletion: Send + Sync {
    async fn complete_json(&self, request: CompletionRequest) -> ReportResult<Value>;
}

/// HTTP backend against a generateContent-style endpoint
pub struct HttpBackend {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl HttpBackend {
    pub fn new(config: ProviderConfig) -> ReportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ReportError::Provider(e.to_string()))?;
        Ok(HttpBackend { client, config })
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        let mut parts = vec![json!({ "text": request.prompt })];
        for attachment in &request.attachments {
            parts.push(json!({
                "inline_data": {
                    "mime_type": attachment.mime_type,
                    "data": attachment.data_base64,
                }
            }));
        }
        json!({
            "contents": [{ "parts": parts }],
            "generationConfig": { "responseMimeType": "application/json" },
        })
    }
}

#[async_trait]
impl JsonCompletion for HttpBackend {
    async fn complete_json(&self, request: CompletionRequest) -> ReportResult<Value> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.api_url, self.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&self.request_body(&request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReportError::Provider("request timed out".to_string())
                } else {
                    ReportError::Provider(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Provider(format!(
                "endpoint returned {status}: {body}"
            )));
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| ReportError::Provider(format!("unreadable response: {e}")))?;

        let text = envelope["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| ReportError::Provider("response carries no text part".to_string()))?;

        serde_json::from_str(text)
            .map_err(|e| ReportError::Provider(format!("response is not valid JSON: {e}")))
    }
}

/// Canned backend for tests
pub struct MockBackend {
    response: Value,
    fail_with: Option<String>,
}

impl MockBackend {
    pub fn new(response: Value) -> Self {
        MockBackend {
            response,
            fail_with: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        MockBackend {
            response: Value::Null,
            fail_with: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl JsonCompletion for MockBackend {
    async fn complete_json(&self, _request: CompletionRequest) -> ReportResult<Value> {
        match &self.fail_with {
            Some(message) => Err(ReportError::Provider(message.clone())),
            None => Ok(self.response.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_mime_from_extension() {
        let dir = std::env::temp_dir().join("labsense_attach");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.pdf");
        std::fs::write(&path, b"%PDF-1.4 fake").unwrap();

        let attachment = load_attachment(&path).unwrap();
        assert_eq!(attachment.file_name, "report.pdf");
        assert_eq!(attachment.mime_type, "application/pdf");
        assert_eq!(
            BASE64.decode(&attachment.data_base64).unwrap(),
            b"%PDF-1.4 fake"
        );
    }

    #[test]
    fn test_attachment_unknown_extension_is_octet_stream() {
        let dir = std::env::temp_dir().join("labsense_attach");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.xyz");
        std::fs::write(&path, b"data").unwrap();

        assert_eq!(
            load_attachment(&path).unwrap().mime_type,
            "application/octet-stream"
        );
    }

    #[test]
    fn test_request_body_inlines_attachments() {
        let backend = HttpBackend {
            client: reqwest::Client::new(),
            config: ProviderConfig {
                api_url: "https://example.invalid/v1".to_string(),
                api_key: "k".to_string(),
                model: "m".to_string(),
            },
        };
        let request = CompletionRequest {
            prompt: "analyze".to_string(),
            attachments: vec![Attachment {
                file_name: "labs.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                data_base64: "QUJD".to_string(),
            }],
        };

        let body = backend.request_body(&request);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "analyze");
        assert_eq!(
            body["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "application/pdf"
        );
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_mock_backend_round_trip() {
        let backend = MockBackend::new(serde_json::json!({ "ok": true }));
        let value = backend
            .complete_json(CompletionRequest::text("hi".to_string()))
            .await
            .unwrap();
        assert_eq!(value["ok"], true);

        let failing = MockBackend::failing("boom");
        assert!(failing
            .complete_json(CompletionRequest::text("hi".to_string()))
            .await
            .is_err());
    }
}
