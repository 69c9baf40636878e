/// Model Client — the single point of entry for all Gemini API calls.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// All model interactions MUST go through this module.
///
/// Failure is returned as data: transport and parse failures become an error
/// marker object (`{"error": ...}`), never a raised fault. The only path that
/// returns `Err` internally is `call`; `query` always yields a `Value`.
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, warn};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// The model used for all calls. Intentionally hardcoded to prevent drift.
pub const MODEL: &str = "gemini-1.5-flash-002";
const REQUEST_TIMEOUT_SECS: u64 = 120;

pub const KIND_IMAGE: &str = "image";
pub const KIND_TEXT: &str = "text";

/// Marker returned when the model's text cannot be parsed as JSON.
pub const JSON_DECODE_ERROR: &str = "JSON decoding error";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("model returned empty content")]
    EmptyContent,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
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

impl GeminiResponse {
    /// Extracts the first candidate's first content part's text.
    fn text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .and_then(|p| p.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// Seam for the orchestrator: anything that can answer a payload + instruction
/// query. Production uses `LlmClient`; tests substitute a recording fake.
#[async_trait]
pub trait ModelQuery: Send + Sync {
    async fn query(&self, payload: &Value, instruction: &str, kind: &str) -> Value;
}

/// The single model client used by all services.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    /// Well-known path overwritten with every successfully parsed response.
    result_path: PathBuf,
}

impl LlmClient {
    pub fn new(api_key: String, result_path: PathBuf) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            result_path,
        }
    }

    /// Makes a raw `generateContent` call and returns the response text.
    /// JSON output is requested via `responseMimeType`; single attempt, the
    /// only timeout is the transport client's.
    async fn call(&self, parts: Vec<Value>) -> Result<String, LlmError> {
        let request_body = json!({
            "contents": [
                {
                    "role": "user",
                    "parts": parts
                }
            ],
            "generationConfig": {
                "temperature": 0.2,
                "responseMimeType": "application/json"
            }
        });

        let endpoint = format!(
            "{GEMINI_API_BASE}/{MODEL}:generateContent?key={}",
            self.api_key
        );

        let response = self.client.post(endpoint).json(&request_body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Surface the API's own message when the body parses as one.
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let text = gemini_response.text().ok_or(LlmError::EmptyContent)?;

        debug!(chars = text.len(), "Model call succeeded");
        Ok(text.to_string())
    }

    async fn query_image(&self, payload: &Value, instruction: &str) -> Value {
        let Some(path) = payload.as_str() else {
            return error_marker("image payload must be a file path");
        };

        let parts = match image_parts(Path::new(path), instruction) {
            Ok(parts) => parts,
            Err(e) => {
                error!(path, error = %e, "Failed to load page image");
                return error_marker(&e.to_string());
            }
        };

        self.dispatch(parts).await
    }

    async fn query_text(&self, payload: &Value, instruction: &str) -> Value {
        let serialized = serde_json::to_string_pretty(payload).unwrap_or_default();
        let parts = vec![json!({"text": instruction}), json!({"text": serialized})];
        self.dispatch(parts).await
    }

    async fn dispatch(&self, parts: Vec<Value>) -> Value {
        let outcome = self.call(parts).await;
        self.finish_call(outcome)
    }

    /// Maps a call outcome onto the query contract: parsed structure, error
    /// marker, or null when the model returned no content at all.
    fn finish_call(&self, outcome: Result<String, LlmError>) -> Value {
        match outcome {
            Ok(text) => self.parse_model_text(&text),
            Err(LlmError::EmptyContent) => {
                warn!("Model response contained no text content");
                Value::Null
            }
            Err(e) => {
                error!(error = %e, "Model call failed");
                error_marker(&e.to_string())
            }
        }
    }

    /// Parses model output text as JSON, stripping markdown fences first as a
    /// compatibility shim for models that ignore the JSON response mime type.
    /// On success the parsed value is persisted to the result path
    /// (best-effort, overwriting the previous one).
    fn parse_model_text(&self, text: &str) -> Value {
        let cleaned = strip_json_fences(text);
        match serde_json::from_str::<Value>(cleaned) {
            Ok(parsed) => {
                self.persist_result(&parsed);
                parsed
            }
            Err(e) => {
                error!(error = %e, "Failed to decode JSON from model response");
                error_marker(JSON_DECODE_ERROR)
            }
        }
    }

    fn persist_result(&self, parsed: &Value) {
        let pretty = serde_json::to_string_pretty(parsed).unwrap_or_default();
        if let Err(e) = fs::write(&self.result_path, pretty) {
            warn!(
                path = %self.result_path.display(),
                error = %e,
                "Failed to persist model result"
            );
        }
    }
}

#[async_trait]
impl ModelQuery for LlmClient {
    /// `kind` selects the payload mode: `"image"` (payload is a page image
    /// path) or `"text"` (payload is serialized JSON). Any other kind is a
    /// silent no-op: a warning is logged and an empty result returned.
    async fn query(&self, payload: &Value, instruction: &str, kind: &str) -> Value {
        match kind {
            KIND_IMAGE => self.query_image(payload, instruction).await,
            KIND_TEXT => self.query_text(payload, instruction).await,
            other => {
                warn!(kind = other, "Unsupported query kind; skipping");
                Value::Null
            }
        }
    }
}

/// Builds the instruction + inline-JPEG parts for an image query.
fn image_parts(path: &Path, instruction: &str) -> Result<Vec<Value>, LlmError> {
    let bytes = fs::read(path).map_err(|source| LlmError::ImageRead {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(vec![
        json!({"text": instruction}),
        json!({
            "inlineData": {
                "mimeType": "image/jpeg",
                "data": BASE64.encode(bytes)
            }
        }),
    ])
}

pub fn error_marker(reason: &str) -> Value {
    json!({ "error": reason })
}

/// True when the value is an error marker rather than a real result.
pub fn is_error_marker(value: &Value) -> bool {
    value.get("error").is_some()
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(dir: &tempfile::TempDir) -> LlmClient {
        LlmClient::new("test-key".to_string(), dir.path().join("result.json"))
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_preserves_json_inside_content() {
        // The literal word "json" inside actual content must survive.
        let input = r#"{"note": "emit json here"}"#;
        assert_eq!(strip_json_fences(input), input);
    }

    #[tokio::test]
    async fn test_bogus_kind_returns_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(&dir);

        let result = client.query(&json!({}), "irrelevant", "bogus").await;
        assert_eq!(result, Value::Null);
        assert!(!is_error_marker(&result));
    }

    #[test]
    fn test_invalid_json_yields_exact_decode_marker() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(&dir);

        let result = client.parse_model_text("definitely not json");
        assert_eq!(result, json!({"error": "JSON decoding error"}));
    }

    #[test]
    fn test_valid_json_is_returned_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(&dir);

        let result = client.parse_model_text("{\"a\": 1}");
        assert_eq!(result, json!({"a": 1}));

        let persisted = fs::read_to_string(dir.path().join("result.json")).unwrap();
        let persisted: Value = serde_json::from_str(&persisted).unwrap();
        assert_eq!(persisted, json!({"a": 1}));
    }

    #[test]
    fn test_persisted_result_overwrites_previous() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(&dir);

        client.parse_model_text("{\"a\": 1}");
        client.parse_model_text("{\"b\": 2}");

        let persisted = fs::read_to_string(dir.path().join("result.json")).unwrap();
        let persisted: Value = serde_json::from_str(&persisted).unwrap();
        assert_eq!(persisted, json!({"b": 2}));
    }

    #[test]
    fn test_fenced_json_parses_after_stripping() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(&dir);

        let result = client.parse_model_text("```json\n{\"score\": 42}\n```");
        assert_eq!(result, json!({"score": 42}));
    }

    #[test]
    fn test_empty_model_content_yields_null_not_error_marker() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(&dir);

        let result = client.finish_call(Err(LlmError::EmptyContent));
        assert_eq!(result, Value::Null);
        assert!(!is_error_marker(&result));
    }

    #[test]
    fn test_transport_error_yields_error_marker_with_message() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(&dir);

        let result = client.finish_call(Err(LlmError::Api {
            status: 500,
            message: "boom".to_string(),
        }));
        assert_eq!(result, json!({"error": "API error (status 500): boom"}));
    }

    #[test]
    fn test_successful_call_outcome_flows_through_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(&dir);

        let result = client.finish_call(Ok("{\"a\": 1}".to_string()));
        assert_eq!(result, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_image_query_with_missing_file_returns_error_marker() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(&dir);

        let payload = json!(dir.path().join("missing.jpg").display().to_string());
        let result = client.query(&payload, "extract", KIND_IMAGE).await;
        assert!(is_error_marker(&result));
    }

    #[tokio::test]
    async fn test_image_query_with_non_string_payload_returns_error_marker() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(&dir);

        let result = client.query(&json!([1, 2, 3]), "extract", KIND_IMAGE).await;
        assert!(is_error_marker(&result));
    }

    #[test]
    fn test_image_parts_shape() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("page_1.jpg");
        fs::write(&img, b"\xff\xd8\xff").unwrap();

        let parts = image_parts(&img, "extract text").unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["text"], "extract text");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert!(parts[1]["inlineData"]["data"].is_string());
    }

    #[test]
    fn test_gemini_response_text_extraction() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "{\"a\": 1}"}]}}
            ]
        }"#;
        let response: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.text(), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_gemini_response_without_candidates_has_no_text() {
        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.text(), None);
    }
}
