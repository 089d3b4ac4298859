//! HTTP client for the question-answering backend.

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Answer used when the server replies without any answer field
pub const NO_ANSWER: &str = "No answer.";

const ANSWER_FIELDS: &[&str] = &["answer", "result", "text"];

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Timeout, DNS failure, refused connection, unreadable body
    #[error("network error: {0}")]
    Transport(String),
    #[error("bad status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    /// Server answered but reported the operation as not ok
    #[error("{0}")]
    Rejected(String),
}

/// One uploaded document as listed by `/api/sources`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDoc {
    pub source_id: String,
    pub title: Option<String>,
    pub filename: Option<String>,
    pub chunks: u64,
}

impl SourceDoc {
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let source_id = match obj.get("sourceId") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let text = |key: &str| {
            obj.get(key)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Some(Self {
            source_id,
            title: text("title"),
            filename: text("filename"),
            chunks: obj.get("chunks").and_then(|v| v.as_u64()).unwrap_or(0),
        })
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }
}

/// Loose truthiness for `ok` flags: `true`, non-zero numbers, non-empty strings, containers
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// First non-empty string among the tolerated answer fields
pub fn extract_answer(value: &Value) -> String {
    let Some(obj) = value.as_object() else {
        return NO_ANSWER.to_string();
    };
    ANSWER_FIELDS
        .iter()
        .filter_map(|key| obj.get(*key).and_then(|v| v.as_str()))
        .find(|s| !s.is_empty())
        .unwrap_or(NO_ANSWER)
        .to_string()
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// `GET /api/health`; healthy only on a success status with a truthy `ok`
    pub fn health(&self) -> Result<bool, ApiError> {
        let request = self
            .client
            .get(self.endpoint("/api/health"))
            .header("Cache-Control", "no-cache");
        let (status, body) = send(request)?;
        if !is_success(status) {
            return Ok(false);
        }
        Ok(serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("ok").map(is_truthy))
            .unwrap_or(false))
    }

    /// `POST /api/ask` with `{ "query": ... }`
    pub fn ask(&self, query: &str) -> Result<String, ApiError> {
        let request = self
            .client
            .post(self.endpoint("/api/ask"))
            .json(&serde_json::json!({ "query": query }));
        let (status, body) = send(request)?;
        if !is_success(status) {
            return Err(ApiError::Status { status, body });
        }
        let value = parse_json(&body)?;
        Ok(extract_answer(&value))
    }

    /// `POST /api/upload`; the parsed body is returned whatever the status
    pub fn upload(
        &self,
        title: &str,
        langs: &str,
        filename: &str,
        document: Vec<u8>,
    ) -> Result<Value, ApiError> {
        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        let file_part = Part::bytes(document)
            .file_name(filename.to_string())
            .mime_str(mime.as_ref())
            .map_err(|e| ApiError::Transport(format!("MIME error: {e}")))?;
        let form = Form::new()
            .text("title", title.to_string())
            .text("langs", langs.to_string())
            .part("document", file_part);

        let request = self.client.post(self.endpoint("/api/upload")).multipart(form);
        let (_, body) = send(request)?;
        parse_json(&body)
    }

    /// `GET /api/sources`
    pub fn list_sources(&self) -> Result<Vec<SourceDoc>, ApiError> {
        let (status, body) = send(self.client.get(self.endpoint("/api/sources")))?;
        if !is_success(status) {
            return Err(ApiError::Status { status, body });
        }
        let value = parse_json(&body)?;
        let Some(items) = value.as_array() else {
            return Err(ApiError::Malformed("bad response".to_string()));
        };
        items
            .iter()
            .map(|item| {
                SourceDoc::from_value(item)
                    .ok_or_else(|| ApiError::Malformed("bad response".to_string()))
            })
            .collect()
    }

    /// `DELETE /api/source/:id` authorized by `x-admin-secret`
    pub fn delete_source(&self, source_id: &str, secret: &str) -> Result<Value, ApiError> {
        let path = format!("/api/source/{}", urlencoding::encode(source_id));
        let request = self
            .client
            .delete(self.endpoint(&path))
            .header("x-admin-secret", secret);
        let (status, body) = send(request)?;
        let value = match serde_json::from_str::<Value>(&body) {
            Ok(value) => value,
            Err(_) if !is_success(status) => return Err(ApiError::Status { status, body }),
            Err(e) => return Err(ApiError::Malformed(e.to_string())),
        };
        let ok = value.get("ok").map(is_truthy).unwrap_or(false);
        if !is_success(status) || !ok {
            return Err(ApiError::Rejected(value.to_string()));
        }
        Ok(value)
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn parse_json(body: &str) -> Result<Value, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Malformed(e.to_string()))
}

/// Send and read the whole body; only transport problems are errors here
fn send(request: RequestBuilder) -> Result<(u16, String), ApiError> {
    let response = request
        .send()
        .map_err(|e| ApiError::Transport(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response
        .text()
        .map_err(|e| ApiError::Transport(e.to_string()))?;
    Ok((status, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{StubReply, StubServer};
    use serde_json::json;

    fn client(server: &StubServer) -> ApiClient {
        ApiClient::new(&server.url(), Duration::from_secs(5))
    }

    #[test]
    fn answer_falls_back_through_alternate_fields() {
        assert_eq!(extract_answer(&json!({ "answer": "A" })), "A");
        assert_eq!(extract_answer(&json!({ "result": "R", "text": "T" })), "R");
        assert_eq!(extract_answer(&json!({ "answer": "", "text": "T" })), "T");
        assert_eq!(extract_answer(&json!({ "answer": 42 })), NO_ANSWER);
        assert_eq!(extract_answer(&json!(["answer"])), NO_ANSWER);
    }

    #[test]
    fn truthiness_matches_loose_flags() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("yes")));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&Value::Null));
    }

    #[test]
    fn health_requires_success_and_ok_flag() {
        let server = StubServer::start(|req| match req.path.as_str() {
            "/api/health" => StubReply::json(200, r#"{"ok":true}"#),
            _ => StubReply::json(404, "{}"),
        });
        assert!(client(&server).health().unwrap());
        let requests = server.requests();
        let check = &requests[0];
        assert_eq!(check.method, "GET");
        assert_eq!(check.header("cache-control"), Some("no-cache"));

        let unhealthy = StubServer::start(|_| StubReply::json(200, r#"{"ok":false}"#));
        assert!(!client(&unhealthy).health().unwrap());

        let failing = StubServer::start(|_| StubReply::json(503, r#"{"ok":true}"#));
        assert!(!client(&failing).health().unwrap());

        let html = StubServer::start(|_| StubReply::text(200, "<html>ok</html>"));
        assert!(!client(&html).health().unwrap());
    }

    #[test]
    fn ask_posts_query_and_reads_answer() {
        let server = StubServer::start(|_| StubReply::json(200, r#"{"answer":"Colonoscopy in 1 year."}"#));
        let answer = client(&server).ask("What is the recommended follow-up?").unwrap();
        assert_eq!(answer, "Colonoscopy in 1 year.");

        let requests = server.requests();
        let req = &requests[0];
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/api/ask");
        let sent: Value = serde_json::from_slice(&req.body).unwrap();
        assert_eq!(sent, json!({ "query": "What is the recommended follow-up?" }));
    }

    #[test]
    fn ask_surfaces_status_and_malformed_bodies() {
        let server = StubServer::start(|_| StubReply::json(500, r#"{"error":"boom"}"#));
        match client(&server).ask("q") {
            Err(ApiError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.contains("boom"));
            }
            other => panic!("unexpected: {other:?}"),
        }

        let server = StubServer::start(|_| StubReply::text(200, "not json"));
        assert!(matches!(client(&server).ask("q"), Err(ApiError::Malformed(_))));
    }

    #[test]
    fn transport_failure_is_reported() {
        let client = ApiClient::new("http://127.0.0.1:1", Duration::from_secs(2));
        assert!(matches!(client.ask("q"), Err(ApiError::Transport(_))));
    }

    #[test]
    fn list_sources_tolerates_missing_fields() {
        let server = StubServer::start(|_| {
            StubReply::json(
                200,
                r#"[{"sourceId":"abc","title":"Guide","filename":"g.pdf","chunks":12},{"sourceId":7}]"#,
            )
        });
        let docs = client(&server).list_sources().unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].source_id, "abc");
        assert_eq!(docs[0].chunks, 12);
        assert_eq!(docs[1].source_id, "7");
        assert_eq!(docs[1].display_title(), "Untitled");
        assert_eq!(docs[1].filename, None);
        assert_eq!(docs[1].chunks, 0);
    }

    #[test]
    fn list_sources_rejects_non_array() {
        let server = StubServer::start(|_| StubReply::json(200, r#"{"sources":[]}"#));
        match client(&server).list_sources() {
            Err(ApiError::Malformed(msg)) => assert_eq!(msg, "bad response"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn delete_encodes_id_and_sends_secret() {
        let server = StubServer::start(|_| StubReply::json(200, r#"{"ok":true}"#));
        client(&server).delete_source("a b/c", "s3cret").unwrap();
        let requests = server.requests();
        let req = &requests[0];
        assert_eq!(req.method, "DELETE");
        assert_eq!(req.path, "/api/source/a%20b%2Fc");
        assert_eq!(req.header("x-admin-secret"), Some("s3cret"));
    }

    #[test]
    fn delete_not_ok_is_rejected_with_raw_body() {
        let server = StubServer::start(|_| StubReply::json(403, r#"{"ok":false,"error":"forbidden"}"#));
        match client(&server).delete_source("abc", "wrong") {
            Err(ApiError::Rejected(raw)) => assert!(raw.contains("forbidden")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn upload_returns_body_even_on_error_status() {
        let server = StubServer::start(|_| StubReply::json(400, r#"{"error":"unsupported file"}"#));
        let value = client(&server)
            .upload("Guide", "eng", "guide.exe", b"MZ".to_vec())
            .unwrap();
        assert_eq!(value["error"], "unsupported file");

        let requests = server.requests();
        let req = &requests[0];
        assert_eq!(req.path, "/api/upload");
        assert!(req.header("content-type").unwrap().starts_with("multipart/form-data; boundary="));
        let body = String::from_utf8_lossy(&req.body);
        assert!(body.contains("name=\"langs\"\r\n\r\neng\r\n"));
        assert!(body.contains("filename=\"guide.exe\""));
    }

    #[test]
    fn upload_labels_document_with_guessed_mime_type() {
        let server = StubServer::start(|_| StubReply::json(200, r#"{"ok":true}"#));
        client(&server)
            .upload("Polyps", "eng,spa", "polyps.pdf", b"%PDF-1.4".to_vec())
            .unwrap();

        let requests = server.requests();
        let body = String::from_utf8_lossy(&requests[0].body).into_owned();
        assert!(body.contains("name=\"title\"\r\n\r\nPolyps\r\n"));
        assert!(body.contains("name=\"langs\"\r\n\r\neng,spa\r\n"));
        assert!(body.contains(
            "name=\"document\"; filename=\"polyps.pdf\"\r\nContent-Type: application/pdf\r\n\r\n%PDF-1.4"
        ));
    }
}
