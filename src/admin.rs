//! Admin operations: upload, list and delete source documents.

use anyhow::Result;
use log::warn;
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;

use crate::api::{ApiClient, SourceDoc};

pub const MISSING_SECRET_MESSAGE: &str =
    "Admin secret not set. Save it with `guidebot connection set --admin-secret` first.";

pub const DELETE_CONFIRM_PROMPT: &str = "Delete this guideline and its chunks?";

/// Interactive operator decisions and notices
pub trait Operator {
    fn confirm(&self, prompt: &str) -> Result<bool>;
    fn notify(&self, message: &str);
}

#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub title: String,
    pub langs: String,
    pub document: Option<PathBuf>,
}

/// Validate locally, upload, and return the JSON to show the operator verbatim.
///
/// `connect` is only called once the file and title check out, so a bad
/// request never reaches the network (not even for endpoint discovery).
pub fn upload(
    connect: impl FnOnce() -> ApiClient,
    request: &UploadRequest,
    default_langs: &str,
) -> Value {
    let Some(path) = &request.document else {
        return json!({ "error": "No file chosen" });
    };
    let title = request.title.trim();
    if title.is_empty() {
        return json!({ "error": "Missing title" });
    }
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) => {
            return json!({
                "error": "Cannot read file",
                "detail": format!("{}: {e}", path.display()),
            });
        }
    };
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let langs = match request.langs.trim() {
        "" => default_langs,
        langs => langs,
    };

    let api = connect();
    match api.upload(title, langs, &filename, content) {
        Ok(value) => value,
        Err(e) => {
            warn!("upload to {} failed: {e}", api.base());
            json!({ "error": "Network error", "detail": e.to_string() })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceListing {
    Empty,
    Entries(Vec<SourceDoc>),
    Failed(String),
}

pub fn list_sources(api: &ApiClient) -> SourceListing {
    match api.list_sources() {
        Ok(docs) if docs.is_empty() => SourceListing::Empty,
        Ok(docs) => SourceListing::Entries(docs),
        Err(e) => {
            warn!("listing sources failed: {e}");
            SourceListing::Failed(e.to_string())
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    MissingSecret,
    Cancelled,
    Failed(String),
    /// Deleted; carries the refreshed listing
    Deleted(SourceListing),
}

/// Delete one document after checking the saved secret and asking the operator.
/// Nothing touches the network before both checks pass.
pub fn delete_source(
    connect: impl FnOnce() -> ApiClient,
    secret: Option<&str>,
    operator: &dyn Operator,
    source_id: &str,
) -> Result<DeleteOutcome> {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        operator.notify(MISSING_SECRET_MESSAGE);
        return Ok(DeleteOutcome::MissingSecret);
    };
    if !operator.confirm(DELETE_CONFIRM_PROMPT)? {
        return Ok(DeleteOutcome::Cancelled);
    }

    let api = connect();
    match api.delete_source(source_id, secret) {
        Ok(_) => Ok(DeleteOutcome::Deleted(list_sources(&api))),
        Err(e) => {
            let message = format!("Delete failed: {e}");
            operator.notify(&message);
            Ok(DeleteOutcome::Failed(message))
        }
    }
}
