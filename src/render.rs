//! Output rendering: escaped HTML documents and terminal-safe text.

use maud::{DOCTYPE, Markup, html};
use time::format_description;

use crate::admin::SourceListing;
use crate::api::SourceDoc;
use crate::chat::{Message, Transcript};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 760px; margin: 2rem auto; color: #1f2933; }
.bubble { padding: .6rem .9rem; border-radius: 10px; margin: .4rem 0; white-space: pre-wrap; }
.bubble.user { background: #dbeafe; margin-left: 20%; }
.bubble.bot { background: #f1f5f9; margin-right: 20%; }
.bubble time { display: block; font-size: .75rem; color: #64748b; }
.doc-row { border-bottom: 1px solid #e2e8f0; padding: .5rem 0; }
.doc-title { font-weight: 600; }
.doc-meta, .muted { color: #64748b; font-size: .9rem; }
.error { color: #b91c1c; }
"#;

/// Drop control characters (ANSI escapes included) from server or user text
pub fn sanitize_terminal(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

fn page(title: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (title) }
                style { (maud::PreEscaped(STYLE)) }
            }
            body { (body) }
        }
    }
    .into_string()
}

fn clock(message: &Message) -> String {
    format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second] UTC")
        .ok()
        .and_then(|format| message.at.format(&format).ok())
        .unwrap_or_default()
}

/// Standalone HTML page of the transcript
pub fn transcript_html(transcript: &Transcript) -> String {
    page(
        "Guidebot transcript",
        html! {
            div.chat {
                @if transcript.is_empty() {
                    div.muted { "No messages." }
                }
                @for message in transcript.messages() {
                    div class={ "bubble " (message.role.as_str()) } {
                        time { (clock(message)) }
                        (message.text)
                    }
                }
            }
        },
    )
}

/// Transcript as pretty JSON: `{ "messages": [{ "role", "text", "at" }] }`
pub fn transcript_json(transcript: &Transcript) -> serde_json::Result<String> {
    serde_json::to_string_pretty(transcript)
}

fn doc_row(doc: &SourceDoc) -> Markup {
    html! {
        div.doc-row {
            div.doc-title { (doc.display_title()) }
            div.doc-meta {
                code { (doc.source_id) }
                " • " (doc.filename.as_deref().unwrap_or(""))
                " • chunks: " (doc.chunks)
            }
        }
    }
}

/// Standalone HTML page of the document listing
pub fn sources_html(listing: &SourceListing) -> String {
    page(
        "Guidebot sources",
        html! {
            div.list {
                @match listing {
                    SourceListing::Empty => {
                        div.muted { "No guidelines uploaded yet." }
                    }
                    SourceListing::Failed(reason) => {
                        div.error { "Failed to load list. " (reason) }
                    }
                    SourceListing::Entries(docs) => {
                        @for doc in docs { (doc_row(doc)) }
                    }
                }
            }
        },
    )
}

/// One document as two terminal lines
pub fn source_text(doc: &SourceDoc) -> String {
    format!(
        "{}\n  {} • {} • chunks: {}",
        sanitize_terminal(doc.display_title()),
        sanitize_terminal(&doc.source_id),
        sanitize_terminal(doc.filename.as_deref().unwrap_or("")),
        doc.chunks
    )
}

pub fn listing_text(listing: &SourceListing) -> String {
    match listing {
        SourceListing::Empty => "No guidelines uploaded yet.".to_string(),
        SourceListing::Failed(reason) => {
            format!("Failed to load list. {}", sanitize_terminal(reason))
        }
        SourceListing::Entries(docs) => docs
            .iter()
            .map(source_text)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
