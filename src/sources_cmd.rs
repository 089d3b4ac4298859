//! Source document management command implementation.

use anyhow::{Context, Result};
use dialoguer::{Confirm, Select, theme::ColorfulTheme};
use std::fs;
use std::path::PathBuf;

use guidebot::admin::{self, DeleteOutcome, Operator, SourceListing};
use guidebot::render::{self, sanitize_terminal};
use guidebot::{ADMIN_SECRET_KEY, ApiClient, LocalStore, SourceDoc};

use crate::{Session, SourcesAction};

/// Operator backed by terminal prompts
pub struct TerminalOperator;

impl Operator for TerminalOperator {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        Ok(confirmed)
    }

    fn notify(&self, message: &str) {
        eprintln!("{}", sanitize_terminal(message));
    }
}

pub fn run(session: &mut Session, action: Option<SourcesAction>) -> Result<()> {
    match action {
        Some(SourcesAction::List { json, html }) => list(&session.api(), json, html),
        Some(SourcesAction::Delete { id }) => delete(session, &id),
        None => {
            let secret = session.store.get(ADMIN_SECRET_KEY);
            interactive(&session.api(), secret.as_deref())
        }
    }
}

fn list(api: &ApiClient, json: bool, html: Option<PathBuf>) -> Result<()> {
    let listing = admin::list_sources(api);

    if let Some(path) = html {
        fs::write(&path, render::sources_html(&listing))
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    if json {
        let docs: &[SourceDoc] = match &listing {
            SourceListing::Entries(docs) => docs.as_slice(),
            SourceListing::Empty => &[],
            // Same exit status as the text listing; the reason goes to stderr.
            SourceListing::Failed(_) => {
                eprintln!("{}", render::listing_text(&listing));
                return Ok(());
            }
        };
        println!("{}", serde_json::to_string_pretty(docs)?);
        return Ok(());
    }

    println!("{}", render::listing_text(&listing));
    Ok(())
}

fn delete(session: &mut Session, id: &str) -> Result<()> {
    let secret = session.store.get(ADMIN_SECRET_KEY);
    let outcome =
        admin::delete_source(|| session.api(), secret.as_deref(), &TerminalOperator, id)?;
    if let DeleteOutcome::Deleted(listing) = outcome {
        println!("Deleted {}.", sanitize_terminal(id));
        println!("{}", render::listing_text(&listing));
    }
    Ok(())
}

/// Interactive picker for browsing and deleting documents
fn interactive(api: &ApiClient, secret: Option<&str>) -> Result<()> {
    let theme = ColorfulTheme::default();

    loop {
        println!("Loading…");
        let docs = match admin::list_sources(api) {
            SourceListing::Entries(docs) => docs,
            listing => {
                println!("{}", render::listing_text(&listing));
                return Ok(());
            }
        };

        let mut items: Vec<String> = docs
            .iter()
            .map(|d| {
                format!(
                    "{} [{}] {} ({} chunks)",
                    sanitize_terminal(d.display_title()),
                    sanitize_terminal(&d.source_id),
                    sanitize_terminal(d.filename.as_deref().unwrap_or("")),
                    d.chunks
                )
            })
            .collect();
        items.push("Refresh".to_string());
        items.push("Exit".to_string());

        let selection = Select::with_theme(&theme)
            .with_prompt("Select a guideline to manage")
            .items(&items)
            .default(0)
            .interact()?;

        if selection == docs.len() {
            continue;
        }
        if selection > docs.len() {
            break;
        }

        let doc = &docs[selection];
        println!("\n{}\n", render::source_text(doc));

        let actions = ["Delete", "Back"];
        let action = Select::with_theme(&theme)
            .with_prompt("Action")
            .items(&actions)
            .default(1)
            .interact()?;

        if action == 0 {
            let connect = || api.clone();
            match admin::delete_source(connect, secret, &TerminalOperator, &doc.source_id)? {
                DeleteOutcome::Deleted(_) => println!("Deleted."),
                DeleteOutcome::MissingSecret => return Ok(()),
                DeleteOutcome::Cancelled | DeleteOutcome::Failed(_) => {}
            }
        }
    }

    Ok(())
}
