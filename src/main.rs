use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use guidebot::admin::{self, UploadRequest};
use guidebot::render::{self, sanitize_terminal};
use guidebot::{
    ADMIN_SECRET_KEY, API_BASE_KEY, ApiClient, ChatController, Config, FileStore, HttpProbe,
    LocalStore, Resolver,
};

mod sources_cmd;

#[derive(Parser)]
#[command(name = "guidebot", version, about = "Guideline question-answering client")]
struct Cli {
    /// Declared default API base, tried after the saved override
    #[arg(long, global = true)]
    default_api_base: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat; type /quit or press Ctrl-D to leave
    #[command(name = "chat")]
    Chat {
        /// Write the transcript on exit (JSON for a .json path, HTML otherwise)
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Ask a single question
    #[command(name = "ask")]
    Ask {
        #[arg(required = true)]
        question: Vec<String>,
    },

    /// Upload a source document
    #[command(name = "upload")]
    Upload {
        #[arg(long, default_value = "")]
        title: String,
        /// Language tags (default from config, usually "eng")
        #[arg(long, default_value = "")]
        langs: String,
        file: Option<PathBuf>,
    },

    /// Manage uploaded source documents
    #[command(name = "sources")]
    Sources {
        #[command(subcommand)]
        action: Option<SourcesAction>,
    },

    /// View or change the saved API base and admin secret
    #[command(name = "connection")]
    Connection {
        #[command(subcommand)]
        action: Option<ConnectionAction>,
    },

    /// Print the API base in use
    #[command(name = "resolve")]
    Resolve,

    /// Check that the API base in use is healthy
    #[command(name = "health")]
    Health,

    /// View or modify config ($GUIDEBOT_HOME/config.toml)
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum SourcesAction {
    /// List uploaded documents
    List {
        #[arg(long)]
        json: bool,
        /// Write the listing as an HTML page instead
        #[arg(long, conflicts_with = "json")]
        html: Option<PathBuf>,
    },
    /// Delete a document and its chunks
    Delete { id: String },
}

#[derive(Subcommand)]
enum ConnectionAction {
    /// Show connection settings
    Show,
    /// Save connection settings
    Set {
        #[arg(long)]
        api_base: Option<String>,
        #[arg(long)]
        admin_secret: Option<String>,
    },
    /// Forget the saved API base and admin secret
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current config
    Show,
    /// Set a config value
    Set {
        /// Key to set (default_api_base, origin, fallback_api_base, probe_timeout_ms,
        /// request_timeout_secs, default_langs)
        key: String,
        /// Value to set
        value: String,
    },
    /// Reset config to defaults
    Reset,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("GUIDEBOT_LOG", "warn"))
        .format_timestamp(None)
        .init();

    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

/// Settings, persisted keys and the endpoint resolver for one invocation
struct Session {
    config: Config,
    store: FileStore,
    resolver: Resolver<HttpProbe>,
}

impl Session {
    fn open(default_api_base: Option<String>) -> Result<Self> {
        let config = Config::load()?;
        let store = FileStore::open_default()?;
        let declared = config.declared_api_base(default_api_base);
        let resolver = Resolver::from_config(&config, declared);
        Ok(Self {
            config,
            store,
            resolver,
        })
    }

    fn api(&mut self) -> ApiClient {
        let base = self.resolver.resolve(&mut self.store);
        ApiClient::new(&base, self.config.request_timeout())
    }
}

fn run() -> Result<()> {
    let Cli {
        default_api_base,
        command,
    } = Cli::parse();
    let open = || Session::open(default_api_base.clone());

    match command {
        Commands::Chat { export } => run_chat(&mut open()?, export)?,
        Commands::Ask { question } => {
            let api = open()?.api();
            let mut chat = ChatController::new();
            if let Some(reply) = chat.submit(&question.join(" "), &api) {
                println!("{}", sanitize_terminal(&reply.text));
            }
        }
        Commands::Upload { title, langs, file } => {
            let mut session = open()?;
            let request = UploadRequest {
                title,
                langs,
                document: file,
            };
            let default_langs = session.config.default_langs.clone();
            let output = admin::upload(|| session.api(), &request, &default_langs);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Sources { action } => sources_cmd::run(&mut open()?, action)?,
        Commands::Connection { action } => handle_connection(&mut open()?, action)?,
        Commands::Resolve => {
            let api = open()?.api();
            println!("[API] Using: {}", api.base());
        }
        Commands::Health => {
            let api = open()?.api();
            match api.health() {
                Ok(true) => println!("{} is healthy", api.base()),
                Ok(false) => bail!("{} is not healthy", api.base()),
                Err(e) => bail!("{} is unreachable: {e}", api.base()),
            }
        }
        Commands::Config { action } => handle_config(action)?,
    }
    Ok(())
}

fn run_chat(session: &mut Session, export: Option<PathBuf>) -> Result<()> {
    let api = session.api();
    eprintln!("[API] Using: {}", api.base());

    let mut chat = ChatController::new();
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line.context("failed to read input")?;
        if line.trim() == "/quit" {
            break;
        }
        if let Some(reply) = chat.submit(&line, &api) {
            println!("bot> {}", sanitize_terminal(&reply.text));
        }
    }

    if let Some(path) = export {
        let rendered = if path.extension().is_some_and(|ext| ext == "json") {
            render::transcript_json(chat.transcript())?
        } else {
            render::transcript_html(chat.transcript())
        };
        std::fs::write(&path, rendered)
            .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("transcript saved to {}", path.display());
    }
    Ok(())
}

fn handle_connection(session: &mut Session, action: Option<ConnectionAction>) -> Result<()> {
    match action {
        None | Some(ConnectionAction::Show) => {
            let saved = session.store.get(API_BASE_KEY);
            let resolved = session.resolver.resolve(&mut session.store);
            println!("api_base (in use) = \"{resolved}\"");
            println!(
                "api_base (saved)  = \"{}\"",
                saved.as_deref().unwrap_or("")
            );
            let secret = if session.store.get(ADMIN_SECRET_KEY).is_some() {
                "set"
            } else {
                "not set"
            };
            println!("admin_secret      = {secret}");
        }
        Some(ConnectionAction::Set {
            api_base,
            admin_secret,
        }) => {
            let api_base = api_base.map(|b| b.trim().to_string()).filter(|b| !b.is_empty());
            let admin_secret = admin_secret.filter(|s| !s.is_empty());
            if api_base.is_none() && admin_secret.is_none() {
                bail!("nothing to save: pass --api-base and/or --admin-secret");
            }
            if let Some(base) = &api_base {
                validate_base(base)?;
                session.store.set(API_BASE_KEY, base)?;
            }
            if let Some(secret) = &admin_secret {
                session.store.set(ADMIN_SECRET_KEY, secret)?;
            }
            session.resolver.invalidate();
            println!("Saved connection settings.");
        }
        Some(ConnectionAction::Clear) => {
            session.store.remove(API_BASE_KEY)?;
            session.store.remove(ADMIN_SECRET_KEY)?;
            session.resolver.invalidate();
            println!("Cleared connection settings.");
        }
    }
    Ok(())
}

fn validate_base(base: &str) -> Result<()> {
    let url = url::Url::parse(base).with_context(|| format!("invalid api base: {base}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("invalid api base: {base} (expected http or https)");
    }
    Ok(())
}

fn handle_config(action: Option<ConfigAction>) -> Result<()> {
    match action {
        None | Some(ConfigAction::Show) => {
            let config = Config::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        Some(ConfigAction::Set { key, value }) => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            let path = config.save()?;
            println!("saved to {}", path.display());
        }
        Some(ConfigAction::Reset) => {
            let config = Config::default();
            let path = config.save()?;
            println!("reset to defaults at {}", path.display());
        }
    }
    Ok(())
}
