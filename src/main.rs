//! Tarpit CLI entry point.
//!
//! Provides `serve`, `classify`, and `report` subcommands for running the
//! HTTP honeypot, triaging a single message offline, or printing the
//! transcript of one conversation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use tarpit::config::Config;
use tarpit::credentials::{self, API_KEY_VAR};
use tarpit::evidence::{CsvEvidenceRecorder, EvidenceRecorder, MemoryEvidenceRecorder};
use tarpit::http::{self, AppState};
use tarpit::pipeline::{self, Honeypot};
use tarpit::providers::{self, parse_provider_string, required_credential};
use tarpit::report::{PlainTextRenderer, ReportError, ReportExporter};
use tarpit::responder::{DecodingParams, ResponseGenerator};
use tarpit::store::memory::MemoryConversationStore;
use tarpit::store::sqlite::SqliteConversationStore;
use tarpit::store::ConversationStore;
use tarpit::{logging, triage};

/// Tarpit — keeps scammers talking and writes down what they say.
#[derive(Parser)]
#[command(name = "tarpit", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the HTTP honeypot.
    Serve {
        /// Keep turns and evidence in memory only.
        #[arg(long)]
        ephemeral: bool,
    },
    /// Triage one message without calling the model.
    Classify {
        /// Message text.
        message: String,
    },
    /// Print the transcript of one conversation.
    Report {
        /// Conversation (scammer) id.
        conversation_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { ephemeral } => handle_serve(ephemeral).await,
        Command::Classify { message } => handle_classify(&message),
        Command::Report { conversation_id } => handle_report(&conversation_id).await,
    }
}

/// Run the HTTP honeypot until Ctrl-C.
async fn handle_serve(ephemeral: bool) -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let paths = config.paths()?;

    let _logging_guard = if ephemeral {
        logging::init_cli();
        None
    } else {
        Some(logging::init_production(&paths.logs_dir)?)
    };

    // Secrets: both the health key and the provider key are mandatory.
    let credentials = credentials::load_runtime_credentials(&paths.env_file)
        .with_context(|| format!("failed to load {}", paths.env_file.display()))?;
    let api_key = credentials
        .require(API_KEY_VAR)
        .context("refusing to start without a health-check key")?;
    let (provider_name, _) = parse_provider_string(&config.models.default)?;
    if let Some(key) = required_credential(provider_name) {
        credentials
            .require(key)
            .with_context(|| format!("refusing to start without a key for {provider_name}"))?;
    }

    let provider = providers::build_provider(
        &config.models.default,
        &credentials,
        config.models.timeout(),
    )
    .context("failed to create model provider")?;
    let generator = ResponseGenerator::new(provider, DecodingParams::from(&config.models));

    let (store, evidence): (Arc<dyn ConversationStore>, Arc<dyn EvidenceRecorder>) = if ephemeral
    {
        (
            Arc::new(MemoryConversationStore::new()),
            Arc::new(MemoryEvidenceRecorder::new()),
        )
    } else {
        let store = SqliteConversationStore::open(&paths.database)
            .await
            .with_context(|| format!("failed to open {}", paths.database.display()))?;
        let evidence = CsvEvidenceRecorder::open(&paths.evidence_csv)
            .with_context(|| format!("failed to open {}", paths.evidence_csv.display()))?;
        (Arc::new(store), Arc::new(evidence))
    };

    let honeypot = Arc::new(
        Honeypot::new(store, evidence, generator)
            .with_history_limit(config.conversation.history_limit()),
    );
    let state = AppState::new(honeypot, Arc::new(PlainTextRenderer), api_key);
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;

    info!(
        bind = %config.server.bind,
        model = %config.models.default,
        ephemeral,
        "tarpit listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            // An error here means no signal handler; shut down rather than hang.
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .context("http server failed")?;

    Ok(())
}

/// Print the triage decision for one message.
fn handle_classify(message: &str) -> anyhow::Result<()> {
    let explained = triage::explain(message);
    let verdict = pipeline::assess(message);

    println!("category: {}", explained.category);
    println!("trigger:  {}", explained.trigger.unwrap_or("-"));
    println!("risk:     {}", verdict.risk);
    println!("persona:  {}", verdict.persona);
    Ok(())
}

/// Print the plain-text transcript of one conversation.
async fn handle_report(conversation_id: &str) -> anyhow::Result<()> {
    logging::init_cli();

    let config = Config::load().context("failed to load configuration")?;
    let paths = config.paths()?;
    let store = SqliteConversationStore::open(&paths.database)
        .await
        .with_context(|| format!("failed to open {}", paths.database.display()))?;

    let exporter = ReportExporter::new(Arc::new(store));
    match exporter.render(conversation_id).await {
        Ok(document) => {
            print!("{}", PlainTextRenderer::render_text(&document));
            Ok(())
        }
        Err(ReportError::NotFound(id)) => Err(anyhow::anyhow!("no turns recorded for {id}")),
        Err(e) => Err(e).context("failed to build report"),
    }
}
