//! Aegis CLI
//!
//! Command-line front end for:
//! - managing chat sessions and their history
//! - ingesting a reference and a subject document into a session
//! - asking questions (answers stream to stdout)
//! - running a compliance audit and exporting the report

use aegis_audit::{export, Assistant, AuditError, Auditor, ChatSession};
use aegis_llm::{build_provider, CompletionService, LlmConfig};
use aegis_storage::{CorpusRole, MessageRole, SessionId};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use futures::StreamExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod workspace;

use workspace::Workspace;

const AEGIS_LOG_ENV: &str = "AEGIS_LOG";

#[derive(Parser)]
#[command(name = "aegis")]
#[command(author, version, about = "Aegis: document Q&A and compliance audits")]
struct Cli {
    /// Where sessions and corpus indices are stored
    #[arg(long, global = true, env = "AEGIS_DATA_DIR", default_value = "./aegis_data")]
    data_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, list, rename, delete sessions and show their history.
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Index a reference and a subject document into a session.
    ///
    /// Both are required; re-ingesting replaces the previous documents.
    Ingest {
        #[arg(long)]
        session: SessionId,
        /// Governing text (law, regulation, standard)
        #[arg(long)]
        reference: PathBuf,
        /// Text audited against it (policy, contract)
        #[arg(long)]
        subject: PathBuf,
    },

    /// Drop a session's documents.
    Reset {
        #[arg(long)]
        session: SessionId,
    },

    /// Ask a question; the answer streams to stdout.
    Ask {
        /// Session to continue (a new one is created when omitted)
        #[arg(long)]
        session: Option<SessionId>,
        query: String,
    },

    /// Run a compliance audit over a session's documents.
    Audit {
        #[arg(long)]
        session: SessionId,
        /// Write the report here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
        format: ReportFormat,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    New {
        #[arg(long, default_value = aegis_audit::session::DEFAULT_SESSION_TITLE)]
        title: String,
    },
    List,
    Rename { id: SessionId, title: String },
    /// Delete a session, its messages, and its documents
    Delete { id: SessionId },
    History { id: SessionId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Markdown,
    Json,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(AEGIS_LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let ws = Workspace::open(&cli.data_dir)?;

    match cli.command {
        Commands::Session { command } => cmd_session(&ws, command),
        Commands::Ingest {
            session,
            reference,
            subject,
        } => cmd_ingest(&ws, session, &reference, &subject),
        Commands::Reset { session } => cmd_reset(&ws, session),
        Commands::Ask { session, query } => cmd_ask(&ws, session, &query).await,
        Commands::Audit {
            session,
            out,
            format,
        } => cmd_audit(&ws, session, out.as_deref(), format).await,
    }
}

fn completion_service() -> Result<Arc<dyn CompletionService>> {
    let config = LlmConfig::from_env()?;
    tracing::debug!(?config, "completion service config");
    Ok(build_provider(config)?)
}

// ============================================================================
// Sessions
// ============================================================================

fn cmd_session(ws: &Workspace, command: SessionCommands) -> Result<()> {
    match command {
        SessionCommands::New { title } => {
            let id = ws.sessions.create_session(&title)?;
            eprintln!("{} session {}", "created".green().bold(), title.bold());
            println!("{id}");
        }
        SessionCommands::List => {
            let sessions = ws.sessions.list_sessions();
            if sessions.is_empty() {
                eprintln!("{} no sessions yet (try `aegis session new`)", "info:".yellow().bold());
            }
            for s in sessions {
                println!(
                    "{}  {}  {}  {}",
                    s.id.to_string().dimmed(),
                    s.created_at.format("%Y-%m-%d %H:%M"),
                    format!("{:>3} msgs", s.message_count).dimmed(),
                    s.title.bold()
                );
            }
        }
        SessionCommands::Rename { id, title } => {
            ws.sessions.rename_session(id, &title)?;
            eprintln!("{} {id}", "renamed".green().bold());
        }
        SessionCommands::Delete { id } => {
            ws.require_session(id)?;
            let dropped = ws.corpora.destroy(id)?;
            ws.sessions.delete_session(id)?;
            eprintln!(
                "{} {id} ({dropped} attached corpora dropped)",
                "deleted".green().bold()
            );
        }
        SessionCommands::History { id } => {
            for m in ws.sessions.messages(id)? {
                let who = match m.role {
                    MessageRole::User => "you".cyan().bold(),
                    MessageRole::Assistant => "aegis".magenta().bold(),
                };
                println!("{who}: {}\n", m.content);
            }
        }
    }
    Ok(())
}

// ============================================================================
// Documents
// ============================================================================

fn cmd_ingest(ws: &Workspace, session: SessionId, reference: &Path, subject: &Path) -> Result<()> {
    ws.require_session(session)?;
    let documents = [(CorpusRole::Reference, reference), (CorpusRole::Subject, subject)];

    // Nothing is indexed until both documents extract cleanly.
    let mut extracted = Vec::with_capacity(documents.len());
    for (role, path) in documents {
        println!("{} {role} {}", "Ingesting".green().bold(), path.display());
        extracted.push((role, workspace::extract(path)?));
    }

    for (role, (name, chunks)) in extracted {
        let count = chunks.len();
        ws.corpora.create(session, role, &name, chunks)?;
        println!("  {} {role}: {count} chunks indexed", "→".yellow());
    }
    Ok(())
}

fn cmd_reset(ws: &Workspace, session: SessionId) -> Result<()> {
    ws.require_session(session)?;
    let dropped = ws.corpora.destroy(session)?;
    eprintln!(
        "{} documents of {session} ({dropped} attached corpora dropped)",
        "reset".green().bold()
    );
    Ok(())
}

// ============================================================================
// Chat and audit
// ============================================================================

async fn cmd_ask(ws: &Workspace, session: Option<SessionId>, query: &str) -> Result<()> {
    let chat = match session {
        Some(id) => ChatSession::open(Arc::clone(&ws.sessions), id)?,
        None => {
            let chat = ChatSession::start(Arc::clone(&ws.sessions))?;
            eprintln!("{} session {}", "created".green().bold(), chat.id());
            chat
        }
    };
    let (reference, subject) = ws.attach(chat.id())?;

    let assistant = Assistant::new(completion_service()?, ws.corpora.clone(), &ws.audit_config()?);
    let mut stream = chat
        .ask(&assistant, query, reference.as_ref(), subject.as_ref())
        .await?;

    let mut stdout = std::io::stdout();
    while let Some(piece) = stream.next().await {
        let piece = piece?;
        stdout.write_all(piece.as_bytes())?;
        stdout.flush()?;
    }
    writeln!(stdout)?;
    Ok(())
}

async fn cmd_audit(
    ws: &Workspace,
    session: SessionId,
    out: Option<&Path>,
    format: ReportFormat,
) -> Result<()> {
    ws.require_session(session)?;
    let (reference, subject) = ws.attach(session)?;

    let auditor = Auditor::new(completion_service()?, ws.corpora.clone(), ws.audit_config()?);
    eprintln!("{} session {session}", "Auditing".green().bold());
    let report = match auditor.run(reference.as_ref(), subject.as_ref()).await {
        Ok(report) => report,
        Err(AuditError::DocumentsUnavailable) => {
            return Err(anyhow!(
                "documents not available: run `aegis ingest --session {session} --reference <file> --subject <file>` first"
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let rendered = match format {
        ReportFormat::Markdown => export::to_markdown(&report),
        ReportFormat::Json => export::to_json(&report)?,
    };
    match out {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("{} {}", "wrote".green().bold(), path.display().to_string().bold());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
