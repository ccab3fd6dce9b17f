//! MediPedia CLI - Command-line client for the MediPedia backend
//!
//! Signs in, asks medical questions, manages the document library and runs
//! the admin tools against a running backend. The session survives between
//! invocations in a file under the platform data directory.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use medipedia_api::{ApiClientConfig, ApiClients};
use medipedia_app::{
    autocomplete, categories, category_label, file_type, format_file_size, format_uploaded_at,
    smart_suggestions, templates_in, AdminDashboard, ChatAudience, ChatController, ChatTurn,
    DocumentLibrary, RoleGate,
};
use medipedia_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success, performance,
    AuthAction, DocumentRepository, LoggingConfig, MedipediaConfig, QueryGateway, Role, Session,
    UploadFile,
};
use medipedia_session::{build_validator, FileStore, SessionStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "medipedia")]
#[command(about = "Ask medical questions and manage the MediPedia knowledge base")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in, or create an account with --signup
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Create the account instead of signing in
        #[arg(long)]
        signup: bool,
    },

    /// Forget the saved session
    Logout,

    /// Show the signed-in account
    Whoami {
        /// Print the session as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask a single question
    Ask {
        /// Question to ask
        question: String,
    },

    /// Interactive question/answer session
    Chat,

    /// Browse and manage documents
    Docs {
        #[command(subcommand)]
        command: DocsCommand,
    },

    /// Query templates, smart suggestions and autocomplete
    Suggest {
        /// Complete this term instead of listing templates
        term: Option<String>,

        /// Only list templates in this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Administrator tools
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },

    /// Configuration management
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Validate current configuration
        #[arg(long)]
        validate: bool,
    },
}

#[derive(Subcommand)]
enum DocsCommand {
    /// List documents in the library
    List {
        /// Filter by name or category
        #[arg(short, long)]
        search: Option<String>,

        /// Only show this category ("all" for every category)
        #[arg(short, long)]
        category: Option<String>,

        /// Print the documents as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upload a file
    Upload {
        path: PathBuf,

        #[arg(short, long, default_value = "general")]
        category: String,
    },

    /// Delete a document by name
    Delete { name: String },
}

#[derive(Subcommand)]
enum AdminCommand {
    /// Register a new account
    AddUser {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// user or admin
        #[arg(short, long, default_value = "user")]
        role: Role,
    },

    /// Library and usage summary
    Stats,
}

/// Everything a command needs to talk to the backend
struct AppContext {
    config: MedipediaConfig,
    clients: ApiClients,
    sessions: SessionStore,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let (config, source) = load_config(cli.config.as_ref())?;

    let logging_config = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        config.logging.clone()
    };
    init_logging(&logging_config).map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting MediPedia CLI v{}", env!("CARGO_PKG_VERSION"));
    match &source {
        Some(path) => info!("Loaded configuration from {:?}", path),
        None => info!("No configuration file found, using defaults"),
    }

    if let Commands::Config {
        show,
        init,
        validate,
    } = cli.command
    {
        return handle_config(show, init, validate, &config);
    }

    let mut context = connect(config)?;

    match cli.command {
        Commands::Login {
            email,
            password,
            signup,
        } => handle_login(&mut context, &email, &password, signup).await,
        Commands::Logout => {
            context.sessions.logout();
            println!("👋 Logged out");
            Ok(())
        }
        Commands::Whoami { json } => handle_whoami(&context, json),
        Commands::Ask { question } => handle_ask(&context, &question).await,
        Commands::Chat => handle_chat(&context).await,
        Commands::Docs { command } => handle_docs(&context, command).await,
        Commands::Suggest { term, category } => handle_suggest(&context, term, category).await,
        Commands::Admin { command } => handle_admin(&context, command).await,
        Commands::Config { .. } => Ok(()),
    }
}

fn load_config(config_path: Option<&PathBuf>) -> Result<(MedipediaConfig, Option<PathBuf>)> {
    let (mut config, source) = if let Some(path) = config_path {
        (MedipediaConfig::from_file(path)?, Some(path.clone()))
    } else {
        let default_paths = [
            dirs::config_dir().map(|d| d.join("medipedia").join("config.toml")),
            dirs::home_dir().map(|d| d.join(".medipedia").join("config.toml")),
            Some(PathBuf::from("medipedia.toml")),
        ];

        match default_paths.into_iter().flatten().find(|p| p.exists()) {
            Some(path) => (MedipediaConfig::from_file(&path)?, Some(path)),
            None => (MedipediaConfig::default(), None),
        }
    };

    config.apply_env();
    Ok((config, source))
}

/// Default configuration file path
fn config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|d| d.join(".config")))
        .map(|d| d.join("medipedia").join("config.toml"))
        .context("Cannot locate a configuration directory")
}

fn session_dir(config: &MedipediaConfig) -> Result<PathBuf> {
    if let Some(dir) = &config.session.storage_dir {
        return Ok(dir.clone());
    }
    dirs::data_dir()
        .map(|d| d.join("medipedia"))
        .or_else(|| dirs::home_dir().map(|d| d.join(".medipedia")))
        .context("Cannot locate a data directory for the session file")
}

/// Build the gateways and restore any saved session
fn connect(config: MedipediaConfig) -> Result<AppContext> {
    config.validate()?;

    let clients = ApiClients::new(ApiClientConfig::from_config(&config))?;
    let storage = FileStore::new(session_dir(&config)?)?;
    let validator = build_validator(&config.auth, clients.accounts.clone());

    let mut sessions = SessionStore::new(Arc::new(storage), validator)
        .with_key(config.session.storage_key.clone())
        .with_admin_email(config.auth.admin_email.clone());
    if let Some(session) = sessions.restore() {
        debug!(email = %session.email, "Restored session");
    }

    Ok(AppContext {
        config,
        clients,
        sessions,
    })
}

fn require_login(context: &AppContext) -> Result<&Session> {
    context
        .sessions
        .current()
        .context("Not logged in. Run `medipedia login` first")
}

async fn handle_login(
    context: &mut AppContext,
    email: &str,
    password: &str,
    signup: bool,
) -> Result<()> {
    let action = if signup {
        AuthAction::SignUp
    } else {
        AuthAction::SignIn
    };
    log_operation_start!("login", email = %email, %action);

    let session = context
        .sessions
        .login(email, password, action)
        .await
        .into_result()
        .map_err(|failure| {
            log_operation_error!("login", failure, email = %email);
            failure
        })?;

    log_operation_success!("login", email = %session.email);
    println!("✅ Logged in as {} ({})", session.email, session.role);
    println!("➡️  Dashboard: {}", RoleGate::dashboard_for(&session));
    Ok(())
}

fn handle_whoami(context: &AppContext, json: bool) -> Result<()> {
    match context.sessions.current() {
        Some(session) if json => println!("{}", serde_json::to_string_pretty(session)?),
        Some(session) => println!("{} ({}, id {})", session.email, session.role, session.id),
        None => println!("Not logged in"),
    }
    Ok(())
}

fn chat_for(context: &AppContext) -> ChatController {
    let audience = match context.sessions.current() {
        Some(session) if session.is_admin() => ChatAudience::Admin,
        _ => ChatAudience::User,
    };
    ChatController::new(context.clients.queries.clone(), audience)
}

fn print_last_reply(chat: &ChatController) {
    let Some(reply) = chat.messages().last() else {
        return;
    };
    println!("🩺 {}", reply.content);
    for reference in &reply.references {
        println!("   • {}", reference);
    }
    if !reply.related_queries.is_empty() {
        println!("\nRelated:");
        for related in &reply.related_queries {
            println!("   - {}", related);
        }
    }
}

async fn handle_ask(context: &AppContext, question: &str) -> Result<()> {
    log_operation_start!("ask");
    let mut chat = chat_for(context);

    let turn = performance::measure_async(
        "ask",
        chat.send(context.sessions.current(), question),
    )
    .await;
    match turn {
        ChatTurn::Answered(_) => {
            print_last_reply(&chat);
            log_operation_success!("ask");
            Ok(())
        }
        ChatTurn::Failed(failure) => {
            log_operation_error!("ask", failure);
            Err(anyhow!(failure))
        }
        ChatTurn::Ignored => bail!("Question is empty"),
    }
}

async fn handle_chat(context: &AppContext) -> Result<()> {
    let mut chat = chat_for(context);
    let session = context.sessions.current();

    if let Some(welcome) = chat.messages().first() {
        println!("🤖 {}", welcome.content);
    }
    println!("💡 Type 'history' for recent questions, 'quit' to exit\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all("💬 You: ".as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "quit" | "exit" | "q" => break,
            "history" => {
                for entry in chat.history() {
                    println!("   {}  {}", entry.timestamp.format("%H:%M"), entry.query);
                }
                continue;
            }
            _ => {}
        }

        let Some(pending) = chat.begin(session, input) else {
            continue;
        };
        println!("⏳ Thinking...");
        let outcome = context
            .clients
            .queries
            .send(&pending.user_id, &pending.query)
            .await;

        match chat.finish(pending, outcome) {
            ChatTurn::Answered(_) => print_last_reply(&chat),
            ChatTurn::Failed(failure) => {
                debug!(reason = %failure.reason, "Chat turn failed");
                if let Some(message) = chat.state().error() {
                    println!("❌ {}", message);
                }
                if chat.audience() == ChatAudience::Admin {
                    print_last_reply(&chat);
                }
            }
            ChatTurn::Ignored => {}
        }
        println!();
    }

    println!("👋 Goodbye!");
    Ok(())
}

async fn handle_docs(context: &AppContext, command: DocsCommand) -> Result<()> {
    let mut library = DocumentLibrary::new(context.clients.documents.clone());

    match command {
        DocsCommand::List {
            search,
            category,
            json,
        } => {
            library.refresh().await;
            if library.documents().is_empty() {
                // list() hides backend failures; ask again to tell "empty" from "down"
                if let Some(failure) = context.clients.documents.try_list().await.failure() {
                    eprintln!("⚠️  Could not load documents: {}", failure);
                }
            }
            if let Some(search) = search {
                library.set_search(search);
            }
            if let Some(category) = category {
                library.set_category(category);
            }

            let visible = library.visible();
            if json {
                println!("{}", serde_json::to_string_pretty(&visible)?);
            } else if visible.is_empty() {
                println!("{}", library.empty_message());
            } else {
                for document in visible {
                    println!(
                        "📄 {}  [{}]  {}  {}  {}",
                        document.name,
                        file_type(&document.name),
                        format_file_size(document.size),
                        format_uploaded_at(document.uploaded_at),
                        category_label(&document.category)
                    );
                }
            }
        }
        DocsCommand::Upload { path, category } => {
            require_login(context)?;
            let file = read_upload(&path).await?;
            log_operation_start!("upload_document", file = %file.name, category = %category);

            library.upload(Some(file), &category).await;
            report_flash(&library, "upload_document")?;
        }
        DocsCommand::Delete { name } => {
            require_login(context)?;
            log_operation_start!("delete_document", name = %name);

            library.delete(&name).await;
            report_flash(&library, "delete_document")?;
        }
    }
    Ok(())
}

async fn read_upload(path: &Path) -> Result<UploadFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} is not a file", path.display()))?;
    Ok(UploadFile::new(name, bytes))
}

fn report_flash(library: &DocumentLibrary, operation: &str) -> Result<()> {
    match library.flash() {
        Some(flash) if flash.is_error() => {
            log_operation_error!(operation, flash);
            bail!("{}", flash.text)
        }
        Some(flash) => {
            log_operation_success!(operation);
            println!("✅ {}", flash.text);
            Ok(())
        }
        None => Ok(()),
    }
}

async fn handle_suggest(
    context: &AppContext,
    term: Option<String>,
    category: Option<String>,
) -> Result<()> {
    if let Some(term) = term {
        let completions = autocomplete(&term);
        if completions.is_empty() {
            println!("No completions (terms need at least three characters)");
        }
        for completion in completions {
            println!("   {}", completion);
        }
        return Ok(());
    }

    let mut library = DocumentLibrary::new(context.clients.documents.clone());
    let suggestions = smart_suggestions(library.refresh().await);
    if !suggestions.is_empty() {
        println!("✨ Suggested for your knowledge base:");
        for suggestion in &suggestions {
            println!("   [{}] {}", suggestion.category, suggestion.text);
        }
        println!();
    }

    let listed = match category.as_deref() {
        Some(category) => vec![category],
        None => categories(),
    };
    for name in listed {
        let templates = templates_in(Some(name));
        if templates.is_empty() {
            continue;
        }
        println!("📚 {}", name);
        for template in templates {
            println!("   {}: {}", template.title, template.query);
        }
    }
    Ok(())
}

async fn handle_admin(context: &AppContext, command: AdminCommand) -> Result<()> {
    let mut dashboard = AdminDashboard::open(
        context.sessions.current(),
        context.clients.accounts.clone(),
        context.clients.documents.clone(),
        context.clients.queries.clone(),
    )
    .map_err(|denied| anyhow!("{} (see {})", denied, denied.redirect()))?;

    match command {
        AdminCommand::AddUser {
            email,
            password,
            role,
        } => {
            log_operation_start!("add_user", email = %email, %role);
            let user = dashboard
                .add_user(&email, &password, role)
                .await
                .into_result()
                .map_err(|failure| {
                    log_operation_error!("add_user", failure, email = %email);
                    failure
                })?;

            log_operation_success!("add_user", email = %user.email);
            if let Some(flash) = dashboard.flash() {
                println!("✅ {}", flash);
            }
        }
        AdminCommand::Stats => {
            let stats = dashboard.refresh_stats().await;
            println!("📊 Backend: {}", context.config.api.base_url);
            println!("   Documents:      {}", stats.total_documents);
            println!("   Recent uploads: {}", stats.recent_uploads);
            println!("   Users:          {}", stats.total_users);
            println!("   Queries:        {}", stats.total_queries);
        }
    }
    Ok(())
}

fn handle_config(show: bool, init: bool, validate: bool, config: &MedipediaConfig) -> Result<()> {
    if init {
        let path = config_path()?;
        MedipediaConfig::default().save_to_file(&path)?;
        println!("✅ Configuration initialized at: {:?}", path);
        println!("📝 Edit api.base_url to point at your backend.");
    }

    if show {
        println!("📋 Current configuration:");
        println!("{}", toml::to_string_pretty(config)?);
    }

    if validate {
        match config.validate() {
            Ok(()) => println!("✅ Configuration is valid"),
            Err(e) => {
                println!("❌ Configuration validation failed: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}
