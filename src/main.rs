mod cli;
mod config;
mod openai_client;

use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use eyre::{Result, WrapErr};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::cli::chat::assemble::{ExcerptPolicy, DEFAULT_MAX_EXCERPT_CHARS};
use crate::cli::chat::ingest::Upload;
use crate::cli::chat::session::ChatSession;
use crate::cli::chat::ChatContext;
use crate::config::Settings;
use crate::openai_client::OpenAiClient;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    chat: ChatArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session
    Chat(ChatArgs),
}

#[derive(Args, Debug, Clone)]
struct ChatArgs {
    /// Ask a single question and exit
    #[arg(short, long)]
    input: Option<String>,

    /// Attach a PDF, TXT, CSV or XLSX file to the question
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Declared MIME type of --file, used when its extension is not recognized
    #[arg(long)]
    mime: Option<String>,

    /// Chat model to use
    #[arg(long, env = "VERTEX_MODEL", default_value = config::DEFAULT_MODEL)]
    model: String,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Sampling temperature
    #[arg(long, default_value_t = config::DEFAULT_TEMPERATURE)]
    temperature: f32,

    /// Upper bound on the reply length, in tokens
    #[arg(long, default_value_t = config::DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Number of characters of an attached file sent with a question
    #[arg(long, env = "VERTEX_MAX_EXCERPT_CHARS", default_value_t = DEFAULT_MAX_EXCERPT_CHARS)]
    max_excerpt_chars: usize,

    /// System prompt sent before the conversation
    #[arg(long, env = "VERTEX_SYSTEM_PROMPT", default_value = config::DEFAULT_SYSTEM_PROMPT)]
    system_prompt: String,

    /// JSON secrets file holding {"openai": {"api_key": "..."}}
    #[arg(long, env = config::SECRETS_FILE_ENV)]
    secrets: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl ChatArgs {
    fn settings(&self, api_key: String) -> Settings {
        Settings {
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            system_prompt: self.system_prompt.clone(),
            excerpt: ExcerptPolicy {
                max_chars: self.max_excerpt_chars,
            },
            ..Settings::new(api_key)
        }
    }
}

async fn load_attachment(args: &ChatArgs) -> Result<Option<Upload>> {
    match &args.file {
        Some(path) => Upload::from_path(path, args.mime.clone()).await.map(Some),
        None => Ok(None),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();
    let args = match cli.command {
        Some(Commands::Chat(args)) => args,
        None => cli.chat,
    };

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .wrap_err("Failed to set tracing subscriber")?;

    info!("Starting VERTEX");

    let secrets_path = args.secrets.clone().or_else(config::default_secrets_path);
    let api_key = match config::resolve_api_key(secrets_path.as_deref(), |name| env::var(name).ok())
    {
        Ok(key) => key,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let settings = args.settings(api_key);
    let client = match OpenAiClient::new(&settings) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to initialize the OpenAI client: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };
    info!(endpoint = %client.endpoint(), model = %settings.model, "Completion client ready");

    let attachment = match load_attachment(&args).await {
        Ok(attachment) => attachment,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{:#}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let session = ChatSession::new(Box::new(client), settings.system_prompt, settings.excerpt);
    let mut chat_context = ChatContext::new(Box::new(io::stdout()), session, args.input, attachment);
    chat_context.run().await
}
