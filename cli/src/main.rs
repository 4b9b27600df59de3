use clap::{Parser, Subcommand};
use nutrichat_dialogue::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod util;

use util::{build_controller, build_store, exit_error, require_user_id};

#[derive(Parser)]
#[command(
    name = "nutrichat",
    version,
    about = "nutrichat CLI: log meals by chatting with your nutrition assistant"
)]
struct Cli {
    /// Fresh-message webhook URL
    #[arg(long, env = "NUTRICHAT_FRESH_URL")]
    fresh_url: Option<String>,

    /// Clarification-answer webhook URL
    #[arg(long, env = "NUTRICHAT_ANSWER_URL")]
    answer_url: Option<String>,

    /// Seconds to wait for the interpreter before giving up on a turn
    #[arg(long, env = "NUTRICHAT_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Postgres URL of the clarification session store
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// User ID (falls back to the profile saved by `nutrichat use`)
    #[arg(long, env = "NUTRICHAT_USER_ID")]
    user_id: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive meal-logging chat
    Chat,
    /// Send one message and print the turn result as JSON.
    /// Answers to earlier questions need DATABASE_URL to be recognised.
    Send {
        /// Free-text meal description or answer
        message: String,
    },
    /// Show the pending clarification session for the user
    Pending,
    /// Save a default user id
    Use {
        /// User id to save
        user_id: String,
    },
    /// List quick suggestions
    Suggestions,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let code = match &cli.command {
        Commands::Use { user_id } => finish(commands::profile::use_user(user_id)),
        Commands::Suggestions => finish(commands::suggestions::run()),
        Commands::Pending => {
            let user_id = require_user_id(cli.user_id.as_deref());
            let store = build_store(cli.database_url.as_deref());
            commands::pending::run(store.as_ref(), &user_id).await
        }
        Commands::Send { message } => {
            let user_id = require_user_id(cli.user_id.as_deref());
            let controller = controller(&cli);
            commands::send::run(&controller, &user_id, message).await
        }
        Commands::Chat => {
            let user_id = require_user_id(cli.user_id.as_deref());
            let controller = controller(&cli);
            finish(commands::chat::run(&controller, &user_id).await)
        }
    };

    std::process::exit(code);
}

fn controller(cli: &Cli) -> nutrichat_dialogue::DialogueController {
    build_controller(
        cli.fresh_url.as_deref(),
        cli.answer_url.as_deref(),
        cli.timeout_secs,
        cli.database_url.as_deref(),
    )
}

fn finish(result: Result<(), Box<dyn std::error::Error>>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => exit_error(&e.to_string(), None),
    }
}
