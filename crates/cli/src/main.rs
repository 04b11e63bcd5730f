//! Customer console CLI.
//!
//! # Usage
//!
//! ```bash
//! # List customers (credentials from CONSOLE_USERNAME / CONSOLE_PASSWORD)
//! console-cli list
//!
//! # Sign in as someone else
//! console-cli --username ana@x.com list
//!
//! # Register a customer
//! console-cli create --name Ana --email ana@x.com --age 30 --gender female --password 's3cret'
//!
//! # Change a customer's age
//! console-cli update 3 --age 31
//!
//! # Attach a profile picture
//! console-cli upload 3 ./ana.png
//! ```
//!
//! # Commands
//!
//! - `list` - Print every customer
//! - `create` / `update` / `delete` - Customer mutations
//! - `upload` - Attach a profile picture
//! - `picture-url` - Print where a profile picture is served
//! - `whoami` - Print the signed-in identity

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use customer_console::{Console, ConsoleConfig, TracingNotifier};
use customer_console_core::{CustomerId, Gender};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "console-cli")]
#[command(author, version, about = "Manage customers from the terminal")]
struct Cli {
    /// Login email (defaults to `CONSOLE_USERNAME`)
    #[arg(short, long, global = true)]
    username: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every customer
    List,
    /// Register a new customer
    Create {
        /// Display name (at most 15 characters)
        #[arg(short, long)]
        name: String,

        /// Contact email
        #[arg(short, long)]
        email: String,

        /// Age in years (16 to 100)
        #[arg(short, long)]
        age: i32,

        /// `male` or `female`
        #[arg(short, long)]
        gender: Gender,

        /// Password for the new account
        #[arg(short, long, env = "CONSOLE_CUSTOMER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Change a customer's name, email or age
    Update {
        /// Customer ID
        id: CustomerId,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        email: Option<String>,

        #[arg(short, long)]
        age: Option<i32>,
    },
    /// Delete a customer
    Delete {
        /// Customer ID
        id: CustomerId,
    },
    /// Upload a profile picture
    Upload {
        /// Customer ID
        id: CustomerId,

        /// Image file
        path: PathBuf,
    },
    /// Print the profile picture URL of a customer
    PictureUrl {
        /// Customer ID
        id: CustomerId,
    },
    /// Print the signed-in identity
    Whoami,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ConsoleConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "customer_console=info,console_cli=info".into());

    let json = std::env::var("CONSOLE_LOG_JSON").is_ok();
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    // Ignored if a provider is already installed
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();

    let config = match ConsoleConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    let _sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ConsoleConfig) -> Result<(), CliError> {
    let console = Console::new(config, Arc::new(TracingNotifier))?;

    // Pure: no session needed
    if let Commands::PictureUrl { id } = cli.command {
        commands::customers::picture_url(&console, id);
        return Ok(());
    }

    commands::session::sign_in(&console, cli.username.as_deref()).await?;

    match cli.command {
        Commands::List => commands::customers::list(&console).await,
        Commands::Create {
            name,
            email,
            age,
            gender,
            password,
        } => commands::customers::create(&console, name, email, age, gender, password).await,
        Commands::Update {
            id,
            name,
            email,
            age,
        } => commands::customers::update(&console, id, name, email, age).await,
        Commands::Delete { id } => commands::customers::delete(&console, id).await,
        Commands::Upload { id, path } => commands::customers::upload(&console, id, &path).await,
        Commands::Whoami => {
            commands::session::whoami(&console);
            Ok(())
        }
        Commands::PictureUrl { .. } => Ok(()),
    }
}
