use std::path::PathBuf;

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    pairgate_config::{PairgateConfig, config_dir, discover_and_load, load_config},
    pairgate_session::CredentialStore,
};

#[derive(Parser)]
#[command(name = "pairgate", about = "Pairgate: HTTP gateway for one messaging session")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to load instead of the discovered one.
    #[arg(long, global = true, env = "PAIRGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server.
    Gateway {
        /// Overrides `server.bind`.
        #[arg(long)]
        bind: Option<String>,
        /// Overrides `server.port`.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Delete stored session credentials so the next start pairs again.
    ResetSession,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets redacted).
    Show,
    /// Print the user config directory.
    Path,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn load(cli: &Cli) -> anyhow::Result<PairgateConfig> {
    match &cli.config {
        Some(path) => load_config(path),
        None => Ok(discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "pairgate starting");

    let mut config = load(&cli)?;
    match cli.command {
        Commands::Gateway { bind, port } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            pairgate_gateway::server::start_gateway(config).await
        },
        Commands::ResetSession => {
            let store = CredentialStore::new(config.session.auth_dir);
            store
                .clear()
                .await
                .with_context(|| format!("failed to clear {}", store.dir().display()))?;
            println!(
                "cleared {}; start the gateway and scan the new pairing code",
                store.dir().display()
            );
            Ok(())
        },
        Commands::Config { action } => {
            match action {
                ConfigAction::Show => println!("{config:#?}"),
                ConfigAction::Path => match config_dir() {
                    Some(dir) => println!("{}", dir.display()),
                    None => anyhow::bail!("could not determine the home directory"),
                },
            }
            Ok(())
        },
    }
}
