use anyhow::{Context, Result};
use appdb_core::config::Config;
use appdb_core::http::AppDbServer;
use appdb_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use appdb_core::shutdown::{install_signal_handlers, ShutdownCoordinator};
use appdb_core::{DispatchResponse, Dispatcher, InboundRequest, RequestEnvelope, SqlRecordStore};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "appdb")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file; APPDB_* environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<LogLevel>,

    /// Enable JSON formatted logging
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the worker endpoint until SIGINT/SIGTERM
    Serve {
        /// Overrides server.bind_address
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Overrides storage.database_path
        #[arg(long)]
        database: Option<PathBuf>,
    },

    /// Dispatch one request envelope against a database and print the response
    Exec {
        /// Envelope JSON such as '{"action":"GET","key":"k"}', or `-` for stdin
        request: String,

        /// Overrides storage.database_path
        #[arg(long)]
        database: Option<PathBuf>,

        /// Sent as the Developer-Key header
        #[arg(long)]
        developer_key: Option<String>,

        /// Sent as the `?key=` query parameter
        #[arg(long)]
        query_key: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(level) = args.log_level {
        config.logging.level = level.as_str().to_string();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }

    init_logging_with_config(LogConfig::from_settings(&config.logging)?)?;

    match args.command {
        Command::Serve { bind, database } => {
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            if let Some(database) = database {
                config.storage.database_path = database;
            }
            serve(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Exec {
            request,
            database,
            developer_key,
            query_key,
        } => {
            if let Some(database) = database {
                config.storage.database_path = database;
            }
            let inbound = InboundRequest {
                envelope: read_envelope(&request)?,
                query_key,
                developer_key,
            };

            let response = exec(config, inbound).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);

            Ok(if response.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    let shutdown = Arc::new(ShutdownCoordinator::new(config.server.shutdown_timeout));
    install_signal_handlers(shutdown.clone());

    let server = AppDbServer::from_config(&config, shutdown)?;
    info!(
        database = %config.storage.database_path.display(),
        "AppDB starting"
    );
    server.run(config.server.bind_address).await
}

async fn exec(config: Config, request: InboundRequest) -> Result<DispatchResponse> {
    tokio::task::spawn_blocking(move || -> Result<DispatchResponse> {
        let backend = Arc::new(SqlRecordStore::open(&config.storage).with_context(|| {
            format!(
                "opening record store at {}",
                config.storage.database_path.display()
            )
        })?);
        let dispatcher = Dispatcher::new(backend, &config.storage)?;
        Ok(dispatcher.dispatch(&request))
    })
    .await?
}

fn read_envelope(arg: &str) -> Result<RequestEnvelope> {
    let raw = if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading request from stdin")?;
        buf
    } else {
        arg.to_string()
    };
    Ok(RequestEnvelope::from_body(raw.as_bytes())?)
}
