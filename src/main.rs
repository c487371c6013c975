use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cu_relay::{
    analyzer::{AnalyzerClient, DOCUMENT_ANALYZER, LAYOUT_ANALYZER},
    config::Config,
    create_router,
    document::DocumentSource,
    models::{AnalysisRequest, AppState},
    utils::init_logger,
};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "cu-relay", version, about = "Relay documents to Azure AI Content Understanding")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP relay (default)
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Analyze a local file and print the result JSON to stdout
    Analyze {
        path: PathBuf,
        #[arg(long, default_value = LAYOUT_ANALYZER)]
        analyzer: String,
        /// Polling timeout in seconds; defaults to the analyzer's configured timeout
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    let _log_guard = init_logger(&config.logging)?;

    match cli.command.unwrap_or(Command::Serve { host: None, port: None }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Command::Analyze {
            path,
            analyzer,
            timeout,
        } => analyze(config, path, analyzer, timeout).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!(
        endpoint = %config.azure.endpoint,
        api_version = %config.azure.api_version,
        "Configuration loaded"
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("HOST and PORT must form a socket address")?;

    let analyzer = AnalyzerClient::from_config(&config)?;
    let app = create_router(AppState::new(config, analyzer));

    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Server stopped");
    Ok(())
}

async fn analyze(
    config: Config,
    path: PathBuf,
    analyzer: String,
    timeout: Option<u64>,
) -> anyhow::Result<()> {
    let timeout = match timeout {
        Some(secs) => Duration::from_secs(secs),
        None if analyzer == LAYOUT_ANALYZER => config.analysis.layout_timeout,
        None => config.analysis.document_timeout,
    };
    if analyzer != LAYOUT_ANALYZER && analyzer != DOCUMENT_ANALYZER {
        info!(analyzer = %analyzer, "Using custom analyzer");
    }

    let mut analysis = config.analysis.clone();
    analysis.allow_local_file_path = true;
    let data = DocumentSource::LocalPath(path).load(&analysis).await?;

    let client = AnalyzerClient::from_config(&config)?;
    let request = AnalysisRequest::new(analyzer.clone(), data, timeout);
    let result = client.analyze(&request).await.map_err(|e| {
        anyhow::anyhow!(
            "{} failed (HTTP {}): {}",
            analyzer,
            e.status_code().as_u16(),
            e.detail()
        )
    })?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &result)?;
    writeln!(stdout)?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
