use clap::Parser;
use stagehand::app::Application;
use stagehand::config::ServerConfig;
use stagehand::routes::default_router;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Serve routes and static files through a middleware chain.
#[derive(Parser, Debug)]
#[command(name = "stagehand", version, about)]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind, e.g. 0.0.0.0:8080
    #[arg(short, long)]
    addr: Option<String>,

    /// Directory to serve static files from
    #[arg(short, long)]
    static_dir: Option<PathBuf>,

    #[arg(long)]
    max_connections: Option<usize>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "stagehand=info")]
    log_level: String,
}

impl Cli {
    fn into_config(self) -> stagehand::ServerResult<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(addr) = self.addr {
            config.addr = addr;
        }
        if let Some(dir) = self.static_dir {
            config.static_dir = Some(dir);
        }
        if let Some(max) = self.max_connections {
            config.max_connections = max;
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app = cli
        .into_config()
        .and_then(|config| {
            let app = Application::from_config(&config, default_router()?)?;
            Ok((config, app))
        });
    let (config, app) = match app {
        Ok(built) => built,
        Err(err) => {
            tracing::error!(error = %err, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = app.listen(&config.addr) {
        tracing::error!(error = %err, addr = %config.addr, "server stopped");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
