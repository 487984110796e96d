use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use alerta_cli::{
    commands::{self, Args},
    config::{Config, Environment},
};

const DEBUG_DIRECTIVES: &str =
    "alerta=debug,alerta_cli=debug,alerta_client=debug,alerta_model=debug";

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    let config = Config::resolve(&args.overrides(), &Environment::from_process())?;

    start_tracing(config.debug.value)?;
    debug!("alerta client version {}", env!("CARGO_PKG_VERSION"));
    if let Some(name) = &config.missing_profile {
        warn!("profile {name} not found in {}", config.config_file.value.display());
    }

    commands::run(args.cmd, &config).await?;
    Ok(())
}

/// `RUST_LOG` wins over the configured debug setting when it is set.
fn start_tracing(debug: bool) -> Result<(), anyhow::Error> {
    let directives = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.is_empty() => directives,
        _ if debug => DEBUG_DIRECTIVES.to_owned(),
        _ => "warn".to_owned(),
    };
    let filter = EnvFilter::builder().parse(directives)?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
    Ok(())
}
