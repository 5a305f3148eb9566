use anyhow::{anyhow, Result};
use dohshim::{Config, DynUpstream, HttpUpstream, SharedConfig};
use is_terminal::IsTerminal;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let mut first_args = std::env::args().take(2);
    let (program_name, config_file) = (
        first_args.next().unwrap_or("dohshim".to_string()),
        first_args.next(),
    );

    let config = config_init(&program_name, config_file)?;
    let overrides = Arc::new(config.override_table()?);
    let upstream: DynUpstream = Arc::new(HttpUpstream::new(&config)?);

    if std::io::stdout().is_terminal() {
        println!("{}", dohshim::banner::SHIM);
    }

    tracing::info!(domains = overrides.len(), "override table loaded");
    tracing::info!("upstream DoH endpoint: {}", &config.upstream_url);
    tracing::info!("DoH listening on {}", &config.bind_addr);
    let http_server = dohshim::api::new(config, overrides, upstream);
    let http_handle = tokio::spawn(http_server);

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
        },
        Ok(http_res) = http_handle => {
            if let Err(err) = http_res {
                return Err(err.into());
            }
        }
    }
    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dohshim=info".into()),
        )
        .init();
}

fn config_init(program_name: &str, config_file: Option<String>) -> Result<SharedConfig> {
    match config_file {
        None => Err(anyhow!("usage: {program_name} /path/to/config.json")),
        Some(config_file) => {
            let config = Config::try_from_file(&config_file)?;
            tracing::debug!("loaded config from {config_file}");
            Ok(Arc::new(config))
        }
    }
}
