use shopkeep::{command::Input, config::ShopConfig, error::InputError, open_shop};

use anyhow::{Context, Result};
use clap::Parser;
use std::io::stdout;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(about = "Console shop with cart reservations and order history", version)]
struct Cli {
    /// TOML config file; missing means defaults.
    #[arg(short, long, value_name = "file", default_value = "shopkeep.toml")]
    config: PathBuf,

    /// Directory holding the CSV data files.
    #[arg(short, long, value_name = "dir")]
    data_dir: Option<PathBuf>,

    /// Seed the sample products when the catalog is empty.
    #[arg(long)]
    seed: bool,

    /// Read commands from this file instead of stdin.
    #[arg(value_name = "script")]
    script: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    let cli = Cli::parse();
    let mut config = ShopConfig::load(&cli.config)?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if cli.seed {
        config.seed_catalog = true;
    }

    run(config, cli.script).await
}

async fn run(config: ShopConfig, script: Option<PathBuf>) -> Result<()> {
    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &script {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open script {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    // Inputs go to a single task that owns the shop
    let (tx, mut rx) = mpsc::channel::<Result<Input, InputError>>(100);

    let shop_task = tokio::spawn(async move {
        let mut shop = open_shop(&config);

        while let Some(input) = rx.recv().await {
            if matches!(input, Ok(Input::Quit)) {
                break;
            }
            if let Err(e) = shop.respond(input, stdout()) {
                error!("Failed to write reply: {}", e);
            }
        }

        if shop.session().is_some() {
            if let Err(e) = shop.logout() {
                error!("Failed to save session: {}", e);
            }
        }
    });

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let input = line.parse::<Input>();
        let quit = matches!(input, Ok(Input::Quit));
        if tx.send(input).await.is_err() || quit {
            break;
        }
    }
    drop(tx);

    shop_task.await?;
    Ok(())
}
