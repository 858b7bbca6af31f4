use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use receipt_intake::config::{OcrBackend, ServerConfig};
use receipt_intake::services::amount::{AmountExtractor, LabeledTotal, LargestAmount, LastAmount};
use receipt_intake::services::selection::mime_from_path;
use receipt_intake::services::text_extraction::engine_for;
use receipt_intake::utils::{format_decimal, format_file_size};
use receipt_intake::{
    logging, HttpTransactionStore, OcrClient, ReceiptFile, ReceiptIntake, ReceiptServer,
    SqliteTransactionStore, TransactionStore,
};

#[derive(Parser)]
#[command(name = "receipt-intake", version, about = "Receipt OCR to expense transactions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the OCR upload server
    Serve {
        #[arg(long)]
        bind: Option<SocketAddr>,
        #[arg(long)]
        upload_dir: Option<PathBuf>,
        #[arg(long)]
        lang: Option<String>,
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
        #[arg(long)]
        max_concurrent: Option<usize>,
    },
    /// Upload a receipt image and record its total
    Scan {
        file: PathBuf,
        #[arg(long, default_value = "http://localhost:5000")]
        server: String,
        #[arg(long, default_value = "receipts.sqlite", conflicts_with = "store_url")]
        store_db: PathBuf,
        #[arg(long)]
        store_url: Option<String>,
        #[arg(long, requires = "store_url")]
        store_token: Option<String>,
        #[arg(long, value_enum, default_value = "largest")]
        strategy: StrategyArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Cli,
    Library,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Largest,
    Last,
    Labeled,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("info");
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            bind,
            upload_dir,
            lang,
            backend,
            max_concurrent,
        } => {
            let mut config = ServerConfig::from_env()?;
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            if let Some(dir) = upload_dir {
                config.upload_dir = dir;
            }
            if let Some(lang) = lang {
                config.ocr_language = lang;
            }
            if let Some(backend) = backend {
                config.ocr_backend = match backend {
                    BackendArg::Cli => OcrBackend::Cli,
                    BackendArg::Library => OcrBackend::Library,
                };
            }
            if let Some(limit) = max_concurrent {
                if limit == 0 {
                    return Err(anyhow!("--max-concurrent must be at least 1"));
                }
                config.max_concurrent_recognitions = limit;
            }
            serve(config).await
        }
        Command::Scan {
            file,
            server,
            store_db,
            store_url,
            store_token,
            strategy,
        } => {
            let store: Arc<dyn TransactionStore> = match store_url {
                Some(url) => Arc::new(HttpTransactionStore::new(&url, store_token)),
                None => Arc::new(
                    SqliteTransactionStore::open(&store_db)
                        .with_context(|| format!("Open {}", store_db.display()))?,
                ),
            };
            let extractor = match strategy {
                StrategyArg::Largest => AmountExtractor::with_strategy(LargestAmount),
                StrategyArg::Last => AmountExtractor::with_strategy(LastAmount),
                StrategyArg::Labeled => AmountExtractor::with_strategy(LabeledTotal),
            };
            scan(file, OcrClient::new(&server), store, extractor).await
        }
    }
}

async fn serve(config: ServerConfig) -> Result<()> {
    let engine = engine_for(config.ocr_backend)?;
    let server = ReceiptServer::new(config, engine)?;
    let listener = server.bind().await.context("Failed to bind to address")?;
    server
        .serve(listener, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
}

async fn scan(
    path: PathBuf,
    client: OcrClient,
    store: Arc<dyn TransactionStore>,
    extractor: AmountExtractor,
) -> Result<()> {
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("Read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = ReceiptFile::new(name, mime_from_path(&path), bytes);
    println!("{} ({} • {})", file.name, format_file_size(file.size()), file.mime);

    let intake = ReceiptIntake::with_extractor(client, store, extractor);
    intake.select_file(file)?;
    let outcome = intake.submit().await?;
    intake.close()?;

    println!("\nExtracted Text\n{}", outcome.text);
    match (&outcome.amount, &outcome.draft) {
        (Some(_), Some(draft)) => println!("Amount: {}", format_decimal(draft.amount)),
        _ => println!("Amount: none found"),
    }

    // The transaction is best effort; wait only so the process does not exit
    // before the store has been reached.
    if let Some(pending) = outcome.persist {
        let _ = pending.settled().await;
    }
    Ok(())
}
