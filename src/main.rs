use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use quoter::api::{self, AppState};
use quoter::config::Config;
use quoter::export::{ExportFormat, Exporter, PdfRenderer};
use quoter::views::Views;

#[derive(Parser)]
#[command(name = "quoter")]
#[command(about = "Price project line items from labor resources and export client quotes")]
struct Cli {
    /// SQLite database file (overrides QUOTER_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind (overrides QUOTER_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port for HTTP (overrides QUOTER_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create or upgrade the database schema and exit
    Migrate,
    /// Export a quote to a file or stdout
    Export {
        /// Quote ID
        quote_id: Uuid,

        #[arg(short, long, value_enum, default_value_t = FormatArg::Xlsx)]
        format: FormatArg,

        /// Output file. Writes to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Xlsx,
    Csv,
    Html,
    Pdf,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Xlsx => ExportFormat::Xlsx,
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Html => ExportFormat::Html,
            FormatArg::Pdf => ExportFormat::Pdf,
        }
    }
}

fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "quoter=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // Export may write the document to stdout
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let db = config.open_database()?;
    let state = AppState::from_config(db, &config)?;
    let app = api::create_router(state, &config);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Quoter listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn export(
    config: Config,
    quote_id: Uuid,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let db = config.open_database()?;
    let detail = db
        .get_quote_detail(quote_id)?
        .ok_or_else(|| anyhow::anyhow!("Quote {} not found", quote_id))?;

    let exporter = Exporter::new(
        std::sync::Arc::new(Views::new()?),
        PdfRenderer::new(config.wkhtmltopdf.clone()),
    );
    let document = exporter.export(&detail, format).await?;

    match output {
        Some(path) => {
            std::fs::write(&path, &document.bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => std::io::stdout().write_all(&document.bytes)?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = matches!(cli.command, Some(Commands::Export { .. }));
    init_tracing(use_stderr);

    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.database_path = Some(db);
    }

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await?;
        }
        Some(Commands::Migrate) => {
            config.open_database()?;
            tracing::info!("Database is up to date");
        }
        Some(Commands::Export {
            quote_id,
            format,
            output,
        }) => {
            export(config, quote_id, format.into(), output).await?;
        }
        None => serve(config).await?,
    }

    Ok(())
}
