//! `epd-import` -- import clients or therapists from a CSV file.
//!
//! Reads the file, proposes a column mapping, prints the preview and the
//! mapping, then uploads the file and follows the server-side job until it
//! completes or fails. Logs go to stderr, views to stdout.
//!
//! # Environment variables
//!
//! | Variable                  | Required | Default                 | Description                      |
//! |---------------------------|----------|-------------------------|----------------------------------|
//! | `EPD_API_URL`             | no       | `http://localhost:3000` | Backend base URL                 |
//! | `EPD_API_TOKEN`           | no       | --                      | Bearer token                     |
//! | `REQUEST_TIMEOUT_SECS`    | no       | `30`                    | Per-request timeout              |
//! | `IMPORT_POLL_INTERVAL_MS` | no       | `1000`                  | Delay between progress polls     |
//! | `IMPORT_MAX_POLLS`        | no       | unbounded               | Give up after this many polls    |

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use epd_client::{ApiClient, ClientConfig};
use epd_core::auto_map::HeuristicPolicy;
use epd_core::csv_preview::ParseMode;
use epd_core::fields::ImportType;
use epd_core::import_progress::ImportProgress;
use epd_import::{
    render, views, ImportConfig, ImportEvent, ImportSession, SelectedFile, SessionError,
};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long to wait for queued progress output after the import returned.
const PRINTER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(version, about = "Import clients or therapists from a CSV file", long_about = None)]
struct Cli {
    /// CSV file to import.
    file: PathBuf,

    /// What the rows in the file describe.
    #[arg(short = 't', long = "type", value_enum, default_value_t = TypeArg::Clients)]
    import_type: TypeArg,

    /// Map a column to a field, e.g. `--map "Roepnaam=first_name"`. Repeatable.
    #[arg(long = "map", value_name = "COLUMN=FIELD", value_parser = parse_override)]
    map: Vec<ColumnOverride>,

    /// Leave a column unmapped. Repeatable.
    #[arg(long = "skip", value_name = "COLUMN")]
    skip: Vec<String>,

    /// Print the preview and mapping, then stop without uploading.
    #[arg(long)]
    dry_run: bool,

    /// Also apply substring header matches instead of only suggesting them.
    #[arg(long)]
    apply_heuristics: bool,

    /// Split records on every comma and ignore quotes, as older exports expect.
    #[arg(long)]
    legacy_csv: bool,

    /// Backend base URL, overrides `EPD_API_URL`.
    #[arg(long)]
    api_url: Option<String>,

    /// Bearer token, overrides `EPD_API_TOKEN`.
    #[arg(long)]
    token: Option<String>,

    /// Print the final results as JSON instead of tables.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TypeArg {
    Clients,
    Therapists,
}

impl From<TypeArg> for ImportType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Clients => ImportType::Clients,
            TypeArg::Therapists => ImportType::Therapists,
        }
    }
}

#[derive(Debug, Clone)]
struct ColumnOverride {
    column: String,
    field: String,
}

fn parse_override(raw: &str) -> Result<ColumnOverride, String> {
    let (column, field) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected COLUMN=FIELD, got '{raw}'"))?;
    let (column, field) = (column.trim(), field.trim());
    if column.is_empty() || field.is_empty() {
        return Err(format!("expected COLUMN=FIELD, got '{raw}'"));
    }
    Ok(ColumnOverride {
        column: column.to_string(),
        field: field.to_string(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "epd_import=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let import_type = ImportType::from(cli.import_type);

    let mut client_config = ClientConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        client_config.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(token) = &cli.token {
        client_config.token = Some(token.clone());
    }

    let mut import_config = ImportConfig::from_env()?;
    if cli.apply_heuristics {
        import_config.heuristic_policy = HeuristicPolicy::Apply;
    }
    if cli.legacy_csv {
        import_config.parse_mode = ParseMode::Legacy;
    }

    tracing::info!(
        api_url = %client_config.base_url,
        %import_type,
        file = %cli.file.display(),
        "Starting epd-import",
    );

    let api = ApiClient::from_config(&client_config)?;
    let session = ImportSession::new(Arc::new(api), import_type, import_config);

    let file = SelectedFile::from_path(&cli.file)
        .await
        .with_context(|| format!("Cannot read {}", cli.file.display()))?;
    session.select_file(file).await?;

    apply_overrides(&session, import_type, &cli).await?;

    let snapshot = session.snapshot().await;
    if let Some(preview) = &snapshot.preview {
        println!("{}", render::render_preview(preview));
    }
    if let Some(editor) = views::build_mapping_editor(&snapshot) {
        println!("{}", render::render_mapping_editor(&editor));
    }

    if cli.dry_run {
        tracing::info!("Dry run, nothing uploaded");
        return Ok(());
    }

    let mut printer = tokio::spawn(print_progress(session.subscribe(), std::io::stdout()));

    let result = tokio::select! {
        result = session.start_import() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, abandoning import");
            session.reset().await;
            Err(SessionError::Superseded)
        }
    };

    // The terminal event is already queued; let the printer drain it.
    if tokio::time::timeout(PRINTER_DRAIN_TIMEOUT, &mut printer).await.is_err() {
        printer.abort();
    }

    match result {
        Ok(progress) => print_results(&progress, cli.json),
        Err(SessionError::Superseded) => bail!("Import cancelled"),
        Err(e) => {
            let snapshot = session.snapshot().await;
            if let Some(progress) = &snapshot.progress {
                print_results(progress, cli.json)?;
            }
            bail!(snapshot.error_message.unwrap_or_else(|| e.user_message()))
        }
    }
}

fn print_results(progress: &ImportProgress, json: bool) -> Result<()> {
    let view = views::build_results(progress);
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("{}", render::render_results(&view));
    }
    Ok(())
}

/// Apply `--skip` and `--map` on top of the proposed mapping.
async fn apply_overrides(
    session: &ImportSession,
    import_type: ImportType,
    cli: &Cli,
) -> Result<()> {
    let headers = session
        .snapshot()
        .await
        .preview
        .map(|p| p.headers)
        .unwrap_or_default();
    let known_column = |column: &str| headers.iter().any(|h| h == column);

    for column in &cli.skip {
        if !known_column(column) {
            bail!("--skip: the file has no column '{column}'");
        }
        session.update_column_mapping(column, None).await;
    }

    for o in &cli.map {
        if !known_column(&o.column) {
            bail!("--map: the file has no column '{}'", o.column);
        }
        if !import_type.has_field(&o.field) {
            let known: Vec<&str> = import_type.fields().iter().map(|f| f.key).collect();
            bail!(
                "--map: '{}' is not a {} field (known: {})",
                o.field,
                import_type.label(),
                known.join(", ")
            );
        }
        session.update_column_mapping(&o.column, Some(&o.field)).await;
    }

    Ok(())
}

/// Print import progress until the import completes, fails or the session
/// is reset. Returns the writer so callers can inspect what was written.
async fn print_progress<W: Write>(
    mut events: broadcast::Receiver<ImportEvent>,
    mut out: W,
) -> std::io::Result<W> {
    loop {
        match events.recv().await {
            Ok(ImportEvent::ImportStarted { import_id, .. }) => {
                writeln!(out, "Upload accepted, import {import_id}")?;
            }
            Ok(ImportEvent::ProgressUpdated { progress, .. }) => {
                writeln!(out, "{}", render::render_progress(&views::build_progress(&progress)))?;
            }
            Ok(ImportEvent::Completed { .. } | ImportEvent::Failed { .. } | ImportEvent::Reset { .. }) => {
                break;
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Progress output fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    out.flush()?;
    Ok(out)
}
