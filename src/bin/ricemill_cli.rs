use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use ricemill_procurement::{
    auth::UserId,
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::{DestinationPool, Variety},
    events::{Event, EventSender},
    handlers::AppServices,
    services::cmr_integration::{
        BulkImportSummary, CmrImportRecord, ImportOptions, ImportOutcome, IntegratedAckData,
    },
};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;
    let user = cli.user.ok_or_else(|| anyhow!("--user <uuid> is required"));

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&context.db)
                .await
                .context("failed to run migrations")?;
            if !cli.json {
                println!("Migrations applied");
            }
        }
        Commands::Import(args) => handle_import(&context, user?, args, cli.json).await?,
        Commands::Sync { ack_number } => {
            handle_sync(&context, user?, &ack_number, cli.json).await?
        }
        Commands::Show { ack_number } => {
            handle_show(&context, user?, &ack_number, cli.json).await?
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "ricemill",
    about = "Import CMR delivery sheets and reconcile ACK productions with lorry freight",
    version
)]
struct Cli {
    #[arg(long, global = true, help = "User id that owns the records")]
    user: Option<UserId>,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Bulk-import CMR records from a JSON array
    Import(ImportArgs),
    /// Create a freight bill for an existing ACK production
    Sync { ack_number: String },
    /// Show the delivery, production and freight recorded for an ACK
    Show { ack_number: String },
}

#[derive(Args)]
struct ImportArgs {
    #[arg(long, help = "Path to a JSON file holding an array of CMR records")]
    file: PathBuf,
    #[arg(long, help = "Season tag for the imported records")]
    season: Option<String>,
    #[arg(long, help = "Destination pool (fci, central, state)")]
    destination: Option<DestinationPool>,
    #[arg(long, help = "Rice variety (raw, boiled)")]
    variety: Option<Variety>,
    #[arg(long, help = "Standard lot size in quintals")]
    quantity: Option<Decimal>,
    #[arg(long, help = "Freight rate per quintal")]
    rate: Option<Decimal>,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Import even when the ACK number already exists"
    )]
    no_skip: bool,
}

impl ImportArgs {
    fn options(&self) -> ImportOptions {
        ImportOptions {
            season: self.season.clone(),
            destination: self.destination,
            variety: self.variety,
            standard_quantity_qtls: self.quantity,
            freight_rate: self.rate,
            skip_if_exists: !self.no_skip,
        }
    }
}

struct CliContext {
    db: Arc<DbPool>,
    services: AppServices,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config: AppConfig =
            config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        let db = Arc::new(db_pool);

        let (event_tx, mut event_rx) = mpsc::channel::<Event>(32);
        let event_sender = Arc::new(EventSender::new(event_tx));

        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                debug!(target: "ricemill_cli", event = ?event, "received async event");
            }
        });

        let services = AppServices::new(db.clone(), event_sender, config.integration.clone());

        Ok(Self { db, services })
    }
}

async fn handle_import(
    context: &CliContext,
    user: UserId,
    args: ImportArgs,
    json: bool,
) -> Result<()> {
    let raw = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let records: Vec<CmrImportRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of CMR records", args.file.display()))?;

    let summary = context
        .services
        .integration
        .bulk_import_with_progress(user, &records, &args.options(), |progress| {
            eprintln!(
                "[{}/{}] importing ACK {}",
                progress.current, progress.total, progress.ack_number
            );
        })
        .await;

    if json {
        print_json(&summary)?;
    } else {
        render_summary(&summary);
    }

    Ok(())
}

async fn handle_sync(
    context: &CliContext,
    user: UserId,
    ack_number: &str,
    json: bool,
) -> Result<()> {
    let synced = context
        .services
        .integration
        .sync_ack_production_to_freight(user, ack_number)
        .await;

    if json {
        print_json(&serde_json::json!({ "ack_number": ack_number, "synced": synced }))?;
    } else if synced {
        println!("Freight created for ACK {}", ack_number);
    } else {
        println!("No freight created for ACK {} (see logs)", ack_number);
    }

    Ok(())
}

async fn handle_show(
    context: &CliContext,
    user: UserId,
    ack_number: &str,
    json: bool,
) -> Result<()> {
    let data = context
        .services
        .integration
        .integrated_ack_data(user, ack_number)
        .await;

    if json {
        print_json(&data)?;
    } else {
        render_integrated(ack_number, &data);
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_summary(summary: &BulkImportSummary) {
    println!(
        "Processed {} • imported {} • skipped {} • failed {}",
        summary.total_processed, summary.successful, summary.skipped, summary.failed
    );
    for outcome in &summary.results {
        match outcome {
            ImportOutcome::Imported { ack_number, .. } => println!("- {} imported", ack_number),
            ImportOutcome::Skipped { ack_number, reason } => {
                println!("- {} skipped: {}", ack_number, reason)
            }
            ImportOutcome::Failed {
                ack_number,
                stage,
                error,
                ..
            } => println!("- {} failed at {}: {}", ack_number, stage, error),
        }
    }
}

fn render_integrated(ack_number: &str, data: &IntegratedAckData) {
    if data.is_empty() {
        println!("Nothing recorded for ACK {}", ack_number);
        return;
    }

    println!("ACK {}", ack_number);
    match &data.cmr_delivery {
        Some(d) => println!(
            "  CMR delivery   {} • {} qtls • paddy {} qtls • dumping {}",
            d.delivery_date, d.cmr_quantity_qtls, d.paddy_consumed_qtls, d.dumping_status
        ),
        None => println!("  CMR delivery   -"),
    }
    match &data.ack_production {
        Some(p) => println!(
            "  ACK production {} • raw {} qtls • FRK {} qtls",
            p.production_date, p.raw_rice_qty, p.frk_qty
        ),
        None => println!("  ACK production -"),
    }
    match &data.lorry_freight {
        Some(f) => println!(
            "  Lorry freight  {} • total {} • balance {} • {}",
            f.vehicle_number, f.total_freight, f.balance_due, f.payment_status
        ),
        None => println!("  Lorry freight  -"),
    }
}
