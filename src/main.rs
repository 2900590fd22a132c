use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vault_client::ExportClient;
use vault_config::VaultConfig;
use vault_export::{DateRangePreset, DirectorySink, ExportJob, Exporter, NoticeKind};

#[derive(Parser)]
#[command(name = "convo-vault")]
#[command(about = "Export mirrored CRM conversations to CSV", long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every message of a conversation to CSV
    Export {
        /// Conversation to export
        #[arg(long)]
        conversation: String,

        /// Location (sub-account) owning the conversation
        #[arg(long)]
        location: String,

        /// Contact name used as the file name prefix
        #[arg(long)]
        contact_name: Option<String>,

        /// Preset range: 7days, 1month or 6months
        #[arg(long, conflicts_with_all = ["start", "end"])]
        range: Option<String>,

        /// Custom range start (YYYY-MM-DD)
        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,

        /// Custom range end (YYYY-MM-DD)
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,

        /// Directory to write CSV files into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Export {
            conversation,
            location,
            contact_name,
            range,
            start,
            end,
            output,
        } => {
            let preset = match (range, start, end) {
                (Some(name), _, _) => Some(name.parse::<DateRangePreset>()?),
                (None, Some(start), Some(end)) => Some(DateRangePreset::Custom { start, end }),
                _ => None,
            };
            let job = build_job(&config, conversation, location, contact_name, preset)?;
            run_export(&config, job, output).await?;
        }
        Commands::Config => {
            print!("{}", serde_yaml::to_string(&config.redacted())?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<VaultConfig> {
    let path = path.cloned().unwrap_or_else(VaultConfig::default_config_path);
    let config = if path.exists() {
        info!("Loading configuration from: {:?}", path);
        VaultConfig::from_yaml(&path)?
    } else {
        info!("No config file at {:?}, using environment", path);
        VaultConfig::from_env()?
    };
    Ok(config)
}

fn build_job(
    config: &VaultConfig,
    conversation: String,
    location: String,
    contact_name: Option<String>,
    preset: Option<DateRangePreset>,
) -> Result<ExportJob> {
    let today = Utc::now().date_naive();
    let date_range = match preset {
        Some(preset) => Some(preset.resolve(today, config.export.max_range_months)?),
        None => None,
    };

    Ok(ExportJob::new(conversation, location)
        .with_contact_name(contact_name)
        .with_date_range(date_range))
}

async fn run_export(config: &VaultConfig, job: ExportJob, output: Option<PathBuf>) -> Result<()> {
    let client = ExportClient::from_config(config)?;
    let output_dir = output.unwrap_or_else(|| config.export.output_dir.clone());
    let exporter = Exporter::from_settings(client, DirectorySink::new(output_dir), &config.export);

    println!("\n📥 Exporting conversation {}", job.conversation_id);
    println!("═══════════════════════════════════════");

    let (summary, notice) = exporter.run_with_notice(&job).await;

    println!("\n{notice}");

    if let Some(summary) = summary {
        for file in &summary.files {
            println!("\n📄 {}", file.path.display());
        }
        println!("\n📊 Fetch Statistics:");
        println!("  Requests: {}", summary.stats.total_requests);
        println!("  Records: {}", summary.stats.total_records);
        println!("  Elapsed: {} ms", summary.stats.elapsed_ms);
        for (channel, stats) in &summary.stats.channels {
            if stats.truncated {
                println!(
                    "  ⚠️  {} stopped after {} batches; remaining records were not exported",
                    channel, stats.batches
                );
            }
        }
    }

    if notice.kind == NoticeKind::Error {
        bail!("export failed");
    }
    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}
