use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use billcapture::BillPipeline;
use billcapture_core::Settings;
use billcapture_netsuite::{build_auth_header, sign, SignedRequestContext};
use billcapture_ocr::{DocumentExtractor, ExtractionProfile, HttpFileSource, InferenceDocument};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "billcapture", version, about = "Push OCR'd vendor bills into NetSuite")]
struct Cli {
    /// TOML settings file; BILLCAPTURE_* environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract a bill from an inference result JSON and create it in NetSuite.
    Process {
        input: PathBuf,
        /// Also write the line items to this CSV file.
        #[arg(long)]
        export_csv: Option<PathBuf>,
        /// Print the payload instead of sending it.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print a freshly signed Authorization header for the configured restlet.
    Sign {
        #[arg(long, default_value = "POST")]
        method: String,
    },
}

fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real deployments use the environment directly.
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Command::Process { input, export_csv, dry_run } => {
            let document = read_inference(&input)?;
            if dry_run {
                return print_payload(config, &document);
            }
            let settings = Settings::load(config).context("loading settings")?;
            let pipeline = BillPipeline::from_settings(&settings)?.with_csv_export(export_csv);
            pipeline
                .handle(document)
                .with_context(|| format!("processing {}", input.display()))?;
        }
        Command::Sign { method } => {
            let settings = Settings::load(config).context("loading settings")?;
            let ctx = SignedRequestContext::new(&settings.endpoint, &method);
            let signature = sign(&settings.credentials, &ctx)?;
            println!("{}", settings.endpoint.request_url());
            println!("Authorization: {}", build_auth_header(&settings.credentials, &ctx, &signature));
        }
    }
    Ok(())
}

fn read_inference(path: &Path) -> anyhow::Result<InferenceDocument> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    InferenceDocument::from_json(&json).with_context(|| format!("parsing {}", path.display()))
}

fn print_payload(config: Option<&Path>, document: &InferenceDocument) -> anyhow::Result<()> {
    let settings = Settings::read(config).context("loading settings")?;
    let files = HttpFileSource::new(Duration::from_secs(settings.http.timeout_secs))?;
    let extractor = DocumentExtractor::new(ExtractionProfile::from_settings(&settings.extraction), files);
    let payload = extractor.extract(document);
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
