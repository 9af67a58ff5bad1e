use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use district_prep::error::{exit_code, ConvertError};
use district_prep::{assign, config, convert, dissolve, headers, server};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML config (defaults to $DISTRICT_PREP_CONFIG, then ./config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split simplified districts into per-state files by nearest state
    Split {
        #[arg(long, value_name = "FILE")]
        districts: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        states: Option<PathBuf>,
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },
    /// Reassign districts to the state containing their centroid and rewrite per-state files
    Refine {
        #[arg(long, value_name = "FILE")]
        districts: Option<PathBuf>,
        #[arg(long, value_name = "DIR")]
        states_dir: Option<PathBuf>,
    },
    /// Dissolve each per-state file into a single state outline
    Dissolve {
        #[arg(long, value_name = "DIR")]
        input_dir: Option<PathBuf>,
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
    /// Convert a shapefile into a GeoJSON FeatureCollection
    Convert { input: PathBuf, output: PathBuf },
    /// Serve the built web app with fixed cache and security headers
    Preview {
        port: Option<u16>,
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },
    /// Report the response headers of a running preview server
    CheckHeaders { url: Option<String> },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut app_config = config::AppConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Split { districts, states, out_dir } => {
            let split = &mut app_config.split;
            if let Some(p) = districts { split.districts = p; }
            if let Some(p) = states { split.states = p; }
            if let Some(p) = out_dir { split.out_dir = p; }
            let report = assign::split(split)?;
            println!(
                "Done. states written: {} unassigned districts: {}",
                report.written, report.unassigned
            );
        }
        Commands::Refine { districts, states_dir } => {
            let refine = &mut app_config.refine;
            if let Some(p) = districts { refine.districts = p; }
            if let Some(p) = states_dir { refine.states_dir = p; }
            let report = assign::refine(refine)?;
            println!(
                "Done. total districts processed: {} reassignments detected: {} unassigned: {} state files written: {}",
                report.total, report.reassignments, report.unassigned, report.written
            );
        }
        Commands::Dissolve { input_dir, output_dir } => {
            let settings = &mut app_config.dissolve;
            if let Some(p) = input_dir { settings.input_dir = p; }
            if let Some(p) = output_dir { settings.output_dir = p; }
            dissolve::dissolve(settings)?;
        }
        Commands::Convert { input, output } => {
            convert::convert(&input, &output)?;
        }
        Commands::Preview { port, root } => {
            let preview = &mut app_config.preview;
            if let Some(p) = port { preview.port = p; }
            if let Some(r) = root { preview.root = r; }
            server::start_server(preview).await?;
        }
        Commands::CheckHeaders { url } => {
            let target = url.unwrap_or(app_config.check.target);
            headers::check(&target).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(ConvertError::Usage.exit_code()),
            };
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}
