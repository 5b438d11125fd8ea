use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;

mod corrections;
mod diagnostics;
mod error;
mod export;
mod identifiers;
mod kilometrage;
mod load_inputs;
mod normalize_runs;
mod prepare_graphs;
mod progress;
mod records;
mod shortcuts;
mod station_graph;
mod stations;
mod stop_graph;
mod temporal_graph;

use corrections::CorrectionSet;
use load_inputs::InputPaths;
use prepare_graphs::Settings;

#[derive(Parser)]
#[command(name = "rail-graphs")]
#[command(about = "Builds graph representations of the Swiss railway network from timetable data", long_about = None)]
struct Cli {
    /// Log every dropped record and edge decision
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Space-of-stops graph: consecutive stops of every run
    Stops(GraphArgs),
    /// Space-of-stations graph: physical adjacency without shortcuts
    Stations(GraphArgs),
    /// Time-expanded graph: every later stop of a run
    Temporal(GraphArgs),
    /// All three graphs from one pass over the inputs
    All(GraphArgs),
    /// Print the built-in correction tables as JSON
    Corrections,
}

#[derive(Args)]
struct GraphArgs {
    /// Stop events of one operating day
    #[arg(long, default_value = "raw/2025-03-05_istdaten.csv")]
    stop_events: PathBuf,
    /// Service point reference with coordinates
    #[arg(long, default_value = "raw/actual_date-swiss-only-service_point-2025-03-06.csv")]
    service_points: PathBuf,
    /// Average daily ridership per station
    #[arg(long, default_value = "raw/t01x-sbb-cff-ffs-frequentia-2023.csv")]
    ridership: PathBuf,
    /// Operating points with their kilometre position on each line
    #[arg(long, default_value = "raw/linie-mit-betriebspunkten.csv")]
    lines: PathBuf,
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
    /// Operating day to keep (YYYY-MM-DD), defaults to the day of the first stop event
    #[arg(long)]
    service_day: Option<NaiveDate>,
    /// JSON file replacing the built-in correction tables
    #[arg(long)]
    corrections: Option<PathBuf>,
}

impl GraphArgs {
    fn into_settings(self) -> Result<Settings> {
        let corrections = match &self.corrections {
            Some(path) => CorrectionSet::from_json_file(path)?,
            None => CorrectionSet::builtin(),
        };
        Ok(Settings {
            inputs: InputPaths {
                stop_events: self.stop_events,
                service_points: self.service_points,
                ridership: self.ridership,
                lines: self.lines,
            },
            output_dir: self.output_dir,
            service_day: self.service_day,
            corrections,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    SimpleLogger::new()
        .with_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .env()
        .init()?;

    match cli.command {
        Command::Stops(args) => prepare_graphs::prepare_stop_graph(&args.into_settings()?).await,
        Command::Stations(args) => {
            prepare_graphs::prepare_station_graph(&args.into_settings()?).await
        }
        Command::Temporal(args) => {
            prepare_graphs::prepare_temporal_graph(&args.into_settings()?).await
        }
        Command::All(args) => prepare_graphs::prepare_all(&args.into_settings()?).await,
        Command::Corrections => {
            println!(
                "{}",
                serde_json::to_string_pretty(&CorrectionSet::builtin())?
            );
            Ok(())
        }
    }
}
