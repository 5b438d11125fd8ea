//! Builds the three graph representations from the raw inputs and writes
//! them to the output directory.
//!
//! All representations share one loading and normalization stage. Each
//! builder gets its own copy of the loading diagnostics, so every
//! `diagnostics_<repr>.json` is complete on its own.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::corrections::{CorrectionSet, ResolvedCorrections};
use crate::diagnostics::Diagnostics;
use crate::export::{self, TemporalEdgeWriter};
use crate::load_inputs::{self, InputPaths};
use crate::normalize_runs::{self, RunTable};
use crate::station_graph;
use crate::stations::StationRegistry;
use crate::stop_graph;
use crate::temporal_graph;

pub const STOP_GRAPH: &str = "SoSto";
pub const STATION_GRAPH: &str = "SoSta";
pub const TEMPORAL_GRAPH: &str = "temporal";

#[derive(Debug, Clone)]
pub struct Settings {
    pub inputs: InputPaths,
    pub output_dir: PathBuf,
    pub service_day: Option<NaiveDate>,
    pub corrections: CorrectionSet,
}

/// Everything the graph builders read. Immutable once loaded.
#[derive(Debug)]
pub struct PreparedInputs {
    pub registry: StationRegistry,
    pub runs: RunTable,
    pub corrections: ResolvedCorrections,
    pub service_day: NaiveDate,
    pub diagnostics: Diagnostics,
}

pub async fn prepare_inputs(settings: &Settings) -> Result<PreparedInputs> {
    log::info!("Preparing inputs");
    let mut diagnostics = Diagnostics::new("inputs");
    let registry = load_inputs::load_stations(
        &settings.inputs.service_points,
        &settings.inputs.ridership,
        &settings.corrections,
        &mut diagnostics,
    )?;
    let corrections = settings
        .corrections
        .resolve(&registry)
        .context("Failed to resolve correction tables")?;
    let (events, service_day) = load_inputs::load_stop_events(
        &settings.inputs.stop_events,
        &registry,
        &settings.corrections,
        settings.service_day,
        &mut diagnostics,
    )?;
    let runs = normalize_runs::normalize(&events, &mut diagnostics);
    if runs.is_empty() {
        log::warn!("No run on {} has two usable stops, all graphs will be empty.", service_day);
    }
    Ok(PreparedInputs {
        registry,
        runs,
        corrections,
        service_day,
        diagnostics,
    })
}

fn output_path(output_dir: &Path, prefix: &str, representation: &str, extension: &str) -> PathBuf {
    output_dir.join(format!("{}_{}.{}", prefix, representation, extension))
}

fn finish_diagnostics(output_dir: &Path, diagnostics: &Diagnostics) -> Result<()> {
    diagnostics.log_summary();
    export::write_diagnostics(
        &output_path(output_dir, "diagnostics", &diagnostics.representation, "json"),
        diagnostics,
    )
}

pub fn write_stop_graph(inputs: &PreparedInputs, output_dir: &Path) -> Result<()> {
    log::info!("Preparing space-of-stops graph");
    let mut diagnostics = inputs.diagnostics.derive(STOP_GRAPH);
    let graph = stop_graph::build_stop_graph(
        &inputs.runs,
        &inputs.corrections.stop_graph_exclusions,
        &mut diagnostics,
    );
    let nodes = inputs.registry.node_rows(&graph.stations)?;
    export::write_rows(&output_path(output_dir, "nodelist", STOP_GRAPH, "csv"), &nodes)?;
    export::write_rows(
        &output_path(output_dir, "edgelist", STOP_GRAPH, "csv"),
        &graph.edge_rows(),
    )?;
    finish_diagnostics(output_dir, &diagnostics)
}

pub fn write_station_graph(
    inputs: &PreparedInputs,
    lines_path: &Path,
    output_dir: &Path,
) -> Result<()> {
    log::info!("Preparing space-of-stations graph");
    let mut diagnostics = inputs.diagnostics.derive(STATION_GRAPH);
    let stop_graph = stop_graph::build_stop_graph(
        &inputs.runs,
        &inputs.corrections.stop_graph_exclusions,
        &mut diagnostics,
    );
    let line_points = load_inputs::load_line_points(lines_path, &mut diagnostics)?;
    let graph = station_graph::build_station_graph(
        &stop_graph,
        &inputs.runs,
        &line_points,
        &inputs.corrections,
        &inputs.registry,
        &mut diagnostics,
    )?;
    let nodes = inputs.registry.node_rows(&graph.stations)?;
    export::write_rows(
        &output_path(output_dir, "nodelist", STATION_GRAPH, "csv"),
        &nodes,
    )?;
    export::write_rows(
        &output_path(output_dir, "edgelist", STATION_GRAPH, "csv"),
        &graph.edge_rows(),
    )?;
    finish_diagnostics(output_dir, &diagnostics)
}

pub fn write_temporal_graph(inputs: &PreparedInputs, output_dir: &Path) -> Result<()> {
    log::info!("Preparing temporal graph for {}", inputs.service_day);
    let mut diagnostics = inputs.diagnostics.derive(TEMPORAL_GRAPH);
    let reference_midnight = inputs
        .service_day
        .and_hms_opt(0, 0, 0)
        .context("Service day has no midnight")?;
    let mut writer =
        TemporalEdgeWriter::create(&output_path(output_dir, "edgelist", TEMPORAL_GRAPH, "csv"))?;
    let summary = temporal_graph::expand_runs(
        &inputs.runs,
        reference_midnight,
        &mut diagnostics,
        |edges| writer.write_run(edges),
    )?;
    let rows = writer.finish()?;
    log::info!("Wrote {} temporal edges.", rows);

    let nodes = inputs.registry.node_rows(&summary.stations)?;
    export::write_rows(
        &output_path(output_dir, "nodelist", TEMPORAL_GRAPH, "csv"),
        &nodes,
    )?;
    finish_diagnostics(output_dir, &diagnostics)
}

fn create_output_dir(settings: &Settings) -> Result<()> {
    std::fs::create_dir_all(&settings.output_dir)
        .with_context(|| format!("Failed to create {:?}", settings.output_dir))
}

pub async fn prepare_stop_graph(settings: &Settings) -> Result<()> {
    create_output_dir(settings)?;
    let inputs = prepare_inputs(settings).await?;
    write_stop_graph(&inputs, &settings.output_dir)
}

pub async fn prepare_station_graph(settings: &Settings) -> Result<()> {
    create_output_dir(settings)?;
    let inputs = prepare_inputs(settings).await?;
    write_station_graph(&inputs, &settings.inputs.lines, &settings.output_dir)
}

pub async fn prepare_temporal_graph(settings: &Settings) -> Result<()> {
    create_output_dir(settings)?;
    let inputs = prepare_inputs(settings).await?;
    write_temporal_graph(&inputs, &settings.output_dir)
}

/// Loads the inputs once and builds the three representations on blocking
/// worker threads.
pub async fn prepare_all(settings: &Settings) -> Result<()> {
    create_output_dir(settings)?;
    let inputs = Arc::new(prepare_inputs(settings).await?);
    let output_dir = settings.output_dir.clone();
    let lines_path = settings.inputs.lines.clone();

    let stops = tokio::task::spawn_blocking({
        let inputs = inputs.clone();
        let output_dir = output_dir.clone();
        move || write_stop_graph(&inputs, &output_dir)
    });
    let stations = tokio::task::spawn_blocking({
        let inputs = inputs.clone();
        let output_dir = output_dir.clone();
        move || write_station_graph(&inputs, &lines_path, &output_dir)
    });
    let temporal = tokio::task::spawn_blocking({
        let inputs = inputs.clone();
        move || write_temporal_graph(&inputs, &output_dir)
    });

    let (stops, stations, temporal) =
        futures::try_join!(stops, stations, temporal).context("A graph builder panicked")?;
    stops.context("Failed to build the space-of-stops graph")?;
    stations.context("Failed to build the space-of-stations graph")?;
    temporal.context("Failed to build the temporal graph")?;
    log::info!("All graphs written to {:?}", settings.output_dir);
    Ok(())
}
