//! Définition et implémentation des commandes CLI
//!
//! - `fetch` : lieu -> requête distante -> GeoJSON intermédiaire projeté
//! - `conflate` : fichier local + fichier distant -> GeoJSON + CSV fusionnés
//! - défaut : pipeline complet (fetch puis conflate), un couple
//!   lieu/fichier par exécution

use std::path::{Path, PathBuf};

use anyhow::{ensure, Result};
use clap::{Args, Subcommand};
use geotable::{conflate, format, normalize, project, Crs, MergeReport};

use crate::config::TagFilter;
use crate::io;
use crate::overpass::OverpassClient;

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch social-infrastructure features for a place into a GeoJSON file
    Fetch {
        /// Place name to query (e.g. a city name)
        #[arg(short, long)]
        place: String,

        /// Output GeoJSON path (défaut : <place>_social_infra.geojson)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Tag filter: preset name (social) or path to a JSON file
        #[arg(long, default_value = "social")]
        filter: String,
    },

    /// Conflate an authoritative local file with a fetched remote file
    Conflate {
        /// Authoritative local GeoJSON file
        #[arg(short, long)]
        local: PathBuf,

        /// Fetched remote GeoJSON file
        #[arg(short, long)]
        remote: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
}

/// Arguments du pipeline complet (commande par défaut)
#[derive(Args)]
pub struct PipelineArgs {
    /// Place name to query remotely
    #[arg(short, long)]
    pub place: String,

    /// Authoritative local GeoJSON file
    #[arg(short, long)]
    pub local: PathBuf,

    /// Intermediate fetched GeoJSON path (défaut : <place>_social_infra.geojson)
    #[arg(long)]
    pub intermediate: Option<PathBuf>,

    /// Tag filter: preset name (social) or path to a JSON file
    #[arg(long, default_value = "social")]
    pub filter: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Sorties de la conflation
#[derive(Args)]
pub struct OutputArgs {
    /// Merged GeoJSON output path
    #[arg(long, default_value = "social_infra_merged.geojson")]
    pub output_geojson: PathBuf,

    /// Merged delimited-text output path
    #[arg(long, default_value = "social_infra_merged.csv")]
    pub output_csv: PathBuf,

    /// Field delimiter for the delimited-text output
    #[arg(long, default_value = ";")]
    pub delimiter: char,

    /// Text encoding for the delimited-text output (utf-8, utf-8-sig, ...)
    #[arg(long, default_value = "utf-8-sig")]
    pub encoding: String,
}

/// Exécute la commande fetch ; retourne le chemin du fichier écrit
pub async fn cmd_fetch(place: &str, output: Option<&Path>, filter_spec: &str) -> Result<PathBuf> {
    let filter = TagFilter::resolve(filter_spec)?;
    let client = OverpassClient::from_env()?;
    let raw = client.fetch(place, &filter).await?;

    let collection = normalize(raw, "remote")?;
    let collection = project(collection)?;

    let output = output.map(Path::to_path_buf).unwrap_or_else(|| {
        PathBuf::from(format!("{}_social_infra.geojson", place))
    });
    io::geojson::write(&collection, &output)?;

    println!("=== Fetch {} ===", place);
    println!("Features: {}", collection.len());
    println!("Saved to: {} ({})", output.display(), Crs::WEB_MERCATOR);

    Ok(output)
}

/// Exécute la commande conflate
pub fn cmd_conflate(local_path: &Path, remote_path: &Path, output: &OutputArgs) -> Result<()> {
    ensure!(
        output.delimiter.is_ascii(),
        "Delimiter must be an ASCII character"
    );

    let local = normalize(io::geojson::read(local_path)?, "local")?;
    let remote = normalize(io::geojson::read(remote_path)?, "remote")?;

    let outcome = conflate(local, remote)?;
    let report = outcome.report;
    let merged = format::order_columns(outcome.collection);

    // Le chemin géométrique conserve les valeurs nulles
    io::geojson::write(&merged, &output.output_geojson)?;

    // Le chemin à plat les remplace par des champs vides
    let flat = format::fill_nulls(merged);
    io::csv::write(
        &flat,
        &output.output_csv,
        output.delimiter as u8,
        &output.encoding,
    )?;

    print_summary(&report, &output.output_geojson, &output.output_csv);
    Ok(())
}

/// Exécute le pipeline complet : fetch puis conflate
pub async fn cmd_run(args: &PipelineArgs) -> Result<()> {
    let intermediate =
        cmd_fetch(&args.place, args.intermediate.as_deref(), &args.filter).await?;
    cmd_conflate(&args.local, &intermediate, &args.output)
}

fn print_summary(report: &MergeReport, geojson: &Path, csv: &Path) {
    println!("=== Conflation ===");
    println!("Matched ids: {}", report.matched);
    println!("Local only: {}", report.primary_only);
    println!("Remote only: {}", report.secondary_only);
    println!("Dropped (no geometry): {}", report.dropped_no_geometry);
    println!("Saved to: {} and {}", geojson.display(), csv.display());
}
