//! CLI commands for kestrel-route.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::extract::{run_extraction, ExtractorConfig, ExtractionResult};
use crate::extract::profile::CarProfile;
use crate::extract::source::PbfSource;
use crate::formats::contracted::ContractedFile;
use crate::formats::names::NamesFile;
use crate::query::facade::ContractedGraph;
use crate::query::search::SearchEngine;

#[derive(Parser)]
#[command(name = "kestrel-route")]
#[command(about = "OSM road-network extraction and CH routing", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract a routing graph from an OSM PBF dump
    Extract {
        /// Input OSM PBF file
        input: PathBuf,

        /// Output base path; artifacts get .osrm/.restrictions/.names/.timestamp
        output: PathBuf,

        /// Routing profile
        #[arg(short, long, default_value = "car")]
        profile: String,

        /// Number of worker threads (defaults to all cores)
        #[arg(short, long)]
        threads: Option<usize>,
    },
    /// Find a route between two nodes of a contracted graph
    Route {
        /// Contracted graph file
        graph: PathBuf,

        /// Names file for street-name output
        #[arg(long)]
        names: Option<PathBuf>,

        /// Source node id
        #[arg(long)]
        from: u32,

        /// Target node id
        #[arg(long)]
        to: u32,
    },
}

/// Run the CLI, returning the process exit code.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Extract {
            input,
            output,
            profile,
            threads,
        } => {
            if profile != "car" {
                bail!("Unknown profile: {}", profile);
            }
            println!("Input file: {}", input.display());

            let mut source = PbfSource::open(&input)?;
            let config = ExtractorConfig::from_base(&output, threads);
            match run_extraction(&mut source, || CarProfile, &config)? {
                ExtractionResult::Completed(_) => {
                    println!("Extraction finished; artifacts at {}.*", output.display());
                    Ok(0)
                }
                ExtractionResult::EmptyInput => Ok(1),
            }
        }
        Commands::Route {
            graph,
            names,
            from,
            to,
        } => {
            let (node_count, records) = ContractedFile::read(&graph)?;
            let graph = ContractedGraph::from_records(node_count, &records);
            let names_table = names.map(NamesFile::read).transpose()?;

            let mut engine = SearchEngine::new(&graph);
            let route = match engine.route(&[(from, 0)], &[(to, 0)])? {
                Some(route) => route,
                None => {
                    eprintln!("No route found from {} to {}", from, to);
                    return Ok(1);
                }
            };

            println!("Route weight: {:.1}s", route.weight as f64 / 10.0);
            println!("Segments: {}", route.segments.len());
            for segment in &route.segments {
                let name = names_table
                    .as_ref()
                    .and_then(|table| table.get(segment.name_id))
                    .unwrap_or("");
                println!(
                    "  edge {:>6}  {:>7.1}s  {}",
                    segment.edge_id,
                    segment.distance as f64 / 10.0,
                    name
                );
            }
            Ok(0)
        }
    }
}
