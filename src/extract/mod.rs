//! Extraction pipeline driver.
//!
//! Buffers from the OSM source are classified in parallel; each worker gets
//! a thread-local profile evaluator and restriction parser. The classified
//! results are drained serially in original buffer order, which pins the
//! extraction output to the input order regardless of scheduling.

pub mod containers;
pub mod profile;
pub mod restrictions;
pub mod source;

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use containers::{ExtractionContainers, PrepareStats};
use profile::{ExtractionNode, ExtractionWay, Profile};
use restrictions::{InputRestriction, RestrictionParser};
use source::{OsmEntity, OsmSource};

pub struct ExtractorConfig {
    pub requested_threads: Option<usize>,
    pub output_path: PathBuf,
    pub restrictions_path: PathBuf,
    pub names_path: PathBuf,
    pub timestamp_path: PathBuf,
}

impl ExtractorConfig {
    /// Derive the artifact paths from a single output base path.
    pub fn from_base(base: &std::path::Path, requested_threads: Option<usize>) -> Self {
        let with_extension = |ext: &str| {
            let mut path = base.as_os_str().to_os_string();
            path.push(ext);
            PathBuf::from(path)
        };
        Self {
            requested_threads,
            output_path: with_extension(".osrm"),
            restrictions_path: with_extension(".restrictions"),
            names_path: with_extension(".names"),
            timestamp_path: with_extension(".timestamp"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExtractionReport {
    pub nodes: u64,
    pub ways: u64,
    pub relations: u64,
    pub others: u64,
    pub invalid_entities: u64,
    pub stats: PrepareStats,
}

#[derive(Debug, Clone, Copy)]
pub enum ExtractionResult {
    Completed(ExtractionReport),
    EmptyInput,
}

enum ClassifiedEntity {
    Node(ExtractionNode),
    Way(ExtractionWay),
    Restriction(Option<InputRestriction>),
    Other,
    Invalid,
}

/// Run the full extraction: parse, classify, accumulate, prepare, persist.
pub fn run_extraction<S, P, F>(
    source: &mut S,
    make_profile: F,
    config: &ExtractorConfig,
) -> Result<ExtractionResult>
where
    S: OsmSource,
    P: Profile,
    F: Fn() -> P + Sync,
{
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let threads = config
        .requested_threads
        .unwrap_or(available)
        .min(available)
        .max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("Failed to build worker pool")?;
    println!("Threads: {}", threads);

    let mut primary = make_profile();
    primary.source_init()?;
    println!("Profile: {}", primary.name());

    let timestamp = source
        .header()
        .replication_timestamp
        .clone()
        .unwrap_or_else(|| "n/a".to_string());
    println!("Timestamp: {}", timestamp);
    std::fs::write(&config.timestamp_path, &timestamp)
        .with_context(|| format!("Failed to write {}", config.timestamp_path.display()))?;

    let nodes = AtomicU64::new(0);
    let ways = AtomicU64::new(0);
    let relations = AtomicU64::new(0);
    let others = AtomicU64::new(0);
    let invalid = AtomicU64::new(0);

    println!("Parsing in progress...");
    let mut containers = ExtractionContainers::new();
    while let Some(buffer) = source.read()? {
        let classified: Vec<ClassifiedEntity> = pool.install(|| {
            buffer
                .par_iter()
                .map_init(
                    || {
                        let profile = make_profile();
                        let parser = RestrictionParser::new(&profile);
                        (profile, parser)
                    },
                    |(profile, parser), entity| match entity {
                        OsmEntity::Node(node) => {
                            nodes.fetch_add(1, Ordering::Relaxed);
                            match profile.evaluate_node(node) {
                                Ok(result) => ClassifiedEntity::Node(result),
                                Err(_) => {
                                    invalid.fetch_add(1, Ordering::Relaxed);
                                    ClassifiedEntity::Invalid
                                }
                            }
                        }
                        OsmEntity::Way(way) => {
                            ways.fetch_add(1, Ordering::Relaxed);
                            match profile.evaluate_way(way) {
                                Ok(result) => ClassifiedEntity::Way(result),
                                Err(_) => {
                                    invalid.fetch_add(1, Ordering::Relaxed);
                                    ClassifiedEntity::Invalid
                                }
                            }
                        }
                        OsmEntity::Relation(relation) => {
                            relations.fetch_add(1, Ordering::Relaxed);
                            ClassifiedEntity::Restriction(parser.try_parse(relation))
                        }
                        OsmEntity::Other => {
                            others.fetch_add(1, Ordering::Relaxed);
                            ClassifiedEntity::Other
                        }
                    },
                )
                .collect()
        });

        // Serial drain in original buffer-index order: all nodes, then all
        // ways, then all restrictions.
        for (entity, result) in buffer.iter().zip(&classified) {
            if let (OsmEntity::Node(raw), ClassifiedEntity::Node(node)) = (entity, result) {
                containers.process_node(raw, node);
            }
        }
        for result in &classified {
            if let ClassifiedEntity::Way(way) = result {
                containers.process_way(way);
            }
        }
        for result in &classified {
            if let ClassifiedEntity::Restriction(restriction) = result {
                containers.process_restriction(*restriction);
            }
        }
    }

    let report_counts = (
        nodes.into_inner(),
        ways.into_inner(),
        relations.into_inner(),
        others.into_inner(),
        invalid.into_inner(),
    );
    println!(
        "Raw input contains {} nodes, {} ways, {} relations, {} other entities",
        report_counts.0, report_counts.1, report_counts.2, report_counts.3
    );
    if report_counts.4 > 0 {
        println!(
            "{} entities dropped due to profile errors",
            report_counts.4
        );
    }

    if containers.edge_count() == 0 {
        eprintln!("The input data is empty, exiting.");
        return Ok(ExtractionResult::EmptyInput);
    }

    let stats = containers.prepare_data(
        &config.output_path,
        &config.restrictions_path,
        &config.names_path,
        &primary,
    )?;
    println!(
        "Extraction wrote {} nodes, {} edges, {} restrictions ({} bad restrictions dropped)",
        stats.node_count, stats.edge_count, stats.restriction_count, stats.bad_restrictions
    );

    Ok(ExtractionResult::Completed(ExtractionReport {
        nodes: report_counts.0,
        ways: report_counts.1,
        relations: report_counts.2,
        others: report_counts.3,
        invalid_entities: report_counts.4,
        stats,
    }))
}
