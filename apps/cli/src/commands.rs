// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI command definitions, dispatch and tracing setup.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use floornet_core::{FloorKey, Schema};
use floornet_pipeline::{
    rebuild, BuildPass, FileStore, FloorRegistry, HandoffDirectory, JsonRegistrySource,
    NetworkStore, PassReport,
};

use crate::config::{parse_connectivity, Config};

/// Floornet - turn floor plan skeletons into a routable 3D network.
#[derive(Parser)]
#[command(name = "floornet", version, about, long_about = None)]
pub(crate) struct Cli {
    /// Config file (defaults to ./floornet.toml if present).
    #[arg(long, global = true, env = "FLOORNET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Enrich, lift and merge floors into the network source, then rebuild.
    Build(BuildArgs),

    /// Rebuild the network topology from the current source.
    Rebuild {
        #[command(flatten)]
        store: StoreArgs,

        /// Connectivity policy: endpoint or any_vertex.
        #[arg(long)]
        connectivity: Option<String>,

        /// Vertex snap tolerance.
        #[arg(long)]
        snap_tolerance: Option<f64>,
    },

    /// Show network source and graph state.
    Status {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// List registered floors by building.
    Floors {
        /// Floor registry rows (JSON).
        #[arg(long)]
        registry: Option<PathBuf>,

        /// Only this building.
        #[arg(long)]
        building: Option<String>,
    },
}

#[derive(Args)]
pub(crate) struct StoreArgs {
    /// Network store directory.
    #[arg(long)]
    pub store: Option<PathBuf>,
}

#[derive(Args)]
pub(crate) struct BuildArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Floor registry rows (JSON).
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Directory of per-floor skeleton files.
    #[arg(long)]
    pub skeletons: Option<PathBuf>,

    /// Floor to process as building/floor; repeatable.
    #[arg(long = "floor")]
    pub floors: Vec<String>,

    /// Walking speed constant.
    #[arg(long)]
    pub speed: Option<f64>,

    /// Connectivity policy: endpoint or any_vertex.
    #[arg(long)]
    pub connectivity: Option<String>,

    /// Vertex snap tolerance.
    #[arg(long)]
    pub snap_tolerance: Option<f64>,

    /// Merge floors that are already in the network source.
    #[arg(long)]
    pub allow_duplicate_floors: bool,

    /// Worker threads for per-floor processing.
    #[arg(long)]
    pub threads: Option<usize>,
}

/// Initialize the tracing subscriber from CLI flags; `RUST_LOG` wins.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match cli.verbose {
        0 => "floornet_cli=info,floornet_pipeline=info",
        1 => "floornet_cli=debug,floornet_pipeline=debug,floornet_topology=debug",
        _ => "floornet_cli=trace,floornet_pipeline=trace,floornet_topology=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Build(args) => cmd_build(&mut config, args),
        Command::Rebuild {
            store,
            connectivity,
            snap_tolerance,
        } => {
            apply_store(&mut config, store);
            if let Some(c) = connectivity {
                config.connectivity = parse_connectivity(&c)?;
            }
            if let Some(t) = snap_tolerance {
                config.snap_tolerance = t;
            }
            cmd_rebuild(&config)
        }
        Command::Status { store } => {
            apply_store(&mut config, store);
            cmd_status(&config)
        }
        Command::Floors { registry, building } => {
            if registry.is_some() {
                config.registry = registry;
            }
            cmd_floors(&config, building.as_deref())
        }
    }
}

fn apply_store(config: &mut Config, args: StoreArgs) {
    if let Some(dir) = args.store {
        config.store_dir = dir;
    }
}

fn load_registry(config: &Config) -> Result<FloorRegistry> {
    let Some(path) = config.registry.as_ref() else {
        bail!("no floor registry configured; pass --registry or set registry in floornet.toml");
    };
    FloorRegistry::load(&JsonRegistrySource::new(path))
        .with_context(|| format!("failed to load floor registry {}", path.display()))
}

fn cmd_build(config: &mut Config, args: BuildArgs) -> Result<()> {
    apply_store(config, args.store);
    if args.registry.is_some() {
        config.registry = args.registry;
    }
    if args.skeletons.is_some() {
        config.skeleton_dir = args.skeletons;
    }
    if !args.floors.is_empty() {
        config.floors = args.floors;
    }
    if let Some(speed) = args.speed {
        config.speed = speed;
    }
    if let Some(c) = args.connectivity {
        config.connectivity = parse_connectivity(&c)?;
    }
    if let Some(t) = args.snap_tolerance {
        config.snap_tolerance = t;
    }
    if args.allow_duplicate_floors {
        config.allow_duplicate_floors = true;
    }
    if let Some(threads) = args.threads {
        config.worker_threads = threads;
    }

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads)
        .build_global()
        .context("failed to initialize rayon thread pool")?;

    let registry = load_registry(config)?;
    let Some(skeleton_dir) = config.skeleton_dir.as_ref() else {
        bail!("no skeleton directory configured; pass --skeletons or set skeleton_dir");
    };
    let skeletons = HandoffDirectory::scan(skeleton_dir)
        .with_context(|| format!("failed to scan skeleton directory {}", skeleton_dir.display()))?;

    let floors: Vec<FloorKey> = if config.floors.is_empty() {
        skeletons.floors().cloned().collect()
    } else {
        config.floor_keys()?
    };

    let mut store = FileStore::open_or_create(&config.store_dir, Schema::pedestrian_network())
        .with_context(|| format!("failed to open network store {}", config.store_dir.display()))?;

    tracing::info!(
        store = %config.store_dir.display(),
        floors = floors.len(),
        speed = config.speed,
        worker_threads = config.worker_threads,
        "Starting build pass"
    );

    let mut pass = BuildPass::new(config.pass_options(floors));
    let report = pass.run(&registry, &skeletons, &mut store);
    print_report(&report);

    match report.error {
        None => Ok(()),
        Some(err) => Err(anyhow::Error::new(err).context(format!("build pass {} failed", report.pass_id))),
    }
}

fn print_report(report: &PassReport) {
    println!("Build pass {}: {}", report.pass_id, report.state);
    for floor in &report.floors {
        match &floor.error {
            None => println!(
                "  {:<12} loaded {:>5}  enriched {:>5}  rejected {:>4}  lifted {:>5}",
                floor.floor.to_string(),
                floor.loaded,
                floor.enriched,
                floor.rejected.len(),
                floor.lifted
            ),
            Some(err) => println!("  {:<12} FAILED: {err}", floor.floor.to_string()),
        }
        for rejected in &floor.rejected {
            println!("      rejected {rejected}");
        }
    }
    if let Some(merge) = &report.merge {
        println!("Merged {} features from {} floors", merge.appended, merge.floors.len());
    }
    if let Some(rebuild) = &report.rebuild {
        println!(
            "Graph: {} junctions, {} edges, {} components",
            rebuild.summary.junctions, rebuild.summary.edges, rebuild.summary.components
        );
    }
    if let Some(stage) = report.failed_stage {
        println!(
            "Failed while moving to {stage} after {} lifted features; graph is {}",
            report.counts.lifted, report.graph_state
        );
    }
}

fn cmd_rebuild(config: &Config) -> Result<()> {
    let mut store = FileStore::open(&config.store_dir)
        .with_context(|| format!("failed to open network store {}", config.store_dir.display()))?;
    let report = rebuild(&mut store, &config.build_options()).context("topology rebuild failed")?;
    println!(
        "Rebuilt {} sources: {} junctions, {} edges, {} components in {} ms",
        report.sources,
        report.summary.junctions,
        report.summary.edges,
        report.summary.components,
        report.elapsed.as_millis()
    );
    Ok(())
}

fn cmd_status(config: &Config) -> Result<()> {
    let store = FileStore::open_read_only(&config.store_dir)
        .with_context(|| format!("failed to open network store {}", config.store_dir.display()))?;

    println!("Store:    {}", store.dir().display());
    println!("Features: {}", store.feature_count());
    println!("Graph:    {}", store.graph_state());
    let floors: Vec<String> = store.merged_floors().iter().map(|f| f.to_string()).collect();
    println!("Floors:   {}", floors.join(", "));

    if let Some(graph) = store.graph()? {
        let summary = graph.summary();
        println!(
            "          {} junctions, {} edges, {} components",
            summary.junctions, summary.edges, summary.components
        );
    }
    Ok(())
}

fn cmd_floors(config: &Config, building: Option<&str>) -> Result<()> {
    let registry = load_registry(config)?;
    let buildings: Vec<&str> = match building {
        Some(b) => vec![b],
        None => registry.buildings(),
    };

    for b in buildings {
        let floors = registry.floors(b);
        if floors.is_empty() {
            println!("{b}: no floors");
            continue;
        }
        println!("{b}:");
        for record in floors {
            println!("  {:<8} {:>10.3}", record.floor_id(), record.elevation_offset);
        }
    }
    Ok(())
}
