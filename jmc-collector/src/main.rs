//! jmcollector - archive collector command line
//!
//! Crawls the configured collections, hashes their content, and selects the
//! items for the next backup volume.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jmc_collector::services::{Catalog, FileScanner, HashReport, HashRunner, VolumeAllocator};
use jmc_collector::Collector;
use jmc_common::config::{resolve_config_path, RootFolderResolver, TomlConfig};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for jmcollector
#[derive(Parser, Debug)]
#[command(name = "jmcollector")]
#[command(about = "Manages a collection of data and its backup volumes")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "JMC_CONFIG")]
    config: Option<PathBuf>,

    /// Collector root folder
    #[arg(short, long, env = "JMC_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Volume capacity in bytes (overrides the configuration)
    #[arg(long)]
    capacity: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the items of every collection
    ListItems,
    /// List the files of every collection
    ListFiles,
    /// Hash all files and save the catalog
    Hash,
    /// Show the next volume without sealing it
    Plan,
    /// Select and seal the next volume, then save the catalog
    Allocate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; the configured level replaces the default filter
    // once the configuration is loaded, unless RUST_LOG is set
    let rust_log_set = std::env::var_os("RUST_LOG").is_some();
    let (filter, filter_handle) = reload::Layer::new(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_directive("info"))),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let mut config = TomlConfig::load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;
    if let Some(capacity) = args.capacity {
        config.volume_capacity = capacity;
    }
    config.validate()?;

    if !rust_log_set {
        filter_handle
            .reload(EnvFilter::new(log_directive(&config.logging.level)))
            .context("Failed to apply configured log level")?;
    }

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder.as_deref())
        .with_config(&config)
        .resolve();
    let catalog = Catalog::new(config.catalog_path_for(&root_folder));

    info!("Root folder: {}", root_folder.display());
    info!("Catalog: {}", catalog.path().display());

    if config.collections.is_empty() {
        warn!("No collections configured");
    }

    let scanner = FileScanner::new();
    let collector = scanner
        .scan_collector(&root_folder, &config.collections)
        .context("Failed to scan collections")?;

    match args.command {
        Command::ListItems => {
            for item in collector.iter_items() {
                let volumes: Vec<String> = item.volumes().iter().map(|v| v.to_string()).collect();
                println!(
                    "{}\t{}\t{}\t{}",
                    item.id(),
                    item.size(),
                    item.value().get(),
                    volumes.join(",")
                );
            }
        }
        Command::ListFiles => {
            for file in collector.iter_files() {
                println!("{}\t{}", file.path().display(), file.size());
            }
        }
        Command::Hash => {
            let (mut collector, report) = hash_collector(collector, &config).await?;
            print_hash_failures(&report);
            restore_history(&mut collector, &catalog)?;
            for item in collector.iter_items() {
                if let Some(digest) = item.digest() {
                    println!("{}  {}", digest, item.id());
                }
            }
            catalog.save(&collector, config.digest_algorithm)?;
        }
        Command::Plan | Command::Allocate => {
            let (mut collector, report) = hash_collector(collector, &config).await?;
            print_hash_failures(&report);
            restore_history(&mut collector, &catalog)?;

            let allocator = VolumeAllocator::new(config.volume_capacity)?;
            if matches!(args.command, Command::Plan) {
                let plan = allocator.plan(collector.iter_items(), collector.total_volumes())?;
                println!(
                    "Volume {} ({} of {} bytes)",
                    plan.volume_id, plan.used_bytes, plan.capacity
                );
                for member in &plan.members {
                    println!("  {:+.3}\t{}\t{}", member.alpha, member.size, member.id);
                }
                for id in &plan.skipped_huge {
                    println!("  huge\t{}", id);
                }
            } else {
                let sealed = allocator.allocate_next_volume(&mut collector)?;
                println!(
                    "Volume {} sealed ({} items, {} bytes)",
                    sealed.volume.id(),
                    sealed.volume.members().len(),
                    sealed.volume.size()
                );
                for id in sealed.volume.members() {
                    println!("  {}", id);
                }
                for id in &sealed.skipped_huge {
                    println!("  huge\t{}", id);
                }
                catalog.save(&collector, config.digest_algorithm)?;
            }
        }
    }

    Ok(())
}

/// Filter directive covering this binary and both workspace crates
fn log_directive(level: &str) -> String {
    format!("jmcollector={0},jmc_collector={0},jmc_common={0}", level)
}

/// Hash on the blocking pool so the runtime threads stay free
async fn hash_collector(collector: Collector, config: &TomlConfig) -> Result<(Collector, HashReport)> {
    let algorithm = config.digest_algorithm;
    let workers = config.hash_workers;

    tokio::task::spawn_blocking(move || -> Result<(Collector, HashReport)> {
        let runner = HashRunner::new(algorithm, workers)?;
        let mut collector = collector;
        let report = runner.hash_collector(&mut collector);
        Ok((collector, report))
    })
    .await
    .context("Hash task panicked")?
}

/// Carry volume history over from the previous catalog, if any
fn restore_history(collector: &mut Collector, catalog: &Catalog) -> Result<()> {
    match catalog.load_if_exists().context("Failed to load catalog")? {
        Some(previous) => {
            let restored = collector.restore_history(&previous.collector)?;
            info!(
                restored,
                volumes = collector.total_volumes(),
                "History restored from catalog"
            );
        }
        None => info!("No catalog yet, starting without volume history"),
    }
    Ok(())
}

fn print_hash_failures(report: &HashReport) {
    for failure in &report.failures {
        eprintln!("hash failed: {}: {}", failure.path.display(), failure.error);
    }
    for id in &report.unresolved_items {
        eprintln!("unresolved: {}", id);
    }
}
