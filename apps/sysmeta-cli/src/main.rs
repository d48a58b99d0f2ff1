use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use resource_lookup::{ClusterInventory, ContainerInfo, LookupConfig, ResourceLookup};
use serde::Serialize;
use sysmeta::{ProviderRegistry, SnapshotProvider, SystemConfig};
use sysmeta_bootstrap::{AppConfig, AppConfigProvider, CliArgs, ConfigProvider};

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// sysmeta - inspect the cached fault-injection target views of a microservice system
#[derive(Parser)]
#[command(name = "sysmeta-cli")]
#[command(about = "Inspect service metadata and fault-injection targets")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target system override (e.g. ts, hs, sn)
    #[arg(short, long)]
    system: Option<String>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// All service names of the selected system
    Services,
    /// HTTP endpoints with infrastructure addresses removed
    Endpoints,
    /// Caller/callee pairs across HTTP, RPC and database calls
    NetworkPairs,
    /// Caller/callee pairs across HTTP and database calls
    DnsPairs,
    /// Database operations per service
    DbOps,
    /// Services adjacent to SERVICE in the dependency graph
    Deps { service: String },
    /// Systems with at least one registered provider
    Systems,
    /// Warm every cache slot and report which slots are populated
    Preload,
}

/// Inventory used when no cluster client is wired in: every query is empty.
struct OfflineInventory;

#[async_trait]
impl ClusterInventory for OfflineInventory {
    async fn get_labels(&self, namespace: &str, key: &str) -> anyhow::Result<Vec<String>> {
        tracing::debug!(namespace, key, "offline inventory: no labels");
        Ok(Vec::new())
    }

    async fn get_containers_with_app_label(
        &self,
        namespace: &str,
    ) -> anyhow::Result<Vec<ContainerInfo>> {
        tracing::debug!(namespace, "offline inventory: no containers");
        Ok(Vec::new())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        system: cli.system.clone(),
        verbose: cli.verbose,
    };

    // 1) defaults -> 2) YAML (if provided) -> 3) env (SYSMETA__*) -> 4) CLI overrides
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let base_dir = cli
        .config
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let logging_config = config.logging.clone().unwrap_or_default();
    sysmeta_bootstrap::init_logging(&logging_config, &base_dir);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let lookup = build_lookup(config, &base_dir)?;
    tracing::info!(system = %lookup.current_system(), "sysmeta-cli ready");

    match cli.command.unwrap_or(Commands::Services) {
        Commands::Services => print_json(&lookup.get_all_services()?),
        Commands::Endpoints => print_json(&*lookup.get_http_endpoints().await?),
        Commands::NetworkPairs => print_json(&*lookup.get_network_pairs().await?),
        Commands::DnsPairs => print_json(&*lookup.get_dns_pairs().await?),
        Commands::DbOps => print_json(&*lookup.get_database_operations().await?),
        Commands::Deps { service } => print_json(&lookup.dependencies_of(&service).await?),
        Commands::Systems => print_json(&lookup.registry().systems()),
        Commands::Preload => {
            let namespace = lookup.config().namespace.clone();
            let label_key = lookup.config().label_key.clone();
            lookup.preload_caches(&namespace, &label_key).await?;
            print_json(&lookup.cache_status())
        }
    }
}

fn build_lookup(config: AppConfig, base_dir: &Path) -> Result<Arc<ResourceLookup>> {
    let system_config =
        SystemConfig::with_extra_systems(&config.system.extra_systems, &config.system.current)?;
    let registry = Arc::new(ProviderRegistry::discover(Arc::new(system_config)));

    for (system, path) in &config.snapshots {
        let system = registry.config().parse(system)?;
        let path = if path.is_absolute() {
            path.clone()
        } else {
            base_dir.join(path)
        };
        let provider = SnapshotProvider::from_path(&path)?;
        tracing::info!(%system, path = %path.display(), "registered snapshot");
        sysmeta::register_snapshot(&registry, system, Arc::new(provider));
    }

    let provider = AppConfigProvider::new(config);
    let lookup_config = LookupConfig::from_value(provider.get_module_config("resource_lookup"))
        .context("invalid modules.resource_lookup section")?;

    Ok(Arc::new(ResourceLookup::new(
        registry,
        Arc::new(OfflineInventory),
        lookup_config,
    )))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

