use std::net::SocketAddr;
use std::path::Path;
use std::time::UNIX_EPOCH;

use anyhow::Context;
use colored::Colorize;

use depot_client::DepotClient;
use depot_patch::{Ingestor, PatchChainGenerator, PatchVerifier, VersionOutcome};
use depot_registry::Registry;
use depot_server::{Broker, DepotConfig};
use depot_store::SledStore;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match cli.config.as_deref() {
        Some(path) => DepotConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => DepotConfig::default(),
    };

    match cli.command {
        Command::Serve(args) => cmd_serve(config, args),
        Command::Ingest(args) => cmd_ingest(config, args),
        Command::GenPatches(args) => cmd_gen_patches(config, args),
        Command::Verify(_) => cmd_verify(config),
        Command::Get(args) => cmd_get(config, args),
        Command::Set(args) => cmd_set(config, args),
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("starting async runtime")
}

fn cmd_serve(mut config: DepotConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(path) = args.store_path {
        config.store_path = path;
    }

    let broker = Broker::open(config)?;
    println!(
        "{} broker on {} (store: {})",
        "▶".green().bold(),
        broker.config().bind_addr.to_string().bold(),
        broker.config().store_path.display()
    );
    runtime()?.block_on(broker.serve())?;
    Ok(())
}

fn cmd_ingest(config: DepotConfig, args: IngestArgs) -> anyhow::Result<()> {
    let version = match args.version {
        Some(v) => v,
        None => file_mtime_version(&args.snapshot)?,
    };

    let store = SledStore::open(&config.store_path)?;
    let registry = Registry::new(store);
    let report = Ingestor::new(&registry, &config.patch_dir).run(&args.snapshot, version)?;

    match &report.chain {
        Some(chain) => println!(
            "{} ingested version {} ({} patch(es) generated, {} skipped)",
            "✓".green().bold(),
            report.version.to_string().yellow(),
            chain.generated.len(),
            chain.skipped.len()
        ),
        None => println!(
            "{} version {} already ingested; nothing to do",
            "✓".green(),
            report.version.to_string().yellow()
        ),
    }
    Ok(())
}

fn cmd_gen_patches(config: DepotConfig, args: GenPatchesArgs) -> anyhow::Result<()> {
    let store = SledStore::open(&config.store_path)?;
    let registry = Registry::new(store);

    let version = match args.version {
        Some(v) => v,
        None => registry
            .last_download()?
            .context("no version ingested yet and --version not given")?,
    };

    let report = PatchChainGenerator::new(&registry, &config.patch_dir).generate(version)?;
    println!(
        "{} patch chain for {}: {} generated, {} skipped",
        "✓".green().bold(),
        version.to_string().yellow(),
        report.generated.len(),
        report.skipped.len()
    );
    Ok(())
}

fn cmd_verify(config: DepotConfig) -> anyhow::Result<()> {
    let store = SledStore::open(&config.store_path)?;
    let registry = Registry::new(store);
    let report = PatchVerifier::new(&registry).verify()?;

    println!(
        "current version {} ({})",
        report.current.to_string().yellow().bold(),
        &report.current_digest[..12]
    );
    for result in &report.results {
        match &result.outcome {
            VersionOutcome::Verified => {
                println!("  {} {}", "✓".green(), result.version);
            }
            outcome => {
                println!(
                    "  {} {}: {}",
                    "✗".red().bold(),
                    result.version,
                    describe(outcome).red()
                );
            }
        }
    }

    let failures = report.failures().len();
    if failures > 0 {
        anyhow::bail!("{failures} version(s) failed verification");
    }
    println!("{}", "all patches verified".green());
    Ok(())
}

fn describe(outcome: &VersionOutcome) -> String {
    match outcome {
        VersionOutcome::Verified => "verified".into(),
        VersionOutcome::MissingPatchRecord => "no patch record in the registry".into(),
        VersionOutcome::MissingPatchArtifact { path } => {
            format!("patch file missing on disk ({path})")
        }
        VersionOutcome::MissingSnapshotFile { path } => {
            format!("snapshot file missing on disk ({path})")
        }
        VersionOutcome::ApplyFailed { reason } => format!("patch would not apply: {reason}"),
        VersionOutcome::HashMismatch { expected, actual } => format!(
            "hash mismatch: expected {}, got {}",
            &expected[..12],
            &actual[..12]
        ),
    }
}

fn cmd_get(config: DepotConfig, args: GetArgs) -> anyhow::Result<()> {
    let addr = args.addr.unwrap_or(config.bind_addr);
    runtime()?.block_on(async {
        let mut client = client(addr).await?;
        match client.get(args.key.as_bytes()).await? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("{}", "(not found)".dimmed()),
        }
        Ok(())
    })
}

fn cmd_set(config: DepotConfig, args: SetArgs) -> anyhow::Result<()> {
    let addr = args.addr.unwrap_or(config.bind_addr);
    runtime()?.block_on(async {
        let mut client = client(addr).await?;
        client.set(args.key.as_bytes(), args.value.as_bytes()).await?;
        println!("{} {}", "✓".green(), args.key.bold());
        Ok(())
    })
}

async fn client(addr: SocketAddr) -> anyhow::Result<DepotClient> {
    DepotClient::connect(addr)
        .await
        .with_context(|| format!("connecting to broker at {addr}"))
}

/// A snapshot's default version: its mtime as a unix timestamp, the same
/// clock the upstream download step stamps from the source's Last-Modified
/// header.
fn file_mtime_version(path: &Path) -> anyhow::Result<i64> {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("reading modification time of {}", path.display()))?;
    let secs = modified
        .duration_since(UNIX_EPOCH)
        .context("snapshot mtime predates the unix epoch")?
        .as_secs();
    Ok(secs as i64)
}
