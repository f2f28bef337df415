use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Transit depot: snapshot broker, patch chain, and verification tools.
#[derive(Parser)]
#[command(name = "depot", version, about)]
pub struct Cli {
    /// TOML configuration file. Missing keys fall back to defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the broker and serve the store over TCP.
    Serve(ServeArgs),
    /// Register a built snapshot file and regenerate the patch chain.
    Ingest(IngestArgs),
    /// Force a patch chain rebuild for the current (or given) version.
    GenPatches(GenPatchesArgs),
    /// Replay every stored patch and check it reproduces the current
    /// snapshot byte for byte.
    Verify(VerifyArgs),
    /// Read one key from a running broker.
    Get(GetArgs),
    /// Write one key to a running broker.
    Set(SetArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Listen address; overrides the config file.
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Store directory; overrides the config file.
    #[arg(long)]
    pub store_path: Option<PathBuf>,
}

#[derive(Args)]
pub struct IngestArgs {
    /// The already-built snapshot file to register.
    pub snapshot: PathBuf,

    /// Version to register it under. Defaults to the file's modification
    /// time as a unix timestamp, matching how the upstream download step
    /// stamps versions from the source's Last-Modified header.
    #[arg(long)]
    pub version: Option<i64>,
}

#[derive(Args)]
pub struct GenPatchesArgs {
    /// Target version. Defaults to the last ingested version.
    #[arg(long)]
    pub version: Option<i64>,
}

#[derive(Args)]
pub struct VerifyArgs {}

#[derive(Args)]
pub struct GetArgs {
    /// Broker address; overrides the config file.
    #[arg(long)]
    pub addr: Option<SocketAddr>,

    pub key: String,
}

#[derive(Args)]
pub struct SetArgs {
    /// Broker address; overrides the config file.
    #[arg(long)]
    pub addr: Option<SocketAddr>,

    pub key: String,
    pub value: String,
}
