// Copyright (c) 2026 The Attestation Runner Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::info;
use tokio_util::sync::CancellationToken;

use attestation_runner::signer::SignerSources;
use attestation_runner::{
    ArtifactStoreOptions, AttestationRunPipeline, RunConfig, DEFAULT_ARTIFACT_STORE_URL,
};

#[derive(Debug, Parser)]
#[command(name = "attestation-runner", version, about = "Runs commands and anchors signed attestations about them")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Runs the provided command and records attestations about the execution
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Directory from which commands will run
    #[arg(short = 'd', long)]
    workingdir: Option<PathBuf>,

    /// Attestations to record
    #[arg(
        short = 'a',
        long = "attestations",
        default_values_t = [String::from("environment"), String::from("git")]
    )]
    attestations: Vec<String>,

    /// File to which to write signed data. Defaults to stdout
    #[arg(short = 'o', long)]
    outfile: Option<PathBuf>,

    /// Name of the step being run
    #[arg(short = 's', long)]
    step: String,

    /// Enable tracing for the command
    #[arg(long)]
    trace: bool,

    /// Transparency log server to publish the signed envelope to
    #[arg(long = "log-server")]
    log_server: Option<String>,

    /// Store the signed envelope in the artifact store
    #[arg(long = "enable-artifact-store")]
    enable_artifact_store: bool,

    /// URL of the artifact store server
    #[arg(long = "artifact-store-url", default_value = DEFAULT_ARTIFACT_STORE_URL)]
    artifact_store_url: String,

    /// Path to a PKCS#8 Ed25519 private key to sign with
    #[arg(short = 'k', long = "key")]
    keys: Vec<PathBuf>,

    /// Command to run and attest
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let config = RunConfig {
        step_name: args.step,
        command: args.command,
        working_dir: args.workingdir,
        attestor_names: args.attestations,
        out_file: args.outfile,
        tracing: args.trace,
        log_server: args.log_server,
        artifact_store: ArtifactStoreOptions {
            enable: args.enable_artifact_store,
            url: args.artifact_store_url,
        },
        signers: SignerSources {
            key_paths: args.keys,
        },
    };

    let pipeline = AttestationRunPipeline::new(config)?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling in-flight publishing");
            signal_token.cancel();
        }
    });

    pipeline.run(&cancel).await?;
    Ok(())
}
