// Copyright (c) 2026 The Attestation Runner Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! The attestation/execution collaborator invoked by the run pipeline.
//!
//! The pipeline treats this as an opaque call that either yields a signed
//! envelope or a collaborator error, which is propagated unchanged. The
//! built-in [`CommandAttestor`] executes the target command and records
//! evidence from the configured attestor names.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use tokio::process::Command;

use crate::envelope::{SignedEnvelope, PAYLOAD_TYPE};
use crate::signer::Signer;

pub const ENVIRONMENT_ATTESTOR: &str = "environment";
pub const GIT_ATTESTOR: &str = "git";

pub const STATEMENT_TYPE: &str = "https://in-toto.io/Statement/v0.1";
pub const PREDICATE_TYPE: &str = "https://attestation-runner.dev/attestations/command-run/v0.1";

/// What to execute and which evidence to record for it.
#[derive(Clone, Debug)]
pub struct AttestationSpec {
    pub step_name: String,
    pub command: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub attestor_names: Vec<String>,
    pub tracing: bool,
}

#[async_trait]
pub trait Attestor: Send + Sync {
    /// Execute the attested operation and return the already-signed envelope.
    async fn attest(
        &self,
        signer: &dyn Signer,
        spec: &AttestationSpec,
    ) -> anyhow::Result<SignedEnvelope>;
}

/// Runs the target command, gathers evidence from the named attestors,
/// assembles an in-toto style statement and signs it.
#[derive(Default)]
pub struct CommandAttestor;

#[async_trait]
impl Attestor for CommandAttestor {
    async fn attest(
        &self,
        signer: &dyn Signer,
        spec: &AttestationSpec,
    ) -> anyhow::Result<SignedEnvelope> {
        let exit_code = execute(spec).await?;

        let mut attestations = serde_json::Map::new();
        for name in &spec.attestor_names {
            let evidence = match name.as_str() {
                ENVIRONMENT_ATTESTOR => environment_evidence(),
                GIT_ATTESTOR => git_evidence(spec.working_dir.as_deref()).await,
                other => bail!("unknown attestor `{other}`"),
            };
            attestations.insert(name.clone(), evidence);
        }

        let statement = serde_json::json!({
            "_type": STATEMENT_TYPE,
            "predicateType": PREDICATE_TYPE,
            "subject": [{ "name": spec.step_name }],
            "predicate": {
                "step": spec.step_name,
                "command": spec.command,
                "exitcode": exit_code,
                "tracing": spec.tracing,
                "attestations": attestations,
            },
        });

        let payload = serde_json::to_vec(&statement).context("serialize statement")?;
        SignedEnvelope::sign(&payload, PAYLOAD_TYPE, signer)
    }
}

async fn execute(spec: &AttestationSpec) -> anyhow::Result<i32> {
    let (program, args) = spec
        .command
        .split_first()
        .context("no command to attest")?;

    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = &spec.working_dir {
        command.current_dir(dir);
    }

    debug!("executing attested command `{}`", spec.command.join(" "));
    let status = command
        .status()
        .await
        .with_context(|| format!("execute `{program}`"))?;

    match status.code() {
        Some(0) => Ok(0),
        Some(code) => bail!("command exited with status {code}"),
        None => bail!("command terminated by signal"),
    }
}

fn environment_evidence() -> Value {
    let variables: serde_json::Map<String, Value> = env::vars()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    serde_json::json!({
        "os": env::consts::OS,
        "arch": env::consts::ARCH,
        "variables": variables,
    })
}

/// Records the head commit and dirty state of the working directory's
/// repository. Absence of a repository is evidence too, not an error.
async fn git_evidence(working_dir: Option<&Path>) -> Value {
    let head = git_output(working_dir, &["rev-parse", "HEAD"]).await;
    let status = git_output(working_dir, &["status", "--porcelain"]).await;

    match (head, status) {
        (Some(head), Some(status)) => serde_json::json!({
            "present": true,
            "commit": head,
            "dirty": !status.is_empty(),
        }),
        _ => serde_json::json!({ "present": false }),
    }
}

async fn git_output(working_dir: Option<&Path>, args: &[&str]) -> Option<String> {
    let mut command = Command::new("git");
    command.args(args);
    if let Some(dir) = working_dir {
        command.current_dir(dir);
    }

    let output = command.output().await.ok()?;
    if !output.status.success() {
        return None;
    }

    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
